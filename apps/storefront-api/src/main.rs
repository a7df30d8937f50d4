use tracing::info;

use storefront_api::{init_tracing, run, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Aurum Storefront API...");

    let config = AppConfig::load()?;
    info!(
        port = config.server.port,
        cod_initial_status = ?config.checkout.cod_initial_status,
        "Configuration loaded"
    );

    run(config).await
}
