//! # Seed Data Generator
//!
//! Populates the database with a small jewellery and fragrance catalog and
//! a sample address for local development.
//!
//! ## Usage
//! ```bash
//! # Seed the default development database
//! cargo run -p aurum-db --bin seed
//!
//! # Specify database path and owner for the sample address
//! cargo run -p aurum-db --bin seed -- --db ./data/aurum.db --owner user:42
//! ```
//!
//! ## Generated Data
//! - One variant per (product, size) pair, SKU `{CODE}-{SIZE}`
//! - Stock between 0 and 12 so the out-of-stock path is exercisable
//! - One price-on-demand piece that checkout must refuse
//! - One address for `--owner` (default `user:demo`)

use chrono::Utc;
use std::env;
use uuid::Uuid;

use aurum_core::{Address, Money, Variant};
use aurum_db::{Database, DbConfig};

/// (code, product name, colour, base price in paise)
const PRODUCTS: &[(&str, &str, Option<&str>, i64)] = &[
    ("RNG-SOL", "Solitaire Ring", Some("Yellow Gold"), 4_250_000),
    ("RNG-BND", "Eternity Band", Some("Rose Gold"), 1_875_000),
    ("PND-TRI", "Trinity Pendant", Some("White Gold"), 960_000),
    ("EAR-HUG", "Huggie Earrings", Some("Yellow Gold"), 420_000),
    ("BRC-TEN", "Tennis Bracelet", Some("Platinum"), 6_800_000),
    ("OUD-NOI", "Oud Noir Eau de Parfum", None, 1_250_000),
    ("ROS-ATT", "Rose Attar", None, 480_000),
    ("VET-EDT", "Vetiver Eau de Toilette", None, 320_000),
];

/// (size label, price add-on in paise)
const SIZES: &[(&str, i64)] = &[("S", 0), ("M", 25_000), ("L", 60_000)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./aurum_dev.db");
    let mut owner = String::from("user:demo");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--owner" | "-o" => {
                if i + 1 < args.len() {
                    owner = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Aurum Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: ./aurum_dev.db)");
                println!("  -o, --owner <KEY>    Owner key for the sample address (default: user:demo)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Aurum Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.variants().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} variants", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating variants...");

    let mut generated = 0;
    for (product_idx, (code, name, color, base_price)) in PRODUCTS.iter().enumerate() {
        let product_id = Uuid::new_v4().to_string();

        for (size_idx, (size, addon)) in SIZES.iter().enumerate() {
            let variant = Variant {
                id: Uuid::new_v4().to_string(),
                product_id: product_id.clone(),
                sku: format!("{}-{}", code, size),
                product_name: name.to_string(),
                label: size.to_string(),
                color: color.map(str::to_string),
                image_ref: Some(format!("products/{}.jpg", code.to_lowercase())),
                price: Money::from_minor(base_price + addon),
                stock: ((product_idx * 7 + size_idx * 5) % 13) as i64,
                is_active: true,
                is_price_on_demand: false,
                updated_at: Utc::now(),
            };

            if let Err(e) = db.variants().upsert(&variant).await {
                eprintln!("Failed to insert {}: {}", variant.sku, e);
                continue;
            }
            generated += 1;
        }
    }

    let bespoke = Variant {
        id: Uuid::new_v4().to_string(),
        product_id: Uuid::new_v4().to_string(),
        sku: "BSP-TIARA".to_string(),
        product_name: "Bespoke Tiara".to_string(),
        label: "One Size".to_string(),
        color: Some("Platinum".to_string()),
        image_ref: None,
        price: Money::zero(),
        stock: 1,
        is_active: true,
        is_price_on_demand: true,
        updated_at: Utc::now(),
    };
    db.variants().upsert(&bespoke).await?;
    generated += 1;

    println!("✓ Generated {} variants", generated);

    let address = Address {
        id: Uuid::new_v4().to_string(),
        owner_key: owner.clone(),
        full_name: "Demo Customer".to_string(),
        phone: "+919800000000".to_string(),
        line1: "12 MG Road".to_string(),
        line2: Some("Floor 3".to_string()),
        city: "Bengaluru".to_string(),
        state: "KA".to_string(),
        postal_code: "560001".to_string(),
        country: "IN".to_string(),
    };
    db.addresses().insert(&address).await?;

    println!("✓ Address {} for {}", address.id, owner);
    println!();
    println!("🎉 Seed complete!");

    db.close().await;
    Ok(())
}
