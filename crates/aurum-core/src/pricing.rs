//! # Pricing Engine
//!
//! Pure price computation for carts and orders.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   lines[]  ──► subtotal = Σ unit_price × quantity                       │
//! │                   │                                                     │
//! │                   ├──► is_free_delivery = subtotal ≥ threshold          │
//! │                   │        delivery = free ? 0 : base_delivery_charge   │
//! │                   │                                                     │
//! │   method   ──────►├──► cod_charge = method == cod ? cod_fee : 0          │
//! │                   │                                                     │
//! │   rule     ──────►├──► tax_total, discount_total (pluggable)            │
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │   grand_total = subtotal + delivery + cod + tax − discount  (≥ 0)       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The same function prices the cart page estimate and the order at
//! checkout, so the two always agree for the same inputs.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{PaymentMethod, TaxRate};

// =============================================================================
// Configuration
// =============================================================================

/// Tunable pricing constants, all in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    pub cod_handling_fee: Money,
    pub base_delivery_charge: Money,
    pub free_delivery_threshold: Money,
}

impl Default for PricingConfig {
    /// ₹40 COD fee, ₹70 delivery, free delivery from ₹500.
    fn default() -> Self {
        PricingConfig {
            cod_handling_fee: Money::from_minor(4_000),
            base_delivery_charge: Money::from_minor(7_000),
            free_delivery_threshold: Money::from_minor(50_000),
        }
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// One priced line: what the engine needs from a cart or order item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLine {
    pub unit_price: Money,
    pub quantity: i64,
}

impl PriceLine {
    pub fn new(unit_price: Money, quantity: i64) -> Self {
        PriceLine {
            unit_price,
            quantity,
        }
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Tax and discount totals produced by an [`AdjustmentRule`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Adjustments {
    pub tax_total: Money,
    pub discount_total: Money,
}

/// Pluggable tax/discount computation.
///
/// Jurisdiction rules live outside this crate; the engine only needs
/// two non-negative totals back.
pub trait AdjustmentRule: Send + Sync {
    fn adjust(&self, lines: &[PriceLine], subtotal: Money) -> Adjustments;
}

/// Zero tax, zero discount. The default rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAdjustments;

impl AdjustmentRule for NoAdjustments {
    fn adjust(&self, _lines: &[PriceLine], _subtotal: Money) -> Adjustments {
        Adjustments::default()
    }
}

/// A single flat rate applied to the subtotal.
#[derive(Debug, Clone, Copy)]
pub struct FlatTax(pub TaxRate);

impl AdjustmentRule for FlatTax {
    fn adjust(&self, _lines: &[PriceLine], subtotal: Money) -> Adjustments {
        Adjustments {
            tax_total: subtotal.calculate_tax(self.0),
            discount_total: Money::zero(),
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// Fully computed price breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub subtotal: Money,
    pub delivery_charge: Money,
    pub cod_charge: Money,
    pub tax_total: Money,
    pub discount_total: Money,
    pub grand_total: Money,
    pub is_free_delivery: bool,
    /// How much more to spend to reach free delivery (0 once reached).
    pub amount_needed_for_free_delivery: Money,
}

impl PriceQuote {
    /// Re-checks the reconciliation identity.
    pub fn reconciles(&self) -> bool {
        self.grand_total
            == self.subtotal + self.delivery_charge + self.cod_charge + self.tax_total
                - self.discount_total
            && !self.grand_total.is_negative()
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Prices lines with no tax or discount rule.
///
/// ## Example
/// ```rust
/// use aurum_core::money::Money;
/// use aurum_core::pricing::{price, PriceLine, PricingConfig};
/// use aurum_core::types::PaymentMethod;
///
/// let lines = [
///     PriceLine::new(Money::from_minor(20_000), 1),
///     PriceLine::new(Money::from_minor(5_000), 2),
/// ];
/// let quote = price(&lines, PaymentMethod::Cod, &PricingConfig::default());
/// assert_eq!(quote.subtotal.minor(), 30_000);
/// assert_eq!(quote.grand_total.minor(), 41_000);
/// ```
pub fn price(lines: &[PriceLine], method: PaymentMethod, config: &PricingConfig) -> PriceQuote {
    price_with(lines, method, config, &NoAdjustments)
}

/// Prices lines with a tax/discount rule.
///
/// Negative adjustments are treated as zero, and the discount is capped at
/// the pre-discount total so the grand total never goes below zero while
/// still reconciling exactly with its components.
pub fn price_with(
    lines: &[PriceLine],
    method: PaymentMethod,
    config: &PricingConfig,
    rule: &dyn AdjustmentRule,
) -> PriceQuote {
    let subtotal: Money = lines.iter().map(PriceLine::line_total).sum();

    let is_free_delivery = subtotal >= config.free_delivery_threshold;
    let delivery_charge = if is_free_delivery {
        Money::zero()
    } else {
        config.base_delivery_charge
    };

    let cod_charge = match method {
        PaymentMethod::Cod => config.cod_handling_fee,
        PaymentMethod::Gateway => Money::zero(),
    };

    let adjustments = rule.adjust(lines, subtotal);
    let tax_total = adjustments.tax_total.non_negative();

    let before_discount = subtotal + delivery_charge + cod_charge + tax_total;
    let discount_total = adjustments
        .discount_total
        .non_negative()
        .min(before_discount.non_negative());

    let grand_total = (before_discount - discount_total).non_negative();

    PriceQuote {
        subtotal,
        delivery_charge,
        cod_charge,
        tax_total,
        discount_total,
        grand_total,
        is_free_delivery,
        amount_needed_for_free_delivery: (config.free_delivery_threshold - subtotal)
            .non_negative(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn m(minor: i64) -> Money {
        Money::from_minor(minor)
    }

    struct FixedDiscount(Money);

    impl AdjustmentRule for FixedDiscount {
        fn adjust(&self, _lines: &[PriceLine], _subtotal: Money) -> Adjustments {
            Adjustments {
                tax_total: Money::zero(),
                discount_total: self.0,
            }
        }
    }

    #[test]
    fn test_two_items_cod_below_threshold() {
        let lines = [PriceLine::new(m(20_000), 1), PriceLine::new(m(5_000), 2)];
        let quote = price(&lines, PaymentMethod::Cod, &PricingConfig::default());

        assert_eq!(quote.subtotal, m(30_000));
        assert!(!quote.is_free_delivery);
        assert_eq!(quote.delivery_charge, m(7_000));
        assert_eq!(quote.cod_charge, m(4_000));
        assert_eq!(quote.tax_total, Money::zero());
        assert_eq!(quote.discount_total, Money::zero());
        assert_eq!(quote.grand_total, m(41_000));
        assert_eq!(quote.amount_needed_for_free_delivery, m(20_000));
    }

    #[test]
    fn test_free_delivery_at_threshold() {
        let config = PricingConfig::default();
        let lines = [PriceLine::new(m(25_000), 2)];
        let quote = price(&lines, PaymentMethod::Gateway, &config);

        assert!(quote.is_free_delivery);
        assert_eq!(quote.delivery_charge, Money::zero());
        assert_eq!(quote.cod_charge, Money::zero());
        assert_eq!(quote.grand_total, m(50_000));
        assert_eq!(quote.amount_needed_for_free_delivery, Money::zero());
    }

    #[test]
    fn test_empty_lines() {
        let quote = price(&[], PaymentMethod::Gateway, &PricingConfig::default());
        assert_eq!(quote.subtotal, Money::zero());
        assert_eq!(quote.delivery_charge, m(7_000));
        assert!(quote.reconciles());
    }

    #[test]
    fn test_flat_tax_rule() {
        let lines = [PriceLine::new(m(100_000), 1)];
        let quote = price_with(
            &lines,
            PaymentMethod::Gateway,
            &PricingConfig::default(),
            &FlatTax(TaxRate::from_bps(300)),
        );
        assert_eq!(quote.tax_total, m(3_000));
        assert_eq!(quote.grand_total, m(103_000));
        assert!(quote.reconciles());
    }

    #[test]
    fn test_oversized_discount_clamps_to_zero() {
        let lines = [PriceLine::new(m(1_000), 1)];
        let quote = price_with(
            &lines,
            PaymentMethod::Cod,
            &PricingConfig::default(),
            &FixedDiscount(m(1_000_000)),
        );
        assert_eq!(quote.grand_total, Money::zero());
        assert_eq!(quote.discount_total, m(1_000 + 7_000 + 4_000));
        assert!(quote.reconciles());
    }

    #[test]
    fn test_reconciliation_and_delivery_properties() {
        let config = PricingConfig::default();
        let prices = [0, 1, 999, 4_999, 25_000, 49_999, 50_000, 123_457];
        let quantities = [1, 2, 3, 7];
        let discounts = [0, 500, 60_000, 10_000_000];

        for &p1 in &prices {
            for &p2 in &prices {
                for &q in &quantities {
                    for &d in &discounts {
                        for method in [PaymentMethod::Gateway, PaymentMethod::Cod] {
                            let lines = [PriceLine::new(m(p1), q), PriceLine::new(m(p2), 1)];
                            let quote = price_with(&lines, method, &config, &FixedDiscount(m(d)));

                            assert!(quote.reconciles(), "{quote:?}");
                            assert!(!quote.grand_total.is_negative());
                            assert_eq!(quote.subtotal, m(p1 * q + p2));

                            if quote.subtotal < config.free_delivery_threshold {
                                assert_eq!(quote.delivery_charge, config.base_delivery_charge);
                            } else {
                                assert_eq!(quote.delivery_charge, Money::zero());
                            }

                            // Same inputs, same outputs.
                            let again = price_with(&lines, method, &config, &FixedDiscount(m(d)));
                            assert_eq!(quote, again);
                        }
                    }
                }
            }
        }
    }
}
