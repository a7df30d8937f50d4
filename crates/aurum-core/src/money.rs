//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A storefront that prices a ₹1,999.90 ring in floats eventually        │
//! │  charges ₹1,999.8999999 and the gateway rejects the amount.            │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Minor Units (paise)                              │
//! │    199990 paise × 2 = 399980 paise, exactly, every time                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Conversions to and from major units (rupees) only happen at the
//! formatting boundary, through [`Money::to_minor_units`] and
//! [`Money::to_major_units`]. Both go through `rust_decimal`, never `f64`.
//!
//! ## Usage
//! ```rust
//! use aurum_core::money::{Money, MinorUnitScale};
//!
//! let price = Money::from_minor(199_990); // ₹1,999.90
//! let doubled = price * 2;
//! assert_eq!(doubled.minor(), 399_980);
//!
//! let parsed = Money::to_minor_units("1999.90", MinorUnitScale::DEFAULT).unwrap();
//! assert_eq!(parsed, price);
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::TaxRate;

// =============================================================================
// Minor Unit Scale
// =============================================================================

/// How many minor units make one major unit (100 paise = 1 rupee).
///
/// This is the only currency-specific knowledge in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinorUnitScale(i64);

impl MinorUnitScale {
    /// Two decimal places, the common case (INR, USD, EUR).
    pub const DEFAULT: MinorUnitScale = MinorUnitScale(100);

    /// Creates a scale from a multiplier.
    ///
    /// Fails with `InvalidAmount` when the multiplier is not positive.
    pub fn new(multiplier: i64) -> CoreResult<Self> {
        if multiplier <= 0 {
            return Err(CoreError::InvalidAmount {
                input: multiplier.to_string(),
                reason: "minor unit multiplier must be positive".to_string(),
            });
        }
        Ok(MinorUnitScale(multiplier))
    }

    /// Returns the raw multiplier.
    #[inline]
    pub const fn multiplier(&self) -> i64 {
        self.0
    }

    /// Number of decimal places shown for display.
    ///
    /// Powers of ten map to their exponent; anything else falls back to 2.
    pub fn decimal_places(&self) -> u32 {
        let mut m = self.0;
        let mut places = 0;
        while m > 1 && m % 10 == 0 {
            m /= 10;
            places += 1;
        }
        if m == 1 {
            places
        } else {
            2
        }
    }
}

impl Default for MinorUnitScale {
    fn default() -> Self {
        MinorUnitScale::DEFAULT
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (paise for INR).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative intermediate values (refund deltas)
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **No float constructor**: there is deliberately no `from_f64`
///
/// ## Where Money Flows
/// ```text
/// Variant.price ──► CartItem.unit_price ──► OrderItem.line_total
///                                                │
///                      Pricing Engine ◄──────────┘
///                           │
///        subtotal + delivery + cod + tax − discount = grand_total
///                           │
///               PaymentRecord.paid_amount ──► refunds
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use aurum_core::money::Money;
    ///
    /// let price = Money::from_minor(4_000); // ₹40.00
    /// assert_eq!(price.minor(), 4_000);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative values to zero.
    #[inline]
    pub fn non_negative(self) -> Self {
        Money(self.0.max(0))
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use aurum_core::money::Money;
    ///
    /// let unit_price = Money::from_minor(5_000);
    /// assert_eq!(unit_price.multiply_quantity(2).minor(), 10_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Calculates tax at a basis-point rate, rounding half up.
    ///
    /// Uses i128 for the intermediate product so large order totals
    /// cannot overflow.
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_minor(tax as i64)
    }

    /// Parses a major-unit amount ("1999.90") into minor units.
    ///
    /// ## Rules
    /// - Input must be a plain decimal number (no currency symbol)
    /// - Negative input is rejected
    /// - Extra precision rounds to the nearest minor unit, half away from zero
    ///
    /// ## Example
    /// ```rust
    /// use aurum_core::money::{Money, MinorUnitScale};
    ///
    /// let scale = MinorUnitScale::DEFAULT;
    /// assert_eq!(Money::to_minor_units("410", scale).unwrap().minor(), 41_000);
    /// assert_eq!(Money::to_minor_units("0.005", scale).unwrap().minor(), 1);
    /// assert!(Money::to_minor_units("-1", scale).is_err());
    /// assert!(Money::to_minor_units("ten", scale).is_err());
    /// ```
    pub fn to_minor_units(major: &str, scale: MinorUnitScale) -> CoreResult<Money> {
        let trimmed = major.trim();
        let invalid = |reason: &str| CoreError::InvalidAmount {
            input: trimmed.to_string(),
            reason: reason.to_string(),
        };

        let value = Decimal::from_str(trimmed).map_err(|_| invalid("not a number"))?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(invalid("must not be negative"));
        }

        let minor = value
            .checked_mul(Decimal::from(scale.multiplier()))
            .ok_or_else(|| invalid("amount too large"))?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or_else(|| invalid("amount too large"))?;

        Ok(Money(minor))
    }

    /// Converts to a major-unit decimal for display.
    ///
    /// ## Example
    /// ```rust
    /// use aurum_core::money::{Money, MinorUnitScale};
    ///
    /// let major = Money::from_minor(41_000).to_major_units(MinorUnitScale::DEFAULT);
    /// assert_eq!(major.to_string(), "410.00");
    /// ```
    pub fn to_major_units(&self, scale: MinorUnitScale) -> Decimal {
        let mut major = Decimal::from(self.0) / Decimal::from(scale.multiplier());
        major.rescale(scale.decimal_places());
        major
    }

    /// Formats with a currency symbol, e.g. `₹410.00` or `-₹5.50`.
    pub fn format(&self, symbol: &str, scale: MinorUnitScale) -> String {
        let major = self.to_major_units(scale);
        if major.is_sign_negative() && !major.is_zero() {
            format!("-{}{}", symbol, major.abs())
        } else {
            format!("{}{}", symbol, major)
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain major-unit rendering at the default scale. Use [`Money::format`]
/// for customer-facing text.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_major_units(MinorUnitScale::DEFAULT))
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
