//! Monetary amounts in minor currency units.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// A monetary amount, stored in the smallest currency unit (cents).
///
/// Using integer cents avoids floating-point rounding in totals. The amount
/// is unsigned: the domain has no negative prices or totals.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub fn cents(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// A strictly positive amount, as required for product prices.
    pub fn positive(cents: u64) -> DomainResult<Self> {
        if cents == 0 {
            return Err(DomainError::validation("price must be greater than zero"));
        }
        Ok(Self(cents))
    }

    /// Multiply by a quantity (line subtotal). Saturates on overflow rather
    /// than panicking; u64 cents makes overflow unreachable for realistic data.
    pub fn times(&self, quantity: u32) -> Money {
        Money(self.0.saturating_mul(u64::from(quantity)))
    }

    pub fn plus(&self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }
}

impl ValueObject for Money {}

impl core::fmt::Display for Money {
    /// Renders as a decimal amount with two fraction digits, e.g. `15.00`.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl core::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc.plus(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn displays_with_two_fraction_digits() {
        assert_eq!(Money::from_cents(1500).to_string(), "15.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(1234).to_string(), "12.34");
    }

    #[test]
    fn positive_rejects_zero() {
        let err = Money::positive(0).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(Money::positive(1).unwrap(), Money::from_cents(1));
    }

    #[test]
    fn times_multiplies_by_quantity() {
        assert_eq!(Money::from_cents(500).times(3), Money::from_cents(1500));
        assert_eq!(Money::from_cents(500).times(0), Money::ZERO);
    }

    proptest! {
        /// Property: summing is equivalent to adding cents (no rounding).
        #[test]
        fn sum_matches_cent_arithmetic(cents in proptest::collection::vec(0u64..1_000_000, 0..20)) {
            let total: Money = cents.iter().map(|c| Money::from_cents(*c)).sum();
            let expected: u64 = cents.iter().sum();
            prop_assert_eq!(total.cents(), expected);
        }
    }
}
