//! Rate tiers: breakpoints of a step function over the exposure axis.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One breakpoint in a tiered rate: for values at or above `threshold` the
/// applicable rate is `rate`. An `exclusive` tier marks a boundary whose own
/// value still carries the *previous* tier's rate; the new rate applies
/// strictly above it. A `None` rate means "no rate applies here" -- it is
/// semantically distinct from a rate of zero and propagates through the
/// algebra per each operator's null rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTier {
    pub threshold: Decimal,
    #[serde(default, skip_serializing_if = "is_false")]
    pub exclusive: bool,
    #[serde(default)]
    pub rate: Option<Decimal>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl RateTier {
    /// An inclusive tier at the given threshold.
    pub fn at(threshold: Decimal, rate: Option<Decimal>) -> Self {
        RateTier {
            threshold,
            exclusive: false,
            rate,
        }
    }

    /// A single flat tier at threshold zero. Nearly every scalar criteria
    /// entry (Xmod, ExpenseConstant, ...) is built this way.
    pub fn flat(rate: Decimal) -> Self {
        RateTier::at(Decimal::ZERO, Some(rate))
    }

    /// An exclusive tier at the given threshold.
    pub fn above(threshold: Decimal, rate: Option<Decimal>) -> Self {
        RateTier {
            threshold,
            exclusive: true,
            rate,
        }
    }

    /// Sort/uniqueness key: threshold ascending, inclusive before exclusive
    /// at equal threshold. The tie-break matters: it decides which side's
    /// rate is current at an exact boundary during a merge-sweep.
    pub fn order_key(&self) -> (Decimal, bool) {
        (self.threshold, self.exclusive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_key_sorts_inclusive_before_exclusive() {
        let inc = RateTier::at(dec!(100), Some(dec!(1)));
        let exc = RateTier::above(dec!(100), Some(dec!(2)));
        assert!(inc.order_key() < exc.order_key());
    }

    #[test]
    fn serde_omits_exclusive_when_false() {
        let t = RateTier::flat(dec!(1.25));
        let json = serde_json::to_value(&t).unwrap();
        assert!(json.get("exclusive").is_none());
        let back: RateTier = serde_json::from_value(json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn serde_null_rate_round_trips() {
        let t = RateTier::at(dec!(0), None);
        let json = serde_json::to_value(&t).unwrap();
        let back: RateTier = serde_json::from_value(json).unwrap();
        assert_eq!(back.rate, None);
    }
}
