//! Scalar and technical-premium arithmetic, including the engine-wide
//! rounding convention and the divide-by-nothing sentinels.

use rust_decimal::{Decimal, RoundingStrategy};

use premia_core::{Factor, TechnicalPremium};

/// Midpoint rounds away from zero everywhere in the engine; 0.5 at zero
/// places becomes 1, -0.5 becomes -1.
pub fn round_away(value: Decimal, places: u32) -> Decimal {
    value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

pub fn add_premiums(left: &TechnicalPremium, right: &TechnicalPremium) -> TechnicalPremium {
    TechnicalPremium::new(left.value + right.value)
}

pub fn subtract_premiums(left: &TechnicalPremium, right: &TechnicalPremium) -> TechnicalPremium {
    TechnicalPremium::new(left.value - right.value)
}

/// `left - right` floored at zero; a discount can never push a premium
/// negative.
pub fn subtract_scalar_premium(left: Option<Decimal>, right: &TechnicalPremium) -> TechnicalPremium {
    let difference = left.unwrap_or(Decimal::ZERO) - right.value;
    TechnicalPremium::new(difference.max(Decimal::ZERO))
}

/// Division sentinels: a null numerator yields premium 0; a null or zero
/// divisor yields premium 1 (a neutral multiplier, not an error).
pub fn divide_premium(numerator: Option<Decimal>, divisor: Option<Decimal>) -> TechnicalPremium {
    let Some(numerator) = numerator else {
        return TechnicalPremium::new(Decimal::ZERO);
    };
    match divisor {
        None => TechnicalPremium::new(Decimal::ONE),
        Some(d) if d.is_zero() => TechnicalPremium::new(Decimal::ONE),
        Some(d) => TechnicalPremium::new(numerator / d),
    }
}

pub fn round_premium(premium: &TechnicalPremium, places: u32) -> TechnicalPremium {
    TechnicalPremium::new(round_away(premium.value, places))
}

/// The larger of a floor and a premium; a null floor counts as zero.
pub fn max_scalar_premium(floor: Option<Decimal>, premium: &TechnicalPremium) -> TechnicalPremium {
    TechnicalPremium::new(floor.unwrap_or(Decimal::ZERO).max(premium.value))
}

/// A scalar factor read as its first rate; an empty factor contributes zero.
pub fn factor_value(factor: &Factor) -> Decimal {
    if factor.is_empty() {
        Decimal::ZERO
    } else {
        factor.first_rate().unwrap_or(Decimal::ZERO)
    }
}

pub fn add_factor_premium(factor: &Factor, premium: &TechnicalPremium) -> TechnicalPremium {
    TechnicalPremium::new(factor_value(factor) + premium.value)
}

pub fn multiply_factor_premium(factor: &Factor, premium: &TechnicalPremium) -> TechnicalPremium {
    TechnicalPremium::new(factor_value(factor) * premium.value)
}

pub fn subtract_premium_factor(premium: &TechnicalPremium, factor: &Factor) -> TechnicalPremium {
    TechnicalPremium::new(premium.value - factor_value(factor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_midpoint_away_from_zero() {
        assert_eq!(round_away(dec!(0.5), 0), dec!(1));
        assert_eq!(round_away(dec!(-0.5), 0), dec!(-1));
        assert_eq!(round_away(dec!(2.345), 2), dec!(2.35));
        assert_eq!(round_away(dec!(2.5), 0), dec!(3));
    }

    #[test]
    fn divide_sentinels() {
        assert_eq!(
            divide_premium(None, Some(dec!(4))).value,
            dec!(0),
            "null numerator"
        );
        assert_eq!(divide_premium(Some(dec!(4)), None).value, dec!(1));
        assert_eq!(divide_premium(Some(dec!(4)), Some(dec!(0))).value, dec!(1));
        assert_eq!(divide_premium(Some(dec!(9)), Some(dec!(3))).value, dec!(3));
    }

    #[test]
    fn subtract_scalar_premium_floors_at_zero() {
        let p = TechnicalPremium::new(dec!(500));
        assert_eq!(subtract_scalar_premium(Some(dec!(200)), &p).value, dec!(0));
        assert_eq!(
            subtract_scalar_premium(Some(dec!(800)), &p).value,
            dec!(300)
        );
        assert_eq!(subtract_scalar_premium(None, &p).value, dec!(0));
    }

    #[test]
    fn empty_factor_reads_as_zero() {
        let f = Factor::new("Xmod", vec![]);
        let p = TechnicalPremium::new(dec!(100));
        assert_eq!(multiply_factor_premium(&f, &p).value, dec!(0));
        assert_eq!(add_factor_premium(&f, &p).value, dec!(100));
    }

    #[test]
    fn max_treats_null_floor_as_zero() {
        let p = TechnicalPremium::new(dec!(-25));
        assert_eq!(max_scalar_premium(None, &p).value, dec!(0));
        assert_eq!(max_scalar_premium(Some(dec!(250)), &p).value, dec!(250));
    }
}
