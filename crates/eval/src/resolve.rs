//! Operator resolution: one closed table mapping `(operation name, operand
//! shapes)` to an implementation and a result shape.
//!
//! Resolution happens once, at formula compile time, against the criteria
//! schema. Evaluation then calls plain function pointers; no name or shape
//! lookups remain on the hot path. A signature missing from the table is an
//! unknown operator, reported with the operand shapes that failed to match.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use premia_core::{LineItems, Quantity, RatingError, Shape};

use crate::charge::{accumulate_items, apply_charges, apply_over_items};
use crate::reduce;
use crate::scalar;
use crate::tiers;

/// A resolved operator implementation. Operand count and shapes were checked
/// at resolution; the slice patterns inside re-check defensively and report
/// `InvalidOperand` rather than panicking.
pub type OpFn = fn(&[Quantity]) -> Result<Quantity, RatingError>;

/// Looks up `(operation, shapes)` in the table. `None` means no operator
/// with that name accepts operands of those shapes.
pub fn resolve(operation: &str, shapes: &[Shape]) -> Option<(OpFn, Shape)> {
    use Shape as S;
    let entry: (OpFn, Shape) = match (operation, shapes) {
        // ── Add ──────────────────────────────────────────────────────────
        ("Add", [S::PerClass, S::PerClass]) => (add_per_class, S::PerClass),
        ("Add", [S::PerClassHazard, S::PerClassHazard]) => {
            (add_per_class_hazard, S::PerClassHazard)
        }
        ("Add", [S::Factor, S::Factor]) => (add_factors, S::Factor),
        ("Add", [S::Premium, S::Premium]) => (add_premiums, S::Premium),
        ("Add", [S::Factor, S::Premium]) => (add_factor_premium, S::Premium),

        // ── AddInvariant ─────────────────────────────────────────────────
        ("AddInvariant", [S::PerClass, S::PerClass]) => (add_invariant_per_class, S::PerClass),
        ("AddInvariant", [S::PerClassHazard, S::PerClassHazard]) => {
            (add_invariant_per_class_hazard, S::PerClassHazard)
        }
        ("AddInvariant", [S::Factor, S::Factor]) => (add_invariant_factors, S::Factor),

        // ── Subtract ─────────────────────────────────────────────────────
        ("Subtract", [S::PerClass, S::PerClass]) => (subtract_per_class, S::PerClass),
        ("Subtract", [S::PerClassHazard, S::PerClassHazard]) => {
            (subtract_per_class_hazard, S::PerClassHazard)
        }
        ("Subtract", [S::Factor, S::Factor]) => (subtract_factors, S::Factor),
        ("Subtract", [S::Premium, S::Premium]) => (subtract_premiums, S::Premium),
        ("Subtract", [S::Premium, S::Factor]) => (subtract_premium_factor, S::Premium),
        ("Subtract", [S::Scalar, S::Premium]) => (subtract_scalar_premium, S::Premium),

        // ── Multiply ─────────────────────────────────────────────────────
        ("Multiply", [S::PerClass, S::PerClass]) => (multiply_per_class, S::PerClass),
        ("Multiply", [S::PerClassHazard, S::PerClassHazard]) => {
            (multiply_per_class_hazard, S::PerClassHazard)
        }
        ("Multiply", [S::Factor, S::Factor]) => (multiply_factors, S::Factor),
        ("Multiply", [S::PerClass, S::PerClass, S::Scalar]) => {
            (multiply_per_class_at_scalar, S::PerClass)
        }
        ("Multiply", [S::PerClass, S::PerClass, S::Premium]) => {
            (multiply_per_class_at_premium, S::PerClass)
        }
        ("Multiply", [S::PerClass, S::Factor]) => (multiply_per_class_factor, S::PerClass),
        ("Multiply", [S::Factor, S::Premium]) => (multiply_factor_premium, S::Premium),

        // ── Divide ───────────────────────────────────────────────────────
        ("Divide", [S::Premium, S::Premium]) => (divide_premiums, S::Premium),
        ("Divide", [S::Premium, S::Scalar]) => (divide_premium_scalar, S::Premium),
        ("Divide", [S::Scalar, S::Premium]) => (divide_scalar_premium, S::Premium),
        ("Divide", [S::PerClass, S::Scalar]) => (divide_per_class, S::PerClass),

        // ── Round / Max ──────────────────────────────────────────────────
        ("Round", [S::Premium, S::Scalar]) => (round_premium, S::Premium),
        ("Round", [S::Scalar, S::Premium]) => (round_premium_swapped, S::Premium),
        ("Round", [S::PerClass, S::Scalar]) => (round_per_class, S::PerClass),
        ("Max", [S::Scalar, S::Premium]) => (max_scalar_premium, S::Premium),

        // ── Tally ────────────────────────────────────────────────────────
        ("Tally", [S::PerClass]) => (tally_plain, S::LineItems),
        ("Tally", [S::PerClass, S::Scalar]) => (tally_at, S::LineItems),
        ("Tally", [S::PerClass, S::Charges]) => (tally_charged, S::LineItems),
        ("Tally", [S::PerClass, S::Charges, S::Scalar]) => (tally_charged_at, S::LineItems),

        // ── Apply ────────────────────────────────────────────────────────
        ("Apply", [S::Charges, S::Premium]) => (apply_to_premium, S::LineItems),
        ("Apply", [S::Charges, S::Premium, S::Scalar]) => (apply_with_exposure, S::LineItems),
        ("Apply", [S::Charges, S::Premium, S::Scalar, S::Premium]) => {
            (apply_with_tier, S::LineItems)
        }
        ("Apply", [S::Charges, S::Premium, S::Scalar, S::Premium, S::Charges]) => {
            (apply_with_regulatory, S::LineItems)
        }
        ("Apply", [S::Charges, S::LineItems]) => (apply_over, S::LineItems),
        ("Apply", [S::Charges, S::LineItems, S::Premium]) => (apply_over_at, S::LineItems),

        // ── Accumulate / Filter ──────────────────────────────────────────
        ("Accumulate", [S::LineItems]) => (accumulate_line_items, S::Premium),
        ("Accumulate", [S::PerClassHazard]) => (accumulate_hazard_axis, S::PerClass),
        ("Filter", [S::PerClass, S::Scalar]) => (filter_at_scalar, S::PerClass),
        ("Filter", [S::PerClass, S::Premium]) => (filter_at_premium, S::PerClass),

        _ => return None,
    };
    Some(entry)
}

fn mismatch(operation: &str, operands: &[Quantity]) -> RatingError {
    RatingError::InvalidOperand {
        operation: operation.to_string(),
        detail: operands
            .iter()
            .map(Quantity::describe)
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Scalar rounding places; null means zero places.
fn places(value: Option<Decimal>, operation: &str) -> Result<u32, RatingError> {
    match value {
        None => Ok(0),
        Some(v) => v.to_u32().ok_or_else(|| RatingError::InvalidOperand {
            operation: operation.to_string(),
            detail: format!("rounding places {v} is not a non-negative integer"),
        }),
    }
}

// ── Add ──────────────────────────────────────────────────────────────────

fn add_per_class(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClass(l), Quantity::PerClass(r)] => Ok(Quantity::PerClass(
            reduce::combine_class(l, r, tiers::add_rates, &l.name)?,
        )),
        _ => Err(mismatch("Add", operands)),
    }
}

fn add_per_class_hazard(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClassHazard(l), Quantity::PerClassHazard(r)] => Ok(Quantity::PerClassHazard(
            reduce::combine_class_hazard(l, r, tiers::add_rates, &l.name)?,
        )),
        _ => Err(mismatch("Add", operands)),
    }
}

fn add_factors(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Factor(l), Quantity::Factor(r)] => Ok(Quantity::Factor(
            premia_core::Factor::new(l.name.clone(), tiers::add(&l.tiers, &r.tiers)?),
        )),
        _ => Err(mismatch("Add", operands)),
    }
}

fn add_premiums(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Premium(l), Quantity::Premium(r)] => {
            Ok(Quantity::Premium(scalar::add_premiums(l, r)))
        }
        _ => Err(mismatch("Add", operands)),
    }
}

fn add_factor_premium(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Factor(f), Quantity::Premium(p)] => {
            Ok(Quantity::Premium(scalar::add_factor_premium(f, p)))
        }
        _ => Err(mismatch("Add", operands)),
    }
}

// ── AddInvariant ─────────────────────────────────────────────────────────

fn add_invariant_per_class(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClass(l), Quantity::PerClass(r)] => Ok(Quantity::PerClass(
            reduce::combine_class(l, r, tiers::add_invariant_rates, &l.name)?,
        )),
        _ => Err(mismatch("AddInvariant", operands)),
    }
}

fn add_invariant_per_class_hazard(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClassHazard(l), Quantity::PerClassHazard(r)] => Ok(Quantity::PerClassHazard(
            reduce::combine_class_hazard(l, r, tiers::add_invariant_rates, &l.name)?,
        )),
        _ => Err(mismatch("AddInvariant", operands)),
    }
}

fn add_invariant_factors(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Factor(l), Quantity::Factor(r)] => Ok(Quantity::Factor(
            premia_core::Factor::new(l.name.clone(), tiers::add_invariant(&l.tiers, &r.tiers)?),
        )),
        _ => Err(mismatch("AddInvariant", operands)),
    }
}

// ── Subtract ─────────────────────────────────────────────────────────────

fn subtract_per_class(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClass(l), Quantity::PerClass(r)] => Ok(Quantity::PerClass(
            reduce::combine_class(l, r, tiers::subtract_rates, &l.name)?,
        )),
        _ => Err(mismatch("Subtract", operands)),
    }
}

fn subtract_per_class_hazard(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClassHazard(l), Quantity::PerClassHazard(r)] => Ok(Quantity::PerClassHazard(
            reduce::combine_class_hazard(l, r, tiers::subtract_rates, &l.name)?,
        )),
        _ => Err(mismatch("Subtract", operands)),
    }
}

fn subtract_factors(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Factor(l), Quantity::Factor(r)] => Ok(Quantity::Factor(
            premia_core::Factor::new(l.name.clone(), tiers::subtract(&l.tiers, &r.tiers)?),
        )),
        _ => Err(mismatch("Subtract", operands)),
    }
}

fn subtract_premiums(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Premium(l), Quantity::Premium(r)] => {
            Ok(Quantity::Premium(scalar::subtract_premiums(l, r)))
        }
        _ => Err(mismatch("Subtract", operands)),
    }
}

fn subtract_premium_factor(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Premium(p), Quantity::Factor(f)] => {
            Ok(Quantity::Premium(scalar::subtract_premium_factor(p, f)))
        }
        _ => Err(mismatch("Subtract", operands)),
    }
}

fn subtract_scalar_premium(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Scalar { value }, Quantity::Premium(p)] => {
            Ok(Quantity::Premium(scalar::subtract_scalar_premium(*value, p)))
        }
        _ => Err(mismatch("Subtract", operands)),
    }
}

// ── Multiply ─────────────────────────────────────────────────────────────

fn multiply_per_class(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClass(l), Quantity::PerClass(r)] => Ok(Quantity::PerClass(
            reduce::combine_class(l, r, tiers::multiply_rates, &l.name)?,
        )),
        _ => Err(mismatch("Multiply", operands)),
    }
}

fn multiply_per_class_hazard(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClassHazard(l), Quantity::PerClassHazard(r)] => Ok(Quantity::PerClassHazard(
            reduce::combine_class_hazard(l, r, tiers::multiply_rates, &l.name)?,
        )),
        _ => Err(mismatch("Multiply", operands)),
    }
}

fn multiply_factors(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Factor(l), Quantity::Factor(r)] => Ok(Quantity::Factor(
            premia_core::Factor::new(l.name.clone(), tiers::multiply(&l.tiers, &r.tiers)?),
        )),
        _ => Err(mismatch("Multiply", operands)),
    }
}

fn multiply_per_class_at_scalar(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClass(l), Quantity::PerClass(r), Quantity::Scalar { value }] => {
            let tier = value.unwrap_or(Decimal::ZERO);
            Ok(Quantity::PerClass(reduce::multiply_class_at_tier(
                l, r, tier,
            )?))
        }
        _ => Err(mismatch("Multiply", operands)),
    }
}

fn multiply_per_class_at_premium(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClass(l), Quantity::PerClass(r), Quantity::Premium(p)] => Ok(
            Quantity::PerClass(reduce::multiply_class_at_tier(l, r, p.value)?),
        ),
        _ => Err(mismatch("Multiply", operands)),
    }
}

fn multiply_per_class_factor(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClass(l), Quantity::Factor(f)] => Ok(Quantity::PerClass(
            reduce::multiply_class_by_factor(l, f)?,
        )),
        _ => Err(mismatch("Multiply", operands)),
    }
}

fn multiply_factor_premium(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Factor(f), Quantity::Premium(p)] => {
            Ok(Quantity::Premium(scalar::multiply_factor_premium(f, p)))
        }
        _ => Err(mismatch("Multiply", operands)),
    }
}

// ── Divide ───────────────────────────────────────────────────────────────

fn divide_premiums(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Premium(l), Quantity::Premium(r)] => Ok(Quantity::Premium(
            scalar::divide_premium(Some(l.value), Some(r.value)),
        )),
        _ => Err(mismatch("Divide", operands)),
    }
}

fn divide_premium_scalar(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Premium(l), Quantity::Scalar { value }] => Ok(Quantity::Premium(
            scalar::divide_premium(Some(l.value), *value),
        )),
        _ => Err(mismatch("Divide", operands)),
    }
}

fn divide_scalar_premium(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Scalar { value }, Quantity::Premium(p)] => Ok(Quantity::Premium(
            scalar::divide_premium(*value, Some(p.value)),
        )),
        _ => Err(mismatch("Divide", operands)),
    }
}

fn divide_per_class(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClass(f), Quantity::Scalar { value }] => {
            Ok(Quantity::PerClass(reduce::divide_class(f, *value)?))
        }
        _ => Err(mismatch("Divide", operands)),
    }
}

// ── Round / Max ──────────────────────────────────────────────────────────

fn round_premium(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Premium(p), Quantity::Scalar { value }] => Ok(Quantity::Premium(
            scalar::round_premium(p, places(*value, "Round")?),
        )),
        _ => Err(mismatch("Round", operands)),
    }
}

fn round_premium_swapped(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Scalar { value }, Quantity::Premium(p)] => Ok(Quantity::Premium(
            scalar::round_premium(p, places(*value, "Round")?),
        )),
        _ => Err(mismatch("Round", operands)),
    }
}

fn round_per_class(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClass(f), Quantity::Scalar { value }] => Ok(Quantity::PerClass(
            reduce::round_class(f, places(*value, "Round")?)?,
        )),
        _ => Err(mismatch("Round", operands)),
    }
}

fn max_scalar_premium(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Scalar { value }, Quantity::Premium(p)] => {
            Ok(Quantity::Premium(scalar::max_scalar_premium(*value, p)))
        }
        _ => Err(mismatch("Max", operands)),
    }
}

// ── Tally ────────────────────────────────────────────────────────────────

fn tally_plain(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClass(f)] => Ok(Quantity::LineItems(reduce::tally(
            f,
            None,
            Decimal::ZERO,
        )?)),
        _ => Err(mismatch("Tally", operands)),
    }
}

fn tally_at(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClass(f), Quantity::Scalar { value }] => Ok(Quantity::LineItems(
            reduce::tally(f, None, value.unwrap_or(Decimal::ZERO))?,
        )),
        _ => Err(mismatch("Tally", operands)),
    }
}

fn tally_charged(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClass(f), Quantity::Charges(c)] => Ok(Quantity::LineItems(reduce::tally(
            f,
            Some(c),
            Decimal::ZERO,
        )?)),
        _ => Err(mismatch("Tally", operands)),
    }
}

fn tally_charged_at(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClass(f), Quantity::Charges(c), Quantity::Scalar { value }] => {
            Ok(Quantity::LineItems(reduce::tally(
                f,
                Some(c),
                value.unwrap_or(Decimal::ZERO),
            )?))
        }
        _ => Err(mismatch("Tally", operands)),
    }
}

// ── Apply ────────────────────────────────────────────────────────────────

fn apply_to_premium(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        // Without an explicit tier operand, brackets are selected at zero.
        [Quantity::Charges(c), Quantity::Premium(p)] => Ok(Quantity::LineItems(apply_charges(
            c,
            p.value,
            Decimal::ZERO,
            Decimal::ZERO,
            None,
        )?)),
        _ => Err(mismatch("Apply", operands)),
    }
}

fn apply_with_exposure(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Charges(c), Quantity::Premium(p), Quantity::Scalar { value }] => {
            let exposure = value.unwrap_or(Decimal::ZERO);
            Ok(Quantity::LineItems(apply_charges(
                c,
                p.value,
                exposure,
                Decimal::ZERO,
                None,
            )?))
        }
        _ => Err(mismatch("Apply", operands)),
    }
}

fn apply_with_tier(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Charges(c), Quantity::Premium(p), Quantity::Scalar { value }, Quantity::Premium(tier)] => {
            let exposure = value.unwrap_or(Decimal::ZERO);
            Ok(Quantity::LineItems(apply_charges(
                c, p.value, exposure, tier.value, None,
            )?))
        }
        _ => Err(mismatch("Apply", operands)),
    }
}

fn apply_with_regulatory(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Charges(c), Quantity::Premium(p), Quantity::Scalar { value }, Quantity::Premium(tier), Quantity::Charges(reg)] =>
        {
            let exposure = value.unwrap_or(Decimal::ZERO);
            Ok(Quantity::LineItems(apply_charges(
                c,
                p.value,
                exposure,
                tier.value,
                reg.items.first(),
            )?))
        }
        _ => Err(mismatch("Apply", operands)),
    }
}

fn apply_over(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Charges(c), Quantity::LineItems(items)] => match c.items.first() {
            Some(charge) => Ok(Quantity::LineItems(apply_over_items(charge, items, None)?)),
            None => Ok(Quantity::LineItems(LineItems::default())),
        },
        _ => Err(mismatch("Apply", operands)),
    }
}

fn apply_over_at(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::Charges(c), Quantity::LineItems(items), Quantity::Premium(tier)] => {
            match c.items.first() {
                Some(charge) => Ok(Quantity::LineItems(apply_over_items(
                    charge,
                    items,
                    Some(tier.value),
                )?)),
                None => Ok(Quantity::LineItems(LineItems::default())),
            }
        }
        _ => Err(mismatch("Apply", operands)),
    }
}

// ── Accumulate / Filter ──────────────────────────────────────────────────

fn accumulate_line_items(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::LineItems(items)] => Ok(Quantity::Premium(accumulate_items(items))),
        _ => Err(mismatch("Accumulate", operands)),
    }
}

fn accumulate_hazard_axis(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClassHazard(f)] => {
            Ok(Quantity::PerClass(reduce::accumulate_hazard(f)?))
        }
        _ => Err(mismatch("Accumulate", operands)),
    }
}

fn filter_at_scalar(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClass(f), Quantity::Scalar { value }] => Ok(Quantity::PerClass(
            reduce::filter_class(f, value.unwrap_or(Decimal::ZERO))?,
        )),
        _ => Err(mismatch("Filter", operands)),
    }
}

fn filter_at_premium(operands: &[Quantity]) -> Result<Quantity, RatingError> {
    match operands {
        [Quantity::PerClass(f), Quantity::Premium(p)] => Ok(Quantity::PerClass(
            reduce::filter_class(f, p.value)?,
        )),
        _ => Err(mismatch("Filter", operands)),
    }
}
