//! Reduction and combination of per-classification (and per-hazard-group)
//! factors.
//!
//! Reduction collapses duplicate keys into one minimal tier sequence per
//! key. Combination is LHS-driven: the result carries exactly the left
//! side's classification keys, and right-side keys with no left counterpart
//! are dropped.

use rust_decimal::Decimal;

use premia_core::{
    Charge, Charges, ClassFactor, ClassHazardFactor, Factor, FactorPart, HazardFactorPart,
    LineItem, LineItems, RateTier, RatingError,
};

use crate::scalar::round_away;
use crate::tiers::{self, RateOp};

/// Folds tier sequences sharing a key into one, first-appearance key order
/// preserved. Empty (all-null) parts are discarded before grouping.
fn reduce_groups<'a, I>(parts: I) -> Result<Vec<(String, Vec<RateTier>)>, RatingError>
where
    I: Iterator<Item = (String, &'a [RateTier])>,
{
    let mut groups: Vec<(String, Vec<RateTier>)> = Vec::new();
    for (key, tiers) in parts {
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((k, existing)) => {
                *existing = tiers::add_invariant(existing, tiers)
                    .map_err(|_| RatingError::DuplicateTier { context: k.clone() })?;
            }
            None => groups.push((key, tiers.to_vec())),
        }
    }
    for (key, tiers) in &mut groups {
        *tiers = tiers::simplify(tiers, key)?;
    }
    Ok(groups)
}

/// One minimal tier sequence per classification.
pub fn reduce_class(factor: &ClassFactor) -> Result<Vec<FactorPart>, RatingError> {
    let groups = reduce_groups(
        factor
            .parts
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| (p.classification.clone(), p.tiers.as_slice())),
    )?;
    Ok(groups
        .into_iter()
        .map(|(classification, tiers)| FactorPart {
            classification,
            tiers,
        })
        .collect())
}

/// One minimal tier sequence per `(classification, hazard)` pair.
pub fn reduce_class_hazard(
    factor: &ClassHazardFactor,
) -> Result<Vec<HazardFactorPart>, RatingError> {
    let groups = reduce_groups(factor.parts.iter().filter(|p| !p.is_empty()).map(|p| {
        (
            format!("{}\u{1f}{}", p.classification, p.hazard),
            p.tiers.as_slice(),
        )
    }))?;
    Ok(groups
        .into_iter()
        .map(|(key, tiers)| {
            let (classification, hazard) = key
                .split_once('\u{1f}')
                .expect("key built with separator above");
            HazardFactorPart {
                classification: classification.to_string(),
                hazard: hazard.to_string(),
                tiers,
            }
        })
        .collect())
}

/// Collapses the hazard axis, leaving one sequence per classification.
pub fn accumulate_hazard(factor: &ClassHazardFactor) -> Result<ClassFactor, RatingError> {
    let groups = reduce_groups(
        factor
            .parts
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| (p.classification.clone(), p.tiers.as_slice())),
    )?;
    Ok(ClassFactor::new(
        factor.name.clone(),
        groups
            .into_iter()
            .map(|(classification, tiers)| FactorPart {
                classification,
                tiers,
            })
            .collect(),
    ))
}

/// Pairwise combination over the LHS's classifications. An empty LHS yields
/// an empty result regardless of the RHS; RHS classifications absent from
/// the LHS never appear.
pub fn combine_class(
    lhs: &ClassFactor,
    rhs: &ClassFactor,
    rate_op: RateOp,
    name: &str,
) -> Result<ClassFactor, RatingError> {
    if lhs.is_empty() {
        return Ok(ClassFactor::empty(name));
    }
    let mut result = reduce_class(lhs)?;
    if !rhs.is_empty() {
        let reduced_rhs = reduce_class(rhs)?;
        for part in &mut result {
            if let Some(other) = reduced_rhs
                .iter()
                .find(|p| p.classification == part.classification)
            {
                part.tiers =
                    tiers::combine(&part.tiers, &other.tiers, rate_op, &part.classification)?;
            }
        }
    }
    Ok(ClassFactor::new(name, result))
}

/// Pairwise combination across the `(classification, hazard)` grid, same
/// LHS-driven key rules as [`combine_class`].
pub fn combine_class_hazard(
    lhs: &ClassHazardFactor,
    rhs: &ClassHazardFactor,
    rate_op: RateOp,
    name: &str,
) -> Result<ClassHazardFactor, RatingError> {
    if lhs.is_empty() {
        return Ok(ClassHazardFactor::empty(name));
    }
    let mut result = reduce_class_hazard(lhs)?;
    if !rhs.is_empty() {
        let reduced_rhs = reduce_class_hazard(rhs)?;
        for part in &mut result {
            if let Some(other) = reduced_rhs
                .iter()
                .find(|p| p.classification == part.classification && p.hazard == part.hazard)
            {
                part.tiers =
                    tiers::combine(&part.tiers, &other.tiers, rate_op, &part.classification)?;
            }
        }
    }
    Ok(ClassHazardFactor::new(name, result))
}

/// Freezes a per-class factor at one point of its axis: every
/// classification becomes a single flat tier holding its rate at `tier`.
pub fn filter_class(factor: &ClassFactor, tier: Decimal) -> Result<ClassFactor, RatingError> {
    let parts = reduce_class(factor)?
        .into_iter()
        .map(|part| {
            let rate = tiers::rate(&part.tiers, tier, &part.classification)?;
            Ok(FactorPart {
                classification: part.classification,
                tiers: vec![RateTier::at(Decimal::ZERO, rate)],
            })
        })
        .collect::<Result<Vec<_>, RatingError>>()?;
    Ok(ClassFactor::new(factor.name.clone(), parts))
}

/// Multiplies two per-class factors after freezing both at `tier`.
pub fn multiply_class_at_tier(
    lhs: &ClassFactor,
    rhs: &ClassFactor,
    tier: Decimal,
) -> Result<ClassFactor, RatingError> {
    let frozen_lhs = filter_class(lhs, tier)?;
    let frozen_rhs = filter_class(rhs, tier)?;
    combine_class(&frozen_lhs, &frozen_rhs, tiers::multiply_rates, &lhs.name)
}

/// Scales every classification's rates by a scalar factor's rate. An empty
/// factor scales by zero; a present but null rate nullifies the result.
pub fn multiply_class_by_factor(
    lhs: &ClassFactor,
    rhs: &Factor,
) -> Result<ClassFactor, RatingError> {
    let scale = if rhs.is_empty() {
        Some(Decimal::ZERO)
    } else {
        rhs.first_rate()
    };
    map_rates(lhs, |rate| match (rate, scale) {
        (Some(r), Some(s)) => Some(r * s),
        _ => None,
    })
}

/// Rounds every rate to `places`, away from zero. Null rates stay null.
pub fn round_class(factor: &ClassFactor, places: u32) -> Result<ClassFactor, RatingError> {
    map_rates(factor, |rate| rate.map(|r| round_away(r, places)))
}

/// Divides every rate by `divisor`. A null or zero divisor leaves rates
/// untouched, mirroring the neutral-divisor sentinel of the scalar algebra.
pub fn divide_class(
    factor: &ClassFactor,
    divisor: Option<Decimal>,
) -> Result<ClassFactor, RatingError> {
    match divisor {
        Some(d) if !d.is_zero() => map_rates(factor, |rate| rate.map(|r| r / d)),
        _ => map_rates(factor, |rate| rate),
    }
}

fn map_rates(
    factor: &ClassFactor,
    f: impl Fn(Option<Decimal>) -> Option<Decimal>,
) -> Result<ClassFactor, RatingError> {
    let parts = reduce_class(factor)?
        .into_iter()
        .map(|part| FactorPart {
            tiers: part
                .tiers
                .into_iter()
                .map(|t| RateTier {
                    rate: f(t.rate),
                    ..t
                })
                .collect(),
            classification: part.classification,
        })
        .collect();
    Ok(ClassFactor::new(factor.name.clone(), parts))
}

/// When every matched charge carries the same premium type it becomes the
/// default for classifications with no charge of their own.
fn default_premium_type(charges: &[&Charge]) -> i32 {
    let mut ids = charges.iter().map(|c| c.premium_type_id);
    match ids.next() {
        Some(first) if ids.all(|id| id == first) => first,
        _ => 0,
    }
}

/// Converts a per-class factor into line items, one per classification.
///
/// Each classification's rate at `tier` becomes the item premium. When a
/// charge collection is given, a charge whose name equals the classification
/// re-prices that item: its qualifying bracket's basis and technical factor
/// apply to the rate, its minimum becomes the clamp floor, and its earned
/// and waived portions follow the priced premium.
pub fn tally(
    factor: &ClassFactor,
    charges: Option<&Charges>,
    tier: Decimal,
) -> Result<LineItems, RatingError> {
    if factor.is_empty() {
        return Ok(LineItems::default());
    }
    let matched: Vec<&Charge> = charges.map(|c| c.items.iter().collect()).unwrap_or_default();
    let default_type = default_premium_type(&matched);

    let frozen = filter_class(factor, tier)?;
    let mut items = Vec::with_capacity(frozen.parts.len());
    for part in &frozen.parts {
        let rate = part.tiers.first().and_then(|t| t.rate);
        let charge = matched
            .iter()
            .find(|c| c.name == part.classification)
            .copied();
        let item = match charge {
            None => LineItem {
                premium: rate,
                ..LineItem::empty(&part.classification, default_type)
            },
            Some(charge) => {
                let brackets = crate::charge::qualifying_tiers(
                    &charge.tiers,
                    tier,
                    charge.is_graduated,
                    &charge.name,
                )?;
                // No qualifying bracket: the rate passes through while the
                // charge's floor and portions still apply.
                let priced = if brackets.is_empty() {
                    crate::charge::pass_through_line_item(charge, rate)
                } else {
                    let base = rate.unwrap_or(Decimal::ZERO);
                    crate::charge::charge_line_item(charge, base, Decimal::ZERO, tier)?
                };
                LineItem {
                    name: part.classification.clone(),
                    ..priced
                }
            }
        };
        items.push(item);
    }
    Ok(LineItems::new(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use premia_core::ChargeTier;
    use rust_decimal_macros::dec;

    fn part(class: &str, rate: Decimal) -> FactorPart {
        FactorPart::new(class, vec![RateTier::flat(rate)])
    }

    fn rate_of(factor: &ClassFactor, class: &str, at: Decimal) -> Option<Decimal> {
        let parts = reduce_class(factor).unwrap();
        let p = parts.iter().find(|p| p.classification == class)?;
        tiers::rate(&p.tiers, at, class).unwrap()
    }

    #[test]
    fn reduce_folds_duplicate_classifications() {
        let factor = ClassFactor::new(
            "Payrolls",
            vec![
                part("5403", dec!(100000)),
                part("8810", dec!(52000)),
                part("5403", dec!(20000)),
            ],
        );
        let reduced = reduce_class(&factor).unwrap();
        assert_eq!(reduced.len(), 2);
        assert_eq!(reduced[0].classification, "5403");
        assert_eq!(
            tiers::rate(&reduced[0].tiers, dec!(0), "t").unwrap(),
            Some(dec!(120000))
        );
    }

    #[test]
    fn reduce_discards_all_null_parts() {
        let factor = ClassFactor::new(
            "Payrolls",
            vec![
                FactorPart::new("5403", vec![RateTier::at(dec!(0), None)]),
                part("8810", dec!(52000)),
            ],
        );
        let reduced = reduce_class(&factor).unwrap();
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].classification, "8810");
    }

    #[test]
    fn combine_keeps_only_lhs_classifications() {
        let lhs = ClassFactor::new(
            "Payrolls",
            vec![part("5403", dec!(100)), part("8810", dec!(50))],
        );
        let rhs = ClassFactor::new(
            "BaseRates",
            vec![part("5403", dec!(2)), part("9999", dec!(7))],
        );
        let product = combine_class(&lhs, &rhs, tiers::multiply_rates, "Premiums").unwrap();
        assert_eq!(product.parts.len(), 2);
        assert_eq!(rate_of(&product, "5403", dec!(0)), Some(dec!(200)));
        // No RHS match leaves the LHS rate untouched (null-RHS rule).
        assert_eq!(rate_of(&product, "8810", dec!(0)), Some(dec!(50)));
        assert!(!product.parts.iter().any(|p| p.classification == "9999"));
    }

    #[test]
    fn combine_empty_lhs_is_empty() {
        let lhs = ClassFactor::empty("Payrolls");
        let rhs = ClassFactor::new("BaseRates", vec![part("5403", dec!(2))]);
        let sum = combine_class(&lhs, &rhs, tiers::add_rates, "Sum").unwrap();
        assert!(sum.is_empty());
    }

    #[test]
    fn filter_freezes_to_single_flat_tiers() {
        let factor = ClassFactor::new(
            "Rates",
            vec![FactorPart::new(
                "5403",
                vec![
                    RateTier::at(dec!(0), Some(dec!(1))),
                    RateTier::at(dec!(1000), Some(dec!(2))),
                ],
            )],
        );
        let frozen = filter_class(&factor, dec!(5000)).unwrap();
        assert_eq!(frozen.parts[0].tiers, vec![RateTier::flat(dec!(2))]);
    }

    #[test]
    fn divide_by_zero_is_neutral() {
        let factor = ClassFactor::new("F", vec![part("5403", dec!(10))]);
        let divided = divide_class(&factor, Some(dec!(0))).unwrap();
        assert_eq!(rate_of(&divided, "5403", dec!(0)), Some(dec!(10)));
        let halved = divide_class(&factor, Some(dec!(2))).unwrap();
        assert_eq!(rate_of(&halved, "5403", dec!(0)), Some(dec!(5)));
    }

    #[test]
    fn round_class_leaves_null_rates() {
        let factor = ClassFactor::new(
            "F",
            vec![
                part("5403", dec!(10.456)),
                FactorPart::new(
                    "8810",
                    vec![
                        RateTier::at(dec!(0), Some(dec!(1))),
                        RateTier::at(dec!(5), None),
                    ],
                ),
            ],
        );
        let rounded = round_class(&factor, 2).unwrap();
        assert_eq!(rate_of(&rounded, "5403", dec!(0)), Some(dec!(10.46)));
        assert_eq!(rate_of(&rounded, "8810", dec!(9)), None);
    }

    #[test]
    fn accumulate_hazard_collapses_to_classifications() {
        let factor = ClassHazardFactor::new(
            "DiseaseLoads",
            vec![
                HazardFactorPart::new("5403", "A", vec![RateTier::flat(dec!(10))]),
                HazardFactorPart::new("5403", "B", vec![RateTier::flat(dec!(5))]),
                HazardFactorPart::new("8810", "A", vec![RateTier::flat(dec!(2))]),
            ],
        );
        let collapsed = accumulate_hazard(&factor).unwrap();
        assert_eq!(rate_of(&collapsed, "5403", dec!(0)), Some(dec!(15)));
        assert_eq!(rate_of(&collapsed, "8810", dec!(0)), Some(dec!(2)));
    }

    #[test]
    fn tally_without_charges_uses_rates_as_premiums() {
        let factor = ClassFactor::new(
            "Premiums",
            vec![part("5403", dec!(1200)), part("8810", dec!(300))],
        );
        let items = tally(&factor, None, dec!(0)).unwrap();
        assert_eq!(items.items.len(), 2);
        assert_eq!(items.items[0].name, "5403");
        assert_eq!(items.items[0].premium, Some(dec!(1200)));
        assert_eq!(items.items[1].premium, Some(dec!(300)));
    }

    #[test]
    fn tally_matches_charges_by_classification() {
        let factor = ClassFactor::new(
            "Premiums",
            vec![part("5403", dec!(1000)), part("8810", dec!(300))],
        );
        let charges = Charges::one(
            Charge::new(
                "5403",
                6,
                vec![ChargeTier::technical(dec!(0), dec!(1.5), 0)],
            )
            .with_minimum(dec!(100)),
        );
        let items = tally(&factor, Some(&charges), dec!(0)).unwrap();
        let priced = &items.items[0];
        assert_eq!(priced.name, "5403");
        assert_eq!(priced.premium, Some(dec!(1500)));
        assert_eq!(priced.clamp_min, Some(dec!(100)));
        assert_eq!(priced.premium_type_id, 6);
        // Unmatched classification takes the common premium type.
        assert_eq!(items.items[1].premium_type_id, 6);
        assert_eq!(items.items[1].premium, Some(dec!(300)));
    }

    #[test]
    fn tally_passes_rate_through_when_no_bracket_qualifies() {
        let factor = ClassFactor::new("Premiums", vec![part("5403", dec!(1200))]);
        let charges = Charges::one(
            Charge::new(
                "5403",
                6,
                vec![ChargeTier::technical(dec!(5000), dec!(2), 0)],
            )
            .with_minimum(dec!(250)),
        );
        let items = tally(&factor, Some(&charges), dec!(0)).unwrap();
        let item = &items.items[0];
        assert_eq!(item.premium, Some(dec!(1200)));
        assert_eq!(item.clamp_min, Some(dec!(250)));
        assert_eq!(item.premium_type_id, 6);
    }

    #[test]
    fn multiply_by_factor_propagates_null_rate() {
        let lhs = ClassFactor::new("F", vec![part("5403", dec!(10))]);
        let null_rate = Factor::new(
            "Split",
            vec![
                RateTier::at(dec!(0), None),
                RateTier::at(dec!(10), Some(dec!(2))),
            ],
        );
        let scaled = multiply_class_by_factor(&lhs, &null_rate).unwrap();
        assert_eq!(rate_of(&scaled, "5403", dec!(0)), None);
        let empty = Factor::new("Empty", vec![]);
        let zeroed = multiply_class_by_factor(&lhs, &empty).unwrap();
        assert_eq!(rate_of(&zeroed, "5403", dec!(0)), Some(dec!(0)));
    }

    #[test]
    fn tally_empty_factor_is_empty() {
        let items = tally(&ClassFactor::empty("Premiums"), None, dec!(0)).unwrap();
        assert!(items.is_empty());
    }
}
