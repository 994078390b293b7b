//! The charge engine: turning charge schedules plus a technical premium and
//! exposure into priced line items.

use std::collections::BTreeSet;

use rust_decimal::Decimal;

use premia_core::{Charge, ChargeTier, Charges, LineItem, LineItems, PremiumPortion, RatingError, TechnicalPremium};

use crate::scalar::round_away;

/// Charge brackets sorted by ascending threshold; duplicate thresholds are
/// rejected because bracket selection would be ambiguous.
pub fn in_charge_order(tiers: &[ChargeTier], context: &str) -> Result<Vec<ChargeTier>, RatingError> {
    let mut seen: BTreeSet<Decimal> = BTreeSet::new();
    for tier in tiers {
        if !seen.insert(tier.threshold) {
            return Err(RatingError::DuplicateTier {
                context: context.to_string(),
            });
        }
    }
    let mut sorted = tiers.to_vec();
    sorted.sort_by_key(|t| t.threshold);
    Ok(sorted)
}

/// Brackets qualified by `value`. A flat schedule uses only the single
/// greatest threshold at or below `value`; a graduated schedule uses every
/// such bracket, in ascending order. Below every threshold nothing
/// qualifies.
pub fn qualifying_tiers(
    tiers: &[ChargeTier],
    value: Decimal,
    graduated: bool,
    context: &str,
) -> Result<Vec<ChargeTier>, RatingError> {
    let ordered = in_charge_order(tiers, context)?;
    let mut qualifying: Vec<ChargeTier> = ordered
        .into_iter()
        .take_while(|t| t.threshold <= value)
        .collect();
    if !graduated && qualifying.len() > 1 {
        qualifying = vec![qualifying.pop().expect("checked non-empty")];
    }
    Ok(qualifying)
}

/// `factor` of `premium`, rounded, floored at the portion minimum.
fn portion_amount(portion: &PremiumPortion, premium: Decimal) -> Decimal {
    let amount = round_away(portion.factor * premium, portion.rounding);
    amount.max(portion.minimum)
}

/// Prices one charge into a line item.
///
/// Each qualifying bracket contributes its basis, its technical factor
/// applied to the bracket delta, and its exposure factor applied to the
/// exposure, each product rounded per the bracket before it is added. The
/// delta is the technical premium itself for a flat schedule and the spread
/// between the bracket threshold and the technical premium for a graduated
/// one. The charge minimum becomes the clamp floor of the line item, never a
/// direct substitution.
pub fn charge_line_item(
    charge: &Charge,
    technical: Decimal,
    exposure: Decimal,
    tier_value: Decimal,
) -> Result<LineItem, RatingError> {
    let brackets = qualifying_tiers(&charge.tiers, tier_value, charge.is_graduated, &charge.name)?;
    let mut premium = Decimal::ZERO;
    for bracket in &brackets {
        let delta = if charge.is_graduated {
            bracket.threshold.max(technical) - bracket.threshold.min(technical)
        } else {
            technical
        };
        premium += bracket.basis
            + round_away(bracket.technical_factor * delta, bracket.technical_rounding)
            + round_away(bracket.exposure_factor * exposure, bracket.exposure_rounding);
    }
    Ok(LineItem {
        name: charge.name.clone(),
        premium_type_id: charge.premium_type_id,
        premium: Some(premium),
        clamp_min: charge.minimum,
        clamp_max: None,
        capacity_min: None,
        capacity_max: None,
        earned: charge.earned.as_ref().map(|p| portion_amount(p, premium)),
        waived: charge.waived.as_ref().map(|p| portion_amount(p, premium)),
    })
}

/// A charge with no qualifying bracket passes the caller's premium through
/// unchanged; the charge's floor and portions still apply.
pub fn pass_through_line_item(charge: &Charge, premium: Option<Decimal>) -> LineItem {
    let portion_base = premium.unwrap_or(Decimal::ZERO);
    LineItem {
        name: charge.name.clone(),
        premium_type_id: charge.premium_type_id,
        premium,
        clamp_min: charge.minimum,
        clamp_max: None,
        capacity_min: None,
        capacity_max: None,
        earned: charge
            .earned
            .as_ref()
            .map(|p| portion_amount(p, portion_base)),
        waived: charge
            .waived
            .as_ref()
            .map(|p| portion_amount(p, portion_base)),
    }
}

/// The regulatory amount over a collection total: the total clamped at the
/// regulatory charge's minimum. A poisoned total stays null.
fn regulatory_amount(charge: &Charge, total: Option<Decimal>) -> Option<Decimal> {
    let total = total?;
    match charge.minimum {
        Some(min) if total < min => Some(min),
        _ => Some(total),
    }
}

/// Prices every charge in a collection against the same technical premium,
/// exposure and bracket-selection value. When a regulatory charge rides
/// along, its amount is computed over the collection total.
pub fn apply_charges(
    charges: &Charges,
    technical: Decimal,
    exposure: Decimal,
    tier_value: Decimal,
    regulatory: Option<&Charge>,
) -> Result<LineItems, RatingError> {
    let items: Vec<LineItem> = charges
        .items
        .iter()
        .map(|charge| charge_line_item(charge, technical, exposure, tier_value))
        .collect::<Result<_, _>>()?;
    let collection = LineItems::new(items);
    let regulatory = regulatory.and_then(|c| regulatory_amount(c, collection.amount()));
    Ok(LineItems::with_regulatory(regulatory, collection.items))
}

/// Re-prices a charge over an existing collection, folding the collection
/// into a single combined line item.
///
/// The collection's amounts are accumulated and the charge schedule is
/// applied to that total; floors, earned and waived carried by the members
/// survive as the larger of the member sum and the charge's own values. Any
/// invalid member poisons the result into a single empty line item. With no
/// explicit bracket-selection value, brackets are selected at zero.
pub fn apply_over_items(
    charge: &Charge,
    items: &LineItems,
    tier_value: Option<Decimal>,
) -> Result<LineItems, RatingError> {
    if items.is_empty() {
        let item = charge_line_item(charge, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)?;
        return Ok(LineItems::new(vec![item]));
    }

    let mut total = Decimal::ZERO;
    let mut floor_sum = Decimal::ZERO;
    let mut earned_sum = Decimal::ZERO;
    let mut waived_sum = Decimal::ZERO;
    for item in &items.items {
        let calculated = item.calculate();
        let Some(amount) = calculated.amount else {
            let rejected = LineItem::empty(&charge.name, charge.premium_type_id);
            return Ok(LineItems::new(vec![rejected]));
        };
        total += amount;
        floor_sum += item.clamp_min.unwrap_or(Decimal::ZERO);
        earned_sum += item.earned.unwrap_or(Decimal::ZERO);
        waived_sum += item.waived.unwrap_or(Decimal::ZERO);
    }

    let tier_value = tier_value.unwrap_or(Decimal::ZERO);
    let repriced = charge_line_item(charge, total, Decimal::ZERO, tier_value)?;
    let combined = LineItem {
        name: charge.name.clone(),
        premium_type_id: charge.premium_type_id,
        premium: repriced.premium,
        clamp_min: Some(floor_sum.max(repriced.clamp_min.unwrap_or(Decimal::ZERO))),
        clamp_max: None,
        capacity_min: None,
        capacity_max: None,
        earned: Some(earned_sum.max(repriced.earned.unwrap_or(Decimal::ZERO))),
        waived: Some(waived_sum.max(repriced.waived.unwrap_or(Decimal::ZERO))),
    };
    Ok(LineItems::new(vec![combined]))
}

/// Collapses a collection to a technical premium: the sum of every valid
/// member's amount plus any regulatory amount. Invalid members contribute
/// nothing rather than poisoning the sum.
pub fn accumulate_items(items: &LineItems) -> TechnicalPremium {
    let mut total = Decimal::ZERO;
    for item in &items.items {
        if let Some(amount) = item.amount() {
            total += amount;
        }
    }
    total += items.regulatory.unwrap_or(Decimal::ZERO);
    TechnicalPremium::new(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn graduated_charge() -> Charge {
        // Progressive discount brackets over standard premium.
        Charge::new(
            "StandardPremiumDiscount",
            7,
            vec![
                ChargeTier::technical(dec!(0), dec!(0), 0),
                ChargeTier::technical(dec!(5000), dec!(0.095), 2),
                ChargeTier::technical(dec!(100000), dec!(0.119), 2),
            ],
        )
        .graduated()
    }

    #[test]
    fn duplicate_thresholds_rejected() {
        let tiers = vec![
            ChargeTier::basis_only(dec!(0), dec!(10)),
            ChargeTier::basis_only(dec!(0), dec!(20)),
        ];
        assert!(matches!(
            in_charge_order(&tiers, "Fee"),
            Err(RatingError::DuplicateTier { .. })
        ));
    }

    #[test]
    fn flat_uses_single_greatest_qualifying_bracket() {
        let tiers = vec![
            ChargeTier::basis_only(dec!(0), dec!(10)),
            ChargeTier::basis_only(dec!(1000), dec!(20)),
            ChargeTier::basis_only(dec!(5000), dec!(30)),
        ];
        let q = qualifying_tiers(&tiers, dec!(2500), false, "Fee").unwrap();
        assert_eq!(q.len(), 1);
        assert_eq!(q[0].basis, dec!(20));
    }

    #[test]
    fn graduated_uses_all_qualifying_brackets() {
        let tiers = graduated_charge().tiers;
        let q = qualifying_tiers(&tiers, dec!(150000), true, "Discount").unwrap();
        assert_eq!(q.len(), 3);
        let below = qualifying_tiers(&tiers, dec!(-1), true, "Discount").unwrap();
        assert!(below.is_empty());
    }

    #[test]
    fn flat_charge_prices_technical_factor() {
        let charge = Charge::new(
            "BlanketWaiver",
            3,
            vec![ChargeTier::technical(dec!(0), dec!(0.02), 0)],
        )
        .with_minimum(dec!(100));
        let item = charge_line_item(&charge, dec!(12345), dec!(0), dec!(12345)).unwrap();
        // 0.02 * 12345 = 246.9, rounded to 247.
        assert_eq!(item.premium, Some(dec!(247)));
        assert_eq!(item.clamp_min, Some(dec!(100)));
        assert_eq!(item.amount(), Some(dec!(247)));
    }

    #[test]
    fn flat_charge_minimum_clamps_not_replaces() {
        let charge = Charge::new(
            "BlanketWaiver",
            3,
            vec![ChargeTier::technical(dec!(0), dec!(0.02), 0)],
        )
        .with_minimum(dec!(100));
        let item = charge_line_item(&charge, dec!(1000), dec!(0), dec!(1000)).unwrap();
        assert_eq!(item.premium, Some(dec!(20)));
        assert_eq!(item.amount(), Some(dec!(100)));
    }

    #[test]
    fn graduated_charge_sums_bracket_spreads() {
        let charge = graduated_charge();
        let technical = dec!(150000);
        let item = charge_line_item(&charge, technical, dec!(0), technical).unwrap();
        // Bracket spreads against the technical premium:
        //   at 0:      |0 - 150000| * 0      = 0
        //   at 5000:   |5000 - 150000| * 0.095 = 13775.00
        //   at 100000: |100000 - 150000| * 0.119 = 5950.00
        assert_eq!(item.premium, Some(dec!(19725.00)));
    }

    #[test]
    fn below_all_brackets_prices_zero() {
        let charge = Charge::new(
            "Fee",
            1,
            vec![ChargeTier::basis_only(dec!(1000), dec!(50))],
        );
        let item = charge_line_item(&charge, dec!(500), dec!(0), dec!(500)).unwrap();
        assert_eq!(item.premium, Some(dec!(0)));
    }

    #[test]
    fn flat_vs_graduated_basis_brackets() {
        let tiers = vec![
            ChargeTier::basis_only(dec!(0), dec!(10)),
            ChargeTier::basis_only(dec!(1000), dec!(20)),
        ];
        let flat = Charge::new("Fee", 1, tiers.clone());
        let graduated = Charge::new("Fee", 1, tiers).graduated();
        let value = dec!(1500);
        assert_eq!(
            charge_line_item(&flat, value, dec!(0), value)
                .unwrap()
                .premium,
            Some(dec!(20))
        );
        assert_eq!(
            charge_line_item(&graduated, value, dec!(0), value)
                .unwrap()
                .premium,
            // No factors, so the two bases stack.
            Some(dec!(30))
        );
    }

    #[test]
    fn exposure_factor_prices_against_exposure() {
        let charge = Charge::new(
            "TerrorismPremium",
            9,
            vec![ChargeTier {
                threshold: dec!(0),
                basis: dec!(0),
                technical_factor: dec!(0),
                technical_rounding: 0,
                exposure_factor: dec!(0.03),
                exposure_rounding: 0,
            }],
        );
        let item = charge_line_item(&charge, dec!(0), dec!(41750), dec!(0)).unwrap();
        // 0.03 * 41750 = 1252.5, rounded away from zero to 1253.
        assert_eq!(item.premium, Some(dec!(1253)));
    }

    #[test]
    fn earned_and_waived_portions_follow_premium() {
        let charge = Charge {
            earned: Some(PremiumPortion {
                factor: dec!(0.25),
                rounding: 0,
                minimum: dec!(0),
            }),
            waived: Some(PremiumPortion {
                factor: dec!(0.1),
                rounding: 0,
                minimum: dec!(15),
            }),
            ..Charge::new("Fee", 1, vec![ChargeTier::basis_only(dec!(0), dec!(100))])
        };
        let item = charge_line_item(&charge, dec!(0), dec!(0), dec!(0)).unwrap();
        assert_eq!(item.earned, Some(dec!(25)));
        // 10 < portion minimum 15.
        assert_eq!(item.waived, Some(dec!(15)));
    }

    #[test]
    fn apply_charges_computes_regulatory_over_total() {
        let charges = Charges::new(vec![
            Charge::new("FeeA", 1, vec![ChargeTier::basis_only(dec!(0), dec!(100))]),
            Charge::new("FeeB", 2, vec![ChargeTier::basis_only(dec!(0), dec!(40))]),
        ]);
        let regulatory =
            Charge::new("StateFund", 8, vec![]).with_minimum(dec!(200));
        let items = apply_charges(&charges, dec!(0), dec!(0), dec!(0), Some(&regulatory)).unwrap();
        assert_eq!(items.items.len(), 2);
        // Total 140 is below the regulatory minimum of 200.
        assert_eq!(items.regulatory, Some(dec!(200)));
    }

    #[test]
    fn tierless_charge_passes_through_with_minimum() {
        let charges = Charges::new(vec![
            Charge::new("FeeA", 1, vec![ChargeTier::basis_only(dec!(0), dec!(40))]),
            Charge::new("StateFund", 8, vec![]).with_minimum(dec!(100)),
        ]);
        let items = apply_charges(&charges, dec!(0), dec!(0), dec!(0), None).unwrap();
        assert_eq!(items.items.len(), 2);
        // No brackets prices at zero, which the minimum then clamps up.
        assert_eq!(items.items[1].premium, Some(dec!(0)));
        assert_eq!(items.items[1].amount(), Some(dec!(100)));
    }

    #[test]
    fn apply_over_items_selects_bracket_at_zero_by_default() {
        let base = LineItems::new(vec![LineItem {
            premium: Some(dec!(1500)),
            ..LineItem::empty("A", 1)
        }]);
        let charge = Charge::new(
            "Fee",
            1,
            vec![
                ChargeTier::basis_only(dec!(0), dec!(10)),
                ChargeTier::basis_only(dec!(1000), dec!(20)),
            ],
        );
        let folded = apply_over_items(&charge, &base, None).unwrap();
        assert_eq!(folded.items[0].premium, Some(dec!(10)));
    }

    #[test]
    fn apply_over_items_folds_collection() {
        let base = LineItems::new(vec![
            LineItem {
                premium: Some(dec!(300)),
                clamp_min: Some(dec!(50)),
                ..LineItem::empty("A", 1)
            },
            LineItem {
                premium: Some(dec!(200)),
                ..LineItem::empty("B", 1)
            },
        ]);
        let charge = Charge::new(
            "Surcharge",
            4,
            vec![ChargeTier::technical(dec!(0), dec!(0.1), 0)],
        );
        let folded = apply_over_items(&charge, &base, None).unwrap();
        assert_eq!(folded.items.len(), 1);
        // 10% of the 500 total.
        assert_eq!(folded.items[0].premium, Some(dec!(50)));
        assert_eq!(folded.items[0].clamp_min, Some(dec!(50)));
    }

    #[test]
    fn apply_over_items_invalid_member_poisons() {
        let base = LineItems::new(vec![LineItem {
            premium: Some(dec!(300)),
            capacity_max: Some(dec!(100)),
            ..LineItem::empty("A", 1)
        }]);
        let charge = Charge::new(
            "Surcharge",
            4,
            vec![ChargeTier::technical(dec!(0), dec!(0.1), 0)],
        );
        let folded = apply_over_items(&charge, &base, None).unwrap();
        assert_eq!(folded.items.len(), 1);
        assert!(!folded.items[0].is_valid());
    }

    #[test]
    fn apply_over_items_empty_collection_prices_at_zero() {
        let charge = Charge::new(
            "Fee",
            1,
            vec![ChargeTier::basis_only(dec!(0), dec!(75))],
        );
        let folded = apply_over_items(&charge, &LineItems::default(), None).unwrap();
        assert_eq!(folded.items[0].premium, Some(dec!(75)));
    }

    #[test]
    fn accumulate_skips_invalid_and_adds_regulatory() {
        let items = LineItems::with_regulatory(
            Some(dec!(10)),
            vec![
                LineItem {
                    premium: Some(dec!(100)),
                    ..LineItem::empty("A", 1)
                },
                LineItem {
                    premium: Some(dec!(50)),
                    capacity_max: Some(dec!(20)),
                    ..LineItem::empty("B", 2)
                },
            ],
        );
        assert_eq!(accumulate_items(&items).value, dec!(110));
    }
}
