//! Charge schedules: basis/technical/exposure-factor tiers used to price a
//! premium component from a technical premium and an exposure amount.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An earned or waived portion of a charge: `factor` of the computed premium,
/// rounded to `rounding` places, floored at `minimum`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumPortion {
    pub factor: Decimal,
    #[serde(default)]
    pub rounding: u32,
    #[serde(default)]
    pub minimum: Decimal,
}

/// One bracket of a charge schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeTier {
    pub threshold: Decimal,
    #[serde(default)]
    pub basis: Decimal,
    #[serde(default)]
    pub technical_factor: Decimal,
    #[serde(default)]
    pub technical_rounding: u32,
    #[serde(default)]
    pub exposure_factor: Decimal,
    #[serde(default)]
    pub exposure_rounding: u32,
}

impl ChargeTier {
    /// A basis-only bracket: a fixed amount once the threshold is reached.
    pub fn basis_only(threshold: Decimal, basis: Decimal) -> Self {
        ChargeTier {
            threshold,
            basis,
            technical_factor: Decimal::ZERO,
            technical_rounding: 0,
            exposure_factor: Decimal::ZERO,
            exposure_rounding: 0,
        }
    }

    /// A bracket charging a factor of the technical premium.
    pub fn technical(threshold: Decimal, factor: Decimal, rounding: u32) -> Self {
        ChargeTier {
            threshold,
            basis: Decimal::ZERO,
            technical_factor: factor,
            technical_rounding: rounding,
            exposure_factor: Decimal::ZERO,
            exposure_rounding: 0,
        }
    }
}

/// A named charge schedule. Flat charges apply only the single highest
/// qualifying bracket; graduated charges sum contributions from every
/// qualifying bracket (progressive-tax style). `minimum` becomes the clamp
/// floor of the resulting line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Charge {
    pub name: String,
    #[serde(default)]
    pub premium_type_id: i32,
    pub tiers: Vec<ChargeTier>,
    #[serde(default)]
    pub minimum: Option<Decimal>,
    #[serde(default)]
    pub is_graduated: bool,
    #[serde(default)]
    pub earned: Option<PremiumPortion>,
    #[serde(default)]
    pub waived: Option<PremiumPortion>,
}

impl Charge {
    pub fn new(name: impl Into<String>, premium_type_id: i32, tiers: Vec<ChargeTier>) -> Self {
        Charge {
            name: name.into(),
            premium_type_id,
            tiers,
            minimum: None,
            is_graduated: false,
            earned: None,
            waived: None,
        }
    }

    pub fn graduated(mut self) -> Self {
        self.is_graduated = true;
        self
    }

    pub fn with_minimum(mut self, minimum: Decimal) -> Self {
        self.minimum = Some(minimum);
        self
    }
}

/// An ordered collection of charges. Criteria fields are usually a single
/// charge wrapped in a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Charges {
    pub items: Vec<Charge>,
}

impl Charges {
    pub fn new(items: Vec<Charge>) -> Self {
        Charges { items }
    }

    pub fn one(charge: Charge) -> Self {
        Charges {
            items: vec![charge],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
