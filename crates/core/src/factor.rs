//! Factors: named tiered rates, optionally keyed per classification or per
//! classification and hazard group.

use serde::{Deserialize, Serialize};

use crate::tier::RateTier;

/// A scalar tiered quantity: a named step function with no classification
/// key (e.g. `Xmod`, `ExpenseConstant`, `TerritoryFactor`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub tiers: Vec<RateTier>,
}

impl Factor {
    pub fn new(name: impl Into<String>, tiers: Vec<RateTier>) -> Self {
        Factor {
            name: name.into(),
            tiers,
        }
    }

    /// A factor holding one flat tier, the common case for modifiers.
    pub fn flat(name: impl Into<String>, rate: rust_decimal::Decimal) -> Self {
        Factor::new(name, vec![RateTier::flat(rate)])
    }

    /// True when no tier carries a rate. The algebra treats such a factor
    /// the same as an absent one.
    pub fn is_empty(&self) -> bool {
        self.tiers.iter().all(|t| t.rate.is_none())
    }

    /// Rate of the first tier, if any. Scalar factors are read this way when
    /// combined with a technical premium.
    pub fn first_rate(&self) -> Option<rust_decimal::Decimal> {
        self.tiers.first().and_then(|t| t.rate)
    }
}

/// One classification's tier sequence inside a [`ClassFactor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorPart {
    pub classification: String,
    pub tiers: Vec<RateTier>,
}

impl FactorPart {
    pub fn new(classification: impl Into<String>, tiers: Vec<RateTier>) -> Self {
        FactorPart {
            classification: classification.into(),
            tiers,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.iter().all(|t| t.rate.is_none())
    }
}

/// A named per-classification factor (e.g. `Payrolls`, `BaseRates`).
///
/// Parts with duplicate classification keys are legal on input; reduction
/// collapses them into one tier sequence per key. An absent key means "no
/// rate for that classification", which is different from a present key
/// whose tiers are all null-rated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassFactor {
    pub name: String,
    pub parts: Vec<FactorPart>,
}

impl ClassFactor {
    pub fn new(name: impl Into<String>, parts: Vec<FactorPart>) -> Self {
        ClassFactor {
            name: name.into(),
            parts,
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        ClassFactor::new(name, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(|p| p.is_empty())
    }
}

/// One classification x hazard-group tier sequence inside a
/// [`ClassHazardFactor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardFactorPart {
    pub classification: String,
    pub hazard: String,
    pub tiers: Vec<RateTier>,
}

impl HazardFactorPart {
    pub fn new(
        classification: impl Into<String>,
        hazard: impl Into<String>,
        tiers: Vec<RateTier>,
    ) -> Self {
        HazardFactorPart {
            classification: classification.into(),
            hazard: hazard.into(),
            tiers,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.iter().all(|t| t.rate.is_none())
    }
}

/// The two-dimensional variant: rates keyed by classification and hazard
/// group. Accumulating over the hazard axis yields a [`ClassFactor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassHazardFactor {
    pub name: String,
    pub parts: Vec<HazardFactorPart>,
}

impl ClassHazardFactor {
    pub fn new(name: impl Into<String>, parts: Vec<HazardFactorPart>) -> Self {
        ClassHazardFactor {
            name: name.into(),
            parts,
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        ClassHazardFactor::new(name, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(|p| p.is_empty())
    }
}
