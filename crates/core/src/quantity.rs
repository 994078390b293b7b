//! The closed set of rated quantity shapes.
//!
//! The engine dispatches operators over a tagged union instead of runtime
//! type introspection: every value a formula can name or produce is one of
//! these variants, and the resolver matches on the [`Shape`] discriminants
//! once at compile time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::charge::Charges;
use crate::factor::{ClassFactor, ClassHazardFactor, Factor};
use crate::line_item::LineItems;
use crate::premium::TechnicalPremium;

/// A rated quantity: a criteria field or an instruction result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Quantity {
    /// A bare decimal (e.g. `TotalMinimum`); `None` means not supplied.
    Scalar { value: Option<Decimal> },
    /// A scalar tiered quantity.
    Factor(Factor),
    /// A per-classification tiered factor.
    PerClass(ClassFactor),
    /// A per-classification, per-hazard-group tiered factor.
    PerClassHazard(ClassHazardFactor),
    /// A collection of charge schedules.
    Charges(Charges),
    /// Priced line items.
    LineItems(LineItems),
    /// The running technical premium.
    Premium(TechnicalPremium),
}

/// Fieldless discriminant of [`Quantity`], used for operator resolution and
/// error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Shape {
    Scalar,
    Factor,
    PerClass,
    PerClassHazard,
    Charges,
    LineItems,
    Premium,
}

impl Quantity {
    pub fn shape(&self) -> Shape {
        match self {
            Quantity::Scalar { .. } => Shape::Scalar,
            Quantity::Factor(_) => Shape::Factor,
            Quantity::PerClass(_) => Shape::PerClass,
            Quantity::PerClassHazard(_) => Shape::PerClassHazard,
            Quantity::Charges(_) => Shape::Charges,
            Quantity::LineItems(_) => Shape::LineItems,
            Quantity::Premium(_) => Shape::Premium,
        }
    }

    pub fn scalar(value: Decimal) -> Self {
        Quantity::Scalar { value: Some(value) }
    }

    pub fn premium(value: Decimal) -> Self {
        Quantity::Premium(TechnicalPremium::new(value))
    }

    /// Short description for diagnostics: the value's own name where it has
    /// one, plus its shape.
    pub fn describe(&self) -> String {
        match self {
            Quantity::Scalar { value: Some(v) } => format!("scalar {v}"),
            Quantity::Scalar { value: None } => "scalar <null>".to_string(),
            Quantity::Factor(f) => format!("factor '{}'", f.name),
            Quantity::PerClass(f) => format!("per-class factor '{}'", f.name),
            Quantity::PerClassHazard(f) => format!("per-class-hazard factor '{}'", f.name),
            Quantity::Charges(c) => format!("charges ({} items)", c.items.len()),
            Quantity::LineItems(l) => format!("line items ({} items)", l.items.len()),
            Quantity::Premium(p) => format!("premium {}", p.value),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Scalar => "Scalar",
            Shape::Factor => "Factor",
            Shape::PerClass => "PerClass",
            Shape::PerClassHazard => "PerClassHazard",
            Shape::Charges => "Charges",
            Shape::LineItems => "LineItems",
            Shape::Premium => "Premium",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn tagged_serde_round_trip() {
        let q = Quantity::Factor(Factor::flat("Xmod", dec!(1.08)));
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["kind"], "factor");
        assert_eq!(json["name"], "Xmod");
        let back: Quantity = serde_json::from_value(json).unwrap();
        assert_eq!(back, q);
    }

    #[test]
    fn scalar_null_round_trip() {
        let q = Quantity::Scalar { value: None };
        let json = serde_json::to_value(&q).unwrap();
        let back: Quantity = serde_json::from_value(json).unwrap();
        assert_eq!(back.shape(), Shape::Scalar);
        assert_eq!(back, q);
    }
}
