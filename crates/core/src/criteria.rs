//! Calculation criteria: the typed bag of named quantities a formula runs
//! against.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::charge::{Charge, Charges};
use crate::factor::{ClassFactor, ClassHazardFactor, Factor};
use crate::quantity::{Quantity, Shape};

/// Field name -> shape, extracted from a criteria document. The compiler
/// resolves operators against this; evaluation then only needs the values.
pub type CriteriaSchema = BTreeMap<String, Shape>;

/// A flat record of named rated quantities -- class payrolls, base rates,
/// modifiers, fee schedules. Built entirely by the caller before rating
/// starts; the engine reads it and never mutates it. Field names are the
/// vocabulary formula operands draw from (`"Payrolls"`, `"Xmod"`,
/// `"BlanketWaiverOfSubrogation"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct CalculationCriteria {
    fields: BTreeMap<String, Quantity>,
}

impl CalculationCriteria {
    pub fn new() -> Self {
        CalculationCriteria::default()
    }

    pub fn get(&self, name: &str) -> Option<&Quantity> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, quantity: Quantity) -> &mut Self {
        self.fields.insert(name.into(), quantity);
        self
    }

    /// A single-tier scalar factor, the common shape for modifiers.
    pub fn set_factor(&mut self, name: impl Into<String> + Clone, rate: Decimal) -> &mut Self {
        self.set(
            name.clone(),
            Quantity::Factor(Factor::flat(name.clone(), rate)),
        )
    }

    pub fn set_class_factor(&mut self, factor: ClassFactor) -> &mut Self {
        self.set(factor.name.clone(), Quantity::PerClass(factor))
    }

    pub fn set_class_hazard_factor(&mut self, factor: ClassHazardFactor) -> &mut Self {
        self.set(factor.name.clone(), Quantity::PerClassHazard(factor))
    }

    pub fn set_charge(&mut self, charge: Charge) -> &mut Self {
        self.set(charge.name.clone(), Quantity::Charges(Charges::one(charge)))
    }

    pub fn set_charges(&mut self, name: impl Into<String>, charges: Charges) -> &mut Self {
        self.set(name, Quantity::Charges(charges))
    }

    pub fn set_scalar(&mut self, name: impl Into<String>, value: Decimal) -> &mut Self {
        self.set(name, Quantity::scalar(value))
    }

    /// The shape of every field, for compile-time operator resolution.
    pub fn schema(&self) -> CriteriaSchema {
        self.fields
            .iter()
            .map(|(name, quantity)| (name.clone(), quantity.shape()))
            .collect()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}
