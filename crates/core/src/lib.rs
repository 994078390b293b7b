//! Core data model for the Premia rating engine.
//!
//! Everything a rating needs is expressed as a sparse step function of an
//! exposure/technical-premium axis ("tiered rate quantities"): scalar
//! modifiers, per-classification factors, charge schedules. These types are
//! pure data plus derived accessors; the algebra that combines them lives in
//! `premia-eval`.
//!
//! All monetary and rate values use `rust_decimal::Decimal` -- no `f64`
//! anywhere in the rating path.

pub mod charge;
pub mod criteria;
pub mod error;
pub mod factor;
pub mod formula;
pub mod line_item;
pub mod premium;
pub mod quantity;
pub mod tier;

pub use charge::{Charge, ChargeTier, Charges, PremiumPortion};
pub use criteria::{CalculationCriteria, CriteriaSchema};
pub use error::RatingError;
pub use factor::{ClassFactor, ClassHazardFactor, Factor, FactorPart, HazardFactorPart};
pub use formula::{Formula, Instruction, OperandRef};
pub use line_item::{LineItem, LineItemAmount, LineItems};
pub use premium::TechnicalPremium;
pub use quantity::{Quantity, Shape};
pub use tier::RateTier;
