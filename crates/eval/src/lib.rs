//! Formula evaluation for the Premia rating engine.
//!
//! The pipeline is compile-then-evaluate:
//!
//! ```
//! use premia_core::{CalculationCriteria, ClassFactor, FactorPart, Formula,
//!                   Instruction, OperandRef, RateTier};
//! use rust_decimal_macros::dec;
//!
//! let mut criteria = CalculationCriteria::new();
//! criteria.set_class_factor(ClassFactor::new(
//!     "Payrolls",
//!     vec![FactorPart::new("8810", vec![RateTier::flat(dec!(50000))])],
//! ));
//! criteria.set_class_factor(ClassFactor::new(
//!     "BaseRates",
//!     vec![FactorPart::new("8810", vec![RateTier::flat(dec!(0.5))])],
//! ));
//!
//! let formula = Formula::new(vec![
//!     Instruction::new("Multiply", vec![
//!         OperandRef::field("Payrolls"),
//!         OperandRef::field("BaseRates"),
//!     ]),
//!     Instruction::new("Tally", vec![OperandRef::result(0)]),
//!     Instruction::new("Accumulate", vec![OperandRef::result(1)]),
//! ]);
//!
//! let result = premia_eval::rate(&formula, &criteria).unwrap();
//! assert_eq!(result.premium(), Some(dec!(25000)));
//! ```
//!
//! Compilation resolves operators against the criteria's field shapes and
//! reports every structural problem up front; evaluation is then pure
//! decimal arithmetic over the algebra in [`tiers`], [`reduce`], [`charge`]
//! and [`scalar`].

pub mod charge;
pub mod compile;
pub mod reduce;
pub mod resolve;
pub mod scalar;
pub mod tiers;

pub use compile::{compile, CompiledFormula, RatingPhase, RatingResult};
pub use resolve::{resolve, OpFn};

use premia_core::{CalculationCriteria, Formula, RatingError};

/// Compiles the formula against the criteria's schema and evaluates it once.
/// Callers rating many risks against one formula should [`compile`] once and
/// reuse the [`CompiledFormula`].
pub fn rate(
    formula: &Formula,
    criteria: &CalculationCriteria,
) -> Result<RatingResult, RatingError> {
    compile(formula, &criteria.schema())?.evaluate(criteria)
}
