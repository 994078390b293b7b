//! Formula representation: the ordered, data-defined instruction list that
//! drives a rating.
//!
//! Formulas arrive as JSON, one document per jurisdiction and effective
//! date:
//!
//! ```json
//! {
//!   "instructions": [
//!     { "operation": "Multiply", "operands": ["Payrolls", "BaseRates"] },
//!     { "operation": "Tally",    "operands": [{ "ref": 0 }] }
//!   ]
//! }
//! ```
//!
//! A bare string operand names a criteria field; `{ "ref": n }` names the
//! output of the n-th (earlier) instruction.

use serde::{Deserialize, Serialize};

/// Reference to one operand of an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperandRef {
    /// A named field on the calculation criteria.
    Field(String),
    /// The result of an earlier instruction, by position.
    Result {
        #[serde(rename = "ref")]
        index: usize,
    },
}

impl OperandRef {
    pub fn field(name: impl Into<String>) -> Self {
        OperandRef::Field(name.into())
    }

    pub fn result(index: usize) -> Self {
        OperandRef::Result { index }
    }
}

/// One operator invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub operation: String,
    pub operands: Vec<OperandRef>,
}

impl Instruction {
    pub fn new(operation: impl Into<String>, operands: Vec<OperandRef>) -> Self {
        Instruction {
            operation: operation.into(),
            operands,
        }
    }
}

/// An ordered sequence of instructions. Loaded once, compiled once,
/// evaluated many times; the final instruction's output is the formula's
/// result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    pub instructions: Vec<Instruction>,
}

impl Formula {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Formula { instructions }
    }
}
