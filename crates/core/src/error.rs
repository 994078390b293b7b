/// All errors that can be returned by formula compilation or evaluation.
///
/// Every variant is structural: it signals a misconfigured formula or rate
/// table, never a transient condition. Callers should not retry; the fix is
/// always in the input data. Numeric edge cases (missing rates, zero
/// divisors) are handled by null-propagation and sentinel rules inside the
/// algebra and never surface here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RatingError {
    /// Two tiers in one sequence share the same (threshold, exclusive) key.
    #[error("duplicate tier levels in {context}")]
    DuplicateTier { context: String },

    /// No algebra implementation matches the operator and operand shapes.
    #[error("unknown operator '{operation}' for operands [{operands}]")]
    UnknownOperator { operation: String, operands: String },

    /// An operand names a criteria field that does not exist.
    #[error("unknown criteria field '{field}'")]
    UnknownField { field: String },

    /// An operand references an instruction at or past its own position.
    #[error("operand references instruction {index}, but only {len} precede it")]
    BadReference { index: usize, len: usize },

    /// A required operand was null or structurally unusable at point of use.
    #[error("invalid operand for '{operation}': {detail}")]
    InvalidOperand { operation: String, detail: String },

    /// A formula with no instructions cannot be compiled.
    #[error("formula has no instructions")]
    EmptyFormula,
}
