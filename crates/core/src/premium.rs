//! The running technical premium carried between rating phases.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A technical premium: the scalar premium accumulator that flows from one
/// formula phase to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TechnicalPremium {
    pub value: Decimal,
}

impl TechnicalPremium {
    pub fn new(value: Decimal) -> Self {
        TechnicalPremium { value }
    }
}

impl From<Decimal> for TechnicalPremium {
    fn from(value: Decimal) -> Self {
        TechnicalPremium { value }
    }
}
