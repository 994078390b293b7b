//! Line items: priced premium components with clamp, capacity, earned and
//! waived semantics.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One priced component of a premium. The stored fields are set once when
/// the charge is applied; `amount()` and `is_valid()` are computed from them
/// on demand and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    #[serde(default)]
    pub premium_type_id: i32,
    #[serde(default)]
    pub premium: Option<Decimal>,
    #[serde(default)]
    pub clamp_min: Option<Decimal>,
    #[serde(default)]
    pub clamp_max: Option<Decimal>,
    #[serde(default)]
    pub capacity_min: Option<Decimal>,
    #[serde(default)]
    pub capacity_max: Option<Decimal>,
    #[serde(default)]
    pub earned: Option<Decimal>,
    #[serde(default)]
    pub waived: Option<Decimal>,
}

/// The outcome of running the clamp/capacity state machine once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItemAmount {
    pub is_valid: bool,
    pub clamp_min_hit: bool,
    pub clamp_max_hit: bool,
    pub capacity_min_hit: bool,
    pub capacity_max_hit: bool,
    pub amount: Option<Decimal>,
}

impl LineItem {
    /// An empty, invalid line item carrying only identity. Produced when a
    /// charge application is rejected partway through.
    pub fn empty(name: impl Into<String>, premium_type_id: i32) -> Self {
        LineItem {
            name: name.into(),
            premium_type_id,
            premium: None,
            clamp_min: None,
            clamp_max: None,
            capacity_min: None,
            capacity_max: None,
            earned: None,
            waived: None,
        }
    }

    /// Evaluate the clamp/capacity state machine.
    ///
    /// Order is significant and preserved from observed production behavior:
    /// 1. No premium -> invalid, no amount.
    /// 2. Clamp to [clamp_min, clamp_max], recording which bounds fired.
    /// 3. If BOTH clamps fired the clamped amount is final and the capacity
    ///    checks are skipped entirely.
    /// 4. Otherwise a violated capacity bound invalidates the item with no
    ///    amount -- a business rejection ("out of writable capacity"), not a
    ///    numeric failure.
    /// 5. Otherwise subtract the waived portion, floored at zero.
    pub fn calculate(&self) -> LineItemAmount {
        let mut result = LineItemAmount {
            is_valid: false,
            clamp_min_hit: false,
            clamp_max_hit: false,
            capacity_min_hit: false,
            capacity_max_hit: false,
            amount: None,
        };

        let Some(premium) = self.premium else {
            return result;
        };
        let mut amount = premium;

        if let Some(min) = self.clamp_min {
            if amount < min {
                result.clamp_min_hit = true;
                amount = min;
            }
        }
        if let Some(max) = self.clamp_max {
            if max < amount {
                result.clamp_max_hit = true;
                amount = max;
            }
        }

        if result.clamp_min_hit && result.clamp_max_hit {
            result.amount = Some(amount);
            result.is_valid = true;
            return result;
        }

        if let Some(min) = self.capacity_min {
            if amount < min {
                result.capacity_min_hit = true;
            }
        }
        if let Some(max) = self.capacity_max {
            if max < amount {
                result.capacity_max_hit = true;
            }
        }
        if result.capacity_min_hit || result.capacity_max_hit {
            return result;
        }

        if let Some(waived) = self.waived {
            amount -= waived;
            if amount < Decimal::ZERO {
                amount = Decimal::ZERO;
            }
        }
        result.amount = Some(amount);
        result.is_valid = true;
        result
    }

    pub fn amount(&self) -> Option<Decimal> {
        self.calculate().amount
    }

    pub fn is_valid(&self) -> bool {
        self.calculate().is_valid
    }
}

/// A collection of line items, optionally carrying a regulatory-charge
/// amount computed over the collection total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LineItems {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulatory: Option<Decimal>,
    pub items: Vec<LineItem>,
}

impl LineItems {
    pub fn new(items: Vec<LineItem>) -> Self {
        LineItems {
            regulatory: None,
            items,
        }
    }

    pub fn with_regulatory(regulatory: Option<Decimal>, items: Vec<LineItem>) -> Self {
        LineItems { regulatory, items }
    }

    /// Collection amount: `None` if any member has no amount, else the sum.
    /// The null propagates so a rejected component poisons the total instead
    /// of silently shrinking it.
    pub fn amount(&self) -> Option<Decimal> {
        let mut total = Decimal::ZERO;
        for item in &self.items {
            total += item.amount()?;
        }
        Some(total)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
