//! Rate-tier algebra: combining and simplifying step functions of tiered
//! rates.
//!
//! Every operation here is a pure function over `&[RateTier]`. Sequences are
//! sparse: only breakpoints where the rate changes are stored, and the
//! combination sweep re-simplifies on the fly so results stay minimal.
//!
//! Null rates mean "not applicable" and each operator documents its own
//! null rules; nulls never raise errors.

use std::collections::{BTreeSet, VecDeque};

use rust_decimal::Decimal;

use premia_core::{RateTier, RatingError};

/// A rate operation applied pointwise at each breakpoint of a merge-sweep.
pub type RateOp = fn(Option<Decimal>, Option<Decimal>) -> Option<Decimal>;

/// Tiers sorted by `(threshold, exclusive)` with inclusive first at equal
/// thresholds. Fails on duplicate `(threshold, exclusive)` pairs. An empty
/// input synthesizes a single null-rated sentinel tier at threshold zero so
/// downstream sweeps always have at least one breakpoint.
pub fn in_tier_order(
    tiers: &[RateTier],
    context: &str,
) -> Result<VecDeque<RateTier>, RatingError> {
    let mut seen: BTreeSet<(Decimal, bool)> = BTreeSet::new();
    for tier in tiers {
        if !seen.insert(tier.order_key()) {
            return Err(RatingError::DuplicateTier {
                context: context.to_string(),
            });
        }
    }
    if tiers.is_empty() {
        return Ok(VecDeque::from([RateTier::at(Decimal::ZERO, None)]));
    }
    let mut sorted = tiers.to_vec();
    sorted.sort_by_key(RateTier::order_key);
    Ok(sorted.into())
}

/// Collapses runs of consecutive same-rate tiers to their first and last
/// members as tiers stream through a sweep.
struct Simplifier {
    run: Vec<RateTier>,
    out: Vec<RateTier>,
}

impl Simplifier {
    fn new() -> Self {
        Simplifier {
            run: Vec::new(),
            out: Vec::new(),
        }
    }

    fn push(&mut self, tier: RateTier) {
        if let Some(first) = self.run.first() {
            if first.rate == tier.rate {
                self.run.push(tier);
                return;
            }
            self.flush();
        }
        self.run.push(tier);
    }

    fn flush(&mut self) {
        match self.run.len() {
            0 => {}
            1 => self.out.push(self.run.remove(0)),
            _ => {
                self.out.push(self.run.remove(0));
                self.out.push(self.run.pop().expect("run has a last member"));
                self.run.clear();
            }
        }
    }

    fn finish(mut self) -> Vec<RateTier> {
        self.flush();
        self.out
    }
}

/// Re-sorts and minimizes a tier sequence without changing the step function
/// it describes.
pub fn simplify(tiers: &[RateTier], context: &str) -> Result<Vec<RateTier>, RatingError> {
    let ordered = in_tier_order(tiers, context)?;
    let mut simplifier = Simplifier::new();
    for tier in ordered {
        simplifier.push(tier);
    }
    Ok(simplifier.finish())
}

/// Two-queue merge-sweep combining two step functions breakpoint by
/// breakpoint.
///
/// At each step the smallest pending `(threshold, exclusive)` across both
/// queues becomes the current breakpoint; a side whose head matches it is
/// dequeued and updates that side's current-rate tracker. The tie-break
/// (inclusive before exclusive) decides which side's rate is current at an
/// exact boundary and is preserved exactly -- do not "fix" it.
pub fn combine(
    left: &[RateTier],
    right: &[RateTier],
    rate_op: RateOp,
    context: &str,
) -> Result<Vec<RateTier>, RatingError> {
    let mut left_rates = in_tier_order(left, context)?;
    let mut right_rates = in_tier_order(right, context)?;

    let mut current_left: Option<Decimal> = None;
    let mut current_right: Option<Decimal> = None;
    let mut simplifier = Simplifier::new();

    while !left_rates.is_empty() || !right_rates.is_empty() {
        let left_key = left_rates.front().map(RateTier::order_key);
        let right_key = right_rates.front().map(RateTier::order_key);
        let current = match (left_key, right_key) {
            (Some(l), Some(r)) => l.min(r),
            (Some(l), None) => l,
            (None, Some(r)) => r,
            (None, None) => unreachable!("loop guard ensures one queue is non-empty"),
        };
        if left_key == Some(current) {
            current_left = left_rates.pop_front().expect("peeked").rate;
        }
        if right_key == Some(current) {
            current_right = right_rates.pop_front().expect("peeked").rate;
        }
        simplifier.push(RateTier {
            threshold: current.0,
            exclusive: current.1,
            rate: rate_op(current_left, current_right),
        });
    }
    Ok(simplifier.finish())
}

/// Null LHS stays null; null RHS leaves the LHS untouched ("not applicable"
/// propagates from the left).
pub fn add_rates(left: Option<Decimal>, right: Option<Decimal>) -> Option<Decimal> {
    match (left, right) {
        (None, _) => None,
        (Some(l), None) => Some(l),
        (Some(l), Some(r)) => Some(l + r),
    }
}

/// Null is coerced to zero once either side carries a value; only
/// both-null stays null.
pub fn add_invariant_rates(left: Option<Decimal>, right: Option<Decimal>) -> Option<Decimal> {
    match (left, right) {
        (None, None) => None,
        _ => Some(left.unwrap_or(Decimal::ZERO) + right.unwrap_or(Decimal::ZERO)),
    }
}

pub fn subtract_rates(left: Option<Decimal>, right: Option<Decimal>) -> Option<Decimal> {
    match (left, right) {
        (None, _) => None,
        (Some(l), None) => Some(l),
        (Some(l), Some(r)) => Some(l - r),
    }
}

pub fn multiply_rates(left: Option<Decimal>, right: Option<Decimal>) -> Option<Decimal> {
    match (left, right) {
        (None, _) => None,
        (Some(l), None) => Some(l),
        (Some(l), Some(r)) => Some(l * r),
    }
}

pub fn add(left: &[RateTier], right: &[RateTier]) -> Result<Vec<RateTier>, RatingError> {
    combine(left, right, add_rates, "Add")
}

pub fn add_invariant(left: &[RateTier], right: &[RateTier]) -> Result<Vec<RateTier>, RatingError> {
    combine(left, right, add_invariant_rates, "AddInvariant")
}

pub fn subtract(left: &[RateTier], right: &[RateTier]) -> Result<Vec<RateTier>, RatingError> {
    combine(left, right, subtract_rates, "Subtract")
}

pub fn multiply(left: &[RateTier], right: &[RateTier]) -> Result<Vec<RateTier>, RatingError> {
    combine(left, right, multiply_rates, "Multiply")
}

/// The rate applicable exactly at `at`.
///
/// Walks tiers in order carrying the last seen rate. An inclusive tier whose
/// threshold equals `at` returns its own rate; an exclusive one returns the
/// carried (previous) rate. Below every threshold the answer is `None`; past
/// the end it is the last carried rate.
pub fn rate(tiers: &[RateTier], at: Decimal, context: &str) -> Result<Option<Decimal>, RatingError> {
    let ordered = in_tier_order(tiers, context)?;
    let mut carried: Option<Decimal> = None;
    for tier in ordered {
        if tier.threshold == at {
            return Ok(if tier.exclusive { carried } else { tier.rate });
        }
        if at < tier.threshold {
            return Ok(carried);
        }
        carried = tier.rate;
    }
    Ok(carried)
}
