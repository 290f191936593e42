//! Inclusive integer ranges.
//!
//! [`Range`] is the unit every part of the classifier talks in: the blocks a
//! section spans along an axis, the span of ground elevation sampled across a
//! column, and the sky/underground bands derived from it.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

/// An immutable, inclusive interval `[lower, upper]` of integers.
///
/// The lower bound is never above the upper bound. All operations return new
/// values.
///
/// # Example
///
/// ```
/// use terraclean::Range;
///
/// let range = Range::new(-42, 54)?;
/// assert!(range.matches(0));
/// assert!(range.above(85));
/// assert!(range.intersects(&Range::new(54, 60)?));
/// # Ok::<(), terraclean::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Range {
    lower: i64,
    upper: i64,
}

impl Range {
    /// Create a new range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] if `upper < lower`.
    pub fn new(lower: i64, upper: i64) -> Result<Self> {
        if upper < lower {
            return Err(Error::InvalidRange { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    /// A range holding a single value.
    pub fn point(value: i64) -> Self {
        Self {
            lower: value,
            upper: value,
        }
    }

    /// The lowest value in this range.
    pub fn lower_bound(&self) -> i64 {
        self.lower
    }

    /// The highest value in this range.
    pub fn upper_bound(&self) -> i64 {
        self.upper
    }

    /// Returns `true` if `x` is within this range (inclusive).
    pub fn matches(&self, x: i64) -> bool {
        x >= self.lower && x <= self.upper
    }

    /// Returns `true` if `x` is strictly above this range.
    pub fn above(&self, x: i64) -> bool {
        x > self.upper
    }

    /// Returns `true` if `x` is strictly below this range.
    pub fn below(&self, x: i64) -> bool {
        x < self.lower
    }

    /// Returns `true` if both bounds of `other` are strictly above this range.
    ///
    /// An absent range is never above.
    pub fn above_range<'a>(&self, other: impl Into<Option<&'a Range>>) -> bool {
        match other.into() {
            Some(other) => self.above(other.lower) && self.above(other.upper),
            None => false,
        }
    }

    /// Returns `true` if both bounds of `other` are strictly below this range.
    ///
    /// An absent range is never below.
    pub fn below_range<'a>(&self, other: impl Into<Option<&'a Range>>) -> bool {
        match other.into() {
            Some(other) => self.below(other.lower) && self.below(other.upper),
            None => false,
        }
    }

    /// Returns `true` if `other` shares at least one value with this range.
    ///
    /// Touching bounds count as an intersection. An absent range never intersects.
    pub fn intersects<'a>(&self, other: impl Into<Option<&'a Range>>) -> bool {
        match other.into() {
            Some(other) => {
                self.matches(other.lower)
                    || self.matches(other.upper)
                    || other.matches(self.lower)
            }
            None => false,
        }
    }

    /// Same lower bound, upper bound raised by `amount`.
    pub fn extend_up(&self, amount: i64) -> Result<Self> {
        Self::new(self.lower, self.upper.saturating_add(amount))
    }

    /// Same upper bound, lower bound lowered by `amount`.
    pub fn extend_down(&self, amount: i64) -> Result<Self> {
        Self::new(self.lower.saturating_sub(amount), self.upper)
    }

    /// Same lower bound, upper bound lowered by `amount`.
    pub fn contract_up(&self, amount: i64) -> Result<Self> {
        Self::new(self.lower, self.upper.saturating_sub(amount))
    }

    /// Same upper bound, lower bound raised by `amount`.
    pub fn contract_down(&self, amount: i64) -> Result<Self> {
        Self::new(self.lower.saturating_add(amount), self.upper)
    }

    /// Both bounds moved by `amount`.
    pub fn shift(&self, amount: i64) -> Self {
        Self {
            lower: self.lower.saturating_add(amount),
            upper: self.upper.saturating_add(amount),
        }
    }

    /// The arithmetic mean of both bounds.
    pub fn center(&self) -> f64 {
        (self.lower as f64 + self.upper as f64) / 2.0
    }

    /// The distance between both bounds.
    pub fn size(&self) -> i64 {
        self.upper - self.lower
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}
