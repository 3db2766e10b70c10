//! Repeat bounds: how many times an expectation may be, and must be, hit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Acceptable call-count range `(min, max)`; `max == None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Repeat {
    min: u32,
    max: Option<u32>,
}

impl Repeat {
    pub const fn once() -> Self {
        Self::times(1)
    }

    pub const fn twice() -> Self {
        Self::times(2)
    }

    pub const fn times(n: u32) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    pub const fn at_least(n: u32) -> Self {
        Self { min: n, max: None }
    }

    pub const fn at_most(n: u32) -> Self {
        Self {
            min: 0,
            max: Some(n),
        }
    }

    pub const fn any() -> Self {
        Self { min: 0, max: None }
    }

    pub const fn never() -> Self {
        Self::times(0)
    }

    /// Arbitrary range; `None` when `min > max`.
    pub fn between(min: u32, max: u32) -> Option<Self> {
        (min <= max).then_some(Self {
            min,
            max: Some(max),
        })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> Option<u32> {
        self.max
    }

    /// Enough calls were made.
    pub fn is_satisfied(&self, count: u32) -> bool {
        count >= self.min
    }

    /// No further calls may be matched.
    pub fn is_exhausted(&self, count: u32) -> bool {
        self.max.is_some_and(|max| count >= max)
    }

    /// `count` lies inside the range.
    pub fn contains(&self, count: u32) -> bool {
        self.is_satisfied(count) && self.max.map_or(true, |max| count <= max)
    }
}

impl Default for Repeat {
    fn default() -> Self {
        Self::once()
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{max}"),
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..", self.min),
        }
    }
}

/// Serialized repeat bound used by expectation scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RepeatSpec {
    Once,
    Twice,
    Times(u32),
    AtLeast(u32),
    AtMost(u32),
    Any,
    Never,
}

impl From<RepeatSpec> for Repeat {
    fn from(spec: RepeatSpec) -> Self {
        match spec {
            RepeatSpec::Once => Repeat::once(),
            RepeatSpec::Twice => Repeat::twice(),
            RepeatSpec::Times(n) => Repeat::times(n),
            RepeatSpec::AtLeast(n) => Repeat::at_least(n),
            RepeatSpec::AtMost(n) => Repeat::at_most(n),
            RepeatSpec::Any => Repeat::any(),
            RepeatSpec::Never => Repeat::never(),
        }
    }
}
