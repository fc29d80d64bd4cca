use std::fmt::{Display, Formatter};
use std::ops::{Bound, RangeBounds, RangeFrom, RangeInclusive};

use crate::errors::MalformedNodeError;

/// Upper end of an [`Interval`], which may be unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Endpoint {
    Finite(usize),
    Infinite,
}

impl Endpoint {
    /// The sample offset of the endpoint, or `None` if the endpoint is infinite.
    pub fn value(&self) -> Option<usize> {
        match self {
            Self::Finite(value) => Some(*value),
            Self::Infinite => None,
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Finite(value) => write!(f, "{}", value),
            Self::Infinite => write!(f, "inf"),
        }
    }
}

/// Closed window of sample offsets `[lower, upper]` parameterizing a temporal operator.
///
/// Both bounds are measured in samples relative to the current evaluation index. The upper bound
/// may be infinite, in which case the interval has no width. An interval is immutable once
/// constructed and always satisfies `lower <= upper`.
///
/// Intervals can be created from integer ranges:
///
/// ```rust
/// use banquo_online::Interval;
///
/// let bounded = Interval::try_from(0..=3).unwrap();
/// let unbounded = Interval::try_from(2..).unwrap();
///
/// assert_eq!(bounded.to_string(), "[0,3]");
/// assert_eq!(unbounded.to_string(), "[2,inf]");
/// assert!(Interval::try_from(3..=1).is_err());
/// assert!(Interval::try_from(-1i64..=1).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    lower: usize,
    upper: Endpoint,
}

impl Interval {
    /// Create the finite interval `[lower, upper]`.
    pub fn new(lower: usize, upper: usize) -> Result<Self, MalformedNodeError> {
        if lower > upper {
            return Err(MalformedNodeError::InvertedInterval { lower, upper });
        }

        Ok(Self {
            lower,
            upper: Endpoint::Finite(upper),
        })
    }

    /// Create the interval `[lower, inf]`.
    pub fn unbounded(lower: usize) -> Self {
        Self {
            lower,
            upper: Endpoint::Infinite,
        }
    }

    /// Create the degenerate interval `[offset, offset]`.
    pub fn point(offset: usize) -> Self {
        Self {
            lower: offset,
            upper: Endpoint::Finite(offset),
        }
    }

    pub fn lower(&self) -> usize {
        self.lower
    }

    pub fn upper(&self) -> Endpoint {
        self.upper
    }

    /// The number of samples between the bounds, `None` if the upper bound is infinite.
    pub fn width(&self) -> Option<usize> {
        self.upper.value().map(|upper| upper - self.lower)
    }

    pub fn is_finite(&self) -> bool {
        matches!(self.upper, Endpoint::Finite(_))
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() == Some(0)
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}]", self.lower, self.upper)
    }
}

fn checked_bound(value: i64) -> Result<usize, MalformedNodeError> {
    usize::try_from(value).map_err(|_| MalformedNodeError::NegativeBound(value))
}

impl TryFrom<RangeInclusive<usize>> for Interval {
    type Error = MalformedNodeError;

    fn try_from(range: RangeInclusive<usize>) -> Result<Self, Self::Error> {
        let (lower, upper) = range.into_inner();
        Self::new(lower, upper)
    }
}

impl TryFrom<RangeInclusive<i64>> for Interval {
    type Error = MalformedNodeError;

    fn try_from(range: RangeInclusive<i64>) -> Result<Self, Self::Error> {
        let (lower, upper) = range.into_inner();
        Self::new(checked_bound(lower)?, checked_bound(upper)?)
    }
}

impl TryFrom<RangeInclusive<i32>> for Interval {
    type Error = MalformedNodeError;

    fn try_from(range: RangeInclusive<i32>) -> Result<Self, Self::Error> {
        let (lower, upper) = range.into_inner();
        Self::try_from(i64::from(lower)..=i64::from(upper))
    }
}

impl TryFrom<RangeFrom<usize>> for Interval {
    type Error = MalformedNodeError;

    fn try_from(range: RangeFrom<usize>) -> Result<Self, Self::Error> {
        Ok(Self::unbounded(range.start))
    }
}

impl TryFrom<RangeFrom<i32>> for Interval {
    type Error = MalformedNodeError;

    fn try_from(range: RangeFrom<i32>) -> Result<Self, Self::Error> {
        checked_bound(i64::from(range.start)).map(Self::unbounded)
    }
}

impl RangeBounds<usize> for Interval {
    fn start_bound(&self) -> Bound<&usize> {
        Bound::Included(&self.lower)
    }

    fn end_bound(&self) -> Bound<&usize> {
        match &self.upper {
            Endpoint::Finite(upper) => Bound::Included(upper),
            Endpoint::Infinite => Bound::Unbounded,
        }
    }
}
