//! Scalar value ranges.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Inclusive `[min, max]` range of a scalar data set.
///
/// Degenerate data sets produce `min == max`; [`Bounds::normalize`] divides by
/// the range and callers must guard that case (see [`Bounds::is_degenerate`]).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds {
    /// Smallest value.
    pub min: f32,
    /// Largest value.
    pub max: f32,
}

impl Bounds {
    /// Creates bounds from two scalars, swapping them if given out of order.
    #[must_use]
    pub fn new(a: f32, b: f32) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// Reduces a sequence of values into bounds.
    ///
    /// NaN values are skipped. Returns `None` when no finite or infinite
    /// value remains.
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f32>,
    {
        values
            .into_iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                None => Some(Self { min: v, max: v }),
                Some(b) => Some(Self {
                    min: b.min.min(v),
                    max: b.max.max(v),
                }),
            })
    }

    /// Width of the range.
    #[inline]
    #[must_use]
    pub fn size(&self) -> f32 {
        self.max - self.min
    }

    /// True when the range is a single value.
    #[inline]
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_degenerate(&self) -> bool {
        self.size() == 0.0
    }

    /// Maps `value` relative to the bounds; `min` maps to 0 and `max` to 1.
    ///
    /// Values outside the bounds are not clamped.
    #[inline]
    #[must_use]
    pub fn normalize(&self, value: f32) -> f32 {
        (value - self.min) / (self.max - self.min)
    }

    /// Returns true if `value` lies inside the bounds.
    #[inline]
    #[must_use]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize() {
        let bounds = Bounds::new(2.0, 6.0);
        assert_relative_eq!(bounds.normalize(2.0), 0.0);
        assert_relative_eq!(bounds.normalize(4.0), 0.5);
        assert_relative_eq!(bounds.normalize(6.0), 1.0);
        // Not clamped
        assert_relative_eq!(bounds.normalize(8.0), 1.5);
    }

    #[test]
    fn test_from_values_skips_nan() {
        let bounds = Bounds::from_values([3.0, f32::NAN, -1.0, 7.5]).unwrap();
        assert_relative_eq!(bounds.min, -1.0);
        assert_relative_eq!(bounds.max, 7.5);
        assert!(!bounds.is_degenerate());
    }

    #[test]
    fn test_from_values_empty() {
        assert!(Bounds::from_values(std::iter::empty()).is_none());
        assert!(Bounds::from_values([f32::NAN]).is_none());
    }

    #[test]
    fn test_degenerate() {
        let bounds = Bounds::from_values([4.0, 4.0]).unwrap();
        assert!(bounds.is_degenerate());
        assert!(bounds.contains(4.0));
    }

    #[test]
    fn test_new_orders_arguments() {
        let bounds = Bounds::new(5.0, 1.0);
        assert_relative_eq!(bounds.min, 1.0);
        assert_relative_eq!(bounds.max, 5.0);
    }
}
