//! Miscellaneous utility structs and functions.

use std::fmt::Debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An interval on the real number line.
#[derive(Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interval<T> {
    pub min: T,
    pub max: T,
}

impl<T> Interval<T> {
    /// Creates a new interval.
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: PartialOrd + Copy> Interval<T> {
    /// Returns true if `min` does not exceed `max`.
    pub fn is_ordered(&self) -> bool {
        self.min <= self.max
    }

    /// Restricts a value to the interval.
    /// Values that are not comparable (such as NaN) are mapped to `min`.
    pub fn clamp(&self, value: T) -> T {
        if value > self.max {
            self.max
        } else if value >= self.min {
            value
        } else {
            self.min
        }
    }
}

impl<T: std::ops::Sub<T, Output = T> + Copy> Interval<T> {
    /// Gets the magnitude of the interval.
    pub fn length(&self) -> T {
        self.max - self.min
    }
}

impl<T: Debug> Debug for Interval<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interval({:?}, {:?})", &self.min, &self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::Interval;

    #[test]
    fn clamp_respects_bounds() {
        let bounds = Interval::new(3.0, 15.0);
        assert_eq!(bounds.clamp(0.0), 3.0);
        assert_eq!(bounds.clamp(8.0), 8.0);
        assert_eq!(bounds.clamp(200.0), 15.0);
        assert_eq!(bounds.clamp(f64::NAN), 3.0);
    }

    #[test]
    fn ordering() {
        assert!(Interval::new(1, 2).is_ordered());
        assert!(!Interval::new(2, 1).is_ordered());
        assert_eq!(Interval::new(3, 15).length(), 12);
    }
}
