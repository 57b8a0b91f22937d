//! Attribute value primitives.
//!
//! [`AttributeValue`] is the paired (current, base) value every attribute
//! carries; [`ModifiedValue`] is a pending pair of deltas against it. Both
//! are plain value types with component-wise arithmetic.

use std::ops::{Add, Div, Mul, Neg, Sub};

/// Paired (current, base) value of one attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeValue {
    pub current: f32,
    pub base: f32,
}

impl AttributeValue {
    pub const ZERO: Self = Self {
        current: 0.0,
        base: 0.0,
    };

    pub const fn new(current: f32, base: f32) -> Self {
        Self { current, base }
    }

    /// Both components set to the same value. The common shape at
    /// registration time (full meter).
    pub const fn uniform(value: f32) -> Self {
        Self {
            current: value,
            base: value,
        }
    }

    /// Current over base; 0 when base is 0.
    pub fn ratio(&self) -> f32 {
        if self.base == 0.0 {
            0.0
        } else {
            self.current / self.base
        }
    }

    /// True when both components are exactly zero.
    pub fn is_zero(&self) -> bool {
        self.current == 0.0 && self.base == 0.0
    }

    /// Component-wise clamp into `[floor, ceil]`.
    pub fn clamped(&self, floor: AttributeValue, ceil: AttributeValue) -> AttributeValue {
        Self {
            current: self.current.clamp(floor.current, ceil.current),
            base: self.base.clamp(floor.base, ceil.base),
        }
    }
}

impl Add for AttributeValue {
    type Output = AttributeValue;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.current + rhs.current, self.base + rhs.base)
    }
}

impl Sub for AttributeValue {
    type Output = AttributeValue;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.current - rhs.current, self.base - rhs.base)
    }
}

impl Mul<f32> for AttributeValue {
    type Output = AttributeValue;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.current * rhs, self.base * rhs)
    }
}

impl Div<f32> for AttributeValue {
    type Output = AttributeValue;
    fn div(self, rhs: f32) -> Self {
        Self::new(self.current / rhs, self.base / rhs)
    }
}

impl Neg for AttributeValue {
    type Output = AttributeValue;
    fn neg(self) -> Self {
        Self::new(-self.current, -self.base)
    }
}

/// Sign classification of a pending modification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueBias {
    /// Net change above zero.
    Positive,
    /// Net change below zero.
    Negative,
    /// Components cancel out but are individually nonzero.
    ZeroBiased,
    /// Both components exactly zero.
    ZeroNeutral,
}

/// One pending modification: a pair of deltas against (current, base).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModifiedValue {
    pub delta_current: f32,
    pub delta_base: f32,
}

impl ModifiedValue {
    pub const ZERO: Self = Self {
        delta_current: 0.0,
        delta_base: 0.0,
    };

    pub const fn new(delta_current: f32, delta_base: f32) -> Self {
        Self {
            delta_current,
            delta_base,
        }
    }

    /// Delta against the current component only.
    pub const fn current(delta: f32) -> Self {
        Self::new(delta, 0.0)
    }

    /// Delta against the base component only.
    pub const fn base(delta: f32) -> Self {
        Self::new(0.0, delta)
    }

    /// The same deltas expressed as an [`AttributeValue`] offset.
    pub fn as_offset(&self) -> AttributeValue {
        AttributeValue::new(self.delta_current, self.delta_base)
    }

    /// Derived sign classification of the net change.
    pub fn bias(&self) -> ValueBias {
        let net = self.delta_current + self.delta_base;
        if net > 0.0 {
            ValueBias::Positive
        } else if net < 0.0 {
            ValueBias::Negative
        } else if self.delta_current == 0.0 && self.delta_base == 0.0 {
            ValueBias::ZeroNeutral
        } else {
            ValueBias::ZeroBiased
        }
    }

    pub fn is_zero(&self) -> bool {
        self.delta_current == 0.0 && self.delta_base == 0.0
    }
}

impl Add for ModifiedValue {
    type Output = ModifiedValue;
    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.delta_current + rhs.delta_current,
            self.delta_base + rhs.delta_base,
        )
    }
}

impl Neg for ModifiedValue {
    type Output = ModifiedValue;
    fn neg(self) -> Self {
        Self::new(-self.delta_current, -self.delta_base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_handles_zero_base() {
        assert_eq!(AttributeValue::new(5.0, 0.0).ratio(), 0.0);
        assert_eq!(AttributeValue::new(50.0, 100.0).ratio(), 0.5);
    }

    #[test]
    fn bias_classification() {
        assert_eq!(ModifiedValue::new(5.0, 0.0).bias(), ValueBias::Positive);
        assert_eq!(ModifiedValue::new(-3.0, 0.0).bias(), ValueBias::Negative);
        assert_eq!(ModifiedValue::new(4.0, -4.0).bias(), ValueBias::ZeroBiased);
        assert_eq!(ModifiedValue::ZERO.bias(), ValueBias::ZeroNeutral);
    }

    #[test]
    fn combine_and_negate() {
        let a = ModifiedValue::new(2.0, 1.0);
        let b = ModifiedValue::new(-5.0, 0.5);
        assert_eq!(a + b, ModifiedValue::new(-3.0, 1.5));
        assert_eq!(-a, ModifiedValue::new(-2.0, -1.0));
    }
}
