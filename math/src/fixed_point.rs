use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use crate::{fixed_to_float, float_to_fixed};

pub const FRACBITS: i32 = 16;
pub const FRACUNIT: i32 = 1 << FRACBITS;

/// A 16.16 signed fixed-point number, the Doom `fixed_t`.
///
/// Addition and subtraction wrap like the C original. Multiplication and
/// division between two `FixedPoint` are `FixedMul`/`FixedDiv` and saturate
/// instead of overflowing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FixedPoint(i32);

impl FixedPoint {
    pub const ZERO: Self = Self(0);
    pub const UNIT: Self = Self(FRACUNIT);
    pub const MIN: Self = Self(i32::MIN);
    pub const MAX: Self = Self(i32::MAX);

    /// Wrap an already-scaled raw `fixed_t`
    #[inline]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn from_int(value: i32) -> Self {
        Self(value << FRACBITS)
    }

    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Integer part, rounded towards negative infinity
    #[inline]
    pub const fn to_int(self) -> i32 {
        self.0 >> FRACBITS
    }

    #[inline]
    pub const fn abs(self) -> Self {
        Self(self.0.wrapping_abs())
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn to_f32(self) -> f32 {
        fixed_to_float(self.0)
    }

    #[inline]
    pub fn from_f32(value: f32) -> Self {
        Self(float_to_fixed(value))
    }

    /// `FixedMul`
    #[inline]
    const fn fixed_mul(a: i32, b: i32) -> i32 {
        let result = (a as i64 * b as i64) >> FRACBITS;
        if result > i32::MAX as i64 {
            i32::MAX
        } else if result < i32::MIN as i64 {
            i32::MIN
        } else {
            result as i32
        }
    }

    /// `FixedDiv`, including the overflow guard: if the quotient can't fit
    /// the result is clamped to the signed extreme.
    #[inline]
    const fn fixed_div(a: i32, b: i32) -> i32 {
        if (a.unsigned_abs() >> 14) >= b.unsigned_abs() {
            return if (a ^ b) < 0 { i32::MIN } else { i32::MAX };
        }
        (((a as i64) << FRACBITS) / b as i64) as i32
    }
}

impl Add for FixedPoint {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign for FixedPoint {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.wrapping_add(rhs.0);
    }
}

impl Sub for FixedPoint {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl SubAssign for FixedPoint {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.wrapping_sub(rhs.0);
    }
}

impl Neg for FixedPoint {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }
}

impl Mul for FixedPoint {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self(Self::fixed_mul(self.0, rhs.0))
    }
}

/// Scale by a plain integer, e.g. a column count
impl Mul<i32> for FixedPoint {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: i32) -> Self {
        Self(self.0.wrapping_mul(rhs))
    }
}

impl Mul<FixedPoint> for i32 {
    type Output = FixedPoint;

    #[inline]
    fn mul(self, rhs: FixedPoint) -> FixedPoint {
        rhs * self
    }
}

impl Div for FixedPoint {
    type Output = Self;

    #[inline]
    fn div(self, rhs: Self) -> Self {
        Self(Self::fixed_div(self.0, rhs.0))
    }
}

/// Divide by a plain integer. Division by zero returns the signed extreme.
impl Div<i32> for FixedPoint {
    type Output = Self;

    #[inline]
    fn div(self, rhs: i32) -> Self {
        if rhs == 0 {
            return if self.0 < 0 { Self::MIN } else { Self::MAX };
        }
        Self(self.0 / rhs)
    }
}

impl From<i32> for FixedPoint {
    fn from(value: i32) -> Self {
        Self::from_int(value)
    }
}

impl From<f32> for FixedPoint {
    fn from(value: f32) -> Self {
        Self::from_f32(value)
    }
}

impl From<FixedPoint> for f32 {
    fn from(value: FixedPoint) -> Self {
        value.to_f32()
    }
}
