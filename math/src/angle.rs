use std::f64::consts::TAU;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use lazy_static::lazy_static;

use crate::{FRACUNIT, FixedPoint, bam_to_radian};

/// Size of the angle table (fineangles)
pub const FINEANGLES: usize = 8192;
pub const FINEMASK: usize = FINEANGLES - 1;
/// Shift a BAM down to an index in the fine tables
pub const ANGLETOFINESHIFT: u32 = 19;

pub const ANG45: u32 = 0x2000_0000;
pub const ANG90: u32 = 0x4000_0000;
pub const ANG180: u32 = 0x8000_0000;
pub const ANG270: u32 = 0xC000_0000;

lazy_static! {
    /// Sine for a full circle plus a quarter, so that cosine is a plain
    /// offset in to the same table.
    static ref FINESINE: Vec<FixedPoint> = (0..FINEANGLES + FINEANGLES / 4)
        .map(|i| {
            let rad = (i as f64 + 0.5) * TAU / FINEANGLES as f64;
            FixedPoint::new((rad.sin() * FRACUNIT as f64) as i32)
        })
        .collect();
}

/// Sine from the fine table. The index is masked to the table range.
#[inline]
pub fn finesine(index: usize) -> FixedPoint {
    FINESINE[index & FINEMASK]
}

#[inline]
pub fn finecosine(index: usize) -> FixedPoint {
    FINESINE[(index & FINEMASK) + FINEANGLES / 4]
}

/// A Binary Angle Measure. The full circle is the full `u32` range so
/// arithmetic wraps for free and equality is exact, which matters for plane
/// identity comparisons.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Angle(u32);

impl Angle {
    pub const ZERO: Self = Self(0);
    pub const DEG90: Self = Self(ANG90);
    pub const DEG180: Self = Self(ANG180);
    pub const DEG270: Self = Self(ANG270);

    #[inline]
    pub const fn new(bam: u32) -> Self {
        Self(bam)
    }

    #[inline]
    pub const fn bam(self) -> u32 {
        self.0
    }

    pub fn from_degrees(degrees: f32) -> Self {
        let turns = (degrees as f64 / 360.0).rem_euclid(1.0);
        Self((turns * 4_294_967_296.0) as u64 as u32)
    }

    #[inline]
    pub const fn rad(self) -> f32 {
        bam_to_radian(self.0)
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Index in to the fine tables
    #[inline]
    pub const fn fine(self) -> usize {
        (self.0 >> ANGLETOFINESHIFT) as usize
    }

    #[inline]
    pub fn sin(self) -> FixedPoint {
        finesine(self.fine())
    }

    #[inline]
    pub fn cos(self) -> FixedPoint {
        finecosine(self.fine())
    }

    /// Float sine and cosine for the code paths that work in floats (slopes).
    #[inline]
    pub fn sin_cos_f32(self) -> (f32, f32) {
        if cfg!(not(feature = "trig_lut")) {
            self.rad().sin_cos()
        } else {
            (self.sin().to_f32(), self.cos().to_f32())
        }
    }
}

impl Add for Angle {
    type Output = Angle;

    #[inline]
    fn add(self, other: Angle) -> Angle {
        Angle(self.0.wrapping_add(other.0))
    }
}

impl AddAssign for Angle {
    #[inline]
    fn add_assign(&mut self, other: Angle) {
        self.0 = self.0.wrapping_add(other.0);
    }
}

impl Sub for Angle {
    type Output = Angle;

    #[inline]
    fn sub(self, other: Angle) -> Angle {
        Angle(self.0.wrapping_sub(other.0))
    }
}

impl SubAssign for Angle {
    #[inline]
    fn sub_assign(&mut self, other: Angle) {
        self.0 = self.0.wrapping_sub(other.0);
    }
}

impl Neg for Angle {
    type Output = Angle;

    #[inline]
    fn neg(self) -> Angle {
        Angle(self.0.wrapping_neg())
    }
}

#[cfg(test)]
mod tests {
    use super::{ANG90, ANG180, Angle, FINEANGLES, finecosine, finesine};
    use crate::FRACUNIT;

    #[test]
    fn wraps_around() {
        let a = Angle::new(ANG180) + Angle::new(ANG180);
        assert_eq!(a, Angle::ZERO);
        let b = Angle::ZERO - Angle::new(ANG90);
        assert_eq!(b, Angle::DEG270);
    }

    #[test]
    fn degrees_to_bam() {
        assert_eq!(Angle::from_degrees(90.0).bam(), ANG90);
        assert_eq!(Angle::from_degrees(-90.0), Angle::DEG270);
        assert_eq!(Angle::from_degrees(360.0), Angle::ZERO);
    }

    #[test]
    fn fine_tables() {
        // quarter turn
        let q = FINEANGLES / 4;
        assert!((finesine(q).raw() - FRACUNIT).abs() < 4);
        assert!(finecosine(q).raw().abs() < 30);
        assert!((finecosine(0).raw() - FRACUNIT).abs() < 4);
        // masked
        assert_eq!(finesine(q + FINEANGLES), finesine(q));
        assert_eq!(Angle::DEG90.sin(), finesine(q));
    }
}
