mod angle;
mod fixed_point;

use std::f32::consts::PI;

pub use angle::*;
pub use fixed_point::*;

/// Convert a Doom `fixed_t` fixed-point value to `f32`
#[inline]
pub const fn fixed_to_float(value: i32) -> f32 {
    value as f32 / FRACUNIT as f32
}

/// Convert an `f32` to a Doom `fixed_t`. Out of range values saturate.
#[inline]
pub fn float_to_fixed(value: f32) -> i32 {
    (value * FRACUNIT as f32) as i32
}

const DEG_TO_RAD: f32 = PI / 180.0;

/// Convert a BAM (Binary Angle Measure) to radians
#[inline]
pub const fn bam_to_radian(value: u32) -> f32 {
    (value as f32 * 8.381_903e-8) * DEG_TO_RAD
}

#[cfg(test)]
mod tests {
    use super::{bam_to_radian, fixed_to_float, float_to_fixed};
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    #[test]
    #[allow(clippy::float_cmp)]
    fn convert_bam_to_rad() {
        // DOOM constants
        let ang45: u32 = 0x20000000;
        let ang90: u32 = 0x40000000;
        let ang180: u32 = 0x80000000;

        let one: u32 = 1 << 26;

        assert_eq!(bam_to_radian(ang45), FRAC_PI_4);
        assert_eq!(bam_to_radian(ang90), FRAC_PI_2);
        assert_eq!(bam_to_radian(ang180), PI);
        assert_eq!(bam_to_radian(one).to_degrees(), 5.625);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn fixed_float_conversion() {
        assert_eq!(fixed_to_float(1 << 16), 1.0);
        assert_eq!(fixed_to_float(-(1 << 15)), -0.5);
        assert_eq!(float_to_fixed(2.25), (2 << 16) + (1 << 14));
    }
}
