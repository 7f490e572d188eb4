use std::f32::consts::FRAC_PI_2;

use math::{FRACUNIT, FixedPoint};

/// Horizontal field of view the original game projects with
pub const DEFAULT_FOV: f32 = FRAC_PI_2;

/// Distance in pixels from the eye to the projection plane for a field of
/// view. At 90 degrees this is half the screen width (`centerxfrac`).
pub fn projection(fov: f32, screen_width_half: f32) -> FixedPoint {
    FixedPoint::from_f32(screen_width_half / (fov / 2.0).tan())
}

/// The yslope table: for each screen row, the distance to a plane one unit
/// above or below the eye that projects to that row. Rows are sampled at
/// their centre so the centre row never divides by zero.
pub fn build_yslope(
    screen_height: usize,
    centery: i32,
    focal_length: FixedPoint,
) -> Vec<FixedPoint> {
    (0..screen_height as i32)
        .map(|i| {
            let dy = (((i - centery) << 16) + FRACUNIT / 2).abs();
            focal_length / FixedPoint::new(dy)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_FOV, build_yslope, projection};
    use math::FixedPoint;

    #[test]
    fn ninety_degree_projection() {
        let p = projection(DEFAULT_FOV, 160.0);
        assert!((p.to_f32() - 160.0).abs() < 0.01);
    }

    #[test]
    fn yslope_is_symmetric_about_centre() {
        let slope = build_yslope(200, 100, FixedPoint::from_int(160));
        assert_eq!(slope.len(), 200);
        // row 100 is half a row below centre
        assert_eq!(slope[100], FixedPoint::from_int(320));
        assert_eq!(slope[99], FixedPoint::from_int(320));
        assert!(slope[0] < slope[50]);
        assert!(slope[199] < slope[150]);
    }
}
