//! Sloped planes: the slope itself, and the view-space basis used to draw it
//! with perspective-correct texture coordinates.

use glam::{Vec2, Vec3};
use math::{Angle, FixedPoint, FRACUNIT};

use crate::defs::Viewpoint;

/// A plane whose height changes linearly in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slope {
    pub id: u32,
    /// A point on the slope
    pub origin_x: FixedPoint,
    pub origin_y: FixedPoint,
    pub origin_z: FixedPoint,
    /// Unit XY direction the slope rises in
    pub dir_x: FixedPoint,
    pub dir_y: FixedPoint,
    /// Height gained per map unit along `dir`
    pub zdelta: FixedPoint,
}

impl Slope {
    /// A slope rising `zdelta` per unit towards `angle`
    pub fn new(
        id: u32,
        origin: (FixedPoint, FixedPoint, FixedPoint),
        angle: Angle,
        zdelta: FixedPoint,
    ) -> Self {
        Self {
            id,
            origin_x: origin.0,
            origin_y: origin.1,
            origin_z: origin.2,
            dir_x: angle.cos(),
            dir_y: angle.sin(),
            zdelta,
        }
    }

    /// `P_GetSlopeZAt`
    #[inline]
    pub fn z_at(&self, x: FixedPoint, y: FixedPoint) -> FixedPoint {
        let dist = (x - self.origin_x) * self.dir_x + (y - self.origin_y) * self.dir_y;
        self.origin_z + dist * self.zdelta
    }

    #[inline]
    fn z_at_f32(&self, p: Vec2) -> f32 {
        self.z_at(FixedPoint::from_f32(p.x), FixedPoint::from_f32(p.y))
            .to_f32()
    }
}

/// The texture origin and the texture U/V axes of a sloped plane, in view
/// space (x right, y up, z forward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlopeBasis {
    pub origin: Vec3,
    pub u: Vec3,
    pub v: Vec3,
}

impl SlopeBasis {
    /// A texture coordinate is `u = world_x + x_offset`, `v = y_offset - world_y`
    /// before the flat rotation by `plane_angle`, which is the same mapping
    /// flat planes get.
    pub fn new(
        slope: &Slope,
        view: &Viewpoint,
        x_offset: FixedPoint,
        y_offset: FixedPoint,
        plane_angle: Angle,
    ) -> Self {
        let (ps, pc) = plane_angle.sin_cos_f32();
        let u_dir = Vec2::new(pc, -ps);
        let v_dir = Vec2::new(-ps, -pc);
        let origin = -x_offset.to_f32() * u_dir - y_offset.to_f32() * v_dir;

        let origin_z = slope.z_at_f32(origin);
        let u = u_dir.extend(slope.z_at_f32(origin + u_dir) - origin_z);
        let v = v_dir.extend(slope.z_at_f32(origin + v_dir) - origin_z);

        let eye = Vec3::new(view.x.to_f32(), view.y.to_f32(), view.z.to_f32());
        let (vs, vc) = view.angle.sin_cos_f32();
        let forward = Vec2::new(vc, vs);
        let right = Vec2::new(vs, -vc);
        let to_view = |d: Vec3| Vec3::new(d.truncate().dot(right), d.z, d.truncate().dot(forward));

        Self {
            origin: to_view(origin.extend(origin_z) - eye),
            u: to_view(u),
            v: to_view(v),
        }
    }
}

/// Cross products of a `SlopeBasis`, for a screen ray `r` through a pixel:
/// `u = r.su / r.sz` and `v = r.sv / r.sz`. The `z` terms are premultiplied
/// by the focal length, `su`/`sv` by `FRACUNIT` so the results are 16.16.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TiltedCoefficients {
    pub su: Vec3,
    pub sv: Vec3,
    pub sz: Vec3,
}

impl TiltedCoefficients {
    pub fn new(basis: &SlopeBasis, focal_length: f32) -> Self {
        let scale = FRACUNIT as f32;
        let mut su = basis.v.cross(basis.origin) * scale;
        let mut sv = basis.origin.cross(basis.u) * scale;
        let mut sz = basis.u.cross(basis.v);
        su.z *= focal_length;
        sv.z *= focal_length;
        sz.z *= focal_length;
        Self { su, sv, sz }
    }

    /// `(iz, uz, vz)` at column `dx` right of centre and row `dy` above it
    #[inline]
    pub fn at(&self, dx: f32, dy: f32) -> (f32, f32, f32) {
        (
            self.sz.x * dx + self.sz.y * dy + self.sz.z,
            self.su.x * dx + self.su.y * dy + self.su.z,
            self.sv.x * dx + self.sv.y * dy + self.sv.z,
        )
    }
}

/// Row-indexed coefficient tables. Allocated on first sloped plane and kept
/// until the view size changes. Only row 0 is used unless the plane ripples.
#[derive(Debug, Default)]
pub struct SlopeScratch {
    rows: Vec<TiltedCoefficients>,
    /// Ripple background row offset per row
    bg_offsets: Vec<i32>,
}

impl SlopeScratch {
    pub fn new(height: usize) -> Self {
        Self {
            rows: vec![TiltedCoefficients::default(); height.max(1)],
            bg_offsets: vec![0; height.max(1)],
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn row(&self, y: usize) -> &TiltedCoefficients {
        &self.rows[y.min(self.rows.len() - 1)]
    }

    #[inline]
    pub fn bg_offset(&self, y: usize) -> i32 {
        self.bg_offsets.get(y).copied().unwrap_or(0)
    }

    #[inline]
    pub fn set_row(&mut self, y: usize, coeffs: TiltedCoefficients, bg_offset: i32) {
        if let Some(row) = self.rows.get_mut(y) {
            *row = coeffs;
            self.bg_offsets[y] = bg_offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Slope, SlopeBasis, TiltedCoefficients};
    use crate::defs::Viewpoint;
    use math::{Angle, FixedPoint, FRACUNIT};

    fn flat_slope(height: i32) -> Slope {
        Slope::new(
            1,
            (FixedPoint::ZERO, FixedPoint::ZERO, FixedPoint::from_int(height)),
            Angle::ZERO,
            FixedPoint::ZERO,
        )
    }

    #[test]
    fn slope_height() {
        let slope = Slope::new(
            2,
            (FixedPoint::ZERO, FixedPoint::ZERO, FixedPoint::from_int(10)),
            Angle::ZERO,
            FixedPoint::new(FRACUNIT / 2),
        );
        let z = slope.z_at(FixedPoint::from_int(8), FixedPoint::from_int(100));
        // 10 + 8 * 0.5, within fine table rounding
        assert!((z.to_f32() - 14.0).abs() < 0.05);
    }

    #[test]
    fn flat_slope_basis_below_view() {
        let view = Viewpoint::new(
            FixedPoint::ZERO,
            FixedPoint::ZERO,
            FixedPoint::from_int(41),
            Angle::ZERO,
        );
        let basis = SlopeBasis::new(
            &flat_slope(0),
            &view,
            FixedPoint::ZERO,
            FixedPoint::ZERO,
            Angle::ZERO,
        );
        assert!((basis.origin.y + 41.0).abs() < 0.01);
        // u runs forward, v runs right when facing east
        assert!((basis.u.z - 1.0).abs() < 0.001);
        assert!((basis.v.x - 1.0).abs() < 0.001);
        assert!(basis.u.y.abs() < 0.001);
    }

    #[test]
    fn horizon_row_has_no_depth() {
        let view = Viewpoint::new(
            FixedPoint::ZERO,
            FixedPoint::ZERO,
            FixedPoint::from_int(41),
            Angle::from_degrees(30.0),
        );
        let basis = SlopeBasis::new(
            &flat_slope(0),
            &view,
            FixedPoint::ZERO,
            FixedPoint::ZERO,
            Angle::ZERO,
        );
        let coeffs = TiltedCoefficients::new(&basis, 160.0);
        // rays through the centre row are parallel to a flat floor
        let (iz, _, _) = coeffs.at(37.0, 0.0);
        assert!(iz.abs() < 1e-3);
        let (iz, _, _) = coeffs.at(37.0, -20.0);
        assert!(iz.abs() > 1.0);
    }
}
