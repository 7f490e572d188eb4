//! Map spans to texture space. Flat planes step linearly across a row, sloped
//! planes step the numerator and denominator of a perspective divide.

#[cfg(feature = "hprof")]
use coarse_prof::profile;
use math::{Angle, FINEANGLES, FINEMASK, FixedPoint, finecosine, finesine};
use render_trait::{FlatPic, PlanarSpan, SpanDrawer, TiltedSpan};

use crate::FrameStats;
use crate::defs::PlaneKey;
use crate::lighting::{LightTables, PlaneShade};
use crate::planes::plane_height;
use crate::slope::{SlopeBasis, SlopeScratch, TiltedCoefficients};
use crate::spans::SpanSink;
use crate::utilities::{build_yslope, projection};

/// Animation time for rippling water
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RippleClock {
    /// Game tics since the level started
    pub leveltime: u32,
    /// Fraction of the way to the next tic, for interpolated frames
    pub frac: FixedPoint,
}

impl RippleClock {
    pub const fn new(leveltime: u32, frac: FixedPoint) -> Self {
        Self { leveltime, frac }
    }
}

/// Displacement of one row of rippling water
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Ripple {
    pub dx: FixedPoint,
    pub dy: FixedPoint,
    /// Rows to offset the background sample by
    pub bg_offset: i32,
}

/// Tables shared by every plane in a frame. The per-row cache is keyed by
/// plane height so rows are reused by any plane at the same height.
pub struct PlaneTables {
    yslope: Vec<FixedPoint>,
    centerx: i32,
    centery: i32,
    focal_length: FixedPoint,
    fov: f32,
    cachedheight: Vec<FixedPoint>,
    cacheddistance: Vec<FixedPoint>,
    /// World units per screen column, before rotation. `None` on the centre
    /// row where it can't be known.
    cachedstep: Vec<Option<FixedPoint>>,
    screen_width: i32,
    screen_height: i32,
}

impl PlaneTables {
    pub fn new(screen_width: usize, screen_height: usize, fov: f32) -> Self {
        let centerx = screen_width as i32 / 2;
        let centery = screen_height as i32 / 2;
        let focal_length = projection(fov, centerx as f32);
        Self {
            yslope: build_yslope(screen_height, centery, focal_length),
            centerx,
            centery,
            focal_length,
            fov,
            cachedheight: vec![FixedPoint::MIN; screen_height],
            cacheddistance: vec![FixedPoint::ZERO; screen_height],
            cachedstep: vec![None; screen_height],
            screen_width: screen_width as i32,
            screen_height: screen_height as i32,
        }
    }

    pub fn resize(&mut self, screen_width: usize, screen_height: usize) {
        *self = Self::new(screen_width, screen_height, self.fov);
    }

    /// Forget the cached rows. Heights are relative to the view, so this is
    /// needed whenever the view moves.
    pub fn invalidate(&mut self) {
        self.cachedheight.fill(FixedPoint::MIN);
    }

    pub fn centerx(&self) -> i32 {
        self.centerx
    }

    pub fn centery(&self) -> i32 {
        self.centery
    }

    pub fn focal_length(&self) -> FixedPoint {
        self.focal_length
    }

    pub fn screen_height(&self) -> i32 {
        self.screen_height
    }

    pub fn screen_width(&self) -> i32 {
        self.screen_width
    }

    #[inline]
    pub fn yslope(&self, y: usize) -> FixedPoint {
        self.yslope[y]
    }

    /// Distance to row `y` of a plane `planeheight` from the eye, and the
    /// world step per screen column at that distance
    #[inline]
    pub fn row_distance(
        &mut self,
        y: usize,
        planeheight: FixedPoint,
    ) -> (FixedPoint, Option<FixedPoint>) {
        if self.cachedheight[y] != planeheight {
            self.cachedheight[y] = planeheight;
            self.cacheddistance[y] = planeheight * self.yslope[y];
            let span = (self.centery - y as i32).abs();
            self.cachedstep[y] = (span != 0).then(|| planeheight / span);
        }
        (self.cacheddistance[y], self.cachedstep[y])
    }
}

/// Water ripple for a row at `distance`. `angle` is the combined view and
/// flat rotation.
pub fn plane_ripple(
    clock: &RippleClock,
    distance: FixedPoint,
    angle: Angle,
    y: i32,
    screen_height: i32,
) -> Ripple {
    let offset = (clock.leveltime as i32)
        .wrapping_mul(140)
        .wrapping_add((clock.frac * 140).to_int());
    let yay = (offset.wrapping_add(distance.raw() >> 9) as usize) & FINEMASK;
    let bgofs = (finesine(yay) / FixedPoint::new((1 << 12) + (distance.raw() >> 11))).to_int();

    // displaced across the view, a quarter turn from its direction
    let fine = (angle.fine() + FINEANGLES / 4) & FINEMASK;
    let scale = FixedPoint::from_int(bgofs);

    let mut bg_offset = bgofs;
    if y + bg_offset >= screen_height {
        bg_offset = screen_height - y - 1;
    }
    if y + bg_offset < 0 {
        bg_offset = -y;
    }

    Ripple {
        dx: finecosine(fine) * scale,
        dy: finesine(fine) * scale,
        bg_offset,
    }
}

/// Per-plane constants for flat mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanarSetup {
    pub planeheight: FixedPoint,
    pub planecos: FixedPoint,
    pub planesin: FixedPoint,
    pub xoffs: FixedPoint,
    pub yoffs: FixedPoint,
    /// Combined view and flat angle, set if the plane ripples
    pub ripple: Option<Angle>,
}

impl PlanarSetup {
    pub fn new(key: &PlaneKey) -> Self {
        let angle = key.view.angle + key.angle;
        Self {
            planeheight: plane_height(key),
            planecos: angle.cos(),
            planesin: angle.sin(),
            xoffs: key.x_offset,
            yoffs: key.y_offset,
            ripple: key.ripples().then_some(angle),
        }
    }
}

/// Texture sampling for one flat row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowMapping {
    pub xfrac: FixedPoint,
    pub yfrac: FixedPoint,
    pub xstep: FixedPoint,
    pub ystep: FixedPoint,
    pub distance: FixedPoint,
    pub bg_offset: i32,
}

/// R_MapPlane: where row `y` starting at column `x1` samples the flat
pub fn map_planar_row(
    tables: &mut PlaneTables,
    setup: &PlanarSetup,
    clock: &RippleClock,
    y: i32,
    x1: i32,
) -> RowMapping {
    let y = y.clamp(0, tables.screen_height - 1);
    let (distance, step) = tables.row_distance(y as usize, setup.planeheight);
    let (xstep, ystep) = match step {
        Some(step) => (setup.planesin * step, setup.planecos * step),
        None => (FixedPoint::UNIT, FixedPoint::UNIT),
    };

    let dx = x1 - tables.centerx;
    let mut xfrac = setup.xoffs + setup.planecos * distance + xstep * dx;
    let mut yfrac = setup.yoffs - setup.planesin * distance + ystep * dx;

    let mut bg_offset = 0;
    if let Some(angle) = setup.ripple {
        let ripple = plane_ripple(clock, distance, angle, y, tables.screen_height);
        xfrac += ripple.dx;
        yfrac += ripple.dy;
        bg_offset = ripple.bg_offset;
    }

    RowMapping {
        xfrac,
        yfrac,
        xstep,
        ystep,
        distance,
        bg_offset,
    }
}

/// Feeds flat spans to the drawer
pub struct PlanarMapper<'a, D: SpanDrawer + ?Sized> {
    pub tables: &'a mut PlaneTables,
    pub lights: &'a LightTables,
    pub setup: PlanarSetup,
    pub shade: PlaneShade,
    pub clock: RippleClock,
    pub flat: &'a FlatPic,
    pub drawer: &'a mut D,
    pub stats: &'a mut FrameStats,
}

impl<D: SpanDrawer + ?Sized> SpanSink for PlanarMapper<'_, D> {
    fn map_span(&mut self, y: i32, x1: i32, x2: i32) {
        let row = map_planar_row(self.tables, &self.setup, &self.clock, y, x1);
        let span = PlanarSpan {
            y,
            x1,
            x2,
            xfrac: row.xfrac,
            yfrac: row.yfrac,
            xstep: row.xstep,
            ystep: row.ystep,
            colourmap: self.lights.flat_colourmap(&self.shade, row.distance),
            flat: self.flat,
            bg_offset: row.bg_offset,
        };
        self.drawer.draw_span(&span);
        self.stats.spans += 1;
        self.stats.pixels += (x2 - x1 + 1).max(0) as usize;
    }
}

/// Per-plane constants for sloped mapping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltedSetup {
    /// `origin . (u x v)`, turns `iz` in to view distance
    pub depth: f32,
    /// Recalculate the basis per row
    pub per_row: bool,
}

/// Build the slope coefficients of a plane in to `scratch`. Only row 0 is
/// filled unless the plane ripples, then every row gets its own displaced
/// basis.
pub fn prepare_tilted(
    scratch: &mut SlopeScratch,
    tables: &PlaneTables,
    key: &PlaneKey,
    clock: &RippleClock,
) -> Option<TiltedSetup> {
    #[cfg(feature = "hprof")]
    profile!("prepare_tilted");
    let slope = key.slope.as_ref()?;
    let view = &key.view;
    let focal = tables.focal_length.to_f32();

    let basis = SlopeBasis::new(slope, view, key.x_offset, key.y_offset, key.angle);
    let depth = basis.origin.dot(basis.u.cross(basis.v));

    if !key.ripples() {
        scratch.set_row(0, TiltedCoefficients::new(&basis, focal), 0);
        return Some(TiltedSetup {
            depth,
            per_row: false,
        });
    }

    let planeheight = (slope.z_at(view.x, view.y) - view.z).abs();
    let angle = view.angle + key.angle;
    for y in 0..tables.screen_height.min(scratch.len() as i32) {
        let distance = planeheight * tables.yslope[y as usize];
        let ripple = plane_ripple(clock, distance, angle, y, tables.screen_height);
        let basis = SlopeBasis::new(
            slope,
            view,
            key.x_offset + ripple.dx,
            key.y_offset + ripple.dy,
            key.angle,
        );
        scratch.set_row(y as usize, TiltedCoefficients::new(&basis, focal), ripple.bg_offset);
    }

    Some(TiltedSetup {
        depth,
        per_row: true,
    })
}

/// Feeds sloped spans to the drawer
pub struct TiltedMapper<'a, D: SpanDrawer + ?Sized> {
    pub tables: &'a PlaneTables,
    pub lights: &'a LightTables,
    pub scratch: &'a SlopeScratch,
    pub setup: TiltedSetup,
    pub shade: PlaneShade,
    pub flat: &'a FlatPic,
    pub drawer: &'a mut D,
    pub stats: &'a mut FrameStats,
}

impl<'a, D: SpanDrawer + ?Sized> TiltedMapper<'a, D> {
    /// The span for row `y`, without drawing it
    pub fn tilted_span(&self, y: i32, x1: i32, x2: i32) -> TiltedSpan<'a> {
        let row = if self.setup.per_row {
            y.max(0) as usize
        } else {
            0
        };
        let coeffs = self.scratch.row(row);

        let dx = (x1 - self.tables.centerx) as f32;
        let dy = (self.tables.centery - y) as f32;
        let (iz, uz, vz) = coeffs.at(dx, dy);

        // light by the view distance at the middle of the span
        let mid = iz + coeffs.sz.x * (x2 - x1) as f32 / 2.0;
        let distance = if mid.abs() > f32::EPSILON {
            FixedPoint::from_f32((self.tables.focal_length.to_f32() * self.setup.depth / mid).abs())
        } else {
            FixedPoint::MAX
        };

        TiltedSpan {
            y,
            x1,
            x2,
            iz,
            uz,
            vz,
            iz_step: coeffs.sz.x,
            uz_step: coeffs.su.x,
            vz_step: coeffs.sv.x,
            colourmap: self.lights.flat_colourmap(&self.shade, distance),
            flat: self.flat,
            bg_offset: if self.setup.per_row {
                self.scratch.bg_offset(row)
            } else {
                0
            },
        }
    }
}

impl<D: SpanDrawer + ?Sized> SpanSink for TiltedMapper<'_, D> {
    fn map_span(&mut self, y: i32, x1: i32, x2: i32) {
        let span = self.tilted_span(y, x1, x2);
        self.drawer.draw_tilted_span(&span);
        self.stats.spans += 1;
        self.stats.pixels += (x2 - x1 + 1).max(0) as usize;
    }
}
