use std::fmt::Debug;

use math::{Angle, FixedPoint};
use render_trait::ExtraColourmapId;

use crate::slope::Slope;

/// What `Visplane::top` reports for a column no geometry has claimed
pub const SENTINEL_TOP: i32 = 0xffff;
/// What `Visplane::bottom` reports for a column no geometry has claimed
pub const SENTINEL_BOTTOM: i32 = 0;

/// Index of a `Visplane` in the registry pool. Stable for the life of the
/// registry, across pool growth and frame clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaneId(pub(crate) u32);

impl PlaneId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where the view is rendered from. Snapshotted in to every plane since
/// portals render several viewpoints in one frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Viewpoint {
    pub x: FixedPoint,
    pub y: FixedPoint,
    pub z: FixedPoint,
    pub angle: Angle,
}

impl Viewpoint {
    pub const fn new(x: FixedPoint, y: FixedPoint, z: FixedPoint, angle: Angle) -> Self {
        Self { x, y, z, angle }
    }
}

/// A stacked floor (3D floor) the surface belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloorRef {
    pub id: u32,
    /// Rippling water surface
    pub ripple: bool,
}

/// A polyobject the surface is attached to. Flats on polyobjects move and
/// rotate with the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Polyobj {
    pub id: u32,
    pub centre_x: FixedPoint,
    pub centre_y: FixedPoint,
    pub angle: Angle,
}

/// A floor or ceiling surface as the traversal sees it, before any view
/// dependent adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneSurface {
    pub height: FixedPoint,
    pub picnum: usize,
    pub light_level: i32,
    pub x_offset: FixedPoint,
    pub y_offset: FixedPoint,
    /// Rotation of the flat
    pub angle: Angle,
    pub colourmap: Option<ExtraColourmapId>,
    pub floor: Option<FloorRef>,
    /// Don't apply the encore palette remap to this surface
    pub no_encore: bool,
}

impl PlaneSurface {
    pub const fn new(height: FixedPoint, picnum: usize, light_level: i32) -> Self {
        Self {
            height,
            picnum,
            light_level,
            x_offset: FixedPoint::ZERO,
            y_offset: FixedPoint::ZERO,
            angle: Angle::ZERO,
            colourmap: None,
            floor: None,
            no_encore: false,
        }
    }
}

/// The full rendering identity of a plane. Two surfaces with equal keys are
/// drawn as one plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneKey {
    pub height: FixedPoint,
    pub picnum: usize,
    pub light_level: i32,
    /// View adjusted texture offsets
    pub x_offset: FixedPoint,
    pub y_offset: FixedPoint,
    pub angle: Angle,
    pub colourmap: Option<ExtraColourmapId>,
    pub floor: Option<FloorRef>,
    pub polyobj: Option<Polyobj>,
    pub slope: Option<Slope>,
    pub view: Viewpoint,
    pub no_encore: bool,
}

impl PlaneKey {
    /// `visplane_hash`
    #[inline]
    pub(crate) fn hash(&self, buckets: usize) -> usize {
        let h = (self.picnum as u32)
            .wrapping_mul(3)
            .wrapping_add(self.light_level as u32)
            .wrapping_add((self.height.raw() as u32).wrapping_mul(7));
        h as usize & (buckets - 1)
    }

    #[inline]
    pub fn ripples(&self) -> bool {
        self.floor.is_some_and(|f| f.ripple)
    }
}

/// The rows of one screen column covered by a plane, inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnExtent {
    pub top: u16,
    pub bottom: u16,
}

/// Now what is a visplane, anyway?
///
/// A batch of floor or ceiling with one identity, and the silhouette of
/// screen pixels it covers. Columns are stored with a guard column either
/// side of the screen so the span sweep can look one column past each end.
#[derive(Clone)]
pub struct Visplane {
    pub key: PlaneKey,
    pub minx: i32,
    pub maxx: i32,
    /// Index is `x + 1`
    columns: Vec<Option<ColumnExtent>>,
    /// Next plane in the same bucket chain, or the free chain
    pub(crate) next: Option<PlaneId>,
}

impl Debug for Visplane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Visplane")
            .field("height", &self.key.height)
            .field("picnum", &self.key.picnum)
            .field("lightlevel", &self.key.light_level)
            .field("minx", &self.minx)
            .field("maxx", &self.maxx)
            .finish_non_exhaustive()
    }
}

impl Visplane {
    pub(crate) fn new(key: PlaneKey, screen_width: usize) -> Self {
        Visplane {
            key,
            minx: screen_width as i32,
            maxx: -1,
            columns: vec![None; screen_width + 2],
            next: None,
        }
    }

    /// Give a pooled plane a new identity with an empty silhouette
    pub(crate) fn reset(&mut self, key: PlaneKey, screen_width: usize) {
        self.key = key;
        self.minx = screen_width as i32;
        self.maxx = -1;
        if self.columns.len() != screen_width + 2 {
            self.columns = vec![None; screen_width + 2];
        } else {
            self.columns.fill(None);
        }
    }

    pub(crate) fn resize(&mut self, screen_width: usize) {
        self.columns.clear();
        self.columns.resize(screen_width + 2, None);
    }

    /// Screen width this plane was sized for
    pub fn screen_width(&self) -> usize {
        self.columns.len() - 2
    }

    /// The claimed rows of column `x`. The guard columns `-1` and `width`,
    /// and anything outside the screen, are always unclaimed.
    #[inline]
    pub fn column(&self, x: i32) -> Option<ColumnExtent> {
        let idx = x + 1;
        if idx < 0 {
            return None;
        }
        self.columns.get(idx as usize).copied().flatten()
    }

    #[inline]
    pub fn is_claimed(&self, x: i32) -> bool {
        self.column(x).is_some()
    }

    #[inline]
    pub fn top(&self, x: i32) -> i32 {
        self.column(x).map_or(SENTINEL_TOP, |c| c.top as i32)
    }

    #[inline]
    pub fn bottom(&self, x: i32) -> i32 {
        self.column(x).map_or(SENTINEL_BOTTOM, |c| c.bottom as i32)
    }

    /// Claim rows `top..=bottom` of column `x` for this plane. A `top` below
    /// `bottom` claims the column with no visible rows. Columns off the
    /// screen are ignored, the guard columns stay unclaimed.
    pub fn set_column(&mut self, x: i32, top: i32, bottom: i32) {
        if x < 0 || x as usize >= self.screen_width() {
            return;
        }
        let top = top.clamp(0, u16::MAX as i32) as u16;
        let bottom = bottom.clamp(0, u16::MAX as i32) as u16;
        self.columns[(x + 1) as usize] = Some(ColumnExtent { top, bottom });
    }

    pub fn clear_column(&mut self, x: i32) {
        if x >= 0 && (x as usize) < self.screen_width() {
            self.columns[(x + 1) as usize] = None;
        }
    }

    /// True if no column in `start..=stop` is claimed. An empty range is
    /// trivially unclaimed.
    pub fn unclaimed_in(&self, start: i32, stop: i32) -> bool {
        let start = start.max(-1);
        let stop = stop.min(self.screen_width() as i32);
        if stop < start {
            return true;
        }
        self.columns[(start + 1) as usize..=(stop + 1) as usize]
            .iter()
            .all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::{PlaneKey, SENTINEL_BOTTOM, SENTINEL_TOP, Viewpoint, Visplane};
    use math::{Angle, FixedPoint};

    fn key() -> PlaneKey {
        PlaneKey {
            height: FixedPoint::from_int(64),
            picnum: 1,
            light_level: 160,
            x_offset: FixedPoint::ZERO,
            y_offset: FixedPoint::ZERO,
            angle: Angle::ZERO,
            colourmap: None,
            floor: None,
            polyobj: None,
            slope: None,
            view: Viewpoint::default(),
            no_encore: false,
        }
    }

    #[test]
    fn default_vis_plane() {
        let mut plane = Visplane::new(key(), 320);
        assert_eq!(plane.minx, 320);
        assert_eq!(plane.maxx, -1);
        plane.set_column(10, 5, 20);
        plane.reset(key(), 320);
        assert!(!plane.is_claimed(10));
    }

    #[test]
    fn guard_columns_read_sentinel() {
        let mut plane = Visplane::new(key(), 8);
        for x in 0..8 {
            plane.set_column(x, 1, 3);
        }
        assert_eq!(plane.top(-1), SENTINEL_TOP);
        assert_eq!(plane.bottom(-1), SENTINEL_BOTTOM);
        assert_eq!(plane.top(8), SENTINEL_TOP);
        assert_eq!(plane.bottom(8), SENTINEL_BOTTOM);
        assert_eq!(plane.top(3), 1);
        assert_eq!(plane.bottom(3), 3);
    }

    #[test]
    fn unclaimed_range() {
        let mut plane = Visplane::new(key(), 16);
        plane.set_column(4, 0, 2);
        assert!(plane.unclaimed_in(0, 3));
        assert!(!plane.unclaimed_in(3, 6));
        assert!(plane.unclaimed_in(6, 2));
        plane.clear_column(4);
        assert!(plane.unclaimed_in(0, 15));
    }

    #[test]
    fn off_screen_columns_leave_guards_alone() {
        let mut plane = Visplane::new(key(), 4);
        for x in -1..=4 {
            plane.set_column(x, 2, 5);
        }
        assert_eq!(plane.top(-1), SENTINEL_TOP);
        assert_eq!(plane.top(4), SENTINEL_TOP);
        assert_eq!(plane.bottom(4), SENTINEL_BOTTOM);
        assert!((0..4).all(|x| plane.top(x) == 2));
    }
}
