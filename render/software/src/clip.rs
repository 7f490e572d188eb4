//! Vertical clipping per screen column. Walls narrow the open window of each
//! column as the traversal runs front to back, and portals save and restore
//! ranges of it to render another viewpoint in to the same frame.

use math::FixedPoint;

/// Stacked floors that can carry their own clip per frame
pub const MAX_FFLOORS: usize = 8;

/// Clip for one stacked floor surface
#[derive(Debug, Clone)]
pub struct FloorClip {
    /// Lowest row above the floor surface still open, per column
    pub clip: Vec<i32>,
    /// Wall scale at the column the floor surface was last clipped at
    pub scale: Vec<FixedPoint>,
}

impl FloorClip {
    fn new(screen_width: usize, screen_height: usize) -> Self {
        Self {
            clip: vec![screen_height as i32; screen_width],
            scale: vec![FixedPoint::MAX; screen_width],
        }
    }

    fn reset(&mut self, screen_width: usize, screen_height: usize) {
        self.clip.clear();
        self.clip.resize(screen_width, screen_height as i32);
        self.scale.clear();
        self.scale.resize(screen_width, FixedPoint::MAX);
    }
}

/// A copy of a column range of `ClipState`, taken before a portal view is
/// rendered in to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalClip {
    pub ceilingclip: Vec<i32>,
    pub floorclip: Vec<i32>,
    pub frontscale: Vec<FixedPoint>,
}

/// Clip values are the solid pixel bounding the range.
///  floorclip starts out SCREENHEIGHT
///  ceilingclip starts out -1
#[derive(Debug, Clone)]
pub struct ClipState {
    pub floorclip: Vec<i32>,
    pub ceilingclip: Vec<i32>,
    /// Scale of the nearest wall drawn in the column
    pub frontscale: Vec<FixedPoint>,
    ffloor: Vec<FloorClip>,
    screen_width: usize,
    screen_height: usize,
}

impl ClipState {
    pub fn new(screen_width: usize, screen_height: usize) -> Self {
        Self {
            floorclip: vec![screen_height as i32; screen_width],
            ceilingclip: vec![-1; screen_width],
            frontscale: vec![FixedPoint::MAX; screen_width],
            ffloor: (0..MAX_FFLOORS)
                .map(|_| FloorClip::new(screen_width, screen_height))
                .collect(),
            screen_width,
            screen_height,
        }
    }

    pub fn screen_width(&self) -> usize {
        self.screen_width
    }

    pub fn screen_height(&self) -> usize {
        self.screen_height
    }

    /// Open every column for a new frame, resizing if the viewport changed
    pub fn reset(&mut self, screen_width: usize, screen_height: usize) {
        self.screen_width = screen_width;
        self.screen_height = screen_height;

        self.floorclip.clear();
        self.floorclip.resize(screen_width, screen_height as i32);
        self.ceilingclip.clear();
        self.ceilingclip.resize(screen_width, -1);
        self.frontscale.clear();
        self.frontscale.resize(screen_width, FixedPoint::MAX);

        for f in self.ffloor.iter_mut() {
            f.reset(screen_width, screen_height);
        }
    }

    /// Copy the clip of columns `start..end`
    pub fn save_range(&self, start: usize, end: usize) -> PortalClip {
        debug_assert!(start <= end && end <= self.screen_width, "bad portal range {start}..{end}");
        let end = end.min(self.screen_width);
        let start = start.min(end);
        PortalClip {
            ceilingclip: self.ceilingclip[start..end].to_vec(),
            floorclip: self.floorclip[start..end].to_vec(),
            frontscale: self.frontscale[start..end].to_vec(),
        }
    }

    /// Write a saved range back. Every column outside `start..end` is opened
    /// fully so the portal view doesn't see clip left over from elsewhere.
    pub fn restore_range(&mut self, start: usize, end: usize, saved: &PortalClip) {
        debug_assert!(start <= end && end <= self.screen_width, "bad portal range {start}..{end}");
        debug_assert_eq!(saved.floorclip.len(), end.saturating_sub(start));
        let end = end.min(self.screen_width);
        let start = start.min(end);
        let len = (end - start).min(saved.floorclip.len());

        self.ceilingclip[start..start + len].copy_from_slice(&saved.ceilingclip[..len]);
        self.floorclip[start..start + len].copy_from_slice(&saved.floorclip[..len]);
        self.frontscale[start..start + len].copy_from_slice(&saved.frontscale[..len]);

        let open = self.screen_height as i32;
        for x in (0..start).chain(start + len..self.screen_width) {
            self.floorclip[x] = open;
            self.ceilingclip[x] = -1;
        }
    }

    #[inline]
    pub fn floor_clip(&self, slot: usize) -> &FloorClip {
        &self.ffloor[slot]
    }

    #[inline]
    pub fn floor_clip_mut(&mut self, slot: usize) -> &mut FloorClip {
        &mut self.ffloor[slot]
    }

    /// Rows still open in column `x`, `None` if the column is closed
    #[inline]
    pub fn open_rows(&self, x: usize) -> Option<(i32, i32)> {
        let top = self.ceilingclip[x] + 1;
        let bottom = self.floorclip[x] - 1;
        (top <= bottom).then_some((top, bottom))
    }
}
