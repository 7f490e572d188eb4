//! The visplane registry. Floors and ceilings that share a full rendering
//! identity are batched in to one `Visplane` so each is mapped and drawn once.
//!
//! Records live in one arena and are never freed. Each frame they are linked
//! in to hash bucket chains as the traversal finds them, and at the end of the
//! frame every chain is spliced back on to the free chain whole.

use log::debug;
use math::FixedPoint;

use crate::defs::{PlaneId, PlaneKey, PlaneSurface, Polyobj, Viewpoint, Visplane};
use crate::slope::Slope;

/// Hash buckets for shared planes, must be a power of two
pub const VISPLANE_HASH: usize = 512;

/// Which chain a plane lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSlot {
    /// Deduplicated by hash and exact key
    Shared(usize),
    /// Stacked floor planes. Never shared, one record per find.
    PerFloor,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Chain {
    head: Option<PlaneId>,
    tail: Option<PlaneId>,
}

impl Chain {
    const EMPTY: Self = Self {
        head: None,
        tail: None,
    };

    #[inline]
    fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

pub struct PlaneRegistry {
    pool: Vec<Visplane>,
    /// Slot each pooled record was last allocated in to
    slots: Vec<PlaneSlot>,
    buckets: Vec<Chain>,
    per_floor: Chain,
    free: Chain,
    screen_width: usize,
    /// Flat number of the sky
    sky_picnum: usize,
}

impl PlaneRegistry {
    pub fn new(screen_width: usize, sky_picnum: usize) -> Self {
        Self {
            pool: Vec::new(),
            slots: Vec::new(),
            buckets: vec![Chain::EMPTY; VISPLANE_HASH],
            per_floor: Chain::EMPTY,
            free: Chain::EMPTY,
            screen_width,
            sky_picnum,
        }
    }

    pub fn sky_picnum(&self) -> usize {
        self.sky_picnum
    }

    /// Find a plane matching the surface, or start a new one.
    ///
    /// Flat offsets are moved in to view space here so that the mapper only
    /// has to add the per-row distance. Sloped planes keep the raw offsets as
    /// the slope basis does its own projection.
    pub fn find_plane(
        &mut self,
        surface: &PlaneSurface,
        view: &Viewpoint,
        slope: Option<&Slope>,
        polyobj: Option<&Polyobj>,
    ) -> PlaneId {
        let mut x_offset = surface.x_offset;
        let mut y_offset = surface.y_offset;

        if slope.is_none() {
            x_offset += view.x;
            y_offset -= view.y;

            if !surface.angle.is_zero() {
                let (sin, cos) = (surface.angle.sin(), surface.angle.cos());
                let x = x_offset;
                x_offset = x * cos + y_offset * sin;
                y_offset = -(x * sin) + y_offset * cos;
            }
        }

        if let Some(po) = polyobj {
            if po.angle.is_zero() {
                x_offset -= po.centre_x;
                y_offset += po.centre_y;
            } else {
                let (sin, cos) = (po.angle.sin(), po.angle.cos());
                x_offset -= po.centre_x * cos + po.centre_y * sin;
                y_offset -= po.centre_x * sin - po.centre_y * cos;
            }
        }

        let mut height = surface.height;
        let mut light_level = surface.light_level;
        // sky on a stacked floor would otherwise make a plane per floor
        if surface.picnum == self.sky_picnum && surface.floor.is_some() {
            height = FixedPoint::ZERO;
            light_level = 0;
        }

        let key = PlaneKey {
            height,
            picnum: surface.picnum,
            light_level,
            x_offset,
            y_offset,
            angle: surface.angle,
            colourmap: surface.colourmap,
            floor: surface.floor,
            polyobj: polyobj.copied(),
            slope: slope.copied(),
            view: *view,
            no_encore: surface.no_encore,
        };

        let slot = if key.floor.is_some() {
            PlaneSlot::PerFloor
        } else {
            let hash = key.hash(VISPLANE_HASH);
            let mut next = self.buckets[hash].head;
            while let Some(id) = next {
                let check = &self.pool[id.index()];
                if check.key == key {
                    return id;
                }
                next = check.next;
            }
            PlaneSlot::Shared(hash)
        };

        self.new_plane(key, slot)
    }

    /// Claim columns `start..=stop` for the plane. If any of those columns
    /// are already claimed in the plane the identity is split off in to a new
    /// plane covering exactly `start..=stop`, which the caller must carry on
    /// with.
    pub fn check_plane(&mut self, id: PlaneId, start: i32, stop: i32) -> PlaneId {
        debug_assert!(start <= stop, "inverted plane range {start}..={stop}");
        let plane = &mut self.pool[id.index()];

        let (intrl, unionl) = if start < plane.minx {
            (plane.minx, start)
        } else {
            (start, plane.minx)
        };

        let (intrh, unionh) = if stop > plane.maxx {
            (plane.maxx, stop)
        } else {
            (stop, plane.maxx)
        };

        if plane.unclaimed_in(intrl, intrh) {
            // Use the same plane
            plane.minx = unionl;
            plane.maxx = unionh;
            return id;
        }

        // Otherwise make a new plane
        let key = plane.key;
        let slot = self.slots[id.index()];
        let new_id = self.new_plane(key, slot);
        let plane = &mut self.pool[new_id.index()];
        plane.minx = start;
        plane.maxx = stop;
        new_id
    }

    /// Widen the plane to cover `start..=stop` without checking for claimed
    /// columns. The caller guarantees the columns don't overlap. Planes on
    /// polyobjects track their own extent and are left alone.
    pub fn expand_plane(&mut self, id: PlaneId, start: i32, stop: i32) {
        let plane = &mut self.pool[id.index()];
        if plane.key.polyobj.is_some() {
            return;
        }
        plane.minx = plane.minx.min(start);
        plane.maxx = plane.maxx.max(stop);
    }

    /// Hand every active plane back to the free chain, one splice per chain
    pub fn clear_planes(&mut self) {
        let mut spliced = 0;
        for i in 0..self.buckets.len() {
            let chain = std::mem::replace(&mut self.buckets[i], Chain::EMPTY);
            if !chain.is_empty() {
                self.splice_free(chain);
                spliced += 1;
            }
        }
        let chain = std::mem::replace(&mut self.per_floor, Chain::EMPTY);
        if !chain.is_empty() {
            self.splice_free(chain);
            spliced += 1;
        }
        if spliced > 0 {
            debug!("Cleared {spliced} plane chains, pool {}", self.pool.len());
        }
    }

    /// Change the screen width. Clears the frame.
    pub fn resize(&mut self, screen_width: usize) {
        self.clear_planes();
        self.screen_width = screen_width;
        for plane in self.pool.iter_mut() {
            plane.resize(screen_width);
        }
    }

    #[inline]
    pub fn plane(&self, id: PlaneId) -> &Visplane {
        &self.pool[id.index()]
    }

    #[inline]
    pub fn plane_mut(&mut self, id: PlaneId) -> &mut Visplane {
        &mut self.pool[id.index()]
    }

    #[inline]
    pub fn slot(&self, id: PlaneId) -> PlaneSlot {
        self.slots[id.index()]
    }

    /// Every plane found this frame, shared buckets first
    pub fn active_planes(&self) -> impl Iterator<Item = PlaneId> + '_ {
        self.buckets
            .iter()
            .chain(std::iter::once(&self.per_floor))
            .flat_map(move |chain| self.walk(chain.head))
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    pub fn free_len(&self) -> usize {
        self.walk(self.free.head).count()
    }

    pub fn active_len(&self) -> usize {
        self.active_planes().count()
    }

    fn walk(&self, head: Option<PlaneId>) -> impl Iterator<Item = PlaneId> + '_ {
        std::iter::successors(head, move |id| self.pool[id.index()].next)
    }

    fn splice_free(&mut self, chain: Chain) {
        if let Some(tail) = chain.tail {
            self.pool[tail.index()].next = self.free.head;
            if self.free.tail.is_none() {
                self.free.tail = Some(tail);
            }
            self.free.head = chain.head;
        }
    }

    fn new_plane(&mut self, key: PlaneKey, slot: PlaneSlot) -> PlaneId {
        let id = match self.free.head {
            Some(id) => {
                let plane = &mut self.pool[id.index()];
                self.free.head = plane.next;
                if self.free.head.is_none() {
                    self.free.tail = None;
                }
                plane.reset(key, self.screen_width);
                self.slots[id.index()] = slot;
                id
            }
            None => {
                if self.pool.try_reserve(1).is_err() || self.slots.try_reserve(1).is_err() {
                    panic!("Out of visplanes: could not grow pool of {}", self.pool.len());
                }
                let id = PlaneId(self.pool.len() as u32);
                self.pool.push(Visplane::new(key, self.screen_width));
                self.slots.push(slot);
                if self.pool.len().is_power_of_two() {
                    debug!("Visplane pool grown to {}", self.pool.len());
                }
                id
            }
        };

        let chain = match slot {
            PlaneSlot::Shared(hash) => &mut self.buckets[hash],
            PlaneSlot::PerFloor => &mut self.per_floor,
        };
        self.pool[id.index()].next = chain.head;
        chain.head = Some(id);
        if chain.tail.is_none() {
            chain.tail = Some(id);
        }
        id
    }
}

/// Height of a plane relative to the view, the distance scale for mapping
#[inline]
pub fn plane_height(key: &PlaneKey) -> FixedPoint {
    (key.height - key.view.z).abs()
}

#[cfg(test)]
mod tests {
    use super::{PlaneRegistry, PlaneSlot};
    use crate::defs::{
        FloorRef, PlaneSurface, Polyobj, SENTINEL_BOTTOM, SENTINEL_TOP, Viewpoint,
    };
    use math::{Angle, FixedPoint};

    const SKY: usize = 99;

    fn view() -> Viewpoint {
        Viewpoint::new(
            FixedPoint::from_int(100),
            FixedPoint::from_int(-50),
            FixedPoint::from_int(41),
            Angle::from_degrees(45.0),
        )
    }

    fn surface() -> PlaneSurface {
        PlaneSurface::new(FixedPoint::from_int(100), 7, 10)
    }

    #[test]
    fn merge_identity() {
        let mut reg = PlaneRegistry::new(320, SKY);
        let a = reg.find_plane(&surface(), &view(), None, None);
        let b = reg.find_plane(&surface(), &view(), None, None);
        assert_eq!(a, b);
        assert_eq!(reg.active_len(), 1);

        let c = reg.check_plane(a, 0, 10);
        assert_eq!(c, a);
        let d = reg.find_plane(&surface(), &view(), None, None);
        assert_eq!(d, a);
    }

    #[test]
    fn differing_identity_does_not_merge() {
        let mut reg = PlaneRegistry::new(320, SKY);
        let a = reg.find_plane(&surface(), &view(), None, None);
        let mut other = surface();
        other.light_level = 11;
        let b = reg.find_plane(&other, &view(), None, None);
        assert_ne!(a, b);

        let mut moved = view();
        moved.angle = Angle::ZERO;
        let c = reg.find_plane(&surface(), &moved, None, None);
        assert_ne!(a, c);
        assert_eq!(reg.active_len(), 3);
    }

    #[test]
    fn offsets_move_with_view() {
        let mut reg = PlaneRegistry::new(320, SKY);
        let v = Viewpoint::new(
            FixedPoint::from_int(16),
            FixedPoint::from_int(8),
            FixedPoint::ZERO,
            Angle::ZERO,
        );
        let id = reg.find_plane(&surface(), &v, None, None);
        let key = reg.plane(id).key;
        assert_eq!(key.x_offset, FixedPoint::from_int(16));
        assert_eq!(key.y_offset, FixedPoint::from_int(-8));
    }

    #[test]
    fn union_law() {
        let mut reg = PlaneRegistry::new(320, SKY);
        let a = reg.find_plane(&surface(), &view(), None, None);
        let a = reg.check_plane(a, 10, 20);
        for x in 10..=20 {
            reg.plane_mut(a).set_column(x, 50, 60);
        }
        let b = reg.check_plane(a, 40, 50);
        assert_eq!(a, b);
        let plane = reg.plane(b);
        assert_eq!((plane.minx, plane.maxx), (10, 50));
        // the gap between the two claims is still open
        for x in 21..40 {
            assert_eq!(plane.top(x), SENTINEL_TOP);
            assert_eq!(plane.bottom(x), SENTINEL_BOTTOM);
        }
    }

    #[test]
    fn collision_law() {
        let mut reg = PlaneRegistry::new(320, SKY);
        let a = reg.find_plane(&surface(), &view(), None, None);
        let a = reg.check_plane(a, 0, 9);
        for x in 0..=9 {
            reg.plane_mut(a).set_column(x, 100, 120);
        }
        let b = reg.check_plane(a, 5, 14);
        assert_ne!(a, b);
        assert_eq!((reg.plane(b).minx, reg.plane(b).maxx), (5, 14));
        assert_eq!((reg.plane(a).minx, reg.plane(a).maxx), (0, 9));
        assert_eq!(reg.plane(b).key, reg.plane(a).key);
        assert_eq!(reg.slot(b), reg.slot(a));
        assert!(!reg.plane(b).is_claimed(6));
    }

    #[test]
    fn idempotent_clear() {
        let mut reg = PlaneRegistry::new(64, SKY);
        for light in 0..20 {
            let mut s = surface();
            s.light_level = light;
            reg.find_plane(&s, &view(), None, None);
        }
        reg.clear_planes();
        let pool = reg.pool_len();
        let free: Vec<_> = reg.walk(reg.free.head).collect();
        reg.clear_planes();
        assert_eq!(reg.pool_len(), pool);
        assert_eq!(reg.walk(reg.free.head).collect::<Vec<_>>(), free);
        assert_eq!(reg.active_len(), 0);
        assert_eq!(reg.free_len(), 20);
    }

    #[test]
    fn pool_is_reused() {
        let mut reg = PlaneRegistry::new(64, SKY);
        for frame in 0..3 {
            for light in 0..8 {
                let mut s = surface();
                s.light_level = light + frame;
                let id = reg.find_plane(&s, &view(), None, None);
                reg.check_plane(id, 0, 63);
                reg.plane_mut(id).set_column(3, 1, 2);
            }
            assert_eq!(reg.active_len(), 8);
            reg.clear_planes();
        }
        assert_eq!(reg.pool_len(), 8);
        assert_eq!(reg.free_len(), 8);
    }

    #[test]
    fn sentinel_guard() {
        let mut reg = PlaneRegistry::new(32, SKY);
        reg.find_plane(&surface(), &view(), None, None);
        reg.clear_planes();
        let id = reg.find_plane(&surface(), &view(), None, None);
        let id = reg.check_plane(id, 4, 9);
        for x in 4..=9 {
            reg.plane_mut(id).set_column(x, 0, 31);
        }
        let plane = reg.plane(id);
        for x in [plane.minx - 1, plane.maxx + 1] {
            assert_eq!(plane.top(x), SENTINEL_TOP);
            assert_eq!(plane.bottom(x), SENTINEL_BOTTOM);
        }
    }

    #[test]
    fn per_floor_planes_never_merge() {
        let mut reg = PlaneRegistry::new(320, SKY);
        let mut s = surface();
        s.floor = Some(FloorRef {
            id: 3,
            ripple: false,
        });
        let a = reg.find_plane(&s, &view(), None, None);
        let b = reg.find_plane(&s, &view(), None, None);
        assert_ne!(a, b);
        assert_eq!(reg.slot(a), PlaneSlot::PerFloor);
        assert_eq!(reg.active_len(), 2);
    }

    #[test]
    fn sky_on_floors_normalised() {
        let mut reg = PlaneRegistry::new(320, SKY);
        let mut s = PlaneSurface::new(FixedPoint::from_int(128), SKY, 200);
        s.floor = Some(FloorRef {
            id: 1,
            ripple: false,
        });
        let a = reg.find_plane(&s, &view(), None, None);
        s.floor = Some(FloorRef {
            id: 2,
            ripple: false,
        });
        s.height = FixedPoint::from_int(64);
        s.light_level = 96;
        let b = reg.find_plane(&s, &view(), None, None);

        let (ka, kb) = (reg.plane(a).key, reg.plane(b).key);
        assert_eq!(ka.height, FixedPoint::ZERO);
        assert_eq!(kb.height, FixedPoint::ZERO);
        assert_eq!(ka.light_level, 0);
        assert_eq!(kb.light_level, 0);
        assert_eq!(ka.hash(512), kb.hash(512));

        // no floor, sky keeps its height
        let plain = PlaneSurface::new(FixedPoint::from_int(128), SKY, 200);
        let c = reg.find_plane(&plain, &view(), None, None);
        assert_eq!(reg.plane(c).key.height, FixedPoint::from_int(128));
    }

    #[test]
    fn expand_skips_polyobj_planes() {
        let mut reg = PlaneRegistry::new(320, SKY);
        let po = Polyobj {
            id: 1,
            centre_x: FixedPoint::from_int(32),
            centre_y: FixedPoint::from_int(32),
            angle: Angle::ZERO,
        };
        let id = reg.find_plane(&surface(), &view(), None, Some(&po));
        let id = reg.check_plane(id, 10, 20);
        reg.expand_plane(id, 0, 100);
        assert_eq!((reg.plane(id).minx, reg.plane(id).maxx), (10, 20));

        let plain = reg.find_plane(&surface(), &view(), None, None);
        reg.expand_plane(plain, 0, 100);
        reg.expand_plane(plain, 50, 200);
        assert_eq!((reg.plane(plain).minx, reg.plane(plain).maxx), (0, 200));
    }

    #[test]
    fn polyobj_offsets() {
        let mut reg = PlaneRegistry::new(320, SKY);
        let v = Viewpoint::default();
        let po = Polyobj {
            id: 1,
            centre_x: FixedPoint::from_int(32),
            centre_y: FixedPoint::from_int(16),
            angle: Angle::ZERO,
        };
        let id = reg.find_plane(&surface(), &v, None, Some(&po));
        let key = reg.plane(id).key;
        assert_eq!(key.x_offset, FixedPoint::from_int(-32));
        assert_eq!(key.y_offset, FixedPoint::from_int(16));
    }

    fn close(a: FixedPoint, b: i32) -> bool {
        (a.raw() - FixedPoint::from_int(b).raw()).abs() <= 64
    }

    #[test]
    fn offsets_turn_with_flat_angle() {
        let mut reg = PlaneRegistry::new(320, SKY);
        let v = Viewpoint::new(
            FixedPoint::from_int(16),
            FixedPoint::from_int(8),
            FixedPoint::ZERO,
            Angle::ZERO,
        );
        let mut s = surface();
        s.angle = Angle::DEG90;
        let id = reg.find_plane(&s, &v, None, None);
        let key = reg.plane(id).key;
        // (16, -8) a quarter turn in to the flat's frame
        assert!(close(key.x_offset, -8), "x {:?}", key.x_offset);
        assert!(close(key.y_offset, -16), "y {:?}", key.y_offset);
        assert_eq!(key.angle, Angle::DEG90);
    }

    #[test]
    fn turned_polyobj_offsets() {
        let mut reg = PlaneRegistry::new(320, SKY);
        let po = Polyobj {
            id: 1,
            centre_x: FixedPoint::from_int(32),
            centre_y: FixedPoint::from_int(16),
            angle: Angle::DEG90,
        };
        let id = reg.find_plane(&surface(), &Viewpoint::default(), None, Some(&po));
        let key = reg.plane(id).key;
        assert!(close(key.x_offset, -16), "x {:?}", key.x_offset);
        assert!(close(key.y_offset, -32), "y {:?}", key.y_offset);
        // a different turn of the same polyobject is a different plane
        let turned = Polyobj {
            angle: Angle::DEG180,
            ..po
        };
        let other = reg.find_plane(&surface(), &Viewpoint::default(), None, Some(&turned));
        assert_ne!(id, other);
    }

    #[test]
    fn scenario_b() {
        let mut reg = PlaneRegistry::new(320, SKY);
        let mut s = PlaneSurface::new(FixedPoint::from_int(100), 7, 10);
        s.x_offset = FixedPoint::ZERO;
        s.y_offset = FixedPoint::ZERO;
        let a = reg.find_plane(&s, &view(), None, None);
        let b = reg.find_plane(&s, &view(), None, None);
        assert_eq!(a, b);
    }

    #[test]
    fn resize_resets_columns() {
        let mut reg = PlaneRegistry::new(320, SKY);
        let id = reg.find_plane(&surface(), &view(), None, None);
        reg.check_plane(id, 0, 10);
        reg.plane_mut(id).set_column(5, 1, 2);
        reg.resize(100);
        assert_eq!(reg.active_len(), 0);
        let id = reg.find_plane(&surface(), &view(), None, None);
        assert_eq!(reg.plane(id).screen_width(), 100);
        assert_eq!(reg.plane(id).minx, 100);
        assert!(!reg.plane(id).is_claimed(5));
    }
}
