//! Distance shading for flats, and the colourmap tables the drawer looks
//! shaded colours up in.

use log::warn;
use math::FixedPoint;
use render_trait::{
    COLOURMAP_REMAP_OFFSET, COLOURMAP_SIZE, Colourmap, ExtraColourmapId, NUMCOLOURMAPS,
};

use crate::defs::PlaneKey;

pub const LIGHTLEVELS: usize = 16;
pub const LIGHTSEGSHIFT: i32 = 4;
pub const MAXLIGHTZ: usize = 128;
pub const LIGHTZSHIFT: i32 = 20;

/// How a plane is shaded, resolved once per plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneShade {
    /// Row in the zlight table
    pub light: usize,
    /// Use the alternate-palette remap
    pub remap: bool,
    pub extra: Option<ExtraColourmapId>,
}

pub struct LightTables {
    // 16 groups of 128 sets of indexes to colourmap
    zlight: [[usize; MAXLIGHTZ]; LIGHTLEVELS],
    /// Forced colourmap for every distance, e.g. light amplification
    fixed_colourmap: Option<usize>,
    /// Added to every plane's light, e.g. weapon flash
    extra_light: i32,
}

impl Default for LightTables {
    fn default() -> Self {
        Self::new()
    }
}

impl LightTables {
    pub fn new() -> Self {
        Self {
            zlight: Self::init_zlight_scales(),
            fixed_colourmap: None,
            extra_light: 0,
        }
    }

    fn init_zlight_scales() -> [[usize; MAXLIGHTZ]; LIGHTLEVELS] {
        let mut tmp = [[0usize; MAXLIGHTZ]; LIGHTLEVELS];
        let levels = LIGHTLEVELS as i32;
        let maps = NUMCOLOURMAPS as i32;
        for i in 0..levels {
            let startmap = ((levels - 1 - i) * 2) * maps / levels;
            for j in 0..MAXLIGHTZ as i32 {
                let scale = 160 / (j + 1);
                let level = (startmap - scale / 2).clamp(0, maps - 1);
                tmp[i as usize][j as usize] = level as usize;
            }
        }
        tmp
    }

    /// A colourmap level forced for all light levels and distances, or
    /// `None` for normal shading
    pub fn set_fixed_colourmap(&mut self, level: Option<usize>) {
        if let Some(l) = level {
            if l >= NUMCOLOURMAPS {
                warn!("Fixed colourmap {l} out of range, clamping");
            }
        }
        self.fixed_colourmap = level.map(|l| l.min(NUMCOLOURMAPS - 1));
    }

    pub fn fixed_colourmap(&self) -> Option<usize> {
        self.fixed_colourmap
    }

    pub fn set_extra_light(&mut self, extra_light: i32) {
        self.extra_light = extra_light;
    }

    /// The zlight row for a sector light level
    #[inline]
    pub fn light_index(&self, light_level: i32) -> usize {
        ((light_level >> LIGHTSEGSHIFT) + self.extra_light).clamp(0, LIGHTLEVELS as i32 - 1)
            as usize
    }

    pub fn plane_shade(&self, key: &PlaneKey, encore: bool) -> PlaneShade {
        PlaneShade {
            light: self.light_index(key.light_level),
            remap: encore && !key.no_encore,
            extra: key.colourmap,
        }
    }

    /// Colourmap for a flat at `distance` from the view
    #[inline]
    pub fn flat_colourmap(&self, shade: &PlaneShade, distance: FixedPoint) -> Colourmap {
        let level = match self.fixed_colourmap {
            Some(fixed) => fixed,
            None => {
                let pindex = (distance.raw() >> LIGHTZSHIFT).clamp(0, MAXLIGHTZ as i32 - 1);
                let light = shade.light.min(LIGHTLEVELS - 1);
                #[cfg(not(feature = "safety_check"))]
                unsafe {
                    *self
                        .zlight
                        .get_unchecked(light)
                        .get_unchecked(pindex as usize)
                }
                #[cfg(feature = "safety_check")]
                self.zlight[light][pindex as usize]
            }
        };

        let mut colourmap = Colourmap::level(level);
        if shade.remap {
            colourmap = colourmap.remapped();
        }
        colourmap.with_override(shade.extra)
    }
}

/// The base colourmap lump plus any region colourmaps, indexed by
/// `Colourmap`.
pub struct ColourmapData {
    base: Vec<u8>,
    extra: Vec<Vec<u8>>,
}

impl ColourmapData {
    /// The lump must hold `NUMCOLOURMAPS` maps. If it has no alternate
    /// palette half the normal maps are repeated in its place.
    pub fn new(mut base: Vec<u8>) -> Self {
        let full = COLOURMAP_REMAP_OFFSET * 2;
        if base.len() < COLOURMAP_REMAP_OFFSET {
            warn!("Colourmap lump is short ({} bytes), padding", base.len());
            base.resize(COLOURMAP_REMAP_OFFSET, 0);
        }
        if base.len() < full {
            base.truncate(COLOURMAP_REMAP_OFFSET);
            base.extend_from_within(..COLOURMAP_REMAP_OFFSET);
        }
        Self {
            base,
            extra: Vec::new(),
        }
    }

    /// Maps that fade linearly from full bright to black, with index 0
    /// darkest. Useful with a ramp palette.
    pub fn linear_fade() -> Self {
        let mut base = Vec::with_capacity(COLOURMAP_REMAP_OFFSET);
        for level in 0..NUMCOLOURMAPS {
            let keep = NUMCOLOURMAPS - level;
            for i in 0..COLOURMAP_SIZE {
                base.push((i * keep / NUMCOLOURMAPS) as u8);
            }
        }
        Self::new(base)
    }

    /// Register a region colourmap, same layout as the base lump
    pub fn add_extra(&mut self, table: Vec<u8>) -> ExtraColourmapId {
        let id = ExtraColourmapId(self.extra.len() as u32);
        let mut table = Self::new(table).base;
        table.shrink_to_fit();
        self.extra.push(table);
        id
    }

    /// The 256 entry map a span should be shaded with
    #[inline]
    pub fn resolve(&self, colourmap: Colourmap) -> &[u8] {
        let table = colourmap
            .table
            .and_then(|id| self.extra.get(id.0 as usize))
            .unwrap_or(&self.base);
        let offset = colourmap.offset.min(table.len() - COLOURMAP_SIZE);
        &table[offset..offset + COLOURMAP_SIZE]
    }
}

#[cfg(test)]
mod tests {
    use super::{ColourmapData, LightTables, MAXLIGHTZ, PlaneShade};
    use crate::defs::{PlaneKey, Viewpoint};
    use math::{Angle, FixedPoint};
    use render_trait::{COLOURMAP_REMAP_OFFSET, Colourmap, ExtraColourmapId};

    fn shade(light: usize) -> PlaneShade {
        PlaneShade {
            light,
            remap: false,
            extra: None,
        }
    }

    #[test]
    fn zlight_darkens_with_distance() {
        let lights = LightTables::new();
        for light in 0..16 {
            let mut last = 0;
            for j in 0..MAXLIGHTZ {
                let dist = FixedPoint::new((j as i32) << 20);
                let c = lights.flat_colourmap(&shade(light), dist);
                assert!(c.offset >= last);
                last = c.offset;
            }
        }
        // bright and close is full bright
        assert_eq!(
            lights.flat_colourmap(&shade(15), FixedPoint::ZERO),
            Colourmap::level(0)
        );
    }

    #[test]
    fn distance_is_clamped() {
        let lights = LightTables::new();
        let far = lights.flat_colourmap(&shade(0), FixedPoint::MAX);
        assert_eq!(far, Colourmap::level(31));
        let behind = lights.flat_colourmap(&shade(0), FixedPoint::new(-5));
        assert_eq!(behind, lights.flat_colourmap(&shade(0), FixedPoint::ZERO));
    }

    #[test]
    fn light_index_clamped() {
        let mut lights = LightTables::new();
        assert_eq!(lights.light_index(255), 15);
        assert_eq!(lights.light_index(-20), 0);
        lights.set_extra_light(2);
        assert_eq!(lights.light_index(128), 10);
    }

    #[test]
    fn fixed_colourmap_ignores_distance() {
        let mut lights = LightTables::new();
        lights.set_fixed_colourmap(Some(4));
        let s = PlaneShade {
            light: 2,
            remap: true,
            extra: Some(ExtraColourmapId(1)),
        };
        let c = lights.flat_colourmap(&s, FixedPoint::from_int(3000));
        assert_eq!(c.offset, 4 * 256 + COLOURMAP_REMAP_OFFSET);
        assert_eq!(c.table, Some(ExtraColourmapId(1)));
        lights.set_fixed_colourmap(None);
        assert_ne!(lights.flat_colourmap(&s, FixedPoint::from_int(3000)).offset, c.offset);
    }

    #[test]
    fn colourmap_lookup() {
        let mut data = ColourmapData::linear_fade();
        assert_eq!(data.resolve(Colourmap::level(0))[200], 200);
        assert_eq!(data.resolve(Colourmap::level(16))[200], 100);
        // no alternate palette in the lump, remap repeats the base maps
        assert_eq!(data.resolve(Colourmap::level(16).remapped())[200], 100);

        let red = data.add_extra(vec![7; 256 * 32]);
        let c = Colourmap::level(3).with_override(Some(red));
        assert!(data.resolve(c).iter().all(|i| *i == 7));
        // unknown region maps fall back to the base lump
        let c = Colourmap::level(0).with_override(Some(ExtraColourmapId(9)));
        assert_eq!(data.resolve(c)[5], 5);
    }

    #[test]
    fn encore_remap_can_be_suppressed() {
        let lights = LightTables::new();
        let mut key = PlaneKey {
            height: FixedPoint::ZERO,
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
        };
        assert!(lights.plane_shade(&key, true).remap);
        assert!(!lights.plane_shade(&key, false).remap);

        key.no_encore = true;
        let shade = lights.plane_shade(&key, true);
        assert!(!shade.remap);
        let c = lights.flat_colourmap(&shade, FixedPoint::ZERO);
        assert!(c.offset < COLOURMAP_REMAP_OFFSET);
    }
}
