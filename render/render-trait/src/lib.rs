//! The seams between the span renderer and the rest of an engine: the pixel
//! buffer being drawn in to, the flat (floor/ceiling texture) cache, and the
//! span drawer that turns a mapped span in to pixels.

mod flats;

pub use flats::*;
use math::FixedPoint;

/// channels should match pixel format
pub const SOFT_PIXEL_CHANNELS: usize = 4;

/// Entries in one colourmap, one per palette index
pub const COLOURMAP_SIZE: usize = 256;
/// Light-diminishing colourmaps in a colourmap lump
pub const NUMCOLOURMAPS: usize = 32;
/// Offset from a colourmap to its alternate-palette (encore) remap
pub const COLOURMAP_REMAP_OFFSET: usize = NUMCOLOURMAPS * COLOURMAP_SIZE;

#[derive(Clone, Copy, Debug)]
pub struct BufferSize {
    width_usize: usize,
    height_usize: usize,
    width: i32,
    height: i32,
    width_f32: f32,
    height_f32: f32,
}

impl BufferSize {
    pub const fn new(width: usize, height: usize) -> Self {
        Self {
            width_usize: width,
            height_usize: height,
            width: width as i32,
            height: height as i32,
            width_f32: width as f32,
            height_f32: height as f32,
        }
    }

    // todo, need const traits stabilised
    pub const fn width(&self) -> i32 {
        self.width
    }

    pub const fn height(&self) -> i32 {
        self.height
    }

    pub const fn half_width(&self) -> i32 {
        self.width / 2
    }

    pub const fn half_height(&self) -> i32 {
        self.height / 2
    }

    pub const fn width_usize(&self) -> usize {
        self.width_usize
    }

    pub const fn height_usize(&self) -> usize {
        self.height_usize
    }

    pub const fn width_f32(&self) -> f32 {
        self.width_f32
    }

    pub const fn height_f32(&self) -> f32 {
        self.height_f32
    }

    pub const fn half_width_f32(&self) -> f32 {
        self.width_f32 / 2.0
    }

    pub const fn half_height_f32(&self) -> f32 {
        self.height_f32 / 2.0
    }
}

pub trait PixelBuffer {
    fn size(&self) -> &BufferSize;
    fn clear(&mut self);
    fn clear_with_colour(&mut self, colour: &[u8; SOFT_PIXEL_CHANNELS]);
    fn set_pixel(&mut self, x: usize, y: usize, colour: &[u8; SOFT_PIXEL_CHANNELS]);
    fn read_pixel(&self, x: usize, y: usize) -> [u8; SOFT_PIXEL_CHANNELS];
    fn buf_mut(&mut self) -> &mut [u8];
    /// The pitch that should be added/subtracted to go up or down the Y while
    /// keeping X position
    fn pitch(&self) -> usize;
    /// Amount of colour channels, e.g: [R, G, B] == 3
    fn channels(&self) -> usize;
    /// Get an index point for this coord to copy a colour array too
    fn get_buf_index(&self, x: usize, y: usize) -> usize;
}

/// A per-region colourmap that replaces the base colourmap lump, e.g. fog or
/// coloured lighting in a sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtraColourmapId(pub u32);

/// Which colourmap a span is shaded with: a byte offset in to a colourmap
/// table, and the table to use (`None` for the base lump).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Colourmap {
    pub offset: usize,
    pub table: Option<ExtraColourmapId>,
}

impl Colourmap {
    /// The light-diminishing level `level` in the base table
    pub const fn level(level: usize) -> Self {
        Self {
            offset: level * COLOURMAP_SIZE,
            table: None,
        }
    }

    /// Shift to the alternate-palette remap of the same level
    pub const fn remapped(self) -> Self {
        Self {
            offset: self.offset + COLOURMAP_REMAP_OFFSET,
            table: self.table,
        }
    }

    /// Look the same offset up in a region override table instead. The
    /// distance shading is kept, only the table changes.
    pub const fn with_override(self, table: Option<ExtraColourmapId>) -> Self {
        match table {
            Some(id) => Self {
                offset: self.offset,
                table: Some(id),
            },
            None => self,
        }
    }
}

/// One row of a flat plane, ready to be drawn. The sample position is in
/// 16.16 texel units and steps by `xstep`/`ystep` per pixel.
#[derive(Debug, Clone, Copy)]
pub struct PlanarSpan<'a> {
    pub y: i32,
    pub x1: i32,
    pub x2: i32,
    pub xfrac: FixedPoint,
    pub yfrac: FixedPoint,
    pub xstep: FixedPoint,
    pub ystep: FixedPoint,
    pub colourmap: Colourmap,
    pub flat: &'a FlatPic,
    /// Rows to offset the background sample by for rippling water
    pub bg_offset: i32,
}

/// One row of a sloped plane. Texture coordinates are perspective-correct:
/// at each pixel `u = uz / iz` and `v = vz / iz`, with the three terms
/// stepping linearly across the row. `u`/`v` come out in 16.16 texel units.
#[derive(Debug, Clone, Copy)]
pub struct TiltedSpan<'a> {
    pub y: i32,
    pub x1: i32,
    pub x2: i32,
    pub iz: f32,
    pub uz: f32,
    pub vz: f32,
    pub iz_step: f32,
    pub uz_step: f32,
    pub vz_step: f32,
    pub colourmap: Colourmap,
    pub flat: &'a FlatPic,
    pub bg_offset: i32,
}

/// The pixel drawer. Pixel formatting and blending are up to the implementor.
pub trait SpanDrawer {
    fn draw_span(&mut self, span: &PlanarSpan);
    fn draw_tilted_span(&mut self, span: &TiltedSpan);
}

/// Supplies raw flat texels by flat number
pub trait FlatSource {
    fn flat(&self, picnum: usize) -> &FlatPic;
}
