//! A span drawer that writes shaded flat texels in to a `PixelBuffer`.

#[cfg(feature = "hprof")]
use coarse_prof::profile;
use render_trait::{
    FlatPic, FlatShifts, PixelBuffer, PlanarSpan, SOFT_PIXEL_CHANNELS, SpanDrawer, TiltedSpan,
};

use crate::lighting::ColourmapData;

pub type Palette = [[u8; SOFT_PIXEL_CHANNELS]; 256];

/// Texel index of a 16.16 sample position already shifted up for the size
#[inline(always)]
fn texel_spot(shifts: &FlatShifts, xpos: u32, ypos: u32) -> usize {
    (((ypos >> shifts.y_shift) & shifts.mask) | (xpos >> shifts.x_shift)) as usize
}

/// 50/50 mix, used to see the background through rippling water
#[inline]
fn blend(a: [u8; SOFT_PIXEL_CHANNELS], b: [u8; SOFT_PIXEL_CHANNELS]) -> [u8; SOFT_PIXEL_CHANNELS] {
    let mut out = [0; SOFT_PIXEL_CHANNELS];
    for i in 0..SOFT_PIXEL_CHANNELS {
        out[i] = ((a[i] as u16 + b[i] as u16) / 2) as u8;
    }
    out
}

pub struct SoftSpanDrawer<'a, B: PixelBuffer> {
    buffer: &'a mut B,
    colourmaps: &'a ColourmapData,
    palette: &'a Palette,
}

impl<'a, B: PixelBuffer> SoftSpanDrawer<'a, B> {
    pub fn new(buffer: &'a mut B, colourmaps: &'a ColourmapData, palette: &'a Palette) -> Self {
        Self {
            buffer,
            colourmaps,
            palette,
        }
    }

    /// Clip a span to the buffer, `None` if nothing is left
    #[inline]
    fn clip(&self, y: i32, x1: i32, x2: i32) -> Option<(usize, i32, i32)> {
        let size = self.buffer.size();
        if y < 0 || y >= size.height() {
            return None;
        }
        let x1 = x1.max(0);
        let x2 = x2.min(size.width() - 1);
        (x1 <= x2).then_some((y as usize, x1, x2))
    }

    #[inline(always)]
    fn put(
        &mut self,
        x: usize,
        y: usize,
        bg_row: Option<usize>,
        flat: &FlatPic,
        spot: usize,
        cmap: &[u8],
    ) {
        #[cfg(not(feature = "safety_check"))]
        let colour = unsafe {
            let texel = *flat.data().get_unchecked(spot);
            *self.palette.get_unchecked(*cmap.get_unchecked(texel as usize) as usize)
        };
        #[cfg(feature = "safety_check")]
        let colour = self.palette[cmap[flat.texel(spot) as usize] as usize];

        match bg_row {
            Some(row) => {
                let bg = self.buffer.read_pixel(x, row);
                self.buffer.set_pixel(x, y, &blend(colour, bg));
            }
            None => self.buffer.set_pixel(x, y, &colour),
        }
    }

    fn bg_row(&self, y: usize, bg_offset: i32) -> Option<usize> {
        if bg_offset == 0 {
            return None;
        }
        let row = (y as i32 + bg_offset).clamp(0, self.buffer.size().height() - 1);
        Some(row as usize)
    }
}

impl<B: PixelBuffer> SpanDrawer for SoftSpanDrawer<'_, B> {
    fn draw_span(&mut self, span: &PlanarSpan) {
        #[cfg(feature = "hprof")]
        profile!("draw_span");
        let Some((y, x1, x2)) = self.clip(span.y, span.x1, span.x2) else {
            return;
        };
        let colourmaps = self.colourmaps;
        let cmap = colourmaps.resolve(span.colourmap);
        let shifts = span.flat.size().shifts();
        let bg_row = self.bg_row(y, span.bg_offset);

        let skip = (x1 - span.x1) as u32;
        let xstep = (span.xstep.raw() as u32) << shifts.shift_up;
        let ystep = (span.ystep.raw() as u32) << shifts.shift_up;
        let mut xpos =
            ((span.xfrac.raw() as u32) << shifts.shift_up).wrapping_add(xstep.wrapping_mul(skip));
        let mut ypos =
            ((span.yfrac.raw() as u32) << shifts.shift_up).wrapping_add(ystep.wrapping_mul(skip));

        for x in x1..=x2 {
            let spot = texel_spot(&shifts, xpos, ypos);
            self.put(x as usize, y, bg_row, span.flat, spot, cmap);
            xpos = xpos.wrapping_add(xstep);
            ypos = ypos.wrapping_add(ystep);
        }
    }

    fn draw_tilted_span(&mut self, span: &TiltedSpan) {
        #[cfg(feature = "hprof")]
        profile!("draw_tilted_span");
        let Some((y, x1, x2)) = self.clip(span.y, span.x1, span.x2) else {
            return;
        };
        let colourmaps = self.colourmaps;
        let cmap = colourmaps.resolve(span.colourmap);
        let shifts = span.flat.size().shifts();
        let bg_row = self.bg_row(y, span.bg_offset);

        let skip = (x1 - span.x1) as f32;
        let mut iz = span.iz + span.iz_step * skip;
        let mut uz = span.uz + span.uz_step * skip;
        let mut vz = span.vz + span.vz_step * skip;

        for x in x1..=x2 {
            // on or past the horizon, nothing sensible to sample
            if iz.abs() > f32::EPSILON {
                let z = 1.0 / iz;
                let u = (uz * z) as i64 as u32;
                let v = (vz * z) as i64 as u32;
                let spot = texel_spot(&shifts, u << shifts.shift_up, v << shifts.shift_up);
                self.put(x as usize, y, bg_row, span.flat, spot, cmap);
            }
            iz += span.iz_step;
            uz += span.uz_step;
            vz += span.vz_step;
        }
    }
}
