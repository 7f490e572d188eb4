//! An RGBA buffer the span drawer renders in to, with a PPM writer so a
//! frame can be inspected without a window.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use render_trait::{BufferSize, PixelBuffer, SOFT_PIXEL_CHANNELS};

pub struct Framebuffer {
    size: BufferSize,
    /// Total length is width * height * CHANNELS, where CHANNELS is RGBA bytes
    buffer: Vec<u8>,
    stride: usize,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            size: BufferSize::new(width, height),
            buffer: vec![0; width * height * SOFT_PIXEL_CHANNELS],
            stride: width * SOFT_PIXEL_CHANNELS,
        }
    }

    pub fn buf(&self) -> &[u8] {
        &self.buffer
    }

    /// Binary PPM, alpha dropped
    pub fn write_ppm(&self, path: &Path) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        write!(
            out,
            "P6\n{} {}\n255\n",
            self.size.width_usize(),
            self.size.height_usize()
        )?;
        for px in self.buffer.chunks_exact(SOFT_PIXEL_CHANNELS) {
            out.write_all(&px[..3])?;
        }
        out.flush()
    }
}

impl PixelBuffer for Framebuffer {
    #[inline(always)]
    fn size(&self) -> &BufferSize {
        &self.size
    }

    #[inline(always)]
    fn clear(&mut self) {
        self.buffer.fill(0);
    }

    #[inline(always)]
    fn clear_with_colour(&mut self, colour: &[u8; SOFT_PIXEL_CHANNELS]) {
        self.buffer
            .chunks_exact_mut(SOFT_PIXEL_CHANNELS)
            .for_each(|n| n.copy_from_slice(colour));
    }

    #[inline(always)]
    fn set_pixel(&mut self, x: usize, y: usize, colour: &[u8; SOFT_PIXEL_CHANNELS]) {
        #[cfg(feature = "safety_check")]
        if x >= self.size.width_usize() || y >= self.size.height_usize() {
            panic!(
                "Pixel {x},{y} outside of {}x{} buffer",
                self.size.width_usize(),
                self.size.height_usize()
            );
        }

        let pos = y * self.stride + x * SOFT_PIXEL_CHANNELS;
        #[cfg(not(feature = "safety_check"))]
        unsafe {
            self.buffer
                .get_unchecked_mut(pos..pos + SOFT_PIXEL_CHANNELS)
                .copy_from_slice(colour);
        }
        #[cfg(feature = "safety_check")]
        self.buffer[pos..pos + SOFT_PIXEL_CHANNELS].copy_from_slice(colour);
    }

    /// Read the colour of a single pixel at X|Y
    #[inline]
    fn read_pixel(&self, x: usize, y: usize) -> [u8; SOFT_PIXEL_CHANNELS] {
        let pos = y * self.stride + x * SOFT_PIXEL_CHANNELS;
        let mut slice = [0u8; SOFT_PIXEL_CHANNELS];
        slice.copy_from_slice(&self.buffer[pos..pos + SOFT_PIXEL_CHANNELS]);
        slice
    }

    #[inline(always)]
    fn buf_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    #[inline(always)]
    fn pitch(&self) -> usize {
        self.stride
    }

    #[inline(always)]
    fn channels(&self) -> usize {
        SOFT_PIXEL_CHANNELS
    }

    #[inline(always)]
    fn get_buf_index(&self, x: usize, y: usize) -> usize {
        y * self.stride + x * SOFT_PIXEL_CHANNELS
    }
}

#[cfg(test)]
mod tests {
    use super::Framebuffer;
    use render_trait::PixelBuffer;

    #[test]
    fn pixels_land_at_stride() {
        let mut fb = Framebuffer::new(4, 3);
        fb.clear_with_colour(&[1, 2, 3, 255]);
        fb.set_pixel(2, 1, &[9, 8, 7, 255]);
        assert_eq!(fb.read_pixel(2, 1), [9, 8, 7, 255]);
        assert_eq!(fb.read_pixel(1, 1), [1, 2, 3, 255]);
        assert_eq!(fb.get_buf_index(2, 1), 4 * 4 + 2 * 4);
        assert_eq!(fb.buf()[fb.get_buf_index(2, 1)], 9);
    }

    #[test]
    fn ppm_has_rgb_only() {
        let mut fb = Framebuffer::new(2, 2);
        fb.clear_with_colour(&[10, 20, 30, 255]);
        let path = std::env::temp_dir().join("planeview_fb_test.ppm");
        fb.write_ppm(&path).unwrap();
        let data = std::fs::read(&path).unwrap();
        let header = b"P6\n2 2\n255\n";
        assert_eq!(&data[..header.len()], header);
        assert_eq!(data.len(), header.len() + 2 * 2 * 3);
        assert_eq!(&data[header.len()..header.len() + 3], &[10, 20, 30]);
        let _ = std::fs::remove_file(&path);
    }
}
