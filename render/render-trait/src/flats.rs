//! Flat textures and their power-of-two size classes.

use log::warn;

/// Resolution class of a square flat. The drawer decomposes a 16.16 sample
/// position in to a texel address using the shifts for the class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlatSize {
    S32,
    S64,
    S128,
    S256,
    S512,
    S1024,
    S2048,
}

/// Address decomposition constants for a `FlatSize`.
///
/// With `k = log2(width)`, a position is first shifted up by `shift_up` so
/// the integer part sits in the top `k` bits, then
/// `((y >> y_shift) & mask) | (x >> x_shift)` is the texel index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatShifts {
    pub shift_up: u32,
    pub x_shift: u32,
    pub y_shift: u32,
    pub mask: u32,
}

impl FlatSize {
    /// Pick the class from a raw lump length. Anything unrecognised is
    /// treated as 64x64.
    pub const fn from_lump_len(len: usize) -> Self {
        match len {
            0x40_0000 => Self::S2048,
            0x10_0000 => Self::S1024,
            0x4_0000 => Self::S512,
            0x1_0000 => Self::S256,
            0x4000 => Self::S128,
            0x400 => Self::S32,
            _ => Self::S64,
        }
    }

    pub const fn log2(self) -> u32 {
        match self {
            Self::S32 => 5,
            Self::S64 => 6,
            Self::S128 => 7,
            Self::S256 => 8,
            Self::S512 => 9,
            Self::S1024 => 10,
            Self::S2048 => 11,
        }
    }

    pub const fn width(self) -> usize {
        1 << self.log2()
    }

    pub const fn shifts(self) -> FlatShifts {
        let k = self.log2();
        FlatShifts {
            shift_up: 16 - k,
            x_shift: 32 - k,
            y_shift: 32 - 2 * k,
            mask: ((1 << k) - 1) << k,
        }
    }
}

/// A square floor/ceiling texture, row-major palette indexes. The texel
/// buffer always holds `width * width` entries, so drawers may index it by
/// any spot masked with the size class shifts.
#[derive(Debug, Clone)]
pub struct FlatPic {
    name: String,
    size: FlatSize,
    data: Vec<u8>,
}

impl FlatPic {
    pub fn new(name: &str, mut data: Vec<u8>) -> Self {
        let size = FlatSize::from_lump_len(data.len());
        let len = size.width() * size.width();
        if data.len() != len {
            warn!("Flat {} is not a power-of-two square, using {:?}", name, size);
            data.resize(len, 0);
        }
        Self {
            name: name.to_string(),
            size,
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub const fn size(&self) -> FlatSize {
        self.size
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn texel(&self, index: usize) -> u8 {
        self.data[index]
    }
}

#[cfg(test)]
mod tests {
    use super::{FlatPic, FlatShifts, FlatSize};

    #[test]
    fn size_class_shifts() {
        assert_eq!(
            FlatSize::S64.shifts(),
            FlatShifts {
                shift_up: 10,
                x_shift: 26,
                y_shift: 20,
                mask: 0xFC0
            }
        );
        assert_eq!(FlatSize::S2048.shifts().mask, 0x3F_F800);
        assert_eq!(FlatSize::S32.shifts().mask, 0x3E0);
        assert_eq!(FlatSize::S1024.shifts().y_shift, 12);
    }

    #[test]
    fn odd_sized_flat_is_padded() {
        let flat = FlatPic::new("ODD", vec![1; 100]);
        assert_eq!(flat.size(), FlatSize::S64);
        assert_eq!(flat.data().len(), 64 * 64);
        assert_eq!(flat.name(), "ODD");
        assert_eq!(flat.texel(99), 1);
        assert_eq!(flat.texel(100), 0);
    }

    #[test]
    fn class_from_len() {
        assert_eq!(FlatSize::from_lump_len(128 * 128), FlatSize::S128);
        assert_eq!(FlatSize::from_lump_len(32 * 32), FlatSize::S32);
        assert_eq!(FlatSize::S256.width(), 256);
    }
}
