//! Conversions between bytes, bit sequences and fixed-size pixel arrays.
//!
//! Bits are most-significant first within each byte.

use std::fmt;

use log::warn;

use crate::error::{ModemError, Result};

pub fn bits_from_bytes(bytes: &[u8]) -> Vec<bool> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for byte in bytes {
        for i in (0..8).rev() {
            bits.push((byte >> i) & 1 == 1);
        }
    }
    bits
}

/// Packs whole bytes; a trailing group of fewer than 8 bits is discarded.
pub fn bytes_from_bits(bits: &[bool]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| {
            chunk
                .iter()
                .fold(0u8, |acc, &bit| (acc << 1) | bit as u8)
        })
        .collect()
}

/// Parses a textual bit string such as `"1010 1010"`. Whitespace is ignored.
pub fn parse_bit_string(text: &str) -> Result<Vec<bool>> {
    let mut bits = Vec::with_capacity(text.len());
    for (position, character) in text.chars().enumerate() {
        match character {
            '0' => bits.push(false),
            '1' => bits.push(true),
            c if c.is_whitespace() => {}
            c => {
                return Err(ModemError::InvalidBitCharacter {
                    character: c,
                    position,
                })
            }
        }
    }
    Ok(bits)
}

pub fn format_bit_string(bits: &[bool]) -> String {
    bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

/// Raster size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameDimensions {
    pub height: usize,
    pub width: usize,
}

impl FrameDimensions {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    pub fn pixel_count(&self) -> usize {
        self.height * self.width
    }
}

impl fmt::Display for FrameDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

/// Decoded byte count differed from the raster size and was truncated or zero-padded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadLengthMismatch {
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for PayloadLengthMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.actual < self.expected {
            write!(
                f,
                "expected {} pixels but got {}; zero-padded",
                self.expected, self.actual
            )
        } else {
            write!(
                f,
                "expected {} pixels but got {}; truncated",
                self.expected, self.actual
            )
        }
    }
}

/// Row-major 8-bit grayscale raster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelArray {
    dimensions: FrameDimensions,
    pixels: Vec<u8>,
}

impl PixelArray {
    /// Checked constructor: `pixels` must hold exactly `height * width` values.
    pub fn new(height: usize, width: usize, pixels: Vec<u8>) -> Result<Self> {
        let dimensions = FrameDimensions::new(height, width);
        if pixels.len() != dimensions.pixel_count() {
            return Err(ModemError::InvalidConfig(format!(
                "{} pixels do not fill a {} raster",
                pixels.len(),
                dimensions
            )));
        }
        Ok(Self { dimensions, pixels })
    }

    /// Truncates or zero-pads `bytes` to fill the raster.
    pub fn from_bytes_lossy(
        bytes: &[u8],
        dimensions: FrameDimensions,
    ) -> (Self, Option<PayloadLengthMismatch>) {
        let expected = dimensions.pixel_count();
        let mismatch = (bytes.len() != expected).then_some(PayloadLengthMismatch {
            expected,
            actual: bytes.len(),
        });

        let mut pixels = bytes[..bytes.len().min(expected)].to_vec();
        pixels.resize(expected, 0);

        (Self { dimensions, pixels }, mismatch)
    }

    pub fn dimensions(&self) -> FrameDimensions {
        self.dimensions
    }

    pub fn height(&self) -> usize {
        self.dimensions.height
    }

    pub fn width(&self) -> usize {
        self.dimensions.width
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        if row >= self.dimensions.height || col >= self.dimensions.width {
            return None;
        }
        self.pixels.get(row * self.dimensions.width + col).copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.pixels.chunks(self.dimensions.width.max(1))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }

    /// Photographic negative, `255 - p`
    pub fn inverted(&self) -> Self {
        Self {
            dimensions: self.dimensions,
            pixels: self.pixels.iter().map(|p| 255 - p).collect(),
        }
    }

    pub fn to_bits(&self) -> Vec<bool> {
        bits_from_bytes(&self.pixels)
    }
}

/// A raster rebuilt from received bits, with the length policy outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconstruction {
    pub pixels: PixelArray,
    pub mismatch: Option<PayloadLengthMismatch>,
}

/// Packs `bits` into bytes (dropping a partial trailing byte) and fits them
/// into a `height x width` raster, truncating or zero-padding as needed.
///
/// A length mismatch is logged at `warn` and reported, never an error.
pub fn pixels_from_bits(bits: &[bool], height: usize, width: usize) -> Reconstruction {
    let bytes = bytes_from_bits(bits);
    let (pixels, mismatch) =
        PixelArray::from_bytes_lossy(&bytes, FrameDimensions::new(height, width));
    if let Some(mismatch) = &mismatch {
        warn!("{}", mismatch);
    }
    Reconstruction { pixels, mismatch }
}
