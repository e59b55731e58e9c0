//! Point filters precomputed as 256-entry lookup tables.
//!
//! The table is built once at construction and indexed per channel, so the
//! per-pixel cost is three array reads regardless of the underlying curve.
//! Out-of-range table values clamp to `[0, 255]` at build time.

use anyhow::Result;
use image::RgbaImage;

use super::Processor;
use crate::error::ConfigError;

fn apply_lut(buffer: &mut RgbaImage, lut: &[u8; 256]) {
    for px in buffer.pixels_mut() {
        px[0] = lut[px[0] as usize];
        px[1] = lut[px[1] as usize];
        px[2] = lut[px[2] as usize];
    }
}

fn build_lut(f: impl Fn(usize) -> f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, v) in lut.iter_mut().enumerate() {
        *v = f(i).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Adds a constant offset to every channel, clamped at 0 and 255.
pub struct Brightness {
    lut: [u8; 256],
}

impl Brightness {
    /// `delta` must be between -255 (black) and 255 (white).
    pub fn new(delta: i32) -> Result<Self, ConfigError> {
        if !(-255..=255).contains(&delta) {
            return Err(ConfigError::out_of_range(
                "brightness",
                "delta",
                "between -255 and 255",
                delta,
            ));
        }
        Ok(Self {
            lut: build_lut(|i| i as f32 + delta as f32),
        })
    }
}

impl Processor for Brightness {
    fn name(&self) -> &str {
        "brightness"
    }

    fn apply(&self, buffer: &mut RgbaImage) -> Result<()> {
        apply_lut(buffer, &self.lut);
        Ok(())
    }
}

/// Multiplies every channel by a constant factor.
///
/// Factors below 1 lessen the contrast, factors above 1 increase it.
pub struct Contrast {
    lut: [u8; 256],
}

impl Contrast {
    pub fn new(factor: f32) -> Result<Self, ConfigError> {
        if !factor.is_finite() || factor < 0.0 {
            return Err(ConfigError::out_of_range(
                "contrast",
                "factor",
                "a finite value >= 0",
                factor,
            ));
        }
        Ok(Self {
            lut: build_lut(|i| i as f32 * factor),
        })
    }
}

impl Processor for Contrast {
    fn name(&self) -> &str {
        "contrast"
    }

    fn apply(&self, buffer: &mut RgbaImage) -> Result<()> {
        apply_lut(buffer, &self.lut);
        Ok(())
    }
}

/// Power-law intensity remap `(i / 255) ^ exponent * 255`.
pub struct Gamma {
    lut: [u8; 256],
}

impl Gamma {
    pub fn new(exponent: f32) -> Result<Self, ConfigError> {
        if !exponent.is_finite() || exponent < 0.0 {
            return Err(ConfigError::out_of_range(
                "gamma",
                "exponent",
                "a finite value >= 0",
                exponent,
            ));
        }
        Ok(Self {
            lut: build_lut(|i| (i as f32 / 255.0).powf(exponent) * 255.0),
        })
    }
}

impl Processor for Gamma {
    fn name(&self) -> &str {
        "gamma"
    }

    fn apply(&self, buffer: &mut RgbaImage) -> Result<()> {
        apply_lut(buffer, &self.lut);
        Ok(())
    }
}

/// Replaces every channel with its complement, leaving alpha alone.
pub struct Invert {
    lut: [u8; 256],
}

impl Invert {
    pub fn new() -> Self {
        Self {
            lut: build_lut(|i| 255.0 - i as f32),
        }
    }
}

impl Default for Invert {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for Invert {
    fn name(&self) -> &str {
        "invert"
    }

    fn apply(&self, buffer: &mut RgbaImage) -> Result<()> {
        apply_lut(buffer, &self.lut);
        Ok(())
    }
}
