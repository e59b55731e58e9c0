//! Intensity-driven filters: thresholding, greyscale and saturation.

use anyhow::Result;
use image::RgbaImage;

use super::{intensity, Processor};
use crate::error::ConfigError;

/// Binarizes on mean channel intensity: below the level goes black, the rest
/// goes white.
pub struct Threshold {
    level: u8,
}

impl Threshold {
    pub fn new(level: i32) -> Result<Self, ConfigError> {
        if !(0..=255).contains(&level) {
            return Err(ConfigError::out_of_range(
                "threshold",
                "level",
                "between 0 and 255",
                level,
            ));
        }
        Ok(Self { level: level as u8 })
    }
}

impl Processor for Threshold {
    fn name(&self) -> &str {
        "threshold"
    }

    fn apply(&self, buffer: &mut RgbaImage) -> Result<()> {
        for px in buffer.pixels_mut() {
            let v = if intensity(px) < self.level { 0 } else { 255 };
            px[0] = v;
            px[1] = v;
            px[2] = v;
        }
        Ok(())
    }
}

/// Replaces each channel with the mean of the three.
pub struct Greyscale;

impl Greyscale {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Greyscale {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for Greyscale {
    fn name(&self) -> &str {
        "greyscale"
    }

    fn apply(&self, buffer: &mut RgbaImage) -> Result<()> {
        for px in buffer.pixels_mut() {
            let v = intensity(px);
            px[0] = v;
            px[1] = v;
            px[2] = v;
        }
        Ok(())
    }
}

/// Pushes each channel toward (negative amounts) or away from (positive
/// amounts) the pixel's dominant channel.
///
/// `amount` of -100 collapses every channel onto the maximum, which is close
/// to a greyscale; +100 doubles each channel's distance from the maximum.
pub struct Saturation {
    adjust: f32,
}

impl Saturation {
    pub fn new(amount: i32) -> Result<Self, ConfigError> {
        if !(-100..=100).contains(&amount) {
            return Err(ConfigError::out_of_range(
                "saturation",
                "amount",
                "between -100 and 100",
                amount,
            ));
        }
        Ok(Self {
            adjust: amount as f32 * -0.01,
        })
    }
}

impl Processor for Saturation {
    fn name(&self) -> &str {
        "saturation"
    }

    fn apply(&self, buffer: &mut RgbaImage) -> Result<()> {
        for px in buffer.pixels_mut() {
            let max = px[0].max(px[1]).max(px[2]);
            for c in 0..3 {
                if px[c] != max {
                    let shifted = px[c] as f32 + (max - px[c]) as f32 * self.adjust;
                    px[c] = shifted.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
        Ok(())
    }
}
