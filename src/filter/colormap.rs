//! False-color mapping of intensity through a 256-entry color table.

use anyhow::Result;
use hsl::HSL;
use image::RgbaImage;

use super::{intensity, Processor};
use crate::error::ConfigError;

/// Maps mean channel intensity to an RGB color from a lookup table.
///
/// The incoming map is resampled around a pivot intensity: intensities at the
/// pivot land on the middle of the table, with the lower and upper halves
/// stretched linearly to cover `[0, pivot]` and `(pivot, 255]`. Moving the
/// pivot shifts which intensities get the contrast-rich middle colors.
pub struct Colormap {
    lut: [[u8; 3]; 256],
}

impl Colormap {
    pub fn new(cmap: Vec<[u8; 3]>, pivot: i32) -> Result<Self, ConfigError> {
        if cmap.len() != 256 {
            return Err(ConfigError::ShortColormap(cmap.len()));
        }
        if !(0..=255).contains(&pivot) {
            return Err(ConfigError::out_of_range(
                "colormap",
                "pivot",
                "between 0 and 255",
                pivot,
            ));
        }

        let pivot = pivot as f32;
        let upper_span = 255.0 - pivot;
        let mut lut = [[0u8; 3]; 256];
        for (i, slot) in lut.iter_mut().enumerate() {
            let i = i as f32;
            let position = if i > pivot {
                ((i - pivot) / upper_span * 128.0 + 128.0).min(255.0) as usize
            } else if pivot == 0.0 {
                0
            } else {
                // i <= pivot keeps this at or below 128
                (i / (pivot / 128.0)).max(0.0) as usize
            };
            *slot = cmap[position];
        }
        Ok(Self { lut })
    }
}

impl Processor for Colormap {
    fn name(&self) -> &str {
        "colormap"
    }

    fn apply(&self, buffer: &mut RgbaImage) -> Result<()> {
        for px in buffer.pixels_mut() {
            let [r, g, b] = self.lut[intensity(px) as usize];
            px[0] = r;
            px[1] = g;
            px[2] = b;
        }
        Ok(())
    }
}

/// A 256-entry blue-to-red rainbow map, handy as a default for [`Colormap`].
pub fn rainbow() -> Vec<[u8; 3]> {
    (0..256)
        .map(|i| {
            let (r, g, b) = HSL {
                h: 240.0 - (i as f64 / 255.0) * 240.0,
                s: 1.0,
                l: 0.5,
            }
            .to_rgb();
            [r, g, b]
        })
        .collect()
}
