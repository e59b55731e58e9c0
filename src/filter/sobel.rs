//! Sobel edge detection, as shipped in the viewer's stock filter set.

use anyhow::Result;
use image::RgbaImage;

use super::Processor;

/// 3x3 Sobel gradient magnitude of the red channel, written back into the
/// red channel with green and blue zeroed. The one-pixel border carries no
/// full neighborhood and is left untouched.
pub struct Sobel;

impl Sobel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Sobel {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for Sobel {
    fn name(&self) -> &str {
        "sobel"
    }

    fn apply(&self, buffer: &mut RgbaImage) -> Result<()> {
        let (width, height) = buffer.dimensions();
        if width < 3 || height < 3 {
            return Ok(());
        }
        let source = buffer.clone();
        let red = |x: u32, y: u32| source.get_pixel(x, y)[0] as f32;

        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let gx = red(x + 1, y - 1) + 2.0 * red(x + 1, y) + red(x + 1, y + 1)
                    - red(x - 1, y - 1)
                    - 2.0 * red(x - 1, y)
                    - red(x - 1, y + 1);
                let gy = red(x - 1, y + 1) + 2.0 * red(x, y + 1) + red(x + 1, y + 1)
                    - red(x - 1, y - 1)
                    - 2.0 * red(x, y - 1)
                    - red(x + 1, y - 1);
                let magnitude = (gx * gx + gy * gy).sqrt();

                let out = buffer.get_pixel_mut(x, y);
                out[0] = magnitude.round().clamp(0.0, 255.0) as u8;
                out[1] = 0;
                out[2] = 0;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn flat_image_has_no_interior_edges() {
        let mut buf = RgbaImage::from_pixel(4, 4, Rgba([120, 40, 200, 255]));
        Sobel::new().apply(&mut buf).unwrap();
        // Interior goes to zero magnitude with G/B cleared.
        assert_eq!(buf.get_pixel(1, 1).0, [0, 0, 0, 255]);
        assert_eq!(buf.get_pixel(2, 2).0, [0, 0, 0, 255]);
        // Border stays untouched.
        assert_eq!(buf.get_pixel(0, 0).0, [120, 40, 200, 255]);
        assert_eq!(buf.get_pixel(3, 3).0, [120, 40, 200, 255]);
    }

    #[test]
    fn vertical_step_produces_a_strong_response() {
        let mut buf = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 255]));
        for y in 0..3 {
            buf.put_pixel(2, y, Rgba([255, 0, 0, 255]));
        }
        Sobel::new().apply(&mut buf).unwrap();
        assert_eq!(buf.get_pixel(1, 1).0, [255, 0, 0, 255]);
    }

    #[test]
    fn tiny_tiles_are_skipped() {
        let mut buf = RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 9]));
        let before = buf.clone();
        Sobel::new().apply(&mut buf).unwrap();
        assert_eq!(buf, before);
    }
}
