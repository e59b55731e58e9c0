//! Neighborhood filters: generic convolution and morphological operators.
//!
//! Both read from a snapshot of the incoming buffer and write the transformed
//! pixels back in place. Neighbors falling outside the tile contribute
//! nothing; there is no edge padding, matching the behavior tiles get from a
//! canvas-backed implementation.

use anyhow::Result;
use image::RgbaImage;
use ndarray::Array2;

use super::Processor;
use crate::error::ConfigError;

/// Generic convolution with an odd square kernel.
pub struct Convolution {
    kernel: Array2<f32>,
}

impl Convolution {
    /// Builds from a flat row-major weight list. The length must be a
    /// perfect square with an odd side (9, 25, 49, ...).
    pub fn new(weights: Vec<f32>) -> Result<Self, ConfigError> {
        let side = (weights.len() as f64).sqrt() as usize;
        if side * side != weights.len() || side % 2 == 0 || side == 0 {
            return Err(ConfigError::MalformedKernel {
                len: weights.len(),
            });
        }
        let kernel = Array2::from_shape_vec((side, side), weights)
            .expect("length checked against shape above");
        Ok(Self { kernel })
    }

    /// Builds from an already-shaped kernel matrix.
    pub fn from_kernel(kernel: Array2<f32>) -> Result<Self, ConfigError> {
        let (rows, cols) = kernel.dim();
        if rows != cols || rows % 2 == 0 {
            return Err(ConfigError::MalformedKernel { len: rows * cols });
        }
        Ok(Self { kernel })
    }
}

impl Processor for Convolution {
    fn name(&self) -> &str {
        "convolution"
    }

    fn apply(&self, buffer: &mut RgbaImage) -> Result<()> {
        let (width, height) = buffer.dimensions();
        let source = buffer.clone();
        let side = self.kernel.dim().0;
        let half = (side / 2) as i64;

        for y in 0..height {
            for x in 0..width {
                let mut acc = [0.0f32; 3];
                for ky in 0..side {
                    for kx in 0..side {
                        let px = x as i64 + kx as i64 - half;
                        let py = y as i64 + ky as i64 - half;
                        if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                            continue;
                        }
                        let weight = self.kernel[(ky, kx)];
                        let sample = source.get_pixel(px as u32, py as u32);
                        acc[0] += sample[0] as f32 * weight;
                        acc[1] += sample[1] as f32 * weight;
                        acc[2] += sample[2] as f32 * weight;
                    }
                }
                let out = buffer.get_pixel_mut(x, y);
                out[0] = acc[0].round().clamp(0.0, 255.0) as u8;
                out[1] = acc[1].round().clamp(0.0, 255.0) as u8;
                out[2] = acc[2].round().clamp(0.0, 255.0) as u8;
            }
        }
        Ok(())
    }
}

/// Morphological operator folding a comparator over an odd square window.
///
/// The fold is seeded with the center pixel, so `u8::max` dilates and
/// `u8::min` erodes.
pub struct Morphology {
    half: i64,
    size: usize,
    comparator: Box<dyn Fn(u8, u8) -> u8 + Send + Sync>,
}

impl Morphology {
    pub fn new(
        kernel_size: usize,
        comparator: impl Fn(u8, u8) -> u8 + Send + Sync + 'static,
    ) -> Result<Self, ConfigError> {
        if kernel_size % 2 == 0 || kernel_size == 0 {
            return Err(ConfigError::EvenKernel(kernel_size));
        }
        Ok(Self {
            half: (kernel_size / 2) as i64,
            size: kernel_size,
            comparator: Box::new(comparator),
        })
    }

    /// Grows bright regions by taking the window maximum.
    pub fn dilate(kernel_size: usize) -> Result<Self, ConfigError> {
        Self::new(kernel_size, u8::max)
    }

    /// Shrinks bright regions by taking the window minimum.
    pub fn erode(kernel_size: usize) -> Result<Self, ConfigError> {
        Self::new(kernel_size, u8::min)
    }
}

impl Processor for Morphology {
    fn name(&self) -> &str {
        "morphology"
    }

    fn apply(&self, buffer: &mut RgbaImage) -> Result<()> {
        let (width, height) = buffer.dimensions();
        let source = buffer.clone();

        for y in 0..height {
            for x in 0..width {
                let center = source.get_pixel(x, y);
                let (mut r, mut g, mut b) = (center[0], center[1], center[2]);
                for ky in 0..self.size {
                    for kx in 0..self.size {
                        let px = x as i64 + kx as i64 - self.half;
                        let py = y as i64 + ky as i64 - self.half;
                        if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                            continue;
                        }
                        let sample = source.get_pixel(px as u32, py as u32);
                        r = (self.comparator)(sample[0], r);
                        g = (self.comparator)(sample[1], g);
                        b = (self.comparator)(sample[2], b);
                    }
                }
                let out = buffer.get_pixel_mut(x, y);
                out[0] = r;
                out[1] = g;
                out[2] = b;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use ndarray::array;

    #[test]
    fn identity_kernel_leaves_pixels_alone() {
        let filter = Convolution::new(vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        let mut buf = RgbaImage::from_pixel(3, 3, Rgba([17, 34, 51, 255]));
        buf.put_pixel(1, 1, Rgba([200, 100, 50, 255]));
        let before = buf.clone();
        filter.apply(&mut buf).unwrap();
        assert_eq!(buf, before);
    }

    #[test]
    fn box_blur_averages_interior() {
        let w = 1.0 / 9.0;
        let filter = Convolution::new(vec![w; 9]).unwrap();
        let mut buf = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 255]));
        buf.put_pixel(1, 1, Rgba([90, 90, 90, 255]));
        filter.apply(&mut buf).unwrap();
        assert_eq!(buf.get_pixel(1, 1).0, [10, 10, 10, 255]);
    }

    #[test]
    fn malformed_kernels_are_rejected() {
        assert!(Convolution::new(vec![1.0; 4]).is_err());
        assert!(Convolution::new(vec![1.0; 8]).is_err());
        assert!(Convolution::new(vec![]).is_err());
        assert!(Convolution::from_kernel(array![[1.0, 0.0], [0.0, 1.0]]).is_err());
        assert!(Convolution::new(vec![1.0; 25]).is_ok());
    }

    #[test]
    fn dilation_spreads_a_bright_pixel() {
        let filter = Morphology::dilate(3).unwrap();
        let mut buf = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 255]));
        buf.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
        filter.apply(&mut buf).unwrap();
        for (_, _, px) in buf.enumerate_pixels() {
            assert_eq!(px.0, [255, 255, 255, 255]);
        }
    }

    #[test]
    fn erosion_removes_an_isolated_bright_pixel() {
        let filter = Morphology::erode(3).unwrap();
        let mut buf = RgbaImage::from_pixel(3, 3, Rgba([255, 255, 255, 255]));
        buf.put_pixel(1, 1, Rgba([0, 0, 0, 255]));
        filter.apply(&mut buf).unwrap();
        for (_, _, px) in buf.enumerate_pixels() {
            assert_eq!(&px.0[..3], &[0, 0, 0]);
        }
    }

    #[test]
    fn even_morphology_kernel_is_rejected() {
        assert!(Morphology::dilate(4).is_err());
        assert!(Morphology::erode(0).is_err());
    }
}
