mod colormap;
mod kernel;
mod level;
mod lut;
mod sobel;

pub use colormap::{rainbow, Colormap};
pub use kernel::{Convolution, Morphology};
pub use level::{Greyscale, Saturation, Threshold};
pub use lut::{Brightness, Contrast, Gamma, Invert};
pub use sobel::Sobel;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use image::RgbaImage;

use crate::ImageHandle;

/// Future returned by [`Processor::apply_async`].
pub type ProcessorFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// One step of a filter chain: an in-place transform of a tile's pixels.
///
/// Processors must be pure over the buffer they are handed and keep no state
/// across calls; the pipeline runs the same processor concurrently on many
/// tiles. A failed step aborts that tile's run only.
pub trait Processor: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Transform the buffer in place, synchronously.
    fn apply(&self, buffer: &mut RgbaImage) -> Result<()>;

    /// Asynchronous form. Processors that need to await something override
    /// this (and report `is_sync() == false`); the default just defers to
    /// [`Processor::apply`].
    fn apply_async<'a>(&'a self, buffer: &'a mut RgbaImage) -> ProcessorFuture<'a> {
        Box::pin(std::future::ready(self.apply(buffer)))
    }

    /// Whether [`Processor::apply`] is the authoritative form. Synchronous
    /// processors complete without yielding, which also means they cannot be
    /// cancelled mid-step when the configuration changes under them.
    fn is_sync(&self) -> bool {
        true
    }
}

/// Adapter turning a plain closure into a synchronous [`Processor`].
pub struct FnProcessor<F> {
    name: String,
    f: F,
}

impl<F> FnProcessor<F>
where
    F: Fn(&mut RgbaImage) -> Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Processor for FnProcessor<F>
where
    F: Fn(&mut RgbaImage) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, buffer: &mut RgbaImage) -> Result<()> {
        (self.f)(buffer)
    }
}

/// An ordered processor chain plus the images it applies to.
///
/// `scope: None` makes the rule the global default: it applies to every image
/// that no scoped rule claims. Rule order matters twice over: the first
/// scoped rule matching an image wins, and processors run in declaration
/// order, each seeing the previous one's output.
#[derive(Clone)]
pub struct FilterRule {
    pub scope: Option<Vec<ImageHandle>>,
    pub processors: Vec<Arc<dyn Processor>>,
}

impl FilterRule {
    /// Rule applying to every image not claimed by a scoped rule.
    pub fn global(processors: Vec<Arc<dyn Processor>>) -> Self {
        Self {
            scope: None,
            processors,
        }
    }

    /// Rule applying only to the given images.
    pub fn scoped(scope: Vec<ImageHandle>, processors: Vec<Arc<dyn Processor>>) -> Self {
        Self {
            scope: Some(scope),
            processors,
        }
    }

    /// True when every processor in the rule is synchronous.
    pub fn is_sync(&self) -> bool {
        self.processors.iter().all(|p| p.is_sync())
    }
}

/// Average intensity of a pixel's RGB channels.
pub(crate) fn intensity(px: &image::Rgba<u8>) -> u8 {
    ((u32::from(px[0]) + u32::from(px[1]) + u32::from(px[2])) / 3) as u8
}
