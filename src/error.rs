use thiserror::Error;

use crate::ImageHandle;

/// Rejection of a filter configuration or a processor parameter.
///
/// Configuration is atomic: any of these surfaced from
/// [`FilterPipeline::configure`](crate::FilterPipeline::configure) means no
/// part of the new rule set was applied.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("a filter rule must declare at least one processor")]
    EmptyRule,

    #[error("image {0:?} is targeted by more than one filter rule")]
    DuplicateScope(ImageHandle),

    #[error("{filter}: {param} must be {expected}, got {got}")]
    OutOfRange {
        filter: &'static str,
        param: &'static str,
        expected: &'static str,
        got: f64,
    },

    #[error("kernel size must be odd, got {0}")]
    EvenKernel(usize),

    #[error("kernel must be a square matrix with odd width and height, got {len} weights")]
    MalformedKernel { len: usize },

    #[error("colormap must provide 256 entries, got {0}")]
    ShortColormap(usize),
}

impl ConfigError {
    pub(crate) fn out_of_range(
        filter: &'static str,
        param: &'static str,
        expected: &'static str,
        got: impl Into<f64>,
    ) -> Self {
        ConfigError::OutOfRange {
            filter,
            param,
            expected,
            got: got.into(),
        }
    }
}
