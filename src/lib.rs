//! Post-load pixel filter pipeline for deep-zoom tile viewers.
//!
//! The viewer owns tiles and their decoded pixel data; this crate hooks its
//! tile lifecycle ("loaded", "about to draw") and applies a reconfigurable
//! chain of [`Processor`]s to every tile, from the original buffer, tracking
//! a generation counter so tiles rendered under an older filter configuration
//! converge on the latest one without redundant reprocessing.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use tilefilter::filter::Invert;
//! # use tilefilter::{FilterConfig, FilterPipeline, FilterRule, LoadMode, Processor};
//! # fn demo(viewer: Arc<dyn tilefilter::TileViewer>) -> anyhow::Result<()> {
//! let invert: Arc<dyn Processor> = Arc::new(Invert::new());
//! let pipeline = FilterPipeline::new(viewer);
//! pipeline.configure(FilterConfig {
//!     filters: vec![FilterRule::global(vec![invert])],
//!     load_mode: LoadMode::Sync,
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod filter;
mod pipeline;
mod viewer;

pub use error::ConfigError;
pub use filter::{FilterRule, FnProcessor, Processor, ProcessorFuture};
pub use pipeline::{DrawOutcome, FilterConfig, FilterPipeline, LoadMode};
pub use viewer::{TileEvent, TileViewer};

/// Stable identifier of a loaded image (one zoomable pyramid) in the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageHandle(pub u64);

/// Stable identifier of a single tile owned by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId(pub u64);
