use image::RgbaImage;

use crate::{ImageHandle, TileId};

/// Contract the hosting deep-zoom viewer has to provide.
///
/// The pipeline never owns tiles; it only reads the as-decoded buffer, writes
/// back the filtered one and asks for resets/redraws. `original_buffer` must
/// hand out the pixels as they were decoded, untouched by any earlier filter
/// run, so reprocessing never compounds on partially filtered data.
pub trait TileViewer: Send + Sync {
    /// The tile's buffer as decoded. `None` if the tile is gone.
    fn original_buffer(&self, tile: TileId) -> Option<RgbaImage>;

    /// The buffer the viewer currently draws for this tile.
    fn current_buffer(&self, tile: TileId) -> Option<RgbaImage>;

    /// Replace what the viewer draws for this tile.
    fn set_current_buffer(&self, tile: TileId, buffer: RgbaImage);

    /// Force the tile back through the load path (re-fetch from source).
    fn reset_tile(&self, tile: TileId);

    /// Synchronously reissue draw calls for every visible tile.
    fn force_full_redraw(&self);

    /// Handles of all images currently loaded in the viewer's world.
    fn loaded_images(&self) -> Vec<ImageHandle>;
}

/// Tile lifecycle notifications from the viewer.
///
/// These are delivered over a channel and handled off the render path; see
/// [`FilterPipeline::spawn_event_loop`](crate::FilterPipeline::spawn_event_loop).
/// The per-frame draw handshake is *not* an event: the viewer must call
/// [`FilterPipeline::on_tile_drawing`](crate::FilterPipeline::on_tile_drawing)
/// directly, because the frame needs its answer synchronously.
#[derive(Debug, Clone, Copy)]
pub enum TileEvent {
    /// Fired once per tile when its decoded pixels become available.
    Loaded { tile: TileId, image: ImageHandle },
    /// Fired when the viewer evicts a tile from its cache.
    Evicted { tile: TileId },
}
