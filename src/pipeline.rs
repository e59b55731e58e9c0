use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use image::RgbaImage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::filter::{FilterRule, Processor};
use crate::viewer::{TileEvent, TileViewer};
use crate::{ImageHandle, TileId};

/// How a configuration change reaches tiles that are already on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Force an immediate full redraw and run chains on the draw path.
    /// Only sensible when every processor is synchronous; an asynchronous
    /// processor in the mix still works but falls back to deferred
    /// reprocessing and may leave frames visibly stale.
    Sync,
    /// Reset affected tiles and let them converge over the next frames.
    #[default]
    Async,
}

/// A complete filter configuration, applied atomically by
/// [`FilterPipeline::configure`].
pub struct FilterConfig {
    pub filters: Vec<FilterRule>,
    pub load_mode: LoadMode,
}

/// What the draw handshake decided for one tile this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// The tile's buffer reflects the current configuration; draw it as is.
    UpToDate,
    /// No filters apply anymore; the original buffer was restored in place.
    Restored,
    /// The buffer is stale; either a reprocessing run is in flight and a
    /// later frame picks up the result, or the tile's pixels were not
    /// available and a later draw retries. Draw what is there meanwhile.
    Refreshing,
    /// A processor failed; the tile stays untagged and the next draw
    /// retries.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TileTag {
    /// A chain run captured under this generation is in flight.
    Processing(u64),
    /// The displayed buffer is the chain output of this generation.
    Tagged(u64),
}

#[derive(Clone, Copy)]
struct TileEntry {
    image: ImageHandle,
    tag: TileTag,
}

#[derive(Default)]
struct RuleSet {
    filters: Vec<FilterRule>,
    load_mode: LoadMode,
}

struct PipelineState {
    /// Bumped exactly once per configuration change. A tile tagged with a
    /// smaller value holds pixels derived from an outdated rule set.
    generation: AtomicU64,
    rules: Mutex<RuleSet>,
    /// Extrinsic per-tile state; absence means the tile was never filtered.
    tiles: Mutex<HashMap<TileId, TileEntry>>,
}

/// Applies a reconfigurable filter chain to viewer tiles and keeps
/// already-rendered tiles consistent with the latest configuration.
///
/// All shared state sits behind `Arc`s, so the controller is `Clone` and a
/// copy can be handed to the viewer's event dispatch while another drives
/// [`FilterPipeline::configure`] from UI code.
#[derive(Clone)]
pub struct FilterPipeline {
    viewer: Arc<dyn TileViewer>,
    state: Arc<PipelineState>,
}

impl FilterPipeline {
    pub fn new(viewer: Arc<dyn TileViewer>) -> Self {
        Self {
            viewer,
            state: Arc::new(PipelineState {
                generation: AtomicU64::new(0),
                rules: Mutex::new(RuleSet::default()),
                tiles: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The current configuration generation.
    pub fn generation(&self) -> u64 {
        self.state.generation.load(Ordering::SeqCst)
    }

    /// Replaces the rule set wholesale and bumps the generation.
    ///
    /// Validation happens before any state is touched: a rejected
    /// configuration leaves rules, generation and tile tags exactly as they
    /// were.
    pub fn configure(&self, config: FilterConfig) -> Result<(), ConfigError> {
        validate_rules(&config.filters)?;

        let all_sync = config.filters.iter().all(FilterRule::is_sync);
        let has_global = config.filters.iter().any(|r| r.scope.is_none());
        let scoped: HashSet<ImageHandle> = config
            .filters
            .iter()
            .filter_map(|r| r.scope.as_deref())
            .flatten()
            .copied()
            .collect();
        let load_mode = config.load_mode;

        let generation = {
            let mut rules = self.state.rules.lock().unwrap();
            rules.filters = config.filters;
            rules.load_mode = load_mode;
            self.state.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        debug!(generation, mode = ?load_mode, "filter configuration replaced");

        match load_mode {
            LoadMode::Sync => {
                if !all_sync {
                    warn!("sync load mode with asynchronous processors stalls the render loop");
                }
                self.viewer.force_full_redraw();
            }
            LoadMode::Async => {
                let affected: Vec<TileId> = {
                    let mut tiles = self.state.tiles.lock().unwrap();
                    let affected: Vec<TileId> = tiles
                        .iter()
                        .filter(|(_, entry)| has_global || scoped.contains(&entry.image))
                        .map(|(tile, _)| *tile)
                        .collect();
                    for tile in &affected {
                        tiles.remove(tile);
                    }
                    affected
                };
                for tile in affected {
                    self.viewer.reset_tile(tile);
                }
            }
        }
        Ok(())
    }

    /// The processor chain applying to an image under the current rules.
    ///
    /// The first scoped rule naming the image wins; otherwise the last
    /// registered global rule applies; otherwise the chain is empty.
    pub fn resolve_processors(&self, image: ImageHandle) -> Vec<Arc<dyn Processor>> {
        let rules = self.state.rules.lock().unwrap();
        let mut global = None;
        for rule in &rules.filters {
            match &rule.scope {
                None => global = Some(rule),
                Some(scope) if scope.contains(&image) => return rule.processors.clone(),
                Some(_) => {}
            }
        }
        global.map(|rule| rule.processors.clone()).unwrap_or_default()
    }

    /// Handles a tile's decoded pixels becoming available.
    ///
    /// Runs the resolved chain over the tile's buffer; tiles with no
    /// applicable filters are left untouched and untagged.
    pub async fn on_tile_loaded(&self, tile: TileId, image: ImageHandle) {
        let processors = self.resolve_processors(image);
        if processors.is_empty() {
            return;
        }
        let captured = self.generation();
        self.mark(tile, image, TileTag::Processing(captured));
        self.run_chain(tile, image, processors, captured).await;
    }

    /// Per-frame draw handshake. Never blocks the frame, except for the
    /// documented sync fast path where the whole chain is synchronous and
    /// the pipeline was configured with [`LoadMode::Sync`].
    pub fn on_tile_drawing(&self, tile: TileId, image: ImageHandle) -> DrawOutcome {
        let generation = self.generation();
        {
            let tiles = self.state.tiles.lock().unwrap();
            match tiles.get(&tile).map(|entry| entry.tag) {
                Some(TileTag::Tagged(g)) if g == generation => return DrawOutcome::UpToDate,
                Some(TileTag::Processing(g)) if g == generation => return DrawOutcome::Refreshing,
                _ => {}
            }
        }

        let processors = self.resolve_processors(image);
        if processors.is_empty() {
            // Cheap path: hand the as-decoded pixels straight back.
            let Some(original) = self.viewer.original_buffer(tile) else {
                return DrawOutcome::Refreshing;
            };
            self.viewer.set_current_buffer(tile, original);
            self.mark(tile, image, TileTag::Tagged(generation));
            return DrawOutcome::Restored;
        }

        let sync_chain = self.state.rules.lock().unwrap().load_mode == LoadMode::Sync
            && processors.iter().all(|p| p.is_sync());
        if sync_chain {
            self.mark(tile, image, TileTag::Processing(generation));
            return self.run_chain_blocking(tile, image, &processors, generation);
        }

        self.mark(tile, image, TileTag::Processing(generation));
        let pipeline = self.clone();
        tokio::spawn(async move {
            pipeline.run_chain(tile, image, processors, generation).await;
        });
        DrawOutcome::Refreshing
    }

    /// Drops the extrinsic state of an evicted tile.
    pub fn on_tile_evicted(&self, tile: TileId) {
        self.state.tiles.lock().unwrap().remove(&tile);
    }

    /// Drives [`TileEvent`]s from a channel on a background task. The draw
    /// handshake is not routed through here; the viewer calls
    /// [`FilterPipeline::on_tile_drawing`] directly each frame.
    pub fn spawn_event_loop(&self, mut rx: mpsc::UnboundedReceiver<TileEvent>) -> JoinHandle<()> {
        let pipeline = self.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    TileEvent::Loaded { tile, image } => {
                        pipeline.on_tile_loaded(tile, image).await;
                    }
                    TileEvent::Evicted { tile } => pipeline.on_tile_evicted(tile),
                }
            }
        })
    }

    /// Runs a chain captured under `captured` from the tile's original
    /// buffer, checking for supersession before every step and before the
    /// final write-back. Superseded or failed runs leave the tile untagged
    /// so the next draw retries; they never publish partial results.
    async fn run_chain(
        &self,
        tile: TileId,
        image: ImageHandle,
        processors: Vec<Arc<dyn Processor>>,
        captured: u64,
    ) {
        let Some(mut buffer) = self.viewer.original_buffer(tile) else {
            // Tile evicted while we were queued.
            self.clear_processing(tile, captured);
            return;
        };
        for processor in &processors {
            if self.generation() != captured {
                debug!(?tile, captured, "chain superseded mid-flight, dropping run");
                self.clear_processing(tile, captured);
                return;
            }
            if let Err(err) = processor.apply_async(&mut buffer).await {
                warn!(
                    ?tile,
                    processor = processor.name(),
                    %err,
                    "processor failed, tile left unfiltered"
                );
                self.clear_processing(tile, captured);
                return;
            }
        }
        if self.generation() != captured {
            debug!(?tile, captured, "chain superseded after final step");
            self.clear_processing(tile, captured);
            return;
        }
        self.commit(tile, image, buffer, captured);
    }

    /// Synchronous twin of [`FilterPipeline::run_chain`] for the sync fast
    /// path on the draw handler.
    fn run_chain_blocking(
        &self,
        tile: TileId,
        image: ImageHandle,
        processors: &[Arc<dyn Processor>],
        captured: u64,
    ) -> DrawOutcome {
        let Some(mut buffer) = self.viewer.original_buffer(tile) else {
            self.clear_processing(tile, captured);
            return DrawOutcome::Refreshing;
        };
        for processor in processors {
            if self.generation() != captured {
                self.clear_processing(tile, captured);
                return DrawOutcome::Refreshing;
            }
            if let Err(err) = processor.apply(&mut buffer) {
                warn!(
                    ?tile,
                    processor = processor.name(),
                    %err,
                    "processor failed, tile left unfiltered"
                );
                self.clear_processing(tile, captured);
                return DrawOutcome::Failed;
            }
        }
        if self.generation() != captured {
            self.clear_processing(tile, captured);
            return DrawOutcome::Refreshing;
        }
        if self.commit(tile, image, buffer, captured) {
            DrawOutcome::UpToDate
        } else {
            DrawOutcome::Refreshing
        }
    }

    /// Publishes a finished run's output, but only while our own in-flight
    /// marker is still in place. An eviction drops the marker and a newer
    /// run replaces it; in both cases this run's output is discarded so dead
    /// tile state is never resurrected.
    fn commit(&self, tile: TileId, image: ImageHandle, buffer: RgbaImage, captured: u64) -> bool {
        let mut tiles = self.state.tiles.lock().unwrap();
        match tiles.get(&tile) {
            Some(entry) if entry.tag == TileTag::Processing(captured) => {
                self.viewer.set_current_buffer(tile, buffer);
                tiles.insert(
                    tile,
                    TileEntry {
                        image,
                        tag: TileTag::Tagged(captured),
                    },
                );
                true
            }
            _ => {
                debug!(?tile, captured, "tile state changed before write-back, dropping run");
                false
            }
        }
    }

    fn mark(&self, tile: TileId, image: ImageHandle, tag: TileTag) {
        self.state
            .tiles
            .lock()
            .unwrap()
            .insert(tile, TileEntry { image, tag });
    }

    /// Removes our own in-flight marker without clobbering a newer run's.
    fn clear_processing(&self, tile: TileId, captured: u64) {
        let mut tiles = self.state.tiles.lock().unwrap();
        if let Some(entry) = tiles.get(&tile) {
            if entry.tag == TileTag::Processing(captured) {
                tiles.remove(&tile);
            }
        }
    }
}

fn validate_rules(rules: &[FilterRule]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for rule in rules {
        if rule.processors.is_empty() {
            return Err(ConfigError::EmptyRule);
        }
        if let Some(scope) = &rule.scope {
            for handle in scope {
                if !seen.insert(*handle) {
                    return Err(ConfigError::DuplicateScope(*handle));
                }
            }
        }
    }
    Ok(())
}
