use crossbeam_channel::{unbounded, Receiver, Sender};

use super::{
    cache::TileCache,
    source::{TileImage, TileSource},
};
use crate::core::{config::TileCacheConfig, geo::TileCoord};
use crate::prelude::Arc;
use log::{debug, trace, warn};
use once_cell::sync::Lazy;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        RwLock,
    },
    thread::{self, JoinHandle},
};

/// Completion callback. It is handed back to the owner of the loader and
/// never runs on the worker thread.
pub type TileCallback = Box<dyn FnOnce() + Send + 'static>;

/// Placeholder cached for tiles the source could not produce.
static EMPTY_TILE: Lazy<Arc<TileImage>> = Lazy::new(|| Arc::new(TileImage::empty()));

enum LoaderMessage {
    Load {
        coord: TileCoord,
        generation: u64,
        callback: Option<TileCallback>,
    },
    Notify(TileCallback),
}

struct Shared {
    cache: TileCache,
    source: RwLock<Option<Arc<dyn TileSource>>>,
    shutdown: AtomicBool,
}

impl Shared {
    fn current_source(&self) -> Option<Arc<dyn TileSource>> {
        self.source.read().ok().and_then(|source| source.clone())
    }
}

/// Asynchronous front end to a [`TileCache`].
///
/// A single worker thread processes requests strictly in submission order:
/// it fetches from the current [`TileSource`] and inserts the result, or the
/// shared empty placeholder when the source has nothing usable. The caller
/// side only does non-blocking lookups and enqueues.
///
/// Requests are tagged with the cache generation current when they were
/// made. Swapping the source or clearing the cache starts a new generation,
/// and results from older ones are dropped instead of inserted.
///
/// Callbacks travel back over a second channel; the owner runs them on its
/// own thread with [`TileLoader::dispatch_callbacks`] or by draining
/// [`TileLoader::callback_receiver`].
pub struct TileLoader {
    shared: Arc<Shared>,
    task_tx: Option<Sender<LoaderMessage>>,
    callback_rx: Receiver<TileCallback>,
    worker: Option<JoinHandle<()>>,
}

impl TileLoader {
    pub fn new(config: TileCacheConfig) -> Self {
        let shared = Arc::new(Shared {
            cache: TileCache::new(config.max_bytes),
            source: RwLock::new(None),
            shutdown: AtomicBool::new(false),
        });
        let (task_tx, task_rx) = unbounded();
        let (callback_tx, callback_rx) = unbounded();

        let worker = TileWorker {
            task_rx,
            callback_tx,
            shared: Arc::clone(&shared),
        };
        let handle = thread::Builder::new()
            .name(config.worker_name.clone())
            .spawn(move || worker.run());
        let worker = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Failed to start tile loader thread: {}", e);
                None
            }
        };

        Self {
            shared,
            task_tx: Some(task_tx),
            callback_rx,
            worker,
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(TileCacheConfig::default())
    }

    /// Replaces the tile source and drops every cached tile.
    pub fn set_tile_source(&self, source: Option<Arc<dyn TileSource>>) {
        match self.shared.source.write() {
            Ok(mut current) => {
                *current = source;
                let generation = self.shared.cache.invalidate();
                debug!("Tile source replaced, cache generation {}", generation);
            }
            Err(_) => warn!("Tile source lock poisoned, source not replaced"),
        }
    }

    pub fn tile_source(&self) -> Option<Arc<dyn TileSource>> {
        self.shared.current_source()
    }

    /// Non-blocking cache lookup. Never triggers a load.
    pub fn get_tile(&self, coord: &TileCoord) -> Option<Arc<TileImage>> {
        self.shared.cache.get(coord)
    }

    /// Queues a load of `coord`. The callback, if any, is handed back once
    /// the request has been processed.
    pub fn request_tile(&self, coord: TileCoord, callback: Option<TileCallback>) {
        let generation = self.shared.cache.generation();
        self.send(LoaderMessage::Load {
            coord,
            generation,
            callback,
        });
    }

    /// Queues a marker that hands `callback` back once every request queued
    /// before it has been processed.
    pub fn notify_when_drained(&self, callback: TileCallback) {
        self.send(LoaderMessage::Notify(callback));
    }

    fn send(&self, message: LoaderMessage) {
        let sent = self
            .task_tx
            .as_ref()
            .map(|tx| tx.send(message).is_ok())
            .unwrap_or(false);
        if !sent {
            warn!("Tile loader worker is gone, request dropped");
        }
    }

    /// Runs every callback handed back so far on the calling thread.
    /// Returns how many ran.
    pub fn dispatch_callbacks(&self) -> usize {
        let mut dispatched = 0;
        while let Ok(callback) = self.callback_rx.try_recv() {
            callback();
            dispatched += 1;
        }
        dispatched
    }

    /// Channel of pending callbacks, for integrating with an event loop.
    pub fn callback_receiver(&self) -> &Receiver<TileCallback> {
        &self.callback_rx
    }

    /// Drops every cached tile; results of requests already queued are
    /// discarded.
    pub fn clear_cache(&self) {
        self.shared.cache.invalidate();
    }

    pub fn cache(&self) -> &TileCache {
        &self.shared.cache
    }

    /// The shared placeholder stored for missing or undecodable tiles.
    pub fn empty_tile() -> Arc<TileImage> {
        Arc::clone(&EMPTY_TILE)
    }

    pub fn is_empty_tile(image: &Arc<TileImage>) -> bool {
        Arc::ptr_eq(image, &EMPTY_TILE)
    }
}

impl Default for TileLoader {
    fn default() -> Self {
        Self::with_default_config()
    }
}

impl Drop for TileLoader {
    /// Returns without waiting for the worker. Queued loads are skipped, and
    /// the thread exits after any fetch already in progress.
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.task_tx.take();
        if self.worker.take().is_some() {
            debug!("Tile loader dropped, worker detached");
        }
    }
}

/// Background worker that processes load requests one at a time.
struct TileWorker {
    task_rx: Receiver<LoaderMessage>,
    callback_tx: Sender<TileCallback>,
    shared: Arc<Shared>,
}

impl TileWorker {
    fn run(self) {
        debug!("TileWorker starting");

        for message in self.task_rx.iter() {
            match message {
                LoaderMessage::Load {
                    coord,
                    generation,
                    callback,
                } => {
                    self.load(coord, generation);
                    if let Some(callback) = callback {
                        self.hand_back(callback);
                    }
                }
                LoaderMessage::Notify(callback) => self.hand_back(callback),
            }
        }

        debug!("TileWorker exiting - channel disconnected");
    }

    fn load(&self, coord: TileCoord, generation: u64) {
        if self.shared.shutdown.load(Ordering::Acquire) {
            trace!("Loader shut down, skipping {:?}", coord);
            return;
        }
        if generation != self.shared.cache.generation() {
            trace!("Skipping stale request for {:?}", coord);
            return;
        }

        let Some(source) = self.shared.current_source() else {
            trace!("No tile source, ignoring request for {:?}", coord);
            return;
        };

        trace!("Fetching tile {:?}", coord);
        let image = match source.fetch_tile(coord) {
            Ok(Some(image)) => Arc::new(image),
            Ok(None) => TileLoader::empty_tile(),
            Err(e) => {
                warn!("Tile {:?} unavailable: {}", coord, e);
                TileLoader::empty_tile()
            }
        };

        // an image the budget can never hold is stored as the placeholder so
        // the key does not miss and re-fetch on every frame
        let image = if image.byte_size() > self.shared.cache.max_bytes() {
            warn!(
                "Tile {:?} is {} bytes, over the {} byte cache budget",
                coord,
                image.byte_size(),
                self.shared.cache.max_bytes()
            );
            TileLoader::empty_tile()
        } else {
            image
        };

        if !self.shared.cache.insert_for_generation(coord, image, generation) {
            warn!("Discarding tile {:?} loaded for a replaced source", coord);
        }
    }

    fn hand_back(&self, callback: TileCallback) {
        if self.callback_tx.send(callback).is_err() {
            trace!("Callback receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::source::{MemoryTileSource, TileSourceMetadata};
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        time::Duration,
    };

    /// Blocks until every queued request has been processed.
    fn drain(loader: &TileLoader) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        loader.notify_when_drained(Box::new(move || {
            let _ = tx.send(());
        }));
        let callback = loader
            .callback_receiver()
            .recv_timeout(Duration::from_secs(5))
            .expect("worker did not drain");
        callback();
        rx.recv_timeout(Duration::from_secs(1)).unwrap();
    }

    #[test]
    fn test_request_then_drain_fills_cache() {
        let coord = TileCoord::new(0, 0, 0);
        let missing = TileCoord::new(1, 1, 1);
        let source = MemoryTileSource::new(TileSourceMetadata::default())
            .with_tile(coord, TileImage::from_rgba(2, 2, vec![255; 16]).unwrap());

        let loader = TileLoader::with_default_config();
        loader.set_tile_source(Some(Arc::new(source)));
        assert!(loader.get_tile(&coord).is_none());

        loader.request_tile(coord, None);
        loader.request_tile(missing, None);
        drain(&loader);

        let tile = loader.get_tile(&coord).unwrap();
        assert_eq!(tile.width(), 2);
        assert!(!TileLoader::is_empty_tile(&tile));

        let placeholder = loader.get_tile(&missing).unwrap();
        assert!(TileLoader::is_empty_tile(&placeholder));
    }

    #[test]
    fn test_callbacks_run_on_dispatching_thread() {
        let loader = TileLoader::with_default_config();
        loader.set_tile_source(Some(Arc::new(MemoryTileSource::default())));

        let caller = thread::current().id();
        let ran_here = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran_here);
        loader.request_tile(
            TileCoord::new(0, 0, 0),
            Some(Box::new(move || {
                flag.store(thread::current().id() == caller, Ordering::SeqCst);
            })),
        );

        let callback = loader
            .callback_receiver()
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        assert!(!ran_here.load(Ordering::SeqCst));
        callback();
        assert!(ran_here.load(Ordering::SeqCst));
    }

    #[test]
    fn test_source_swap_invalidates() {
        let coord = TileCoord::new(0, 0, 0);
        let loader = TileLoader::with_default_config();
        loader.set_tile_source(Some(Arc::new(MemoryTileSource::default())));
        loader.request_tile(coord, None);
        drain(&loader);
        assert!(loader.get_tile(&coord).is_some());

        loader.set_tile_source(Some(Arc::new(MemoryTileSource::default())));
        assert!(loader.get_tile(&coord).is_none());
        assert!(loader.cache().is_empty());
    }
}
