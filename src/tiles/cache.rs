use crate::{core::geo::TileCoord, tiles::source::TileImage};
use fxhash::FxBuildHasher;
use log::trace;
use lru::LruCache;
use std::sync::{Arc, Mutex};

struct CacheState {
    entries: LruCache<TileCoord, Arc<TileImage>, FxBuildHasher>,
    bytes: usize,
    max_bytes: usize,
    generation: u64,
}

impl CacheState {
    fn evict_to(&mut self, budget: usize) {
        while self.bytes > budget {
            match self.entries.pop_lru() {
                Some((coord, image)) => {
                    self.bytes -= image.byte_size();
                    trace!("Evicted tile {:?} ({} bytes)", coord, image.byte_size());
                }
                None => break,
            }
        }
    }
}

/// In-memory tile cache bounded by decoded bytes, evicting least recently
/// used tiles first.
///
/// Every operation takes the internal lock briefly and never waits on tile
/// loading. The cache also carries a generation counter: [`TileCache::invalidate`]
/// clears it and starts a new generation, and
/// [`TileCache::insert_for_generation`] refuses results from older ones.
pub struct TileCache {
    state: Mutex<CacheState>,
}

impl TileCache {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::unbounded_with_hasher(FxBuildHasher::default()),
                bytes: 0,
                max_bytes,
                generation: 0,
            }),
        }
    }

    /// Looks up a tile, marking it as recently used.
    pub fn get(&self, coord: &TileCoord) -> Option<Arc<TileImage>> {
        self.state.lock().ok()?.entries.get(coord).cloned()
    }

    pub fn contains(&self, coord: &TileCoord) -> bool {
        self.state
            .lock()
            .map(|state| state.entries.contains(coord))
            .unwrap_or(false)
    }

    /// Inserts a tile, evicting older ones until the budget holds. A tile
    /// larger than the whole budget is not cached.
    pub fn insert(&self, coord: TileCoord, image: Arc<TileImage>) {
        if let Ok(mut state) = self.state.lock() {
            Self::insert_locked(&mut state, coord, image);
        }
    }

    /// Inserts only if no invalidation happened since `generation` was read.
    /// Returns whether the tile was accepted.
    pub fn insert_for_generation(
        &self,
        coord: TileCoord,
        image: Arc<TileImage>,
        generation: u64,
    ) -> bool {
        match self.state.lock() {
            Ok(mut state) if state.generation == generation => {
                Self::insert_locked(&mut state, coord, image);
                true
            }
            _ => false,
        }
    }

    fn insert_locked(state: &mut CacheState, coord: TileCoord, image: Arc<TileImage>) {
        let size = image.byte_size();
        if size > state.max_bytes {
            if let Some(old) = state.entries.pop(&coord) {
                state.bytes -= old.byte_size();
            }
            return;
        }

        if let Some(old) = state.entries.put(coord, image) {
            state.bytes -= old.byte_size();
        }
        state.bytes += size;

        let budget = state.max_bytes;
        state.evict_to(budget);
    }

    pub fn remove(&self, coord: &TileCoord) -> Option<Arc<TileImage>> {
        let mut state = self.state.lock().ok()?;
        let image = state.entries.pop(coord)?;
        state.bytes -= image.byte_size();
        Some(image)
    }

    /// Drops every tile without starting a new generation.
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.entries.clear();
            state.bytes = 0;
        }
    }

    /// Drops every tile and starts a new generation. Returns the new one.
    pub fn invalidate(&self) -> u64 {
        match self.state.lock() {
            Ok(mut state) => {
                state.entries.clear();
                state.bytes = 0;
                state.generation += 1;
                state.generation
            }
            Err(_) => 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().map(|state| state.generation).unwrap_or(0)
    }

    /// Changes the budget, evicting immediately if it shrank.
    pub fn set_max_bytes(&self, max_bytes: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.max_bytes = max_bytes;
            state.evict_to(max_bytes);
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.state.lock().map(|state| state.max_bytes).unwrap_or(0)
    }

    /// Decoded bytes currently held.
    pub fn bytes_used(&self) -> usize {
        self.state.lock().map(|state| state.bytes).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.entries.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for TileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCache")
            .field("len", &self.len())
            .field("bytes_used", &self.bytes_used())
            .field("max_bytes", &self.max_bytes())
            .finish()
    }
}
