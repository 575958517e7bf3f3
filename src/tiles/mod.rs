pub mod cache;
pub mod layer;
pub mod loader;
pub mod source;

// Re-exports for convenience
pub use cache::TileCache;
pub use layer::{PlannedTile, TileLayer, TilePlan};
pub use loader::{TileCallback, TileLoader};
#[cfg(feature = "image-decode")]
pub use source::DecodingTileSource;
pub use source::{MemoryTileSource, RawTileSource, TileImage, TileSource, TileSourceMetadata};
