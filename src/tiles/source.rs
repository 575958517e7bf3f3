use crate::{
    core::{
        constants::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, TILE_SIZE},
        geo::{GeoPoint, TileCoord},
    },
    prelude::HashMap,
    MapError, Result,
};
use log::warn;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    RwLock,
};

/// A decoded tile: tightly packed RGBA8 rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl TileImage {
    /// Wraps RGBA8 pixel data. Fails if the buffer does not match the size.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(MapError::TileDecode(format!(
                "{}x{} image needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A 1x1 fully transparent image.
    pub fn empty() -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![0; 4],
        }
    }

    /// Decodes PNG or JPEG bytes into RGBA8.
    #[cfg(feature = "image-decode")]
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| MapError::TileDecode(e.to_string()))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        Self::from_rgba(width, height, decoded.into_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Bytes charged against the cache budget.
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }
}

/// Descriptive data published by a tile source.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSourceMetadata {
    /// South-west and north-east corners.
    pub bounds: Option<[GeoPoint; 2]>,
    pub center: Option<GeoPoint>,
    pub min_zoom: i32,
    pub max_zoom: i32,
    pub tile_width: u32,
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub attribution: Option<String>,
    pub template: Option<String>,
}

impl Default for TileSourceMetadata {
    fn default() -> Self {
        Self {
            bounds: None,
            center: None,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            tile_width: TILE_SIZE,
            name: None,
            description: None,
            version: None,
            attribution: None,
            template: None,
        }
    }
}

impl TileSourceMetadata {
    /// Parses MBTiles-style name/value rows.
    ///
    /// Recognised keys: `bounds` ("west,south,east,north"), `center`
    /// ("lon,lat,zoom"), `minzoom`, `maxzoom`, `name`, `description`,
    /// `version`, `attribution` and `template`. Unknown keys are skipped and
    /// malformed values are logged and ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut metadata = Self::default();
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            match key {
                "bounds" => match parse_numbers(value, 4) {
                    Some(v) => {
                        metadata.bounds =
                            Some([GeoPoint::new(v[0], v[1]), GeoPoint::new(v[2], v[3])])
                    }
                    None => warn!("Ignoring malformed bounds {:?}", value),
                },
                "center" => match parse_numbers(value, 3) {
                    Some(v) => metadata.center = Some(GeoPoint::new(v[0], v[1])),
                    None => warn!("Ignoring malformed center {:?}", value),
                },
                "minzoom" => match value.parse() {
                    Ok(zoom) => metadata.min_zoom = zoom,
                    Err(_) => warn!("Ignoring malformed minzoom {:?}", value),
                },
                "maxzoom" => match value.parse() {
                    Ok(zoom) => metadata.max_zoom = zoom,
                    Err(_) => warn!("Ignoring malformed maxzoom {:?}", value),
                },
                "name" => metadata.name = Some(value.to_string()),
                "description" => metadata.description = Some(value.to_string()),
                "version" => metadata.version = Some(value.to_string()),
                "attribution" => metadata.attribution = Some(value.to_string()),
                "template" => metadata.template = Some(value.to_string()),
                _ => {}
            }
        }
        metadata
    }
}

fn parse_numbers(value: &str, count: usize) -> Option<Vec<f64>> {
    let numbers: Vec<f64> = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    (numbers.len() == count).then_some(numbers)
}

/// Produces decoded tiles for the loader's worker thread.
///
/// `fetch_tile` is only ever called from the worker and may block. `Ok(None)`
/// means the source has no tile at that coordinate.
pub trait TileSource: Send + Sync {
    fn fetch_tile(&self, coord: TileCoord) -> Result<Option<TileImage>>;

    fn metadata(&self) -> TileSourceMetadata;
}

/// A source of encoded tile bytes, e.g. a tile database.
pub trait RawTileSource: Send + Sync {
    fn fetch_raw(&self, coord: TileCoord) -> Result<Option<Vec<u8>>>;

    fn metadata(&self) -> TileSourceMetadata;
}

/// Adapts a [`RawTileSource`] into a [`TileSource`] by decoding PNG/JPEG.
#[cfg(feature = "image-decode")]
pub struct DecodingTileSource<S> {
    inner: S,
}

#[cfg(feature = "image-decode")]
impl<S: RawTileSource> DecodingTileSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[cfg(feature = "image-decode")]
impl<S: RawTileSource> TileSource for DecodingTileSource<S> {
    fn fetch_tile(&self, coord: TileCoord) -> Result<Option<TileImage>> {
        match self.inner.fetch_raw(coord)? {
            Some(bytes) => TileImage::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn metadata(&self) -> TileSourceMetadata {
        self.inner.metadata()
    }
}

/// In-memory tile source, handy for tests and pre-rendered overlays.
#[derive(Debug, Default)]
pub struct MemoryTileSource {
    tiles: RwLock<HashMap<TileCoord, TileImage>>,
    metadata: TileSourceMetadata,
    fetches: AtomicUsize,
}

impl MemoryTileSource {
    pub fn new(metadata: TileSourceMetadata) -> Self {
        Self {
            tiles: RwLock::new(HashMap::default()),
            metadata,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn insert(&self, coord: TileCoord, image: TileImage) {
        if let Ok(mut tiles) = self.tiles.write() {
            tiles.insert(coord, image);
        }
    }

    pub fn with_tile(self, coord: TileCoord, image: TileImage) -> Self {
        self.insert(coord, image);
        self
    }

    /// Number of `fetch_tile` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl TileSource for MemoryTileSource {
    fn fetch_tile(&self, coord: TileCoord) -> Result<Option<TileImage>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let tiles = self
            .tiles
            .read()
            .map_err(|_| MapError::SourceUnavailable("tile map lock poisoned".to_string()))?;
        Ok(tiles.get(&coord).cloned())
    }

    fn metadata(&self) -> TileSourceMetadata {
        self.metadata.clone()
    }
}
