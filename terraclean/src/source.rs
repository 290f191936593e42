//! Ground elevation sources.
//!
//! An [`ElevationSource`] answers "how high is the ground here" for a
//! geographic point. The sampler combines it with a
//! [`Projection`](crate::projection::Projection) to probe a column.
//!
//! Two sources are provided:
//!
//! - [`FlatElevation`]: the same elevation everywhere
//! - [`SrtmElevation`]: SRTM `.hgt` tiles from a local directory, loaded on
//!   demand and kept in an LRU cache

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::sync::Cache;
use tempfile::NamedTempFile;

use crate::cache::CacheStats;
use crate::error::{Error, Result};
use crate::projection::GeoPoint;
use crate::tile::HgtTile;

/// Provides ground elevation, in meters, for geographic points.
pub trait ElevationSource: Send + Sync {
    /// Ground elevation at `point`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfCoverage`] if the source has no data for the
    /// point; samplers skip such points. Any other error fails the whole
    /// column being sampled.
    fn elevation_at(&self, point: GeoPoint) -> Result<f64>;
}

/// A world where the ground is at the same elevation everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatElevation {
    elevation: f64,
}

impl FlatElevation {
    pub fn new(elevation: f64) -> Self {
        Self { elevation }
    }
}

impl ElevationSource for FlatElevation {
    fn elevation_at(&self, _point: GeoPoint) -> Result<f64> {
        Ok(self.elevation)
    }
}

/// Convert a tile's southwest corner to its SRTM filename (e.g., `N35E138.hgt`).
pub fn tile_filename(lat: i32, lon: i32) -> String {
    let lat_prefix = if lat >= 0 { 'N' } else { 'S' };
    let lon_prefix = if lon >= 0 { 'E' } else { 'W' };
    format!(
        "{}{:02}{}{:03}.hgt",
        lat_prefix,
        lat.abs(),
        lon_prefix,
        lon.abs()
    )
}

/// Elevation from SRTM `.hgt` tiles with automatic tile caching.
///
/// Tiles are looked up in a data directory by their standard name
/// (`N35E138.hgt`), or extracted from a sibling `N35E138.hgt.zip` on first use.
/// SRTM does not cover the oceans, so missing tiles and void samples are
/// reported at `void_elevation` (sea level unless configured otherwise).
///
/// # Example
///
/// ```ignore
/// use terraclean::{ElevationSource, GeoPoint, SrtmElevation};
///
/// let source = SrtmElevation::new("/data/srtm", 100);
/// let elevation = source.elevation_at(GeoPoint::new(35.6762, 139.6503))?;
/// ```
pub struct SrtmElevation {
    data_dir: PathBuf,
    /// LRU cache of loaded tiles, keyed by southwest corner. Tiles missing
    /// from the data directory are remembered as `None`.
    tile_cache: Cache<(i32, i32), Option<Arc<HgtTile>>>,
    /// Elevation used where there is no data; `None` makes such points
    /// out of coverage instead.
    void_elevation: Option<f64>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl SrtmElevation {
    /// Create a source reading tiles from `data_dir`, keeping up to
    /// `cache_size` tiles in memory.
    pub fn new<P: AsRef<Path>>(data_dir: P, cache_size: u64) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            tile_cache: Cache::builder().max_capacity(cache_size).build(),
            void_elevation: Some(0.0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }

    /// Set the elevation reported where SRTM has no data.
    pub fn with_void_elevation(mut self, void_elevation: Option<f64>) -> Self {
        self.void_elevation = void_elevation;
        self
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get tile cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.tile_cache.run_pending_tasks();
        CacheStats {
            entry_count: self.tile_cache.entry_count(),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }

    fn void(&self, point: GeoPoint) -> Result<f64> {
        self.void_elevation.ok_or(Error::OutOfCoverage {
            a: point.lat,
            b: point.lon,
        })
    }

    /// Load a tile from cache or disk. `Ok(None)` if no such tile exists.
    ///
    /// Concurrent first requests for a tile are coalesced: one thread reads
    /// (and if needed extracts) it while the others wait for its outcome.
    fn load_tile(&self, key: (i32, i32)) -> Result<Option<Arc<HgtTile>>> {
        if let Some(tile) = self.tile_cache.get(&key) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            return Ok(tile);
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        self.tile_cache
            .try_get_with(key, || self.read_tile(key))
            .map_err(unshare)
    }

    /// Open a tile from the data directory, extracting it from its `.zip`
    /// archive first if only that is present.
    fn read_tile(&self, key: (i32, i32)) -> Result<Option<Arc<HgtTile>>> {
        let filename = tile_filename(key.0, key.1);
        let path = self.data_dir.join(&filename);

        if !path.exists() {
            let zip_path = self.data_dir.join(format!("{}.zip", filename));
            if !zip_path.exists() {
                tracing::debug!(tile = %filename, "No SRTM tile, using void elevation");
                return Ok(None);
            }
            self.extract_hgt_from_zip(&zip_path, &path)?;
        }

        let tile = HgtTile::open(&path, key.0, key.1)?;
        tracing::debug!(tile = %filename, "Loaded SRTM tile");
        Ok(Some(Arc::new(tile)))
    }

    /// Extract the .hgt file of a local .hgt.zip archive to `out_path`.
    ///
    /// The data is written to a temporary file in the data directory and
    /// renamed into place, so `out_path` never holds a partial tile.
    fn extract_hgt_from_zip(&self, zip_path: &Path, out_path: &Path) -> Result<()> {
        let invalid = |e: zip::result::ZipError| {
            Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        };

        let file = std::fs::File::open(zip_path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(invalid)?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(invalid)?;
            if entry.name().ends_with(".hgt") {
                let mut staging = NamedTempFile::new_in(&self.data_dir)?;
                std::io::copy(&mut entry, staging.as_file_mut())?;
                staging.persist(out_path).map_err(|e| Error::Io(e.error))?;
                return Ok(());
            }
        }

        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("No .hgt file found in {}", zip_path.display()),
        )))
    }
}

/// Recover an owned error from one shared between coalesced tile loads.
fn unshare(err: Arc<Error>) -> Error {
    Arc::try_unwrap(err).unwrap_or_else(|shared| match *shared {
        Error::InvalidFileSize { size } => Error::InvalidFileSize { size },
        ref other => Error::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            other.to_string(),
        )),
    })
}

impl ElevationSource for SrtmElevation {
    fn elevation_at(&self, point: GeoPoint) -> Result<f64> {
        if !(-60.0..=60.0).contains(&point.lat) || !(-180.0..=180.0).contains(&point.lon) {
            return Err(Error::OutOfCoverage {
                a: point.lat,
                b: point.lon,
            });
        }

        let key = (point.lat.floor() as i32, point.lon.floor() as i32);
        match self.load_tile(key)? {
            Some(tile) => match tile.elevation_at(point.lat, point.lon)? {
                Some(elevation) => Ok(elevation),
                None => self.void(point),
            },
            None => self.void(point),
        }
    }
}
