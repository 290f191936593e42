//! World settings: which projection and elevation source a world uses.
//!
//! Settings are read from JSON, either inline or from a file:
//!
//! ```json
//! {
//!   "projection": { "type": "equirectangular", "blocks_per_degree": 111320.0 },
//!   "elevation": { "type": "srtm", "data_dir": "/data/srtm", "cache_size": 100 }
//! }
//! ```
//!
//! Both sections are optional. The default world is an equirectangular
//! projection over flat ground at sea level.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::projection::{EquirectangularProjection, Projection};
use crate::source::{ElevationSource, FlatElevation, SrtmElevation};

/// Default number of SRTM tiles kept in memory.
pub const DEFAULT_TILE_CACHE_SIZE: u64 = 100;

fn default_tile_cache_size() -> u64 {
    DEFAULT_TILE_CACHE_SIZE
}

fn default_void_elevation() -> Option<f64> {
    Some(0.0)
}

/// Projection used to place world blocks on the globe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProjectionSettings {
    Equirectangular(EquirectangularProjection),
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        ProjectionSettings::Equirectangular(EquirectangularProjection::default())
    }
}

/// Where ground elevation comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElevationSettings {
    /// Same elevation everywhere.
    Flat { elevation: f64 },
    /// SRTM `.hgt` tiles from a local directory.
    Srtm {
        data_dir: PathBuf,
        #[serde(default = "default_tile_cache_size")]
        cache_size: u64,
        /// Elevation of missing tiles and void samples, `null` to skip them.
        #[serde(default = "default_void_elevation")]
        void_elevation: Option<f64>,
    },
}

impl Default for ElevationSettings {
    fn default() -> Self {
        ElevationSettings::Flat { elevation: 0.0 }
    }
}

/// Settings of the world being cleaned up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSettings {
    #[serde(default)]
    pub projection: ProjectionSettings,
    #[serde(default)]
    pub elevation: ElevationSettings,
}

impl WorldSettings {
    /// Parse settings from a JSON string.
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read settings from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::parse(&json)
    }

    /// Create settings using SRTM tiles configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `TERRACLEAN_DATA_DIR` | Directory containing .hgt files | Required |
    /// | `TERRACLEAN_CACHE_SIZE` | Maximum tiles in cache | 100 |
    ///
    /// # Errors
    ///
    /// Returns an error if `TERRACLEAN_DATA_DIR` is not set.
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("TERRACLEAN_DATA_DIR").map_err(|_| {
            Error::InvalidSettings("TERRACLEAN_DATA_DIR environment variable not set".into())
        })?;

        let cache_size = std::env::var("TERRACLEAN_CACHE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TILE_CACHE_SIZE);

        Ok(Self {
            projection: ProjectionSettings::default(),
            elevation: ElevationSettings::Srtm {
                data_dir: PathBuf::from(data_dir),
                cache_size,
                void_elevation: default_void_elevation(),
            },
        })
    }

    /// Build the projection these settings select.
    pub fn projection(&self) -> Result<Arc<dyn Projection>> {
        match &self.projection {
            ProjectionSettings::Equirectangular(projection) => {
                let scale = projection.blocks_per_degree;
                if !scale.is_finite() || scale <= 0.0 {
                    return Err(Error::InvalidSettings(format!(
                        "blocks_per_degree must be a positive number, got {}",
                        scale
                    )));
                }
                Ok(Arc::new(*projection))
            }
        }
    }

    /// Build the elevation source these settings select.
    pub fn elevation_source(&self) -> Result<Arc<dyn ElevationSource>> {
        match &self.elevation {
            ElevationSettings::Flat { elevation } => Ok(Arc::new(FlatElevation::new(*elevation))),
            ElevationSettings::Srtm {
                data_dir,
                cache_size,
                void_elevation,
            } => {
                if !data_dir.is_dir() {
                    return Err(Error::InvalidSettings(format!(
                        "SRTM data directory does not exist: {}",
                        data_dir.display()
                    )));
                }
                Ok(Arc::new(
                    SrtmElevation::new(data_dir, *cache_size).with_void_elevation(*void_elevation),
                ))
            }
        }
    }
}
