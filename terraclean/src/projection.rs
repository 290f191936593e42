//! Projections from world block coordinates to geographic coordinates.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A point in geographic coordinates, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Latitude, -90 to +90.
    pub lat: f64,
    /// Longitude, -180 to +180.
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Maps world block coordinates onto the globe.
pub trait Projection: Send + Sync {
    /// Project the block at `(x, z)` to geographic coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfCoverage`] if the block has no geographic
    /// counterpart.
    fn to_geo(&self, x: f64, z: f64) -> Result<GeoPoint>;
}

/// Plate carrée projection: a fixed number of blocks per degree on both axes.
///
/// X grows eastward and Z grows southward, as in a Minecraft world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquirectangularProjection {
    /// Blocks per degree of latitude and longitude.
    pub blocks_per_degree: f64,
    /// Latitude of the block at `(0, 0)`.
    #[serde(default)]
    pub origin_lat: f64,
    /// Longitude of the block at `(0, 0)`.
    #[serde(default)]
    pub origin_lon: f64,
}

impl EquirectangularProjection {
    /// Roughly one block per meter at the equator.
    pub const DEFAULT_BLOCKS_PER_DEGREE: f64 = 111_320.0;

    pub fn new(blocks_per_degree: f64) -> Self {
        Self {
            blocks_per_degree,
            origin_lat: 0.0,
            origin_lon: 0.0,
        }
    }
}

impl Default for EquirectangularProjection {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BLOCKS_PER_DEGREE)
    }
}

impl Projection for EquirectangularProjection {
    fn to_geo(&self, x: f64, z: f64) -> Result<GeoPoint> {
        let lon = self.origin_lon + x / self.blocks_per_degree;
        let lat = self.origin_lat - z / self.blocks_per_degree;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(Error::OutOfCoverage { a: x, b: z });
        }
        Ok(GeoPoint::new(lat, lon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin() {
        let projection = EquirectangularProjection::new(100.0);
        assert_eq!(projection.to_geo(0.0, 0.0).unwrap(), GeoPoint::new(0.0, 0.0));
    }

    #[test]
    fn test_axes() {
        let projection = EquirectangularProjection::new(100.0);

        // East is +X, south is +Z
        let point = projection.to_geo(250.0, 350.0).unwrap();
        assert_eq!(point.lon, 2.5);
        assert_eq!(point.lat, -3.5);
    }

    #[test]
    fn test_offset_origin() {
        let projection = EquirectangularProjection {
            blocks_per_degree: 10.0,
            origin_lat: 35.0,
            origin_lon: 138.0,
        };
        let point = projection.to_geo(5.0, -5.0).unwrap();
        assert_eq!(point, GeoPoint::new(35.5, 138.5));
    }

    #[test]
    fn test_out_of_coverage() {
        let projection = EquirectangularProjection::new(1.0);
        assert!(projection.to_geo(180.0, -90.0).is_ok());
        assert!(projection.to_geo(181.0, 0.0).unwrap_err().is_out_of_coverage());
        assert!(projection.to_geo(0.0, -91.0).unwrap_err().is_out_of_coverage());
    }

    #[test]
    fn test_deserialize_defaults_origin() {
        let projection: EquirectangularProjection =
            serde_json::from_str(r#"{"blocks_per_degree": 50.0}"#).unwrap();
        assert_eq!(projection, EquirectangularProjection::new(50.0));
    }
}
