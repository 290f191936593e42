//! SRTM tile parsing and elevation extraction.
//!
//! [`HgtTile`] memory-maps a `.hgt` file and answers interpolated elevation
//! queries for the 1° × 1° cell it covers. It is the storage behind
//! [`SrtmElevation`](crate::source::SrtmElevation).

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{Error, Result};

/// Number of samples per row/column for SRTM1
const SRTM1_SAMPLES: usize = 3601;

/// Number of samples per row/column for SRTM3
const SRTM3_SAMPLES: usize = 1201;

/// File size for SRTM1 (1 arc-second, ~30m resolution): 3601 × 3601 × 2 bytes
const SRTM1_SIZE: usize = SRTM1_SAMPLES * SRTM1_SAMPLES * 2;

/// File size for SRTM3 (3 arc-second, ~90m resolution): 1201 × 1201 × 2 bytes
const SRTM3_SIZE: usize = SRTM3_SAMPLES * SRTM3_SAMPLES * 2;

/// Value indicating no data (void) in SRTM files
pub const VOID_VALUE: i16 = -32768;

/// Resolution type of an SRTM tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrtmResolution {
    /// SRTM1: 1 arc-second (~30m) resolution
    Srtm1,
    /// SRTM3: 3 arc-second (~90m) resolution
    Srtm3,
}

impl SrtmResolution {
    /// Detect the resolution from a file size in bytes.
    pub fn from_file_size(size: usize) -> Option<Self> {
        match size {
            SRTM1_SIZE => Some(SrtmResolution::Srtm1),
            SRTM3_SIZE => Some(SrtmResolution::Srtm3),
            _ => None,
        }
    }

    /// Returns the number of samples per row/column for this resolution.
    pub fn samples(&self) -> usize {
        match self {
            SrtmResolution::Srtm1 => SRTM1_SAMPLES,
            SrtmResolution::Srtm3 => SRTM3_SAMPLES,
        }
    }
}

/// A memory-mapped SRTM tile.
///
/// Rows run from the north edge to the south edge, columns from west to east.
pub struct HgtTile {
    data: Mmap,
    resolution: SrtmResolution,
    /// Southwest corner (integer degrees)
    base_lat: i32,
    base_lon: i32,
}

impl HgtTile {
    /// Open the tile whose southwest corner is at `(base_lat, base_lon)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or memory-mapped, or if
    /// its size matches neither SRTM1 nor SRTM3.
    pub fn open<P: AsRef<Path>>(path: P, base_lat: i32, base_lon: i32) -> Result<Self> {
        let file = File::open(&path)?;

        // SAFETY: Memory mapping is safe as long as the file is not modified
        // while mapped. We open the file read-only and don't expose the mapping.
        let data = unsafe { Mmap::map(&file)? };

        let resolution = SrtmResolution::from_file_size(data.len())
            .ok_or(Error::InvalidFileSize { size: data.len() })?;

        Ok(Self {
            data,
            resolution,
            base_lat,
            base_lon,
        })
    }

    pub fn resolution(&self) -> SrtmResolution {
        self.resolution
    }

    pub fn base_lat(&self) -> i32 {
        self.base_lat
    }

    pub fn base_lon(&self) -> i32 {
        self.base_lon
    }

    /// Raw sample at `(row, col)`, `None` for void.
    fn sample(&self, row: usize, col: usize) -> Option<i16> {
        let samples = self.resolution.samples();
        let row = row.min(samples - 1);
        let col = col.min(samples - 1);

        // 2 bytes per sample, big-endian, row-major
        let offset = (row * samples + col) * 2;
        let value = i16::from_be_bytes([self.data[offset], self.data[offset + 1]]);
        (value != VOID_VALUE).then_some(value)
    }

    /// Bilinearly interpolated elevation in meters.
    ///
    /// Returns `Ok(None)` if any of the four surrounding samples is void.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfCoverage`] if the point is not inside this tile.
    pub fn elevation_at(&self, lat: f64, lon: f64) -> Result<Option<f64>> {
        let lat_frac = lat - self.base_lat as f64;
        let lon_frac = lon - self.base_lon as f64;
        if !(0.0..=1.0).contains(&lat_frac) || !(0.0..=1.0).contains(&lon_frac) {
            return Err(Error::OutOfCoverage { a: lat, b: lon });
        }

        let last = (self.resolution.samples() - 1) as f64;
        let row_f = (1.0 - lat_frac) * last;
        let col_f = lon_frac * last;

        let row0 = row_f.floor() as usize;
        let col0 = col_f.floor() as usize;
        let dr = row_f - row0 as f64;
        let dc = col_f - col0 as f64;

        let (Some(nw), Some(ne), Some(sw), Some(se)) = (
            self.sample(row0, col0),
            self.sample(row0, col0 + 1),
            self.sample(row0 + 1, col0),
            self.sample(row0 + 1, col0 + 1),
        ) else {
            return Ok(None);
        };

        let north = nw as f64 * (1.0 - dc) + ne as f64 * dc;
        let south = sw as f64 * (1.0 - dc) + se as f64 * dc;
        Ok(Some(north * (1.0 - dr) + south * dr))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Build SRTM3 tile bytes where every sample is `fill`, with
    /// `overrides` as `(row, col, value)`.
    pub(crate) fn srtm3_bytes(fill: i16, overrides: &[(usize, usize, i16)]) -> Vec<u8> {
        let mut data = fill.to_be_bytes().repeat(SRTM3_SAMPLES * SRTM3_SAMPLES);
        for &(row, col, value) in overrides {
            let offset = (row * SRTM3_SAMPLES + col) * 2;
            data[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
        }
        data
    }

    fn tile_file(data: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file
    }

    #[test]
    fn test_load_srtm3_file() {
        let file = tile_file(&srtm3_bytes(0, &[]));
        let tile = HgtTile::open(file.path(), 35, 138).unwrap();

        assert_eq!(tile.resolution(), SrtmResolution::Srtm3);
        assert_eq!(tile.base_lat(), 35);
        assert_eq!(tile.base_lon(), 138);
    }

    #[test]
    fn test_invalid_file_size() {
        let file = tile_file(&[0u8; 1000]);

        match HgtTile::open(file.path(), 0, 0) {
            Err(Error::InvalidFileSize { size }) => assert_eq!(size, 1000),
            _ => panic!("Expected InvalidFileSize error"),
        }
    }

    #[test]
    fn test_flat_tile() {
        let file = tile_file(&srtm3_bytes(42, &[]));
        let tile = HgtTile::open(file.path(), 35, 138).unwrap();

        assert_eq!(tile.elevation_at(35.5, 138.5).unwrap(), Some(42.0));
        assert_eq!(tile.elevation_at(35.0, 138.0).unwrap(), Some(42.0));
        assert_eq!(tile.elevation_at(36.0, 139.0).unwrap(), Some(42.0));
    }

    #[test]
    fn test_exact_sample() {
        // Row 600, col 600 is the tile center
        let file = tile_file(&srtm3_bytes(0, &[(600, 600, 500)]));
        let tile = HgtTile::open(file.path(), 35, 138).unwrap();

        assert_eq!(tile.elevation_at(35.5, 138.5).unwrap(), Some(500.0));
    }

    #[test]
    fn test_interpolation_between_samples() {
        let file = tile_file(&srtm3_bytes(0, &[(600, 600, 100), (600, 601, 200)]));
        let tile = HgtTile::open(file.path(), 35, 138).unwrap();

        // Halfway between col 600 and 601 on row 600
        let lon = 138.5 + 0.5 / 1200.0;
        let elevation = tile.elevation_at(35.5, lon).unwrap().unwrap();
        assert!((elevation - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_void_sample() {
        let file = tile_file(&srtm3_bytes(10, &[(600, 600, VOID_VALUE)]));
        let tile = HgtTile::open(file.path(), 35, 138).unwrap();

        assert_eq!(tile.elevation_at(35.5, 138.5).unwrap(), None);
        assert_eq!(tile.elevation_at(35.25, 138.25).unwrap(), Some(10.0));
    }

    #[test]
    fn test_outside_tile() {
        let file = tile_file(&srtm3_bytes(0, &[]));
        let tile = HgtTile::open(file.path(), 35, 138).unwrap();

        assert!(tile.elevation_at(34.5, 138.5).unwrap_err().is_out_of_coverage());
        assert!(tile.elevation_at(35.5, 139.5).unwrap_err().is_out_of_coverage());
    }

    #[test]
    fn test_resolution_info() {
        assert_eq!(SrtmResolution::Srtm1.samples(), 3601);
        assert_eq!(SrtmResolution::Srtm3.samples(), 1201);
        assert_eq!(
            SrtmResolution::from_file_size(SRTM1_SIZE),
            Some(SrtmResolution::Srtm1)
        );
        assert_eq!(SrtmResolution::from_file_size(12), None);
    }
}
