//! Column elevation sampling.
//!
//! [`RangeSampler`] probes a regular grid of points across a column's
//! footprint and reduces them to the span of ground elevation found there.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::position::Column;
use crate::projection::Projection;
use crate::range::Range;
use crate::source::ElevationSource;

/// Ground elevation found across a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElevationRange {
    /// Lowest and highest sampled elevation, rounded to whole meters.
    Known(Range),
    /// No sample point was covered by the projection and elevation source.
    Unavailable,
}

impl ElevationRange {
    /// The sampled range, if any.
    pub fn range(&self) -> Option<Range> {
        match self {
            ElevationRange::Known(range) => Some(*range),
            ElevationRange::Unavailable => None,
        }
    }
}

impl fmt::Display for ElevationRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElevationRange::Known(range) => range.fmt(f),
            ElevationRange::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Samples ground elevation across columns.
///
/// Sample points are laid out every `step` blocks along X and Z, starting half
/// a step (rounded down) from the column's lower corner so each sample sits at
/// the center of its cell. Points reported out of coverage are skipped.
///
/// Minimum and maximum elevation are rounded half away from zero
/// ([`f64::round`]), so `-0.5` becomes `-1` and `35.5` becomes `36`.
pub struct RangeSampler {
    projection: Arc<dyn Projection>,
    source: Arc<dyn ElevationSource>,
    step: i64,
    cancelled: Arc<AtomicBool>,
}

impl RangeSampler {
    /// Create a sampler probing every `step` blocks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSettings`] if `step` is not at least 1.
    pub fn new(
        projection: Arc<dyn Projection>,
        source: Arc<dyn ElevationSource>,
        step: i64,
    ) -> Result<Self> {
        if step < 1 {
            return Err(Error::InvalidSettings(format!(
                "sampling step must be at least 1, got {}",
                step
            )));
        }
        Ok(Self {
            projection,
            source,
            step,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Abort sampling with [`Error::Terminated`] once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    /// Sampling step, in blocks.
    pub fn step(&self) -> i64 {
        self.step
    }

    /// Elevation at block `(x, z)`.
    fn probe(&self, x: i64, z: i64) -> Result<f64> {
        let point = self.projection.to_geo(x as f64, z as f64)?;
        let elevation = self.source.elevation_at(point)?;
        if !elevation.is_finite() {
            return Err(Error::OutOfCoverage {
                a: point.lat,
                b: point.lon,
            });
        }
        Ok(elevation)
    }

    /// Sample the elevation range of a column.
    ///
    /// # Errors
    ///
    /// Fails if the elevation source reports an error other than
    /// [`Error::OutOfCoverage`], or with [`Error::Terminated`] if cancelled.
    pub fn sample(&self, column: Column) -> Result<ElevationRange> {
        let xs = column.range_x();
        let zs = column.range_z();
        let offset = self.step / 2;
        let step = self.step as usize;

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut hits = 0u64;

        for x in (xs.lower_bound() + offset..=xs.upper_bound()).step_by(step) {
            for z in (zs.lower_bound() + offset..=zs.upper_bound()).step_by(step) {
                if self.cancelled.load(Ordering::Relaxed) {
                    return Err(Error::Terminated);
                }
                match self.probe(x, z) {
                    Ok(elevation) => {
                        min = min.min(elevation);
                        max = max.max(elevation);
                        hits += 1;
                    }
                    Err(e) if e.is_out_of_coverage() => {}
                    Err(e) => return Err(e),
                }
            }
        }

        if hits == 0 {
            return Ok(ElevationRange::Unavailable);
        }
        let range = Range::new(min.round() as i64, max.round() as i64)?;
        Ok(ElevationRange::Known(range))
    }
}
