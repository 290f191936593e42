//! Classification of a section against the ground elevation of its column.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::range::Range;
use crate::sampler::ElevationRange;

/// Where a section sits relative to the ground.
///
/// Variants are listed in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// Classification could not be carried out.
    Failed,
    /// No ground elevation is known for the column.
    OutOfBounds,
    /// Further below the ground than the deep threshold.
    UndergroundDeep,
    /// Below the ground, within the deep threshold.
    Underground,
    /// Contains the ground.
    Surface,
    /// Above the ground, within the high threshold.
    Sky,
    /// Further above the ground than the high threshold.
    SkyHigh,
}

impl Classification {
    /// Every classification, in report order.
    pub const ALL: [Classification; 7] = [
        Classification::Failed,
        Classification::OutOfBounds,
        Classification::UndergroundDeep,
        Classification::Underground,
        Classification::Surface,
        Classification::Sky,
        Classification::SkyHigh,
    ];

    /// Position of this classification in [`Classification::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Classification::Failed => "FAILED",
            Classification::OutOfBounds => "OUT_OF_BOUNDS",
            Classification::UndergroundDeep => "UNDERGROUND_DEEP",
            Classification::Underground => "UNDERGROUND",
            Classification::Surface => "SURFACE",
            Classification::Sky => "SKY",
            Classification::SkyHigh => "SKY_HIGH",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Vertical distances, in blocks, past which a section stops being near the
/// ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Thresholds {
    /// Height above the highest ground where the high sky starts.
    pub high_sky_start: i64,
    /// Depth below the lowest ground where deep underground starts.
    pub deep_start: i64,
}

impl Thresholds {
    /// # Errors
    ///
    /// Returns [`Error::InvalidSettings`] if either threshold is negative.
    pub fn new(high_sky_start: i64, deep_start: i64) -> Result<Self> {
        if high_sky_start < 0 || deep_start < 0 {
            return Err(Error::InvalidSettings(format!(
                "thresholds must not be negative, got high {} and deep {}",
                high_sky_start, deep_start
            )));
        }
        Ok(Self {
            high_sky_start,
            deep_start,
        })
    }
}

/// Classify a section spanning `section_y` over ground spanning `elevation`.
///
/// Checks run in this order, the first match wins:
///
/// 1. unknown elevation: [`Classification::OutOfBounds`]
/// 2. a column entirely below sea level is treated as ground at `[0, 0]`
/// 3. the section meets the ground: [`Classification::Surface`]
/// 4. the section meets the ground raised by `high_sky_start`:
///    [`Classification::Sky`], or [`Classification::SkyHigh`] if entirely above it
/// 5. the section meets the ground lowered by `deep_start`:
///    [`Classification::Underground`], otherwise [`Classification::UndergroundDeep`]
///
/// # Example
///
/// ```
/// use terraclean::{classify_range, Classification, ElevationRange, Range, Thresholds};
///
/// let thresholds = Thresholds::new(1000, 1000)?;
/// let ground = ElevationRange::Known(Range::new(28, 36)?);
///
/// let class = classify_range(&Range::new(256, 511)?, ground, &thresholds)?;
/// assert_eq!(class, Classification::Sky);
/// # Ok::<(), terraclean::Error>(())
/// ```
///
/// # Errors
///
/// Fails only if a threshold is negative enough to invert a band.
pub fn classify_range(
    section_y: &Range,
    elevation: ElevationRange,
    thresholds: &Thresholds,
) -> Result<Classification> {
    let Some(mut ground) = elevation.range() else {
        return Ok(Classification::OutOfBounds);
    };

    // Oceans: sea level is the surface
    if ground.above(0) {
        ground = Range::point(0);
    }

    if ground.intersects(section_y) {
        return Ok(Classification::Surface);
    }

    let sky = ground.extend_up(thresholds.high_sky_start)?;
    if sky.intersects(section_y) {
        return Ok(Classification::Sky);
    }
    if sky.above_range(section_y) {
        return Ok(Classification::SkyHigh);
    }

    let underground = ground.extend_down(thresholds.deep_start)?;
    if underground.intersects(section_y) {
        Ok(Classification::Underground)
    } else {
        Ok(Classification::UndergroundDeep)
    }
}
