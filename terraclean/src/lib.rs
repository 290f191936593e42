//! # terraclean - World Section Classification Library
//!
//! Classifies the 256-block cubic sections of a world by where they sit
//! relative to the ground, so that sections far from the surface can be
//! discarded from large region datasets.
//!
//! ## Features
//!
//! - **Concurrent**: sections are classified on a bounded worker pool
//! - **Deduplicated**: each column's ground elevation is sampled at most once,
//!   however many sections share it
//! - **Pluggable**: any [`Projection`] and [`ElevationSource`], with SRTM
//!   `.hgt` tiles supported out of the box
//!
//! ## Quick Start
//!
//! ```ignore
//! use terraclean::{ElevationClassifierBuilder, Section, WorldSettings};
//!
//! let settings = WorldSettings::from_file("world.json")?;
//! let classifier = ElevationClassifierBuilder::new().build(&settings)?;
//!
//! let class = classifier.classify(Section::new(12, -3, 40)).wait()?;
//! println!("Section is {}", class);
//! ```
//!
//! ## Classifications
//!
//! With the ground of a column spanning `[min, max]`:
//!
//! - **SURFACE**: the section contains some of the ground
//! - **SKY** / **SKY_HIGH**: above the ground, within or beyond the high threshold
//! - **UNDERGROUND** / **UNDERGROUND_DEEP**: below the ground, within or beyond
//!   the deep threshold
//! - **OUT_OF_BOUNDS**: no ground elevation is known for the column
//! - **FAILED**: classification could not be carried out
//!
//! Columns lying entirely below sea level count as ground at sea level.

pub mod cache;
pub mod classifier;
pub mod decision;
pub mod error;
pub mod filename;
pub mod position;
pub mod projection;
pub mod range;
pub mod report;
pub mod sampler;
pub mod settings;
pub mod source;
pub mod tile;

// Re-export main types at crate root for convenience
pub use cache::{CacheStats, ElevationCache, RangeCompute};
pub use classifier::{ClassificationHandle, ElevationClassifier, ElevationClassifierBuilder};
pub use decision::{classify_range, Classification, Thresholds};
pub use error::{Error, Result};
pub use filename::{parse_section_filename, scan_sections, SectionScan};
pub use position::{Column, Section};
pub use projection::{EquirectangularProjection, GeoPoint, Projection};
pub use range::Range;
pub use report::{format_size, CleanupReport, ReportSummary};
pub use sampler::{ElevationRange, RangeSampler};
pub use settings::WorldSettings;
pub use source::{ElevationSource, FlatElevation, SrtmElevation};
pub use tile::{HgtTile, SrtmResolution, VOID_VALUE};
