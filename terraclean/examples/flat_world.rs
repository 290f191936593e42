//! Classify a stack of sections over flat ground, or over SRTM tiles.
//!
//! Run with: cargo run --example flat_world -- [ground elevation | /path/to/hgt/files]

use std::env;
use std::path::PathBuf;

use terraclean::settings::ElevationSettings;
use terraclean::{ElevationClassifierBuilder, Error, Section, WorldSettings};

fn main() -> Result<(), Error> {
    let mut settings = WorldSettings::default();
    if let Some(arg) = env::args().nth(1) {
        settings.elevation = match arg.parse::<f64>() {
            Ok(elevation) => ElevationSettings::Flat { elevation },
            Err(_) => ElevationSettings::Srtm {
                data_dir: PathBuf::from(arg),
                cache_size: 10,
                void_elevation: Some(0.0),
            },
        };
    }

    let classifier = ElevationClassifierBuilder::new()
        .deep_below(256)
        .high_above(256)
        .build(&settings)?;

    println!("{:>6} {:>16}  CLASSIFICATION", "Y", "BLOCKS");
    println!("{:-<42}", "");

    let handles: Vec<_> = (-4..=4)
        .rev()
        .map(|y| (y, classifier.classify(Section::new(0, y, 0))))
        .collect();
    for (y, handle) in handles {
        let blocks = Section::new(0, y, 0).range_y();
        println!("{:>6} {:>16}  {}", y, blocks.to_string(), handle.wait()?);
    }

    let stats = classifier.cache_stats();
    println!();
    println!(
        "Columns sampled: {} ({} requests served from cache)",
        stats.entry_count, stats.hit_count
    );

    classifier.terminate();
    Ok(())
}
