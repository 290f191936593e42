use anyhow::Result;
use terraclean::classifier::{DEFAULT_DEEP_BELOW, DEFAULT_HIGH_ABOVE, DEFAULT_SAMPLING_STEP};
use terraclean::filename::{REGION_3D_EXTENSION, REGION_3D_FOLDER};
use terraclean::settings::DEFAULT_TILE_CACHE_SIZE;
use terraclean::{Classification, Column, EquirectangularProjection, Section};

pub fn run() -> Result<()> {
    let threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    println!("terraclean {}", env!("CARGO_PKG_VERSION"));
    println!("{}", env!("CARGO_PKG_DESCRIPTION"));
    println!();
    println!("Regions:");
    println!("  Folder: {}", REGION_3D_FOLDER);
    println!("  File names: x.y.z.{}", REGION_3D_EXTENSION);
    println!("  Section size: {} blocks", Section::SIZE);
    println!("  Column size: {} blocks", Column::SIZE);
    println!();
    println!("Defaults:");
    println!("  Surface above: {} blocks", DEFAULT_HIGH_ABOVE);
    println!("  Surface below: {} blocks", DEFAULT_DEEP_BELOW);
    println!("  Sampling step: {} blocks", DEFAULT_SAMPLING_STEP);
    println!("  Threads: {}", threads);
    println!(
        "  Projection: equirectangular, {} blocks per degree",
        EquirectangularProjection::DEFAULT_BLOCKS_PER_DEGREE
    );
    println!("  Elevation: flat, sea level");
    println!("  SRTM tile cache: {} tiles", DEFAULT_TILE_CACHE_SIZE);
    println!();
    println!("Classifications:");
    for class in Classification::ALL {
        println!("  {}", class);
    }

    Ok(())
}
