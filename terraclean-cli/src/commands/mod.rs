pub mod classify;
pub mod info;
pub mod list;

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use terraclean::filename::REGION_3D_FOLDER;

/// The region3d folder of a world directory.
pub fn region_dir(world: &Path) -> Result<PathBuf> {
    let dir = world.join(REGION_3D_FOLDER);
    if !dir.is_dir() {
        bail!("Not a CubicChunks world, missing folder: {}", dir.display());
    }
    Ok(dir)
}
