use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use terraclean::{format_size, scan_sections};

pub fn run(world: PathBuf) -> Result<()> {
    let dir = super::region_dir(&world)?;
    let scan = scan_sections(&dir).context("Failed to read region folder")?;

    if scan.sections.is_empty() {
        println!("No .3dr files found in: {}", dir.display());
    } else {
        println!("{:<28} {:>24} {:>12}", "REGION", "SECTION", "SIZE");
        println!("{}", "-".repeat(66));
    }

    let mut total_size: u64 = 0;
    for (path, section) in &scan.sections {
        let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        total_size += size;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!(
            "{:<28} {:>24} {:>12}",
            filename,
            format!("({}, {}, {})", section.x(), section.y(), section.z()),
            format_size(size)
        );
    }

    if !scan.skipped.is_empty() {
        println!();
        println!("Skipped (not named x.y.z.3dr):");
        for path in &scan.skipped {
            println!("  {}", path.display());
        }
    }

    // Summary
    println!();
    println!("Summary:");
    println!("  Regions: {}", scan.sections.len());
    if !scan.skipped.is_empty() {
        println!("  Skipped: {}", scan.skipped.len());
    }
    println!("  Total size: {}", format_size(total_size));
    println!("  Region folder: {}", dir.display());

    Ok(())
}
