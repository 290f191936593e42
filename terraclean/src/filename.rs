//! 3D region filename utilities.
//!
//! This module converts between [`Section`] positions and CubicChunks region
//! file names, and lists the region files found in a world folder.
//!
//! # Filename Format
//!
//! 3D region files follow the naming convention: `{x}.{y}.{z}.3dr`
//!
//! - Each coordinate is a signed decimal integer (e.g., `11139`, `-1`)
//! - The extension is always `3dr`

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::position::Section;

/// Extension of 3D region files.
pub const REGION_3D_EXTENSION: &str = "3dr";

/// Name of the folder holding 3D regions inside a world directory.
pub const REGION_3D_FOLDER: &str = "region3d";

/// Convert a section position to its region filename.
///
/// # Examples
///
/// ```
/// use terraclean::{filename::section_to_filename, Section};
///
/// assert_eq!(section_to_filename(Section::new(3270, -1, 1772)), "3270.-1.1772.3dr");
/// ```
pub fn section_to_filename(section: Section) -> String {
    format!(
        "{}.{}.{}.{}",
        section.x(),
        section.y(),
        section.z(),
        REGION_3D_EXTENSION
    )
}

/// Parse a region filename into the section it stores.
///
/// # Arguments
///
/// * `filename` - The filename, with or without a leading path
///
/// # Errors
///
/// Returns [`Error::InvalidFilename`] unless the name is exactly three
/// dot-separated integers followed by `.3dr`.
///
/// # Examples
///
/// ```
/// use terraclean::{filename::parse_section_filename, Section};
///
/// assert_eq!(parse_section_filename("1.-2.3.3dr")?, Section::new(1, -2, 3));
/// assert!(parse_section_filename("r.1.2.mca").is_err());
/// # Ok::<(), terraclean::Error>(())
/// ```
pub fn parse_section_filename(filename: &str) -> Result<Section> {
    // Extract just the filename if a path is given
    let name = filename
        .rsplit('/')
        .next()
        .unwrap_or(filename)
        .rsplit('\\')
        .next()
        .unwrap_or(filename);

    let invalid = || Error::InvalidFilename {
        name: name.to_string(),
    };

    let stem = name
        .strip_suffix(REGION_3D_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))
        .ok_or_else(invalid)?;

    let parts: Vec<&str> = stem.split('.').collect();
    if parts.len() != 3 || !parts.iter().all(|p| is_signed_integer(p)) {
        return Err(invalid());
    }

    let x = parts[0].parse().map_err(|_| invalid())?;
    let y = parts[1].parse().map_err(|_| invalid())?;
    let z = parts[2].parse().map_err(|_| invalid())?;
    Ok(Section::new(x, y, z))
}

/// Check whether a filename follows the 3D region naming convention.
pub fn is_section_filename(filename: &str) -> bool {
    parse_section_filename(filename).is_ok()
}

/// Only an optional minus sign followed by ASCII digits; `str::parse` would
/// also accept a leading `+`.
fn is_signed_integer(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Region files found in a folder.
#[derive(Debug, Default)]
pub struct SectionScan {
    /// Files whose name parsed to a section, sorted by path.
    pub sections: Vec<(PathBuf, Section)>,
    /// Files that were skipped because their name did not parse, sorted.
    pub skipped: Vec<PathBuf>,
}

/// List the 3D region files of a folder.
///
/// Sub-directories are ignored. Files with a name that does not parse are
/// reported in [`SectionScan::skipped`] rather than failing the scan.
///
/// # Errors
///
/// Returns an error if the folder cannot be read.
pub fn scan_sections<P: AsRef<Path>>(dir: P) -> Result<SectionScan> {
    let mut scan = SectionScan::default();

    for entry in fs::read_dir(dir.as_ref())? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let name = entry.file_name();
        match parse_section_filename(&name.to_string_lossy()) {
            Ok(section) => scan.sections.push((path, section)),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Skipping file");
                scan.skipped.push(path);
            }
        }
    }

    scan.sections.sort_by(|a, b| a.0.cmp(&b.0));
    scan.skipped.sort();
    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_section_to_filename() {
        assert_eq!(section_to_filename(Section::new(0, 0, 0)), "0.0.0.3dr");
        assert_eq!(
            section_to_filename(Section::new(11139, -50, -19726)),
            "11139.-50.-19726.3dr"
        );
    }

    #[test]
    fn test_parse_filename() {
        assert_eq!(
            parse_section_filename("11139.0.-19726.3dr").unwrap(),
            Section::new(11139, 0, -19726)
        );
        assert_eq!(
            parse_section_filename("-1.-1.-1.3dr").unwrap(),
            Section::new(-1, -1, -1)
        );
    }

    #[test]
    fn test_parse_filename_with_path() {
        assert_eq!(
            parse_section_filename("/world/region3d/1.2.3.3dr").unwrap(),
            Section::new(1, 2, 3)
        );
        assert_eq!(
            parse_section_filename("C:\\world\\region3d\\1.2.3.3dr").unwrap(),
            Section::new(1, 2, 3)
        );
    }

    #[test]
    fn test_parse_filename_invalid() {
        assert!(parse_section_filename("invalid").is_err());
        assert!(parse_section_filename("1.2.3d").is_err());
        assert!(parse_section_filename("1.2.3dr").is_err()); // Two coordinates
        assert!(parse_section_filename("1.2.3.4.3dr").is_err()); // Four coordinates
        assert!(parse_section_filename("1.2.3.2dr").is_err()); // 2D region
        assert!(parse_section_filename("1.a.3.3dr").is_err()); // Non-numeric
        assert!(parse_section_filename("+1.2.3.3dr").is_err()); // Explicit plus
        assert!(parse_section_filename("1..3.3dr").is_err()); // Empty coordinate
        assert!(parse_section_filename("1.2.3.3dr.bak").is_err());
        assert!(parse_section_filename("99999999999.0.0.3dr").is_err()); // Overflow
    }

    #[test]
    fn test_roundtrip() {
        for section in [
            Section::new(0, 0, 0),
            Section::new(-5, 12, 3),
            Section::new(i32::MIN, i32::MAX, -1),
        ] {
            let name = section_to_filename(section);
            assert!(is_section_filename(&name));
            assert_eq!(parse_section_filename(&name).unwrap(), section);
        }
    }

    #[test]
    fn test_scan_sections() {
        let temp_dir = TempDir::new().unwrap();
        File::create(temp_dir.path().join("1.0.1.3dr")).unwrap();
        File::create(temp_dir.path().join("0.-1.0.3dr")).unwrap();
        File::create(temp_dir.path().join("0.0.2dr")).unwrap();
        File::create(temp_dir.path().join("notes.txt")).unwrap();
        fs::create_dir(temp_dir.path().join("2.2.2.3dr.d")).unwrap();

        let scan = scan_sections(temp_dir.path()).unwrap();

        let sections: Vec<Section> = scan.sections.iter().map(|(_, s)| *s).collect();
        assert_eq!(sections, vec![Section::new(0, -1, 0), Section::new(1, 0, 1)]);
        assert_eq!(scan.skipped.len(), 2);
    }

    #[test]
    fn test_scan_missing_folder() {
        let temp_dir = TempDir::new().unwrap();
        assert!(scan_sections(temp_dir.path().join("missing")).is_err());
    }
}
