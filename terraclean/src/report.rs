//! Cleanup report: which region files fell into which classification.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;

use crate::decision::Classification;

/// Render a byte count with binary units.
///
/// ```
/// use terraclean::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(1536), "1.50 KiB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;
    const TIB: u64 = GIB * 1024;

    if bytes >= TIB {
        format!("{:.2} TiB", bytes as f64 / TIB as f64)
    } else if bytes >= GIB {
        format!("{:.2} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.2} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[derive(Default)]
struct Bucket {
    paths: Mutex<Vec<PathBuf>>,
    bytes: AtomicU64,
}

/// Per-classification file lists and byte totals.
///
/// Safe to fill from many threads at once.
#[derive(Default)]
pub struct CleanupReport {
    buckets: [Bucket; 7],
}

/// Totals of one classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketSummary {
    pub classification: Classification,
    pub count: usize,
    pub size: u64,
    pub paths: Vec<PathBuf>,
}

/// Serializable snapshot of a [`CleanupReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total_count: usize,
    pub total_size: u64,
    pub buckets: Vec<BucketSummary>,
}

impl CleanupReport {
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket(&self, class: Classification) -> &Bucket {
        &self.buckets[class.index()]
    }

    /// Record `path` under `class`, reading its size from the filesystem.
    ///
    /// A file whose size cannot be read is still recorded, with 0 bytes.
    pub fn add_path<P: AsRef<Path>>(&self, path: P, class: Classification) {
        let path = path.as_ref();
        let size = match std::fs::metadata(path) {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read file size");
                0
            }
        };
        self.add(path, size, class);
    }

    /// Record `path` of `size` bytes under `class`.
    pub fn add<P: Into<PathBuf>>(&self, path: P, size: u64, class: Classification) {
        let bucket = self.bucket(class);
        bucket.paths.lock().push(path.into());
        bucket.bytes.fetch_add(size, Ordering::Relaxed);
    }

    /// Number of files recorded under `class`.
    pub fn count(&self, class: Classification) -> usize {
        self.bucket(class).paths.lock().len()
    }

    /// Total bytes recorded under `class`.
    pub fn size(&self, class: Classification) -> u64 {
        self.bucket(class).bytes.load(Ordering::Relaxed)
    }

    /// Snapshot of every classification, paths sorted.
    pub fn summary(&self) -> ReportSummary {
        let buckets: Vec<BucketSummary> = Classification::ALL
            .iter()
            .map(|&class| {
                let mut paths = self.bucket(class).paths.lock().clone();
                paths.sort();
                BucketSummary {
                    classification: class,
                    count: paths.len(),
                    size: self.size(class),
                    paths,
                }
            })
            .collect();

        ReportSummary {
            total_count: buckets.iter().map(|b| b.count).sum(),
            total_size: buckets.iter().map(|b| b.size).sum(),
            buckets,
        }
    }

    /// Write the report as text, one block per classification:
    ///
    /// ```text
    /// ## SURFACE: 2 (1.50 MiB) ##
    /// world/region3d/0.0.0.3dr
    /// world/region3d/0.1.0.3dr
    ///
    /// ```
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for bucket in self.summary().buckets {
            writeln!(
                out,
                "## {}: {} ({}) ##",
                bucket.classification,
                bucket.count,
                format_size(bucket.size)
            )?;
            for path in &bucket.paths {
                writeln!(out, "{}", path.display())?;
            }
            writeln!(out)?;
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.00 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MiB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GiB");
        assert_eq!(format_size(2 * 1024 * 1024 * 1024 * 1024), "2.00 TiB");
    }

    #[test]
    fn test_add_and_count() {
        let report = CleanupReport::new();
        report.add("a.3dr", 100, Classification::Sky);
        report.add("b.3dr", 50, Classification::Sky);
        report.add("c.3dr", 7, Classification::Surface);

        assert_eq!(report.count(Classification::Sky), 2);
        assert_eq!(report.size(Classification::Sky), 150);
        assert_eq!(report.count(Classification::Surface), 1);
        assert_eq!(report.count(Classification::Failed), 0);
        assert_eq!(report.size(Classification::Failed), 0);
    }

    #[test]
    fn test_add_path_reads_size() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.0.0.3dr");
        std::fs::write(&path, [0u8; 300]).unwrap();

        let report = CleanupReport::new();
        report.add_path(&path, Classification::Underground);
        report.add_path(temp_dir.path().join("gone.3dr"), Classification::Underground);

        assert_eq!(report.count(Classification::Underground), 2);
        assert_eq!(report.size(Classification::Underground), 300);
    }

    #[test]
    fn test_concurrent_adds() {
        let report = Arc::new(CleanupReport::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let report = report.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        report.add(format!("{}-{}.3dr", t, i), 2, Classification::SkyHigh);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(report.count(Classification::SkyHigh), 800);
        assert_eq!(report.size(Classification::SkyHigh), 1600);
    }

    #[test]
    fn test_summary() {
        let report = CleanupReport::new();
        report.add("z.3dr", 10, Classification::OutOfBounds);
        report.add("a.3dr", 20, Classification::OutOfBounds);
        report.add("m.3dr", 5, Classification::UndergroundDeep);

        let summary = report.summary();
        assert_eq!(summary.total_count, 3);
        assert_eq!(summary.total_size, 35);
        assert_eq!(summary.buckets.len(), 7);

        let out_of_bounds = &summary.buckets[Classification::OutOfBounds.index()];
        assert_eq!(
            out_of_bounds.paths,
            vec![PathBuf::from("a.3dr"), PathBuf::from("z.3dr")]
        );

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["buckets"][1]["classification"], "OUT_OF_BOUNDS");
        assert_eq!(json["buckets"][1]["count"], 2);
    }

    #[test]
    fn test_write_to() {
        let report = CleanupReport::new();
        report.add("r/1.0.0.3dr", 2048, Classification::Surface);
        report.add("r/0.0.0.3dr", 1024, Classification::Surface);

        let mut out = Vec::new();
        report.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("## FAILED: 0 (0 B) ##\n\n## OUT_OF_BOUNDS: 0 (0 B) ##\n"));
        assert!(text.contains("## SURFACE: 2 (3.00 KiB) ##\nr/0.0.0.3dr\nr/1.0.0.3dr\n\n"));
        assert!(text.ends_with("## SKY_HIGH: 0 (0 B) ##\n\n"));
    }
}
