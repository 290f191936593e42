use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use terraclean::{
    format_size, scan_sections, Classification, CleanupReport, ElevationClassifierBuilder,
    WorldSettings,
};

pub struct Options {
    pub world: PathBuf,
    pub surface_above: i64,
    pub surface_below: i64,
    pub threads: Option<usize>,
    pub sampling_step: i64,
    pub world_settings: Option<PathBuf>,
    pub report_file: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub fn run(options: Options) -> Result<()> {
    let region_dir = super::region_dir(&options.world)?;

    let settings = match &options.world_settings {
        Some(path) => WorldSettings::from_file(path)
            .with_context(|| format!("Failed to read world settings: {}", path.display()))?,
        None => WorldSettings::default(),
    };

    let mut builder = ElevationClassifierBuilder::new()
        .sampling_step(options.sampling_step)
        .high_above(options.surface_above)
        .deep_below(options.surface_below);
    if let Some(threads) = options.threads {
        builder = builder.workers(threads);
    }
    let classifier = builder
        .build(&settings)
        .context("Failed to start classifier")?;

    let scan = scan_sections(&region_dir).context("Failed to read region folder")?;
    if !scan.skipped.is_empty() {
        tracing::info!(skipped = scan.skipped.len(), "Ignored files not named x.y.z.3dr");
    }
    let total = scan.sections.len() as u64;
    tracing::info!(regions = total, folder = %region_dir.display(), "Classifying regions");

    let report = Arc::new(CleanupReport::new());
    for (path, section) in scan.sections {
        let report = report.clone();
        classifier.classify_then(section, move |class| report.add_path(&path, class));
    }

    let pb = if options.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(total)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )?
            .progress_chars("#>-"),
    );

    loop {
        let remaining = classifier.queue_size() as u64;
        pb.set_position(total.saturating_sub(remaining));
        pb.set_message(format!("{} columns", classifier.cache_count()));
        tracing::debug!(remaining, "{}", breakdown(&report));
        if remaining == 0 {
            break;
        }
        thread::sleep(Duration::from_millis(100));
    }
    pb.finish_with_message(format!("{} columns", classifier.cache_count()));

    let stats = classifier.cache_stats();
    tracing::info!(
        columns = stats.entry_count,
        hit_rate = stats.hit_rate(),
        "Classification done"
    );
    classifier.terminate();

    match &options.report_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create report file: {}", path.display()))?;
            write_report(&report, options.json, BufWriter::new(file))?;
            tracing::info!(file = %path.display(), "Report written");
        }
        None => write_report(&report, options.json, std::io::stdout().lock())?,
    }

    Ok(())
}

/// Count and size so far of every non-empty classification.
fn breakdown(report: &CleanupReport) -> String {
    let parts: Vec<String> = Classification::ALL
        .iter()
        .filter(|&&class| report.count(class) > 0)
        .map(|&class| {
            format!(
                "{}: {} ({})",
                class,
                report.count(class),
                format_size(report.size(class))
            )
        })
        .collect();
    if parts.is_empty() {
        "nothing classified yet".to_string()
    } else {
        parts.join(", ")
    }
}

fn write_report<W: Write>(report: &CleanupReport, json: bool, mut out: W) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut out, &report.summary())?;
        writeln!(out)?;
        out.flush()?;
    } else {
        report.write_to(&mut out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakdown() {
        let report = CleanupReport::new();
        assert_eq!(breakdown(&report), "nothing classified yet");

        report.add("0.9.0.3dr", 2048, Classification::SkyHigh);
        report.add("0.0.0.3dr", 100, Classification::Surface);
        report.add("1.0.0.3dr", 20, Classification::Surface);
        assert_eq!(
            breakdown(&report),
            "SURFACE: 2 (120 B), SKY_HIGH: 1 (2.00 KiB)"
        );
    }
}
