use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

/// Find CubicChunks 3D regions far from the ground
#[derive(Parser, Debug)]
#[command(name = "terraclean")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Only print errors, no progress
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Print debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify every 3D region of a world
    Classify {
        /// World directory (regions are read from its region3d folder)
        #[arg(short, long, env = "TERRACLEAN_WORLD")]
        world: PathBuf,

        /// Height above the ground where the high sky starts, in blocks
        #[arg(long, default_value = "500")]
        surface_above: i64,

        /// Depth below the ground where deep underground starts, in blocks
        #[arg(long, default_value = "500")]
        surface_below: i64,

        /// Worker threads per pool (defaults to the number of CPUs)
        #[arg(short, long, env = "TERRACLEAN_THREADS")]
        threads: Option<usize>,

        /// Spacing between elevation samples, in blocks
        #[arg(long, default_value = "8")]
        sampling_step: i64,

        /// World settings JSON file (projection and elevation source)
        #[arg(short = 's', long)]
        world_settings: Option<PathBuf>,

        /// Write the report to this file instead of stdout
        #[arg(short, long)]
        report_file: Option<PathBuf>,

        /// Output the report as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List the 3D region files of a world
    List {
        /// World directory
        #[arg(short, long, env = "TERRACLEAN_WORLD")]
        world: PathBuf,
    },

    /// Display software information and defaults
    Info,
}

fn init_logging(quiet: bool, verbose: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            // Printing can only fail if stdout/stderr are gone
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Classify {
            world,
            surface_above,
            surface_below,
            threads,
            sampling_step,
            world_settings,
            report_file,
            json,
        } => commands::classify::run(commands::classify::Options {
            world,
            surface_above,
            surface_below,
            threads,
            sampling_step,
            world_settings,
            report_file,
            json,
            quiet: cli.quiet,
        }),
        Commands::List { world } => commands::list::run(world),
        Commands::Info => commands::info::run(),
    }
}
