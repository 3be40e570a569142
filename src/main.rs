//! Codechunk CLI - incremental, parallel code chunker

use clap::{Parser, Subcommand};
use codechunk::config::{self, ChunkerConfig};
use codechunk::ui::{self, Icons};
use codechunk::{OutputFormat, Pipeline, RunSummary, TopLevelPolicy};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "codechunk")]
#[command(version = "0.1.0")]
#[command(about = "Incremental, parallel code chunker")]
#[command(long_about = r#"
Codechunk turns a source tree into hierarchical chunks:
  • one chunk per top-level class, with a child per method
  • imports and declared build dependencies (Maven, Bazel) attached
  • a checksum cache so unchanged files are skipped on the next run

Example usage:
  codechunk init
  codechunk run ./my-service -o ./chunks
  codechunk run ./my-service -o ./chunks -w 8 --format text
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to ./codechunk.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk every candidate file under a directory
    Run {
        /// Root directory to chunk
        root: PathBuf,

        /// Output destination
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of worker threads
        #[arg(short, long)]
        workers: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Which top-level classes become chunks (all, first)
        #[arg(long)]
        top_level: Option<TopLevelPolicy>,

        /// Reprocess files even when their output is current
        #[arg(long)]
        force: bool,

        /// Disable the live worker monitor
        #[arg(long)]
        no_monitor: bool,

        /// Do not attach git provenance metadata
        #[arg(long)]
        no_provenance: bool,
    },

    /// Write a default codechunk.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let monitor = match &cli.command {
        Commands::Run { no_monitor, .. } => !no_monitor && console::Term::stderr().is_term(),
        Commands::Init { .. } => false,
    };

    // Keep log lines out of the way of the live display
    let default_level = if cli.verbose {
        "debug"
    } else if monitor {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            config::write_config(&path, &ChunkerConfig::starter(), force)?;
            ui::success(&format!("Wrote {}", path.display()));
        }

        Commands::Run {
            root,
            output,
            workers,
            format,
            top_level,
            force,
            no_monitor: _,
            no_provenance,
        } => {
            let config = config::load_config(cli.config.as_deref())?.unwrap_or_default();

            let destination = output.or_else(|| config.output.clone()).ok_or_else(|| {
                anyhow::anyhow!("no output destination: pass --output or set `output` in codechunk.toml")
            })?;
            let format = format.or(config.format).unwrap_or_default();

            let mut options = config.pipeline_options();
            if let Some(workers) = workers {
                options.workers = workers.max(1);
            }
            if let Some(top_level) = top_level {
                options.top_level = top_level;
            }
            options.force = force;
            options.monitor = monitor;
            if no_provenance {
                options.provenance = false;
            }

            let sink = format.create_sink(&destination);

            ui::header(&format!("Chunking {}", root.display()));
            ui::info(Icons::FOLDER, "Output", &format!("{} ({})", destination.display(), sink.format_name()));
            ui::info(Icons::GEAR, "Workers", &options.workers.to_string());

            let pipeline = Pipeline::new(root, sink, options);

            let stop = pipeline.stop_flag();
            ctrlc::set_handler(move || {
                stop.store(true, Ordering::SeqCst);
            })?;

            let summary = pipeline.run()?;
            report(&summary);
        }
    }

    Ok(())
}

fn report(summary: &RunSummary) {
    ui::section("Summary");
    println!("{}", ui::summary_table(summary));
    ui::timing(&format!("Completed in {:.2?}", summary.elapsed));

    if summary.interrupted {
        ui::interrupted("Interrupted: remaining files were not dispatched");
    }

    if summary.has_errors() {
        ui::warn(&format!("{} file(s) failed", summary.errored));
        eprintln!("{}", ui::errors_table(&summary.errors));
    } else {
        ui::success("Done");
    }
}
