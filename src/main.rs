use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use pdfrag::config::CONFIG_FILE;
use pdfrag::{
    FastEmbedGenerator, IngestProgress, IngestStats, PdfExtractor, Settings, ingest, logging,
};

#[derive(Parser)]
#[command(name = "pdfrag")]
#[command(about = "Ingest PDF documents into a local vector index for semantic retrieval")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Load, chunk, embed, and index all PDFs under the data directory
    Ingest {
        /// Directory scanned for PDFs (overrides config)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Directory the index is written to (overrides config)
        #[arg(long)]
        index: Option<PathBuf>,

        /// Disable progress bars
        #[arg(long)]
        no_progress: bool,
    },

    /// Show effective configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    let mut settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        eprintln!("Using default configuration.");
        Settings::default()
    });

    logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { force } => {
            if let Err(e) = run_init(force) {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        }

        Commands::Ingest {
            data,
            index,
            no_progress,
        } => {
            if let Some(data) = data {
                settings.data_path = data;
            }
            if let Some(index) = index {
                settings.index_path = index;
            }

            match run_ingest(&settings, !no_progress) {
                Ok(stats) => {
                    println!(
                        "Indexed {} files ({} pages) into {} chunks",
                        stats.files, stats.pages, stats.chunks
                    );
                    println!("Index written to {}", settings.index_path.display());
                }
                Err(e) => {
                    eprintln!("Ingestion failed: {e:#}");
                    std::process::exit(1);
                }
            }
        }

        Commands::Config => match toml::to_string_pretty(&settings) {
            Ok(rendered) => print!("{rendered}"),
            Err(e) => {
                eprintln!("Error: failed to render configuration: {e}");
                std::process::exit(1);
            }
        },
    }
}

fn run_init(force: bool) -> anyhow::Result<()> {
    if Path::new(CONFIG_FILE).exists() && !force {
        anyhow::bail!("{CONFIG_FILE} already exists (use --force to overwrite)");
    }

    Settings::default()
        .save(CONFIG_FILE)
        .map_err(|e| anyhow::anyhow!("failed to write {CONFIG_FILE}: {e}"))?;

    println!("Created {CONFIG_FILE}");
    Ok(())
}

fn run_ingest(settings: &Settings, show_progress: bool) -> anyhow::Result<IngestStats> {
    let generator = FastEmbedGenerator::from_name(&settings.embedding.model)
        .with_context(|| format!("failed to load embedding model {}", settings.embedding.model))?;
    let extractor = PdfExtractor::new();

    let mut extract_bar: Option<ProgressBar> = None;
    let mut embed_bar: Option<ProgressBar> = None;

    let stats = ingest(settings, &extractor, &generator, |progress| {
        if !show_progress {
            return;
        }

        match progress {
            IngestProgress::ExtractingFile {
                current,
                total,
                path,
            } => {
                let bar = extract_bar.get_or_insert_with(|| {
                    let bar = ProgressBar::new(total as u64);
                    bar.set_message("extracting");
                    bar
                });
                bar.set_position(current as u64);
                bar.println(format!("  {}", path.display()));
            }
            IngestProgress::GeneratingEmbeddings { current, total } => {
                if let Some(bar) = extract_bar.take() {
                    bar.finish_and_clear();
                }
                let bar = embed_bar.get_or_insert_with(|| {
                    let bar = ProgressBar::new(total as u64);
                    bar.set_message("embedding");
                    bar
                });
                bar.set_position(current as u64);
            }
        }
    })
    .context("pipeline failed")?;

    if let Some(bar) = extract_bar.take() {
        bar.finish_and_clear();
    }
    if let Some(bar) = embed_bar.take() {
        bar.finish_and_clear();
    }

    Ok(stats)
}
