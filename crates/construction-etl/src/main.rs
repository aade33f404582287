use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use construction_etl::config::{ChunkingConfig, Settings};
use construction_etl::document::{DocumentChunker, DocumentLoader};
use construction_etl::utils::logger::init_logger;
use construction_etl::xer::{self, CsvExporter};

#[derive(Parser, Debug)]
#[command(name = "construction-etl", version, about = "XER parsing and document chunk planning")]
struct Cli {
    /// Settings file (toml/yaml/json); defaults to config/settings if present
    #[arg(long, global = true, env = "APP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse an XER export and write one CSV per table
    Xer {
        file: PathBuf,
        /// Output directory (overrides xer.output_dir)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Export only these tables (repeatable)
        #[arg(long = "table")]
        tables: Vec<String>,
    },
    /// Extract pages from a document and print the chunk plan as JSON
    Chunk {
        file: PathBuf,
        #[arg(long)]
        max_tokens: Option<usize>,
        #[arg(long)]
        target_tokens: Option<usize>,
        #[arg(long)]
        overlap: Option<usize>,
        #[arg(long)]
        min_pages: Option<usize>,
        /// Include each chunk's text in the output
        #[arg(long)]
        print_text: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    init_logger(&settings.logging)?;

    info!("Starting construction-etl");

    match cli.command {
        Command::Xer { file, out, tables } => {
            let parsed = xer::parse_file(&file, &settings.xer.encodings)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            info!("Parsed {} tables from {}", parsed.len(), file.display());

            let out_dir = out.unwrap_or_else(|| settings.xer.output_dir.clone());
            let tables = if tables.is_empty() {
                settings.xer.tables.clone()
            } else {
                tables
            };

            let written = CsvExporter::new(out_dir).with_tables(tables).export(&parsed)?;
            for path in written {
                println!("{}", path.display());
            }
        }
        Command::Chunk {
            file,
            max_tokens,
            target_tokens,
            overlap,
            min_pages,
            print_text,
        } => {
            let defaults = settings.chunking;
            let config = ChunkingConfig {
                max_tokens: max_tokens.unwrap_or(defaults.max_tokens),
                target_chunk_tokens: target_tokens.unwrap_or(defaults.target_chunk_tokens),
                overlap_pages: overlap.unwrap_or(defaults.overlap_pages),
                min_chunk_pages: min_pages.unwrap_or(defaults.min_chunk_pages),
            };

            let pages = DocumentLoader::load_pages(&file, &settings.extraction)
                .with_context(|| format!("Failed to extract pages from {}", file.display()))?;
            let result = DocumentChunker::new(config).compute_chunks(&pages);
            info!(
                "{}: {} pages, {} tokens, {} chunks",
                file.display(),
                result.total_pages,
                result.total_tokens,
                result.chunks.len()
            );

            let mut output = serde_json::to_value(&result)?;
            if print_text {
                let texts: Vec<String> = result.chunk_texts(&pages).map(|(_, text)| text).collect();
                output["chunk_texts"] = serde_json::to_value(texts)?;
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
