use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::utils::error::{PipelineError, Result};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub xer: XerConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter directive, overridden by RUST_LOG when set
    pub level: String,
    pub format: LogFormat,
    /// Directory for the daily-rotated log file; stderr only when unset
    pub file_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,construction_etl=debug".to_string(),
            format: LogFormat::Pretty,
            file_dir: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty, // development
    Json,   // production
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Documents at or under this estimate are sent whole
    pub max_tokens: usize,
    pub target_chunk_tokens: usize,
    pub overlap_pages: usize,
    pub min_chunk_pages: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: 100_000,
            target_chunk_tokens: 50_000,
            overlap_pages: 2,
            min_chunk_pages: 3,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Virtual page size for flow-text documents (docx, txt)
    pub chars_per_page: usize,
    pub max_file_size_mb: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            chars_per_page: 3_000,
            max_file_size_mb: 200,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct XerConfig {
    /// Candidate encodings, tried in order
    pub encodings: Vec<String>,
    pub output_dir: PathBuf,
    /// Export only these tables; empty means all
    pub tables: Vec<String>,
}

impl Default for XerConfig {
    fn default() -> Self {
        Self {
            encodings: vec!["utf-8".to_string(), "windows-1252".to_string()],
            output_dir: PathBuf::from("output/xer"),
            tables: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings: defaults, then config file, then APP_* env vars.
    ///
    /// Without an explicit path, `config/settings.{toml,yaml,json}` is
    /// optional. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let file_source = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name("config/settings").required(false),
        };

        let config = Config::builder()
            .add_source(file_source)
            // Example: APP_CHUNKING__TARGET_CHUNK_TOKENS=40000
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunking.target_chunk_tokens == 0 {
            return Err(PipelineError::ConfigError(
                "chunking.target_chunk_tokens must be greater than 0".to_string(),
            ));
        }

        if self.extraction.chars_per_page == 0 {
            return Err(PipelineError::ConfigError(
                "extraction.chars_per_page must be greater than 0".to_string(),
            ));
        }

        if self.xer.encodings.is_empty() {
            return Err(PipelineError::ConfigError(
                "xer.encodings must list at least one encoding".to_string(),
            ));
        }

        Ok(())
    }
}
