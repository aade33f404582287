pub mod settings;

pub use settings::{ChunkingConfig, ExtractionConfig, LogFormat, LoggingConfig, Settings, XerConfig};
