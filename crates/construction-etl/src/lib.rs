pub mod config;
pub mod document;
pub mod utils;
pub mod xer;

pub use config::Settings;
pub use utils::error::{PipelineError, Result};
