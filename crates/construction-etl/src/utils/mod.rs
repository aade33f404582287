pub mod encoding;
pub mod error;
pub mod logger;
pub mod token_estimator;

pub use error::{PipelineError, Result};
pub use token_estimator::estimate_tokens;
