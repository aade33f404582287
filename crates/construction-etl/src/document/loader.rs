use std::fs;
use std::path::Path;
use tracing::debug;

use super::extractor::{extractor_for, PageExtractor};
use super::page::Page;
use crate::config::ExtractionConfig;
use crate::utils::error::{PipelineError, Result};

pub struct DocumentLoader;

impl DocumentLoader {
    /// Detect MIME type from path
    pub fn detect_file_type(path: &Path) -> String {
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        let file_type = mime.essence_str().to_string();

        debug!("Detected file type: {} for {:?}", file_type, path);

        file_type
    }

    /// Check if file is supported for page extraction
    pub fn is_supported(path: &Path) -> bool {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match extension.as_deref() {
            // Fixed layout
            Some("pdf") => true,

            // Office
            Some("docx") | Some("pptx") => true,
            Some("xlsx") | Some("xlsm") | Some("xls") | Some("ods") => true,

            // Plain text
            Some("txt") | Some("text") | Some("md") | Some("csv") | Some("log") => true,

            _ => false,
        }
    }

    /// Validate file before processing
    pub fn validate_file(path: &Path, max_size_mb: u64) -> Result<()> {
        if !path.is_file() {
            return Err(PipelineError::FileNotFound(path.display().to_string()));
        }

        if !Self::is_supported(path) {
            let described = match mime_guess::from_path(path).first() {
                Some(m) => format!("{} ({})", path.display(), m),
                None => path.display().to_string(),
            };
            return Err(PipelineError::UnsupportedFileType(described));
        }

        let metadata = fs::metadata(path)?;
        let size_mb = metadata.len() / 1024 / 1024;

        if size_mb > max_size_mb {
            return Err(PipelineError::FileTooLarge(size_mb, max_size_mb));
        }

        Ok(())
    }

    /// Validate, then extract pages with the extractor for this file type
    pub fn load_pages(path: &Path, config: &ExtractionConfig) -> Result<Vec<Page>> {
        Self::validate_file(path, config.max_file_size_mb)?;

        let extractor = extractor_for(path, config)?;
        Self::extract_validated(path, extractor.as_ref())
    }

    /// Validate, then extract pages with the given extractor
    pub fn load_pages_with(
        path: &Path,
        extractor: &dyn PageExtractor,
        config: &ExtractionConfig,
    ) -> Result<Vec<Page>> {
        Self::validate_file(path, config.max_file_size_mb)?;
        Self::extract_validated(path, extractor)
    }

    fn extract_validated(path: &Path, extractor: &dyn PageExtractor) -> Result<Vec<Page>> {
        let pages = extractor.extract(path)?;

        debug!(
            "Loaded {:?} ({}): {} pages",
            path,
            Self::detect_file_type(path),
            pages.len()
        );

        Ok(pages)
    }
}
