use encoding_rs::Encoding;
use tracing::{debug, warn};

use super::error::{PipelineError, Result};

/// Default candidates for text sources: strict UTF-8, then Windows-1252
pub const DEFAULT_LABELS: &[&str] = &["utf-8", "windows-1252"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub encoding_name: &'static str,
    /// True when no candidate decoded cleanly and replacement chars were inserted
    pub lossy: bool,
}

/// Resolve encoding labels (`utf-8`, `windows-1252`, `latin1`, ...) in order
pub fn resolve_candidates<S: AsRef<str>>(labels: &[S]) -> Result<Vec<&'static Encoding>> {
    if labels.is_empty() {
        return Err(PipelineError::ConfigError(
            "at least one candidate encoding is required".to_string(),
        ));
    }

    labels
        .iter()
        .map(|label| {
            let label = label.as_ref();
            Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
                PipelineError::ConfigError(format!("unknown encoding label: {}", label))
            })
        })
        .collect()
}

/// Decode bytes with the first candidate that produces no malformed sequences.
///
/// A UTF-8 BOM is stripped. When every candidate fails, the last one is used
/// lossily.
pub fn decode(bytes: &[u8], candidates: &[&'static Encoding]) -> Result<Decoded> {
    let last = candidates.last().copied().ok_or_else(|| {
        PipelineError::ConfigError("at least one candidate encoding is required".to_string())
    })?;

    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    for encoding in candidates {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            debug!("Decoded {} bytes as {}", bytes.len(), encoding.name());
            return Ok(Decoded {
                text: text.into_owned(),
                encoding_name: encoding.name(),
                lossy: false,
            });
        }
    }

    warn!(
        "No candidate encoding decoded cleanly, falling back to lossy {}",
        last.name()
    );
    let (text, _) = last.decode_without_bom_handling(bytes);

    Ok(Decoded {
        text: text.into_owned(),
        encoding_name: last.name(),
        lossy: true,
    })
}

pub fn decode_with_labels<S: AsRef<str>>(bytes: &[u8], labels: &[S]) -> Result<Decoded> {
    let candidates = resolve_candidates(labels)?;
    decode(bytes, &candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_8, WINDOWS_1252};

    #[test]
    fn test_utf8_wins_when_valid() {
        let decoded = decode("Café ERMHDR".as_bytes(), &[UTF_8, WINDOWS_1252]).unwrap();
        assert_eq!(decoded.text, "Café ERMHDR");
        assert_eq!(decoded.encoding_name, "UTF-8");
        assert!(!decoded.lossy);
    }

    #[test]
    fn test_falls_back_to_windows_1252() {
        // "Café" in windows-1252
        let bytes = b"Caf\xE9";
        let decoded = decode(bytes, &[UTF_8, WINDOWS_1252]).unwrap();
        assert_eq!(decoded.text, "Café");
        assert_eq!(decoded.encoding_name, "windows-1252");
    }

    #[test]
    fn test_strips_bom() {
        let decoded = decode(b"\xEF\xBB\xBFERMHDR", &[UTF_8]).unwrap();
        assert_eq!(decoded.text, "ERMHDR");
    }

    #[test]
    fn test_lossy_when_nothing_clean() {
        let decoded = decode(b"Caf\xE9", &[UTF_8]).unwrap();
        assert!(decoded.lossy);
        assert!(decoded.text.starts_with("Caf"));
        assert!(decoded.text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_resolve_labels() {
        let candidates = resolve_candidates(&["utf-8", "latin1"]).unwrap();
        assert_eq!(candidates.len(), 2);
        // latin1 is an alias of windows-1252 in the WHATWG registry
        assert_eq!(candidates[1], WINDOWS_1252);

        assert!(matches!(
            resolve_candidates(&["klingon"]),
            Err(PipelineError::ConfigError(_))
        ));
        assert!(resolve_candidates::<&str>(&[]).is_err());
    }

    #[test]
    fn test_decode_with_labels_keeps_order() {
        let bytes = "ü".as_bytes();

        let decoded = decode_with_labels(bytes, &["utf-8", "windows-1252"]).unwrap();
        assert_eq!(decoded.text, "ü");
        assert_eq!(decoded.encoding_name, "UTF-8");

        // windows-1252 first accepts the same bytes as two characters
        let decoded = decode_with_labels(bytes, &["windows-1252", "utf-8"]).unwrap();
        assert_eq!(decoded.text, "Ã¼");
        assert_eq!(decoded.encoding_name, "windows-1252");
    }
}
