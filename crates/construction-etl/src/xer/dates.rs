use chrono::{NaiveDate, NaiveDateTime};

/// How a candidate format is parsed
#[derive(Debug, Clone, Copy)]
pub enum DateFormat {
    DateTime(&'static str),
    /// Date only; resolves to midnight
    Date(&'static str),
}

/// Candidate formats in the order they are tried. XER exports use the
/// first one; the rest cover hand-edited and spreadsheet round-tripped files.
pub const DATE_FORMATS: &[DateFormat] = &[
    DateFormat::DateTime("%Y-%m-%d %H:%M"),
    DateFormat::DateTime("%Y-%m-%d %H:%M:%S"),
    DateFormat::Date("%Y-%m-%d"),
    DateFormat::DateTime("%d-%b-%y %H:%M"),
    DateFormat::Date("%m/%d/%Y"),
];

impl DateFormat {
    pub fn try_parse(&self, value: &str) -> Option<NaiveDateTime> {
        match self {
            DateFormat::DateTime(fmt) => NaiveDateTime::parse_from_str(value, fmt).ok(),
            DateFormat::Date(fmt) => NaiveDate::parse_from_str(value, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        }
    }
}

/// First format in `DATE_FORMATS` that parses wins
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    parse_with(value, DATE_FORMATS)
}

pub fn parse_with(value: &str, formats: &[DateFormat]) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    formats.iter().find_map(|f| f.try_parse(value))
}
