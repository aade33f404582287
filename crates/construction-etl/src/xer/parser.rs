use std::collections::BTreeMap;
use std::fs;
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, warn};

use super::table::{XerFile, XerTable};
use crate::utils::encoding;
use crate::utils::error::{PipelineError, Result};

pub const HEADER_TAG: &str = "ERMHDR";
pub const TABLE_TAG: &str = "%T";
pub const FIELDS_TAG: &str = "%F";
pub const ROW_TAG: &str = "%R";
pub const END_TAG: &str = "%E";

/// Line classification by leading tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Header,
    TableStart,
    FieldList,
    DataRow,
    TableEnd,
    Ignored,
}

impl LineKind {
    pub fn classify(tag: &str) -> Self {
        match tag {
            HEADER_TAG => LineKind::Header,
            TABLE_TAG => LineKind::TableStart,
            FIELDS_TAG => LineKind::FieldList,
            ROW_TAG => LineKind::DataRow,
            END_TAG => LineKind::TableEnd,
            _ => LineKind::Ignored,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub lines: usize,
    pub ignored_lines: usize,
    /// Closed without a field list or without rows
    pub incomplete_tables: usize,
    /// Earlier tables replaced by a later one with the same name
    pub duplicate_tables: usize,
}

/// Table under construction
#[derive(Debug)]
struct OpenTable {
    name: String,
    fields: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
}

impl OpenTable {
    fn new(name: String) -> Self {
        Self {
            name,
            fields: None,
            rows: Vec::new(),
        }
    }
}

/// Lenient streaming parser for XER exports.
///
/// Never fails on malformed content: short rows are padded, long rows are
/// truncated, unknown lines are skipped.
#[derive(Debug, Default)]
pub struct XerParser {
    header: Option<String>,
    saw_content: bool,
    current: Option<OpenTable>,
    tables: BTreeMap<String, XerTable>,
    stats: ParseStats,
}

impl XerParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed_line(&mut self, raw: &str) {
        self.stats.lines += 1;

        let line = raw.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            self.stats.ignored_lines += 1;
            return;
        }

        let first_content_line = !self.saw_content;
        self.saw_content = true;

        let (tag, rest) = match line.split_once('\t') {
            Some((tag, rest)) => (tag, Some(rest)),
            None => (line, None),
        };

        match LineKind::classify(tag.trim()) {
            LineKind::Header if first_content_line => {
                self.header = Some(line.to_string());
            }
            LineKind::TableStart => {
                self.close_table();
                let name = rest
                    .and_then(|r| r.split('\t').next())
                    .map(str::trim)
                    .unwrap_or_default();
                if name.is_empty() {
                    warn!("Table-start line without a table name; ignoring its rows");
                    self.stats.ignored_lines += 1;
                } else {
                    self.current = Some(OpenTable::new(name.to_string()));
                }
            }
            LineKind::FieldList => match self.current.as_mut() {
                Some(table) if table.fields.is_none() => {
                    table.fields = Some(split_values(rest));
                }
                Some(table) => {
                    debug!("Repeated field list for table {} ignored", table.name);
                    self.stats.ignored_lines += 1;
                }
                None => self.stats.ignored_lines += 1,
            },
            LineKind::DataRow => match self.current.as_mut() {
                Some(table) => table.rows.push(split_values(rest)),
                None => self.stats.ignored_lines += 1,
            },
            LineKind::TableEnd => self.close_table(),
            LineKind::Header | LineKind::Ignored => self.stats.ignored_lines += 1,
        }
    }

    fn close_table(&mut self) {
        let Some(open) = self.current.take() else {
            return;
        };

        let fields = open.fields.unwrap_or_default();
        if fields.is_empty() || open.rows.is_empty() {
            debug!(
                "Dropping incomplete table {} ({} fields, {} rows)",
                open.name,
                fields.len(),
                open.rows.len()
            );
            self.stats.incomplete_tables += 1;
            return;
        }

        let table = XerTable::from_parts(open.name, fields, open.rows);
        if self.tables.contains_key(table.name()) {
            // Known ambiguity: last table with a given name wins
            warn!("Duplicate table {} overwrites earlier definition", table.name());
            self.stats.duplicate_tables += 1;
        }
        self.tables.insert(table.name().to_string(), table);
    }

    pub fn finish(mut self) -> (XerFile, ParseStats) {
        self.close_table();

        debug!(
            "Parsed {} tables from {} lines ({} ignored, {} incomplete, {} duplicate)",
            self.tables.len(),
            self.stats.lines,
            self.stats.ignored_lines,
            self.stats.incomplete_tables,
            self.stats.duplicate_tables
        );

        let file = XerFile {
            header: self.header,
            tables: self.tables,
        };
        (file, self.stats)
    }
}

fn split_values(rest: Option<&str>) -> Vec<String> {
    rest.map(|r| r.split('\t').map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn parse_with_stats<I, S>(lines: I) -> (XerFile, ParseStats)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = XerParser::new();
    for line in lines {
        parser.feed_line(line.as_ref());
    }
    parser.finish()
}

pub fn parse<I, S>(lines: I) -> XerFile
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parse_with_stats(lines).0
}

pub fn parse_str(content: &str) -> XerFile {
    parse(content.lines())
}

/// Parse from a line source; only I/O errors propagate
pub fn parse_reader<R: BufRead>(reader: R) -> Result<XerFile> {
    let mut parser = XerParser::new();
    for line in reader.lines() {
        parser.feed_line(&line?);
    }
    Ok(parser.finish().0)
}

/// Read and decode a file through the encoding chain, then parse
pub fn parse_file<S: AsRef<str>>(path: &Path, encodings: &[S]) -> Result<XerFile> {
    if !path.is_file() {
        return Err(PipelineError::FileNotFound(path.display().to_string()));
    }

    let bytes = fs::read(path)?;
    let decoded = encoding::decode_with_labels(&bytes, encodings)?;
    if decoded.lossy {
        warn!("{:?} decoded lossily as {}", path, decoded.encoding_name);
    }
    debug!("Loaded {:?} ({} bytes, {})", path, bytes.len(), decoded.encoding_name);

    Ok(parse_str(&decoded.text))
}
