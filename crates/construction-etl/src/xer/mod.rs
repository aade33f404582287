//! XER schedule export parsing.
//!
//! XER is a tab-delimited text format: an `ERMHDR` header line followed by
//! repeated `%T` (table), `%F` (fields), `%R` (row) blocks, with `%E`
//! closing the stream.

pub mod dates;
pub mod export;
pub mod parser;
pub mod table;

pub use export::CsvExporter;
pub use parser::{
    parse, parse_file, parse_reader, parse_str, parse_with_stats, ParseStats, XerParser,
};
pub use table::{Record, XerFile, XerTable};
