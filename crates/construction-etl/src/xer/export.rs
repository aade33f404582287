use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::table::{XerFile, XerTable};
use crate::utils::error::Result;

/// Write one table as CSV: header row of field names, then data rows
pub fn write_table<W: Write>(table: &XerTable, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(table.fields())?;
    for row in table.rows() {
        csv_writer.write_record(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Table names come from the input file; only plain names may become file names
fn is_safe_file_stem(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', ':', '\0'])
}

/// Exports parsed tables to `<out_dir>/<TABLE>.csv`
pub struct CsvExporter {
    out_dir: PathBuf,
    tables: Vec<String>,
}

impl CsvExporter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            tables: Vec::new(),
        }
    }

    /// Restrict export to these tables; empty exports everything
    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.tables = tables;
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn export(&self, file: &XerFile) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.out_dir)?;

        let selected: Vec<&XerTable> = if self.tables.is_empty() {
            file.tables.values().collect()
        } else {
            self.tables
                .iter()
                .filter_map(|name| {
                    let table = file.table(name);
                    if table.is_none() {
                        warn!("Table {} not present in export, skipping", name);
                    }
                    table
                })
                .collect()
        };

        let mut written = Vec::with_capacity(selected.len());
        for table in selected {
            if !is_safe_file_stem(table.name()) {
                warn!("Table name {:?} is not a safe file name, skipping", table.name());
                continue;
            }
            let path = self.out_dir.join(format!("{}.csv", table.name()));
            let out = fs::File::create(&path)?;
            write_table(table, std::io::BufWriter::new(out))?;
            debug!("Wrote {} rows to {:?}", table.len(), path);
            written.push(path);
        }

        info!("Exported {} tables to {:?}", written.len(), self.out_dir);
        Ok(written)
    }
}
