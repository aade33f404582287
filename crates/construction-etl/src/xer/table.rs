use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use super::dates;
use crate::utils::error::{PipelineError, Result};

/// A closed XER table. Every row has exactly `fields.len()` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XerTable {
    name: String,
    fields: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl XerTable {
    /// Build a table, padding or truncating rows to the field count.
    pub(crate) fn from_parts(name: String, fields: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = fields.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Self { name, fields, rows }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |values| Record {
            table: self,
            values,
        })
    }

    /// Values of one column in row order
    pub fn column<'a>(&'a self, field: &str) -> Option<impl Iterator<Item = &'a str> + 'a> {
        let idx = self.column_index(field)?;
        Some(self.rows.iter().map(move |row| row[idx].as_str()))
    }
}

/// Borrowed view of one row, keyed by field name
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    table: &'a XerTable,
    values: &'a [String],
}

impl<'a> Record<'a> {
    pub fn values(&self) -> &'a [String] {
        self.values
    }

    /// Raw value; `None` only when the table has no such field
    pub fn get(&self, field: &str) -> Option<&'a str> {
        let idx = self.table.column_index(field)?;
        self.values.get(idx).map(String::as_str)
    }

    pub fn get_non_empty(&self, field: &str) -> Option<&'a str> {
        self.get(field)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn get_f64(&self, field: &str) -> Result<Option<f64>> {
        self.get_non_empty(field)
            .map(|v| v.parse::<f64>().map_err(|_| invalid(field, v)))
            .transpose()
    }

    pub fn get_i64(&self, field: &str) -> Result<Option<i64>> {
        self.get_non_empty(field)
            .map(|v| v.parse::<i64>().map_err(|_| invalid(field, v)))
            .transpose()
    }

    pub fn get_datetime(&self, field: &str) -> Result<Option<NaiveDateTime>> {
        self.get_non_empty(field)
            .map(|v| dates::parse_datetime(v).ok_or_else(|| invalid(field, v)))
            .transpose()
    }

    pub fn to_map(&self) -> BTreeMap<&'a str, &'a str> {
        self.table
            .fields
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
            .collect()
    }
}

fn invalid(field: &str, value: &str) -> PipelineError {
    PipelineError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

/// Parsed XER export: verbatim header plus tables keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XerFile {
    pub header: Option<String>,
    pub tables: BTreeMap<String, XerTable>,
}

impl XerFile {
    pub fn table(&self, name: &str) -> Option<&XerTable> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Header split on tabs, for display. The stored header is untouched.
    pub fn header_fields(&self) -> Vec<&str> {
        self.header
            .as_deref()
            .map(|h| h.split('\t').collect())
            .unwrap_or_default()
    }
}
