//! Field-name addressing for Bro/Zeek tab-separated logs.
//!
//! A [`FieldIndex`] is built once per file from its `#fields` header and then
//! shared read-only by every row-processing task for that file. Columns are
//! only reachable through a resolved [`Column`], so calling code never indexes
//! a [`Record`] by raw position.

use anyhow::{anyhow, Result};
use std::collections::HashMap;

/// Column delimiter used by Bro/Zeek logs.
pub const FIELD_SEPARATOR: u8 = b'\t';

/// A column position that was resolved through a [`FieldIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Column(usize);

impl Column {
    /// Minimum number of fields a record needs for this column to exist
    pub fn required_width(self) -> usize {
        self.0 + 1
    }
}

/// Mapping from field name to column position for one log file
#[derive(Debug, Clone, Default)]
pub struct FieldIndex {
    columns: HashMap<String, usize>,
    names: Vec<String>,
}

impl FieldIndex {
    /// Build the index from the ordered header names. When a name repeats,
    /// the right-most column wins.
    pub fn from_header<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut columns = HashMap::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            columns.insert(name.clone(), position);
        }
        Self { columns, names }
    }

    /// Resolve a field name to its column
    pub fn resolve(&self, field: &str) -> Result<Column> {
        self.columns.get(field).copied().map(Column).ok_or_else(|| {
            anyhow!(
                "unable to find index for field: {} (header has: {})",
                field,
                self.names.join(", ")
            )
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One tab-delimited data row, borrowed from the chunk it was read from.
///
/// Fields stay raw bytes; logs are not guaranteed to be valid UTF-8.
#[derive(Debug)]
pub struct Record<'a> {
    fields: Vec<&'a [u8]>,
}

impl<'a> Record<'a> {
    pub fn parse(line: &'a [u8]) -> Self {
        Self {
            fields: line.split(|byte| *byte == FIELD_SEPARATOR).collect(),
        }
    }

    /// Value of a resolved column, or `None` when the row is too short
    pub fn get(&self, column: Column) -> Option<&'a [u8]> {
        self.fields.get(column.0).copied()
    }

    pub fn width(&self) -> usize {
        self.fields.len()
    }
}

/// Ordered list of columns to print instead of the whole line
#[derive(Debug, Clone)]
pub struct Projection {
    columns: Vec<Column>,
}

impl Projection {
    /// Resolve the requested field names, keeping the requested order
    pub fn resolve<S: AsRef<str>>(fields: &[S], index: &FieldIndex) -> Result<Self> {
        let columns = fields
            .iter()
            .map(|field| index.resolve(field.as_ref()))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| e.context("cannot resolve --print-fields"))?;
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Smallest record width that holds every projected column
    pub fn required_width(&self) -> usize {
        self.columns
            .iter()
            .map(|column| column.required_width())
            .max()
            .unwrap_or(0)
    }

    /// Append the projected fields, tab-joined, to `out`.
    /// Returns false (leaving `out` untouched) if the record lacks a column.
    pub fn render_into(&self, record: &Record<'_>, out: &mut Vec<u8>) -> bool {
        let start = out.len();
        for (i, column) in self.columns.iter().enumerate() {
            let Some(value) = record.get(*column) else {
                out.truncate(start);
                return false;
            };
            if i > 0 {
                out.push(FIELD_SEPARATOR);
            }
            out.extend_from_slice(value);
        }
        true
    }
}
