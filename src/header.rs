//! Discovery of the `#fields` header at the top of a Bro/Zeek log.

use anyhow::{Context, Result};
use std::io::BufRead;

use crate::fields::FIELD_SEPARATOR;
use crate::processor::COMMENT_PREFIX;

/// Prefix of the header line that names the columns
pub const FIELDS_MARKER: &str = "#fields";

/// Read header lines until the `#fields` line and return its field names.
///
/// Consumes only header lines, so the reader is left at the first line after
/// `#fields`. Returns `Ok(None)` if the stream ends, or a data line shows up,
/// before any `#fields` line. Empty names are kept so later names stay on
/// their columns.
pub fn read_field_names<R: BufRead>(reader: &mut R) -> Result<Option<Vec<String>>> {
    let mut line = Vec::new();
    loop {
        if !next_is_comment(reader)? {
            return Ok(None);
        }

        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .context("failed to read log header")?;
        if read == 0 {
            return Ok(None);
        }

        if let Some(names) = field_names(trim_line_end(&line)) {
            return Ok(Some(names));
        }
    }
}

/// Names listed on a `#fields` line, or `None` for any other line
fn field_names(line: &[u8]) -> Option<Vec<String>> {
    let rest = line.strip_prefix(FIELDS_MARKER.as_bytes())?;
    if rest.is_empty() {
        return Some(Vec::new());
    }
    let rest = rest.strip_prefix(&[FIELD_SEPARATOR])?;
    Some(
        rest.split(|byte| *byte == FIELD_SEPARATOR)
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .collect(),
    )
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|byte| !matches!(*byte, b'\n' | b'\r'))
        .map_or(0, |last| last + 1);
    &line[..end]
}

/// Peek at the next byte without consuming it
fn next_is_comment<R: BufRead>(reader: &mut R) -> Result<bool> {
    let buffered = reader.fill_buf().context("failed to read log header")?;
    Ok(buffered.first() == Some(&COMMENT_PREFIX))
}
