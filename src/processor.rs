//! Row processing for one chunk of log lines.
//!
//! A [`RowProcessor`] is built once per file, after the header is known, and
//! shared by reference between all row-processing tasks for that file. Each
//! call to [`RowProcessor::process`] owns its chunk and returns the chunk's
//! output bytes together with its own counters.

use crate::chunker::Chunk;
use crate::fields::{Projection, Record};
use crate::filters::CompiledFilterSet;
use crate::stats::ProcessingStats;

/// Lines starting with this byte are header or footer metadata
pub const COMMENT_PREFIX: u8 = b'#';

/// Output of one row-processing task
#[derive(Debug, Default)]
pub struct ChunkOutput {
    /// Newline-terminated passing rows, in chunk order
    pub output: Vec<u8>,
    pub stats: ProcessingStats,
}

#[derive(Debug)]
pub struct RowProcessor {
    filters: CompiledFilterSet,
    projection: Option<Projection>,
    min_width: usize,
}

impl RowProcessor {
    pub fn new(filters: CompiledFilterSet, projection: Option<Projection>) -> Self {
        let projected_width = projection.as_ref().map_or(0, Projection::required_width);
        let min_width = filters.required_width().max(projected_width);
        Self {
            filters,
            projection,
            min_width,
        }
    }

    pub fn filters(&self) -> &CompiledFilterSet {
        &self.filters
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    /// Fewest columns a row needs for every referenced column to exist
    pub fn min_width(&self) -> usize {
        self.min_width
    }

    /// Filter every line of `chunk`.
    ///
    /// Blank lines and `#` lines are skipped. Rows too short for a referenced
    /// column are counted as malformed and dropped. Passing rows are written
    /// whole, or as the projected columns, each followed by `\n`. Row bytes
    /// are copied through as read.
    pub fn process(&self, chunk: &Chunk) -> ChunkOutput {
        let mut stats = ProcessingStats {
            chunks_processed: 1,
            ..Default::default()
        };
        let mut output = Vec::with_capacity(if self.projection.is_some() {
            chunk.len() / 2
        } else {
            chunk.len()
        });

        for line in chunk.lines() {
            stats.lines_read += 1;

            if line.first().map_or(true, |byte| *byte == COMMENT_PREFIX) {
                stats.lines_skipped += 1;
                continue;
            }

            let record = Record::parse(line);
            if record.width() < self.min_width {
                stats.lines_malformed += 1;
                continue;
            }

            if !self.filters.passes(&record) {
                stats.lines_filtered += 1;
                continue;
            }

            match &self.projection {
                Some(projection) => {
                    if !projection.render_into(&record, &mut output) {
                        stats.lines_malformed += 1;
                        continue;
                    }
                }
                None => output.extend_from_slice(line),
            }
            output.push(b'\n');
            stats.lines_output += 1;
        }

        ChunkOutput { output, stats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldIndex;
    use crate::filters::{FilterSet, ValueMatch};

    const HEADER: [&str; 4] = ["ts", "id.orig_h", "id.resp_h", "proto"];

    fn processor(rules: &[&str], print_fields: Option<&[&str]>) -> RowProcessor {
        processor_with(rules, print_fields, ValueMatch::All)
    }

    fn processor_with(
        rules: &[&str],
        print_fields: Option<&[&str]>,
        value_match: ValueMatch,
    ) -> RowProcessor {
        let index = FieldIndex::from_header(HEADER);
        let filters = FilterSet::parse(rules)
            .unwrap()
            .compile(&index, value_match)
            .unwrap();
        let projection = print_fields.map(|fields| Projection::resolve(fields, &index).unwrap());
        RowProcessor::new(filters, projection)
    }

    fn run(processor: &RowProcessor, text: &str) -> (String, ProcessingStats) {
        let out = processor.process(&Chunk::new(text.as_bytes().to_vec()));
        (String::from_utf8(out.output).unwrap(), out.stats)
    }

    #[test]
    fn test_equals_keeps_matching_rows() {
        let p = processor(&["proto=tcp"], None);
        let (out, stats) = run(
            &p,
            "1.0\t10.0.0.1\t10.0.0.2\ttcp\n2.0\t10.0.0.3\t10.0.0.4\tudp",
        );
        assert_eq!(out, "1.0\t10.0.0.1\t10.0.0.2\ttcp\n");
        assert_eq!(stats.lines_read, 2);
        assert_eq!(stats.lines_output, 1);
        assert_eq!(stats.lines_filtered, 1);
        assert_eq!(stats.chunks_processed, 1);
    }

    #[test]
    fn test_not_equals_keeps_other_rows() {
        let p = processor(&["proto!=tcp"], None);
        let (out, _) = run(
            &p,
            "1.0\t10.0.0.1\t10.0.0.2\ttcp\n2.0\t10.0.0.3\t10.0.0.4\tudp",
        );
        assert_eq!(out, "2.0\t10.0.0.3\t10.0.0.4\tudp\n");
    }

    #[test]
    fn test_all_filters_must_pass() {
        let p = processor(&["proto=tcp", "id.resp_h~^10\\.0\\.0\\.2$"], None);
        let (out, _) = run(
            &p,
            "1\ta\t10.0.0.2\ttcp\n2\tb\t10.0.0.9\ttcp\n3\tc\t10.0.0.2\tudp",
        );
        assert_eq!(out, "1\ta\t10.0.0.2\ttcp\n");
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let p = processor(&["proto=tcp"], None);
        let (out, stats) = run(&p, "#close\t2024\n\n1\ta\tb\ttcp\n#");
        assert_eq!(out, "1\ta\tb\ttcp\n");
        assert_eq!(stats.lines_skipped, 3);
        assert_eq!(stats.lines_output, 1);
    }

    #[test]
    fn test_empty_chunk_is_one_blank_line() {
        let p = processor(&["proto=tcp"], None);
        let (out, stats) = run(&p, "");
        assert!(out.is_empty());
        assert_eq!(stats.lines_read, 1);
        assert_eq!(stats.lines_skipped, 1);
    }

    #[test]
    fn test_short_rows_are_malformed() {
        let p = processor(&["proto=tcp"], None);
        let (out, stats) = run(&p, "1\ta\n2\tb\tc\ttcp");
        assert_eq!(out, "2\tb\tc\ttcp\n");
        assert_eq!(stats.lines_malformed, 1);
        assert_eq!(stats.lines_filtered, 0);
    }

    #[test]
    fn test_projection_emits_requested_columns() {
        let p = processor(&["proto=tcp"], Some(&["id.resp_h", "ts"][..]));
        let (out, _) = run(&p, "1.0\t10.0.0.1\t10.0.0.2\ttcp\n2.0\tx\ty\tudp");
        assert_eq!(out, "10.0.0.2\t1.0\n");
    }

    #[test]
    fn test_projection_width_counts_toward_malformed() {
        let p = processor(&["ts=1"], Some(&["proto"][..]));
        assert_eq!(p.min_width(), 4);
        let (out, stats) = run(&p, "1\ta\tb\n1\ta\tb\ttcp");
        assert_eq!(out, "tcp\n");
        assert_eq!(stats.lines_malformed, 1);
    }

    #[test]
    fn test_any_value_mode() {
        let p = processor_with(&["proto=tcp,udp"], None, ValueMatch::Any);
        let (out, _) = run(&p, "1\ta\tb\ttcp\n2\ta\tb\tudp\n3\ta\tb\ticmp");
        assert_eq!(out, "1\ta\tb\ttcp\n2\ta\tb\tudp\n");
    }

    #[test]
    fn test_non_utf8_row_is_copied_unchanged() {
        let p = processor(&["proto=tcp"], None);
        let out = p.process(&Chunk::new(b"1.0\t\xe9\tb\ttcp\n2.0\t\xff\tb\tudp".to_vec()));
        assert_eq!(out.output, b"1.0\t\xe9\tb\ttcp\n");
        assert_eq!(out.stats.lines_output, 1);

        let p = processor(&["proto=tcp"], Some(&["id.orig_h"][..]));
        let out = p.process(&Chunk::new(b"1.0\t\xe9\tb\ttcp".to_vec()));
        assert_eq!(out.output, b"\xe9\n");
    }

    #[test]
    fn test_trailing_empty_field_is_kept() {
        let p = processor(&["ts=1"], None);
        let (out, _) = run(&p, "1\ta\tb\t");
        assert_eq!(out, "1\ta\tb\t\n");
    }
}
