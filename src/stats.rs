use std::time::Duration;

/// Counters collected while filtering. Each row-processing task fills its own
/// copy and the output sink merges them, so no counter is shared between threads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingStats {
    pub lines_read: usize,
    pub lines_output: usize,
    pub lines_filtered: usize,
    /// Comment and blank lines
    pub lines_skipped: usize,
    /// Rows too short to hold a filtered or projected column
    pub lines_malformed: usize,
    pub chunks_processed: usize,
    pub files_processed: usize,
    pub processing_time: Duration,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold another set of counters into this one. Elapsed time is not summed.
    pub fn merge(&mut self, other: &ProcessingStats) {
        self.lines_read += other.lines_read;
        self.lines_output += other.lines_output;
        self.lines_filtered += other.lines_filtered;
        self.lines_skipped += other.lines_skipped;
        self.lines_malformed += other.lines_malformed;
        self.chunks_processed += other.chunks_processed;
        self.files_processed += other.files_processed;
    }

    pub fn format_stats(&self) -> String {
        let mut output = format!(
            "Lines processed: {} total, {} output, {} filtered",
            self.lines_read, self.lines_output, self.lines_filtered
        );

        if self.lines_skipped > 0 {
            output.push_str(&format!(", {} skipped", self.lines_skipped));
        }

        if self.lines_malformed > 0 {
            output.push_str(&format!(", {} malformed", self.lines_malformed));
        }

        if self.files_processed > 0 {
            output.push_str(&format!(
                ", {} files, {} chunks",
                self.files_processed, self.chunks_processed
            ));
        }

        let processing_time_ms = self.processing_time.as_millis();
        output.push_str(&format!(" in {}ms", processing_time_ms));

        if processing_time_ms > 0 && self.lines_read > 0 {
            let lines_per_sec = (self.lines_read as f64 * 1000.0) / processing_time_ms as f64;
            output.push_str(&format!(" ({:.0} lines/s)", lines_per_sec));
        }

        output
    }
}
