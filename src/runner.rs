//! Pipeline execution module
//!
//! Each log is handled by its own pipeline: a reader thread cuts the stream
//! into chunks, the dispatcher runs up to `threads` row-processing tasks on
//! them, and a sink thread writes results as they complete. Logs are
//! processed one after another.

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::{BufReader, Read, Write};
use std::thread;
use std::time::Instant;

use crate::chunker::{Chunk, ChunkedLineSource};
use crate::config::BroAwkConfig;
use crate::decompression::LogSource;
use crate::dispatcher::{panic_message, Dispatcher};
use crate::fields::{FieldIndex, Projection};
use crate::filters::FilterSet;
use crate::header;
use crate::platform::SignalHandler;
use crate::processor::{ChunkOutput, RowProcessor};
use crate::stats::ProcessingStats;

/// Results buffered per parser thread between the workers and the sink
const RESULTS_PER_THREAD: usize = 4;

/// Filter every configured log in order, writing passing rows to `output`
pub fn run_files<W: Write + Send>(
    config: &BroAwkConfig,
    filters: &FilterSet,
    output: &mut W,
) -> Result<ProcessingStats> {
    let start = Instant::now();
    let mut stats = ProcessingStats::new();

    config.debug(&format!(
        "{} parser threads, {} byte blocks, chunk queue of {}",
        config.effective_threads(),
        config.performance.block_size,
        config.performance.queue_size
    ));
    if let Some(decompressor) = &config.input.decompressor {
        config.info(&format!("decompressing with {}", decompressor.describe()));
    }

    for path in &config.input.files {
        if SignalHandler::should_terminate() {
            break;
        }
        let file_stats = process_file(config, filters, path, output)?;
        config.info(&format!(
            "{}: {} lines read, {} output",
            path, file_stats.lines_read, file_stats.lines_output
        ));
        stats.merge(&file_stats);
        stats.files_processed += 1;
    }

    stats.processing_time = start.elapsed();
    Ok(stats)
}

/// Run the full pipeline for one log
pub fn process_file<W: Write + Send>(
    config: &BroAwkConfig,
    filters: &FilterSet,
    path: &str,
    output: &mut W,
) -> Result<ProcessingStats> {
    let source = LogSource::open(path, config.input.decompressor.as_ref())?;
    let mut reader = BufReader::new(source);

    let names = header::read_field_names(&mut reader)
        .with_context(|| format!("cannot read header of {}", path))?
        .ok_or_else(|| anyhow!("no #fields header found in {}", path))?;
    let index = FieldIndex::from_header(names);
    config.info(&format!("{}: {} fields", path, index.len()));

    let processor = build_processor(config, filters, &index)
        .with_context(|| format!("cannot filter {}", path))?;

    let chunks = ChunkedLineSource::new(reader, config.performance.block_size);
    run_pipeline(config, chunks, &processor, output)
        .with_context(|| format!("error while processing {}", path))
}

fn build_processor(
    config: &BroAwkConfig,
    filters: &FilterSet,
    index: &FieldIndex,
) -> Result<RowProcessor> {
    let compiled = filters.compile(index, config.filter.value_match)?;
    for (filter, bound) in filters.filters().iter().zip(compiled.filters()) {
        config.debug(&format!(
            "rule {} reads columns {:?}",
            filter.rule(),
            bound.columns()
        ));
    }

    let projection = config
        .output
        .print_fields
        .as_ref()
        .map(|fields| Projection::resolve(fields.as_slice(), index))
        .transpose()?;
    if let Some(projection) = &projection {
        config.debug(&format!("printing columns {:?}", projection.columns()));
    }

    Ok(RowProcessor::new(compiled, projection))
}

/// Wire reader, dispatcher and sink together and run them to completion.
///
/// A reader failure takes precedence over a sink failure, which takes
/// precedence over a row-processing failure; the later ones are usually
/// caused by the pipeline shutting down after the first.
pub fn run_pipeline<R, W>(
    config: &BroAwkConfig,
    chunks: ChunkedLineSource<R>,
    processor: &RowProcessor,
    output: &mut W,
) -> Result<ProcessingStats>
where
    R: Read + Send,
    W: Write + Send,
{
    let threads = config.effective_threads();
    let (chunk_sender, chunk_receiver) = bounded::<Chunk>(config.performance.queue_size.max(1));
    let (result_sender, result_receiver) = bounded::<ChunkOutput>(threads * RESULTS_PER_THREAD);
    let dispatcher = Dispatcher::new(threads);

    thread::scope(|scope| -> Result<ProcessingStats> {
        let reader = scope.spawn(move || reader_thread(chunks, chunk_sender));
        let sink = scope.spawn(move || sink_thread(result_receiver, output));

        let dispatched = dispatcher.run(chunk_receiver, move |chunk: Chunk| {
            result_sender
                .send(processor.process(&chunk))
                .map_err(|_| anyhow!("output sink stopped"))
        });

        let read_result = reader.join().unwrap_or_else(|payload| {
            Err(anyhow!(
                "reader thread panicked: {}",
                panic_message(payload.as_ref())
            ))
        });
        let sink_result = sink.join().unwrap_or_else(|payload| {
            Err(anyhow!(
                "output thread panicked: {}",
                panic_message(payload.as_ref())
            ))
        });

        read_result?;
        let stats = sink_result?;
        let chunks_run = dispatched?;
        config.debug(&format!("{} chunks dispatched", chunks_run));
        Ok(stats)
    })
}

/// Reader thread: pushes chunks until the stream ends or the pipeline stops
fn reader_thread<R: Read>(chunks: ChunkedLineSource<R>, chunk_sender: Sender<Chunk>) -> Result<()> {
    for chunk in chunks {
        let chunk = chunk.context("failed to read log data")?;
        if SignalHandler::should_terminate() {
            break;
        }
        // Receiver gone means processing already stopped
        if chunk_sender.send(chunk).is_err() {
            break;
        }
    }
    Ok(())
}

/// Sink thread: writes results in completion order and sums their stats
fn sink_thread<W: Write>(results: Receiver<ChunkOutput>, output: &mut W) -> Result<ProcessingStats> {
    let mut stats = ProcessingStats::new();
    for result in results.iter() {
        output
            .write_all(&result.output)
            .context("failed to write output")?;
        stats.merge(&result.stats);
    }
    output.flush().context("failed to flush output")?;
    Ok(stats)
}
