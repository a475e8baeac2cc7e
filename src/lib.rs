// Core library for the bro-awk log filter

pub mod args;
pub mod chunker;
pub mod cli;
pub mod config;
pub mod decompression;
pub mod dispatcher;
pub mod fields;
pub mod filters;
pub mod header;
pub mod platform;
pub mod processor;
pub mod runner;
pub mod stats;

pub use chunker::{Chunk, ChunkedLineSource};
pub use cli::Cli;
pub use config::BroAwkConfig;
pub use dispatcher::Dispatcher;
pub use fields::{FieldIndex, Projection, Record};
pub use filters::{Filter, FilterSet, Operator, ValueMatch};
pub use processor::RowProcessor;
pub use stats::ProcessingStats;
