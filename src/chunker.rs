//! Block-wise reader that turns a byte stream into newline-aligned chunks.
//!
//! Each read block is cut at its right-most newline. Bytes after that newline
//! are carried into the next chunk, so every emitted [`Chunk`] holds whole
//! lines only and can be filtered independently of its neighbours.

use memchr::memrchr;
use std::io::{self, Read};

/// Default size of a single read, in bytes
pub const DEFAULT_BLOCK_SIZE: usize = 8192;

/// One or more complete lines joined by `\n`, without the final terminator.
/// An empty chunk stands for a single empty line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    bytes: Vec<u8>,
}

impl Chunk {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The lines of this chunk, without terminators
    pub fn lines(&self) -> impl Iterator<Item = &[u8]> {
        self.bytes.split(|byte| *byte == b'\n')
    }
}

/// Iterator of [`Chunk`]s read from `R` in fixed-size blocks.
///
/// The reader is dropped as soon as the stream ends or fails, which releases
/// the underlying file handle or decompressor pipe.
pub struct ChunkedLineSource<R> {
    reader: Option<R>,
    block: Vec<u8>,
    carry: Vec<u8>,
}

impl<R: Read> ChunkedLineSource<R> {
    pub fn new(reader: R, block_size: usize) -> Self {
        Self {
            reader: Some(reader),
            block: vec![0; block_size.max(1)],
            carry: Vec::new(),
        }
    }

    pub fn block_size(&self) -> usize {
        self.block.len()
    }

    fn finish(&mut self) {
        self.reader = None;
    }
}

impl<R: Read> Iterator for ChunkedLineSource<R> {
    type Item = io::Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let reader = self.reader.as_mut()?;
            let read = match reader.read(&mut self.block) {
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.finish();
                    self.carry.clear();
                    return Some(Err(e));
                }
            };

            if read == 0 {
                self.finish();
                // Flush an unterminated final line
                if self.carry.is_empty() {
                    return None;
                }
                return Some(Ok(Chunk::new(std::mem::take(&mut self.carry))));
            }

            let block = &self.block[..read];
            match memrchr(b'\n', block) {
                Some(newline) => {
                    let mut bytes = std::mem::take(&mut self.carry);
                    bytes.extend_from_slice(&block[..newline]);
                    self.carry.extend_from_slice(&block[newline + 1..]);
                    return Some(Ok(Chunk::new(bytes)));
                }
                // The current line spans more than one block
                None => self.carry.extend_from_slice(block),
            }
        }
    }
}
