#![no_main]

use bro_awk::chunker::ChunkedLineSource;
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // First byte picks the block size, the rest is the stream
    let block_size = data[0] as usize + 1;
    let input = &data[1..];

    let mut lines: Vec<&[u8]> = Vec::new();
    let chunks: Vec<_> = ChunkedLineSource::new(Cursor::new(input.to_vec()), block_size)
        .map(|chunk| chunk.expect("in-memory reads cannot fail"))
        .collect();
    for chunk in &chunks {
        lines.extend(chunk.lines());
    }

    let expected: Vec<&[u8]> = if input.is_empty() {
        Vec::new()
    } else {
        input
            .strip_suffix(b"\n")
            .unwrap_or(input)
            .split(|b| *b == b'\n')
            .collect()
    };
    assert_eq!(lines, expected);
});
