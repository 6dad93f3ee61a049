//! Splits the input into bounded segments of whole lines.

use std::io::{self, BufRead};

/// One bounded unit of the split input; the unit of distribution and retry.
///
/// Immutable once created. The id is the segment's ordinal in the input.
#[derive(Debug, Clone)]
pub struct Segment {
    pub id: u64,
    pub payload: String,
}

impl Segment {
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

/// Greedily pack complete lines into segments of at most `chunk_size`
/// bytes. A single line longer than `chunk_size` becomes its own
/// oversized segment rather than being split mid-line.
pub fn split_lines<R: BufRead>(mut reader: R, chunk_size: usize) -> io::Result<Vec<Segment>> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut current = String::new();
    let mut line = String::new();

    let flush = |current: &mut String, segments: &mut Vec<Segment>| {
        if !current.is_empty() {
            segments.push(Segment {
                id: segments.len() as u64,
                payload: std::mem::take(current),
            });
        }
    };

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        if !current.is_empty() && current.len() + line.len() > chunk_size {
            flush(&mut current, &mut segments);
        }
        current.push_str(&line);
    }
    flush(&mut current, &mut segments);

    Ok(segments)
}
