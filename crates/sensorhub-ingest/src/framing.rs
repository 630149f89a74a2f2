// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Delimiter framing.
//!
//! A device writes reports back to back on one TCP stream, each one
//! terminated by a reserved delimiter byte. TCP gives no message
//! boundaries, so a single read may carry half a report, several reports,
//! or the end of one and the start of the next. [`Reassembler`] buffers the
//! stream and hands out complete records in arrival order.
//!
//! ```text
//! read 1: "A#B"   -> ["A"]          pending "B"
//! read 2: "#C#"   -> ["B", "C"]     pending ""
//! read 3: "D"     -> []             pending "D"
//! ```

use std::fmt;
use std::str::Utf8Error;
use thiserror::Error;

/// Framing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FramingError {
    #[error("Frame too large: {size} > {max} bytes without a delimiter")]
    FrameTooLarge { size: usize, max: usize },
}

/// One complete record, delimiter stripped.
///
/// Opaque bytes: decoding is up to the sink.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Record(Vec<u8>);

impl Record {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The record as UTF-8 text.
    pub fn as_str(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.0)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Record {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Record {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for Record {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record({:?})", String::from_utf8_lossy(&self.0))
    }
}

/// Stream reassembler for delimiter-terminated records.
///
/// Owns the accumulator for one connection. After every extraction the
/// accumulator holds only the unterminated tail of the stream, never a
/// complete record.
#[derive(Debug)]
pub struct Reassembler {
    delimiter: u8,
    buffer: Vec<u8>,
    /// A delimiter arrived since the last extraction
    complete: bool,
}

impl Reassembler {
    /// Create an empty reassembler splitting on `delimiter`.
    pub fn new(delimiter: u8) -> Self {
        Self::with_capacity(delimiter, 0)
    }

    /// Create an empty reassembler with a preallocated accumulator.
    pub fn with_capacity(delimiter: u8, capacity: usize) -> Self {
        Self {
            delimiter,
            buffer: Vec::with_capacity(capacity),
            complete: false,
        }
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Append a chunk to the accumulator. Empty chunks are a no-op.
    pub fn append(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        // Only the new bytes need scanning: the pending tail holds no delimiter.
        if !self.complete && chunk.contains(&self.delimiter) {
            self.complete = true;
        }
        self.buffer.extend_from_slice(chunk);
    }

    /// True if at least one record is terminated.
    ///
    /// A lone delimiter counts: it terminates an empty record.
    pub fn has_complete_record(&self) -> bool {
        self.complete
    }

    /// Take every terminated record, oldest first.
    ///
    /// If the accumulator ends on the delimiter, all of it is consumed.
    /// Otherwise the bytes after the last delimiter are the start of a
    /// record still in flight and stay buffered as-is. Consecutive
    /// delimiters yield empty records.
    pub fn extract_complete(&mut self) -> Vec<Record> {
        if !self.complete {
            return Vec::new();
        }
        self.complete = false;

        let last = match self.buffer.iter().rposition(|&b| b == self.delimiter) {
            Some(pos) => pos,
            None => return Vec::new(),
        };

        let tail = self.buffer.split_off(last + 1);
        let mut terminated = std::mem::replace(&mut self.buffer, tail);
        terminated.pop();

        terminated
            .split(|&b| b == self.delimiter)
            .map(Record::from)
            .collect()
    }

    /// The unterminated tail.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Fail if the accumulator has grown past `max` bytes.
    ///
    /// Meant to be called after extraction, when only the unterminated
    /// tail is left.
    pub fn ensure_within(&self, max: usize) -> Result<(), FramingError> {
        if self.buffer.len() > max {
            return Err(FramingError::FrameTooLarge {
                size: self.buffer.len(),
                max,
            });
        }
        Ok(())
    }
}
