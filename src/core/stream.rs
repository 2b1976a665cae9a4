//! Streaming hashline formatter: a pure state machine that can format a
//! file's hashlines incrementally as bytes arrive, without ever holding the
//! whole file in memory as anything but the (small) trailing partial line.
//!
//! Feeding the whole input in one [`HashlineStream::feed`] call followed by
//! [`HashlineStream::finish`] produces byte-identical output, concatenated,
//! to [`crate::core::hashline::format_hashlines`] on the same input.

use crate::core::tag::format_display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashlineStreamOptions {
    pub start_line: usize,
    pub max_chunk_lines: usize,
    pub max_chunk_bytes: usize,
}

impl Default for HashlineStreamOptions {
    fn default() -> Self {
        HashlineStreamOptions {
            start_line: 1,
            max_chunk_lines: 200,
            max_chunk_bytes: 65_536,
        }
    }
}

/// Incremental hashline formatter. Call [`feed`](Self::feed) as bytes
/// arrive, then [`finish`](Self::finish) exactly once at EOF.
pub struct HashlineStream {
    options: HashlineStreamOptions,
    next_line: usize,
    partial: String,
    pending: String,
    pending_lines: usize,
    finished: bool,
}

impl HashlineStream {
    pub fn new(options: HashlineStreamOptions) -> Self {
        let next_line = options.start_line;
        HashlineStream {
            options,
            next_line,
            partial: String::new(),
            pending: String::new(),
            pending_lines: 0,
            finished: false,
        }
    }

    /// Feed a chunk of raw file text. Returns zero or more ready-to-emit
    /// formatted chunks; anything not yet flushed stays buffered until the
    /// next call or [`finish`](Self::finish).
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        assert!(!self.finished, "feed() called after finish()");
        self.partial.push_str(chunk);
        let mut pieces: Vec<String> = self.partial.split('\n').map(|s| s.to_string()).collect();
        // The last element is never known to be complete until either a
        // further '\n' arrives or finish() is called.
        let tail = pieces.pop().unwrap_or_default();

        let mut ready = Vec::new();
        for line in pieces {
            self.push_line(&line, &mut ready);
        }
        self.partial = tail;
        ready
    }

    /// Flush the trailing partial line (formatted even if empty, matching
    /// non-streaming semantics for a trailing newline) and all buffered
    /// output. No further calls are valid after this.
    pub fn finish(mut self) -> Vec<String> {
        let mut ready = Vec::new();
        let last = std::mem::take(&mut self.partial);
        self.push_line(&last, &mut ready);
        if !self.pending.is_empty() {
            ready.push(std::mem::take(&mut self.pending));
        }
        self.finished = true;
        ready
    }

    fn push_line(&mut self, line: &str, ready: &mut Vec<String>) {
        let formatted = format_display(self.next_line, line);
        self.next_line += 1;
        self.pending.push_str(&formatted);
        self.pending.push('\n');
        self.pending_lines += 1;

        if self.pending_lines >= self.options.max_chunk_lines
            || self.pending.len() >= self.options.max_chunk_bytes
        {
            ready.push(std::mem::take(&mut self.pending));
            self.pending_lines = 0;
        }
    }
}
