//! Stream Aggregator
//!
//! Turns the remote answer stream into a single [`AggregationResult`].
//!
//! # Record Format
//!
//! ```text
//! data: {"event":"message","answer":"Hel"}\n
//! data: {"event":"message","answer":"lo"}\n
//! event: ping\n
//! data: {"error":"rate limited"}\n
//! ```
//!
//! Only lines starting with `data: ` are records; everything else is ignored.
//! A record with an `error` field ends the answer: the error text replaces
//! whatever was accumulated and later records are ignored.
//!
//! # Framing
//!
//! Chunks arrive with no alignment to line boundaries. Bytes are buffered
//! across chunks and only complete lines are decoded, so a record (or a
//! multi-byte UTF-8 sequence) split between two chunks is reassembled rather
//! than dropped. An unterminated final line is processed when the stream ends.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Marker that introduces a record line
pub const DATA_PREFIX: &str = "data: ";

/// Minimum buffer capacity
const MIN_BUFFER_CAPACITY: usize = 4096;

/// Final outcome of an aggregated answer stream
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AggregationResult {
    /// Concatenated answer, or the error message if `is_error`
    pub text: String,
    /// Whether an error record was observed
    pub is_error: bool,
}

/// Incremental output of the aggregator
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AggregateEvent {
    /// A non-empty answer fragment, in arrival order
    Fragment(String),
    /// An error record; aggregation is finished
    Error(String),
}

/// Shape of one record; unknown fields are ignored
#[derive(Debug, Deserialize)]
struct StreamRecord {
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    answer: Option<String>,
}

/// Buffered line framer and answer accumulator
#[derive(Debug)]
pub struct StreamAggregator {
    buffer: Vec<u8>,
    /// Position where we've consumed up to
    read_pos: usize,
    text: String,
    is_error: bool,
    records: usize,
    malformed: usize,
}

impl Default for StreamAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamAggregator {
    /// Create an empty aggregator
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MIN_BUFFER_CAPACITY),
            read_pos: 0,
            text: String::new(),
            is_error: false,
            records: 0,
            malformed: 0,
        }
    }

    /// Feed one chunk and return the events for every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<AggregateEvent> {
        // Compact buffer if we've consumed a lot
        if self.read_pos > self.buffer.len() / 2 && self.read_pos > MIN_BUFFER_CAPACITY {
            self.buffer.drain(..self.read_pos);
            self.read_pos = 0;
        }
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer[self.read_pos..].iter().position(|&b| b == b'\n') {
            let line_end = self.read_pos + newline;
            let line = String::from_utf8_lossy(&self.buffer[self.read_pos..line_end]).into_owned();
            self.read_pos = line_end + 1;

            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Signal end-of-data, processing any unterminated final line
    pub fn finish(&mut self) -> Option<AggregateEvent> {
        if self.read_pos >= self.buffer.len() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.buffer[self.read_pos..]).into_owned();
        self.buffer.clear();
        self.read_pos = 0;
        self.process_line(&line)
    }

    /// Whether an error record has been seen
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Text accumulated so far
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of records that failed to parse
    #[must_use]
    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    /// Finish and take the result
    #[must_use]
    pub fn into_result(mut self) -> AggregationResult {
        self.finish();
        debug!(
            records = self.records,
            malformed = self.malformed,
            is_error = self.is_error,
            text_len = self.text.len(),
            "Answer stream aggregated"
        );
        AggregationResult {
            text: self.text,
            is_error: self.is_error,
        }
    }

    fn process_line(&mut self, line: &str) -> Option<AggregateEvent> {
        // Once an error is recorded the answer is final; remaining lines are drained unread
        if self.is_error {
            return None;
        }

        let line = line.strip_suffix('\r').unwrap_or(line);
        let payload = line.strip_prefix(DATA_PREFIX)?;

        let record: StreamRecord = match serde_json::from_str(payload) {
            Ok(record) => record,
            Err(e) => {
                self.malformed += 1;
                warn!(error = %e, line_len = payload.len(), "Skipping malformed stream record");
                return None;
            }
        };
        self.records += 1;

        if let Some(error) = record.error.filter(|e| !e.is_null()) {
            let message = error_text(&error);
            warn!(error = %message, "Error record in answer stream");
            self.is_error = true;
            self.text.clone_from(&message);
            return Some(AggregateEvent::Error(message));
        }

        match record.answer {
            Some(fragment) if !fragment.is_empty() => {
                self.text.push_str(&fragment);
                Some(AggregateEvent::Fragment(fragment))
            }
            _ => None,
        }
    }
}

/// Text of an `error` field: strings as-is, objects by their `message`
fn error_text(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string),
        other => other.to_string(),
    }
}
