//! Incremental splitter for `text/event-stream` style bodies.
//!
//! Bytes arrive in arbitrary chunks. The decoder keeps whatever does not yet form a
//! complete record (including a partial UTF-8 sequence) and yields records as soon as
//! their blank-line terminator has been seen.

/// One record of the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// `data: <payload>` with the prefix stripped and the payload trimmed
    Data(String),
    /// `data: [DONE]`
    Done,
    /// Anything else (comments, `event:` or `id:` lines, keep-alives)
    Ignored,
}

impl Record {
    /// Classify one raw record (the text between two blank lines).
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix("data: ") {
            Some(payload) => {
                let payload = payload.trim();
                if payload == "[DONE]" {
                    Record::Done
                } else {
                    Record::Data(payload.to_string())
                }
            }
            None => Record::Ignored,
        }
    }
}

const SEPARATOR: &str = "\n\n";

/// Buffers raw body bytes and splits them into records.
#[derive(Debug, Default)]
pub struct RecordDecoder {
    /// Bytes not yet valid UTF-8 (a multi-byte char cut by the chunk boundary)
    pending_bytes: Vec<u8>,
    /// Decoded text after the last complete record
    pending_text: String,
}

impl RecordDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the records completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Record> {
        self.pending_bytes.extend_from_slice(chunk);
        self.decode_pending();

        let mut records = Vec::new();
        while let Some(idx) = self.pending_text.find(SEPARATOR) {
            let raw: String = self.pending_text.drain(..idx + SEPARATOR.len()).collect();
            let raw = &raw[..idx];
            if !raw.is_empty() {
                records.push(Record::parse(raw));
            }
        }
        records
    }

    /// Flush a trailing record that was never terminated by a blank line.
    pub fn finish(&mut self) -> Option<Record> {
        if !self.pending_bytes.is_empty() {
            let rest = String::from_utf8_lossy(&self.pending_bytes).into_owned();
            self.pending_text.push_str(&rest);
            self.pending_bytes.clear();
        }
        let raw = std::mem::take(&mut self.pending_text);
        let raw = raw.trim_end_matches('\n');
        if raw.is_empty() {
            None
        } else {
            Some(Record::parse(raw))
        }
    }

    /// Whether some input is buffered without a terminator yet.
    pub fn has_pending(&self) -> bool {
        !self.pending_bytes.is_empty() || !self.pending_text.is_empty()
    }

    fn decode_pending(&mut self) {
        while !self.pending_bytes.is_empty() {
            let (take, more) = match std::str::from_utf8(&self.pending_bytes) {
                Ok(_) => (self.pending_bytes.len(), false),
                Err(e) => match e.error_len() {
                    // Incomplete sequence at the end: keep it for the next chunk.
                    None => (e.valid_up_to(), false),
                    // Invalid bytes become U+FFFD; anything after them is decoded again.
                    Some(len) => (e.valid_up_to() + len, true),
                },
            };

            let bytes: Vec<u8> = self.pending_bytes.drain(..take).collect();
            let text = String::from_utf8_lossy(&bytes).into_owned();
            self.append_text(&text);
            if !more {
                break;
            }
        }
    }

    fn append_text(&mut self, text: &str) {
        self.pending_text.push_str(text);
        // A CR/LF pair may straddle two chunks, so normalize the whole buffer.
        if self.pending_text.contains("\r\n") {
            self.pending_text = self.pending_text.replace("\r\n", "\n");
        }
    }
}
