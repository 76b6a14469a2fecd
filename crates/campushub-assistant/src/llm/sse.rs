//! Server-sent-event line assembly
//!
//! Network chunks can split anywhere, including inside a multi-byte UTF-8
//! character, so bytes are buffered raw and only complete lines are
//! converted to text.

/// Accumulates raw bytes and yields complete lines
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Append a chunk and return every line completed by it, trimmed,
    /// without the newline.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            lines.push(to_line(&line));
        }
        lines
    }

    /// Whatever is left when the stream ends without a trailing newline
    pub fn finish(self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let line = to_line(&self.buf);
        if line.is_empty() {
            None
        } else {
            Some(line)
        }
    }
}

fn to_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}
