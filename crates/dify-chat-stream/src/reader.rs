use bytes::{Bytes, BytesMut};
use futures::StreamExt as _;

use crate::transport::ByteStream;

/// Splits a response body into `\n`-terminated lines.
///
/// Owns the connection: dropping the reader closes it. Lines are produced
/// lazily and each call consumes exactly one; chunk boundaries may fall
/// anywhere, including inside a line or a UTF-8 sequence.
pub struct LineReader {
    body: ByteStream,
    buf: BytesMut,
    exhausted: bool,
}

impl LineReader {
    pub fn new(body: ByteStream) -> Self {
        Self {
            body,
            buf: BytesMut::new(),
            exhausted: false,
        }
    }

    /// Returns the next line including its terminator.
    ///
    /// `Ok(None)` means the body ended. Bytes after the last terminator are
    /// discarded at that point since they cannot form a complete frame.
    pub async fn next_line(&mut self) -> std::io::Result<Option<Bytes>> {
        loop {
            if let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
                return Ok(Some(self.buf.split_to(pos + 1).freeze()));
            }
            if self.exhausted {
                return Ok(None);
            }
            match self.body.next().await {
                Some(Ok(chunk)) => self.buf.extend_from_slice(&chunk),
                Some(Err(err)) => {
                    self.exhausted = true;
                    return Err(err);
                }
                None => {
                    self.exhausted = true;
                    if !self.buf.is_empty() {
                        tracing::debug!(
                            bytes = self.buf.len(),
                            "discarding unterminated trailing line"
                        );
                        self.buf.clear();
                    }
                }
            }
        }
    }
}
