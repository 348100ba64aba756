use crate::errors::StreamFailure;
use crate::event::{EventKind, StreamEvent};

const DATA_PREFIX: &[u8] = b"data:";

/// Classification of a single line from the response body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decoded {
    /// Not a `data:` line (keep-alive, comment, blank separator).
    Skip,
    /// A content frame to forward.
    Event(StreamEvent),
    /// A frame with an empty answer: the server has nothing more to send.
    EndOfStream,
}

/// Decodes one line of the stream.
///
/// Frames are self-contained, so no state is carried between lines. Malformed
/// payloads and frames tagged `error` are returned as terminal failures.
pub fn decode(line: &[u8]) -> Result<Decoded, StreamFailure> {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(Decoded::Skip);
    };
    let payload = payload.trim_ascii();

    let event: StreamEvent =
        serde_json::from_slice(payload).map_err(|e| StreamFailure::decode(&e))?;
    if event.kind() == EventKind::Error {
        return Err(StreamFailure::ErrorEvent {
            raw: String::from_utf8_lossy(payload).into_owned(),
        });
    }
    if event.answer.is_empty() {
        return Ok(Decoded::EndOfStream);
    }
    Ok(Decoded::Event(event))
}
