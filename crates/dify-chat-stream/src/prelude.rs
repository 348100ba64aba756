//! Common imports for typical client usage.
pub use crate::{
    AbortHandle, AbortSignal, ChatClient, ChatMessageRequest, ChatStream, ClientConfig,
    ClientError, StreamEvent, StreamFailure, StreamResult,
};
