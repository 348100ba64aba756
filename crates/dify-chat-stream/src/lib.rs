//! Typed, cancellable event stream over Dify's streaming chat-messages API.
//!
//! `ChatClient::chat_messages_stream` opens the connection, then a background
//! task reads `data:` frames from the response body, decodes them and sends
//! them over a bounded channel. The consumer receives events in wire order;
//! at most one failure is delivered and it is always the last item before the
//! channel closes.
//!
//! ```no_run
//! use dify_chat_stream::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ChatClient::new(ClientConfig::new("http://localhost:5001").api_key("app-..."))?;
//! let (abort, signal) = AbortHandle::new();
//! let _deadline = abort.abort_after(std::time::Duration::from_secs(60));
//!
//! let mut stream = client
//!     .chat_messages_stream(ChatMessageRequest::new("Say hello", "user-1"), signal)
//!     .await?;
//! while let Some(result) = stream.recv().await {
//!     print!("{}", result?.answer);
//! }
//! # Ok(())
//! # }
//! ```

/// Cancellation handle and signal.
pub mod cancel;
/// Public client entry point and the consumer-facing stream.
pub mod client;
/// Client and transport configuration.
pub mod config;
/// Line classification and frame decoding.
pub mod decoder;
/// Error types for connection setup and in-band stream failures.
pub mod errors;
/// Decoded stream events.
pub mod event;
/// Tracing subscriber setup for applications.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Background loop that feeds the delivery channel.
pub mod pump;
/// Line splitting over the response body.
pub mod reader;
/// Chat-messages request descriptor.
pub mod request;
/// Transport contract and the `reqwest` implementation.
pub mod transport;

pub use cancel::{AbortHandle, AbortSignal};
pub use client::{ChatClient, ChatStream};
pub use config::ClientConfig;
pub use decoder::{Decoded, decode};
pub use errors::{ClientError, StreamFailure};
pub use event::{EventKind, StreamEvent, StreamResult, WorkflowData, WorkflowInputs};
pub use observability::init_observability;
pub use pump::{PumpExit, StreamPump};
pub use reader::LineReader;
pub use request::{ChatMessageRequest, FileAttachment, RequestSpec, ResponseMode};
pub use transport::{ByteStream, HttpTransport, Transport};
