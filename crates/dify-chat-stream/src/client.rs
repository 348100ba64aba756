use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tracing::debug;

use crate::cancel::AbortSignal;
use crate::config::ClientConfig;
use crate::errors::{ClientError, StreamFailure};
use crate::event::StreamResult;
use crate::pump::StreamPump;
use crate::reader::LineReader;
use crate::request::RequestSpec;
use crate::transport::{ByteStream, HttpTransport, Transport};

/// Client for the streaming chat-messages endpoint.
#[derive(Clone)]
pub struct ChatClient {
    transport: Arc<dyn Transport>,
    channel_capacity: usize,
}

impl ChatClient {
    /// Creates a client backed by `HttpTransport`.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let channel_capacity = config.channel_capacity;
        let transport = HttpTransport::new(config)?;
        Ok(Self {
            transport: Arc::new(transport),
            channel_capacity,
        })
    }

    /// Creates a client from `DIFY_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Creates a client over a caller-supplied transport.
    pub fn with_transport(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self {
            transport,
            channel_capacity: config.channel_capacity,
        })
    }

    /// Opens the streaming connection and returns the raw response body.
    ///
    /// The response mode is forced to streaming; nothing else in the request
    /// is changed.
    pub async fn chat_messages_stream_raw(
        &self,
        request: impl Into<RequestSpec>,
    ) -> Result<ByteStream, ClientError> {
        let spec: RequestSpec = request.into();
        let spec = spec.into_streaming();
        spec.body.validate()?;
        self.transport.open(spec).await
    }

    /// Opens the connection and starts delivering decoded events.
    ///
    /// Connection failures are returned here, before any background work
    /// starts. Afterwards every failure arrives in-band as the last item of
    /// the returned stream.
    pub async fn chat_messages_stream(
        &self,
        request: impl Into<RequestSpec>,
        signal: AbortSignal,
    ) -> Result<ChatStream, ClientError> {
        let body = self.chat_messages_stream_raw(request).await?;

        let stream_id = uuid::Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        debug!(stream_id = %stream_id, capacity = self.channel_capacity, "starting stream pump");
        tokio::spawn(StreamPump::new(stream_id, LineReader::new(body), tx, signal).run());

        Ok(ChatStream { stream_id, rx })
    }
}

/// Receive side of a running stream.
///
/// Yields events in wire order. At most one `Err` is ever yielded and it is
/// always the last item. Closure (`None`) without an error means the server
/// finished normally or the stream was cancelled.
pub struct ChatStream {
    stream_id: uuid::Uuid,
    rx: mpsc::Receiver<StreamResult>,
}

impl ChatStream {
    /// Identifier used in this stream's log records.
    pub fn stream_id(&self) -> uuid::Uuid {
        self.stream_id
    }

    /// Waits for the next result. Returns `None` once the stream is closed,
    /// and keeps returning `None` after that.
    pub async fn recv(&mut self) -> Option<StreamResult> {
        self.rx.recv().await
    }

    /// Drains the stream and concatenates the answer fragments.
    pub async fn collect_answer(mut self) -> Result<String, StreamFailure> {
        let mut answer = String::new();
        while let Some(result) = self.rx.recv().await {
            answer.push_str(&result?.answer);
        }
        Ok(answer)
    }
}

impl futures::Stream for ChatStream {
    type Item = StreamResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
