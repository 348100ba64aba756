use std::pin::Pin;

use futures::TryStreamExt as _;
use reqwest::header::{ACCEPT, HeaderName, HeaderValue};
use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::request::RequestSpec;

/// Open, byte-readable response body.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = std::io::Result<bytes::Bytes>> + Send + 'static>>;

/// Sends a request and hands back the response body as a byte stream.
///
/// Implementations make a single attempt. Anything that happens before a body
/// is available (connect failure, rejected request) is a `ClientError`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, spec: RequestSpec) -> Result<ByteStream, ClientError>;
}

/// `reqwest`-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Creates a transport from validated configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let mut builder = reqwest::Client::builder().connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn open(&self, spec: RequestSpec) -> Result<ByteStream, ClientError> {
        let url = self.config.url(&spec.path);
        debug!(method = %spec.method, url = %url, "opening stream");

        let mut http_req = self
            .client
            .request(spec.method, &url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .json(&spec.body);
        if let Some(api_key) = self.config.api_key.as_deref() {
            http_req = http_req.bearer_auth(api_key);
        }
        for (name, value) in &spec.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ClientError::Validation(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ClientError::Validation(format!("invalid header value for {name}: {e}")))?;
            http_req = http_req.header(name, value);
        }

        let response = http_req
            .send()
            .await
            .map_err(|e| ClientError::transport(format!("request to {url} failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ClientError::status(
                status.as_u16(),
                format!("request to {url} failed with status {status}: {body}"),
            ));
        }

        Ok(Box::pin(response.bytes_stream().map_err(std::io::Error::other)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_invalid_config() {
        let result = HttpTransport::new(ClientConfig::default().channel_capacity(0));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn invalid_header_is_rejected_before_sending() {
        let transport = HttpTransport::new(ClientConfig::new("http://127.0.0.1:9")).expect("transport");
        let spec = RequestSpec::chat_messages(crate::ChatMessageRequest::new("q", "u"))
            .header("bad header", "v");
        let result = transport.open(spec).await;
        assert!(matches!(result, Err(ClientError::Validation(msg)) if msg.contains("header name")));
    }
}
