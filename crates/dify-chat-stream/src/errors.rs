/// Errors returned synchronously by the client API, before any stream exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid request passed to the client.
    #[error("validation error: {0}")]
    Validation(String),
    /// The connection could not be opened or the server rejected the request
    /// before producing a body.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        status_code: Option<u16>,
    },
}

impl ClientError {
    /// Creates a transport error without an HTTP status.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            status_code: None,
        }
    }

    /// Creates a transport error for a non-success HTTP status.
    pub fn status(status_code: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Returns the HTTP status attached to a transport error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transport { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

/// Terminal failure delivered in-band as the last item of a stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum StreamFailure {
    /// Reading from the open connection failed, including an unexpected close.
    #[error("error reading line: {message}")]
    Io { message: String },
    /// A `data:` frame could not be parsed as a stream event.
    #[error("error unmarshalling event: {message}")]
    Decode { message: String },
    /// The server tagged a frame as `error`; `raw` holds the frame payload.
    #[error("error streaming event: {raw}")]
    ErrorEvent { raw: String },
}

impl StreamFailure {
    pub(crate) fn io(err: &std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(err: &serde_json::Error) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }
}
