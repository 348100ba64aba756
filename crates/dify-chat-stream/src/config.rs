use std::time::Duration;

use crate::errors::ClientError;

const DEFAULT_BASE_URL: &str = "https://api.dify.ai";

/// Configuration for `ChatClient` and its HTTP transport.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the Dify-compatible API.
    ///
    /// Useful for self-hosted deployments or local test servers.
    pub base_url: String,
    /// Optional API key sent as a bearer token.
    pub api_key: Option<String>,
    /// Optional overall request timeout. Streams are long-lived, so this is
    /// unset by default.
    pub timeout: Option<Duration>,
    /// Timeout for establishing the connection.
    pub connect_timeout: Duration,
    /// Bounded buffer size of the delivery channel.
    pub channel_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: None,
            connect_timeout: Duration::from_secs(10),
            channel_capacity: 1,
        }
    }
}

impl ClientConfig {
    /// Creates a config pointing at `base_url` with default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Builds a config from `DIFY_API_BASE_URL`, `DIFY_API_KEY` and
    /// `DIFY_STREAM_TIMEOUT_SECS`. All are optional.
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = Self::default();
        if let Some(base_url) = non_empty_env("DIFY_API_BASE_URL") {
            config.base_url = base_url;
        }
        config.api_key = non_empty_env("DIFY_API_KEY");
        if let Some(raw) = non_empty_env("DIFY_STREAM_TIMEOUT_SECS") {
            let secs = raw.parse::<u64>().map_err(|e| {
                ClientError::Config(format!("invalid DIFY_STREAM_TIMEOUT_SECS {raw:?}: {e}"))
            })?;
            config.timeout = Some(Duration::from_secs(secs));
        }
        config.validate()?;
        Ok(config)
    }

    /// Sets the API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets an overall request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Overrides the delivery channel capacity.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Checks the config for values the client cannot work with.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::Config("base_url must not be empty".into()));
        }
        if self.channel_capacity == 0 {
            return Err(ClientError::Config(
                "channel_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
