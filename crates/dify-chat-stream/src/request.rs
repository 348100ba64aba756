use std::collections::HashMap;

use crate::errors::ClientError;

/// Path of the chat-messages endpoint.
pub const CHAT_MESSAGES_PATH: &str = "/v1/chat-messages";

/// How the server should deliver the response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Single JSON response once the answer is complete.
    #[default]
    Blocking,
    /// Server-sent `data:` frames as the answer is produced.
    Streaming,
}

/// File attached to a chat message.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FileAttachment {
    /// File type, for example `image`.
    #[serde(rename = "type")]
    pub kind: String,
    /// `remote_url` or `local_file`.
    pub transfer_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_file_id: Option<String>,
}

impl FileAttachment {
    /// Creates an image attachment referenced by URL.
    pub fn remote_image(url: impl Into<String>) -> Self {
        Self {
            kind: "image".into(),
            transfer_method: "remote_url".into(),
            url: Some(url.into()),
            upload_file_id: None,
        }
    }
}

/// Body of a chat-messages request.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessageRequest {
    /// App-defined input variables.
    pub inputs: HashMap<String, serde_json::Value>,
    /// User message.
    pub query: String,
    pub response_mode: ResponseMode,
    /// Continues an existing conversation when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// End-user identifier, unique within the app.
    pub user: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_generate_name: Option<bool>,
}

impl ChatMessageRequest {
    /// Creates a request for `query` on behalf of `user`.
    pub fn new(query: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user: user.into(),
            ..Self::default()
        }
    }

    /// Continues the given conversation.
    pub fn conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    /// Sets one app input variable.
    pub fn input(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.inputs.insert(key.into(), value);
        self
    }

    /// Attaches a file.
    pub fn file(mut self, file: FileAttachment) -> Self {
        self.files.push(file);
        self
    }

    pub fn auto_generate_name(mut self, enabled: bool) -> Self {
        self.auto_generate_name = Some(enabled);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.query.trim().is_empty() {
            return Err(ClientError::Validation("query must not be empty".into()));
        }
        if self.user.trim().is_empty() {
            return Err(ClientError::Validation("user must not be empty".into()));
        }
        Ok(())
    }
}

/// Fully built request descriptor handed to a `Transport`.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestSpec {
    pub method: reqwest::Method,
    /// Path relative to the configured base URL.
    pub path: String,
    /// Extra headers sent with the request.
    pub headers: Vec<(String, String)>,
    pub body: ChatMessageRequest,
}

impl RequestSpec {
    /// Descriptor for `POST /v1/chat-messages`.
    pub fn chat_messages(body: ChatMessageRequest) -> Self {
        Self {
            method: reqwest::Method::POST,
            path: CHAT_MESSAGES_PATH.to_string(),
            headers: Vec::new(),
            body,
        }
    }

    /// Adds an extra header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Forces the response mode to streaming. Nothing else is touched.
    pub fn into_streaming(mut self) -> Self {
        self.body.response_mode = ResponseMode::Streaming;
        self
    }
}

impl From<ChatMessageRequest> for RequestSpec {
    fn from(body: ChatMessageRequest) -> Self {
        Self::chat_messages(body)
    }
}
