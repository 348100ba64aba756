use crate::errors::StreamFailure;

/// Value delivered to the consumer: a decoded event or the terminal failure.
pub type StreamResult = Result<StreamEvent, StreamFailure>;

/// One decoded `data:` frame.
///
/// Missing fields default to their zero value and unknown fields are ignored,
/// so the same type covers every event tag the server emits.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StreamEvent {
    /// Event tag, for example `message` or `workflow_started`.
    #[serde(deserialize_with = "null_as_default")]
    pub event: String,
    #[serde(deserialize_with = "null_as_default")]
    pub conversation_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub message_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub task_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub workflow_run_id: String,
    /// Answer fragment. Empty marks the end of the stream.
    #[serde(deserialize_with = "null_as_default")]
    pub answer: String,
    /// Epoch seconds.
    #[serde(deserialize_with = "null_as_default")]
    pub created_at: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub data: WorkflowData,
}

impl StreamEvent {
    /// Classifies the event tag.
    pub fn kind(&self) -> EventKind {
        EventKind::from_tag(&self.event)
    }
}

/// Workflow payload nested under `data`.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WorkflowData {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub workflow_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sequence_number: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub inputs: WorkflowInputs,
    #[serde(deserialize_with = "null_as_default")]
    pub created_at: i64,
}

/// System inputs echoed back by workflow events.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WorkflowInputs {
    #[serde(rename = "sys.query")]
    pub query: String,
    #[serde(rename = "sys.files")]
    pub files: Vec<serde_json::Value>,
    #[serde(rename = "sys.conversation_id")]
    pub conversation_id: String,
    #[serde(rename = "sys.user_id")]
    pub user_id: String,
    #[serde(rename = "sys.dialogue_count")]
    pub dialogue_count: i64,
    #[serde(rename = "sys.app_id")]
    pub app_id: String,
    #[serde(rename = "sys.workflow_id")]
    pub workflow_id: String,
    #[serde(rename = "sys.workflow_run_id")]
    pub workflow_run_id: String,
}

/// An explicit `null` leaves the zero value in place.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + serde::Deserialize<'de>,
{
    use serde::Deserialize as _;
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Known event tags. Tags are open-ended; anything else is `Other`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    Message,
    AgentMessage,
    WorkflowStarted,
    MessageEnd,
    Error,
    Other(String),
}

impl EventKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "message" => Self::Message,
            "agent_message" => Self::AgentMessage,
            "workflow_started" => Self::WorkflowStarted,
            "message_end" => Self::MessageEnd,
            "error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }
}
