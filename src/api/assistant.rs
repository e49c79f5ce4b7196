//! Payloads for the hosted assistant "threads and runs" API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ThreadMessage {
    pub role: String,
    pub content: String,
}

impl ThreadMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateThreadRequest {
    pub messages: Vec<ThreadMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunRequest {
    pub assistant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Statuses after which polling stops.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Cancelled
                | RunStatus::Failed
                | RunStatus::Completed
                | RunStatus::Incomplete
                | RunStatus::Expired
                | RunStatus::RequiresAction
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextValue {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextValue },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

impl Message {
    /// Text of the first content block, if it is a text block.
    pub fn first_text(&self) -> Option<&str> {
        match self.content.first()? {
            MessageContent::Text { text } => Some(text.value.as_str()),
            MessageContent::Other => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageList {
    pub data: Vec<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeltaTextValue {
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeltaContent {
    Text {
        #[serde(default)]
        text: Option<DeltaTextValue>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageDeltaBody {
    #[serde(default)]
    pub content: Vec<DeltaContent>,
}

/// Payload of a `thread.message.delta` event.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageDelta {
    pub delta: MessageDeltaBody,
}

impl MessageDelta {
    /// Concatenated text carried by this delta.
    pub fn text(&self) -> String {
        self.delta
            .content
            .iter()
            .filter_map(|part| match part {
                DeltaContent::Text { text: Some(text) } => text.value.as_deref(),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_delta_collects_text_parts() {
        let raw = r#"{"id":"msg_1","object":"thread.message.delta","delta":{"content":[
            {"index":0,"type":"text","text":{"value":"Once "}},
            {"index":1,"type":"image_file","image_file":{"file_id":"f"}},
            {"index":2,"type":"text","text":{"value":"upon"}}
        ]}}"#;
        let delta: MessageDelta = serde_json::from_str(raw).expect("delta");
        assert_eq!(delta.text(), "Once upon");
    }

    #[test]
    fn completed_message_exposes_first_text() {
        let raw = r#"{"id":"msg_1","role":"assistant","content":[{"type":"text","text":{"value":"The end.","annotations":[]}}]}"#;
        let message: Message = serde_json::from_str(raw).expect("message");
        assert_eq!(message.first_text(), Some("The end."));
    }

    #[test]
    fn unknown_run_status_is_tolerated() {
        let run: Run =
            serde_json::from_str(r#"{"id":"run_1","status":"paused_for_tea"}"#).expect("run");
        assert_eq!(run.status, RunStatus::Unknown);
        assert!(!run.status.is_terminal());
    }

    #[test]
    fn run_request_omits_stream_flag_when_polling() {
        let request = RunRequest {
            assistant_id: "asst_1".into(),
            model: Some("gpt-4o-mini".into()),
            stream: false,
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert!(value.get("stream").is_none());
        assert_eq!(value["model"], "gpt-4o-mini");
    }
}
