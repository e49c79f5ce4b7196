use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::assistant::{
    CreateThreadRequest, Message, MessageDelta, Run, RunRequest, Thread, ThreadMessage,
};
use crate::core::api_error::format_api_error;
use crate::core::assistant::AssistantSession;
use crate::utils::auth::add_assistant_headers;
use crate::utils::url::construct_api_url;

#[derive(Clone, Debug, PartialEq)]
pub enum StreamMessage {
    /// Text fragment to append to the chapter buffer.
    Delta(String),
    /// The assistant finished its message; carries the full final text.
    MessageDone(String),
    Error(String),
    End,
}

type StreamSender = mpsc::UnboundedSender<(StreamMessage, u64)>;

/// Tracks the `event:` name that applies to the following `data:` lines.
#[derive(Default)]
struct SseState {
    event: Option<String>,
}

fn send(tx: &StreamSender, message: StreamMessage, stream_id: u64) {
    let _ = tx.send((message, stream_id));
}

fn fail(tx: &StreamSender, error: String, stream_id: u64) {
    send(tx, StreamMessage::Error(error), stream_id);
    send(tx, StreamMessage::End, stream_id);
}

fn handle_event_payload(
    event: Option<&str>,
    payload: &str,
    tx: &StreamSender,
    stream_id: u64,
) -> bool {
    if payload == "[DONE]" || event == Some("done") {
        send(tx, StreamMessage::End, stream_id);
        return true;
    }

    match event {
        Some("thread.message.delta") => {
            match serde_json::from_str::<MessageDelta>(payload) {
                Ok(delta) => {
                    let text = delta.text();
                    if !text.is_empty() {
                        send(tx, StreamMessage::Delta(text), stream_id);
                    }
                }
                Err(err) => warn!("skipping malformed message delta: {err}"),
            }
            false
        }
        Some("thread.message.completed") => {
            match serde_json::from_str::<Message>(payload) {
                Ok(message) => {
                    let text = message.first_text().unwrap_or_default().to_string();
                    send(tx, StreamMessage::MessageDone(text), stream_id);
                }
                Err(err) => warn!("skipping malformed completed message: {err}"),
            }
            false
        }
        Some("thread.run.failed") | Some("thread.run.expired") | Some("thread.run.incomplete") => {
            let reason = serde_json::from_str::<Run>(payload)
                .ok()
                .and_then(|run| run.last_error.and_then(|err| err.message))
                .unwrap_or_else(|| event.unwrap_or("run failed").to_string());
            fail(tx, format!("Generation failed: {reason}"), stream_id);
            true
        }
        Some("error") => {
            fail(tx, format_api_error(payload), stream_id);
            true
        }
        _ => false,
    }
}

fn process_sse_line(line: &str, state: &mut SseState, tx: &StreamSender, stream_id: u64) -> bool {
    if line.is_empty() {
        state.event = None;
        return false;
    }
    if let Some(event) = line.strip_prefix("event:") {
        state.event = Some(event.trim().to_string());
        return false;
    }
    match line.strip_prefix("data:").map(str::trim_start) {
        Some(payload) => handle_event_payload(state.event.as_deref(), payload, tx, stream_id),
        None => false,
    }
}

pub struct StreamParams {
    pub session: AssistantSession,
    pub assistant_id: String,
    pub content: String,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

#[derive(Clone)]
pub struct AssistantStreamService {
    tx: StreamSender,
}

async fn create_thread(
    session: &AssistantSession,
    content: String,
) -> Result<Thread, String> {
    let url = construct_api_url(&session.base_url, "threads");
    let request = CreateThreadRequest {
        messages: vec![ThreadMessage::user(content)],
    };
    let response = add_assistant_headers(session.client.post(url), &session.api_key)
        .json(&request)
        .send()
        .await
        .map_err(|e| format_api_error(&e.to_string()))?;

    if !response.status().is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(format_api_error(&error_text));
    }
    response
        .json::<Thread>()
        .await
        .map_err(|e| format_api_error(&e.to_string()))
}

async fn run_stream(params: StreamParams, tx: StreamSender) {
    let StreamParams {
        session,
        assistant_id,
        content,
        cancel_token,
        stream_id,
    } = params;

    let thread = match create_thread(&session, content).await {
        Ok(thread) => thread,
        Err(err) => {
            fail(&tx, err, stream_id);
            return;
        }
    };
    debug!(thread_id = %thread.id, stream_id, "streaming run");

    let url = construct_api_url(&session.base_url, &format!("threads/{}/runs", thread.id));
    let request = RunRequest {
        assistant_id,
        model: Some(session.model.clone()),
        stream: true,
    };
    let response = match add_assistant_headers(session.client.post(url), &session.api_key)
        .json(&request)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            fail(&tx, format_api_error(&e.to_string()), stream_id);
            return;
        }
    };

    if !response.status().is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        fail(&tx, format_api_error(&error_text), stream_id);
        return;
    }

    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();
    let mut state = SseState::default();

    while let Some(chunk) = stream.next().await {
        if cancel_token.is_cancelled() {
            return;
        }

        let chunk_bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                fail(&tx, format_api_error(&e.to_string()), stream_id);
                return;
            }
        };
        buffer.extend_from_slice(&chunk_bytes);

        while let Some(newline_pos) = memchr(b'\n', &buffer) {
            let should_end = match std::str::from_utf8(&buffer[..newline_pos]) {
                Ok(line) => process_sse_line(line.trim(), &mut state, &tx, stream_id),
                Err(e) => {
                    warn!("invalid UTF-8 in stream: {e}");
                    false
                }
            };
            buffer.drain(..=newline_pos);
            if should_end {
                return;
            }
        }
    }

    send(&tx, StreamMessage::End, stream_id);
}

impl AssistantStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Open a thread for `params.content` and stream the assistant's reply.
    ///
    /// Once the token is cancelled nothing more is sent for this stream id;
    /// dropping the response closes the connection.
    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let cancel_token = params.cancel_token.clone();
            tokio::select! {
                _ = run_stream(params, tx) => {}
                _ = cancel_token.cancelled() => {
                    debug!("stream cancelled");
                }
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}
