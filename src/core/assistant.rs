//! Request/response calls against the hosted assistant (threads and runs).
//!
//! Streaming runs live in [`crate::core::assistant_stream`]; everything here
//! waits for a run to finish and then reads its answer.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::api::assistant::{
    CreateThreadRequest, Message, MessageList, Run, RunRequest, RunStatus, Thread, ThreadMessage,
};
use crate::api::{Genre, StorySuggestions, TimePeriod};
use crate::core::api_error::format_api_error;
use crate::core::config::data::ResolvedConfig;
use crate::core::prompts;
use crate::utils::auth::add_assistant_headers;
use crate::utils::url::construct_api_url;

#[derive(Debug)]
pub enum AssistantError {
    /// No assistant id is configured for the requested job.
    NotConfigured { job: &'static str, key: &'static str },
    Request { url: String, source: reqwest::Error },
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
    Decode {
        url: String,
        source: serde_json::Error,
    },
    /// The run ended in a status other than `completed`.
    RunFailed {
        run_id: String,
        status: RunStatus,
        message: Option<String>,
    },
    /// The run completed without producing a text answer.
    NoAnswer { run_id: String },
    /// The answer was not valid JSON for the expected shape.
    InvalidAnswer { source: serde_json::Error },
}

impl fmt::Display for AssistantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssistantError::NotConfigured { job, key } => write!(
                f,
                "No assistant configured for {job}. Run 'storyteller set {key} <assistant-id>'."
            ),
            AssistantError::Request { url, source } => {
                write!(f, "Request to {url} failed: {source}")
            }
            AssistantError::Status { url, status, body } => {
                write!(f, "{url} returned {status}\n{}", format_api_error(body))
            }
            AssistantError::Decode { url, source } => {
                write!(f, "Unexpected response from {url}: {source}")
            }
            AssistantError::RunFailed {
                run_id,
                status,
                message,
            } => match message {
                Some(message) => write!(f, "Run {run_id} ended as {status:?}: {message}"),
                None => write!(f, "Run {run_id} ended as {status:?}"),
            },
            AssistantError::NoAnswer { run_id } => {
                write!(f, "Run {run_id} completed without a text answer")
            }
            AssistantError::InvalidAnswer { source } => {
                write!(f, "Assistant answer was not the expected JSON: {source}")
            }
        }
    }
}

impl Error for AssistantError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AssistantError::Request { source, .. } => Some(source),
            AssistantError::Decode { source, .. } => Some(source),
            AssistantError::InvalidAnswer { source } => Some(source),
            _ => None,
        }
    }
}

/// Connection details shared by the polling client and the stream service.
#[derive(Clone, Debug)]
pub struct AssistantSession {
    pub client: reqwest::Client,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Clone)]
pub struct AssistantClient {
    session: AssistantSession,
    poll_interval: Duration,
}

impl AssistantClient {
    pub fn new(session: AssistantSession, poll_interval: Duration) -> Self {
        Self {
            session,
            poll_interval,
        }
    }

    pub fn from_config(client: reqwest::Client, api_key: String, config: &ResolvedConfig) -> Self {
        Self::new(
            AssistantSession {
                client,
                base_url: config.assistant_base_url.clone(),
                api_key,
                model: config.model.clone(),
            },
            Duration::from_millis(config.poll_interval_ms),
        )
    }

    pub fn session(&self) -> &AssistantSession {
        &self.session
    }

    async fn send<T: DeserializeOwned>(
        &self,
        url: String,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AssistantError> {
        let response = add_assistant_headers(request, &self.session.api_key)
            .send()
            .await
            .map_err(|source| AssistantError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| AssistantError::Request {
                url: url.clone(),
                source,
            })?;
        if !status.is_success() {
            return Err(AssistantError::Status { url, status, body });
        }
        serde_json::from_str(&body).map_err(|source| AssistantError::Decode { url, source })
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AssistantError> {
        let url = construct_api_url(&self.session.base_url, path);
        let request = self.session.client.post(&url).json(body);
        self.send(url, request).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AssistantError> {
        let url = construct_api_url(&self.session.base_url, path);
        let request = self.session.client.get(&url);
        self.send(url, request).await
    }

    pub async fn create_thread(&self, content: &str) -> Result<Thread, AssistantError> {
        let request = CreateThreadRequest {
            messages: vec![ThreadMessage::user(content)],
        };
        let thread: Thread = self.post("threads", &request).await?;
        debug!(thread_id = %thread.id, "created thread");
        Ok(thread)
    }

    pub async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<Run, AssistantError> {
        let request = RunRequest {
            assistant_id: assistant_id.to_string(),
            model: Some(self.session.model.clone()),
            stream: false,
        };
        self.post(&format!("threads/{thread_id}/runs"), &request)
            .await
    }

    pub async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError> {
        self.get(&format!("threads/{thread_id}/runs/{run_id}"))
            .await
    }

    /// Start a run and poll it until it reaches a terminal status.
    pub async fn create_and_poll_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<Run, AssistantError> {
        let mut run = self.create_run(thread_id, assistant_id).await?;
        while !run.status.is_terminal() {
            tokio::time::sleep(self.poll_interval).await;
            run = self.get_run(thread_id, &run.id).await?;
            debug!(run_id = %run.id, status = ?run.status, "polled run");
        }
        Ok(run)
    }

    pub async fn list_run_messages(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<MessageList, AssistantError> {
        self.get(&format!("threads/{thread_id}/messages?run_id={run_id}"))
            .await
    }

    /// Send one user message to an assistant and return its text answer.
    pub async fn ask(&self, assistant_id: &str, content: &str) -> Result<String, AssistantError> {
        let thread = self.create_thread(content).await?;
        let run = self.create_and_poll_run(&thread.id, assistant_id).await?;
        if run.status != RunStatus::Completed {
            return Err(AssistantError::RunFailed {
                message: run.last_error.and_then(|err| err.message),
                run_id: run.id,
                status: run.status,
            });
        }

        let messages = self.list_run_messages(&thread.id, &run.id).await?;
        answer_text(messages.data)
            .ok_or(AssistantError::NoAnswer { run_id: run.id })
    }

    pub async fn suggest_story_titles(
        &self,
        assistant_id: Option<&str>,
        user_prompt: &str,
    ) -> Result<StorySuggestions, AssistantError> {
        let assistant_id = assistant_id.ok_or(AssistantError::NotConfigured {
            job: "story suggestions",
            key: "suggestion-assistant",
        })?;
        info!("requesting story suggestions");
        let answer = self
            .ask(assistant_id, &prompts::story_suggestions(user_prompt))
            .await?;
        parse_answer(&answer)
    }

    /// Ask the setup assistant for the analysis, characters, plot, world and
    /// themes of a new story.
    pub async fn initialise_story_setup(
        &self,
        assistant_id: Option<&str>,
        title: &str,
        passage: &str,
        genre: Genre,
        time_period: TimePeriod,
    ) -> Result<serde_json::Value, AssistantError> {
        let assistant_id = assistant_id.ok_or(AssistantError::NotConfigured {
            job: "story setup",
            key: "setup-assistant",
        })?;
        info!(%title, "initialising story setup");
        let answer = self
            .ask(
                assistant_id,
                &prompts::story_setup(title, passage, genre, time_period),
            )
            .await?;
        parse_answer(&answer)
    }
}

/// The answer is the last listed message; it must start with a text block.
fn answer_text(mut messages: Vec<Message>) -> Option<String> {
    let message = messages.pop()?;
    message.first_text().map(str::to_owned)
}

fn parse_answer<T: DeserializeOwned>(answer: &str) -> Result<T, AssistantError> {
    serde_json::from_str(prompts::strip_code_fence(answer))
        .map_err(|source| AssistantError::InvalidAnswer { source })
}
