//! REST client for the story backend.

use std::error::Error;
use std::fmt;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::api::{
    AddChapterContentRequest, ChapterContentSaved, CreateProfileRequest, CreateStoryRequest,
    Envelope, OriginalChapters, OriginalChaptersRequest, Profile, Story, StorySuggestions,
    SuggestTitlesRequest,
};
use crate::core::api_error::{format_api_error, summarize_api_error};
use crate::core::generation::ChapterContentStore;
use crate::utils::url::construct_api_url;

pub const DEFAULT_SUGGESTION_PROMPT: &str = "Generate 12 diverse story ideas";

#[derive(Debug)]
pub enum BackendError {
    /// The request never produced a response (DNS, TLS, connection reset).
    Request { url: String, source: reqwest::Error },
    /// The backend answered with a non-success status.
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
    /// The response body did not match the expected payload.
    Decode {
        url: String,
        source: serde_json::Error,
    },
    /// A write route answered 2xx but did not report success.
    Rejected { url: String, reason: String },
}

impl BackendError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Request { url, source } => {
                write!(f, "Request to {url} failed: {source}")
            }
            BackendError::Status { url, status, body } => match summarize_api_error(body) {
                Some(summary) => write!(f, "{url} returned {status}: {summary}"),
                None => write!(f, "{url} returned {status}\n{}", format_api_error(body)),
            },
            BackendError::Decode { url, source } => {
                write!(f, "Unexpected response from {url}: {source}")
            }
            BackendError::Rejected { url, reason } => {
                write!(f, "{url} rejected the request: {reason}")
            }
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BackendError::Request { source, .. } => Some(source),
            BackendError::Decode { source, .. } => Some(source),
            BackendError::Status { .. } | BackendError::Rejected { .. } => None,
        }
    }
}

#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        construct_api_url(&self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(
        url: String,
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| BackendError::Request {
                url: url.clone(),
                source,
            })?;

        if !status.is_success() {
            return Err(BackendError::Status { url, status, body });
        }

        serde_json::from_str(&body).map_err(|source| BackendError::Decode { url, source })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| BackendError::Request {
                url: url.clone(),
                source,
            })?;
        Self::read_json(url, response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        let url = self.url(path);
        debug!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| BackendError::Request {
                url: url.clone(),
                source,
            })?;
        Self::read_json(url, response).await
    }

    pub async fn create_story(&self, request: &CreateStoryRequest) -> Result<Story, BackendError> {
        self.post_json("stories/create", request).await
    }

    pub async fn get_story(&self, story_id: &str) -> Result<Story, BackendError> {
        self.get_json(&format!("stories/{story_id}")).await
    }

    pub async fn get_user_stories(&self, profile_id: &str) -> Result<Vec<Story>, BackendError> {
        self.get_json(&format!("stories/owner/{profile_id}")).await
    }

    /// Ask the backend to lay out chapter setups for a story from its passage.
    pub async fn get_original_story_chapters(
        &self,
        request: &OriginalChaptersRequest,
    ) -> Result<OriginalChapters, BackendError> {
        self.post_json("openai/get-original-story", request).await
    }

    /// Attach generated prose to a chapter; the backend renders narration and
    /// answers with its location.
    pub async fn add_chapter_content(
        &self,
        story_id: &str,
        chapter_number: u32,
        content: &str,
        owner: &str,
    ) -> Result<ChapterContentSaved, BackendError> {
        let path = format!("stories/{story_id}/chapter-add-content");
        let request = AddChapterContentRequest {
            chapter_number,
            content: content.to_string(),
            owner: owner.to_string(),
        };
        let envelope: Envelope<ChapterContentSaved> = self.post_json(&path, &request).await?;
        ensure_success(self.url(&path), &envelope)?;
        Ok(envelope.payload)
    }

    pub async fn suggest_story_titles(
        &self,
        prompt: Option<&str>,
    ) -> Result<StorySuggestions, BackendError> {
        let request = SuggestTitlesRequest {
            prompt: prompt
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(DEFAULT_SUGGESTION_PROMPT)
                .to_string(),
        };
        self.post_json("openai/suggest-story-titles", &request)
            .await
    }

    pub async fn create_profile(
        &self,
        request: &CreateProfileRequest,
    ) -> Result<Profile, BackendError> {
        self.post_json("users/create", request).await
    }

    pub async fn get_profile(&self, profile_id: &str) -> Result<Profile, BackendError> {
        self.get_json(&format!("users/{profile_id}")).await
    }
}

fn ensure_success<T>(url: String, envelope: &Envelope<T>) -> Result<(), BackendError> {
    if envelope.success == Some(true) {
        return Ok(());
    }
    let reason = match &envelope.error {
        Some(serde_json::Value::String(message)) => message.clone(),
        Some(serde_json::Value::Bool(true)) | None => "success flag not set".to_string(),
        Some(other) => other.to_string(),
    };
    Err(BackendError::Rejected { url, reason })
}

#[async_trait]
impl ChapterContentStore for BackendClient {
    type Error = BackendError;

    async fn save_chapter_content(
        &self,
        story_id: &str,
        chapter_number: u32,
        content: &str,
        owner: &str,
    ) -> Result<ChapterContentSaved, BackendError> {
        self.add_chapter_content(story_id, chapter_number, content, owner)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(raw: &str) -> Envelope<ChapterContentSaved> {
        serde_json::from_str(raw).expect("envelope")
    }

    #[test]
    fn success_envelope_passes() {
        let saved = envelope(r#"{"success": true, "audio_url": "a.mp3"}"#);
        assert!(ensure_success("u".into(), &saved).is_ok());
    }

    #[test]
    fn missing_success_flag_is_rejected() {
        let err = ensure_success("http://h/x".into(), &envelope(r#"{"audio_url": "a.mp3"}"#))
            .expect_err("rejected");
        assert_eq!(
            err.to_string(),
            "http://h/x rejected the request: success flag not set"
        );
    }

    #[test]
    fn error_message_is_reported() {
        let err = ensure_success(
            "http://h/x".into(),
            &envelope(r#"{"success": false, "error": "not the owner"}"#),
        )
        .expect_err("rejected");
        assert!(err.to_string().ends_with("not the owner"));
    }

    #[test]
    fn status_errors_summarise_json_bodies() {
        let err = BackendError::Status {
            url: "http://h/stories/1".into(),
            status: StatusCode::NOT_FOUND,
            body: r#"{"message":"Story not found"}"#.into(),
        };
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "http://h/stories/1 returned 404 Not Found: Story not found"
        );
    }

    #[test]
    fn routes_are_joined_onto_base_url() {
        let client = BackendClient::new(reqwest::Client::new(), "http://localhost:3000/");
        assert_eq!(
            client.url("stories/owner/42"),
            "http://localhost:3000/stories/owner/42"
        );
    }
}
