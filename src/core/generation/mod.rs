//! Chapter generation lifecycle.
//!
//! Each chapter moves through `Idle -> Streaming -> Finishing -> Done`, with
//! `Streaming -> Cancelled` as the only side exit. [`ChapterGenerator`] owns
//! that state for every chapter being worked on and hands back
//! [`GenerationCommand`]s for the side effects (open a stream, persist text);
//! the [`driver`] module executes them.

pub mod driver;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::api::ChapterContentSaved;
use crate::core::assistant_stream::StreamMessage;

/// Persistence seam for finished chapters.
#[async_trait]
pub trait ChapterContentStore: Send + Sync {
    type Error: Error + Send + Sync + 'static;

    async fn save_chapter_content(
        &self,
        story_id: &str,
        chapter_number: u32,
        content: &str,
        owner: &str,
    ) -> Result<ChapterContentSaved, Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChapterKey {
    pub story_id: String,
    pub chapter_number: u32,
}

impl ChapterKey {
    pub fn new(story_id: impl Into<String>, chapter_number: u32) -> Self {
        Self {
            story_id: story_id.into(),
            chapter_number,
        }
    }
}

impl fmt::Display for ChapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.story_id, self.chapter_number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
    Idle,
    Streaming,
    Finishing,
    Done,
    Cancelled,
}

impl GenerationPhase {
    /// A request or a persistence write is outstanding.
    pub fn is_active(self) -> bool {
        matches!(self, GenerationPhase::Streaming | GenerationPhase::Finishing)
    }

    pub fn label(self) -> &'static str {
        match self {
            GenerationPhase::Idle => "idle",
            GenerationPhase::Streaming => "Writing your story...",
            GenerationPhase::Finishing => "Rehearsing story narration...",
            GenerationPhase::Done => "Listen now",
            GenerationPhase::Cancelled => "Story generation cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// A request or write for this chapter is still outstanding.
    AlreadyInFlight {
        key: ChapterKey,
        phase: GenerationPhase,
    },
    /// `retry_persist` was called while there is nothing to retry.
    NothingToPersist {
        key: ChapterKey,
        phase: GenerationPhase,
    },
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::AlreadyInFlight { key, phase } => write!(
                f,
                "Chapter {key} is already being generated ({})",
                phase.label()
            ),
            GenerationError::NothingToPersist { key, phase } => write!(
                f,
                "Chapter {key} has no failed write to retry (state: {})",
                phase.label()
            ),
        }
    }
}

impl Error for GenerationError {}

/// Handle for the request opened by [`ChapterGenerator::begin`].
#[derive(Debug, Clone)]
pub struct StreamStart {
    pub key: ChapterKey,
    pub stream_id: u64,
    pub cancel_token: CancellationToken,
}

#[derive(Debug, Clone)]
pub enum BeginOutcome {
    Started(StreamStart),
    /// Content is already stored for this chapter; nothing was opened.
    AlreadyGenerated,
}

/// The single persistence write for a finished chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistRequest {
    pub key: ChapterKey,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationCommand {
    Persist(PersistRequest),
}

/// What applying a stream message did, for progressive display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdate {
    /// Message belonged to a stale or unknown stream.
    Ignored,
    Appended { key: ChapterKey, fragment: String },
    Completed { key: ChapterKey, command: GenerationCommand },
    Failed { key: ChapterKey, error: String },
}

#[derive(Debug, Default)]
struct GenerationSession {
    phase: Option<GenerationPhase>,
    buffer: String,
    stream_id: u64,
    cancel_token: Option<CancellationToken>,
    final_text: Option<String>,
    persisting: bool,
    audio_url: Option<String>,
    error: Option<String>,
}

impl GenerationSession {
    fn phase(&self) -> GenerationPhase {
        self.phase.unwrap_or(GenerationPhase::Idle)
    }

    fn abort_request(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.buffer.clear();
    }
}

/// Snapshot of one chapter's generation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSnapshot {
    pub phase: GenerationPhase,
    pub buffer: String,
    pub error: Option<String>,
    pub audio_url: Option<String>,
    pub word_count: usize,
}

#[derive(Debug, Default)]
pub struct ChapterGenerator {
    sessions: HashMap<ChapterKey, GenerationSession>,
    streams: HashMap<u64, ChapterKey>,
    current_stream_id: u64,
}

impl ChapterGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a generation request for `key`.
    ///
    /// Returns [`BeginOutcome::AlreadyGenerated`] without touching any state
    /// when the chapter already has stored content, so re-entering a finished
    /// chapter never regenerates it.
    pub fn begin(
        &mut self,
        key: ChapterKey,
        has_stored_content: bool,
    ) -> Result<BeginOutcome, GenerationError> {
        if has_stored_content {
            debug!(%key, "chapter already has content; not generating");
            return Ok(BeginOutcome::AlreadyGenerated);
        }

        let phase = self.phase(&key);
        if phase.is_active() {
            return Err(GenerationError::AlreadyInFlight { key, phase });
        }

        self.current_stream_id += 1;
        let stream_id = self.current_stream_id;
        let token = CancellationToken::new();

        let session = self.sessions.entry(key.clone()).or_default();
        if let Some(old) = session.cancel_token.take() {
            old.cancel();
        }
        self.streams.retain(|_, owner| owner != &key);
        *session = GenerationSession {
            phase: Some(GenerationPhase::Streaming),
            stream_id,
            cancel_token: Some(token.clone()),
            ..GenerationSession::default()
        };
        self.streams.insert(stream_id, key.clone());

        info!(%key, stream_id, "chapter generation started");
        Ok(BeginOutcome::Started(StreamStart {
            key,
            stream_id,
            cancel_token: token,
        }))
    }

    /// Feed one message from the assistant stream into the state machine.
    pub fn apply(&mut self, message: StreamMessage, stream_id: u64) -> StreamUpdate {
        let Some(key) = self.streams.get(&stream_id).cloned() else {
            return StreamUpdate::Ignored;
        };
        let Some(session) = self.sessions.get_mut(&key) else {
            return StreamUpdate::Ignored;
        };
        if session.stream_id != stream_id || session.phase() != GenerationPhase::Streaming {
            return StreamUpdate::Ignored;
        }

        match message {
            StreamMessage::Delta(fragment) => {
                session.buffer.push_str(&fragment);
                StreamUpdate::Appended { key, fragment }
            }
            StreamMessage::MessageDone(text) => {
                let content = if text.trim().is_empty() {
                    session.buffer.clone()
                } else {
                    text
                };
                session.phase = Some(GenerationPhase::Finishing);
                session.cancel_token = None;
                session.final_text = Some(content.clone());
                session.persisting = true;
                self.streams.remove(&stream_id);
                info!(%key, words = count_words(&content), "chapter text complete");
                StreamUpdate::Completed {
                    command: GenerationCommand::Persist(PersistRequest {
                        key: key.clone(),
                        content,
                    }),
                    key,
                }
            }
            StreamMessage::Error(error) => self.fail_stream(key, stream_id, error),
            StreamMessage::End => self.fail_stream(
                key,
                stream_id,
                "Stream ended before the chapter was finished".to_string(),
            ),
        }
    }

    fn fail_stream(&mut self, key: ChapterKey, stream_id: u64, error: String) -> StreamUpdate {
        self.streams.remove(&stream_id);
        if let Some(session) = self.sessions.get_mut(&key) {
            session.abort_request();
            session.phase = Some(GenerationPhase::Idle);
            session.error = Some(error.clone());
        }
        warn!(%key, "chapter generation failed: {error}");
        StreamUpdate::Failed { key, error }
    }

    /// Abort the outstanding request and drop everything streamed so far.
    ///
    /// Only a streaming chapter can be cancelled; returns false otherwise.
    pub fn cancel(&mut self, key: &ChapterKey) -> bool {
        let Some(session) = self.sessions.get_mut(key) else {
            return false;
        };
        if session.phase() != GenerationPhase::Streaming {
            return false;
        }
        session.abort_request();
        session.phase = Some(GenerationPhase::Cancelled);
        let stream_id = session.stream_id;
        self.streams.remove(&stream_id);
        info!(%key, "chapter generation cancelled");
        true
    }

    pub fn persist_succeeded(&mut self, key: &ChapterKey, saved: ChapterContentSaved) -> bool {
        match self.sessions.get_mut(key) {
            Some(session) if session.phase() == GenerationPhase::Finishing && session.persisting => {
                session.persisting = false;
                session.phase = Some(GenerationPhase::Done);
                session.audio_url = saved.audio_url;
                session.error = None;
                info!(%key, "chapter saved");
                true
            }
            _ => false,
        }
    }

    /// Record a failed write. The chapter stays in `Finishing` with the
    /// error visible; the finished text is kept for [`Self::retry_persist`].
    pub fn persist_failed(&mut self, key: &ChapterKey, error: impl Into<String>) -> bool {
        match self.sessions.get_mut(key) {
            Some(session) if session.phase() == GenerationPhase::Finishing && session.persisting => {
                session.persisting = false;
                let error = error.into();
                warn!(%key, "saving chapter failed: {error}");
                session.error = Some(error);
                true
            }
            _ => false,
        }
    }

    /// Issue the persistence write again after a failure.
    pub fn retry_persist(&mut self, key: &ChapterKey) -> Result<GenerationCommand, GenerationError> {
        let phase = self.phase(key);
        let session = self
            .sessions
            .get_mut(key)
            .filter(|session| {
                session.phase() == GenerationPhase::Finishing
                    && !session.persisting
                    && session.error.is_some()
            })
            .ok_or_else(|| GenerationError::NothingToPersist {
                key: key.clone(),
                phase,
            })?;

        let content = session.final_text.clone().unwrap_or_default();
        session.persisting = true;
        session.error = None;
        Ok(GenerationCommand::Persist(PersistRequest {
            key: key.clone(),
            content,
        }))
    }

    /// Forget a cancelled, finished or failed chapter so it reads as idle.
    pub fn reset(&mut self, key: &ChapterKey) -> bool {
        if self.phase(key).is_active() {
            return false;
        }
        self.sessions.remove(key).is_some()
    }

    pub fn phase(&self, key: &ChapterKey) -> GenerationPhase {
        self.sessions
            .get(key)
            .map(GenerationSession::phase)
            .unwrap_or(GenerationPhase::Idle)
    }

    pub fn buffer(&self, key: &ChapterKey) -> &str {
        self.sessions
            .get(key)
            .map(|session| session.buffer.as_str())
            .unwrap_or("")
    }

    pub fn error(&self, key: &ChapterKey) -> Option<&str> {
        self.sessions.get(key).and_then(|s| s.error.as_deref())
    }

    /// Id of the stream currently feeding `key`, if it is streaming.
    pub fn stream_id(&self, key: &ChapterKey) -> Option<u64> {
        self.sessions
            .get(key)
            .filter(|s| s.phase() == GenerationPhase::Streaming)
            .map(|s| s.stream_id)
    }

    /// Text that was (or is being) persisted for a finished chapter.
    pub fn final_text(&self, key: &ChapterKey) -> Option<&str> {
        self.sessions.get(key).and_then(|s| s.final_text.as_deref())
    }

    pub fn snapshot(&self, key: &ChapterKey) -> GenerationSnapshot {
        let session = self.sessions.get(key);
        let buffer = session.map(|s| s.buffer.clone()).unwrap_or_default();
        GenerationSnapshot {
            phase: self.phase(key),
            word_count: count_words(&buffer),
            buffer,
            error: session.and_then(|s| s.error.clone()),
            audio_url: session.and_then(|s| s.audio_url.clone()),
        }
    }

    /// Number of chapters with a request or write outstanding.
    pub fn active_count(&self) -> usize {
        self.sessions
            .values()
            .filter(|session| session.phase().is_active())
            .count()
    }
}

/// Words in a piece of prose, by Unicode word boundaries.
pub fn count_words(text: &str) -> usize {
    text.unicode_words().count()
}
