//! Runs one chapter through the generator: opens the stream, forwards
//! fragments to an observer, and performs the persistence write.

use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{
    BeginOutcome, ChapterContentStore, ChapterGenerator, ChapterKey, GenerationCommand,
    GenerationError, GenerationPhase, PersistRequest, StreamUpdate,
};
use crate::core::assistant::AssistantSession;
use crate::core::assistant_stream::{AssistantStreamService, StreamMessage, StreamParams};

/// Progress reported while a chapter is generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    Phase(GenerationPhase),
    Fragment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Stored content already existed; nothing was requested.
    AlreadyGenerated,
    Done {
        content: String,
        audio_url: Option<String>,
    },
    Cancelled,
    /// The stream failed; the chapter is idle again.
    Failed { error: String },
    /// The text is complete but saving it failed; the chapter stays in
    /// `Finishing` and [`retry_persist`] can be called.
    PersistFailed { error: String },
}

/// Everything needed to open the assistant stream for one chapter.
pub struct ChapterRequest {
    pub key: ChapterKey,
    pub has_stored_content: bool,
    pub session: AssistantSession,
    pub assistant_id: String,
    pub prompt: String,
}

/// Opens and drains chapter streams.
pub struct GenerationDriver {
    pub generator: ChapterGenerator,
    service: AssistantStreamService,
    rx: UnboundedReceiver<(StreamMessage, u64)>,
}

impl Default for GenerationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationDriver {
    pub fn new() -> Self {
        let (service, rx) = AssistantStreamService::new();
        Self {
            generator: ChapterGenerator::new(),
            service,
            rx,
        }
    }

    /// Generate one chapter end to end.
    ///
    /// `cancel` is the caller's abort signal; firing it while the chapter is
    /// streaming drops the request and the buffered text.
    pub async fn generate<S, F>(
        &mut self,
        request: ChapterRequest,
        store: &S,
        owner: &str,
        cancel: CancellationToken,
        mut observer: F,
    ) -> Result<GenerationOutcome, GenerationError>
    where
        S: ChapterContentStore + ?Sized,
        F: FnMut(GenerationEvent),
    {
        let ChapterRequest {
            key,
            has_stored_content,
            session,
            assistant_id,
            prompt,
        } = request;

        let start = match self.generator.begin(key.clone(), has_stored_content)? {
            BeginOutcome::AlreadyGenerated => return Ok(GenerationOutcome::AlreadyGenerated),
            BeginOutcome::Started(start) => start,
        };
        observer(GenerationEvent::Phase(GenerationPhase::Streaming));

        self.service.spawn_stream(StreamParams {
            session,
            assistant_id,
            content: prompt,
            cancel_token: start.cancel_token,
            stream_id: start.stream_id,
        });

        Ok(self.drain(&key, store, owner, cancel, &mut observer).await)
    }

    /// Consume stream messages until `key` leaves `Streaming`, then perform
    /// the persistence write if the text completed.
    pub async fn drain<S, F>(
        &mut self,
        key: &ChapterKey,
        store: &S,
        owner: &str,
        cancel: CancellationToken,
        observer: &mut F,
    ) -> GenerationOutcome
    where
        S: ChapterContentStore + ?Sized,
        F: FnMut(GenerationEvent),
    {
        loop {
            let received = tokio::select! {
                message = self.rx.recv() => message,
                _ = cancel.cancelled() => {
                    self.generator.cancel(key);
                    observer(GenerationEvent::Phase(GenerationPhase::Cancelled));
                    return GenerationOutcome::Cancelled;
                }
            };

            let Some((message, stream_id)) = received else {
                // Every sender is gone; treat it like an unfinished stream.
                let stream_id = self.current_stream(key);
                self.generator.apply(StreamMessage::End, stream_id);
                return self.outcome_after_failure(key, observer);
            };

            match self.generator.apply(message, stream_id) {
                StreamUpdate::Ignored => {
                    debug!(stream_id, "ignoring message from stale stream");
                }
                StreamUpdate::Appended { key: from, fragment } if &from == key => {
                    observer(GenerationEvent::Fragment(fragment));
                }
                StreamUpdate::Appended { .. } => {}
                StreamUpdate::Completed { key: from, command } if &from == key => {
                    observer(GenerationEvent::Phase(GenerationPhase::Finishing));
                    return persist(&mut self.generator, command, store, owner, observer).await;
                }
                StreamUpdate::Completed { .. } => {}
                StreamUpdate::Failed { key: from, .. } if &from == key => {
                    return self.outcome_after_failure(key, observer);
                }
                StreamUpdate::Failed { .. } => {}
            }
        }
    }

    fn current_stream(&self, key: &ChapterKey) -> u64 {
        self.generator.stream_id(key).unwrap_or_default()
    }

    fn outcome_after_failure<F>(&self, key: &ChapterKey, observer: &mut F) -> GenerationOutcome
    where
        F: FnMut(GenerationEvent),
    {
        observer(GenerationEvent::Phase(GenerationPhase::Idle));
        GenerationOutcome::Failed {
            error: self
                .generator
                .error(key)
                .unwrap_or("Story generation failed")
                .to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn service(&self) -> &AssistantStreamService {
        &self.service
    }
}

/// Retry the persistence write for a chapter left in `Finishing`.
pub async fn retry_persist<S, F>(
    generator: &mut ChapterGenerator,
    key: &ChapterKey,
    store: &S,
    owner: &str,
    observer: &mut F,
) -> Result<GenerationOutcome, GenerationError>
where
    S: ChapterContentStore + ?Sized,
    F: FnMut(GenerationEvent),
{
    let command = generator.retry_persist(key)?;
    Ok(persist(generator, command, store, owner, observer).await)
}

async fn persist<S, F>(
    generator: &mut ChapterGenerator,
    command: GenerationCommand,
    store: &S,
    owner: &str,
    observer: &mut F,
) -> GenerationOutcome
where
    S: ChapterContentStore + ?Sized,
    F: FnMut(GenerationEvent),
{
    let GenerationCommand::Persist(PersistRequest { key, content }) = command;
    match store
        .save_chapter_content(&key.story_id, key.chapter_number, &content, owner)
        .await
    {
        Ok(saved) => {
            let audio_url = saved.audio_url.clone();
            generator.persist_succeeded(&key, saved);
            observer(GenerationEvent::Phase(GenerationPhase::Done));
            GenerationOutcome::Done { content, audio_url }
        }
        Err(err) => {
            let error = err.to_string();
            generator.persist_failed(&key, error.clone());
            GenerationOutcome::PersistFailed { error }
        }
    }
}
