use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::driver::{retry_persist, GenerationDriver, GenerationEvent, GenerationOutcome};
use super::*;
use crate::api::ChapterContentSaved;
use crate::core::assistant_stream::StreamMessage;

#[derive(Debug)]
struct StoreDown;

impl fmt::Display for StoreDown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "backend unavailable")
    }
}

impl Error for StoreDown {}

#[derive(Default)]
struct MemoryStore {
    writes: Mutex<Vec<(String, u32, String, String)>>,
    failures_left: AtomicUsize,
}

impl MemoryStore {
    fn failing(times: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(times),
            ..Self::default()
        }
    }

    fn attempts(&self) -> usize {
        self.writes.lock().expect("writes").len()
    }
}

#[async_trait]
impl ChapterContentStore for MemoryStore {
    type Error = StoreDown;

    async fn save_chapter_content(
        &self,
        story_id: &str,
        chapter_number: u32,
        content: &str,
        owner: &str,
    ) -> Result<ChapterContentSaved, StoreDown> {
        self.writes.lock().expect("writes").push((
            story_id.to_string(),
            chapter_number,
            content.to_string(),
            owner.to_string(),
        ));
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(StoreDown);
        }
        Ok(ChapterContentSaved {
            audio_url: Some(format!("https://cdn.test/{story_id}/{chapter_number}.mp3")),
        })
    }
}

fn key() -> ChapterKey {
    ChapterKey::new("story-1", 1)
}

fn started(generator: &mut ChapterGenerator, key: ChapterKey) -> StreamStart {
    match generator.begin(key, false).expect("begin") {
        BeginOutcome::Started(start) => start,
        BeginOutcome::AlreadyGenerated => panic!("expected a new stream"),
    }
}

#[test]
fn fresh_chapter_reads_as_idle() {
    let generator = ChapterGenerator::new();
    assert_eq!(generator.phase(&key()), GenerationPhase::Idle);
    assert_eq!(generator.buffer(&key()), "");
    assert_eq!(generator.snapshot(&key()).word_count, 0);
}

#[test]
fn stored_content_never_opens_a_request() {
    let mut generator = ChapterGenerator::new();
    let outcome = generator.begin(key(), true).expect("begin");
    assert!(matches!(outcome, BeginOutcome::AlreadyGenerated));
    assert_eq!(generator.phase(&key()), GenerationPhase::Idle);
    assert_eq!(generator.active_count(), 0);
}

#[test]
fn second_begin_while_streaming_is_rejected() {
    let mut generator = ChapterGenerator::new();
    started(&mut generator, key());
    let err = generator.begin(key(), false).expect_err("in flight");
    assert_eq!(
        err,
        GenerationError::AlreadyInFlight {
            key: key(),
            phase: GenerationPhase::Streaming,
        }
    );
}

#[test]
fn other_chapters_generate_independently() {
    let mut generator = ChapterGenerator::new();
    let first = started(&mut generator, key());
    let second = started(&mut generator, ChapterKey::new("story-1", 2));
    assert_ne!(first.stream_id, second.stream_id);
    assert_eq!(generator.active_count(), 2);

    generator.apply(StreamMessage::Delta("two".into()), second.stream_id);
    assert_eq!(generator.buffer(&key()), "");
    assert_eq!(generator.buffer(&ChapterKey::new("story-1", 2)), "two");
}

#[test]
fn fragments_are_visible_as_they_arrive() {
    let mut generator = ChapterGenerator::new();
    let start = started(&mut generator, key());

    let update = generator.apply(StreamMessage::Delta("Once upon ".into()), start.stream_id);
    assert_eq!(
        update,
        StreamUpdate::Appended {
            key: key(),
            fragment: "Once upon ".into()
        }
    );
    assert_eq!(generator.buffer(&key()), "Once upon ");

    generator.apply(StreamMessage::Delta("a time".into()), start.stream_id);
    let snapshot = generator.snapshot(&key());
    assert_eq!(snapshot.buffer, "Once upon a time");
    assert_eq!(snapshot.word_count, 4);
    assert_eq!(snapshot.phase, GenerationPhase::Streaming);
}

#[test]
fn completion_issues_exactly_one_persist() {
    let mut generator = ChapterGenerator::new();
    let start = started(&mut generator, key());
    generator.apply(StreamMessage::Delta("Draft".into()), start.stream_id);

    let update = generator.apply(
        StreamMessage::MessageDone("Final text".into()),
        start.stream_id,
    );
    assert_eq!(
        update,
        StreamUpdate::Completed {
            key: key(),
            command: GenerationCommand::Persist(PersistRequest {
                key: key(),
                content: "Final text".into(),
            }),
        }
    );
    assert_eq!(generator.phase(&key()), GenerationPhase::Finishing);

    // A duplicate completion or trailing end does nothing.
    assert_eq!(
        generator.apply(StreamMessage::MessageDone("again".into()), start.stream_id),
        StreamUpdate::Ignored
    );
    assert_eq!(
        generator.apply(StreamMessage::End, start.stream_id),
        StreamUpdate::Ignored
    );
    assert!(!generator.cancel(&key()));
    assert!(matches!(
        generator.retry_persist(&key()),
        Err(GenerationError::NothingToPersist { .. })
    ));
}

#[test]
fn empty_completion_falls_back_to_buffer() {
    let mut generator = ChapterGenerator::new();
    let start = started(&mut generator, key());
    generator.apply(StreamMessage::Delta("Buffered".into()), start.stream_id);
    match generator.apply(StreamMessage::MessageDone(String::new()), start.stream_id) {
        StreamUpdate::Completed {
            command: GenerationCommand::Persist(request),
            ..
        } => assert_eq!(request.content, "Buffered"),
        other => panic!("expected completion, got {other:?}"),
    }
}

#[test]
fn persist_success_moves_to_done() {
    let mut generator = ChapterGenerator::new();
    let start = started(&mut generator, key());
    generator.apply(StreamMessage::MessageDone("Text".into()), start.stream_id);

    assert!(generator.persist_succeeded(
        &key(),
        ChapterContentSaved {
            audio_url: Some("a.mp3".into())
        }
    ));
    let snapshot = generator.snapshot(&key());
    assert_eq!(snapshot.phase, GenerationPhase::Done);
    assert_eq!(snapshot.audio_url.as_deref(), Some("a.mp3"));
    assert_eq!(generator.final_text(&key()), Some("Text"));
    assert!(!generator.persist_succeeded(&key(), ChapterContentSaved::default()));
}

#[test]
fn persist_failure_stays_finishing_until_retried() {
    let mut generator = ChapterGenerator::new();
    let start = started(&mut generator, key());
    generator.apply(StreamMessage::MessageDone("Text".into()), start.stream_id);

    assert!(generator.persist_failed(&key(), "backend unavailable"));
    assert_eq!(generator.phase(&key()), GenerationPhase::Finishing);
    assert_eq!(generator.error(&key()), Some("backend unavailable"));
    assert!(!generator.reset(&key()));
    assert!(generator.begin(key(), false).is_err());

    let retry = generator.retry_persist(&key()).expect("retry");
    assert_eq!(
        retry,
        GenerationCommand::Persist(PersistRequest {
            key: key(),
            content: "Text".into()
        })
    );
    assert_eq!(generator.error(&key()), None);
    // The retried write is still outstanding.
    assert!(generator.retry_persist(&key()).is_err());
}

#[test]
fn stream_error_returns_to_idle_without_persisting() {
    let mut generator = ChapterGenerator::new();
    let start = started(&mut generator, key());
    generator.apply(StreamMessage::Delta("partial".into()), start.stream_id);

    let update = generator.apply(StreamMessage::Error("rate limited".into()), start.stream_id);
    assert_eq!(
        update,
        StreamUpdate::Failed {
            key: key(),
            error: "rate limited".into()
        }
    );
    assert!(start.cancel_token.is_cancelled());
    assert_eq!(generator.phase(&key()), GenerationPhase::Idle);
    assert_eq!(generator.buffer(&key()), "");
    assert_eq!(generator.error(&key()), Some("rate limited"));

    // Idle again, so a new attempt may start.
    started(&mut generator, key());
    assert_eq!(generator.error(&key()), None);
}

#[test]
fn end_before_completion_is_a_failure() {
    let mut generator = ChapterGenerator::new();
    let start = started(&mut generator, key());
    assert!(matches!(
        generator.apply(StreamMessage::End, start.stream_id),
        StreamUpdate::Failed { .. }
    ));
    assert_eq!(generator.phase(&key()), GenerationPhase::Idle);
}

#[test]
fn cancel_discards_buffer_and_ignores_late_messages() {
    let mut generator = ChapterGenerator::new();
    let start = started(&mut generator, key());
    generator.apply(StreamMessage::Delta("half a chapter".into()), start.stream_id);

    assert!(generator.cancel(&key()));
    assert!(start.cancel_token.is_cancelled());
    assert_eq!(generator.phase(&key()), GenerationPhase::Cancelled);
    assert_eq!(generator.buffer(&key()), "");

    assert_eq!(
        generator.apply(StreamMessage::Delta("late".into()), start.stream_id),
        StreamUpdate::Ignored
    );
    assert_eq!(
        generator.apply(StreamMessage::MessageDone("late".into()), start.stream_id),
        StreamUpdate::Ignored
    );
    assert_eq!(generator.phase(&key()), GenerationPhase::Cancelled);
    assert!(!generator.cancel(&key()));
}

#[test]
fn cancel_only_applies_while_streaming() {
    let mut generator = ChapterGenerator::new();
    assert!(!generator.cancel(&key()));

    let start = started(&mut generator, key());
    generator.apply(StreamMessage::MessageDone("done".into()), start.stream_id);
    assert!(!generator.cancel(&key()));
    assert_eq!(generator.phase(&key()), GenerationPhase::Finishing);
}

#[test]
fn restarted_chapter_ignores_previous_stream() {
    let mut generator = ChapterGenerator::new();
    let first = started(&mut generator, key());
    generator.cancel(&key());
    let second = started(&mut generator, key());

    assert_eq!(
        generator.apply(StreamMessage::Delta("old".into()), first.stream_id),
        StreamUpdate::Ignored
    );
    generator.apply(StreamMessage::Delta("new".into()), second.stream_id);
    assert_eq!(generator.buffer(&key()), "new");
}

#[test]
fn reset_returns_finished_states_to_idle() {
    let mut generator = ChapterGenerator::new();
    started(&mut generator, key());
    assert!(!generator.reset(&key()));

    generator.cancel(&key());
    assert!(generator.reset(&key()));
    assert_eq!(generator.phase(&key()), GenerationPhase::Idle);
}

#[test]
fn unicode_words_are_counted() {
    assert_eq!(count_words(""), 0);
    assert_eq!(count_words("The lion's den, at dawn."), 5);
    assert_eq!(count_words("  spaced\n\nout  "), 2);
}

fn ignore(_: GenerationEvent) {}

#[tokio::test]
async fn driver_streams_then_persists_once() {
    let mut driver = GenerationDriver::new();
    let start = started(&mut driver.generator, key());
    let service = driver.service().clone();
    service.send_for_test(StreamMessage::Delta("In the ".into()), start.stream_id);
    service.send_for_test(StreamMessage::Delta("beginning".into()), start.stream_id);
    service.send_for_test(
        StreamMessage::MessageDone("In the beginning".into()),
        start.stream_id,
    );
    service.send_for_test(StreamMessage::End, start.stream_id);

    let store = MemoryStore::default();
    let mut events = Vec::new();
    let outcome = driver
        .drain(&key(), &store, "owner-1", CancellationToken::new(), &mut |event| {
            events.push(event)
        })
        .await;

    assert_eq!(
        outcome,
        GenerationOutcome::Done {
            content: "In the beginning".into(),
            audio_url: Some("https://cdn.test/story-1/1.mp3".into()),
        }
    );
    assert_eq!(
        events,
        vec![
            GenerationEvent::Fragment("In the ".into()),
            GenerationEvent::Fragment("beginning".into()),
            GenerationEvent::Phase(GenerationPhase::Finishing),
            GenerationEvent::Phase(GenerationPhase::Done),
        ]
    );
    assert_eq!(
        store.writes.lock().expect("writes").as_slice(),
        &[(
            "story-1".to_string(),
            1,
            "In the beginning".to_string(),
            "owner-1".to_string()
        )]
    );
    assert_eq!(driver.generator.phase(&key()), GenerationPhase::Done);
}

#[tokio::test]
async fn driver_skips_stale_stream_messages() {
    let mut driver = GenerationDriver::new();
    let stale = started(&mut driver.generator, key());
    driver.generator.cancel(&key());
    let start = started(&mut driver.generator, key());

    let service = driver.service().clone();
    service.send_for_test(StreamMessage::Delta("stale".into()), stale.stream_id);
    service.send_for_test(StreamMessage::MessageDone("stale".into()), stale.stream_id);
    service.send_for_test(StreamMessage::MessageDone("fresh".into()), start.stream_id);

    let store = MemoryStore::default();
    let mut observer = ignore;
    let outcome = driver
        .drain(&key(), &store, "o", CancellationToken::new(), &mut observer)
        .await;

    assert!(matches!(outcome, GenerationOutcome::Done { ref content, .. } if content == "fresh"));
    assert_eq!(store.attempts(), 1);
}

#[tokio::test]
async fn driver_reports_stream_error_without_writing() {
    let mut driver = GenerationDriver::new();
    let start = started(&mut driver.generator, key());
    let service = driver.service().clone();
    service.send_for_test(StreamMessage::Delta("partial".into()), start.stream_id);
    service.send_for_test(StreamMessage::Error("API Error: quota".into()), start.stream_id);
    service.send_for_test(StreamMessage::End, start.stream_id);

    let store = MemoryStore::default();
    let mut observer = ignore;
    let outcome = driver
        .drain(&key(), &store, "o", CancellationToken::new(), &mut observer)
        .await;

    assert_eq!(
        outcome,
        GenerationOutcome::Failed {
            error: "API Error: quota".into()
        }
    );
    assert_eq!(store.attempts(), 0);
    assert_eq!(driver.generator.phase(&key()), GenerationPhase::Idle);
}

#[tokio::test]
async fn driver_cancellation_discards_everything() {
    let mut driver = GenerationDriver::new();
    let start = started(&mut driver.generator, key());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let store = MemoryStore::default();
    let mut events = Vec::new();
    let outcome = driver
        .drain(&key(), &store, "o", cancel, &mut |event| events.push(event))
        .await;

    assert_eq!(outcome, GenerationOutcome::Cancelled);
    assert_eq!(events, vec![GenerationEvent::Phase(GenerationPhase::Cancelled)]);
    assert!(start.cancel_token.is_cancelled());
    assert_eq!(driver.generator.phase(&key()), GenerationPhase::Cancelled);
    assert_eq!(store.attempts(), 0);
}

#[tokio::test]
async fn failed_write_can_be_retried_once_per_call() {
    let mut driver = GenerationDriver::new();
    let start = started(&mut driver.generator, key());
    driver
        .service()
        .send_for_test(StreamMessage::MessageDone("Text".into()), start.stream_id);

    let store = MemoryStore::failing(1);
    let mut observer = ignore;
    let outcome = driver
        .drain(&key(), &store, "o", CancellationToken::new(), &mut observer)
        .await;
    assert_eq!(
        outcome,
        GenerationOutcome::PersistFailed {
            error: "backend unavailable".into()
        }
    );
    assert_eq!(driver.generator.phase(&key()), GenerationPhase::Finishing);
    assert_eq!(store.attempts(), 1);

    let outcome = retry_persist(&mut driver.generator, &key(), &store, "o", &mut observer)
        .await
        .expect("retry");
    assert!(matches!(outcome, GenerationOutcome::Done { .. }));
    assert_eq!(store.attempts(), 2);
    assert_eq!(driver.generator.phase(&key()), GenerationPhase::Done);

    let err = retry_persist(&mut driver.generator, &key(), &store, "o", &mut observer)
        .await
        .expect_err("nothing left to retry");
    assert!(matches!(err, GenerationError::NothingToPersist { .. }));
    assert_eq!(store.attempts(), 2);
}
