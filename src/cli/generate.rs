//! `storyteller generate`: stream a chapter to the terminal and save it.

use std::error::Error;
use std::io::{self, Write};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::api::{Chapter, ChapterContent, Story};
use crate::cli::context::CliContext;
use crate::core::assistant::AssistantError;
use crate::core::generation::driver::{
    retry_persist, ChapterRequest, GenerationDriver, GenerationEvent, GenerationOutcome,
};
use crate::core::generation::{count_words, ChapterKey, GenerationPhase};
use crate::core::now_reading::NowReading;
use crate::core::prompts::{self, StoryContext};

const RETRY_DELAY: Duration = Duration::from_secs(2);

fn print_event(event: GenerationEvent) {
    match event {
        GenerationEvent::Fragment(text) => {
            print!("{text}");
            let _ = io::stdout().flush();
        }
        GenerationEvent::Phase(GenerationPhase::Streaming) => {
            eprintln!("✍️  {}", GenerationPhase::Streaming.label());
        }
        GenerationEvent::Phase(GenerationPhase::Finishing) => {
            println!();
            eprintln!("🎙️  {}", GenerationPhase::Finishing.label());
        }
        GenerationEvent::Phase(GenerationPhase::Cancelled) => {
            println!();
            eprintln!("⏹️  {}", GenerationPhase::Cancelled.label());
        }
        GenerationEvent::Phase(_) => {}
    }
}

/// Cancel `token` on Ctrl-C until the returned handle is aborted.
fn cancel_on_ctrl_c(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    })
}

pub async fn run_generate(
    ctx: &mut CliContext,
    story_id: &str,
    chapter_number: u32,
    retries: u32,
) -> Result<(), Box<dyn Error>> {
    let story = ctx.backend.get_story(story_id).await?;
    let chapter = story
        .chapter(chapter_number)
        .cloned()
        .ok_or_else(|| format!("Story '{}' has no chapter {chapter_number}", story.title))?;

    if chapter.has_content() {
        eprintln!("📖 Chapter {chapter_number} is already written.");
        println!("{}", chapter.content.raw.as_deref().unwrap_or_default());
        return Ok(());
    }

    let profile = ctx.profile().await?;
    let assistant_id =
        ctx.resolved
            .assistants
            .storyteller
            .clone()
            .ok_or(AssistantError::NotConfigured {
                job: "chapter writing",
                key: "storyteller-assistant",
            })?;
    let assistant = ctx.assistant();
    let prompt = prompts::chapter_content(&StoryContext::from(&story), &chapter)?;

    let key = ChapterKey::new(story.id.clone(), chapter_number);
    let request = ChapterRequest {
        key: key.clone(),
        has_stored_content: chapter.has_content(),
        session: assistant.session().clone(),
        assistant_id,
        prompt,
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel_on_ctrl_c(cancel.clone());
    let mut driver = GenerationDriver::new();
    let mut outcome = driver
        .generate(request, &ctx.backend, &profile.id, cancel, print_event)
        .await?;
    ctrl_c.abort();

    let mut attempt = 0;
    while let GenerationOutcome::PersistFailed { error } = &outcome {
        eprintln!("❌ {error}");
        if attempt >= retries {
            return Err(format!(
                "Chapter {chapter_number} was written but could not be saved. \
                 Re-run with --retries to try again."
            )
            .into());
        }
        attempt += 1;
        warn!(attempt, "retrying chapter save");
        tokio::time::sleep(RETRY_DELAY).await;
        let mut observer = print_event;
        outcome = retry_persist(
            &mut driver.generator,
            &key,
            &ctx.backend,
            &profile.id,
            &mut observer,
        )
        .await?;
    }

    match outcome {
        GenerationOutcome::Done { content, audio_url } => {
            eprintln!("✅ Saved {} words", count_words(&content));
            start_listening(&story, chapter, content, audio_url)?;
            Ok(())
        }
        GenerationOutcome::Cancelled => {
            driver.generator.reset(&key);
            Ok(())
        }
        GenerationOutcome::Failed { error } => Err(error.into()),
        GenerationOutcome::AlreadyGenerated => {
            eprintln!("📖 Chapter {chapter_number} is already written.");
            Ok(())
        }
        GenerationOutcome::PersistFailed { error } => Err(error.into()),
    }
}

fn start_listening(
    story: &Story,
    chapter: Chapter,
    content: String,
    audio_url: Option<String>,
) -> Result<(), Box<dyn Error>> {
    if let Some(url) = &audio_url {
        eprintln!("🎧 {}: {url}", GenerationPhase::Done.label());
    }
    let chapter = Chapter {
        content: ChapterContent {
            raw: Some(content),
            audio_url,
        },
        ..chapter
    };

    let mut now_reading = NowReading::load()?;
    now_reading.start_chapter(story, chapter);
    now_reading.save()?;
    Ok(())
}
