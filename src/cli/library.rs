//! Story commands: ideas, creation, chapter layout and browsing.

use std::error::Error;

use crate::api::{OriginalChaptersRequest, Story, StoryMode, StorySuggestions};
use crate::cli::context::CliContext;
use crate::core::story::{summarize_library, NewStory, StorySettings};

pub struct CreateArgs {
    pub title: String,
    pub passage: String,
    pub summary: String,
    pub category: Option<String>,
    pub genre: Option<String>,
    pub length: Option<String>,
    pub time_period: Option<String>,
    pub mode: Option<String>,
}

pub fn format_suggestions(suggestions: &StorySuggestions) -> Vec<String> {
    let mut lines = Vec::new();
    for (index, idea) in suggestions.response.iter().enumerate() {
        lines.push(format!("{:>2}. {} ({})", index + 1, idea.title, idea.passage));
        if !idea.category.is_empty() {
            lines.push(format!("    [{}]", idea.category));
        }
        lines.push(format!("    {}", idea.summary));
    }
    if lines.is_empty() {
        lines.push("No suggestions returned.".to_string());
    }
    lines
}

pub async fn run_suggest(
    ctx: &CliContext,
    prompt: Vec<String>,
    via_backend: bool,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    let prompt = Some(prompt.as_str()).filter(|p| !p.trim().is_empty());

    let suggestions = if via_backend {
        ctx.backend.suggest_story_titles(prompt).await?
    } else {
        ctx.assistant()
            .suggest_story_titles(
                ctx.resolved.assistants.suggestions.as_deref(),
                prompt.unwrap_or(crate::core::backend::DEFAULT_SUGGESTION_PROMPT),
            )
            .await?
    };

    for line in format_suggestions(&suggestions) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_create(ctx: &mut CliContext, args: CreateArgs) -> Result<(), Box<dyn Error>> {
    let settings = StorySettings::parse(
        args.genre.as_deref(),
        args.length.as_deref(),
        args.time_period.as_deref(),
    )?;
    let mode = args
        .mode
        .as_deref()
        .map(str::parse::<StoryMode>)
        .transpose()?;
    let new_story = NewStory {
        title: args.title,
        summary: args.summary,
        passage: args.passage,
        category: args.category,
    };
    new_story.validate()?;

    let profile = ctx.profile().await?;
    let request = new_story.into_request(&profile.id, settings, mode)?;
    let story = ctx.backend.create_story(&request).await?;

    println!("✅ Created story '{}' ({})", story.title, story.id);
    println!("   Next: storyteller setup {}", story.id);
    Ok(())
}

pub async fn run_setup(
    ctx: &CliContext,
    story_id: &str,
    with_analysis: bool,
) -> Result<(), Box<dyn Error>> {
    let story = ctx.backend.get_story(story_id).await?;

    if with_analysis {
        let setup = ctx
            .assistant()
            .initialise_story_setup(
                ctx.resolved.assistants.setup.as_deref(),
                &story.title,
                &story.passage,
                story.init_options.genre,
                story.init_options.time_period,
            )
            .await?;
        println!("{}", serde_json::to_string_pretty(&setup)?);
    }

    if story.initialized && !story.chapters.is_empty() {
        eprintln!("📚 Chapters are already laid out.");
    } else {
        eprintln!("📐 Creating chapter setup...");
        ctx.backend
            .get_original_story_chapters(&OriginalChaptersRequest {
                story_id: story.id.clone(),
                title: story.title.clone(),
                summary: story.summary.clone(),
                passage: story.passage.clone(),
            })
            .await?;
    }

    let story = ctx.backend.get_story(story_id).await?;
    for line in chapter_lines(&story) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_library(ctx: &mut CliContext) -> Result<(), Box<dyn Error>> {
    let profile = ctx.profile().await?;
    let stories = ctx.backend.get_user_stories(&profile.id).await?;
    if stories.is_empty() {
        println!("Your library is empty. Try 'storyteller suggest' for ideas.");
        return Ok(());
    }
    for summary in summarize_library(&stories) {
        println!("{}", summary.line());
    }
    Ok(())
}

pub fn chapter_lines(story: &Story) -> Vec<String> {
    if story.chapters.is_empty() {
        return vec!["This story has no chapters generated yet.".to_string()];
    }
    story
        .chapters
        .iter()
        .map(|chapter| {
            let status = match (&chapter.content.audio_url, chapter.has_content()) {
                (Some(_), true) => "narrated",
                (None, true) => "written",
                _ => "not written",
            };
            format!(
                "  {:>2}. {} - {} [{status}]",
                chapter.chapter_number, chapter.title, chapter.tagline
            )
        })
        .collect()
}

pub async fn run_show(ctx: &CliContext, story_id: &str) -> Result<(), Box<dyn Error>> {
    let story = ctx.backend.get_story(story_id).await?;
    println!("{}", story.title);
    if !story.passage.is_empty() {
        println!("  passage: {}", story.passage);
    }
    let options = &story.init_options;
    println!(
        "  {} / {} / {}",
        options.genre, options.length, options.time_period
    );
    if !story.summary.is_empty() {
        println!();
        println!("{}", story.summary);
    }
    println!();
    for line in chapter_lines(&story) {
        println!("{line}");
    }
    Ok(())
}
