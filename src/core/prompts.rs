//! User messages sent to the hosted assistants.
//!
//! Each assistant carries its own instructions server-side; these messages
//! only supply the per-request context.

use serde::Serialize;

use crate::api::{Chapter, Genre, Story, StoryArt, TimePeriod};

const SUGGESTION_THEMES: &[&str] = &[
    "Personal transformation",
    "Divine intervention",
    "Family dynamics",
    "Tests of faith",
    "Leadership challenges",
    "Prophecy fulfillment",
];

pub fn story_suggestions(user_prompt: &str) -> String {
    let themes = SUGGESTION_THEMES
        .iter()
        .map(|theme| format!("- {theme}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Based on the user prompt: \"{user_prompt}\", either:\n\
         1. Create a compelling biblical story adaptation incorporating elements from the prompt, or\n\
         2. Suggest 12 uncommon and lesser-known Bible stories, including:\n\
         \x20  - A creative title for each story\n\
         \x20  - The biblical reference/passage\n\
         \x20  - A brief 2-line summary highlighting unique elements\n\
         \x20  - The category/theme it belongs to\n\n\
         The stories should be diverse in nature, spanning different themes like:\n\
         {themes}\n\n\
         For each story, focus on surprising narratives that aren't commonly referenced."
    )
}

pub fn story_setup(title: &str, passage: &str, genre: Genre, time_period: TimePeriod) -> String {
    format!(
        "create a story setup given the following initialising options\n\
         - story title: {title}\n\
         - passage: {passage}\n\
         - genre: {genre}\n\
         - time period: {time_period}"
    )
}

/// The slice of a story the storyteller needs; chapters and setup are left
/// out because the chapter being written is sent separately.
#[derive(Debug, Clone, Serialize)]
pub struct StoryContext<'a> {
    #[serde(rename = "_id")]
    pub id: &'a str,
    pub title: &'a str,
    pub summary: &'a str,
    pub passage: &'a str,
    pub owner: &'a str,
    pub story_art: &'a StoryArt,
}

impl<'a> From<&'a Story> for StoryContext<'a> {
    fn from(story: &'a Story) -> Self {
        Self {
            id: &story.id,
            title: &story.title,
            summary: &story.summary,
            passage: &story.passage,
            owner: &story.owner,
            story_art: &story.story_art,
        }
    }
}

pub fn chapter_content(story: &StoryContext<'_>, chapter: &Chapter) -> Result<String, serde_json::Error> {
    let story_json = serde_json::to_string(story)?;
    let chapter_json = serde_json::to_string(chapter)?;
    Ok(format!(
        "you have the context for the bible story:\n{story_json}\n\
         and the chapter settings are given in the chapter setup as:\n{chapter_json}"
    ))
}

/// Assistants often wrap JSON answers in a Markdown fence; strip it.
pub fn strip_code_fence(answer: &str) -> &str {
    let trimmed = answer.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}
