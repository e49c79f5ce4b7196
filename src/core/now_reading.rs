//! Playback state for the chapter currently being read or listened to.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::{Chapter, Story, StoryArt};
use crate::core::state::{load_json, save_json, state_path, StateError};

const STATE_FILE: &str = "now_reading.json";
pub const DEFAULT_VOLUME: f32 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderTab {
    #[default]
    Cover,
    Content,
}

impl fmt::Display for ReaderTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderTab::Cover => f.write_str("cover"),
            ReaderTab::Content => f.write_str("content"),
        }
    }
}

impl FromStr for ReaderTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cover" => Ok(ReaderTab::Cover),
            "content" => Ok(ReaderTab::Content),
            other => Err(format!("Invalid tab: '{other}' (expected cover or content)")),
        }
    }
}

/// The parts of a story the player needs; chapters are not carried.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryRef {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub passage: String,
    #[serde(default)]
    pub story_art: StoryArt,
}

impl From<&Story> for StoryRef {
    fn from(story: &Story) -> Self {
        Self {
            id: story.id.clone(),
            title: story.title.clone(),
            summary: story.summary.clone(),
            passage: story.passage.clone(),
            story_art: story.story_art.clone(),
        }
    }
}

fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowReading {
    #[serde(default)]
    pub show: bool,
    #[serde(default)]
    pub current_story: Option<StoryRef>,
    #[serde(default)]
    pub current_chapter: Option<Chapter>,
    #[serde(default)]
    pub current_tab: ReaderTab,
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default = "default_volume")]
    volume: f32,
    #[serde(default)]
    seek: f64,
}

impl Default for NowReading {
    fn default() -> Self {
        Self {
            show: false,
            current_story: None,
            current_chapter: None,
            current_tab: ReaderTab::Cover,
            is_playing: false,
            volume: DEFAULT_VOLUME,
            seek: 0.0,
        }
    }
}

impl NowReading {
    pub fn state_path() -> Result<PathBuf, StateError> {
        state_path(STATE_FILE)
    }

    pub fn load() -> Result<Self, StateError> {
        Self::load_from_path(&Self::state_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, StateError> {
        let mut state: NowReading = load_json(path)?;
        // Hand-edited files may hold out-of-range values.
        state.set_volume(state.volume);
        state.set_seek(state.seek);
        Ok(state)
    }

    pub fn save(&self) -> Result<(), StateError> {
        self.save_to_path(&Self::state_path()?)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), StateError> {
        debug!(path = %path.display(), "saving now-reading state");
        save_json(path, self)
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn seek(&self) -> f64 {
        self.seek
    }

    pub fn set_show(&mut self, show: bool) {
        self.show = show;
    }

    pub fn toggle_show(&mut self) {
        self.show = !self.show;
    }

    pub fn set_story(&mut self, story: &Story) {
        self.current_story = Some(StoryRef::from(story));
    }

    pub fn set_chapter(&mut self, chapter: Chapter) {
        self.current_chapter = Some(chapter);
    }

    pub fn set_tab(&mut self, tab: ReaderTab) {
        self.current_tab = tab;
    }

    pub fn play(&mut self) {
        self.is_playing = true;
    }

    pub fn pause(&mut self) {
        self.is_playing = false;
    }

    pub fn toggle_playing(&mut self) {
        self.is_playing = !self.is_playing;
    }

    /// Clamped to `0.0..=1.0`; NaN falls back to the default.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_nan() {
            DEFAULT_VOLUME
        } else {
            volume.clamp(0.0, 1.0)
        };
    }

    /// Seconds into the narration; negative or non-finite values become 0.
    pub fn set_seek(&mut self, seconds: f64) {
        self.seek = if seconds.is_finite() {
            seconds.max(0.0)
        } else {
            0.0
        };
    }

    /// Begin playback of a freshly narrated chapter from the start.
    pub fn start_chapter(&mut self, story: &Story, chapter: Chapter) {
        self.set_story(story);
        self.set_seek(0.0);
        self.play();
        self.set_chapter(chapter);
        self.set_show(true);
    }

    /// Lines for `storyteller now-reading`.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match (&self.current_story, &self.current_chapter) {
            (Some(story), Some(chapter)) => lines.push(format!(
                "{} - Chapter {}: {}",
                story.title, chapter.chapter_number, chapter.title
            )),
            (Some(story), None) => lines.push(story.title.clone()),
            _ => lines.push("Nothing is playing".to_string()),
        }
        if let Some(url) = self
            .current_chapter
            .as_ref()
            .and_then(|chapter| chapter.content.audio_url.as_deref())
        {
            lines.push(format!("  audio: {url}"));
        }
        lines.push(format!(
            "  {} at {:.0}s, volume {:.0}%, tab {}, {}",
            if self.is_playing { "playing" } else { "paused" },
            self.seek,
            self.volume * 100.0,
            self.current_tab,
            if self.show { "shown" } else { "hidden" },
        ));
        lines
    }
}
