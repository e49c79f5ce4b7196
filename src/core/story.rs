//! Creating stories and summarising a library.

use std::error::Error;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::api::{
    CreateStoryRequest, Genre, InitOptions, Story, StoryLength, StoryMode, TimePeriod,
    UnknownVariant,
};
use crate::core::generation::count_words;

/// The options chosen before a story is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorySettings {
    pub genre: Genre,
    pub length: StoryLength,
    pub time_period: TimePeriod,
}

impl Default for StorySettings {
    fn default() -> Self {
        Self {
            genre: Genre::Fantasy,
            length: StoryLength::Medium,
            time_period: TimePeriod::Modern,
        }
    }
}

impl StorySettings {
    /// Parse user-supplied values; `None` keeps the default for that field.
    pub fn parse(
        genre: Option<&str>,
        length: Option<&str>,
        time_period: Option<&str>,
    ) -> Result<Self, UnknownVariant> {
        let defaults = Self::default();
        Ok(Self {
            genre: genre.map(str::parse::<Genre>).transpose()?.unwrap_or(defaults.genre),
            length: length.map(str::parse::<StoryLength>).transpose()?.unwrap_or(defaults.length),
            time_period: time_period
                .map(str::parse::<TimePeriod>)
                .transpose()?
                .unwrap_or(defaults.time_period),
        })
    }

    pub fn init_options(self, mode: Option<StoryMode>) -> InitOptions {
        InitOptions {
            genre: self.genre,
            length: self.length,
            time_period: self.time_period,
            mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryError {
    BlankTitle,
    BlankPassage,
}

impl fmt::Display for StoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoryError::BlankTitle => write!(f, "A story needs a title"),
            StoryError::BlankPassage => write!(f, "A story needs a source passage"),
        }
    }
}

impl Error for StoryError {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewStory {
    pub title: String,
    pub summary: String,
    pub passage: String,
    pub category: Option<String>,
}

impl NewStory {
    pub fn validate(&self) -> Result<(), StoryError> {
        if self.title.trim().is_empty() {
            return Err(StoryError::BlankTitle);
        }
        if self.passage.trim().is_empty() {
            return Err(StoryError::BlankPassage);
        }
        Ok(())
    }

    pub fn into_request(
        self,
        owner: &str,
        settings: StorySettings,
        mode: Option<StoryMode>,
    ) -> Result<CreateStoryRequest, StoryError> {
        self.validate()?;
        Ok(CreateStoryRequest {
            title: self.title.trim().to_string(),
            passage: self.passage.trim().to_string(),
            owner: owner.to_string(),
            summary: self.summary.trim().to_string(),
            init_options: settings.init_options(mode),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorySummary {
    pub id: String,
    pub title: String,
    pub chapters: usize,
    pub generated: usize,
    pub words: usize,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Story> for StorySummary {
    fn from(story: &Story) -> Self {
        let generated: Vec<&str> = story
            .chapters
            .iter()
            .filter(|chapter| chapter.has_content())
            .filter_map(|chapter| chapter.content.raw.as_deref())
            .collect();
        Self {
            id: story.id.clone(),
            title: story.title.clone(),
            chapters: story.chapters.len(),
            generated: generated.len(),
            words: generated.iter().map(|raw| count_words(raw)).sum(),
            updated_at: story.updated_at.or(story.created_at),
        }
    }
}

impl StorySummary {
    pub fn line(&self) -> String {
        format!(
            "{}  {}  ({}/{} chapters, {} words)",
            self.id, self.title, self.generated, self.chapters, self.words
        )
    }
}

/// Most recently touched stories first; undated stories keep their order at
/// the end.
pub fn summarize_library(stories: &[Story]) -> Vec<StorySummary> {
    let mut summaries: Vec<StorySummary> = stories.iter().map(StorySummary::from).collect();
    summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Chapter, ChapterContent};
    use chrono::TimeZone;

    fn chapter(number: u32, raw: Option<&str>) -> Chapter {
        Chapter {
            chapter_number: number,
            content: ChapterContent {
                raw: raw.map(str::to_owned),
                audio_url: None,
            },
            ..Chapter::default()
        }
    }

    #[test]
    fn settings_default_to_fantasy_medium_modern() {
        let settings = StorySettings::default();
        assert_eq!(settings.genre, Genre::Fantasy);
        assert_eq!(settings.length, StoryLength::Medium);
        assert_eq!(settings.time_period, TimePeriod::Modern);
        assert_eq!(StorySettings::parse(None, None, None), Ok(settings));
    }

    #[test]
    fn settings_parse_user_values() {
        let settings =
            StorySettings::parse(Some("Sci-Fi"), Some("long"), Some("space-age")).expect("parse");
        assert_eq!(settings.genre, Genre::SciFi);
        assert_eq!(settings.length, StoryLength::Long);
        assert_eq!(settings.time_period, TimePeriod::SpaceAge);
    }

    #[test]
    fn unknown_setting_lists_allowed_values() {
        let err = StorySettings::parse(None, None, Some("jurassic")).expect_err("invalid");
        assert_eq!(
            err.to_string(),
            "Invalid time period: 'jurassic' (expected one of: modern, historical, space-age, magical)"
        );
    }

    #[test]
    fn blank_title_or_passage_is_rejected() {
        let mut story = NewStory {
            title: " ".into(),
            passage: "Jonah 1".into(),
            ..NewStory::default()
        };
        assert_eq!(story.validate(), Err(StoryError::BlankTitle));
        story.title = "Storm".into();
        story.passage = "\n".into();
        assert_eq!(story.validate(), Err(StoryError::BlankPassage));
    }

    #[test]
    fn request_carries_owner_and_settings() {
        let story = NewStory {
            title: " Storm ".into(),
            summary: "A prophet runs".into(),
            passage: "Jonah 1".into(),
            category: Some("Tests of faith".into()),
        };
        let request = story
            .into_request("p-1", StorySettings::default(), Some(StoryMode::Original))
            .expect("request");
        assert_eq!(request.title, "Storm");
        assert_eq!(request.owner, "p-1");
        assert_eq!(request.init_options.length, StoryLength::Medium);
        let json = serde_json::to_value(&request).expect("json");
        assert_eq!(json["initOptions"]["timePeriod"], "modern");
        assert_eq!(json["initOptions"]["mode"], "original");
    }

    #[test]
    fn summaries_count_generated_chapters_and_words() {
        let older = Story {
            id: "a".into(),
            title: "Older".into(),
            chapters: vec![
                chapter(1, Some("Three small words")),
                chapter(2, Some("   ")),
                chapter(3, None),
            ],
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single(),
            ..Story::default()
        };
        let newer = Story {
            id: "b".into(),
            title: "Newer".into(),
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).single(),
            ..Story::default()
        };
        let undated = Story {
            id: "c".into(),
            title: "Undated".into(),
            ..Story::default()
        };

        let summaries = summarize_library(&[undated, older, newer]);
        let ids: Vec<&str> = summaries.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);

        let older = &summaries[1];
        assert_eq!((older.chapters, older.generated, older.words), (3, 1, 3));
        assert_eq!(older.line(), "a  Older  (1/3 chapters, 3 words)");
    }
}
