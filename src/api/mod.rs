//! Wire payloads for the story backend.
//!
//! The backend stores documents with Mongo-style `_id` keys and camelCase
//! timestamps; everything else is snake_case. Payloads are lenient on input:
//! missing collections deserialize as empty so partially initialised stories
//! (no setup, no chapters yet) still load.

pub mod assistant;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error returned when a settings value does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub field: &'static str,
    pub input: String,
    pub allowed: &'static [&'static str],
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid {}: '{}' (expected one of: {})",
            self.field,
            self.input,
            self.allowed.join(", ")
        )
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal, default = $default:ident,
        { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
            pub const WIRE_NAMES: &'static [&'static str] = &[$($wire),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim().to_ascii_lowercase();
                match needle.as_str() {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(UnknownVariant {
                        field: $field,
                        input: s.to_string(),
                        allowed: Self::WIRE_NAMES,
                    }),
                }
            }
        }
    };
}

wire_enum!(
    /// Story genre offered when configuring a new story.
    Genre, "genre", default = Fantasy,
    {
        Fantasy => "fantasy",
        SciFi => "sci-fi",
        Mystery => "mystery",
        Horror => "horror",
        Romance => "romance",
    }
);

wire_enum!(
    /// Target story length. The backend stores `short` when unset.
    StoryLength, "length", default = Short,
    {
        Short => "short",
        Medium => "medium",
        Long => "long",
    }
);

wire_enum!(
    TimePeriod, "time period", default = Modern,
    {
        Modern => "modern",
        Historical => "historical",
        SpaceAge => "space-age",
        Magical => "magical",
    }
);

wire_enum!(
    /// Whether chapters are laid out from the source passage or invented freely.
    StoryMode, "mode", default = Original,
    {
        Original => "original",
        Generated => "generated",
    }
);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitOptions {
    #[serde(default)]
    pub genre: Genre,
    #[serde(default)]
    pub length: StoryLength,
    #[serde(default, rename = "timePeriod")]
    pub time_period: TimePeriod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<StoryMode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryArt {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub image_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub setting: String,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub conflict: String,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub plot_points: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChapterSetup {
    #[serde(default)]
    pub pov_character: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

/// Generated prose for a chapter plus the narration rendered from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChapterContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub chapter_number: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub content: ChapterContent,
    #[serde(default)]
    pub setup: ChapterSetup,
}

impl Chapter {
    /// True once prose has been persisted for this chapter.
    pub fn has_content(&self) -> bool {
        self.content
            .raw
            .as_deref()
            .is_some_and(|raw| !raw.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Story {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub passage: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub story_art: StoryArt,
    #[serde(default, rename = "initOptions")]
    pub init_options: InitOptions,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    /// Analysis, characters, plot, world and themes produced by the setup
    /// assistant. Kept opaque: the shape is owned by the assistant prompt.
    #[serde(default)]
    pub setup: Value,
    #[serde(default)]
    pub initialized: bool,
    #[serde(default, rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Story {
    pub fn chapter(&self, chapter_number: u32) -> Option<&Chapter> {
        self.chapters
            .iter()
            .find(|chapter| chapter.chapter_number == chapter_number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Mod,
    Admin,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_names: Option<String>,
    pub email: String,
    #[serde(default)]
    pub profile_img: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_id: Option<String>,
}

impl Profile {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        full.trim().to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateStoryRequest {
    pub title: String,
    pub passage: String,
    pub owner: String,
    pub summary: String,
    #[serde(rename = "initOptions")]
    pub init_options: InitOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub auth_id: String,
    pub email: String,
    pub profile_img: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OriginalChaptersRequest {
    pub story_id: String,
    pub title: String,
    pub summary: String,
    pub passage: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddChapterContentRequest {
    pub chapter_number: u32,
    pub content: String,
    pub owner: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestTitlesRequest {
    pub prompt: String,
}

/// `{ success?, error?, ...payload }` as returned by the backend's write routes.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(flatten)]
    pub payload: T,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChapterContentSaved {
    #[serde(default)]
    pub audio_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OriginalChapters {
    #[serde(default, rename = "chapterData")]
    pub chapter_data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorySuggestion {
    pub title: String,
    pub summary: String,
    pub passage: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorySuggestions {
    #[serde(default)]
    pub response: Vec<StorySuggestion>,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_deserializes_backend_document() {
        let raw = r#"{
            "_id": "65f0c0ffee",
            "title": "The Quiet Prophet",
            "passage": "Jonah 1-4",
            "owner": "64aa",
            "initOptions": {"genre": "sci-fi", "length": "long", "timePeriod": "space-age", "mode": "original"},
            "chapters": [
                {"chapter_number": 1, "title": "Storm", "tagline": "Run", "content": {"raw": "It rained."},
                 "setup": {"pov_character": "Jonah", "synopsis": "Flight", "scenes": [{"goal": "escape", "characters": ["Jonah"]}]}}
            ],
            "initialized": true,
            "createdAt": "2024-03-01T10:00:00Z"
        }"#;

        let story: Story = serde_json::from_str(raw).expect("story should parse");
        assert_eq!(story.id, "65f0c0ffee");
        assert_eq!(story.init_options.genre, Genre::SciFi);
        assert_eq!(story.init_options.time_period, TimePeriod::SpaceAge);
        assert_eq!(story.init_options.mode, Some(StoryMode::Original));
        assert!(story.initialized);
        assert!(story.created_at.is_some());

        let chapter = story.chapter(1).expect("chapter 1");
        assert!(chapter.has_content());
        assert_eq!(chapter.setup.scenes[0].characters, vec!["Jonah".to_string()]);
        assert!(story.chapter(2).is_none());
    }

    #[test]
    fn story_tolerates_missing_collections() {
        let story: Story =
            serde_json::from_str(r#"{"_id": "1", "title": "Bare"}"#).expect("bare story");
        assert!(story.chapters.is_empty());
        assert_eq!(story.init_options.length, StoryLength::Short);
        assert!(!story.initialized);
    }

    #[test]
    fn blank_raw_content_is_not_content() {
        let chapter = Chapter {
            chapter_number: 3,
            content: ChapterContent {
                raw: Some("   \n".into()),
                audio_url: None,
            },
            ..Chapter::default()
        };
        assert!(!chapter.has_content());
    }

    #[test]
    fn enum_parsing_is_case_insensitive_and_reports_allowed_values() {
        assert_eq!("Sci-Fi".parse::<Genre>(), Ok(Genre::SciFi));
        assert_eq!(" space-age ".parse::<TimePeriod>(), Ok(TimePeriod::SpaceAge));

        let err = "western".parse::<Genre>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid genre: 'western' (expected one of: fantasy, sci-fi, mystery, horror, romance)"
        );
    }

    #[test]
    fn create_story_request_uses_camel_case_options() {
        let request = CreateStoryRequest {
            title: "T".into(),
            passage: "P".into(),
            owner: "O".into(),
            summary: "S".into(),
            init_options: InitOptions {
                genre: Genre::Horror,
                length: StoryLength::Medium,
                time_period: TimePeriod::Historical,
                mode: None,
            },
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["initOptions"]["timePeriod"], "historical");
        assert_eq!(value["initOptions"]["genre"], "horror");
        assert!(value["initOptions"].get("mode").is_none());
    }

    #[test]
    fn envelope_flattens_payload() {
        let saved: Envelope<ChapterContentSaved> =
            serde_json::from_str(r#"{"success": true, "audio_url": "https://cdn/a.mp3"}"#)
                .expect("envelope");
        assert_eq!(saved.success, Some(true));
        assert_eq!(saved.payload.audio_url.as_deref(), Some("https://cdn/a.mp3"));
    }
}
