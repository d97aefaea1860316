use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(HeadlineId);

/// Identity of one generation item: `"merged"` for a merge batch, the headline
/// id for individual items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl ItemId {
    pub const MERGED: &'static str = "merged";

    pub fn merged() -> Self {
        Self(Self::MERGED.to_string())
    }

    pub fn for_headline(id: HeadlineId) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub id: HeadlineId,
    pub title: String,
    pub summary: String,
    pub source_url: String,
    pub source_title: String,
    /// Interest rating, always within `1..=5`.
    pub rating: u8,
    #[serde(default)]
    pub is_selected: bool,
}

/// Grounding citation attached to a fetched batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Generation language.
    pub english: String,
    /// Display language.
    pub chinese: String,
}

impl Prompt {
    pub fn set_field(&mut self, field: PromptField, value: impl Into<String>) {
        match field {
            PromptField::English => self.english = value.into(),
            PromptField::Chinese => self.chinese = value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptField {
    English,
    Chinese,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_mime_type(mime_type: &str) -> Self {
        if mime_type.starts_with("video/") {
            Self::Video
        } else {
            Self::Image
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationItem {
    pub id: ItemId,
    pub sources: Vec<Headline>,
    pub prompt: Option<Prompt>,
    pub media_url: Option<String>,
    pub media_kind: Option<MediaKind>,
}

impl GenerationItem {
    pub fn new(id: ItemId, sources: Vec<Headline>, prompt: Option<Prompt>) -> Self {
        Self {
            id,
            sources,
            prompt,
            media_url: None,
            media_kind: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStyle {
    Realistic,
    OilPainting,
    Cartoon,
    Watercolor,
    Illustration,
    Chalkboard,
    ConceptArt,
    VisualGuide,
    DynamicVideo,
}

impl ImageStyle {
    pub const ALL: [ImageStyle; 9] = [
        ImageStyle::Realistic,
        ImageStyle::OilPainting,
        ImageStyle::Cartoon,
        ImageStyle::Watercolor,
        ImageStyle::Illustration,
        ImageStyle::Chalkboard,
        ImageStyle::ConceptArt,
        ImageStyle::VisualGuide,
        ImageStyle::DynamicVideo,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ImageStyle::Realistic => "寫實",
            ImageStyle::OilPainting => "油畫",
            ImageStyle::Cartoon => "卡通",
            ImageStyle::Watercolor => "水彩",
            ImageStyle::Illustration => "插畫",
            ImageStyle::Chalkboard => "黑板彩色",
            ImageStyle::ConceptArt => "概念藝術",
            ImageStyle::VisualGuide => "視覺引導",
            ImageStyle::DynamicVideo => "動態影像",
        }
    }

    /// Descriptive text prefixed to the generation-language prompt.
    pub fn prompt_prefix(self) -> &'static str {
        match self {
            ImageStyle::Realistic => "Photorealistic, cinematic style",
            ImageStyle::OilPainting => "An expressive oil painting",
            ImageStyle::Cartoon => "A vibrant, detailed cartoon style",
            ImageStyle::Watercolor => "A beautiful watercolor painting",
            ImageStyle::Illustration => "A polished editorial illustration with clean shapes",
            ImageStyle::Chalkboard => "A colorful chalk drawing on a dark blackboard",
            ImageStyle::ConceptArt => "Epic cinematic concept art with dramatic lighting",
            ImageStyle::VisualGuide => {
                "A visual-facilitation sketchnote with simple icons, arrows and grouped ideas"
            }
            ImageStyle::DynamicVideo => "A dynamic, cinematic video shot with smooth camera motion",
        }
    }

    pub fn is_video(self) -> bool {
        matches!(self, ImageStyle::DynamicVideo)
    }
}

impl fmt::Display for ImageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Preferred language for any lettering rendered inside the picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextLanguage {
    None,
    TraditionalChinese,
    English,
}

impl TextLanguage {
    pub fn label(self) -> &'static str {
        match self {
            TextLanguage::None => "無文字",
            TextLanguage::TraditionalChinese => "繁體中文",
            TextLanguage::English => "英文",
        }
    }

    pub fn directive(self) -> &'static str {
        match self {
            TextLanguage::None => "Do not render any text, letters or logos in the image.",
            TextLanguage::TraditionalChinese => {
                "Any text shown in the image must be written in Traditional Chinese."
            }
            TextLanguage::English => "Any text shown in the image must be written in English.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    Merge,
    Individual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Initial,
    FetchingNews,
    NewsFetched,
    GeneratingPrompts,
    PromptsGenerated,
    GeneratingMedia,
    MediaGenerated,
    EditingMedia,
}

impl Stage {
    /// Stages during which a gateway call is outstanding.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            Stage::FetchingNews
                | Stage::GeneratingPrompts
                | Stage::GeneratingMedia
                | Stage::EditingMedia
        )
    }

    pub fn shows_progress(self) -> bool {
        matches!(self, Stage::GeneratingMedia | Stage::EditingMedia)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Initial => "initial",
            Stage::FetchingNews => "fetching_news",
            Stage::NewsFetched => "news_fetched",
            Stage::GeneratingPrompts => "generating_prompts",
            Stage::PromptsGenerated => "prompts_generated",
            Stage::GeneratingMedia => "generating_media",
            Stage::MediaGenerated => "media_generated",
            Stage::EditingMedia => "editing_media",
        };
        f.write_str(name)
    }
}

/// Self-contained media reference: MIME type plus base64 payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPayload {
    pub mime_type: String,
    pub data_b64: String,
}

impl MediaPayload {
    pub const DEFAULT_MIME_TYPE: &'static str = "image/jpeg";

    pub fn new(mime_type: impl Into<String>, data_b64: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data_b64: data_b64.into(),
        }
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data_b64)
    }

    /// Splits a `data:<mime>;base64,<payload>` URL. A header without a MIME type
    /// falls back to [`Self::DEFAULT_MIME_TYPE`].
    pub fn parse_data_url(url: &str) -> Option<Self> {
        let (header, data) = url.split_once(',')?;
        if data.is_empty() {
            return None;
        }
        let mime_type = header
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .filter(|mime| !mime.is_empty())
            .unwrap_or(Self::DEFAULT_MIME_TYPE);
        Some(Self::new(mime_type, data))
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::from_mime_type(&self.mime_type)
    }
}
