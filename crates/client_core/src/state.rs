//! Workflow state and the stage transition table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::{
    GenerationItem, Headline, HeadlineId, ImageStyle, ItemId, Prompt, Source, Stage,
    TextLanguage,
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    FetchNews,
    ToggleSelection,
    ProceedToPrompts,
    EditPrompt,
    SelectStyle,
    GenerateMedia,
    EditMedia,
    ExportMedia,
    GoBackToNews,
}

pub fn permits(stage: Stage, action: Action) -> bool {
    use Action::*;

    match stage {
        Stage::Initial => action == FetchNews,
        Stage::NewsFetched => matches!(action, ToggleSelection | ProceedToPrompts),
        Stage::PromptsGenerated => matches!(
            action,
            EditPrompt | SelectStyle | GenerateMedia | GoBackToNews
        ),
        Stage::MediaGenerated => matches!(action, EditMedia | ExportMedia | GoBackToNews),
        Stage::GeneratingPrompts | Stage::GeneratingMedia | Stage::EditingMedia => {
            action == GoBackToNews
        }
        Stage::FetchingNews => false,
    }
}

pub fn can_transition(from: Stage, to: Stage) -> bool {
    if to == Stage::Initial {
        return true;
    }
    matches!(
        (from, to),
        (Stage::Initial, Stage::FetchingNews)
            | (Stage::FetchingNews, Stage::NewsFetched)
            | (Stage::NewsFetched, Stage::GeneratingPrompts)
            | (Stage::GeneratingPrompts, Stage::PromptsGenerated)
            | (Stage::GeneratingPrompts, Stage::NewsFetched)
            | (Stage::PromptsGenerated, Stage::GeneratingMedia)
            | (Stage::PromptsGenerated, Stage::NewsFetched)
            | (Stage::GeneratingMedia, Stage::MediaGenerated)
            | (Stage::GeneratingMedia, Stage::NewsFetched)
            | (Stage::MediaGenerated, Stage::EditingMedia)
            | (Stage::MediaGenerated, Stage::NewsFetched)
            | (Stage::EditingMedia, Stage::MediaGenerated)
            | (Stage::EditingMedia, Stage::NewsFetched)
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("{action:?} is not allowed in stage {stage}")]
    NotAllowed { action: Action, stage: Stage },
    #[error("no headline with id {0}")]
    UnknownHeadline(HeadlineId),
    #[error("no generation item with id {0}")]
    UnknownItem(ItemId),
    #[error("select at least one headline first")]
    NothingSelected,
    #[error("there are no generation items")]
    NoItems,
    #[error("choose a style before generating")]
    StyleNotChosen,
    #[error("item {0} has no prompt")]
    NoPrompt(ItemId),
    #[error("the prompt of item {0} is still being edited")]
    PromptEditInProgress(ItemId),
    #[error("no prompt is being edited")]
    NoPromptEdit,
    #[error("item {requested} is not being edited (editing {editing})")]
    WrongPromptEdit { editing: ItemId, requested: ItemId },
    #[error("no image is being edited")]
    NoMediaEdit,
    #[error("edit instruction must not be empty")]
    EmptyInstruction,
    #[error("item {0} has no image to edit")]
    NoMediaToEdit(ItemId),
    #[error("item {0} holds a video, which cannot be edited")]
    MediaNotEditable(ItemId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptEdit {
    pub item_id: ItemId,
    pub draft: Prompt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaEdit {
    pub item_id: ItemId,
    pub instruction: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub stage: Stage,
    pub headlines: Vec<Headline>,
    pub sources: Vec<Source>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub items: Vec<GenerationItem>,
    pub style: Option<ImageStyle>,
    pub language: Option<TextLanguage>,
    pub error: Option<String>,
    pub prompt_edit: Option<PromptEdit>,
    pub media_edit: Option<MediaEdit>,
}

impl WorkflowState {
    pub fn selected_headlines(&self) -> Vec<Headline> {
        self.headlines
            .iter()
            .filter(|headline| headline.is_selected)
            .cloned()
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.headlines.iter().filter(|h| h.is_selected).count()
    }

    pub fn sorted_headlines(&self) -> Vec<&Headline> {
        let mut sorted: Vec<&Headline> = self.headlines.iter().collect();
        sorted.sort_by(|a, b| b.rating.cmp(&a.rating));
        sorted
    }

    pub fn item(&self, id: &ItemId) -> Option<&GenerationItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub(crate) fn item_mut(&mut self, id: &ItemId) -> Option<&mut GenerationItem> {
        self.items.iter_mut().find(|item| &item.id == id)
    }

    pub(crate) fn clear_generation(&mut self) {
        self.items.clear();
        self.style = None;
        self.language = None;
        self.prompt_edit = None;
        self.media_edit = None;
    }
}
