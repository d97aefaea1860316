use std::{path::Path, sync::Arc};

use ai_gateway::CreativeGateway;
use futures::future::try_join_all;
use shared::{
    domain::{
        GenerationItem, GenerationMode, HeadlineId, ImageStyle, ItemId, MediaKind,
        MediaPayload, Prompt, PromptField, Stage, TextLanguage,
    },
    error::GatewayFailure,
    messages::{Locale, UserMessage},
};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::{
    export::{self, ExportError},
    progress::ProgressTicker,
    state::{
        can_transition, permits, Action, MediaEdit, PromptEdit, TransitionError, WorkflowState,
    },
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    StageChanged { from: Stage, to: Stage },
    Failed { message: String },
}

pub fn compose_instruction(
    style: ImageStyle,
    language: Option<TextLanguage>,
    prompt: &Prompt,
) -> String {
    let mut instruction = format!("{}. {}", style.prompt_prefix(), prompt.english.trim());
    if let Some(language) = language {
        instruction.push(' ');
        instruction.push_str(language.directive());
    }
    instruction
}

/// Single owner of the workflow state. Every user action goes through one of
/// these methods; rejected preconditions return `TransitionError` and leave the
/// state untouched, while gateway failures are recorded as the current error and
/// send the workflow back to `Initial`.
pub struct Workflow<G: CreativeGateway + ?Sized> {
    gateway: Arc<G>,
    state: WorkflowState,
    locale: Locale,
    events: broadcast::Sender<WorkflowEvent>,
    progress: Arc<watch::Sender<f32>>,
}

impl<G: CreativeGateway + ?Sized> Workflow<G> {
    pub fn new(gateway: Arc<G>, locale: Locale) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (progress, _) = watch::channel(0.0);
        Self {
            gateway,
            state: WorkflowState::default(),
            locale,
            events,
            progress: Arc::new(progress),
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    pub fn selected_count(&self) -> usize {
        self.state.selected_count()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    pub fn progress(&self) -> watch::Receiver<f32> {
        self.progress.subscribe()
    }

    pub fn snapshot_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.state)
    }

    fn guard(&self, action: Action) -> Result<(), TransitionError> {
        let stage = self.state.stage;
        if permits(stage, action) {
            Ok(())
        } else {
            Err(TransitionError::NotAllowed { action, stage })
        }
    }

    fn enter(&mut self, to: Stage) {
        let from = self.state.stage;
        if from == to {
            return;
        }
        if !can_transition(from, to) {
            warn!(%from, %to, "stage change outside the transition table");
        }
        debug_assert!(can_transition(from, to), "illegal stage change {from} -> {to}");
        self.state.stage = to;
        info!(%from, %to, "workflow stage changed");
        let _ = self.events.send(WorkflowEvent::StageChanged { from, to });
    }

    fn fail(&mut self, failure: GatewayFailure) -> Stage {
        warn!(
            operation = ?failure.operation,
            code = ?failure.code,
            stage = %self.state.stage,
            "workflow step failed; returning to start"
        );
        let message = failure.message;
        self.progress.send_replace(0.0);
        self.clear_all();
        self.state.error = Some(message.clone());
        self.enter(Stage::Initial);
        let _ = self.events.send(WorkflowEvent::Failed { message });
        Stage::Initial
    }

    fn clear_all(&mut self) {
        self.state.headlines.clear();
        self.state.sources.clear();
        self.state.fetched_at = None;
        self.state.clear_generation();
        self.state.error = None;
    }

    pub async fn fetch_news(&mut self) -> Result<Stage, TransitionError> {
        self.guard(Action::FetchNews)?;
        self.state.error = None;
        self.enter(Stage::FetchingNews);

        let gateway = Arc::clone(&self.gateway);
        let batch = match gateway.fetch_headlines().await {
            Ok(batch) => batch,
            Err(failure) => return Ok(self.fail(failure)),
        };

        if batch.headlines.is_empty() {
            info!("headline fetch found no news");
            self.state.error = Some(UserMessage::NoNewsFound.render(self.locale));
            self.enter(Stage::Initial);
            return Ok(Stage::Initial);
        }

        self.state.headlines = batch
            .headlines
            .into_iter()
            .enumerate()
            .map(|(index, mut headline)| {
                headline.id = HeadlineId(index as u32);
                headline.is_selected = false;
                headline
            })
            .collect();
        self.state.sources = batch.sources;
        self.state.fetched_at = Some(batch.fetched_at);
        self.enter(Stage::NewsFetched);
        Ok(Stage::NewsFetched)
    }

    pub fn toggle_selection(&mut self, id: HeadlineId) -> Result<bool, TransitionError> {
        self.guard(Action::ToggleSelection)?;
        let headline = self
            .state
            .headlines
            .iter_mut()
            .find(|headline| headline.id == id)
            .ok_or(TransitionError::UnknownHeadline(id))?;
        headline.is_selected = !headline.is_selected;
        Ok(headline.is_selected)
    }

    pub async fn proceed_to_prompts(
        &mut self,
        mode: GenerationMode,
    ) -> Result<Stage, TransitionError> {
        self.guard(Action::ProceedToPrompts)?;
        let selected = self.state.selected_headlines();
        if selected.is_empty() {
            return Err(TransitionError::NothingSelected);
        }

        self.state.error = None;
        self.state.clear_generation();
        self.enter(Stage::GeneratingPrompts);

        let gateway = Arc::clone(&self.gateway);
        let outcome = match mode {
            GenerationMode::Merge => gateway.generate_prompt(&selected).await.map(|prompt| {
                vec![GenerationItem::new(
                    ItemId::merged(),
                    selected.clone(),
                    Some(prompt),
                )]
            }),
            GenerationMode::Individual => try_join_all(
                selected
                    .iter()
                    .map(|headline| gateway.generate_prompt(std::slice::from_ref(headline))),
            )
            .await
            .map(|prompts| {
                selected
                    .iter()
                    .zip(prompts)
                    .map(|(headline, prompt)| {
                        GenerationItem::new(
                            ItemId::for_headline(headline.id),
                            vec![headline.clone()],
                            Some(prompt),
                        )
                    })
                    .collect::<Vec<_>>()
            }),
        };

        match outcome {
            Ok(items) => {
                info!(?mode, items = items.len(), "prompts generated");
                self.state.items = items;
                self.enter(Stage::PromptsGenerated);
                Ok(Stage::PromptsGenerated)
            }
            Err(failure) => Ok(self.fail(failure)),
        }
    }

    pub fn begin_edit_prompt(&mut self, item_id: &ItemId) -> Result<(), TransitionError> {
        self.guard(Action::EditPrompt)?;
        let item = self
            .state
            .item(item_id)
            .ok_or_else(|| TransitionError::UnknownItem(item_id.clone()))?;
        let draft = item
            .prompt
            .clone()
            .ok_or_else(|| TransitionError::NoPrompt(item_id.clone()))?;
        self.state.prompt_edit = Some(PromptEdit {
            item_id: item_id.clone(),
            draft,
        });
        Ok(())
    }

    pub fn edit_prompt_text(
        &mut self,
        item_id: &ItemId,
        field: PromptField,
        value: impl Into<String>,
    ) -> Result<(), TransitionError> {
        self.guard(Action::EditPrompt)?;
        let edit = self
            .state
            .prompt_edit
            .as_mut()
            .ok_or(TransitionError::NoPromptEdit)?;
        if &edit.item_id != item_id {
            return Err(TransitionError::WrongPromptEdit {
                editing: edit.item_id.clone(),
                requested: item_id.clone(),
            });
        }
        edit.draft.set_field(field, value);
        Ok(())
    }

    pub fn save_prompt(&mut self) -> Result<(), TransitionError> {
        self.guard(Action::EditPrompt)?;
        let edit = self
            .state
            .prompt_edit
            .take()
            .ok_or(TransitionError::NoPromptEdit)?;
        match self.state.item_mut(&edit.item_id) {
            Some(item) => {
                item.prompt = Some(edit.draft);
                Ok(())
            }
            None => Err(TransitionError::UnknownItem(edit.item_id)),
        }
    }

    pub fn cancel_edit_prompt(&mut self) -> Result<(), TransitionError> {
        self.guard(Action::EditPrompt)?;
        self.state.prompt_edit = None;
        Ok(())
    }

    pub fn select_style(&mut self, style: ImageStyle) -> Result<(), TransitionError> {
        self.guard(Action::SelectStyle)?;
        self.state.style = Some(style);
        Ok(())
    }

    pub fn select_language(&mut self, language: TextLanguage) -> Result<(), TransitionError> {
        self.guard(Action::SelectStyle)?;
        self.state.language = Some(language);
        Ok(())
    }

    pub async fn generate_media(&mut self) -> Result<Stage, TransitionError> {
        self.guard(Action::GenerateMedia)?;
        let style = self.state.style.ok_or(TransitionError::StyleNotChosen)?;
        if let Some(edit) = &self.state.prompt_edit {
            return Err(TransitionError::PromptEditInProgress(edit.item_id.clone()));
        }
        if self.state.items.is_empty() {
            return Err(TransitionError::NoItems);
        }

        let language = self.state.language;
        let instructions: Vec<Option<String>> = self
            .state
            .items
            .iter()
            .map(|item| {
                item.prompt
                    .as_ref()
                    .map(|prompt| compose_instruction(style, language, prompt))
            })
            .collect();

        self.state.error = None;
        self.enter(Stage::GeneratingMedia);
        let ticker = ProgressTicker::start(Arc::clone(&self.progress));

        let gateway = Arc::clone(&self.gateway);
        let gateway = &gateway;
        let outcome = try_join_all(instructions.iter().map(|instruction| async move {
            match instruction {
                None => Ok(None),
                Some(text) if style.is_video() => gateway.generate_video(text).await.map(Some),
                Some(text) => gateway.generate_image(text).await.map(Some),
            }
        }))
        .await;

        match outcome {
            Ok(rendered) => {
                ticker.complete();
                for (item, media) in self.state.items.iter_mut().zip(rendered) {
                    if let Some(media) = media {
                        item.media_kind = Some(media.kind());
                        item.media_url = Some(media.to_data_url());
                    }
                }
                info!(%style, items = self.state.items.len(), "media generated");
                self.enter(Stage::MediaGenerated);
                Ok(Stage::MediaGenerated)
            }
            Err(failure) => {
                ticker.cancel();
                Ok(self.fail(failure))
            }
        }
    }

    pub fn start_edit_media(&mut self, item_id: &ItemId) -> Result<(), TransitionError> {
        self.guard(Action::EditMedia)?;
        if self.state.item(item_id).is_none() {
            return Err(TransitionError::UnknownItem(item_id.clone()));
        }
        self.state.media_edit = Some(MediaEdit {
            item_id: item_id.clone(),
            instruction: String::new(),
        });
        Ok(())
    }

    pub fn set_edit_instruction(
        &mut self,
        instruction: impl Into<String>,
    ) -> Result<(), TransitionError> {
        self.guard(Action::EditMedia)?;
        let edit = self
            .state
            .media_edit
            .as_mut()
            .ok_or(TransitionError::NoMediaEdit)?;
        edit.instruction = instruction.into();
        Ok(())
    }

    pub fn cancel_edit_media(&mut self) -> Result<(), TransitionError> {
        self.guard(Action::EditMedia)?;
        self.state.media_edit = None;
        Ok(())
    }

    pub async fn confirm_edit_media(&mut self) -> Result<Stage, TransitionError> {
        self.guard(Action::EditMedia)?;
        let edit = self
            .state
            .media_edit
            .clone()
            .ok_or(TransitionError::NoMediaEdit)?;
        let instruction = edit.instruction.trim();
        if instruction.is_empty() {
            return Err(TransitionError::EmptyInstruction);
        }
        let item = self
            .state
            .item(&edit.item_id)
            .ok_or_else(|| TransitionError::UnknownItem(edit.item_id.clone()))?;
        if item.media_kind == Some(MediaKind::Video) {
            return Err(TransitionError::MediaNotEditable(edit.item_id.clone()));
        }
        let image = item
            .media_url
            .as_deref()
            .and_then(MediaPayload::parse_data_url)
            .ok_or_else(|| TransitionError::NoMediaToEdit(edit.item_id.clone()))?;

        self.state.error = None;
        self.enter(Stage::EditingMedia);
        let ticker = ProgressTicker::start(Arc::clone(&self.progress));

        let gateway = Arc::clone(&self.gateway);
        match gateway.edit_image(&image, instruction).await {
            Ok(edited) => {
                ticker.complete();
                if let Some(item) = self.state.item_mut(&edit.item_id) {
                    item.media_kind = Some(edited.kind());
                    item.media_url = Some(edited.to_data_url());
                }
                self.state.media_edit = None;
                info!(item = %edit.item_id, "image edited");
                self.enter(Stage::MediaGenerated);
                Ok(Stage::MediaGenerated)
            }
            Err(failure) => {
                ticker.cancel();
                Ok(self.fail(failure))
            }
        }
    }

    pub async fn confirm_edit_media_with(
        &mut self,
        instruction: impl Into<String>,
    ) -> Result<Stage, TransitionError> {
        self.set_edit_instruction(instruction)?;
        self.confirm_edit_media().await
    }

    pub async fn export_media(
        &self,
        item_id: &ItemId,
        dir: &Path,
    ) -> Result<std::path::PathBuf, ExportFailure> {
        self.guard(Action::ExportMedia)?;
        let item = self
            .state
            .item(item_id)
            .ok_or_else(|| TransitionError::UnknownItem(item_id.clone()))?;
        Ok(export::export_media(item, dir).await?)
    }

    pub fn go_back_to_news(&mut self) -> Result<(), TransitionError> {
        self.guard(Action::GoBackToNews)?;
        self.state.clear_generation();
        self.state.error = None;
        self.progress.send_replace(0.0);
        self.enter(Stage::NewsFetched);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.clear_all();
        self.progress.send_replace(0.0);
        self.enter(Stage::Initial);
    }

    pub fn dismiss_error(&mut self) {
        self.reset();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportFailure {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
