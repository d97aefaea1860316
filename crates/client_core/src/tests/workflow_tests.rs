use super::*;
use std::sync::Arc;

use ai_gateway::{CreativeGateway, NewsBatch};
use async_trait::async_trait;
use chrono::Utc;
use shared::{
    domain::{
        GenerationMode, Headline, HeadlineId, ImageStyle, ItemId, MediaKind, MediaPayload,
        Prompt, PromptField, Source, Stage, TextLanguage,
    },
    error::{ErrorCode, GatewayFailure, Operation},
    messages::{Locale, UserMessage},
};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Fetch,
    Prompt(Vec<String>),
    Image(String),
    Video(String),
    Edit { image: MediaPayload, instruction: String },
}

struct ScriptedGateway {
    headlines: Vec<(String, u8)>,
    fetch_failure: Option<GatewayFailure>,
    fail_prompt_for: Option<String>,
    fail_media: bool,
    fail_edit: bool,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedGateway {
    fn with_headlines(headlines: &[(&str, u8)]) -> Self {
        Self {
            headlines: headlines
                .iter()
                .map(|(title, rating)| (title.to_string(), *rating))
                .collect(),
            fetch_failure: None,
            fail_prompt_for: None,
            fail_media: false,
            fail_edit: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing_fetch(failure: GatewayFailure) -> Self {
        let mut gateway = Self::with_headlines(&[]);
        gateway.fetch_failure = Some(failure);
        gateway
    }

    fn failure(operation: Operation) -> GatewayFailure {
        GatewayFailure::localized(operation, ErrorCode::Upstream, Locale::ZhTw)
    }

    async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    async fn media_calls(&self) -> usize {
        self.calls()
            .await
            .iter()
            .filter(|call| matches!(call, Call::Image(_) | Call::Video(_) | Call::Edit { .. }))
            .count()
    }
}

#[async_trait]
impl CreativeGateway for ScriptedGateway {
    async fn fetch_headlines(&self) -> Result<NewsBatch, GatewayFailure> {
        self.calls.lock().await.push(Call::Fetch);
        if let Some(failure) = &self.fetch_failure {
            return Err(failure.clone());
        }
        let headlines = self
            .headlines
            .iter()
            .enumerate()
            .map(|(index, (title, rating))| Headline {
                // deliberately scrambled; the workflow renumbers
                id: HeadlineId(100 + index as u32),
                title: title.clone(),
                summary: format!("{title} summary"),
                source_url: format!("https://news.example/{index}"),
                source_title: "Example News".to_string(),
                rating: *rating,
                is_selected: true,
            })
            .collect();
        Ok(NewsBatch {
            headlines,
            sources: vec![Source {
                uri: "https://news.example".to_string(),
                title: "Example News".to_string(),
            }],
            fetched_at: Utc::now(),
        })
    }

    async fn generate_prompt(&self, headlines: &[Headline]) -> Result<Prompt, GatewayFailure> {
        let titles: Vec<String> = headlines.iter().map(|h| h.title.clone()).collect();
        self.calls.lock().await.push(Call::Prompt(titles.clone()));
        if let Some(failing) = &self.fail_prompt_for {
            if titles.contains(failing) {
                return Err(Self::failure(Operation::GeneratePrompt));
            }
        }
        Ok(Prompt {
            english: format!("scene of {}", titles.join(" + ")),
            chinese: format!("{}的畫面", titles.join("、")),
        })
    }

    async fn generate_image(&self, instruction: &str) -> Result<MediaPayload, GatewayFailure> {
        let mut calls = self.calls.lock().await;
        calls.push(Call::Image(instruction.to_string()));
        if self.fail_media {
            return Err(Self::failure(Operation::GenerateImage));
        }
        Ok(MediaPayload::new("image/png", format!("IMG{}", calls.len())))
    }

    async fn generate_video(&self, instruction: &str) -> Result<MediaPayload, GatewayFailure> {
        let mut calls = self.calls.lock().await;
        calls.push(Call::Video(instruction.to_string()));
        if self.fail_media {
            return Err(Self::failure(Operation::GenerateVideo));
        }
        Ok(MediaPayload::new("video/mp4", format!("VID{}", calls.len())))
    }

    async fn edit_image(
        &self,
        image: &MediaPayload,
        instruction: &str,
    ) -> Result<MediaPayload, GatewayFailure> {
        self.calls.lock().await.push(Call::Edit {
            image: image.clone(),
            instruction: instruction.to_string(),
        });
        if self.fail_edit {
            return Err(GatewayFailure::localized(
                Operation::EditImage,
                ErrorCode::ContentBlocked,
                Locale::ZhTw,
            ));
        }
        Ok(MediaPayload::new("image/png", "EDITED"))
    }
}

fn workflow(gateway: ScriptedGateway) -> (Workflow<ScriptedGateway>, Arc<ScriptedGateway>) {
    let gateway = Arc::new(gateway);
    (Workflow::new(Arc::clone(&gateway), Locale::ZhTw), gateway)
}

async fn fetched(headlines: &[(&str, u8)]) -> (Workflow<ScriptedGateway>, Arc<ScriptedGateway>) {
    fetched_with(ScriptedGateway::with_headlines(headlines)).await
}

async fn fetched_with(
    gateway: ScriptedGateway,
) -> (Workflow<ScriptedGateway>, Arc<ScriptedGateway>) {
    let (mut flow, gateway) = workflow(gateway);
    assert_eq!(flow.fetch_news().await, Ok(Stage::NewsFetched));
    (flow, gateway)
}

async fn with_prompts(
    gateway: ScriptedGateway,
    select: &[u32],
    mode: GenerationMode,
) -> (Workflow<ScriptedGateway>, Arc<ScriptedGateway>) {
    let (mut flow, gateway) = fetched_with(gateway).await;
    for id in select {
        flow.toggle_selection(HeadlineId(*id)).expect("toggle");
    }
    assert_eq!(flow.proceed_to_prompts(mode).await, Ok(Stage::PromptsGenerated));
    (flow, gateway)
}

fn three_headlines() -> ScriptedGateway {
    ScriptedGateway::with_headlines(&[("颱風來襲", 2), ("台股新高", 5), ("夜市開幕", 3)])
}

#[tokio::test]
async fn fetch_assigns_sequential_ids_and_clears_selection() {
    let (flow, _) = fetched(&[("A", 1), ("B", 4), ("C", 3), ("D", 5)]).await;

    let state = flow.state();
    let ids: Vec<u32> = state.headlines.iter().map(|h| h.id.0).collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);
    assert!(state.headlines.iter().all(|h| !h.is_selected));
    assert_eq!(state.sources.len(), 1);
    assert!(state.fetched_at.is_some());
    assert!(state.error.is_none());
}

#[tokio::test]
async fn empty_fetch_returns_to_initial_with_no_news_message() {
    let (mut flow, _) = workflow(ScriptedGateway::with_headlines(&[]));

    assert_eq!(flow.fetch_news().await, Ok(Stage::Initial));

    assert_eq!(flow.stage(), Stage::Initial);
    assert!(flow.state().headlines.is_empty());
    assert_eq!(
        flow.state().error.as_deref(),
        Some(UserMessage::NoNewsFound.render(Locale::ZhTw).as_str())
    );
}

#[tokio::test]
async fn failed_fetch_records_error_and_returns_to_initial() {
    let failure = ScriptedGateway::failure(Operation::FetchHeadlines);
    let (mut flow, _) = workflow(ScriptedGateway::failing_fetch(failure.clone()));
    let mut events = flow.subscribe();

    assert_eq!(flow.fetch_news().await, Ok(Stage::Initial));

    assert_eq!(flow.state().error.as_deref(), Some(failure.message.as_str()));
    assert_eq!(
        events.recv().await.expect("event"),
        WorkflowEvent::StageChanged {
            from: Stage::Initial,
            to: Stage::FetchingNews
        }
    );
    assert_eq!(
        events.recv().await.expect("event"),
        WorkflowEvent::StageChanged {
            from: Stage::FetchingNews,
            to: Stage::Initial
        }
    );
    assert_eq!(
        events.recv().await.expect("event"),
        WorkflowEvent::Failed {
            message: failure.message
        }
    );
}

#[tokio::test]
async fn fetch_is_only_allowed_from_initial() {
    let (mut flow, gateway) = fetched(&[("A", 3)]).await;

    assert_eq!(
        flow.fetch_news().await,
        Err(TransitionError::NotAllowed {
            action: Action::FetchNews,
            stage: Stage::NewsFetched
        })
    );
    assert_eq!(gateway.calls().await, vec![Call::Fetch]);
}

#[tokio::test]
async fn toggle_twice_restores_flag_and_leaves_others_alone() {
    let (mut flow, _) = fetched(&[("A", 1), ("B", 2), ("C", 3)]).await;
    flow.toggle_selection(HeadlineId(2)).expect("toggle");
    let before = flow.state().headlines.clone();

    assert_eq!(flow.toggle_selection(HeadlineId(1)), Ok(true));
    assert_eq!(flow.toggle_selection(HeadlineId(1)), Ok(false));

    assert_eq!(flow.state().headlines, before);
    assert_eq!(flow.selected_count(), 1);
}

#[tokio::test]
async fn toggle_rejects_unknown_headline_and_wrong_stage() {
    let (mut flow, _) = workflow(three_headlines());
    assert!(matches!(
        flow.toggle_selection(HeadlineId(0)),
        Err(TransitionError::NotAllowed { .. })
    ));

    flow.fetch_news().await.expect("fetch");
    assert_eq!(
        flow.toggle_selection(HeadlineId(9)),
        Err(TransitionError::UnknownHeadline(HeadlineId(9)))
    );
}

#[tokio::test]
async fn proceeding_without_selection_is_rejected_before_any_call() {
    let (mut flow, gateway) = fetched(&[("A", 1)]).await;

    assert_eq!(
        flow.proceed_to_prompts(GenerationMode::Individual).await,
        Err(TransitionError::NothingSelected)
    );
    assert_eq!(flow.stage(), Stage::NewsFetched);
    assert_eq!(gateway.calls().await, vec![Call::Fetch]);
}

#[tokio::test]
async fn merge_creates_one_item_with_every_selected_headline() {
    let (flow, gateway) = with_prompts(three_headlines(), &[0, 1, 2], GenerationMode::Merge).await;

    let items = &flow.state().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, ItemId::merged());
    assert_eq!(items[0].sources.len(), 3);
    assert_eq!(
        items[0].prompt.as_ref().map(|p| p.english.as_str()),
        Some("scene of 颱風來襲 + 台股新高 + 夜市開幕")
    );

    let prompt_calls = gateway
        .calls()
        .await
        .into_iter()
        .filter(|call| matches!(call, Call::Prompt(_)))
        .count();
    assert_eq!(prompt_calls, 1);
}

#[tokio::test]
async fn individual_creates_one_item_per_selected_headline_in_order() {
    let (flow, _) = with_prompts(three_headlines(), &[0, 2], GenerationMode::Individual).await;

    let items = &flow.state().items;
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| item.sources.len() == 1));
    assert_eq!(items[0].sources[0].title, "颱風來襲");
    assert_eq!(items[1].sources[0].title, "夜市開幕");
    assert_eq!(items[0].id, ItemId::from("0"));
    assert_eq!(items[1].id, ItemId::from("2"));
    assert!(items.iter().all(|item| item.media_url.is_none()));
}

#[tokio::test]
async fn one_failed_prompt_discards_the_whole_batch() {
    let mut gateway = three_headlines();
    gateway.fail_prompt_for = Some("夜市開幕".to_string());
    let (mut flow, _) = fetched_with(gateway).await;
    flow.toggle_selection(HeadlineId(0)).expect("toggle");
    flow.toggle_selection(HeadlineId(2)).expect("toggle");

    assert_eq!(
        flow.proceed_to_prompts(GenerationMode::Individual).await,
        Ok(Stage::Initial)
    );

    assert!(flow.state().items.is_empty());
    assert_eq!(
        flow.state().error.as_deref(),
        Some(UserMessage::GeneratePromptFailed.render(Locale::ZhTw).as_str())
    );
}

#[tokio::test]
async fn save_prompt_commits_exactly_the_staged_values() {
    let (mut flow, _) = with_prompts(three_headlines(), &[1], GenerationMode::Individual).await;
    let item_id = ItemId::from("1");

    flow.begin_edit_prompt(&item_id).expect("begin");
    flow.edit_prompt_text(&item_id, PromptField::English, "a bull charging through Taipei")
        .expect("edit english");
    flow.edit_prompt_text(&item_id, PromptField::Chinese, "奔騰的牛")
        .expect("edit chinese");
    flow.save_prompt().expect("save");

    let prompt = flow.state().items[0].prompt.clone().expect("prompt");
    assert_eq!(
        prompt,
        Prompt {
            english: "a bull charging through Taipei".to_string(),
            chinese: "奔騰的牛".to_string(),
        }
    );
    assert!(flow.state().prompt_edit.is_none());
}

#[tokio::test]
async fn cancel_prompt_edit_leaves_prompt_untouched() {
    let (mut flow, _) = with_prompts(three_headlines(), &[1], GenerationMode::Individual).await;
    let item_id = ItemId::from("1");
    let original = flow.state().items[0].prompt.clone();

    flow.begin_edit_prompt(&item_id).expect("begin");
    flow.edit_prompt_text(&item_id, PromptField::English, "something else")
        .expect("edit");
    flow.cancel_edit_prompt().expect("cancel");

    assert_eq!(flow.state().items[0].prompt, original);
    assert!(flow.state().prompt_edit.is_none());
}

#[tokio::test]
async fn prompt_text_edits_require_the_matching_edit_mode() {
    let (mut flow, _) =
        with_prompts(three_headlines(), &[0, 1], GenerationMode::Individual).await;

    assert_eq!(
        flow.edit_prompt_text(&ItemId::from("0"), PromptField::English, "x"),
        Err(TransitionError::NoPromptEdit)
    );

    flow.begin_edit_prompt(&ItemId::from("0")).expect("begin");
    assert_eq!(
        flow.edit_prompt_text(&ItemId::from("1"), PromptField::English, "x"),
        Err(TransitionError::WrongPromptEdit {
            editing: ItemId::from("0"),
            requested: ItemId::from("1"),
        })
    );
}

#[tokio::test]
async fn generating_without_style_is_rejected_synchronously() {
    let (mut flow, gateway) = with_prompts(three_headlines(), &[0], GenerationMode::Individual).await;

    assert_eq!(
        flow.generate_media().await,
        Err(TransitionError::StyleNotChosen)
    );
    assert_eq!(flow.stage(), Stage::PromptsGenerated);
    assert_eq!(gateway.media_calls().await, 0);
}

#[tokio::test]
async fn generating_while_a_prompt_is_being_edited_is_rejected() {
    let (mut flow, _) = with_prompts(three_headlines(), &[0], GenerationMode::Individual).await;
    flow.select_style(ImageStyle::Watercolor).expect("style");
    flow.begin_edit_prompt(&ItemId::from("0")).expect("begin");

    assert_eq!(
        flow.generate_media().await,
        Err(TransitionError::PromptEditInProgress(ItemId::from("0")))
    );
    assert_eq!(flow.stage(), Stage::PromptsGenerated);
}

#[tokio::test]
async fn generation_prefixes_style_and_appends_language_directive() {
    let (mut flow, gateway) = with_prompts(three_headlines(), &[0], GenerationMode::Individual).await;
    flow.select_style(ImageStyle::Realistic).expect("style");
    flow.select_language(TextLanguage::English).expect("language");

    assert_eq!(flow.generate_media().await, Ok(Stage::MediaGenerated));

    let expected = format!(
        "Photorealistic, cinematic style. scene of 颱風來襲 {}",
        TextLanguage::English.directive()
    );
    assert!(gateway.calls().await.contains(&Call::Image(expected)));

    let item = &flow.state().items[0];
    assert_eq!(item.media_kind, Some(MediaKind::Image));
    assert!(item
        .media_url
        .as_deref()
        .is_some_and(|url| url.starts_with("data:image/png;base64,")));
    assert_eq!(*flow.progress().borrow(), crate::progress::COMPLETE);
}

#[tokio::test]
async fn video_style_renders_video_which_cannot_be_edited() {
    let (mut flow, gateway) = with_prompts(three_headlines(), &[1], GenerationMode::Individual).await;
    flow.select_style(ImageStyle::DynamicVideo).expect("style");

    assert_eq!(flow.generate_media().await, Ok(Stage::MediaGenerated));

    let calls = gateway.calls().await;
    assert!(calls.iter().any(|call| matches!(call, Call::Video(_))));
    assert!(!calls.iter().any(|call| matches!(call, Call::Image(_))));
    assert_eq!(flow.state().items[0].media_kind, Some(MediaKind::Video));

    let item_id = ItemId::from("1");
    flow.start_edit_media(&item_id).expect("start");
    assert_eq!(
        flow.confirm_edit_media_with("slow motion").await,
        Err(TransitionError::MediaNotEditable(item_id))
    );
    assert_eq!(flow.stage(), Stage::MediaGenerated);
}

#[tokio::test]
async fn failed_media_generation_resets_to_initial() {
    let mut gateway = three_headlines();
    gateway.fail_media = true;
    let (mut flow, _) = with_prompts(gateway, &[0, 2], GenerationMode::Individual).await;
    flow.select_style(ImageStyle::Cartoon).expect("style");

    assert_eq!(flow.generate_media().await, Ok(Stage::Initial));

    assert!(flow.state().items.is_empty());
    assert!(flow.state().style.is_none());
    assert_eq!(
        flow.state().error.as_deref(),
        Some(UserMessage::GenerateImageFailed.render(Locale::ZhTw).as_str())
    );
    assert_eq!(*flow.progress().borrow(), 0.0);
}

async fn with_images() -> (Workflow<ScriptedGateway>, Arc<ScriptedGateway>) {
    let (mut flow, gateway) =
        with_prompts(three_headlines(), &[0, 2], GenerationMode::Individual).await;
    flow.select_style(ImageStyle::OilPainting).expect("style");
    assert_eq!(flow.generate_media().await, Ok(Stage::MediaGenerated));
    (flow, gateway)
}

#[tokio::test]
async fn empty_edit_instruction_is_rejected_before_any_call() {
    let (mut flow, gateway) = with_images().await;
    let before = gateway.media_calls().await;

    flow.start_edit_media(&ItemId::from("0")).expect("start");
    assert_eq!(
        flow.confirm_edit_media().await,
        Err(TransitionError::EmptyInstruction)
    );
    assert_eq!(
        flow.confirm_edit_media_with("   ").await,
        Err(TransitionError::EmptyInstruction)
    );

    assert_eq!(gateway.media_calls().await, before);
    assert_eq!(flow.stage(), Stage::MediaGenerated);
}

#[tokio::test]
async fn confirm_edit_requires_an_open_edit() {
    let (mut flow, _) = with_images().await;

    assert_eq!(
        flow.confirm_edit_media().await,
        Err(TransitionError::NoMediaEdit)
    );
}

#[tokio::test]
async fn editing_replaces_only_the_target_items_media() {
    let (mut flow, gateway) = with_images().await;
    let untouched = flow.state().items[1].media_url.clone();
    let original = flow.state().items[0].media_url.clone().expect("media");

    flow.start_edit_media(&ItemId::from("0")).expect("start");
    assert_eq!(
        flow.confirm_edit_media_with("add sunglasses").await,
        Ok(Stage::MediaGenerated)
    );

    let items = &flow.state().items;
    assert_eq!(
        items[0].media_url.as_deref(),
        Some("data:image/png;base64,EDITED")
    );
    assert_ne!(items[0].media_url.as_deref(), Some(original.as_str()));
    assert_eq!(items[1].media_url, untouched);
    assert!(flow.state().media_edit.is_none());

    let sent = MediaPayload::parse_data_url(&original).expect("payload");
    assert!(gateway.calls().await.contains(&Call::Edit {
        image: sent,
        instruction: "add sunglasses".to_string(),
    }));
}

#[tokio::test]
async fn rejected_edit_routes_to_error_state() {
    let mut gateway = three_headlines();
    gateway.fail_edit = true;
    let (mut flow, _) = with_prompts(gateway, &[0], GenerationMode::Individual).await;
    flow.select_style(ImageStyle::Illustration).expect("style");
    flow.generate_media().await.expect("generate");

    flow.start_edit_media(&ItemId::from("0")).expect("start");
    assert_eq!(
        flow.confirm_edit_media_with("make it scarier").await,
        Ok(Stage::Initial)
    );
    assert_eq!(
        flow.state().error.as_deref(),
        Some(UserMessage::ContentBlocked.render(Locale::ZhTw).as_str())
    );
}

#[tokio::test]
async fn going_back_to_news_keeps_selection_and_drops_items() {
    let (mut flow, _) = with_images().await;

    flow.go_back_to_news().expect("back");

    let state = flow.state();
    assert_eq!(state.stage, Stage::NewsFetched);
    assert!(state.items.is_empty());
    assert!(state.style.is_none());
    assert_eq!(state.headlines.len(), 3);
    let selected: Vec<u32> = state.selected_headlines().iter().map(|h| h.id.0).collect();
    assert_eq!(selected, vec![0, 2]);
}

#[tokio::test]
async fn reset_discards_everything() {
    let (mut flow, _) = with_images().await;

    flow.reset();

    assert_eq!(flow.state(), &WorkflowState::default());
    assert_eq!(*flow.progress().borrow(), 0.0);
}

#[tokio::test]
async fn export_is_only_available_after_generation() {
    let (flow, _) = with_prompts(three_headlines(), &[0], GenerationMode::Individual).await;

    let err = flow
        .export_media(&ItemId::from("0"), &std::env::temp_dir())
        .await
        .expect_err("must fail");
    assert!(matches!(
        err,
        ExportFailure::Transition(TransitionError::NotAllowed {
            action: Action::ExportMedia,
            ..
        })
    ));
}

#[tokio::test]
async fn state_snapshot_is_json() {
    let (flow, _) = with_prompts(three_headlines(), &[0], GenerationMode::Individual).await;

    let snapshot = flow.snapshot_json().expect("snapshot");
    let restored: WorkflowState = serde_json::from_str(&snapshot).expect("restore");

    assert_eq!(&restored, flow.state());
}

#[tokio::test]
async fn full_session_only_takes_table_edges() {
    let (mut flow, _) = workflow(three_headlines());
    let mut events = flow.subscribe();

    flow.fetch_news().await.expect("fetch");
    flow.toggle_selection(HeadlineId(0)).expect("toggle");
    flow.proceed_to_prompts(GenerationMode::Individual)
        .await
        .expect("prompts");
    flow.select_style(ImageStyle::Cartoon).expect("style");
    flow.generate_media().await.expect("generate");
    flow.start_edit_media(&ItemId::from("0")).expect("start");
    flow.confirm_edit_media_with("add a rainbow")
        .await
        .expect("edit");
    flow.go_back_to_news().expect("back");
    flow.reset();

    let mut edges = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let WorkflowEvent::StageChanged { from, to } = event {
            assert!(
                crate::state::can_transition(from, to),
                "{from} -> {to} is not in the table"
            );
            edges.push(to);
        }
    }
    assert_eq!(
        edges,
        vec![
            Stage::FetchingNews,
            Stage::NewsFetched,
            Stage::GeneratingPrompts,
            Stage::PromptsGenerated,
            Stage::GeneratingMedia,
            Stage::MediaGenerated,
            Stage::EditingMedia,
            Stage::MediaGenerated,
            Stage::NewsFetched,
            Stage::Initial,
        ]
    );
}
