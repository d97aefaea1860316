//! Text rendering of the workflow state. Pure: the same state always renders the same text.

use std::fmt::Write as _;

use client_core::{suggested_file_name, WorkflowState};
use shared::domain::{GenerationItem, ImageStyle, MediaKind, MediaPayload, Stage, TextLanguage};

pub fn render(state: &WorkflowState, progress: f32) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", state.stage);
    if let Some(error) = &state.error {
        let _ = writeln!(out, "! {error}");
    }

    match state.stage {
        Stage::Initial => out.push_str("type 'fetch' to load today's headlines\n"),
        Stage::FetchingNews => out.push_str("searching for headlines...\n"),
        Stage::GeneratingPrompts => out.push_str("writing prompts...\n"),
        Stage::NewsFetched => render_headlines(&mut out, state),
        Stage::PromptsGenerated => {
            render_prompts(&mut out, state);
            out.push_str(&style_menu(state.style));
            let _ = writeln!(out, "lettering: {}", language_label(state.language));
        }
        Stage::GeneratingMedia => out.push_str("rendering media...\n"),
        Stage::EditingMedia => out.push_str("applying the edit...\n"),
        Stage::MediaGenerated => render_media(&mut out, state),
    }
    if state.stage.shows_progress() {
        let _ = writeln!(out, "{}", progress_bar(progress));
    }
    out
}

fn render_headlines(out: &mut String, state: &WorkflowState) {
    if let Some(fetched_at) = state.fetched_at {
        let _ = writeln!(
            out,
            "fetched {} from {} sources",
            fetched_at.format("%Y-%m-%d %H:%M UTC"),
            state.sources.len()
        );
    }
    for headline in state.sorted_headlines() {
        let mark = if headline.is_selected { 'x' } else { ' ' };
        let _ = writeln!(
            out,
            "[{mark}] {:>2} {:<5} {} ({})",
            headline.id.0,
            "*".repeat(headline.rating.into()),
            headline.title,
            headline.source_title
        );
        if !headline.summary.is_empty() {
            let _ = writeln!(out, "         {}", headline.summary);
        }
    }
    let _ = writeln!(out, "selected: {}", state.selected_count());
}

fn render_prompts(out: &mut String, state: &WorkflowState) {
    for item in &state.items {
        let editing = state
            .prompt_edit
            .as_ref()
            .filter(|edit| edit.item_id == item.id);
        let _ = writeln!(
            out,
            "item {} ({} headline{}){}",
            item.id,
            item.sources.len(),
            if item.sources.len() == 1 { "" } else { "s" },
            if editing.is_some() { " [editing]" } else { "" }
        );
        let prompt = editing.map(|edit| &edit.draft).or(item.prompt.as_ref());
        match prompt {
            Some(prompt) => {
                let _ = writeln!(out, "  en: {}", prompt.english);
                let _ = writeln!(out, "  zh: {}", prompt.chinese);
            }
            None => out.push_str("  (no prompt)\n"),
        }
    }
}

fn render_media(out: &mut String, state: &WorkflowState) {
    for item in &state.items {
        let _ = writeln!(out, "item {}: {}", item.id, media_summary(item));
        if let Some(edit) = state.media_edit.as_ref().filter(|e| e.item_id == item.id) {
            let _ = writeln!(out, "  editing, instruction: \"{}\"", edit.instruction);
        }
    }
}

fn media_summary(item: &GenerationItem) -> String {
    let Some(payload) = item.media_url.as_deref().and_then(MediaPayload::parse_data_url) else {
        return "no media".to_string();
    };
    let kind = match item.media_kind {
        Some(MediaKind::Video) => "video",
        _ => "image",
    };
    let approx_bytes = payload.data_b64.len() / 4 * 3;
    let name = suggested_file_name(item).unwrap_or_default();
    format!(
        "{kind} {} ~{} KiB {name}",
        payload.mime_type,
        approx_bytes / 1024
    )
}

pub fn style_menu(selected: Option<ImageStyle>) -> String {
    let mut out = String::from("styles:\n");
    for (index, style) in ImageStyle::ALL.iter().enumerate() {
        let mark = if Some(*style) == selected { '>' } else { ' ' };
        let _ = writeln!(out, "{mark} {}. {}", index + 1, style.label());
    }
    out
}

fn language_label(language: Option<TextLanguage>) -> &'static str {
    language.map_or("(not set)", TextLanguage::label)
}

pub fn progress_bar(progress: f32) -> String {
    const WIDTH: usize = 30;
    let percent = progress.clamp(0.0, 100.0);
    let filled = (percent / 100.0 * WIDTH as f32).round() as usize;
    format!(
        "[{}{}] {:>3.0}%",
        "#".repeat(filled),
        "-".repeat(WIDTH - filled),
        percent
    )
}
