//! Validation of model output into domain values.

use serde_json::Value;
use shared::domain::{Headline, HeadlineId, MediaPayload, Prompt, Source};

use crate::{
    client::GatewayError,
    wire::{GenerateContentResponse, RawHeadline, RawPrompt},
};

pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let opened = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let closed = opened.trim_end().strip_suffix("```").unwrap_or(opened);
    closed.trim()
}

pub fn parse_headlines(text: &str) -> Result<Vec<Headline>, GatewayError> {
    let value: Value = serde_json::from_str(strip_code_fences(text))
        .map_err(|err| GatewayError::Malformed(format!("headline payload is not JSON: {err}")))?;
    let Value::Array(entries) = value else {
        return Err(GatewayError::Malformed(
            "headline payload is not a JSON array".to_string(),
        ));
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let raw: RawHeadline = serde_json::from_value(entry).map_err(|err| {
                GatewayError::Malformed(format!("headline {index} has an invalid shape: {err}"))
            })?;
            Ok(Headline {
                id: HeadlineId(index as u32),
                title: raw.title,
                summary: raw.summary,
                source_url: raw.source_url,
                source_title: raw.source_title,
                rating: clamp_rating(raw.rating),
                is_selected: false,
            })
        })
        .collect()
}

fn clamp_rating(rating: Option<f64>) -> u8 {
    match rating {
        Some(value) if value.is_finite() => value.round().clamp(1.0, 5.0) as u8,
        _ => 1,
    }
}

pub fn parse_prompt(text: &str) -> Result<Prompt, GatewayError> {
    let raw: RawPrompt = serde_json::from_str(strip_code_fences(text))
        .map_err(|err| GatewayError::Malformed(format!("prompt payload is not JSON: {err}")))?;

    let field = |value: Option<String>, name: &str| {
        value
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| GatewayError::Malformed(format!("prompt is missing the '{name}' field")))
    };

    Ok(Prompt {
        chinese: field(raw.chinese, "chinese")?,
        english: field(raw.english, "english")?,
    })
}

pub fn extract_sources(response: &GenerateContentResponse) -> Vec<Source> {
    response
        .grounding_chunks()
        .iter()
        .filter_map(|chunk| chunk.web.as_ref())
        .map(|web| Source {
            uri: web.uri.clone(),
            title: web.title.clone(),
        })
        .collect()
}

pub fn ensure_not_blocked(response: &GenerateContentResponse) -> Result<(), GatewayError> {
    match response.block_reason() {
        Some(reason) => Err(GatewayError::Blocked { reason }),
        None => Ok(()),
    }
}

pub fn extract_media(response: &GenerateContentResponse) -> Result<MediaPayload, GatewayError> {
    ensure_not_blocked(response)?;
    response
        .first_inline_data()
        .filter(|inline| !inline.data.is_empty())
        .map(|inline| MediaPayload::new(inline.mime_type.clone(), inline.data.clone()))
        .ok_or(GatewayError::MissingMedia)
}
