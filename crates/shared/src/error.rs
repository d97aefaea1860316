use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messages::{Locale, UserMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    AccessDenied,
    ContentBlocked,
    MalformedResponse,
    MissingMedia,
    Transport,
    Upstream,
}

/// The four adapter round-trips (video rendering counts as media generation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    FetchHeadlines,
    GeneratePrompt,
    GenerateImage,
    GenerateVideo,
    EditImage,
}

impl Operation {
    /// Generic failure text shown when nothing more specific applies.
    pub fn failure_message(self) -> UserMessage {
        match self {
            Operation::FetchHeadlines => UserMessage::FetchHeadlinesFailed,
            Operation::GeneratePrompt => UserMessage::GeneratePromptFailed,
            Operation::GenerateImage => UserMessage::GenerateImageFailed,
            Operation::GenerateVideo => UserMessage::GenerateVideoFailed,
            Operation::EditImage => UserMessage::EditImageFailed,
        }
    }
}

/// A gateway fault normalized at the adapter boundary. `message` is already
/// rendered in the user's language and is what the workflow records as its error.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct GatewayFailure {
    pub operation: Operation,
    pub code: ErrorCode,
    pub message: String,
}

impl GatewayFailure {
    pub fn new(operation: Operation, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            operation,
            code,
            message: message.into(),
        }
    }

    /// Picks the user-facing text for `code`: access and safety rejections get
    /// their own wording, everything else uses the operation's generic message.
    pub fn localized(operation: Operation, code: ErrorCode, locale: Locale) -> Self {
        let message = match code {
            ErrorCode::AccessDenied => UserMessage::AccessDenied,
            ErrorCode::ContentBlocked => UserMessage::ContentBlocked,
            ErrorCode::MissingMedia if operation == Operation::EditImage => {
                UserMessage::EditedImageMissing
            }
            ErrorCode::MissingMedia => UserMessage::ImageDataMissing,
            _ => operation.failure_message(),
        };
        Self::new(operation, code, message.render(locale))
    }
}
