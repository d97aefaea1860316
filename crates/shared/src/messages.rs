//! User-facing text. Every message the workflow can surface is listed here so a
//! locale switch covers all of them.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Locale {
    #[default]
    ZhTw,
    En,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "zh-tw" | "zh" | "zh-hant" => Ok(Locale::ZhTw),
            "en" | "en-us" | "en-gb" => Ok(Locale::En),
            other => Err(format!("unsupported locale '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserMessage {
    NoNewsFound,
    FetchHeadlinesFailed,
    GeneratePromptFailed,
    GenerateImageFailed,
    GenerateVideoFailed,
    EditImageFailed,
    ImageDataMissing,
    EditedImageMissing,
    AccessDenied,
    ContentBlocked,
}

impl UserMessage {
    pub fn render(self, locale: Locale) -> String {
        let text = match locale {
            Locale::ZhTw => self.zh_tw(),
            Locale::En => self.en(),
        };
        text.to_string()
    }

    fn zh_tw(self) -> &'static str {
        match self {
            UserMessage::NoNewsFound => "抱歉，AI 目前找不到相關的即時新聞，請稍後再試一次。",
            UserMessage::FetchHeadlinesFailed => "無法獲取新聞頭條。請確認網路連線或 API 狀態。",
            UserMessage::GeneratePromptFailed => "無法生成圖片提示詞。",
            UserMessage::GenerateImageFailed => "無法生成圖片。請檢查金鑰權限或稍後再試。",
            UserMessage::GenerateVideoFailed => "無法生成影片。請確認金鑰權限與配額。",
            UserMessage::EditImageFailed => "無法修改圖片。",
            UserMessage::ImageDataMissing => "API 回傳中找不到圖片數據。",
            UserMessage::EditedImageMissing => "無法獲取修改後的圖片數據。",
            UserMessage::AccessDenied => {
                "存取權限遭拒。請確認 API 金鑰有效，且所屬專案已啟用付費方案。"
            }
            UserMessage::ContentBlocked => "內容因安全政策遭到拒絕，請調整描述後再試一次。",
        }
    }

    fn en(self) -> &'static str {
        match self {
            UserMessage::NoNewsFound => {
                "Sorry, the AI could not find any current news right now. Please try again later."
            }
            UserMessage::FetchHeadlinesFailed => {
                "Could not fetch news headlines. Check your network connection or the API status."
            }
            UserMessage::GeneratePromptFailed => "Could not generate image prompts.",
            UserMessage::GenerateImageFailed => {
                "Could not generate the image. Check the key's permissions or try again later."
            }
            UserMessage::GenerateVideoFailed => {
                "Could not generate the video. Check the key's permissions and quota."
            }
            UserMessage::EditImageFailed => "Could not edit the image.",
            UserMessage::ImageDataMissing => "The API response did not contain image data.",
            UserMessage::EditedImageMissing => "Could not retrieve the edited image data.",
            UserMessage::AccessDenied => {
                "Access denied. Make sure the API key is valid and belongs to a paid project."
            }
            UserMessage::ContentBlocked => {
                "The request was rejected by the content safety policy. Rephrase it and try again."
            }
        }
    }
}
