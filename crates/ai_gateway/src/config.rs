use std::{fmt, time::Duration};

use shared::messages::Locale;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";
pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";

#[derive(Clone)]
pub struct GatewayConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub video_model: String,
    pub headline_count: u8,
    pub aspect_ratio: String,
    pub image_size: String,
    pub video_resolution: String,
    pub video_poll_interval: Duration,
    pub request_timeout: Duration,
    pub locale: Locale,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.into(),
            text_model: DEFAULT_TEXT_MODEL.into(),
            image_model: DEFAULT_IMAGE_MODEL.into(),
            video_model: DEFAULT_VIDEO_MODEL.into(),
            headline_count: 10,
            aspect_ratio: "16:9".into(),
            image_size: "1K".into(),
            video_resolution: "720p".into(),
            video_poll_interval: Duration::from_secs(10),
            request_timeout: Duration::from_secs(180),
            locale: Locale::ZhTw,
        }
    }
}

impl GatewayConfig {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

// The credential never reaches logs.
impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("video_model", &self.video_model)
            .field("headline_count", &self.headline_count)
            .field("aspect_ratio", &self.aspect_ratio)
            .field("image_size", &self.image_size)
            .field("video_resolution", &self.video_resolution)
            .field("video_poll_interval", &self.video_poll_interval)
            .field("request_timeout", &self.request_timeout)
            .field("locale", &self.locale)
            .finish()
    }
}
