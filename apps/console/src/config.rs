use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use ai_gateway::{config, GatewayConfig};
use anyhow::Context;
use serde::Deserialize;
use shared::messages::Locale;

pub const DEFAULT_CONFIG_FILE: &str = "news_canvas.toml";

/// Not `Debug`: holds the credential. Log `to_gateway_config()` instead.
#[derive(Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub video_model: String,
    pub locale: Locale,
    pub export_dir: PathBuf,
    pub video_poll_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: config::DEFAULT_BASE_URL.into(),
            text_model: config::DEFAULT_TEXT_MODEL.into(),
            image_model: config::DEFAULT_IMAGE_MODEL.into(),
            video_model: config::DEFAULT_VIDEO_MODEL.into(),
            locale: Locale::ZhTw,
            export_dir: PathBuf::from("./exports"),
            video_poll_seconds: 10,
            request_timeout_seconds: 180,
        }
    }
}

/// Keys accepted in `news_canvas.toml`. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_key: Option<String>,
    base_url: Option<String>,
    text_model: Option<String>,
    image_model: Option<String>,
    video_model: Option<String>,
    locale: Option<String>,
    export_dir: Option<PathBuf>,
    video_poll_seconds: Option<u64>,
    request_timeout_seconds: Option<u64>,
}

/// Defaults, then the config file if present, then the process environment.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => settings
            .apply_file(&raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    }

    settings.apply_env(|key| std::env::var(key).ok());
    Ok(settings)
}

impl Settings {
    pub fn apply_file(&mut self, raw: &str) -> anyhow::Result<()> {
        let file_cfg: FileSettings = toml::from_str(raw)?;

        if let Some(v) = file_cfg.api_key {
            self.api_key = Some(v);
        }
        if let Some(v) = file_cfg.base_url {
            self.base_url = v;
        }
        if let Some(v) = file_cfg.text_model {
            self.text_model = v;
        }
        if let Some(v) = file_cfg.image_model {
            self.image_model = v;
        }
        if let Some(v) = file_cfg.video_model {
            self.video_model = v;
        }
        if let Some(v) = file_cfg.locale {
            self.locale = v.parse().map_err(anyhow::Error::msg)?;
        }
        if let Some(v) = file_cfg.export_dir {
            self.export_dir = v;
        }
        if let Some(v) = file_cfg.video_poll_seconds {
            self.video_poll_seconds = v;
        }
        if let Some(v) = file_cfg.request_timeout_seconds {
            self.request_timeout_seconds = v;
        }
        Ok(())
    }

    /// Later keys win: `APP__API_KEY` beats `GEMINI_API_KEY`, which beats `API_KEY`.
    /// Unparseable values are logged and skipped.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for key in ["API_KEY", "GEMINI_API_KEY", "APP__API_KEY"] {
            if let Some(v) = lookup(key).filter(|v| !v.trim().is_empty()) {
                self.api_key = Some(v);
            }
        }

        if let Some(v) = lookup("APP__BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("APP__TEXT_MODEL") {
            self.text_model = v;
        }
        if let Some(v) = lookup("APP__IMAGE_MODEL") {
            self.image_model = v;
        }
        if let Some(v) = lookup("APP__VIDEO_MODEL") {
            self.video_model = v;
        }
        if let Some(v) = lookup("APP__EXPORT_DIR") {
            self.export_dir = PathBuf::from(v);
        }

        if let Some(v) = lookup("APP__LOCALE") {
            match v.parse::<Locale>() {
                Ok(locale) => self.locale = locale,
                Err(err) => tracing::warn!(%err, "ignoring APP__LOCALE"),
            }
        }
        if let Some(v) = lookup("APP__VIDEO_POLL_SECONDS") {
            match v.parse::<u64>() {
                Ok(parsed) => self.video_poll_seconds = parsed,
                Err(err) => tracing::warn!(%err, value = %v, "ignoring APP__VIDEO_POLL_SECONDS"),
            }
        }
        if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECONDS") {
            match v.parse::<u64>() {
                Ok(parsed) => self.request_timeout_seconds = parsed,
                Err(err) => {
                    tracing::warn!(%err, value = %v, "ignoring APP__REQUEST_TIMEOUT_SECONDS")
                }
            }
        }
    }

    pub fn to_gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            text_model: self.text_model.clone(),
            image_model: self.image_model.clone(),
            video_model: self.video_model.clone(),
            video_poll_interval: Duration::from_secs(self.video_poll_seconds.max(1)),
            request_timeout: Duration::from_secs(self.request_timeout_seconds.max(1)),
            locale: self.locale,
            ..GatewayConfig::default()
        }
    }
}
