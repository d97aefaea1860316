use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use reqwest::{header::CONTENT_TYPE, Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{Headline, MediaKind, MediaPayload, Prompt},
    error::{ErrorCode, GatewayFailure, Operation},
};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::GatewayConfig,
    instructions,
    parse::{self, ensure_not_blocked},
    wire::{
        GenerateContentRequest, GenerateContentResponse, GenerationConfig, ImageConfig,
        LongRunningOperation, Part, PredictLongRunningRequest, Tool, VideoInstance,
        VideoParameters,
    },
    CreativeGateway, NewsBatch,
};

const API_KEY_HEADER: &str = "x-goog-api-key";
const API_VERSION: &str = "v1beta";
const DEFAULT_VIDEO_MIME_TYPE: &str = "video/mp4";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no API key configured")]
    MissingCredential,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
    #[error("gateway answered {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("response blocked by content policy: {reason}")]
    Blocked { reason: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("response did not contain media data")]
    MissingMedia,
    #[error("render operation failed: {0}")]
    Operation(String),
}

impl GatewayError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::MissingCredential => ErrorCode::AccessDenied,
            GatewayError::Status { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN =>
            {
                ErrorCode::AccessDenied
            }
            // An unknown key is reported as 400 with this reason.
            GatewayError::Status { body, .. } if body.contains("API_KEY_INVALID") => {
                ErrorCode::AccessDenied
            }
            GatewayError::Status { .. } | GatewayError::Operation(_) => ErrorCode::Upstream,
            GatewayError::Transport(err) if err.is_decode() => ErrorCode::MalformedResponse,
            GatewayError::Transport(_) | GatewayError::Url(_) => ErrorCode::Transport,
            GatewayError::Blocked { .. } => ErrorCode::ContentBlocked,
            GatewayError::Malformed(_) => ErrorCode::MalformedResponse,
            GatewayError::MissingMedia => ErrorCode::MissingMedia,
        }
    }
}

/// REST client for the generative-language API.
pub struct GeminiGateway {
    http: Client,
    base: Url,
    config: GatewayConfig,
}

impl GeminiGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        let mut base = Url::parse(config.base_url.trim())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { http, base, config })
    }

    fn api_key(&self) -> Result<&str, GatewayError> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(GatewayError::MissingCredential)
    }

    fn model_url(&self, model: &str, method: &str) -> Result<Url, GatewayError> {
        Ok(self
            .base
            .join(&format!("{API_VERSION}/models/{model}:{method}"))?)
    }

    fn operation_url(&self, name: &str) -> Result<Url, GatewayError> {
        Ok(self.base.join(&format!("{API_VERSION}/{name}"))?)
    }

    async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(%url, "gateway request");
        let res = self
            .http
            .post(url)
            .header(API_KEY_HEADER, self.api_key()?)
            .json(body)
            .send()
            .await?;
        Ok(ensure_success(res).await?.json().await?)
    }

    async fn get(&self, url: Url) -> Result<Response, GatewayError> {
        debug!(%url, "gateway request");
        let res = self
            .http
            .get(url)
            .header(API_KEY_HEADER, self.api_key()?)
            .send()
            .await?;
        ensure_success(res).await
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GatewayError> {
        let url = self.model_url(model, "generateContent")?;
        self.post_json(url, request).await
    }

    fn image_generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
            image_config: Some(ImageConfig {
                aspect_ratio: self.config.aspect_ratio.clone(),
                image_size: self.config.image_size.clone(),
            }),
            ..GenerationConfig::default()
        }
    }

    async fn request_headlines(&self) -> Result<NewsBatch, GatewayError> {
        let mut request = GenerateContentRequest::from_parts(vec![Part::text(
            instructions::headline_request(self.config.headline_count),
        )]);
        request.tools.push(Tool::google_search());

        let response = self
            .generate_content(&self.config.text_model, &request)
            .await?;
        ensure_not_blocked(&response)?;

        let headlines = parse::parse_headlines(&response.text())?;
        let sources = parse::extract_sources(&response);
        info!(
            headlines = headlines.len(),
            sources = sources.len(),
            "fetched headline batch"
        );
        Ok(NewsBatch {
            headlines,
            sources,
            fetched_at: Utc::now(),
        })
    }

    async fn request_prompt(&self, headlines: &[Headline]) -> Result<Prompt, GatewayError> {
        let mut request = GenerateContentRequest::from_parts(vec![Part::text(
            instructions::prompt_request(headlines),
        )]);
        request.generation_config = Some(GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(instructions::prompt_schema()),
            ..GenerationConfig::default()
        });

        let response = self
            .generate_content(&self.config.text_model, &request)
            .await?;
        ensure_not_blocked(&response)?;
        parse::parse_prompt(&response.text())
    }

    async fn request_image(&self, instruction: &str) -> Result<MediaPayload, GatewayError> {
        let mut request = GenerateContentRequest::from_parts(vec![Part::text(instruction)]);
        request.generation_config = Some(self.image_generation_config());

        let response = self
            .generate_content(&self.config.image_model, &request)
            .await?;
        parse::extract_media(&response)
    }

    async fn request_edit(
        &self,
        image: &MediaPayload,
        instruction: &str,
    ) -> Result<MediaPayload, GatewayError> {
        let mut request = GenerateContentRequest::from_parts(vec![
            Part::inline(image.mime_type.clone(), image.data_b64.clone()),
            Part::text(instructions::edit_request(instruction)),
        ]);
        request.generation_config = Some(self.image_generation_config());

        let response = self
            .generate_content(&self.config.image_model, &request)
            .await?;
        parse::extract_media(&response)
    }

    async fn request_video(&self, instruction: &str) -> Result<MediaPayload, GatewayError> {
        let request = PredictLongRunningRequest {
            instances: vec![VideoInstance {
                prompt: instruction.to_string(),
            }],
            parameters: VideoParameters {
                aspect_ratio: self.config.aspect_ratio.clone(),
                resolution: self.config.video_resolution.clone(),
            },
        };
        let url = self.model_url(&self.config.video_model, "predictLongRunning")?;
        let mut operation: LongRunningOperation = self.post_json(url, &request).await?;
        let name = operation.name.clone();
        if name.is_empty() && !operation.done {
            return Err(GatewayError::Malformed(
                "video render did not return an operation name".to_string(),
            ));
        }

        while !operation.done {
            tokio::time::sleep(self.config.video_poll_interval).await;
            debug!(operation = %name, "polling video render");
            operation = self.get(self.operation_url(&name)?).await?.json().await?;
        }

        if let Some(status) = operation.error {
            return Err(GatewayError::Operation(format!(
                "{} ({})",
                status.message, status.code
            )));
        }

        let rendered = operation
            .response
            .and_then(|response| response.generate_video_response)
            .ok_or_else(|| {
                GatewayError::Malformed("finished render carries no video response".to_string())
            })?;
        if let Some(reason) = rendered.rai_media_filtered_reasons.into_iter().next() {
            return Err(GatewayError::Blocked { reason });
        }
        let uri = rendered
            .generated_samples
            .into_iter()
            .filter_map(|sample| sample.video)
            .map(|video| video.uri)
            .find(|uri| !uri.is_empty())
            .ok_or(GatewayError::MissingMedia)?;

        let res = self.get(Url::parse(&uri)?).await?;
        let mime_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
            .filter(|value| MediaKind::from_mime_type(value) == MediaKind::Video)
            .unwrap_or_else(|| DEFAULT_VIDEO_MIME_TYPE.to_string());
        let bytes = res.bytes().await?;
        if bytes.is_empty() {
            return Err(GatewayError::MissingMedia);
        }
        info!(operation = %name, bytes = bytes.len(), "video render downloaded");
        Ok(MediaPayload::new(mime_type, STANDARD.encode(&bytes)))
    }

    fn normalize(&self, operation: Operation, error: GatewayError) -> GatewayFailure {
        let code = error.code();
        warn!(?operation, ?code, %error, "gateway call failed");
        GatewayFailure::localized(operation, code, self.config.locale)
    }
}

async fn ensure_success(res: Response) -> Result<Response, GatewayError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(GatewayError::Status { status, body })
}

#[async_trait]
impl CreativeGateway for GeminiGateway {
    async fn fetch_headlines(&self) -> Result<NewsBatch, GatewayFailure> {
        self.request_headlines()
            .await
            .map_err(|err| self.normalize(Operation::FetchHeadlines, err))
    }

    async fn generate_prompt(&self, headlines: &[Headline]) -> Result<Prompt, GatewayFailure> {
        self.request_prompt(headlines)
            .await
            .map_err(|err| self.normalize(Operation::GeneratePrompt, err))
    }

    async fn generate_image(&self, instruction: &str) -> Result<MediaPayload, GatewayFailure> {
        self.request_image(instruction)
            .await
            .map_err(|err| self.normalize(Operation::GenerateImage, err))
    }

    async fn generate_video(&self, instruction: &str) -> Result<MediaPayload, GatewayFailure> {
        self.request_video(instruction)
            .await
            .map_err(|err| self.normalize(Operation::GenerateVideo, err))
    }

    async fn edit_image(
        &self,
        image: &MediaPayload,
        instruction: &str,
    ) -> Result<MediaPayload, GatewayFailure> {
        self.request_edit(image, instruction)
            .await
            .map_err(|err| self.normalize(Operation::EditImage, err))
    }
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod tests;
