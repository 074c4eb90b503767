//! Google Gemini provider.
//!
//! Tool-calling requests go to `models/{model}:generateContent`; the nested
//! long-form text streams used by tools go to
//! `models/{draft_model}:streamGenerateContent?alt=sse`. The API key is sent
//! in the `x-goog-api-key` header so it never appears in a logged URL.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument, warn};

use relay_core::errors::GatewayError;
use relay_core::parts::ResponsePart;
use relay_core::provider::{GenerationProvider, GenerationRequest, TextStream};

use crate::sse::parse_sse_lines;
use crate::types::{
    parse_stream_chunk, GeminiContent, GeminiTool, GenerateContentRequest, GenerateContentResponse,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`GoogleProvider`].
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: SecretString,
    /// Model for tool-calling requests.
    pub model: String,
    /// Model for streamed text generation.
    pub draft_model: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("model", &self.model)
            .field("draft_model", &self.draft_model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

pub struct GoogleProvider {
    config: GeminiConfig,
    client: Client,
}

impl GoogleProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::NetworkError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: GeminiConfig, client: Client) -> Self {
        tracing::info!(
            model = %config.model,
            draft_model = %config.draft_model,
            "Gemini provider initialized"
        );
        Self { config, client }
    }

    fn url(&self, model: &str, action: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/models/{model}:{action}")
    }

    fn build_request_body(request: &GenerationRequest) -> GenerateContentRequest {
        let tools = if request.tools.is_empty() {
            Vec::new()
        } else {
            vec![GeminiTool {
                function_declarations: request.tools.clone(),
            }]
        };
        GenerateContentRequest {
            system_instruction: Some(GeminiContent::text("system", &request.system_instruction)),
            contents: vec![GeminiContent::text("user", &request.prompt)],
            tools,
        }
    }

    async fn post(
        &self,
        url: &str,
        body: &GenerateContentRequest,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, GatewayError> {
        let mut req = self
            .client
            .post(url)
            .header("x-goog-api-key", self.config.api_key.expose_secret())
            .header("content-type", "application/json")
            .json(body);
        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| GatewayError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let retry_after = retry_after(resp.headers());
            let body = resp.text().await.unwrap_or_default();
            warn!(status, ?retry_after, "Gemini request rejected");
            return Err(GatewayError::from_status(status, body).with_retry_after(retry_after));
        }
        Ok(resp)
    }
}

/// `Retry-After` in delta-seconds form; HTTP dates are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl GenerationProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip(self, request), fields(model = %self.config.model, tools = request.tools.len()))]
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<ResponsePart>, GatewayError> {
        let body = Self::build_request_body(request);
        let url = self.url(&self.config.model, "generateContent");
        let resp = self
            .post(&url, &body, Some(self.config.request_timeout))
            .await?;

        let data: GenerateContentResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
        let parts = data.into_parts();
        debug!(parts = parts.len(), "Gemini response received");
        Ok(parts)
    }

    #[instrument(skip(self, prompt), fields(model = %self.config.draft_model))]
    async fn stream_text(&self, prompt: &str) -> Result<TextStream, GatewayError> {
        let body = GenerateContentRequest::user_text(prompt);
        let url = format!(
            "{}?alt=sse",
            self.url(&self.config.draft_model, "streamGenerateContent")
        );
        // No overall timeout: the stream stays open for as long as text is produced.
        let resp = self.post(&url, &body, None).await?;

        let chunks = parse_sse_lines(resp.bytes_stream()).filter_map(|line| async move {
            match line.and_then(|data| parse_stream_chunk(&data)) {
                Ok(text) if text.is_empty() => None,
                other => Some(other),
            }
        });
        Ok(Box::pin(chunks))
    }
}
