use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

use querent_core::errors::GatewayError;
use querent_core::provider::{Completion, CompletionRequest, LlmProvider};

use crate::converter::{self, ChatCompletionResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the Chat Completions API.
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f32>,
}

impl OpenAiConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            temperature: None,
        }
    }
}

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
    endpoint: String,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::NetworkError(format!("failed to build HTTP client: {e}")))?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip(self, request), fields(model = %self.config.model, messages = request.messages.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, GatewayError> {
        let body = converter::build_request_body(request, &self.config.model, self.config.temperature);

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status, body));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        let (message, usage) = converter::parse_response(parsed)?;
        if let Some(u) = &usage {
            debug!(input_tokens = u.input_tokens, output_tokens = u.output_tokens, "completion usage");
        }

        Ok(Completion { message, usage })
    }
}
