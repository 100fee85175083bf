//! HTTP client for a chat-completions text-generation endpoint.
//!
//! The configured URL is posted to as-is, so both Azure deployment URLs
//! (`.../chat/completions?api-version=...`) and plain OpenAI-compatible
//! endpoints work. There are no retries; callers pace their own requests.

use std::time::Duration;

use condir_core::{AppConfig, InsightsAuth};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::InsightsError;
use crate::prompt::{ContractorContext, SYSTEM_PROMPT};

const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Generates a short sales note for one contractor per call.
pub struct InsightsClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    auth: InsightsAuth,
    model: Option<String>,
    max_tokens: u32,
}

impl InsightsClient {
    /// Builds a client from the endpoint settings in [`AppConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`InsightsError::NotConfigured`] when the endpoint URL or key
    /// is unset, [`InsightsError::InvalidEndpoint`] for an unparseable URL, or
    /// [`InsightsError::Http`] if the `reqwest::Client` cannot be constructed.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, InsightsError> {
        let endpoint = config
            .insights_api_url
            .as_deref()
            .ok_or(InsightsError::NotConfigured("CONDIR_INSIGHTS_API_URL"))?;
        let api_key = config
            .insights_api_key
            .as_deref()
            .ok_or(InsightsError::NotConfigured("CONDIR_INSIGHTS_API_KEY"))?;

        let client = Self::new(
            endpoint,
            api_key,
            config.insights_auth,
            config.insights_timeout_secs,
        )?
        .with_max_tokens(config.insights_max_tokens);

        Ok(if config.insights_model.is_empty() {
            client
        } else {
            client.with_model(&config.insights_model)
        })
    }

    /// Creates a client that posts to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`InsightsError::InvalidEndpoint`] if `endpoint` is not an
    /// absolute URL, or [`InsightsError::Http`] if the underlying client
    /// cannot be built.
    pub fn new(
        endpoint: &str,
        api_key: &str,
        auth: InsightsAuth,
        timeout_secs: u64,
    ) -> Result<Self, InsightsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("condir/0.1 (contractor-insights)")
            .build()?;

        let endpoint = Url::parse(endpoint).map_err(|e| InsightsError::InvalidEndpoint {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.to_owned(),
            auth,
            model: None,
            max_tokens: 200,
        })
    }

    /// Sends `model` in the request body. Azure deployments name the model in
    /// the URL and accept the field being absent.
    #[must_use]
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_owned());
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Requests a sales note for `context` and returns the trimmed text.
    ///
    /// # Errors
    ///
    /// - [`InsightsError::Http`] on network failure or timeout.
    /// - [`InsightsError::Status`] when the service answers non-2xx.
    /// - [`InsightsError::Deserialize`] when the body is not a
    ///   chat-completions response.
    /// - [`InsightsError::EmptyContent`] when there is no choice or the
    ///   first choice is blank.
    pub async fn generate(&self, context: &ContractorContext) -> Result<String, InsightsError> {
        let user_prompt = context.user_prompt();
        let request = ChatRequest {
            model: self.model.as_deref(),
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: TEMPERATURE,
        };

        let builder = self.client.post(self.endpoint.clone()).json(&request);
        let builder = match self.auth {
            InsightsAuth::ApiKey => builder.header("api-key", &self.api_key),
            InsightsAuth::Bearer => builder.bearer_auth(&self.api_key),
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                contractor = %context.name,
                status = status.as_u16(),
                "insights request rejected"
            );
            return Err(InsightsError::Status {
                status: status.as_u16(),
                body: truncate(&body, 500),
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| InsightsError::Deserialize {
                context: format!("chat completion for '{}'", context.name),
                source: e,
            })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(InsightsError::EmptyContent)?;

        tracing::debug!(contractor = %context.name, chars = text.len(), "insight generated");
        Ok(text)
    }
}

fn truncate(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}
