//! Vision-inference adapter.
//!
//! [`InferenceClient`] is the seam between the pipeline and the model: one
//! image plus one prompt in, raw text out. Implementations make exactly one
//! request per call and never retry; the dispatcher records any failure
//! against the frame and moves on.
//!
//! [`OpenAiClient`] talks to an OpenAI-compatible chat-completions endpoint.
//! Tests and alternative backends implement the trait directly.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::configuration::InferenceConfig;
use crate::encoder::EncodedFrame;
use crate::error::{InferenceError, SecondSightError};

/// Raw model output for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceReply {
    /// Message content exactly as returned.
    pub text: String,
    /// Total tokens reported for the call, when the endpoint reports usage.
    pub tokens_used: Option<u64>,
}

/// Submits one image and prompt to a vision model.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Analyze `frame` with `prompt`.
    async fn analyze(
        &self,
        frame: &EncodedFrame,
        prompt: &str,
    ) -> Result<InferenceReply, InferenceError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
///
/// # Example
///
/// ```no_run
/// use secondsight::{InferenceConfig, OpenAiClient};
///
/// let client = OpenAiClient::new(InferenceConfig::from_env()?)?;
/// # Ok::<(), secondsight::SecondSightError>(())
/// ```
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    config: InferenceConfig,
    endpoint: String,
}

impl OpenAiClient {
    /// Build a client with the configured per-request timeout.
    pub fn new(config: InferenceConfig) -> Result<Self, SecondSightError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| SecondSightError::InvalidConfiguration {
                field: "http_client",
                reason: error.to_string(),
            })?;

        let endpoint = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );

        log::debug!(
            "Inference client ready: model={}, endpoint={endpoint}, timeout={:?}",
            config.model,
            config.timeout,
        );

        Ok(Self {
            http,
            config,
            endpoint,
        })
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }
}

#[async_trait]
impl InferenceClient for OpenAiClient {
    async fn analyze(
        &self,
        frame: &EncodedFrame,
        prompt: &str,
    ) -> Result<InferenceReply, InferenceError> {
        let request = ChatRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages: [ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: prompt },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: frame.to_data_url(),
                        },
                    },
                ],
            }],
        };

        log::debug!(
            "Submitting second {} ({:.1} KiB)",
            frame.second,
            frame.size_estimate_kb()
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|error| InferenceError::from_transport(error, self.config.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InferenceError::from_transport(error, self.config.timeout))?;

        if !status.is_success() {
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|error| InferenceError::InvalidBody(error.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(InferenceError::MissingContent)?;

        Ok(InferenceReply {
            text,
            tokens_used: parsed.usage.and_then(|usage| usage.total_tokens),
        })
    }
}
