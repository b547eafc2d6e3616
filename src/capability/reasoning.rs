//! Reasoning capability: provider abstraction + concrete providers.
//!
//! A provider takes a system instruction and a user prompt and returns text.
//! When JSON is requested the text is expected to parse into the caller's
//! schema, but that check belongs to the caller, not the provider.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AiConfig;
use crate::error::CapabilityError;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct ReasoningRequest {
    pub system: String,
    pub prompt: String,
    pub format: ResponseFormat,
}

impl ReasoningRequest {
    pub fn text(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            format: ResponseFormat::Text,
        }
    }

    pub fn json(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            format: ResponseFormat::Json,
        }
    }
}

#[async_trait::async_trait]
pub trait ReasoningClient: Send + Sync {
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, CapabilityError>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynReasoner = Arc<dyn ReasoningClient>;

/// One client per pipeline role; they may point at different models.
#[derive(Clone)]
pub struct Reasoners {
    pub analysis: DynReasoner,
    pub synthesis: DynReasoner,
}

impl Reasoners {
    pub fn shared(client: DynReasoner) -> Self {
        Self {
            analysis: client.clone(),
            synthesis: client,
        }
    }
}

/// Factory: build clients according to config and environment variables.
///
/// * `AI_TEST_MODE=mock`  → deterministic mock client.
/// * `AI_TEST_MODE=error` → client that always fails (exercises degradation).
/// * `enabled == false` or no API key → disabled client.
/// * else the OpenAI-compatible provider, one instance per model.
pub fn build_reasoners_from_config(
    config: &AiConfig,
    timeout: Duration,
) -> Result<Reasoners, CapabilityError> {
    match std::env::var("AI_TEST_MODE").ok().as_deref() {
        Some("mock") => return Ok(Reasoners::shared(Arc::new(MockReasoner::default()))),
        Some("error") => {
            return Ok(Reasoners::shared(Arc::new(FailingReasoner::new(
                "forced failure (AI_TEST_MODE=error)",
            ))))
        }
        _ => {}
    }

    if !config.enabled {
        return Ok(Reasoners::shared(Arc::new(DisabledReasoner)));
    }

    match config.provider.as_str() {
        "openai" if !config.api_key.is_empty() => {
            info!(
                target: "capability",
                provider = "openai",
                analysis_model = %config.analysis_model,
                synthesis_model = %config.synthesis_model,
                "reasoning providers configured"
            );
            Ok(Reasoners {
                analysis: Arc::new(OpenAiReasoner::new(
                    &config.base_url,
                    &config.api_key,
                    &config.analysis_model,
                    timeout,
                )?),
                synthesis: Arc::new(OpenAiReasoner::new(
                    &config.base_url,
                    &config.api_key,
                    &config.synthesis_model,
                    timeout,
                )?),
            })
        }
        "openai" => {
            warn!(target: "capability", "AI enabled but no API key; reasoning disabled");
            Ok(Reasoners::shared(Arc::new(DisabledReasoner)))
        }
        other => {
            warn!(target: "capability", provider = other, "unsupported provider; reasoning disabled");
            Ok(Reasoners::shared(Arc::new(DisabledReasoner)))
        }
    }
}

// ------------------------------------------------------------
// OpenAI-compatible provider
// ------------------------------------------------------------

/// Chat Completions client. Works against any endpoint speaking that API.
pub struct OpenAiReasoner {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiReasoner {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, CapabilityError> {
        let http = reqwest::Client::builder()
            .user_agent("campaign-review-agent/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl ReasoningClient for OpenAiReasoner {
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, CapabilityError> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Format {
            #[serde(rename = "type")]
            kind: &'static str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            #[serde(skip_serializing_if = "Option::is_none")]
            response_format: Option<Format>,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: &request.system,
                },
                Msg {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: 0.2,
            response_format: match request.format {
                ResponseFormat::Json => Some(Format {
                    kind: "json_object",
                }),
                ResponseFormat::Text => None,
            },
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CapabilityError::Status {
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }

        let body: Resp = resp.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|s| !s.trim().is_empty())
            .ok_or(CapabilityError::EmptyResponse)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Offline providers
// ------------------------------------------------------------

/// Always fails with `Disabled`; used when AI is switched off.
pub struct DisabledReasoner;

#[async_trait::async_trait]
impl ReasoningClient for DisabledReasoner {
    async fn complete(&self, _request: &ReasoningRequest) -> Result<String, CapabilityError> {
        Err(CapabilityError::Disabled("reasoning provider is not configured"))
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Always fails with the given message.
pub struct FailingReasoner {
    message: String,
}

impl FailingReasoner {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait::async_trait]
impl ReasoningClient for FailingReasoner {
    async fn complete(&self, _request: &ReasoningRequest) -> Result<String, CapabilityError> {
        Err(CapabilityError::Unavailable(self.message.clone()))
    }
    fn provider_name(&self) -> &'static str {
        "failing"
    }
}

/// Deterministic replies for tests and local runs: `json` for JSON requests,
/// `text` otherwise.
#[derive(Clone)]
pub struct MockReasoner {
    pub json: String,
    pub text: String,
}

impl Default for MockReasoner {
    fn default() -> Self {
        Self {
            json: serde_json::json!({
                "tone_score": 7,
                "hook_strength": "Medium",
                "key_themes": ["Rate urgency"],
                "rate_check": "Not Applicable",
                "deviation_summary": []
            })
            .to_string(),
            text: "<thought_process>Market: neutral. Message: on-brief. Messenger: fit.</thought_process>\nMaintain current copy (mock).".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl ReasoningClient for MockReasoner {
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, CapabilityError> {
        Ok(match request.format {
            ResponseFormat::Json => self.json.clone(),
            ResponseFormat::Text => self.text.clone(),
        })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_reasoner_fails_with_disabled() {
        let err = DisabledReasoner
            .complete(&ReasoningRequest::text("sys", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Disabled(_)));
    }

    #[tokio::test]
    async fn mock_reasoner_answers_by_format() {
        let mock = MockReasoner::default();
        let json = mock.complete(&ReasoningRequest::json("s", "p")).await.unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&json).is_ok());
        let text = mock.complete(&ReasoningRequest::text("s", "p")).await.unwrap();
        assert!(text.contains("<thought_process>"));
    }

    #[serial_test::serial]
    #[test]
    fn factory_respects_disabled_config() {
        std::env::remove_var("AI_TEST_MODE");
        let r = build_reasoners_from_config(&AiConfig::default(), Duration::from_secs(1)).unwrap();
        assert_eq!(r.analysis.provider_name(), "disabled");
        assert_eq!(r.synthesis.provider_name(), "disabled");
    }

    #[serial_test::serial]
    #[test]
    fn factory_mock_mode_wins_over_config() {
        std::env::set_var("AI_TEST_MODE", "mock");
        let r = build_reasoners_from_config(&AiConfig::default(), Duration::from_secs(1)).unwrap();
        assert_eq!(r.analysis.provider_name(), "mock");
        std::env::remove_var("AI_TEST_MODE");
    }
}
