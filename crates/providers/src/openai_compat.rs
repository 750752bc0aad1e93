//! Non-streaming `/chat/completions` against any OpenAI-compatible endpoint
//! (Hugging Face router, OpenAI, local servers).

use std::time::Duration;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    studybot_config::LlmConfig,
    tracing::{debug, trace, warn},
};

use crate::{ChatMessage, Error, LlmProvider, Result, strip_think_tags};

pub struct OpenAiCompatProvider {
    api_key: Secret<String>,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(api_key: Secret<String>, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens: 500,
            temperature: 0.7,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let key = config.api_key.expose_secret().trim();
        if key.is_empty() || key.contains("${") {
            return Err(Error::not_configured("llm.api_key is not set"));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            ..Self::new(
                config.api_key.clone(),
                config.model.clone(),
                config.base_url.clone(),
            )
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });
        debug!(model = %self.model, messages_count = messages.len(), "chat completion request");

        let http_resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await?;

        let status = http_resp.status();
        if !status.is_success() {
            let body_text = http_resp.text().await.unwrap_or_default();
            warn!(status = %status, model = %self.model, body = %body_text, "LLM API error");
            return Err(Error::Api {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let resp = http_resp.json::<serde_json::Value>().await?;
        trace!(response = %resp, "chat completion raw response");

        resp["choices"][0]["message"]["content"]
            .as_str()
            .map(strip_think_tags)
            .filter(|text| !text.is_empty())
            .ok_or(Error::EmptyResponse)
    }
}
