//! OpenAI adapter (reply generation + crisis classification).
//!
//! Uses the `chat/completions` endpoint. Both ports swallow their own failures:
//! generation answers with a canned reply, classification answers "not a crisis".

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use kalm_core::{
    errors::Error,
    ports::{CrisisClassifier, Generator},
    prompts::{generation_fallback, CRISIS_CLASSIFIER_PROMPT, SYSTEM_PROMPT},
    Result,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone, Debug)]
pub struct OpenAiClient {
    api_key: String,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("openai http client: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn chat_completion(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "max_tokens": max_tokens,
            "temperature": temperature,
        });

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Collaborator(format!("openai request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Collaborator(format!(
                "openai completion failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let v: Value = resp
            .json()
            .await
            .map_err(|e| Error::Collaborator(format!("openai json error: {e}")))?;

        completion_text(&v).ok_or_else(|| {
            Error::Collaborator("openai completion returned no content".to_string())
        })
    }
}

#[async_trait]
impl Generator for OpenAiClient {
    async fn generate_reply(&self, prompt: &str, user_name: &str) -> Result<String> {
        let user = format!("User's name: {user_name}\n\nTheir message: {prompt}");
        match self.chat_completion(SYSTEM_PROMPT, &user, 200, 0.7).await {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::warn!(error = %e, "generation failed, using canned reply");
                Ok(generation_fallback(user_name))
            }
        }
    }
}

#[async_trait]
impl CrisisClassifier for OpenAiClient {
    async fn is_crisis(&self, text: &str) -> Result<bool> {
        match self
            .chat_completion(CRISIS_CLASSIFIER_PROMPT, text, 3, 0.0)
            .await
        {
            Ok(answer) => Ok(is_affirmative(&answer)),
            Err(e) => {
                tracing::warn!(error = %e, "crisis classification failed");
                Ok(false)
            }
        }
    }
}

fn completion_text(v: &Value) -> Option<String> {
    let text = v
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()?
        .trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn is_affirmative(answer: &str) -> bool {
    answer
        .trim()
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_uppercase()
        .starts_with("YES")
}
