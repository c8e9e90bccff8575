//! ElevenLabs adapter (text-to-speech + instant voice cloning).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use kalm_core::{domain::VoiceId, errors::Error, ports::SpeechSynthesizer, Result};

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io/v1";

#[derive(Clone, Debug)]
pub struct ElevenLabsClient {
    api_key: String,
    default_voice_id: String,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

#[derive(Deserialize)]
struct AddVoiceResponse {
    voice_id: String,
}

impl ElevenLabsClient {
    pub fn new(
        api_key: impl Into<String>,
        default_voice_id: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for TTS".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("elevenlabs http client: {e}")))?;
        Ok(Self {
            api_key,
            default_voice_id: default_voice_id.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn tts_url(&self, voice_id: Option<&VoiceId>) -> String {
        let voice = voice_id
            .map(VoiceId::as_str)
            .unwrap_or(&self.default_voice_id);
        format!("{}/text-to-speech/{voice}", self.base_url)
    }
}

async fn error_from(resp: reqwest::Response, what: &str) -> Error {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Error::Collaborator(format!(
        "elevenlabs {what} failed: {status} {}",
        body.chars().take(200).collect::<String>()
    ))
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str, voice_id: Option<&VoiceId>) -> Result<Vec<u8>> {
        let resp = self
            .http
            .post(self.tts_url(voice_id))
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&TtsRequest {
                text,
                model_id: &self.model,
            })
            .send()
            .await
            .map_err(|e| Error::Collaborator(format!("elevenlabs request error: {e}")))?;

        if !resp.status().is_success() {
            return Err(error_from(resp, "tts").await);
        }

        let audio = resp
            .bytes()
            .await
            .map_err(|e| Error::Collaborator(format!("elevenlabs audio read error: {e}")))?;
        if audio.is_empty() {
            return Err(Error::Collaborator(
                "elevenlabs tts returned empty audio".to_string(),
            ));
        }
        Ok(audio.to_vec())
    }

    async fn clone_voice(&self, audio: Vec<u8>, label: &str) -> Result<VoiceId> {
        let sample = reqwest::multipart::Part::bytes(audio)
            .file_name("sample.ogg")
            .mime_str("audio/ogg")
            .map_err(|e| Error::Collaborator(format!("elevenlabs multipart error: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .text("name", label.to_string())
            .part("files", sample);

        let resp = self
            .http
            .post(format!("{}/voices/add", self.base_url))
            .header("xi-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Collaborator(format!("elevenlabs request error: {e}")))?;

        if !resp.status().is_success() {
            return Err(error_from(resp, "voice clone").await);
        }

        let body: AddVoiceResponse = resp
            .json()
            .await
            .map_err(|e| Error::Collaborator(format!("elevenlabs json error: {e}")))?;
        Ok(VoiceId(body.voice_id))
    }
}
