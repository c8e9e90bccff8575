//! Collaborator ports.
//!
//! Each external service is an opaque request/response call behind one of these
//! traits. Adapters live in `kalm-openai`, `kalm-elevenlabs` and `kalm-telegram`.

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, VoiceId},
    messaging::types::PolledUpdate,
    Result,
};

/// Text generation.
///
/// Implementations should return a usable fallback string on internal failure
/// rather than `Err`; callers still handle `Err` for implementations that don't.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate_reply(&self, prompt: &str, user_name: &str) -> Result<String>;
}

/// Crisis classification. Implementations should answer `false` on internal failure.
#[async_trait]
pub trait CrisisClassifier: Send + Sync {
    async fn is_crisis(&self, text: &str) -> Result<bool>;
}

/// Speech synthesis and voice cloning.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text`. `None` means the service's default voice.
    async fn synthesize(&self, text: &str, voice_id: Option<&VoiceId>) -> Result<Vec<u8>>;

    async fn clone_voice(&self, audio: Vec<u8>, label: &str) -> Result<VoiceId>;
}

/// Chat id -> cloned voice id. Latest clone wins.
#[async_trait]
pub trait VoiceStore: Send + Sync {
    async fn voice_id(&self, chat_id: ChatId) -> Result<Option<VoiceId>>;

    async fn set_voice_id(&self, chat_id: ChatId, voice_id: VoiceId) -> Result<()>;
}

/// Long-poll side of the chat transport.
#[async_trait]
pub trait UpdateFetcher: Send + Sync {
    /// Fetch the next batch. `offset` is the first update id not yet seen.
    async fn fetch_updates(&self, offset: Option<i64>, wait: Duration)
        -> Result<Vec<PolledUpdate>>;
}
