use std::sync::Arc;

use crate::{
    domain::{ChatId, VoiceId},
    messaging::port::ChatTransport,
    ports::{Generator, SpeechSynthesizer},
    prompts::FALLBACK_MESSAGE,
    Result,
};

/// Terminal state of one handled update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Delivered,
    FallbackDelivered,
    Ignored,
    /// Even the fallback delivery failed.
    SilentlyDropped,
}

impl Outcome {
    pub fn name(self) -> &'static str {
        match self {
            Outcome::Delivered => "delivered",
            Outcome::FallbackDelivered => "fallback_delivered",
            Outcome::Ignored => "ignored",
            Outcome::SilentlyDropped => "silently_dropped",
        }
    }
}

/// Where the spoken text comes from.
#[derive(Clone, Debug)]
pub enum ReplySource {
    Fixed(String),
    Generate { prompt: String, user_name: String },
}

#[derive(Clone, Debug)]
pub struct SpokenReply {
    pub source: ReplySource,
    /// `None` speaks with the default voice.
    pub voice_id: Option<VoiceId>,
    pub caption: Option<String>,
}

impl SpokenReply {
    pub fn fixed(text: impl Into<String>) -> Self {
        Self {
            source: ReplySource::Fixed(text.into()),
            voice_id: None,
            caption: None,
        }
    }

    pub fn generated(prompt: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            source: ReplySource::Generate {
                prompt: prompt.into(),
                user_name: user_name.into(),
            },
            voice_id: None,
            caption: None,
        }
    }

    pub fn in_voice(mut self, voice_id: VoiceId) -> Self {
        self.voice_id = Some(voice_id);
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// Generation -> synthesis -> voice delivery, with one plain-text fallback.
///
/// Never returns an error: every failure ends in `FallbackDelivered` or
/// `SilentlyDropped`.
pub struct ResponseOrchestrator {
    generator: Arc<dyn Generator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    transport: Arc<dyn ChatTransport>,
}

impl ResponseOrchestrator {
    pub fn new(
        generator: Arc<dyn Generator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            generator,
            synthesizer,
            transport,
        }
    }

    pub async fn deliver(&self, chat_id: ChatId, reply: SpokenReply) -> Outcome {
        match self.try_deliver(chat_id, &reply).await {
            Ok(()) => Outcome::Delivered,
            Err(e) => {
                tracing::warn!(chat_id = chat_id.0, error = %e, "spoken reply failed, sending fallback text");
                self.fallback(chat_id).await
            }
        }
    }

    /// Best-effort plain-text apology. Its own failure is terminal.
    pub async fn fallback(&self, chat_id: ChatId) -> Outcome {
        match self.transport.send_text(chat_id, FALLBACK_MESSAGE).await {
            Ok(()) => Outcome::FallbackDelivered,
            Err(e) => {
                tracing::error!(chat_id = chat_id.0, error = %e, "fallback delivery failed, dropping update");
                Outcome::SilentlyDropped
            }
        }
    }

    /// Plain text (instructions, confirmations). A failed send gets the same
    /// single fallback attempt as a spoken reply.
    pub async fn send_text(&self, chat_id: ChatId, text: &str) -> Outcome {
        match self.transport.send_text(chat_id, text).await {
            Ok(()) => Outcome::Delivered,
            Err(e) => {
                tracing::warn!(chat_id = chat_id.0, error = %e, "text delivery failed, sending fallback text");
                self.fallback(chat_id).await
            }
        }
    }

    async fn try_deliver(&self, chat_id: ChatId, reply: &SpokenReply) -> Result<()> {
        let text = match &reply.source {
            ReplySource::Fixed(text) => text.clone(),
            ReplySource::Generate { prompt, user_name } => {
                self.generator.generate_reply(prompt, user_name).await?
            }
        };

        let audio = self
            .synthesizer
            .synthesize(&text, reply.voice_id.as_ref())
            .await?;

        self.transport
            .send_voice(chat_id, audio, reply.caption.as_deref())
            .await
    }
}
