//! Per-update handling: classify, dispatch to the intent handler, report the outcome.

use std::sync::Arc;

use crate::{
    crisis::CrisisGate,
    domain::{ChatId, FileRef, VoiceId},
    ingestion::UpdateHandler,
    intent::{classify, Intent},
    messaging::{
        port::ChatTransport,
        types::{Payload, Update},
    },
    orchestrator::{Outcome, ResponseOrchestrator, SpokenReply},
    pending::PendingVoiceSet,
    ports::{CrisisClassifier, Generator, SpeechSynthesizer, VoiceStore},
    prompts::{
        onboarding_prompt, personal_prompt, CLONE_FAILED, CLONE_INSTRUCTIONS, CLONE_SUCCESS,
        LIVE_CALL_UNAVAILABLE, NO_CLONED_VOICE, WELCOME_CAPTION, WELCOME_TEMPLATE,
    },
    Result,
};

/// Everything the pipeline talks to.
pub struct PipelineDeps {
    pub transport: Arc<dyn ChatTransport>,
    pub generator: Arc<dyn Generator>,
    pub classifier: Arc<dyn CrisisClassifier>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub voices: Arc<dyn VoiceStore>,
    pub pending: Arc<PendingVoiceSet>,
    pub live_call_url: Option<String>,
}

pub struct Pipeline {
    transport: Arc<dyn ChatTransport>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    voices: Arc<dyn VoiceStore>,
    pending: Arc<PendingVoiceSet>,
    orchestrator: ResponseOrchestrator,
    crisis: CrisisGate,
    live_call_url: Option<String>,
}

impl Pipeline {
    pub fn new(deps: PipelineDeps) -> Self {
        let orchestrator = ResponseOrchestrator::new(
            deps.generator,
            deps.synthesizer.clone(),
            deps.transport.clone(),
        );
        let crisis = CrisisGate::new(
            deps.classifier,
            deps.synthesizer.clone(),
            deps.transport.clone(),
        );
        Self {
            transport: deps.transport,
            synthesizer: deps.synthesizer,
            voices: deps.voices,
            pending: deps.pending,
            orchestrator,
            crisis,
            live_call_url: deps.live_call_url,
        }
    }

    pub fn pending(&self) -> &PendingVoiceSet {
        &self.pending
    }

    pub async fn route(&self, update: &Update) -> Intent {
        let pending = match update.payload {
            Payload::Voice(_) => self.pending.is_pending(update.chat_id).await,
            _ => false,
        };
        classify(update, pending)
    }

    pub async fn handle(&self, update: Update) -> Outcome {
        let intent = self.route(&update).await;
        let intent_name = intent.name();
        let chat_id = update.chat_id;

        let outcome = match intent {
            Intent::CompleteVoiceClone { file } => self.complete_voice_clone(chat_id, file).await,
            Intent::BeginVoiceClone => self.begin_voice_clone(chat_id).await,
            Intent::PlayPersonalMessage { text } => {
                self.play_personal_message(chat_id, &update.sender_name, text.as_deref())
                    .await
            }
            Intent::RedirectToLiveCall => self.redirect_to_live_call(chat_id).await,
            Intent::Onboard { category } => {
                self.onboard(chat_id, &update.sender_name, category.as_deref())
                    .await
            }
            Intent::DefaultReply { text } => {
                self.default_reply(chat_id, &update.sender_name, &text)
                    .await
            }
            Intent::Ignore => Outcome::Ignored,
        };

        tracing::info!(
            update_id = update.update_id,
            chat_id = chat_id.0,
            intent = intent_name,
            outcome = outcome.name(),
            "update handled"
        );
        outcome
    }

    async fn begin_voice_clone(&self, chat_id: ChatId) -> Outcome {
        self.pending.begin(chat_id).await;
        let outcome = self.orchestrator.send_text(chat_id, CLONE_INSTRUCTIONS).await;
        if outcome != Outcome::Delivered {
            // The user never saw the instructions.
            self.pending.end(chat_id).await;
        }
        outcome
    }

    async fn complete_voice_clone(&self, chat_id: ChatId, file: FileRef) -> Outcome {
        if !self.pending.claim(chat_id).await {
            tracing::info!(chat_id = chat_id.0, "voice sample arrived while a clone is already in flight");
            return Outcome::Ignored;
        }

        let result = self.clone_voice(chat_id, &file).await;
        // Cleared on success and failure alike.
        self.pending.end(chat_id).await;

        match result {
            Ok(voice_id) => {
                tracing::info!(chat_id = chat_id.0, voice_id = voice_id.as_str(), "voice cloned");
                self.orchestrator.send_text(chat_id, CLONE_SUCCESS).await
            }
            Err(e) => {
                tracing::warn!(chat_id = chat_id.0, error = %e, "voice cloning failed");
                match self.orchestrator.send_text(chat_id, CLONE_FAILED).await {
                    Outcome::Delivered => Outcome::FallbackDelivered,
                    other => other,
                }
            }
        }
    }

    async fn clone_voice(&self, chat_id: ChatId, file: &FileRef) -> Result<VoiceId> {
        let location = self.transport.attachment_location(file).await?;
        let sample = self.transport.download_attachment(&location).await?;
        let voice_id = self
            .synthesizer
            .clone_voice(sample, &format!("kalm-{chat_id}"))
            .await?;
        self.voices.set_voice_id(chat_id, voice_id.clone()).await?;
        Ok(voice_id)
    }

    async fn play_personal_message(
        &self,
        chat_id: ChatId,
        sender_name: &str,
        request: Option<&str>,
    ) -> Outcome {
        match self.voices.voice_id(chat_id).await {
            Ok(Some(voice_id)) => {
                let reply =
                    SpokenReply::generated(personal_prompt(request), sender_name).in_voice(voice_id);
                self.orchestrator.deliver(chat_id, reply).await
            }
            Ok(None) => self.orchestrator.send_text(chat_id, NO_CLONED_VOICE).await,
            Err(e) => {
                tracing::warn!(chat_id = chat_id.0, error = %e, "voice store lookup failed");
                self.orchestrator.fallback(chat_id).await
            }
        }
    }

    async fn redirect_to_live_call(&self, chat_id: ChatId) -> Outcome {
        match &self.live_call_url {
            Some(url) => {
                let text = format!("📞 Tap to start a live call with Kalm:\n{url}");
                self.orchestrator.send_text(chat_id, &text).await
            }
            None => {
                tracing::error!(chat_id = chat_id.0, "LIVE_CALL_URL is not configured");
                self.orchestrator
                    .send_text(chat_id, LIVE_CALL_UNAVAILABLE)
                    .await
            }
        }
    }

    async fn onboard(&self, chat_id: ChatId, sender_name: &str, category: Option<&str>) -> Outcome {
        let reply = match category {
            Some(category) => SpokenReply::generated(onboarding_prompt(category), sender_name),
            None => SpokenReply::fixed(WELCOME_TEMPLATE),
        };
        self.orchestrator
            .deliver(chat_id, reply.with_caption(WELCOME_CAPTION))
            .await
    }

    async fn default_reply(&self, chat_id: ChatId, sender_name: &str, text: &str) -> Outcome {
        if self.crisis.is_crisis(text).await {
            tracing::warn!(chat_id = chat_id.0, "crisis detected, sending helplines");
            return self.crisis.respond(chat_id).await;
        }
        self.orchestrator
            .deliver(chat_id, SpokenReply::generated(text, sender_name))
            .await
    }
}

/// Runs every update as its own task; nothing waits on a handler.
pub struct SpawningDispatcher {
    pipeline: Arc<Pipeline>,
}

impl SpawningDispatcher {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

impl UpdateHandler for SpawningDispatcher {
    fn dispatch(&self, update: Update) {
        let pipeline = self.pipeline.clone();
        tokio::spawn(async move {
            pipeline.handle(update).await;
        });
    }
}
