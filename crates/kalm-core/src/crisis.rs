use std::sync::Arc;

use crate::{
    domain::ChatId,
    messaging::port::ChatTransport,
    orchestrator::Outcome,
    ports::{CrisisClassifier, SpeechSynthesizer},
    prompts::{CRISIS_HELPLINES, CRISIS_SPOKEN_MESSAGE},
    Result,
};

/// Short-circuit for messages the classifier flags as a crisis.
pub struct CrisisGate {
    classifier: Arc<dyn CrisisClassifier>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    transport: Arc<dyn ChatTransport>,
}

impl CrisisGate {
    pub fn new(
        classifier: Arc<dyn CrisisClassifier>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            classifier,
            synthesizer,
            transport,
        }
    }

    /// A failing classifier counts as "not a crisis".
    pub async fn is_crisis(&self, text: &str) -> bool {
        match self.classifier.is_crisis(text).await {
            Ok(flag) => flag,
            Err(e) => {
                tracing::warn!(error = %e, "crisis classification failed, treating as non-crisis");
                false
            }
        }
    }

    /// Helplines first as plain text, then a compassionate voice note.
    ///
    /// The helpline message depends on nothing but the transport.
    pub async fn respond(&self, chat_id: ChatId) -> Outcome {
        let helplines_sent = match self.transport.send_text(chat_id, CRISIS_HELPLINES).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(chat_id = chat_id.0, error = %e, "failed to deliver crisis helplines");
                false
            }
        };

        let spoken_sent = match self.speak(chat_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(chat_id = chat_id.0, error = %e, "crisis voice message failed");
                false
            }
        };

        if helplines_sent || spoken_sent {
            Outcome::Delivered
        } else {
            Outcome::SilentlyDropped
        }
    }

    async fn speak(&self, chat_id: ChatId) -> Result<()> {
        let audio = self
            .synthesizer
            .synthesize(CRISIS_SPOKEN_MESSAGE, None)
            .await?;
        self.transport.send_voice(chat_id, audio, None).await
    }
}
