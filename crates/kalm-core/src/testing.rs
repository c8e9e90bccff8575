//! Hand-written fakes for the collaborator ports (unit tests only).

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, FileRef, VoiceId},
    errors::Error,
    messaging::port::ChatTransport,
    ports::{CrisisClassifier, Generator, SpeechSynthesizer},
    Result,
};

/// Ordered log of collaborator calls shared between fakes.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

#[derive(Default)]
pub struct FakeTransport {
    pub journal: Journal,
    pub texts: Mutex<Vec<(ChatId, String)>>,
    pub voices: Mutex<Vec<(ChatId, Vec<u8>, Option<String>)>>,
    pub fail_text: AtomicBool,
    /// Fails the next `send_text` only.
    pub fail_text_once: AtomicBool,
    pub fail_voice: AtomicBool,
    pub fail_download: AtomicBool,
}

impl FakeTransport {
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.texts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, t)| t.clone())
            .collect()
    }

    pub fn voice_count(&self) -> usize {
        self.voices.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.journal.lock().unwrap().push("send_text".to_string());
        if self.fail_text.load(Ordering::SeqCst) || self.fail_text_once.swap(false, Ordering::SeqCst) {
            return Err(Error::Transport("sendMessage not ok".to_string()));
        }
        self.texts.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_voice(
        &self,
        chat_id: ChatId,
        audio: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<()> {
        self.journal.lock().unwrap().push("send_voice".to_string());
        if self.fail_voice.load(Ordering::SeqCst) {
            return Err(Error::Transport("sendVoice not ok".to_string()));
        }
        self.voices
            .lock()
            .unwrap()
            .push((chat_id, audio, caption.map(str::to_string)));
        Ok(())
    }

    async fn attachment_location(&self, file: &FileRef) -> Result<String> {
        Ok(format!("voice/{}.oga", file.0))
    }

    async fn download_attachment(&self, _location: &str) -> Result<Vec<u8>> {
        if self.fail_download.load(Ordering::SeqCst) {
            return Err(Error::Transport("download failed".to_string()));
        }
        Ok(b"OggS-sample".to_vec())
    }
}

#[derive(Default)]
pub struct FakeGenerator {
    pub prompts: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

impl FakeGenerator {
    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().map(|(p, _)| p.clone())
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate_reply(&self, prompt: &str, user_name: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), user_name.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Collaborator("generation failed".to_string()));
        }
        Ok(format!("reply to {user_name}: {prompt}"))
    }
}

/// Classifier with a scripted answer; `None` means the call fails.
pub struct FakeClassifier {
    pub answer: Option<bool>,
}

#[async_trait]
impl CrisisClassifier for FakeClassifier {
    async fn is_crisis(&self, _text: &str) -> Result<bool> {
        self.answer
            .ok_or_else(|| Error::Collaborator("classifier unavailable".to_string()))
    }
}

#[derive(Default)]
pub struct FakeSynthesizer {
    pub journal: Journal,
    pub synthesized: Mutex<Vec<(String, Option<VoiceId>)>>,
    pub clones: Mutex<Vec<String>>,
    pub fail_synthesis: AtomicBool,
    pub fail_clone: AtomicBool,
}

impl FakeSynthesizer {
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: Option<&VoiceId>) -> Result<Vec<u8>> {
        self.journal.lock().unwrap().push("synthesize".to_string());
        self.synthesized
            .lock()
            .unwrap()
            .push((text.to_string(), voice_id.cloned()));
        if self.fail_synthesis.load(Ordering::SeqCst) {
            return Err(Error::Collaborator("tts failed".to_string()));
        }
        Ok(text.as_bytes().to_vec())
    }

    async fn clone_voice(&self, _audio: Vec<u8>, label: &str) -> Result<VoiceId> {
        self.journal.lock().unwrap().push("clone_voice".to_string());
        self.clones.lock().unwrap().push(label.to_string());
        if self.fail_clone.load(Ordering::SeqCst) {
            return Err(Error::Collaborator("clone failed".to_string()));
        }
        Ok(VoiceId(format!("voice-{label}")))
    }
}
