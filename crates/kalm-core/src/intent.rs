use crate::{
    domain::FileRef,
    messaging::types::{Payload, Update},
};

/// What the router decided to do with an update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    CompleteVoiceClone { file: FileRef },
    BeginVoiceClone,
    PlayPersonalMessage { text: Option<String> },
    RedirectToLiveCall,
    Onboard { category: Option<String> },
    DefaultReply { text: String },
    Ignore,
}

impl Intent {
    /// Short label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Intent::CompleteVoiceClone { .. } => "complete_voice_clone",
            Intent::BeginVoiceClone => "begin_voice_clone",
            Intent::PlayPersonalMessage { .. } => "play_personal_message",
            Intent::RedirectToLiveCall => "redirect_to_live_call",
            Intent::Onboard { .. } => "onboard",
            Intent::DefaultReply { .. } => "default_reply",
            Intent::Ignore => "ignore",
        }
    }
}

/// Classify an update. First match wins:
///
/// 1. pending clone + voice sample
/// 2. `/clone`
/// 3. `/personal [text]`
/// 4. `/call`
/// 5. `/start [category]`
/// 6. any other non-empty text
/// 7. everything else is ignored
pub fn classify(update: &Update, pending_clone: bool) -> Intent {
    let text = match &update.payload {
        Payload::Voice(file) if pending_clone => {
            return Intent::CompleteVoiceClone { file: file.clone() }
        }
        Payload::Text(text) => text,
        Payload::Voice(_) | Payload::Unsupported => return Intent::Ignore,
    };

    if text.starts_with("/clone") {
        return Intent::BeginVoiceClone;
    }
    if text.starts_with("/personal") {
        return Intent::PlayPersonalMessage {
            text: command_argument(text),
        };
    }
    if text.starts_with("/call") {
        return Intent::RedirectToLiveCall;
    }
    if text.starts_with("/start") {
        return Intent::Onboard {
            category: command_argument(text).map(|c| c.to_lowercase()),
        };
    }
    if !text.trim().is_empty() {
        return Intent::DefaultReply { text: text.clone() };
    }
    Intent::Ignore
}

/// Trailing free text after the command token, if any.
fn command_argument(text: &str) -> Option<String> {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let _command = parts.next();
    parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
