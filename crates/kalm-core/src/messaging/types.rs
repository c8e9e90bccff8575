use crate::domain::{ChatId, FileRef};

/// Display name used when the transport does not tell us who is talking.
pub const DEFAULT_SENDER_NAME: &str = "friend";

/// Cross-messenger incoming update model.
///
/// Telegram-specific fields live in the Telegram adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Update {
    pub update_id: i64,
    pub chat_id: ChatId,
    pub sender_name: String,
    pub payload: Payload,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Voice(FileRef),
    /// Anything else (photos, stickers, documents...). Routed to `Ignore`.
    Unsupported,
}

impl Update {
    pub fn text(update_id: i64, chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            update_id,
            chat_id,
            sender_name: DEFAULT_SENDER_NAME.to_string(),
            payload: Payload::Text(text.into()),
        }
    }

    pub fn voice(update_id: i64, chat_id: ChatId, file: impl Into<String>) -> Self {
        Self {
            update_id,
            chat_id,
            sender_name: DEFAULT_SENDER_NAME.to_string(),
            payload: Payload::Voice(FileRef(file.into())),
        }
    }

    pub fn with_sender(mut self, name: Option<&str>) -> Self {
        self.sender_name = name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SENDER_NAME)
            .to_string();
        self
    }
}

/// One entry of a long-poll batch.
///
/// `update` is `None` for update kinds the core cannot represent (edited
/// messages, callback queries...); their id still advances the cursor.
#[derive(Clone, Debug)]
pub struct PolledUpdate {
    pub update_id: i64,
    pub update: Option<Update>,
}

impl From<Update> for PolledUpdate {
    fn from(update: Update) -> Self {
        Self {
            update_id: update.update_id,
            update: Some(update),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_name_falls_back_to_placeholder() {
        let u = Update::text(1, ChatId(1), "hi").with_sender(Some("  "));
        assert_eq!(u.sender_name, DEFAULT_SENDER_NAME);

        let u = Update::text(1, ChatId(1), "hi").with_sender(None);
        assert_eq!(u.sender_name, DEFAULT_SENDER_NAME);

        let u = Update::text(1, ChatId(1), "hi").with_sender(Some("Ana"));
        assert_eq!(u.sender_name, "Ana");
    }
}
