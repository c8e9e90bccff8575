//! Telegram adapter (teloxide).
//!
//! This crate implements the `kalm-core` ChatTransport / UpdateFetcher ports over
//! the Telegram Bot API, plus the HTTP surface and service root.

use std::time::Duration;

use async_trait::async_trait;

use teloxide::{
    net::Download,
    prelude::*,
    types::{AllowedUpdate, InputFile, UpdateKind},
};

use tokio::time::sleep;

pub mod router;
pub mod server;

use kalm_core::{
    domain::{ChatId, FileRef},
    errors::Error,
    messaging::{
        port::ChatTransport,
        types::{Payload, PolledUpdate, Update},
    },
    ports::UpdateFetcher,
    Result,
};

use crate::server::WebhookRegistrar;

#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Build a bot whose HTTP timeout outlasts the long-poll wait.
    pub fn connect(token: &str, poll_wait: Duration) -> Result<Self> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(poll_wait + Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Config(format!("telegram http client: {e}")))?;
        Ok(Self::new(Bot::with_client(token, client)))
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }

    pub async fn username(&self) -> Result<String> {
        let me = self.with_retry(|| self.bot.get_me()).await?;
        Ok(me.username().to_string())
    }

    pub async fn delete_webhook(&self) -> Result<()> {
        self.with_retry(|| self.bot.delete_webhook()).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.with_retry(|| self.bot.send_message(Self::tg_chat(chat_id), text.to_string()))
            .await?;
        Ok(())
    }

    async fn send_voice(
        &self,
        chat_id: ChatId,
        audio: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<()> {
        self.with_retry(|| {
            let file = InputFile::memory(audio.clone()).file_name("message.mp3");
            let mut req = self.bot.send_voice(Self::tg_chat(chat_id), file);
            if let Some(c) = caption {
                req = req.caption(c.to_string());
            }
            req
        })
        .await?;
        Ok(())
    }

    async fn attachment_location(&self, file: &FileRef) -> Result<String> {
        let f = self.with_retry(|| self.bot.get_file(file.0.clone())).await?;
        Ok(f.path)
    }

    async fn download_attachment(&self, location: &str) -> Result<Vec<u8>> {
        let mut buf: Vec<u8> = Vec::new();
        self.bot
            .download_file(location, &mut buf)
            .await
            .map_err(|e| Error::Transport(format!("telegram download error: {e}")))?;
        Ok(buf)
    }
}

#[async_trait]
impl UpdateFetcher for TelegramTransport {
    async fn fetch_updates(
        &self,
        offset: Option<i64>,
        wait: Duration,
    ) -> Result<Vec<PolledUpdate>> {
        let timeout = u32::try_from(wait.as_secs()).unwrap_or(u32::MAX);
        let mut req = self
            .bot
            .get_updates()
            .timeout(timeout)
            .allowed_updates(vec![AllowedUpdate::Message]);
        if let Some(off) = offset {
            let off = i32::try_from(off)
                .map_err(|_| Error::Transport(format!("update offset {off} out of range")))?;
            req = req.offset(off);
        }

        let updates = req.await.map_err(Self::map_err)?;
        Ok(updates
            .iter()
            .map(|u| PolledUpdate {
                update_id: i64::from(u.id),
                update: to_core_update(u),
            })
            .collect())
    }
}

#[async_trait]
impl WebhookRegistrar for TelegramTransport {
    async fn register_webhook(&self, url: &str, secret: Option<&str>) -> Result<()> {
        let url = reqwest::Url::parse(url)
            .map_err(|e| Error::Config(format!("invalid webhook url '{url}': {e}")))?;
        self.with_retry(|| {
            let mut req = self.bot.set_webhook(url.clone());
            if let Some(s) = secret {
                req = req.secret_token(s.to_string());
            }
            req.allowed_updates(vec![AllowedUpdate::Message])
        })
        .await?;
        Ok(())
    }
}

/// Map a Telegram update into the core model. Non-message updates map to `None`.
pub fn to_core_update(update: &teloxide::types::Update) -> Option<Update> {
    let UpdateKind::Message(msg) = &update.kind else {
        return None;
    };

    let payload = if let Some(text) = msg.text() {
        Payload::Text(text.to_string())
    } else if let Some(voice) = msg.voice() {
        Payload::Voice(FileRef(voice.file.id.clone()))
    } else {
        Payload::Unsupported
    };

    let update = Update {
        update_id: i64::from(update.id),
        chat_id: ChatId(msg.chat.id.0),
        sender_name: String::new(),
        payload,
    };
    Some(update.with_sender(msg.from().map(|u| u.first_name.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: serde_json::Value) -> teloxide::types::Update {
        serde_json::from_str(&v.to_string()).unwrap()
    }

    fn message(update_id: i64, body: serde_json::Value) -> serde_json::Value {
        let mut msg = json!({
            "message_id": 10,
            "date": 1_700_000_000,
            "chat": { "id": 42, "type": "private", "first_name": "Ana" },
            "from": { "id": 42, "is_bot": false, "first_name": "Ana" },
        });
        if let (Some(m), Some(b)) = (msg.as_object_mut(), body.as_object()) {
            for (k, v) in b {
                m.insert(k.clone(), v.clone());
            }
        }
        json!({ "update_id": update_id, "message": msg })
    }

    #[test]
    fn converts_text_message() {
        let u = to_core_update(&parse(message(5, json!({ "text": "/clone" })))).unwrap();
        assert_eq!(u.update_id, 5);
        assert_eq!(u.chat_id, ChatId(42));
        assert_eq!(u.sender_name, "Ana");
        assert_eq!(u.payload, Payload::Text("/clone".to_string()));
    }

    #[test]
    fn converts_voice_message() {
        let u = to_core_update(&parse(message(
            6,
            json!({
                "voice": {
                    "file_id": "f1",
                    "file_unique_id": "u1",
                    "duration": 31,
                    "mime_type": "audio/ogg",
                    "file_size": 1024
                }
            }),
        )))
        .unwrap();
        assert_eq!(u.payload, Payload::Voice(FileRef("f1".to_string())));
    }

    #[test]
    fn other_attachments_are_unsupported() {
        let u = to_core_update(&parse(message(
            7,
            json!({
                "photo": [{ "file_id": "p", "file_unique_id": "pu", "width": 1, "height": 1 }]
            }),
        )))
        .unwrap();
        assert_eq!(u.payload, Payload::Unsupported);
    }
}
