use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, FileRef},
    messaging::port::ChatTransport,
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* outbound sends (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between sends to the same chat.
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40), // ~25/sec
            per_chat_min_interval: Duration::from_millis(1050), // ~0.95/sec
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        self.reserve_at(Instant::now())
    }

    fn reserve_at(&mut self, now: Instant) -> Duration {
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }

    fn is_idle_at(&self, now: Instant) -> bool {
        self.next <= now
    }
}

/// Per-chat limiters. Limiters whose slot has passed behave like fresh ones,
/// so they are dropped on every reservation.
#[derive(Debug)]
struct ChatLimiters {
    interval: Duration,
    chats: HashMap<ChatId, IntervalLimiter>,
}

impl ChatLimiters {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            chats: HashMap::new(),
        }
    }

    fn reserve_at(&mut self, chat_id: ChatId, now: Instant) -> Duration {
        self.chats.retain(|_, lim| !lim.is_idle_at(now));
        let interval = self.interval;
        self.chats
            .entry(chat_id)
            .or_insert_with(|| IntervalLimiter {
                interval,
                next: now,
            })
            .reserve_at(now)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.chats.len()
    }
}

/// ChatTransport decorator that rate-limits outbound sends.
///
/// Best-effort defense against Telegram 429 errors. Attachment lookups and
/// downloads hit the file endpoint and are passed through untouched.
pub struct ThrottledTransport {
    inner: Arc<dyn ChatTransport>,
    global: Mutex<IntervalLimiter>,
    per_chat: Mutex<ChatLimiters>,
}

impl ThrottledTransport {
    pub fn new(inner: Arc<dyn ChatTransport>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_chat: Mutex::new(ChatLimiters::new(cfg.per_chat_min_interval)),
        }
    }

    async fn throttle_chat(&self, chat_id: ChatId) {
        let global_wait = { self.global.lock().await.reserve() };
        let chat_wait = {
            self.per_chat
                .lock()
                .await
                .reserve_at(chat_id, Instant::now())
        };

        let wait = global_wait.max(chat_wait);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl ChatTransport for ThrottledTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.throttle_chat(chat_id).await;
        self.inner.send_text(chat_id, text).await
    }

    async fn send_voice(
        &self,
        chat_id: ChatId,
        audio: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<()> {
        self.throttle_chat(chat_id).await;
        self.inner.send_voice(chat_id, audio, caption).await
    }

    async fn attachment_location(&self, file: &FileRef) -> Result<String> {
        self.inner.attachment_location(file).await
    }

    async fn download_attachment(&self, location: &str) -> Result<Vec<u8>> {
        self.inner.download_attachment(location).await
    }
}
