use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::domain::ChatId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PendingState {
    /// `/clone` was sent; the next voice message is the sample.
    AwaitingSample,
    /// A sample was claimed and is being cloned.
    Cloning,
}

/// Chats currently expected to supply a voice sample for cloning.
///
/// All operations go through one mutex, so operations on the same chat are
/// serialized. `claim` is the only way into the cloning state, which keeps a
/// second sample from starting a second clone while the first is in flight.
#[derive(Debug, Default)]
pub struct PendingVoiceSet {
    inner: Mutex<HashMap<ChatId, PendingState>>,
}

impl PendingVoiceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the chat as awaiting a sample. Idempotent; a clone already in
    /// flight is left alone.
    pub async fn begin(&self, chat_id: ChatId) {
        let mut map = self.inner.lock().await;
        map.entry(chat_id).or_insert(PendingState::AwaitingSample);
    }

    pub async fn is_pending(&self, chat_id: ChatId) -> bool {
        let map = self.inner.lock().await;
        map.get(&chat_id) == Some(&PendingState::AwaitingSample)
    }

    /// Take ownership of the pending sample slot. Returns `false` if the chat
    /// is not awaiting a sample (never began, already claimed, or ended).
    pub async fn claim(&self, chat_id: ChatId) -> bool {
        let mut map = self.inner.lock().await;
        match map.get_mut(&chat_id) {
            Some(state @ PendingState::AwaitingSample) => {
                *state = PendingState::Cloning;
                true
            }
            _ => false,
        }
    }

    /// Clear the chat. Idempotent.
    pub async fn end(&self, chat_id: ChatId) {
        self.inner.lock().await.remove(&chat_id);
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn begin_is_idempotent() {
        let set = PendingVoiceSet::new();
        set.begin(ChatId(42)).await;
        set.begin(ChatId(42)).await;

        assert!(set.is_pending(ChatId(42)).await);
        assert_eq!(set.len().await, 1);

        set.end(ChatId(42)).await;
        assert!(!set.is_pending(ChatId(42)).await);
        assert!(set.is_empty().await);
    }

    #[tokio::test]
    async fn end_on_unknown_chat_is_noop() {
        let set = PendingVoiceSet::new();
        set.begin(ChatId(1)).await;
        set.end(ChatId(2)).await;
        set.end(ChatId(2)).await;

        assert!(set.is_pending(ChatId(1)).await);
        assert_eq!(set.len().await, 1);
    }

    #[tokio::test]
    async fn claim_succeeds_once() {
        let set = PendingVoiceSet::new();
        assert!(!set.claim(ChatId(5)).await);

        set.begin(ChatId(5)).await;
        assert!(set.claim(ChatId(5)).await);
        assert!(!set.claim(ChatId(5)).await);

        // While cloning the chat no longer captures voice messages.
        assert!(!set.is_pending(ChatId(5)).await);

        // A repeated /clone does not reset an in-flight clone.
        set.begin(ChatId(5)).await;
        assert!(!set.is_pending(ChatId(5)).await);

        set.end(ChatId(5)).await;
        set.begin(ChatId(5)).await;
        assert!(set.is_pending(ChatId(5)).await);
    }

    #[tokio::test]
    async fn concurrent_claims_for_same_chat_have_one_winner() {
        let set = Arc::new(PendingVoiceSet::new());
        set.begin(ChatId(9)).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let set = set.clone();
            handles.push(tokio::spawn(async move { set.claim(ChatId(9)).await }));
        }

        let mut winners = 0;
        for h in handles {
            if h.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn different_chats_do_not_interfere() {
        let set = PendingVoiceSet::new();
        set.begin(ChatId(1)).await;
        set.begin(ChatId(2)).await;
        assert!(set.claim(ChatId(1)).await);
        set.end(ChatId(1)).await;

        assert!(set.is_pending(ChatId(2)).await);
        assert!(!set.is_pending(ChatId(1)).await);
    }
}
