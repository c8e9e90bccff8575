//! Update source: long-polling loop or webhook pushes, exactly one at a time.

use std::{sync::Arc, time::Duration};

use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    errors::Error, messaging::types::Update, ports::UpdateFetcher, Result,
};

/// Receives accepted updates. Must not block: handling happens elsewhere.
pub trait UpdateHandler: Send + Sync {
    fn dispatch(&self, update: Update);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateMode {
    Polling,
    Webhook,
}

impl UpdateMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "polling" | "poll" => Some(Self::Polling),
            "webhook" => Some(Self::Webhook),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PollSettings {
    /// Long-poll wait passed to the transport.
    pub wait: Duration,
    /// Fixed delay after a failed fetch.
    pub retry_delay: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(30),
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Polling watermark: the first update id not yet fetched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessingCursor {
    offset: Option<i64>,
}

impl ProcessingCursor {
    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    /// Move past every id in the batch. Never moves backwards.
    pub fn advance(&mut self, ids: impl IntoIterator<Item = i64>) {
        if let Some(max) = ids.into_iter().max() {
            let next = max + 1;
            self.offset = Some(self.offset.map_or(next, |cur| cur.max(next)));
        }
    }
}

struct PollTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct IngestionState {
    mode: Option<UpdateMode>,
    poll: Option<PollTask>,
    /// Set once webhook mode has been entered; survives `stop`.
    webhook_activated: bool,
}

/// Lifecycle of the update source, owned by the service root.
///
/// Transitions: idle -> polling, idle -> webhook, polling -> webhook.
/// Once webhook mode has been entered, polling is rejected for the lifetime of
/// the process, including after `stop`.
pub struct Ingestion {
    fetcher: Arc<dyn UpdateFetcher>,
    handler: Arc<dyn UpdateHandler>,
    settings: PollSettings,
    state: Mutex<IngestionState>,
}

impl Ingestion {
    pub fn new(
        fetcher: Arc<dyn UpdateFetcher>,
        handler: Arc<dyn UpdateHandler>,
        settings: PollSettings,
    ) -> Self {
        Self {
            fetcher,
            handler,
            settings,
            state: Mutex::new(IngestionState::default()),
        }
    }

    pub async fn mode(&self) -> Option<UpdateMode> {
        self.state.lock().await.mode
    }

    pub async fn start(&self, mode: UpdateMode) -> Result<()> {
        let mut st = self.state.lock().await;
        match (st.mode, mode) {
            (Some(current), requested) if current == requested => Ok(()),
            (_, UpdateMode::Polling) if st.webhook_activated => Err(Error::Config(
                "cannot switch from webhook back to polling".to_string(),
            )),
            (_, UpdateMode::Polling) => {
                let cancel = CancellationToken::new();
                let handle = tokio::spawn(poll_loop(
                    self.fetcher.clone(),
                    self.handler.clone(),
                    self.settings,
                    cancel.clone(),
                ));
                st.poll = Some(PollTask { cancel, handle });
                st.mode = Some(UpdateMode::Polling);
                tracing::info!("update source: polling");
                Ok(())
            }
            (_, UpdateMode::Webhook) => {
                if let Some(task) = st.poll.take() {
                    stop_poll_task(task).await;
                }
                st.mode = Some(UpdateMode::Webhook);
                st.webhook_activated = true;
                tracing::info!("update source: webhook");
                Ok(())
            }
        }
    }

    /// Stop ingesting. In-flight handlers are not awaited.
    pub async fn stop(&self) {
        let mut st = self.state.lock().await;
        if let Some(task) = st.poll.take() {
            stop_poll_task(task).await;
        }
        st.mode = None;
        tracing::info!("update source stopped");
    }

    /// Accept one pushed update. Returns whether it was dispatched; pushes
    /// outside webhook mode are dropped.
    pub async fn submit(&self, update: Update) -> bool {
        if self.mode().await != Some(UpdateMode::Webhook) {
            tracing::warn!(update_id = update.update_id, "webhook push while not in webhook mode, dropping");
            return false;
        }
        self.handler.dispatch(update);
        true
    }
}

async fn stop_poll_task(task: PollTask) {
    task.cancel.cancel();
    if let Err(e) = task.handle.await {
        tracing::warn!(error = %e, "poll loop ended abnormally");
    }
}

/// Fetch, advance the cursor, dispatch, repeat. Ends only on cancellation.
async fn poll_loop(
    fetcher: Arc<dyn UpdateFetcher>,
    handler: Arc<dyn UpdateHandler>,
    settings: PollSettings,
    cancel: CancellationToken,
) {
    let mut cursor = ProcessingCursor::default();

    loop {
        let fetched = tokio::select! {
            _ = cancel.cancelled() => return,
            r = fetcher.fetch_updates(cursor.offset(), settings.wait) => r,
        };

        match fetched {
            Ok(batch) => {
                cursor.advance(batch.iter().map(|p| p.update_id));
                for polled in batch {
                    match polled.update {
                        Some(update) => handler.dispatch(update),
                        None => tracing::debug!(update_id = polled.update_id, "skipping unsupported update"),
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, retry_in = ?settings.retry_delay, "polling failed");
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(settings.retry_delay) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::ChatId, messaging::types::PolledUpdate};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Recorder {
        seen: StdMutex<Vec<i64>>,
    }

    impl UpdateHandler for Recorder {
        fn dispatch(&self, update: Update) {
            self.seen.lock().unwrap().push(update.update_id);
        }
    }

    /// Replays scripted batches, then parks until cancelled.
    struct ScriptedFetcher {
        script: StdMutex<VecDeque<Result<Vec<PolledUpdate>>>>,
        offsets: StdMutex<Vec<Option<i64>>>,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<Result<Vec<PolledUpdate>>>) -> Self {
            Self {
                script: StdMutex::new(script.into()),
                offsets: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl UpdateFetcher for ScriptedFetcher {
        async fn fetch_updates(
            &self,
            offset: Option<i64>,
            _wait: Duration,
        ) -> Result<Vec<PolledUpdate>> {
            self.offsets.lock().unwrap().push(offset);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(r) => r,
                None => std::future::pending().await,
            }
        }
    }

    fn polled(id: i64) -> PolledUpdate {
        Update::text(id, ChatId(1), "hi").into()
    }

    fn fast() -> PollSettings {
        PollSettings {
            wait: Duration::from_secs(1),
            retry_delay: Duration::from_millis(1),
        }
    }

    async fn wait_for(cond: impl Fn() -> bool) {
        for _ in 0..500 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("condition not reached");
    }

    #[test]
    fn cursor_is_max_plus_one_regardless_of_order() {
        let mut c = ProcessingCursor::default();
        assert_eq!(c.offset(), None);

        c.advance([7, 3, 9, 5]);
        assert_eq!(c.offset(), Some(10));

        // Older ids never move it back.
        c.advance([2]);
        assert_eq!(c.offset(), Some(10));

        c.advance(std::iter::empty());
        assert_eq!(c.offset(), Some(10));

        c.advance([10]);
        assert_eq!(c.offset(), Some(11));
    }

    #[tokio::test]
    async fn polling_dispatches_in_order_and_retries_after_errors() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Err(Error::Transport("network down".to_string())),
            Ok(vec![polled(5), polled(3), PolledUpdate { update_id: 8, update: None }]),
            Err(Error::Transport("bad json".to_string())),
            Ok(vec![polled(9)]),
        ]));
        let recorder = Arc::new(Recorder::default());
        let ingestion = Ingestion::new(fetcher.clone(), recorder.clone(), fast());

        ingestion.start(UpdateMode::Polling).await.unwrap();
        wait_for(|| recorder.seen.lock().unwrap().len() == 3).await;
        wait_for(|| fetcher.offsets.lock().unwrap().len() == 5).await;
        ingestion.stop().await;

        assert_eq!(recorder.seen.lock().unwrap().clone(), vec![5, 3, 9]);
        assert_eq!(
            fetcher.offsets.lock().unwrap().clone(),
            vec![None, None, Some(9), Some(9), Some(10)]
        );
        assert_eq!(ingestion.mode().await, None);
    }

    #[tokio::test]
    async fn webhook_mode_cancels_polling_and_accepts_pushes() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![]));
        let recorder = Arc::new(Recorder::default());
        let ingestion = Ingestion::new(fetcher.clone(), recorder.clone(), fast());

        // Pushes are dropped until webhook mode is active.
        assert!(!ingestion.submit(Update::text(1, ChatId(1), "x")).await);

        ingestion.start(UpdateMode::Polling).await.unwrap();
        wait_for(|| !fetcher.offsets.lock().unwrap().is_empty()).await;

        ingestion.start(UpdateMode::Webhook).await.unwrap();
        assert_eq!(ingestion.mode().await, Some(UpdateMode::Webhook));
        assert!(ingestion.state.lock().await.poll.is_none());

        assert!(ingestion.submit(Update::text(2, ChatId(1), "y")).await);
        assert_eq!(recorder.seen.lock().unwrap().clone(), vec![2]);
    }

    #[tokio::test]
    async fn webhook_to_polling_is_rejected() {
        let ingestion = Ingestion::new(
            Arc::new(ScriptedFetcher::new(vec![])),
            Arc::new(Recorder::default()),
            fast(),
        );

        ingestion.start(UpdateMode::Webhook).await.unwrap();
        ingestion.start(UpdateMode::Webhook).await.unwrap();

        let err = ingestion.start(UpdateMode::Polling).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(ingestion.mode().await, Some(UpdateMode::Webhook));
    }

    #[tokio::test]
    async fn polling_stays_rejected_after_webhook_and_stop() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![]));
        let ingestion = Ingestion::new(fetcher.clone(), Arc::new(Recorder::default()), fast());

        ingestion.start(UpdateMode::Webhook).await.unwrap();
        ingestion.stop().await;
        assert_eq!(ingestion.mode().await, None);

        let err = ingestion.start(UpdateMode::Polling).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(ingestion.mode().await, None);
        assert!(fetcher.offsets.lock().unwrap().is_empty());

        // Webhook can still be resumed.
        ingestion.start(UpdateMode::Webhook).await.unwrap();
        assert_eq!(ingestion.mode().await, Some(UpdateMode::Webhook));
    }

    #[tokio::test]
    async fn polling_can_restart_after_stop() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![]));
        let ingestion = Ingestion::new(fetcher.clone(), Arc::new(Recorder::default()), fast());

        ingestion.start(UpdateMode::Polling).await.unwrap();
        ingestion.stop().await;
        ingestion.start(UpdateMode::Polling).await.unwrap();
        assert_eq!(ingestion.mode().await, Some(UpdateMode::Polling));
        ingestion.stop().await;
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!(UpdateMode::parse("Polling"), Some(UpdateMode::Polling));
        assert_eq!(UpdateMode::parse(" webhook "), Some(UpdateMode::Webhook));
        assert_eq!(UpdateMode::parse("push"), None);
    }
}
