use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    domain::{ChatId, VoiceId},
    ports::VoiceStore,
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceRecord {
    pub voice_id: VoiceId,
    /// RFC3339 UTC.
    pub cloned_at: String,
}

/// File format: `{ "<chat_id>": { "voice_id": "...", "cloned_at": "..." } }`.
type VoiceFileData = HashMap<String, VoiceRecord>;

/// Voice-identity store backed by a JSON file.
///
/// The whole map is held in memory and rewritten (temp file + rename) on every
/// successful clone.
pub struct JsonFileVoiceStore {
    path: PathBuf,
    records: Mutex<HashMap<ChatId, VoiceRecord>>,
}

impl JsonFileVoiceStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = load_voice_file(&path).await?;
        tracing::info!(path = %path.display(), voices = records.len(), "voice store loaded");
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub async fn record(&self, chat_id: ChatId) -> Option<VoiceRecord> {
        self.records.lock().await.get(&chat_id).cloned()
    }
}

#[async_trait]
impl VoiceStore for JsonFileVoiceStore {
    async fn voice_id(&self, chat_id: ChatId) -> Result<Option<VoiceId>> {
        Ok(self
            .records
            .lock()
            .await
            .get(&chat_id)
            .map(|r| r.voice_id.clone()))
    }

    async fn set_voice_id(&self, chat_id: ChatId, voice_id: VoiceId) -> Result<()> {
        let mut records = self.records.lock().await;
        records.insert(
            chat_id,
            VoiceRecord {
                voice_id,
                cloned_at: chrono::Utc::now().to_rfc3339(),
            },
        );
        // Persist under the lock; writers must not interleave snapshots.
        save_voice_file(&self.path, &records).await
    }
}

async fn load_voice_file(path: &Path) -> Result<HashMap<ChatId, VoiceRecord>> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(HashMap::new());
    }
    let txt = tokio::fs::read_to_string(path).await?;
    if txt.trim().is_empty() {
        return Ok(HashMap::new());
    }

    let data: VoiceFileData = serde_json::from_str(&txt)?;
    let mut out = HashMap::with_capacity(data.len());
    for (key, record) in data {
        match key.parse::<i64>() {
            Ok(id) => {
                out.insert(ChatId(id), record);
            }
            Err(_) => tracing::warn!(key = %key, "skipping voice record with non-numeric chat id"),
        }
    }
    Ok(out)
}

async fn save_voice_file(path: &Path, records: &HashMap<ChatId, VoiceRecord>) -> Result<()> {
    let data: VoiceFileData = records
        .iter()
        .map(|(chat, rec)| (chat.0.to_string(), rec.clone()))
        .collect();
    let txt = serde_json::to_string_pretty(&data)?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, txt).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Non-persistent store.
#[derive(Debug, Default)]
pub struct InMemoryVoiceStore {
    inner: Mutex<HashMap<ChatId, VoiceId>>,
}

impl InMemoryVoiceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VoiceStore for InMemoryVoiceStore {
    async fn voice_id(&self, chat_id: ChatId) -> Result<Option<VoiceId>> {
        Ok(self.inner.lock().await.get(&chat_id).cloned())
    }

    async fn set_voice_id(&self, chat_id: ChatId, voice_id: VoiceId) -> Result<()> {
        self.inner.lock().await.insert(chat_id, voice_id);
        Ok(())
    }
}
