use async_trait::async_trait;

use crate::{
    domain::{ChatId, FileRef},
    Result,
};

/// Outbound side of the chat transport.
///
/// Every method fails with `Error::Transport` when the remote reports not-ok.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;

    async fn send_voice(&self, chat_id: ChatId, audio: Vec<u8>, caption: Option<&str>)
        -> Result<()>;

    /// Resolve an attachment reference into a downloadable location.
    async fn attachment_location(&self, file: &FileRef) -> Result<String>;

    async fn download_attachment(&self, location: &str) -> Result<Vec<u8>>;
}
