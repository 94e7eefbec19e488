mod file;
mod memory;

use async_trait::async_trait;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use crate::cli::Args;
use crate::models::chat::Message;

pub use self::file::FileSlot;
pub use self::memory::MemorySlot;

/// Name of the single durable slot holding the conversation.
pub const SLOT_FILE_NAME: &str = "chat-messages.json";
const APP_DIR: &str = "rag-chat";

#[derive(Debug, Error)]
pub enum SlotError {
    #[error("history storage unavailable: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored history is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A single persisted slot holding the whole ordered message list.
#[async_trait]
pub trait MessageSlot: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    async fn load(&self) -> Result<Option<Vec<Message>>, SlotError>;

    async fn save(&self, messages: &[Message]) -> Result<(), SlotError>;

    /// Removes the slot. Clearing an absent slot succeeds.
    async fn clear(&self) -> Result<(), SlotError>;
}

pub fn default_slot_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(SLOT_FILE_NAME)
}

pub fn create_slot(args: &Args) -> Arc<dyn MessageSlot> {
    if args.no_persist {
        info!("Chat history persistence disabled, keeping messages in memory");
        return Arc::new(MemorySlot::new());
    }
    let path = args.history_path.clone().unwrap_or_else(default_slot_path);
    info!("Chat history will be stored in: {}", path.display());
    Arc::new(FileSlot::new(path))
}
