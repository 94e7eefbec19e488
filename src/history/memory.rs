use async_trait::async_trait;
use std::sync::Mutex;
use crate::history::{ MessageSlot, SlotError };
use crate::models::chat::Message;

/// In-process slot holding the serialized list, for runs without persistence.
#[derive(Debug, Default)]
pub struct MemorySlot {
    raw: Mutex<Option<String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the slot with arbitrary stored text.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self { raw: Mutex::new(Some(raw.into())) }
    }

    pub fn raw(&self) -> Option<String> {
        self.raw.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl MessageSlot for MemorySlot {
    async fn load(&self) -> Result<Option<Vec<Message>>, SlotError> {
        match self.raw() {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, messages: &[Message]) -> Result<(), SlotError> {
        let json = serde_json::to_string(messages)?;
        *self.raw.lock().unwrap_or_else(|e| e.into_inner()) = Some(json);
        Ok(())
    }

    async fn clear(&self) -> Result<(), SlotError> {
        *self.raw.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_and_clear() {
        let slot = MemorySlot::new();
        assert!(slot.load().await.unwrap().is_none());

        let messages = vec![Message::user("one"), Message::user("two")];
        slot.save(&messages).await.unwrap();
        assert_eq!(slot.load().await.unwrap(), Some(messages));

        slot.clear().await.unwrap();
        assert!(slot.raw().is_none());
    }

    #[tokio::test]
    async fn test_wrong_shape_is_corrupt() {
        let slot = MemorySlot::with_raw(r#"{"messages": []}"#);
        assert!(matches!(slot.load().await, Err(SlotError::Corrupt(_))));
    }
}
