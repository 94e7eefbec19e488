use log::{ debug, info, warn };
use std::sync::atomic::{ AtomicU64, Ordering };
use std::sync::{ Arc, Mutex, MutexGuard };
use thiserror::Error;
use tokio::sync::{ Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard };

use crate::api::ChatBackend;
use crate::history::MessageSlot;
use crate::models::api::HealthStatus;
use crate::models::chat::{ Message, MessageMetadata };

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConversationError {
    #[error("a request is already in flight")]
    Busy,
}

#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Starting messages when nothing usable is stored.
    pub initial_messages: Vec<Message>,
    /// Mirror the conversation into the durable slot.
    pub persist: bool,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            initial_messages: Vec::new(),
            persist: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationSnapshot {
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&ConversationSnapshot) + Send + Sync>;

struct Inner {
    backend: Arc<dyn ChatBackend>,
    slot: Arc<dyn MessageSlot>,
    persist: bool,
    state: Mutex<ConversationSnapshot>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
    /// Held by `send_message`/`reset` until their last slot write lands.
    flight: AsyncMutex<()>,
}

/// Owns the active conversation and mediates every backend call made for it.
///
/// Only one `send_message` or `reset` may be outstanding at a time; overlapping
/// calls are rejected with [`ConversationError::Busy`]. Subscribers are told
/// about every state change, after the change is applied.
#[derive(Clone)]
pub struct ConversationManager {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl ConversationManager {
    pub async fn new(
        backend: Arc<dyn ChatBackend>,
        slot: Arc<dyn MessageSlot>,
        options: ManagerOptions
    ) -> Self {
        let messages = if options.persist {
            match slot.load().await {
                Ok(Some(messages)) => {
                    info!("Restored {} messages from chat history", messages.len());
                    messages
                }
                Ok(None) => options.initial_messages,
                Err(e) => {
                    warn!("Failed to load chat history, starting empty: {}", e);
                    options.initial_messages
                }
            }
        } else {
            options.initial_messages
        };

        Self {
            inner: Arc::new(Inner {
                backend,
                slot,
                persist: options.persist,
                state: Mutex::new(ConversationSnapshot {
                    messages,
                    is_loading: false,
                    error: None,
                }),
                listeners: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(0),
                flight: AsyncMutex::new(()),
            }),
        }
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        lock(&self.inner.state).clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        lock(&self.inner.state).messages.clone()
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.inner.state).is_loading
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.inner.state).error.clone()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
        where F: Fn(&ConversationSnapshot) + Send + Sync + 'static
    {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        lock(&self.inner.listeners).push((id, Arc::new(listener)));
        id
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = lock(&self.inner.listeners);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Applies `change` under the state lock, then notifies subscribers.
    fn update<F>(&self, change: F) -> ConversationSnapshot
        where F: FnOnce(&mut ConversationSnapshot)
    {
        let snapshot = {
            let mut state = lock(&self.inner.state);
            change(&mut state);
            state.clone()
        };

        let listeners: Vec<Listener> = lock(&self.inner.listeners)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&snapshot);
        }

        snapshot
    }

    fn begin_flight(&self) -> Result<AsyncMutexGuard<'_, ()>, ConversationError> {
        self.inner.flight.try_lock().map_err(|_| ConversationError::Busy)
    }

    async fn write_through(&self, messages: &[Message]) {
        if !self.inner.persist {
            return;
        }
        if let Err(e) = self.inner.slot.save(messages).await {
            warn!("Failed to save chat history: {}", e);
        }
    }

    /// Appends `text` as a user turn and asks the backend for the reply.
    ///
    /// Blank input is ignored. Backend failures never surface here: they set
    /// `error` and append a flagged assistant placeholder instead.
    pub async fn send_message(&self, text: &str) -> Result<(), ConversationError> {
        if text.trim().is_empty() {
            return Ok(());
        }

        let _flight = self.begin_flight()?;

        let snapshot = self.update(|state| {
            state.messages.push(Message::user(text));
            state.is_loading = true;
            state.error = None;
        });
        self.write_through(&snapshot.messages).await;

        let outcome = self.inner.backend.submit_message(text).await;

        let snapshot = self.update(|state| {
            match outcome {
                Ok(response) => {
                    debug!(
                        "Received answer with {} sources in {:?}s",
                        response.sources.as_ref().map_or(0, Vec::len),
                        response.processing_time
                    );
                    state.messages.push(
                        Message::assistant(response.answer, MessageMetadata {
                            sources: response.sources,
                            processing_time: response.processing_time,
                        })
                    );
                }
                Err(e) => {
                    warn!("Chat request failed: {}", e);
                    state.error = Some(e.to_string());
                    state.messages.push(Message::failure());
                }
            }
            state.is_loading = false;
        });
        self.write_through(&snapshot.messages).await;

        Ok(())
    }

    /// Asks the backend to forget the conversation, then clears it locally.
    ///
    /// On failure the messages are kept and `error` is set.
    pub async fn reset(&self) -> Result<(), ConversationError> {
        let _flight = self.begin_flight()?;

        self.update(|state| state.is_loading = true);

        match self.inner.backend.reset_conversation().await {
            Ok(status) => {
                debug!("Backend reset status: {:?}", status);
                if self.inner.persist {
                    if let Err(e) = self.inner.slot.clear().await {
                        warn!("Failed to clear chat history: {}", e);
                    }
                }
                self.update(|state| {
                    state.messages.clear();
                    state.error = None;
                    state.is_loading = false;
                });
                info!("Conversation reset");
            }
            Err(e) => {
                warn!("Failed to reset conversation: {}", e);
                self.update(|state| {
                    state.error = Some(e.to_string());
                    state.is_loading = false;
                });
            }
        }

        Ok(())
    }

    pub async fn check_health(&self) -> HealthStatus {
        self.inner.backend.check_health().await
    }
}
