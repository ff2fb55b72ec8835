pub mod telegram;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{DigestError, DigestResult};
use crate::SubscriberId;

/// Outbound messaging channel. One attempt per call; callers decide what a
/// failure means.
#[async_trait::async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn send(&self, subscriber_id: SubscriberId, text: &str) -> DigestResult<()>;
    fn channel_name(&self) -> &'static str;
}

pub type DynChannel = Arc<dyn DeliveryChannel>;

/// Logs messages instead of sending them. Used when no bot token is set.
pub struct LogChannel;

#[async_trait::async_trait]
impl DeliveryChannel for LogChannel {
    async fn send(&self, subscriber_id: SubscriberId, text: &str) -> DigestResult<()> {
        tracing::info!(target: "digest", subscriber = subscriber_id, chars = text.chars().count(), "delivery disabled, message:\n{text}");
        Ok(())
    }

    fn channel_name(&self) -> &'static str {
        "log"
    }
}

/// Keeps sent messages in memory.
#[derive(Default)]
pub struct MemoryChannel {
    sent: Mutex<Vec<(SubscriberId, String)>>,
    failing: AtomicBool,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(SubscriberId, String)> {
        self.sent.lock().expect("channel mutex poisoned").clone()
    }
}

#[async_trait::async_trait]
impl DeliveryChannel for MemoryChannel {
    async fn send(&self, subscriber_id: SubscriberId, text: &str) -> DigestResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DigestError::Delivery("memory channel set to fail".into()));
        }
        self.sent
            .lock()
            .expect("channel mutex poisoned")
            .push((subscriber_id, text.to_string()));
        Ok(())
    }

    fn channel_name(&self) -> &'static str {
        "memory"
    }
}
