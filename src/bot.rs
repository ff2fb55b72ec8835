//! bot.rs: routes inbound gateway events to the scheduler and the
//! conversation store.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::conversation::Conversations;
use crate::error::DigestResult;
use crate::notify::DynChannel;
use crate::scheduler::Scheduler;
use crate::SubscriberId;

pub const ASK_NAME: &str = "Welcome! I couldn't detect your name. What should I call you?";
pub const FALLBACK_REPLY: &str =
    "Sorry, I couldn't come up with a reply just now. Try me again in a minute?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Subscribe {
        subscriber_id: SubscriberId,
        display_name: Option<String>,
    },
    Unsubscribe {
        subscriber_id: SubscriberId,
    },
    Text {
        subscriber_id: SubscriberId,
        text: String,
    },
}

/// Short, non-reversible id for a message, for logs.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub struct Bot {
    scheduler: Arc<Scheduler>,
    conversations: Conversations,
    replies: DynChannel,
    fallback_name: Option<String>,
    awaiting_name: Mutex<HashSet<SubscriberId>>,
}

impl Bot {
    pub fn new(
        scheduler: Arc<Scheduler>,
        conversations: Conversations,
        replies: DynChannel,
        fallback_name: Option<String>,
    ) -> Self {
        Self {
            scheduler,
            conversations,
            replies,
            fallback_name: fallback_name.filter(|n| !n.trim().is_empty()),
            awaiting_name: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_awaiting_name(&self, id: SubscriberId) -> bool {
        self.awaiting_name
            .lock()
            .expect("bot mutex poisoned")
            .contains(&id)
    }

    pub async fn handle(&self, event: InboundEvent) -> DigestResult<()> {
        match event {
            InboundEvent::Subscribe {
                subscriber_id,
                display_name,
            } => {
                let name = display_name
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .or_else(|| self.fallback_name.clone());
                match name {
                    Some(name) => self.complete_subscription(subscriber_id, &name, false).await,
                    None => {
                        self.awaiting_name
                            .lock()
                            .expect("bot mutex poisoned")
                            .insert(subscriber_id);
                        self.replies.send(subscriber_id, ASK_NAME).await
                    }
                }
            }
            InboundEvent::Unsubscribe { subscriber_id } => {
                self.scheduler.unsubscribe(subscriber_id);
                self.replies
                    .send(
                        subscriber_id,
                        "Okay, no more daily updates. Send /start any time to come back.",
                    )
                    .await
            }
            InboundEvent::Text {
                subscriber_id,
                text,
            } => {
                let was_awaiting = self
                    .awaiting_name
                    .lock()
                    .expect("bot mutex poisoned")
                    .remove(&subscriber_id);
                if was_awaiting {
                    let name = text.trim();
                    if name.is_empty() {
                        self.awaiting_name
                            .lock()
                            .expect("bot mutex poisoned")
                            .insert(subscriber_id);
                        return self.replies.send(subscriber_id, ASK_NAME).await;
                    }
                    return self.complete_subscription(subscriber_id, name, true).await;
                }
                self.answer(subscriber_id, &text).await
            }
        }
    }

    async fn complete_subscription(
        &self,
        subscriber_id: SubscriberId,
        name: &str,
        name_was_asked: bool,
    ) -> DigestResult<()> {
        tracing::info!(target: "bot", subscriber = subscriber_id, "user subscribed");
        let greeting = if name_was_asked {
            format!("Thanks, {name}! You've subscribed to daily news updates.")
        } else {
            format!("Hi {name}! You've subscribed to daily news updates.")
        };
        // The trigger must not depend on the greeting getting through.
        self.scheduler.subscribe(subscriber_id, name);
        if let Err(e) = self.replies.send(subscriber_id, &greeting).await {
            tracing::warn!(target: "bot", subscriber = subscriber_id, error = %e, "greeting not delivered");
        }
        Ok(())
    }

    async fn answer(&self, subscriber_id: SubscriberId, text: &str) -> DigestResult<()> {
        tracing::info!(target: "bot", subscriber = subscriber_id, msg = %anon_hash(text), "chat message");
        let reply = match self
            .conversations
            .record_and_respond(subscriber_id, text)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(target: "bot", subscriber = subscriber_id, error = %e, "chat reply failed");
                FALLBACK_REPLY.to_string()
            }
        };
        self.replies.send(subscriber_id, &reply).await
    }
}
