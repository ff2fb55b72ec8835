//! conversation.rs: per-subscriber bounded chat history and follow-up handling.

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::agent::DynAgent;
use crate::compose::{chat_prompt, TimeContext};
use crate::error::DigestResult;
use crate::format::format_content;
use crate::ingest::Aggregator;
use crate::SubscriberId;

/// History cap per subscriber (10 exchanges).
pub const MAX_TURNS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// In-memory histories keyed by subscriber. Every mutation trims to the cap,
/// dropping the oldest turns first.
#[derive(Debug)]
pub struct ConversationStore {
    inner: Mutex<HashMap<SubscriberId, Vec<ConversationTurn>>>,
    cap: usize,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::with_capacity(MAX_TURNS)
    }
}

impl ConversationStore {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            cap: cap.max(1),
        }
    }

    /// Append a turn and return the trimmed history as stored.
    pub fn append(&self, id: SubscriberId, turn: ConversationTurn) -> Vec<ConversationTurn> {
        let mut map = self.inner.lock().expect("conversation mutex poisoned");
        let v = map.entry(id).or_default();
        v.push(turn);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
        v.clone()
    }

    pub fn history(&self, id: SubscriberId) -> Vec<ConversationTurn> {
        let map = self.inner.lock().expect("conversation mutex poisoned");
        map.get(&id).cloned().unwrap_or_default()
    }

    pub fn clear(&self, id: SubscriberId) {
        let mut map = self.inner.lock().expect("conversation mutex poisoned");
        map.remove(&id);
    }
}

/// How an inbound chat message is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageIntent {
    /// Refers back to something already discussed; answer from history only.
    FollowUp,
    /// Explicit request for news/weather; run the aggregator first.
    FreshData,
    Chat,
}

const FOLLOW_UP_PHRASES: &[&str] = &[
    "tell me more",
    "more about",
    "what about",
    "elaborate",
    "expand on",
    "go on",
    "that",
    "this",
];

const FRESH_DATA_PHRASES: &[&str] = &[
    "what's the news",
    "whats the news",
    "news",
    "headlines",
    "weather forecast",
    "weather",
    "forecast",
    "latest",
    "what's happening",
    "update me",
];

fn phrase_regex(phrases: &[&str]) -> Regex {
    let alts: Vec<String> = phrases.iter().map(|p| regex::escape(p)).collect();
    Regex::new(&format!(r"(?i)\b(?:{})\b", alts.join("|"))).unwrap()
}

static RE_FOLLOW_UP: Lazy<Regex> = Lazy::new(|| phrase_regex(FOLLOW_UP_PHRASES));
static RE_FRESH_DATA: Lazy<Regex> = Lazy::new(|| phrase_regex(FRESH_DATA_PHRASES));
// "this morning", "this weekend" ... are time references, not back-references.
static RE_TEMPORAL_THIS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bthis\s+(?:morning|afternoon|evening|week|weekend|month|year)\b").unwrap()
});

/// Follow-up wins over fresh-data when both match.
pub fn classify(message: &str) -> MessageIntent {
    let text = message.replace('\u{2019}', "'");
    let without_temporal = RE_TEMPORAL_THIS.replace_all(&text, " ");
    if RE_FOLLOW_UP.is_match(&without_temporal) {
        MessageIntent::FollowUp
    } else if RE_FRESH_DATA.is_match(&text) {
        MessageIntent::FreshData
    } else {
        MessageIntent::Chat
    }
}

/// Chat front door: history + classification + agent call.
#[derive(Clone)]
pub struct Conversations {
    store: std::sync::Arc<ConversationStore>,
    aggregator: Aggregator,
    agent: DynAgent,
}

impl Conversations {
    pub fn new(
        store: std::sync::Arc<ConversationStore>,
        aggregator: Aggregator,
        agent: DynAgent,
    ) -> Self {
        Self {
            store,
            aggregator,
            agent,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Record the user's message, answer it, record the answer.
    ///
    /// An agent failure is returned as-is; the user's turn stays recorded.
    pub async fn record_and_respond(
        &self,
        id: SubscriberId,
        message: &str,
    ) -> DigestResult<String> {
        let mut history = self.store.append(id, ConversationTurn::user(message));
        history.pop(); // the turn just added travels as the prompt

        let intent = classify(message);
        let content = match intent {
            MessageIntent::FreshData => {
                let items = self.aggregator.fetch_all().await;
                Some(format_content(&items))
            }
            MessageIntent::FollowUp | MessageIntent::Chat => None,
        };
        tracing::debug!(target: "bot", subscriber = id, ?intent, history = history.len(), "answering message");

        let prompt = chat_prompt(intent, message, content.as_deref(), &TimeContext::now());
        let reply = self.agent.chat_with_history(&prompt, &history).await?;

        self.store.append(id, ConversationTurn::assistant(reply.clone()));
        Ok(reply)
    }
}
