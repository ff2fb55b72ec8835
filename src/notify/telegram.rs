use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;

use super::DeliveryChannel;
use crate::bot::{Bot, InboundEvent};
use crate::error::{DigestError, DigestResult};
use crate::SubscriberId;

const API_BASE: &str = "https://api.telegram.org";
/// Telegram rejects longer message bodies.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Telegram Bot API client: `sendMessage` for delivery, `getUpdates` for
/// inbound long polling.
#[derive(Clone)]
pub struct TelegramBot {
    base: String,
    client: Client,
    poll_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub first_name: Option<String>,
    pub username: Option<String>,
}

impl TelegramBot {
    pub fn new(token: &str, poll_timeout_secs: u64) -> Result<Self> {
        Self::with_base(API_BASE, token, poll_timeout_secs)
    }

    pub fn with_base(api_base: &str, token: &str, poll_timeout_secs: u64) -> Result<Self> {
        // The client deadline must outlive the long-poll window.
        let client = Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 10))
            .build()
            .context("building telegram http client")?;
        Ok(Self {
            base: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
            client,
            poll_timeout_secs,
        })
    }

    pub async fn send_message(&self, chat_id: SubscriberId, text: &str) -> Result<()> {
        for chunk in split_message(text, MAX_MESSAGE_CHARS) {
            let body = serde_json::json!({ "chat_id": chat_id, "text": chunk });
            let resp: ApiResponse<serde_json::Value> = self
                .client
                .post(format!("{}/sendMessage", self.base))
                .json(&body)
                .send()
                .await
                .context("telegram sendMessage")?
                .json()
                .await
                .context("telegram sendMessage body")?;
            if !resp.ok {
                return Err(anyhow!(
                    "telegram sendMessage rejected: {}",
                    resp.description.unwrap_or_default()
                ));
            }
        }
        Ok(())
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let resp: ApiResponse<Vec<Update>> = self
            .client
            .get(format!("{}/getUpdates", self.base))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", self.poll_timeout_secs.to_string()),
                ("allowed_updates", r#"["message"]"#.to_string()),
            ])
            .send()
            .await
            .context("telegram getUpdates")?
            .json()
            .await
            .context("telegram getUpdates body")?;
        if !resp.ok {
            return Err(anyhow!(
                "telegram getUpdates rejected: {}",
                resp.description.unwrap_or_default()
            ));
        }
        Ok(resp.result.unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl DeliveryChannel for TelegramBot {
    async fn send(&self, subscriber_id: SubscriberId, text: &str) -> DigestResult<()> {
        self.send_message(subscriber_id, text)
            .await
            .map_err(|e| DigestError::delivery(format!("{e:#}")))
    }

    fn channel_name(&self) -> &'static str {
        "telegram"
    }
}

/// Map an update to an inbound event. Non-text updates and unknown commands
/// yield `None`.
pub fn to_inbound(update: &Update) -> Option<InboundEvent> {
    let msg = update.message.as_ref()?;
    let text = msg.text.as_deref()?.trim();
    let subscriber_id = msg.chat.id;

    if let Some(cmd) = text.strip_prefix('/') {
        // "/start@MyBot payload" → "start"
        let name = cmd
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .split('@')
            .next()
            .unwrap_or_default();
        return match name {
            "start" => Some(InboundEvent::Subscribe {
                subscriber_id,
                display_name: msg
                    .from
                    .as_ref()
                    .and_then(|u| u.first_name.clone().or_else(|| u.username.clone())),
            }),
            "stop" => Some(InboundEvent::Unsubscribe { subscriber_id }),
            _ => None,
        };
    }

    if text.is_empty() {
        return None;
    }
    Some(InboundEvent::Text {
        subscriber_id,
        text: text.to_string(),
    })
}

/// Split on char boundaries into pieces of at most `max` chars.
pub fn split_message(text: &str, max: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(max.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

/// Long-poll Telegram forever, handing each event to the bot in order.
pub async fn run_polling(bot: Arc<Bot>, telegram: TelegramBot) {
    let mut offset: i64 = 0;
    tracing::info!(target: "bot", "telegram polling started");
    loop {
        let updates = match telegram.get_updates(offset).await {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(target: "bot", error = ?e, "getUpdates failed, backing off");
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };
        for update in updates {
            offset = offset.max(update.update_id + 1);
            if let Some(event) = to_inbound(&update) {
                if let Err(e) = bot.handle(event).await {
                    tracing::warn!(target: "bot", error = %e, "inbound event failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(text: &str, first_name: Option<&str>) -> Update {
        Update {
            update_id: 10,
            message: Some(Message {
                chat: Chat { id: 42 },
                from: Some(User {
                    first_name: first_name.map(str::to_string),
                    username: Some("jgardner".into()),
                }),
                text: Some(text.into()),
            }),
        }
    }

    #[test]
    fn start_command_is_subscribe() {
        match to_inbound(&update("/start", Some("Jamie"))) {
            Some(InboundEvent::Subscribe {
                subscriber_id,
                display_name,
            }) => {
                assert_eq!(subscriber_id, 42);
                assert_eq!(display_name.as_deref(), Some("Jamie"));
            }
            other => panic!("unexpected {other:?}"),
        }
        // Falls back to the username.
        match to_inbound(&update("/start@GoodScoopBot", None)) {
            Some(InboundEvent::Subscribe { display_name, .. }) => {
                assert_eq!(display_name.as_deref(), Some("jgardner"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn text_and_unknown_commands() {
        assert!(matches!(
            to_inbound(&update("  tell me more ", None)),
            Some(InboundEvent::Text { ref text, .. }) if text == "tell me more"
        ));
        assert!(to_inbound(&update("/help", None)).is_none());
        assert!(matches!(
            to_inbound(&update("/stop", None)),
            Some(InboundEvent::Unsubscribe { subscriber_id: 42 })
        ));
    }

    #[test]
    fn long_messages_are_split() {
        let text = "é".repeat(9000);
        let parts = split_message(&text, MAX_MESSAGE_CHARS);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].chars().count(), 4096);
        assert_eq!(parts[2].chars().count(), 9000 - 2 * 4096);
    }
}
