//! compose.rs: prompt building and the digest pipeline
//! (aggregate → format → prompt → agent).

use chrono::{Local, NaiveDateTime};

use crate::agent::DynAgent;
use crate::conversation::MessageIntent;
use crate::error::DigestResult;
use crate::format::format_content;
use crate::ingest::Aggregator;

/// Human-readable "now" handed to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeContext {
    pub day: String,   // Monday
    pub date: String,  // 07
    pub month: String, // March
    pub year: String,  // 2025
    pub time: String,  // 08:15 AM
}

impl TimeContext {
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            day: now.format("%A").to_string(),
            date: now.format("%d").to_string(),
            month: now.format("%B").to_string(),
            year: now.format("%Y").to_string(),
            time: now.format("%I:%M %p").to_string(),
        }
    }

    pub fn now() -> Self {
        Self::at(Local::now().naive_local())
    }

    pub fn render(&self) -> String {
        format!(
            "day: {}, date: {}, month: {}, year: {}, time: {}",
            self.day, self.date, self.month, self.year, self.time
        )
    }
}

/// Daily digest instructions followed by the formatted content block.
pub fn digest_prompt(user_name: &str, time: &TimeContext, content: &str) -> String {
    format!(
        "INSTRUCTIONS:
- Your name is GoodScoop, and you write a personalised summary of the news for your friend {name}.
- Your tone should be warm, conversational, and slightly playful.
- Think carefully about the items you are given, and about the current date and time, so your message is relevant.
- From the list below, summarise the most important or relevant items into a short, engaging message. Weather and time-sensitive items deserve a mention.
- Put a positive or thoughtful spin on the news, including any negative or controversial topics you pick.

OUTPUT REQUIREMENTS:
- Start with a greeting that reflects the current time, day, or notable events, based on this data: {time}.
  Be subtle and natural; think of a radio presenter mentioning the time before a bit of news.
- Plain text only: your response is an SMS message. No Markdown or special formatting. Use newlines, punctuation and maybe a rare emoji for structure and personality.
- Length: keep it concise.

DO NOT respond to this prompt; write your reply directed to {name}.

DATA:
{content}",
        name = user_name,
        time = time.render(),
        content = content,
    )
}

/// Prompt for an inbound chat message, shaped by its intent.
pub fn chat_prompt(
    intent: MessageIntent,
    message: &str,
    content: Option<&str>,
    time: &TimeContext,
) -> String {
    match intent {
        MessageIntent::FollowUp => format!(
            "The user is following up on our conversation so far. Answer using only the earlier messages in this conversation; do not write a new digest. Plain text, concise.\n\nUser: {message}"
        ),
        MessageIntent::FreshData => format!(
            "The user asked for fresh information. Current time: {time}.\nAnswer their message using the data below. Plain text, concise.\n\nDATA:\n{data}\n\nUser: {message}",
            time = time.render(),
            data = content.unwrap_or(crate::format::NO_CONTENT),
        ),
        MessageIntent::Chat => message.to_string(),
    }
}

/// Builds digests. Cheap to clone.
#[derive(Clone)]
pub struct DigestComposer {
    aggregator: Aggregator,
    agent: DynAgent,
}

impl DigestComposer {
    pub fn new(aggregator: Aggregator, agent: DynAgent) -> Self {
        Self { aggregator, agent }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Aggregate, format and summarise. A failed model call is retried once.
    pub async fn create_digest(&self, user_name: &str) -> DigestResult<String> {
        let items = self.aggregator.fetch_all().await;
        let content = format_content(&items);
        let prompt = digest_prompt(user_name, &TimeContext::now(), &content);

        match self.agent.chat(&prompt).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                tracing::warn!(target: "digest", error = %e, provider = self.agent.provider_name(), "digest generation failed, retrying once");
                self.agent.chat(&prompt).await
            }
        }
    }
}
