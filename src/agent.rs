//! LLM agent: provider abstraction + concrete chat clients.
//!
//! Agents are stateless; conversation history is passed in by the caller.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::agent::AgentConfig;
use crate::conversation::{ConversationTurn, Role};
use crate::error::{DigestError, DigestResult};

pub const SYSTEM_PERSONA: &str = "You are a friendly, witty, and engaging news presenter crafting personalised daily updates for a close friend. Your tone is casual, warm, and playful. Prioritise making your messages feel human, thoughtful, and enjoyable to read.";

const OPENAI_DEFAULT_BASE: &str = "https://api.openai.com";

#[async_trait]
pub trait ChatAgent: Send + Sync {
    async fn chat_with_history(
        &self,
        prompt: &str,
        history: &[ConversationTurn],
    ) -> DigestResult<String>;

    async fn chat(&self, prompt: &str) -> DigestResult<String> {
        self.chat_with_history(prompt, &[]).await
    }

    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynAgent = Arc<dyn ChatAgent>;

/// Factory: build an agent according to config and environment variables.
///
/// * If `AGENT_TEST_MODE=mock`, returns a deterministic mock agent.
/// * Else dispatches on `config.provider`.
pub fn build_agent(config: &AgentConfig) -> DigestResult<DynAgent> {
    if std::env::var("AGENT_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Arc::new(MockAgent::new("Morning! (mock digest)")));
    }

    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaAgent::new(config)?)),
        "openai" => Ok(Arc::new(OpenAiAgent::new(config)?)),
        "mock" => Ok(Arc::new(MockAgent::new("Morning! (mock digest)"))),
        other => Err(DigestError::Config(format!("unknown llm provider: {other}"))),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// system persona, then history in order, then the new prompt.
fn build_messages(prompt: &str, history: &[ConversationTurn]) -> Vec<WireMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(WireMessage {
        role: "system".into(),
        content: SYSTEM_PERSONA.into(),
    });
    messages.extend(history.iter().map(|t| WireMessage {
        role: role_name(t.role).into(),
        content: t.content.clone(),
    }));
    messages.push(WireMessage {
        role: "user".into(),
        content: prompt.into(),
    });
    messages
}

/// Drop any `<think>...</think>` preamble and surrounding quotes.
pub fn clean_reply(raw: &str) -> String {
    let after = match raw.rfind("</think>") {
        Some(idx) => &raw[idx + "</think>".len()..],
        None => raw,
    };
    after
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

fn non_empty_reply(raw: &str) -> DigestResult<String> {
    let cleaned = clean_reply(raw);
    if cleaned.is_empty() {
        Err(DigestError::Agent("empty reply from model".into()))
    } else {
        Ok(cleaned)
    }
}

fn http_client(timeout: Duration) -> DigestResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("goodscoop/0.1")
        .connect_timeout(Duration::from_secs(4))
        .timeout(timeout)
        .build()
        .map_err(|e| DigestError::Config(format!("reqwest client: {e}")))
}

// ------------------------------------------------------------
// Ollama
// ------------------------------------------------------------

pub struct OllamaAgent {
    http: reqwest::Client,
    host: String,
    model: String,
    temperature: f32,
}

impl OllamaAgent {
    pub fn new(config: &AgentConfig) -> DigestResult<Self> {
        // Local reasoning models are slow; allow a generous deadline.
        let http = http_client(Duration::from_secs(300))?;
        tracing::info!(host = %config.host, model = %config.model, "using ollama agent");
        Ok(Self {
            http,
            host: config.host.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl ChatAgent for OllamaAgent {
    async fn chat_with_history(
        &self,
        prompt: &str,
        history: &[ConversationTurn],
    ) -> DigestResult<String> {
        #[derive(Serialize)]
        struct Options {
            temperature: f32,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<WireMessage>,
            stream: bool,
            options: Options,
        }
        #[derive(Deserialize)]
        struct Resp {
            message: WireMessage,
        }

        let req = Req {
            model: &self.model,
            messages: build_messages(prompt, history),
            stream: false,
            options: Options {
                temperature: self.temperature,
            },
        };

        let resp: Resp = self
            .http
            .post(format!("{}/api/chat", self.host))
            .json(&req)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        non_empty_reply(&resp.message.content)
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }
}

// ------------------------------------------------------------
// OpenAI-compatible chat completions
// ------------------------------------------------------------

pub struct OpenAiAgent {
    http: reqwest::Client,
    base: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiAgent {
    pub fn new(config: &AgentConfig) -> DigestResult<Self> {
        if config.api_key.is_empty() {
            return Err(DigestError::Config("openai agent needs an api key".into()));
        }
        // The default host points at a local Ollama; swap it for the public API.
        let base = if config.host.contains("localhost:11434") {
            OPENAI_DEFAULT_BASE.to_string()
        } else {
            config.host.clone()
        };
        Ok(Self {
            http: http_client(Duration::from_secs(60))?,
            base,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl ChatAgent for OpenAiAgent {
    async fn chat_with_history(
        &self,
        prompt: &str,
        history: &[ConversationTurn],
    ) -> DigestResult<String> {
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<WireMessage>,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: WireMessage,
        }

        let req = Req {
            model: &self.model,
            messages: build_messages(prompt, history),
            temperature: self.temperature,
        };

        let body: Resp = self
            .http
            .post(format!("{}/v1/chat/completions", self.base))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("");
        non_empty_reply(content)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Mock
// ------------------------------------------------------------

/// Deterministic agent for tests and local runs. Records every call.
pub struct MockAgent {
    reply: String,
    fail_remaining: Mutex<u32>,
    calls: Mutex<Vec<MockCall>>,
}

#[derive(Debug, Clone)]
pub struct MockCall {
    pub prompt: String,
    pub history: Vec<ConversationTurn>,
}

impl MockAgent {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail_remaining: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The next `n` calls fail with an agent error.
    pub fn failing(self, n: u32) -> Self {
        *self.fail_remaining.lock().expect("mock mutex poisoned") = n;
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().expect("mock mutex poisoned").clone()
    }
}

#[async_trait]
impl ChatAgent for MockAgent {
    async fn chat_with_history(
        &self,
        prompt: &str,
        history: &[ConversationTurn],
    ) -> DigestResult<String> {
        self.calls
            .lock()
            .expect("mock mutex poisoned")
            .push(MockCall {
                prompt: prompt.to_string(),
                history: history.to_vec(),
            });
        let mut fail = self.fail_remaining.lock().expect("mock mutex poisoned");
        if *fail > 0 {
            *fail -= 1;
            return Err(DigestError::Agent("mock failure".into()));
        }
        Ok(self.reply.clone())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
