//! Startup wiring: build the registry, agent and channels, spawn the
//! background loops, return the HTTP router.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::sync::mpsc;

use crate::agent::build_agent;
use crate::api::{self, ApiState};
use crate::bot::Bot;
use crate::compose::DigestComposer;
use crate::config::agent::AgentConfig;
use crate::config::app::AppConfig;
use crate::conversation::{ConversationStore, Conversations};
use crate::digest::Dispatcher;
use crate::ingest::providers::{http_client, standard_adapters};
use crate::ingest::{config::load_disabled_default, AdapterRegistry, Aggregator};
use crate::metrics::Metrics;
use crate::notify::telegram::{run_polling, TelegramBot};
use crate::notify::{DynChannel, LogChannel};
use crate::scheduler::Scheduler;

/// Registry with the standard adapters, minus the ones switched off in config.
pub fn build_registry(cfg: &AppConfig) -> Result<AdapterRegistry> {
    let mut registry = AdapterRegistry::new();
    for adapter in standard_adapters(cfg, http_client()?) {
        registry.register(adapter);
    }
    match load_disabled_default() {
        Ok(disabled) => registry.apply_disabled(&disabled),
        Err(e) => tracing::warn!(error = ?e, "sources config unreadable, all adapters enabled"),
    }
    Ok(registry)
}

pub async fn start() -> Result<Router> {
    let cfg = AppConfig::from_env();
    let agent_cfg = AgentConfig::load_default().context("loading agent config")?;
    let agent = build_agent(&agent_cfg)?;
    tracing::info!(provider = agent.provider_name(), model = %agent_cfg.model, "agent ready");

    let registry = Arc::new(build_registry(&cfg)?);
    tracing::info!(adapters = ?registry.names(), "sources registered");
    let aggregator = Aggregator::new(Arc::clone(&registry)).with_timeout(cfg.adapter_timeout);

    let telegram = cfg
        .telegram_token
        .as_deref()
        .map(|t| TelegramBot::new(t, cfg.poll_timeout_secs))
        .transpose()?;
    let channel: DynChannel = match &telegram {
        Some(tg) => Arc::new(tg.clone()),
        None => {
            tracing::warn!("TELEGRAM_TOKEN not set, digests will only be logged");
            Arc::new(LogChannel)
        }
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let scheduler = Arc::new(Scheduler::new(tx));
    let dispatcher = Dispatcher::new(
        DigestComposer::new(aggregator.clone(), Arc::clone(&agent)),
        Arc::clone(&channel),
    );
    tokio::spawn(dispatcher.run(rx));
    tokio::spawn(Arc::clone(&scheduler).run());

    let conversations = Conversations::new(
        Arc::new(ConversationStore::default()),
        aggregator,
        agent,
    );
    let bot = Arc::new(Bot::new(
        Arc::clone(&scheduler),
        conversations,
        channel,
        cfg.user_name.clone(),
    ));
    if let Some(tg) = telegram {
        tokio::spawn(run_polling(bot, tg));
    }

    let metrics = Metrics::init()?;
    let state = ApiState {
        scheduler,
        registry,
    };
    Ok(api::router(state).merge(metrics.router()))
}
