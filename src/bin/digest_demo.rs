//! Demo that runs one digest cycle and prints it.
//!
//! Offline by default (canned items, mock agent). With `--live` it uses the
//! standard adapters and the agent from config/env.

use std::sync::Arc;

use goodscoop::agent::{build_agent, DynAgent, MockAgent};
use goodscoop::app::build_registry;
use goodscoop::compose::DigestComposer;
use goodscoop::config::agent::AgentConfig;
use goodscoop::config::app::AppConfig;
use goodscoop::{
    format_content, AdapterDescriptor, AdapterRegistry, Aggregator, ContentCategory, ContentItem,
    SourceAdapter,
};

struct Canned {
    desc: AdapterDescriptor,
    items: Vec<ContentItem>,
}

#[async_trait::async_trait]
impl SourceAdapter for Canned {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.desc
    }
    async fn fetch(&self) -> anyhow::Result<Vec<ContentItem>> {
        Ok(self.items.clone())
    }
}

fn canned_registry() -> AdapterRegistry {
    let mut reg = AdapterRegistry::new();
    reg.register(Arc::new(Canned {
        desc: AdapterDescriptor::new("weather", ContentCategory::Weather, 1800, 1),
        items: vec![ContentItem::new(
            "Newcastle upon Tyne Weather: Light Rain, 11C (feels like 9C)",
            ContentCategory::Weather,
            "OpenWeatherMap",
        )
        .with_summary("Humidity 82%, wind 5.1 m/s")
        .time_sensitive()],
    }));
    reg.register(Arc::new(Canned {
        desc: AdapterDescriptor::new("tech_news", ContentCategory::Tech, 1800, 5),
        items: vec![
            ContentItem::new("A new open-weights language model", ContentCategory::Tech, "Hacker News")
                .with_relevance(0.95),
            ContentItem::new("Show HN: a tiny RSS reader in Rust", ContentCategory::Tech, "Hacker News")
                .with_relevance(0.75),
        ],
    }));
    reg
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let live = std::env::args().any(|a| a == "--live");
    let cfg = AppConfig::from_env();
    let name = cfg.user_name.clone().unwrap_or_else(|| "friend".to_string());

    let (registry, agent): (AdapterRegistry, DynAgent) = if live {
        (
            build_registry(&cfg)?,
            build_agent(&AgentConfig::load_default()?)?,
        )
    } else {
        (canned_registry(), Arc::new(MockAgent::new("Morning! (mock digest)")))
    };

    let aggregator = Aggregator::new(Arc::new(registry)).with_timeout(cfg.adapter_timeout);
    let items = aggregator.fetch_all().await;
    println!("{}\n", format_content(&items));

    let composer = DigestComposer::new(aggregator, agent);
    let digest = composer.create_digest(&name).await?;
    println!("{digest}");
    Ok(())
}
