// tests/common/mod.rs
//
// Shared helpers for the integration tests: a scripted adapter that counts
// how often it is fetched.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use goodscoop::{AdapterDescriptor, ContentCategory, ContentItem, SourceAdapter};

#[derive(Clone)]
pub enum Script {
    Items(Vec<ContentItem>),
    Fail(&'static str),
    Hang,
}

pub struct ScriptedAdapter {
    desc: AdapterDescriptor,
    script: Script,
    available: bool,
    calls: Arc<AtomicUsize>,
}

impl ScriptedAdapter {
    pub fn new(name: &str, category: ContentCategory, script: Script) -> Self {
        Self {
            desc: AdapterDescriptor::new(name, category, 1800, 10),
            script,
            available: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn ttl(mut self, secs: u64) -> Self {
        self.desc.cache_ttl_seconds = secs;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Handle to the fetch counter, usable after the adapter moves into a registry.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait::async_trait]
impl SourceAdapter for ScriptedAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.desc
    }

    async fn fetch(&self) -> anyhow::Result<Vec<ContentItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Items(items) => Ok(items.clone()),
            Script::Fail(msg) => Err(anyhow::anyhow!("{msg}")),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

pub fn item(title: &str, category: ContentCategory, source: &str) -> ContentItem {
    ContentItem::new(title, category, source)
}

pub fn calls(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
