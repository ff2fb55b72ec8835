// src/ingest/mod.rs
pub mod cache;
pub mod config;
pub mod providers;
pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::error::DigestError;
use crate::ingest::cache::CachedAdapter;
use crate::ingest::types::{AdapterDescriptor, ContentItem, SourceAdapter};

/// Default per-adapter deadline for one fetch.
pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(15);

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Items returned by adapters.");
        describe_counter!(
            "ingest_adapter_errors_total",
            "Adapter fetches that returned an error."
        );
        describe_counter!(
            "ingest_adapter_timeouts_total",
            "Adapter fetches cut off by the per-adapter deadline."
        );
        describe_counter!("ingest_cache_hits_total", "Adapter cache hits.");
        describe_counter!("ingest_cache_misses_total", "Adapter cache misses.");
        describe_histogram!("ingest_fetch_ms", "Per-adapter fetch time in milliseconds.");
        describe_histogram!("ingest_parse_ms", "RSS parse time in milliseconds.");
    });
}

/// Normalize text: decode entities, strip tags, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap: 1500 chars
    truncate_chars(&out, 1500)
}

/// Keep at most `max` characters (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

struct RegistryEntry {
    adapter: CachedAdapter,
    enabled: bool,
}

/// Registered adapters in registration order. Built once at startup and
/// shared read-only afterwards.
#[derive(Default)]
pub struct AdapterRegistry {
    entries: Vec<RegistryEntry>,
}

/// Snapshot of one registry entry for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct AdapterStatus {
    #[serde(flatten)]
    pub descriptor: AdapterDescriptor,
    pub available: bool,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter. Re-registering a name replaces the previous
    /// adapter (and its cache) in the same slot.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        let enabled = adapter.descriptor().enabled;
        let entry = RegistryEntry {
            adapter: CachedAdapter::new(adapter),
            enabled,
        };
        match self
            .entries
            .iter_mut()
            .find(|e| e.adapter.name() == entry.adapter.name())
        {
            Some(slot) => {
                tracing::debug!(target: "ingest", adapter = entry.adapter.name(), "replacing adapter");
                *slot = entry;
            }
            None => {
                tracing::debug!(target: "ingest", adapter = entry.adapter.name(), "registered adapter");
                self.entries.push(entry);
            }
        }
    }

    /// Toggle an adapter by name. Returns false for unknown names.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.entries.iter_mut().find(|e| e.adapter.name() == name) {
            Some(e) => {
                e.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Disable every listed adapter; unknown names are logged and ignored.
    pub fn apply_disabled(&mut self, disabled: &[String]) {
        for name in disabled {
            if !self.set_enabled(name, false) {
                tracing::warn!(target: "ingest", adapter = %name, "disabled adapter is not registered");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.adapter.name().to_string())
            .collect()
    }

    pub fn statuses(&self) -> Vec<AdapterStatus> {
        self.entries
            .iter()
            .map(|e| {
                let mut descriptor = e.adapter.descriptor().clone();
                descriptor.enabled = e.enabled;
                AdapterStatus {
                    descriptor,
                    available: e.adapter.is_available(),
                }
            })
            .collect()
    }

    /// Enabled and available adapters, in registration order.
    fn selected(&self) -> Vec<&CachedAdapter> {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| &e.adapter)
            .filter(|a| {
                let ok = a.is_available();
                if !ok {
                    tracing::debug!(target: "ingest", adapter = a.name(), "adapter unavailable, skipping");
                }
                ok
            })
            .collect()
    }
}

/// Concurrent fan-out over the registry with per-adapter failure isolation.
#[derive(Clone)]
pub struct Aggregator {
    registry: Arc<AdapterRegistry>,
    adapter_timeout: Duration,
}

impl Aggregator {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            registry,
            adapter_timeout: DEFAULT_ADAPTER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub async fn fetch_all(&self) -> Vec<ContentItem> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        self.fetch_all_at(now).await
    }

    /// Fetch every selected adapter concurrently at wall-clock `now_secs`.
    /// Results are concatenated in registration order; a failing or hung
    /// adapter contributes nothing.
    pub async fn fetch_all_at(&self, now_secs: u64) -> Vec<ContentItem> {
        ensure_metrics_described();

        let selected = self.registry.selected();
        if selected.is_empty() {
            tracing::warn!(target: "ingest", "no adapters available");
            return Vec::new();
        }

        let names: Vec<&str> = selected.iter().map(|a| a.name()).collect();
        tracing::info!(target: "ingest", count = selected.len(), adapters = ?names, "fetching sources");

        let timeout = self.adapter_timeout;
        let fetches = selected.iter().map(|adapter| async move {
            let t0 = Instant::now();
            let bucket = adapter.bucket_for(now_secs);
            let outcome = match tokio::time::timeout(timeout, adapter.cached_fetch(bucket)).await {
                Ok(Ok(items)) => Ok(items),
                Ok(Err(e)) => Err(DigestError::AdapterFetch {
                    adapter: adapter.name().to_string(),
                    reason: format!("{e:#}"),
                }),
                Err(_) => Err(DigestError::AdapterTimeout {
                    adapter: adapter.name().to_string(),
                    secs: timeout.as_secs(),
                }),
            };
            histogram!("ingest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
            outcome
        });
        let outcomes = join_all(fetches).await;

        let mut results = Vec::new();
        for (adapter, outcome) in selected.iter().zip(outcomes) {
            match outcome {
                Ok(mut items) => {
                    tracing::info!(target: "ingest", adapter = adapter.name(), items = items.len(), "adapter returned");
                    counter!("ingest_items_total").increment(items.len() as u64);
                    results.append(&mut items);
                }
                Err(e @ DigestError::AdapterTimeout { .. }) => {
                    tracing::warn!(target: "ingest", adapter = adapter.name(), error = %e, "adapter timed out");
                    counter!("ingest_adapter_timeouts_total").increment(1);
                }
                Err(e) => {
                    tracing::warn!(target: "ingest", adapter = adapter.name(), error = %e, "adapter failed");
                    counter!("ingest_adapter_errors_total").increment(1);
                }
            }
        }
        results
    }
}
