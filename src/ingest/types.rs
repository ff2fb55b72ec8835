// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Categories a content item can belong to. The formatter uses the
/// snake_case label to build section titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    Weather,
    LocalNews,
    University,
    Health,
    Tech,
    Calendar,
    History,
    WorldNews,
}

impl ContentCategory {
    pub fn label(self) -> &'static str {
        match self {
            ContentCategory::Weather => "weather",
            ContentCategory::LocalNews => "local_news",
            ContentCategory::University => "university",
            ContentCategory::Health => "health",
            ContentCategory::Tech => "tech",
            ContentCategory::Calendar => "calendar",
            ContentCategory::History => "history",
            ContentCategory::WorldNews => "world_news",
        }
    }
}

/// One fact to surface in a digest. Lives for a single digest cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub title: String,
    pub category: ContentCategory,
    pub source: String, // provider label, e.g. "Chronicle Live"
    pub summary: Option<String>,
    pub relevance_score: f32, // 0.0 ..= 1.0
    pub is_time_sensitive: bool,
}

impl ContentItem {
    /// `title` must be non-empty; adapters skip entries without one.
    pub fn new(title: impl Into<String>, category: ContentCategory, source: impl Into<String>) -> Self {
        let title = title.into();
        debug_assert!(!title.trim().is_empty(), "content item without a title");
        Self {
            title,
            category,
            source: source.into(),
            summary: None,
            relevance_score: 1.0,
            is_time_sensitive: false,
        }
    }

    /// Empty summaries are stored as `None`.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        let s = summary.into();
        self.summary = if s.trim().is_empty() { None } else { Some(s) };
        self
    }

    pub fn with_relevance(mut self, score: f32) -> Self {
        self.relevance_score = if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    pub fn time_sensitive(mut self) -> Self {
        self.is_time_sensitive = true;
        self
    }
}

/// Registration record of a source adapter. `name` is the registry key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterDescriptor {
    pub name: String,
    pub category: ContentCategory,
    pub cache_ttl_seconds: u64,
    pub max_items: usize,
    pub enabled: bool,
}

impl AdapterDescriptor {
    pub fn new(
        name: impl Into<String>,
        category: ContentCategory,
        cache_ttl_seconds: u64,
        max_items: usize,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            cache_ttl_seconds,
            max_items,
            enabled: true,
        }
    }
}

/// A pluggable content provider.
///
/// `fetch` suspends and may fail; it must cap its own output to
/// `descriptor().max_items`. `is_available` is a cheap capability check
/// (e.g. "is the API key configured") checked before any fetch is scheduled.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn descriptor(&self) -> &AdapterDescriptor;

    async fn fetch(&self) -> Result<Vec<ContentItem>>;

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        &self.descriptor().name
    }
}
