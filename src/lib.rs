// src/lib.rs
// Public library surface for integration tests (and the binaries).

pub mod agent;
pub mod api;
pub mod app;
pub mod bot;
pub mod compose;
pub mod config;
pub mod conversation;
pub mod digest;
pub mod error;
pub mod format;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod scheduler;

/// Subscriber identity as issued by the messaging gateway (Telegram chat id).
pub type SubscriberId = i64;

// ---- Re-exports for stable public API ----
pub use crate::error::{DigestError, DigestResult};
pub use crate::format::format_content;
pub use crate::ingest::types::{AdapterDescriptor, ContentCategory, ContentItem, SourceAdapter};
pub use crate::ingest::{AdapterRegistry, Aggregator};
