use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::types::{AdapterDescriptor, ContentCategory, ContentItem, SourceAdapter};
use crate::ingest::{normalize_text, truncate_chars};

const SUMMARY_MAX_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    description: Option<String>,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

/// Generic RSS 2.0 adapter. One instance per feed.
pub struct RssAdapter {
    descriptor: AdapterDescriptor,
    source_label: String,
    relevance: f32,
    boost: Option<KeywordBoost>,
    mode: Mode,
}

/// Items whose title mentions one of `keywords` get `relevance` instead of
/// the feed default and sort first.
#[derive(Debug, Clone)]
pub struct KeywordBoost {
    pub keywords: Vec<String>,
    pub relevance: f32,
}

impl KeywordBoost {
    fn matches(&self, title: &str) -> bool {
        let lower = title.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        self.keywords.iter().any(|kw| {
            if kw.contains(' ') {
                lower.contains(kw.as_str())
            } else {
                words.iter().any(|w| w == kw)
            }
        })
    }
}

impl RssAdapter {
    pub fn from_url(
        descriptor: AdapterDescriptor,
        source_label: &str,
        url: &str,
        client: reqwest::Client,
    ) -> Self {
        Self {
            descriptor,
            source_label: source_label.to_string(),
            relevance: 1.0,
            boost: None,
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        }
    }

    /// Serve a fixed XML document instead of hitting the network.
    pub fn from_fixture_str(descriptor: AdapterDescriptor, source_label: &str, xml: &str) -> Self {
        Self {
            descriptor,
            source_label: source_label.to_string(),
            relevance: 1.0,
            boost: None,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn with_relevance(mut self, relevance: f32) -> Self {
        self.relevance = relevance;
        self
    }

    pub fn with_keyword_boost(mut self, keywords: &[&str], relevance: f32) -> Self {
        self.boost = Some(KeywordBoost {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            relevance,
        });
        self
    }

    /// Parse a feed body into at most `max_items` content items.
    pub fn parse_items(&self, xml: &str) -> Result<Vec<ContentItem>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean)
            .with_context(|| format!("parsing {} rss xml", self.descriptor.name))?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            if title.is_empty() {
                continue;
            }
            let relevance = match &self.boost {
                Some(b) if b.matches(&title) => b.relevance,
                _ => self.relevance,
            };
            let summary = it
                .description
                .as_deref()
                .map(normalize_text)
                .map(|s| truncate_chars(&s, SUMMARY_MAX_CHARS))
                .unwrap_or_default();

            out.push(
                ContentItem::new(title, self.descriptor.category, self.source_label.as_str())
                    .with_summary(summary)
                    .with_relevance(relevance),
            );
        }

        if self.boost.is_some() {
            // Stable: equal scores keep feed order.
            out.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        }
        out.truncate(self.descriptor.max_items);

        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }

    // --- Preconfigured feeds ---

    pub fn chronicle_live(client: reqwest::Client) -> Self {
        Self::from_url(
            AdapterDescriptor::new("chronicle_live", ContentCategory::LocalNews, 1800, 5),
            "Chronicle Live",
            "https://www.chroniclelive.co.uk/news/?service=rss",
            client,
        )
        .with_relevance(0.9)
    }

    pub fn newcastle_uni(client: reqwest::Client) -> Self {
        Self::from_url(
            AdapterDescriptor::new("newcastle_uni", ContentCategory::University, 7200, 3),
            "Newcastle University",
            "https://www.ncl.ac.uk/press/news/rss/",
            client,
        )
        .with_relevance(0.85)
    }

    pub fn tech_news(client: reqwest::Client) -> Self {
        Self::from_url(
            AdapterDescriptor::new("tech_news", ContentCategory::Tech, 1800, 5),
            "Hacker News",
            "https://hnrss.org/frontpage?count=20",
            client,
        )
        .with_relevance(0.75)
        .with_keyword_boost(AI_KEYWORDS, 0.95)
    }

    pub fn google_news(client: reqwest::Client) -> Self {
        Self::from_url(
            AdapterDescriptor::new("google_news", ContentCategory::WorldNews, 3600, 8),
            "Google News",
            "https://news.google.com/rss?hl=en-GB&gl=GB&ceid=GB:en",
            client,
        )
        .with_relevance(0.7)
    }

    pub fn nhs_newcastle(client: reqwest::Client) -> Self {
        Self::from_url(
            AdapterDescriptor::new("nhs_newcastle", ContentCategory::Health, 14400, 2),
            "NHS Newcastle",
            "https://news.google.com/rss/search?q=%22Freeman+Hospital%22+OR+%22Newcastle+Hospitals+NHS%22+OR+%22RVI+Newcastle%22+when:7d&hl=en-GB&gl=GB&ceid=GB:en",
            client,
        )
        .with_relevance(0.85)
    }
}

pub const AI_KEYWORDS: &[&str] = &[
    "ai",
    "llm",
    "gpt",
    "claude",
    "openai",
    "anthropic",
    "machine learning",
    "neural",
    "transformer",
    "chatbot",
    "language model",
];

#[async_trait]
impl SourceAdapter for RssAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    async fn fetch(&self) -> Result<Vec<ContentItem>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items(s),
            Mode::Http { url, client } => {
                let body = client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("{} http get()", self.descriptor.name))?
                    .error_for_status()
                    .with_context(|| format!("{} non-2xx", self.descriptor.name))?
                    .text()
                    .await
                    .with_context(|| format!("{} http .text()", self.descriptor.name))?;
                self.parse_items(&body)
            }
        }
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&pound;", "£")
}
