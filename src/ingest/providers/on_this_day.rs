//! "On this day" facts from the Wikimedia feed API.
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

use crate::ingest::truncate_chars;
use crate::ingest::types::{AdapterDescriptor, ContentCategory, ContentItem, SourceAdapter};

const API_URL: &str = "https://api.wikimedia.org/feed/v1/wikipedia/en/onthisday/all";
const USER_AGENT: &str = "GoodScoop/1.0 (https://github.com/thatgardnerone/goodscoop)";

/// Events after this year are preferred; older history rarely lands.
const RECENT_AFTER_YEAR: i32 = 1800;

#[derive(Debug, Clone, Deserialize)]
pub struct HistoricEvent {
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    events: Vec<HistoricEvent>,
}

pub struct OnThisDayAdapter {
    descriptor: AdapterDescriptor,
    base_url: String,
    client: reqwest::Client,
}

impl OnThisDayAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            descriptor: AdapterDescriptor::new("on_this_day", ContentCategory::History, 86_400, 2),
            base_url: API_URL.to_string(),
            client,
        }
    }

    pub fn url_for(&self, day: NaiveDate) -> String {
        format!("{}/{:02}/{:02}", self.base_url, day.month(), day.day())
    }
}

/// Pick up to `max` random events, preferring ones after 1800 unless fewer
/// than three such events exist.
pub fn select_events<R: Rng + ?Sized>(
    events: &[HistoricEvent],
    max: usize,
    rng: &mut R,
) -> Vec<ContentItem> {
    let recent: Vec<&HistoricEvent> = events
        .iter()
        .filter(|e| e.year > RECENT_AFTER_YEAR)
        .collect();
    let mut pool: Vec<&HistoricEvent> = if recent.len() < 3 {
        events.iter().collect()
    } else {
        recent
    };
    pool.retain(|e| !e.text.trim().is_empty());
    pool.shuffle(rng);

    pool.into_iter()
        .take(max)
        .map(|e| {
            ContentItem::new(
                format!("On this day in {}: {}", e.year, truncate_chars(e.text.trim(), 150)),
                ContentCategory::History,
                "Wikipedia",
            )
            .with_relevance(0.5)
        })
        .collect()
}

#[async_trait]
impl SourceAdapter for OnThisDayAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    async fn fetch(&self) -> Result<Vec<ContentItem>> {
        let url = self.url_for(Utc::now().date_naive());
        let feed: Feed = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .context("on_this_day http get()")?
            .error_for_status()
            .context("on_this_day non-2xx")?
            .json()
            .await
            .context("on_this_day json")?;
        let items = {
            let mut rng = rand::rng();
            select_events(&feed.events, self.descriptor.max_items, &mut rng)
        };
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ev(year: i32, text: &str) -> HistoricEvent {
        HistoricEvent {
            year,
            text: text.into(),
        }
    }

    #[test]
    fn prefers_recent_events_when_enough() {
        let events = vec![
            ev(1066, "Battle"),
            ev(1901, "A"),
            ev(1969, "B"),
            ev(2001, "C"),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let picked = select_events(&events, 2, &mut rng);
        assert_eq!(picked.len(), 2);
        assert!(picked.iter().all(|i| !i.title.contains("1066")));
    }

    #[test]
    fn falls_back_to_all_events_when_few_recent() {
        let events = vec![ev(1066, "Battle"), ev(1415, "Agincourt"), ev(1969, "Moon")];
        let mut rng = StdRng::seed_from_u64(1);
        let picked = select_events(&events, 5, &mut rng);
        assert_eq!(picked.len(), 3);
    }

    #[test]
    fn url_is_zero_padded() {
        let a = OnThisDayAdapter::new(reqwest::Client::new());
        let d = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert!(a.url_for(d).ends_with("/03/07"));
    }
}
