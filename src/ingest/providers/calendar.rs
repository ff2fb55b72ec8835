//! UK bank holidays plus a little seasonal awareness.
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;

use crate::ingest::types::{AdapterDescriptor, ContentCategory, ContentItem, SourceAdapter};

const GOV_UK_API: &str = "https://www.gov.uk/bank-holidays.json";

#[derive(Debug, Clone, Deserialize)]
pub struct BankHoliday {
    pub title: String,
    pub date: String, // YYYY-MM-DD
}

#[derive(Debug, Deserialize)]
struct Division {
    #[serde(default)]
    events: Vec<BankHoliday>,
}

#[derive(Debug, Deserialize)]
struct BankHolidays {
    #[serde(rename = "england-and-wales")]
    england_and_wales: Option<Division>,
}

pub struct CalendarAdapter {
    descriptor: AdapterDescriptor,
    base_url: String,
    client: reqwest::Client,
}

impl CalendarAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            descriptor: AdapterDescriptor::new("calendar", ContentCategory::Calendar, 86_400, 2),
            base_url: GOV_UK_API.to_string(),
            client,
        }
    }

    async fn fetch_holidays(&self) -> Result<Vec<BankHoliday>> {
        let data: BankHolidays = self
            .client
            .get(&self.base_url)
            .send()
            .await
            .context("bank holidays http get()")?
            .error_for_status()
            .context("bank holidays non-2xx")?
            .json()
            .await
            .context("bank holidays json")?;
        Ok(data.england_and_wales.map(|d| d.events).unwrap_or_default())
    }

    /// Holiday items followed by seasonal items, capped to `max_items`.
    pub fn items_for(&self, holidays: &[BankHoliday], today: NaiveDate) -> Vec<ContentItem> {
        let mut items = holiday_items(holidays, today);
        items.extend(seasonal_items(today));
        items.truncate(self.descriptor.max_items);
        items
    }
}

pub fn holiday_items(holidays: &[BankHoliday], today: NaiveDate) -> Vec<ContentItem> {
    let mut items = Vec::new();
    for h in holidays {
        let Ok(date) = NaiveDate::parse_from_str(&h.date, "%Y-%m-%d") else {
            tracing::debug!(target: "ingest", date = %h.date, "unparseable bank holiday date");
            continue;
        };
        let days = (date - today).num_days();
        let item = match days {
            0 => calendar_item(format!("Today is {}!", h.title), "GOV.UK", 1.0).time_sensitive(),
            1 => calendar_item(format!("Tomorrow is {}", h.title), "GOV.UK", 0.9),
            2..=7 => calendar_item(
                format!("{} is coming up on {}", h.title, date.format("%A")),
                "GOV.UK",
                0.7,
            ),
            _ => continue,
        };
        items.push(item);
    }
    items
}

pub fn seasonal_items(today: NaiveDate) -> Vec<ContentItem> {
    let mut items = Vec::new();
    let (month, day) = (today.month(), today.day());

    if month == 12 && day < 25 {
        let days_until = 25 - day;
        if days_until <= 7 {
            items.push(calendar_item(
                format!("{} until Christmas!", plural_days(days_until)),
                "Calendar",
                0.8,
            ));
        }
    }

    if month == 12 && day >= 26 {
        let days_until = 31 - day + 1;
        items.push(calendar_item(
            format!("{} until New Year!", plural_days(days_until)),
            "Calendar",
            0.8,
        ));
    }

    let season = match (month, day) {
        (3, 20) => Some("Spring equinox today - first day of spring!"),
        (6, 21) => Some("Summer solstice today - longest day of the year!"),
        (9, 22) => Some("Autumn equinox today - first day of autumn!"),
        (12, 21) => Some("Winter solstice today - shortest day of the year!"),
        _ => None,
    };
    if let Some(title) = season {
        items.push(calendar_item(title.to_string(), "Calendar", 0.9));
    }

    items
}

fn plural_days(n: u32) -> String {
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{n} days")
    }
}

fn calendar_item(title: String, source: &str, relevance: f32) -> ContentItem {
    ContentItem::new(title, ContentCategory::Calendar, source).with_relevance(relevance)
}

#[async_trait]
impl SourceAdapter for CalendarAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    async fn fetch(&self) -> Result<Vec<ContentItem>> {
        let today = Utc::now().date_naive();
        // Seasonal context does not depend on the network.
        let holidays = match self.fetch_holidays().await {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(target: "ingest", adapter = "calendar", error = ?e, "bank holiday fetch failed");
                Vec::new()
            }
        };
        Ok(self.items_for(&holidays, today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn hol(title: &str, date: &str) -> BankHoliday {
        BankHoliday {
            title: title.into(),
            date: date.into(),
        }
    }

    #[test]
    fn holiday_windows() {
        let today = d(2025, 5, 2); // Friday
        let hs = vec![
            hol("Early May bank holiday", "2025-05-05"),
            hol("Past", "2025-04-21"),
            hol("Far", "2025-08-25"),
            hol("Bad", "not-a-date"),
        ];
        let items = holiday_items(&hs, today);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Early May bank holiday is coming up on Monday");

        let today_items = holiday_items(&hs, d(2025, 5, 5));
        assert_eq!(today_items[0].title, "Today is Early May bank holiday!");
        assert!(today_items[0].is_time_sensitive);

        let tomorrow = holiday_items(&hs, d(2025, 5, 4));
        assert_eq!(tomorrow[0].title, "Tomorrow is Early May bank holiday");
    }

    #[test]
    fn seasonal_context() {
        assert_eq!(seasonal_items(d(2025, 12, 24))[0].title, "1 day until Christmas!");
        assert!(seasonal_items(d(2025, 12, 10)).is_empty());
        assert_eq!(seasonal_items(d(2025, 12, 26))[0].title, "6 days until New Year!");
        let solstice = seasonal_items(d(2025, 12, 21));
        assert_eq!(solstice.len(), 2);
        assert!(solstice[1].title.starts_with("Winter solstice"));
    }

    #[test]
    fn items_are_capped() {
        let a = CalendarAdapter::new(reqwest::Client::new());
        let hs = vec![hol("Christmas Day", "2025-12-25"), hol("Boxing Day", "2025-12-26")];
        let items = a.items_for(&hs, d(2025, 12, 21));
        assert_eq!(items.len(), 2);
        assert!(items[0].title.starts_with("Christmas Day"));
    }
}
