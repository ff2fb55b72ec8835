//! Current conditions from OpenWeatherMap.
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::ingest::types::{AdapterDescriptor, ContentCategory, ContentItem, SourceAdapter};

const API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Deserialize)]
pub struct OwmResponse {
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    wind: OwmWind,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
}

pub struct WeatherAdapter {
    descriptor: AdapterDescriptor,
    api_key: Option<String>,
    location: String,
    base_url: String,
    client: reqwest::Client,
}

impl WeatherAdapter {
    /// `location` uses the OpenWeatherMap query form, e.g. "Newcastle upon Tyne,UK".
    pub fn new(api_key: Option<String>, location: &str, client: reqwest::Client) -> Self {
        Self {
            descriptor: AdapterDescriptor::new("weather", ContentCategory::Weather, 1800, 1),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            location: location.to_string(),
            base_url: API_URL.to_string(),
            client,
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Place name shown to the reader: the part before the first comma.
    fn place(&self) -> &str {
        self.location.split(',').next().unwrap_or_default().trim()
    }

    pub fn item_from_response(&self, data: &OwmResponse) -> ContentItem {
        let description = data
            .weather
            .first()
            .map(|w| title_case(&w.description))
            .unwrap_or_else(|| "Unknown".to_string());
        ContentItem::new(
            format!(
                "{} Weather: {}, {:.0}C (feels like {:.0}C)",
                self.place(),
                description,
                data.main.temp,
                data.main.feels_like
            ),
            ContentCategory::Weather,
            "OpenWeatherMap",
        )
        .with_summary(format!(
            "Humidity {:.0}%, wind {:.1} m/s",
            data.main.humidity, data.wind.speed
        ))
        .with_relevance(1.0)
        .time_sensitive()
    }
}

#[async_trait]
impl SourceAdapter for WeatherAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(&self) -> Result<Vec<ContentItem>> {
        let api_key = self
            .api_key
            .as_deref()
            .context("OpenWeatherMap API key not configured")?;
        let data: OwmResponse = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", self.location.as_str()),
                ("appid", api_key),
                ("units", "metric"),
            ])
            .send()
            .await
            .context("weather http get()")?
            .error_for_status()
            .context("weather non-2xx")?
            .json()
            .await
            .context("weather json")?;
        let mut items = vec![self.item_from_response(&data)];
        items.truncate(self.descriptor.max_items);
        Ok(items)
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut cs = w.chars();
            match cs.next() {
                Some(first) => first.to_uppercase().chain(cs).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
