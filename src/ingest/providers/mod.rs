pub mod calendar;
pub mod on_this_day;
pub mod rss;
pub mod weather;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::app::AppConfig;
use crate::ingest::types::SourceAdapter;

/// Shared HTTP client for all source adapters.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("goodscoop/0.1")
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(10))
        .build()
        .context("building adapter http client")
}

/// The standard adapter set, in registration order.
pub fn standard_adapters(
    cfg: &AppConfig,
    client: reqwest::Client,
) -> Vec<Arc<dyn SourceAdapter>> {
    vec![
        Arc::new(weather::WeatherAdapter::new(
            cfg.openweathermap_api_key.clone(),
            &cfg.weather_location,
            client.clone(),
        )),
        Arc::new(calendar::CalendarAdapter::new(client.clone())),
        Arc::new(on_this_day::OnThisDayAdapter::new(client.clone())),
        Arc::new(rss::RssAdapter::google_news(client.clone())),
        Arc::new(rss::RssAdapter::chronicle_live(client.clone())),
        Arc::new(rss::RssAdapter::newcastle_uni(client.clone())),
        Arc::new(rss::RssAdapter::tech_news(client.clone())),
        Arc::new(rss::RssAdapter::nhs_newcastle(client)),
    ]
}
