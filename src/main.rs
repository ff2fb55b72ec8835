//! GoodScoop binary entrypoint
//! Boots the digest bot (scheduler, dispatcher, Telegram polling) and serves
//! the health/diagnostics router.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logs go to stdout. `LOG_FORMAT=json` switches to JSON lines;
/// `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("goodscoop=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if result.is_err() {
        // The runtime may have installed a subscriber already.
        tracing::debug!("tracing subscriber already set");
    }
}

#[shuttle_runtime::main]
async fn main() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let router = goodscoop::app::start().await?;
    Ok(router.into())
}
