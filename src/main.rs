use tracing_subscriber::EnvFilter;

use reel_sync::config::Config;
use reel_sync::context::AppContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(api_base_url = %config.api_base_url, country = %config.country, "Starting sync client");

    let context = AppContext::from_config(config)?;

    tokio::join!(context.watchlist().hydrate(), context.tags().hydrate());

    let watchlist = context.watchlist().state();
    let tags = context.tags().state();
    tracing::info!(
        movies = watchlist.movies.len(),
        tv_shows = watchlist.tv_shows.len(),
        tags = tags.tags.len(),
        "Hydration complete"
    );

    Ok(())
}
