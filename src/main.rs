mod access;
mod bot;
mod callbacks;
mod config;
mod dialogue;
mod domain;
mod enrich;
mod handlers;
mod pagination;
mod store;
mod texts;
mod views;

use std::path::Path;
use std::sync::Arc;

use teloxide::Bot;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::bot::WayfarerBot;
use crate::config::AppConfig;
use crate::dialogue::DialogueStore;
use crate::enrich::geocode::Nominatim;
use crate::enrich::map::OsmRenderer;
use crate::enrich::places::OpenTripMap;
use crate::enrich::weather::WeatherApi;
use crate::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load(Path::new("config.toml"))?;
    info!(db = %config.database.path, "starting up");

    let store = Store::connect(&config.database.path).await?;
    let dialogues = DialogueStore::new(store.pool()).await?;

    let http = reqwest::Client::new();
    let geocoder = Arc::new(Nominatim::new(
        http.clone(),
        config.geocoder.base_url.clone(),
        config.geocoder.user_agent.clone(),
    ));
    let weather = Arc::new(WeatherApi::new(
        http.clone(),
        config.weather.base_url.clone(),
        config.weather.api_key.clone(),
    ));
    let places = Arc::new(OpenTripMap::new(
        http.clone(),
        config.places.base_url.clone(),
        config.places.api_key.clone(),
    ));
    let routes = Arc::new(OsmRenderer::new(
        http,
        config.routing.osrm_base_url.clone(),
        config.routing.tile_base_url.clone(),
        config.geocoder.user_agent.clone(),
    ));

    let app = Arc::new(WayfarerBot {
        bot: Bot::new(&config.telegram.bot_token),
        store,
        dialogues,
        geocoder,
        weather,
        places,
        routes,
        poi_seed: config.places.seed,
    });
    app.run().await;
    Ok(())
}
