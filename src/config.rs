use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub places: PlacesConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    /// Usually supplied via the BOT_TOKEN env var instead.
    #[serde(default)]
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

fn default_db_path() -> String {
    "wayfarer.db".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeocoderConfig {
    #[serde(default = "default_nominatim_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: default_nominatim_url(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_nominatim_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_user_agent() -> String {
    format!("wayfarer-bot/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_weather_url")]
    pub base_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_weather_url(),
        }
    }
}

fn default_weather_url() -> String {
    "https://api.weatherapi.com/v1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlacesConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_places_url")]
    pub base_url: String,
    /// Seed for the deterministic point-of-interest sample.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_places_url(),
            seed: default_seed(),
        }
    }
}

fn default_places_url() -> String {
    "https://api.opentripmap.com/0.1/en".to_string()
}

fn default_seed() -> u64 {
    1312
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoutingConfig {
    #[serde(default = "default_osrm_url")]
    pub osrm_base_url: String,
    #[serde(default = "default_tile_url")]
    pub tile_base_url: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            osrm_base_url: default_osrm_url(),
            tile_base_url: default_tile_url(),
        }
    }
}

fn default_osrm_url() -> String {
    "https://router.project-osrm.org".to_string()
}

fn default_tile_url() -> String {
    "https://tile.openstreetmap.org".to_string()
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config: AppConfig = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            toml::from_str("")?
        };
        config.apply_env_overrides();
        if config.telegram.bot_token.is_empty() {
            anyhow::bail!("no bot token: set telegram.bot_token in config.toml or BOT_TOKEN");
        }
        Ok(config)
    }

    /// Secrets can come from the environment (or .env) instead of the
    /// config file.
    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Ok(key) = std::env::var("WEATHER_API_TOKEN") {
            self.weather.api_key = key;
        }
        if let Ok(key) = std::env::var("OPENTRIPMAP_API_TOKEN") {
            self.places.api_key = key;
        }
        if let Ok(seed) = std::env::var("RANDOM_SEED") {
            if let Ok(seed) = seed.parse() {
                self.places.seed = seed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [telegram]
            bot_token = "123:abc"
            "#,
        )
        .unwrap();
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.database.path, "wayfarer.db");
        assert_eq!(config.places.seed, 1312);
        assert!(config.geocoder.base_url.contains("nominatim"));
    }

    #[test]
    fn sections_override_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [telegram]
            bot_token = "123:abc"

            [database]
            path = "/tmp/test.db"

            [places]
            api_key = "k"
            seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.database.path, "/tmp/test.db");
        assert_eq!(config.places.seed, 7);
        assert_eq!(config.places.api_key, "k");
    }
}
