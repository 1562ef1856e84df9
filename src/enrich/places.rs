//! OpenTripMap client plus the selection rule for what to show.
//!
//! The view shows a small, stable sample of the best-rated places:
//! keep only the top-rated tier, drop duplicate names, shuffle with a
//! configured seed so the sample is deterministic, and take five.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;

use super::{EnrichError, PlaceKind, PlacesProvider, Poi};

const RADIUS_METERS: u32 = 10_000;
const MIN_RATE: u32 = 3;
pub const SAMPLE_SIZE: usize = 5;

pub struct OpenTripMap {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenTripMap {
    pub fn new(http: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self { http, base_url, api_key }
    }
}

#[derive(Debug, Deserialize)]
struct RadiusPayload {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: FeatureProperties,
    geometry: FeatureGeometry,
}

#[derive(Debug, Deserialize)]
struct FeatureProperties {
    #[serde(default)]
    name: String,
    #[serde(default)]
    rate: i64,
}

#[derive(Debug, Deserialize)]
struct FeatureGeometry {
    /// GeoJSON order: [lon, lat].
    coordinates: [f64; 2],
}

#[async_trait]
impl PlacesProvider for OpenTripMap {
    async fn places_nearby(
        &self,
        lat: f64,
        lon: f64,
        kind: PlaceKind,
    ) -> Result<Vec<Poi>, EnrichError> {
        let kinds = match kind {
            PlaceKind::Sights => "interesting_places",
            PlaceKind::Food => "foods",
        };
        let payload = self
            .http
            .get(format!("{}/places/radius", self.base_url))
            .query(&[
                ("radius", RADIUS_METERS.to_string()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("kinds", kinds.to_string()),
                ("rate", MIN_RATE.to_string()),
                ("apikey", self.api_key.clone()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<RadiusPayload>()
            .await?;
        Ok(payload
            .features
            .into_iter()
            .filter(|f| !f.properties.name.is_empty())
            .map(|f| Poi {
                name: f.properties.name,
                rate: f.properties.rate,
                lat: f.geometry.coordinates[1],
                lon: f.geometry.coordinates[0],
            })
            .collect())
    }
}

/// Top-rated tier, deduplicated by name, deterministically sampled.
pub fn pick_top(mut pois: Vec<Poi>, seed: u64) -> Vec<Poi> {
    let Some(max_rate) = pois.iter().map(|p| p.rate).max() else {
        return Vec::new();
    };
    pois.retain(|p| p.rate == max_rate);
    let mut seen = std::collections::HashSet::new();
    pois.retain(|p| seen.insert(p.name.clone()));
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    pois.shuffle(&mut rng);
    pois.truncate(SAMPLE_SIZE);
    pois
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poi(name: &str, rate: i64) -> Poi {
        Poi {
            name: name.into(),
            rate,
            lat: 0.0,
            lon: 0.0,
        }
    }

    #[test]
    fn keeps_only_the_top_tier() {
        let picked = pick_top(vec![poi("a", 3), poi("b", 7), poi("c", 7)], 1);
        assert_eq!(picked.len(), 2);
        assert!(picked.iter().all(|p| p.rate == 7));
    }

    #[test]
    fn dedupes_by_name() {
        let picked = pick_top(vec![poi("a", 5), poi("a", 5), poi("b", 5)], 1);
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn caps_at_sample_size() {
        let pois: Vec<Poi> = (0..20).map(|i| poi(&format!("p{}", i), 5)).collect();
        assert_eq!(pick_top(pois, 1).len(), SAMPLE_SIZE);
    }

    #[test]
    fn same_seed_same_sample() {
        let pois: Vec<Poi> = (0..20).map(|i| poi(&format!("p{}", i), 5)).collect();
        let a = pick_top(pois.clone(), 42);
        let b = pick_top(pois.clone(), 42);
        assert_eq!(a, b);
        // A different seed is allowed to (and here does) reorder.
        let c = pick_top(pois, 43);
        assert_eq!(c.len(), SAMPLE_SIZE);
    }

    #[test]
    fn empty_input_is_empty() {
        assert!(pick_top(Vec::new(), 1).is_empty());
    }
}
