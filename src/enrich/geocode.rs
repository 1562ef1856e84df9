//! Nominatim client for forward and reverse geocoding.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{EnrichError, GeoPlace, Geocoder, ResolvedPlace};

pub struct Nominatim {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl Nominatim {
    pub fn new(http: reqwest::Client, base_url: String, user_agent: String) -> Self {
        Self { http, base_url, user_agent }
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, EnrichError> {
        let hits = self
            .http
            .get(format!("{}/search", self.base_url))
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[("q", query), ("format", "jsonv2"), ("limit", "10")])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<SearchHit>>()
            .await?;
        debug!(query, hits = hits.len(), "nominatim search");
        Ok(hits)
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    name: String,
    #[serde(default)]
    addresstype: String,
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
struct ReverseHit {
    display_name: String,
    #[serde(default)]
    address: ReverseAddress,
}

#[derive(Debug, Default, Deserialize)]
struct ReverseAddress {
    country: Option<String>,
    city: Option<String>,
    town: Option<String>,
}

fn city_hit(hits: Vec<SearchHit>) -> Option<GeoPlace> {
    hits.into_iter()
        .find(|h| h.addresstype == "city" || h.addresstype == "town")
        .and_then(|h| {
            Some(GeoPlace {
                name: h.name,
                lat: h.lat.parse().ok()?,
                lon: h.lon.parse().ok()?,
            })
        })
}

#[async_trait]
impl Geocoder for Nominatim {
    async fn find_country(&self, name: &str) -> Result<Option<String>, EnrichError> {
        let hits = self.search(name).await?;
        Ok(hits
            .into_iter()
            .find(|h| h.addresstype == "country")
            .map(|h| h.name))
    }

    async fn find_city(
        &self,
        city: &str,
        country: Option<&str>,
    ) -> Result<Option<GeoPlace>, EnrichError> {
        let query = match country {
            Some(country) => format!("{} {}", country, city),
            None => city.to_string(),
        };
        Ok(city_hit(self.search(&query).await?))
    }

    async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<ResolvedPlace>, EnrichError> {
        let hit = self
            .http
            .get(format!("{}/reverse", self.base_url))
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("format", "jsonv2".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<ReverseHit>()
            .await?;
        let Some(country) = hit.address.country else {
            return Ok(None);
        };
        Ok(Some(ResolvedPlace {
            country,
            city: hit.address.city.or(hit.address.town),
            display_name: hit.display_name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_hit_prefers_city_or_town_entries() {
        let hits = vec![
            SearchHit {
                name: "Lazio".into(),
                addresstype: "state".into(),
                lat: "41.9".into(),
                lon: "12.7".into(),
            },
            SearchHit {
                name: "Rome".into(),
                addresstype: "city".into(),
                lat: "41.9028".into(),
                lon: "12.4964".into(),
            },
        ];
        let place = city_hit(hits).unwrap();
        assert_eq!(place.name, "Rome");
        assert_eq!(place.lat, 41.9028);
    }

    #[test]
    fn city_hit_rejects_non_city_results() {
        let hits = vec![SearchHit {
            name: "Atlantic Ocean".into(),
            addresstype: "ocean".into(),
            lat: "0".into(),
            lon: "-30".into(),
        }];
        assert_eq!(city_hit(hits), None);
    }
}
