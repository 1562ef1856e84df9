//! Enrichment collaborators: geocoding, weather, points of interest,
//! and map/route rendering.
//!
//! Each service sits behind a trait so handlers (and tests) never care
//! which HTTP API answers. A failed or empty lookup degrades to a
//! category-specific "unavailable" line in the rendered view; it never
//! aborts the response being built.

pub mod geocode;
pub mod map;
pub mod places;
pub mod weather;

use async_trait::async_trait;
use chrono::NaiveDate;

#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected payload: {0}")]
    Payload(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// A place resolved by forward geocoding.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPlace {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// An address resolved by reverse geocoding.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlace {
    pub country: String,
    pub city: Option<String>,
    pub display_name: String,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a country by name.
    async fn find_country(&self, name: &str) -> Result<Option<String>, EnrichError>;
    /// Resolve a city by name, optionally constrained to a country.
    async fn find_city(
        &self,
        city: &str,
        country: Option<&str>,
    ) -> Result<Option<GeoPlace>, EnrichError>;
    /// Resolve coordinates back to an address.
    async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<ResolvedPlace>, EnrichError>;
}

/// One day of weather at a point.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub condition: String,
    pub avg_temp_c: f64,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Summaries for the days in `[start, end]`, capped at five.
    /// Days the upstream cannot answer for are simply absent.
    async fn daily_summaries(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        lat: f64,
        lon: f64,
    ) -> Result<Vec<DaySummary>, EnrichError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceKind {
    Sights,
    Food,
}

/// A ranked point of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct Poi {
    pub name: String,
    pub rate: i64,
    pub lat: f64,
    pub lon: f64,
}

#[async_trait]
pub trait PlacesProvider: Send + Sync {
    async fn places_nearby(
        &self,
        lat: f64,
        lon: f64,
        kind: PlaceKind,
    ) -> Result<Vec<Poi>, EnrichError>;
}

#[async_trait]
pub trait RouteRenderer: Send + Sync {
    /// PNG map covering the driving route through all waypoints
    /// (lat, lon), in order.
    async fn trip_map(&self, waypoints: &[(f64, f64)]) -> Result<Vec<u8>, EnrichError>;
    /// PNG map of the driving route between two points, or `None`
    /// when origin and destination coincide (no route to draw).
    async fn route_map(
        &self,
        from: (f64, f64),
        to: (f64, f64),
    ) -> Result<Option<Vec<u8>>, EnrichError>;
}
