//! weatherapi.com client.
//!
//! The upstream splits coverage across three endpoints: `history` for
//! past days, `forecast` for the near future, and `future` for dates
//! past the forecast horizon. The right one is picked per day.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;

use super::{DaySummary, EnrichError, WeatherProvider};

/// Days the forecast endpoint covers beyond today.
const FORECAST_HORIZON_DAYS: i64 = 14;
/// At most this many days are summarized per stop.
pub const MAX_DAYS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherSource {
    History,
    Forecast,
    Future,
}

impl WeatherSource {
    pub fn for_date(date: NaiveDate, today: NaiveDate) -> WeatherSource {
        if date < today {
            WeatherSource::History
        } else if date - Duration::days(FORECAST_HORIZON_DAYS) <= today {
            WeatherSource::Forecast
        } else {
            WeatherSource::Future
        }
    }

    fn endpoint(self) -> &'static str {
        match self {
            WeatherSource::History => "history.json",
            WeatherSource::Forecast => "forecast.json",
            WeatherSource::Future => "future.json",
        }
    }
}

pub struct WeatherApi {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WeatherApi {
    pub fn new(http: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self { http, base_url, api_key }
    }

    async fn day(
        &self,
        date: NaiveDate,
        lat: f64,
        lon: f64,
    ) -> Result<Option<DaySummary>, EnrichError> {
        let source = WeatherSource::for_date(date, Utc::now().date_naive());
        let payload = self
            .http
            .get(format!("{}/{}", self.base_url, source.endpoint()))
            .query(&[
                ("q", format!("{},{}", lat, lon)),
                ("dt", date.format("%Y-%m-%d").to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<WeatherPayload>()
            .await?;
        let Some(day) = payload.forecast.forecastday.into_iter().next() else {
            debug!(%date, "weatherapi returned no forecast day");
            return Ok(None);
        };
        Ok(Some(DaySummary {
            date,
            condition: day.day.condition.text,
            avg_temp_c: day.day.avgtemp_c,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct WeatherPayload {
    forecast: Forecast,
}

#[derive(Debug, Deserialize)]
struct Forecast {
    #[serde(default)]
    forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Deserialize)]
struct ForecastDay {
    day: Day,
}

#[derive(Debug, Deserialize)]
struct Day {
    avgtemp_c: f64,
    condition: Condition,
}

#[derive(Debug, Deserialize)]
struct Condition {
    text: String,
}

#[async_trait]
impl WeatherProvider for WeatherApi {
    async fn daily_summaries(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        lat: f64,
        lon: f64,
    ) -> Result<Vec<DaySummary>, EnrichError> {
        let mut out = Vec::new();
        let mut date = start;
        while date <= end && out.len() < MAX_DAYS {
            match self.day(date, lat, lon).await {
                Ok(Some(summary)) => out.push(summary),
                // One missing day ends the range; later days come from
                // the same source and would fail the same way.
                Ok(None) => break,
                Err(e) => {
                    debug!(%date, error = %e, "weather lookup failed");
                    break;
                }
            }
            date += Duration::days(1);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn past_dates_use_history() {
        let today = d(2024, 6, 15);
        assert_eq!(
            WeatherSource::for_date(d(2024, 6, 14), today),
            WeatherSource::History
        );
        assert_eq!(
            WeatherSource::for_date(d(2023, 1, 1), today),
            WeatherSource::History
        );
    }

    #[test]
    fn near_dates_use_forecast() {
        let today = d(2024, 6, 15);
        assert_eq!(
            WeatherSource::for_date(today, today),
            WeatherSource::Forecast
        );
        assert_eq!(
            WeatherSource::for_date(d(2024, 6, 29), today),
            WeatherSource::Forecast
        );
    }

    #[test]
    fn far_dates_use_future() {
        let today = d(2024, 6, 15);
        assert_eq!(
            WeatherSource::for_date(d(2024, 6, 30), today),
            WeatherSource::Future
        );
        assert_eq!(
            WeatherSource::for_date(d(2025, 1, 1), today),
            WeatherSource::Future
        );
    }
}
