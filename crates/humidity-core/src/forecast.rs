//! Forecast retrieval from the National Weather Service API.
//!
//! The NWS needs two requests: `/points/{lat},{lon}` resolves a location to a
//! gridpoint forecast URL, which is then fetched for its periods. Callers only
//! see [`ForecastSource::forecast_periods`].

use crate::deadline::Deadline;
use crate::error::{HumidityError, Result};
use crate::run::Stage;
use chrono::{DateTime, FixedOffset};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

const GEO_JSON: &str = "application/geo+json";

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// One forecast interval as reported upstream.
///
/// `unit` is kept verbatim so an unexpected unit can be reported as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPeriod {
    pub name: String,
    pub start: DateTime<FixedOffset>,
    pub is_night: bool,
    pub temperature: i32,
    pub unit: String,
}

/// Anything that can produce ordered forecast periods for a coordinate.
pub trait ForecastSource {
    fn forecast_periods(
        &self,
        latitude: f64,
        longitude: f64,
        deadline: &Deadline,
    ) -> Result<Vec<ForecastPeriod>>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PointsResponse {
    properties: PointsProperties,
}

#[derive(Debug, Deserialize)]
struct PointsProperties {
    #[serde(default)]
    forecast: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    #[serde(default)]
    periods: Vec<WirePeriod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePeriod {
    #[serde(default)]
    name: String,
    start_time: String,
    is_daytime: bool,
    temperature: i32,
    temperature_unit: String,
}

// ---------------------------------------------------------------------------
// NwsClient
// ---------------------------------------------------------------------------

pub struct NwsClient {
    client: Client,
    base_url: String,
    user_agent: String,
    request_timeout: Duration,
}

impl NwsClient {
    pub fn new(
        base_url: impl Into<String>,
        user_agent: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| gateway("build http client", e))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
            request_timeout,
        })
    }

    fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        what: &str,
        url: &str,
        deadline: &Deadline,
    ) -> Result<T> {
        let timeout = deadline.request_timeout(self.request_timeout, Stage::Fetching)?;
        tracing::debug!(%url, ?timeout, "requesting {what}");

        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, GEO_JSON)
            .timeout(timeout)
            .send()
            .map_err(|e| gateway(&format!("do {what} request"), e))?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(HumidityError::Gateway(format!(
                "{what} request failed: {status}"
            )));
        }
        resp.json::<T>()
            .map_err(|e| gateway(&format!("decode {what} response"), e))
    }

    fn resolve_forecast_url(
        &self,
        latitude: f64,
        longitude: f64,
        deadline: &Deadline,
    ) -> Result<String> {
        let url = format!("{}/points/{latitude:.4},{longitude:.4}", self.base_url);
        let points: PointsResponse = self.get_json("points", &url, deadline)?;
        match points.properties.forecast {
            Some(u) if !u.is_empty() => Ok(u),
            _ => Err(HumidityError::Gateway(
                "points response missing forecast URL".to_string(),
            )),
        }
    }
}

impl ForecastSource for NwsClient {
    fn forecast_periods(
        &self,
        latitude: f64,
        longitude: f64,
        deadline: &Deadline,
    ) -> Result<Vec<ForecastPeriod>> {
        let forecast_url = self.resolve_forecast_url(latitude, longitude, deadline)?;
        let forecast: ForecastResponse = self.get_json("forecast", &forecast_url, deadline)?;

        if forecast.properties.periods.is_empty() {
            return Err(HumidityError::Gateway(
                "forecast response missing periods".to_string(),
            ));
        }

        forecast
            .properties
            .periods
            .into_iter()
            .map(|p| {
                let start = DateTime::parse_from_rfc3339(&p.start_time).map_err(|e| {
                    HumidityError::Gateway(format!(
                        "parse period start time {:?}: {e}",
                        p.start_time
                    ))
                })?;
                Ok(ForecastPeriod {
                    name: p.name,
                    start,
                    is_night: !p.is_daytime,
                    temperature: p.temperature,
                    unit: p.temperature_unit,
                })
            })
            .collect()
    }
}

fn gateway(action: &str, err: reqwest::Error) -> HumidityError {
    if err.is_timeout() {
        return HumidityError::Gateway(format!("{action}: timed out"));
    }
    HumidityError::Gateway(format!("{action}: {err}"))
}
