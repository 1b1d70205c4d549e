use crate::config::Settings;
use crate::ingest::provider::SeriesSource;
use crate::ingest::types::Observation;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

const OBSERVATIONS_PATH: &str = "/fred/series/observations";

/// FRED series observations. Without an API key every fetch is a no-op.
#[derive(Debug, Clone)]
pub struct FredClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    date: String,
    value: String,
}

impl FredClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.fetch_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build FRED http client")?;

        Ok(Self {
            http,
            base_url: settings.fred_base_url.clone(),
            api_key: settings.fred_api_key.clone(),
        })
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), OBSERVATIONS_PATH)
    }
}

#[async_trait::async_trait]
impl SeriesSource for FredClient {
    fn provider_name(&self) -> &'static str {
        "fred"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch_observations(&self, series_id: &str, limit: usize) -> Result<Vec<Observation>> {
        let api_key = self
            .api_key
            .as_deref()
            .context("FRED_API_KEY is required")?;

        let limit = limit.to_string();

        // without_url keeps the api key out of logged errors.
        let res = self
            .http
            .get(self.url())
            .query(&[
                ("series_id", series_id),
                ("api_key", api_key),
                ("file_type", "json"),
                ("sort_order", "desc"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| e.without_url())
            .with_context(|| format!("FRED request failed for {series_id}"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read FRED response")?;
        anyhow::ensure!(status.is_success(), "FRED HTTP {status} for {series_id}");

        let parsed = serde_json::from_str::<ObservationsResponse>(&text)
            .with_context(|| format!("FRED response for {series_id} has unexpected shape"))?;

        Ok(parse_observations(parsed.observations))
    }
}

/// Keeps provider order and drops rows whose date or value does not parse;
/// FRED marks missing values with ".".
fn parse_observations(raw: Vec<RawObservation>) -> Vec<Observation> {
    raw.into_iter()
        .filter_map(|o| {
            let date = NaiveDate::parse_from_str(&o.date, "%Y-%m-%d").ok()?;
            let value = o.value.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
            Some(Observation::new(date, value))
        })
        .collect()
}
