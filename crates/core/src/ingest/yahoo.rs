use crate::config::Settings;
use crate::ingest::provider::SpotPriceSource;
use anyhow::{Context, Result};
use serde_json::Value;

const CHART_PATH: &str = "/v8/finance/chart";
const USER_AGENT: &str = concat!("macro-pulse/", env!("CARGO_PKG_VERSION"));

/// Spot quotes from the Yahoo Finance chart endpoint.
#[derive(Debug, Clone)]
pub struct YahooChartClient {
    http: reqwest::Client,
    base_url: String,
}

impl YahooChartClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = settings.fetch_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .context("failed to build Yahoo http client")?;

        Ok(Self {
            http,
            base_url: settings.yahoo_base_url.clone(),
        })
    }

    fn url(&self, symbol: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url.trim_end_matches('/'),
            CHART_PATH,
            symbol
        )
    }
}

#[async_trait::async_trait]
impl SpotPriceSource for YahooChartClient {
    fn provider_name(&self) -> &'static str {
        "yahoo_chart"
    }

    async fn fetch_spot_price(&self, symbol: &str) -> Result<f64> {
        let res = self
            .http
            .get(self.url(symbol))
            .query(&[("interval", "1d"), ("range", "1d")])
            .send()
            .await
            .with_context(|| format!("Yahoo request failed for {symbol}"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Yahoo response")?;
        anyhow::ensure!(status.is_success(), "Yahoo HTTP {status} for {symbol}");

        let raw_json = serde_json::from_str::<Value>(&text)
            .with_context(|| format!("Yahoo response for {symbol} is not valid JSON"))?;

        parse_chart_price(&raw_json)
            .with_context(|| format!("Yahoo response for {symbol} has no regularMarketPrice"))
    }
}

/// Extracts `chart.result[0].meta.regularMarketPrice` when it is a finite number.
pub fn parse_chart_price(raw: &Value) -> Option<f64> {
    raw.pointer("/chart/result/0/meta/regularMarketPrice")?
        .as_f64()
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_regular_market_price() {
        let v = json!({
            "chart": {
                "result": [
                    {"meta": {"symbol": "^VIX", "regularMarketPrice": 22.0, "currency": "USD"}}
                ],
                "error": null
            }
        });
        assert_eq!(parse_chart_price(&v), Some(22.0));
    }

    #[test]
    fn missing_or_non_numeric_price_is_none() {
        assert_eq!(parse_chart_price(&json!({"chart": {"result": []}})), None);
        assert_eq!(
            parse_chart_price(&json!({"chart": {"result": null, "error": {"code": "Not Found"}}})),
            None
        );
        assert_eq!(
            parse_chart_price(&json!({
                "chart": {"result": [{"meta": {"regularMarketPrice": "4.2"}}]}
            })),
            None
        );
    }

    #[test]
    fn builds_chart_url_without_double_slash() {
        let settings = Settings::from_lookup(|key| {
            (key == "YAHOO_BASE_URL").then(|| "http://localhost:9000/".to_string())
        })
        .unwrap();
        let client = YahooChartClient::from_settings(&settings).unwrap();
        assert_eq!(
            client.url("^TNX"),
            "http://localhost:9000/v8/finance/chart/^TNX"
        );
    }
}
