use crate::ingest::types::{Observation, SpotSymbol};
use anyhow::Result;
use std::collections::BTreeMap;

pub const TREASURY_SYMBOLS: &[SpotSymbol] = &[
    SpotSymbol::new("treasury_10y", "^TNX"),
    SpotSymbol::new("treasury_2y", "^IRX"),
    SpotSymbol::new("treasury_30y", "^TYX"),
];

pub const MARKET_SYMBOLS: &[SpotSymbol] = &[
    SpotSymbol::new("vix", "^VIX"),
    SpotSymbol::new("dxy", "DX-Y.NYB"),
    SpotSymbol::new("move", "^MOVE"),
];

/// Every spot symbol a refresh asks for, in request order.
pub fn spot_symbols() -> Vec<SpotSymbol> {
    TREASURY_SYMBOLS
        .iter()
        .chain(MARKET_SYMBOLS)
        .copied()
        .collect()
}

#[async_trait::async_trait]
pub trait SpotPriceSource: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_spot_price(&self, symbol: &str) -> Result<f64>;
}

#[async_trait::async_trait]
pub trait SeriesSource: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// False when the provider credential is missing; callers must not issue requests then.
    fn is_configured(&self) -> bool;

    /// Newest-first observations with non-numeric values already dropped.
    async fn fetch_observations(&self, series_id: &str, limit: usize) -> Result<Vec<Observation>>;
}

/// Fetches `symbols` one after another. A failed symbol is logged and left out of the result.
pub async fn fetch_spot_family(
    source: &dyn SpotPriceSource,
    symbols: &[SpotSymbol],
) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for s in symbols {
        match source.fetch_spot_price(s.symbol).await {
            Ok(price) => {
                out.insert(s.key.to_string(), price);
            }
            Err(err) => {
                tracing::warn!(
                    provider = source.provider_name(),
                    key = s.key,
                    symbol = s.symbol,
                    error = %err,
                    "spot price fetch failed; skipping symbol"
                );
            }
        }
    }
    out
}

/// Returns `None` when the source is unconfigured, the request fails, or nothing usable came back.
pub async fn fetch_series(
    source: &dyn SeriesSource,
    series_id: &str,
    limit: usize,
) -> Option<Vec<Observation>> {
    if !source.is_configured() {
        tracing::debug!(
            provider = source.provider_name(),
            series_id,
            "series source not configured; skipping"
        );
        return None;
    }

    match source.fetch_observations(series_id, limit).await {
        Ok(obs) if !obs.is_empty() => Some(obs),
        Ok(_) => {
            tracing::warn!(
                provider = source.provider_name(),
                series_id,
                "series returned no usable observations"
            );
            None
        }
        Err(err) => {
            tracing::warn!(
                provider = source.provider_name(),
                series_id,
                error = %err,
                "series fetch failed"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedSpot {
        prices: BTreeMap<&'static str, f64>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl SpotPriceSource for ScriptedSpot {
        fn provider_name(&self) -> &'static str {
            "scripted"
        }

        async fn fetch_spot_price(&self, symbol: &str) -> Result<f64> {
            self.calls.lock().unwrap().push(symbol.to_string());
            self.prices
                .get(symbol)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("no quote for {symbol}"))
        }
    }

    struct CountingSeries {
        configured: bool,
        calls: AtomicUsize,
        result: fn() -> Result<Vec<Observation>>,
    }

    #[async_trait::async_trait]
    impl SeriesSource for CountingSeries {
        fn provider_name(&self) -> &'static str {
            "counting"
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn fetch_observations(
            &self,
            _series_id: &str,
            _limit: usize,
        ) -> Result<Vec<Observation>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    #[tokio::test]
    async fn partial_spot_results_keep_successful_symbols() {
        let source = ScriptedSpot {
            prices: BTreeMap::from([("^TNX", 4.3), ("^TYX", 4.6)]),
            calls: Mutex::new(Vec::new()),
        };

        let out = fetch_spot_family(&source, TREASURY_SYMBOLS).await;

        assert_eq!(out.len(), 2);
        assert_eq!(out.get("treasury_10y"), Some(&4.3));
        assert_eq!(out.get("treasury_30y"), Some(&4.6));
        assert!(!out.contains_key("treasury_2y"));
        assert_eq!(
            *source.calls.lock().unwrap(),
            vec!["^TNX".to_string(), "^IRX".to_string(), "^TYX".to_string()]
        );
    }

    #[tokio::test]
    async fn unconfigured_series_makes_no_request() {
        let source = CountingSeries {
            configured: false,
            calls: AtomicUsize::new(0),
            result: || Ok(Vec::new()),
        };

        assert!(fetch_series(&source, "WALCL", 13).await.is_none());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_or_empty_series_is_absent() {
        let failing = CountingSeries {
            configured: true,
            calls: AtomicUsize::new(0),
            result: || Err(anyhow::anyhow!("boom")),
        };
        assert!(fetch_series(&failing, "WALCL", 13).await.is_none());

        let empty = CountingSeries {
            configured: true,
            calls: AtomicUsize::new(0),
            result: || Ok(Vec::new()),
        };
        assert!(fetch_series(&empty, "WALCL", 13).await.is_none());
        assert_eq!(empty.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn spot_symbols_cover_both_families_in_order() {
        let keys: Vec<_> = spot_symbols().iter().map(|s| s.key).collect();
        assert_eq!(
            keys,
            vec!["treasury_10y", "treasury_2y", "treasury_30y", "vix", "dxy", "move"]
        );
    }
}
