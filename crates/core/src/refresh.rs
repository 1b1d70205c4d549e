use crate::config::Settings;
use crate::domain::{Document, LiquidityData};
use crate::ingest::fred::FredClient;
use crate::ingest::liquidity::{fetch_liquidity, LiquidityFetch};
use crate::ingest::provider::{fetch_spot_family, spot_symbols};
use crate::ingest::yahoo::YahooChartClient;
use crate::ingest::{SeriesSource, SpotPriceSource, SpotSymbol};
use crate::storage::{JsonStore, StoreError};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const LIQUIDITY_KEY: &str = "liquidity";
pub const SOFR_KEY: &str = "sofr";
pub const HY_SPREAD_KEY: &str = "hySpread";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshReport {
    /// Fetched spot keys in request order, then the liquidity keys that were rewritten.
    pub updated: Vec<String>,
    pub persisted: bool,
}

#[derive(Clone)]
pub struct Refresher {
    store: JsonStore,
    spot: Arc<dyn SpotPriceSource>,
    series: Arc<dyn SeriesSource>,
    symbols: Vec<SpotSymbol>,
}

impl Refresher {
    pub fn new(
        store: JsonStore,
        spot: Arc<dyn SpotPriceSource>,
        series: Arc<dyn SeriesSource>,
    ) -> Self {
        Self {
            store,
            spot,
            series,
            symbols: spot_symbols(),
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self::new(
            JsonStore::from_settings(settings),
            Arc::new(YahooChartClient::from_settings(settings)?),
            Arc::new(FredClient::from_settings(settings)?),
        ))
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    pub async fn refresh(&self) -> Result<RefreshReport, StoreError> {
        self.run(false).await
    }

    /// Fetches and merges like `refresh` but leaves the document on disk untouched.
    pub async fn dry_run(&self) -> Result<RefreshReport, StoreError> {
        self.run(true).await
    }

    async fn run(&self, dry_run: bool) -> Result<RefreshReport, StoreError> {
        let mut doc = self.store.load().await?;

        let (prices, liquidity) = tokio::join!(
            fetch_spot_family(self.spot.as_ref(), &self.symbols),
            fetch_liquidity(self.series.as_ref()),
        );

        let now = Utc::now();
        let mut updated: Vec<String> = self
            .symbols
            .iter()
            .filter(|s| prices.contains_key(s.key))
            .map(|s| s.key.to_string())
            .collect();

        apply_spot_prices(&mut doc, &prices, now);
        updated.extend(
            apply_liquidity(&mut doc, &liquidity, &prices, now)
                .into_iter()
                .map(str::to_string),
        );

        if !dry_run {
            self.store.save(&mut doc).await?;
        }

        tracing::info!(?updated, dry_run, "refresh complete");
        Ok(RefreshReport {
            updated,
            persisted: !dry_run,
        })
    }
}

/// Writes fetched prices onto matching `current` records; manual records stay as they are.
pub fn apply_spot_prices(doc: &mut Document, prices: &BTreeMap<String, f64>, now: DateTime<Utc>) {
    for (key, value) in prices {
        if let Some(record) = doc.current.get_mut(key) {
            *record = record.with_fetched(*value, now);
        }
    }
}

/// Replaces the derived liquidity fields when the computation succeeded and folds in
/// the funding indicators. Returns the report keys for what changed.
pub fn apply_liquidity(
    doc: &mut Document,
    fetched: &LiquidityFetch,
    prices: &BTreeMap<String, f64>,
    now: DateTime<Utc>,
) -> Vec<&'static str> {
    let mut keys = Vec::new();

    if let Some(net) = fetched.net {
        let block = doc.liquidity.get_or_insert_with(LiquidityData::default);
        block.fed_balance_sheet = net.fed_balance_sheet;
        block.tga = net.tga;
        block.rrp = net.rrp;
        block.net_liquidity = net.net_liquidity;
        block.net_liquidity_4w_change = net.change_4w;
        block.net_liquidity_12w_change = net.change_12w;
        block.liquidity_regime = net.regime().to_string();
        block.last_updated = Some(now);

        if let Some(vix) = prices.get("vix") {
            block.vix = *vix;
        }
        if let Some(dxy) = prices.get("dxy") {
            block.dxy = *dxy;
        }
        if let Some(move_index) = prices.get("move") {
            block.move_index = *move_index;
            block.funding_stress = funding_stress(block).to_string();
        }
        keys.push(LIQUIDITY_KEY);
    }

    // Funding indicators only land on an existing block.
    if let Some(block) = doc.liquidity.as_mut() {
        if let Some(sofr) = fetched.sofr {
            block.sofr = sofr;
            keys.push(SOFR_KEY);
        }
        if let Some(hy) = fetched.hy_spread_bps {
            block.hy_spread = hy;
            keys.push(HY_SPREAD_KEY);
        }
    }

    keys
}

/// Label for the funding-market panel, from rates volatility and the stored spread proxies.
pub fn funding_stress(block: &LiquidityData) -> &'static str {
    if block.move_index > 120.0 || block.repo_stress > 50.0 || block.cross_currency_basis < -30.0 {
        "high"
    } else if block.move_index > 100.0 || block.repo_stress > 25.0 {
        "elevated"
    } else {
        "low"
    }
}
