use crate::ingest::provider::{fetch_series, SeriesSource};
use crate::ingest::types::Observation;
use chrono::NaiveDate;

pub const BALANCE_SHEET_SERIES: &str = "WALCL";
pub const TREASURY_CASH_SERIES: &str = "WTREGEN";
pub const REVERSE_REPO_SERIES: &str = "RRPONTSYD";
pub const SOFR_SERIES: &str = "SOFR";
pub const HY_SPREAD_SERIES: &str = "BAMLH0A0HYM2";

const WEEKLY_LIMIT: usize = 13;
// Daily series: enough business days to reach back past 12 weeks.
const DAILY_LIMIT: usize = 90;

const SHORT_OFFSET_WEEKS: usize = 4;
const LONG_OFFSET_WEEKS: usize = 12;

// WALCL is reported in millions, WTREGEN and RRPONTSYD in billions.
const MILLIONS_PER_TRILLION: f64 = 1_000_000.0;
const BILLIONS_PER_TRILLION: f64 = 1_000.0;

/// The six derived fields of the liquidity block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetLiquidity {
    /// Trillions.
    pub fed_balance_sheet: f64,
    /// Billions.
    pub tga: f64,
    /// Billions.
    pub rrp: f64,
    /// Trillions.
    pub net_liquidity: f64,
    /// Billions.
    pub change_4w: f64,
    /// Billions.
    pub change_12w: f64,
}

impl NetLiquidity {
    pub fn regime(&self) -> &'static str {
        if self.change_4w > 0.0 && self.change_12w > 0.0 {
            "expanding"
        } else if self.change_4w < 0.0 && self.change_12w < 0.0 {
            "contracting"
        } else {
            "neutral"
        }
    }
}

/// Everything the series family produced in one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiquidityFetch {
    pub net: Option<NetLiquidity>,
    pub sofr: Option<f64>,
    pub hy_spread_bps: Option<f64>,
}

/// Computes net liquidity from newest-first series. All three inputs are required.
///
/// Weekly series are compared by index. The daily reverse-repo series is aligned by date:
/// the newest observation on or before the weekly anchor date is used, falling back to the
/// oldest available observation when the series does not reach that far back.
pub fn compute_net_liquidity(
    balance_sheet: &[Observation],
    treasury_cash: &[Observation],
    reverse_repo: &[Observation],
) -> Option<NetLiquidity> {
    let bs_now = balance_sheet.first()?;
    let tga_now = treasury_cash.first()?;
    let rrp_now = reverse_repo.first()?;

    let net_now = net_trillions(bs_now.value, tga_now.value, rrp_now.value);

    let change_at = |offset: usize| -> f64 {
        let (Some(bs), Some(tga)) = (balance_sheet.get(offset), treasury_cash.get(offset)) else {
            return 0.0;
        };
        let Some(rrp) = reverse_repo_at(reverse_repo, bs.date) else {
            return 0.0;
        };
        let net_then = net_trillions(bs.value, tga.value, rrp.value);
        let change = ((net_now - net_then) * BILLIONS_PER_TRILLION).round();
        // No negative zero in the stored document.
        if change == 0.0 {
            0.0
        } else {
            change
        }
    };

    Some(NetLiquidity {
        fed_balance_sheet: round2(bs_now.value / MILLIONS_PER_TRILLION),
        tga: tga_now.value.round(),
        rrp: rrp_now.value.round(),
        net_liquidity: round2(net_now),
        change_4w: change_at(SHORT_OFFSET_WEEKS),
        change_12w: change_at(LONG_OFFSET_WEEKS),
    })
}

fn reverse_repo_at(reverse_repo: &[Observation], anchor: NaiveDate) -> Option<&Observation> {
    reverse_repo
        .iter()
        .find(|o| o.date <= anchor)
        .or_else(|| reverse_repo.last())
}

fn net_trillions(balance_sheet_millions: f64, tga_billions: f64, rrp_billions: f64) -> f64 {
    balance_sheet_millions / MILLIONS_PER_TRILLION
        - tga_billions / BILLIONS_PER_TRILLION
        - rrp_billions / BILLIONS_PER_TRILLION
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Runs the series family one request at a time. Returns an empty result without any
/// request when the source has no credential.
pub async fn fetch_liquidity(source: &dyn SeriesSource) -> LiquidityFetch {
    if !source.is_configured() {
        tracing::debug!(
            provider = source.provider_name(),
            "series credential not configured; skipping liquidity refresh"
        );
        return LiquidityFetch::default();
    }

    let balance_sheet = fetch_series(source, BALANCE_SHEET_SERIES, WEEKLY_LIMIT).await;
    let treasury_cash = fetch_series(source, TREASURY_CASH_SERIES, WEEKLY_LIMIT).await;
    let reverse_repo = fetch_series(source, REVERSE_REPO_SERIES, DAILY_LIMIT).await;

    let net = match (&balance_sheet, &treasury_cash, &reverse_repo) {
        (Some(bs), Some(tga), Some(rrp)) => compute_net_liquidity(bs, tga, rrp),
        _ => {
            tracing::warn!(
                balance_sheet = balance_sheet.is_some(),
                treasury_cash = treasury_cash.is_some(),
                reverse_repo = reverse_repo.is_some(),
                "liquidity inputs incomplete; skipping net liquidity this cycle"
            );
            None
        }
    };

    let sofr = fetch_series(source, SOFR_SERIES, 1)
        .await
        .and_then(|obs| obs.first().map(|o| round2(o.value)));

    // Reported in percent; the dashboard shows basis points.
    let hy_spread_bps = fetch_series(source, HY_SPREAD_SERIES, 1)
        .await
        .and_then(|obs| obs.first().map(|o| (o.value * 100.0).round()));

    LiquidityFetch {
        net,
        sofr,
        hy_spread_bps,
    }
}
