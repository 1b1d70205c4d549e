use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Provenance of a stored metric. Only `Api` metrics are rewritten by a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Api,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub value: f64,
    pub source: Source,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,

    /// Per-record keys this service does not interpret, e.g. `unit`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MetricRecord {
    /// Returns the record a refresh should store after fetching `value`.
    /// Manual records come back unchanged.
    pub fn with_fetched(&self, value: f64, now: DateTime<Utc>) -> MetricRecord {
        match self.source {
            Source::Api => MetricRecord {
                value,
                updated: Some(now),
                ..self.clone()
            },
            Source::Manual => self.clone(),
        }
    }
}

/// Scalar accepted as a manual override value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Accepts JSON numbers and strings; everything else is rejected.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(Scalar::Number),
            Value::String(s) => Some(Scalar::Text(s.clone())),
            _ => None,
        }
    }
}

/// Overrides keyed by dotted path, e.g. `current.fed_rate`.
pub type ManualOverrides = BTreeMap<String, Scalar>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Critical,
    High,
    #[default]
    Med,
    Low,
}

// The calendar and dalio blocks are read-only here: every field defaults and unknown keys are
// carried through `extra`, so a rewrite or a projection returns them as stored.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarEvent {
    pub date: String,
    pub event: String,
    pub time: String,
    pub impact: Impact,
    pub prev: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DalioIndicators {
    pub debt_cycle: DebtCycle,
    pub monetary_policy: MonetaryPolicy,
    pub productivity: Productivity,
    pub wealth: Wealth,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DebtCycle {
    pub debt_to_gdp: f64,
    pub debt_service_ratio: f64,
    pub credit_growth: f64,
    pub phase: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonetaryPolicy {
    pub real_rates: f64,
    pub yield_curve: f64,
    pub qe_qt: String,
    pub phase: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Productivity {
    pub labor_productivity: f64,
    pub capital_investment: f64,
    pub innovation: String,
    pub phase: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Wealth {
    pub wealth_gap: String,
    pub populism: String,
    pub social_conflict: String,
    pub phase: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Net liquidity and funding-market block. Trillions for `fed_balance_sheet` and
/// `net_liquidity`, billions for `tga`, `rrp` and the two change fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiquidityData {
    pub fed_balance_sheet: f64,
    pub tga: f64,
    pub rrp: f64,
    pub net_liquidity: f64,
    #[serde(rename = "netLiquidity4wChange")]
    pub net_liquidity_4w_change: f64,
    #[serde(rename = "netLiquidity12wChange")]
    pub net_liquidity_12w_change: f64,
    pub sofr: f64,
    #[serde(rename = "move")]
    pub move_index: f64,
    pub cross_currency_basis: f64,
    pub repo_stress: f64,
    pub hy_spread: f64,
    pub vix: f64,
    pub dxy: f64,
    pub liquidity_regime: String,
    pub funding_stress: String,
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for LiquidityData {
    fn default() -> Self {
        Self {
            fed_balance_sheet: 0.0,
            tga: 0.0,
            rrp: 0.0,
            net_liquidity: 0.0,
            net_liquidity_4w_change: 0.0,
            net_liquidity_12w_change: 0.0,
            sofr: 0.0,
            move_index: 0.0,
            cross_currency_basis: 0.0,
            repo_stress: 0.0,
            hy_spread: 0.0,
            vix: 0.0,
            dxy: 0.0,
            liquidity_regime: "neutral".to_string(),
            funding_stress: "low".to_string(),
            last_updated: None,
            extra: Map::new(),
        }
    }
}

/// The persisted root aggregate. Read and written as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub current: BTreeMap<String, MetricRecord>,
    pub predictions: BTreeMap<String, MetricRecord>,
    #[serde(default)]
    pub calendar: Vec<CalendarEvent>,
    #[serde(default)]
    pub dalio: Option<DalioIndicators>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquidity: Option<LiquidityData>,
    #[serde(default)]
    pub manual_overrides: ManualOverrides,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,

    /// Top-level keys this service does not interpret; kept so a rewrite does not drop them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    pub fn set_override(&mut self, path: impl Into<String>, value: Scalar) {
        self.manual_overrides.insert(path.into(), value);
    }
}
