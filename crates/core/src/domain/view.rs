use crate::domain::document::{
    CalendarEvent, DalioIndicators, Document, LiquidityData, ManualOverrides, MetricRecord, Scalar,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Read-side shape served to the dashboard: stored metric wrappers flattened to scalars,
/// with manual overrides layered on top.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub current: BTreeMap<String, Scalar>,
    pub predictions: BTreeMap<String, Scalar>,
    pub calendar: Vec<CalendarEvent>,
    pub dalio: Option<DalioIndicators>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidity: Option<LiquidityData>,
    pub last_updated: Option<DateTime<Utc>>,
}

pub fn project_view(doc: &Document) -> DashboardView {
    DashboardView {
        current: project_section("current", &doc.current, &doc.manual_overrides),
        predictions: project_section("predictions", &doc.predictions, &doc.manual_overrides),
        calendar: doc.calendar.clone(),
        dalio: doc.dalio.clone(),
        liquidity: doc.liquidity.clone(),
        last_updated: doc.last_updated,
    }
}

fn project_section(
    section: &str,
    records: &BTreeMap<String, MetricRecord>,
    overrides: &ManualOverrides,
) -> BTreeMap<String, Scalar> {
    records
        .iter()
        .map(|(key, record)| {
            let value = overrides
                .get(&format!("{section}.{key}"))
                .cloned()
                .unwrap_or(Scalar::Number(record.value));
            (key.clone(), value)
        })
        .collect()
}
