use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use macro_pulse_core::domain::{project_view, DashboardView, Document, Scalar};
use macro_pulse_core::refresh::Refresher;
use macro_pulse_core::storage::JsonStore;

use crate::error::{ApiError, ApiResult};

const LOAD_FAILED: &str = "Failed to load data";
const SAVE_FAILED: &str = "Failed to save data";
const REFRESH_FAILED: &str = "Failed to refresh data";
const MISSING_FIELDS: &str = "Missing path or value";

#[derive(Clone)]
pub struct AppState {
    pub refresher: Refresher,
}

impl AppState {
    fn store(&self) -> &JsonStore {
        self.refresher.store()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/data", get(get_data))
        .route("/api/update", post(post_update))
        .route("/api/refresh", post(post_refresh))
        .route("/api/raw", get(get_raw))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct UpdateRequest {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    value: Option<Value>,
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
    success: bool,
    path: String,
    value: Scalar,
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    success: bool,
    message: &'static str,
    updated: Vec<String>,
}

async fn get_data(State(state): State<AppState>) -> ApiResult<Json<DashboardView>> {
    let doc = load(&state).await?;
    Ok(Json(project_view(&doc)))
}

async fn post_update(
    State(state): State<AppState>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> ApiResult<Json<UpdateResponse>> {
    let Json(req) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    // Stored as sent: the view looks overrides up by exact path.
    let path = req.path.filter(|p| !p.trim().is_empty());
    let value = req.value.as_ref().and_then(Scalar::from_json);
    let (Some(path), Some(value)) = (path, value) else {
        return Err(ApiError::BadRequest(MISSING_FIELDS.to_string()));
    };

    let mut doc = load(&state).await?;
    doc.set_override(path.clone(), value.clone());
    state
        .store()
        .save(&mut doc)
        .await
        .map_err(|e| internal(e, SAVE_FAILED))?;

    tracing::info!(%path, ?value, "manual override stored");
    Ok(Json(UpdateResponse {
        success: true,
        path,
        value,
    }))
}

async fn post_refresh(State(state): State<AppState>) -> ApiResult<Json<RefreshResponse>> {
    tracing::info!("refreshing live data");
    let report = state
        .refresher
        .refresh()
        .await
        .map_err(|e| internal(e, REFRESH_FAILED))?;

    Ok(Json(RefreshResponse {
        success: true,
        message: "Data refreshed",
        updated: report.updated,
    }))
}

/// Debug surface: the document exactly as stored, overrides and record wrappers included.
async fn get_raw(State(state): State<AppState>) -> ApiResult<Json<Document>> {
    Ok(Json(load(&state).await?))
}

async fn load(state: &AppState) -> ApiResult<Document> {
    state
        .store()
        .load()
        .await
        .map_err(|e| internal(e, LOAD_FAILED))
}

fn internal(err: impl Into<anyhow::Error>, public: &str) -> ApiError {
    let err = err.into();
    sentry_anyhow::capture_anyhow(&err);
    tracing::error!(error = %err, "{public}");
    ApiError::Internal(public.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use macro_pulse_core::domain::Source;
    use macro_pulse_core::ingest::{Observation, SeriesSource, SpotPriceSource};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct FakeSpot(HashMap<&'static str, f64>);

    #[async_trait::async_trait]
    impl SpotPriceSource for FakeSpot {
        fn provider_name(&self) -> &'static str {
            "fake_spot"
        }

        async fn fetch_spot_price(&self, symbol: &str) -> anyhow::Result<f64> {
            self.0
                .get(symbol)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("no quote for {symbol}"))
        }
    }

    struct NoSeries;

    #[async_trait::async_trait]
    impl SeriesSource for NoSeries {
        fn provider_name(&self) -> &'static str {
            "none"
        }

        fn is_configured(&self) -> bool {
            false
        }

        async fn fetch_observations(
            &self,
            _series_id: &str,
            _limit: usize,
        ) -> anyhow::Result<Vec<Observation>> {
            anyhow::bail!("not configured")
        }
    }

    fn seed() -> Value {
        json!({
            "current": {
                "fed_rate": {"value": 5.25, "source": "manual", "updated": "2026-01-10T00:00:00Z"},
                "vix": {"value": 18.0, "source": "api", "updated": "2026-01-10T00:00:00Z"}
            },
            "predictions": {
                "recession_2026": {"value": 35.0, "source": "manual", "updated": null}
            },
            "calendar": [],
            "dalio": null,
            "manualOverrides": {},
            "lastUpdated": null
        })
    }

    fn state_with(dir: &tempfile::TempDir, quotes: &[(&'static str, f64)]) -> AppState {
        let path = dir.path().join("data.json");
        std::fs::write(&path, serde_json::to_vec(&seed()).unwrap()).unwrap();
        AppState {
            refresher: Refresher::new(
                JsonStore::new(path),
                Arc::new(FakeSpot(quotes.iter().copied().collect())),
                Arc::new(NoSeries),
            ),
        }
    }

    fn update(
        path: Option<&str>,
        value: Option<Value>,
    ) -> Result<Json<UpdateRequest>, JsonRejection> {
        Ok(Json(UpdateRequest {
            path: path.map(str::to_string),
            value,
        }))
    }

    #[tokio::test]
    async fn override_is_layered_over_stored_record() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(&dir, &[]);

        let view = get_data(State(state.clone())).await.unwrap().0;
        assert_eq!(view.current["fed_rate"], Scalar::Number(5.25));

        let res = post_update(
            State(state.clone()),
            update(Some("current.fed_rate"), Some(json!(5.5))),
        )
        .await
        .unwrap()
        .0;
        assert!(res.success);
        assert_eq!(res.path, "current.fed_rate");
        assert_eq!(res.value, Scalar::Number(5.5));

        let view = get_data(State(state.clone())).await.unwrap().0;
        assert_eq!(view.current["fed_rate"], Scalar::Number(5.5));

        let raw = get_raw(State(state)).await.unwrap().0;
        assert_eq!(raw.current["fed_rate"].value, 5.25);
        assert_eq!(raw.current["fed_rate"].source, Source::Manual);
        assert!(raw.last_updated.is_some());
    }

    #[tokio::test]
    async fn update_rejects_missing_or_unsupported_fields() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(&dir, &[]);

        for req in [
            update(None, Some(json!(1.0))),
            update(Some("current.vix"), None),
            update(Some("   "), Some(json!(1.0))),
            update(Some("current.vix"), Some(json!(true))),
            update(Some("current.vix"), Some(json!({"nested": 1}))),
        ] {
            let err = post_update(State(state.clone()), req).await.unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(ref m) if m == MISSING_FIELDS));
        }

        let raw = get_raw(State(state)).await.unwrap().0;
        assert!(raw.manual_overrides.is_empty());
    }

    #[tokio::test]
    async fn text_override_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(&dir, &[]);

        post_update(
            State(state.clone()),
            update(Some("predictions.recession_2026"), Some(json!("TBD"))),
        )
        .await
        .unwrap();

        let view = get_data(State(state)).await.unwrap().0;
        assert_eq!(
            view.predictions["recession_2026"],
            Scalar::Text("TBD".to_string())
        );
    }

    #[tokio::test]
    async fn override_path_is_stored_exactly_as_sent() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(&dir, &[]);

        let res = post_update(
            State(state.clone()),
            update(Some(" current.fed_rate"), Some(json!(6.0))),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(res.path, " current.fed_rate");

        let raw = get_raw(State(state.clone())).await.unwrap().0;
        assert_eq!(
            raw.manual_overrides.get(" current.fed_rate"),
            Some(&Scalar::Number(6.0))
        );
        assert!(!raw.manual_overrides.contains_key("current.fed_rate"));

        let view = get_data(State(state)).await.unwrap().0;
        assert_eq!(view.current["fed_rate"], Scalar::Number(5.25));
    }

    #[tokio::test]
    async fn refresh_updates_api_metric_and_view_reflects_it() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(&dir, &[("^VIX", 22.0)]);

        let res = post_refresh(State(state.clone())).await.unwrap().0;
        assert!(res.success);
        assert_eq!(res.message, "Data refreshed");
        assert_eq!(res.updated, vec!["vix".to_string()]);

        let raw = get_raw(State(state.clone())).await.unwrap().0;
        assert_eq!(raw.current["vix"].value, 22.0);
        assert_eq!(raw.current["vix"].source, Source::Api);

        let view = get_data(State(state)).await.unwrap().0;
        assert_eq!(view.current["vix"], Scalar::Number(22.0));
    }

    #[tokio::test]
    async fn unreadable_store_is_500_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(&dir, &[]);
        std::fs::write(state.store().path(), b"not json").unwrap();

        assert!(matches!(
            get_data(State(state.clone())).await.unwrap_err(),
            ApiError::Internal(ref m) if m == LOAD_FAILED
        ));
        assert!(matches!(
            get_raw(State(state.clone())).await.unwrap_err(),
            ApiError::Internal(ref m) if m == LOAD_FAILED
        ));
        assert!(matches!(
            post_update(State(state.clone()), update(Some("current.vix"), Some(json!(1.0))))
                .await
                .unwrap_err(),
            ApiError::Internal(ref m) if m == LOAD_FAILED
        ));
        assert!(matches!(
            post_refresh(State(state)).await.unwrap_err(),
            ApiError::Internal(ref m) if m == REFRESH_FAILED
        ));
    }

    #[tokio::test]
    async fn healthz_does_not_touch_store() {
        assert_eq!(healthz().await, "ok");
    }
}
