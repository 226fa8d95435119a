use crate::aggregate::scope::QueryScope;
use crate::aggregate::types::AggregateBundle;
use crate::engine::{Engine, EngineError};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared state for the CDR report API.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RequiredRangeQuery {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub status: &'static str,
    pub message: String,
}

/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}

/// GET /api/cdr/summary?start&end
///
/// Full aggregated report: heatmap, agent summaries, hourly volume. Without
/// dates this resolves to the default scope the scheduler keeps warm.
pub async fn cdr_summary(
    State(state): State<AppState>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<Arc<AggregateBundle>>, ApiError> {
    let scope = resolve_scope(None, range.start.as_deref(), range.end.as_deref())?;
    Ok(Json(state.engine.query(&scope).await?))
}

/// GET /api/cdr/agent/:agent_id?start&end
pub async fn cdr_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<Arc<AggregateBundle>>, ApiError> {
    let scope = resolve_scope(Some(&agent_id), range.start.as_deref(), range.end.as_deref())?;
    Ok(Json(state.engine.query(&scope).await?))
}

/// GET /api/cdr/time_range?start&end (both required)
pub async fn cdr_time_range(
    State(state): State<AppState>,
    Query(range): Query<RequiredRangeQuery>,
) -> Result<Json<Arc<AggregateBundle>>, ApiError> {
    let scope = resolve_scope(None, Some(&range.start), Some(&range.end))?;
    Ok(Json(state.engine.query(&scope).await?))
}

/// POST /api/cdr/refresh
///
/// Forces recomputation of the default scope and returns once complete.
pub async fn cdr_refresh(
    State(state): State<AppState>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let bundle = state.engine.refresh().await?;
    Ok(Json(RefreshResponse {
        status: "ok",
        message: format!("aggregation refreshed, {} records", bundle.total_records),
    }))
}

/// Resolve request parameters into the normalized scope keying the cache.
fn resolve_scope(
    agent: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<QueryScope, ApiError> {
    let start_date = start.map(parse_date).transpose()?;
    let end_date = end.map(parse_date).transpose()?;

    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(ApiError::BadRequest(format!(
                "start date {start} is after end date {end}"
            )));
        }
    }

    Ok(QueryScope::new(agent, start_date, end_date))
}

fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    value
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid date '{value}', expected YYYY-MM-DD")))
}

// Error handling
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    SourceUnavailable(String),
    DeadlineExceeded(String),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::SourceUnavailable(_) => ApiError::SourceUnavailable(e.to_string()),
            EngineError::DeadlineExceeded { .. } => ApiError::DeadlineExceeded(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::SourceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::DeadlineExceeded(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::builder::build_bundle;
    use crate::session::reconstruct::reconstruct_sessions;
    use crate::event::parser::EventParser;
    use crate::source::timestamp::TimestampFormat;

    #[test]
    fn test_resolve_scope_normalizes_agent() {
        let scope = resolve_scope(Some("PJSIP/102"), Some("2025-12-01"), None).unwrap();
        assert_eq!(scope.agent, Some("102".to_string()));
        assert_eq!(scope.start_date, Some("2025-12-01".parse().unwrap()));
        assert_eq!(scope.end_date, None);
    }

    #[test]
    fn test_resolve_scope_rejects_bad_date() {
        assert!(matches!(
            resolve_scope(None, Some("12/01/2025"), None),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_resolve_scope_rejects_inverted_range() {
        assert!(matches!(
            resolve_scope(None, Some("2025-12-02"), Some("2025-12-01")),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (
                ApiError::BadRequest("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::SourceUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::DeadlineExceeded("x".into()),
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_bundle_wire_shape() {
        let parsed = EventParser::new(TimestampFormat::from_config("%Y-%m-%d %H:%M:%S")).parse_log(
            "2025-12-04 09:58:00|C1|sales|NONE|ENTERQUEUE\n\
             2025-12-04 10:00:00|C1|sales|PJSIP/101|CONNECT|120\n\
             2025-12-04 10:03:30|C1|sales|PJSIP/101|COMPLETEAGENT|120|210\n",
        );
        let records = parsed.stats.parsed_events;
        let sessions = reconstruct_sessions(parsed.events).sessions;
        let bundle = build_bundle(
            &sessions,
            &QueryScope::all(),
            records,
            chrono::DateTime::from_timestamp(1_750_000_000, 0).unwrap(),
        );

        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json["agents"], serde_json::json!(["101"]));
        assert_eq!(json["dates"], serde_json::json!(["2025-12-04"]));
        assert_eq!(json["heatmap"][0]["hours"]["10"], serde_json::json!(3.5));
        assert_eq!(json["heatmap"][0]["total_minutes"], serde_json::json!(3.5));
        assert_eq!(json["agent_summary"][0]["total_calls"], serde_json::json!(1));
        assert_eq!(
            json["agent_summary"][0]["total_duration_sec"],
            serde_json::json!(210)
        );
        assert_eq!(
            json["agent_summary"][0]["total_duration_min"],
            serde_json::json!(3.5)
        );
        assert_eq!(json["hourly_volume"][9]["calls"], serde_json::json!(1));
        assert_eq!(json["total_records"], serde_json::json!(3));
        assert!(json["generated_at"].as_str().unwrap().starts_with("2025"));
    }
}
