use crate::analytics::aggregator::compute_stats;
use crate::analytics::types::{StatsReport, TrackRequest, TrackResponse, VisitorCountResponse};
use crate::analytics::AnalyticsState;
use crate::error::{AppResult, LoggedJson};
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

/// POST /api/analytics - Record a pageview, section view or click.
pub async fn track_event(
    State(state): State<Arc<AnalyticsState>>,
    LoggedJson(req): LoggedJson<TrackRequest>,
) -> AppResult<Json<TrackResponse>> {
    let (event, session_id) = req.into_event()?;
    let session_id = state
        .store
        .record(event, session_id, chrono::Utc::now())
        .await?;

    Ok(Json(TrackResponse {
        success: true,
        session_id,
    }))
}

/// GET /api/analytics - Full statistics report (admin only, enforced by middleware).
pub async fn stats(State(state): State<Arc<AnalyticsState>>) -> AppResult<Json<StatsReport>> {
    let doc = state.store.snapshot().await?;
    let report = compute_stats(
        &doc,
        chrono::Utc::now(),
        &chrono::Local,
        state.config.recent_limit,
    );
    Ok(Json(report))
}

/// GET /api/analytics/visitors - Public visitor counter. Always 200.
pub async fn visitor_count(State(state): State<Arc<AnalyticsState>>) -> Json<VisitorCountResponse> {
    Json(VisitorCountResponse {
        total_visitors: state.store.visitor_count().await,
    })
}
