//! Operational visibility endpoints: analytics, cache composition, sync
//! runs, and filter-path consistency.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pickupdb_engine::{check_all_regions, AnalyticsMetrics, ConsistencySummary, EventType};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

const METRICS_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Serialize)]
pub(super) struct StatsData {
    pub analytics: AnalyticsMetrics,
    pub store: StoreStats,
}

#[derive(Debug, Serialize)]
pub(super) struct StoreStats {
    pub records: i64,
    pub by_source: Vec<SourceCount>,
    pub freshness: FreshnessData,
}

#[derive(Debug, Serialize)]
pub(super) struct SourceCount {
    pub source: String,
    pub records: i64,
}

/// Record counts bucketed by the filter's freshness policy.
#[derive(Debug, Serialize)]
pub(super) struct FreshnessData {
    pub fresh: i64,
    pub stale: i64,
    pub expired: i64,
}

/// `GET /api/v1/stats` reports analytics over the last 24 hours plus the
/// cache composition by source and freshness.
pub(super) async fn stats_overview(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<StatsData>>, ApiError> {
    let store = state.filter.store();

    let records = store
        .count()
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let by_source = store
        .source_counts()
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .into_iter()
        .map(|(source, records)| SourceCount { source, records })
        .collect();

    let policy = &state.filter.config().freshness;
    let counts = store
        .freshness_counts(
            u64::try_from(policy.ttl.num_seconds()).unwrap_or(0),
            u64::try_from(policy.stale_after.num_seconds()).unwrap_or(0),
        )
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let analytics = state
        .filter
        .analytics()
        .metrics(Duration::hours(METRICS_WINDOW_HOURS))
        .await;

    Ok(Json(ApiResponse {
        data: StatsData {
            analytics,
            store: StoreStats {
                records,
                by_source,
                freshness: FreshnessData {
                    fresh: counts.fresh,
                    stale: counts.stale,
                    expired: counts.expired,
                },
            },
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct RunsQuery {
    limit: Option<i64>,
}

/// One sync run as exposed over the API; `public_id` is the external
/// identity.
#[derive(Debug, Serialize)]
pub(super) struct RunItem {
    pub public_id: Uuid,
    pub trigger_source: String,
    pub status: String,
    pub forced: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub products_processed: i32,
    pub products_failed: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// `GET /api/v1/runs?limit=` lists recent sync runs, newest first.
pub(super) async fn list_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<ApiResponse<Vec<RunItem>>>, ApiError> {
    let limit = normalize_limit(query.limit);
    let rows = pickupdb_db::list_sync_runs(&state.pool, limit)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| RunItem {
            public_id: row.public_id,
            trigger_source: row.trigger_source,
            status: row.status,
            forced: row.forced,
            started_at: row.started_at,
            completed_at: row.completed_at,
            products_processed: row.products_processed,
            products_failed: row.products_failed,
            error_message: row.error_message,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// `GET /api/v1/consistency` runs both filter paths over the loaded catalog
/// and reports agreement for every canonical region.
pub(super) async fn consistency_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<ConsistencySummary>> {
    let data = check_all_regions(&state.filter, &state.catalog).await;

    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    })
}

#[derive(Debug, Deserialize)]
pub(super) struct EventRequest {
    event_type: EventType,
    product_code: Option<String>,
    #[serde(default)]
    metadata: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub(super) struct EventAccepted {
    pub accepted: bool,
    pub session_id: Uuid,
}

/// `POST /api/v1/events` folds UI-originated analytics events (pickup
/// selections, surfaced errors) into the shared buffer.
pub(super) async fn ingest_event(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<EventRequest>,
) -> Json<ApiResponse<EventAccepted>> {
    state
        .filter
        .analytics()
        .track(body.event_type, body.product_code.as_deref(), body.metadata)
        .await;

    Json(ApiResponse {
        data: EventAccepted {
            accepted: true,
            session_id: state.filter.analytics().session_id(),
        },
        meta: ResponseMeta::new(req_id.0),
    })
}
