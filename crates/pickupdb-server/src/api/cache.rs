//! Cache maintenance endpoints.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_engine_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct RefreshRequest {
    product_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ClearQuery {
    product_code: Option<String>,
}

/// What a refresh or invalidation changed. `pickup_count` is set for a
/// single-product refetch, `invalidated` for removals.
#[derive(Debug, Serialize)]
pub(super) struct RefreshData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidated: Option<u64>,
}

/// `POST /api/v1/refresh` force-refetches one product, bypassing freshness.
/// Without a `product_code` it drops every cached record instead; resolution
/// repopulates lazily on the next request.
pub(super) async fn refresh(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<RefreshData>>, ApiError> {
    if let Some(code) = &body.product_code {
        if code.trim().is_empty() {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                "product_code must not be blank",
            ));
        }
    }

    let data = match body.product_code {
        Some(code) => {
            let pickup_count = state
                .filter
                .refresh(&code)
                .await
                .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;
            RefreshData {
                product_code: Some(code),
                pickup_count: Some(pickup_count),
                invalidated: None,
            }
        }
        None => {
            let invalidated = state
                .filter
                .clear_cache(None)
                .await
                .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;
            RefreshData {
                product_code: None,
                pickup_count: None,
                invalidated: Some(invalidated),
            }
        }
    };

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// `DELETE /api/v1/cache?product_code=` invalidates one record, or the whole
/// cache when the query parameter is absent.
pub(super) async fn clear_cache(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ClearQuery>,
) -> Result<Json<ApiResponse<RefreshData>>, ApiError> {
    let invalidated = state
        .filter
        .clear_cache(query.product_code.as_deref())
        .await
        .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: RefreshData {
            product_code: query.product_code,
            pickup_count: None,
            invalidated: Some(invalidated),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
