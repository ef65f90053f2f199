// handlers/media.rs - DELETE /api/media/asset?publicId=
//
// Removes the asset from external storage. The media registry row is managed
// separately through /api/media.

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::database::models::ValidationError;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::AssetError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetQuery {
    pub public_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDeleted {
    pub public_id: String,
    pub deleted: bool,
}

pub async fn delete_asset(State(state): State<AppState>, Query(query): Query<AssetQuery>) -> ApiResult<AssetDeleted> {
    let public_id = query
        .public_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ValidationError::required("publicId"))?;

    let store = state.assets.as_ref().ok_or(AssetError::NotConfigured)?;
    if !store.destroy(&public_id).await? {
        return Err(ApiError::not_found("Asset not found"));
    }

    Ok(ApiResponse::success(AssetDeleted {
        public_id,
        deleted: true,
    }))
}
