// handlers/user.rs - DELETE /api/user?id=
//
// Users own their reset tokens, so deletion goes through the account store,
// which removes the tokens first.

use axum::extract::{Query, State};

use super::resource::{parse_id, Deleted, IdQuery};
use super::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

pub async fn delete_user(State(state): State<AppState>, Query(query): Query<IdQuery>) -> ApiResult<Deleted> {
    let id = parse_id(query.id.as_deref())?;
    if !state.accounts.delete_user(id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    Ok(ApiResponse::success(Deleted { id, deleted: true }))
}
