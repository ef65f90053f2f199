// handlers/resource.rs - generic JSON CRUD handlers
//
// GET    /api/<resource>          list (declared filters from the query string)
// GET    /api/<resource>?id=      single
// POST   /api/<resource>          create (201)
// PATCH  /api/<resource>?id=      partial update
// DELETE /api/<resource>?id=      hard delete

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::database::models::{Resource, ValidationError};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, JsonBody};
use crate::services::ResourceService;

#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: Uuid,
    pub deleted: bool,
}

pub(crate) fn parse_id(raw: Option<&str>) -> Result<Uuid, ApiError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| ValidationError::required("id"))?;
    Uuid::parse_str(raw).map_err(|_| ValidationError::invalid("id", "id must be a UUID").into())
}

pub async fn get_resource<R: Resource>(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let service = ResourceService::<R>::new(state.pool.clone());

    if params.contains_key("id") {
        let id = parse_id(params.get("id").map(String::as_str))?;
        let record = service.find(id).await?;
        return Ok(ApiResponse::success(record).into_response());
    }

    let records = service.list(&params).await?;
    Ok(ApiResponse::success(records).into_response())
}

pub async fn create_resource<R: Resource>(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(input): JsonBody<R::Create>,
) -> ApiResult<R> {
    let service = ResourceService::<R>::new(state.pool.clone());
    let created = service.create(input, state.session_user(&headers)).await?;
    Ok(ApiResponse::created(created))
}

pub async fn update_resource<R: Resource>(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    JsonBody(input): JsonBody<R::Update>,
) -> ApiResult<R> {
    let id = parse_id(query.id.as_deref())?;
    let service = ResourceService::<R>::new(state.pool.clone());
    Ok(ApiResponse::success(service.update(id, input).await?))
}

pub async fn delete_resource<R: Resource>(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Deleted> {
    let id = parse_id(query.id.as_deref())?;
    ResourceService::<R>::new(state.pool.clone()).delete(id).await?;
    Ok(ApiResponse::success(Deleted { id, deleted: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_required_and_must_be_a_uuid() {
        assert!(matches!(parse_id(None), Err(ApiError::ValidationError { .. })));
        assert!(matches!(parse_id(Some("  ")), Err(ApiError::ValidationError { .. })));
        assert!(matches!(parse_id(Some("42")), Err(ApiError::ValidationError { .. })));

        let id = Uuid::new_v4();
        assert_eq!(parse_id(Some(&id.to_string())).unwrap(), id);
    }
}
