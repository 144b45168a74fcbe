//! Supplemental grant handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

use core_kernel::EmployeeId;
use domain_leave::Actor;

use crate::dto::grants::*;
use crate::{error::ApiError, AppState};

pub async fn grant_supplemental(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<GrantRequest>,
) -> Result<(StatusCode, Json<GrantResponse>), ApiError> {
    request.validate()?;
    let outcome = state.service.grant_supplemental(&actor, request.into()).await?;
    Ok((StatusCode::CREATED, Json((&outcome).into())))
}

/// Grant log, newest first
pub async fn grant_history(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<GrantHistoryQuery>,
) -> Result<Json<Vec<GrantEntryResponse>>, ApiError> {
    let entries = state
        .service
        .grant_history(&actor, query.employee_id.map(EmployeeId::from_uuid))
        .await?;
    Ok(Json(entries.iter().map(GrantEntryResponse::from).collect()))
}
