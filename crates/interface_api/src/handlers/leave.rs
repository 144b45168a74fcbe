//! Leave request handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::LeaveEventId;
use domain_leave::Actor;

use crate::dto::leave::*;
use crate::dto::views::DepartmentParam;
use crate::{error::ApiError, AppState};

/// Books leave for the caller or an employee they manage
pub async fn submit_leave(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<SubmitLeaveRequest>,
) -> Result<(StatusCode, Json<LeaveOutcomeResponse>), ApiError> {
    request.validate()?;
    let outcome = state.service.submit(&actor, request.into_command()?).await?;
    Ok((
        StatusCode::CREATED,
        Json(LeaveOutcomeResponse {
            event: (&outcome.event).into(),
            balances: Some((&outcome.balances).into()),
        }),
    ))
}

/// Approves a pending request
pub async fn approve_leave(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<LeaveOutcomeResponse>, ApiError> {
    let outcome = state.service.approve(&actor, LeaveEventId::from_uuid(id)).await?;
    Ok(Json(LeaveOutcomeResponse {
        event: (&outcome.event).into(),
        balances: outcome.balances.as_ref().map(BalancesResponse::from),
    }))
}

/// Rejects a pending request
pub async fn reject_leave(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancelResponse>, ApiError> {
    let outcome = state.service.reject(&actor, LeaveEventId::from_uuid(id)).await?;
    Ok(Json((&outcome).into()))
}

/// Deletes an entry, refunding what it charged
pub async fn cancel_leave(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancelResponse>, ApiError> {
    let outcome = state.service.cancel(&actor, LeaveEventId::from_uuid(id)).await?;
    Ok(Json((&outcome).into()))
}

/// Pending requests awaiting an admin's decision
pub async fn pending_queue(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<DepartmentParam>,
) -> Result<Json<Vec<LeaveEventResponse>>, ApiError> {
    let events = state
        .service
        .pending_queue(&actor, params.department.as_deref())
        .await?;
    Ok(Json(events_response(&events)))
}
