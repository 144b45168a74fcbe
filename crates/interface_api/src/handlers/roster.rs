//! Roster and flex handlers

use axum::{extract::State, http::StatusCode, Extension, Json};
use validator::Validate;

use domain_leave::Actor;

use crate::dto::leave::*;
use crate::{error::ApiError, AppState};

pub async fn assign_roster(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<RosterRequest>,
) -> Result<(StatusCode, Json<RosterResponse>), ApiError> {
    request.validate()?;
    let outcome = state.service.assign_roster(&actor, request.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(RosterResponse {
            created: events_response(&outcome.created),
            skipped: outcome.skipped,
        }),
    ))
}

pub async fn adjust_flex(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<FlexRequest>,
) -> Result<(StatusCode, Json<LeaveEventResponse>), ApiError> {
    let command = request.into_command(actor.employee_id);
    let event = state.service.adjust_flex(&actor, command).await?;
    Ok((StatusCode::CREATED, Json((&event).into())))
}
