//! Calendar, balance summary and department handlers

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use core_kernel::EmployeeId;
use domain_leave::Actor;

use crate::dto::leave::{events_response, LeaveEventResponse};
use crate::dto::views::*;
use crate::{error::ApiError, AppState};

pub async fn calendar(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<CalendarParams>,
) -> Result<Json<Vec<LeaveEventResponse>>, ApiError> {
    let events = state.service.calendar(&actor, params.into_query()?).await?;
    Ok(Json(events_response(&events)))
}

pub async fn balance_summary(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<BalanceSummaryResponse>, ApiError> {
    let summary = state
        .service
        .balance_summary(&actor, EmployeeId::from_uuid(id), params.as_of)
        .await?;
    Ok(Json((&summary).into()))
}

pub async fn reconcile_balances(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<BalanceSummaryResponse>, ApiError> {
    let summary = state
        .service
        .reconcile_balances(&actor, EmployeeId::from_uuid(id))
        .await?;
    Ok(Json((&summary).into()))
}

pub async fn departments(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Json<DepartmentsResponse> {
    let registry = state.service.departments();
    Json(DepartmentsResponse {
        departments: registry.list().to_vec(),
        default_view: registry.resolve_view_department(&actor, None),
    })
}
