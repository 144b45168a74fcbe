//! Month confirmation handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use domain_leave::Actor;

use crate::dto::leave::events_response;
use crate::dto::months::*;
use crate::{error::ApiError, AppState};

pub async fn month_status(
    State(state): State<AppState>,
    Path(path): Path<MonthPath>,
) -> Result<Json<MonthLockResponse>, ApiError> {
    let status = state.service.month_lock_status(path.key()?).await?;
    Ok(Json((&status).into()))
}

pub async fn confirm_month(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(path): Path<MonthPath>,
) -> Result<Json<MonthLockResponse>, ApiError> {
    let record = state.service.confirm_month(&actor, path.key()?).await?;
    Ok(Json((&record).into()))
}

pub async fn unlock_month(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(path): Path<MonthPath>,
) -> Result<Json<MonthLockResponse>, ApiError> {
    let record = state.service.unlock_month(&actor, path.key()?).await?;
    Ok(Json((&record).into()))
}

/// Approved events and lock metadata for printing a month's schedule
pub async fn export_month(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(path): Path<MonthPath>,
) -> Result<Json<MonthExportResponse>, ApiError> {
    let key = path.key()?;
    let management = state.service.departments().management();
    if !(actor.can_manage(&key.department) || actor.department == management) {
        return Err(ApiError::Forbidden(format!(
            "exporting {} requires an administrator of that department",
            key
        )));
    }

    let lock = state.service.month_lock_record(&key).await?;
    let events = state
        .service
        .approved_events_for_month(&key.department, key.month)
        .await?;
    Ok(Json(MonthExportResponse {
        lock: lock.as_ref().map(MonthLockResponse::from),
        events: events_response(&events),
    }))
}
