//! Leave request DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{EmployeeId, LeaveDays, LeaveEventId};
use domain_leave::category::parse_clock_time;
use domain_leave::{
    AssignRoster, Balances, CancelOutcome, CategoryPayload, FlexAdjustment, LeaveCategory,
    LeaveEvent, SubmitLeave,
};

use crate::error::ApiError;

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitLeaveRequest {
    /// Defaults to the caller
    pub employee_id: Option<Uuid>,
    pub category: LeaveCategory,
    pub start: NaiveDate,
    /// Defaults to `start`
    pub end: Option<NaiveDate>,
    #[validate(length(min = 1, max = 255))]
    pub memo: Option<String>,
    /// `HH:MM`, schedule notes only
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl SubmitLeaveRequest {
    pub fn into_command(self) -> Result<SubmitLeave, ApiError> {
        let payload = match self.category {
            LeaveCategory::ScheduleNote => CategoryPayload::ScheduleNote {
                memo: self.memo.unwrap_or_default(),
                start_time: parse_time(self.start_time.as_deref())?,
                end_time: parse_time(self.end_time.as_deref())?,
            },
            _ => CategoryPayload::Plain,
        };
        Ok(SubmitLeave {
            employee_id: self.employee_id.map(EmployeeId::from_uuid),
            category: self.category,
            start: self.start,
            end: self.end.unwrap_or(self.start),
            payload,
        })
    }
}

fn parse_time(value: Option<&str>) -> Result<Option<chrono::NaiveTime>, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(parse_clock_time)
        .transpose()
        .map_err(ApiError::Validation)
}

#[derive(Debug, Deserialize, Validate)]
pub struct RosterRequest {
    #[validate(length(min = 1))]
    pub employee_ids: Vec<Uuid>,
    pub date: NaiveDate,
}

impl From<RosterRequest> for AssignRoster {
    fn from(request: RosterRequest) -> Self {
        AssignRoster {
            employee_ids: request.employee_ids.into_iter().map(EmployeeId::from_uuid).collect(),
            date: request.date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FlexRequest {
    /// Defaults to the caller
    pub employee_id: Option<Uuid>,
    pub date: NaiveDate,
    /// Signed hour delta
    pub hours: Decimal,
}

impl FlexRequest {
    pub fn into_command(self, caller: EmployeeId) -> FlexAdjustment {
        FlexAdjustment {
            employee_id: self.employee_id.map(EmployeeId::from_uuid).unwrap_or(caller),
            date: self.date,
            hours: self.hours,
        }
    }
}

/// Day quantity as sent on the wire, trailing zeros dropped
pub fn days(value: LeaveDays) -> Decimal {
    value.value().normalize()
}

#[derive(Debug, Clone, Serialize)]
pub struct BalancesResponse {
    pub supplemental: Decimal,
    pub entitled: Decimal,
    pub total: Decimal,
}

impl From<&Balances> for BalancesResponse {
    fn from(b: &Balances) -> Self {
        Self {
            supplemental: days(b.supplemental),
            entitled: days(b.entitled),
            total: days(b.total()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LeaveEventResponse {
    pub id: LeaveEventId,
    /// Absent for rows still keyed by name
    pub employee_id: Option<EmployeeId>,
    pub owner_name: String,
    pub department: String,
    pub category: LeaveCategory,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub state: String,
    pub charged_days: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flex_hours: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    pub submitted_by: EmployeeId,
    pub created_at: DateTime<Utc>,
}

impl From<&LeaveEvent> for LeaveEventResponse {
    fn from(event: &LeaveEvent) -> Self {
        let memo = match &event.payload {
            CategoryPayload::ScheduleNote { memo, .. } => Some(memo.clone()),
            _ => None,
        };
        Self {
            id: event.id,
            employee_id: event.owner.employee_id(),
            owner_name: event.owner_name.clone(),
            department: event.department.clone(),
            category: event.category,
            start: event.range.start,
            end: event.range.end,
            state: event.state().to_string(),
            charged_days: days(event.charged()),
            flex_hours: event.payload.flex_hours(),
            memo,
            submitted_by: event.submitted_by,
            created_at: event.created_at,
        }
    }
}

pub fn events_response(events: &[LeaveEvent]) -> Vec<LeaveEventResponse> {
    events.iter().map(LeaveEventResponse::from).collect()
}

#[derive(Debug, Serialize)]
pub struct LeaveOutcomeResponse {
    pub event: LeaveEventResponse,
    /// Owner's balances after the operation, when they were touched
    pub balances: Option<BalancesResponse>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub event_id: LeaveEventId,
    pub was_approved: bool,
    pub refunded_days: Decimal,
    pub balances: Option<BalancesResponse>,
}

impl From<&CancelOutcome> for CancelResponse {
    fn from(outcome: &CancelOutcome) -> Self {
        Self {
            event_id: outcome.event_id,
            was_approved: outcome.was_approved,
            refunded_days: outcome
                .refunded
                .map(|d| days(d.total()))
                .unwrap_or_default(),
            balances: outcome.balances.as_ref().map(BalancesResponse::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RosterResponse {
    pub created: Vec<LeaveEventResponse>,
    pub skipped: Vec<EmployeeId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(memo: Option<&str>, start: Option<&str>) -> SubmitLeaveRequest {
        SubmitLeaveRequest {
            employee_id: None,
            category: LeaveCategory::ScheduleNote,
            start: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            end: None,
            memo: memo.map(str::to_string),
            start_time: start.map(str::to_string),
            end_time: None,
        }
    }

    #[test]
    fn test_schedule_note_payload_is_built() {
        let command = note(Some("ward round"), Some("09:30")).into_command().unwrap();
        assert_eq!(command.end, command.start);
        match command.payload {
            CategoryPayload::ScheduleNote { memo, start_time, end_time } => {
                assert_eq!(memo, "ward round");
                assert!(start_time.is_some());
                assert!(end_time.is_none());
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_bad_clock_time_is_rejected() {
        assert!(matches!(
            note(Some("x"), Some("9 o'clock")).into_command(),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_overlong_memo_fails_validation() {
        let long = "m".repeat(256);
        assert!(note(Some(&long), None).validate().is_err());
    }
}
