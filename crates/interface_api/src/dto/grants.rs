//! Supplemental grant DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{EmployeeId, GrantId, LeaveDays};
use domain_leave::{GrantLogEntry, GrantOutcome, GrantSupplemental};

use crate::dto::leave::{days, BalancesResponse};

#[derive(Debug, Deserialize, Validate)]
pub struct GrantRequest {
    #[validate(length(min = 1))]
    pub employee_ids: Vec<Uuid>,
    pub days: Decimal,
    #[validate(length(min = 1, max = 255))]
    pub reason: String,
    /// Defaults to today
    pub effective_date: Option<NaiveDate>,
}

impl From<GrantRequest> for GrantSupplemental {
    fn from(request: GrantRequest) -> Self {
        GrantSupplemental {
            employee_ids: request.employee_ids.into_iter().map(EmployeeId::from_uuid).collect(),
            days: LeaveDays::new(request.days),
            reason: request.reason,
            effective_date: request.effective_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GrantHistoryQuery {
    pub employee_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct GrantEntryResponse {
    pub id: GrantId,
    pub recipients: Vec<EmployeeId>,
    pub summary: String,
    pub days: Decimal,
    pub reason: String,
    pub granted_by: EmployeeId,
    pub effective_date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
}

impl From<&GrantLogEntry> for GrantEntryResponse {
    fn from(entry: &GrantLogEntry) -> Self {
        Self {
            id: entry.id,
            recipients: entry.recipients.clone(),
            summary: entry.summary.clone(),
            days: days(entry.days),
            reason: entry.reason.clone(),
            granted_by: entry.granted_by,
            effective_date: entry.effective_date,
            recorded_at: entry.recorded_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecipientBalance {
    pub employee_id: EmployeeId,
    pub balances: BalancesResponse,
}

#[derive(Debug, Serialize)]
pub struct GrantResponse {
    pub entry: GrantEntryResponse,
    pub balances: Vec<RecipientBalance>,
}

impl From<&GrantOutcome> for GrantResponse {
    fn from(outcome: &GrantOutcome) -> Self {
        Self {
            entry: GrantEntryResponse::from(&outcome.entry),
            balances: outcome
                .balances
                .iter()
                .map(|(id, b)| RecipientBalance {
                    employee_id: *id,
                    balances: b.into(),
                })
                .collect(),
        }
    }
}
