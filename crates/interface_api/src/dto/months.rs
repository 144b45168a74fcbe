//! Month confirmation DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{EmployeeId, YearMonth};
use domain_leave::{MonthKey, MonthLockRecord, MonthLockStatus};

use crate::dto::leave::LeaveEventResponse;
use crate::error::ApiError;

/// `/months/:department/:year/:month`
#[derive(Debug, Deserialize)]
pub struct MonthPath {
    pub department: String,
    pub year: i32,
    pub month: u32,
}

impl MonthPath {
    pub fn key(&self) -> Result<MonthKey, ApiError> {
        let month = YearMonth::new(self.year, self.month).map_err(|e| ApiError::BadRequest(e.to_string()))?;
        Ok(MonthKey::new(self.department.clone(), month))
    }
}

#[derive(Debug, Serialize)]
pub struct MonthLockResponse {
    pub department: String,
    pub year: i32,
    pub month: u32,
    pub locked: bool,
    pub locked_by: Option<EmployeeId>,
    pub locked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_confirm: Option<bool>,
}

impl From<&MonthLockStatus> for MonthLockResponse {
    fn from(status: &MonthLockStatus) -> Self {
        Self {
            department: status.key.department.clone(),
            year: status.key.month.year,
            month: status.key.month.month,
            locked: status.locked,
            locked_by: status.locked_by,
            locked_at: status.locked_at,
            can_confirm: Some(status.can_confirm),
        }
    }
}

impl From<&MonthLockRecord> for MonthLockResponse {
    fn from(record: &MonthLockRecord) -> Self {
        Self {
            department: record.key.department.clone(),
            year: record.key.month.year,
            month: record.key.month.month,
            locked: record.locked,
            locked_by: record.locked_by,
            locked_at: record.locked_at,
            can_confirm: None,
        }
    }
}

/// Approved events and lock metadata for a confirmed schedule export
#[derive(Debug, Serialize)]
pub struct MonthExportResponse {
    pub lock: Option<MonthLockResponse>,
    pub events: Vec<LeaveEventResponse>,
}
