//! Calendar, queue and summary DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{EmployeeId, YearMonth};
use domain_leave::{BalanceSummary, CalendarQuery};

use crate::dto::leave::{days, BalancesResponse};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CalendarParams {
    pub department: Option<String>,
    pub year: i32,
    pub month: u32,
    #[serde(default)]
    pub mine_only: bool,
}

impl CalendarParams {
    pub fn into_query(self) -> Result<CalendarQuery, ApiError> {
        Ok(CalendarQuery {
            department: self.department,
            month: YearMonth::new(self.year, self.month).map_err(|e| ApiError::BadRequest(e.to_string()))?,
            mine_only: self.mine_only,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct DepartmentParam {
    pub department: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct BalanceSummaryResponse {
    pub employee_id: EmployeeId,
    pub name: String,
    pub department: String,
    pub as_of: NaiveDate,
    pub accrued: Decimal,
    pub pre_system_usage: Decimal,
    pub approved_usage: Decimal,
    pub lifetime_grants: Decimal,
    pub total_used: Decimal,
    pub remaining: BalancesResponse,
    pub cached: BalancesResponse,
    pub cache_matches: bool,
}

impl From<&BalanceSummary> for BalanceSummaryResponse {
    fn from(s: &BalanceSummary) -> Self {
        Self {
            employee_id: s.employee_id,
            name: s.name.clone(),
            department: s.department.clone(),
            as_of: s.as_of,
            accrued: days(s.accrued),
            pre_system_usage: days(s.pre_system_usage),
            approved_usage: days(s.approved_usage),
            lifetime_grants: days(s.lifetime_grants),
            total_used: days(s.total_used()),
            remaining: (&s.remaining).into(),
            cached: (&s.cached).into(),
            cache_matches: s.cache_matches(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DepartmentsResponse {
    pub departments: Vec<String>,
    /// The department whose calendar the caller lands on
    pub default_view: String,
}
