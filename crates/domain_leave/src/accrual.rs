//! Entitlement accrual from hire date
//!
//! Two layers make up the cumulative entitlement:
//!
//! 1. First-year monthly days: one per completed month of service, capped,
//!    only for hires on or after the policy cutoff.
//! 2. Tenure days: a grant on every service anniversary, sized by the
//!    service-year step table.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use core_kernel::temporal::{add_years, parse_iso_date};

/// One row of the tenure table: service years up to and including
/// `through_year` (zero-based) earn `days`. The last row is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenureStep {
    pub through_year: Option<u32>,
    pub days: u32,
}

/// Accrual parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccrualPolicy {
    /// Hires before this date earn no first-year monthly days
    pub first_year_cutoff: NaiveDate,
    pub first_year_monthly_cap: u32,
    pub tenure_steps: Vec<TenureStep>,
}

impl Default for AccrualPolicy {
    fn default() -> Self {
        let step = |through: Option<u32>, days| TenureStep { through_year: through, days };
        Self {
            first_year_cutoff: NaiveDate::from_ymd_opt(2017, 6, 1).unwrap_or(NaiveDate::MIN),
            first_year_monthly_cap: 11,
            tenure_steps: vec![
                step(Some(1), 15),
                step(Some(3), 16),
                step(Some(5), 17),
                step(Some(7), 18),
                step(Some(9), 19),
                step(Some(11), 20),
                step(None, 25),
            ],
        }
    }
}

/// A tenure grant earned on an anniversary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnniversaryGrant {
    pub service_year: u32,
    pub granted_on: NaiveDate,
    pub days: u32,
}

/// Itemized entitlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualBreakdown {
    pub first_year_days: u32,
    pub anniversaries: Vec<AnniversaryGrant>,
}

impl AccrualBreakdown {
    pub fn total(&self) -> u32 {
        self.first_year_days + self.anniversaries.iter().map(|a| a.days).sum::<u32>()
    }
}

/// Completed months between two dates
///
/// A month counts once the day of month in `end` reaches that of `start`.
pub fn completed_months(start: NaiveDate, end: NaiveDate) -> u32 {
    if end < start {
        return 0;
    }
    let mut months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    if end.day() < start.day() {
        months -= 1;
    }
    months.max(0) as u32
}

/// Computes cumulative entitlement
#[derive(Debug, Clone, Default)]
pub struct AccrualCalculator {
    policy: AccrualPolicy,
}

impl AccrualCalculator {
    pub fn new(policy: AccrualPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AccrualPolicy {
        &self.policy
    }

    /// Total days accrued from `hire_date` up to and including `as_of`
    pub fn entitlement(&self, hire_date: NaiveDate, as_of: NaiveDate) -> u32 {
        self.breakdown(hire_date, as_of).total()
    }

    /// Entitlement for a hire date as stored in the directory; unparseable
    /// dates accrue nothing
    pub fn entitlement_from_str(&self, hire_date: &str, as_of: NaiveDate) -> u32 {
        parse_iso_date(hire_date)
            .map(|hire| self.entitlement(hire, as_of))
            .unwrap_or(0)
    }

    /// Entitlement for an optional hire date
    pub fn entitlement_for(&self, hire_date: Option<NaiveDate>, as_of: NaiveDate) -> u32 {
        hire_date.map(|hire| self.entitlement(hire, as_of)).unwrap_or(0)
    }

    pub fn breakdown(&self, hire_date: NaiveDate, as_of: NaiveDate) -> AccrualBreakdown {
        let mut breakdown = AccrualBreakdown {
            first_year_days: 0,
            anniversaries: Vec::new(),
        };
        if as_of < hire_date {
            return breakdown;
        }

        let first_anniversary = add_years(hire_date, 1);
        breakdown.first_year_days = self.first_year_days(hire_date, as_of, first_anniversary);

        let mut service_year = 0u32;
        while let Some(granted_on) = add_years(hire_date, service_year + 1) {
            if granted_on > as_of {
                break;
            }
            breakdown.anniversaries.push(AnniversaryGrant {
                service_year,
                granted_on,
                days: self.tenure_days(service_year),
            });
            service_year += 1;
        }

        breakdown
    }

    fn first_year_days(
        &self,
        hire_date: NaiveDate,
        as_of: NaiveDate,
        first_anniversary: Option<NaiveDate>,
    ) -> u32 {
        if hire_date < self.policy.first_year_cutoff {
            return 0;
        }
        let cap = self.policy.first_year_monthly_cap;
        match first_anniversary {
            Some(anniversary) if as_of >= anniversary => cap,
            _ => completed_months(hire_date, as_of).min(cap),
        }
    }

    /// Days granted on the anniversary closing zero-based `service_year`
    pub fn tenure_days(&self, service_year: u32) -> u32 {
        self.policy
            .tenure_steps
            .iter()
            .find(|step| step.through_year.map_or(true, |through| service_year <= through))
            .or_else(|| self.policy.tenure_steps.last())
            .map(|step| step.days)
            .unwrap_or(0)
    }
}
