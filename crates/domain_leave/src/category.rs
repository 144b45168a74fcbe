//! Leave categories and their payloads

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::days::fractions;
use core_kernel::LeaveDays;

/// Maximum length of a schedule note memo
pub const MEMO_MAX_LEN: usize = 255;

/// Category of a leave event
///
/// The category is fixed when an event is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveCategory {
    /// Regular full-day leave
    FullDay,
    /// Morning half-day
    HalfDayMorning,
    /// Afternoon half-day
    HalfDayAfternoon,
    /// Quarter-day leave
    QuarterDay,
    /// Saturday shift taken as leave
    SaturdayFullDay,
    /// Sick leave
    Sick,
    /// Reservist / military training duty
    ReservistDuty,
    /// Signed hour adjustment on flexible hours
    FlexibleShift,
    /// Duty roster entry
    RosterAssignment,
    /// Informational schedule entry
    ScheduleNote,
}

impl LeaveCategory {
    pub const ALL: [LeaveCategory; 10] = [
        LeaveCategory::FullDay,
        LeaveCategory::HalfDayMorning,
        LeaveCategory::HalfDayAfternoon,
        LeaveCategory::QuarterDay,
        LeaveCategory::SaturdayFullDay,
        LeaveCategory::Sick,
        LeaveCategory::ReservistDuty,
        LeaveCategory::FlexibleShift,
        LeaveCategory::RosterAssignment,
        LeaveCategory::ScheduleNote,
    ];

    /// Days consumed per calendar day of an approved event.
    ///
    /// This is the only weight table in the system.
    pub fn consumption_weight(&self) -> LeaveDays {
        match self {
            LeaveCategory::FullDay => fractions::full(),
            LeaveCategory::HalfDayMorning | LeaveCategory::HalfDayAfternoon => fractions::half(),
            LeaveCategory::QuarterDay => fractions::quarter(),
            LeaveCategory::SaturdayFullDay => fractions::three_quarters(),
            LeaveCategory::Sick
            | LeaveCategory::ReservistDuty
            | LeaveCategory::FlexibleShift
            | LeaveCategory::RosterAssignment
            | LeaveCategory::ScheduleNote => LeaveDays::ZERO,
        }
    }

    /// Whether approved events of this category draw on balances
    pub fn consumes_balance(&self) -> bool {
        self.consumption_weight().is_positive()
    }

    /// Fractional categories are only meaningful on a single date
    pub fn is_single_day_only(&self) -> bool {
        matches!(
            self,
            LeaveCategory::HalfDayMorning
                | LeaveCategory::HalfDayAfternoon
                | LeaveCategory::QuarterDay
                | LeaveCategory::SaturdayFullDay
                | LeaveCategory::FlexibleShift
                | LeaveCategory::RosterAssignment
        )
    }

    /// Flexible-shift entries neither raise nor suffer overlap conflicts
    pub fn is_overlap_exempt(&self) -> bool {
        matches!(self, LeaveCategory::FlexibleShift)
    }

    /// Categories created through their own operations rather than a leave request
    pub fn has_dedicated_operation(&self) -> bool {
        matches!(self, LeaveCategory::FlexibleShift | LeaveCategory::RosterAssignment)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveCategory::FullDay => "full_day",
            LeaveCategory::HalfDayMorning => "half_day_morning",
            LeaveCategory::HalfDayAfternoon => "half_day_afternoon",
            LeaveCategory::QuarterDay => "quarter_day",
            LeaveCategory::SaturdayFullDay => "saturday_full_day",
            LeaveCategory::Sick => "sick",
            LeaveCategory::ReservistDuty => "reservist_duty",
            LeaveCategory::FlexibleShift => "flexible_shift",
            LeaveCategory::RosterAssignment => "roster_assignment",
            LeaveCategory::ScheduleNote => "schedule_note",
        }
    }
}

impl fmt::Display for LeaveCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaveCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeaveCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown leave category '{}'", s))
    }
}

/// Category-specific data carried by an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CategoryPayload {
    #[default]
    Plain,
    Flex {
        hours: Decimal,
    },
    ScheduleNote {
        memo: String,
        start_time: Option<NaiveTime>,
        end_time: Option<NaiveTime>,
    },
}

impl CategoryPayload {
    /// Checks the payload shape against the category and its own constraints
    pub fn validate_for(&self, category: LeaveCategory) -> Result<(), String> {
        match (category, self) {
            (LeaveCategory::FlexibleShift, CategoryPayload::Flex { hours }) => {
                if hours.is_zero() {
                    return Err("flex adjustment must be a non-zero number of hours".to_string());
                }
                if hours.abs() > Decimal::from(24) {
                    return Err(format!("flex adjustment of {} hours exceeds a day", hours));
                }
                Ok(())
            }
            (
                LeaveCategory::ScheduleNote,
                CategoryPayload::ScheduleNote { memo, start_time, end_time },
            ) => {
                let memo = memo.trim();
                if memo.is_empty() {
                    return Err("schedule note requires a memo".to_string());
                }
                if memo.chars().count() > MEMO_MAX_LEN {
                    return Err(format!("memo exceeds {} characters", MEMO_MAX_LEN));
                }
                if let (Some(start), Some(end)) = (start_time, end_time) {
                    if start >= end {
                        return Err(format!("start time {} must be before end time {}", start, end));
                    }
                }
                Ok(())
            }
            (LeaveCategory::FlexibleShift, _) => {
                Err("flexible-shift entries carry an hour adjustment".to_string())
            }
            (LeaveCategory::ScheduleNote, _) => {
                Err("schedule notes carry a memo".to_string())
            }
            (_, CategoryPayload::Plain) => Ok(()),
            (other, _) => Err(format!("category '{}' takes no payload", other)),
        }
    }

    /// Hour delta of a flex adjustment
    pub fn flex_hours(&self) -> Option<Decimal> {
        match self {
            CategoryPayload::Flex { hours } => Some(*hours),
            _ => None,
        }
    }
}

/// Parses a `HH:MM` time as entered on schedule notes
pub fn parse_clock_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| format!("'{}' is not a HH:MM time", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_weight_table() {
        assert_eq!(LeaveCategory::FullDay.consumption_weight(), LeaveDays::whole(1));
        assert_eq!(LeaveCategory::HalfDayMorning.consumption_weight(), LeaveDays::new(dec!(0.5)));
        assert_eq!(LeaveCategory::HalfDayAfternoon.consumption_weight(), LeaveDays::new(dec!(0.5)));
        assert_eq!(LeaveCategory::QuarterDay.consumption_weight(), LeaveDays::new(dec!(0.25)));
        assert_eq!(LeaveCategory::SaturdayFullDay.consumption_weight(), LeaveDays::new(dec!(0.75)));
        for c in [
            LeaveCategory::Sick,
            LeaveCategory::ReservistDuty,
            LeaveCategory::FlexibleShift,
            LeaveCategory::RosterAssignment,
            LeaveCategory::ScheduleNote,
        ] {
            assert!(!c.consumes_balance(), "{} should be free", c);
        }
    }

    #[test]
    fn test_category_string_round_trip() {
        for c in LeaveCategory::ALL {
            assert_eq!(c.as_str().parse::<LeaveCategory>().unwrap(), c);
        }
        assert!("vacation".parse::<LeaveCategory>().is_err());
    }

    #[test]
    fn test_flex_payload_rules() {
        let zero = CategoryPayload::Flex { hours: dec!(0) };
        assert!(zero.validate_for(LeaveCategory::FlexibleShift).is_err());
        let minus = CategoryPayload::Flex { hours: dec!(-1.5) };
        assert!(minus.validate_for(LeaveCategory::FlexibleShift).is_ok());
        assert!(CategoryPayload::Plain.validate_for(LeaveCategory::FlexibleShift).is_err());
        assert!(minus.validate_for(LeaveCategory::FullDay).is_err());
    }

    #[test]
    fn test_schedule_note_rules() {
        let note = |memo: &str, s: Option<&str>, e: Option<&str>| CategoryPayload::ScheduleNote {
            memo: memo.to_string(),
            start_time: s.map(|v| parse_clock_time(v).unwrap()),
            end_time: e.map(|v| parse_clock_time(v).unwrap()),
        };
        assert!(note("conference", Some("09:00"), Some("12:00"))
            .validate_for(LeaveCategory::ScheduleNote)
            .is_ok());
        assert!(note("  ", None, None).validate_for(LeaveCategory::ScheduleNote).is_err());
        assert!(note("x", Some("13:00"), Some("12:00"))
            .validate_for(LeaveCategory::ScheduleNote)
            .is_err());
        assert!(note(&"m".repeat(256), None, None)
            .validate_for(LeaveCategory::ScheduleNote)
            .is_err());
        assert!(parse_clock_time("9am").is_err());
    }

    #[test]
    fn test_payload_serde_is_tagged() {
        let json = serde_json::to_value(CategoryPayload::Flex { hours: dec!(2) }).unwrap();
        assert_eq!(json["kind"], "flex");
    }
}
