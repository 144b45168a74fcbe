//! Per-employee date-range conflict detection

use core_kernel::DateRange;
use crate::category::LeaveCategory;
use crate::employee::Employee;
use crate::error::LeaveError;
use crate::event::LeaveEvent;

/// Finds existing events that a new booking would collide with
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlapGuard;

impl OverlapGuard {
    pub fn new() -> Self {
        Self
    }

    /// First event owned by `employee` that intersects `range`
    ///
    /// Flexible-shift entries are ignored on both sides.
    pub fn find_conflict<'a>(
        &self,
        employee: &Employee,
        category: LeaveCategory,
        range: &DateRange,
        existing: &'a [LeaveEvent],
    ) -> Option<&'a LeaveEvent> {
        if category.is_overlap_exempt() {
            return None;
        }
        existing.iter().find(|event| {
            !event.category.is_overlap_exempt()
                && event.is_owned_by(employee)
                && event.range.intersects(range)
        })
    }

    /// Whether a non-flex booking of `employee` on `range` would conflict
    pub fn has_conflict(&self, employee: &Employee, range: &DateRange, existing: &[LeaveEvent]) -> bool {
        self.find_conflict(employee, LeaveCategory::FullDay, range, existing)
            .is_some()
    }

    /// Rejects a booking that conflicts, naming the conflicting category
    pub fn check(
        &self,
        employee: &Employee,
        category: LeaveCategory,
        range: &DateRange,
        existing: &[LeaveEvent],
    ) -> Result<(), LeaveError> {
        match self.find_conflict(employee, category, range, existing) {
            Some(event) => Err(LeaveError::Conflict {
                owner: employee.name.clone(),
                category: event.category,
                range: event.range,
                event_id: event.id,
            }),
            None => Ok(()),
        }
    }
}
