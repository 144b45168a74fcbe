//! Leave service scenarios against the in-memory store

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::LeaveDays;
use domain_leave::{
    AssignRoster, AuthorizationFailure, CalendarQuery, CategoryPayload, ErrorKind, FlexAdjustment,
    GrantSupplemental, LeaveCategory, LeaveError, SubmitLeave,
};
use test_utils::{assert_err, assert_err_variant, assert_ok};
use test_utils::*;

fn request(category: LeaveCategory, start: NaiveDate, end: NaiveDate) -> SubmitLeave {
    SubmitLeave {
        employee_id: None,
        category,
        start,
        end,
        payload: CategoryPayload::Plain,
    }
}

fn full_day(date: NaiveDate) -> SubmitLeave {
    request(LeaveCategory::FullDay, date, date)
}

mod submission_tests {
    use super::*;

    #[tokio::test]
    async fn test_admin_self_submission_is_approved_and_charged() {
        let admin = EmployeeBuilder::new().with_balances(0, 15).build();
        let h = TestHarness::new(vec![admin.clone()]).await;

        let outcome = assert_ok!(
            h.service
                .submit(&ActorFixtures::admin(&admin), full_day(DateFixtures::weekday()))
                .await
        );

        assert!(outcome.event.approved);
        assert_balances(&outcome.balances, dec!(0), dec!(14));
        let stored = h.employee(&admin).await;
        assert_balances(&stored.balances, dec!(0), dec!(14));
        assert_eq!(stored.version, admin.version + 1);
    }

    #[tokio::test]
    async fn test_staff_submission_stays_pending_without_ledger_effect() {
        let staff = EmployeeBuilder::new().with_balances(1, 10).build();
        let h = TestHarness::new(vec![staff.clone()]).await;
        let date = DateFixtures::weekday();

        let outcome = assert_ok!(
            h.service
                .submit(
                    &ActorFixtures::staff(&staff),
                    request(LeaveCategory::HalfDayMorning, date, date)
                )
                .await
        );

        assert!(!outcome.event.approved);
        assert!(outcome.event.applied.is_none());
        assert_balances(&h.employee(&staff).await.balances, dec!(1), dec!(10));
    }

    #[tokio::test]
    async fn test_supplemental_consumed_before_entitled_and_debt_allowed() {
        let admin = EmployeeBuilder::new().with_balances(1, 0).build();
        let h = TestHarness::new(vec![admin.clone()]).await;

        let outcome = assert_ok!(
            h.service
                .submit(
                    &ActorFixtures::admin(&admin),
                    request(
                        LeaveCategory::FullDay,
                        DateFixtures::three_days().start,
                        DateFixtures::three_days().end
                    )
                )
                .await
        );

        assert_days(outcome.event.charged(), dec!(1));
        assert_balances(&outcome.balances, dec!(0), dec!(0));

        let next = DateFixtures::three_days().end + chrono::Duration::days(1);
        let outcome = assert_ok!(
            h.service
                .submit(&ActorFixtures::admin(&admin), full_day(next))
                .await
        );
        assert_days(outcome.event.charged(), dec!(1));
        assert_eq!(outcome.event.applied.unwrap().from_entitled, LeaveDays::whole(1));
        assert_balances(&outcome.balances, dec!(0), dec!(-1));
        assert_balances_within_floor(&outcome.balances, h.service.policy().debt_floor);
    }

    #[tokio::test]
    async fn test_staff_cannot_book_for_colleague() {
        let staff = EmployeeBuilder::new().build();
        let colleague = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![staff.clone(), colleague.clone()]).await;

        let mut req = full_day(DateFixtures::weekday());
        req.employee_id = Some(colleague.id);
        let err = assert_err!(h.service.submit(&ActorFixtures::staff(&staff), req).await);
        assert_kind(&err, ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_admin_books_only_inside_own_department() {
        let admin = EmployeeBuilder::new().with_department("radiology").build();
        let nurse = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![admin.clone(), nurse.clone()]).await;

        let mut req = full_day(DateFixtures::weekday());
        req.employee_id = Some(nurse.id);
        assert_err_variant!(
            h.service.submit(&ActorFixtures::admin(&admin), req).await,
            LeaveError::Unauthorized(AuthorizationFailure::DepartmentMismatch { .. })
        );
    }

    #[tokio::test]
    async fn test_superadmin_books_for_anyone() {
        let nurse = EmployeeBuilder::new().with_balances(0, 5).build();
        let h = TestHarness::new(vec![nurse.clone()]).await;

        let mut req = full_day(DateFixtures::weekday());
        req.employee_id = Some(nurse.id);
        let outcome = assert_ok!(
            h.service
                .submit(&ActorFixtures::management_superadmin(), req)
                .await
        );
        assert!(outcome.event.approved);
        assert_balances(&outcome.balances, dec!(0), dec!(4));
    }

    #[tokio::test]
    async fn test_inactive_employee_is_rejected() {
        let leaver = EmployeeBuilder::new().inactive().build();
        let h = TestHarness::new(vec![leaver.clone()]).await;

        let err = assert_err!(
            h.service
                .submit(&ActorFixtures::staff(&leaver), full_day(DateFixtures::weekday()))
                .await
        );
        assert_kind(&err, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_category_date_rules() {
        let tech = EmployeeBuilder::new().with_department("radiology").build();
        let h = TestHarness::new(vec![tech.clone()]).await;
        let actor = ActorFixtures::staff(&tech);
        let saturday = DateFixtures::saturday();

        let err = assert_err!(h.service.submit(&actor, full_day(saturday)).await);
        assert_kind(&err, ErrorKind::Validation);

        let weekday = DateFixtures::weekday();
        let err = assert_err!(
            h.service
                .submit(&actor, request(LeaveCategory::SaturdayFullDay, weekday, weekday))
                .await
        );
        assert_kind(&err, ErrorKind::Validation);

        let err = assert_err!(
            h.service
                .submit(
                    &actor,
                    request(LeaveCategory::QuarterDay, weekday, weekday.succ_opt().unwrap())
                )
                .await
        );
        assert_kind(&err, ErrorKind::Validation);

        assert_ok!(
            h.service
                .submit(&actor, request(LeaveCategory::SaturdayFullDay, saturday, saturday))
                .await
        );
    }

    #[tokio::test]
    async fn test_dedicated_categories_are_refused() {
        let staff = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![staff.clone()]).await;
        let date = DateFixtures::weekday();

        let err = assert_err!(
            h.service
                .submit(
                    &ActorFixtures::staff(&staff),
                    request(LeaveCategory::RosterAssignment, date, date)
                )
                .await
        );
        assert_kind(&err, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_schedule_note_requires_memo() {
        let staff = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![staff.clone()]).await;
        let date = DateFixtures::weekday();

        let mut req = request(LeaveCategory::ScheduleNote, date, date);
        req.payload = CategoryPayload::ScheduleNote {
            memo: "   ".to_string(),
            start_time: None,
            end_time: None,
        };
        let err = assert_err!(h.service.submit(&ActorFixtures::staff(&staff), req).await);
        assert_kind(&err, ErrorKind::Validation);
    }
}

mod overlap_tests {
    use super::*;

    #[tokio::test]
    async fn test_overlapping_request_names_existing_category() {
        let staff = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![staff.clone()]).await;
        let actor = ActorFixtures::staff(&staff);
        let range = DateFixtures::three_days();

        assert_ok!(
            h.service
                .submit(&actor, request(LeaveCategory::FullDay, range.start, range.end))
                .await
        );

        let middle = range.start.succ_opt().unwrap();
        let err = assert_err!(
            h.service
                .submit(&actor, request(LeaveCategory::HalfDayAfternoon, middle, middle))
                .await
        );
        assert_kind(&err, ErrorKind::Conflict);
        assert!(matches!(
            err,
            LeaveError::Conflict {
                category: LeaveCategory::FullDay,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_flex_never_conflicts() {
        let staff = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![staff.clone()]).await;
        let actor = ActorFixtures::staff(&staff);
        let date = DateFixtures::weekday();

        assert_ok!(h.service.submit(&actor, full_day(date)).await);
        let flex = assert_ok!(
            h.service
                .adjust_flex(
                    &actor,
                    FlexAdjustment {
                        employee_id: staff.id,
                        date,
                        hours: dec!(-1.5),
                    }
                )
                .await
        );
        assert!(flex.approved);
        assert_days(flex.consumed(), dec!(0));
    }

    #[tokio::test]
    async fn test_concurrent_requests_for_same_day_admit_one() {
        let admin = EmployeeBuilder::new().with_balances(0, 10).build();
        let h = TestHarness::new(vec![admin.clone()]).await;
        let actor = ActorFixtures::admin(&admin);
        let date = DateFixtures::weekday();

        let (first, second) = tokio::join!(
            h.service.submit(&actor, full_day(date)),
            h.service.submit(&actor, full_day(date)),
        );

        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
        assert_balances(&h.employee(&admin).await.balances, dec!(0), dec!(9));
        assert_eq!(h.store.all_events().await.len(), 1);
    }
}

mod workflow_tests {
    use super::*;

    #[tokio::test]
    async fn test_approve_applies_consumption_once() {
        let staff = EmployeeBuilder::new().with_balances(1, 10).build();
        let admin = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![staff.clone(), admin.clone()]).await;
        let date = DateFixtures::weekday();

        let submitted = assert_ok!(
            h.service
                .submit(
                    &ActorFixtures::staff(&staff),
                    request(LeaveCategory::HalfDayMorning, date, date)
                )
                .await
        );
        let admin_actor = ActorFixtures::admin(&admin);

        let approved = assert_ok!(h.service.approve(&admin_actor, submitted.event.id).await);
        assert!(approved.event.approved);
        assert_balances(&approved.balances.unwrap(), dec!(0.5), dec!(10));

        let err = assert_err!(h.service.approve(&admin_actor, submitted.event.id).await);
        assert_kind(&err, ErrorKind::Conflict);
        assert_balances(&h.employee(&staff).await.balances, dec!(0.5), dec!(10));
    }

    #[tokio::test]
    async fn test_cancel_refunds_recorded_deduction() {
        let staff = EmployeeBuilder::new().with_balances(1, 10).build();
        let admin = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![staff.clone(), admin.clone()]).await;
        let range = DateFixtures::three_days();

        let submitted = assert_ok!(
            h.service
                .submit(
                    &ActorFixtures::staff(&staff),
                    request(LeaveCategory::FullDay, range.start, range.end)
                )
                .await
        );
        assert_ok!(
            h.service
                .approve(&ActorFixtures::admin(&admin), submitted.event.id)
                .await
        );
        assert_balances(&h.employee(&staff).await.balances, dec!(0), dec!(10));

        let cancelled = assert_ok!(
            h.service
                .cancel(&ActorFixtures::staff(&staff), submitted.event.id)
                .await
        );
        assert!(cancelled.was_approved);
        assert_days(cancelled.refunded.unwrap().total(), dec!(1));
        assert_balances(&h.employee(&staff).await.balances, dec!(1), dec!(10));
        assert!(h.store.all_events().await.is_empty());
    }

    #[tokio::test]
    async fn test_reject_pending_deletes_without_refund() {
        let staff = EmployeeBuilder::new().with_balances(0, 5).build();
        let admin = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![staff.clone(), admin.clone()]).await;

        let submitted = assert_ok!(
            h.service
                .submit(&ActorFixtures::staff(&staff), full_day(DateFixtures::weekday()))
                .await
        );
        let outcome = assert_ok!(
            h.service
                .reject(&ActorFixtures::admin(&admin), submitted.event.id)
                .await
        );
        assert!(!outcome.was_approved);
        assert!(outcome.refunded.is_none());
        assert_balances(&h.employee(&staff).await.balances, dec!(0), dec!(5));
    }

    #[tokio::test]
    async fn test_staff_cannot_approve_or_cancel_others() {
        let staff = EmployeeBuilder::new().build();
        let colleague = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![staff.clone(), colleague.clone()]).await;

        let submitted = assert_ok!(
            h.service
                .submit(&ActorFixtures::staff(&staff), full_day(DateFixtures::weekday()))
                .await
        );
        let colleague_actor = ActorFixtures::staff(&colleague);

        let err = assert_err!(h.service.approve(&colleague_actor, submitted.event.id).await);
        assert_kind(&err, ErrorKind::Authorization);
        let err = assert_err!(h.service.cancel(&colleague_actor, submitted.event.id).await);
        assert_kind(&err, ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_unknown_event_is_not_found() {
        let admin = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![admin.clone()]).await;

        let err = assert_err!(
            h.service
                .approve(&ActorFixtures::admin(&admin), Default::default())
                .await
        );
        assert_kind(&err, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_pending_queue_for_admins_only() {
        let staff = EmployeeBuilder::new().build();
        let admin = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![staff.clone(), admin.clone()]).await;
        let staff_actor = ActorFixtures::staff(&staff);

        assert_ok!(h.service.submit(&staff_actor, full_day(DateFixtures::saturday())).await);
        assert_ok!(h.service.submit(&staff_actor, full_day(DateFixtures::weekday())).await);

        let queue = assert_ok!(
            h.service
                .pending_queue(&ActorFixtures::admin(&admin), None)
                .await
        );
        assert_eq!(queue.len(), 2);
        assert!(queue[0].range.start < queue[1].range.start);

        let err = assert_err!(h.service.pending_queue(&staff_actor, None).await);
        assert_kind(&err, ErrorKind::Authorization);
    }
}

mod month_lock_tests {
    use super::*;

    async fn locked_ward() -> (TestHarness, domain_leave::Employee, domain_leave::Employee) {
        let admin = EmployeeBuilder::new().build();
        let staff = EmployeeBuilder::new().with_balances(0, 10).build();
        let h = TestHarness::on(vec![admin.clone(), staff.clone()], DateFixtures::window_open()).await;
        h.store.register_signature(admin.id).await;
        assert_ok!(
            h.service
                .confirm_month(&ActorFixtures::admin(&admin), march_key("ward"))
                .await
        );
        (h, admin, staff)
    }

    #[tokio::test]
    async fn test_confirm_records_lock() {
        let (h, admin, _) = locked_ward().await;

        let status = assert_ok!(h.service.month_lock_status(march_key("ward")).await);
        assert!(status.locked);
        assert!(!status.can_confirm);
        assert_eq!(status.locked_by, Some(admin.id));

        let record = assert_ok!(h.service.month_lock_record(&march_key("ward")).await);
        assert!(record.unwrap().locked_at.is_some());
    }

    #[tokio::test]
    async fn test_second_confirmation_conflicts() {
        let (h, admin, _) = locked_ward().await;
        assert_err_variant!(
            h.service
                .confirm_month(&ActorFixtures::admin(&admin), march_key("ward"))
                .await,
            LeaveError::AlreadyConfirmed { .. }
        );
    }

    #[tokio::test]
    async fn test_locked_month_blocks_admins_but_not_superadmin() {
        let (h, admin, staff) = locked_ward().await;
        let date = DateFixtures::weekday();

        let mut req = full_day(date);
        req.employee_id = Some(staff.id);
        assert_err_variant!(
            h.service.submit(&ActorFixtures::admin(&admin), req.clone()).await,
            LeaveError::Unauthorized(AuthorizationFailure::MonthLocked { .. })
        );

        let outcome = assert_ok!(
            h.service
                .submit(&ActorFixtures::management_superadmin(), req)
                .await
        );
        assert_balances(&outcome.balances, dec!(0), dec!(9));
    }

    #[tokio::test]
    async fn test_flex_in_locked_month_is_barred_for_everyone() {
        let (h, admin, staff) = locked_ward().await;
        let adjustment = FlexAdjustment {
            employee_id: staff.id,
            date: DateFixtures::weekday(),
            hours: dec!(2),
        };

        assert_err_variant!(
            h.service
                .adjust_flex(&ActorFixtures::admin(&admin), adjustment.clone())
                .await,
            LeaveError::Unauthorized(AuthorizationFailure::MonthLocked { .. })
        );
        assert_err_variant!(
            h.service
                .adjust_flex(&ActorFixtures::management_superadmin(), adjustment)
                .await,
            LeaveError::Unauthorized(AuthorizationFailure::ExemptCategory { .. })
        );
    }

    #[tokio::test]
    async fn test_cancel_in_locked_month_needs_superadmin() {
        let admin = EmployeeBuilder::new().build();
        let staff = EmployeeBuilder::new().with_balances(0, 10).build();
        let h = TestHarness::on(vec![admin.clone(), staff.clone()], DateFixtures::window_open()).await;
        h.store.register_signature(admin.id).await;

        let mut req = full_day(DateFixtures::weekday());
        req.employee_id = Some(staff.id);
        let booked = assert_ok!(h.service.submit(&ActorFixtures::admin(&admin), req).await);
        assert_ok!(
            h.service
                .confirm_month(&ActorFixtures::admin(&admin), march_key("ward"))
                .await
        );

        let err = assert_err!(h.service.cancel(&ActorFixtures::admin(&admin), booked.event.id).await);
        assert_kind(&err, ErrorKind::Authorization);

        assert_ok!(
            h.service
                .cancel(&ActorFixtures::management_superadmin(), booked.event.id)
                .await
        );
        assert_balances(&h.employee(&staff).await.balances, dec!(0), dec!(10));
    }

    #[tokio::test]
    async fn test_unlock_is_superadmin_only_and_idempotent() {
        let (h, admin, staff) = locked_ward().await;

        let err = assert_err!(
            h.service
                .unlock_month(&ActorFixtures::admin(&admin), march_key("ward"))
                .await
        );
        assert_kind(&err, ErrorKind::Authorization);

        let root = ActorFixtures::management_superadmin();
        let record = assert_ok!(h.service.unlock_month(&root, march_key("ward")).await);
        assert!(!record.locked);
        let again = assert_ok!(h.service.unlock_month(&root, march_key("ward")).await);
        assert!(!again.locked);

        let mut req = full_day(DateFixtures::weekday());
        req.employee_id = Some(staff.id);
        assert_ok!(h.service.submit(&ActorFixtures::admin(&admin), req).await);
    }

    #[tokio::test]
    async fn test_confirmation_checks_window_then_signature() {
        let admin = EmployeeBuilder::new().build();
        let early = TestHarness::on(vec![admin.clone()], DateFixtures::mid_month()).await;
        assert_err_variant!(
            early
                .service
                .confirm_month(&ActorFixtures::admin(&admin), march_key("ward"))
                .await,
            LeaveError::ConfirmationWindowClosed { .. }
        );

        let unsigned = TestHarness::on(vec![admin.clone()], DateFixtures::window_open()).await;
        assert_err_variant!(
            unsigned
                .service
                .confirm_month(&ActorFixtures::admin(&admin), march_key("ward"))
                .await,
            LeaveError::Unauthorized(AuthorizationFailure::SignatureMissing)
        );
    }

    #[tokio::test]
    async fn test_other_department_admin_cannot_confirm() {
        let admin = EmployeeBuilder::new().with_department("radiology").build();
        let h = TestHarness::on(vec![admin.clone()], DateFixtures::window_open()).await;
        h.store.register_signature(admin.id).await;

        assert_err_variant!(
            h.service
                .confirm_month(&ActorFixtures::admin(&admin), march_key("ward"))
                .await,
            LeaveError::Unauthorized(AuthorizationFailure::RoleRequired { .. })
        );
    }

    #[tokio::test]
    async fn test_approved_events_for_month() {
        let admin = EmployeeBuilder::new().with_balances(0, 10).build();
        let staff = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![admin.clone(), staff.clone()]).await;

        assert_ok!(
            h.service
                .submit(&ActorFixtures::admin(&admin), full_day(DateFixtures::weekday()))
                .await
        );
        assert_ok!(
            h.service
                .submit(&ActorFixtures::staff(&staff), full_day(DateFixtures::weekday()))
                .await
        );

        let events = assert_ok!(
            h.service
                .approved_events_for_month("ward", DateFixtures::month())
                .await
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].owner_name, admin.name);
    }
}

mod roster_and_flex_tests {
    use super::*;

    #[tokio::test]
    async fn test_roster_skips_duplicates() {
        let admin = EmployeeBuilder::new().build();
        let a = EmployeeBuilder::new().build();
        let b = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![admin.clone(), a.clone(), b.clone()]).await;
        let actor = ActorFixtures::admin(&admin);
        let date = DateFixtures::weekday();

        let outcome = assert_ok!(
            h.service
                .assign_roster(
                    &actor,
                    AssignRoster {
                        employee_ids: vec![a.id, b.id, a.id],
                        date,
                    }
                )
                .await
        );
        assert_eq!(outcome.created.len(), 2);
        assert!(outcome.created.iter().all(|ev| ev.approved));

        let again = assert_ok!(
            h.service
                .assign_roster(
                    &actor,
                    AssignRoster {
                        employee_ids: vec![a.id],
                        date,
                    }
                )
                .await
        );
        assert!(again.created.is_empty());
        assert_eq!(again.skipped, vec![a.id]);
        assert_balances(&h.employee(&a).await.balances, dec!(0), dec!(0));
    }

    #[tokio::test]
    async fn test_roster_across_departments_is_refused() {
        let admin = EmployeeBuilder::new().with_department("radiology").build();
        let nurse = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![admin.clone(), nurse.clone()]).await;

        let err = assert_err!(
            h.service
                .assign_roster(
                    &ActorFixtures::admin(&admin),
                    AssignRoster {
                        employee_ids: vec![nurse.id],
                        date: DateFixtures::weekday(),
                    }
                )
                .await
        );
        assert_kind(&err, ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_flex_rejects_zero_hours() {
        let staff = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![staff.clone()]).await;

        let err = assert_err!(
            h.service
                .adjust_flex(
                    &ActorFixtures::staff(&staff),
                    FlexAdjustment {
                        employee_id: staff.id,
                        date: DateFixtures::weekday(),
                        hours: dec!(0),
                    }
                )
                .await
        );
        assert_kind(&err, ErrorKind::Validation);
    }
}

mod grant_tests {
    use super::*;

    fn grant(ids: Vec<core_kernel::EmployeeId>, days: i64) -> GrantSupplemental {
        GrantSupplemental {
            employee_ids: ids,
            days: LeaveDays::whole(days),
            reason: "holiday overtime".to_string(),
            effective_date: None,
        }
    }

    #[tokio::test]
    async fn test_grant_credits_every_recipient_and_logs_once() {
        let a = EmployeeBuilder::new().with_balances(0, 3).build();
        let b = EmployeeBuilder::new().with_department("radiology").build();
        let h = TestHarness::new(vec![a.clone(), b.clone()]).await;
        let root = ActorFixtures::management_superadmin();

        let outcome = assert_ok!(h.service.grant_supplemental(&root, grant(vec![a.id, b.id, a.id], 2)).await);
        assert_eq!(outcome.balances.len(), 2);
        assert_eq!(outcome.entry.effective_date, DateFixtures::weekday());
        assert!(outcome.entry.summary.contains(&a.name));
        assert!(outcome.entry.summary.contains("radiology("));

        assert_balances(&h.employee(&a).await.balances, dec!(2), dec!(3));
        assert_balances(&h.employee(&b).await.balances, dec!(2), dec!(0));

        assert_eq!(assert_ok!(h.service.grant_history(&root, None).await).len(), 1);
        let mine = assert_ok!(h.service.grant_history(&ActorFixtures::staff(&a), None).await);
        assert_eq!(mine.len(), 1);
    }

    #[tokio::test]
    async fn test_grant_requires_superadmin_and_positive_days() {
        let admin = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![admin.clone()]).await;

        let err = assert_err!(
            h.service
                .grant_supplemental(&ActorFixtures::admin(&admin), grant(vec![admin.id], 1))
                .await
        );
        assert_kind(&err, ErrorKind::Authorization);

        let root = ActorFixtures::management_superadmin();
        let err = assert_err!(h.service.grant_supplemental(&root, grant(vec![admin.id], 0)).await);
        assert_kind(&err, ErrorKind::Validation);
        let err = assert_err!(h.service.grant_supplemental(&root, grant(vec![], 1)).await);
        assert_kind(&err, ErrorKind::Validation);
        assert_eq!(h.store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_grants_are_refused_without_panicking() {
        let staff = EmployeeBuilder::new().with_balances(0, 5).build();
        let h = TestHarness::new(vec![staff.clone()]).await;
        let root = ActorFixtures::management_superadmin();

        let mut huge = grant(vec![staff.id], 1);
        huge.days = LeaveDays::new(Decimal::MAX);
        let err = assert_err!(h.service.grant_supplemental(&root, huge).await);
        assert_kind(&err, ErrorKind::Validation);

        let over_cap = h.service.policy().max_grant_days + LeaveDays::whole(1);
        let mut req = grant(vec![staff.id], 1);
        req.days = over_cap;
        let err = assert_err!(h.service.grant_supplemental(&root, req).await);
        assert_kind(&err, ErrorKind::Validation);

        assert_eq!(h.store.commit_count(), 0);
        assert_balances(&h.employee(&staff).await.balances, dec!(0), dec!(5));

        let mut at_cap = grant(vec![staff.id], 1);
        at_cap.days = h.service.policy().max_grant_days;
        assert_ok!(h.service.grant_supplemental(&root, at_cap).await);
        assert_balances(&h.employee(&staff).await.balances, dec!(365), dec!(5));
    }

    #[tokio::test]
    async fn test_staff_cannot_read_colleague_grants() {
        let a = EmployeeBuilder::new().build();
        let b = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![a.clone(), b.clone()]).await;

        let err = assert_err!(
            h.service
                .grant_history(&ActorFixtures::staff(&a), Some(b.id))
                .await
        );
        assert_kind(&err, ErrorKind::Authorization);
    }
}

mod commit_tests {
    use super::*;

    #[tokio::test]
    async fn test_stale_commit_is_retried() {
        let admin = EmployeeBuilder::new().with_balances(0, 5).build();
        let h = TestHarness::new(vec![admin.clone()]).await;
        h.store.stale_next_commit();

        let outcome = assert_ok!(
            h.service
                .submit(&ActorFixtures::admin(&admin), full_day(DateFixtures::weekday()))
                .await
        );
        assert!(outcome.event.approved);
        assert_eq!(h.store.commit_count(), 1);
        assert_balances(&h.employee(&admin).await.balances, dec!(0), dec!(4));
    }

    #[tokio::test]
    async fn test_exhausted_retries_report_conflict() {
        let admin = EmployeeBuilder::new().with_balances(0, 5).build();
        let h = TestHarness::new(vec![admin.clone()]).await;
        h.store
            .stale_next_commits(TEST_POLICY.max_commit_attempts as usize);

        let err = assert_err!(
            h.service
                .submit(&ActorFixtures::admin(&admin), full_day(DateFixtures::weekday()))
                .await
        );
        assert_kind(&err, ErrorKind::Conflict);
        assert_eq!(h.store.commit_count(), 0);
        assert!(h.store.all_events().await.is_empty());
    }

    #[tokio::test]
    async fn test_pending_submit_bumps_owner_version() {
        let staff = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![staff.clone()]).await;

        let outcome = assert_ok!(
            h.service
                .submit(&ActorFixtures::staff(&staff), full_day(DateFixtures::weekday()))
                .await
        );
        assert!(!outcome.event.approved);
        assert_eq!(h.employee(&staff).await.version, staff.version + 1);
    }

    #[tokio::test]
    async fn test_submit_charges_current_stored_balances() {
        let admin = EmployeeBuilder::new().with_balances(0, 5).build();
        let h = TestHarness::new(vec![admin.clone()]).await;
        h.store
            .touch_employee(
                admin.id,
                domain_leave::Balances::new(LeaveDays::whole(1), LeaveDays::whole(5)),
            )
            .await;

        let outcome = assert_ok!(
            h.service
                .submit(&ActorFixtures::admin(&admin), full_day(DateFixtures::weekday()))
                .await
        );
        assert_balances(&outcome.balances, dec!(0), dec!(5));
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_nothing_behind() {
        let admin = EmployeeBuilder::new().with_balances(0, 5).build();
        let h = TestHarness::new(vec![admin.clone()]).await;
        h.store.fail_next_commit();

        let err = assert_err!(
            h.service
                .submit(&ActorFixtures::admin(&admin), full_day(DateFixtures::weekday()))
                .await
        );
        assert_kind(&err, ErrorKind::Storage);
        assert!(h.store.all_events().await.is_empty());
        assert_balances(&h.employee(&admin).await.balances, dec!(0), dec!(5));
    }
}

mod view_tests {
    use super::*;

    #[tokio::test]
    async fn test_calendar_hides_pending_and_flex_from_colleagues() {
        let a = EmployeeBuilder::new().build();
        let b = EmployeeBuilder::new().build();
        let admin = EmployeeBuilder::new().build();
        let doctor = EmployeeBuilder::new().with_department("medical-staff").build();
        let h = TestHarness::new(vec![a.clone(), b.clone(), admin.clone(), doctor.clone()]).await;
        let date = DateFixtures::weekday();

        assert_ok!(h.service.submit(&ActorFixtures::staff(&a), full_day(date)).await);
        assert_ok!(
            h.service
                .adjust_flex(
                    &ActorFixtures::staff(&a),
                    FlexAdjustment {
                        employee_id: a.id,
                        date,
                        hours: dec!(1),
                    }
                )
                .await
        );
        h.store
            .insert_event(
                LeaveEventBuilder::for_employee(&doctor)
                    .on(DateFixtures::date(2024, 3, 11))
                    .approved()
                    .build(),
            )
            .await;

        let query = CalendarQuery {
            department: None,
            month: DateFixtures::month(),
            mine_only: false,
        };

        let for_b = assert_ok!(h.service.calendar(&ActorFixtures::staff(&b), query.clone()).await);
        assert_eq!(for_b.len(), 1);
        assert_eq!(for_b[0].department, "medical-staff");

        let for_a = assert_ok!(h.service.calendar(&ActorFixtures::staff(&a), query.clone()).await);
        assert_eq!(for_a.len(), 3);

        let for_admin = assert_ok!(h.service.calendar(&ActorFixtures::admin(&admin), query.clone()).await);
        assert_eq!(for_admin.len(), 3);

        let mine = assert_ok!(
            h.service
                .calendar(
                    &ActorFixtures::staff(&a),
                    CalendarQuery {
                        mine_only: true,
                        ..query
                    }
                )
                .await
        );
        assert_eq!(mine.len(), 2);
    }

    #[tokio::test]
    async fn test_balance_summary_and_reconcile() {
        let nurse = EmployeeBuilder::new()
            .with_pre_system_usage(LeaveDays::whole(2))
            .with_balances(0, 0)
            .build();
        let h = TestHarness::new(vec![nurse.clone()]).await;
        h.store
            .insert_event(
                LeaveEventBuilder::for_employee(&nurse)
                    .approved_with(LeaveDays::ZERO, LeaveDays::whole(1))
                    .build(),
            )
            .await;
        h.store
            .insert_event(
                LeaveEventBuilder::for_employee(&nurse)
                    .on(DateFixtures::date(2024, 3, 12))
                    .build(),
            )
            .await;

        let summary = assert_ok!(
            h.service
                .balance_summary(&ActorFixtures::staff(&nurse), nurse.id, None)
                .await
        );
        let accrued = h
            .service
            .accrual()
            .entitlement(DateFixtures::veteran_hire(), DateFixtures::weekday());
        assert_eq!(summary.accrued, LeaveDays::from(accrued));
        assert_days(summary.approved_usage, dec!(1));
        assert_days(summary.total_used(), dec!(3));
        assert_eq!(summary.remaining.entitled, summary.accrued - LeaveDays::whole(3));
        assert!(!summary.cache_matches());

        let root = ActorFixtures::management_superadmin();
        let reconciled = assert_ok!(h.service.reconcile_balances(&root, nurse.id).await);
        assert!(reconciled.cache_matches());
        assert_eq!(h.employee(&nurse).await.balances, reconciled.remaining);

        let commits = h.store.commit_count();
        assert_ok!(h.service.reconcile_balances(&root, nurse.id).await);
        assert_eq!(h.store.commit_count(), commits);
    }

    #[tokio::test]
    async fn test_summary_of_colleague_requires_admin() {
        let a = EmployeeBuilder::new().build();
        let b = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![a.clone(), b.clone()]).await;

        let err = assert_err!(
            h.service
                .balance_summary(&ActorFixtures::staff(&a), b.id, None)
                .await
        );
        assert_kind(&err, ErrorKind::Authorization);
        assert_ok!(
            h.service
                .balance_summary(&ActorFixtures::admin(&a), b.id, None)
                .await
        );
    }

    #[tokio::test]
    async fn test_department_registry_merges_directory() {
        let pharmacist = EmployeeBuilder::new().with_department("dialysis").build();
        let h = TestHarness::new(vec![pharmacist]).await;

        let departments = h.service.departments();
        assert!(departments.contains("dialysis"));
        assert!(departments.contains("ward"));
        assert!(!departments.contains("management"));
    }
}

mod legacy_tests {
    use super::*;

    #[tokio::test]
    async fn test_legacy_owners_are_rewritten_to_ids() {
        let nurse = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![nurse.clone()]).await;
        let ghost = EmployeeBuilder::new().with_name("Former Employee").build();

        let legacy = LeaveEventBuilder::for_employee(&nurse).legacy_owner().approved().build();
        let orphan = LeaveEventBuilder::for_employee(&ghost).legacy_owner().build();
        h.store.insert_event(legacy.clone()).await;
        h.store.insert_event(orphan.clone()).await;

        let report = assert_ok!(h.service.migrate_legacy_owners().await);
        assert_eq!(report.migrated, 1);
        assert_eq!(report.unresolved, vec![orphan.id]);

        let events = h.store.all_events().await;
        let migrated = events.iter().find(|ev| ev.id == legacy.id).unwrap();
        assert_eq!(migrated.owner.employee_id(), Some(nurse.id));
    }

    #[tokio::test]
    async fn test_legacy_events_still_block_overlaps() {
        let nurse = EmployeeBuilder::new().build();
        let h = TestHarness::new(vec![nurse.clone()]).await;
        h.store
            .insert_event(LeaveEventBuilder::for_employee(&nurse).legacy_owner().build())
            .await;

        let err = assert_err!(
            h.service
                .submit(&ActorFixtures::staff(&nurse), full_day(DateFixtures::weekday()))
                .await
        );
        assert_kind(&err, ErrorKind::Conflict);
    }
}
