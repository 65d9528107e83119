//! Attendance lifecycle for one (employee, date) pair.
//!
//! ```text
//! (no record) --check_in--> checked-in --check_out--> completed
//! ```
//!
//! `create`/`update` may jump straight to any state but must keep
//! check-out after check-in. The `mark` workflow only ever writes "now", so
//! it does not re-validate ordering. Its writes are conditional on the
//! target column still being empty, so of two racing marks only one lands.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Timelike};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::model::attendance::{
    Attendance, AttendanceAction, AttendanceChanges, AttendanceCriteria, AttendanceStatus, DateRange,
    NewAttendance,
};
use crate::presenter::{AttendanceView, Presenter};
use crate::repository::Repositories;
use crate::service::guard::{ATTENDANCE_EXISTS, ReferentialGuard, unique_as_conflict};
use crate::utils::patch::Patch;

pub const ATTENDANCE_NOT_FOUND: &str = "Attendance record not found";
pub const ALREADY_CHECKED_IN: &str = "Already checked in for this date";
pub const ALREADY_CHECKED_OUT: &str = "Already checked out for this date";
pub const NOTES_MAX_LEN: usize = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateAttendance {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    pub status: Option<AttendanceStatus>,
    pub notes: Option<String>,
}

/// Listing filters. When both `date` and `range` are given the range wins.
#[derive(Debug, Clone, Default)]
pub struct AttendanceFilter {
    pub date: Option<NaiveDate>,
    pub employee_id: Option<u64>,
    pub range: Option<DateRange>,
}

impl AttendanceFilter {
    fn criteria(&self) -> AttendanceCriteria {
        AttendanceCriteria {
            employee_id: self.employee_id,
            dates: self.range.or(self.date.map(DateRange::day)),
            ..AttendanceCriteria::default()
        }
    }
}

/// Minutes since midnight; seconds do not take part in ordering checks.
fn minutes(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn validate_time_range(check_in: Option<NaiveTime>, check_out: Option<NaiveTime>) -> AppResult<()> {
    if let (Some(check_in), Some(check_out)) = (check_in, check_out) {
        if minutes(check_out) <= minutes(check_in) {
            return Err(AppError::validation(
                "Invalid time range",
                "check_out",
                "Check-out time must be after check-in time",
            ));
        }
    }
    Ok(())
}

/// Trims notes; blank notes are stored as null.
fn normalize_notes(notes: String) -> AppResult<Option<String>> {
    let notes = notes.trim();
    if notes.chars().count() > NOTES_MAX_LEN {
        return Err(AppError::validation(
            "Invalid input data",
            "notes",
            format!("Notes must not exceed {NOTES_MAX_LEN} characters"),
        ));
    }
    Ok((!notes.is_empty()).then(|| notes.to_string()))
}

#[derive(Clone)]
pub struct AttendanceService {
    repos: Repositories,
    guard: ReferentialGuard,
    presenter: Presenter,
    clock: Arc<dyn Clock>,
}

impl AttendanceService {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self {
            guard: ReferentialGuard::new(repos.clone()),
            presenter: Presenter::new(repos.employees.clone(), repos.departments.clone()),
            repos,
            clock,
        }
    }

    pub async fn list(&self, filter: &AttendanceFilter) -> AppResult<Vec<AttendanceView>> {
        let records = self.repos.attendance.find_many(&filter.criteria()).await?;
        let mut views = self.presenter.attendance_list(records).await?;

        views.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| a.first_name.cmp(&b.first_name))
                .then_with(|| a.last_name.cmp(&b.last_name))
        });
        Ok(views)
    }

    pub async fn get(&self, id: u64) -> AppResult<AttendanceView> {
        let record = self.find(id).await?;
        Ok(self.presenter.attendance(record).await?)
    }

    pub async fn create(&self, input: CreateAttendance) -> AppResult<AttendanceView> {
        self.guard.require_employee(input.employee_id).await?;
        self.guard.ensure_no_day_record(input.employee_id, input.date).await?;
        validate_time_range(input.check_in, input.check_out)?;

        let record = NewAttendance {
            employee_id: input.employee_id,
            date: input.date,
            check_in: input.check_in,
            check_out: input.check_out,
            status: input.status.unwrap_or_default(),
            notes: input.notes.map(normalize_notes).transpose()?.flatten(),
        };

        let id = self
            .repos
            .attendance
            .insert(&record)
            .await
            .map_err(unique_as_conflict(ATTENDANCE_EXISTS))?;

        info!(id, employee_id = record.employee_id, date = %record.date, "Attendance record created");
        self.get(id).await
    }

    /// Partial update. Ordering is checked on the merged values so a single
    /// field change cannot break it.
    pub async fn update(&self, id: u64, mut changes: AttendanceChanges) -> AppResult<AttendanceView> {
        let existing = self.find(id).await?;

        changes.notes = match std::mem::take(&mut changes.notes) {
            Patch::Set(notes) => normalize_notes(notes)?.into(),
            other => other,
        };

        let check_in = changes.check_in.clone().merge(existing.check_in);
        let check_out = changes.check_out.clone().merge(existing.check_out);
        validate_time_range(check_in, check_out)?;

        self.repos.attendance.update(id, &changes).await?;

        debug!(id, "Attendance record updated");
        self.get(id).await
    }

    pub async fn delete(&self, id: u64) -> AppResult<()> {
        self.find(id).await?;
        self.repos.attendance.delete(id).await?;

        info!(id, "Attendance record deleted");
        Ok(())
    }

    /// Check-in / check-out workflow. The first check-in of the day creates
    /// the record.
    pub async fn mark(
        &self,
        employee_id: u64,
        date: NaiveDate,
        action: AttendanceAction,
    ) -> AppResult<AttendanceView> {
        self.guard.require_employee(employee_id).await?;

        let now = self.clock.now_time();
        let existing = self.guard.find_day_record(employee_id, date).await?;

        let id = match action {
            AttendanceAction::CheckIn => self.check_in(employee_id, date, existing, now).await?,
            AttendanceAction::CheckOut => self.check_out(existing, now).await?,
        };

        info!(employee_id, date = %date, action = %action, time = %now, "Attendance marked");
        self.get(id).await
    }

    async fn check_in(
        &self,
        employee_id: u64,
        date: NaiveDate,
        existing: Option<Attendance>,
        now: NaiveTime,
    ) -> AppResult<u64> {
        match existing {
            Some(record) if record.check_in.is_some() => Err(AppError::conflict(ALREADY_CHECKED_IN)),
            Some(record) => {
                // Only the first writer fills an empty check-in.
                if !self.repos.attendance.record_check_in(record.id, now).await? {
                    return Err(AppError::conflict(ALREADY_CHECKED_IN));
                }
                Ok(record.id)
            }
            None => {
                let record = NewAttendance {
                    employee_id,
                    date,
                    check_in: Some(now),
                    check_out: None,
                    status: AttendanceStatus::Present,
                    notes: None,
                };
                // A concurrent first check-in wins the unique index.
                Ok(self
                    .repos
                    .attendance
                    .insert(&record)
                    .await
                    .map_err(unique_as_conflict(ALREADY_CHECKED_IN))?)
            }
        }
    }

    async fn check_out(&self, existing: Option<Attendance>, now: NaiveTime) -> AppResult<u64> {
        let Some(record) = existing else {
            return Err(AppError::validation(
                "Must check in before checking out",
                "action",
                "Employee must check in first before checking out",
            ));
        };
        if record.check_out.is_some() {
            return Err(AppError::conflict(ALREADY_CHECKED_OUT));
        }
        if !self.repos.attendance.record_check_out(record.id, now).await? {
            return Err(AppError::conflict(ALREADY_CHECKED_OUT));
        }
        Ok(record.id)
    }

    async fn find(&self, id: u64) -> AppResult<Attendance> {
        self.repos
            .attendance
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(ATTENDANCE_NOT_FOUND))
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::*;
    use crate::clock::FixedClock;
    use crate::model::{
        department::NewDepartment,
        employee::{EmployeeStatus, NewEmployee},
    };

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        s.parse().unwrap()
    }

    struct Fixture {
        repos: Repositories,
        clock: Arc<FixedClock>,
        service: AttendanceService,
    }

    fn fixture() -> Fixture {
        let repos = Repositories::memory();
        let clock = Arc::new(FixedClock::at("2024-01-10", "08:55:00"));
        let service = AttendanceService::new(repos.clone(), clock.clone());
        Fixture { repos, clock, service }
    }

    async fn employee(repos: &Repositories, first: &str, department_id: Option<u64>) -> u64 {
        repos
            .employees
            .insert(&NewEmployee {
                first_name: first.into(),
                last_name: "Tester".into(),
                email: format!("{}@hrms.com", first.to_lowercase()),
                phone: None,
                position: "Analyst".into(),
                department_id,
                hire_date: None,
                salary: None,
                status: EmployeeStatus::Active,
            })
            .await
            .unwrap()
    }

    fn create_input(employee_id: u64, day: &str) -> CreateAttendance {
        CreateAttendance {
            employee_id,
            date: date(day),
            ..CreateAttendance::default()
        }
    }

    #[actix_web::test]
    async fn create_defaults_status_and_joins_display_fields() {
        let f = fixture();
        let dept = f
            .repos
            .departments
            .insert(&NewDepartment {
                name: "Finance".into(),
                description: None,
            })
            .await
            .unwrap();
        let emp = employee(&f.repos, "Sarah", Some(dept)).await;

        let view = f
            .service
            .create(CreateAttendance {
                check_in: Some(time("09:00:00")),
                notes: Some("  client visit  ".into()),
                ..create_input(emp, "2024-01-10")
            })
            .await
            .unwrap();

        assert_eq!(view.status, AttendanceStatus::Present);
        assert_eq!(view.notes.as_deref(), Some("client visit"));
        assert_eq!(view.first_name.as_deref(), Some("Sarah"));
        assert_eq!(view.department_name.as_deref(), Some("Finance"));
    }

    #[actix_web::test]
    async fn create_rejects_unknown_employee_and_duplicates() {
        let f = fixture();
        assert!(matches!(
            f.service.create(create_input(77, "2024-01-10")).await,
            Err(AppError::NotFound(_))
        ));

        let emp = employee(&f.repos, "Sarah", None).await;
        f.service.create(create_input(emp, "2024-01-10")).await.unwrap();
        match f.service.create(create_input(emp, "2024-01-10")).await {
            Err(AppError::Conflict { message, .. }) => assert_eq!(message, ATTENDANCE_EXISTS),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[actix_web::test]
    async fn create_rejects_check_out_before_check_in_whatever_the_status() {
        let f = fixture();
        let emp = employee(&f.repos, "Sarah", None).await;

        for status in [None, Some(AttendanceStatus::HalfDay), Some(AttendanceStatus::Absent)] {
            let result = f
                .service
                .create(CreateAttendance {
                    check_in: Some(time("10:00:00")),
                    check_out: Some(time("09:00:00")),
                    status,
                    notes: Some("note".into()),
                    ..create_input(emp, "2024-01-10")
                })
                .await;
            assert!(matches!(result, Err(AppError::Validation { .. })));
        }
        assert_eq!(
            f.repos
                .attendance
                .count(&AttendanceCriteria::default())
                .await
                .unwrap(),
            0
        );
    }

    #[actix_web::test]
    async fn times_in_the_same_minute_are_not_ordered() {
        assert!(validate_time_range(Some(time("09:00:10")), Some(time("09:00:50"))).is_err());
        assert!(validate_time_range(Some(time("09:00:59")), Some(time("09:01:00"))).is_ok());
        assert!(validate_time_range(Some(time("09:00:00")), None).is_ok());
    }

    #[actix_web::test]
    async fn notes_over_limit_are_rejected() {
        let f = fixture();
        let emp = employee(&f.repos, "Sarah", None).await;
        let result = f
            .service
            .create(CreateAttendance {
                notes: Some("x".repeat(NOTES_MAX_LEN + 1)),
                ..create_input(emp, "2024-01-10")
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[actix_web::test]
    async fn update_validates_against_existing_check_in() {
        let f = fixture();
        let emp = employee(&f.repos, "Sarah", None).await;
        let created = f
            .service
            .create(CreateAttendance {
                check_in: Some(time("09:00:00")),
                ..create_input(emp, "2024-01-10")
            })
            .await
            .unwrap();

        let result = f
            .service
            .update(
                created.id,
                AttendanceChanges {
                    check_out: Patch::Set(time("08:30:00")),
                    ..AttendanceChanges::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation { .. })));

        let stored = f.repos.attendance.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.check_out, None);
    }

    #[actix_web::test]
    async fn update_only_touches_supplied_fields() {
        let f = fixture();
        let emp = employee(&f.repos, "Sarah", None).await;
        let created = f
            .service
            .create(CreateAttendance {
                check_in: Some(time("09:00:00")),
                check_out: Some(time("17:00:00")),
                notes: Some("first".into()),
                ..create_input(emp, "2024-01-10")
            })
            .await
            .unwrap();

        let updated = f
            .service
            .update(
                created.id,
                AttendanceChanges {
                    status: Some(AttendanceStatus::HalfDay),
                    ..AttendanceChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.check_in, Some(time("09:00:00")));
        assert_eq!(updated.check_out, Some(time("17:00:00")));
        assert_eq!(updated.notes.as_deref(), Some("first"));
        assert_eq!(updated.status, AttendanceStatus::HalfDay);

        let cleared = f
            .service
            .update(
                created.id,
                AttendanceChanges {
                    check_out: Patch::Null,
                    notes: Patch::Set("   ".into()),
                    ..AttendanceChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.check_out, None);
        assert_eq!(cleared.notes, None);
    }

    #[actix_web::test]
    async fn update_and_delete_unknown_id_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.service.update(3, AttendanceChanges::default()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(f.service.delete(3).await, Err(AppError::NotFound(_))));
    }

    #[actix_web::test]
    async fn delete_removes_record() {
        let f = fixture();
        let emp = employee(&f.repos, "Sarah", None).await;
        let created = f.service.create(create_input(emp, "2024-01-10")).await.unwrap();

        f.service.delete(created.id).await.unwrap();
        assert!(matches!(f.service.get(created.id).await, Err(AppError::NotFound(_))));
    }

    #[actix_web::test]
    async fn check_in_twice_conflicts() {
        let f = fixture();
        let emp = employee(&f.repos, "Sarah", None).await;
        let day = date("2024-01-10");

        f.service.mark(emp, day, AttendanceAction::CheckIn).await.unwrap();
        match f.service.mark(emp, day, AttendanceAction::CheckIn).await {
            Err(AppError::Conflict { message, .. }) => assert_eq!(message, ALREADY_CHECKED_IN),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[actix_web::test]
    async fn check_out_without_record_is_a_validation_error() {
        let f = fixture();
        let emp = employee(&f.repos, "Sarah", None).await;

        match f.service.mark(emp, date("2024-01-10"), AttendanceAction::CheckOut).await {
            Err(AppError::Validation { details, .. }) => assert_eq!(details[0].field, "action"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[actix_web::test]
    async fn check_out_twice_conflicts() {
        let f = fixture();
        let emp = employee(&f.repos, "Sarah", None).await;
        let day = date("2024-01-10");

        f.service.mark(emp, day, AttendanceAction::CheckIn).await.unwrap();
        f.clock.set_time("17:00:00");
        f.service.mark(emp, day, AttendanceAction::CheckOut).await.unwrap();
        match f.service.mark(emp, day, AttendanceAction::CheckOut).await {
            Err(AppError::Conflict { message, .. }) => assert_eq!(message, ALREADY_CHECKED_OUT),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[actix_web::test]
    async fn mark_for_unknown_employee_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.service.mark(12, date("2024-01-10"), AttendanceAction::CheckIn).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn check_in_fills_existing_record_without_touching_check_out() {
        let f = fixture();
        let emp = employee(&f.repos, "Sarah", None).await;
        let created = f
            .service
            .create(CreateAttendance {
                status: Some(AttendanceStatus::Absent),
                check_out: Some(time("18:00:00")),
                ..create_input(emp, "2024-01-10")
            })
            .await
            .unwrap();

        let marked = f
            .service
            .mark(emp, date("2024-01-10"), AttendanceAction::CheckIn)
            .await
            .unwrap();

        assert_eq!(marked.id, created.id);
        assert_eq!(marked.check_in, Some(time("08:55:00")));
        assert_eq!(marked.check_out, Some(time("18:00:00")));
        assert_eq!(marked.status, AttendanceStatus::Present);
    }

    #[actix_web::test]
    async fn late_check_in_keeps_present_status() {
        let f = fixture();
        let emp = employee(&f.repos, "Sarah", None).await;
        f.clock.set_time("09:45:00");

        let view = f
            .service
            .mark(emp, date("2024-01-10"), AttendanceAction::CheckIn)
            .await
            .unwrap();
        assert_eq!(view.status, AttendanceStatus::Present);
    }

    #[actix_web::test]
    async fn check_in_then_check_out_keeps_one_record() {
        let f = fixture();
        let emp = employee(&f.repos, "Sarah", None).await;
        let day = date("2024-01-10");

        let checked_in = f.service.mark(emp, day, AttendanceAction::CheckIn).await.unwrap();
        assert_eq!(checked_in.check_in, Some(time("08:55:00")));
        assert_eq!(checked_in.check_out, None);

        f.clock.set_time("17:00:00");
        let completed = f.service.mark(emp, day, AttendanceAction::CheckOut).await.unwrap();
        assert_eq!(completed.id, checked_in.id);
        assert_eq!(completed.check_out, Some(time("17:00:00")));

        let rows = f
            .repos
            .attendance
            .count(&AttendanceCriteria::for_employee(emp))
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    fn interleaved_fixture() -> Fixture {
        let repos = Repositories::memory_interleaved();
        let clock = Arc::new(FixedClock::at("2024-01-10", "08:55:00"));
        let service = AttendanceService::new(repos.clone(), clock.clone());
        Fixture { repos, clock, service }
    }

    fn assert_one_winner(results: &[AppResult<AttendanceView>], conflict_message: &str) {
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            match err {
                AppError::Conflict { message, .. } => assert_eq!(message, conflict_message),
                other => panic!("expected conflict, got {other:?}"),
            }
        }
    }

    async fn day_rows(repos: &Repositories, employee_id: u64) -> i64 {
        repos
            .attendance
            .count(&AttendanceCriteria::for_employee(employee_id))
            .await
            .unwrap()
    }

    #[actix_web::test]
    async fn interleaved_repository_suspends_between_calls() {
        let f = interleaved_fixture();
        let emp = employee(&f.repos, "Sarah", None).await;

        let mut call = Box::pin(f.service.create(create_input(emp, "2024-01-10")));
        let waker = futures::task::noop_waker();
        let mut cx = std::task::Context::from_waker(&waker);
        assert!(call.poll_unpin(&mut cx).is_pending());
    }

    #[actix_web::test]
    async fn concurrent_creates_leave_one_record() {
        let f = interleaved_fixture();
        let emp = employee(&f.repos, "Sarah", None).await;

        let attempts = (0..8).map(|_| f.service.create(create_input(emp, "2024-01-10")));
        let results = futures::future::join_all(attempts).await;

        assert_one_winner(&results, ATTENDANCE_EXISTS);
        assert_eq!(day_rows(&f.repos, emp).await, 1);
    }

    #[actix_web::test]
    async fn concurrent_first_check_ins_leave_one_record() {
        let f = interleaved_fixture();
        let emp = employee(&f.repos, "Sarah", None).await;
        let day = date("2024-01-10");

        let attempts = (0..8).map(|_| f.service.mark(emp, day, AttendanceAction::CheckIn));
        let results = futures::future::join_all(attempts).await;

        assert_one_winner(&results, ALREADY_CHECKED_IN);
        assert_eq!(day_rows(&f.repos, emp).await, 1);
    }

    #[actix_web::test]
    async fn concurrent_check_ins_on_existing_record_fill_it_once() {
        let f = interleaved_fixture();
        let emp = employee(&f.repos, "Sarah", None).await;
        let day = date("2024-01-10");
        let created = f
            .service
            .create(CreateAttendance {
                status: Some(AttendanceStatus::Absent),
                ..create_input(emp, "2024-01-10")
            })
            .await
            .unwrap();

        let early = f.service.mark(emp, day, AttendanceAction::CheckIn);
        let late = async {
            f.clock.set_time("09:30:00");
            f.service.mark(emp, day, AttendanceAction::CheckIn).await
        };
        let (early, late) = futures::join!(early, late);

        assert_one_winner(&[early, late], ALREADY_CHECKED_IN);
        let stored = f.service.get(created.id).await.unwrap();
        assert!(stored.check_in.is_some());
        assert_eq!(stored.status, AttendanceStatus::Present);
        assert_eq!(day_rows(&f.repos, emp).await, 1);
    }

    #[actix_web::test]
    async fn concurrent_check_outs_keep_the_first_time() {
        let f = interleaved_fixture();
        let emp = employee(&f.repos, "Sarah", None).await;
        let day = date("2024-01-10");
        f.service.mark(emp, day, AttendanceAction::CheckIn).await.unwrap();
        f.clock.set_time("17:00:00");

        let attempts = (0..2).map(|_| f.service.mark(emp, day, AttendanceAction::CheckOut));
        let results = futures::future::join_all(attempts).await;

        assert_one_winner(&results, ALREADY_CHECKED_OUT);
        let winner = results.into_iter().find_map(Result::ok).unwrap();
        assert_eq!(winner.check_out, Some(time("17:00:00")));
    }

    #[actix_web::test]
    async fn conditional_writes_leave_set_times_alone() {
        let f = fixture();
        let emp = employee(&f.repos, "Sarah", None).await;
        let day = date("2024-01-10");
        let view = f.service.mark(emp, day, AttendanceAction::CheckIn).await.unwrap();

        assert!(f.repos.attendance.record_check_out(view.id, time("17:00:00")).await.unwrap());
        assert!(!f.repos.attendance.record_check_out(view.id, time("18:00:00")).await.unwrap());
        assert!(!f.repos.attendance.record_check_in(view.id, time("09:00:00")).await.unwrap());

        let stored = f.service.get(view.id).await.unwrap();
        assert_eq!(stored.check_in, Some(time("08:55:00")));
        assert_eq!(stored.check_out, Some(time("17:00:00")));
    }

    #[actix_web::test]
    async fn list_orders_by_date_then_name_and_range_wins_over_date() {
        let f = fixture();
        let zoe = employee(&f.repos, "Zoe", None).await;
        let adam = employee(&f.repos, "Adam", None).await;

        for (emp, day) in [(zoe, "2024-01-09"), (zoe, "2024-01-10"), (adam, "2024-01-10"), (adam, "2024-01-20")] {
            f.service.create(create_input(emp, day)).await.unwrap();
        }

        let all = f.service.list(&AttendanceFilter::default()).await.unwrap();
        let order: Vec<(String, Option<String>)> = all
            .iter()
            .map(|v| (v.date.to_string(), v.first_name.clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("2024-01-20".to_string(), Some("Adam".to_string())),
                ("2024-01-10".to_string(), Some("Adam".to_string())),
                ("2024-01-10".to_string(), Some("Zoe".to_string())),
                ("2024-01-09".to_string(), Some("Zoe".to_string())),
            ]
        );

        let single_day = f
            .service
            .list(&AttendanceFilter {
                date: Some(date("2024-01-10")),
                ..AttendanceFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(single_day.len(), 2);

        let both = f
            .service
            .list(&AttendanceFilter {
                date: Some(date("2024-01-10")),
                employee_id: Some(zoe),
                range: DateRange::new(date("2024-01-01"), date("2024-01-31")),
            })
            .await
            .unwrap();
        assert_eq!(both.len(), 2);
        assert!(both.iter().all(|v| v.employee_id == zoe));
    }
}
