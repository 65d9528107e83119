//! Read-only aggregates for the attendance and dashboard endpoints.

use std::sync::Arc;

use chrono::NaiveTime;
use serde::Serialize;
use utoipa::ToSchema;

use crate::clock::Clock;
use crate::error::AppResult;
use crate::model::{
    attendance::{AttendanceCriteria, AttendanceStatus, DateRange},
    employee::{EmployeeCriteria, EmployeeStatus},
};
use crate::presenter::{AttendanceView, EmployeeView, Presenter};
use crate::repository::Repositories;

/// Check-ins strictly after this time count as late.
pub fn late_threshold() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

const DASHBOARD_TOP_DEPARTMENTS: usize = 5;
const DASHBOARD_RECENT_HIRES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub total_records: i64,
    pub present_count: i64,
    pub absent_count: i64,
    pub late_count: i64,
    /// Today's roster regardless of the requested range.
    pub today_attendance: Vec<AttendanceView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DepartmentCount {
    pub id: u64,
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_employees: i64,
    pub active_employees: i64,
    pub total_departments: i64,
    pub today_attendance: i64,
    pub today_present: i64,
    pub employees_by_department: Vec<DepartmentCount>,
    pub recent_hires: Vec<EmployeeView>,
}

#[derive(Clone)]
pub struct StatisticsService {
    repos: Repositories,
    presenter: Presenter,
    clock: Arc<dyn Clock>,
}

impl StatisticsService {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self {
            presenter: Presenter::new(repos.employees.clone(), repos.departments.clone()),
            repos,
            clock,
        }
    }

    pub async fn attendance_stats(&self, range: Option<DateRange>) -> AppResult<AttendanceStats> {
        let scope = AttendanceCriteria {
            dates: range,
            ..AttendanceCriteria::default()
        };
        let with_status = |status| AttendanceCriteria {
            status: Some(status),
            ..scope.clone()
        };
        let late = AttendanceCriteria {
            checked_in_after: Some(late_threshold()),
            ..with_status(AttendanceStatus::Present)
        };

        let attendance = &self.repos.attendance;
        let total_records = attendance.count(&scope).await?;
        let present_count = attendance.count(&with_status(AttendanceStatus::Present)).await?;
        let absent_count = attendance.count(&with_status(AttendanceStatus::Absent)).await?;
        let late_count = attendance.count(&late).await?;

        let today = attendance
            .find_many(&AttendanceCriteria::on(self.clock.today()))
            .await?;
        let mut today_attendance = self.presenter.attendance_list(today).await?;
        today_attendance.sort_by(|a, b| a.first_name.cmp(&b.first_name));

        Ok(AttendanceStats {
            total_records,
            present_count,
            absent_count,
            late_count,
            today_attendance,
        })
    }

    pub async fn dashboard(&self) -> AppResult<DashboardStats> {
        let today = AttendanceCriteria::on(self.clock.today());
        let today_present = AttendanceCriteria {
            status: Some(AttendanceStatus::Present),
            ..today.clone()
        };

        let mut headcounts = self.repos.departments.headcounts().await?;
        headcounts.sort_by(|a, b| b.employee_count.cmp(&a.employee_count));
        let employees_by_department = headcounts
            .into_iter()
            .take(DASHBOARD_TOP_DEPARTMENTS)
            .map(|d| DepartmentCount {
                id: d.id,
                name: d.name,
                count: d.employee_count,
            })
            .collect();

        let hires = self.repos.employees.recent_hires(DASHBOARD_RECENT_HIRES).await?;

        Ok(DashboardStats {
            total_employees: self.repos.employees.count(&EmployeeCriteria::default()).await?,
            active_employees: self
                .repos
                .employees
                .count(&EmployeeCriteria::with_status(EmployeeStatus::Active))
                .await?,
            total_departments: self.repos.departments.count().await?,
            today_attendance: self.repos.attendance.count(&today).await?,
            today_present: self.repos.attendance.count(&today_present).await?,
            employees_by_department,
            recent_hires: self.presenter.employee_list(hires).await?,
        })
    }
}
