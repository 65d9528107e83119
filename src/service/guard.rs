//! Cross-entity checks run before a write.
//!
//! These pre-checks give callers a precise error; the storage constraints
//! remain the authority when two requests race past the same check.

use chrono::NaiveDate;

use crate::error::{AppError, AppResult};
use crate::model::{
    attendance::{Attendance, AttendanceCriteria},
    department::Department,
    employee::{Employee, EmployeeCriteria},
};
use crate::repository::{Repositories, StorageError};

pub const EMPLOYEE_NOT_FOUND: &str = "Employee not found";
pub const DEPARTMENT_NOT_FOUND: &str = "Department not found";
pub const ATTENDANCE_EXISTS: &str = "Attendance record already exists for this date";
pub const DEPARTMENT_IN_USE: &str = "Cannot delete department with assigned employees";
pub const EMPLOYEE_IN_USE: &str = "Cannot delete employee with attendance records";

#[derive(Clone)]
pub struct ReferentialGuard {
    repos: Repositories,
}

impl ReferentialGuard {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Employee path/body references: a missing employee is a 404.
    pub async fn require_employee(&self, employee_id: u64) -> AppResult<Employee> {
        self.repos
            .employees
            .find_by_id(employee_id)
            .await?
            .ok_or_else(|| AppError::not_found(EMPLOYEE_NOT_FOUND))
    }

    /// Department references supplied in an employee payload: a dangling
    /// reference is bad input, not a missing resource.
    pub async fn require_department_ref(&self, department_id: Option<u64>) -> AppResult<Option<Department>> {
        let Some(id) = department_id else {
            return Ok(None);
        };
        match self.repos.departments.find_by_id(id).await? {
            Some(department) => Ok(Some(department)),
            None => Err(dangling_department()),
        }
    }

    pub async fn ensure_department_empty(&self, department_id: u64) -> AppResult<()> {
        let count = self
            .repos
            .employees
            .count(&EmployeeCriteria::in_department(department_id))
            .await?;

        if count > 0 {
            return Err(department_in_use(Some(count)));
        }
        Ok(())
    }

    pub async fn ensure_employee_unreferenced(&self, employee_id: u64) -> AppResult<()> {
        let count = self
            .repos
            .attendance
            .count(&AttendanceCriteria::for_employee(employee_id))
            .await?;

        if count > 0 {
            return Err(employee_in_use(Some(count)));
        }
        Ok(())
    }

    /// `except` skips the row being updated.
    pub async fn ensure_email_available(&self, email: &str, except: Option<u64>, message: &str) -> AppResult<()> {
        match self.repos.employees.find_by_email(email).await? {
            Some(existing) if Some(existing.id) != except => Err(AppError::conflict(message)),
            _ => Ok(()),
        }
    }

    pub async fn ensure_department_name_available(
        &self,
        name: &str,
        except: Option<u64>,
        message: &str,
    ) -> AppResult<()> {
        match self.repos.departments.find_by_name(name).await? {
            Some(existing) if Some(existing.id) != except => Err(AppError::conflict(message)),
            _ => Ok(()),
        }
    }

    pub async fn find_day_record(&self, employee_id: u64, date: NaiveDate) -> AppResult<Option<Attendance>> {
        Ok(self
            .repos
            .attendance
            .find_by_employee_and_date(employee_id, date)
            .await?)
    }

    pub async fn ensure_no_day_record(&self, employee_id: u64, date: NaiveDate) -> AppResult<()> {
        if self.find_day_record(employee_id, date).await?.is_some() {
            return Err(AppError::conflict(ATTENDANCE_EXISTS));
        }
        Ok(())
    }
}

pub fn dangling_department() -> AppError {
    AppError::validation(
        DEPARTMENT_NOT_FOUND,
        "department_id",
        "The specified department does not exist",
    )
}

pub fn department_in_use(count: Option<i64>) -> AppError {
    let count_text = count.map_or_else(|| "assigned".to_string(), |c| c.to_string());
    AppError::in_use(
        DEPARTMENT_IN_USE,
        "department_id",
        count,
        format!("Department has {count_text} employee(s). Please reassign employees first."),
    )
}

pub fn employee_in_use(count: Option<i64>) -> AppError {
    let count_text = count.map_or_else(|| "existing".to_string(), |c| c.to_string());
    AppError::in_use(
        EMPLOYEE_IN_USE,
        "employee_id",
        count,
        format!("Employee has {count_text} attendance record(s). Please delete attendance records first."),
    )
}

/// Maps a storage-layer unique violation to the conflict the pre-check would
/// have reported; anything else passes through.
pub fn unique_as_conflict(message: &'static str) -> impl FnOnce(StorageError) -> AppError {
    move |err| match err {
        StorageError::UniqueViolation { constraint } => {
            tracing::warn!(constraint = %constraint, "Unique constraint raced past pre-check");
            AppError::conflict(message)
        }
        other => AppError::Storage(other),
    }
}
