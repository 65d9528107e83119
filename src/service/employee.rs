use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::model::employee::{Employee, EmployeeChanges, EmployeeCriteria, EmployeeStatus, NewEmployee};
use crate::presenter::{EmployeeView, Presenter};
use crate::repository::{Repositories, StorageError};
use crate::service::guard::{EMPLOYEE_NOT_FOUND, ReferentialGuard, dangling_department, employee_in_use};

pub const EMAIL_EXISTS: &str = "Employee with this email already exists";
pub const EMAIL_TAKEN: &str = "Email already taken by another employee";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateEmployee {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub position: String,
    pub department_id: Option<u64>,
    pub hire_date: Option<NaiveDate>,
    pub salary: Option<f64>,
    pub status: Option<EmployeeStatus>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn normalize_phone(phone: String) -> Option<String> {
    let phone = phone.trim();
    (!phone.is_empty()).then(|| phone.to_string())
}

/// Translates constraint failures that raced past the pre-checks.
fn write_error(duplicate_message: &'static str) -> impl FnOnce(StorageError) -> AppError {
    move |err| match err {
        StorageError::UniqueViolation { .. } => AppError::conflict(duplicate_message),
        StorageError::ForeignKeyViolation { .. } => dangling_department(),
        other => AppError::Storage(other),
    }
}

#[derive(Clone)]
pub struct EmployeeService {
    repos: Repositories,
    guard: ReferentialGuard,
    presenter: Presenter,
    clock: Arc<dyn Clock>,
}

impl EmployeeService {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self {
            guard: ReferentialGuard::new(repos.clone()),
            presenter: Presenter::new(repos.employees.clone(), repos.departments.clone()),
            repos,
            clock,
        }
    }

    pub async fn list(&self, criteria: &EmployeeCriteria) -> AppResult<Vec<EmployeeView>> {
        let employees = self.repos.employees.find_many(criteria).await?;
        Ok(self.presenter.employee_list(employees).await?)
    }

    pub async fn get(&self, id: u64) -> AppResult<EmployeeView> {
        let employee = self.find(id).await?;
        Ok(self.presenter.employee(employee).await?)
    }

    pub async fn create(&self, input: CreateEmployee) -> AppResult<EmployeeView> {
        let employee = NewEmployee {
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            email: normalize_email(&input.email),
            phone: input.phone.and_then(normalize_phone),
            position: input.position.trim().to_string(),
            department_id: input.department_id,
            hire_date: input.hire_date,
            salary: input.salary,
            status: input.status.unwrap_or_default(),
        };

        self.check_hire_date(employee.hire_date)?;
        check_salary(employee.salary)?;
        self.guard
            .ensure_email_available(&employee.email, None, EMAIL_EXISTS)
            .await?;
        self.guard.require_department_ref(employee.department_id).await?;

        let id = self
            .repos
            .employees
            .insert(&employee)
            .await
            .map_err(write_error(EMAIL_EXISTS))?;

        info!(id, email = %employee.email, "Employee created");
        self.get(id).await
    }

    pub async fn update(&self, id: u64, mut changes: EmployeeChanges) -> AppResult<EmployeeView> {
        self.find(id).await?;

        changes.first_name = changes.first_name.map(|v| v.trim().to_string());
        changes.last_name = changes.last_name.map(|v| v.trim().to_string());
        changes.position = changes.position.map(|v| v.trim().to_string());
        changes.email = changes.email.as_deref().map(normalize_email);
        changes.phone = std::mem::take(&mut changes.phone).and_then(normalize_phone);

        self.check_hire_date(changes.hire_date.value().copied())?;
        check_salary(changes.salary.value().copied())?;
        if let Some(email) = &changes.email {
            self.guard.ensure_email_available(email, Some(id), EMAIL_TAKEN).await?;
        }
        self.guard
            .require_department_ref(changes.department_id.value().copied())
            .await?;

        self.repos
            .employees
            .update(id, &changes)
            .await
            .map_err(write_error(EMAIL_TAKEN))?;

        info!(id, "Employee updated");
        self.get(id).await
    }

    pub async fn delete(&self, id: u64) -> AppResult<()> {
        self.find(id).await?;
        self.guard.ensure_employee_unreferenced(id).await?;

        self.repos.employees.delete(id).await.map_err(|err| match err {
            StorageError::ForeignKeyViolation { .. } => employee_in_use(None),
            other => AppError::Storage(other),
        })?;

        info!(id, "Employee deleted");
        Ok(())
    }

    fn check_hire_date(&self, hire_date: Option<NaiveDate>) -> AppResult<()> {
        match hire_date {
            Some(date) if date > self.clock.today() => Err(AppError::validation(
                "Invalid input data",
                "hire_date",
                "Hire date cannot be in the future",
            )),
            _ => Ok(()),
        }
    }

    async fn find(&self, id: u64) -> AppResult<Employee> {
        self.repos
            .employees
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(EMPLOYEE_NOT_FOUND))
    }
}

fn check_salary(salary: Option<f64>) -> AppResult<()> {
    match salary {
        Some(salary) if !salary.is_finite() || salary < 0.0 => Err(AppError::validation(
            "Invalid input data",
            "salary",
            "Salary must be a positive number",
        )),
        _ => Ok(()),
    }
}
