//! Response shaping: joins display fields from employees and departments onto
//! stored rows.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::{
    attendance::{Attendance, AttendanceStatus},
    department::Department,
    employee::{Employee, EmployeeStatus},
};
use crate::repository::{DepartmentRepository, EmployeeRepository, StorageResult};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[schema(example = json!({
    "id": 12,
    "employee_id": 1,
    "date": "2024-01-10",
    "check_in": "08:55:00",
    "check_out": "17:00:00",
    "status": "present",
    "notes": null,
    "first_name": "John",
    "last_name": "Smith",
    "email": "john.smith@hrms.com",
    "position": "Senior Software Engineer",
    "department_name": "Engineering"
}))]
pub struct AttendanceView {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, example = "08:55:00")]
    pub check_in: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "17:00:00")]
    pub check_out: Option<NaiveTime>,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
    /// `null` when the employee has no department.
    pub department_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EmployeeView {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub position: String,
    pub department_id: Option<u64>,
    pub department_name: Option<String>,
    #[schema(value_type = Option<String>, format = "date")]
    pub hire_date: Option<NaiveDate>,
    pub salary: Option<f64>,
    pub status: EmployeeStatus,
}

pub fn format_attendance(
    record: Attendance,
    employee: Option<&Employee>,
    department: Option<&Department>,
) -> AttendanceView {
    AttendanceView {
        id: record.id,
        employee_id: record.employee_id,
        date: record.date,
        check_in: record.check_in,
        check_out: record.check_out,
        status: record.status,
        notes: record.notes,
        first_name: employee.map(|e| e.first_name.clone()),
        last_name: employee.map(|e| e.last_name.clone()),
        email: employee.map(|e| e.email.clone()),
        position: employee.map(|e| e.position.clone()),
        department_name: department.map(|d| d.name.clone()),
    }
}

pub fn format_employee(employee: Employee, department: Option<&Department>) -> EmployeeView {
    EmployeeView {
        id: employee.id,
        first_name: employee.first_name,
        last_name: employee.last_name,
        email: employee.email,
        phone: employee.phone,
        position: employee.position,
        department_id: employee.department_id,
        department_name: department.map(|d| d.name.clone()),
        hire_date: employee.hire_date,
        salary: employee.salary,
        status: employee.status,
    }
}

/// Batches the lookups for a page of rows: one query for employees and one
/// for departments, regardless of the number of rows.
#[derive(Clone)]
pub struct Presenter {
    employees: Arc<dyn EmployeeRepository>,
    departments: Arc<dyn DepartmentRepository>,
}

impl Presenter {
    pub fn new(employees: Arc<dyn EmployeeRepository>, departments: Arc<dyn DepartmentRepository>) -> Self {
        Self { employees, departments }
    }

    pub async fn attendance(&self, record: Attendance) -> StorageResult<AttendanceView> {
        let mut views = self.attendance_list(vec![record]).await?;
        Ok(views.remove(0))
    }

    pub async fn attendance_list(&self, records: Vec<Attendance>) -> StorageResult<Vec<AttendanceView>> {
        let employee_ids = unique_ids(records.iter().map(|r| Some(r.employee_id)));
        let employees = self.employee_map(&employee_ids).await?;

        let department_ids = unique_ids(employees.values().map(|e| e.department_id));
        let departments = self.department_map(&department_ids).await?;

        Ok(records
            .into_iter()
            .map(|record| {
                let employee = employees.get(&record.employee_id);
                let department = employee
                    .and_then(|e| e.department_id)
                    .and_then(|id| departments.get(&id));
                format_attendance(record, employee, department)
            })
            .collect())
    }

    pub async fn employee(&self, employee: Employee) -> StorageResult<EmployeeView> {
        let mut views = self.employee_list(vec![employee]).await?;
        Ok(views.remove(0))
    }

    pub async fn employee_list(&self, employees: Vec<Employee>) -> StorageResult<Vec<EmployeeView>> {
        let department_ids = unique_ids(employees.iter().map(|e| e.department_id));
        let departments = self.department_map(&department_ids).await?;

        Ok(employees
            .into_iter()
            .map(|employee| {
                let department = employee.department_id.and_then(|id| departments.get(&id));
                format_employee(employee, department)
            })
            .collect())
    }

    async fn employee_map(&self, ids: &[u64]) -> StorageResult<HashMap<u64, Employee>> {
        Ok(self
            .employees
            .find_by_ids(ids)
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect())
    }

    async fn department_map(&self, ids: &[u64]) -> StorageResult<HashMap<u64, Department>> {
        Ok(self
            .departments
            .find_by_ids(ids)
            .await?
            .into_iter()
            .map(|d| (d.id, d))
            .collect())
    }
}

fn unique_ids(ids: impl Iterator<Item = Option<u64>>) -> Vec<u64> {
    let mut ids: Vec<u64> = ids.flatten().collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}
