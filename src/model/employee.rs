use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::utils::patch::Patch;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmployeeStatus {
    #[default]
    Active,
    Inactive,
}

impl TryFrom<String> for EmployeeStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "first_name": "John",
        "last_name": "Smith",
        "email": "john.smith@hrms.com",
        "phone": "+1-555-0101",
        "position": "Senior Software Engineer",
        "department_id": 2,
        "hire_date": "2022-01-15",
        "salary": 95000.0,
        "status": "active"
    })
)]
pub struct Employee {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[schema(nullable = true)]
    pub phone: Option<String>,
    pub position: String,
    #[schema(nullable = true)]
    pub department_id: Option<u64>,
    #[schema(value_type = Option<String>, format = "date")]
    pub hire_date: Option<NaiveDate>,
    #[schema(nullable = true)]
    pub salary: Option<f64>,
    #[sqlx(try_from = "String")]
    pub status: EmployeeStatus,
}

/// Normalised insert payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub position: String,
    pub department_id: Option<u64>,
    pub hire_date: Option<NaiveDate>,
    pub salary: Option<f64>,
    pub status: EmployeeStatus,
}

/// Partial update; required columns can only be replaced, nullable ones can
/// also be cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Patch<String>,
    pub position: Option<String>,
    pub department_id: Patch<u64>,
    pub hire_date: Patch<NaiveDate>,
    pub salary: Patch<f64>,
    pub status: Option<EmployeeStatus>,
}

impl EmployeeChanges {
    #[cfg(test)]
    pub fn apply_to(&self, employee: &mut Employee) {
        if let Some(v) = &self.first_name {
            employee.first_name = v.clone();
        }
        if let Some(v) = &self.last_name {
            employee.last_name = v.clone();
        }
        if let Some(v) = &self.email {
            employee.email = v.clone();
        }
        employee.phone = self.phone.clone().merge(employee.phone.take());
        if let Some(v) = &self.position {
            employee.position = v.clone();
        }
        employee.department_id = self.department_id.clone().merge(employee.department_id);
        employee.hire_date = self.hire_date.clone().merge(employee.hire_date);
        employee.salary = self.salary.clone().merge(employee.salary);
        if let Some(v) = self.status {
            employee.status = v;
        }
    }
}

/// Filters for employee listings. Search matches name, email and position.
#[derive(Debug, Clone, Default)]
pub struct EmployeeCriteria {
    pub search: Option<String>,
    pub department_id: Option<u64>,
    pub status: Option<EmployeeStatus>,
}

impl EmployeeCriteria {
    pub fn in_department(department_id: u64) -> Self {
        Self {
            department_id: Some(department_id),
            ..Self::default()
        }
    }

    pub fn with_status(status: EmployeeStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn matches(&self, employee: &Employee) -> bool {
        if self.department_id.is_some() && employee.department_id != self.department_id {
            return false;
        }
        if self.status.is_some_and(|s| s != employee.status) {
            return false;
        }
        match &self.search {
            Some(term) => {
                let term = term.to_lowercase();
                [
                    &employee.first_name,
                    &employee.last_name,
                    &employee.email,
                    &employee.position,
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&term))
            }
            None => true,
        }
    }
}
