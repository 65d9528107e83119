use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::model::{
    department::{Department, DepartmentChanges, DepartmentHeadcount, NewDepartment},
    employee::{Employee, EmployeeCriteria},
};
use crate::repository::{Repositories, StorageError};
use crate::service::guard::{DEPARTMENT_NOT_FOUND, ReferentialGuard, department_in_use, unique_as_conflict};

pub const NAME_EXISTS: &str = "Department with this name already exists";
pub const NAME_TAKEN: &str = "Department name already taken";

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EmployeeSummary {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub position: String,
}

impl From<Employee> for EmployeeSummary {
    fn from(e: Employee) -> Self {
        Self {
            id: e.id,
            first_name: e.first_name,
            last_name: e.last_name,
            email: e.email,
            position: e.position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DepartmentDetail {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub employees: Vec<EmployeeSummary>,
}

fn normalize_description(description: String) -> Option<String> {
    let description = description.trim();
    (!description.is_empty()).then(|| description.to_string())
}

#[derive(Clone)]
pub struct DepartmentService {
    repos: Repositories,
    guard: ReferentialGuard,
}

impl DepartmentService {
    pub fn new(repos: Repositories) -> Self {
        Self {
            guard: ReferentialGuard::new(repos.clone()),
            repos,
        }
    }

    pub async fn list(&self) -> AppResult<Vec<DepartmentHeadcount>> {
        Ok(self.repos.departments.headcounts().await?)
    }

    pub async fn get(&self, id: u64) -> AppResult<DepartmentDetail> {
        let department = self.find(id).await?;
        let mut employees = self
            .repos
            .employees
            .find_many(&EmployeeCriteria::in_department(id))
            .await?;
        employees.sort_by(|a, b| {
            a.first_name
                .cmp(&b.first_name)
                .then_with(|| a.last_name.cmp(&b.last_name))
        });

        Ok(DepartmentDetail {
            id: department.id,
            name: department.name,
            description: department.description,
            employees: employees.into_iter().map(EmployeeSummary::from).collect(),
        })
    }

    pub async fn create(&self, name: &str, description: Option<String>) -> AppResult<Department> {
        let department = NewDepartment {
            name: name.trim().to_string(),
            description: description.and_then(normalize_description),
        };

        self.guard
            .ensure_department_name_available(&department.name, None, NAME_EXISTS)
            .await?;

        let id = self
            .repos
            .departments
            .insert(&department)
            .await
            .map_err(unique_as_conflict(NAME_EXISTS))?;

        info!(id, name = %department.name, "Department created");
        self.find(id).await
    }

    pub async fn update(&self, id: u64, mut changes: DepartmentChanges) -> AppResult<Department> {
        self.find(id).await?;

        changes.name = changes.name.map(|n| n.trim().to_string());
        changes.description = std::mem::take(&mut changes.description).and_then(normalize_description);

        if let Some(name) = &changes.name {
            self.guard
                .ensure_department_name_available(name, Some(id), NAME_TAKEN)
                .await?;
        }

        self.repos
            .departments
            .update(id, &changes)
            .await
            .map_err(unique_as_conflict(NAME_TAKEN))?;

        info!(id, "Department updated");
        self.find(id).await
    }

    pub async fn delete(&self, id: u64) -> AppResult<()> {
        self.find(id).await?;
        self.guard.ensure_department_empty(id).await?;

        self.repos.departments.delete(id).await.map_err(|err| match err {
            StorageError::ForeignKeyViolation { .. } => department_in_use(None),
            other => AppError::Storage(other),
        })?;

        info!(id, "Department deleted");
        Ok(())
    }

    async fn find(&self, id: u64) -> AppResult<Department> {
        self.repos
            .departments
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(DEPARTMENT_NOT_FOUND))
    }
}
