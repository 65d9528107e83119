use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::utils::patch::Patch;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Department {
    #[schema(example = 2)]
    pub id: u64,
    #[schema(example = "Engineering")]
    pub name: String,
    #[schema(example = "Software development and product engineering", nullable = true)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
pub struct DepartmentHeadcount {
    pub id: u64,
    pub name: String,
    #[schema(nullable = true)]
    pub description: Option<String>,
    pub employee_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDepartment {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepartmentChanges {
    pub name: Option<String>,
    pub description: Patch<String>,
}
