use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use crate::api::response::{ApiResponse, created, message, ok};
use crate::api::validation::{Validator, path_id};
use crate::auth::auth::AuthUser;
use crate::error::AppResult;
use crate::model::department::DepartmentChanges;
use crate::state::AppState;
use crate::utils::patch::Patch;

const DESCRIPTION_MAX_LEN: usize = 500;

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateDepartmentRequest {
    #[schema(example = "Engineering")]
    pub name: String,
    #[schema(example = "Software development and product engineering")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDepartmentRequest {
    pub name: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub description: Patch<String>,
}

/// List departments
#[utoipa::path(
    get,
    path = "/api/departments",
    responses(
        (status = 200, description = "Departments ordered by name with headcount", body = Object, example = json!({
            "success": true,
            "data": [{"id": 2, "name": "Engineering", "description": null, "employee_count": 12}],
            "count": 1
        }))
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn list_departments(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let departments = state.departments.list().await?;
    Ok(ok(ApiResponse::list(departments)))
}

/// Get department with its employees
#[utoipa::path(
    get,
    path = "/api/departments/{id}",
    params(("id" = u64, Path, description = "Department id")),
    responses(
        (status = 200, description = "Department and member summaries"),
        (status = 404, description = "Department not found")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn get_department(state: web::Data<AppState>, path: web::Path<u64>) -> AppResult<HttpResponse> {
    let id = path_id(path.into_inner(), "Department")?;
    let department = state.departments.get(id).await?;
    Ok(ok(ApiResponse::data(department)))
}

/// Create department
#[utoipa::path(
    post,
    path = "/api/departments",
    request_body = CreateDepartmentRequest,
    responses(
        (status = 201, description = "Department created successfully"),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Department with this name already exists")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn create_department(
    state: web::Data<AppState>,
    payload: web::Json<CreateDepartmentRequest>,
) -> AppResult<HttpResponse> {
    let body = payload.into_inner();
    let mut v = Validator::new();
    v.department_name(&body.name, "name");
    v.text(body.description.as_deref(), "description", "Description", DESCRIPTION_MAX_LEN);
    v.finish()?;

    let department = state.departments.create(&body.name, body.description).await?;
    Ok(created(
        ApiResponse::data(department).with_message("Department created successfully"),
    ))
}

/// Update department
#[utoipa::path(
    put,
    path = "/api/departments/{id}",
    params(("id" = u64, Path, description = "Department id")),
    request_body = UpdateDepartmentRequest,
    responses(
        (status = 200, description = "Department updated successfully"),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Department name already taken")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn update_department(
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<UpdateDepartmentRequest>,
) -> AppResult<HttpResponse> {
    let id = path_id(path.into_inner(), "Department")?;
    let body = payload.into_inner();
    let mut v = Validator::new();
    if let Some(name) = &body.name {
        v.department_name(name, "name");
    }
    v.text(
        body.description.value().map(String::as_str),
        "description",
        "Description",
        DESCRIPTION_MAX_LEN,
    );
    v.finish()?;

    let changes = DepartmentChanges {
        name: body.name,
        description: body.description,
    };
    let department = state.departments.update(id, changes).await?;
    Ok(ok(
        ApiResponse::data(department).with_message("Department updated successfully"),
    ))
}

/// Delete department
#[utoipa::path(
    delete,
    path = "/api/departments/{id}",
    params(("id" = u64, Path, description = "Department id")),
    responses(
        (status = 200, description = "Department deleted successfully"),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Department still has employees", body = Object, example = json!({
            "success": false, "error": "Conflict",
            "message": "Cannot delete department with assigned employees",
            "details": [{"field": "department_id", "message": "Department has 2 employee(s). Please reassign employees first."}],
            "count": 2
        }))
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn delete_department(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let id = path_id(path.into_inner(), "Department")?;
    state.departments.delete(id).await?;
    info!(
        by = user.user_id,
        email = %user.email,
        role = %user.role,
        department_id = id,
        "Department deleted"
    );
    Ok(message("Department deleted successfully"))
}
