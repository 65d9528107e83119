use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::api::response::{ApiResponse, created, message, ok};
use crate::api::validation::{Validator, path_id};
use crate::auth::auth::AuthUser;
use crate::error::AppResult;
use crate::model::employee::{EmployeeChanges, EmployeeCriteria, EmployeeStatus};
use crate::service::employee::CreateEmployee;
use crate::state::AppState;
use crate::utils::patch::Patch;

const HIRE_DATE_FORMAT: &str = "Hire date must be a valid date (YYYY-MM-DD)";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmployeeQuery {
    /// Matches name, email or position.
    pub search: Option<String>,
    pub department_id: Option<u64>,
    /// `active` or `inactive`.
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateEmployeeRequest {
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Smith")]
    pub last_name: String,
    #[schema(example = "john.smith@hrms.com", format = "email")]
    pub email: String,
    #[schema(example = "+1-555-0101")]
    pub phone: Option<String>,
    #[schema(example = "Senior Software Engineer")]
    pub position: String,
    #[schema(example = 2)]
    pub department_id: Option<u64>,
    #[schema(example = "2022-01-15", format = "date")]
    pub hire_date: Option<String>,
    #[schema(example = 95000.0)]
    pub salary: Option<f64>,
    pub status: Option<EmployeeStatus>,
}

/// Fields left out keep their stored value; `null` clears nullable ones.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateEmployeeRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub phone: Patch<String>,
    pub position: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<u64>)]
    pub department_id: Patch<u64>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = "date")]
    pub hire_date: Patch<String>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub salary: Patch<f64>,
    pub status: Option<EmployeeStatus>,
}

fn parse_status(v: &mut Validator, status: Option<&str>) -> Option<EmployeeStatus> {
    let status = status?;
    let parsed = status.parse().ok();
    if parsed.is_none() {
        v.fail("status", "Status must be active or inactive");
    }
    parsed
}

fn parse_hire_date(v: &mut Validator, hire_date: &str) -> Option<NaiveDate> {
    v.date(hire_date, "hire_date", HIRE_DATE_FORMAT)
}

/// List employees
#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Employees, newest first", body = Object, example = json!({
            "success": true,
            "data": [{
                "id": 1, "first_name": "John", "last_name": "Smith", "email": "john.smith@hrms.com",
                "phone": "+1-555-0101", "position": "Senior Software Engineer", "department_id": 2,
                "department_name": "Engineering", "hire_date": "2022-01-15", "salary": 95000.0,
                "status": "active"
            }],
            "count": 1
        })),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    state: web::Data<AppState>,
    query: web::Query<EmployeeQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let mut v = Validator::new();

    let status = parse_status(&mut v, query.status.as_deref());
    v.positive_id(query.department_id, "department_id", "Department ID");
    v.text(query.search.as_deref(), "search", "Search term", 100);
    v.finish()?;

    let criteria = EmployeeCriteria {
        search: query
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        department_id: query.department_id,
        status,
    };
    let employees = state.employees.list(&criteria).await?;
    Ok(ok(ApiResponse::list(employees)))
}

/// Get employee
#[utoipa::path(
    get,
    path = "/api/employees/{id}",
    params(("id" = u64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee with department name"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(state: web::Data<AppState>, path: web::Path<u64>) -> AppResult<HttpResponse> {
    let id = path_id(path.into_inner(), "Employee")?;
    let employee = state.employees.get(id).await?;
    Ok(ok(ApiResponse::data(employee)))
}

/// Create employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployeeRequest,
    responses(
        (status = 201, description = "Employee created successfully"),
        (status = 400, description = "Invalid input or unknown department", body = Object, example = json!({
            "success": false, "error": "Validation Error", "message": "Invalid input data",
            "details": [{"field": "email", "message": "Invalid email format"}]
        })),
        (status = 409, description = "Employee with this email already exists")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
#[instrument(name = "employee_create", skip(state, payload))]
pub async fn create_employee(
    state: web::Data<AppState>,
    payload: web::Json<CreateEmployeeRequest>,
) -> AppResult<HttpResponse> {
    let body = payload.into_inner();
    let mut v = Validator::new();

    v.person_name(&body.first_name, "first_name", "First name", 50);
    v.person_name(&body.last_name, "last_name", "Last name", 50);
    v.email(&body.email, "email");
    v.phone(body.phone.as_deref(), "phone");
    v.position(&body.position, "position");
    v.positive_id(body.department_id, "department_id", "Department ID");
    let hire_date = body.hire_date.as_deref().and_then(|d| parse_hire_date(&mut v, d));
    v.salary(body.salary, "salary");
    v.finish()?;

    let employee = state
        .employees
        .create(CreateEmployee {
            first_name: body.first_name,
            last_name: body.last_name,
            email: body.email,
            phone: body.phone,
            position: body.position,
            department_id: body.department_id,
            hire_date,
            salary: body.salary,
            status: body.status,
        })
        .await?;

    Ok(created(
        ApiResponse::data(employee).with_message("Employee created successfully"),
    ))
}

/// Update employee
#[utoipa::path(
    put,
    path = "/api/employees/{id}",
    params(("id" = u64, Path, description = "Employee id")),
    request_body = UpdateEmployeeRequest,
    responses(
        (status = 200, description = "Employee updated successfully"),
        (status = 400, description = "Invalid input or unknown department"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Email already taken by another employee")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<UpdateEmployeeRequest>,
) -> AppResult<HttpResponse> {
    let id = path_id(path.into_inner(), "Employee")?;
    let body = payload.into_inner();
    let mut v = Validator::new();

    if let Some(first_name) = &body.first_name {
        v.person_name(first_name, "first_name", "First name", 50);
    }
    if let Some(last_name) = &body.last_name {
        v.person_name(last_name, "last_name", "Last name", 50);
    }
    if let Some(email) = &body.email {
        v.email(email, "email");
    }
    v.phone(body.phone.value().map(String::as_str), "phone");
    if let Some(position) = &body.position {
        v.position(position, "position");
    }
    v.positive_id(body.department_id.value().copied(), "department_id", "Department ID");
    let hire_date = body.hire_date.and_then(|d| parse_hire_date(&mut v, &d));
    v.salary(body.salary.value().copied(), "salary");
    v.finish()?;

    let changes = EmployeeChanges {
        first_name: body.first_name,
        last_name: body.last_name,
        email: body.email,
        phone: body.phone,
        position: body.position,
        department_id: body.department_id,
        hire_date,
        salary: body.salary,
        status: body.status,
    };
    let employee = state.employees.update(id, changes).await?;

    Ok(ok(
        ApiResponse::data(employee).with_message("Employee updated successfully"),
    ))
}

/// Delete employee
#[utoipa::path(
    delete,
    path = "/api/employees/{id}",
    params(("id" = u64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee deleted successfully"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Employee still has attendance records", body = Object, example = json!({
            "success": false, "error": "Conflict",
            "message": "Cannot delete employee with attendance records",
            "details": [{"field": "employee_id", "message": "Employee has 3 attendance record(s). Please delete attendance records first."}],
            "count": 3
        }))
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let id = path_id(path.into_inner(), "Employee")?;
    state.employees.delete(id).await?;
    info!(
        by = user.user_id,
        email = %user.email,
        role = %user.role,
        employee_id = id,
        "Employee deleted"
    );
    Ok(message("Employee deleted successfully"))
}
