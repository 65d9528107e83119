use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::{
    attendance::{CreateAttendanceRequest, MarkAttendanceRequest, UpdateAttendanceRequest},
    department::{CreateDepartmentRequest, UpdateDepartmentRequest},
    employee::{CreateEmployeeRequest, UpdateEmployeeRequest},
};
use crate::auth::handlers::{AuthPayload, LoginRequest, RegisterRequest, TokenPair};
use crate::error::FieldError;
use crate::model::{
    attendance::{AttendanceAction, AttendanceStatus},
    department::{Department, DepartmentHeadcount},
    employee::{Employee, EmployeeStatus},
    role::Role,
    user::UserProfile,
};
use crate::presenter::{AttendanceView, EmployeeView};
use crate::service::{
    department::{DepartmentDetail, EmployeeSummary},
    stats::{AttendanceStats, DashboardStats, DepartmentCount},
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM System API",
        version = "1.0.0",
        description = r#"
## Human Resource Management (HRM) System

Employee, department and attendance records for a single organisation.

### Key Features
- **Employee Management**: create, update, list, search and remove employee profiles
- **Department Management**: departments with live headcount
- **Attendance Management**: one record per employee per day, daily check-in / check-out
- **Dashboard**: headline counts, largest departments and recent hires

### Security
Every `/api` endpoint requires a **JWT Bearer** access token from `/auth/login`.

### Response Format
Success: `{ "success": true, "data": ..., "message"?: ..., "count"?: ... }`

Failure: `{ "success": false, "error": ..., "message": ..., "details"?: [{ "field", "message" }] }`
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::create_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::department::list_departments,
        crate::api::department::get_department,
        crate::api::department::create_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,

        crate::api::attendance::list_attendance,
        crate::api::attendance::attendance_stats,
        crate::api::attendance::get_attendance,
        crate::api::attendance::create_attendance,
        crate::api::attendance::update_attendance,
        crate::api::attendance::delete_attendance,
        crate::api::attendance::mark_attendance,

        crate::api::dashboard::dashboard_stats
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            TokenPair,
            AuthPayload,
            UserProfile,
            Role,
            Employee,
            EmployeeStatus,
            EmployeeView,
            CreateEmployeeRequest,
            UpdateEmployeeRequest,
            Department,
            DepartmentHeadcount,
            DepartmentDetail,
            EmployeeSummary,
            CreateDepartmentRequest,
            UpdateDepartmentRequest,
            AttendanceStatus,
            AttendanceAction,
            AttendanceView,
            CreateAttendanceRequest,
            UpdateAttendanceRequest,
            MarkAttendanceRequest,
            AttendanceStats,
            DashboardStats,
            DepartmentCount,
            FieldError
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and token rotation"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Department", description = "Department management APIs"),
        (name = "Attendance", description = "Attendance management APIs"),
        (name = "Dashboard", description = "Dashboard statistics"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
