use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::api::response::{ApiResponse, created, message, ok};
use crate::api::validation::{INVALID_INPUT, Validator, path_id};
use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::attendance::{AttendanceAction, AttendanceChanges, AttendanceStatus, DateRange};
use crate::service::attendance::{AttendanceFilter, CreateAttendance, NOTES_MAX_LEN};
use crate::state::AppState;
use crate::utils::patch::Patch;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceQuery {
    /// Single day, `YYYY-MM-DD`. Ignored when a range is given.
    pub date: Option<String>,
    pub employee_id: Option<u64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAttendanceRequest {
    #[schema(example = 1)]
    pub employee_id: Option<u64>,
    #[schema(example = "2024-01-10", format = "date")]
    pub date: Option<String>,
    #[schema(example = "08:55:00")]
    pub check_in: Option<String>,
    #[schema(example = "17:00:00")]
    pub check_out: Option<String>,
    pub status: Option<AttendanceStatus>,
    pub notes: Option<String>,
}

/// Fields left out keep their stored value; `null` clears nullable ones.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAttendanceRequest {
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "09:00:00")]
    pub check_in: Patch<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "17:30:00")]
    pub check_out: Patch<String>,
    pub status: Option<AttendanceStatus>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub notes: Patch<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkAttendanceRequest {
    #[schema(example = 1)]
    pub employee_id: Option<u64>,
    #[schema(example = "2024-01-10", format = "date")]
    pub date: Option<String>,
    #[schema(example = "check_in")]
    pub action: Option<String>,
}

/// Both ends or neither.
fn date_range(v: &mut Validator, start: Option<&str>, end: Option<&str>) -> Option<DateRange> {
    const FIELD: &str = "start_date/end_date";
    const FORMAT: &str = "Dates must be in YYYY-MM-DD format";

    match (start, end) {
        (None, None) => None,
        (Some(start), Some(end)) => {
            let start = v.date(start, FIELD, FORMAT);
            let end = v.date(end, FIELD, FORMAT);
            let range = DateRange::new(start?, end?);
            if range.is_none() {
                v.fail(FIELD, "start_date must not be after end_date");
            }
            range
        }
        _ => {
            v.fail(FIELD, "Both start_date and end_date are required for a date range");
            None
        }
    }
}

fn required_employee_id(v: &mut Validator, employee_id: Option<u64>) -> u64 {
    match employee_id {
        None => {
            v.fail("employee_id", "Employee ID is required");
            0
        }
        Some(id) => {
            v.positive_id(Some(id), "employee_id", "Employee ID");
            id
        }
    }
}

fn required_date(v: &mut Validator, date: Option<&str>) -> Option<chrono::NaiveDate> {
    match date {
        None => {
            v.fail("date", "Date is required");
            None
        }
        Some(date) => v.date(date, "date", "Date must be a valid date (YYYY-MM-DD)"),
    }
}

fn missing_date() -> AppError {
    AppError::validation(INVALID_INPUT, "date", "Date is required")
}

/// List attendance records
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Attendance records, newest date first", body = Object, example = json!({
            "success": true,
            "data": [{
                "id": 12, "employee_id": 1, "date": "2024-01-10",
                "check_in": "08:55:00", "check_out": "17:00:00", "status": "present", "notes": null,
                "first_name": "John", "last_name": "Smith", "email": "john.smith@hrms.com",
                "position": "Senior Software Engineer", "department_name": "Engineering"
            }],
            "count": 1
        })),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
pub async fn list_attendance(
    state: web::Data<AppState>,
    query: web::Query<AttendanceQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let mut v = Validator::new();

    let date = query
        .date
        .as_deref()
        .and_then(|d| v.date(d, "date", "Date must be in YYYY-MM-DD format"));
    v.positive_id(query.employee_id, "employee_id", "Employee ID");
    let range = date_range(&mut v, query.start_date.as_deref(), query.end_date.as_deref());
    v.finish()?;

    let filter = AttendanceFilter {
        date,
        employee_id: query.employee_id,
        range,
    };
    let records = state.attendance.list(&filter).await?;
    Ok(ok(ApiResponse::list(records)))
}

/// Attendance statistics
#[utoipa::path(
    get,
    path = "/api/attendance/stats",
    params(StatsQuery),
    responses(
        (status = 200, description = "Counts for the range plus today's roster", body = Object, example = json!({
            "success": true,
            "data": {
                "totalRecords": 42, "presentCount": 35, "absentCount": 4, "lateCount": 6,
                "todayAttendance": []
            }
        })),
        (status = 400, description = "Invalid range")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
pub async fn attendance_stats(
    state: web::Data<AppState>,
    query: web::Query<StatsQuery>,
) -> AppResult<HttpResponse> {
    let mut v = Validator::new();
    let range = date_range(&mut v, query.start_date.as_deref(), query.end_date.as_deref());
    v.finish()?;

    let stats = state.stats.attendance_stats(range).await?;
    Ok(ok(ApiResponse::data(stats)))
}

/// Get attendance record
#[utoipa::path(
    get,
    path = "/api/attendance/{id}",
    params(("id" = u64, Path, description = "Attendance record id")),
    responses(
        (status = 200, description = "Attendance record"),
        (status = 404, description = "Attendance record not found", body = Object, example = json!({
            "success": false, "error": "Not Found", "message": "Attendance record not found"
        }))
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
pub async fn get_attendance(state: web::Data<AppState>, path: web::Path<u64>) -> AppResult<HttpResponse> {
    let id = path_id(path.into_inner(), "Attendance")?;
    let record = state.attendance.get(id).await?;
    Ok(ok(ApiResponse::data(record)))
}

/// Create attendance record
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = CreateAttendanceRequest,
    responses(
        (status = 201, description = "Attendance record created successfully"),
        (status = 400, description = "Invalid input or check-out not after check-in", body = Object, example = json!({
            "success": false, "error": "Validation Error", "message": "Invalid time range",
            "details": [{"field": "check_out", "message": "Check-out time must be after check-in time"}]
        })),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Attendance record already exists for this date")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(name = "attendance_create", skip(state, payload))]
pub async fn create_attendance(
    state: web::Data<AppState>,
    payload: web::Json<CreateAttendanceRequest>,
) -> AppResult<HttpResponse> {
    let body = payload.into_inner();
    let mut v = Validator::new();

    let employee_id = required_employee_id(&mut v, body.employee_id);
    let date = required_date(&mut v, body.date.as_deref());
    let check_in = body.check_in.as_deref().and_then(|t| v.time(t, "check_in", "Check-in"));
    let check_out = body.check_out.as_deref().and_then(|t| v.time(t, "check_out", "Check-out"));
    v.text(body.notes.as_deref(), "notes", "Notes", NOTES_MAX_LEN);
    v.finish()?;

    let date = date.ok_or_else(missing_date)?;
    let record = state
        .attendance
        .create(CreateAttendance {
            employee_id,
            date,
            check_in,
            check_out,
            status: body.status,
            notes: body.notes,
        })
        .await?;

    Ok(created(
        ApiResponse::data(record).with_message("Attendance record created successfully"),
    ))
}

/// Update attendance record
#[utoipa::path(
    put,
    path = "/api/attendance/{id}",
    params(("id" = u64, Path, description = "Attendance record id")),
    request_body = UpdateAttendanceRequest,
    responses(
        (status = 200, description = "Attendance record updated successfully"),
        (status = 400, description = "Invalid input or time range"),
        (status = 404, description = "Attendance record not found")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
pub async fn update_attendance(
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<UpdateAttendanceRequest>,
) -> AppResult<HttpResponse> {
    let id = path_id(path.into_inner(), "Attendance")?;
    let body = payload.into_inner();
    let mut v = Validator::new();

    let check_in = body.check_in.and_then(|t| v.time(&t, "check_in", "Check-in"));
    let check_out = body.check_out.and_then(|t| v.time(&t, "check_out", "Check-out"));
    v.text(body.notes.value().map(String::as_str), "notes", "Notes", NOTES_MAX_LEN);
    v.finish()?;

    let changes = AttendanceChanges {
        check_in,
        check_out,
        status: body.status,
        notes: body.notes,
    };
    let record = state.attendance.update(id, changes).await?;

    Ok(ok(
        ApiResponse::data(record).with_message("Attendance record updated successfully"),
    ))
}

/// Delete attendance record
#[utoipa::path(
    delete,
    path = "/api/attendance/{id}",
    params(("id" = u64, Path, description = "Attendance record id")),
    responses(
        (status = 200, description = "Attendance record deleted successfully"),
        (status = 404, description = "Attendance record not found")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
pub async fn delete_attendance(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let id = path_id(path.into_inner(), "Attendance")?;
    state.attendance.delete(id).await?;
    info!(
        by = user.user_id,
        email = %user.email,
        role = %user.role,
        attendance_id = id,
        "Attendance deleted"
    );
    Ok(message("Attendance record deleted successfully"))
}

/// Check in or check out
#[utoipa::path(
    post,
    path = "/api/attendance/mark",
    request_body = MarkAttendanceRequest,
    responses(
        (status = 200, description = "Checked in / checked out successfully"),
        (status = 400, description = "Must check in before checking out", body = Object, example = json!({
            "success": false, "error": "Validation Error", "message": "Must check in before checking out",
            "details": [{"field": "action", "message": "Employee must check in first before checking out"}]
        })),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Already checked in / out for this date")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(name = "attendance_mark", skip(state, payload))]
pub async fn mark_attendance(
    state: web::Data<AppState>,
    payload: web::Json<MarkAttendanceRequest>,
) -> AppResult<HttpResponse> {
    let body = payload.into_inner();
    let mut v = Validator::new();

    let employee_id = required_employee_id(&mut v, body.employee_id);
    let date = required_date(&mut v, body.date.as_deref());
    let action = match body.action.as_deref() {
        Some("check_in") => Some(AttendanceAction::CheckIn),
        Some("check_out") => Some(AttendanceAction::CheckOut),
        _ => {
            v.fail("action", "Action must be check_in or check_out");
            None
        }
    };
    v.finish()?;

    let date = date.ok_or_else(missing_date)?;
    let action = action.ok_or_else(|| AppError::validation(INVALID_INPUT, "action", "Action is required"))?;
    let record = state.attendance.mark(employee_id, date, action).await?;

    let done = match action {
        AttendanceAction::CheckIn => "Checked in successfully",
        AttendanceAction::CheckOut => "Checked out successfully",
    };
    Ok(ok(ApiResponse::data(record).with_message(done)))
}
