use actix_web::{HttpResponse, web};

use crate::api::response::{ApiResponse, ok};
use crate::error::AppResult;
use crate::state::AppState;

/// Dashboard statistics
#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    responses(
        (status = 200, description = "Headline counts, top departments and recent hires", body = Object, example = json!({
            "success": true,
            "data": {
                "totalEmployees": 25, "activeEmployees": 23, "totalDepartments": 5,
                "todayAttendance": 20, "todayPresent": 18,
                "employeesByDepartment": [{"id": 2, "name": "Engineering", "count": 12}],
                "recentHires": []
            }
        })),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
pub async fn dashboard_stats(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let stats = state.stats.dashboard().await?;
    Ok(ok(ApiResponse::data(stats)))
}
