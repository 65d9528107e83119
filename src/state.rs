use std::sync::Arc;

use crate::clock::Clock;
use crate::repository::{Repositories, UserRepository};
use crate::service::{
    attendance::AttendanceService, department::DepartmentService, employee::EmployeeService,
    stats::StatisticsService,
};
use crate::utils::email_registry::EmailRegistry;

/// Shared handler state, registered once as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub attendance: AttendanceService,
    pub employees: EmployeeService,
    pub departments: DepartmentService,
    pub stats: StatisticsService,
    pub users: Arc<dyn UserRepository>,
    pub emails: Arc<EmailRegistry>,
}

impl AppState {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self {
            attendance: AttendanceService::new(repos.clone(), clock.clone()),
            employees: EmployeeService::new(repos.clone(), clock.clone()),
            departments: DepartmentService::new(repos.clone()),
            stats: StatisticsService::new(repos.clone(), clock),
            users: repos.users,
            emails: Arc::new(EmailRegistry::new()),
        }
    }
}
