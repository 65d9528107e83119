//! Persistence ports.
//!
//! Services only see these traits. `mysql` backs the running server and
//! the test-only `memory` store backs unit tests; both enforce the same unique and foreign-key
//! constraints so that a race past a service pre-check surfaces as a typed
//! [`StorageError`] instead of a corrupted table.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::MySqlPool;
use thiserror::Error;

use crate::model::{
    attendance::{Attendance, AttendanceChanges, AttendanceCriteria, NewAttendance},
    department::{Department, DepartmentChanges, DepartmentHeadcount, NewDepartment},
    employee::{Employee, EmployeeChanges, EmployeeCriteria, NewEmployee},
    user::{NewUser, User},
};

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("foreign key constraint violated: {constraint}")]
    ForeignKeyViolation { constraint: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn find_by_id(&self, id: u64) -> StorageResult<Option<Employee>>;

    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<Employee>>;

    /// Newest first.
    async fn find_many(&self, criteria: &EmployeeCriteria) -> StorageResult<Vec<Employee>>;

    async fn find_by_ids(&self, ids: &[u64]) -> StorageResult<Vec<Employee>>;

    /// Latest hire dates first; rows without a hire date last.
    async fn recent_hires(&self, limit: usize) -> StorageResult<Vec<Employee>>;

    async fn count(&self, criteria: &EmployeeCriteria) -> StorageResult<i64>;

    async fn insert(&self, employee: &NewEmployee) -> StorageResult<u64>;

    async fn update(&self, id: u64, changes: &EmployeeChanges) -> StorageResult<()>;

    async fn delete(&self, id: u64) -> StorageResult<()>;
}

#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    async fn find_by_id(&self, id: u64) -> StorageResult<Option<Department>>;

    /// Case-insensitive lookup.
    async fn find_by_name(&self, name: &str) -> StorageResult<Option<Department>>;

    async fn find_by_ids(&self, ids: &[u64]) -> StorageResult<Vec<Department>>;

    /// Every department with its employee count, ordered by name.
    async fn headcounts(&self) -> StorageResult<Vec<DepartmentHeadcount>>;

    async fn count(&self) -> StorageResult<i64>;

    async fn insert(&self, department: &NewDepartment) -> StorageResult<u64>;

    async fn update(&self, id: u64, changes: &DepartmentChanges) -> StorageResult<()>;

    async fn delete(&self, id: u64) -> StorageResult<()>;
}

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn find_by_id(&self, id: u64) -> StorageResult<Option<Attendance>>;

    async fn find_by_employee_and_date(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> StorageResult<Option<Attendance>>;

    /// Date descending.
    async fn find_many(&self, criteria: &AttendanceCriteria) -> StorageResult<Vec<Attendance>>;

    async fn count(&self, criteria: &AttendanceCriteria) -> StorageResult<i64>;

    async fn insert(&self, record: &NewAttendance) -> StorageResult<u64>;

    async fn update(&self, id: u64, changes: &AttendanceChanges) -> StorageResult<()>;

    /// Sets check-in and status `present` on a row that has no check-in yet.
    /// `false` when the row already had one.
    async fn record_check_in(&self, id: u64, time: NaiveTime) -> StorageResult<bool>;

    /// Sets check-out on a row that has none yet. `false` when it was already set.
    async fn record_check_out(&self, id: u64, time: NaiveTime) -> StorageResult<bool>;

    async fn delete(&self, id: u64) -> StorageResult<()>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>>;

    async fn email_exists(&self, email: &str) -> StorageResult<bool>;

    async fn all_emails(&self) -> StorageResult<Vec<String>>;

    async fn insert(&self, user: &NewUser) -> StorageResult<u64>;

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Revokes an active refresh token and returns its owner, `None` when the
    /// token is unknown, expired or already revoked.
    async fn revoke_refresh_token(&self, jti: &str) -> StorageResult<Option<u64>>;
}

/// Handles to every repository, cloned into each service.
#[derive(Clone)]
pub struct Repositories {
    pub employees: Arc<dyn EmployeeRepository>,
    pub departments: Arc<dyn DepartmentRepository>,
    pub attendance: Arc<dyn AttendanceRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repositories {
    pub fn mysql(pool: MySqlPool) -> Self {
        let store = Arc::new(mysql::MySqlStore::new(pool));
        Self {
            employees: store.clone(),
            departments: store.clone(),
            attendance: store.clone(),
            users: store,
        }
    }

    #[cfg(test)]
    pub fn memory() -> Self {
        Self::from_store(Arc::new(memory::MemoryStore::default()))
    }

    /// Memory store whose attendance calls suspend once before running, so
    /// joined futures interleave like concurrent requests.
    #[cfg(test)]
    pub fn memory_interleaved() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self {
            attendance: Arc::new(memory::Interleaved::new(store.clone())),
            ..Self::from_store(store)
        }
    }

    #[cfg(test)]
    pub fn from_store(store: Arc<memory::MemoryStore>) -> Self {
        Self {
            employees: store.clone(),
            departments: store.clone(),
            attendance: store.clone(),
            users: store,
        }
    }
}
