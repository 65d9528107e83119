use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::MySqlPool;
use tracing::debug;

use super::{
    AttendanceRepository, DepartmentRepository, EmployeeRepository, StorageError, StorageResult,
    UserRepository,
};
use crate::model::{
    attendance::{Attendance, AttendanceChanges, AttendanceCriteria, AttendanceStatus, NewAttendance},
    department::{Department, DepartmentChanges, DepartmentHeadcount, NewDepartment},
    employee::{Employee, EmployeeChanges, EmployeeCriteria, NewEmployee},
    user::{NewUser, User},
};
use crate::utils::db_utils::{SqlFilter, SqlUpdate, SqlValue, to_arguments};

const EMPLOYEE_COLUMNS: &str =
    "id, first_name, last_name, email, phone, position, department_id, hire_date, salary, status";
const ATTENDANCE_COLUMNS: &str = "id, employee_id, date, check_in, check_out, status, notes";

/// MySQL-backed repositories sharing one connection pool.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            let constraint = db_err
                .constraint()
                .map(str::to_string)
                .unwrap_or_else(|| key_name(db_err.message()));

            if db_err.is_unique_violation() {
                return StorageError::UniqueViolation { constraint };
            }
            if db_err.is_foreign_key_violation() {
                return StorageError::ForeignKeyViolation { constraint };
            }
        }
        StorageError::Backend(e.to_string())
    }
}

/// MySQL reports the key only inside the message:
/// `Duplicate entry '7-2024-01-10' for key 'attendance.uq_attendance_employee_date'`.
fn key_name(message: &str) -> String {
    message
        .rsplit_once("for key '")
        .or_else(|| message.split_once("CONSTRAINT `"))
        .map(|(_, rest)| {
            rest.chars()
                .take_while(|c| *c != '\'' && *c != '`')
                .collect()
        })
        .unwrap_or_default()
}

/// `IN (?, ?, ...)` with one placeholder per id.
fn in_list(ids: &[u64]) -> (String, Vec<SqlValue>) {
    let placeholders = vec!["?"; ids.len()].join(", ");
    (
        format!("IN ({placeholders})"),
        ids.iter().copied().map(SqlValue::U64).collect(),
    )
}

fn employee_filter(criteria: &EmployeeCriteria) -> SqlFilter {
    let mut filter = SqlFilter::default();

    if let Some(search) = &criteria.search {
        let like = format!("%{search}%");
        filter.push(
            "(first_name LIKE ? OR last_name LIKE ? OR email LIKE ? OR position LIKE ?)",
            std::iter::repeat(SqlValue::String(like)).take(4),
        );
    }
    if let Some(department_id) = criteria.department_id {
        filter.push("department_id = ?", [SqlValue::U64(department_id)]);
    }
    if let Some(status) = criteria.status {
        filter.push("status = ?", [SqlValue::String(status.to_string())]);
    }

    filter
}

fn attendance_filter(criteria: &AttendanceCriteria) -> SqlFilter {
    let mut filter = SqlFilter::default();

    if let Some(employee_id) = criteria.employee_id {
        filter.push("employee_id = ?", [SqlValue::U64(employee_id)]);
    }
    if let Some(range) = criteria.dates {
        filter.push(
            "date BETWEEN ? AND ?",
            [SqlValue::Date(range.start), SqlValue::Date(range.end)],
        );
    }
    if let Some(status) = criteria.status {
        filter.push("status = ?", [SqlValue::String(status.to_string())]);
    }
    if let Some(threshold) = criteria.checked_in_after {
        filter.push("check_in > ?", [SqlValue::Time(threshold)]);
    }

    filter
}

#[async_trait]
impl EmployeeRepository for MySqlStore {
    async fn find_by_id(&self, id: u64) -> StorageResult<Option<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
        Ok(sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> StorageResult<Option<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE LOWER(email) = LOWER(?)");
        Ok(sqlx::query_as::<_, Employee>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_many(&self, criteria: &EmployeeCriteria) -> StorageResult<Vec<Employee>> {
        let filter = employee_filter(criteria);
        let sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees {} ORDER BY id DESC",
            filter.where_clause()
        );
        debug!(sql = %sql, "Fetching employees");

        Ok(sqlx::query_as_with::<_, Employee, _>(&sql, to_arguments(filter.into_values()))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_by_ids(&self, ids: &[u64]) -> StorageResult<Vec<Employee>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let (in_clause, values) = in_list(ids);
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id {in_clause}");

        Ok(sqlx::query_as_with::<_, Employee, _>(&sql, to_arguments(values))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn recent_hires(&self, limit: usize) -> StorageResult<Vec<Employee>> {
        let sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY hire_date IS NULL, hire_date DESC LIMIT ?"
        );
        Ok(sqlx::query_as::<_, Employee>(&sql)
            .bind(limit as u64)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count(&self, criteria: &EmployeeCriteria) -> StorageResult<i64> {
        let filter = employee_filter(criteria);
        let sql = format!("SELECT COUNT(*) FROM employees {}", filter.where_clause());

        Ok(sqlx::query_scalar_with::<_, i64, _>(&sql, to_arguments(filter.into_values()))
            .fetch_one(&self.pool)
            .await?)
    }

    async fn insert(&self, employee: &NewEmployee) -> StorageResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO employees
            (first_name, last_name, email, phone, position, department_id, hire_date, salary, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(&employee.email)
        .bind(&employee.phone)
        .bind(&employee.position)
        .bind(employee.department_id)
        .bind(employee.hire_date)
        .bind(employee.salary)
        .bind(employee.status.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id())
    }

    async fn update(&self, id: u64, changes: &EmployeeChanges) -> StorageResult<()> {
        let mut update = SqlUpdate::new("employees");
        update
            .set_opt("first_name", changes.first_name.clone())
            .set_opt("last_name", changes.last_name.clone())
            .set_opt("email", changes.email.clone())
            .patch("phone", changes.phone.clone())
            .set_opt("position", changes.position.clone())
            .patch("department_id", changes.department_id.clone())
            .patch("hire_date", changes.hire_date.clone())
            .patch("salary", changes.salary.clone())
            .set_opt("status", changes.status.map(|s| s.to_string()));

        if update.is_empty() {
            return Ok(());
        }
        let (sql, args) = update.build(id);
        sqlx::query_with(&sql, args).execute(&self.pool).await?;
        Ok(())
    }

    async fn delete(&self, id: u64) -> StorageResult<()> {
        sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DepartmentRepository for MySqlStore {
    async fn find_by_id(&self, id: u64) -> StorageResult<Option<Department>> {
        Ok(
            sqlx::query_as::<_, Department>("SELECT id, name, description FROM departments WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_by_name(&self, name: &str) -> StorageResult<Option<Department>> {
        Ok(sqlx::query_as::<_, Department>(
            "SELECT id, name, description FROM departments WHERE LOWER(name) = LOWER(?)",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_by_ids(&self, ids: &[u64]) -> StorageResult<Vec<Department>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let (in_clause, values) = in_list(ids);
        let sql = format!("SELECT id, name, description FROM departments WHERE id {in_clause}");

        Ok(sqlx::query_as_with::<_, Department, _>(&sql, to_arguments(values))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn headcounts(&self) -> StorageResult<Vec<DepartmentHeadcount>> {
        Ok(sqlx::query_as::<_, DepartmentHeadcount>(
            r#"
            SELECT d.id, d.name, d.description, COUNT(e.id) AS employee_count
            FROM departments d
            LEFT JOIN employees e ON d.id = e.department_id
            GROUP BY d.id, d.name, d.description
            ORDER BY d.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn count(&self) -> StorageResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM departments")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn insert(&self, department: &NewDepartment) -> StorageResult<u64> {
        let result = sqlx::query("INSERT INTO departments (name, description) VALUES (?, ?)")
            .bind(&department.name)
            .bind(&department.description)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_id())
    }

    async fn update(&self, id: u64, changes: &DepartmentChanges) -> StorageResult<()> {
        let mut update = SqlUpdate::new("departments");
        update
            .set_opt("name", changes.name.clone())
            .patch("description", changes.description.clone());

        if update.is_empty() {
            return Ok(());
        }
        let (sql, args) = update.build(id);
        sqlx::query_with(&sql, args).execute(&self.pool).await?;
        Ok(())
    }

    async fn delete(&self, id: u64) -> StorageResult<()> {
        sqlx::query("DELETE FROM departments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AttendanceRepository for MySqlStore {
    async fn find_by_id(&self, id: u64) -> StorageResult<Option<Attendance>> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE id = ?");
        Ok(sqlx::query_as::<_, Attendance>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_employee_and_date(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> StorageResult<Option<Attendance>> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE employee_id = ? AND date = ?");
        Ok(sqlx::query_as::<_, Attendance>(&sql)
            .bind(employee_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_many(&self, criteria: &AttendanceCriteria) -> StorageResult<Vec<Attendance>> {
        let filter = attendance_filter(criteria);
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance {} ORDER BY date DESC, id",
            filter.where_clause()
        );
        debug!(sql = %sql, "Fetching attendance");

        Ok(sqlx::query_as_with::<_, Attendance, _>(&sql, to_arguments(filter.into_values()))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count(&self, criteria: &AttendanceCriteria) -> StorageResult<i64> {
        let filter = attendance_filter(criteria);
        let sql = format!("SELECT COUNT(*) FROM attendance {}", filter.where_clause());

        Ok(sqlx::query_scalar_with::<_, i64, _>(&sql, to_arguments(filter.into_values()))
            .fetch_one(&self.pool)
            .await?)
    }

    async fn insert(&self, record: &NewAttendance) -> StorageResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance (employee_id, date, check_in, check_out, status, notes)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.employee_id)
        .bind(record.date)
        .bind(record.check_in)
        .bind(record.check_out)
        .bind(record.status.to_string())
        .bind(&record.notes)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id())
    }

    async fn update(&self, id: u64, changes: &AttendanceChanges) -> StorageResult<()> {
        let mut update = SqlUpdate::new("attendance");
        update
            .patch("check_in", changes.check_in.clone())
            .patch("check_out", changes.check_out.clone())
            .set_opt("status", changes.status.map(|s| s.to_string()))
            .patch("notes", changes.notes.clone());

        if update.is_empty() {
            return Ok(());
        }
        let (sql, args) = update.build(id);
        sqlx::query_with(&sql, args).execute(&self.pool).await?;
        Ok(())
    }

    async fn record_check_in(&self, id: u64, time: NaiveTime) -> StorageResult<bool> {
        let result = sqlx::query(
            "UPDATE attendance SET check_in = ?, status = ? WHERE id = ? AND check_in IS NULL",
        )
        .bind(time)
        .bind(AttendanceStatus::Present.to_string())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_check_out(&self, id: u64, time: NaiveTime) -> StorageResult<bool> {
        let result = sqlx::query("UPDATE attendance SET check_out = ? WHERE id = ? AND check_out IS NULL")
            .bind(time)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: u64) -> StorageResult<()> {
        sqlx::query("DELETE FROM attendance WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MySqlStore {
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, email, password, name, role FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn email_exists(&self, email: &str) -> StorageResult<bool> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn all_emails(&self) -> StorageResult<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>("SELECT email FROM users")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert(&self, user: &NewUser) -> StorageResult<u64> {
        let result = sqlx::query("INSERT INTO users (email, password, name, role) VALUES (?, ?, ?, ?)")
            .bind(&user.email)
            .bind(&user.password)
            .bind(&user.name)
            .bind(user.role.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_id())
    }

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        sqlx::query("INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(jti)
            .bind(expires_at.naive_utc())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> StorageResult<Option<u64>> {
        let mut tx = self.pool.begin().await?;

        let user_id = sqlx::query_scalar::<_, u64>(
            r#"
            SELECT user_id FROM refresh_tokens
            WHERE jti = ? AND revoked = FALSE AND expires_at > UTC_TIMESTAMP()
            FOR UPDATE
            "#,
        )
        .bind(jti)
        .fetch_optional(&mut *tx)
        .await?;

        if user_id.is_some() {
            sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
                .bind(jti)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_name_is_extracted_from_duplicate_message() {
        assert_eq!(
            key_name("Duplicate entry '7-2024-01-10' for key 'attendance.uq_attendance_employee_date'"),
            "attendance.uq_attendance_employee_date"
        );
        assert_eq!(
            key_name(
                "Cannot delete or update a parent row: a foreign key constraint fails \
                 (`hrms`.`employees`, CONSTRAINT `fk_employees_department` FOREIGN KEY ...)"
            ),
            "fk_employees_department"
        );
        assert_eq!(key_name("something else"), "");
    }

    #[test]
    fn in_list_has_one_placeholder_per_id() {
        let (clause, values) = in_list(&[3, 5, 8]);
        assert_eq!(clause, "IN (?, ?, ?)");
        assert_eq!(values, vec![SqlValue::U64(3), SqlValue::U64(5), SqlValue::U64(8)]);
    }

    #[test]
    fn attendance_filter_covers_late_query() {
        let criteria = AttendanceCriteria {
            status: Some(crate::model::attendance::AttendanceStatus::Present),
            checked_in_after: chrono::NaiveTime::from_hms_opt(9, 0, 0),
            ..AttendanceCriteria::default()
        };
        assert_eq!(
            attendance_filter(&criteria).where_clause(),
            "WHERE status = ? AND check_in > ?"
        );
    }
}
