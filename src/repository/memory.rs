//! In-process store backing the unit tests.
//!
//! All tables sit behind one mutex, so every trait method is a single atomic
//! step, the same guarantee a single SQL statement gives on the server.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::task::Poll;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use futures::future::poll_fn;
use parking_lot::Mutex;

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

#[derive(Debug)]
struct RefreshToken {
    user_id: u64,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: u64,
    employees: BTreeMap<u64, Employee>,
    departments: BTreeMap<u64, Department>,
    attendance: BTreeMap<u64, Attendance>,
    users: BTreeMap<u64, User>,
    refresh_tokens: HashMap<String, RefreshToken>,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn email_taken(&self, email: &str, except: Option<u64>) -> bool {
        self.employees
            .values()
            .any(|e| Some(e.id) != except && e.email.eq_ignore_ascii_case(email))
    }

    fn department_name_taken(&self, name: &str, except: Option<u64>) -> bool {
        self.departments
            .values()
            .any(|d| Some(d.id) != except && d.name.eq_ignore_ascii_case(name))
    }

    fn check_department_ref(&self, department_id: Option<u64>) -> StorageResult<()> {
        match department_id {
            Some(id) if !self.departments.contains_key(&id) => Err(fk("fk_employees_department")),
            _ => Ok(()),
        }
    }
}

fn unique(constraint: &str) -> StorageError {
    StorageError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

fn fk(constraint: &str) -> StorageError {
    StorageError::ForeignKeyViolation {
        constraint: constraint.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[async_trait]
impl EmployeeRepository for MemoryStore {
    async fn find_by_id(&self, id: u64) -> StorageResult<Option<Employee>> {
        Ok(self.tables.lock().employees.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StorageResult<Option<Employee>> {
        Ok(self
            .tables
            .lock()
            .employees
            .values()
            .find(|e| e.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_many(&self, criteria: &EmployeeCriteria) -> StorageResult<Vec<Employee>> {
        Ok(self
            .tables
            .lock()
            .employees
            .values()
            .rev()
            .filter(|e| criteria.matches(e))
            .cloned()
            .collect())
    }

    async fn find_by_ids(&self, ids: &[u64]) -> StorageResult<Vec<Employee>> {
        let tables = self.tables.lock();
        Ok(ids
            .iter()
            .filter_map(|id| tables.employees.get(id).cloned())
            .collect())
    }

    async fn recent_hires(&self, limit: usize) -> StorageResult<Vec<Employee>> {
        let mut employees: Vec<Employee> = self.tables.lock().employees.values().cloned().collect();
        employees.sort_by_key(|e| Reverse(e.hire_date));
        employees.truncate(limit);
        Ok(employees)
    }

    async fn count(&self, criteria: &EmployeeCriteria) -> StorageResult<i64> {
        let count = self
            .tables
            .lock()
            .employees
            .values()
            .filter(|e| criteria.matches(e))
            .count();
        Ok(count as i64)
    }

    async fn insert(&self, employee: &NewEmployee) -> StorageResult<u64> {
        let mut tables = self.tables.lock();
        if tables.email_taken(&employee.email, None) {
            return Err(unique("uq_employees_email"));
        }
        tables.check_department_ref(employee.department_id)?;

        let id = tables.next_id();
        tables.employees.insert(
            id,
            Employee {
                id,
                first_name: employee.first_name.clone(),
                last_name: employee.last_name.clone(),
                email: employee.email.clone(),
                phone: employee.phone.clone(),
                position: employee.position.clone(),
                department_id: employee.department_id,
                hire_date: employee.hire_date,
                salary: employee.salary,
                status: employee.status,
            },
        );
        Ok(id)
    }

    async fn update(&self, id: u64, changes: &EmployeeChanges) -> StorageResult<()> {
        let mut tables = self.tables.lock();
        if let Some(email) = &changes.email {
            if tables.email_taken(email, Some(id)) {
                return Err(unique("uq_employees_email"));
            }
        }
        if let Some(department_id) = changes.department_id.value() {
            tables.check_department_ref(Some(*department_id))?;
        }
        if let Some(employee) = tables.employees.get_mut(&id) {
            changes.apply_to(employee);
        }
        Ok(())
    }

    async fn delete(&self, id: u64) -> StorageResult<()> {
        let mut tables = self.tables.lock();
        if tables.attendance.values().any(|a| a.employee_id == id) {
            return Err(fk("fk_attendance_employee"));
        }
        tables.employees.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl DepartmentRepository for MemoryStore {
    async fn find_by_id(&self, id: u64) -> StorageResult<Option<Department>> {
        Ok(self.tables.lock().departments.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> StorageResult<Option<Department>> {
        Ok(self
            .tables
            .lock()
            .departments
            .values()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[u64]) -> StorageResult<Vec<Department>> {
        let tables = self.tables.lock();
        Ok(ids
            .iter()
            .filter_map(|id| tables.departments.get(id).cloned())
            .collect())
    }

    async fn headcounts(&self) -> StorageResult<Vec<DepartmentHeadcount>> {
        let tables = self.tables.lock();
        let mut rows: Vec<DepartmentHeadcount> = tables
            .departments
            .values()
            .map(|d| DepartmentHeadcount {
                id: d.id,
                name: d.name.clone(),
                description: d.description.clone(),
                employee_count: tables
                    .employees
                    .values()
                    .filter(|e| e.department_id == Some(d.id))
                    .count() as i64,
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn count(&self) -> StorageResult<i64> {
        Ok(self.tables.lock().departments.len() as i64)
    }

    async fn insert(&self, department: &NewDepartment) -> StorageResult<u64> {
        let mut tables = self.tables.lock();
        if tables.department_name_taken(&department.name, None) {
            return Err(unique("uq_departments_name"));
        }
        let id = tables.next_id();
        tables.departments.insert(
            id,
            Department {
                id,
                name: department.name.clone(),
                description: department.description.clone(),
            },
        );
        Ok(id)
    }

    async fn update(&self, id: u64, changes: &DepartmentChanges) -> StorageResult<()> {
        let mut tables = self.tables.lock();
        if let Some(name) = &changes.name {
            if tables.department_name_taken(name, Some(id)) {
                return Err(unique("uq_departments_name"));
            }
        }
        if let Some(department) = tables.departments.get_mut(&id) {
            if let Some(name) = &changes.name {
                department.name = name.clone();
            }
            department.description = changes.description.clone().merge(department.description.take());
        }
        Ok(())
    }

    async fn delete(&self, id: u64) -> StorageResult<()> {
        let mut tables = self.tables.lock();
        if tables.employees.values().any(|e| e.department_id == Some(id)) {
            return Err(fk("fk_employees_department"));
        }
        tables.departments.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl AttendanceRepository for MemoryStore {
    async fn find_by_id(&self, id: u64) -> StorageResult<Option<Attendance>> {
        Ok(self.tables.lock().attendance.get(&id).cloned())
    }

    async fn find_by_employee_and_date(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> StorageResult<Option<Attendance>> {
        Ok(self
            .tables
            .lock()
            .attendance
            .values()
            .find(|a| a.employee_id == employee_id && a.date == date)
            .cloned())
    }

    async fn find_many(&self, criteria: &AttendanceCriteria) -> StorageResult<Vec<Attendance>> {
        let mut rows: Vec<Attendance> = self
            .tables
            .lock()
            .attendance
            .values()
            .filter(|a| criteria.matches(a))
            .cloned()
            .collect();
        rows.sort_by_key(|a| Reverse(a.date));
        Ok(rows)
    }

    async fn count(&self, criteria: &AttendanceCriteria) -> StorageResult<i64> {
        let count = self
            .tables
            .lock()
            .attendance
            .values()
            .filter(|a| criteria.matches(a))
            .count();
        Ok(count as i64)
    }

    async fn insert(&self, record: &NewAttendance) -> StorageResult<u64> {
        let mut tables = self.tables.lock();
        if !tables.employees.contains_key(&record.employee_id) {
            return Err(fk("fk_attendance_employee"));
        }
        if tables
            .attendance
            .values()
            .any(|a| a.employee_id == record.employee_id && a.date == record.date)
        {
            return Err(unique("uq_attendance_employee_date"));
        }

        let id = tables.next_id();
        tables.attendance.insert(
            id,
            Attendance {
                id,
                employee_id: record.employee_id,
                date: record.date,
                check_in: record.check_in,
                check_out: record.check_out,
                status: record.status,
                notes: record.notes.clone(),
            },
        );
        Ok(id)
    }

    async fn update(&self, id: u64, changes: &AttendanceChanges) -> StorageResult<()> {
        if let Some(record) = self.tables.lock().attendance.get_mut(&id) {
            changes.apply_to(record);
        }
        Ok(())
    }

    async fn record_check_in(&self, id: u64, time: NaiveTime) -> StorageResult<bool> {
        match self.tables.lock().attendance.get_mut(&id) {
            Some(record) if record.check_in.is_none() => {
                record.check_in = Some(time);
                record.status = AttendanceStatus::Present;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_check_out(&self, id: u64, time: NaiveTime) -> StorageResult<bool> {
        match self.tables.lock().attendance.get_mut(&id) {
            Some(record) if record.check_out.is_none() => {
                record.check_out = Some(time);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: u64) -> StorageResult<()> {
        self.tables.lock().attendance.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        Ok(self
            .tables
            .lock()
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn email_exists(&self, email: &str) -> StorageResult<bool> {
        Ok(self
            .tables
            .lock()
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email)))
    }

    async fn all_emails(&self) -> StorageResult<Vec<String>> {
        Ok(self
            .tables
            .lock()
            .users
            .values()
            .map(|u| u.email.clone())
            .collect())
    }

    async fn insert(&self, user: &NewUser) -> StorageResult<u64> {
        let mut tables = self.tables.lock();
        if tables
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(unique("uq_users_email"));
        }
        let id = tables.next_id();
        tables.users.insert(
            id,
            User {
                id,
                email: user.email.clone(),
                password: user.password.clone(),
                name: user.name.clone(),
                role: user.role,
            },
        );
        Ok(id)
    }

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let mut tables = self.tables.lock();
        if tables.refresh_tokens.contains_key(jti) {
            return Err(unique("uq_refresh_tokens_jti"));
        }
        tables.refresh_tokens.insert(
            jti.to_string(),
            RefreshToken {
                user_id,
                expires_at,
                revoked: false,
            },
        );
        Ok(())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> StorageResult<Option<u64>> {
        let mut tables = self.tables.lock();
        match tables.refresh_tokens.get_mut(jti) {
            Some(token) if !token.revoked && token.expires_at > Utc::now() => {
                token.revoked = true;
                Ok(Some(token.user_id))
            }
            _ => Ok(None),
        }
    }
}

/// Hands control back to the executor once.
async fn yield_now() {
    let mut yielded = false;
    poll_fn(|cx| {
        if yielded {
            return Poll::Ready(());
        }
        yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    })
    .await
}

/// Attendance table that suspends before every call, like a network round
/// trip would.
pub struct Interleaved {
    inner: Arc<dyn AttendanceRepository>,
}

impl Interleaved {
    pub fn new(inner: Arc<dyn AttendanceRepository>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl AttendanceRepository for Interleaved {
    async fn find_by_id(&self, id: u64) -> StorageResult<Option<Attendance>> {
        yield_now().await;
        self.inner.find_by_id(id).await
    }

    async fn find_by_employee_and_date(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> StorageResult<Option<Attendance>> {
        yield_now().await;
        self.inner.find_by_employee_and_date(employee_id, date).await
    }

    async fn find_many(&self, criteria: &AttendanceCriteria) -> StorageResult<Vec<Attendance>> {
        yield_now().await;
        self.inner.find_many(criteria).await
    }

    async fn count(&self, criteria: &AttendanceCriteria) -> StorageResult<i64> {
        yield_now().await;
        self.inner.count(criteria).await
    }

    async fn insert(&self, record: &NewAttendance) -> StorageResult<u64> {
        yield_now().await;
        self.inner.insert(record).await
    }

    async fn update(&self, id: u64, changes: &AttendanceChanges) -> StorageResult<()> {
        yield_now().await;
        self.inner.update(id, changes).await
    }

    async fn record_check_in(&self, id: u64, time: NaiveTime) -> StorageResult<bool> {
        yield_now().await;
        self.inner.record_check_in(id, time).await
    }

    async fn record_check_out(&self, id: u64, time: NaiveTime) -> StorageResult<bool> {
        yield_now().await;
        self.inner.record_check_out(id, time).await
    }

    async fn delete(&self, id: u64) -> StorageResult<()> {
        yield_now().await;
        self.inner.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{attendance::AttendanceStatus, employee::EmployeeStatus};

    fn employee(email: &str, department_id: Option<u64>) -> NewEmployee {
        NewEmployee {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            phone: None,
            position: "Engineer".into(),
            department_id,
            hire_date: None,
            salary: None,
            status: EmployeeStatus::Active,
        }
    }

    fn attendance(employee_id: u64, date: &str) -> NewAttendance {
        NewAttendance {
            employee_id,
            date: date.parse().unwrap(),
            check_in: None,
            check_out: None,
            status: AttendanceStatus::Present,
            notes: None,
        }
    }

    #[actix_web::test]
    async fn employee_email_is_unique_ignoring_case() {
        let store = MemoryStore::default();
        EmployeeRepository::insert(&store, &employee("ada@hrms.com", None))
            .await
            .unwrap();

        let err = EmployeeRepository::insert(&store, &employee("ADA@hrms.com", None))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UniqueViolation { .. }));
    }

    #[actix_web::test]
    async fn attendance_pair_is_unique() {
        let store = MemoryStore::default();
        let emp = EmployeeRepository::insert(&store, &employee("ada@hrms.com", None))
            .await
            .unwrap();

        AttendanceRepository::insert(&store, &attendance(emp, "2024-01-10"))
            .await
            .unwrap();
        AttendanceRepository::insert(&store, &attendance(emp, "2024-01-11"))
            .await
            .unwrap();
        let err = AttendanceRepository::insert(&store, &attendance(emp, "2024-01-10"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::UniqueViolation { .. }));
    }

    #[actix_web::test]
    async fn foreign_keys_are_enforced() {
        let store = MemoryStore::default();

        let err = EmployeeRepository::insert(&store, &employee("ada@hrms.com", Some(99)))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ForeignKeyViolation { .. }));

        let err = AttendanceRepository::insert(&store, &attendance(42, "2024-01-10"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ForeignKeyViolation { .. }));

        let dept = DepartmentRepository::insert(
            &store,
            &NewDepartment {
                name: "Engineering".into(),
                description: None,
            },
        )
        .await
        .unwrap();
        EmployeeRepository::insert(&store, &employee("ada@hrms.com", Some(dept)))
            .await
            .unwrap();
        let err = DepartmentRepository::delete(&store, dept).await.unwrap_err();
        assert!(matches!(err, StorageError::ForeignKeyViolation { .. }));
    }

    #[actix_web::test]
    async fn refresh_tokens_revoke_once() {
        let store = MemoryStore::default();
        let expires = Utc::now() + chrono::Duration::hours(1);
        store.store_refresh_token(7, "jti-1", expires).await.unwrap();

        assert_eq!(store.revoke_refresh_token("jti-1").await.unwrap(), Some(7));
        assert_eq!(store.revoke_refresh_token("jti-1").await.unwrap(), None);
        assert_eq!(store.revoke_refresh_token("missing").await.unwrap(), None);
    }
}
