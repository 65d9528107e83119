use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::utils::patch::Patch;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    #[default]
    Present,
    Absent,
    Late,
    HalfDay,
}

impl TryFrom<String> for AttendanceStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Check-in / check-out workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceAction {
    CheckIn,
    CheckOut,
}

/// One row per employee per calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attendance {
    pub id: u64,
    pub employee_id: u64,
    pub date: NaiveDate,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    #[sqlx(try_from = "String")]
    pub status: AttendanceStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttendance {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceChanges {
    pub check_in: Patch<NaiveTime>,
    pub check_out: Patch<NaiveTime>,
    pub status: Option<AttendanceStatus>,
    pub notes: Patch<String>,
}

impl AttendanceChanges {
    #[cfg(test)]
    pub fn apply_to(&self, record: &mut Attendance) {
        record.check_in = self.check_in.clone().merge(record.check_in);
        record.check_out = self.check_out.clone().merge(record.check_out);
        if let Some(status) = self.status {
            record.status = status;
        }
        record.notes = self.notes.clone().merge(record.notes.take());
    }
}

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// `None` when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    #[cfg(test)]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Repository-level selection of attendance rows.
#[derive(Debug, Clone, Default)]
pub struct AttendanceCriteria {
    pub employee_id: Option<u64>,
    pub dates: Option<DateRange>,
    pub status: Option<AttendanceStatus>,
    /// Strictly later check-in than this time.
    pub checked_in_after: Option<NaiveTime>,
}

impl AttendanceCriteria {
    pub fn for_employee(employee_id: u64) -> Self {
        Self {
            employee_id: Some(employee_id),
            ..Self::default()
        }
    }

    pub fn on(date: NaiveDate) -> Self {
        Self {
            dates: Some(DateRange::day(date)),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn matches(&self, record: &Attendance) -> bool {
        if self.employee_id.is_some_and(|id| id != record.employee_id) {
            return false;
        }
        if self.dates.is_some_and(|range| !range.contains(record.date)) {
            return false;
        }
        if self.status.is_some_and(|s| s != record.status) {
            return false;
        }
        match self.checked_in_after {
            Some(threshold) => record.check_in.is_some_and(|t| t > threshold),
            None => true,
        }
    }
}
