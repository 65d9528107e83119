use chrono::{NaiveDate, NaiveTime};
use sqlx::mysql::MySqlArguments;
use sqlx::Arguments;

use crate::utils::patch::Patch;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    F64(f64),
    Date(NaiveDate),
    Time(NaiveTime),
    Null,
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::String(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::String(v.to_string())
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        SqlValue::U64(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<NaiveTime> for SqlValue {
    fn from(v: NaiveTime) -> Self {
        SqlValue::Time(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// Collect values into MySQL positional arguments, in order.
pub fn to_arguments(values: Vec<SqlValue>) -> MySqlArguments {
    let mut args = MySqlArguments::default();

    for value in values {
        match value {
            SqlValue::String(v) => args.add(v),
            SqlValue::U64(v) => args.add(v),
            SqlValue::F64(v) => args.add(v),
            SqlValue::Date(v) => args.add(v),
            SqlValue::Time(v) => args.add(v),
            SqlValue::Null => args.add(None::<String>),
        }
    }

    args
}

/// ===============================
/// WHERE clause builder
/// ===============================
#[derive(Debug, Default)]
pub struct SqlFilter {
    conditions: Vec<String>,
    values: Vec<SqlValue>,
}

impl SqlFilter {
    /// Adds a condition with its `?` placeholders bound to `values`, in order.
    pub fn push(&mut self, condition: impl Into<String>, values: impl IntoIterator<Item = SqlValue>) {
        self.conditions.push(condition.into());
        self.values.extend(values);
    }

    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

/// ===============================
/// Partial UPDATE builder
/// ===============================
///
/// Column names are `&'static str` so only code-side identifiers ever reach
/// the statement text.
#[derive(Debug)]
pub struct SqlUpdate {
    table: &'static str,
    assignments: Vec<&'static str>,
    values: Vec<SqlValue>,
}

impl SqlUpdate {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            assignments: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn set(&mut self, column: &'static str, value: impl Into<SqlValue>) -> &mut Self {
        self.assignments.push(column);
        self.values.push(value.into());
        self
    }

    pub fn set_opt<T: Into<SqlValue>>(&mut self, column: &'static str, value: Option<T>) -> &mut Self {
        if let Some(value) = value {
            self.set(column, value);
        }
        self
    }

    pub fn patch<T: Into<SqlValue>>(&mut self, column: &'static str, patch: Patch<T>) -> &mut Self {
        match patch {
            Patch::Unset => {}
            Patch::Null => {
                self.set(column, SqlValue::Null);
            }
            Patch::Set(value) => {
                self.set(column, value);
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Final statement and its arguments, with `WHERE id = ?` appended.
    pub fn build(self, id: u64) -> (String, MySqlArguments) {
        let set_clause = self
            .assignments
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!("UPDATE {} SET {} WHERE id = ?", self.table, set_clause);

        let mut values = self.values;
        values.push(SqlValue::U64(id));

        (sql, to_arguments(values))
    }

    #[cfg(test)]
    fn statement(&self) -> String {
        let set_clause = self
            .assignments
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("UPDATE {} SET {} WHERE id = ?", self.table, set_clause)
    }
}
