//! Request syntax checks run before anything reaches a service.
//!
//! Each handler feeds its payload through a [`Validator`]; every failing
//! field is collected so the caller gets all problems in one 400.

use actix_web::{HttpRequest, error::JsonPayloadError, error::PathError, error::QueryPayloadError};
use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, AppResult, FieldError};

pub const INVALID_INPUT: &str = "Invalid input data";

static PERSON_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z\s'-]+$").expect("PERSON_NAME regex should compile"));
static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("EMAIL regex should compile"));
static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d\s\-+()]+$").expect("PHONE regex should compile"));
static DEPARTMENT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9\s\-&]+$").expect("DEPARTMENT_NAME regex should compile"));
static TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-1][0-9]|2[0-3]):[0-5][0-9]:[0-5][0-9]$").expect("TIME regex should compile")
});

#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> bool {
        if !ok {
            self.fail(field, message);
        }
        ok
    }

    fn required<'a>(&mut self, value: &'a str, field: &str, label: &str) -> Option<&'a str> {
        let value = value.trim();
        if value.is_empty() {
            self.fail(field, format!("{label} is required"));
            return None;
        }
        Some(value)
    }

    fn length(&mut self, value: &str, field: &str, label: &str, min: usize, max: usize) -> bool {
        let len = value.chars().count();
        self.check(
            (min..=max).contains(&len),
            field,
            &format!("{label} must be between {min} and {max} characters"),
        )
    }

    fn max_length(&mut self, value: &str, field: &str, label: &str, max: usize) -> bool {
        self.check(
            value.trim().chars().count() <= max,
            field,
            &format!("{label} must not exceed {max} characters"),
        )
    }

    /// Letters, spaces, hyphens and apostrophes.
    pub fn person_name(&mut self, value: &str, field: &str, label: &str, max: usize) {
        let Some(value) = self.required(value, field, label) else {
            return;
        };
        if self.length(value, field, label, 2, max) {
            self.check(
                PERSON_NAME.is_match(value),
                field,
                &format!("{label} can only contain letters, spaces, hyphens, and apostrophes"),
            );
        }
    }

    pub fn email(&mut self, value: &str, field: &str) {
        let Some(value) = self.required(value, field, "Email") else {
            return;
        };
        if self.check(EMAIL.is_match(value), field, "Invalid email format") {
            self.max_length(value, field, "Email", 100);
        }
    }

    pub fn phone(&mut self, value: Option<&str>, field: &str) {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return;
        };
        if self.check(PHONE.is_match(value), field, "Invalid phone number format") {
            self.max_length(value, field, "Phone number", 20);
        }
    }

    pub fn position(&mut self, value: &str, field: &str) {
        if let Some(value) = self.required(value, field, "Position") {
            self.length(value, field, "Position", 2, 100);
        }
    }

    pub fn department_name(&mut self, value: &str, field: &str) {
        let Some(value) = self.required(value, field, "Department name") else {
            return;
        };
        if self.length(value, field, "Department name", 2, 100) {
            self.check(
                DEPARTMENT_NAME.is_match(value),
                field,
                "Department name contains invalid characters",
            );
        }
    }

    pub fn text(&mut self, value: Option<&str>, field: &str, label: &str, max: usize) {
        if let Some(value) = value {
            self.max_length(value, field, label, max);
        }
    }

    pub fn password(&mut self, value: &str, field: &str) {
        if value.is_empty() {
            self.fail(field, "Password is required");
        } else if value.chars().count() < 6 {
            self.fail(field, "Password must be at least 6 characters");
        } else if value.chars().count() > 100 {
            self.fail(field, "Password must not exceed 100 characters");
        }
    }

    pub fn positive_id(&mut self, value: Option<u64>, field: &str, label: &str) {
        if value == Some(0) {
            self.fail(field, format!("{label} must be a positive integer"));
        }
    }

    pub fn salary(&mut self, value: Option<f64>, field: &str) {
        if let Some(value) = value {
            self.check(value.is_finite() && value >= 0.0, field, "Salary must be a positive number");
        }
    }

    /// `YYYY-MM-DD`.
    pub fn date(&mut self, value: &str, field: &str, message: &str) -> Option<NaiveDate> {
        match NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                self.fail(field, message);
                None
            }
        }
    }

    /// Strict `HH:MM:SS`.
    pub fn time(&mut self, value: &str, field: &str, label: &str) -> Option<NaiveTime> {
        let message = format!("{label} time must be in HH:MM:SS format");
        if !self.check(TIME.is_match(value), field, &message) {
            return None;
        }
        NaiveTime::parse_from_str(value, "%H:%M:%S").ok()
    }

    pub fn finish(self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation {
                message: INVALID_INPUT.to_string(),
                details: self.errors,
            })
        }
    }
}

/// Identifier path segments must be positive integers.
pub fn path_id(id: u64, label: &str) -> AppResult<u64> {
    if id == 0 {
        return Err(AppError::validation(
            format!("Invalid {} ID", label.to_lowercase()),
            "id",
            format!("{label} ID must be a positive integer"),
        ));
    }
    Ok(id)
}

pub fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(error = %err, "Rejected JSON payload");
    AppError::validation(INVALID_INPUT, "body", err.to_string()).into()
}

pub fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::validation(INVALID_INPUT, "query", err.to_string()).into()
}

pub fn path_error(_err: PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::validation("Invalid ID", "id", "ID must be a positive integer").into()
}
