use chrono::{Local, NaiveDate, NaiveTime, Timelike};

/// Source of "today" and "now" for the attendance workflow.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;

    /// Wall-clock time of day, whole seconds.
    fn now_time(&self) -> NaiveTime;
}

/// Server local time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now_time(&self) -> NaiveTime {
        let now = Local::now().time();
        now.with_nanosecond(0).unwrap_or(now)
    }
}

#[cfg(test)]
pub use fixed::FixedClock;
