use chrono::{Datelike, Local, NaiveDateTime, Timelike};

/// Source of the local wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// April 20th
pub fn is_holiday(now: &NaiveDateTime) -> bool {
    now.month() == 4 && now.day() == 20
}

/// 4:20, morning or afternoon
pub fn is_four_twenty(now: &NaiveDateTime) -> bool {
    now.hour() % 12 == 4 && now.minute() == 20
}

#[cfg(test)]
pub struct FixedClock(pub NaiveDateTime);

#[cfg(test)]
impl FixedClock {
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        let time = chrono::NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .expect("valid test date");
        Self(time)
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
