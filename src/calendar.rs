// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Week selection and Monday-to-Sunday windows

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
use serde::Serialize;

use crate::constants::limits;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeekError {
    #[error("Invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("ISO week {week} does not exist in {year}")]
    InvalidIsoWeek { year: i32, week: u32 },

    #[error("History length must be between 1 and {max}, got {weeks}")]
    InvalidHistoryLength { weeks: u32, max: u32 },

    #[error("Date out of supported range")]
    OutOfRange,
}

/// Which week a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekSelection {
    /// The week containing today
    Current,
    /// The week containing this date
    StartingOn(NaiveDate),
    Iso { year: i32, week: u32 },
}

impl WeekSelection {
    /// Interpret the `week_start` / `iso_year` / `iso_week` request parameters
    ///
    /// `week_start` takes precedence. A lone ISO component is completed from
    /// today's ISO week.
    pub fn from_params(
        week_start: Option<&str>,
        iso_year: Option<i32>,
        iso_week: Option<u32>,
        today: NaiveDate,
    ) -> Result<Self, WeekError> {
        if let Some(raw) = week_start.map(str::trim).filter(|s| !s.is_empty()) {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|source| WeekError::InvalidDate {
                value: raw.to_string(),
                source,
            })?;
            return Ok(WeekSelection::StartingOn(date));
        }

        if iso_year.is_none() && iso_week.is_none() {
            return Ok(WeekSelection::Current);
        }

        let current = today.iso_week();
        let year = iso_year.unwrap_or(current.year());
        let week = iso_week.unwrap_or(current.week());
        if NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).is_none() {
            return Err(WeekError::InvalidIsoWeek { year, week });
        }
        Ok(WeekSelection::Iso { year, week })
    }

    fn monday(&self, today: NaiveDate) -> Result<NaiveDate, WeekError> {
        match *self {
            WeekSelection::Current => monday_of(today),
            WeekSelection::StartingOn(date) => monday_of(date),
            WeekSelection::Iso { year, week } => {
                NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).ok_or(WeekError::InvalidIsoWeek { year, week })
            }
        }
    }
}

fn monday_of(date: NaiveDate) -> Result<NaiveDate, WeekError> {
    let offset = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(offset)).ok_or(WeekError::OutOfRange)
}

/// One Monday-to-Sunday week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekWindow {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub iso_year: i32,
    pub iso_week: u32,
    /// Epoch seconds of Monday 00:00:00 local
    #[serde(skip)]
    pub after_ts: i64,
    /// Epoch seconds of Sunday 23:59:59 local
    #[serde(skip)]
    pub before_ts: i64,
}

impl WeekWindow {
    pub fn for_selection<Tz: TimeZone>(selection: WeekSelection, today: NaiveDate, tz: &Tz) -> Result<Self, WeekError> {
        Self::starting(selection.monday(today)?, tz)
    }

    /// Window for the week starting on `monday`, bounds taken in `tz`
    pub fn starting<Tz: TimeZone>(monday: NaiveDate, tz: &Tz) -> Result<Self, WeekError> {
        let week_end = monday.checked_add_days(Days::new(6)).ok_or(WeekError::OutOfRange)?;
        let next_monday = monday.checked_add_days(Days::new(7)).ok_or(WeekError::OutOfRange)?;
        let iso = monday.iso_week();

        Ok(Self {
            week_start: monday,
            week_end,
            iso_year: iso.year(),
            iso_week: iso.week(),
            after_ts: local_midnight(monday, tz),
            before_ts: local_midnight(next_monday, tz) - 1,
        })
    }

    pub fn previous(&self, tz: &impl TimeZone) -> Result<Self, WeekError> {
        let monday = self.week_start.checked_sub_days(Days::new(7)).ok_or(WeekError::OutOfRange)?;
        Self::starting(monday, tz)
    }
}

fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> i64 {
    let midnight = NaiveDateTime::from(date);
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.timestamp())
        // midnight skipped by a DST jump
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight).timestamp())
}

/// `weeks` consecutive windows ending with `last`, oldest first
pub fn history_windows<Tz: TimeZone>(last: &WeekWindow, weeks: u32, tz: &Tz) -> Result<Vec<WeekWindow>, WeekError> {
    if weeks == 0 || weeks > limits::MAX_HISTORY_WEEKS {
        return Err(WeekError::InvalidHistoryLength {
            weeks,
            max: limits::MAX_HISTORY_WEEKS,
        });
    }

    let mut windows = Vec::with_capacity(weeks as usize);
    let mut current = *last;
    windows.push(current);
    for _ in 1..weeks {
        current = current.previous(tz)?;
        windows.push(current);
    }
    windows.reverse();
    Ok(windows)
}
