use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};

use crate::error::{AppError, Result};

/// An ISO-8601 week: week-numbering year plus week 1..=53.
///
/// Only constructible for weeks that exist, so the Monday is always known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekId {
    year: i32,
    week: u32,
    monday: NaiveDate,
}

impl WeekId {
    pub fn new(week: u32, year: i32) -> Result<Self> {
        if !(1..=53).contains(&week) {
            return Err(AppError::InvalidInput(format!(
                "week number {} is outside 1..=53",
                week
            )));
        }
        let monday = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).ok_or_else(|| {
            AppError::InvalidInput(format!("ISO year {} has no week {}", year, week))
        })?;
        Ok(Self { year, week, monday })
    }

    /// The ISO week containing `date`, using its UTC calendar day.
    pub fn of(date: DateTime<Utc>) -> Self {
        let day = date.date_naive();
        let iso = day.iso_week();
        let monday = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
        Self {
            year: iso.year(),
            week: iso.week(),
            monday,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    pub fn monday(&self) -> NaiveDate {
        self.monday
    }

    pub fn sunday(&self) -> NaiveDate {
        self.monday + Duration::days(6)
    }

    /// Canonical digest key, zero-padded so lexicographic order is chronological.
    pub fn key(&self) -> String {
        format!("{}-W{:02}", self.year, self.week)
    }

    /// `"DD.MM.YYYY–DD.MM.YYYY"` for the Monday..Sunday span.
    pub fn date_range(&self) -> String {
        format!(
            "{}–{}",
            self.monday.format("%d.%m.%Y"),
            self.sunday().format("%d.%m.%Y")
        )
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.monday.and_time(NaiveTime::MIN).and_utc()
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start() + Duration::days(7) - Duration::milliseconds(1)
    }

    /// Inclusive on both ends.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start() <= at && at <= self.end()
    }
}

impl fmt::Display for WeekId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

impl FromStr for WeekId {
    type Err = AppError;

    /// Accepts `2026-W04` as well as unpadded `2026-W4` keys.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || AppError::InvalidInput(format!("not a week key: {:?}", s));
        let (year, week) = s.trim().split_once("-W").ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let week: u32 = week.parse().map_err(|_| invalid())?;
        Self::new(week, year)
    }
}

pub fn week_number(date: DateTime<Utc>) -> u32 {
    date.iso_week().week()
}

pub fn week_date_range(week_number: u32, year: i32) -> Result<String> {
    Ok(WeekId::new(week_number, year)?.date_range())
}

/// Monday 00:00:00.000 UTC on or before `date`.
pub fn week_start(date: DateTime<Utc>) -> DateTime<Utc> {
    WeekId::of(date).start()
}

/// Sunday 23:59:59.999 UTC on or after `date`.
pub fn week_end(date: DateTime<Utc>) -> DateTime<Utc> {
    WeekId::of(date).end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_first_thursday_is_week_one() {
        let jan_first = utc(2026, 1, 1, 12, 0, 0);
        assert_eq!(jan_first.weekday(), Weekday::Thu);
        assert_eq!(week_number(jan_first), 1);
        assert_eq!(week_date_range(1, 2026).unwrap(), "29.12.2025–04.01.2026");
    }

    #[test]
    fn test_year_boundaries_use_iso_year() {
        let late_december = WeekId::of(utc(2024, 12, 30, 8, 0, 0));
        assert_eq!(late_december.key(), "2025-W01");

        let early_january = WeekId::of(utc(2021, 1, 3, 8, 0, 0));
        assert_eq!(early_january.key(), "2020-W53");
    }

    #[test]
    fn test_week_bounds() {
        let wednesday = utc(2026, 1, 14, 15, 30, 0);
        assert_eq!(week_start(wednesday), utc(2026, 1, 12, 0, 0, 0));
        assert_eq!(
            week_end(wednesday),
            utc(2026, 1, 18, 23, 59, 59) + Duration::milliseconds(999)
        );
    }

    #[test]
    fn test_bounds_of_boundary_instants() {
        let monday = utc(2026, 1, 12, 0, 0, 0);
        assert_eq!(week_start(monday), monday);

        let sunday_last_ms = utc(2026, 1, 18, 23, 59, 59) + Duration::milliseconds(999);
        assert_eq!(week_end(sunday_last_ms), sunday_last_ms);

        let week = WeekId::of(monday);
        assert!(week.contains(monday));
        assert!(week.contains(sunday_last_ms));
        assert!(!week.contains(utc(2026, 1, 19, 0, 0, 0)));
    }

    #[test]
    fn test_key_is_zero_padded_and_sorts_chronologically() {
        let w9 = WeekId::new(9, 2026).unwrap();
        let w10 = WeekId::new(10, 2026).unwrap();
        assert_eq!(w9.key(), "2026-W09");
        assert!(w9.key() < w10.key());
        assert_eq!(w9.to_string(), w9.key());
    }

    #[test]
    fn test_parse_accepts_legacy_unpadded_keys() {
        let parsed: WeekId = "2026-W4".parse().unwrap();
        assert_eq!(parsed.key(), "2026-W04");
        assert!("2026-04".parse::<WeekId>().is_err());
        assert!("2026-Wxx".parse::<WeekId>().is_err());
    }

    #[test]
    fn test_rejects_nonexistent_weeks() {
        assert!(matches!(WeekId::new(0, 2026), Err(AppError::InvalidInput(_))));
        assert!(matches!(WeekId::new(54, 2026), Err(AppError::InvalidInput(_))));
        // 2021 has only 52 ISO weeks
        assert!(week_date_range(53, 2021).is_err());
        assert_eq!(week_date_range(53, 2020).unwrap(), "28.12.2020–03.01.2021");
    }

    #[test]
    fn test_new_matches_of() {
        let at = utc(2026, 6, 17, 23, 0, 0);
        let of = WeekId::of(at);
        assert_eq!(WeekId::new(of.week(), of.year()).unwrap(), of);
    }
}
