//! CF time coordinate decoding across the calendars CMIP5 models use
//!
//! A time coordinate is a list of offsets plus a units string such as
//! `"days since 1850-01-01 00:00:00"` and a `calendar` attribute. Decoding turns
//! each offset into a [`CalendarDate`] in the file's own calendar. Dates from
//! different calendars are only ever compared through [`CalendarDate::date_key`].

use crate::errors::{Cmip5Error, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::borrow::Cow;
use std::fmt;

const SECONDS_PER_DAY: i64 = 86_400;

/// Julian day number of 1582-10-15, the first Gregorian day of the standard calendar
const GREGORIAN_SWITCH_JDN: i64 = 2_299_161;

/// Julian day number of proleptic Gregorian 0000-12-31, day zero of `num_days_from_ce`
const CE_DAY_ZERO_JDN: i64 = 1_721_425;

/// Dates are kept within +/- this many years, well inside chrono's range
const YEAR_LIMIT: i32 = 100_000;

/// Larger offsets cannot land inside `YEAR_LIMIT` in any calendar
const MAX_OFFSET_SECONDS: f64 = 2.0 * YEAR_LIMIT as f64 * 366.0 * SECONDS_PER_DAY as f64;

const CUMULATIVE_DAYS: [i64; 13] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334, 365];
const CUMULATIVE_DAYS_LEAP: [i64; 13] = [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335, 366];

/// Units strings some models publish that are not valid CF epochs
const EPOCH_FIXES: [(&str, &str); 2] = [
    ("days since 0001-01", "days since 0001-01-01"),
    ("days since 0000-01-01 00:00:00", "days since 0001-01-01 00:00:00"),
];

/// Calendars found in CMIP5 time coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Calendar {
    /// Mixed Julian/Gregorian calendar switching on 1582-10-15
    Standard,
    ProlepticGregorian,
    Julian,
    /// 365 days every year
    NoLeap,
    /// 366 days every year
    AllLeap,
    /// Twelve 30-day months
    Day360,
}

impl Calendar {
    /// Parse a CF `calendar` attribute value
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "standard" | "gregorian" => Ok(Self::Standard),
            "proleptic_gregorian" => Ok(Self::ProlepticGregorian),
            "julian" => Ok(Self::Julian),
            "noleap" | "365_day" => Ok(Self::NoLeap),
            "all_leap" | "366_day" => Ok(Self::AllLeap),
            "360_day" => Ok(Self::Day360),
            _ => Err(Cmip5Error::UnknownCalendar(name.to_string())),
        }
    }

    /// Whether the calendar has no year zero (CF reference dates must avoid it)
    const fn rejects_year_zero(self) -> bool {
        matches!(self, Self::Standard | Self::Julian)
    }

    #[must_use]
    pub fn is_leap_year(self, year: i32) -> bool {
        match self {
            Self::Standard if year <= 1582 => julian_leap(year),
            Self::Standard | Self::ProlepticGregorian => gregorian_leap(year),
            Self::Julian => julian_leap(year),
            Self::NoLeap | Self::Day360 => false,
            Self::AllLeap => true,
        }
    }

    #[must_use]
    pub fn month_length(self, year: i32, month: u32) -> u32 {
        if self == Self::Day360 {
            return 30;
        }
        match month {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            _ if self.is_leap_year(year) => 29,
            _ => 28,
        }
    }

    fn is_valid(self, year: i32, month: u32, day: u32) -> bool {
        (-YEAR_LIMIT..=YEAR_LIMIT).contains(&year)
            && (1..=12).contains(&month)
            && day >= 1
            && day <= self.month_length(year, month)
    }

    /// Count of days from a calendar-specific origin; only differences are meaningful
    fn day_number(self, year: i32, month: u32, day: u32) -> Option<i64> {
        let (y, m, d) = (i64::from(year), i64::from(month), i64::from(day));
        match self {
            Self::Standard if (year, month, day) < (1582, 10, 15) => Some(julian_to_jdn(y, m, d)),
            Self::Standard | Self::ProlepticGregorian => gregorian_to_jdn(year, month, day),
            Self::Julian => Some(julian_to_jdn(y, m, d)),
            Self::NoLeap => Some(y * 365 + CUMULATIVE_DAYS[(m - 1) as usize] + d - 1),
            Self::AllLeap => Some(y * 366 + CUMULATIVE_DAYS_LEAP[(m - 1) as usize] + d - 1),
            Self::Day360 => Some(y * 360 + (m - 1) * 30 + d - 1),
        }
    }

    fn from_day_number(self, n: i64) -> Option<(i64, i64, i64)> {
        match self {
            Self::Standard if n < GREGORIAN_SWITCH_JDN => Some(jdn_to_julian(n)),
            Self::Standard | Self::ProlepticGregorian => jdn_to_gregorian(n),
            Self::Julian => Some(jdn_to_julian(n)),
            Self::NoLeap => Some(split_fixed_year(n, 365, &CUMULATIVE_DAYS)),
            Self::AllLeap => Some(split_fixed_year(n, 366, &CUMULATIVE_DAYS_LEAP)),
            Self::Day360 => {
                let year = n.div_euclid(360);
                let rem = n.rem_euclid(360);
                Some((year, rem / 30 + 1, rem % 30 + 1))
            }
        }
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Standard => "standard",
            Self::ProlepticGregorian => "proleptic_gregorian",
            Self::Julian => "julian",
            Self::NoLeap => "noleap",
            Self::AllLeap => "all_leap",
            Self::Day360 => "360_day",
        };
        f.write_str(name)
    }
}

fn gregorian_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn julian_leap(year: i32) -> bool {
    year.rem_euclid(4) == 0
}

fn gregorian_to_jdn(year: i32, month: u32, day: u32) -> Option<i64> {
    NaiveDate::from_ymd_opt(year, month, day).map(|date| i64::from(date.num_days_from_ce()) + CE_DAY_ZERO_JDN)
}

fn jdn_to_gregorian(jdn: i64) -> Option<(i64, i64, i64)> {
    let days = i32::try_from(jdn - CE_DAY_ZERO_JDN).ok()?;
    let date = NaiveDate::from_num_days_from_ce_opt(days)?;
    Some((i64::from(date.year()), i64::from(date.month()), i64::from(date.day())))
}

fn julian_to_jdn(year: i64, month: i64, day: i64) -> i64 {
    let a = (14 - month) / 12;
    let y = year + 4800 - a;
    let m = month + 12 * a - 3;
    day + (153 * m + 2) / 5 + 365 * y + y / 4 - 32083
}

fn jdn_to_julian(jdn: i64) -> (i64, i64, i64) {
    let c = jdn + 32082;
    let d = (4 * c + 3) / 1461;
    let e = c - 1461 * d / 4;
    let m = (5 * e + 2) / 153;
    let day = e - (153 * m + 2) / 5 + 1;
    let month = m + 3 - 12 * (m / 10);
    let year = d - 4800 + m / 10;
    (year, month, day)
}

fn split_fixed_year(n: i64, year_length: i64, cumulative: &[i64; 13]) -> (i64, i64, i64) {
    let year = n.div_euclid(year_length);
    let doy = n.rem_euclid(year_length);
    let month = cumulative[1..].iter().position(|&end| doy < end).unwrap_or(11);
    (year, month as i64 + 1, doy - cumulative[month] + 1)
}

/// A timestamp in its source calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDate {
    pub calendar: Calendar,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl CalendarDate {
    /// Build a validated date at midnight
    pub fn new(calendar: Calendar, year: i32, month: u32, day: u32) -> Option<Self> {
        calendar.is_valid(year, month, day).then_some(Self {
            calendar,
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
        })
    }

    #[must_use]
    pub fn with_time(mut self, hour: u32, minute: u32, second: u32) -> Self {
        self.hour = hour;
        self.minute = minute;
        self.second = second;
        self
    }

    fn seconds_of_day(&self) -> i64 {
        i64::from(self.hour) * 3600 + i64::from(self.minute) * 60 + i64::from(self.second)
    }

    /// Ordering key: days since 0001-01-01 00:00:00 in the standard calendar
    ///
    /// The month start is exact; the position inside the month is rescaled from
    /// the source month length to the standard one, so dates that do not exist
    /// in the standard calendar (360-day February 30th) still sort inside their
    /// own month.
    #[must_use]
    pub fn date_key(&self) -> f64 {
        let standard = Calendar::Standard;
        let month_start = match (standard.day_number(1, 1, 1), standard.day_number(self.year, self.month, 1)) {
            (Some(epoch), Some(start)) => start - epoch,
            _ => return f64::NAN,
        };

        let within = f64::from(self.day - 1) + self.seconds_of_day() as f64 / SECONDS_PER_DAY as f64;
        let source_len = f64::from(self.calendar.month_length(self.year, self.month));
        let standard_len = f64::from(standard.month_length(self.year, self.month));

        month_start as f64 + within * standard_len / source_len
    }

    /// The same fields as a chrono timestamp, for calendars that agree with Gregorian dates
    #[must_use]
    pub fn to_naive_datetime(&self) -> Option<NaiveDateTime> {
        match self.calendar {
            Calendar::Standard if self.year > 1582 => {}
            Calendar::ProlepticGregorian => {}
            _ => return None,
        }
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)?
            .and_hms_opt(self.hour, self.minute, self.second)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Replace the known malformed epochs with their standard spelling
pub fn normalize_units(units: &str) -> Cow<'_, str> {
    let trimmed = units.trim();
    EPOCH_FIXES
        .iter()
        .find(|(bad, _)| *bad == trimmed)
        .map_or(Cow::Borrowed(trimmed), |(_, good)| Cow::Borrowed(*good))
}

/// A parsed `"<unit> since <reference>"` string bound to a calendar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUnits {
    seconds_per_unit: f64,
    reference: CalendarDate,
}

impl TimeUnits {
    /// Parse a CF units string such as `"days since 1850-01-01 00:00:00"`
    pub fn parse(units: &str, calendar: Calendar) -> Result<Self> {
        let invalid = |reason: &str| Cmip5Error::InvalidTimeUnits {
            units: units.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = units.split_whitespace().collect();
        if parts.len() < 3 || !parts[1].eq_ignore_ascii_case("since") {
            return Err(invalid("expected '<unit> since <date>'"));
        }

        let seconds_per_unit = match parts[0].to_ascii_lowercase().as_str() {
            "day" | "days" | "d" => 86_400.0,
            "hour" | "hours" | "hr" | "h" => 3_600.0,
            "minute" | "minutes" | "min" => 60.0,
            "second" | "seconds" | "sec" | "s" => 1.0,
            _ => return Err(invalid("unsupported time unit")),
        };

        // "YYYY-MM-DD HH:MM:SS" or "YYYY-MM-DDTHH:MM:SS"
        let (date_part, time_part) = match parts[2].split_once('T') {
            Some((date, time)) => (date, Some(time)),
            None => (parts[2], parts.get(3).copied()),
        };

        let fields: Vec<&str> = date_part.split('-').collect();
        let (year, month, day) = match fields.as_slice() {
            [y, m, d] => (
                y.parse::<i32>().map_err(|_| invalid("bad reference year"))?,
                m.parse::<u32>().map_err(|_| invalid("bad reference month"))?,
                d.parse::<u32>().map_err(|_| invalid("bad reference day"))?,
            ),
            _ => return Err(invalid("reference date must be YYYY-MM-DD")),
        };
        if year == 0 && calendar.rejects_year_zero() {
            return Err(invalid("year zero does not exist in this calendar"));
        }

        let mut reference = CalendarDate::new(calendar, year, month, day)
            .ok_or_else(|| invalid("reference date does not exist in this calendar"))?;

        if let Some(time) = time_part {
            let time = time.trim_end_matches('Z');
            let hms: Vec<&str> = time.split(':').collect();
            let field = |i: usize| -> Result<u32> {
                match hms.get(i) {
                    None => Ok(0),
                    Some(s) => s
                        .parse::<f64>()
                        .map(|v| v.floor() as u32)
                        .map_err(|_| invalid("bad reference time")),
                }
            };
            let (hour, minute, second) = (field(0)?, field(1)?, field(2)?);
            if hour > 23 || minute > 59 || second > 60 {
                return Err(invalid("reference time out of range"));
            }
            reference = reference.with_time(hour, minute, second);
        }

        Ok(Self {
            seconds_per_unit,
            reference,
        })
    }

    #[must_use]
    pub fn calendar(&self) -> Calendar {
        self.reference.calendar
    }

    /// Decode one offset into a date in the reference calendar
    ///
    /// Offsets whose date would fall outside +/- 100000 years (typically an
    /// undeclared fill value such as `1e20`) are rejected instead of wrapping.
    pub fn decode(&self, value: f64) -> Result<CalendarDate> {
        if !value.is_finite() {
            return Err(Cmip5Error::InvalidTimeUnits {
                units: format!("since {}", self.reference),
                reason: format!("non-finite time value {value}"),
            });
        }
        let out_of_range = || Cmip5Error::TimeOutOfRange {
            value,
            reference: self.reference.to_string(),
        };

        let offset = (value * self.seconds_per_unit).round();
        if offset.abs() > MAX_OFFSET_SECONDS {
            return Err(out_of_range());
        }
        let calendar = self.calendar();
        let total = self
            .reference
            .seconds_of_day()
            .checked_add(offset as i64)
            .ok_or_else(out_of_range)?;
        let days = total.div_euclid(SECONDS_PER_DAY);
        let seconds = total.rem_euclid(SECONDS_PER_DAY);

        let (year, month, day) = calendar
            .day_number(self.reference.year, self.reference.month, self.reference.day)
            .and_then(|start| start.checked_add(days))
            .and_then(|n| calendar.from_day_number(n))
            .ok_or_else(out_of_range)?;
        let year = i32::try_from(year)
            .ok()
            .filter(|y| (-YEAR_LIMIT..=YEAR_LIMIT).contains(y))
            .ok_or_else(out_of_range)?;

        Ok(CalendarDate {
            calendar,
            year,
            month: month as u32,
            day: day as u32,
            hour: (seconds / 3600) as u32,
            minute: (seconds % 3600 / 60) as u32,
            second: (seconds % 60) as u32,
        })
    }

    /// Decode a whole time coordinate
    pub fn decode_all(&self, values: &[f64]) -> Result<Vec<CalendarDate>> {
        values.iter().map(|&v| self.decode(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(calendar: Calendar, y: i32, m: u32, d: u32) -> CalendarDate {
        CalendarDate::new(calendar, y, m, d).unwrap()
    }

    #[test]
    fn calendar_names() {
        assert_eq!(Calendar::parse("gregorian").unwrap(), Calendar::Standard);
        assert_eq!(Calendar::parse("365_day").unwrap(), Calendar::NoLeap);
        assert_eq!(Calendar::parse("360_day").unwrap(), Calendar::Day360);
        assert!(matches!(
            Calendar::parse("lunar"),
            Err(Cmip5Error::UnknownCalendar(_))
        ));
    }

    #[test]
    fn malformed_epochs_are_normalized() {
        assert_eq!(normalize_units("days since 0001-01"), "days since 0001-01-01");
        assert_eq!(
            normalize_units("days since 0000-01-01 00:00:00"),
            "days since 0001-01-01 00:00:00"
        );
        assert_eq!(normalize_units("days since 1850-01-01"), "days since 1850-01-01");
        assert!(TimeUnits::parse("days since 0001-01", Calendar::Standard).is_err());
        assert!(TimeUnits::parse("days since 0000-01-01 00:00:00", Calendar::Standard).is_err());
    }

    #[test]
    fn decode_noleap_and_360_day() {
        let units = TimeUnits::parse("days since 1850-01-01 00:00:00", Calendar::NoLeap).unwrap();
        let d = units.decode(365.0 * 150.0 + 59.5).unwrap();
        assert_eq!((d.year, d.month, d.day, d.hour), (2000, 3, 1, 12));

        let units = TimeUnits::parse("days since 2000-01-01", Calendar::Day360).unwrap();
        let d = units.decode(59.0).unwrap();
        assert_eq!((d.year, d.month, d.day), (2000, 2, 30));
        let d = units.decode(360.0).unwrap();
        assert_eq!((d.year, d.month, d.day), (2001, 1, 1));
    }

    #[test]
    fn decode_standard_matches_chrono() {
        let units = TimeUnits::parse("hours since 1970-01-01 00:00:00", Calendar::Standard).unwrap();
        let d = units.decode(24.0 * 11_016.0 + 6.0).unwrap();
        let expected = NaiveDate::from_ymd_opt(2000, 2, 29)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        assert_eq!(d.to_naive_datetime(), Some(expected));
    }

    #[test]
    fn standard_calendar_crosses_the_gregorian_switch() {
        let units = TimeUnits::parse("days since 1582-10-04", Calendar::Standard).unwrap();
        let d = units.decode(1.0).unwrap();
        assert_eq!((d.year, d.month, d.day), (1582, 10, 15));

        let units = TimeUnits::parse("days since 1582-10-04", Calendar::ProlepticGregorian).unwrap();
        let d = units.decode(1.0).unwrap();
        assert_eq!((d.year, d.month, d.day), (1582, 10, 5));
    }

    #[test]
    fn gregorian_days_agree_with_chrono_day_counts() {
        let cases = [(1582, 10, 15), (1600, 2, 29), (1900, 3, 1), (2000, 2, 29), (2100, 12, 31)];
        for (y, m, d) in cases {
            let expected = NaiveDate::from_ymd_opt(y, m, d).unwrap().num_days_from_ce();
            let n = Calendar::ProlepticGregorian.day_number(y, m, d).unwrap();
            assert_eq!(n - CE_DAY_ZERO_JDN, i64::from(expected));
            assert_eq!(Calendar::Standard.day_number(y, m, d), Some(n));
            assert_eq!(
                Calendar::ProlepticGregorian.from_day_number(n),
                Some((i64::from(y), i64::from(m), i64::from(d)))
            );
        }
        // The last Julian day of the standard calendar is the day before the switch
        let oct4 = Calendar::Standard.day_number(1582, 10, 4).unwrap();
        assert_eq!(oct4 + 1, GREGORIAN_SWITCH_JDN);
    }

    #[test]
    fn huge_offsets_are_rejected_without_overflow() {
        let units = TimeUnits::parse("days since 1850-01-01 12:00:00", Calendar::Standard).unwrap();
        assert!(matches!(units.decode(1.0e20), Err(Cmip5Error::TimeOutOfRange { .. })));
        assert!(matches!(units.decode(-1.0e20), Err(Cmip5Error::TimeOutOfRange { .. })));
        assert!(matches!(units.decode(1.0e15), Err(Cmip5Error::TimeOutOfRange { .. })));
        assert!(units.decode(f64::INFINITY).is_err());

        let units = TimeUnits::parse("seconds since 2000-01-01 23:59:59", Calendar::NoLeap).unwrap();
        assert!(matches!(units.decode(9.3e18), Err(Cmip5Error::TimeOutOfRange { .. })));

        // Large but representable offsets still decode
        let units = TimeUnits::parse("days since 1850-01-01", Calendar::Day360).unwrap();
        assert_eq!(units.decode(360.0 * 50_000.0).unwrap().year, 51_850);
    }

    #[test]
    fn decode_negative_offsets_and_time_of_day() {
        let units = TimeUnits::parse("days since 2000-01-01T12:00:00Z", Calendar::Julian).unwrap();
        let d = units.decode(-0.75).unwrap();
        assert_eq!((d.year, d.month, d.day, d.hour), (1999, 12, 31, 18));
    }

    #[test]
    fn date_key_is_exact_for_standard_dates() {
        assert_eq!(date(Calendar::Standard, 1, 1, 1).date_key(), 0.0);
        assert_eq!(date(Calendar::Standard, 1, 2, 1).date_key(), 31.0);
        let noon = date(Calendar::ProlepticGregorian, 1, 1, 2).with_time(12, 0, 0);
        assert_eq!(noon.date_key(), 1.5);
    }

    #[test]
    fn date_key_keeps_360_day_months_ordered() {
        let feb30 = date(Calendar::Day360, 2001, 2, 30).with_time(23, 0, 0);
        let mar1 = date(Calendar::Day360, 2001, 3, 1);
        let feb29 = date(Calendar::Day360, 2001, 2, 29);
        assert!(feb29.date_key() < feb30.date_key());
        assert!(feb30.date_key() < mar1.date_key());
    }

    #[test]
    fn invalid_dates_are_rejected() {
        assert!(CalendarDate::new(Calendar::NoLeap, 2000, 2, 29).is_none());
        assert!(CalendarDate::new(Calendar::AllLeap, 2001, 2, 29).is_some());
        assert!(CalendarDate::new(Calendar::Standard, 1900, 2, 29).is_none());
        assert!(CalendarDate::new(Calendar::Julian, 1900, 2, 29).is_some());
    }
}
