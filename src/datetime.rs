//! Calendar dates and UTC timestamps of FB2 metadata.
//!
//! # Parsing
//! `<date>` and `<year>` hold free-form text, so [`Date::parse`] only looks
//! for digit runs:
//! - `1965` → `1965-01-01`
//! - `1965.8` → `1965-08-01`
//! - `August 1965` → `1965-01-01`
//! - `19650801` → `1965-08-01`
//!
//! The first number is always taken as the year (`01.08.1965` is not reordered).

use std::fmt::Display;

const SECONDS_PER_DAY: i64 = 86_400;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A UTC instant with second precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime {
    date: Date,
    time: Time,
}

impl DateTime {
    pub fn new(date: Date, time: Time) -> Self {
        Self { date, time }
    }

    /// The current instant and the UNIX timestamp it was derived from.
    pub fn now() -> (Self, i64) {
        let timestamp = match std::time::UNIX_EPOCH.elapsed() {
            Ok(elapsed) => elapsed.as_secs() as i64,
            Err(error) => -(error.duration().as_secs() as i64),
        };

        (Self::from_unix(timestamp), timestamp)
    }

    /// Converts a UNIX timestamp (seconds) to a UTC instant.
    ///
    /// # Examples
    /// ```
    /// # use fb2merge::datetime::DateTime;
    /// let finished = DateTime::from_unix(1_700_000_000);
    ///
    /// assert_eq!("2023-11-14T22:13:20Z", finished.to_string());
    /// assert_eq!("14 November, 2023", finished.date().to_long_string());
    /// ```
    pub fn from_unix(timestamp: i64) -> Self {
        let days = timestamp.div_euclid(SECONDS_PER_DAY);
        let seconds = timestamp.rem_euclid(SECONDS_PER_DAY) as u32;
        let (year, month, day) = civil_from_days(days);

        Self {
            date: Date::new(year.clamp(-9999, 9999) as i16, month, day),
            time: Time::new(
                (seconds / 3600) as u8,
                (seconds / 60 % 60) as u8,
                (seconds % 60) as u8,
            ),
        }
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn time(&self) -> Time {
        self.time
    }
}

impl Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}T{}Z", self.date, self.time)
    }
}

/// A Gregorian calendar date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    year: i16,
    month: u8,
    day: u8,
}

impl Date {
    /// Creates a date, clamping the year to `[-9999, 9999]`,
    /// the month to `[1, 12]` and the day to `[1, 31]`.
    pub fn new(year: i16, month: u8, day: u8) -> Self {
        Self {
            year: year.clamp(-9999, 9999),
            month: month.clamp(1, 12),
            day: day.clamp(1, 31),
        }
    }

    /// Extracts a date from free-form text; see the [module](self) docs.
    ///
    /// A missing month or day defaults to `1`.
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        let mut fields = Fields { rest: raw };

        let year = fields.next(4)?;
        let month = fields.next(2);
        let day = month.and_then(|_| fields.next(2));

        Some(Self::new(
            year as i16,
            month.unwrap_or(1) as u8,
            day.unwrap_or(1) as u8,
        ))
    }

    pub fn year(&self) -> i16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    /// The form used for the text of a `<date>` element (`16 October, 2026`).
    pub fn to_long_string(&self) -> String {
        let month = MONTHS[usize::from(self.month - 1)];
        format!("{:0>2} {month}, {}", self.day, self.year)
    }
}

impl Display for Date {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:0>4}-{:0>2}-{:0>2}", self.year, self.month, self.day)
    }
}

/// A UTC time of day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time {
    hour: u8,
    minute: u8,
    second: u8,
}

impl Time {
    pub fn new(hour: u8, minute: u8, second: u8) -> Self {
        Self {
            hour: hour.min(23),
            minute: minute.min(59),
            second: second.min(59),
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn second(&self) -> u8 {
        self.second
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:0>2}:{:0>2}:{:0>2}", self.hour, self.minute, self.second)
    }
}

/// Successive numeric fields of free-form date text.
struct Fields<'a> {
    rest: &'a str,
}

impl Fields<'_> {
    /// Skips to the next digit and reads at most `width` digits.
    fn next(&mut self, width: usize) -> Option<u32> {
        let start = self.rest.trim_start_matches(|c: char| !c.is_ascii_digit());
        let len = start
            .bytes()
            .take(width)
            .take_while(u8::is_ascii_digit)
            .count();

        if len == 0 {
            self.rest = start;
            return None;
        }
        let (digits, rest) = start.split_at(len);
        self.rest = rest;
        digits.parse().ok()
    }
}

/// Days since 1970-01-01 to a `(year, month, day)` triple.
///
/// See <https://howardhinnant.github.io/date_algorithms.html#civil_from_days>.
fn civil_from_days(days: i64) -> (i64, u8, u8) {
    const DAYS_PER_ERA: i64 = 146_097;

    // Eras of 400 years starting on 0000-03-01
    let shifted = days + 719_468;
    let era = shifted.div_euclid(DAYS_PER_ERA);
    let day_of_era = shifted.rem_euclid(DAYS_PER_ERA);
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / (DAYS_PER_ERA - 1)) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    // Months counted from March
    let month_index = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * month_index + 2) / 5 + 1;
    let month = if month_index < 10 { month_index + 3 } else { month_index - 9 };
    let year = year_of_era + era * 400 + i64::from(month <= 2);

    (year, month as u8, day as u8)
}
