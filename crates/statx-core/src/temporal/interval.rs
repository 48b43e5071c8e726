use std::fmt::{Display, Formatter, Write as _};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Date, Month, PrimitiveDateTime, Time};

use crate::error::FormatError;
use crate::temporal::{Duration, TimeUnit};

/// One observation's coverage: a start timestamp plus a calendar duration.
///
/// The compact textual form is `START/DURATION`, where the start may elide
/// trailing calendar fields (`2010`, `2010-03`, `2010-03-15T10:30`); elided
/// fields default to their calendar start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeInterval {
    start: PrimitiveDateTime,
    duration: Duration,
}

impl TimeInterval {
    pub const fn new(start: PrimitiveDateTime, duration: Duration) -> Self {
        Self { start, duration }
    }

    /// Parses `START/DURATION`; an input lacking the `/duration` suffix is
    /// rejected before the start is examined.
    pub fn parse(input: &str) -> Result<Self, FormatError> {
        let (start_text, duration_text) =
            input
                .split_once('/')
                .ok_or_else(|| FormatError::IntervalMissingDuration {
                    value: input.to_owned(),
                })?;
        if duration_text.is_empty() {
            return Err(FormatError::IntervalMissingDuration {
                value: input.to_owned(),
            });
        }

        let duration = Duration::parse(duration_text)?;
        let start = parse_start(start_text).ok_or_else(|| FormatError::IntervalInvalidStart {
            value: start_text.to_owned(),
        })?;

        Ok(Self { start, duration })
    }

    pub const fn start(&self) -> PrimitiveDateTime {
        self.start
    }

    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Exclusive end of the covered span, when representable.
    pub fn end(&self) -> Option<PrimitiveDateTime> {
        self.duration.add_to(self.start)
    }

    /// Re-renders the start at the coarsest precision implied by the
    /// duration's most precise unit, e.g. `2010-01/P2M`.
    pub fn to_short_string(&self) -> String {
        let mut text = String::new();
        let date = self.start.date();
        let time = self.start.time();

        // Infallible: writing to a String cannot fail.
        let _ = match self.duration.finest_unit() {
            TimeUnit::Years => write!(text, "{:04}", date.year()),
            TimeUnit::Months => write!(text, "{:04}-{:02}", date.year(), u8::from(date.month())),
            TimeUnit::Weeks | TimeUnit::Days => write!(
                text,
                "{:04}-{:02}-{:02}",
                date.year(),
                u8::from(date.month()),
                date.day()
            ),
            TimeUnit::Hours => write!(
                text,
                "{:04}-{:02}-{:02}T{:02}",
                date.year(),
                u8::from(date.month()),
                date.day(),
                time.hour()
            ),
            TimeUnit::Minutes => write!(
                text,
                "{:04}-{:02}-{:02}T{:02}:{:02}",
                date.year(),
                u8::from(date.month()),
                date.day(),
                time.hour(),
                time.minute()
            ),
            TimeUnit::Seconds => write!(
                text,
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
                date.year(),
                u8::from(date.month()),
                date.day(),
                time.hour(),
                time.minute(),
                time.second()
            ),
        };

        let _ = write!(text, "/{}", self.duration);
        text
    }
}

fn parse_start(text: &str) -> Option<PrimitiveDateTime> {
    let (date_text, time_text) = match text.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (text, None),
    };

    let mut date_fields = date_text.split('-');
    let year = parse_number::<i32>(date_fields.next()?, 4)?;
    let month = match date_fields.next() {
        Some(field) => Month::try_from(parse_number::<u8>(field, 2)?).ok()?,
        None => Month::January,
    };
    let day = match date_fields.next() {
        Some(field) => parse_number::<u8>(field, 2)?,
        None => 1,
    };
    if date_fields.next().is_some() {
        return None;
    }
    let date = Date::from_calendar_date(year, month, day).ok()?;

    let time = match time_text {
        None => Time::MIDNIGHT,
        Some(text) => {
            let mut time_fields = text.split(':');
            let hour = parse_number::<u8>(time_fields.next()?, 2)?;
            let minute = match time_fields.next() {
                Some(field) => parse_number::<u8>(field, 2)?,
                None => 0,
            };
            let second = match time_fields.next() {
                Some(field) => parse_number::<u8>(field, 2)?,
                None => 0,
            };
            if time_fields.next().is_some() {
                return None;
            }
            Time::from_hms(hour, minute, second).ok()?
        }
    };

    Some(PrimitiveDateTime::new(date, time))
}

fn parse_number<T: FromStr>(field: &str, width: usize) -> Option<T> {
    if field.len() != width || !field.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

impl Display for TimeInterval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let date = self.start.date();
        let time = self.start.time();
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}/{}",
            date.year(),
            u8::from(date.month()),
            date.day(),
            time.hour(),
            time.minute(),
            time.second(),
            self.duration
        )
    }
}

impl FromStr for TimeInterval {
    type Err = FormatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for TimeInterval {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TimeInterval> for String {
    fn from(value: TimeInterval) -> Self {
        value.to_string()
    }
}
