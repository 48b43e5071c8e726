use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Date, Month, PrimitiveDateTime};

use crate::error::FormatError;

/// The seven calendar fields a [`Duration`] can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Years,
    Months,
    Weeks,
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl TimeUnit {
    pub const ALL: [Self; 7] = [
        Self::Years,
        Self::Months,
        Self::Weeks,
        Self::Days,
        Self::Hours,
        Self::Minutes,
        Self::Seconds,
    ];
}

/// ISO-8601-like calendar duration with non-negative integer components.
///
/// Week-based values are exclusive: `P2W` never carries year/month/day or
/// time components, and keeps its distinct form under normalization.
/// Arithmetic is calendar-field based, never fixed 24-hour/30-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Duration {
    years: u32,
    months: u32,
    weeks: u32,
    days: u32,
    hours: u32,
    minutes: u32,
    seconds: u32,
}

const DATE_DESIGNATORS: [(char, TimeUnit); 4] = [
    ('Y', TimeUnit::Years),
    ('M', TimeUnit::Months),
    ('W', TimeUnit::Weeks),
    ('D', TimeUnit::Days),
];

const TIME_DESIGNATORS: [(char, TimeUnit); 3] = [
    ('H', TimeUnit::Hours),
    ('M', TimeUnit::Minutes),
    ('S', TimeUnit::Seconds),
];

impl Duration {
    pub const ZERO: Self = Self {
        years: 0,
        months: 0,
        weeks: 0,
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    /// Parses the `P…[T…]` calendar-duration grammar.
    ///
    /// Rejects a bare `P`, a bare `PT`, unknown or out-of-order designators,
    /// and week components mixed with any other component.
    pub fn parse(input: &str) -> Result<Self, FormatError> {
        let rest = input
            .strip_prefix('P')
            .ok_or_else(|| FormatError::DurationMissingPrefix {
                value: input.to_owned(),
            })?;
        if rest.is_empty() {
            return Err(FormatError::DurationEmpty {
                value: input.to_owned(),
            });
        }

        let (date_part, time_part) = match rest.split_once('T') {
            Some((date, time)) => (date, Some(time)),
            None => (rest, None),
        };
        if time_part.is_some_and(str::is_empty) {
            return Err(FormatError::DurationEmpty {
                value: input.to_owned(),
            });
        }

        let mut parsed = Self::ZERO;
        parse_components(input, date_part, &DATE_DESIGNATORS, &mut parsed)?;
        if let Some(time) = time_part {
            parse_components(input, time, &TIME_DESIGNATORS, &mut parsed)?;
        }

        if parsed.weeks > 0 && !parsed.week_compatible() {
            return Err(FormatError::DurationMixedWeeks {
                value: input.to_owned(),
            });
        }

        Ok(parsed)
    }

    pub const fn get(self, unit: TimeUnit) -> u32 {
        match unit {
            TimeUnit::Years => self.years,
            TimeUnit::Months => self.months,
            TimeUnit::Weeks => self.weeks,
            TimeUnit::Days => self.days,
            TimeUnit::Hours => self.hours,
            TimeUnit::Minutes => self.minutes,
            TimeUnit::Seconds => self.seconds,
        }
    }

    pub const fn is_zero(self) -> bool {
        self.years == 0 && self.weeks == 0 && self.months == 0 && self.days == 0
            && self.hours == 0
            && self.minutes == 0
            && self.seconds == 0
    }

    /// Folds 12 months into 1 year where exact; week values keep their form.
    pub const fn normalized(self) -> Self {
        if self.weeks > 0 {
            return self;
        }

        Self {
            years: self.years.saturating_add(self.months / 12),
            months: self.months % 12,
            ..self
        }
    }

    /// Component-wise sum; `None` on overflow. Mixing a week value with a
    /// non-week value converts weeks to exact days first.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        if self.week_compatible() && other.week_compatible() {
            return Some(Self {
                weeks: self.weeks.checked_add(other.weeks)?,
                ..Self::ZERO
            });
        }

        let left = self.to_day_form()?;
        let right = other.to_day_form()?;
        Some(Self {
            years: left.years.checked_add(right.years)?,
            months: left.months.checked_add(right.months)?,
            weeks: 0,
            days: left.days.checked_add(right.days)?,
            hours: left.hours.checked_add(right.hours)?,
            minutes: left.minutes.checked_add(right.minutes)?,
            seconds: left.seconds.checked_add(right.seconds)?,
        })
    }

    /// Component-wise difference; `None` when any component would go
    /// negative (components stay non-negative by construction).
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        if self.week_compatible() && other.week_compatible() {
            return Some(Self {
                weeks: self.weeks.checked_sub(other.weeks)?,
                ..Self::ZERO
            });
        }

        let left = self.to_day_form()?;
        let right = other.to_day_form()?;
        Some(Self {
            years: left.years.checked_sub(right.years)?,
            months: left.months.checked_sub(right.months)?,
            weeks: 0,
            days: left.days.checked_sub(right.days)?,
            hours: left.hours.checked_sub(right.hours)?,
            minutes: left.minutes.checked_sub(right.minutes)?,
            seconds: left.seconds.checked_sub(right.seconds)?,
        })
    }

    /// Component-wise scalar product; `None` on overflow.
    pub fn checked_mul(self, scalar: u32) -> Option<Self> {
        Some(Self {
            years: self.years.checked_mul(scalar)?,
            months: self.months.checked_mul(scalar)?,
            weeks: self.weeks.checked_mul(scalar)?,
            days: self.days.checked_mul(scalar)?,
            hours: self.hours.checked_mul(scalar)?,
            minutes: self.minutes.checked_mul(scalar)?,
            seconds: self.seconds.checked_mul(scalar)?,
        })
    }

    /// Applies components high-to-low (years, months, weeks, days, then
    /// time) with calendar-field arithmetic; month-end days clamp, so
    /// 2012-02-29 plus `P1Y` is 2013-02-28. `None` when the calendar type
    /// cannot represent the result.
    pub fn add_to(self, at: PrimitiveDateTime) -> Option<PrimitiveDateTime> {
        shift(at, self, 1)
    }

    /// The inverse of [`Duration::add_to`], applied with the same
    /// high-to-low field order.
    pub fn subtract_from(self, at: PrimitiveDateTime) -> Option<PrimitiveDateTime> {
        shift(at, self, -1)
    }

    /// The most precise unit present, used to pick rendering precision for
    /// interval starts. `ZERO` counts as day precision (`P0D`).
    pub(crate) fn finest_unit(self) -> TimeUnit {
        if self.seconds > 0 {
            TimeUnit::Seconds
        } else if self.minutes > 0 {
            TimeUnit::Minutes
        } else if self.hours > 0 {
            TimeUnit::Hours
        } else if self.days > 0 || self.weeks > 0 {
            TimeUnit::Days
        } else if self.months > 0 {
            TimeUnit::Months
        } else if self.years > 0 {
            TimeUnit::Years
        } else {
            TimeUnit::Days
        }
    }

    const fn week_compatible(self) -> bool {
        self.years == 0
            && self.months == 0
            && self.days == 0
            && self.hours == 0
            && self.minutes == 0
            && self.seconds == 0
    }

    fn to_day_form(self) -> Option<Self> {
        if self.weeks == 0 {
            return Some(self);
        }

        Some(Self {
            weeks: 0,
            days: self.days.checked_add(self.weeks.checked_mul(7)?)?,
            ..self
        })
    }
}

fn parse_components(
    input: &str,
    part: &str,
    designators: &[(char, TimeUnit)],
    into: &mut Duration,
) -> Result<(), FormatError> {
    let mut next_allowed = 0;
    let mut digits = String::new();

    for ch in part.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }

        let position = designators
            .iter()
            .position(|(designator, _)| *designator == ch)
            .ok_or(FormatError::DurationUnexpectedChar {
                ch,
                value: input.to_owned(),
            })?;
        if digits.is_empty() {
            return Err(FormatError::DurationUnexpectedChar {
                ch,
                value: input.to_owned(),
            });
        }
        if position < next_allowed {
            return Err(FormatError::DurationDesignatorOrder {
                designator: ch,
                value: input.to_owned(),
            });
        }

        let amount = digits
            .parse::<u32>()
            .map_err(|_| FormatError::DurationOverflow {
                value: input.to_owned(),
            })?;
        digits.clear();
        next_allowed = position + 1;

        match designators[position].1 {
            TimeUnit::Years => into.years = amount,
            TimeUnit::Months => into.months = amount,
            TimeUnit::Weeks => into.weeks = amount,
            TimeUnit::Days => into.days = amount,
            TimeUnit::Hours => into.hours = amount,
            TimeUnit::Minutes => into.minutes = amount,
            TimeUnit::Seconds => into.seconds = amount,
        }
    }

    if !digits.is_empty() {
        return Err(FormatError::DurationEmpty {
            value: input.to_owned(),
        });
    }

    Ok(())
}

fn shift(at: PrimitiveDateTime, duration: Duration, sign: i64) -> Option<PrimitiveDateTime> {
    let mut date = at.date();

    // High-to-low field order: clamping a month-end under years must happen
    // before months are applied.
    if duration.years > 0 {
        date = add_months(date, sign.checked_mul(i64::from(duration.years).checked_mul(12)?)?)?;
    }
    if duration.months > 0 {
        date = add_months(date, sign.checked_mul(i64::from(duration.months))?)?;
    }

    let day_shift = i64::from(duration.weeks)
        .checked_mul(7)?
        .checked_add(i64::from(duration.days))?;
    if day_shift != 0 {
        date = date.checked_add(time::Duration::days(sign.checked_mul(day_shift)?))?;
    }

    let mut result = PrimitiveDateTime::new(date, at.time());
    let second_shift = i64::from(duration.hours)
        .checked_mul(3600)?
        .checked_add(i64::from(duration.minutes).checked_mul(60)?)?
        .checked_add(i64::from(duration.seconds))?;
    if second_shift != 0 {
        result = result.checked_add(time::Duration::seconds(sign.checked_mul(second_shift)?))?;
    }

    Some(result)
}

const MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

fn add_months(date: Date, months: i64) -> Option<Date> {
    let zero_based = i64::from(date.year())
        .checked_mul(12)?
        .checked_add(i64::from(u8::from(date.month())) - 1)?
        .checked_add(months)?;

    let year = i32::try_from(zero_based.div_euclid(12)).ok()?;
    let month = MONTHS[zero_based.rem_euclid(12) as usize];
    let day = date.day().min(time::util::days_in_year_month(year, month));
    Date::from_calendar_date(year, month, day).ok()
}

impl Display for Duration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_zero() {
            return f.write_str("P0D");
        }
        if self.weeks > 0 {
            return write!(f, "P{}W", self.weeks);
        }

        f.write_str("P")?;
        for (amount, designator) in [(self.years, 'Y'), (self.months, 'M'), (self.days, 'D')] {
            if amount > 0 {
                write!(f, "{amount}{designator}")?;
            }
        }
        if self.hours > 0 || self.minutes > 0 || self.seconds > 0 {
            f.write_str("T")?;
            for (amount, designator) in
                [(self.hours, 'H'), (self.minutes, 'M'), (self.seconds, 'S')]
            {
                if amount > 0 {
                    write!(f, "{amount}{designator}")?;
                }
            }
        }
        Ok(())
    }
}

impl FromStr for Duration {
    type Err = FormatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Duration {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Duration> for String {
    fn from(value: Duration) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parses_all_seven_components() {
        let parsed = Duration::parse("P3Y6M4DT12H30M5S").expect("must parse");
        assert_eq!(parsed.get(TimeUnit::Years), 3);
        assert_eq!(parsed.get(TimeUnit::Months), 6);
        assert_eq!(parsed.get(TimeUnit::Days), 4);
        assert_eq!(parsed.get(TimeUnit::Hours), 12);
        assert_eq!(parsed.get(TimeUnit::Minutes), 30);
        assert_eq!(parsed.get(TimeUnit::Seconds), 5);
        assert_eq!(parsed.to_string(), "P3Y6M4DT12H30M5S");
    }

    #[test]
    fn zero_prints_as_p0d() {
        assert_eq!(Duration::ZERO.to_string(), "P0D");
        assert_eq!(Duration::parse("P0D").expect("must parse"), Duration::ZERO);
    }

    #[test]
    fn week_form_round_trips() {
        let parsed = Duration::parse("P5W").expect("must parse");
        assert_eq!(parsed.get(TimeUnit::Weeks), 5);
        assert_eq!(parsed.to_string(), "P5W");
    }

    #[test]
    fn rejects_degenerate_inputs() {
        assert!(matches!(
            Duration::parse("3D").expect_err("must fail"),
            FormatError::DurationMissingPrefix { .. }
        ));
        assert!(matches!(
            Duration::parse("P").expect_err("must fail"),
            FormatError::DurationEmpty { .. }
        ));
        assert!(matches!(
            Duration::parse("PT").expect_err("must fail"),
            FormatError::DurationEmpty { .. }
        ));
        assert!(matches!(
            Duration::parse("P3X").expect_err("must fail"),
            FormatError::DurationUnexpectedChar { ch: 'X', .. }
        ));
        assert!(matches!(
            Duration::parse("P3").expect_err("must fail"),
            FormatError::DurationEmpty { .. }
        ));
    }

    #[test]
    fn rejects_out_of_order_or_repeated_designators() {
        assert!(matches!(
            Duration::parse("P1M2Y").expect_err("must fail"),
            FormatError::DurationDesignatorOrder { designator: 'Y', .. }
        ));
        assert!(matches!(
            Duration::parse("P1Y2Y").expect_err("must fail"),
            FormatError::DurationDesignatorOrder { designator: 'Y', .. }
        ));
        assert!(matches!(
            Duration::parse("PT1S2M").expect_err("must fail"),
            FormatError::DurationDesignatorOrder { designator: 'M', .. }
        ));
    }

    #[test]
    fn rejects_weeks_mixed_with_other_components() {
        assert!(matches!(
            Duration::parse("P1W2D").expect_err("must fail"),
            FormatError::DurationMixedWeeks { .. }
        ));
        assert!(matches!(
            Duration::parse("P1WT5M").expect_err("must fail"),
            FormatError::DurationMixedWeeks { .. }
        ));
    }

    #[test]
    fn normalizes_twelve_months_into_a_year() {
        let one_month = Duration::parse("P1M").expect("must parse");
        let year = one_month.checked_mul(12).expect("no overflow").normalized();
        assert_eq!(year, Duration::parse("P1Y").expect("must parse"));

        let fourteen = Duration::parse("P14M").expect("must parse").normalized();
        assert_eq!(fourteen.to_string(), "P1Y2M");
    }

    #[test]
    fn add_to_applies_calendar_fields() {
        let duration = Duration::parse("P3Y6M4DT12H30M5S").expect("must parse");
        let shifted = duration
            .add_to(datetime!(2010-01-01 00:00))
            .expect("in range");
        assert_eq!(shifted, datetime!(2013-07-05 12:30:05));
    }

    #[test]
    fn subtract_from_inverts_the_simple_case() {
        let duration = Duration::parse("P2M").expect("must parse");
        let back = duration
            .subtract_from(datetime!(2010-03-01 00:00))
            .expect("in range");
        assert_eq!(back, datetime!(2010-01-01 00:00));
    }

    #[test]
    fn leap_day_clamps_under_year_shift() {
        let year = Duration::parse("P1Y").expect("must parse");
        let shifted = year.add_to(datetime!(2012-02-29 00:00)).expect("in range");
        assert_eq!(shifted, datetime!(2013-02-28 00:00));
    }

    #[test]
    fn field_order_is_high_to_low() {
        // Years first clamps to 2013-02-28, then the month shift lands on
        // 2013-03-28 rather than the 2013-03-29 a combined shift would give.
        let duration = Duration::parse("P1Y1M").expect("must parse");
        let shifted = duration
            .add_to(datetime!(2012-02-29 00:00))
            .expect("in range");
        assert_eq!(shifted, datetime!(2013-03-28 00:00));
    }

    #[test]
    fn checked_arithmetic_reports_overflow() {
        let big = Duration::parse("P5000000000D").expect_err("must fail");
        assert!(matches!(big, FormatError::DurationOverflow { .. }));

        let max = Duration::parse(&format!("P{}Y", u32::MAX)).expect("must parse");
        assert_eq!(max.checked_mul(2), None);
        assert_eq!(
            Duration::ZERO.checked_sub(Duration::parse("P1D").expect("must parse")),
            None
        );
    }

    #[test]
    fn mixing_weeks_in_sums_converts_to_days() {
        let week = Duration::parse("P1W").expect("must parse");
        let day = Duration::parse("P1D").expect("must parse");
        let sum = week.checked_add(day).expect("no overflow");
        assert_eq!(sum.to_string(), "P8D");

        let two_weeks = week.checked_add(week).expect("no overflow");
        assert_eq!(two_weeks.to_string(), "P2W");
    }
}
