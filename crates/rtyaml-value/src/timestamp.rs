//! `!!timestamp` values.

use std::sync::LazyLock;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<year>[0-9]{4})-(?P<month>[0-9]{1,2})-(?P<day>[0-9]{1,2})",
        r"(?:(?P<sep>[Tt]|[ \t]+)(?P<hour>[0-9]{1,2}):(?P<minute>[0-9]{2}):(?P<second>[0-9]{2})",
        r"(?:\.(?P<fraction>[0-9]*))?",
        r"(?:[ \t]*(?P<tz>Z|(?P<tz_sign>[-+])(?P<tz_hour>[0-9]{1,2})(?::(?P<tz_minute>[0-9]{2}))?))?)?$",
    ))
    .expect("timestamp pattern is valid")
});

/// The parsed moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Moment {
    Date(NaiveDate),
    /// Local date and time, with the offset if one was written.
    DateTime(NaiveDateTime, Option<FixedOffset>),
}

/// A timestamp and the literal it came from.
#[derive(Debug, Clone)]
pub struct Timestamp {
    moment: Moment,
    /// `T`, `t` or the run of blanks between date and time.
    separator: String,
    literal: Option<String>,
    pub anchor: Option<String>,
}

impl Timestamp {
    pub fn new(moment: Moment) -> Self {
        Self {
            moment,
            separator: "T".to_string(),
            literal: None,
            anchor: None,
        }
    }

    pub fn date(date: NaiveDate) -> Self {
        Self::new(Moment::Date(date))
    }

    pub fn date_time(date_time: NaiveDateTime, offset: Option<FixedOffset>) -> Self {
        Self::new(Moment::DateTime(date_time, offset))
    }

    #[inline]
    pub fn moment(&self) -> Moment {
        self.moment
    }

    pub fn literal(&self) -> Option<&str> {
        self.literal.as_deref()
    }

    pub fn set(&mut self, moment: Moment) {
        if moment != self.moment {
            self.moment = moment;
            self.literal = None;
        }
    }

    /// Parse a timestamp literal. Fractions are truncated to microseconds.
    pub fn parse(text: &str) -> Result<Self, String> {
        let invalid = || format!("invalid timestamp {text:?}");
        let caps = TIMESTAMP.captures(text).ok_or_else(invalid)?;
        let number =
            |name: &str| -> Option<u32> { caps.name(name).and_then(|m| m.as_str().parse().ok()) };

        let year = caps
            .name("year")
            .and_then(|m| m.as_str().parse::<i32>().ok())
            .ok_or_else(invalid)?;
        let month = number("month").ok_or_else(invalid)?;
        let day = number("day").ok_or_else(invalid)?;
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;

        let Some(hour) = number("hour") else {
            let mut timestamp = Timestamp::date(date);
            timestamp.literal = Some(text.to_string());
            return Ok(timestamp);
        };
        let minute = number("minute").ok_or_else(invalid)?;
        let second = number("second").ok_or_else(invalid)?;
        let micros = match caps.name("fraction") {
            Some(fraction) => {
                let mut digits: String = fraction.as_str().chars().take(6).collect();
                while digits.len() < 6 {
                    digits.push('0');
                }
                digits.parse().map_err(|_| invalid())?
            }
            None => 0,
        };
        let time =
            NaiveTime::from_hms_micro_opt(hour, minute, second, micros).ok_or_else(invalid)?;

        let offset = match caps.name("tz").map(|m| m.as_str()) {
            None => None,
            Some("Z") => FixedOffset::east_opt(0),
            Some(_) => {
                let hours = number("tz_hour").ok_or_else(invalid)? as i32;
                let minutes = number("tz_minute").unwrap_or(0) as i32;
                let seconds = (hours * 60 + minutes) * 60;
                let seconds = if caps.name("tz_sign").is_some_and(|m| m.as_str() == "-") {
                    -seconds
                } else {
                    seconds
                };
                Some(FixedOffset::east_opt(seconds).ok_or_else(invalid)?)
            }
        };

        let mut timestamp = Timestamp::date_time(NaiveDateTime::new(date, time), offset);
        if let Some(sep) = caps.name("sep") {
            timestamp.separator = sep.as_str().to_string();
        }
        timestamp.literal = Some(text.to_string());
        Ok(timestamp)
    }

    pub fn render(&self) -> String {
        if let Some(literal) = &self.literal {
            return literal.clone();
        }
        match self.moment {
            Moment::Date(date) => date.format("%Y-%m-%d").to_string(),
            Moment::DateTime(date_time, offset) => {
                let mut out = format!(
                    "{}{}{}",
                    date_time.format("%Y-%m-%d"),
                    self.separator,
                    date_time.format("%H:%M:%S")
                );
                let micros = date_time.and_utc().timestamp_subsec_micros();
                if micros > 0 {
                    let fraction = format!("{micros:06}");
                    out.push('.');
                    out.push_str(fraction.trim_end_matches('0'));
                }
                if let Some(offset) = offset {
                    let seconds = offset.local_minus_utc();
                    if seconds == 0 {
                        out.push('Z');
                    } else {
                        let sign = if seconds < 0 { '-' } else { '+' };
                        let minutes = seconds.unsigned_abs() / 60;
                        out.push_str(&format!("{sign}{:02}:{:02}", minutes / 60, minutes % 60));
                    }
                }
                out
            }
        }
    }
}
