use time::{Duration, OffsetDateTime, Time};

use crate::error::{AppError, AppResult};

/// Time-of-day trigger parsed from the `hour:21,minute:10` spec format.
///
/// Fields left out of the spec widen the recurrence: a spec with an hour
/// fires daily at that time, minute-only fires hourly at that minute, and
/// second-only fires every minute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleSpec {
    pub hour: Option<u8>,
    pub minute: Option<u8>,
    pub second: Option<u8>,
}

impl ScheduleSpec {
    /// Parse a comma-separated list of `field:value` pairs. An empty spec is
    /// an error: a watcher with no trigger would never run.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AppError::EmptySchedule);
        }
        let mut spec = ScheduleSpec::default();
        for part in raw.split(',') {
            let Some((key, value)) = part.split_once(':') else {
                return Err(AppError::InvalidSchedule(format!(
                    "expected field:value, got '{}'",
                    part.trim()
                )));
            };
            let value: u8 = value.trim().parse().map_err(|_| {
                AppError::InvalidSchedule(format!("'{}' is not a number", value.trim()))
            })?;
            match key.trim() {
                "hour" if value < 24 => spec.hour = Some(value),
                "minute" if value < 60 => spec.minute = Some(value),
                "second" if value < 60 => spec.second = Some(value),
                key @ ("hour" | "minute" | "second") => {
                    return Err(AppError::InvalidSchedule(format!(
                        "{} {} is out of range",
                        key, value
                    )));
                }
                other => {
                    return Err(AppError::InvalidSchedule(format!(
                        "unknown field '{}'",
                        other
                    )));
                }
            }
        }
        Ok(spec)
    }

    /// The next trigger instant strictly after `now`.
    pub fn next_after(&self, now: OffsetDateTime) -> OffsetDateTime {
        let second = self.second.unwrap_or(0);
        if let Some(hour) = self.hour {
            let minute = self.minute.unwrap_or(0);
            // Components were range-checked at parse time.
            let at = Time::from_hms(hour, minute, second).unwrap_or(Time::MIDNIGHT);
            let mut next = now.replace_time(at);
            if next <= now {
                next += Duration::days(1);
            }
            next
        } else if let Some(minute) = self.minute {
            let at = Time::from_hms(now.hour(), minute, second).unwrap_or(Time::MIDNIGHT);
            let mut next = now.replace_time(at);
            if next <= now {
                next += Duration::hours(1);
            }
            next
        } else {
            let at =
                Time::from_hms(now.hour(), now.minute(), second).unwrap_or(Time::MIDNIGHT);
            let mut next = now.replace_time(at);
            if next <= now {
                next += Duration::minutes(1);
            }
            next
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parses_hour_and_minute() {
        let spec = ScheduleSpec::parse("hour:21,minute:10").unwrap();
        assert_eq!(spec.hour, Some(21));
        assert_eq!(spec.minute, Some(10));
        assert_eq!(spec.second, None);
    }

    #[test]
    fn empty_spec_is_an_error() {
        assert!(matches!(ScheduleSpec::parse(""), Err(AppError::EmptySchedule)));
        assert!(matches!(
            ScheduleSpec::parse("   "),
            Err(AppError::EmptySchedule)
        ));
    }

    #[test]
    fn rejects_garbage_and_out_of_range_values() {
        assert!(matches!(
            ScheduleSpec::parse("whenever"),
            Err(AppError::InvalidSchedule(_))
        ));
        assert!(matches!(
            ScheduleSpec::parse("hour:25"),
            Err(AppError::InvalidSchedule(_))
        ));
        assert!(matches!(
            ScheduleSpec::parse("dow:3"),
            Err(AppError::InvalidSchedule(_))
        ));
        assert!(matches!(
            ScheduleSpec::parse("minute:ten"),
            Err(AppError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn daily_trigger_rolls_over_to_the_next_day() {
        let spec = ScheduleSpec::parse("hour:21,minute:10").unwrap();
        let before = datetime!(2026-08-28 09:00:00 UTC);
        assert_eq!(spec.next_after(before), datetime!(2026-08-28 21:10:00 UTC));
        let after = datetime!(2026-08-28 22:00:00 UTC);
        assert_eq!(spec.next_after(after), datetime!(2026-08-29 21:10:00 UTC));
    }

    #[test]
    fn minute_only_trigger_fires_hourly() {
        let spec = ScheduleSpec::parse("minute:10").unwrap();
        let now = datetime!(2026-08-28 23:50:00 UTC);
        assert_eq!(spec.next_after(now), datetime!(2026-08-29 00:10:00 UTC));
    }
}
