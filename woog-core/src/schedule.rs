//! Cron schedule
//!
//! Checks the five-field expressions used in the CronJob `schedule` field
//! with the `cron` crate. That crate reads the Quartz dialect (a leading
//! seconds field, weekdays numbered 1-7 from Sunday), so Kubernetes
//! expressions are rewritten before parsing:
//! - a `0` seconds field is prepended
//! - weekdays 0-7 (both ends meaning Sunday) are renumbered to 1-7
//! - `@annually` and `@midnight` map to `@yearly` and `@daily`

use chrono::{DateTime, Utc};
use std::str::FromStr;

/// Errors produced while parsing a cron expression
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("expected 5 fields, found {0}")]
    FieldCount(usize),

    #[error("invalid cron expression '{expression}': {reason}")]
    Invalid { expression: String, reason: String },
}

/// Quartz number for each Kubernetes weekday
const WEEKDAYS: [&str; 8] = ["1", "2", "3", "4", "5", "6", "7", "1"];

/// A parsed cron schedule
#[derive(Debug, Clone)]
pub struct Schedule {
    expression: String,
    inner: cron::Schedule,
}

impl Schedule {
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let expression = expression.trim();
        let quartz = to_quartz(expression)?;

        let inner = cron::Schedule::from_str(&quartz).map_err(|e| ScheduleError::Invalid {
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            expression: expression.to_string(),
            inner,
        })
    }

    /// First firing strictly after `after`
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.inner.after(after).next()
    }

    /// Next firing from now
    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        self.next_after(&Utc::now())
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.expression)
    }
}

fn to_quartz(expression: &str) -> Result<String, ScheduleError> {
    if expression.starts_with('@') {
        return Ok(match expression {
            "@annually" => "@yearly".to_string(),
            "@midnight" => "@daily".to_string(),
            other => other.to_string(),
        });
    }

    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(ScheduleError::FieldCount(fields.len()));
    }

    Ok(format!(
        "0 {} {} {} {} {}",
        fields[0],
        fields[1],
        fields[2],
        fields[3],
        weekdays_by_name(fields[4])
    ))
}

/// Renumbers weekdays; names and anything unparsable are left for the parser
fn weekdays_by_name(field: &str) -> String {
    field
        .split(',')
        .map(|item| {
            let (range, step) = match item.split_once('/') {
                Some((range, step)) => (range, Some(step)),
                None => (item, None),
            };

            let named = match range.split_once('-').map(|(s, e)| (weekday(s), weekday(e))) {
                // Sunday sorts first in Quartz, so a range up to 7 wraps
                Some((Some(7), Some(7))) => "1".to_string(),
                Some((Some(s), Some(7))) => {
                    let mut named = format!("{}-7", WEEKDAYS[s]);
                    if let Some(step) = step {
                        named = format!("{}/{}", named, step);
                    }
                    let sunday = match step {
                        Some(step) => step.parse::<usize>().is_ok_and(|n| n > 0 && (7 - s) % n == 0),
                        None => s > 0,
                    };
                    if sunday {
                        named.push_str(",1");
                    }
                    return named;
                }
                Some((Some(s), Some(e))) => format!("{}-{}", WEEKDAYS[s], WEEKDAYS[e]),
                Some(_) => range.to_string(),
                None => weekday(range)
                    .map(|d| WEEKDAYS[d].to_string())
                    .unwrap_or_else(|| range.to_string()),
            };

            match step {
                Some(step) => format!("{}/{}", named, step),
                None => named,
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn weekday(value: &str) -> Option<usize> {
    value.parse::<usize>().ok().filter(|d| *d < WEEKDAYS.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn next(expression: &str, after: DateTime<Utc>) -> DateTime<Utc> {
        Schedule::parse(expression)
            .unwrap()
            .next_after(&after)
            .unwrap()
    }

    #[test]
    fn test_every_thirty_minutes() {
        assert_eq!(next("*/30 * * * *", at(2021, 6, 1, 12, 10)), at(2021, 6, 1, 12, 30));
        assert_eq!(next("*/30 * * * *", at(2021, 6, 1, 12, 30)), at(2021, 6, 1, 13, 0));
    }

    #[test]
    fn test_macros() {
        assert_eq!(next("@hourly", at(2021, 6, 1, 12, 10)), at(2021, 6, 1, 13, 0));
        assert_eq!(next("@midnight", at(2021, 6, 1, 12, 10)), at(2021, 6, 2, 0, 0));
        assert_eq!(next("@annually", at(2021, 6, 1, 12, 10)), at(2022, 1, 1, 0, 0));
    }

    #[test]
    fn test_names() {
        // 2021-06-01 is a Tuesday
        assert_eq!(next("0 0 * * MON", at(2021, 6, 1, 0, 0)), at(2021, 6, 7, 0, 0));
        assert_eq!(next("0 0 1 JAN *", at(2021, 6, 1, 0, 0)), at(2022, 1, 1, 0, 0));
    }

    #[test]
    fn test_question_mark_wildcard() {
        assert_eq!(next("*/30 * * * ?", at(2021, 6, 1, 12, 10)), at(2021, 6, 1, 12, 30));
    }

    #[test]
    fn test_numeric_weekdays_count_from_sunday() {
        assert_eq!(next("0 9 * * 0", at(2021, 6, 1, 0, 0)), at(2021, 6, 6, 9, 0));
        assert_eq!(next("0 9 * * 7", at(2021, 6, 1, 0, 0)), at(2021, 6, 6, 9, 0));
        assert_eq!(next("0 9 * * 1-5", at(2021, 6, 5, 0, 0)), at(2021, 6, 7, 9, 0));
    }

    #[test]
    fn test_range_ending_on_seven_includes_sunday() {
        assert_eq!(next("0 9 * * 5-7", at(2021, 6, 1, 0, 0)), at(2021, 6, 4, 9, 0));
        assert_eq!(next("0 9 * * 5-7", at(2021, 6, 5, 10, 0)), at(2021, 6, 6, 9, 0));
    }

    #[test]
    fn test_weekday_rewrite() {
        assert_eq!(weekdays_by_name("*"), "*");
        assert_eq!(weekdays_by_name("0,3"), "1,4");
        assert_eq!(weekdays_by_name("1-5/2"), "2-6/2");
        assert_eq!(weekdays_by_name("1-7/2"), "2-7/2,1");
        assert_eq!(weekdays_by_name("2-7/2"), "3-7/2");
        assert_eq!(weekdays_by_name("0-7"), "1-7");
        assert_eq!(weekdays_by_name("5-7"), "6-7,1");
        assert_eq!(weekdays_by_name("MON-FRI"), "MON-FRI");
    }

    #[test]
    fn test_rejects_invalid_expressions() {
        assert_eq!(
            Schedule::parse("*/30 * * *").unwrap_err(),
            ScheduleError::FieldCount(4)
        );
        assert!(matches!(
            Schedule::parse("61 * * * *"),
            Err(ScheduleError::Invalid { .. })
        ));
        assert!(Schedule::parse("0 0 * * 8").is_err());
        assert!(Schedule::parse("@fortnightly").is_err());
    }

    #[test]
    fn test_display_keeps_expression() {
        let schedule = Schedule::parse("  */30 * * * * ").unwrap();
        assert_eq!(schedule.to_string(), "*/30 * * * *");
    }
}
