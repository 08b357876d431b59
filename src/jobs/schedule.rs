//! Cron schedule parsing, validation and next-run computation.
//!
//! The canonical grammar is the classic 5-field form
//! (`minute hour day-of-month month day-of-week`). Shorthand aliases such as
//! `@daily` and a handful of English phrases are translated into that form
//! before parsing, so everything downstream only ever sees five fields.

mod field;
mod human;

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use field::{Field, FieldKind};

/// How many days ahead `next_after` searches before giving up. Eight years
/// covers leap-day schedules across a skipped century leap year.
const SEARCH_HORIZON_DAYS: u32 = 8 * 366;

/// Wider than any DST shift in the tz database.
const DST_LOOKBACK_HOURS: i64 = 3;

const ALIASES: [(&str, &str); 7] = [
    ("@yearly", "0 0 1 1 *"),
    ("@annually", "0 0 1 1 *"),
    ("@monthly", "0 0 1 * *"),
    ("@weekly", "0 0 * * 0"),
    ("@daily", "0 0 * * *"),
    ("@midnight", "0 0 * * *"),
    ("@hourly", "0 * * * *"),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("schedule expression is empty")]
    Empty,
    #[error("expected 5 fields (minute hour day-of-month month day-of-week), got {0}")]
    FieldCount(usize),
    #[error("invalid {field} field '{value}': {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("unknown schedule alias '{0}'")]
    UnknownAlias(String),
    #[error("unrecognized schedule phrase '{0}'")]
    UnrecognizedPhrase(String),
    #[error("schedule '{0}' has no upcoming run")]
    NoUpcomingRun(String),
}

/// A validated, compiled cron schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    source: String,
    expression: String,
    minutes: Field,
    hours: Field,
    days_of_month: Field,
    months: Field,
    days_of_week: Field,
}

impl Schedule {
    pub fn parse(input: &str) -> Result<Self, ScheduleError> {
        let source = input.trim();
        if source.is_empty() {
            return Err(ScheduleError::Empty);
        }

        let expression = canonicalize(source)?;
        let parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() != FieldKind::ALL.len() {
            return Err(ScheduleError::FieldCount(parts.len()));
        }

        let field = |index: usize| Field::parse(FieldKind::ALL[index], parts[index]);

        Ok(Self {
            source: source.to_string(),
            minutes: field(0)?,
            hours: field(1)?,
            days_of_month: field(2)?,
            months: field(3)?,
            days_of_week: field(4)?,
            expression: parts.join(" "),
        })
    }

    /// The schedule exactly as it was written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The canonical 5-field form.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `from`, evaluating the fields as wall
    /// clock time in `tz`.
    ///
    /// Local times that fall into a DST gap are skipped. Local times that occur
    /// twice resolve to the earlier instant, except that schedules with a
    /// wildcard hour also fire during the repeated hour.
    pub fn next_after(&self, from: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        // Start early enough that the second pass of a repeated hour is seen
        // even when `from` is still in the first one.
        let local_from = (from - Duration::hours(DST_LOOKBACK_HOURS))
            .with_timezone(&tz)
            .naive_local();
        let floor = local_from.with_second(0)?.with_nanosecond(0)?;
        let repeat_in_overlap = self.hours.is_unrestricted();
        let mut date = local_from.date();
        let mut pending: Option<DateTime<Utc>> = None;

        for _ in 0..SEARCH_HORIZON_DAYS {
            if self.months.contains(date.month()) && self.matches_day(date) {
                for hour in self.hours.values() {
                    for minute in self.minutes.values() {
                        let Some(naive) = date.and_hms_opt(hour, minute, 0) else {
                            continue;
                        };
                        if naive < floor {
                            continue;
                        }

                        match tz.from_local_datetime(&naive) {
                            LocalResult::Single(dt) => {
                                let candidate = dt.with_timezone(&Utc);
                                if candidate > from {
                                    return Some(pending.map_or(candidate, |p| p.min(candidate)));
                                }
                            }
                            LocalResult::Ambiguous(earliest, latest) => {
                                let earliest = earliest.with_timezone(&Utc);
                                if earliest > from {
                                    return Some(pending.map_or(earliest, |p| p.min(earliest)));
                                }
                                // Later wall times in the overlap may still map
                                // to an earlier instant than this second pass.
                                let latest = latest.with_timezone(&Utc);
                                if repeat_in_overlap && latest > from && pending.is_none() {
                                    pending = Some(latest);
                                }
                            }
                            LocalResult::None => {}
                        }
                    }
                }
            }
            date = date.succ_opt()?;
        }

        pending
    }

    /// Day-of-month and day-of-week are OR-ed when both are restricted and
    /// AND-ed otherwise.
    fn matches_day(&self, date: NaiveDate) -> bool {
        let day_of_month = self.days_of_month.contains(date.day());
        let day_of_week = self
            .days_of_week
            .contains(date.weekday().num_days_from_sunday());

        if self.days_of_month.is_unrestricted() || self.days_of_week.is_unrestricted() {
            day_of_month && day_of_week
        } else {
            day_of_month || day_of_week
        }
    }
}

impl FromStr for Schedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Resolves aliases and English phrases to a 5-field expression.
fn canonicalize(source: &str) -> Result<String, ScheduleError> {
    if source.starts_with('@') {
        let lower = source.to_ascii_lowercase();
        return ALIASES
            .iter()
            .find(|(alias, _)| *alias == lower)
            .map(|(_, expression)| (*expression).to_string())
            .ok_or_else(|| ScheduleError::UnknownAlias(source.to_string()));
    }

    if source
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("every "))
    {
        return human::translate(source);
    }

    Ok(source.to_string())
}

/// Whether `expression` is a schedule this crate can run.
pub fn validate(expression: &str) -> bool {
    Schedule::parse(expression).is_ok()
}

/// Next fire time of `expression` strictly after `from`, in timezone `tz`.
pub fn next_run(
    expression: &str,
    from: DateTime<Utc>,
    tz: Tz,
) -> Result<DateTime<Utc>, ScheduleError> {
    let schedule = Schedule::parse(expression)?;
    schedule
        .next_after(from, tz)
        .ok_or_else(|| ScheduleError::NoUpcomingRun(expression.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
            .single()
            .expect("valid test timestamp")
    }

    fn next_utc(expression: &str, from: DateTime<Utc>) -> DateTime<Utc> {
        next_run(expression, from, Tz::UTC).unwrap()
    }

    #[test]
    fn test_validate_accepts_canonical_forms_and_aliases() {
        for expression in [
            "* * * * *",
            "*/1 * * * *",
            "0 0 * * *",
            "0 9 * * 1",
            "0 */4 * * *",
            "15,45 9-17 * jan-jun mon-fri",
            "0 0 1 * *",
            "@hourly",
            "@daily",
            "@weekly",
            "@monthly",
            "@YEARLY",
            "every 10 minutes",
            "every friday at 5pm",
        ] {
            assert!(validate(expression), "'{expression}' should be valid");
        }
    }

    #[test]
    fn test_validate_rejects_malformed_expressions() {
        for expression in [
            "",
            "   ",
            "* * *",
            "* * * * * *",
            "61 * * * *",
            "* 24 * * *",
            "* * 32 * *",
            "* * * 0 *",
            "* * * * 8",
            "@fortnightly",
            "every blue moon",
            "not a cron",
        ] {
            assert!(!validate(expression), "'{expression}' should be invalid");
        }
    }

    #[test]
    fn test_field_count_error_reports_count() {
        assert_eq!(
            Schedule::parse("* * *").unwrap_err(),
            ScheduleError::FieldCount(3)
        );
    }

    #[test]
    fn test_next_run_is_strictly_after_from() {
        let from = at(2024, 6, 15, 10, 0, 0);
        assert_eq!(next_utc("* * * * *", from), at(2024, 6, 15, 10, 1, 0));
        assert_eq!(next_utc("0 * * * *", from), at(2024, 6, 15, 11, 0, 0));

        let mid_minute = at(2024, 6, 15, 10, 0, 30);
        assert_eq!(next_utc("* * * * *", mid_minute), at(2024, 6, 15, 10, 1, 0));
    }

    #[test]
    fn test_next_run_is_monotonic() {
        let mut cursor = at(2024, 1, 1, 0, 0, 0);
        for expression in ["*/7 * * * *", "30 2 * * 1-5", "0 0 1,15 * *", "@weekly"] {
            for _ in 0..50 {
                let next = next_utc(expression, cursor);
                assert!(next > cursor, "{expression}: {next} <= {cursor}");
                cursor = next;
            }
        }
    }

    #[test]
    fn test_aliases_match_canonical_equivalents() {
        let from = at(2024, 2, 28, 13, 17, 0);
        for (alias, canonical) in [
            ("@hourly", "0 * * * *"),
            ("@daily", "0 0 * * *"),
            ("@weekly", "0 0 * * 0"),
            ("@monthly", "0 0 1 * *"),
            ("@yearly", "0 0 1 1 *"),
        ] {
            assert_eq!(next_utc(alias, from), next_utc(canonical, from), "{alias}");
        }
    }

    #[test]
    fn test_alias_expression_is_canonical() {
        let schedule = Schedule::parse("@daily").unwrap();
        assert_eq!(schedule.source(), "@daily");
        assert_eq!(schedule.expression(), "0 0 * * *");
    }

    #[test]
    fn test_sunday_is_zero_and_seven() {
        let from = at(2024, 6, 12, 0, 0, 0); // Wednesday
        let zero = next_utc("0 12 * * 0", from);
        let seven = next_utc("0 12 * * 7", from);
        assert_eq!(zero, seven);
        assert_eq!(zero.weekday(), Weekday::Sun);
    }

    #[test]
    fn test_day_of_month_or_day_of_week_when_both_restricted() {
        // 1st of the month OR any Monday
        let from = at(2024, 6, 1, 12, 0, 0); // Saturday the 1st, after midnight
        assert_eq!(next_utc("0 0 1 * 1", from), at(2024, 6, 3, 0, 0, 0));
    }

    #[test]
    fn test_day_of_month_and_day_of_week_when_one_is_star() {
        // every 2nd day of month, but only Fridays
        let from = at(2024, 6, 1, 0, 0, 0);
        let next = next_utc("0 0 */2 * 5", from);
        assert_eq!(next.weekday(), Weekday::Fri);
        assert_eq!(next.day() % 2, 1);
    }

    #[test]
    fn test_leap_day_schedule() {
        let from = at(2025, 3, 1, 0, 0, 0);
        assert_eq!(next_utc("0 0 29 2 *", from), at(2028, 2, 29, 0, 0, 0));
    }

    #[test]
    fn test_impossible_date_has_no_upcoming_run() {
        let from = at(2024, 1, 1, 0, 0, 0);
        assert!(validate("0 0 30 2 *"));
        assert_eq!(
            next_run("0 0 30 2 *", from, Tz::UTC).unwrap_err(),
            ScheduleError::NoUpcomingRun("0 0 30 2 *".to_string())
        );
    }

    #[test]
    fn test_next_run_in_timezone() {
        let from = at(2024, 6, 15, 12, 0, 0);
        let next = next_run("0 9 * * *", from, chrono_tz::America::New_York).unwrap();
        // 09:00 EDT is 13:00 UTC
        assert_eq!(next, at(2024, 6, 15, 13, 0, 0));
    }

    #[test]
    fn test_next_run_skips_spring_forward_gap() {
        // 2024-03-10 02:30 does not exist in New York
        let from = at(2024, 3, 10, 6, 0, 0);
        let next = next_run("30 2 * * *", from, chrono_tz::America::New_York).unwrap();
        assert_eq!(next, at(2024, 3, 11, 6, 30, 0));
    }

    #[test]
    fn test_next_run_picks_earliest_in_fall_back_overlap() {
        // 2024-11-03 01:30 happens twice in New York; the EDT one is 05:30 UTC
        let from = at(2024, 11, 3, 4, 0, 0);
        let next = next_run("30 1 * * *", from, chrono_tz::America::New_York).unwrap();
        assert_eq!(next, at(2024, 11, 3, 5, 30, 0));

        // and does not fire again at the EST 01:30
        let again = next_run("30 1 * * *", next, chrono_tz::America::New_York).unwrap();
        assert_eq!(again, at(2024, 11, 4, 6, 30, 0));
    }

    #[test]
    fn test_wildcard_hour_keeps_firing_through_fall_back_overlap() {
        let tz = chrono_tz::America::New_York;

        // 01:45 EDT, next is 01:00 EST
        let from = at(2024, 11, 3, 5, 45, 0);
        assert_eq!(next_run("*/15 * * * *", from, tz).unwrap(), at(2024, 11, 3, 6, 0, 0));

        let from = at(2024, 11, 3, 5, 0, 0);
        assert_eq!(next_run("0 * * * *", from, tz).unwrap(), at(2024, 11, 3, 6, 0, 0));

        let mut cursor = at(2024, 11, 3, 4, 50, 0);
        let mut fires = Vec::new();
        while cursor < at(2024, 11, 3, 7, 30, 0) {
            cursor = next_run("*/15 * * * *", cursor, tz).unwrap();
            fires.push(cursor);
        }
        assert_eq!(fires.len(), 11);
        assert!(fires.windows(2).all(|pair| pair[1] - pair[0] == Duration::minutes(15)));
    }

    #[test]
    fn test_human_phrase_uses_same_calendar() {
        let from = at(2024, 6, 12, 0, 0, 0);
        assert_eq!(
            next_utc("every monday at 9am", from),
            next_utc("0 9 * * 1", from)
        );
    }
}
