//! Translates a small set of English phrases ("every 5 minutes",
//! "every monday at 9am") into canonical 5-field cron expressions.

use std::sync::LazyLock;

use regex::Regex;

use super::ScheduleError;

static EVERY_UNIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^every (minute|hour)$").expect("valid regex"));

static EVERY_N_UNITS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^every (\d{1,2}) (minute|minutes|hour|hours)$").expect("valid regex")
});

static EVERY_DAY_AT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^every (day|sunday|monday|tuesday|wednesday|thursday|friday|saturday|sun|mon|tue|wed|thu|fri|sat) at (\d{1,2})(?::(\d{2}))? ?(am|pm)?$",
    )
    .expect("valid regex")
});

/// Returns the cron equivalent of `phrase`, or `UnrecognizedPhrase`.
pub(crate) fn translate(phrase: &str) -> Result<String, ScheduleError> {
    let normalized = phrase
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let unrecognized = || ScheduleError::UnrecognizedPhrase(phrase.to_string());

    if let Some(captures) = EVERY_UNIT.captures(&normalized) {
        return Ok(match &captures[1] {
            "minute" => "* * * * *".to_string(),
            _ => "0 * * * *".to_string(),
        });
    }

    if let Some(captures) = EVERY_N_UNITS.captures(&normalized) {
        let count: u32 = captures[1].parse().map_err(|_| unrecognized())?;
        return match &captures[2] {
            "minute" | "minutes" if (1..=59).contains(&count) => Ok(format!("*/{count} * * * *")),
            "hour" | "hours" if (1..=23).contains(&count) => Ok(format!("0 */{count} * * *")),
            _ => Err(unrecognized()),
        };
    }

    if let Some(captures) = EVERY_DAY_AT.captures(&normalized) {
        let day = weekday_number(&captures[1]);
        let hour: u32 = captures[2].parse().map_err(|_| unrecognized())?;
        let minute: u32 = captures
            .get(3)
            .map_or(Ok(0), |m| m.as_str().parse())
            .map_err(|_| unrecognized())?;

        let hour = match captures.get(4).map(|m| m.as_str()) {
            Some(meridiem) if (1..=12).contains(&hour) => match (meridiem, hour) {
                ("am", 12) => 0,
                ("am", h) => h,
                ("pm", 12) => 12,
                (_, h) => h + 12,
            },
            Some(_) => return Err(unrecognized()),
            None if hour <= 23 => hour,
            None => return Err(unrecognized()),
        };

        if minute > 59 {
            return Err(unrecognized());
        }

        let day_of_week = day.map_or_else(|| "*".to_string(), |d| d.to_string());
        return Ok(format!("{minute} {hour} * * {day_of_week}"));
    }

    Err(unrecognized())
}

fn weekday_number(day: &str) -> Option<u32> {
    match &day[..3] {
        "sun" => Some(0),
        "mon" => Some(1),
        "tue" => Some(2),
        "wed" => Some(3),
        "thu" => Some(4),
        "fri" => Some(5),
        "sat" => Some(6),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_phrases() {
        assert_eq!(translate("every minute").unwrap(), "* * * * *");
        assert_eq!(translate("every hour").unwrap(), "0 * * * *");
        assert_eq!(translate("every 5 minutes").unwrap(), "*/5 * * * *");
        assert_eq!(translate("Every  4 Hours").unwrap(), "0 */4 * * *");
    }

    #[test]
    fn test_daily_and_weekly_phrases() {
        assert_eq!(translate("every day at 3am").unwrap(), "0 3 * * *");
        assert_eq!(translate("every day at 12am").unwrap(), "0 0 * * *");
        assert_eq!(translate("every day at 12:30 pm").unwrap(), "30 12 * * *");
        assert_eq!(translate("every day at 18:45").unwrap(), "45 18 * * *");
        assert_eq!(translate("every monday at 9:00am").unwrap(), "0 9 * * 1");
        assert_eq!(translate("every sunday at 11pm").unwrap(), "0 23 * * 0");
    }

    #[test]
    fn test_out_of_range_phrases_fail_closed() {
        for phrase in [
            "every 0 minutes",
            "every 60 minutes",
            "every 24 hours",
            "every day at 25:00",
            "every day at 13pm",
            "every day at 10:75",
            "every fortnight",
            "at noon",
        ] {
            assert!(translate(phrase).is_err(), "'{phrase}' should be rejected");
        }
    }
}
