use super::ScheduleError;

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
const WEEKDAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Position of a field inside a 5-field cron expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    Minute,
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
}

impl FieldKind {
    pub(crate) const ALL: [Self; 5] = [
        Self::Minute,
        Self::Hour,
        Self::DayOfMonth,
        Self::Month,
        Self::DayOfWeek,
    ];

    pub(crate) const fn label(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::DayOfMonth => "day-of-month",
            Self::Month => "month",
            Self::DayOfWeek => "day-of-week",
        }
    }

    /// Inclusive bounds accepted in the source text. Day-of-week admits 7 as
    /// an alias for Sunday.
    const fn bounds(self) -> (u32, u32) {
        match self {
            Self::Minute => (0, 59),
            Self::Hour => (0, 23),
            Self::DayOfMonth => (1, 31),
            Self::Month => (1, 12),
            Self::DayOfWeek => (0, 7),
        }
    }

    fn names(self) -> Option<(&'static [&'static str], u32)> {
        match self {
            Self::Month => Some((MONTH_NAMES.as_slice(), 1)),
            Self::DayOfWeek => Some((WEEKDAY_NAMES.as_slice(), 0)),
            _ => None,
        }
    }

    fn value(self, raw: &str, field: &str) -> Result<u32, ScheduleError> {
        let (min, max) = self.bounds();

        let value = match raw.parse::<u32>() {
            Ok(number) => number,
            Err(_) => self
                .names()
                .and_then(|(names, offset)| {
                    let lower = raw.to_ascii_lowercase();
                    names
                        .iter()
                        .position(|name| *name == lower)
                        .and_then(|index| u32::try_from(index).ok())
                        .map(|index| index + offset)
                })
                .ok_or_else(|| self.invalid(field, format!("'{raw}' is not a number")))?,
        };

        if value < min || value > max {
            return Err(self.invalid(
                field,
                format!("{value} is outside the allowed range {min}-{max}"),
            ));
        }

        Ok(value)
    }

    fn invalid(self, field: &str, reason: String) -> ScheduleError {
        ScheduleError::InvalidField {
            field: self.label(),
            value: field.to_string(),
            reason,
        }
    }
}

/// The set of values one cron field admits, stored as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Field {
    bits: u64,
    unrestricted: bool,
}

impl Field {
    pub(crate) fn parse(kind: FieldKind, text: &str) -> Result<Self, ScheduleError> {
        let (min, max) = kind.bounds();
        let mut bits = 0u64;

        for item in text.split(',') {
            if item.is_empty() {
                return Err(kind.invalid(text, "empty list item".to_string()));
            }

            let (range, step) = match item.split_once('/') {
                Some((range, step)) => {
                    let step = step
                        .parse::<u32>()
                        .map_err(|_| kind.invalid(text, format!("invalid step '{step}'")))?;
                    if step == 0 {
                        return Err(kind.invalid(text, "step must be at least 1".to_string()));
                    }
                    (range, Some(step))
                }
                None => (item, None),
            };

            let (start, end) = if range == "*" {
                (min, max)
            } else if let Some((low, high)) = range.split_once('-') {
                (kind.value(low, text)?, kind.value(high, text)?)
            } else {
                let value = kind.value(range, text)?;
                // `N/S` runs from N up to the field maximum
                if step.is_some() {
                    (value, max)
                } else {
                    (value, value)
                }
            };

            if start > end {
                return Err(kind.invalid(text, format!("range {start}-{end} is reversed")));
            }

            let step = step.unwrap_or(1);
            let mut value = start;
            while value <= end {
                bits |= 1 << value;
                match value.checked_add(step) {
                    Some(next) => value = next,
                    None => break,
                }
            }
        }

        if kind == FieldKind::DayOfWeek && bits & (1 << 7) != 0 {
            bits = (bits & !(1 << 7)) | 1;
        }

        Ok(Self {
            bits,
            unrestricted: text.starts_with('*'),
        })
    }

    pub(crate) const fn contains(&self, value: u32) -> bool {
        value < 64 && self.bits & (1 << value) != 0
    }

    /// True when the field was written as `*` or `*/S`. Day matching uses this
    /// to decide between AND and OR semantics.
    pub(crate) const fn is_unrestricted(&self) -> bool {
        self.unrestricted
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = u32> + '_ {
        (0..64).filter(|value| self.contains(*value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(kind: FieldKind, text: &str) -> Vec<u32> {
        Field::parse(kind, text).unwrap().values().collect()
    }

    #[test]
    fn test_star_covers_whole_range() {
        assert_eq!(values(FieldKind::Hour, "*").len(), 24);
        assert_eq!(values(FieldKind::Month, "*"), (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn test_lists_ranges_and_steps() {
        assert_eq!(values(FieldKind::Minute, "0,15,30,45"), vec![0, 15, 30, 45]);
        assert_eq!(values(FieldKind::Hour, "9-12"), vec![9, 10, 11, 12]);
        assert_eq!(values(FieldKind::Minute, "*/20"), vec![0, 20, 40]);
        assert_eq!(values(FieldKind::Hour, "1-10/3"), vec![1, 4, 7, 10]);
        assert_eq!(values(FieldKind::Minute, "50/5"), vec![50, 55]);
    }

    #[test]
    fn test_names_are_case_insensitive() {
        assert_eq!(values(FieldKind::Month, "JAN,mar"), vec![1, 3]);
        assert_eq!(values(FieldKind::DayOfWeek, "Mon-Fri"), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_day_of_week_seven_is_sunday() {
        assert_eq!(values(FieldKind::DayOfWeek, "7"), vec![0]);
        assert_eq!(values(FieldKind::DayOfWeek, "5-7"), vec![0, 5, 6]);
    }

    #[test]
    fn test_unrestricted_flag() {
        assert!(Field::parse(FieldKind::DayOfMonth, "*").unwrap().is_unrestricted());
        assert!(Field::parse(FieldKind::DayOfMonth, "*/2").unwrap().is_unrestricted());
        assert!(!Field::parse(FieldKind::DayOfMonth, "1-31").unwrap().is_unrestricted());
    }

    #[test]
    fn test_rejects_malformed_fields() {
        for (kind, text) in [
            (FieldKind::Minute, "61"),
            (FieldKind::Hour, "24"),
            (FieldKind::DayOfMonth, "0"),
            (FieldKind::Month, "13"),
            (FieldKind::DayOfWeek, "8"),
            (FieldKind::Minute, "*/0"),
            (FieldKind::Minute, "10-5"),
            (FieldKind::Minute, "1,,2"),
            (FieldKind::Minute, "abc"),
            (FieldKind::Hour, "jan"),
        ] {
            assert!(
                Field::parse(kind, text).is_err(),
                "{} field '{}' should be rejected",
                kind.label(),
                text
            );
        }
    }
}
