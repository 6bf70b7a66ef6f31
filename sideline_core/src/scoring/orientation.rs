//! Orientation questions and answer checking.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use super::months::month_name;
use crate::voice::normalize;

const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrientationItem {
    Month,
    Date,
    Weekday,
    Year,
    Time,
    /// Free text compared after normalization.
    Text,
}

impl OrientationItem {
    pub fn prompt(self) -> &'static str {
        match self {
            OrientationItem::Month => "What month is it?",
            OrientationItem::Date => "What is the date today?",
            OrientationItem::Weekday => "What is the day of the week?",
            OrientationItem::Year => "What year is it?",
            OrientationItem::Time => "What time is it right now?",
            OrientationItem::Text => "",
        }
    }
}

/// A question with its canonical answer.
///
/// Canonical forms: lowercase month and weekday names, day of month and year
/// as decimal integers, time as 24-hour `HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrientationQuestion {
    pub item: OrientationItem,
    pub expected: String,
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// The standard five questions, answered for `now`.
pub fn standard_questions(now: NaiveDateTime) -> Vec<OrientationQuestion> {
    let q = |item, expected: String| OrientationQuestion { item, expected };
    vec![
        q(
            OrientationItem::Month,
            month_name(now.month()).unwrap_or_default().to_string(),
        ),
        q(OrientationItem::Date, now.day().to_string()),
        q(OrientationItem::Weekday, weekday_name(now.weekday()).to_string()),
        q(OrientationItem::Year, now.year().to_string()),
        q(
            OrientationItem::Time,
            format!("{:02}:{:02}", now.hour(), now.minute()),
        ),
    ]
}

/// Whether `response` answers `question`.
///
/// Names compare by normalized equality. Numbers compare by value, so `"4th"`
/// and `"04"` both answer `"4"`. Times are correct within `tolerance_min`
/// minutes, wrapping at midnight.
pub fn is_correct(question: &OrientationQuestion, response: &str, tolerance_min: u32) -> bool {
    let said = normalize(response);
    match question.item {
        OrientationItem::Month | OrientationItem::Weekday | OrientationItem::Text => {
            said == normalize(&question.expected)
        }
        OrientationItem::Date => match (parse_ordinal(&said), question.expected.parse::<u32>()) {
            (Some(got), Ok(want)) => got == want,
            _ => false,
        },
        OrientationItem::Year => {
            said.len() == 4
                && matches!(
                    (said.parse::<i32>(), question.expected.parse::<i32>()),
                    (Ok(got), Ok(want)) if got == want
                )
        }
        OrientationItem::Time => {
            let Some(want) = parse_clock_24h(&question.expected) else {
                return false;
            };
            parse_time(&said)
                .unwrap_or_default()
                .into_iter()
                .any(|got| circular_diff(got, want) <= tolerance_min)
        }
    }
}

fn parse_ordinal(text: &str) -> Option<u32> {
    let trimmed = ["st", "nd", "rd", "th"]
        .iter()
        .find_map(|suffix| text.strip_suffix(suffix))
        .unwrap_or(text);
    trimmed.trim().parse().ok()
}

fn parse_clock_24h(text: &str) -> Option<u32> {
    let (h, m) = text.trim().split_once(':')?;
    let (h, m): (u32, u32) = (h.parse().ok()?, m.parse().ok()?);
    (h < 24 && m < 60).then_some(h * 60 + m)
}

fn circular_diff(a: u32, b: u32) -> u32 {
    let d = a.abs_diff(b) % MINUTES_PER_DAY;
    d.min(MINUTES_PER_DAY - d)
}

/// Candidate minutes-after-midnight for a spoken or typed time.
///
/// Without an am/pm marker a 12-hour reading is ambiguous, so both halves of
/// the day are returned.
pub fn parse_time(text: &str) -> Option<Vec<u32>> {
    let cleaned = text.to_lowercase().replace(['.', '\''], "").replace("oclock", "");
    let (body, meridiem) = if let Some(b) = cleaned.trim().strip_suffix("am") {
        (b, Some(false))
    } else if let Some(b) = cleaned.trim().strip_suffix("pm") {
        (b, Some(true))
    } else {
        (cleaned.trim(), None)
    };

    let parts: Vec<&str> = body
        .split(|c: char| c == ':' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    let (hour, minute): (u32, u32) = match parts.as_slice() {
        [h] if h.len() > 2 => {
            let (h, m) = h.split_at(h.len() - 2);
            (h.parse().ok()?, m.parse().ok()?)
        }
        [h] => (h.parse().ok()?, 0),
        [h, m] => (h.parse().ok()?, m.parse().ok()?),
        _ => return None,
    };
    if minute >= 60 || hour >= 24 {
        return None;
    }

    let candidates = match meridiem {
        Some(pm) => {
            if hour == 0 || hour > 12 {
                return None;
            }
            let h = match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            };
            vec![h * 60 + minute]
        }
        None if (1..=12).contains(&hour) => {
            vec![(hour % 12) * 60 + minute, (hour % 12 + 12) * 60 + minute]
        }
        None => vec![hour * 60 + minute],
    };
    Some(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    fn question(item: OrientationItem, expected: &str) -> OrientationQuestion {
        OrientationQuestion {
            item,
            expected: expected.into(),
        }
    }

    #[test]
    fn month_is_case_insensitive() {
        assert!(is_correct(&question(OrientationItem::Month, "july"), "July", 60));
        assert!(!is_correct(&question(OrientationItem::Month, "july"), "June", 60));
    }

    #[test]
    fn standard_questions_cover_five_items() {
        let qs = standard_questions(at(2026, 7, 4, 14, 30));
        let expected: Vec<&str> = qs.iter().map(|q| q.expected.as_str()).collect();
        assert_eq!(expected, ["july", "4", "saturday", "2026", "14:30"]);
    }

    #[test]
    fn date_accepts_ordinals() {
        let q = question(OrientationItem::Date, "4");
        assert!(is_correct(&q, "4th", 60));
        assert!(is_correct(&q, "04", 60));
        assert!(!is_correct(&q, "14", 60));
    }

    #[test]
    fn year_requires_four_digits() {
        let q = question(OrientationItem::Year, "2026");
        assert!(is_correct(&q, "2026", 60));
        assert!(!is_correct(&q, "26", 60));
    }

    #[test]
    fn time_within_tolerance_wraps_midnight() {
        let q = question(OrientationItem::Time, "23:40");
        assert!(is_correct(&q, "12:20 am", 60));
        assert!(is_correct(&q, "11 pm", 60));
        assert!(!is_correct(&q, "9 pm", 60));
    }

    #[test]
    fn bare_twelve_hour_time_checks_both_halves() {
        let q = question(OrientationItem::Time, "14:30");
        assert!(is_correct(&q, "2:30", 60));
        assert!(is_correct(&q, "3", 60));
        assert!(!is_correct(&q, "5", 60));
    }

    #[test]
    fn noon_is_not_read_as_midnight() {
        let q = question(OrientationItem::Time, "12:30");
        assert!(is_correct(&q, "12:45 pm", 60));
        assert!(!is_correct(&q, "12:45 am", 60));
    }
}
