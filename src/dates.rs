//! Date and timestamp parsing for `date`/`datetime` coercions.
//!
//! Everything that interprets a date-like cell goes through [`DateParser`].
//! [`FlexibleDateParser`] accepts the loose formats people type into
//! spreadsheets and resolves ambiguous numeric dates with a configurable
//! [`DateOrder`]; [`StrictDateParser`] pins parsing to one chrono format.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;

pub trait DateParser: Send + Sync {
    /// Parses a trimmed, non-empty cell. Date-only inputs resolve to midnight.
    fn parse(&self, raw: &str) -> Option<NaiveDateTime>;
}

/// Field order used for numeric dates such as `03/05/2024`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateOrder {
    #[default]
    MonthFirst,
    DayFirst,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FlexibleDateParser {
    order: DateOrder,
}

impl FlexibleDateParser {
    pub fn new(order: DateOrder) -> Self {
        Self { order }
    }
}

// Only tried on values that open with a four-digit year.
const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S",
];

const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const MONTH_NAMES: &[&str] = &[
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const WEEKDAY_NAMES: &[&str] = &[
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Words skipped between date parts, as in `5th of March 2024 at 9 am UTC`.
const FILLER_WORDS: &[&str] = &["at", "on", "of", "and", "utc", "gmt", "z"];

const UTC_SUFFIXES: &[&str] = &["UTC", "GMT", "Z"];

static NUMERIC_DATE: OnceLock<Regex> = OnceLock::new();
static COMPACT_DATE: OnceLock<Regex> = OnceLock::new();
static TIME_OF_DAY: OnceLock<Regex> = OnceLock::new();
static ORDINAL_DAY: OnceLock<Regex> = OnceLock::new();

fn numeric_date() -> &'static Regex {
    NUMERIC_DATE.get_or_init(|| {
        Regex::new(r"^(\d{1,4})([/.\-])(\d{1,2})([/.\-])(\d{1,4})(?:(?:\s+|T)(.+))?$")
            .expect("valid numeric date pattern")
    })
}

fn compact_date() -> &'static Regex {
    COMPACT_DATE
        .get_or_init(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").expect("valid compact pattern"))
}

fn time_of_day() -> &'static Regex {
    TIME_OF_DAY.get_or_init(|| {
        Regex::new(r"^(\d{1,2})(?::(\d{2})(?::(\d{2})(?:\.(\d{1,9}))?)?)?\s*(?:([AaPp])\.?[Mm]\.?)?$")
            .expect("valid time pattern")
    })
}

fn ordinal_day() -> &'static Regex {
    ORDINAL_DAY.get_or_init(|| {
        Regex::new(r"(?i)^(\d{1,2})(?:st|nd|rd|th)$").expect("valid ordinal pattern")
    })
}

impl DateParser for FlexibleDateParser {
    fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }
        if let Some(parsed) = parse_with_offset(value) {
            return Some(parsed);
        }
        let value = strip_utc_suffix(value);
        if has_leading_year(value) {
            for fmt in ISO_DATETIME_FORMATS {
                if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
                    return Some(parsed);
                }
            }
        }
        if let Some(parsed) = parse_compact(value) {
            return Some(parsed);
        }
        if let Some(parsed) = self.parse_numeric(value) {
            return Some(parsed);
        }
        parse_named_month(value)
    }
}

impl FlexibleDateParser {
    fn parse_numeric(&self, value: &str) -> Option<NaiveDateTime> {
        let caps = numeric_date().captures(value)?;
        if caps[2] != caps[4] {
            return None;
        }
        let first = &caps[1];
        let middle: u32 = caps[3].parse().ok()?;
        let last = &caps[5];
        let date = if first.len() == 4 {
            NaiveDate::from_ymd_opt(first.parse().ok()?, middle, last.parse().ok()?)?
        } else {
            if last.len() == 3 {
                return None;
            }
            let year = expand_year(last.parse().ok()?, last.len());
            let first: u32 = first.parse().ok()?;
            let (mut month, mut day) = match self.order {
                DateOrder::MonthFirst => (first, middle),
                DateOrder::DayFirst => (middle, first),
            };
            if month > 12 && day <= 12 {
                std::mem::swap(&mut month, &mut day);
            }
            NaiveDate::from_ymd_opt(year, month, day)?
        };
        let time = match caps.get(6) {
            Some(rest) => parse_time(rest.as_str())?,
            None => NaiveTime::MIN,
        };
        Some(date.and_time(time))
    }
}

fn has_leading_year(value: &str) -> bool {
    value.len() >= 4 && value.as_bytes()[..4].iter().all(u8::is_ascii_digit)
}

/// Drops a trailing `UTC`, `GMT` or `Z` that follows a time.
fn strip_utc_suffix(value: &str) -> &str {
    for zone in UTC_SUFFIXES {
        let Some(split) = value.len().checked_sub(zone.len()) else {
            continue;
        };
        if !value.is_char_boundary(split) || !value[split..].eq_ignore_ascii_case(zone) {
            continue;
        }
        let rest = value[..split].trim_end();
        if rest.ends_with(|c: char| c.is_ascii_digit() || c == 'm' || c == 'M') {
            return rest;
        }
    }
    value
}

fn parse_with_offset(value: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.naive_local());
    }
    if !has_leading_year(value) {
        return None;
    }
    OFFSET_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(value, fmt).ok())
        .map(|parsed| parsed.naive_local())
}

fn parse_compact(value: &str) -> Option<NaiveDateTime> {
    let caps = compact_date().captures(value)?;
    let date = NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )?;
    Some(date.and_time(NaiveTime::MIN))
}

/// Looks a word up by its full name or an abbreviation of at least three
/// letters (`Mar`, `Sept`, `Tues`).
fn lookup_name(names: &[&str], word: &str) -> Option<usize> {
    if word.len() < 3 {
        return None;
    }
    names.iter().position(|name| name.starts_with(word))
}

fn is_meridiem(token: &str) -> bool {
    let letters = token.replace('.', "").to_ascii_lowercase();
    letters == "am" || letters == "pm"
}

/// Reads dates that spell the month out, such as `05-Mar-24`,
/// `Tuesday, March 5th, 2024 9:05 am` or `Tue Mar 5 14:30:00 2024`.
///
/// Four-digit numbers are years. Of the remaining numbers the first is the
/// day and the second a year, expanded like numeric two-digit years. A missing
/// year or day is taken from today, with the day clamped to the month's end.
fn parse_named_month(value: &str) -> Option<NaiveDateTime> {
    let tokens: Vec<&str> = value
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | '-' | '/'))
        .filter(|token| !token.is_empty())
        .collect();

    let mut month = None;
    let mut day = None;
    let mut year = None;
    let mut time = None;
    let mut loose = Vec::new();
    let mut idx = 0;
    while idx < tokens.len() {
        let token = tokens[idx];
        idx += 1;
        if token.starts_with(|c: char| c.is_ascii_digit()) {
            if let Some(meridiem) = tokens.get(idx).filter(|next| is_meridiem(next)) {
                if time.replace(parse_time(&format!("{token} {meridiem}"))?).is_some() {
                    return None;
                }
                idx += 1;
            } else if let Some(caps) = ordinal_day().captures(token) {
                if day.replace(caps[1].parse::<u32>().ok()?).is_some() {
                    return None;
                }
            } else if token.bytes().all(|b| b.is_ascii_digit()) {
                match token.len() {
                    4 => {
                        if year.replace(token.parse::<i32>().ok()?).is_some() {
                            return None;
                        }
                    }
                    1 | 2 => loose.push(token),
                    _ => return None,
                }
            } else if time.replace(parse_time(token)?).is_some() {
                return None;
            }
            continue;
        }

        let word = token.trim_end_matches('.').to_ascii_lowercase();
        if let Some(position) = lookup_name(MONTH_NAMES, &word) {
            if month.replace(position as u32 + 1).is_some() {
                return None;
            }
        } else if lookup_name(WEEKDAY_NAMES, &word).is_none()
            && !FILLER_WORDS.contains(&word.as_str())
        {
            return None;
        }
    }

    let month = month?;
    for number in loose {
        if day.is_none() {
            day = Some(number.parse().ok()?);
        } else if year.is_none() {
            year = Some(expand_year(number.parse().ok()?, number.len()));
        } else {
            return None;
        }
    }

    let today = Local::now().date_naive();
    let year = year.unwrap_or(today.year());
    let day = match day {
        Some(day) => day,
        None => today.day().min(last_day_of_month(year, month)?),
    };
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.and_time(time.unwrap_or(NaiveTime::MIN)))
}

fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    (28..=31)
        .rev()
        .find(|day| NaiveDate::from_ymd_opt(year, month, *day).is_some())
}

/// Reads `14:30`, `14:30:05.250`, `2:30 PM` or `9am`. A bare hour needs a
/// meridiem.
fn parse_time(value: &str) -> Option<NaiveTime> {
    let caps = time_of_day().captures(value.trim())?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    let second: u32 = match caps.get(3) {
        Some(s) => s.as_str().parse().ok()?,
        None => 0,
    };
    let nanos: u32 = match caps.get(4) {
        Some(fraction) => format!("{:0<9}", fraction.as_str()).parse().ok()?,
        None => 0,
    };
    match caps.get(5) {
        Some(meridiem) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            hour %= 12;
            if meridiem.as_str().eq_ignore_ascii_case("p") {
                hour += 12;
            }
        }
        None if caps.get(2).is_none() => return None,
        None => {}
    }
    NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
}

/// Places a two-digit year within fifty years of the current year.
fn expand_year(year: i32, digits: usize) -> i32 {
    if digits > 2 {
        return year;
    }
    let current = Utc::now().year();
    let century = current - current % 100;
    let mut expanded = century + year;
    if expanded >= current + 50 {
        expanded -= 100;
    } else if expanded < current - 50 {
        expanded += 100;
    }
    expanded
}

/// Parses with a single chrono format string.
#[derive(Debug, Clone)]
pub struct StrictDateParser {
    format: String,
}

impl StrictDateParser {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }
}

impl DateParser for StrictDateParser {
    fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        let value = raw.trim();
        NaiveDateTime::parse_from_str(value, &self.format)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(value, &self.format)
                    .ok()
                    .map(|date| date.and_time(NaiveTime::MIN))
            })
    }
}
