use chrono::{Datelike, Days, NaiveDate};

use crate::number::split_sections;
use crate::FormatOptions;

/// Workbook date system used to interpret serial date values.
///
/// - `Excel1900` (the default) counts from 1900-01-00 and includes the Lotus 1-2-3 leap year bug
///   (serial 60 is the fictitious 1900-02-29).
/// - `Excel1904` counts from 1904-01-01; it is the default of older Mac workbooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateSystem {
    #[default]
    Excel1900,
    Excel1904,
}

impl DateSystem {
    /// Map a workbook's "1904 date windowing" flag to a date system.
    pub const fn from_1904_flag(date1904: bool) -> Self {
        if date1904 {
            DateSystem::Excel1904
        } else {
            DateSystem::Excel1900
        }
    }
}

const MS_PER_DAY: i64 = 86_400_000;
/// 9999-12-31 is the last representable date in the 1900 system.
const MAX_SERIAL: f64 = 2_958_466.0;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Returns true if a format should be treated as a date/time format.
///
/// Built-in date indices always qualify. Otherwise the first section of the pattern must consist
/// only of date/time tokens and separators once quoted text, escapes, colors and locale tags are
/// removed. Elapsed-time tokens (`[h]`, `[mm]`, `[ss]`) also qualify.
pub fn is_date_format(format_index: u16, pattern: &str) -> bool {
    if crate::builtin::is_builtin_date_format(format_index) {
        return true;
    }

    let Some(section) = split_sections(pattern).into_iter().next() else {
        return false;
    };
    let section = section.trim();
    if section.is_empty() || section.eq_ignore_ascii_case("general") {
        return false;
    }

    let mut cleaned = String::new();
    let mut chars = section.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                let _ = chars.next();
            }
            '[' => {
                let mut content = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    content.push(c);
                }
                if elapsed_unit(&content).is_some() {
                    return true;
                }
            }
            _ => cleaned.push(ch.to_ascii_lowercase()),
        }
    }

    let cleaned = cleaned.replace("am/pm", "").replace("a/p", "");
    let mut has_token = false;
    for ch in cleaned.chars() {
        match ch {
            'y' | 'm' | 'd' | 'h' | 's' => has_token = true,
            '-' | '/' | ',' | '.' | ' ' | ':' | '0' | 'b' | 'g' => {}
            // ISO date/time separator and CJK year/month/day markers.
            't' | '年' | '月' | '日' => {}
            _ => return false,
        }
    }
    has_token
}

fn elapsed_unit(content: &str) -> Option<ElapsedUnit> {
    let lower = content.to_ascii_lowercase();
    let first = lower.chars().next()?;
    if !lower.chars().all(|c| c == first) {
        return None;
    }
    match first {
        'h' => Some(ElapsedUnit::Hours),
        'm' => Some(ElapsedUnit::Minutes),
        's' => Some(ElapsedUnit::Seconds),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElapsedUnit {
    Hours,
    Minutes,
    Seconds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Year(usize),
    Month(usize),
    Day(usize),
    Hour(usize),
    Minute(usize),
    Second(usize),
    MonthOrMinute(usize),
    SubSecond(usize),
    Elapsed(ElapsedUnit, usize),
    AmPm { short: bool, lower: bool },
    Literal(String),
}

fn tokenize(section: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = section.chars().collect();
    let mut i = 0;

    let run_len = |start: usize, target: char| {
        chars[start..]
            .iter()
            .take_while(|c| c.eq_ignore_ascii_case(&target))
            .count()
    };

    while i < chars.len() {
        let ch = chars[i];
        match ch.to_ascii_lowercase() {
            '"' => {
                let text: String = chars[i + 1..].iter().take_while(|c| **c != '"').collect();
                i += text.chars().count() + 2;
                tokens.push(Token::Literal(text));
            }
            '\\' => {
                if let Some(next) = chars.get(i + 1) {
                    tokens.push(Token::Literal(next.to_string()));
                }
                i += 2;
            }
            '_' => {
                tokens.push(Token::Literal(" ".to_string()));
                i += 2;
            }
            '*' => i += 2,
            '[' => {
                let content: String = chars[i + 1..].iter().take_while(|c| **c != ']').collect();
                let len = content.chars().count();
                if i + 1 + len >= chars.len() {
                    // No closing bracket: keep the text.
                    tokens.push(Token::Literal(format!("[{content}")));
                } else if let Some(unit) = elapsed_unit(&content) {
                    tokens.push(Token::Elapsed(unit, len));
                }
                i += len + 2;
            }
            'y' | 'e' => {
                let n = run_len(i, ch);
                tokens.push(Token::Year(if ch.eq_ignore_ascii_case(&'e') { 4 } else { n }));
                i += n;
            }
            'd' => {
                let n = run_len(i, 'd');
                tokens.push(Token::Day(n));
                i += n;
            }
            'h' => {
                let n = run_len(i, 'h');
                tokens.push(Token::Hour(n));
                i += n;
            }
            's' => {
                let n = run_len(i, 's');
                tokens.push(Token::Second(n));
                i += n;
            }
            'm' => {
                let n = run_len(i, 'm');
                tokens.push(Token::MonthOrMinute(n));
                i += n;
            }
            'a' => {
                let rest: String = chars[i..].iter().take(5).collect();
                if rest.eq_ignore_ascii_case("am/pm") {
                    tokens.push(Token::AmPm {
                        short: false,
                        lower: ch == 'a',
                    });
                    i += 5;
                } else if rest.chars().take(3).collect::<String>().eq_ignore_ascii_case("a/p") {
                    tokens.push(Token::AmPm {
                        short: true,
                        lower: ch == 'a',
                    });
                    i += 3;
                } else {
                    tokens.push(Token::Literal(ch.to_string()));
                    i += 1;
                }
            }
            '.' if follows_seconds(&tokens) && chars.get(i + 1) == Some(&'0') => {
                let n = run_len(i + 1, '0');
                tokens.push(Token::SubSecond(n));
                i += n + 1;
            }
            '@' | 'g' | 'b' => i += 1,
            _ => {
                tokens.push(Token::Literal(ch.to_string()));
                i += 1;
            }
        }
    }

    disambiguate_month_minute(tokens)
}

fn follows_seconds(tokens: &[Token]) -> bool {
    matches!(
        tokens.last(),
        Some(Token::Second(_)) | Some(Token::Elapsed(ElapsedUnit::Seconds, _))
    )
}

/// `m` means minutes right after an hour token or right before a seconds token, months otherwise.
fn disambiguate_month_minute(mut tokens: Vec<Token>) -> Vec<Token> {
    for idx in 0..tokens.len() {
        let Token::MonthOrMinute(n) = tokens[idx] else {
            continue;
        };
        let prev = tokens[..idx]
            .iter()
            .rev()
            .find(|t| !matches!(t, Token::Literal(_)));
        let next = tokens[idx + 1..]
            .iter()
            .find(|t| !matches!(t, Token::Literal(_)));
        let after_hour = matches!(
            prev,
            Some(Token::Hour(_)) | Some(Token::Elapsed(ElapsedUnit::Hours, _))
        );
        let before_second = matches!(
            next,
            Some(Token::Second(_)) | Some(Token::Elapsed(ElapsedUnit::Seconds, _))
        );
        tokens[idx] = if after_hour || before_second {
            Token::Minute(n)
        } else {
            Token::Month(n)
        };
    }
    tokens
}

/// Calendar and clock fields of a serial value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DateTimeParts {
    year: i32,
    month: u32,
    day: u32,
    /// 0 = Sunday.
    weekday: u32,
    hour: u32,
    minute: u32,
    second: u32,
    millis: u32,
    /// Milliseconds since serial 0, used by elapsed-time tokens.
    total_millis: i64,
}

fn serial_to_parts(serial: f64, system: DateSystem, subsecond_digits: usize) -> Option<DateTimeParts> {
    if !serial.is_finite() || !(0.0..MAX_SERIAL).contains(&serial) {
        return None;
    }

    // Round to the precision the pattern displays; without fractional seconds Excel rounds to
    // the nearest second.
    let unit = 10_i64.pow(3 - subsecond_digits.min(3) as u32);
    let raw_millis = (serial * MS_PER_DAY as f64).round() as i64;
    let total_millis = ((raw_millis + unit / 2) / unit) * unit;

    let days = total_millis / MS_PER_DAY;
    let ms_of_day = total_millis % MS_PER_DAY;
    let (year, month, day, weekday) = civil_date(days, system)?;

    Some(DateTimeParts {
        year,
        month,
        day,
        weekday,
        hour: (ms_of_day / 3_600_000) as u32,
        minute: (ms_of_day / 60_000 % 60) as u32,
        second: (ms_of_day / 1000 % 60) as u32,
        millis: (ms_of_day % 1000) as u32,
        total_millis,
    })
}

fn civil_date(days: i64, system: DateSystem) -> Option<(i32, u32, u32, u32)> {
    let days_u = u64::try_from(days).ok()?;
    match system {
        DateSystem::Excel1900 => {
            // Serial 1 is a Sunday in Excel's calendar, which stays consistent across the
            // fictitious leap day.
            let weekday = ((days + 6) % 7) as u32;
            match days {
                0 => Some((1900, 1, 0, weekday)),
                60 => Some((1900, 2, 29, weekday)),
                _ => {
                    let base = if days < 60 {
                        NaiveDate::from_ymd_opt(1899, 12, 31)?
                    } else {
                        NaiveDate::from_ymd_opt(1899, 12, 30)?
                    };
                    let date = base.checked_add_days(Days::new(days_u))?;
                    Some((date.year(), date.month(), date.day(), weekday))
                }
            }
        }
        DateSystem::Excel1904 => {
            let date = NaiveDate::from_ymd_opt(1904, 1, 1)?.checked_add_days(Days::new(days_u))?;
            Some((
                date.year(),
                date.month(),
                date.day(),
                date.weekday().num_days_from_sunday(),
            ))
        }
    }
}

/// Render a serial date/time value under a date/time pattern.
///
/// Returns `None` when the value cannot be shown as a date (negative, non-finite, or past the
/// year 9999), so callers can fall back to numeric rendering.
pub(crate) fn format_serial(serial: f64, pattern: &str, options: &FormatOptions) -> Option<String> {
    let section = split_sections(pattern).into_iter().next().unwrap_or(pattern);
    let tokens = tokenize(section);

    let subsecond_digits = tokens
        .iter()
        .filter_map(|t| match t {
            Token::SubSecond(n) => Some(*n),
            _ => None,
        })
        .max()
        .unwrap_or(0);
    let parts = serial_to_parts(serial, options.date_system, subsecond_digits)?;
    let twelve_hour = tokens.iter().any(|t| matches!(t, Token::AmPm { .. }));

    let mut out = String::new();
    for token in &tokens {
        match token {
            Token::Year(n) if *n <= 2 => out.push_str(&format!("{:02}", parts.year % 100)),
            Token::Year(_) => out.push_str(&format!("{:04}", parts.year)),
            Token::Month(n) => {
                let name = MONTHS[(parts.month as usize).saturating_sub(1) % 12];
                match n {
                    1 => out.push_str(&parts.month.to_string()),
                    2 => out.push_str(&format!("{:02}", parts.month)),
                    3 => out.push_str(&name[..3]),
                    4 => out.push_str(name),
                    _ => out.push_str(&name[..1]),
                }
            }
            Token::Day(n) => {
                let name = WEEKDAYS[parts.weekday as usize % 7];
                match n {
                    1 => out.push_str(&parts.day.to_string()),
                    2 => out.push_str(&format!("{:02}", parts.day)),
                    3 => out.push_str(&name[..3]),
                    _ => out.push_str(name),
                }
            }
            Token::Hour(n) => {
                let hour = if twelve_hour {
                    match parts.hour % 12 {
                        0 => 12,
                        h => h,
                    }
                } else {
                    parts.hour
                };
                push_padded(&mut out, hour.into(), *n);
            }
            Token::Minute(n) => push_padded(&mut out, parts.minute.into(), *n),
            Token::Second(n) => push_padded(&mut out, parts.second.into(), *n),
            Token::SubSecond(n) => {
                let millis = format!("{:03}", parts.millis);
                out.push(options.locale.decimal_sep);
                out.push_str(&millis[..(*n).min(3)]);
            }
            Token::Elapsed(unit, n) => {
                let divisor = match unit {
                    ElapsedUnit::Hours => 3_600_000,
                    ElapsedUnit::Minutes => 60_000,
                    ElapsedUnit::Seconds => 1000,
                };
                push_padded(&mut out, parts.total_millis / divisor, *n);
            }
            Token::AmPm { short, lower } => {
                let text = match (parts.hour < 12, short) {
                    (true, false) => "AM",
                    (false, false) => "PM",
                    (true, true) => "A",
                    (false, true) => "P",
                };
                if *lower {
                    out.push_str(&text.to_ascii_lowercase());
                } else {
                    out.push_str(text);
                }
            }
            Token::Literal(text) => out.push_str(text),
            Token::MonthOrMinute(_) => {
                log::debug!("unresolved month/minute token in date pattern `{pattern}`");
            }
        }
    }
    Some(out)
}

fn push_padded(out: &mut String, value: i64, width: usize) {
    let width = width.min(2).max(1);
    out.push_str(&format!("{value:0width$}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(serial: f64, pattern: &str) -> Option<String> {
        format_serial(serial, pattern, &FormatOptions::default())
    }

    #[test]
    fn classifies_date_and_number_patterns() {
        assert!(is_date_format(14, "m/d/yy"));
        assert!(is_date_format(164, "yyyy-mm-dd"));
        assert!(is_date_format(164, "dd/mm/yyyy hh:mm"));
        assert!(is_date_format(164, "[$-409]mmmm d, yyyy;@"));
        assert!(is_date_format(164, "h:mm AM/PM"));
        assert!(is_date_format(164, "[h]:mm:ss"));
        assert!(is_date_format(164, "\"Due \"d-mmm"));
        assert!(is_date_format(176, "yyyy年m月d日"));
        assert!(is_date_format(176, "yyyy-mm-ddThh:mm"));
        assert!(is_date_format(176, "yyyy\\-mm\\-dd"));
        assert!(!is_date_format(164, "0.00"));
        assert!(!is_date_format(164, "#,##0"));
        assert!(!is_date_format(164, "General"));
        assert!(!is_date_format(164, "0.00E+00"));
        assert!(!is_date_format(164, "0.0E-0"));
        assert!(!is_date_format(164, "@"));
        assert!(!is_date_format(164, ""));
    }

    #[test]
    fn month_versus_minute() {
        assert_eq!(render(45000.5, "yyyy-mm-dd hh:mm:ss").as_deref(), Some("2023-03-15 12:00:00"));
        assert_eq!(render(0.5 + 7.0 / 1440.0, "mm:ss").as_deref(), Some("07:00"));
        assert_eq!(render(45000.0, "mmm d").as_deref(), Some("Mar 15"));
    }

    #[test]
    fn lotus_leap_year_bug_and_epochs() {
        assert_eq!(render(59.0, "yyyy-mm-dd").as_deref(), Some("1900-02-28"));
        assert_eq!(render(60.0, "yyyy-mm-dd").as_deref(), Some("1900-02-29"));
        assert_eq!(render(61.0, "yyyy-mm-dd").as_deref(), Some("1900-03-01"));
        assert_eq!(render(1.0, "ddd, yyyy-mm-dd").as_deref(), Some("Sun, 1900-01-01"));

        let options = FormatOptions {
            date_system: DateSystem::Excel1904,
            ..FormatOptions::default()
        };
        assert_eq!(
            format_serial(0.0, "yyyy-mm-dd", &options).as_deref(),
            Some("1904-01-01")
        );
        assert_eq!(
            format_serial(45000.0 - 1462.0, "yyyy-mm-dd", &options).as_deref(),
            Some("2023-03-15")
        );
    }

    #[test]
    fn twelve_hour_clock_and_rounding() {
        assert_eq!(render(0.75, "h:mm AM/PM").as_deref(), Some("6:00 PM"));
        assert_eq!(render(0.0, "h:mm a/p").as_deref(), Some("12:00 a"));
        // 23:59:59.6 rounds up to the next day.
        let serial = 45000.0 + (86_399.6 / 86_400.0);
        assert_eq!(render(serial, "yyyy-mm-dd hh:mm:ss").as_deref(), Some("2023-03-16 00:00:00"));
        assert_eq!(render(0.5 + 0.25 / 86_400.0, "hh:mm:ss.00").as_deref(), Some("12:00:00.25"));
    }

    #[test]
    fn elapsed_time_accumulates_past_one_day() {
        assert_eq!(render(1.5, "[h]:mm:ss").as_deref(), Some("36:00:00"));
        assert_eq!(render(1.0 / 24.0, "[mm]:ss").as_deref(), Some("60:00"));
    }

    #[test]
    fn out_of_range_serials_are_rejected() {
        assert_eq!(render(-1.0, "yyyy-mm-dd"), None);
        assert_eq!(render(f64::NAN, "yyyy-mm-dd"), None);
        assert_eq!(render(3_000_000.0, "yyyy-mm-dd"), None);
    }
}
