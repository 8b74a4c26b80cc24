use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::datetime::is_date_format;

/// Replacement for calendar dates.
pub const ISO_DATE_FORMAT: &str = "yyyy-mm-dd";
/// Replacement for calendar dates whose original format names the weekday.
pub const ISO_DATE_WITH_WEEKDAY_FORMAT: &str = "ddd, yyyy-mm-dd";
/// Replacement for times of day, always on a 24-hour clock.
pub const ISO_TIME_FORMAT: &str = "hh:mm:ss";

const DATE_CHARS: [char; 2] = ['d', 'y'];
// `m` is ambiguous (month or minute) and marks neither.
const TIME_CHARS: [char; 4] = ['h', 's', 'a', 'p'];

fn elapsed_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[smh]{1,2}\]").expect("valid regex"))
}

/// Returns true for durations such as `[h]:mm:ss` or `[mm]:ss`.
///
/// These count past 24 hours (or 60 minutes) and must not be rewritten as a time of day.
pub fn is_elapsed_time_format(pattern: &str) -> bool {
    elapsed_time_re().is_match(&pattern.to_ascii_lowercase())
}

/// Compute the canonical replacement for a date/time pattern.
///
/// Calendar parts become `yyyy-mm-dd` (or `ddd, yyyy-mm-dd` when the weekday is shown) and clock
/// parts become `hh:mm:ss`, so `m/d/yy h:mm` turns into `yyyy-mm-dd hh:mm:ss`. Elapsed-time
/// patterns and patterns with no unambiguous marker (`mmm`) come back unchanged.
pub fn override_date_pattern(pattern: &str) -> String {
    if is_elapsed_time_format(pattern) {
        return pattern.to_string();
    }

    let lower = pattern.to_ascii_lowercase();
    let has_date = lower.contains(&DATE_CHARS[..]);
    let has_time = lower.contains(&TIME_CHARS[..]);

    let mut parts = Vec::with_capacity(2);
    if has_date {
        parts.push(if lower.contains("ddd") {
            ISO_DATE_WITH_WEEKDAY_FORMAT
        } else {
            ISO_DATE_FORMAT
        });
    }
    if has_time {
        parts.push(ISO_TIME_FORMAT);
    }

    if parts.is_empty() {
        pattern.to_string()
    } else {
        parts.join(" ")
    }
}

/// Memoizes date pattern overrides per format index for one conversion run.
///
/// Entries are computed on first use and never invalidated; a workbook maps each format index to a
/// single pattern.
#[derive(Debug, Default, Clone)]
pub struct FormatOverrideResolver {
    cache: HashMap<u16, String>,
}

impl FormatOverrideResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the pattern to render a numeric cell with.
    ///
    /// Non-date patterns are returned unchanged; date/time patterns are replaced by their ISO
    /// override.
    pub fn resolve<'a>(&'a mut self, format_index: u16, pattern: &'a str) -> &'a str {
        if !is_date_format(format_index, pattern) {
            return pattern;
        }
        self.cache
            .entry(format_index)
            .or_insert_with(|| {
                let resolved = override_date_pattern(pattern);
                log::debug!("format {format_index} `{pattern}` resolves to `{resolved}`");
                resolved
            })
            .as_str()
    }

    /// Number of cached overrides.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
