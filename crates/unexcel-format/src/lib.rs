//! Excel number/date format handling for CSV export.
//!
//! Spreadsheet display formats are frequently lossy: a date cell may be styled to show only the
//! day while its serial value carries a time of day, and a number may be styled with no decimals
//! while the stored value has a fraction. This crate renders raw cell values so that exported text
//! keeps that information:
//! - [`FormatOverrideResolver`] widens calendar date/time formats to canonical ISO patterns
//!   (leaving elapsed-time formats such as `[h]:mm:ss` alone).
//! - [`NumericCellRenderer`] renders numbers under Excel format codes with a fixed fraction-digit
//!   limit, and normalizes scientific notation to always carry the exponent sign.

pub mod locale;

mod builtin;
mod datetime;
mod literal;
mod number;
mod renderer;
mod resolver;

pub use crate::builtin::{builtin_format_code, is_builtin_date_format};
pub use crate::datetime::{is_date_format, DateSystem};
pub use crate::locale::{get_locale, Locale, EN_US};
pub use crate::renderer::{normalize_exponent_sign, NumericCellRenderer};
pub use crate::resolver::{
    is_elapsed_time_format, override_date_pattern, FormatOverrideResolver, ISO_DATE_FORMAT,
    ISO_DATE_WITH_WEEKDAY_FORMAT, ISO_TIME_FORMAT,
};

/// Fraction digits kept when a format code would otherwise hide or invent precision.
pub const DEFAULT_MAX_FRACTION_DIGITS: u8 = 10;

/// Formatting options shared by every cell of one conversion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    pub locale: Locale,
    pub date_system: DateSystem,
    /// Upper bound on digits after the decimal separator for number formats.
    ///
    /// This replaces the fraction-digit count of every number format code, so `0` renders
    /// `1234.5` as `1234.5` instead of `1235`.
    pub max_fraction_digits: u8,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            locale: EN_US,
            date_system: DateSystem::Excel1900,
            max_fraction_digits: DEFAULT_MAX_FRACTION_DIGITS,
        }
    }
}
