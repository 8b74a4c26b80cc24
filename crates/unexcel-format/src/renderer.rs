use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

use crate::builtin::builtin_format_code;
use crate::datetime::{format_serial, is_date_format};
use crate::number::{format_default, format_number, select_section};
use crate::resolver::FormatOverrideResolver;
use crate::{DateSystem, FormatOptions};

fn exponent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"E(\d)").expect("valid regex"))
}

/// Rewrite the first `E<digit>` as `E+<digit>` unless the text already has a negative exponent.
///
/// Format engines differ on whether positive exponents carry a sign; exported values always do.
pub fn normalize_exponent_sign(text: &str) -> Cow<'_, str> {
    if text.contains("E-") {
        return Cow::Borrowed(text);
    }
    exponent_re().replacen(text, 1, "E+$1")
}

/// Renders raw numeric cell values as display text.
///
/// One renderer is used per conversion run: it owns the run's [`FormatOptions`] and the date
/// override cache.
#[derive(Debug, Clone, Default)]
pub struct NumericCellRenderer {
    options: FormatOptions,
    resolver: FormatOverrideResolver,
}

impl NumericCellRenderer {
    pub fn new(options: FormatOptions) -> Self {
        Self {
            options,
            resolver: FormatOverrideResolver::new(),
        }
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    /// Switch the epoch used for date serials (workbooks announce it before their first sheet).
    pub fn set_date_system(&mut self, date_system: DateSystem) {
        self.options.date_system = date_system;
    }

    /// Render `value` under the format code `pattern` stored at `format_index`.
    ///
    /// Date/time formats are replaced by their ISO override; serials that cannot be dates fall
    /// back to [`Self::render_default`]. Number formats keep their literal text and mandatory
    /// digits, with the fraction-digit count widened to the configured limit.
    pub fn render(&mut self, value: f64, format_index: u16, pattern: &str) -> String {
        let rendered = if is_date_format(format_index, pattern) {
            let resolved = self.resolver.resolve(format_index, pattern);
            match format_serial(value, resolved, &self.options) {
                Some(text) => text,
                None => format_default(value, &self.options),
            }
        } else if pattern.trim().is_empty() {
            format_default(value, &self.options)
        } else {
            let (section, auto_negative_sign) = select_section(pattern, value);
            format_number(value, section, auto_negative_sign, &self.options)
        };

        normalize_exponent_sign(&rendered).into_owned()
    }

    /// Like [`Self::render`], but falls back to the built-in code of `format_index` when the cell
    /// carries no pattern, and to default rendering when neither exists.
    pub fn render_format(&mut self, value: f64, format_index: u16, pattern: Option<&str>) -> String {
        match pattern.or_else(|| builtin_format_code(format_index)) {
            Some(pattern) => self.render(value, format_index, pattern),
            None => self.render_default(value),
        }
    }

    /// Plain decimal text for cells without a usable format.
    pub fn render_default(&self, value: f64) -> String {
        normalize_exponent_sign(&format_default(value, &self.options)).into_owned()
    }
}
