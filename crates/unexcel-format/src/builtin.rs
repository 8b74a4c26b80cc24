//! Built-in number formats.
//!
//! Cell styles may reference a format by index only; indices below 164 are reserved for formats
//! that every spreadsheet application knows without a stored format code. The en-US codes below
//! are the ones used when a style names a built-in index without spelling the pattern out.

const BUILTIN_FORMATS: [Option<&str>; 50] = [
    Some("General"),
    Some("0"),
    Some("0.00"),
    Some("#,##0"),
    Some("#,##0.00"),
    Some("\"$\"#,##0_);(\"$\"#,##0)"),
    Some("\"$\"#,##0_);[Red](\"$\"#,##0)"),
    Some("\"$\"#,##0.00_);(\"$\"#,##0.00)"),
    Some("\"$\"#,##0.00_);[Red](\"$\"#,##0.00)"),
    Some("0%"),
    Some("0.00%"),
    Some("0.00E+00"),
    Some("# ?/?"),
    Some("# ??/??"),
    Some("m/d/yy"),
    Some("d-mmm-yy"),
    Some("d-mmm"),
    Some("mmm-yy"),
    Some("h:mm AM/PM"),
    Some("h:mm:ss AM/PM"),
    Some("h:mm"),
    Some("h:mm:ss"),
    Some("m/d/yy h:mm"),
    // 23..=36 are reserved for locale-specific (mostly East Asian) formats.
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    Some("#,##0_);(#,##0)"),
    Some("#,##0_);[Red](#,##0)"),
    Some("#,##0.00_);(#,##0.00)"),
    Some("#,##0.00_);[Red](#,##0.00)"),
    Some("_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)"),
    Some("_(\"$\"* #,##0_);_(\"$\"* (#,##0);_(\"$\"* \"-\"_);_(@_)"),
    Some("_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)"),
    Some("_(\"$\"* #,##0.00_);_(\"$\"* (#,##0.00);_(\"$\"* \"-\"??_);_(@_)"),
    Some("mm:ss"),
    Some("[h]:mm:ss"),
    Some("mm:ss.0"),
    Some("##0.0E+0"),
    Some("@"),
];

/// Return the format code of a built-in format index, if the index has a known code.
pub fn builtin_format_code(index: u16) -> Option<&'static str> {
    BUILTIN_FORMATS.get(usize::from(index)).copied().flatten()
}

/// Built-in indices that are date or time formats regardless of their (possibly localized) code.
pub fn is_builtin_date_format(index: u16) -> bool {
    matches!(index, 14..=22 | 45..=47)
}
