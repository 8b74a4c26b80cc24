use std::cmp::Ordering;

use crate::literal::{positions_outside_quotes, render_literal};
use crate::FormatOptions;

/// Split a format code into its `;`-separated sections, ignoring separators inside quotes,
/// escapes and bracket tokens.
pub(crate) fn split_sections(code: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escape = false;
    let mut start = 0;
    for (idx, ch) in code.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        if in_quotes {
            if ch == '"' {
                in_quotes = false;
            }
            continue;
        }
        if in_brackets {
            if ch == ']' {
                in_brackets = false;
            }
            continue;
        }
        match ch {
            '"' => in_quotes = true,
            '\\' => escape = true,
            '[' => in_brackets = true,
            ';' => {
                sections.push(&code[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    sections.push(&code[start..]);
    sections
}

/// Pick the section used for `value` and whether a `-` must be prepended for negatives.
///
/// A dedicated negative section renders the absolute value as-is (it usually carries its own
/// parentheses or sign). Conditional sections (`[>100]`) are treated positionally.
pub(crate) fn select_section(code: &str, value: f64) -> (&str, bool) {
    let sections = split_sections(code);
    match sections.as_slice() {
        [only] => (*only, true),
        [positive, negative] => {
            if value < 0.0 {
                (*negative, false)
            } else {
                (*positive, true)
            }
        }
        [positive, negative, zero, ..] => {
            if value < 0.0 {
                (*negative, false)
            } else if value == 0.0 {
                (*zero, true)
            } else {
                (*positive, true)
            }
        }
        [] => (code, true),
    }
}

/// Format `value` under one section of a number format code.
///
/// The fraction-digit count of the pattern is replaced by `options.max_fraction_digits`; the
/// pattern's mandatory (`0`) fraction digits still pad up to that limit.
pub(crate) fn format_number(
    value: f64,
    pattern: &str,
    auto_negative_sign: bool,
    options: &FormatOptions,
) -> String {
    if !value.is_finite() {
        return format_default(value, options);
    }

    if let Some(pos) = find_general(pattern) {
        let prefix = render_literal(&pattern[..pos], None);
        let suffix = render_literal(&pattern[pos + GENERAL.len()..], None);
        let body = format_general(value.abs(), options);
        return with_sign(format!("{prefix}{body}{suffix}"), value, auto_negative_sign);
    }

    let (first_idx, last_idx) = find_placeholder_span(pattern);
    let Some((start, end_placeholder)) = first_idx.zip(last_idx) else {
        // `@` in a numeric section shows the number the way General would.
        if !positions_outside_quotes(pattern, '@').is_empty() {
            let body = format_general(value.abs(), options);
            return with_sign(render_literal(pattern, Some(&body)), value, auto_negative_sign);
        }
        return render_literal(pattern, None);
    };

    // Extend the placeholder span to include trailing scaling commas, e.g. "#,##0,,"
    let end = end_placeholder + pattern[end_placeholder..].chars().take_while(|c| *c == ',').count();

    let prefix = render_literal(&pattern[..start], None);
    let number_raw = &pattern[start..end];
    let suffix = render_literal(&pattern[end..], None);

    let mut v = value.abs();
    for _ in positions_outside_quotes(pattern, '%') {
        v *= 100.0;
    }

    let max_frac = usize::from(options.max_fraction_digits);
    let body = match parse_scientific(number_raw) {
        Some(mut spec) => {
            spec.mantissa.clamp_fraction(max_frac);
            format_scientific(v, &spec, options)
        }
        None => {
            // Fractions (`# ?/?`) are rendered as plain decimals.
            let mut spec = parse_fixed(number_raw);
            spec.clamp_fraction(max_frac);
            format_fixed(v, &spec, options)
        }
    };

    with_sign(format!("{prefix}{body}{suffix}"), value, auto_negative_sign)
}

fn with_sign(mut s: String, value: f64, auto_negative_sign: bool) -> String {
    // Rounding can turn a tiny negative into zero; Excel does not show `-0`.
    if value < 0.0 && auto_negative_sign && s.chars().any(|c| c.is_ascii_digit() && c != '0') {
        s.insert(0, '-');
    }
    s
}

const GENERAL: &str = "General";

fn find_general(pattern: &str) -> Option<usize> {
    let lower = pattern.to_ascii_lowercase();
    let mut in_quotes = false;
    let mut escape = false;
    for (idx, ch) in pattern.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '"' => in_quotes = !in_quotes,
            '\\' if !in_quotes => escape = true,
            _ if !in_quotes && lower[idx..].starts_with("general") => return Some(idx),
            _ => {}
        }
    }
    None
}

/// Render a number the way Excel's General format does: up to ten significant digits, switching
/// to scientific notation for very large or very small magnitudes.
pub(crate) fn format_general(value: f64, options: &FormatOptions) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    let max_frac = usize::from(options.max_fraction_digits);
    let abs = value.abs();
    let body = if abs >= 1e11 || abs < 1e-9 {
        let spec = ScientificSpec {
            mantissa: FixedSpec {
                min_int: 1,
                int_placeholders: 1,
                min_frac: 0,
                max_frac: max_frac.min(5),
                grouping: false,
                scale_commas: 0,
            },
            exp_width: 2,
            exp_sign_always: true,
            e_char: 'E',
        };
        format_scientific(abs, &spec, options)
    } else {
        let int_digits = abs.log10().floor() as i64 + 1;
        let frac = (10 - int_digits).clamp(0, max_frac as i64) as usize;
        plain_decimal(abs, frac, options)
    };

    if value < 0.0 {
        format!("-{body}")
    } else {
        body
    }
}

/// Fallback rendering used when a cell has no usable format: a plain decimal without grouping,
/// limited to `max_fraction_digits`.
pub(crate) fn format_default(value: f64, options: &FormatOptions) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let body = plain_decimal(value.abs(), usize::from(options.max_fraction_digits), options);
    with_sign(body, value, true)
}

fn plain_decimal(value: f64, max_frac: usize, options: &FormatOptions) -> String {
    let (int_part, frac_part) = round_decimal_digits(&value.to_string(), max_frac);
    let frac_part = fit_fraction(&frac_part, 0);
    if frac_part.is_empty() {
        int_part
    } else {
        format!("{int_part}{}{frac_part}", options.locale.decimal_sep)
    }
}

/// Round an unsigned plain decimal (`123.456`) to at most `max_frac` fraction digits.
///
/// Rounding works on the shortest decimal representation of the double rather than its binary
/// value, with ties to even, so `1234567.891` never turns into `1234567.8910000001`.
fn round_decimal_digits(s: &str, max_frac: usize) -> (String, String) {
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
    if frac_part.len() <= max_frac {
        return (int_part.to_string(), frac_part.to_string());
    }

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().take(max_frac))
        .collect();
    let rest = &frac_part.as_bytes()[max_frac..];
    let round_up = match rest[0].cmp(&b'5') {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => {
            rest[1..].iter().any(|d| *d != b'0')
                || digits.last().is_some_and(|d| (d - b'0') % 2 == 1)
        }
    };

    if round_up {
        let mut carry = true;
        for d in digits.iter_mut().rev() {
            if *d == b'9' {
                *d = b'0';
            } else {
                *d += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, b'1');
        }
    }

    let (int_digits, frac_digits) = digits.split_at(digits.len() - max_frac);
    let to_string = |bytes: &[u8]| bytes.iter().map(|b| char::from(*b)).collect::<String>();
    (to_string(int_digits), to_string(frac_digits))
}

/// Drop trailing zeros, keeping (or padding to) `min_frac` digits.
fn fit_fraction(frac: &str, min_frac: usize) -> String {
    let mut out = frac.trim_end_matches('0').to_string();
    while out.len() < min_frac {
        out.push('0');
    }
    out
}

fn find_placeholder_span(s: &str) -> (Option<usize>, Option<usize>) {
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut skip_next = false;
    let mut first: Option<usize> = None;
    let mut last: Option<usize> = None;

    for (idx, ch) in s.char_indices() {
        if skip_next {
            skip_next = false;
            continue;
        }
        if in_quotes {
            if ch == '"' {
                in_quotes = false;
            }
            continue;
        }
        if in_brackets {
            if ch == ']' {
                in_brackets = false;
            }
            continue;
        }
        match ch {
            '"' => in_quotes = true,
            '[' => in_brackets = true,
            // The operand of an escape, underscore or fill is never a placeholder.
            '\\' | '_' | '*' => skip_next = true,
            '0' | '#' | '?' => {
                if first.is_none() {
                    first = Some(idx);
                }
                last = Some(idx + ch.len_utf8());
            }
            _ => {}
        }
    }

    (first, last)
}

#[derive(Debug, Clone)]
struct FixedSpec {
    min_int: usize,
    int_placeholders: usize,
    min_frac: usize,
    max_frac: usize,
    grouping: bool,
    scale_commas: usize,
}

impl FixedSpec {
    fn clamp_fraction(&mut self, max_frac: usize) {
        self.max_frac = max_frac;
        self.min_frac = self.min_frac.min(max_frac);
    }
}

fn parse_fixed(number_raw: &str) -> FixedSpec {
    let raw = number_raw.trim_end_matches(',');
    let scale_commas = number_raw.len() - raw.len();

    let (int_pat, frac_pat) = match positions_outside_quotes(raw, '.').first() {
        Some(&pos) => (&raw[..pos], &raw[pos + 1..]),
        None => (raw, ""),
    };

    let is_placeholder = |c: &char| matches!(c, '0' | '#' | '?');
    FixedSpec {
        min_int: int_pat.chars().filter(|c| *c == '0').count(),
        int_placeholders: int_pat.chars().filter(is_placeholder).count(),
        min_frac: frac_pat.chars().filter(|c| *c == '0').count(),
        max_frac: frac_pat.chars().filter(is_placeholder).count(),
        grouping: int_pat.contains(','),
        scale_commas,
    }
}

fn format_fixed(mut value: f64, spec: &FixedSpec, options: &FormatOptions) -> String {
    // Scaling commas divide by 1000 per comma.
    for _ in 0..spec.scale_commas {
        value /= 1000.0;
    }

    let (mut int_part, frac_part) = round_decimal_digits(&value.to_string(), spec.max_frac);
    let frac_part = fit_fraction(&frac_part, spec.min_frac);

    if spec.int_placeholders == 0 || (spec.min_int == 0 && int_part == "0") {
        // "#.##" shows nothing before the decimal separator for values below one.
        int_part.clear();
    }
    while int_part.len() < spec.min_int {
        int_part.insert(0, '0');
    }
    if spec.grouping && !int_part.is_empty() {
        int_part = group_thousands(&int_part, options.locale.thousands_sep);
    }

    let mut out = int_part;
    if !frac_part.is_empty() {
        out.push(options.locale.decimal_sep);
        out.push_str(&frac_part);
    }
    if out.is_empty() {
        out.push('0');
    }
    out
}

fn group_thousands(int_part: &str, sep: char) -> String {
    let len = int_part.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in int_part.chars().enumerate() {
        out.push(ch);
        let pos_from_end = len - i;
        if pos_from_end > 1 && pos_from_end % 3 == 1 {
            out.push(sep);
        }
    }
    out
}

#[derive(Debug, Clone)]
struct ScientificSpec {
    mantissa: FixedSpec,
    exp_width: usize,
    exp_sign_always: bool,
    e_char: char,
}

fn parse_scientific(number_raw: &str) -> Option<ScientificSpec> {
    let e_idx = positions_outside_quotes(number_raw, 'E')
        .into_iter()
        .chain(positions_outside_quotes(number_raw, 'e'))
        .min()?;
    let e_char = number_raw[e_idx..].chars().next()?;
    let mantissa_raw = &number_raw[..e_idx];
    let exponent_raw = &number_raw[e_idx + 1..];

    let (exp_sign_always, rest) = match exponent_raw.chars().next() {
        Some('+') => (true, &exponent_raw[1..]),
        Some('-') => (false, &exponent_raw[1..]),
        _ => (false, exponent_raw),
    };

    let exp_width = rest.chars().filter(|c| matches!(c, '0' | '#' | '?')).count();
    if exp_width == 0 {
        return None;
    }

    Some(ScientificSpec {
        mantissa: parse_fixed(mantissa_raw),
        exp_width,
        exp_sign_always,
        e_char: e_char.to_ascii_uppercase(),
    })
}

fn format_scientific(value: f64, spec: &ScientificSpec, options: &FormatOptions) -> String {
    if value == 0.0 {
        let mantissa = format_fixed(0.0, &spec.mantissa, options);
        let exp = format_exponent(0, spec);
        return format!("{mantissa}{}{exp}", spec.e_char);
    }

    // `{:e}` yields the shortest digits with a single integer digit, e.g. `1.2345e4`.
    let repr = format!("{:e}", value.abs());
    let (mantissa_raw, exp_raw) = repr.split_once('e').unwrap_or((repr.as_str(), "0"));
    let mut exp: i32 = exp_raw.parse().unwrap_or(0);

    let (mut int_part, frac_part) = round_decimal_digits(mantissa_raw, spec.mantissa.max_frac);
    if int_part.len() > 1 {
        // Rounded up to 10.
        int_part.truncate(1);
        exp += 1;
    }
    let frac_part = fit_fraction(&frac_part, spec.mantissa.min_frac);

    let mut out = int_part;
    if !frac_part.is_empty() {
        out.push(options.locale.decimal_sep);
        out.push_str(&frac_part);
    }
    out.push(spec.e_char);
    out.push_str(&format_exponent(exp, spec));
    out
}

fn format_exponent(exp: i32, spec: &ScientificSpec) -> String {
    let sign = if exp < 0 {
        "-"
    } else if spec.exp_sign_always {
        "+"
    } else {
        ""
    };
    let width = spec.exp_width;
    format!("{sign}{:0width$}", exp.unsigned_abs())
}
