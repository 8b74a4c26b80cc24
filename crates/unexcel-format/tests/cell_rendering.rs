use pretty_assertions::assert_eq;
use proptest::prelude::*;
use unexcel_format::{
    get_locale, normalize_exponent_sign, override_date_pattern, DateSystem, FormatOptions,
    FormatOverrideResolver, NumericCellRenderer, ISO_DATE_FORMAT, ISO_DATE_WITH_WEEKDAY_FORMAT,
    ISO_TIME_FORMAT,
};

#[test]
fn date_only_time_only_and_mixed() {
    let mut resolver = FormatOverrideResolver::new();
    assert_eq!(resolver.resolve(15, "d-mmm-yy"), "yyyy-mm-dd");
    assert_eq!(resolver.resolve(21, "h:mm:ss"), "hh:mm:ss");
    assert_eq!(resolver.resolve(22, "m/d/yy h:mm"), "yyyy-mm-dd hh:mm:ss");
    assert_eq!(resolver.resolve(165, "dddd d mmmm yyyy"), "ddd, yyyy-mm-dd");
}

#[test]
fn cjk_and_iso_t_patterns_render_as_dates() {
    let mut renderer = NumericCellRenderer::default();
    assert_eq!(renderer.render(45000.0, 176, "yyyy年m月d日"), "2023-03-15");
    assert_eq!(
        renderer.render(45000.25, 177, "yyyy-mm-ddThh:mm"),
        "2023-03-15 06:00:00"
    );
}

#[test]
fn elapsed_time_is_not_rewritten() {
    let mut renderer = NumericCellRenderer::default();
    assert_eq!(renderer.render(2.0 + 1.0 / 24.0, 46, "[h]:mm:ss"), "49:00:00");
    assert_eq!(renderer.render(1.0 / 1440.0, 170, "[mm]:ss"), "01:00");
}

#[test]
fn date_cell_hides_nothing() {
    // A date-only style over a serial with a time of day keeps the day; the time part is only
    // shown when the style has clock markers.
    let mut renderer = NumericCellRenderer::default();
    assert_eq!(renderer.render(45000.5, 14, "m/d/yy"), "2023-03-15");
    assert_eq!(renderer.render(45000.5, 22, "m/d/yy h:mm"), "2023-03-15 12:00:00");
    assert_eq!(renderer.render(45000.0, 165, "dddd, mmmm d, yyyy"), "Wed, 2023-03-15");
}

#[test]
fn epochs_shift_by_1462_days() {
    let mut excel_1900 = NumericCellRenderer::default();
    let mut excel_1904 = NumericCellRenderer::new(FormatOptions {
        date_system: DateSystem::Excel1904,
        ..FormatOptions::default()
    });
    assert_eq!(
        excel_1900.render(45000.0, 14, "m/d/yy"),
        excel_1904.render(45000.0 - 1462.0, 14, "m/d/yy")
    );
    assert_eq!(excel_1900.render(60.0, 14, "m/d/yy"), "1900-02-29");
}

#[test]
fn fraction_digit_limit_is_configurable() {
    let mut renderer = NumericCellRenderer::new(FormatOptions {
        max_fraction_digits: 3,
        ..FormatOptions::default()
    });
    assert_eq!(renderer.render(1.0 / 3.0, 2, "0.00"), "0.333");
    assert_eq!(renderer.render(1.0 / 3.0, 1, "0"), "0.333");
    assert_eq!(renderer.render(2.5, 4, "#,##0.00"), "2.50");
    assert_eq!(renderer.render_default(2.0 / 3.0), "0.667");
}

#[test]
fn locale_separators() {
    let mut renderer = NumericCellRenderer::new(FormatOptions {
        locale: get_locale("de-DE").expect("known locale"),
        ..FormatOptions::default()
    });
    assert_eq!(renderer.render(1234567.25, 4, "#,##0.00"), "1.234.567,25");
    assert_eq!(renderer.render(45000.0, 14, "m/d/yy"), "2023-03-15");
}

#[test]
fn scientific_results_always_carry_a_sign() {
    let mut renderer = NumericCellRenderer::default();
    assert_eq!(renderer.render(1.5e20, 0, "General"), "1.5E+20");
    assert_eq!(renderer.render(1.5e-20, 0, "General"), "1.5E-20");
    assert_eq!(renderer.render(250.0, 48, "##0.0E+0"), "2.5E+2");
    assert_eq!(normalize_exponent_sign("3E7"), "3E+7");
}

fn fraction_digits(text: &str) -> usize {
    text.split_once('.')
        .map(|(_, frac)| frac.chars().take_while(char::is_ascii_digit).count())
        .unwrap_or(0)
}

const DATE_TOKENS: &[&str] = &["d", "dd", "ddd", "dddd", "yy", "yyyy"];
const TIME_TOKENS: &[&str] = &["h", "hh", "s", "ss", "AM/PM"];
// Month or minute; carries no date or time marker of its own.
const MONTH_MINUTE_TOKENS: &[&str] = &["m", "mm", "mmm"];
const SEPARATORS: &[&str] = &["-", "/", " ", ":", ", ", "."];

fn tokens(pool: &'static [&'static str], min: usize) -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(pool), min..4)
}

fn join_pattern(tokens: &[&str], separators: &[&str]) -> String {
    let mut pattern = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            pattern.push_str(separators[i % separators.len()]);
        }
        pattern.push_str(token);
    }
    pattern
}

fn expected_date_part(pattern: &str) -> &'static str {
    if pattern.to_ascii_lowercase().contains("ddd") {
        ISO_DATE_WITH_WEEKDAY_FORMAT
    } else {
        ISO_DATE_FORMAT
    }
}

proptest! {
    #[test]
    fn date_only_patterns_get_no_time(
        date in tokens(DATE_TOKENS, 1),
        shared in tokens(MONTH_MINUTE_TOKENS, 0),
        separators in prop::collection::vec(prop::sample::select(SEPARATORS), 1..4),
    ) {
        let pattern = join_pattern(&[date, shared].concat(), &separators);
        prop_assert_eq!(override_date_pattern(&pattern), expected_date_part(&pattern));
    }

    #[test]
    fn time_only_patterns_get_no_date(
        time in tokens(TIME_TOKENS, 1),
        shared in tokens(MONTH_MINUTE_TOKENS, 0),
        separators in prop::collection::vec(prop::sample::select(SEPARATORS), 1..4),
    ) {
        let pattern = join_pattern(&[time, shared].concat(), &separators);
        prop_assert_eq!(override_date_pattern(&pattern), ISO_TIME_FORMAT);
    }

    #[test]
    fn mixed_patterns_join_date_and_time(
        date in tokens(DATE_TOKENS, 1),
        time in tokens(TIME_TOKENS, 1),
        shared in tokens(MONTH_MINUTE_TOKENS, 0),
        separators in prop::collection::vec(prop::sample::select(SEPARATORS), 1..4),
    ) {
        let pattern = join_pattern(&[date, shared, time].concat(), &separators);
        let expected = format!("{} {}", expected_date_part(&pattern), ISO_TIME_FORMAT);
        prop_assert_eq!(override_date_pattern(&pattern), expected);
    }
}

proptest! {
    #[test]
    fn fraction_digits_never_exceed_the_limit(
        value in -1.0e9f64..1.0e9,
        limit in 0u8..=12,
        pattern in prop::sample::select(vec!["0", "0.00", "#,##0.000", "General", ""]),
    ) {
        let mut renderer = NumericCellRenderer::new(FormatOptions {
            max_fraction_digits: limit,
            ..FormatOptions::default()
        });
        let text = renderer.render(value, 164, pattern);
        prop_assert!(
            fraction_digits(&text) <= usize::from(limit),
            "{text:?} has more than {limit} fraction digits"
        );
    }

    #[test]
    fn positive_exponents_are_signed(mantissa in 1.0f64..10.0, exp in 11i32..300) {
        let mut renderer = NumericCellRenderer::default();
        let text = renderer.render(mantissa * 10f64.powi(exp), 11, "0.00E00");
        prop_assert!(text.contains("E+"), "{text:?} lacks an exponent sign");
    }
}
