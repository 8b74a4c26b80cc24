/// Separators used when rendering numbers for one conversion run.
///
/// Only the number separators vary: date and time overrides are ISO patterns, which are the same
/// in every locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    pub id: &'static str,
    /// Decimal separator (e.g. `.` in `en-US`, `,` in many EU locales).
    pub decimal_sep: char,
    /// Thousands separator (e.g. `,` in `en-US`, `.` in `de-DE`).
    pub thousands_sep: char,
}

pub const EN_US: Locale = Locale {
    id: "en-US",
    decimal_sep: '.',
    thousands_sep: ',',
};

pub const EN_GB: Locale = Locale {
    id: "en-GB",
    ..EN_US
};

pub const DE_DE: Locale = Locale {
    id: "de-DE",
    decimal_sep: ',',
    thousands_sep: '.',
};

/// French (France) groups with U+00A0 NO-BREAK SPACE.
pub const FR_FR: Locale = Locale {
    id: "fr-FR",
    decimal_sep: ',',
    thousands_sep: '\u{00A0}',
};

pub const ES_ES: Locale = Locale {
    id: "es-ES",
    decimal_sep: ',',
    thousands_sep: '.',
};

pub const IT_IT: Locale = Locale {
    id: "it-IT",
    decimal_sep: ',',
    thousands_sep: '.',
};

/// Swiss-style separators (`'` grouping, `.` decimal).
pub const DE_CH: Locale = Locale {
    id: "de-CH",
    decimal_sep: '.',
    thousands_sep: '\'',
};

impl Default for Locale {
    fn default() -> Self {
        EN_US
    }
}

fn normalize_locale_id(id: &str) -> Option<String> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Treat `-` and `_` as equivalent and match case-insensitively.
    let mut key: String = trimmed
        .chars()
        .map(|ch| if ch == '_' { '-' } else { ch.to_ascii_lowercase() })
        .collect();

    // POSIX tags like `en_US.UTF-8` or `de_DE@euro`.
    if let Some(idx) = key.find(&['.', '@'][..]) {
        key.truncate(idx);
    }
    // BCP-47 extensions (`en-US-u-nu-latn`).
    if let Some(idx) = key.find("-u-").or_else(|| key.find("-x-")) {
        key.truncate(idx);
    }
    Some(key)
}

/// Look up a locale by tag (`en-US`, `de_DE.UTF-8`, `fr`, ...).
///
/// Region variants that are not listed fall back to their language (`fr-CA` -> `fr-FR`).
pub fn get_locale(id: &str) -> Option<Locale> {
    let key = normalize_locale_id(id)?;
    let locale = match key.as_str() {
        "en-us" | "en" => EN_US,
        "en-gb" | "en-uk" => EN_GB,
        "de-de" | "de" => DE_DE,
        "de-ch" | "fr-ch" | "it-ch" => DE_CH,
        "fr-fr" | "fr" => FR_FR,
        "es-es" | "es" => ES_ES,
        "it-it" | "it" => IT_IT,
        _ => match key.split('-').next().unwrap_or("") {
            "en" => EN_US,
            "de" => DE_DE,
            "fr" => FR_FR,
            "es" => ES_ES,
            "it" => IT_IT,
            _ => return None,
        },
    };
    Some(locale)
}
