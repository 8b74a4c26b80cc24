/// Render the literal parts of a format code section.
///
/// Quoted text and `\`-escaped characters are emitted verbatim, `_X` reserves the width of `X`
/// (approximated as one space), `*X` fill instructions are dropped, and bracket tokens are removed
/// except currency markers like `[$€-407]`. When `text` is given, every unquoted `@` is replaced
/// by it.
pub(crate) fn render_literal(segment: &str, text: Option<&str>) -> String {
    let mut out = String::new();
    let mut in_quotes = false;
    let mut chars = segment.chars();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                in_quotes = false;
            } else {
                out.push(ch);
            }
            continue;
        }

        match ch {
            '"' => in_quotes = true,
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '[' => {
                let mut content = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    content.push(c);
                }

                if !closed {
                    out.push('[');
                    out.push_str(&content);
                } else if let Some(symbol) = currency_symbol_from_bracket(&content) {
                    out.push_str(symbol);
                }
            }
            '_' => {
                let _ = chars.next();
                out.push(' ');
            }
            '*' => {
                let _ = chars.next();
            }
            '@' => match text {
                Some(text) => out.push_str(text),
                None => out.push('@'),
            },
            _ => out.push(ch),
        }
    }

    out
}

fn currency_symbol_from_bracket(content: &str) -> Option<&str> {
    let after = content.strip_prefix('$')?;
    let symbol = after.split_once('-').map(|(s, _)| s).unwrap_or(after);
    (!symbol.is_empty()).then_some(symbol)
}

/// Scan `s` outside quoted text and escapes, returning the byte offsets of `needle`.
pub(crate) fn positions_outside_quotes(s: &str, needle: char) -> Vec<usize> {
    let mut in_quotes = false;
    let mut escape = false;
    let mut positions = Vec::new();
    for (idx, ch) in s.char_indices() {
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
        match ch {
            '"' => in_quotes = true,
            '\\' => escape = true,
            _ if ch == needle => positions.push(idx),
            _ => {}
        }
    }
    positions
}
