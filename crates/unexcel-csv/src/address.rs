use core::fmt;

/// Number of columns in a worksheet (`A` through `XFD`).
pub const MAX_COLUMNS: u32 = 16_384;
/// Number of rows in a worksheet.
pub const MAX_ROWS: u32 = 1_048_576;

/// Errors that can occur when parsing column letters or A1 cell references.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReferenceError {
    Empty,
    InvalidColumn,
    InvalidRow,
    TrailingCharacters,
}

impl fmt::Display for ReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ReferenceError::Empty => "empty cell reference",
            ReferenceError::InvalidColumn => "invalid column in cell reference",
            ReferenceError::InvalidRow => "invalid row in cell reference",
            ReferenceError::TrailingCharacters => "trailing characters in cell reference",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ReferenceError {}

/// Convert column letters (`A`, `bc`, `XFD`) to a 0-based column index.
pub fn column_to_index(letters: &str) -> Result<u32, ReferenceError> {
    if letters.is_empty() {
        return Err(ReferenceError::Empty);
    }

    let mut acc: i64 = -1;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return Err(ReferenceError::InvalidColumn);
        }
        acc = (acc + 1) * 26 + i64::from(b.to_ascii_uppercase() - b'A');
        if acc >= i64::from(MAX_COLUMNS) {
            return Err(ReferenceError::InvalidColumn);
        }
    }
    u32::try_from(acc).map_err(|_| ReferenceError::InvalidColumn)
}

/// Convert a 0-based column index to its letters (`0` -> `A`, `26` -> `AA`).
pub fn index_to_column(index: u32) -> String {
    let mut n = u64::from(index) + 1;
    let mut out = Vec::<u8>::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).expect("column letters are always valid UTF-8")
}

/// Split an A1-style reference (`B7`, `$AA$10`) into a 0-based column and a 0-based row.
///
/// Either half may be absent: some writers emit references without column letters (`237150`),
/// in which case the caller continues from the previous column.
pub fn split_reference(reference: &str) -> Result<(Option<u32>, Option<u32>), ReferenceError> {
    let s = reference.trim();
    let bytes = s.as_bytes();
    let mut idx = 0usize;

    if bytes.get(idx) == Some(&b'$') {
        idx += 1;
    }
    let col_start = idx;
    while idx < bytes.len() && bytes[idx].is_ascii_alphabetic() {
        idx += 1;
    }
    let col_end = idx;

    if bytes.get(idx) == Some(&b'$') {
        idx += 1;
    }
    let row_start = idx;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    let row_end = idx;

    if idx != bytes.len() {
        return Err(ReferenceError::TrailingCharacters);
    }
    if col_start == col_end && row_start == row_end {
        return Err(ReferenceError::Empty);
    }

    let column = if col_start == col_end {
        None
    } else {
        Some(column_to_index(&s[col_start..col_end])?)
    };

    let row = if row_start == row_end {
        None
    } else {
        let row_1_based: u32 = s[row_start..row_end]
            .parse()
            .map_err(|_| ReferenceError::InvalidRow)?;
        if row_1_based == 0 || row_1_based > MAX_ROWS {
            return Err(ReferenceError::InvalidRow);
        }
        Some(row_1_based - 1)
    };

    Ok((column, row))
}
