//! Cell and structural events produced by an upstream workbook reader.
//!
//! Two event models exist because the two families of workbook readers signal missing data
//! differently: binary (BIFF) readers send synthetic [`RecordEvent::MissingCell`] and
//! [`RecordEvent::LastCellOfRow`] markers, while sheet-XML readers number every row explicitly
//! ([`RowEvent::RowStart`]) and leave gaps implicit.

use unexcel_format::DateSystem;

/// Display format attached to a cell by its style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat {
    /// Format index; values below 164 are built-in formats.
    pub index: u16,
    /// The format code, if the workbook spells it out.
    pub pattern: Option<String>,
}

impl NumberFormat {
    pub fn new(index: u16, pattern: impl Into<String>) -> Self {
        Self {
            index,
            pattern: Some(pattern.into()),
        }
    }

    /// A built-in format referenced by index only.
    pub fn builtin(index: u16) -> Self {
        Self {
            index,
            pattern: None,
        }
    }
}

/// How the column of a cell is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSpec {
    /// 0-based column index.
    Index(u32),
    /// A1-style cell reference (`C12`). A reference without letters continues from the previous
    /// column.
    Reference(String),
    /// The column after the previously emitted one (or the first column).
    Next,
}

/// Cell kinds the converter recognizes but does not decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedKind {
    /// Cell comment attached through an object record.
    Note,
    /// Compressed (RK-encoded) number the reader did not expand.
    RkNumber,
}

/// Lexical kind a [`CellValue::Malformed`] value was expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedKind {
    SharedStringIndex,
    Number,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Blank,
    Number(f64),
    Bool(bool),
    /// Error code such as `#DIV/0!`.
    Error(String),
    InlineString(String),
    /// Index into the workbook's shared-string table.
    SharedString(u32),
    /// Cached text result of a formula.
    FormulaString(String),
    /// Cached numeric result of a formula. `NaN` in the binary model means the text result follows
    /// in a separate string record.
    FormulaNumber(f64),
    /// Text result of the most recent formula cell (binary model).
    StringResult(String),
    Unsupported(UnsupportedKind),
    /// A value whose text could not be decoded as `expected`.
    Malformed {
        expected: ExpectedKind,
        raw: String,
        reason: String,
    },
}

impl CellValue {
    /// Map a sheet-XML cell type attribute (`t`) and its value text to a cell value.
    ///
    /// A missing type means a number. Booleans are `0`/`1`; anything not starting with `0` is
    /// true.
    pub fn from_sheet_xml(type_attr: Option<&str>, text: &str) -> CellValue {
        match type_attr {
            Some("b") => CellValue::Bool(!text.starts_with('0')),
            Some("e") => CellValue::Error(text.to_string()),
            Some("inlineStr") => CellValue::InlineString(text.to_string()),
            Some("str") => CellValue::FormulaString(text.to_string()),
            Some("s") => match text.trim().parse::<u32>() {
                Ok(index) => CellValue::SharedString(index),
                Err(err) => CellValue::Malformed {
                    expected: ExpectedKind::SharedStringIndex,
                    raw: text.to_string(),
                    reason: err.to_string(),
                },
            },
            // `n`, `d` (ISO date text is not decoded) and absent types are numbers.
            _ => {
                if text.is_empty() {
                    return CellValue::Blank;
                }
                match text.trim().parse::<f64>() {
                    Ok(value) => CellValue::Number(value),
                    Err(err) => CellValue::Malformed {
                        expected: ExpectedKind::Number,
                        raw: text.to_string(),
                        reason: err.to_string(),
                    },
                }
            }
        }
    }
}

/// One cell of a sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct CellEvent {
    /// 0-based row.
    pub row: u32,
    pub column: ColumnSpec,
    pub value: CellValue,
    pub format: Option<NumberFormat>,
}

impl CellEvent {
    pub fn new(row: u32, column: ColumnSpec, value: CellValue) -> Self {
        Self {
            row,
            column,
            value,
            format: None,
        }
    }

    pub fn with_format(mut self, format: NumberFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// Events of the binary (record) model.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEvent {
    /// Workbook epoch; sent before the first sheet.
    DateSystem(DateSystem),
    /// Workbook shared-string table; sent before the first sheet.
    SharedStrings(Vec<String>),
    SheetStart { name: String },
    /// Declared sheet width; every row is padded to at least this many fields.
    Dimensions { column_count: u32 },
    Cell(CellEvent),
    /// Placeholder for an absent cell before the last cell of a row.
    MissingCell { row: u32, column: u32 },
    LastCellOfRow { row: u32 },
    /// Text result of the preceding formula cell.
    StringResult(String),
}

/// Events of the sheet-XML (row) model.
#[derive(Debug, Clone, PartialEq)]
pub enum RowEvent {
    DateSystem(DateSystem),
    SharedStrings(Vec<String>),
    SheetStart { name: String },
    /// The `<dimension ref="A1:C10">` of a sheet.
    Dimension { reference: String },
    /// 0-based row number of the `<row>` element.
    RowStart { row: u32 },
    Cell(CellEvent),
    RowEnd,
    SheetEnd,
}
