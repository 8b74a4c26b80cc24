//! Spreadsheet-to-CSV conversion core.
//!
//! An upstream workbook reader pushes cell and structural events into one of two assemblers:
//! [`RecordAssembler`] for binary readers that send synthetic missing-cell and end-of-row
//! markers, and [`RowAssembler`] for sheet-XML readers that number rows explicitly. Both render
//! cells with [`unexcel_format::NumericCellRenderer`], rebuild gapped rows in a
//! [`StreamingCsvBuffer`], and write one CSV per sheet through a [`SheetOutputs`]
//! implementation. Sheets without data are discarded.

pub mod address;
pub mod event;

mod assembler;
mod buffer;
mod error;
mod output;

use serde::Serialize;

pub use crate::address::{column_to_index, index_to_column, split_reference, ReferenceError};
pub use crate::assembler::{RecordAssembler, RowAssembler};
pub use crate::buffer::{LineSeparator, StreamingCsvBuffer};
pub use crate::error::ConvertError;
pub use crate::event::{
    CellEvent, CellValue, ColumnSpec, ExpectedKind, NumberFormat, RecordEvent, RowEvent,
    UnsupportedKind,
};
pub use crate::output::{
    sanitize_sheet_name, DirectoryOutputs, MemoryOutputs, MemorySheet, SheetOutputs,
};
pub use unexcel_format::{DateSystem, FormatOptions};

/// Options for one conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Pad every row to at least this many fields.
    pub min_columns: Option<u32>,
    pub format: FormatOptions,
    pub line_separator: LineSeparator,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            min_columns: None,
            format: FormatOptions::default(),
            line_separator: LineSeparator::platform(),
        }
    }
}

/// Outcome of one sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetSummary {
    pub name: String,
    /// False when the sheet had no data and its output was discarded.
    pub kept: bool,
    pub rows: u64,
}

/// Outcome of a conversion run, in sheet order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    pub sheets: Vec<SheetSummary>,
}

impl ConversionSummary {
    pub fn kept_sheets(&self) -> impl Iterator<Item = &SheetSummary> {
        self.sheets.iter().filter(|sheet| sheet.kept)
    }
}
