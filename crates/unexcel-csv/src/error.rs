use std::io;

use thiserror::Error;

use crate::address::ReferenceError;

/// Fatal conversion errors. Rows and columns are reported 1-based.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("sheet `{sheet}`: row {} arrived after row {}", .row + 1, .last_row + 1)]
    RowRegression {
        sheet: String,
        row: u32,
        last_row: u32,
    },
    #[error(
        "sheet `{sheet}` row {}: column {} does not come after column {}",
        .row + 1,
        column_name(.column),
        column_name(.last_column)
    )]
    ColumnRegression {
        sheet: String,
        row: u32,
        column: u32,
        last_column: u32,
    },
    #[error("cell in row {} arrived before any sheet started", .row + 1)]
    CellOutsideSheet { row: u32 },
    #[error("sheet `{sheet}`: cell in row {} is outside the open row", .row + 1)]
    CellOutsideRow { sheet: String, row: u32 },
    #[error("sheet `{sheet}` row {}: invalid cell reference `{reference}`", .row + 1)]
    InvalidReference {
        sheet: String,
        row: u32,
        reference: String,
        #[source]
        source: ReferenceError,
    },
    #[error("sheet `{sheet}`: {source}")]
    Io {
        sheet: String,
        #[source]
        source: io::Error,
    },
}

fn column_name(column: &u32) -> String {
    crate::address::index_to_column(*column)
}

impl ConvertError {
    pub(crate) fn io(sheet: &str) -> impl FnOnce(io::Error) -> ConvertError + '_ {
        move |source| ConvertError::Io {
            sheet: sheet.to_string(),
            source,
        }
    }
}
