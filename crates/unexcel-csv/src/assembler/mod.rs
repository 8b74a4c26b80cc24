//! Row reconstruction shared by both event models.

mod record;
mod rows;

use std::mem;

use unexcel_format::{DateSystem, NumericCellRenderer};

use crate::address::split_reference;
use crate::buffer::{LineSeparator, StreamingCsvBuffer};
use crate::error::ConvertError;
use crate::event::{CellValue, ColumnSpec, ExpectedKind, NumberFormat, UnsupportedKind};
use crate::output::SheetOutputs;
use crate::{ConversionSummary, ConvertOptions, SheetSummary};

pub use record::RecordAssembler;
pub use rows::RowAssembler;

/// Placeholder for cell kinds that are recognized but not decoded.
pub(crate) const UNSUPPORTED_PLACEHOLDER: &str = "(TODO)";
/// Shown for shared-string cells when the workbook has no shared-string table.
pub(crate) const NO_SHARED_STRINGS: &str = "(No SST Record, can't identify string)";

struct OpenSheet<W: std::io::Write> {
    name: String,
    buffer: StreamingCsvBuffer<W>,
}

/// Sheet lifecycle, cell rendering and row output.
pub(crate) struct SheetCore<O: SheetOutputs> {
    outputs: O,
    min_columns: Option<u32>,
    line_separator: LineSeparator,
    renderer: NumericCellRenderer,
    shared_strings: Option<Vec<String>>,
    sheet: Option<OpenSheet<O::Sink>>,
    summary: ConversionSummary,
}

impl<O: SheetOutputs> SheetCore<O> {
    pub(crate) fn new(outputs: O, options: ConvertOptions) -> Self {
        Self {
            outputs,
            min_columns: options.min_columns,
            line_separator: options.line_separator,
            renderer: NumericCellRenderer::new(options.format),
            shared_strings: None,
            sheet: None,
            summary: ConversionSummary::default(),
        }
    }

    pub(crate) fn outputs(&self) -> &O {
        &self.outputs
    }

    pub(crate) fn set_date_system(&mut self, date_system: DateSystem) {
        self.renderer.set_date_system(date_system);
    }

    pub(crate) fn set_shared_strings(&mut self, strings: Vec<String>) {
        self.shared_strings = Some(strings);
    }

    pub(crate) fn in_sheet(&self) -> bool {
        self.sheet.is_some()
    }

    pub(crate) fn sheet_name(&self) -> &str {
        self.sheet.as_ref().map_or("", |sheet| sheet.name.as_str())
    }

    /// Finish the open sheet (if any) and open a sink for `name`.
    pub(crate) fn start_sheet(&mut self, name: &str) -> Result<(), ConvertError> {
        self.finish_sheet()?;

        let sink = self.outputs.open_sink(name).map_err(ConvertError::io(name))?;
        log::debug!("sheet `{name}` started");
        self.sheet = Some(OpenSheet {
            name: name.to_string(),
            buffer: StreamingCsvBuffer::with_line_separator(sink, self.line_separator),
        });
        Ok(())
    }

    /// Close the open sheet's sink, discarding it when nothing was added.
    pub(crate) fn finish_sheet(&mut self) -> Result<(), ConvertError> {
        let Some(OpenSheet { name, buffer }) = self.sheet.take() else {
            return Ok(());
        };

        let has_data = buffer.has_data();
        let rows = buffer.rows_written() + u64::from(buffer.has_pending_row());
        let sink = buffer.finish().map_err(ConvertError::io(&name))?;
        self.outputs
            .close_sink(sink)
            .map_err(ConvertError::io(&name))?;

        if has_data {
            log::debug!("sheet `{name}` finished with {rows} rows");
        } else {
            self.outputs
                .discard_last_sink()
                .map_err(ConvertError::io(&name))?;
            log::debug!("sheet `{name}` has no data; output discarded");
        }

        self.summary.sheets.push(SheetSummary {
            name,
            kept: has_data,
            rows,
        });
        Ok(())
    }

    pub(crate) fn finish(&mut self) -> Result<ConversionSummary, ConvertError> {
        self.finish_sheet()?;
        Ok(mem::take(&mut self.summary))
    }

    fn open_sheet(&mut self, row: u32) -> Result<&mut OpenSheet<O::Sink>, ConvertError> {
        self.sheet
            .as_mut()
            .ok_or(ConvertError::CellOutsideSheet { row })
    }

    pub(crate) fn set_max_column_count(&mut self, count: u32) {
        if let Some(sheet) = self.sheet.as_mut() {
            sheet.buffer.set_max_column_count(count);
        }
    }

    pub(crate) fn has_pending_row(&self) -> bool {
        self.sheet
            .as_ref()
            .is_some_and(|sheet| sheet.buffer.has_pending_row())
    }

    /// Column a cell lands in. References without letters, and [`ColumnSpec::Next`], continue
    /// after the last emitted column.
    pub(crate) fn resolve_column(&self, row: u32, column: &ColumnSpec) -> Result<u32, ConvertError> {
        let sheet = self
            .sheet
            .as_ref()
            .ok_or(ConvertError::CellOutsideSheet { row })?;
        let next = sheet.buffer.last_column().map_or(0, |last| last + 1);

        match column {
            ColumnSpec::Index(index) => Ok(*index),
            ColumnSpec::Next => Ok(next),
            ColumnSpec::Reference(reference) => match split_reference(reference) {
                Ok((Some(index), _)) => Ok(index),
                Ok((None, _)) => Ok(next),
                Err(source) => Err(ConvertError::InvalidReference {
                    sheet: sheet.name.clone(),
                    row,
                    reference: reference.clone(),
                    source,
                }),
            },
        }
    }

    /// Render `value` and add it at `column`, filling any gap before it.
    pub(crate) fn add_cell(
        &mut self,
        row: u32,
        column: u32,
        value: &CellValue,
        format: Option<&NumberFormat>,
    ) -> Result<(), ConvertError> {
        if !self.in_sheet() {
            return Err(ConvertError::CellOutsideSheet { row });
        }
        let text = self.render(row, column, value, format);

        let sheet = self.open_sheet(row)?;
        sheet
            .buffer
            .add_at(column, &text)
            .map_err(|last_column| ConvertError::ColumnRegression {
                sheet: sheet.name.clone(),
                row,
                column,
                last_column,
            })
    }

    /// Pad to the minimum column count and write the row.
    pub(crate) fn end_row(&mut self, row: u32) -> Result<(), ConvertError> {
        let min_columns = self.min_columns;
        let sheet = self.open_sheet(row)?;
        if let Some(min_columns) = min_columns {
            sheet.buffer.pad_to(min_columns);
        }
        sheet
            .buffer
            .new_line()
            .map_err(ConvertError::io(&sheet.name))
    }

    fn render(
        &mut self,
        row: u32,
        column: u32,
        value: &CellValue,
        format: Option<&NumberFormat>,
    ) -> String {
        match value {
            CellValue::Blank => String::new(),
            CellValue::Number(v) | CellValue::FormulaNumber(v) => match format {
                Some(format) => {
                    self.renderer
                        .render_format(*v, format.index, format.pattern.as_deref())
                }
                None => self.renderer.render_default(*v),
            },
            CellValue::Bool(true) => "TRUE".to_string(),
            CellValue::Bool(false) => "FALSE".to_string(),
            CellValue::Error(code) => format!("ERROR:{code}"),
            CellValue::InlineString(text)
            | CellValue::FormulaString(text)
            | CellValue::StringResult(text) => text.clone(),
            CellValue::SharedString(index) => {
                let text = match &self.shared_strings {
                    None => NO_SHARED_STRINGS.to_string(),
                    Some(strings) => match strings.get(*index as usize) {
                        Some(text) => return text.clone(),
                        None => format!("(Missing shared string #{index})"),
                    },
                };
                self.warn_diagnostic(row, column, &text);
                text
            }
            CellValue::Unsupported(kind) => {
                let kind = match kind {
                    UnsupportedKind::Note => "note",
                    UnsupportedKind::RkNumber => "RK number",
                };
                log::debug!(
                    "sheet `{}`: {kind} cell at row {}, column {} is not decoded",
                    self.sheet_name(),
                    row + 1,
                    column + 1
                );
                UNSUPPORTED_PLACEHOLDER.to_string()
            }
            CellValue::Malformed {
                expected,
                raw,
                reason,
            } => {
                let text = match expected {
                    ExpectedKind::SharedStringIndex => {
                        format!("Failed to parse SST index '{raw}': {reason}")
                    }
                    ExpectedKind::Number => format!("Failed to parse number '{raw}': {reason}"),
                };
                self.warn_diagnostic(row, column, &text);
                text
            }
        }
    }

    fn warn_diagnostic(&self, row: u32, column: u32, text: &str) {
        log::warn!(
            "sheet `{}` {}{}: {text}",
            self.sheet_name(),
            crate::address::index_to_column(column),
            row + 1
        );
    }
}

impl<O: SheetOutputs> Drop for SheetCore<O> {
    fn drop(&mut self) {
        // Conversion aborted: close whatever sheet is still open, keeping its partial output.
        let Some(OpenSheet { name, buffer }) = self.sheet.take() else {
            return;
        };
        let closed = buffer
            .finish()
            .and_then(|sink| self.outputs.close_sink(sink));
        if let Err(err) = closed {
            log::warn!("failed to close output of sheet `{name}`: {err}");
        }
    }
}
