use super::SheetCore;
use crate::address::split_reference;
use crate::error::ConvertError;
use crate::event::{CellEvent, RowEvent};
use crate::output::SheetOutputs;
use crate::{ConversionSummary, ConvertOptions};

/// Assembles CSV rows from the sheet-XML (row) event model.
///
/// Every row is numbered, so skipped rows (including leading ones) are written as blank lines.
pub struct RowAssembler<O: SheetOutputs> {
    core: SheetCore<O>,
    /// Last row written in the current sheet.
    last_row: Option<u32>,
    open_row: Option<u32>,
}

impl<O: SheetOutputs> RowAssembler<O> {
    pub fn new(outputs: O, options: ConvertOptions) -> Self {
        Self {
            core: SheetCore::new(outputs, options),
            last_row: None,
            open_row: None,
        }
    }

    pub fn outputs(&self) -> &O {
        self.core.outputs()
    }

    pub fn handle(&mut self, event: RowEvent) -> Result<(), ConvertError> {
        match event {
            RowEvent::DateSystem(date_system) => self.core.set_date_system(date_system),
            RowEvent::SharedStrings(strings) => self.core.set_shared_strings(strings),
            RowEvent::SheetStart { name } => {
                self.close_open_row()?;
                self.core.start_sheet(&name)?;
                self.last_row = None;
            }
            RowEvent::Dimension { reference } => self.dimension(&reference),
            RowEvent::RowStart { row } => self.start_row(row)?,
            RowEvent::Cell(cell) => self.cell(cell)?,
            RowEvent::RowEnd => {
                if self.open_row.is_none() {
                    log::debug!("sheet `{}`: row end without a row", self.core.sheet_name());
                }
                self.close_open_row()?;
            }
            RowEvent::SheetEnd => {
                self.close_open_row()?;
                self.core.finish_sheet()?;
            }
        }
        Ok(())
    }

    /// Finish the last sheet and report what was written.
    pub fn finish(mut self) -> Result<ConversionSummary, ConvertError> {
        self.close_open_row()?;
        self.core.finish()
    }

    /// `A1:NC536` declares the sheet width; a single-cell dimension says nothing about it.
    fn dimension(&mut self, reference: &str) {
        let Some((_, last)) = reference.split_once(':') else {
            return;
        };
        match split_reference(last) {
            Ok((Some(column), _)) => self.core.set_max_column_count(column + 1),
            Ok((None, _)) => {}
            Err(err) => log::warn!(
                "sheet `{}`: ignoring dimension `{reference}`: {err}",
                self.core.sheet_name()
            ),
        }
    }

    fn start_row(&mut self, row: u32) -> Result<(), ConvertError> {
        if !self.core.in_sheet() {
            return Err(ConvertError::CellOutsideSheet { row });
        }
        self.close_open_row()?;

        let next = match self.last_row {
            Some(last) if row < last => {
                return Err(ConvertError::RowRegression {
                    sheet: self.core.sheet_name().to_string(),
                    row,
                    last_row: last,
                });
            }
            Some(last) => last + 1,
            None => 0,
        };
        for blank in next..row {
            self.core.end_row(blank)?;
        }
        self.open_row = Some(row);
        Ok(())
    }

    fn cell(&mut self, cell: CellEvent) -> Result<(), ConvertError> {
        if !self.core.in_sheet() {
            return Err(ConvertError::CellOutsideSheet { row: cell.row });
        }
        if self.open_row != Some(cell.row) {
            return Err(ConvertError::CellOutsideRow {
                sheet: self.core.sheet_name().to_string(),
                row: cell.row,
            });
        }
        let column = self.core.resolve_column(cell.row, &cell.column)?;
        self.core
            .add_cell(cell.row, column, &cell.value, cell.format.as_ref())
    }

    fn close_open_row(&mut self) -> Result<(), ConvertError> {
        if let Some(row) = self.open_row.take() {
            self.core.end_row(row)?;
            self.last_row = Some(row);
        }
        Ok(())
    }
}
