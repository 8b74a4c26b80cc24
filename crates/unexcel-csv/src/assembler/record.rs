use super::SheetCore;
use crate::error::ConvertError;
use crate::event::{CellEvent, CellValue, RecordEvent};
use crate::output::SheetOutputs;
use crate::{ConversionSummary, ConvertOptions};

/// Assembles CSV rows from the binary (record) event model.
///
/// Rows end only at [`RecordEvent::LastCellOfRow`] and absent cells arrive as
/// [`RecordEvent::MissingCell`]; row numbers are never used to infer blank rows.
///
/// ```
/// use unexcel_csv::{CellEvent, CellValue, ColumnSpec, MemoryOutputs, RecordAssembler, RecordEvent};
///
/// let mut outputs = MemoryOutputs::new();
/// let mut assembler = RecordAssembler::new(&mut outputs, Default::default());
/// assembler.handle(RecordEvent::SheetStart { name: "Sheet1".into() })?;
/// assembler.handle(RecordEvent::Cell(CellEvent::new(
///     0,
///     ColumnSpec::Index(0),
///     CellValue::InlineString("a".into()),
/// )))?;
/// assembler.handle(RecordEvent::LastCellOfRow { row: 0 })?;
/// assembler.finish()?;
///
/// assert_eq!(outputs.sheets()[0].text().trim_end(), "\"a\"");
/// # Ok::<(), unexcel_csv::ConvertError>(())
/// ```
pub struct RecordAssembler<O: SheetOutputs> {
    core: SheetCore<O>,
    current_row: Option<u32>,
    /// Position of a formula whose text result follows in a string record.
    pending_string: Option<(u32, u32)>,
}

impl<O: SheetOutputs> RecordAssembler<O> {
    pub fn new(outputs: O, options: ConvertOptions) -> Self {
        Self {
            core: SheetCore::new(outputs, options),
            current_row: None,
            pending_string: None,
        }
    }

    pub fn outputs(&self) -> &O {
        self.core.outputs()
    }

    pub fn handle(&mut self, event: RecordEvent) -> Result<(), ConvertError> {
        match event {
            RecordEvent::DateSystem(date_system) => self.core.set_date_system(date_system),
            RecordEvent::SharedStrings(strings) => self.core.set_shared_strings(strings),
            RecordEvent::SheetStart { name } => {
                self.drop_pending_string();
                self.current_row = None;
                self.core.start_sheet(&name)?;
            }
            RecordEvent::Dimensions { column_count } => self.core.set_max_column_count(column_count),
            RecordEvent::Cell(cell) => {
                self.drop_pending_string();
                self.cell(cell)?;
            }
            RecordEvent::MissingCell { row, column } => {
                self.drop_pending_string();
                self.enter_row(row)?;
                self.core.add_cell(row, column, &CellValue::Blank, None)?;
            }
            RecordEvent::LastCellOfRow { row } => {
                self.drop_pending_string();
                self.enter_row(row)?;
                self.core.end_row(row)?;
            }
            RecordEvent::StringResult(text) => match self.pending_string.take() {
                Some((row, column)) => {
                    self.core
                        .add_cell(row, column, &CellValue::StringResult(text), None)?;
                }
                None => log::debug!("string record without a pending formula ignored"),
            },
        }
        Ok(())
    }

    /// Finish the last sheet and report what was written.
    pub fn finish(mut self) -> Result<ConversionSummary, ConvertError> {
        self.drop_pending_string();
        self.core.finish()
    }

    fn cell(&mut self, cell: CellEvent) -> Result<(), ConvertError> {
        let CellEvent {
            row,
            column,
            value,
            format,
        } = cell;
        self.enter_row(row)?;
        let column = self.core.resolve_column(row, &column)?;

        if matches!(value, CellValue::FormulaNumber(v) if v.is_nan()) {
            self.pending_string = Some((row, column));
            return Ok(());
        }
        self.core.add_cell(row, column, &value, format.as_ref())
    }

    fn enter_row(&mut self, row: u32) -> Result<(), ConvertError> {
        if !self.core.in_sheet() {
            return Err(ConvertError::CellOutsideSheet { row });
        }
        if let Some(current) = self.current_row {
            if row < current {
                return Err(ConvertError::RowRegression {
                    sheet: self.core.sheet_name().to_string(),
                    row,
                    last_row: current,
                });
            }
            if row > current && self.core.has_pending_row() {
                // The reader skipped the end-of-row marker; close the row rather than merging it.
                log::debug!(
                    "sheet `{}`: row {} ended without an end-of-row marker",
                    self.core.sheet_name(),
                    current + 1
                );
                self.core.end_row(current)?;
            }
        }
        self.current_row = Some(row);
        Ok(())
    }

    fn drop_pending_string(&mut self) {
        if let Some((row, column)) = self.pending_string.take() {
            log::debug!(
                "sheet `{}`: formula text at row {}, column {} never arrived; dropped",
                self.core.sheet_name(),
                row + 1,
                column + 1
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::LineSeparator;
    use crate::event::{ColumnSpec, NumberFormat, UnsupportedKind};
    use crate::output::MemoryOutputs;
    use pretty_assertions::assert_eq;

    fn options() -> ConvertOptions {
        ConvertOptions {
            line_separator: LineSeparator::Lf,
            ..ConvertOptions::default()
        }
    }

    fn cell(row: u32, column: u32, value: CellValue) -> RecordEvent {
        RecordEvent::Cell(CellEvent::new(row, ColumnSpec::Index(column), value))
    }

    fn run(events: Vec<RecordEvent>) -> (MemoryOutputs, ConversionSummary) {
        let mut outputs = MemoryOutputs::new();
        let mut assembler = RecordAssembler::new(&mut outputs, options());
        for event in events {
            assembler.handle(event).unwrap();
        }
        let summary = assembler.finish().unwrap();
        (outputs, summary)
    }

    #[test]
    fn missing_cells_and_dimensions_shape_rows() {
        let (outputs, _) = run(vec![
            RecordEvent::SheetStart { name: "S".into() },
            RecordEvent::Dimensions { column_count: 4 },
            RecordEvent::MissingCell { row: 0, column: 0 },
            cell(0, 1, CellValue::Bool(true)),
            RecordEvent::LastCellOfRow { row: 0 },
            cell(1, 0, CellValue::Error("#DIV/0!".into())),
            RecordEvent::LastCellOfRow { row: 1 },
        ]);
        assert_eq!(
            outputs.sheets()[0].text(),
            "\"\",\"TRUE\",\"\",\"\"\n\"ERROR:#DIV/0!\",\"\",\"\",\"\"\n"
        );
    }

    #[test]
    fn formula_text_is_written_at_the_formula_cell() {
        let (outputs, _) = run(vec![
            RecordEvent::SheetStart { name: "S".into() },
            cell(0, 0, CellValue::Number(1.0)),
            cell(0, 1, CellValue::FormulaNumber(f64::NAN)),
            RecordEvent::StringResult("total".into()),
            cell(0, 2, CellValue::Number(2.0)),
            RecordEvent::LastCellOfRow { row: 0 },
        ]);
        assert_eq!(outputs.sheets()[0].text(), "\"1\",\"total\",\"2\"\n");
    }

    #[test]
    fn interrupted_formula_text_is_dropped() {
        let (outputs, _) = run(vec![
            RecordEvent::SheetStart { name: "S".into() },
            cell(0, 0, CellValue::FormulaNumber(f64::NAN)),
            cell(0, 1, CellValue::Number(2.0)),
            RecordEvent::StringResult("late".into()),
            RecordEvent::LastCellOfRow { row: 0 },
        ]);
        assert_eq!(outputs.sheets()[0].text(), "\"\",\"2\"\n");
    }

    #[test]
    fn formula_text_is_dropped_at_the_end_of_its_row() {
        let (outputs, _) = run(vec![
            RecordEvent::SheetStart { name: "S".into() },
            cell(0, 0, CellValue::Number(1.0)),
            cell(0, 1, CellValue::FormulaNumber(f64::NAN)),
            RecordEvent::LastCellOfRow { row: 0 },
            RecordEvent::StringResult("late".into()),
            cell(1, 0, CellValue::Number(2.0)),
            RecordEvent::LastCellOfRow { row: 1 },
        ]);
        assert_eq!(outputs.sheets()[0].text(), "\"1\"\n\"2\"\n");
    }

    #[test]
    fn formula_text_does_not_cross_sheets() {
        let (outputs, summary) = run(vec![
            RecordEvent::SheetStart { name: "First".into() },
            cell(0, 0, CellValue::FormulaNumber(f64::NAN)),
            RecordEvent::SheetStart { name: "Second".into() },
            RecordEvent::StringResult("late".into()),
            cell(0, 0, CellValue::InlineString("x".into())),
            RecordEvent::LastCellOfRow { row: 0 },
        ]);
        assert_eq!(outputs.sheets().len(), 1);
        assert_eq!(outputs.sheet("Second").unwrap().text(), "\"x\"\n");
        assert_eq!(
            summary.sheets.iter().map(|s| (s.name.as_str(), s.kept)).collect::<Vec<_>>(),
            vec![("First", false), ("Second", true)]
        );
    }

    #[test]
    fn pending_formula_text_is_dropped_at_finish() {
        let (outputs, _) = run(vec![
            RecordEvent::SheetStart { name: "S".into() },
            cell(0, 0, CellValue::Number(2.0)),
            cell(0, 1, CellValue::FormulaNumber(f64::NAN)),
        ]);
        assert_eq!(outputs.sheets()[0].text(), "\"2\"\n");
    }

    #[test]
    fn shared_strings_and_placeholders() {
        let (outputs, _) = run(vec![
            RecordEvent::SheetStart { name: "Before".into() },
            cell(0, 0, CellValue::SharedString(0)),
            RecordEvent::LastCellOfRow { row: 0 },
            RecordEvent::SharedStrings(vec!["zero".into()]),
            RecordEvent::SheetStart { name: "After".into() },
            cell(0, 0, CellValue::SharedString(0)),
            cell(0, 1, CellValue::SharedString(7)),
            cell(0, 2, CellValue::Unsupported(UnsupportedKind::Note)),
            RecordEvent::LastCellOfRow { row: 0 },
        ]);
        assert_eq!(
            outputs.sheet("Before").unwrap().text(),
            "\"(No SST Record, can't identify string)\"\n"
        );
        assert_eq!(
            outputs.sheet("After").unwrap().text(),
            "\"zero\",\"(Missing shared string #7)\",\"(TODO)\"\n"
        );
    }

    #[test]
    fn date_system_applies_to_formatted_cells() {
        let (outputs, _) = run(vec![
            RecordEvent::DateSystem(unexcel_format::DateSystem::Excel1904),
            RecordEvent::SheetStart { name: "S".into() },
            RecordEvent::Cell(
                CellEvent::new(0, ColumnSpec::Index(0), CellValue::Number(0.0))
                    .with_format(NumberFormat::builtin(14)),
            ),
            RecordEvent::LastCellOfRow { row: 0 },
        ]);
        assert_eq!(outputs.sheets()[0].text(), "\"1904-01-01\"\n");
    }

    #[test]
    fn row_regression_names_the_sheet() {
        let mut outputs = MemoryOutputs::new();
        let mut assembler = RecordAssembler::new(&mut outputs, options());
        assembler
            .handle(RecordEvent::SheetStart { name: "Data".into() })
            .unwrap();
        assembler.handle(cell(5, 0, CellValue::Number(1.0))).unwrap();
        let err = assembler
            .handle(cell(4, 0, CellValue::Number(1.0)))
            .unwrap_err();
        assert!(matches!(err, ConvertError::RowRegression { row: 4, last_row: 5, .. }));
        assert_eq!(err.to_string(), "sheet `Data`: row 5 arrived after row 6");
    }

    #[test]
    fn cells_before_a_sheet_are_rejected() {
        let mut assembler = RecordAssembler::new(MemoryOutputs::new(), options());
        let err = assembler
            .handle(cell(0, 0, CellValue::Number(1.0)))
            .unwrap_err();
        assert!(matches!(err, ConvertError::CellOutsideSheet { row: 0 }));
    }

    #[test]
    fn empty_sheets_are_discarded_and_summarized() {
        let (outputs, summary) = run(vec![
            RecordEvent::SheetStart { name: "Empty".into() },
            RecordEvent::Dimensions { column_count: 3 },
            RecordEvent::SheetStart { name: "Full".into() },
            cell(0, 0, CellValue::InlineString("x".into())),
            RecordEvent::LastCellOfRow { row: 0 },
        ]);
        assert_eq!(outputs.sheets().len(), 1);
        assert_eq!(outputs.sheets()[0].name, "Full");
        assert_eq!(
            summary.sheets.iter().map(|s| (s.name.as_str(), s.kept)).collect::<Vec<_>>(),
            vec![("Empty", false), ("Full", true)]
        );
    }
}
