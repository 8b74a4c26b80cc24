//! Replays a workbook decoded by `calamine` as converter events.
//!
//! `calamine` resolves shared strings and styles itself, so strings arrive inline and only date
//! cells carry a (synthesized) number format. The workbook's date system is read off its date
//! cells. Legacy `.xls` workbooks are replayed through the record model; every other format
//! through the row model.

use std::io::{Read, Seek};
use std::path::Path;

use calamine::{
    open_workbook_auto, Data, ExcelDateTime, ExcelDateTimeType, Range, Reader, Sheets,
};
use thiserror::Error;
use unexcel_csv::address::{MAX_COLUMNS, MAX_ROWS};
use unexcel_csv::{
    index_to_column, CellEvent, CellValue, ColumnSpec, ConversionSummary, ConvertError,
    ConvertOptions, DateSystem, NumberFormat, RecordAssembler, RecordEvent, RowAssembler,
    RowEvent, SheetOutputs,
};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open workbook: {0}")]
    Open(#[from] calamine::Error),
    #[error("failed to read sheet `{sheet}`: {source}")]
    Sheet {
        sheet: String,
        #[source]
        source: calamine::Error,
    },
    #[error(transparent)]
    Convert(#[from] ConvertError),
}

/// Which event model a workbook is replayed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventModel {
    Record,
    Row,
}

impl EventModel {
    pub fn for_path(path: &Path) -> Self {
        let is_xls = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xls"));
        if is_xls {
            EventModel::Record
        } else {
            EventModel::Row
        }
    }
}

/// Convert every sheet of the workbook at `path`, in workbook order.
pub fn convert_workbook<O: SheetOutputs>(
    path: &Path,
    outputs: O,
    options: ConvertOptions,
) -> Result<ConversionSummary, SourceError> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names = workbook.sheet_names();

    match EventModel::for_path(path) {
        EventModel::Record => {
            let mut assembler = RecordAssembler::new(outputs, options);
            for name in &sheet_names {
                let range = read_sheet(&mut workbook, name)?;
                replay_records(name, &range, |event| assembler.handle(event))?;
            }
            Ok(assembler.finish()?)
        }
        EventModel::Row => {
            let mut assembler = RowAssembler::new(outputs, options);
            for name in &sheet_names {
                let range = read_sheet(&mut workbook, name)?;
                replay_rows(name, &range, |event| assembler.handle(event))?;
            }
            Ok(assembler.finish()?)
        }
    }
}

/// Replay one sheet as binary-model records: every row up to the end of the used range is closed
/// with [`RecordEvent::LastCellOfRow`], and absent cells before a cell become
/// [`RecordEvent::MissingCell`].
pub fn replay_records(
    name: &str,
    range: &Range<Data>,
    mut emit: impl FnMut(RecordEvent) -> Result<(), ConvertError>,
) -> Result<(), ConvertError> {
    if let Some(date_system) = date_system(range) {
        emit(RecordEvent::DateSystem(date_system))?;
    }
    emit(RecordEvent::SheetStart {
        name: name.to_string(),
    })?;
    let (Some(start), Some(end)) = (range.start(), range.end()) else {
        return Ok(());
    };
    emit(RecordEvent::Dimensions {
        column_count: end.1 + 1,
    })?;

    let mut next_row = 0u32;
    let mut next_column = 0u32;
    for (row, col, data) in range.used_cells() {
        let Some((row, column)) = absolute(name, start, row, col) else {
            continue;
        };
        let Some((value, format)) = convert_value(data) else {
            continue;
        };

        while next_row < row {
            emit(RecordEvent::LastCellOfRow { row: next_row })?;
            next_row += 1;
            next_column = 0;
        }
        for missing in next_column..column {
            emit(RecordEvent::MissingCell {
                row,
                column: missing,
            })?;
        }
        emit(RecordEvent::Cell(CellEvent {
            row,
            column: ColumnSpec::Index(column),
            value,
            format,
        }))?;
        next_column = column + 1;
    }

    while next_row <= end.0 {
        emit(RecordEvent::LastCellOfRow { row: next_row })?;
        next_row += 1;
    }
    Ok(())
}

/// Replay one sheet as sheet-XML rows, with A1 cell references.
pub fn replay_rows(
    name: &str,
    range: &Range<Data>,
    mut emit: impl FnMut(RowEvent) -> Result<(), ConvertError>,
) -> Result<(), ConvertError> {
    if let Some(date_system) = date_system(range) {
        emit(RowEvent::DateSystem(date_system))?;
    }
    emit(RowEvent::SheetStart {
        name: name.to_string(),
    })?;

    if let (Some(start), Some(end)) = (range.start(), range.end()) {
        emit(RowEvent::Dimension {
            reference: format!(
                "{}{}:{}{}",
                index_to_column(start.1),
                start.0 + 1,
                index_to_column(end.1),
                end.0 + 1
            ),
        })?;

        let mut open_row = None;
        for (row, col, data) in range.used_cells() {
            let Some((row, column)) = absolute(name, start, row, col) else {
                continue;
            };
            let Some((value, format)) = convert_value(data) else {
                continue;
            };

            if open_row != Some(row) {
                if open_row.is_some() {
                    emit(RowEvent::RowEnd)?;
                }
                emit(RowEvent::RowStart { row })?;
                open_row = Some(row);
            }
            emit(RowEvent::Cell(CellEvent {
                row,
                column: ColumnSpec::Reference(format!("{}{}", index_to_column(column), row + 1)),
                value,
                format,
            }))?;
        }
        if open_row.is_some() {
            emit(RowEvent::RowEnd)?;
        }
    }

    emit(RowEvent::SheetEnd)
}

fn read_sheet<RS: Read + Seek>(
    workbook: &mut Sheets<RS>,
    name: &str,
) -> Result<Range<Data>, SourceError> {
    workbook
        .worksheet_range(name)
        .map_err(|source| SourceError::Sheet {
            sheet: name.to_string(),
            source,
        })
}

fn absolute(sheet: &str, start: (u32, u32), row: usize, col: usize) -> Option<(u32, u32)> {
    // `used_cells` coordinates are relative to `range.start()`.
    let position = u32::try_from(row)
        .ok()
        .zip(u32::try_from(col).ok())
        .and_then(|(row, col)| Some((start.0.checked_add(row)?, start.1.checked_add(col)?)))
        .filter(|(row, col)| *row < MAX_ROWS && *col < MAX_COLUMNS);
    if position.is_none() {
        log::warn!("skipping out-of-bounds cell in sheet `{sheet}` at ({row},{col})");
    }
    position
}

/// Date system of the workbook a sheet came from, known once the sheet holds a date cell.
///
/// `ExcelDateTime` keeps its epoch private but compares it, so a value is checked against its
/// 1900-epoch twin.
pub fn date_system(range: &Range<Data>) -> Option<DateSystem> {
    range.used_cells().find_map(|(_, _, data)| match data {
        Data::DateTime(v) => Some(if is_1904(v) {
            DateSystem::Excel1904
        } else {
            DateSystem::Excel1900
        }),
        _ => None,
    })
}

fn is_1904(value: &ExcelDateTime) -> bool {
    let kind = if value.is_duration() {
        ExcelDateTimeType::TimeDelta
    } else {
        ExcelDateTimeType::DateTime
    };
    *value != ExcelDateTime::new(value.as_f64(), kind, false)
}

/// Built-in format for a date cell: dates, times of day and date-times use the formats Excel
/// assigns to typed-in values; durations use the elapsed-hours format.
pub fn date_format_for(serial: f64, is_duration: bool) -> NumberFormat {
    let index = if is_duration {
        46
    } else if serial.fract() == 0.0 {
        14
    } else if serial < 1.0 {
        21
    } else {
        22
    };
    NumberFormat::builtin(index)
}

pub fn convert_value(value: &Data) -> Option<(CellValue, Option<NumberFormat>)> {
    let converted = match value {
        Data::Empty => return None,
        Data::Bool(v) => (CellValue::Bool(*v), None),
        Data::Int(v) => (CellValue::Number(*v as f64), None),
        Data::Float(v) => (CellValue::Number(*v), None),
        Data::String(v) => (CellValue::InlineString(v.clone()), None),
        Data::Error(e) => (CellValue::Error(e.to_string()), None),
        Data::DateTime(v) => {
            let serial = v.as_f64();
            (
                CellValue::Number(serial),
                Some(date_format_for(serial, v.is_duration())),
            )
        }
        Data::DateTimeIso(v) | Data::DurationIso(v) => (CellValue::InlineString(v.clone()), None),
    };
    Some(converted)
}
