use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use unexcel_csv::{
    CellEvent, CellValue, ColumnSpec, ConvertOptions, DirectoryOutputs, LineSeparator,
    MemoryOutputs, NumberFormat, RecordAssembler, RecordEvent, RowAssembler, RowEvent,
    StreamingCsvBuffer,
};

fn options() -> ConvertOptions {
    ConvertOptions {
        line_separator: LineSeparator::Lf,
        ..ConvertOptions::default()
    }
}

fn read_records(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|record| record.unwrap().iter().map(str::to_string).collect())
        .collect()
}

/// One field written through a buffer, without its line separator.
fn write_field(text: &str) -> String {
    let mut buffer = StreamingCsvBuffer::with_line_separator(Vec::new(), LineSeparator::Lf);
    buffer.add(text);
    let line = String::from_utf8(buffer.finish().unwrap()).unwrap();
    line.strip_suffix('\n').unwrap().to_string()
}

/// Inverse of the field quoting: strip the quotes, then undo `""` and `\\`.
fn unquote(field: &str) -> String {
    let inner = &field[1..field.len() - 1];
    let mut out = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        let next = chars.peek().copied();
        match (ch, next) {
            ('"', Some('"')) | ('\\', Some('\\')) => {
                out.push(ch);
                chars.next();
            }
            _ => out.push(ch),
        }
    }
    out
}

#[test]
fn two_sheets_keep_data_and_drop_the_empty_one() {
    let dir = tempfile::tempdir().unwrap();
    let mut outputs = DirectoryOutputs::new(dir.path()).unwrap();
    let mut assembler = RecordAssembler::new(&mut outputs, options());

    let events = [
        RecordEvent::SheetStart {
            name: "Numbers".into(),
        },
        RecordEvent::Cell(
            CellEvent::new(0, ColumnSpec::Index(0), CellValue::Number(1234.5))
                .with_format(NumberFormat::new(1, "0")),
        ),
        RecordEvent::LastCellOfRow { row: 0 },
        RecordEvent::SheetStart {
            name: "Blank".into(),
        },
    ];
    for event in events {
        assembler.handle(event).unwrap();
    }
    let summary = assembler.finish().unwrap();

    assert_eq!(outputs.result_files(), &[dir.path().join("Numbers.csv")]);
    assert_eq!(
        fs::read_to_string(dir.path().join("Numbers.csv")).unwrap(),
        "\"1234.5\"\n"
    );
    assert!(!dir.path().join("Blank.csv").exists());
    assert_eq!(summary.kept_sheets().count(), 1);
}

#[test]
fn gap_between_columns_is_filled() {
    let mut outputs = MemoryOutputs::new();
    let mut assembler = RowAssembler::new(&mut outputs, options());
    for event in [
        RowEvent::SheetStart { name: "S".into() },
        RowEvent::RowStart { row: 0 },
        RowEvent::Cell(CellEvent::new(
            0,
            ColumnSpec::Index(0),
            CellValue::InlineString("first".into()),
        )),
        RowEvent::Cell(CellEvent::new(
            0,
            ColumnSpec::Index(3),
            CellValue::InlineString("fourth".into()),
        )),
        RowEvent::RowEnd,
    ] {
        assembler.handle(event).unwrap();
    }
    assembler.finish().unwrap();

    assert_eq!(
        outputs.sheets()[0].text(),
        "\"first\",\"\",\"\",\"fourth\"\n"
    );
}

#[test]
fn min_columns_pads_short_rows() {
    let dir = tempfile::tempdir().unwrap();
    let mut outputs = DirectoryOutputs::new(dir.path()).unwrap();
    let mut assembler = RowAssembler::new(
        &mut outputs,
        ConvertOptions {
            min_columns: Some(5),
            ..options()
        },
    );
    for event in [
        RowEvent::SheetStart { name: "S".into() },
        RowEvent::RowStart { row: 0 },
        RowEvent::Cell(CellEvent::new(0, ColumnSpec::Index(2), CellValue::Number(3.0))),
        RowEvent::RowEnd,
        RowEvent::RowStart { row: 2 },
        RowEvent::Cell(CellEvent::new(2, ColumnSpec::Index(0), CellValue::Bool(true))),
        RowEvent::RowEnd,
        RowEvent::SheetEnd,
    ] {
        assembler.handle(event).unwrap();
    }
    assembler.finish().unwrap();

    let records = read_records(&dir.path().join("S.csv"));
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|record| record.len() == 5));
    assert_eq!(records[0], vec!["", "", "3", "", ""]);
    assert_eq!(records[2][0], "TRUE");
}

#[test]
fn multi_line_text_stays_in_one_field() {
    let dir = tempfile::tempdir().unwrap();
    let mut outputs = DirectoryOutputs::new(dir.path()).unwrap();
    let mut assembler = RowAssembler::new(&mut outputs, options());
    for event in [
        RowEvent::SheetStart { name: "Notes".into() },
        RowEvent::RowStart { row: 0 },
        RowEvent::Cell(CellEvent::new(
            0,
            ColumnSpec::Next,
            CellValue::InlineString("line one\nline \"two\", end".into()),
        )),
        RowEvent::Cell(CellEvent::new(0, ColumnSpec::Next, CellValue::Number(7.0))),
        RowEvent::RowEnd,
    ] {
        assembler.handle(event).unwrap();
    }
    assembler.finish().unwrap();

    let records = read_records(&dir.path().join("Notes.csv"));
    assert_eq!(
        records,
        vec![vec!["line one\nline \"two\", end".to_string(), "7".to_string()]]
    );
}

#[test]
fn aborted_runs_keep_finished_sheets() {
    let dir = tempfile::tempdir().unwrap();
    let mut outputs = DirectoryOutputs::new(dir.path()).unwrap();
    {
        let mut assembler = RecordAssembler::new(&mut outputs, options());
        assembler
            .handle(RecordEvent::SheetStart { name: "One".into() })
            .unwrap();
        assembler
            .handle(RecordEvent::Cell(CellEvent::new(
                3,
                ColumnSpec::Index(0),
                CellValue::Number(1.0),
            )))
            .unwrap();
        assembler
            .handle(RecordEvent::LastCellOfRow { row: 3 })
            .unwrap();
        assembler
            .handle(RecordEvent::SheetStart { name: "Two".into() })
            .unwrap();
        assembler
            .handle(RecordEvent::Cell(CellEvent::new(
                1,
                ColumnSpec::Index(0),
                CellValue::Number(2.0),
            )))
            .unwrap();
        let err = assembler
            .handle(RecordEvent::Cell(CellEvent::new(
                0,
                ColumnSpec::Index(0),
                CellValue::Number(3.0),
            )))
            .unwrap_err();
        assert!(err.to_string().contains("sheet `Two`"));
    }

    assert_eq!(
        fs::read_to_string(dir.path().join("One.csv")).unwrap(),
        "\"1\"\n"
    );
    // The sheet that failed is closed with what it had.
    assert_eq!(
        fs::read_to_string(dir.path().join("Two.csv")).unwrap(),
        "\"2\"\n"
    );
}

proptest! {
    #[test]
    fn quoting_round_trips(text in any::<String>()) {
        prop_assert_eq!(unquote(&write_field(&text)), text);
    }

    #[test]
    fn rows_always_have_the_declared_width(columns in prop::collection::btree_set(0u32..40, 1..10)) {
        let max = *columns.iter().max().unwrap();
        let mut buffer = StreamingCsvBuffer::with_line_separator(Vec::new(), LineSeparator::Lf);
        buffer.set_max_column_count(max + 5);
        for column in &columns {
            buffer.add_at(*column, "x").unwrap();
        }
        buffer.new_line().unwrap();
        let line = String::from_utf8(buffer.finish().unwrap()).unwrap();
        prop_assert_eq!(line.trim_end().split(',').count() as u32, max + 5);
    }
}

#[test]
fn embedded_quote_and_backslash_round_trip() {
    let original = r#"a "quoted" \path\ value"#;
    let quoted = write_field(original);
    assert_eq!(quoted, r#""a ""quoted"" \\path\\ value""#);
    assert_eq!(unquote(&quoted), original);
}
