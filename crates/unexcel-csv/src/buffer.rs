use std::io::{self, Write};
use std::mem;

use csv::{QuoteStyle, Terminator, WriterBuilder};

/// Line ending written after every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSeparator {
    Lf,
    CrLf,
}

impl LineSeparator {
    /// The separator of the platform the converter runs on.
    pub const fn platform() -> Self {
        if cfg!(windows) {
            LineSeparator::CrLf
        } else {
            LineSeparator::Lf
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LineSeparator::Lf => "\n",
            LineSeparator::CrLf => "\r\n",
        }
    }

    fn terminator(self) -> Terminator {
        match self {
            LineSeparator::Lf => Terminator::Any(b'\n'),
            LineSeparator::CrLf => Terminator::CRLF,
        }
    }
}

impl Default for LineSeparator {
    fn default() -> Self {
        Self::platform()
    }
}

/// `\` is doubled before the field reaches the writer, which only doubles `"`.
fn escape_backslashes(raw: &str) -> String {
    raw.replace('\\', "\\\\")
}

/// Builds the CSV text of one sheet, one row at a time.
///
/// Every field is quoted. Gap filling is up to the caller (see [`Self::add_at`]); rows shorter
/// than the declared column count are padded when they end.
#[derive(Debug)]
pub struct StreamingCsvBuffer<W: Write> {
    sink: W,
    writer: WriterBuilder,
    line_separator: LineSeparator,
    /// Encoded bytes of the row being written, reused between rows.
    line: Vec<u8>,
    fields: Vec<String>,
    last_column: Option<u32>,
    max_column_count: Option<u32>,
    has_data: bool,
    rows_written: u64,
}

impl<W: Write> StreamingCsvBuffer<W> {
    pub fn new(sink: W) -> Self {
        Self::with_line_separator(sink, LineSeparator::platform())
    }

    pub fn with_line_separator(sink: W, line_separator: LineSeparator) -> Self {
        let mut writer = WriterBuilder::new();
        writer
            .quote_style(QuoteStyle::Always)
            .double_quote(true)
            .terminator(line_separator.terminator());
        Self {
            sink,
            writer,
            line_separator,
            line: Vec::new(),
            fields: Vec::new(),
            last_column: None,
            max_column_count: None,
            has_data: false,
            rows_written: 0,
        }
    }

    /// Minimum number of fields of every row written from now on. The last value wins.
    pub fn set_max_column_count(&mut self, count: u32) {
        self.max_column_count = Some(count);
    }

    /// Append a field to the current row. Any call marks the sheet as having data, even for
    /// empty text.
    pub fn add(&mut self, raw: &str) {
        self.fields.push(escape_backslashes(raw));
        self.last_column = Some(self.last_column.map_or(0, |c| c + 1));
        self.has_data = true;
    }

    /// Append a field at `column`, first adding an empty field for each skipped column.
    ///
    /// Fails with the last emitted column when `column` does not come after it.
    pub fn add_at(&mut self, column: u32, raw: &str) -> Result<(), u32> {
        let next = match self.last_column {
            Some(last) if column <= last => return Err(last),
            Some(last) => last + 1,
            None => 0,
        };
        for _ in next..column {
            self.add("");
        }
        self.add(raw);
        Ok(())
    }

    /// Pad the current row with empty fields until it holds `count` fields.
    ///
    /// Padding does not count as data.
    pub fn pad_to(&mut self, count: u32) {
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        while self.fields.len() < count {
            self.fields.push(String::new());
        }
        if let Some(last) = self.fields.len().checked_sub(1) {
            self.last_column = u32::try_from(last).ok();
        }
    }

    /// Write the current row and start a new one.
    pub fn new_line(&mut self) -> io::Result<()> {
        if let Some(count) = self.max_column_count {
            self.pad_to(count);
        }
        if self.fields.is_empty() {
            // The writer turns an empty record into `""`; a blank row stays an empty line.
            self.sink.write_all(self.line_separator.as_str().as_bytes())?;
        } else {
            let mut row = self.writer.from_writer(mem::take(&mut self.line));
            row.write_record(&self.fields)?;
            self.line = row.into_inner().map_err(|err| err.into_error())?;
            self.sink.write_all(&self.line)?;
            self.line.clear();
        }

        self.fields.clear();
        self.last_column = None;
        self.rows_written += 1;
        Ok(())
    }

    /// True once [`Self::add`] has been called for this sheet.
    pub fn has_data(&self) -> bool {
        self.has_data
    }

    /// The column of the last field in the current row.
    pub fn last_column(&self) -> Option<u32> {
        self.last_column
    }

    /// True when the current row holds fields not yet written.
    pub fn has_pending_row(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Write any unterminated row, flush, and hand the sink back.
    pub fn finish(mut self) -> io::Result<W> {
        if self.has_pending_row() {
            self.new_line()?;
        }
        self.sink.flush()?;
        Ok(self.sink)
    }
}
