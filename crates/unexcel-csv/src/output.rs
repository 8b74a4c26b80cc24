use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Where per-sheet CSV output goes.
///
/// The converter opens one sink per sheet, hands it back through [`SheetOutputs::close_sink`]
/// when the sheet ends, and then calls [`SheetOutputs::discard_last_sink`] if the sheet turned out
/// to be empty.
pub trait SheetOutputs {
    type Sink: Write;

    fn open_sink(&mut self, sheet_name: &str) -> io::Result<Self::Sink>;

    fn close_sink(&mut self, mut sink: Self::Sink) -> io::Result<()> {
        sink.flush()
    }

    /// Remove everything persisted for the most recently opened sink.
    fn discard_last_sink(&mut self) -> io::Result<()>;
}

impl<T: SheetOutputs + ?Sized> SheetOutputs for &mut T {
    type Sink = T::Sink;

    fn open_sink(&mut self, sheet_name: &str) -> io::Result<Self::Sink> {
        (**self).open_sink(sheet_name)
    }

    fn close_sink(&mut self, sink: Self::Sink) -> io::Result<()> {
        (**self).close_sink(sink)
    }

    fn discard_last_sink(&mut self) -> io::Result<()> {
        (**self).discard_last_sink()
    }
}

/// Replace characters that are not portable in file names.
pub fn sanitize_sheet_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if sanitized.is_empty() {
        "Sheet".to_string()
    } else {
        sanitized
    }
}

/// Writes `<dir>/<sheet name>.csv` for every sheet.
#[derive(Debug)]
pub struct DirectoryOutputs {
    dir: PathBuf,
    // Lowercased stems, so names stay distinct on case-insensitive file systems.
    used_stems: HashSet<String>,
    files: Vec<PathBuf>,
}

impl DirectoryOutputs {
    /// Write into `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            used_stems: HashSet::new(),
            files: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written so far, in sheet order, excluding discarded ones.
    pub fn result_files(&self) -> &[PathBuf] {
        &self.files
    }

    fn unique_stem(&mut self, sheet_name: &str) -> String {
        let base = sanitize_sheet_name(sheet_name);
        let mut stem = base.clone();
        let mut n = 2;
        while !self.used_stems.insert(stem.to_lowercase()) {
            stem = format!("{base} ({n})");
            n += 1;
        }
        stem
    }
}

impl SheetOutputs for DirectoryOutputs {
    type Sink = BufWriter<File>;

    fn open_sink(&mut self, sheet_name: &str) -> io::Result<Self::Sink> {
        let stem = self.unique_stem(sheet_name);
        let path = self.dir.join(format!("{stem}.csv"));
        let file = File::create(&path)?;
        log::debug!("writing sheet `{sheet_name}` to {}", path.display());
        self.files.push(path);
        Ok(BufWriter::new(file))
    }

    fn close_sink(&mut self, sink: Self::Sink) -> io::Result<()> {
        let file = sink.into_inner().map_err(|err| err.into_error())?;
        file.sync_all()
    }

    fn discard_last_sink(&mut self) -> io::Result<()> {
        if let Some(path) = self.files.pop() {
            log::debug!("removing {}", path.display());
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// One sheet captured by [`MemoryOutputs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySheet {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl MemorySheet {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Keeps every sheet in memory.
#[derive(Debug, Default)]
pub struct MemoryOutputs {
    sheets: Vec<MemorySheet>,
    open: Vec<String>,
}

impl MemoryOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheets(&self) -> &[MemorySheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&MemorySheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn into_sheets(self) -> Vec<MemorySheet> {
        self.sheets
    }
}

impl SheetOutputs for MemoryOutputs {
    type Sink = Vec<u8>;

    fn open_sink(&mut self, sheet_name: &str) -> io::Result<Self::Sink> {
        self.open.push(sheet_name.to_string());
        Ok(Vec::new())
    }

    fn close_sink(&mut self, sink: Self::Sink) -> io::Result<()> {
        let name = self
            .open
            .pop()
            .ok_or_else(|| io::Error::other("closing a sink that was never opened"))?;
        self.sheets.push(MemorySheet { name, bytes: sink });
        Ok(())
    }

    fn discard_last_sink(&mut self) -> io::Result<()> {
        self.sheets.pop();
        Ok(())
    }
}
