mod source;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use unexcel_csv::{ConversionSummary, ConvertOptions, DirectoryOutputs, FormatOptions};
use unexcel_format::{get_locale, DEFAULT_MAX_FRACTION_DIGITS};

use crate::source::convert_workbook;

#[derive(Parser, Debug)]
#[command(about = "Convert every sheet of a workbook into its own CSV file")]
struct Args {
    /// Input workbook (XLS/XLSX/XLSB/ODS).
    input: PathBuf,

    /// Pad every row to at least this many columns.
    min_columns: Option<u32>,

    /// Directory for the CSV files (defaults to the workbook's directory).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Locale whose separators are used for formatted numbers.
    #[arg(long, default_value = "en-US")]
    locale: String,

    /// Maximum digits after the decimal separator for numeric cells.
    #[arg(long, default_value_t = DEFAULT_MAX_FRACTION_DIGITS)]
    max_fraction_digits: u8,

    /// Print a JSON summary instead of the list of written files.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct RunOutput<'a> {
    files: &'a [PathBuf],
    #[serde(flatten)]
    summary: &'a ConversionSummary,
}

impl Args {
    fn output_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => match self.input.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        }
    }

    fn convert_options(&self) -> Result<ConvertOptions> {
        let locale = get_locale(&self.locale)
            .with_context(|| format!("unsupported locale `{}`", self.locale))?;
        Ok(ConvertOptions {
            min_columns: self.min_columns,
            format: FormatOptions {
                locale,
                max_fraction_digits: self.max_fraction_digits,
                ..FormatOptions::default()
            },
            ..ConvertOptions::default()
        })
    }
}

fn run(args: &Args) -> Result<()> {
    let options = args.convert_options()?;
    let dir = args.output_dir();
    let mut outputs = DirectoryOutputs::new(&dir)
        .with_context(|| format!("create output directory {}", dir.display()))?;

    let summary = convert_workbook(&args.input, &mut outputs, options)
        .with_context(|| format!("convert {}", args.input.display()))?;

    if args.json {
        let output = RunOutput {
            files: outputs.result_files(),
            summary: &summary,
        };
        let json = serde_json::to_string(&output).context("serialize conversion summary")?;
        println!("{json}");
    } else {
        for file in outputs.result_files() {
            println!("{}", file.display());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    run(&args)
}
