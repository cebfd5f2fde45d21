//! Print command implementation.

use crate::util::{format_with_commas, trim_trailing_spaces};
use csvrw_core::{CsvReader, ReadFlags, ReaderConfig};
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::path::Path;

/// Options for the print command.
#[derive(Debug, Clone)]
pub struct PrintOptions {
    /// Session flags.
    pub flags: ReadFlags,
    /// Field delimiter.
    pub delimiter: char,
    /// Single record to print.
    pub record: Option<u64>,
    /// Read buffer size.
    pub buffer_size: usize,
    /// Trim trailing spaces from displayed values.
    pub trim: bool,
}

/// A record for output.
#[derive(Debug, Serialize)]
pub struct RecordInfo {
    /// Record number.
    pub record: u64,
    /// Field values, lossily decoded.
    pub fields: Vec<String>,
    /// Byte lengths of the displayed values.
    pub lengths: Vec<usize>,
}

/// Everything the command reports about a file.
#[derive(Debug, Serialize)]
pub struct PrintReport {
    /// Records read.
    pub records: Vec<RecordInfo>,
    /// Number of the last record, once the end was reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_record: Option<u64>,
    /// Whether every requested record was read.
    pub complete: bool,
    /// Whether the last record lacked a terminator.
    pub end_record_not_terminated: bool,
    /// The error that stopped reading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs the print command.
pub fn run(path: &Path, options: &PrintOptions, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let report = collect(path, options)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            print!("{}", render_text(&report, options.record)?);
            if let Some(error) = &report.error {
                eprintln!("Error: {error}");
            }
        }
    }

    Ok(())
}

/// Reads the file and collects what to print.
///
/// Only a failure to start the session is returned as an error; a failure
/// while reading ends up in [`PrintReport::error`].
pub fn collect(path: &Path, options: &PrintOptions) -> Result<PrintReport, Box<dyn std::error::Error>> {
    let config = ReaderConfig::new()
        .delimiter(options.delimiter)
        .buffer_size(options.buffer_size);
    let mut reader = CsvReader::with_config(&config)?;
    reader.open(path, options.flags)?;

    let mut records = Vec::new();
    let result = match options.record {
        Some(n) => reader.read_record_at(n).map(|outcome| {
            if outcome.is_record() {
                records.push(record_info(&reader, options.trim));
            }
        }),
        None => loop {
            match reader.read_record() {
                Ok(outcome) if outcome.is_record() => records.push(record_info(&reader, options.trim)),
                Ok(_) => break Ok(()),
                Err(err) => break Err(err),
            }
        },
    };

    let complete = match options.record {
        Some(_) => result.is_ok() && !records.is_empty(),
        None => reader.is_eof() && reader.end_record_num() == Some(reader.record_num()),
    };
    let report = PrintReport {
        records,
        end_record: reader.end_record_num(),
        complete,
        end_record_not_terminated: reader.end_record_not_terminated(),
        error: result.err().map(|err| err.to_string()),
    };
    reader.close()?;
    Ok(report)
}

fn record_info(reader: &CsvReader<'_>, trim: bool) -> RecordInfo {
    let fields: Vec<String> = reader
        .fields_lossy()
        .into_iter()
        .map(|value| {
            if trim {
                trim_trailing_spaces(&value).to_string()
            } else {
                value
            }
        })
        .collect();
    RecordInfo {
        record: reader.record_num(),
        lengths: fields.iter().map(String::len).collect(),
        fields,
    }
}

/// Renders the report as text.
///
/// # Errors
///
/// Returns an error if formatting a value fails.
pub fn render_text(report: &PrintReport, requested: Option<u64>) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_text(&mut out, report, requested)?;
    Ok(out)
}

fn write_text(out: &mut String, report: &PrintReport, requested: Option<u64>) -> fmt::Result {
    for record in &report.records {
        writeln!(out, "\nRecord #{}", record.record)?;
        for (i, (value, len)) in record.fields.iter().zip(&record.lengths).enumerate() {
            writeln!(out, "field[ {i} ]: {value}({len})")?;
        }
    }
    out.push('\n');

    if report.complete {
        if requested.is_none() {
            let count = report.end_record.unwrap_or_default();
            writeln!(out, "All records read successfully. ({})", format_with_commas(count))?;
        }
        if report.end_record_not_terminated {
            writeln!(out, "WARNING: End record not terminated!")?;
        }
    } else if report.error.is_none() {
        if let (Some(n), Some(end)) = (requested, report.end_record) {
            writeln!(
                out,
                "Record #{n} not found. The file has {} records.",
                format_with_commas(end)
            )?;
        }
    }
    Ok(())
}
