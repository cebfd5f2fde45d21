//! Randomized write/read stress harness.
//!
//! Each iteration generates a random set of records, writes them to a file
//! with randomly chosen settings and API calls, checks the file size
//! against the size implied by the encoding rules, then reads the file back
//! sequentially or in shuffled random order and compares.
//!
//! Every random choice is drawn from a [`TrackedRng`], a seeded generator
//! that counts its draws. A failing iteration is saved as a
//! [`StressFailure`] holding the seed and draw counters, from which
//! [`StressConfig::resume_from`] replays it exactly.

use crate::fixtures::Record;
use csvrw_core::{
    CsvError, CsvReader, CsvWriter, ReadFlags, ReadOutcome, WriteFlags, DEFAULT_BUFFER_SIZE,
    UTF8_BOM,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default upper bound for record count, field count, field length and
/// total field bytes per iteration.
pub const DEFAULT_MAX_SPACE: usize = 100;

/// Name of the scratch file inside the work directory.
const SCRATCH_FILE: &str = "stress.csv";

/// Errors raised by the stress harness.
#[derive(Debug, Error)]
pub enum StressError {
    /// An engine call failed.
    #[error("engine error: {0}")]
    Csv(#[from] CsvError),

    /// A harness file operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A failure record could not be saved or loaded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The engines disagreed with the expected outcome.
    #[error("check failed: {0}")]
    Check(String),

    /// The harness configuration is unusable.
    #[error("invalid stress configuration: {0}")]
    Config(String),
}

/// Result type for the stress harness.
pub type StressResult<T> = Result<T, StressError>;

fn check(condition: bool, message: impl FnOnce() -> String) -> StressResult<()> {
    if condition {
        Ok(())
    } else {
        Err(StressError::Check(message()))
    }
}

/// A seeded generator that counts how many values it has produced.
///
/// Every draw goes through [`RngCore::next_u64`], so replaying a run only
/// needs the seed and the number of draws to skip.
#[derive(Debug, Clone)]
pub struct TrackedRng {
    seed: u64,
    draws: u64,
    inner: StdRng,
}

impl TrackedRng {
    /// Creates a generator from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            draws: 0,
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Recreates the generator for `seed` after `draws` values.
    #[must_use]
    pub fn resume(seed: u64, draws: u64) -> Self {
        let mut rng = Self::new(seed);
        for _ in 0..draws {
            rng.next_u64();
        }
        rng
    }

    /// The seed the generator started from.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of values drawn so far.
    #[must_use]
    pub fn draws(&self) -> u64 {
        self.draws
    }
}

impl RngCore for TrackedRng {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.draws += 1;
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// A random record set with the counts needed to predict its encoded size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedRecords {
    /// The records, zero-field records included.
    pub records: Vec<Record>,
    /// Total field bytes.
    pub chars: usize,
    /// Total fields.
    pub fields: usize,
    /// Quotes inside field values, each doubled on output.
    pub escapes: usize,
    /// Delimiters between fields.
    pub delimiters: usize,
    /// Terminators written.
    pub terminators: usize,
}

impl GeneratedRecords {
    /// Generates records bounded by `max_space`.
    ///
    /// The record count, each record's field count and each field's length
    /// are drawn from `0..=max_space`. Generation stops once more than
    /// `max_space` bytes have been produced, possibly mid-field. Zero-field
    /// records count a terminator only when `count_empty_terminators` is
    /// set.
    pub fn generate<R: Rng + ?Sized>(
        rng: &mut R,
        max_space: usize,
        count_empty_terminators: bool,
    ) -> Self {
        let mut out = Self::default();
        let mut stop = false;
        let max_records = rng.gen_range(0..=max_space);

        for _ in 0..max_records {
            if stop {
                break;
            }
            let mut record = Vec::new();
            let max_fields = rng.gen_range(0..=max_space);
            for j in 0..max_fields {
                if stop {
                    break;
                }
                let mut field = Vec::new();
                let max_length = rng.gen_range(0..=max_space);
                for _ in 0..max_length {
                    if out.chars > max_space {
                        stop = true;
                        break;
                    }
                    let byte: u8 = rng.gen();
                    field.push(byte);
                    out.chars += 1;
                    if byte == b'"' {
                        out.escapes += 1;
                    }
                }
                record.push(field);
                out.fields += 1;
                if j > 0 {
                    out.delimiters += 1;
                }
            }
            if !record.is_empty() || count_empty_terminators {
                out.terminators += 1;
            }
            out.records.push(record);
        }
        out
    }

    /// Size in bytes of the encoded records.
    #[must_use]
    pub fn encoded_len(&self, delimiter_len: usize, terminator_len: usize, bom: bool) -> u64 {
        let bytes = self.chars
            + self.fields * 2
            + self.escapes
            + self.delimiters * delimiter_len
            + self.terminators * terminator_len
            + if bom { UTF8_BOM.len() } else { 0 };
        bytes as u64
    }

    /// Records a reader should return, in order.
    ///
    /// Zero-field records survive only when both sides process them.
    #[must_use]
    pub fn expected(&self, written_empty: bool, read_empty: bool) -> Vec<Record> {
        self.records
            .iter()
            .filter(|record| !record.is_empty() || (written_empty && read_empty))
            .cloned()
            .collect()
    }
}

/// Configuration for a stress run.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of iterations, `None` to run until a failure.
    pub iterations: Option<u64>,
    /// Bound on the size of each iteration's record set.
    pub max_space: usize,
    /// Seed for the generator.
    pub seed: u64,
    /// Draws to skip before the first iteration.
    pub start_draws: u64,
    /// Number given to the first iteration.
    pub first_iteration: u64,
    /// Directory for the scratch file and failure records.
    pub dir: PathBuf,
}

impl StressConfig {
    /// Creates a configuration working in `dir` with a random seed.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            iterations: Some(100),
            max_space: DEFAULT_MAX_SPACE,
            seed: rand::random(),
            start_draws: 0,
            first_iteration: 1,
            dir: dir.into(),
        }
    }

    /// Sets the iteration count.
    #[must_use]
    pub fn iterations(mut self, iterations: Option<u64>) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the size bound.
    #[must_use]
    pub fn max_space(mut self, max_space: usize) -> Self {
        self.max_space = max_space;
        self
    }

    /// Sets the seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Replays `failure`: the run starts at the failing iteration with the
    /// generator in the state it had then, and stops after it.
    #[must_use]
    pub fn resume_from(mut self, failure: &StressFailure) -> Self {
        self.seed = failure.seed;
        self.start_draws = failure.draws_at_iteration_start;
        self.first_iteration = failure.iteration;
        self.max_space = failure.max_space;
        self.iterations = Some(1);
        self
    }

    /// Checks every setting.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first bad setting.
    pub fn validate(&self) -> StressResult<()> {
        if self.max_space == 0 {
            return Err(StressError::Config("max space must be at least 1".into()));
        }
        if self.first_iteration == 0 {
            return Err(StressError::Config("iterations are numbered from 1".into()));
        }
        if !self.dir.is_dir() {
            return Err(StressError::Config(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        Ok(())
    }
}

/// A saved failing iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressFailure {
    /// Seed of the run.
    pub seed: u64,
    /// Size bound of the run.
    pub max_space: usize,
    /// The failing iteration.
    pub iteration: u64,
    /// Generator draws before the failing iteration started.
    pub draws_at_iteration_start: u64,
    /// Generator draws before the previous iteration started.
    pub draws_at_previous_iteration_start: u64,
    /// What went wrong.
    pub message: String,
}

impl StressFailure {
    /// File name the failure is saved under.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("stress-failure-{}-{}.json", self.seed, self.iteration)
    }

    /// Saves the failure as JSON in `dir` and returns the path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, dir: &Path) -> StressResult<PathBuf> {
        let path = dir.join(self.file_name());
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Loads a failure saved by [`StressFailure::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> StressResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Outcome of one successful iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationSummary {
    /// Records generated.
    pub records_generated: usize,
    /// Records read back.
    pub records_read: usize,
    /// Size of the written file.
    pub bytes_written: u64,
}

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressReport {
    /// Seed of the run.
    pub seed: u64,
    /// Iterations that passed.
    pub iterations_passed: u64,
    /// Records read back across all passing iterations.
    pub records_checked: u64,
    /// Bytes written across all passing iterations.
    pub bytes_written: u64,
    /// Total duration.
    pub duration: Duration,
    /// The failure that ended the run, if any.
    pub failure: Option<StressFailure>,
    /// Where the failure was saved.
    pub failure_path: Option<PathBuf>,
}

impl StressReport {
    /// Whether every iteration passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Drives iterations against one long-lived reader and writer.
///
/// Sessions opened by path use the long-lived engines, so their settings
/// and buffers carry over between iterations the way an application's
/// would. Sessions on caller-owned files use short-lived engines built
/// from the long-lived engines' configuration.
pub struct StressRunner {
    config: StressConfig,
    rng: TrackedRng,
    reader: CsvReader<'static>,
    writer: CsvWriter<'static>,
    path: PathBuf,
}

impl StressRunner {
    /// Creates a runner.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the engines do
    /// not start with their documented defaults.
    pub fn new(config: StressConfig) -> StressResult<Self> {
        config.validate()?;
        let reader = CsvReader::new();
        let writer = CsvWriter::new();
        check(reader.delimiter() == ',', || {
            format!("unexpected reader default delimiter {:?}", reader.delimiter())
        })?;
        check(writer.delimiter() == ",", || {
            format!("unexpected writer default delimiter {:?}", writer.delimiter())
        })?;
        check(writer.terminator() == "\n", || {
            format!("unexpected writer default terminator {:?}", writer.terminator())
        })?;
        Ok(Self {
            rng: TrackedRng::resume(config.seed, config.start_draws),
            path: config.dir.join(SCRATCH_FILE),
            config,
            reader,
            writer,
        })
    }

    /// The generator driving the run.
    #[must_use]
    pub fn rng(&self) -> &TrackedRng {
        &self.rng
    }

    /// Runs iterations until the configured count is reached or one fails.
    ///
    /// `on_iteration` is called after every passing iteration.
    pub fn run(&mut self, mut on_iteration: impl FnMut(u64, &IterationSummary)) -> StressReport {
        let start = Instant::now();
        let mut report = StressReport {
            seed: self.config.seed,
            iterations_passed: 0,
            records_checked: 0,
            bytes_written: 0,
            duration: Duration::ZERO,
            failure: None,
            failure_path: None,
        };
        let mut draws_now = self.rng.draws();
        let mut iteration = self.config.first_iteration;

        while self
            .config
            .iterations
            .is_none_or(|limit| report.iterations_passed < limit)
        {
            let draws_prev = draws_now;
            draws_now = self.rng.draws();

            match self.run_iteration() {
                Ok(summary) => {
                    report.iterations_passed += 1;
                    report.records_checked += summary.records_read as u64;
                    report.bytes_written += summary.bytes_written;
                    on_iteration(iteration, &summary);
                }
                Err(err) => {
                    let failure = StressFailure {
                        seed: self.config.seed,
                        max_space: self.config.max_space,
                        iteration,
                        draws_at_iteration_start: draws_now,
                        draws_at_previous_iteration_start: draws_prev,
                        message: err.to_string(),
                    };
                    warn!(iteration, error = %err, "stress iteration failed");
                    match failure.save(&self.config.dir) {
                        Ok(path) => {
                            info!(path = %path.display(), "failure state saved");
                            report.failure_path = Some(path);
                        }
                        Err(save_err) => warn!(error = %save_err, "could not save failure state"),
                    }
                    report.failure = Some(failure);
                    break;
                }
            }
            iteration += 1;
        }

        report.duration = start.elapsed();
        report
    }

    /// Runs one iteration and restores the long-lived engines afterwards.
    ///
    /// # Errors
    ///
    /// Returns the first failed check or engine error.
    pub fn run_iteration(&mut self) -> StressResult<IterationSummary> {
        let summary = self.generate_and_compare()?;
        self.writer.close()?;
        self.reader.close()?;
        self.writer.resize_buffer(DEFAULT_BUFFER_SIZE)?;
        self.reader.resize_buffer(DEFAULT_BUFFER_SIZE)?;
        Ok(summary)
    }

    fn generate_and_compare(&mut self) -> StressResult<IterationSummary> {
        let max_space = self.config.max_space;
        let write_empty: bool = self.rng.gen();
        let generated = GeneratedRecords::generate(&mut self.rng, max_space, write_empty);

        let line_break = if self.rng.gen() { "\r\n" } else { "\n" };
        let terminator = padded(&mut self.rng, line_break);
        self.writer.set_terminator(terminator)?;

        let delimiter = if self.rng.gen() { ';' } else { ',' };
        // The reader keeps its delimiter between sessions.
        if self.reader.delimiter() != delimiter {
            self.reader.set_delimiter(delimiter)?;
        }
        let written_delimiter = padded(&mut self.rng, &delimiter.to_string());
        self.writer.set_delimiter(written_delimiter)?;

        let bom: bool = self.rng.gen();
        let expected_len = generated.encoded_len(
            self.writer.delimiter().len(),
            self.writer.terminator().len(),
            bom,
        );
        debug!(
            records = generated.records.len(),
            fields = generated.fields,
            expected_len,
            bom,
            write_empty,
            "iteration generated"
        );

        self.write_file(&generated.records, write_empty, bom)?;
        let actual_len = std::fs::metadata(&self.path)?.len();
        check(actual_len == expected_len, || {
            format!("file size {actual_len} != {expected_len} expected file size")
        })?;

        let read_empty: bool = self.rng.gen();
        let expected = generated.expected(write_empty, read_empty);
        let read = self.read_file(bom, read_empty, expected.len() as u64)?;

        check(read.len() == expected.len(), || {
            format!(
                "unexpected number of records read: {} != {}",
                read.len(),
                expected.len()
            )
        })?;
        if let Some(i) = read.iter().zip(&expected).position(|(got, want)| got != want) {
            return Err(StressError::Check(format!(
                "record {} differs from the record written",
                i + 1
            )));
        }

        Ok(IterationSummary {
            records_generated: generated.records.len(),
            records_read: read.len(),
            bytes_written: actual_len,
        })
    }

    fn write_file(&mut self, records: &[Record], process_empty: bool, bom: bool) -> StressResult<()> {
        let flags = WriteFlags::none().process_empty_records(process_empty);
        let max_space = self.config.max_space;
        if self.rng.gen() {
            let mut file = File::create(&self.path)?;
            let mut writer = CsvWriter::with_config(&self.writer.config())?;
            writer.associate(&mut file, flags)?;
            write_session(&mut writer, &mut self.rng, records, process_empty, bom, max_space)
        } else {
            // Truncation is only available when the writer opens the path.
            self.writer.open(&self.path, flags.truncate(true))?;
            write_session(&mut self.writer, &mut self.rng, records, process_empty, bom, max_space)
        }
    }

    fn read_file(&mut self, bom: bool, process_empty: bool, expected: u64) -> StressResult<Vec<Record>> {
        let flags = ReadFlags::none()
            .process_empty_records(process_empty)
            // Skipping the check is only safe when there is no mark.
            .skip_utf8_bom_check(!bom && self.rng.gen())
            .strict_mode(self.rng.gen());
        let max_space = self.config.max_space;
        if self.rng.gen() {
            let mut file = File::open(&self.path)?;
            let mut reader = CsvReader::with_config(&self.reader.config())?;
            reader.associate(&mut file, flags)?;
            read_session(&mut reader, &mut self.rng, expected, max_space)
        } else {
            self.reader.open(&self.path, flags)?;
            read_session(&mut self.reader, &mut self.rng, expected, max_space)
        }
    }
}

/// Pads `core` with a randomly chosen combination of spaces.
fn padded<R: Rng + ?Sized>(rng: &mut R, core: &str) -> String {
    match rng.gen_range(0..=3) {
        1 => format!(" {core}"),
        2 => format!("{core} "),
        3 => format!(" {core} "),
        _ => core.to_string(),
    }
}

fn write_session(
    writer: &mut CsvWriter<'_>,
    rng: &mut TrackedRng,
    records: &[Record],
    process_empty: bool,
    bom: bool,
    max_space: usize,
) -> StressResult<()> {
    if rng.gen() {
        writer.resize_buffer(rng.gen_range(1..=max_space * 2))?;
    }
    if bom {
        writer.write_utf8_bom()?;
    }

    for record in records {
        let use_write_record: bool = rng.gen();
        let use_write_terminator = if record.is_empty() {
            process_empty
        } else {
            rng.gen()
        };

        if use_write_record {
            writer.write_record(record, !use_write_terminator)?;
        } else {
            for (i, field) in record.iter().enumerate() {
                let last = i + 1 == record.len() && !use_write_terminator;
                writer.write_field(field, last)?;
            }
        }
        if use_write_terminator {
            writer.write_terminator()?;
        }
    }

    writer.close()?;
    check(!writer.has_error(), || {
        format!("writer reports an error after a clean close: {}", writer.error_msg())
    })
}

fn read_session(
    reader: &mut CsvReader<'_>,
    rng: &mut TrackedRng,
    expected: u64,
    max_space: usize,
) -> StressResult<Vec<Record>> {
    if rng.gen() {
        reader.resize_buffer(rng.gen_range(1..=max_space * 2))?;
    }

    let records = if rng.gen() {
        let mut records = Vec::new();
        while reader.read_record()?.is_record() {
            records.push(reader.fields().to_vec());
        }
        check(
            reader.is_eof()
                && reader.end_record_num() == Some(reader.record_num())
                && reader.end_record_num() == Some(expected),
            || {
                format!(
                    "sequential access: end record unknown (record {}, end {:?}, expected {expected})",
                    reader.record_num(),
                    reader.end_record_num()
                )
            },
        )?;
        records
    } else {
        let mut order: Vec<u64> = (1..=expected).collect();
        order.shuffle(rng);

        let mut records = vec![Vec::new(); order.len()];
        for &n in &order {
            let outcome = reader.read_record_at(n)?;
            check(outcome == ReadOutcome::Record, || {
                format!("random access: failed to read record {n}")
            })?;
            records[(n - 1) as usize] = reader.fields().to_vec();
        }

        let outcome = reader.read_record_at(expected + 1)?;
        check(outcome == ReadOutcome::Exhausted, || {
            "random access: more records than expected".to_string()
        })?;
        check(
            reader.is_eof() && reader.end_record_num() == Some(expected),
            || {
                format!(
                    "random access: end record unknown (end {:?}, expected {expected})",
                    reader.end_record_num()
                )
            },
        )?;
        records
    };

    check(!reader.has_error(), || {
        format!("reader reports an error after success: {}", reader.error_msg())
    })?;
    check(!reader.end_record_not_terminated(), || {
        "end record not terminated".to_string()
    })?;
    Ok(records)
}
