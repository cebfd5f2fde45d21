//! Stress command implementation.

use crate::util::format_with_commas;
use csvrw_testkit::{StressConfig, StressFailure, StressRunner};
use std::path::Path;
use tracing::debug;

/// Runs the stress command.
///
/// With `resume` the saved failure is replayed and the other settings are
/// ignored.
pub fn run(
    dir: &Path,
    iterations: Option<u64>,
    seed: Option<u64>,
    max_space: usize,
    resume: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = StressConfig::new(dir)
        .iterations(iterations)
        .max_space(max_space);
    if let Some(seed) = seed {
        config = config.seed(seed);
    }
    if let Some(path) = resume {
        let failure = StressFailure::load(path)?;
        println!(
            "Restoring iteration {} of seed {} from {}",
            format_with_commas(failure.iteration),
            failure.seed,
            path.display()
        );
        config = config.resume_from(&failure);
    }

    println!(
        "WARNING: The stress test writes repeatedly to {}",
        dir.join("stress.csv").display()
    );
    println!("Seed: {}", config.seed);

    let mut runner = StressRunner::new(config)?;
    let report = runner.run(|iteration, summary| {
        println!("Iteration {}", format_with_commas(iteration));
        debug!(
            records = summary.records_read,
            bytes = summary.bytes_written,
            "iteration passed"
        );
    });

    println!();
    println!(
        "Passed: {} iterations, {} records, {} bytes in {:?}",
        format_with_commas(report.iterations_passed),
        format_with_commas(report.records_checked),
        format_with_commas(report.bytes_written),
        report.duration
    );

    match report.failure {
        None => Ok(()),
        Some(failure) => {
            eprintln!("Iteration {}", format_with_commas(failure.iteration));
            eprintln!("{}", failure.message);
            if let Some(path) = report.failure_path {
                eprintln!("Replay with: csvrw stress --resume {}", path.display());
            }
            Err("stress test failed".into())
        }
    }
}
