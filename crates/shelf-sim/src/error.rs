//! Error type for the simulator binary.

use std::{io, path::PathBuf, result};

use thiserror::Error;

/// Errors that can occur while loading or running a scenario.
#[derive(Error, Debug)]
pub enum Error {
    /// Scenario file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// Scenario path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Scenario text is not valid RON for the scenario schema.
    #[error("invalid scenario: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// A step names a product that is not in the scenario catalog.
    #[error("step {step}: unknown product '{product}'")]
    UnknownProduct {
        /// Zero-based step index.
        step: usize,
        /// Product id as written.
        product: String,
    },

    /// The engine rejected an operation.
    #[error("engine error: {0}")]
    Engine(#[from] shelf_engine::Error),

    /// Writing a report line failed.
    #[error("failed to write report: {0}")]
    Report(#[from] serde_json::Error),

    /// I/O failure on the report stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for simulator operations.
pub type Result<T> = result::Result<T, Error>;

/// Print helpful hints for common errors.
pub fn print_hints(err: &Error) {
    match err {
        Error::Parse(_) => {
            eprintln!("hint: scenarios are RON documents; see crates/shelf-sim/scenarios/");
        }
        Error::UnknownProduct { .. } => {
            eprintln!("hint: every product staged must appear in the scenario's `catalog` list");
        }
        Error::Engine(shelf_engine::Error::OutOfBounds { .. }) => {
            eprintln!("hint: rows and columns are 1-based and bounded by the fixture geometry");
        }
        Error::Engine(_) | Error::Read { .. } | Error::Report(_) | Error::Io(_) => {
            // No specific hints for these errors
        }
    }
}
