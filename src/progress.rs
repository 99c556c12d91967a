#![forbid(unsafe_code)]

//! Optional machine-readable progress for wrappers that poll a file instead of
//! reading stdout.

use log::warn;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::report::write_atomic;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub progress: u8,
    pub message: String,
}

/// Percentage of `processed` out of `total`, clamped to 0..=100.
pub fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((processed.min(total) * 100) / total) as u8
}

#[derive(Clone)]
pub struct ProgressWriter {
    path: PathBuf,
}

impl ProgressWriter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Failures are logged and otherwise ignored; progress is advisory.
    pub fn write(&self, progress: u8, message: &str) {
        let report = ProgressReport {
            progress: progress.min(100),
            message: message.to_string(),
        };
        match serde_json::to_vec(&report) {
            Ok(payload) => {
                if let Err(err) = write_atomic(&self.path, &payload) {
                    warn!("could not write progress file: {err:#}");
                }
            }
            Err(err) => warn!("could not serialize progress report: {err}"),
        }
    }
}

pub fn update_progress(progress: Option<&ProgressWriter>, percent: u8, message: &str) {
    if let Some(writer) = progress {
        writer.write(percent, message);
    }
}
