// AIN Agent - HTTP host for the AIN monitor
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! CSV replay of raw ADC samples.
//!
//! One column of a CSV file is loaded up front and played back in a loop,
//! one sample per tick.

use ain_monitor::Sampler;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Sampler that replays a CSV column.
#[derive(Debug, Clone)]
pub struct CsvSampler {
    samples: Vec<u32>,
    position: usize,
    loops: u64,
}

impl CsvSampler {
    /// Load the named column from a CSV file with a header row.
    pub fn from_path(path: &Path, column: &str) -> Result<Self, ReplayError> {
        if !path.exists() {
            return Err(ReplayError::FileNotFound(path.display().to_string()));
        }

        let samples = Self::parse_csv(path, column)?;
        if samples.is_empty() {
            return Err(ReplayError::EmptyDataset);
        }

        info!(
            "Loaded {} raw samples from column '{}' of {}",
            samples.len(),
            column,
            path.display()
        );

        Ok(Self::from_samples(samples))
    }

    /// Build from samples already in memory.
    pub fn from_samples(samples: Vec<u32>) -> Self {
        Self {
            samples,
            position: 0,
            loops: 0,
        }
    }

    fn parse_csv(path: &Path, column: &str) -> Result<Vec<u32>, ReplayError> {
        let mut reader = csv::Reader::from_path(path)?;

        let headers = reader.headers()?.clone();
        let index = headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| ReplayError::MissingColumn(column.to_string()))?;

        let mut samples = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result?;
            let cell = match record.get(index).map(str::trim) {
                Some(cell) if !cell.is_empty() => cell,
                _ => continue,
            };

            let value: f64 = cell.parse().map_err(|_| {
                ReplayError::InvalidFormat(format!("row {}: '{}' is not a number", row + 1, cell))
            })?;
            if !value.is_finite() || value < 0.0 || value > f64::from(u32::MAX) {
                return Err(ReplayError::InvalidFormat(format!(
                    "row {}: {} is not a raw ADC count",
                    row + 1,
                    value
                )));
            }
            samples.push(value.round() as u32);
        }

        Ok(samples)
    }

    /// Number of samples in one pass.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether there is nothing to replay.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Index of the next sample.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Completed passes over the dataset.
    pub fn loops(&self) -> u64 {
        self.loops
    }
}

impl Sampler for CsvSampler {
    fn read_raw(&mut self) -> u32 {
        let Some(&raw) = self.samples.get(self.position) else {
            return 0;
        };

        self.position += 1;
        if self.position == self.samples.len() {
            self.position = 0;
            self.loops += 1;
            debug!("Replay wrapped around (pass {})", self.loops);
        }
        raw
    }
}

/// Replay errors.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Empty dataset")]
    EmptyDataset,
}
