// AIN Monitor - Analog input monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Persisted configuration records
//!
//! The monitor does not care where configuration bytes live; it only needs
//! to tell a valid record from garbage so it can fall back to defaults.
//!
//! # Record Format
//!
//! Little-endian header followed by a JSON body:
//!
//! ```text
//! ┌────────┬─────────┬──────────┬──────────┬──────────┬──────────────┐
//! │ "AINC" │ version │ reserved │ body len │ CRC-32   │ JSON body    │
//! │ 4 B    │ u16     │ u16      │ u32      │ u32      │ body len B   │
//! └────────┴─────────┴──────────┴──────────┴──────────┴──────────────┘
//! ```

use super::MonitorConfig;
use crate::error::{MonitorError, RecordError, Result};
use crc::{Crc, CRC_32_ISO_HDLC};
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Magic bytes for config records
pub const RECORD_MAGIC: [u8; 4] = *b"AINC";

/// Current record format version
pub const RECORD_FORMAT_VERSION: u16 = 1;

/// Header size in bytes
pub const RECORD_HEADER_SIZE: usize = 16;

const RECORD_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Storage backend for configuration records
pub trait ConfigStore {
    /// Load the stored record, `None` if nothing was ever saved
    fn load(&self) -> Result<Option<Vec<u8>>>;

    /// Replace the stored record
    fn save(&mut self, record: &[u8]) -> Result<()>;
}

/// Serialize a configuration into a checksummed record
pub fn encode_record(config: &MonitorConfig) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(config)?;
    let checksum = RECORD_CRC.checksum(&body);

    let mut bytes = Vec::with_capacity(RECORD_HEADER_SIZE + body.len());
    bytes.extend_from_slice(&RECORD_MAGIC);
    bytes.extend_from_slice(&RECORD_FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&(body.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&checksum.to_le_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Decode and validate a record
pub fn decode_record(data: &[u8]) -> std::result::Result<MonitorConfig, RecordError> {
    if data.len() < RECORD_HEADER_SIZE {
        return Err(RecordError::BufferTooShort {
            needed: RECORD_HEADER_SIZE,
            available: data.len(),
        });
    }

    if data[0..4] != RECORD_MAGIC {
        return Err(RecordError::InvalidMagic);
    }

    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != RECORD_FORMAT_VERSION {
        return Err(RecordError::UnsupportedVersion(version));
    }

    let declared = u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize;
    let stored_checksum = u32::from_le_bytes([data[12], data[13], data[14], data[15]]);
    let body = &data[RECORD_HEADER_SIZE..];

    if body.len() != declared {
        return Err(RecordError::LengthMismatch {
            declared,
            actual: body.len(),
        });
    }

    let computed_checksum = RECORD_CRC.checksum(body);
    if stored_checksum != computed_checksum {
        return Err(RecordError::InvalidChecksum {
            expected: stored_checksum,
            actual: computed_checksum,
        });
    }

    let config: MonitorConfig =
        serde_json::from_slice(body).map_err(|e| RecordError::Malformed(e.to_string()))?;
    config
        .validate()
        .map_err(|e| RecordError::Malformed(e.to_string()))?;
    Ok(config)
}

/// Load the persisted configuration, or defaults when none is valid
pub fn load_or_default<S: ConfigStore + ?Sized>(store: &S) -> MonitorConfig {
    match store.load() {
        Ok(Some(bytes)) => match decode_record(&bytes) {
            Ok(config) => {
                debug!("Loaded persisted config ({} bytes)", bytes.len());
                config
            }
            Err(e) => {
                warn!("Persisted config invalid, using defaults: {}", e);
                MonitorConfig::default()
            }
        },
        Ok(None) => {
            debug!("No persisted config, using defaults");
            MonitorConfig::default()
        }
        Err(e) => {
            warn!("Config store unreadable, using defaults: {}", e);
            MonitorConfig::default()
        }
    }
}

/// Encode and save a configuration
pub fn persist<S: ConfigStore + ?Sized>(store: &mut S, config: &MonitorConfig) -> Result<()> {
    let record = encode_record(config)?;
    store.save(&record)
}

/// In-memory store for tests and simulation
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    record: Option<Vec<u8>>,
    saves: usize,
}

impl MemoryConfigStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding raw bytes (valid or not)
    pub fn with_record(record: Vec<u8>) -> Self {
        Self {
            record: Some(record),
            saves: 0,
        }
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves
    }

    /// Raw stored bytes
    pub fn record(&self) -> Option<&[u8]> {
        self.record.as_deref()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.record.clone())
    }

    fn save(&mut self, record: &[u8]) -> Result<()> {
        self.record = Some(record.to_vec());
        self.saves += 1;
        Ok(())
    }
}

/// Store backed by a single file
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    /// Create a store for the given path (the file need not exist)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MonitorError::Storage(format!(
                "Failed to read config file {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn save(&mut self, record: &[u8]) -> Result<()> {
        std::fs::write(&self.path, record).map_err(|e| {
            MonitorError::Storage(format!(
                "Failed to write config file {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}
