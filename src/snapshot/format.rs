//! On-disk snapshot layout.
//!
//! A snapshot file is a `u32` format version followed by a [`SnapshotBody`],
//! both encoded with fixed-width little-endian bincode. Links refer to
//! devices by their position in the device list, never by repeating device
//! data.

use bincode::Options;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::topology::DeviceKind;

/// Only version this build reads or writes
pub const FORMAT_VERSION: u32 = 1;

/// Size in bytes of the encoded version tag
pub const VERSION_TAG_LEN: usize = 4;

/// Upper bound on a decoded body, so a hostile length prefix cannot make
/// the decoder allocate without bound
pub const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Extension given to snapshot files that have none
pub const SNAPSHOT_EXTENSION: &str = "net";

/// One device as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub kind: DeviceKind,
    pub name: String,
    pub address: String,
}

/// Everything after the version tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotBody {
    pub saved_at: DateTime<Utc>,
    pub devices: Vec<DeviceRecord>,
    /// Pairs of positions into `devices`
    pub links: Vec<(u32, u32)>,
}

/// Bincode configuration shared by the encoder and decoder
pub fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(MAX_BODY_BYTES)
}
