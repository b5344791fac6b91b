//! # Topology snapshots
//!
//! Saves a [`TopologyStore`] to a versioned binary container and rebuilds a
//! store from one.
//!
//! ## Format
//!
//! ```text
//! +-----------------+--------------------------------------------------+
//! | version: u32 LE | body: saved_at, devices[], links[(u32, u32)]     |
//! +-----------------+--------------------------------------------------+
//! ```
//!
//! A version mismatch is a hard failure; there is no migration.
//!
//! ## Loading
//!
//! Snapshot bytes are untrusted. Loading replays every device and link
//! through the same checks the store applies to live edits, on a fresh
//! state that nobody else can see. Only a fully valid result is handed back
//! or installed, so a failed load never leaves a half-built topology behind.

pub mod format;

use bincode::Options;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::topology::store::TopologyState;
use crate::topology::{DeviceId, TopologyError, TopologyStore};
pub use format::{DeviceRecord, SnapshotBody, FORMAT_VERSION, SNAPSHOT_EXTENSION};
use format::{codec, VERSION_TAG_LEN};

/// Errors raised while encoding or decoding a snapshot
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Unsupported file version: {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Corrupt snapshot: {0}")]
    CorruptData(String),

    #[error("Failed to encode snapshot: {0}")]
    Encode(#[source] bincode::Error),

    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A decoded snapshot together with its metadata
#[derive(Debug)]
pub struct Snapshot {
    pub saved_at: DateTime<Utc>,
    pub store: TopologyStore,
}

/// Capture the store as a snapshot body.
///
/// Holds the store's read guard for the whole copy, so no mutation can land
/// between the device list and the link list.
fn capture(store: &TopologyStore) -> SnapshotBody {
    let state = store.read();
    let mut positions: HashMap<DeviceId, u32> = HashMap::new();
    let devices = state
        .devices()
        .enumerate()
        .map(|(position, device)| {
            positions.insert(device.id(), position as u32);
            DeviceRecord {
                kind: device.kind(),
                name: device.name.clone(),
                address: device.address.clone(),
            }
        })
        .collect();
    // Every link end is a stored device, so both lookups succeed
    let links = state
        .connections()
        .iter()
        .filter_map(|c| {
            let (a, b) = c.ends();
            Some((*positions.get(&a)?, *positions.get(&b)?))
        })
        .collect();

    SnapshotBody {
        saved_at: Utc::now(),
        devices,
        links,
    }
}

/// Encode the full store state
pub fn save(store: &TopologyStore) -> Result<Vec<u8>, SnapshotError> {
    let body = capture(store);
    let mut bytes = codec().serialize(&FORMAT_VERSION).map_err(SnapshotError::Encode)?;
    bytes.extend(codec().serialize(&body).map_err(SnapshotError::Encode)?);
    debug!(
        "Encoded snapshot: {} devices, {} links, {} bytes",
        body.devices.len(),
        body.links.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Replay a decoded body on an empty state
fn rebuild(body: &SnapshotBody) -> Result<TopologyState, SnapshotError> {
    let mut state = TopologyState::default();
    let mut ids = Vec::with_capacity(body.devices.len());

    for record in &body.devices {
        let id = state
            .add_device(record.kind, &record.name, &record.address)
            .map_err(|e| match e {
                TopologyError::DuplicateName(name) => {
                    SnapshotError::CorruptData(format!("Duplicate device name found: {}", name))
                }
                other => SnapshotError::CorruptData(other.to_string()),
            })?;
        ids.push(id);
    }

    for &(first, second) in &body.links {
        let resolve = |position: u32| {
            ids.get(position as usize).copied().ok_or_else(|| {
                SnapshotError::CorruptData(format!(
                    "Connection references missing device at position {}",
                    position
                ))
            })
        };
        let (a, b) = (resolve(first)?, resolve(second)?);
        state
            .connect(a, b)
            .map_err(|e| SnapshotError::CorruptData(format!("Invalid connection {}-{}: {}", first, second, e)))?;
    }

    Ok(state)
}

/// Decode bytes into a validated store plus metadata
pub fn decode(bytes: &[u8]) -> Result<Snapshot, SnapshotError> {
    if bytes.len() < VERSION_TAG_LEN {
        return Err(SnapshotError::CorruptData(format!(
            "{} bytes is too short for a version tag",
            bytes.len()
        )));
    }
    let (tag, rest) = bytes.split_at(VERSION_TAG_LEN);
    let version: u32 = codec()
        .deserialize(tag)
        .map_err(|e| SnapshotError::CorruptData(e.to_string()))?;
    if version != FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: version,
            expected: FORMAT_VERSION,
        });
    }

    let body: SnapshotBody = codec()
        .deserialize(rest)
        .map_err(|e| SnapshotError::CorruptData(e.to_string()))?;
    let state = rebuild(&body)?;
    debug!(
        "Decoded snapshot saved at {}: {} devices, {} links",
        body.saved_at,
        body.devices.len(),
        body.links.len()
    );

    Ok(Snapshot {
        saved_at: body.saved_at,
        store: TopologyStore::from_state(state),
    })
}

/// Decode bytes into a validated store
pub fn load(bytes: &[u8]) -> Result<TopologyStore, SnapshotError> {
    decode(bytes).map(|snapshot| snapshot.store)
}

/// Load bytes into an existing store.
///
/// On any error `store` is left exactly as it was.
pub fn load_into(store: &TopologyStore, bytes: &[u8]) -> Result<(), SnapshotError> {
    match load(bytes) {
        Ok(loaded) => {
            store.replace_with(loaded);
            Ok(())
        }
        Err(e) => {
            warn!("Rejected snapshot, keeping current topology: {}", e);
            Err(e)
        }
    }
}

/// Append the snapshot extension when `path` has none
pub fn with_default_extension(path: &Path) -> PathBuf {
    let has_extension = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case(SNAPSHOT_EXTENSION));
    if has_extension {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".");
        name.push(SNAPSHOT_EXTENSION);
        PathBuf::from(name)
    }
}

/// Write a snapshot to `path`.
///
/// The bytes go to a temporary file in the same directory first and are
/// renamed into place, so readers never see a partially written snapshot.
pub fn save_to_file(store: &TopologyStore, path: &Path) -> Result<(), SnapshotError> {
    let bytes = save(store)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(&bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| SnapshotError::Io(e.error))?;
    info!("Saved topology to {:?} ({} bytes)", path, bytes.len());
    Ok(())
}

/// Read and validate a snapshot file
pub fn load_from_file(path: &Path) -> Result<Snapshot, SnapshotError> {
    let bytes = fs::read(path)?;
    let snapshot = decode(&bytes)?;
    info!(
        "Loaded topology from {:?}: {} devices, {} connections",
        path,
        snapshot.store.len(),
        snapshot.store.connection_count()
    );
    Ok(snapshot)
}
