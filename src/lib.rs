//! # netsketch - Network topology model with versioned snapshots
//!
//! This library models a small network: end hosts and switches, the links
//! between them, and a binary project file that stores the whole topology.
//!
//! ## Overview
//!
//! Every device and link lives in a [`topology::TopologyStore`]. The store is
//! the only writer: it checks names, enforces port capacity, keeps both ends
//! of a link in agreement, and serialises concurrent callers behind one lock.
//!
//! ## Key Features
//!
//! - **Two device kinds**: endpoints with one port, switches with eight
//! - **Two-sided links**: connecting or disconnecting updates both devices at once
//! - **Rollback**: a rejected connect leaves no half-attached device behind
//! - **Cascading removal**: removing a device drops all of its links
//! - **Versioned snapshots**: untrusted project files are fully re-validated on load
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `topology`: Device/connection model, the store, and canvas layout
//! - `snapshot`: Binary project file encoding and decoding
//! - `config`: YAML topology declarations
//! - `config_loader`: Declaration file loading
//! - `registry`: JSON export for external renderers
//! - `utils`: Address helpers and input validation
//! - `orchestrator`: High-level commands over project files
//!
//! ## Example Usage
//!
//! ```rust
//! use netsketch::topology::{DeviceKind, TopologyStore};
//! use netsketch::snapshot;
//!
//! let store = TopologyStore::new();
//! let h1 = store.add_device(DeviceKind::Endpoint, "H1", "10.0.0.1")?;
//! let s1 = store.add_device(DeviceKind::Switch, "S1", "10.0.0.2")?;
//! store.connect(h1, s1)?;
//! assert!(store.is_connected(s1, h1));
//!
//! let bytes = snapshot::save(&store)?;
//! let restored = snapshot::load(&bytes)?;
//! assert_eq!(restored.connection_count(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! Store operations return [`topology::TopologyError`] and snapshot
//! operations return [`snapshot::SnapshotError`]. The command layer and the
//! binary wrap these in `color_eyre` reports with file context.

pub mod config;
pub mod config_loader;
pub mod topology;
pub mod snapshot;
pub mod registry;
pub mod utils;
pub mod orchestrator;
