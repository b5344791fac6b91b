//! Network topology module.
//!
//! This module contains the device and connection model, the lock-guarded
//! store that owns them, and deterministic canvas layout for renderers.

pub mod types;
pub mod store;
pub mod layout;

// Re-export key types for easier access
pub use types::{Connection, Device, DeviceId, DeviceKind, TopologyError, SWITCH_PORTS};
pub use store::TopologyStore;
pub use layout::{grid_positions, layout_devices, Point, DEFAULT_CANVAS};
