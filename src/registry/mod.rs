//! # Topology Registry Export
//!
//! Renders a read-only view of a topology as JSON, for external tools that
//! draw or inspect the network without linking against this crate.
//!
//! ## Example Registry Structure
//!
//! ```json
//! {
//!   "devices": [
//!     {
//!       "name": "S1",
//!       "kind": "switch",
//!       "address": "10.0.0.2",
//!       "peers": ["H1"],
//!       "available_ports": 7,
//!       "position": { "x": 170, "y": 130 }
//!     }
//!   ],
//!   "connections": [
//!     ["H1", "S1"]
//!   ]
//! }
//! ```
//!
//! Positions come from the grid layout, so the same store always exports
//! the same picture.

use color_eyre::eyre::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::topology::{layout_devices, DeviceId, DeviceKind, Point, TopologyStore};

/// One device as seen by a renderer
#[derive(Debug, Serialize)]
pub struct DeviceEntry {
    pub name: String,
    pub kind: DeviceKind,
    pub address: String,
    pub peers: Vec<String>,
    pub available_ports: usize,
    pub position: Point,
}

/// Full exported view
#[derive(Debug, Serialize)]
pub struct TopologyRegistry {
    pub devices: Vec<DeviceEntry>,
    pub connections: Vec<(String, String)>,
}

impl TopologyRegistry {
    /// Build a registry from one consistent copy of the store
    pub fn from_store(store: &TopologyStore, width: i32, height: i32) -> Self {
        let (devices, connections) = store.snapshot();
        let names: HashMap<DeviceId, String> = devices
            .iter()
            .map(|d| (d.id(), d.name.clone()))
            .collect();
        let name_of = |id: DeviceId| names.get(&id).cloned();

        let entries = layout_devices(&devices, width, height)
            .into_iter()
            .map(|(device, position)| DeviceEntry {
                name: device.name.clone(),
                kind: device.kind(),
                address: device.address.clone(),
                peers: device.peers().into_iter().filter_map(name_of).collect(),
                available_ports: device.available_ports(),
                position,
            })
            .collect();

        let connections = connections
            .iter()
            .filter_map(|c| {
                let (a, b) = c.ends();
                Some((name_of(a)?, name_of(b)?))
            })
            .collect();

        Self {
            devices: entries,
            connections,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize topology registry to JSON")
    }
}

/// Write the registry for `store` to `output_path`
pub fn write_registry(store: &TopologyStore, output_path: &Path, width: i32, height: i32) -> Result<()> {
    let json = TopologyRegistry::from_store(store, width, height).to_json()?;
    fs::write(output_path, json)
        .with_context(|| format!("Failed to write topology registry to {}", output_path.display()))?;

    log::info!("Topology registry written to {}", output_path.display());
    Ok(())
}
