//! High-level commands over snapshot files.
//!
//! Each command resolves device names, checks user input, calls the
//! topology store and, for edits, writes the snapshot back. A command that
//! fails leaves the file on disk untouched.

use color_eyre::eyre::{bail, eyre, WrapErr};
use color_eyre::Result;
use log::info;
use std::collections::HashMap;
use std::path::Path;

use crate::config::Config;
use crate::config_loader::load_config;
use crate::snapshot::{load_from_file, save_to_file, FORMAT_VERSION};
use crate::topology::{Device, DeviceId, DeviceKind, TopologyStore};
use crate::utils::ip_utils::next_free_address;
use crate::utils::validation::{validate_device_address, validate_device_name};

/// First address handed out when the caller gives none
const DEFAULT_FIRST_ADDRESS: &str = "10.0.0.1";

/// Build a store from a validated declaration
pub fn build_store(config: &Config) -> Result<TopologyStore> {
    let store = TopologyStore::new();
    for device in &config.devices {
        let name = validate_device_name(&device.name).map_err(|e| eyre!(e))?;
        let address = validate_device_address(&device.address).map_err(|e| eyre!(e))?;
        store.add_device(device.kind, &name, &address)?;
    }
    for (a, b) in &config.links {
        let first = find(&store, a)?;
        let second = find(&store, b)?;
        store
            .connect(first.id(), second.id())
            .wrap_err_with(|| format!("Failed to link '{}' and '{}'", a, b))?;
    }
    Ok(store)
}

/// Build a snapshot file from a YAML declaration
pub fn build_from_config(config_path: &Path, output: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let store = build_store(&config)?;
    save_to_file(&store, output).wrap_err_with(|| format!("Failed to write '{}'", output.display()))?;
    info!(
        "Built topology with {} devices and {} connections",
        store.len(),
        store.connection_count()
    );
    Ok(())
}

/// Write an empty snapshot
pub fn init_snapshot(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("'{}' already exists", path.display());
    }
    save_to_file(&TopologyStore::new(), path).wrap_err_with(|| format!("Failed to write '{}'", path.display()))?;
    Ok(())
}

/// Load a snapshot file
pub fn open(path: &Path) -> Result<TopologyStore> {
    let snapshot = load_from_file(path).wrap_err_with(|| format!("Failed to load project '{}'", path.display()))?;
    Ok(snapshot.store)
}

/// Load a snapshot, apply `edit`, and write it back if `edit` succeeds
pub fn edit_snapshot<T, F>(path: &Path, edit: F) -> Result<T>
where
    F: FnOnce(&TopologyStore) -> Result<T>,
{
    let store = open(path)?;
    let result = edit(&store)?;
    save_to_file(&store, path).wrap_err_with(|| format!("Failed to save project '{}'", path.display()))?;
    Ok(result)
}

/// Look up a device by name, case-insensitively
pub fn find(store: &TopologyStore, name: &str) -> Result<Device> {
    store
        .find_device_by_name(name.trim())
        .ok_or_else(|| eyre!("No device named '{}'", name.trim()))
}

/// Next unused address in the default subnet
pub fn suggest_address(store: &TopologyStore) -> Option<String> {
    let devices = store.snapshot_devices();
    next_free_address(DEFAULT_FIRST_ADDRESS, devices.iter().map(|d| d.address.as_str()))
}

/// Add a device; name and address fall back to generated defaults
pub fn add_device(
    store: &TopologyStore,
    kind: DeviceKind,
    name: Option<&str>,
    address: Option<&str>,
) -> Result<Device> {
    let name = match name {
        Some(name) => validate_device_name(name).map_err(|e| eyre!(e))?,
        None => store.default_device_name(kind),
    };
    let address = match address {
        Some(address) => validate_device_address(address).map_err(|e| eyre!(e))?,
        None => suggest_address(store).ok_or_else(|| eyre!("No free address left in {}/24", DEFAULT_FIRST_ADDRESS))?,
    };
    let id = store.add_device(kind, &name, &address)?;
    store
        .device(id)
        .ok_or_else(|| eyre!("Device '{}' vanished after insert", name))
}

pub fn remove_device(store: &TopologyStore, name: &str) -> Result<Device> {
    let device = find(store, name)?;
    store
        .remove_device(device.id())
        .ok_or_else(|| eyre!("No device named '{}'", name))
}

pub fn connect(store: &TopologyStore, a: &str, b: &str) -> Result<()> {
    let first = find(store, a)?;
    let second = find(store, b)?;
    store.connect(first.id(), second.id())?;
    Ok(())
}

/// Returns false when the devices were not linked
pub fn disconnect(store: &TopologyStore, a: &str, b: &str) -> Result<bool> {
    let first = find(store, a)?;
    let second = find(store, b)?;
    Ok(store.disconnect(first.id(), second.id()))
}

/// Rename and/or readdress a device
pub fn edit_device(
    store: &TopologyStore,
    name: &str,
    new_name: Option<&str>,
    new_address: Option<&str>,
) -> Result<Device> {
    let device = find(store, name)?;
    let new_name = match new_name {
        Some(n) => validate_device_name(n).map_err(|e| eyre!(e))?,
        None => device.name.clone(),
    };
    let new_address = match new_address {
        Some(a) => validate_device_address(a).map_err(|e| eyre!(e))?,
        None => device.address.clone(),
    };
    store.update_device(device.id(), &new_name, &new_address)?;
    store
        .device(device.id())
        .ok_or_else(|| eyre!("Device '{}' vanished during update", new_name))
}

/// Devices that `name` could be linked to
pub fn candidates(store: &TopologyStore, name: &str) -> Result<Vec<Device>> {
    let device = find(store, name)?;
    Ok(store.connection_candidates(device.id()))
}

/// Human-readable listing of the whole topology
pub fn describe(store: &TopologyStore) -> String {
    let mut out = String::new();
    let (devices, connections) = store.snapshot();
    let names: HashMap<DeviceId, &str> = devices.iter().map(|d| (d.id(), d.name.as_str())).collect();
    let name_of = |id: DeviceId| names.get(&id).map(|name| name.to_string());

    out.push_str(&format!("Devices ({}):\n", devices.len()));
    for device in &devices {
        out.push_str(&device.summary(name_of));
        out.push('\n');
    }

    out.push_str(&format!("Connections ({}):\n", connections.len()));
    for connection in &connections {
        let (a, b) = connection.ends();
        if let (Some(a), Some(b)) = (names.get(&a), names.get(&b)) {
            out.push_str(&format!("  {} <-> {}\n", a, b));
        }
    }
    out
}

/// Load a snapshot file and report where it came from
pub fn describe_file(path: &Path) -> Result<String> {
    let snapshot = load_from_file(path).wrap_err_with(|| format!("Failed to load project '{}'", path.display()))?;
    Ok(format!(
        "Project: {} (format v{}, saved {})\n{}",
        path.display(),
        FORMAT_VERSION,
        snapshot.saved_at.format("%Y-%m-%d %H:%M:%S UTC"),
        describe(&snapshot.store)
    ))
}
