//! Authoritative topology store.
//!
//! The store owns every device and connection. All state lives behind a
//! single `RwLock`: writers are serialised and a reader never observes a
//! connection without the matching device attachments (or the reverse).

use crate::topology::types::{Connection, Device, DeviceId, DeviceKind, TopologyError};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// State guarded by the store lock
#[derive(Debug, Default, Clone)]
pub(crate) struct TopologyState {
    /// Keyed by id; ids are monotonic so iteration follows insertion order
    devices: BTreeMap<DeviceId, Device>,
    /// Lowercased name -> owner
    names: HashMap<String, DeviceId>,
    connections: Vec<Connection>,
    links: HashSet<Connection>,
    next_id: u64,
}

fn name_key(name: &str) -> String {
    name.to_lowercase()
}

impl TopologyState {
    pub(crate) fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub(crate) fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn device(&self, id: DeviceId) -> Result<&Device, TopologyError> {
        self.devices.get(&id).ok_or(TopologyError::UnknownDevice(id))
    }

    fn name_taken(&self, name: &str, exclude: Option<DeviceId>) -> bool {
        self.names
            .get(&name_key(name))
            .is_some_and(|owner| Some(*owner) != exclude)
    }

    fn find_by_name(&self, name: &str) -> Option<&Device> {
        self.names.get(&name_key(name)).and_then(|id| self.devices.get(id))
    }

    fn linked(&self, a: DeviceId, b: DeviceId) -> bool {
        Connection::new(a, b).is_some_and(|c| self.links.contains(&c))
    }

    pub(crate) fn add_device(&mut self, kind: DeviceKind, name: &str, address: &str) -> Result<DeviceId, TopologyError> {
        if self.name_taken(name, None) {
            return Err(TopologyError::DuplicateName(name.to_string()));
        }
        let id = DeviceId(self.next_id);
        self.next_id += 1;
        self.devices.insert(id, Device::new(id, kind, name, address));
        self.names.insert(name_key(name), id);
        debug!("Added {} '{}' ({}) as {}", kind, name, address, id);
        Ok(id)
    }

    pub(crate) fn connect(&mut self, a: DeviceId, b: DeviceId) -> Result<(), TopologyError> {
        let first = self.device(a)?;
        let second = self.device(b)?;
        let connection = match Connection::new(a, b) {
            Some(connection) => connection,
            None => return Err(TopologyError::SelfConnection(first.name.clone())),
        };
        if self.links.contains(&connection) {
            return Err(TopologyError::AlreadyConnected(first.name.clone(), second.name.clone()));
        }

        // Each applied attach pushes the detach that undoes it
        let mut undo: Vec<(DeviceId, DeviceId)> = Vec::with_capacity(2);
        for (local, remote) in [(a, b), (b, a)] {
            let attached = match self.devices.get_mut(&local) {
                Some(device) => device.attach(remote),
                None => Err(TopologyError::UnknownDevice(local)),
            };
            if let Err(reason) = attached {
                for (local, remote) in undo.into_iter().rev() {
                    if let Some(device) = self.devices.get_mut(&local) {
                        device.detach(remote);
                    }
                }
                warn!("Rejected connection {} <-> {}: {}", a, b, reason);
                return Err(TopologyError::ConnectionRejected {
                    reason: Box::new(reason),
                });
            }
            undo.push((local, remote));
        }

        self.connections.push(connection);
        self.links.insert(connection);
        debug!("Connected {} <-> {}", a, b);
        Ok(())
    }

    pub(crate) fn disconnect(&mut self, a: DeviceId, b: DeviceId) -> bool {
        let Some(connection) = Connection::new(a, b) else {
            return false;
        };
        if !self.links.remove(&connection) {
            return false;
        }
        if let Some(device) = self.devices.get_mut(&a) {
            device.detach(b);
        }
        if let Some(device) = self.devices.get_mut(&b) {
            device.detach(a);
        }
        self.connections.retain(|c| *c != connection);
        debug!("Disconnected {} <-> {}", a, b);
        true
    }

    fn remove_device(&mut self, id: DeviceId) -> Option<Device> {
        let peers = self.devices.get(&id)?.peers();
        for peer in peers {
            self.disconnect(id, peer);
        }
        let removed = self.devices.remove(&id);
        if let Some(device) = &removed {
            self.names.remove(&name_key(&device.name));
            debug!("Removed {} '{}'", device.kind(), device.name);
        }
        removed
    }
}

/// Concurrency-safe owner of all devices and connections.
///
/// Share it between threads behind an `Arc`; every method takes `&self`.
#[derive(Debug, Default)]
pub struct TopologyStore {
    state: RwLock<TopologyState>,
}

impl TopologyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_state(state: TopologyState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    // Mutations never panic part-way, so a poisoned guard still holds a
    // consistent state.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, TopologyState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TopologyState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a device, rejecting case-insensitive name collisions
    pub fn add_device(&self, kind: DeviceKind, name: &str, address: &str) -> Result<DeviceId, TopologyError> {
        self.write().add_device(kind, name, address)
    }

    /// Remove a device and every connection involving it.
    ///
    /// Returns the removed device, or `None` if it was not present.
    pub fn remove_device(&self, id: DeviceId) -> Option<Device> {
        self.write().remove_device(id)
    }

    /// Link two devices.
    ///
    /// Either both devices record the attachment and the connection is
    /// stored, or nothing changes.
    pub fn connect(&self, a: DeviceId, b: DeviceId) -> Result<(), TopologyError> {
        self.write().connect(a, b)
    }

    /// Remove the link between two devices; returns false if there was none
    pub fn disconnect(&self, a: DeviceId, b: DeviceId) -> bool {
        self.write().disconnect(a, b)
    }

    pub fn is_connected(&self, a: DeviceId, b: DeviceId) -> bool {
        self.read().linked(a, b)
    }

    pub fn device(&self, id: DeviceId) -> Option<Device> {
        self.read().devices.get(&id).cloned()
    }

    /// Case-insensitive lookup by name
    pub fn find_device_by_name(&self, name: &str) -> Option<Device> {
        self.read().find_by_name(name).cloned()
    }

    /// Returns true if no device other than `exclude` uses `name`
    pub fn is_name_unique(&self, name: &str, exclude: Option<DeviceId>) -> bool {
        !self.read().name_taken(name, exclude)
    }

    /// Rename and readdress a device.
    ///
    /// The uniqueness check runs under the same write guard as the update,
    /// so a concurrent add cannot slip a colliding name in between.
    pub fn update_device(&self, id: DeviceId, new_name: &str, new_address: &str) -> Result<(), TopologyError> {
        let mut state = self.write();
        if state.name_taken(new_name, Some(id)) {
            return Err(TopologyError::DuplicateName(new_name.to_string()));
        }
        let state = &mut *state;
        let device = state
            .devices
            .get_mut(&id)
            .ok_or(TopologyError::UnknownDevice(id))?;
        debug!(
            "Updated {} '{}' ({}) -> '{}' ({})",
            id, device.name, device.address, new_name, new_address
        );
        state.names.remove(&name_key(&device.name));
        state.names.insert(name_key(new_name), id);
        device.name = new_name.to_string();
        device.address = new_address.to_string();
        Ok(())
    }

    /// Copy of every device, in insertion order
    pub fn snapshot_devices(&self) -> Vec<Device> {
        self.read().devices.values().cloned().collect()
    }

    /// Copy of every connection, in creation order
    pub fn snapshot_connections(&self) -> Vec<Connection> {
        self.read().connections.clone()
    }

    /// Devices and connections copied under one read guard, so the two
    /// lists always agree with each other
    pub fn snapshot(&self) -> (Vec<Device>, Vec<Connection>) {
        let state = self.read();
        (state.devices.values().cloned().collect(), state.connections.clone())
    }

    /// Devices that `id` could be linked to right now.
    ///
    /// Excludes `id` itself, devices already linked to it and devices where
    /// either side is out of ports. Switches sort first, then by name.
    pub fn connection_candidates(&self, id: DeviceId) -> Vec<Device> {
        let state = self.read();
        let Some(selected) = state.devices.get(&id) else {
            return Vec::new();
        };
        let mut candidates: Vec<Device> = state
            .devices
            .values()
            .filter(|d| d.id() != id)
            .filter(|d| !state.linked(id, d.id()))
            .filter(|d| selected.can_accept(d.id()) && d.can_accept(id))
            .cloned()
            .collect();
        candidates.sort_by(|a, b| {
            let rank = |d: &Device| match d.kind() {
                DeviceKind::Switch => 0,
                DeviceKind::Endpoint => 1,
            };
            rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
        });
        candidates
    }

    /// Suggested name for the next device of `kind`, e.g. "Switch 3"
    pub fn default_device_name(&self, kind: DeviceKind) -> String {
        let state = self.read();
        let mut n = state.devices.len() + 1;
        loop {
            let candidate = format!("{} {}", kind.label(), n);
            if !state.name_taken(&candidate, None) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.read().devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().devices.is_empty()
    }

    pub fn connection_count(&self) -> usize {
        self.read().connections.len()
    }

    /// Name of the device with `id`, if it exists
    pub fn device_name(&self, id: DeviceId) -> Option<String> {
        self.read().devices.get(&id).map(|d| d.name.clone())
    }

    /// Replace this store's contents with `other`'s in a single write
    pub fn replace_with(&self, other: TopologyStore) {
        let incoming = other.state.into_inner().unwrap_or_else(PoisonError::into_inner);
        *self.write() = incoming;
        debug!("Replaced topology state");
    }

    /// Check that device attachments mirror the connection list
    pub fn is_consistent(&self) -> bool {
        let state = self.read();
        let links_ok = state.connections.iter().all(|c| {
            let (a, b) = c.ends();
            match (state.devices.get(&a), state.devices.get(&b)) {
                (Some(da), Some(db)) => da.is_attached_to(b) && db.is_attached_to(a),
                _ => false,
            }
        });
        let peers_ok = state.devices.values().all(|d| {
            d.peers()
                .into_iter()
                .all(|peer| state.linked(d.id(), peer))
        });
        let index_ok = state.links.len() == state.connections.len()
            && state.names.len() == state.devices.len()
            && state
                .devices
                .values()
                .all(|d| state.names.get(&name_key(&d.name)) == Some(&d.id()));
        links_ok && peers_ok && index_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::types::SWITCH_PORTS;

    fn host_and_switch() -> (TopologyStore, DeviceId, DeviceId) {
        let store = TopologyStore::new();
        let h1 = store.add_device(DeviceKind::Endpoint, "H1", "10.0.0.1").unwrap();
        let s1 = store.add_device(DeviceKind::Switch, "S1", "10.0.0.2").unwrap();
        (store, h1, s1)
    }

    #[test]
    fn test_duplicate_name_is_case_insensitive() {
        let store = TopologyStore::new();
        store.add_device(DeviceKind::Endpoint, "Host", "10.0.0.1").unwrap();
        let err = store.add_device(DeviceKind::Switch, "HOST", "10.0.0.9").unwrap_err();
        assert_eq!(err, TopologyError::DuplicateName("HOST".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_connect_and_disconnect() {
        let (store, h1, s1) = host_and_switch();
        store.connect(h1, s1).unwrap();
        assert!(store.is_connected(h1, s1));
        assert!(store.is_connected(s1, h1));
        assert!(store.device(h1).unwrap().is_attached_to(s1));
        assert!(store.device(s1).unwrap().is_attached_to(h1));

        assert!(matches!(store.connect(s1, h1), Err(TopologyError::AlreadyConnected(_, _))));

        assert!(store.disconnect(s1, h1));
        assert!(!store.is_connected(h1, s1));
        assert!(!store.device(h1).unwrap().is_attached_to(s1));
        assert!(!store.device(s1).unwrap().is_attached_to(h1));
        assert!(!store.disconnect(h1, s1));
        assert!(store.is_consistent());
    }

    #[test]
    fn test_self_connection() {
        let (store, h1, _) = host_and_switch();
        assert_eq!(store.connect(h1, h1), Err(TopologyError::SelfConnection("H1".to_string())));
        assert_eq!(store.connection_count(), 0);
    }

    #[test]
    fn test_unknown_device() {
        let (store, h1, _) = host_and_switch();
        assert_eq!(store.connect(h1, DeviceId(99)), Err(TopologyError::UnknownDevice(DeviceId(99))));
        assert!(store.remove_device(DeviceId(99)).is_none());
    }

    #[test]
    fn test_rollback_when_second_side_is_full() {
        let store = TopologyStore::new();
        let h1 = store.add_device(DeviceKind::Endpoint, "H1", "10.0.0.1").unwrap();
        let h2 = store.add_device(DeviceKind::Endpoint, "H2", "10.0.0.2").unwrap();
        let s1 = store.add_device(DeviceKind::Switch, "S1", "10.0.0.3").unwrap();
        store.connect(h2, s1).unwrap();

        // s2 takes h2 first, then h2 (already on s1) refuses
        let s2 = store.add_device(DeviceKind::Switch, "S2", "10.0.0.4").unwrap();
        let err = store.connect(s2, h2).unwrap_err();
        match err {
            TopologyError::ConnectionRejected { reason } => {
                assert!(matches!(*reason, TopologyError::CapacityExceeded { ref name, .. } if name == "H2"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!store.device(s2).unwrap().is_attached_to(h2));
        assert!(!store.device(h2).unwrap().is_attached_to(s2));
        assert_eq!(store.device(s2).unwrap().available_ports(), SWITCH_PORTS);
        assert!(store.device(h1).unwrap().peers().is_empty());
        assert!(store.is_consistent());
    }

    #[test]
    fn test_remove_device_cascades() {
        let store = TopologyStore::new();
        let s1 = store.add_device(DeviceKind::Switch, "S1", "10.0.0.1").unwrap();
        let b = store.add_device(DeviceKind::Endpoint, "B", "10.0.0.2").unwrap();
        let c = store.add_device(DeviceKind::Switch, "C", "10.0.0.3").unwrap();
        store.connect(s1, b).unwrap();
        store.connect(c, s1).unwrap();

        let removed = store.remove_device(s1).unwrap();
        assert_eq!(removed.name, "S1");
        assert_eq!(store.connection_count(), 0);
        assert!(store.device(b).unwrap().peers().is_empty());
        assert!(store.device(c).unwrap().peers().is_empty());
        assert!(store.is_consistent());
    }

    #[test]
    fn test_update_device_checks_uniqueness() {
        let (store, h1, s1) = host_and_switch();
        assert!(store.is_name_unique("h1", Some(h1)));
        assert!(!store.is_name_unique("h1", Some(s1)));

        assert_eq!(
            store.update_device(s1, "h1", "10.0.0.2"),
            Err(TopologyError::DuplicateName("h1".to_string()))
        );
        // Changing only the case of its own name is allowed
        store.update_device(h1, "h1", "10.0.0.11").unwrap();
        let device = store.find_device_by_name("H1").unwrap();
        assert_eq!(device.name, "h1");
        assert_eq!(device.address, "10.0.0.11");
    }

    #[test]
    fn test_snapshots_are_copies() {
        let (store, h1, s1) = host_and_switch();
        store.connect(h1, s1).unwrap();

        let mut devices = store.snapshot_devices();
        devices[0].name = "changed".to_string();
        devices.clear();
        let mut connections = store.snapshot_connections();
        connections.clear();

        assert_eq!(store.device(h1).unwrap().name, "H1");
        assert_eq!(store.snapshot_connections().len(), 1);
    }

    #[test]
    fn test_connection_candidates() {
        let store = TopologyStore::new();
        let h1 = store.add_device(DeviceKind::Endpoint, "H1", "10.0.0.1").unwrap();
        let h2 = store.add_device(DeviceKind::Endpoint, "H2", "10.0.0.2").unwrap();
        let h3 = store.add_device(DeviceKind::Endpoint, "H3", "10.0.0.3").unwrap();
        store.add_device(DeviceKind::Switch, "Zeta", "10.0.0.4").unwrap();
        store.add_device(DeviceKind::Switch, "Alpha", "10.0.0.5").unwrap();
        store.connect(h2, h3).unwrap();

        let names: Vec<String> = store
            .connection_candidates(h1)
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn test_default_device_name() {
        let store = TopologyStore::new();
        assert_eq!(store.default_device_name(DeviceKind::Switch), "Switch 1");
        store.add_device(DeviceKind::Endpoint, "Endpoint 2", "10.0.0.1").unwrap();
        assert_eq!(store.default_device_name(DeviceKind::Endpoint), "Endpoint 3");
        assert_eq!(store.default_device_name(DeviceKind::Switch), "Switch 2");
    }

    #[test]
    fn test_name_index_follows_rename_and_remove() {
        let (store, h1, s1) = host_and_switch();
        store.update_device(h1, "Laptop", "10.0.0.1").unwrap();
        assert!(store.find_device_by_name("h1").is_none());
        assert_eq!(store.find_device_by_name("LAPTOP").unwrap().id(), h1);

        // The old name is free again
        let h1_again = store.add_device(DeviceKind::Endpoint, "H1", "10.0.0.3").unwrap();
        store.remove_device(s1).unwrap();
        let s1_again = store.add_device(DeviceKind::Switch, "s1", "10.0.0.2").unwrap();

        assert_eq!(store.find_device_by_name("h1").unwrap().id(), h1_again);
        assert_eq!(store.find_device_by_name("S1").unwrap().id(), s1_again);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_snapshot_lists_agree() {
        let (store, h1, s1) = host_and_switch();
        store.connect(h1, s1).unwrap();

        let (devices, connections) = store.snapshot();
        assert_eq!(devices.len(), 2);
        assert_eq!(connections, vec![Connection::new(h1, s1).unwrap()]);
        for connection in &connections {
            let (a, b) = connection.ends();
            assert!(devices.iter().any(|d| d.id() == a && d.is_attached_to(b)));
            assert!(devices.iter().any(|d| d.id() == b && d.is_attached_to(a)));
        }
    }
}
