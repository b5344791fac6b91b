//! Topology type definitions.
//!
//! This file contains the device and connection entities held by the
//! topology store, together with the error type shared by every store
//! operation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of ports on every switch
pub const SWITCH_PORTS: usize = 8;

/// Device names are compared without regard to case
pub fn names_match(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.to_lowercase() == b.to_lowercase()
}

/// Stable identifier for a device inside a single store.
///
/// Ids are allocated by the store and never reused, so a stale id can only
/// fail to resolve; it can never alias another device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub u64);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of network device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// End host with a single network interface
    Endpoint,
    /// Switch with `SWITCH_PORTS` ports
    Switch,
}

impl DeviceKind {
    /// Maximum number of peers a device of this kind can hold
    pub fn capacity(self) -> usize {
        match self {
            Self::Endpoint => 1,
            Self::Switch => SWITCH_PORTS,
        }
    }

    /// Human-readable label used in default names and summaries
    pub fn label(self) -> &'static str {
        match self {
            Self::Endpoint => "Endpoint",
            Self::Switch => "Switch",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors reported by topology operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("Device name '{0}' already exists")]
    DuplicateName(String),

    #[error("Cannot connect device '{0}' to itself")]
    SelfConnection(String),

    #[error("Devices '{0}' and '{1}' are already connected")]
    AlreadyConnected(String, String),

    #[error("{kind} '{name}' has no available ports (capacity {capacity})")]
    CapacityExceeded {
        name: String,
        kind: DeviceKind,
        capacity: usize,
    },

    #[error("Connection rejected: {reason}")]
    ConnectionRejected {
        #[source]
        reason: Box<TopologyError>,
    },

    #[error("Unknown device {0}")]
    UnknownDevice(DeviceId),
}

/// Device-local record of attached peers
#[derive(Debug, Clone, PartialEq, Eq)]
enum Attachments {
    Endpoint(Option<DeviceId>),
    Switch(Vec<DeviceId>),
}

/// A device in the topology
///
/// The attached-peer record is bookkeeping only; the store's connection list
/// is the durable record and the store keeps both in agreement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    id: DeviceId,
    pub name: String,
    pub address: String,
    attachments: Attachments,
}

impl Device {
    pub fn new(id: DeviceId, kind: DeviceKind, name: impl Into<String>, address: impl Into<String>) -> Self {
        let attachments = match kind {
            DeviceKind::Endpoint => Attachments::Endpoint(None),
            DeviceKind::Switch => Attachments::Switch(Vec::with_capacity(SWITCH_PORTS)),
        };
        Self {
            id,
            name: name.into(),
            address: address.into(),
            attachments,
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn kind(&self) -> DeviceKind {
        match self.attachments {
            Attachments::Endpoint(_) => DeviceKind::Endpoint,
            Attachments::Switch(_) => DeviceKind::Switch,
        }
    }

    pub fn capacity(&self) -> usize {
        self.kind().capacity()
    }

    /// Case-insensitive name comparison
    pub fn has_name(&self, name: &str) -> bool {
        names_match(&self.name, name)
    }

    /// Returns true if this device has a free port for `other`
    pub fn can_accept(&self, _other: DeviceId) -> bool {
        match &self.attachments {
            Attachments::Endpoint(peer) => peer.is_none(),
            Attachments::Switch(peers) => peers.len() < SWITCH_PORTS,
        }
    }

    /// Record `other` as attached to this device.
    ///
    /// Only local state changes; the reverse attachment is the caller's job.
    pub fn attach(&mut self, other: DeviceId) -> Result<(), TopologyError> {
        if !self.can_accept(other) {
            return Err(TopologyError::CapacityExceeded {
                name: self.name.clone(),
                kind: self.kind(),
                capacity: self.capacity(),
            });
        }
        match &mut self.attachments {
            Attachments::Endpoint(peer) => *peer = Some(other),
            Attachments::Switch(peers) => {
                if !peers.contains(&other) {
                    peers.push(other);
                }
            }
        }
        Ok(())
    }

    /// Forget `other`; does nothing if it is not attached
    pub fn detach(&mut self, other: DeviceId) {
        match &mut self.attachments {
            Attachments::Endpoint(peer) => {
                if *peer == Some(other) {
                    *peer = None;
                }
            }
            Attachments::Switch(peers) => peers.retain(|p| *p != other),
        }
    }

    pub fn is_attached_to(&self, other: DeviceId) -> bool {
        match &self.attachments {
            Attachments::Endpoint(peer) => *peer == Some(other),
            Attachments::Switch(peers) => peers.contains(&other),
        }
    }

    /// Currently attached peers, in attach order
    pub fn peers(&self) -> Vec<DeviceId> {
        match &self.attachments {
            Attachments::Endpoint(peer) => peer.iter().copied().collect(),
            Attachments::Switch(peers) => peers.clone(),
        }
    }

    pub fn available_ports(&self) -> usize {
        self.capacity() - self.peers().len()
    }

    /// Multi-line description of the device.
    ///
    /// `peer_name` resolves attached peer ids to display names.
    pub fn summary<F>(&self, peer_name: F) -> String
    where
        F: Fn(DeviceId) -> Option<String>,
    {
        let mut info = String::new();
        info.push_str(&format!("Type: {}\n", self.kind()));
        info.push_str(&format!("Name: {}\n", self.name));
        info.push_str(&format!("IP: {}\n", self.address));
        match &self.attachments {
            Attachments::Switch(peers) => {
                info.push_str(&format!("Connections: {}\n", peers.len()));
                info.push_str(&format!("Available ports: {}\n", self.available_ports()));
            }
            Attachments::Endpoint(peer) => {
                let connected = peer
                    .and_then(&peer_name)
                    .unwrap_or_else(|| "None".to_string());
                info.push_str(&format!("Connected to: {}\n", connected));
            }
        }
        info
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Unordered link between two distinct devices.
///
/// The pair is stored normalised (lower id first) so the derived equality
/// and hash are symmetric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    low: DeviceId,
    high: DeviceId,
}

impl Connection {
    /// Returns `None` when both ends are the same device
    pub fn new(a: DeviceId, b: DeviceId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn ends(&self) -> (DeviceId, DeviceId) {
        (self.low, self.high)
    }

    pub fn involves(&self, device: DeviceId) -> bool {
        self.low == device || self.high == device
    }

    /// The end opposite `device`, if `device` is one of the ends
    pub fn other(&self, device: DeviceId) -> Option<DeviceId> {
        if self.low == device {
            Some(self.high)
        } else if self.high == device {
            Some(self.low)
        } else {
            None
        }
    }
}
