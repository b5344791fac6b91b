use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::topology::DeviceKind;
use crate::utils::validation::{validate_device_address, validate_device_name};

/// Declarative description of a topology, read from YAML
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
    /// Pairs of device names to link
    #[serde(default)]
    pub links: Vec<(String, String)>,
}

/// Shared general configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GeneralConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

/// Configuration for a single device
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DeviceConfig {
    pub name: String,
    pub kind: DeviceKind,
    pub address: String,
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid device configuration: {0}")]
    InvalidDevice(String),
    #[error("Invalid link configuration: {0}")]
    InvalidLink(String),
}

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

impl Config {
    /// Validate the configuration
    ///
    /// Capacity is not checked here; the store rejects over-full links when
    /// the topology is built.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(level) = &self.general.log_level {
            if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
                return Err(ValidationError::InvalidGeneral(format!(
                    "log_level must be one of {:?}, got '{}'",
                    LOG_LEVELS, level
                )));
            }
        }

        let mut names = HashSet::new();
        for device in &self.devices {
            let name = validate_device_name(&device.name).map_err(ValidationError::InvalidDevice)?;
            validate_device_address(&device.address)
                .map_err(|e| ValidationError::InvalidDevice(format!("{}: {}", name, e)))?;
            if !names.insert(name.to_lowercase()) {
                return Err(ValidationError::InvalidDevice(format!(
                    "Device name '{}' already exists",
                    name
                )));
            }
        }

        for (a, b) in &self.links {
            for end in [a, b] {
                if !names.contains(&end.trim().to_lowercase()) {
                    return Err(ValidationError::InvalidLink(format!(
                        "link {}-{} names undeclared device '{}'",
                        a, b, end
                    )));
                }
            }
        }

        Ok(())
    }

    /// Get the general configuration
    pub fn general(&self) -> &GeneralConfig {
        &self.general
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_topology_config() {
        let yaml = r#"
general:
  log_level: debug
devices:
  - name: H1
    kind: endpoint
    address: 10.0.0.1
  - name: S1
    kind: switch
    address: 10.0.0.2
links:
  - [H1, S1]
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.general().log_level.as_deref(), Some("debug"));
        assert_eq!(config.devices[1].kind, DeviceKind::Switch);
        assert_eq!(config.links, vec![("H1".to_string(), "S1".to_string())]);
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert!(config.validate().is_ok());
        assert!(config.devices.is_empty());
    }

    #[test]
    fn test_validation_errors() {
        // Duplicate names differing only in case
        let yaml = r#"
devices:
  - { name: core, kind: switch, address: 10.0.0.1 }
  - { name: CORE, kind: switch, address: 10.0.0.2 }
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidDevice(_))));

        // Malformed address
        let yaml = r#"
devices:
  - { name: H1, kind: endpoint, address: "10.0.1" }
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidDevice(_))));

        // Link to an undeclared device
        let yaml = r#"
devices:
  - { name: H1, kind: endpoint, address: 10.0.0.1 }
links:
  - [H1, S9]
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidLink(_))));

        // Unknown log level
        let yaml = r#"
general:
  log_level: loud
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidGeneral(_))));
    }

    #[test]
    fn test_unknown_kind_fails_to_parse() {
        let yaml = r#"
devices:
  - { name: R1, kind: router, address: 10.0.0.1 }
"#;
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }
}
