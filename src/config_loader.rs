use crate::config::Config;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{info, warn};
use std::fs::File;
use std::path::Path;

/// Load and parse a topology declaration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading topology declaration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open '{}'", config_path.display()))?;

    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse '{}'", config_path.display()))?;

    if config.devices.is_empty() {
        warn!("Declaration {:?} has no devices", config_path);
    }

    config.validate()?;

    info!(
        "Declaration has {} devices and {} links",
        config.devices.len(),
        config.links.len()
    );
    Ok(config)
}

/// Read `general.log_level` from a declaration without validating it.
///
/// Used before logging is set up, so failures are silent.
pub fn peek_log_level(config_path: &Path) -> Option<String> {
    let file = File::open(config_path).ok()?;
    let config: Config = serde_yaml::from_reader(file).ok()?;
    config.general.log_level
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let yaml = r#"
devices:
  - name: S1
    kind: switch
    address: 10.0.0.1
  - name: H1
    kind: endpoint
    address: 10.0.0.2
links:
  - [h1, s1]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.links.len(), 1);
    }

    #[test]
    fn test_load_invalid_config() {
        let yaml = r#"
devices:
  - name: ""
    kind: switch
    address: 10.0.0.1
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        assert!(load_config(temp_file.path()).is_err());
    }

    #[test]
    fn test_peek_log_level() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "general:\n  log_level: warn\n").unwrap();
        assert_eq!(peek_log_level(temp_file.path()), Some("warn".to_string()));
        assert_eq!(peek_log_level(Path::new("/nonexistent/topology.yaml")), None);
    }

    #[test]
    fn test_missing_file() {
        assert!(load_config(Path::new("/nonexistent/topology.yaml")).is_err());
    }
}
