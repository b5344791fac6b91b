//! Input validation utilities.
//!
//! These checks run before a request reaches the topology store: the store
//! enforces structural rules (unique names, link capacity) but accepts any
//! string as an address, so field-level checks live here and are shared by
//! the YAML loader and the command line.

use crate::utils::ip_utils::{is_dotted_quad, is_private_ipv4, is_valid_ipv4};

/// Validate a device name
///
/// # Returns
/// * `Ok(name)` trimmed of surrounding whitespace
/// * `Err(String)` with an error message if the name is empty
pub fn validate_device_name(name: &str) -> Result<String, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Device name cannot be empty".to_string());
    }
    Ok(trimmed.to_string())
}

/// Validate a device address
///
/// Accepts anything shaped like `a.b.c.d`, matching what the store records.
/// Addresses that are not real IPv4 addresses, or that fall outside the
/// private ranges, are accepted with a warning.
///
/// # Examples
/// ```
/// use netsketch::utils::validation::validate_device_address;
///
/// assert_eq!(validate_device_address(" 10.0.0.1 ").unwrap(), "10.0.0.1");
/// assert!(validate_device_address("10.0.0").is_err());
/// ```
pub fn validate_device_address(address: &str) -> Result<String, String> {
    let trimmed = address.trim();
    if !is_dotted_quad(trimmed) {
        return Err(format!(
            "Please enter a valid IP address (e.g., 192.168.1.1), got '{}'",
            trimmed
        ));
    }
    if !is_valid_ipv4(trimmed) {
        log::warn!("Address '{}' has octets above 255", trimmed);
    } else if let Ok(false) = is_private_ipv4(trimmed) {
        log::warn!("Address '{}' is not in a private range", trimmed);
    }
    Ok(trimmed.to_string())
}
