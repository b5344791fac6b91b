//! Shared utilities: address helpers and input validation.

pub mod ip_utils;
pub mod validation;

pub use ip_utils::{is_dotted_quad, is_valid_ipv4, next_free_address};
pub use validation::{validate_device_address, validate_device_name};
