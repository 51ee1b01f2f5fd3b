#![allow(clippy::collapsible_if)]

use std::{
    collections::{HashMap, HashSet},
    net::SocketAddr,
};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::models::{InlineRecord, RenderConfig, ServerConfig, StoreConfig};

/// VCS identifiers understood by `go get`.
pub const KNOWN_VCS: &[&str] = &["git", "hg", "svn", "bzr", "fossil"];

/// Longest meta refresh delay accepted.
const MAX_REFRESH_DELAY_SECS: u64 = 3600;

/// `host/segment` or `host/segment/segment`, host without scheme or port.
static KEY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-z0-9]([a-z0-9\-]{0,61}[a-z0-9])?(\.[a-z0-9]([a-z0-9\-]{0,61}[a-z0-9])?)*(/[^/\s]+){1,2}$",
    )
    .expect("invalid key regex")
});

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Key conflict detected: {message}")]
    KeyConflict { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Server configuration validator
pub struct ServerConfigValidator;

impl ServerConfigValidator {
    /// Validate the entire server configuration
    pub fn validate(config: &ServerConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if let Err(mut render_errors) = Self::validate_render_config(&config.render) {
            errors.append(&mut render_errors);
        }

        if let Err(mut store_errors) = Self::validate_store_config(&config.store) {
            errors.append(&mut store_errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:8080' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    fn validate_render_config(config: &RenderConfig) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_url(
            &config.documentation_base_url,
            "render.documentation_base_url",
        ) {
            errors.push(e);
        }

        if config.refresh_delay_secs > MAX_REFRESH_DELAY_SECS {
            errors.push(ValidationError::InvalidField {
                field: "render.refresh_delay_secs".to_string(),
                message: format!(
                    "Refresh delay must be at most {MAX_REFRESH_DELAY_SECS} seconds, got {}",
                    config.refresh_delay_secs
                ),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_store_config(config: &StoreConfig) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        match config {
            StoreConfig::Memory { records } => {
                for record in records {
                    if let Err(mut record_errors) = Self::validate_record(record) {
                        errors.append(&mut record_errors);
                    }
                }
                if let Err(mut conflicts) = Self::check_key_conflicts(records) {
                    errors.append(&mut conflicts);
                }
            }
            StoreConfig::File { path, .. } => {
                if path.trim().is_empty() {
                    errors.push(ValidationError::MissingField {
                        field: "store.path".to_string(),
                    });
                }
            }
            StoreConfig::Http {
                base_url,
                timeout,
                page_size,
                ..
            } => {
                if let Err(e) = Self::validate_url(base_url, "store.base_url") {
                    errors.push(e);
                }
                if let Err(e) = humantime::parse_duration(timeout) {
                    errors.push(ValidationError::InvalidField {
                        field: "store.timeout".to_string(),
                        message: format!("Invalid duration '{timeout}': {e}"),
                    });
                }
                if *page_size == 0 {
                    errors.push(ValidationError::InvalidField {
                        field: "store.page_size".to_string(),
                        message: "Page size must be greater than 0".to_string(),
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate a single inline record
    fn validate_record(record: &InlineRecord) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let field = format!("store record '{}'", record.key);

        if !KEY_REGEX.is_match(&record.key) {
            errors.push(ValidationError::InvalidField {
                field: field.clone(),
                message: "Key must look like 'host/name' or 'host/user/name' (lowercase host, no scheme or port)".to_string(),
            });
        }

        match record.value.source() {
            None => errors.push(ValidationError::MissingField {
                field: format!("{field} source"),
            }),
            Some(source) if source.trim().is_empty() => errors.push(ValidationError::MissingField {
                field: format!("{field} source"),
            }),
            Some(source) if source.contains("://") => errors.push(ValidationError::InvalidField {
                field: format!("{field} source"),
                message: "Source should not contain a scheme (e.g., use 'github.com/acme/foo' not 'https://github.com/acme/foo')".to_string(),
            }),
            Some(_) => {}
        }

        if let Some(vcs) = record.value.vcs() {
            if !KNOWN_VCS.contains(&vcs) {
                errors.push(ValidationError::InvalidField {
                    field: format!("{field} vcs"),
                    message: format!("Unknown VCS '{vcs}', expected one of {KNOWN_VCS:?}"),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Detect duplicate keys and two-segment keys shadowed by a one-segment key.
    ///
    /// Lookups try `host/a` before `host/a/b`, so when both exist the longer
    /// key can never be served.
    fn check_key_conflicts(records: &[InlineRecord]) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();

        for record in records {
            *seen.entry(record.key.as_str()).or_default() += 1;
        }

        let mut duplicates: Vec<&str> = seen
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(key, _)| *key)
            .collect();
        duplicates.sort_unstable();
        for key in duplicates {
            errors.push(ValidationError::KeyConflict {
                message: format!("Key '{key}' is defined more than once"),
            });
        }

        let keys: HashSet<&str> = seen.keys().copied().collect();
        let mut shadowed: Vec<(&str, &str)> = keys
            .iter()
            .copied()
            .filter_map(|key| {
                let (prefix, _) = key.rsplit_once('/')?;
                // Only two-segment keys have a one-segment prefix that is itself a key
                if prefix.contains('/') && keys.contains(prefix) {
                    Some((key, prefix))
                } else {
                    None
                }
            })
            .collect();
        shadowed.sort_unstable();
        for (key, prefix) in shadowed {
            errors.push(ValidationError::KeyConflict {
                message: format!("Key '{key}' is unreachable because '{prefix}' always matches first"),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate URL format
    fn validate_url(url_str: &str, context: &str) -> ValidationResult<()> {
        match url::Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(ValidationError::InvalidField {
                        field: context.to_string(),
                        message: format!(
                            "URL scheme must be 'http' or 'https', got '{}'",
                            url.scheme()
                        ),
                    });
                }

                if url.host().is_none() {
                    return Err(ValidationError::InvalidField {
                        field: context.to_string(),
                        message: "URL must have a valid host".to_string(),
                    });
                }

                Ok(())
            }
            Err(e) => Err(ValidationError::InvalidField {
                field: context.to_string(),
                message: format!("Invalid URL format: {e}"),
            }),
        }
    }

    /// Format multiple validation errors into a single message
    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        if errors.is_empty() {
            return "No errors".to_string();
        }

        if errors.len() == 1 {
            return errors[0].to_string();
        }

        let mut message = format!("Found {} validation errors:\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}
