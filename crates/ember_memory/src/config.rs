//! # Allocator Configuration
//!
//! Sizes for every allocator, loaded once at startup from a TOML file:
//!
//! ```toml
//! [linear]
//! capacity_bytes = 1048576
//!
//! [stack]
//! capacity_bytes = 262144
//!
//! [[pools]]
//! name = "particles"
//! block_size = 64
//! block_count = 4096
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AllocError, ConfigError, ConfigResult};

/// Linear allocator section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinearConfig {
    /// Region size in bytes.
    pub capacity_bytes: usize,
}

/// Stack allocator section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
    /// Region size in bytes.
    pub capacity_bytes: usize,
}

/// One named pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Lookup name, unique within a config.
    pub name: String,
    /// Size of one block in bytes.
    pub block_size: usize,
    /// Number of blocks.
    pub block_count: usize,
}

/// Complete allocator configuration. Every section is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Frame scratch allocator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linear: Option<LinearConfig>,
    /// Scoped LIFO allocator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<StackConfig>,
    /// Fixed-size pools.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pools: Vec<PoolConfig>,
}

impl MemoryConfig {
    /// Parses a configuration from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown keys, and
    /// the [`MemoryConfig::validate`] errors otherwise.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`MemoryConfig::from_toml_str`].
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading memory config");
        Self::from_toml_str(&text)
    }

    /// Serializes the configuration back to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if serialization fails.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string(self)?)
    }

    /// Checks every size is non-zero, pool geometry does not overflow, and
    /// pool names are unique.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] or [`ConfigError::DuplicatePool`].
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(linear) = &self.linear {
            non_zero("linear.capacity_bytes", linear.capacity_bytes)?;
        }
        if let Some(stack) = &self.stack {
            non_zero("stack.capacity_bytes", stack.capacity_bytes)?;
        }

        let mut names = HashSet::with_capacity(self.pools.len());
        for pool in &self.pools {
            non_zero(&format!("pools.{}.block_size", pool.name), pool.block_size)?;
            non_zero(&format!("pools.{}.block_count", pool.name), pool.block_count)?;
            if pool.block_size.checked_mul(pool.block_count).is_none() {
                return Err(invalid(format!(
                    "pool {} is too large: {} blocks of {} bytes",
                    pool.name, pool.block_count, pool.block_size
                )));
            }
            if !names.insert(pool.name.as_str()) {
                return Err(ConfigError::DuplicatePool(pool.name.clone()));
            }
        }

        Ok(())
    }
}

fn non_zero(key: &str, value: usize) -> ConfigResult<()> {
    if value == 0 {
        return Err(invalid(format!("{key} must be greater than zero")));
    }
    Ok(())
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid(AllocError::InvalidConfiguration(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [linear]
        capacity_bytes = 4096

        [stack]
        capacity_bytes = 1024

        [[pools]]
        name = "particles"
        block_size = 64
        block_count = 128

        [[pools]]
        name = "packets"
        block_size = 512
        block_count = 16
    "#;

    #[test]
    fn test_config_parse() {
        let config = MemoryConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.linear, Some(LinearConfig { capacity_bytes: 4096 }));
        assert_eq!(config.stack, Some(StackConfig { capacity_bytes: 1024 }));
        assert_eq!(config.pools.len(), 2);
        assert_eq!(config.pools[1].name, "packets");
    }

    #[test]
    fn test_config_empty_is_default() {
        assert_eq!(
            MemoryConfig::from_toml_str("").unwrap(),
            MemoryConfig::default()
        );
    }

    #[test]
    fn test_config_round_trip() {
        let config = MemoryConfig::from_toml_str(SAMPLE).unwrap();
        let text = config.to_toml_string().unwrap();
        assert_eq!(MemoryConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_config_rejects_zero() {
        let err = MemoryConfig::from_toml_str("[linear]\ncapacity_bytes = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(AllocError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_config_rejects_duplicate_pool() {
        let text = r#"
            [[pools]]
            name = "a"
            block_size = 8
            block_count = 8

            [[pools]]
            name = "a"
            block_size = 16
            block_count = 8
        "#;
        assert_eq!(
            MemoryConfig::from_toml_str(text).unwrap_err(),
            ConfigError::DuplicatePool("a".to_string())
        );
    }

    #[test]
    fn test_config_rejects_unknown_keys() {
        let err = MemoryConfig::from_toml_str("[linear]\ncapacity = 8\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_config_missing_file() {
        let err = MemoryConfig::from_path("/nonexistent/ember/memory.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
