//! Stack configuration
//!
//! Capacities are counted in cells and include the `HEADER_CELLS` header
//! words at the front of each storage array.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CELLVM_DATASTACK_SIZE` | `4096` | Data stack capacity in cells |
//! | `CELLVM_CALLSTACK_SIZE` | `4096` | Call stack capacity in cells |
//!
//! ## File Format
//!
//! ```toml
//! [stacks]
//! data_capacity = 1024
//! call_capacity = 256
//! ```

use crate::guard::MIN_CAPACITY;
use serde::Deserialize;
use std::path::Path;

/// Default capacity of each stack, in cells
pub const DEFAULT_STACK_CAPACITY: usize = 4096;

/// Capacities of the two stacks in a context.
///
/// Every constructor validates, so a `StackConfig` always describes storage
/// that can hold at least one cell. Fields cannot be set directly:
///
/// ```compile_fail
/// let config = cellvm_core::StackConfig {
///     data_capacity: 1,
///     call_capacity: 8,
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackConfig {
    data_capacity: usize,
    call_capacity: usize,
}

impl Default for StackConfig {
    fn default() -> Self {
        StackConfig {
            data_capacity: DEFAULT_STACK_CAPACITY,
            call_capacity: DEFAULT_STACK_CAPACITY,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    stacks: StackConfig,
}

/// Error loading a configuration file
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    /// A capacity too small to hold the header plus one cell
    CapacityTooSmall { field: &'static str, value: usize },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config: {}", e),
            ConfigError::Parse(e) => write!(f, "failed to parse config: {}", e),
            ConfigError::CapacityTooSmall { field, value } => write!(
                f,
                "{} = {} is too small (minimum {})",
                field, value, MIN_CAPACITY
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::CapacityTooSmall { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Parse a capacity from an optional environment value.
/// Returns the default if the value is missing, unparsable, or too small.
fn parse_capacity(name: &str, env_value: Option<String>) -> usize {
    match env_value {
        Some(val) => match val.trim().parse::<usize>() {
            Ok(n) if n >= MIN_CAPACITY => n,
            Ok(n) => {
                tracing::warn!(
                    "{}={} is below the minimum {}, using default {}",
                    name,
                    n,
                    MIN_CAPACITY,
                    DEFAULT_STACK_CAPACITY
                );
                DEFAULT_STACK_CAPACITY
            }
            Err(_) => {
                tracing::warn!(
                    "{}='{}' is not a valid number, using default {}",
                    name,
                    val,
                    DEFAULT_STACK_CAPACITY
                );
                DEFAULT_STACK_CAPACITY
            }
        },
        None => DEFAULT_STACK_CAPACITY,
    }
}

impl StackConfig {
    pub fn new(data_capacity: usize, call_capacity: usize) -> Result<Self, ConfigError> {
        StackConfig {
            data_capacity,
            call_capacity,
        }
        .validated()
    }

    pub fn data_capacity(&self) -> usize {
        self.data_capacity
    }

    pub fn call_capacity(&self) -> usize {
        self.call_capacity
    }

    /// Load capacities from `CELLVM_DATASTACK_SIZE` / `CELLVM_CALLSTACK_SIZE`
    pub fn from_env() -> Self {
        StackConfig {
            data_capacity: parse_capacity(
                "CELLVM_DATASTACK_SIZE",
                std::env::var("CELLVM_DATASTACK_SIZE").ok(),
            ),
            call_capacity: parse_capacity(
                "CELLVM_CALLSTACK_SIZE",
                std::env::var("CELLVM_CALLSTACK_SIZE").ok(),
            ),
        }
    }

    /// Parse the `[stacks]` table of a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(source)?;
        file.stacks.validated()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.data_capacity < MIN_CAPACITY {
            return Err(ConfigError::CapacityTooSmall {
                field: "data_capacity",
                value: self.data_capacity,
            });
        }
        if self.call_capacity < MIN_CAPACITY {
            return Err(ConfigError::CapacityTooSmall {
                field: "call_capacity",
                value: self.call_capacity,
            });
        }
        Ok(self)
    }
}
