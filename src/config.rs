use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_STACK_POINTER: u8 = 0xFD;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Where PC comes from on reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EntryPoint {
    /// Little-endian word at `0xFFFC`.
    #[default]
    ResetVector,
    Address(u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    pub entry_point: EntryPoint,
    pub stack_pointer: u8,
    /// Pokes written before PC is loaded, so they may set the reset vector.
    pub initial_memory: BTreeMap<u16, u8>,
    pub step_limit: Option<u64>,
    pub trace: bool,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            entry_point: EntryPoint::ResetVector,
            stack_pointer: DEFAULT_STACK_POINTER,
            initial_memory: BTreeMap::new(),
            step_limit: None,
            trace: false,
        }
    }
}

impl EmulatorConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Config that boots straight into `address` with the vector pointing
    /// there too, the way a bare test ROM would be laid out.
    pub fn with_reset_vector(address: u16) -> Self {
        let mut config = Self::default();
        config.initial_memory.insert(0xFFFC, (address & 0xFF) as u8);
        config.initial_memory.insert(0xFFFD, (address >> 8) as u8);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EmulatorConfig::default();
        assert_eq!(config.entry_point, EntryPoint::ResetVector);
        assert_eq!(config.stack_pointer, 0xFD);
        assert!(config.initial_memory.is_empty());
        assert_eq!(config.step_limit, None);
        assert!(!config.trace);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = EmulatorConfig::from_json(
            r#"{ "entry_point": { "Address": 49152 }, "step_limit": 500 }"#,
        )
        .unwrap();

        assert_eq!(config.entry_point, EntryPoint::Address(0xC000));
        assert_eq!(config.step_limit, Some(500));
        assert_eq!(config.stack_pointer, 0xFD);
    }

    #[test]
    fn test_initial_memory_keys() {
        let config = EmulatorConfig::from_json(
            r#"{ "initial_memory": { "65532": 0, "65533": 128 }, "trace": true }"#,
        )
        .unwrap();

        assert_eq!(config.initial_memory.get(&0xFFFC), Some(&0x00));
        assert_eq!(config.initial_memory.get(&0xFFFD), Some(&0x80));
        assert!(config.trace);
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = EmulatorConfig::with_reset_vector(0x8000);
        config.stack_pointer = 0xFF;
        let text = config.to_json().unwrap();
        assert_eq!(EmulatorConfig::from_json(&text).unwrap(), config);
    }

    #[test]
    fn test_parse_error() {
        let err = EmulatorConfig::from_json("{ \"stack_pointer\": 300 }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = EmulatorConfig::load("/nonexistent/nes6502.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
