//! Link configuration.
//!
//! The serial settings are only a descriptor for whoever opens the port; the
//! runtime itself works on any `Read`/`Write` pair.

use std::fmt;
use std::path::Path;

use atlink_protocol::DEFAULT_MAX_PAYLOAD;
use serde::{Deserialize, Serialize};

use crate::error::{LinkError, LinkResult};

/// Default size of the transport read buffer.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Parity bit setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    /// No parity bit.
    #[default]
    None,
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
}

/// Flow control setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    /// No flow control.
    #[default]
    None,
    /// XON/XOFF.
    Software,
    /// RTS/CTS.
    Hardware,
}

/// Serial port parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Device path.
    pub device: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Data bits per character (5-8).
    pub data_bits: u8,
    /// Parity.
    pub parity: Parity,
    /// Stop bits (1 or 2).
    pub stop_bits: u8,
    /// Flow control.
    pub flow_control: FlowControl,
    /// Minimum number of bytes a read waits for.
    pub min_read_size: usize,
}

impl Default for SerialSettings {
    fn default() -> Self {
        SerialSettings {
            device: "/dev/ttyUSB3".to_string(),
            baud_rate: 115_200,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            flow_control: FlowControl::None,
            min_read_size: 4,
        }
    }
}

impl SerialSettings {
    /// Check that the settings describe a real line configuration.
    pub fn validate(&self) -> LinkResult<()> {
        if self.baud_rate == 0 {
            return Err(LinkError::Config("baud_rate must be non-zero".to_string()));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(LinkError::Config(format!(
                "data_bits must be 5-8, got {}",
                self.data_bits
            )));
        }
        if !matches!(self.stop_bits, 1 | 2) {
            return Err(LinkError::Config(format!(
                "stop_bits must be 1 or 2, got {}",
                self.stop_bits
            )));
        }
        Ok(())
    }
}

impl fmt::Display for SerialSettings {
    /// Conventional `115200 8N1` notation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        };
        write!(f, "{} {}{}{}", self.baud_rate, self.data_bits, parity, self.stop_bits)
    }
}

/// Configuration for a modem link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial line parameters for the transport owner.
    pub serial: SerialSettings,
    /// Largest single read from the transport.
    pub read_buffer_size: usize,
    /// Largest payload a `+CHTTPACT: DATA` header may declare.
    pub max_payload: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            serial: SerialSettings::default(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl LinkConfig {
    /// Parse a YAML config. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> LinkResult<Self> {
        let config: LinkConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML config file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> LinkResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Validate all values.
    pub fn validate(&self) -> LinkResult<()> {
        if self.read_buffer_size == 0 {
            return Err(LinkError::Config("read_buffer_size must be non-zero".to_string()));
        }
        self.serial.validate()
    }
}
