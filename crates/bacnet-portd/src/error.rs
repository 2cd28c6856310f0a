//! Error types for bacnet-portd

use bacnet_port::PortError;
use thiserror::Error;

/// Port daemon errors
#[derive(Error, Debug)]
pub enum PortdError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Datalink port error
    #[error("Port error: {0}")]
    Port(#[from] PortError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bacnet-portd operations
pub type Result<T> = std::result::Result<T, PortdError>;
