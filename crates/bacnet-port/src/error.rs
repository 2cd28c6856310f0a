//! Error types for data-link port operations.
//!
//! Two kinds of failure exist at this layer: configuration errors (the
//! requested transport is not part of this build) and transport errors
//! (the transport itself failed to come up or go down). Both are returned,
//! never raised as panics.

use std::io;
use thiserror::Error;

use crate::variant::PortVariant;

/// Result type alias for port operations.
pub type PortResult<T> = Result<T, PortError>;

/// Errors that can occur while driving a data-link port.
#[derive(Debug, Error)]
pub enum PortError {
    /// The build carries no transport at all.
    #[error("No datalink port is compiled into this build")]
    NoVariantCompiled,

    /// The variant exists as a tag but is not compiled into this build.
    #[error("Datalink port '{variant}' is not supported by this build")]
    Unsupported {
        /// The requested variant.
        variant: PortVariant,
    },

    /// A variant name did not match any known tag.
    #[error("Unknown datalink port type '{name}'")]
    UnknownVariant {
        /// The name that failed to parse.
        name: String,
    },

    /// Two transports were registered for the same tag.
    #[error("Datalink port '{variant}' is already registered")]
    DuplicateVariant {
        /// The variant registered twice.
        variant: PortVariant,
    },

    /// The transport reported a setup failure.
    #[error("Failed to initialize datalink port '{variant}': {message}")]
    InitFailed {
        /// The variant that failed.
        variant: PortVariant,
        /// Error message.
        message: String,
    },

    /// The transport reported a teardown failure.
    #[error("Failed to deinitialize datalink port '{variant}': {message}")]
    DeinitFailed {
        /// The variant that failed.
        variant: PortVariant,
        /// Error message.
        message: String,
    },

    /// An OS-level I/O operation failed inside a transport.
    #[error("I/O error on datalink port '{variant}': {source}")]
    Io {
        /// The variant whose resource failed.
        variant: PortVariant,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl PortError {
    /// Creates an unsupported variant error.
    pub fn unsupported(variant: PortVariant) -> Self {
        Self::Unsupported { variant }
    }

    /// Creates an init failure.
    pub fn init_failed(variant: PortVariant, message: impl Into<String>) -> Self {
        Self::InitFailed {
            variant,
            message: message.into(),
        }
    }

    /// Creates a deinit failure.
    pub fn deinit_failed(variant: PortVariant, message: impl Into<String>) -> Self {
        Self::DeinitFailed {
            variant,
            message: message.into(),
        }
    }

    /// Creates an I/O error bound to a variant.
    pub fn io(variant: PortVariant, source: io::Error) -> Self {
        Self::Io { variant, source }
    }

    /// Returns true if this error comes from build or registration
    /// configuration rather than from a transport.
    ///
    /// Configuration errors do not go away by retrying the same call.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PortError::NoVariantCompiled
                | PortError::Unsupported { .. }
                | PortError::UnknownVariant { .. }
                | PortError::DuplicateVariant { .. }
        )
    }

    /// Returns the variant the error refers to, if any.
    pub fn variant(&self) -> Option<PortVariant> {
        match self {
            PortError::NoVariantCompiled | PortError::UnknownVariant { .. } => None,
            PortError::Unsupported { variant }
            | PortError::DuplicateVariant { variant }
            | PortError::InitFailed { variant, .. }
            | PortError::DeinitFailed { variant, .. }
            | PortError::Io { variant, .. } => Some(*variant),
        }
    }
}
