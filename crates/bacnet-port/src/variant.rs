//! Port variants and the transport contract.
//!
//! [`PortVariant`] is the closed set of data-link kinds this layer knows
//! about. [`DatalinkPort`] is what a concrete transport has to provide to
//! be driven by the dispatcher.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PortError, PortResult};

/// Data-link transport kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortVariant {
    /// BACnet/IPv4 (Annex J).
    #[default]
    Bip,
    /// BACnet/IPv6 (Annex U).
    Bip6,
    /// MS/TP serial token-passing link (Clause 9).
    Mstp,
}

impl PortVariant {
    /// Every variant, in declaration order.
    pub const ALL: [PortVariant; 3] = [PortVariant::Bip, PortVariant::Bip6, PortVariant::Mstp];

    /// Returns the configuration name of the variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            PortVariant::Bip => "bip",
            PortVariant::Bip6 => "bip6",
            PortVariant::Mstp => "mstp",
        }
    }

    /// Returns a human-readable description for log output.
    pub fn description(&self) -> &'static str {
        match self {
            PortVariant::Bip => "BACnet/IPv4",
            PortVariant::Bip6 => "BACnet/IPv6",
            PortVariant::Mstp => "BACnet MS/TP",
        }
    }
}

impl fmt::Display for PortVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortVariant {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PortVariant::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PortError::UnknownVariant {
                name: s.to_string(),
            })
    }
}

/// Contract every data-link transport implements.
///
/// # Lifecycle
///
/// 1. `init()` opens transport resources. Calling it on an already open
///    transport should succeed without side effects.
/// 2. `task()` is called about once per scheduler interval while the port
///    is active. It must return quickly.
/// 3. `deinit()` releases resources. It fails only when teardown itself
///    fails and should succeed on an already closed transport.
#[cfg_attr(test, mockall::automock)]
pub trait DatalinkPort: Send {
    /// Returns the variant this transport serves.
    fn variant(&self) -> PortVariant;

    /// Opens the transport.
    fn init(&mut self) -> PortResult<()>;

    /// Closes the transport.
    fn deinit(&mut self) -> PortResult<()>;

    /// Periodic housekeeping, e.g. renewing a registration lease.
    fn task(&mut self, elapsed_seconds: u32);
}
