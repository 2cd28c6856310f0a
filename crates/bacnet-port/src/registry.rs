//! Registration table mapping variant tags to transports.

use std::fmt;

use tracing::debug;

use crate::error::{PortError, PortResult};
use crate::variant::{DatalinkPort, PortVariant};

/// The set of transports compiled into this build.
///
/// Registration order is preserved; it decides the default variant when
/// BACnet/IPv4 is absent.
#[derive(Default)]
pub struct PortRegistry {
    ports: Vec<Box<dyn DatalinkPort>>,
}

impl PortRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a transport under the tag it reports.
    pub fn register(&mut self, port: Box<dyn DatalinkPort>) -> PortResult<()> {
        let variant = port.variant();
        if self.contains(variant) {
            return Err(PortError::DuplicateVariant { variant });
        }
        debug!("Registered datalink port {}", variant);
        self.ports.push(port);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_port(mut self, port: Box<dyn DatalinkPort>) -> PortResult<Self> {
        self.register(port)?;
        Ok(self)
    }

    /// Returns true if a transport for `variant` is registered.
    pub fn contains(&self, variant: PortVariant) -> bool {
        self.ports.iter().any(|p| p.variant() == variant)
    }

    /// Returns the transport registered for `variant`.
    pub fn get_mut(&mut self, variant: PortVariant) -> Option<&mut (dyn DatalinkPort + 'static)> {
        self.ports
            .iter_mut()
            .find(|p| p.variant() == variant)
            .map(|p| p.as_mut())
    }

    /// Registered variants in registration order.
    pub fn variants(&self) -> Vec<PortVariant> {
        self.ports.iter().map(|p| p.variant()).collect()
    }

    /// Number of registered transports.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// The variant selected before any hot-swap.
    ///
    /// BACnet/IPv4 when registered, otherwise the first registered
    /// transport, otherwise BACnet/IPv4 as a nominal tag.
    pub fn default_variant(&self) -> PortVariant {
        if self.contains(PortVariant::default()) {
            return PortVariant::default();
        }
        self.ports
            .first()
            .map(|p| p.variant())
            .unwrap_or_default()
    }
}

impl fmt::Debug for PortRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortRegistry")
            .field("variants", &self.variants())
            .finish()
    }
}
