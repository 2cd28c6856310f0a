//! Datalink transports compiled into this build.
//!
//! Each transport is behind a Cargo feature (`bip`, `bip6`, `mstp`).
//! [`build_registry`] registers whichever are enabled; with none enabled
//! the registry is empty and every lifecycle call fails.

#[cfg(any(feature = "bip", feature = "bip6"))]
pub mod lease;

#[cfg(feature = "bip")]
pub mod bip;

#[cfg(feature = "bip6")]
pub mod bip6;

#[cfg(all(feature = "mstp", unix))]
pub mod mstp;

use bacnet_port::{PortRegistry, PortResult, PortVariant};

use crate::config::PortdConfig;

/// Variants compiled into this build, in registration order.
pub fn compiled_variants() -> Vec<PortVariant> {
    #[allow(unused_mut)]
    let mut variants = Vec::new();
    #[cfg(feature = "bip")]
    variants.push(PortVariant::Bip);
    #[cfg(feature = "bip6")]
    variants.push(PortVariant::Bip6);
    #[cfg(all(feature = "mstp", unix))]
    variants.push(PortVariant::Mstp);
    variants
}

/// Builds the registry of compiled-in transports from `config`.
#[allow(unused_variables)]
pub fn build_registry(config: &PortdConfig) -> PortResult<PortRegistry> {
    #[allow(unused_mut)]
    let mut registry = PortRegistry::new();
    #[cfg(feature = "bip")]
    registry.register(Box::new(bip::BipPort::new(config.bip.clone())))?;
    #[cfg(feature = "bip6")]
    registry.register(Box::new(bip6::Bip6Port::new(config.bip6.clone())))?;
    #[cfg(all(feature = "mstp", unix))]
    registry.register(Box::new(mstp::MstpPort::new(config.mstp.clone())))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_registry_matches_features() {
        let registry = build_registry(&PortdConfig::default()).unwrap();
        assert_eq!(registry.variants(), compiled_variants());
    }

    #[cfg(feature = "bip")]
    #[test]
    fn test_bip_is_default() {
        let registry = build_registry(&PortdConfig::default()).unwrap();
        assert_eq!(registry.default_variant(), PortVariant::Bip);
    }
}
