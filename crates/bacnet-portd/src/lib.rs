//! BACnet data-link port daemon.
//!
//! This crate implements the `bacnet-portd` daemon, which brings up one
//! BACnet data-link port and services it from a cooperative main loop.
//!
//! # Responsibilities
//!
//! - Load and validate the daemon configuration (TOML)
//! - Register the transports compiled into this build
//! - Initialize the configured port and drive its periodic task
//! - Hot-swap to another port on configuration reload (SIGHUP)
//! - Tear the port down on SIGINT/SIGTERM
//!
//! # Transports
//!
//! | Feature | Variant | Transport |
//! |---------|---------|-----------|
//! | `bip` | `bip` | UDP/IPv4, optional foreign device registration |
//! | `bip6` | `bip6` | UDP/IPv6, optional foreign device registration |
//! | `mstp` | `mstp` | Serial device (unix) |
//!
//! # Example
//!
//! ```ignore
//! use bacnet_portd::{PortDaemon, PortdConfig};
//!
//! let config = PortdConfig::load()?;
//! let mut daemon = PortDaemon::new(config)?;
//! daemon.start()?;
//! daemon.run_until(bacnet_portd::shutdown_signal()).await?;
//! daemon.shutdown()?;
//! ```

pub mod config;
mod daemon;
pub mod error;
pub mod links;

pub use config::{Bip6Config, BipConfig, MstpConfig, PortSection, PortdConfig};
pub use daemon::{shutdown_signal, PortDaemon};
pub use error::{PortdError, Result};
