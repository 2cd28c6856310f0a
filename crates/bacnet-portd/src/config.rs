//! Configuration file support for bacnet-portd
//!
//! Loads and validates the daemon configuration from a TOML file.
//! Default location: /etc/bacnet/bacnet-portd.toml

use std::fs;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddrV4, SocketAddrV6};
use std::path::{Path, PathBuf};
use std::time::Duration;

use bacnet_port::{PortVariant, DEFAULT_TASK_INTERVAL_MS};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PortdError, Result};

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/etc/bacnet/bacnet-portd.toml";

/// Standard BACnet UDP port (0xBAC0)
pub const BACNET_UDP_PORT: u16 = 47808;

/// Baud rates accepted for MS/TP
pub const MSTP_BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];

/// Highest MS/TP master station address
pub const MSTP_MAX_MASTER_ADDRESS: u8 = 127;

/// Highest BACnet/IPv6 virtual MAC (3 octets)
pub const BIP6_MAX_VMAC: u32 = 0x00FF_FFFF;

/// Port selection and scheduling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortSection {
    /// Datalink port to bring up at startup
    #[serde(default)]
    pub variant: PortVariant,

    /// Periodic task interval in milliseconds
    #[serde(default = "default_task_interval")]
    pub task_interval_ms: u32,

    /// Main loop poll interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

/// BACnet/IPv4 configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BipConfig {
    /// Local address to bind
    #[serde(default = "default_bip_bind")]
    pub bind_address: Ipv4Addr,

    /// UDP port
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,

    /// BBMD to register with as a foreign device
    #[serde(default)]
    pub bbmd_address: Option<SocketAddrV4>,

    /// Foreign device registration time-to-live in seconds
    #[serde(default = "default_fd_ttl")]
    pub fd_ttl_seconds: u16,
}

/// BACnet/IPv6 configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bip6Config {
    /// Local address to bind
    #[serde(default = "default_bip6_bind")]
    pub bind_address: Ipv6Addr,

    /// UDP port
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,

    /// Virtual MAC address (3 octets)
    #[serde(default = "default_vmac")]
    pub vmac: u32,

    /// BBMD to register with as a foreign device
    #[serde(default)]
    pub bbmd_address: Option<SocketAddrV6>,

    /// Foreign device registration time-to-live in seconds
    #[serde(default = "default_fd_ttl")]
    pub fd_ttl_seconds: u16,
}

/// MS/TP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MstpConfig {
    /// Serial device path
    #[serde(default = "default_mstp_device")]
    pub device: PathBuf,

    /// Line speed
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// This station's MAC address
    #[serde(default = "default_mstp_mac")]
    pub mac_address: u8,

    /// Highest master address to poll for
    #[serde(default = "default_max_master")]
    pub max_master: u8,

    /// Frames sent per token hold
    #[serde(default = "default_max_info_frames")]
    pub max_info_frames: u8,
}

/// Complete bacnet-portd configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortdConfig {
    /// Port selection and scheduling
    #[serde(default)]
    pub port: PortSection,

    /// BACnet/IPv4 settings
    #[serde(default)]
    pub bip: BipConfig,

    /// BACnet/IPv6 settings
    #[serde(default)]
    pub bip6: Bip6Config,

    /// MS/TP settings
    #[serde(default)]
    pub mstp: MstpConfig,
}

// Default functions
fn default_task_interval() -> u32 {
    DEFAULT_TASK_INTERVAL_MS
}

fn default_poll_interval() -> u64 {
    10
}

fn default_bip_bind() -> Ipv4Addr {
    Ipv4Addr::UNSPECIFIED
}

fn default_bip6_bind() -> Ipv6Addr {
    Ipv6Addr::UNSPECIFIED
}

fn default_udp_port() -> u16 {
    BACNET_UDP_PORT
}

fn default_fd_ttl() -> u16 {
    60
}

fn default_vmac() -> u32 {
    1
}

fn default_mstp_device() -> PathBuf {
    PathBuf::from("/dev/ttyS0")
}

fn default_baud_rate() -> u32 {
    38400
}

fn default_mstp_mac() -> u8 {
    127
}

fn default_max_master() -> u8 {
    127
}

fn default_max_info_frames() -> u8 {
    1
}

// Default implementations
impl Default for PortSection {
    fn default() -> Self {
        Self {
            variant: PortVariant::default(),
            task_interval_ms: default_task_interval(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Default for BipConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bip_bind(),
            udp_port: default_udp_port(),
            bbmd_address: None,
            fd_ttl_seconds: default_fd_ttl(),
        }
    }
}

impl Default for Bip6Config {
    fn default() -> Self {
        Self {
            bind_address: default_bip6_bind(),
            udp_port: default_udp_port(),
            vmac: default_vmac(),
            bbmd_address: None,
            fd_ttl_seconds: default_fd_ttl(),
        }
    }
}

impl Default for MstpConfig {
    fn default() -> Self {
        Self {
            device: default_mstp_device(),
            baud_rate: default_baud_rate(),
            mac_address: default_mstp_mac(),
            max_master: default_max_master(),
            max_info_frames: default_max_info_frames(),
        }
    }
}

impl PortdConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content).map_err(|e| {
                PortdError::Configuration(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(PortdError::Io(e)),
        }
    }

    /// Load from default location or defaults
    pub fn load() -> Result<Self> {
        Self::load_or_default(DEFAULT_CONFIG_PATH)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PortdError::Configuration(e.to_string()))
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            PortdError::Configuration(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path.as_ref(), content)?;

        Ok(())
    }

    /// Get main loop poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.port.poll_interval_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.port.task_interval_ms == 0 {
            return Err(PortdError::Configuration(
                "task_interval_ms must be > 0".to_string(),
            ));
        }

        if self.port.poll_interval_ms == 0 {
            return Err(PortdError::Configuration(
                "poll_interval_ms must be > 0".to_string(),
            ));
        }

        if self.bip.udp_port == 0 {
            return Err(PortdError::Configuration(
                "bip.udp_port must be > 0".to_string(),
            ));
        }

        if self.bip.bbmd_address.is_some() && self.bip.fd_ttl_seconds == 0 {
            return Err(PortdError::Configuration(
                "bip.fd_ttl_seconds must be > 0 when a BBMD is configured".to_string(),
            ));
        }

        if self.bip6.udp_port == 0 {
            return Err(PortdError::Configuration(
                "bip6.udp_port must be > 0".to_string(),
            ));
        }

        if self.bip6.vmac > BIP6_MAX_VMAC {
            return Err(PortdError::Configuration(format!(
                "bip6.vmac must be <= {:#x}",
                BIP6_MAX_VMAC
            )));
        }

        if self.bip6.bbmd_address.is_some() && self.bip6.fd_ttl_seconds == 0 {
            return Err(PortdError::Configuration(
                "bip6.fd_ttl_seconds must be > 0 when a BBMD is configured".to_string(),
            ));
        }

        if !MSTP_BAUD_RATES.contains(&self.mstp.baud_rate) {
            return Err(PortdError::Configuration(format!(
                "mstp.baud_rate {} is not one of {:?}",
                self.mstp.baud_rate, MSTP_BAUD_RATES
            )));
        }

        if self.mstp.mac_address > MSTP_MAX_MASTER_ADDRESS {
            return Err(PortdError::Configuration(format!(
                "mstp.mac_address must be 0-{}",
                MSTP_MAX_MASTER_ADDRESS
            )));
        }

        if self.mstp.max_master > MSTP_MAX_MASTER_ADDRESS {
            return Err(PortdError::Configuration(format!(
                "mstp.max_master must be 0-{}",
                MSTP_MAX_MASTER_ADDRESS
            )));
        }

        if self.mstp.max_info_frames == 0 {
            return Err(PortdError::Configuration(
                "mstp.max_info_frames must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
