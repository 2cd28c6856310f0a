//! BACnet MS/TP datalink port.
//!
//! Token passing and framing belong to the MS/TP state machines above
//! this layer. The port owns the serial device and its line settings.

use std::fs::{File, OpenOptions};
use std::io;

use bacnet_port::{DatalinkPort, PortError, PortResult, PortVariant};
use nix::errno::Errno;
use nix::sys::termios::{self, BaudRate, SetArg};
use tracing::{debug, info, instrument, trace};

use crate::config::{MstpConfig, MSTP_MAX_MASTER_ADDRESS};

/// Maps a configured line speed to a termios rate.
fn baud_rate(rate: u32) -> Option<BaudRate> {
    match rate {
        9600 => Some(BaudRate::B9600),
        19200 => Some(BaudRate::B19200),
        38400 => Some(BaudRate::B38400),
        57600 => Some(BaudRate::B57600),
        115200 => Some(BaudRate::B115200),
        _ => None,
    }
}

/// Puts a terminal device into raw 8N1 mode at `rate`.
///
/// Returns `Ok(false)` when the device is not a terminal.
fn configure_line(device: &File, rate: BaudRate) -> io::Result<bool> {
    let mut attrs = match termios::tcgetattr(device) {
        Ok(attrs) => attrs,
        Err(Errno::ENOTTY) | Err(Errno::EINVAL) => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    termios::cfmakeraw(&mut attrs);
    termios::cfsetspeed(&mut attrs, rate)?;
    termios::tcsetattr(device, SetArg::TCSANOW, &attrs)?;
    Ok(true)
}

/// MS/TP port over a serial device.
pub struct MstpPort {
    config: MstpConfig,
    device: Option<File>,
    uptime_seconds: u64,
}

impl MstpPort {
    pub fn new(config: MstpConfig) -> Self {
        Self {
            config,
            device: None,
            uptime_seconds: 0,
        }
    }

    /// Returns true while the serial device is open.
    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Seconds of periodic task time since the port was opened.
    pub fn uptime_seconds(&self) -> u64 {
        self.uptime_seconds
    }
}

impl DatalinkPort for MstpPort {
    fn variant(&self) -> PortVariant {
        PortVariant::Mstp
    }

    #[instrument(skip(self), fields(port = "mstp", device = %self.config.device.display()))]
    fn init(&mut self) -> PortResult<()> {
        if self.device.is_some() {
            return Ok(());
        }
        if self.config.mac_address > MSTP_MAX_MASTER_ADDRESS {
            return Err(PortError::init_failed(
                PortVariant::Mstp,
                format!(
                    "MAC address {} is not a master address",
                    self.config.mac_address
                ),
            ));
        }
        let rate = baud_rate(self.config.baud_rate).ok_or_else(|| {
            PortError::init_failed(
                PortVariant::Mstp,
                format!("unsupported baud rate {}", self.config.baud_rate),
            )
        })?;

        let device = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.config.device)
            .map_err(|e| PortError::io(PortVariant::Mstp, e))?;
        if !configure_line(&device, rate).map_err(|e| PortError::io(PortVariant::Mstp, e))? {
            debug!("Device is not a terminal, line settings left unchanged");
        }

        info!(
            "MS/TP port open: MAC {} at {} bps (max_master {}, max_info_frames {})",
            self.config.mac_address,
            self.config.baud_rate,
            self.config.max_master,
            self.config.max_info_frames
        );
        self.device = Some(device);
        self.uptime_seconds = 0;
        Ok(())
    }

    #[instrument(skip(self), fields(port = "mstp"))]
    fn deinit(&mut self) -> PortResult<()> {
        if self.device.take().is_some() {
            info!("MS/TP port closed after {}s", self.uptime_seconds);
        }
        Ok(())
    }

    fn task(&mut self, elapsed_seconds: u32) {
        if self.device.is_none() {
            return;
        }
        self.uptime_seconds += u64::from(elapsed_seconds);
        trace!(uptime = self.uptime_seconds, "MS/TP link housekeeping");
    }
}
