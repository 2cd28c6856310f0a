//! BACnet/IPv4 datalink port.

use std::net::{SocketAddr, SocketAddrV4, UdpSocket};

use bacnet_port::{DatalinkPort, PortError, PortResult, PortVariant};
use tracing::{debug, info, instrument, warn};

use super::lease::ForeignDeviceLease;
use crate::config::BipConfig;

/// BVLL type for BACnet/IPv4
const BVLL_TYPE_BIP: u8 = 0x81;

/// BVLC function: Register-Foreign-Device
const BVLC_REGISTER_FOREIGN_DEVICE: u8 = 0x05;

/// Encodes a BVLC Register-Foreign-Device message for `ttl_seconds`.
pub fn encode_register_foreign_device(ttl_seconds: u16) -> [u8; 6] {
    let [ttl_hi, ttl_lo] = ttl_seconds.to_be_bytes();
    [
        BVLL_TYPE_BIP,
        BVLC_REGISTER_FOREIGN_DEVICE,
        0x00,
        0x06,
        ttl_hi,
        ttl_lo,
    ]
}

/// BACnet/IPv4 port over a UDP socket.
pub struct BipPort {
    config: BipConfig,
    socket: Option<UdpSocket>,
    lease: Option<ForeignDeviceLease>,
}

impl BipPort {
    pub fn new(config: BipConfig) -> Self {
        Self {
            config,
            socket: None,
            lease: None,
        }
    }

    /// Returns true while the socket is open.
    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    /// The bound socket address while open.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// The foreign device lease, if registered with a BBMD.
    pub fn lease(&self) -> Option<&ForeignDeviceLease> {
        self.lease.as_ref()
    }

    fn open_socket(&self) -> PortResult<UdpSocket> {
        let addr = SocketAddrV4::new(self.config.bind_address, self.config.udp_port);
        let io = |e| PortError::io(PortVariant::Bip, e);
        let socket = UdpSocket::bind(addr).map_err(io)?;
        socket.set_nonblocking(true).map_err(io)?;
        socket.set_broadcast(true).map_err(io)?;
        Ok(socket)
    }

    /// Sends a registration to the configured BBMD.
    ///
    /// A failed send is logged and retried at the next renewal.
    fn register_with_bbmd(&self) {
        let (Some(socket), Some(bbmd)) = (&self.socket, self.config.bbmd_address) else {
            return;
        };
        let frame = encode_register_foreign_device(self.config.fd_ttl_seconds);
        match socket.send_to(&frame, bbmd) {
            Ok(_) => debug!(
                "Registered as foreign device with {} (ttl {}s)",
                bbmd, self.config.fd_ttl_seconds
            ),
            Err(e) => warn!("Foreign device registration with {} failed: {}", bbmd, e),
        }
    }
}

impl DatalinkPort for BipPort {
    fn variant(&self) -> PortVariant {
        PortVariant::Bip
    }

    #[instrument(skip(self), fields(port = "bip"))]
    fn init(&mut self) -> PortResult<()> {
        if self.socket.is_some() {
            return Ok(());
        }
        let socket = self.open_socket()?;
        info!(
            "BACnet/IPv4 port open on {}",
            socket
                .local_addr()
                .map(|a| a.to_string())
                .unwrap_or_default()
        );
        self.socket = Some(socket);

        if self.config.bbmd_address.is_some() {
            self.register_with_bbmd();
            self.lease = Some(ForeignDeviceLease::new(self.config.fd_ttl_seconds));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(port = "bip"))]
    fn deinit(&mut self) -> PortResult<()> {
        self.lease = None;
        if self.socket.take().is_some() {
            info!("BACnet/IPv4 port closed");
        }
        Ok(())
    }

    fn task(&mut self, elapsed_seconds: u32) {
        let renew = self
            .lease
            .as_mut()
            .is_some_and(|lease| lease.tick(elapsed_seconds));
        if renew {
            self.register_with_bbmd();
        }
    }
}
