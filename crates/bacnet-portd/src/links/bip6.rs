//! BACnet/IPv6 datalink port.

use std::net::{SocketAddr, SocketAddrV6, UdpSocket};

use bacnet_port::{DatalinkPort, PortError, PortResult, PortVariant};
use tracing::{debug, info, instrument, warn};

use super::lease::ForeignDeviceLease;
use crate::config::Bip6Config;

/// BVLL type for BACnet/IPv6
const BVLL_TYPE_BIP6: u8 = 0x82;

/// BVLC6 function: Register-Foreign-Device
const BVLC6_REGISTER_FOREIGN_DEVICE: u8 = 0x09;

/// Encodes a BVLC6 Register-Foreign-Device message.
///
/// Only the low three octets of `vmac` are carried.
pub fn encode_register_foreign_device(vmac: u32, ttl_seconds: u16) -> [u8; 9] {
    let [_, v0, v1, v2] = vmac.to_be_bytes();
    let [ttl_hi, ttl_lo] = ttl_seconds.to_be_bytes();
    [
        BVLL_TYPE_BIP6,
        BVLC6_REGISTER_FOREIGN_DEVICE,
        0x00,
        0x09,
        v0,
        v1,
        v2,
        ttl_hi,
        ttl_lo,
    ]
}

/// BACnet/IPv6 port over a UDP socket.
pub struct Bip6Port {
    config: Bip6Config,
    socket: Option<UdpSocket>,
    lease: Option<ForeignDeviceLease>,
}

impl Bip6Port {
    pub fn new(config: Bip6Config) -> Self {
        Self {
            config,
            socket: None,
            lease: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    pub fn lease(&self) -> Option<&ForeignDeviceLease> {
        self.lease.as_ref()
    }

    fn register_with_bbmd(&self) {
        let (Some(socket), Some(bbmd)) = (&self.socket, self.config.bbmd_address) else {
            return;
        };
        let frame = encode_register_foreign_device(self.config.vmac, self.config.fd_ttl_seconds);
        match socket.send_to(&frame, bbmd) {
            Ok(_) => debug!("Registered as foreign device with {}", bbmd),
            Err(e) => warn!("Foreign device registration with {} failed: {}", bbmd, e),
        }
    }
}

impl DatalinkPort for Bip6Port {
    fn variant(&self) -> PortVariant {
        PortVariant::Bip6
    }

    #[instrument(skip(self), fields(port = "bip6"))]
    fn init(&mut self) -> PortResult<()> {
        if self.socket.is_some() {
            return Ok(());
        }
        let addr = SocketAddrV6::new(self.config.bind_address, self.config.udp_port, 0, 0);
        let socket = UdpSocket::bind(addr).map_err(|e| PortError::io(PortVariant::Bip6, e))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| PortError::io(PortVariant::Bip6, e))?;
        info!("BACnet/IPv6 port open on {}", addr);
        self.socket = Some(socket);

        if self.config.bbmd_address.is_some() {
            self.register_with_bbmd();
            self.lease = Some(ForeignDeviceLease::new(self.config.fd_ttl_seconds));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(port = "bip6"))]
    fn deinit(&mut self) -> PortResult<()> {
        self.lease = None;
        if self.socket.take().is_some() {
            info!("BACnet/IPv6 port closed");
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;
    use std::time::Duration;

    #[test]
    fn test_encode_register_foreign_device() {
        assert_eq!(
            encode_register_foreign_device(0x0A0B0C, 60),
            [0x82, 0x09, 0x00, 0x09, 0x0A, 0x0B, 0x0C, 0x00, 0x3C]
        );
        // High octet is dropped
        assert_eq!(encode_register_foreign_device(0xFF00_0001, 1)[4..7], [0, 0, 1]);
    }

    #[test]
    fn test_deinit_when_closed() {
        let mut port = Bip6Port::new(Bip6Config::default());
        port.deinit().unwrap();
        assert!(!port.is_open());
    }

    #[test]
    #[ignore = "needs an IPv6 loopback interface; run with --ignored"]
    fn test_foreign_device_registration() {
        let bbmd_socket = UdpSocket::bind((Ipv6Addr::LOCALHOST, 0)).unwrap();
        bbmd_socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let SocketAddr::V6(bbmd_addr) = bbmd_socket.local_addr().unwrap() else {
            unreachable!();
        };

        let config = Bip6Config {
            bind_address: Ipv6Addr::LOCALHOST,
            udp_port: 0,
            vmac: 0x123456,
            bbmd_address: Some(bbmd_addr),
            fd_ttl_seconds: 1,
        };
        let mut port = Bip6Port::new(config);
        port.init().unwrap();
        assert!(port.is_open());

        let expected = encode_register_foreign_device(0x123456, 1);
        let mut buf = [0u8; 16];
        let (len, _) = bbmd_socket.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], &expected);

        port.task(1);
        let (len, _) = bbmd_socket.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], &expected);

        port.deinit().unwrap();
        assert!(port.lease().is_none());
    }
}
