// ── Wake-on-LAN codec and transmission ──
//
// The magic packet is 6 bytes of 0xFF followed by the target MAC
// repeated 16 times (102 bytes total), sent as one UDP datagram to the
// broadcast address. The protocol is unacknowledged: a successful send
// only means the local stack accepted the write.

use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::debug;

use crate::error::CoreError;
use crate::model::MacAddress;

/// Number of times the MAC is repeated after the sync stream.
const MAC_REPETITIONS: usize = 16;

/// Total magic-packet length: 6 sync bytes + 16 × 6 MAC octets.
pub const MAGIC_PACKET_LEN: usize = 6 + MAC_REPETITIONS * 6;

/// Encode a MAC address into the 102-byte WoL magic packet.
pub fn magic_packet(mac: &MacAddress) -> [u8; MAGIC_PACKET_LEN] {
    let mut packet = [0xFFu8; MAGIC_PACKET_LEN];
    let octets = mac.octets();
    for repetition in packet[6..].chunks_exact_mut(6) {
        repetition.copy_from_slice(&octets);
    }
    packet
}

/// Connectionless payload transmitter. The engine only depends on this
/// seam; tests substitute an in-memory fake.
#[async_trait]
pub trait PacketSender: Send + Sync {
    /// Best-effort single write. No retry, no acknowledgment.
    async fn send(&self, payload: &[u8]) -> Result<(), CoreError>;
}

/// Sends payloads as single UDP datagrams to a broadcast address.
pub struct UdpBroadcastSender {
    target: SocketAddr,
}

impl UdpBroadcastSender {
    pub fn new(broadcast: IpAddr, port: u16) -> Self {
        Self { target: SocketAddr::new(broadcast, port) }
    }
}

#[async_trait]
impl PacketSender for UdpBroadcastSender {
    async fn send(&self, payload: &[u8]) -> Result<(), CoreError> {
        // The socket is scoped to this call and dropped on every exit
        // path, including write failure.
        let socket = UdpSocket::bind(("0.0.0.0", 0))
            .await
            .map_err(|e| CoreError::Transmission { reason: e.to_string() })?;
        socket
            .set_broadcast(true)
            .map_err(|e| CoreError::Transmission { reason: e.to_string() })?;
        socket
            .send_to(payload, self.target)
            .await
            .map_err(|e| CoreError::Transmission { reason: e.to_string() })?;

        debug!(target = %self.target, len = payload.len(), "magic packet sent");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn packet_is_102_bytes() {
        let mac = MacAddress::parse("aa:bb:cc:dd:ee:ff").unwrap();
        assert_eq!(magic_packet(&mac).len(), MAGIC_PACKET_LEN);
    }

    #[test]
    fn packet_starts_with_sync_stream() {
        let mac = MacAddress::parse("11:22:33:44:55:66").unwrap();
        let packet = magic_packet(&mac);
        assert_eq!(&packet[..6], &[0xFF; 6]);
    }

    #[test]
    fn packet_repeats_mac_sixteen_times() {
        let mac = MacAddress::parse("11:22:33:44:55:66").unwrap();
        let packet = magic_packet(&mac);
        let octets = mac.octets();
        for rep in 0..16 {
            let start = 6 + rep * 6;
            assert_eq!(&packet[start..start + 6], &octets, "repetition {rep}");
        }
    }

    #[test]
    fn packet_layout_for_distinct_octets() {
        let mac = MacAddress::parse("01:02:03:04:05:06").unwrap();
        let packet = magic_packet(&mac);
        // Sync stream must not bleed into the first repetition.
        assert_eq!(packet[5], 0xFF);
        assert_eq!(packet[6], 0x01);
        assert_eq!(packet[101], 0x06);
    }
}
