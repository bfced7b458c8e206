use async_trait::async_trait;
use smartpower_protocol::MacAddress;
use tokio::net::UdpSocket;
use tracing::info;

use crate::error::Result;

pub const MAGIC_PACKET_LEN: usize = 6 + 16 * 6;

/// Six `0xFF` bytes followed by the MAC repeated sixteen times.
pub fn magic_packet(mac: MacAddress) -> [u8; MAGIC_PACKET_LEN] {
    let mut packet = [0xFFu8; MAGIC_PACKET_LEN];
    for chunk in packet[6..].chunks_exact_mut(6) {
        chunk.copy_from_slice(&mac.octets());
    }
    packet
}

/// Delivers a wake request to the target machine.
#[async_trait]
pub trait WakeSender: Send + Sync {
    async fn wake(&self, mac: MacAddress) -> Result<()>;
}

/// Broadcasts the magic packet over UDP.
pub struct UdpWakeSender {
    broadcast_addr: String,
}

impl UdpWakeSender {
    pub fn new(broadcast_addr: impl Into<String>) -> Self {
        Self {
            broadcast_addr: broadcast_addr.into(),
        }
    }
}

#[async_trait]
impl WakeSender for UdpWakeSender {
    async fn wake(&self, mac: MacAddress) -> Result<()> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.set_broadcast(true)?;
        let sent = socket
            .send_to(&magic_packet(mac), self.broadcast_addr.as_str())
            .await?;
        info!(%mac, to = %self.broadcast_addr, bytes = sent, "magic packet sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_layout() {
        let mac: MacAddress = "01:23:45:67:89:AB".parse().unwrap();
        let packet = magic_packet(mac);
        assert_eq!(packet.len(), 102);
        assert!(packet[..6].iter().all(|&b| b == 0xFF));
        for rep in packet[6..].chunks(6) {
            assert_eq!(rep, &[0x01, 0x23, 0x45, 0x67, 0x89, 0xAB]);
        }
    }

    #[tokio::test]
    async fn udp_sender_delivers_packet() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = receiver.local_addr().unwrap();
        let sender = UdpWakeSender::new(addr.to_string());
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();

        sender.wake(mac).await.unwrap();

        let mut buf = [0u8; 256];
        let (n, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &magic_packet(mac)[..]);
    }
}
