//! UDP trigger socket: each datagram names a script to run.
//!
//! The socket only exists when an instance id was given; the port is
//! [`BASE_PORT`] plus that id. Nothing is ever sent back.

use anyhow::{Context as _, Result};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, info};

pub const BASE_PORT: u16 = 40000;

/// Largest datagram read in full; longer ones are truncated by the socket.
const MAX_DATAGRAM: usize = 4096;

/// Port for instance `id`, or `None` if it falls outside the port range.
pub fn trigger_port(id: u16) -> Option<u16> {
    BASE_PORT.checked_add(id)
}

/// The script name carried by a datagram: everything before the first newline.
///
/// Validation of the name is left to the store.
pub fn parse_trigger(datagram: &[u8]) -> String {
    let end = datagram
        .iter()
        .position(|&b| b == b'\n')
        .unwrap_or(datagram.len());
    String::from_utf8_lossy(&datagram[..end]).into_owned()
}

pub struct TriggerListener {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl TriggerListener {
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("Failed to bind trigger socket on {addr}"))?;
        info!(addr = %addr, "listening for triggers");
        Ok(Self {
            socket,
            buf: vec![0; MAX_DATAGRAM],
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Wait for the next datagram and return its payload.
    pub async fn recv(&mut self) -> std::io::Result<Vec<u8>> {
        let (n, from) = self.socket.recv_from(&mut self.buf).await?;
        debug!(from = %from, len = n, "datagram");
        Ok(self.buf[..n].to_vec())
    }
}
