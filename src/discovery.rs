//! Hub discovery via UDP broadcast.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use log::{debug, info};

use crate::errors::Error;
use crate::runtime::{self, AsyncUdpSocket, Instant, UdpSocket};

type Result<T> = std::result::Result<T, Error>;

/// Port the hub listens on for locate requests.
pub const DISCOVERY_PORT: u16 = 1990;

const LOCATE_REQUEST: &[u8] = b"YEELINK-LOCATE\r\n";

/// Find the hub on the local network using UDP broadcast.
///
/// Sends a single locate datagram and returns the address of the first
/// device that answers. Fails with [`Error::Discovery`] if nothing answers
/// within `discovery_timeout`.
///
/// # Examples
///
/// ```ignore
/// use std::time::Duration;
/// use sunflower_lights_rs::discover_hub;
///
/// let ip = discover_hub(1990, Duration::from_secs(3)).await?;
/// println!("hub at {ip}");
/// ```
pub async fn discover_hub(port: u16, discovery_timeout: Duration) -> Result<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(|e| Error::socket("bind", e))?;

    socket
        .set_broadcast(true)
        .map_err(|e| Error::socket("set_broadcast", e))?;

    socket
        .send_to(LOCATE_REQUEST, &format!("255.255.255.255:{port}"))
        .await
        .map_err(|e| Error::socket("send_to", e))?;

    let start = Instant::now();
    let mut buffer = [0u8; 1024];

    while let Some(remaining) = discovery_timeout.checked_sub(start.elapsed()) {
        match runtime::timeout(remaining, socket.recv_from(&mut buffer)).await {
            Ok(Ok((size, SocketAddr::V4(addr)))) if size > 0 => {
                info!("hub answered discovery from {}", addr.ip());
                return Ok(*addr.ip());
            }
            Ok(Ok((_, addr))) => debug!("ignoring discovery reply from {addr}"),
            Ok(Err(e)) => debug!("discovery receive failed: {e}"),
            Err(_) => break,
        }
    }

    Err(Error::Discovery {
        timeout: discovery_timeout,
    })
}
