//! Network client for the hub.

use std::net::Ipv4Addr;
use std::time::Duration;

use log::{debug, warn};

use crate::discovery::{DISCOVERY_PORT, discover_hub};
use crate::errors::Error;
use crate::history::{HistorySummary, MessageHistory, MessageType};
use crate::protocol::{Command, Control, LightReport, parse_light_list};
use crate::runtime::{self, AsyncTcpStream, Mutex, TcpStream};
use crate::transport::HubTransport;

type Result<T> = std::result::Result<T, Error>;

/// Connection settings for a hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubOptions {
    /// TCP port commands are sent to.
    pub port: u16,
    /// UDP port locate requests are broadcast to.
    pub discovery_port: u16,
    /// Upper bound for one command round-trip.
    pub command_timeout: Duration,
}

impl Default for HubOptions {
    fn default() -> Self {
        HubOptions {
            port: 10003,
            discovery_port: DISCOVERY_PORT,
            command_timeout: Duration::from_secs(2),
        }
    }
}

/// Talks to the hub over its line protocol.
///
/// All round-trips go through one queue: a command waits for the previous one
/// to finish, so overlapping callers never flood the hub.
///
/// # Example
///
/// ```
/// use sunflower_lights_rs::{Hub, HubOptions};
///
/// let hub = Hub::new(HubOptions::default());
/// assert_eq!(hub.options().port, 10003);
/// ```
#[derive(Debug, Default)]
pub struct Hub {
    options: HubOptions,
    queue: Mutex<()>,
    history: Mutex<MessageHistory>,
}

impl Hub {
    const MAX_REPLY_BYTES: usize = 64 * 1024;

    pub fn new(options: HubOptions) -> Self {
        Hub {
            options,
            queue: Mutex::new(()),
            history: Mutex::new(MessageHistory::new()),
        }
    }

    pub fn options(&self) -> &HubOptions {
        &self.options
    }

    pub async fn history(&self) -> MessageHistory {
        self.history.lock().await.clone()
    }

    pub async fn history_summary(&self) -> HistorySummary {
        self.history.lock().await.summary()
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
    }

    async fn send_command(&self, ip: Ipv4Addr, command: &Command, limit: Duration) -> Result<String> {
        let line = command.encode();
        let _turn = self.queue.lock().await;

        debug!("hub {ip} <- {}", line.trim_end());
        self.history
            .lock()
            .await
            .record(MessageType::Send, command.method(), &line);

        match runtime::timeout(limit, self.round_trip(ip, &line)).await {
            Ok(Ok(reply)) => {
                debug!("hub {ip} -> {}", reply.trim_end());
                self.history
                    .lock()
                    .await
                    .record(MessageType::Receive, command.method(), &reply);
                Ok(reply)
            }
            Ok(Err(e)) => {
                self.history.lock().await.record_error(&e.to_string());
                Err(e)
            }
            Err(timed_out) => {
                let e = Error::socket("receive", timed_out.into());
                self.history.lock().await.record_error(&e.to_string());
                Err(e)
            }
        }
    }

    async fn round_trip(&self, ip: Ipv4Addr, line: &str) -> Result<String> {
        let mut stream = TcpStream::connect(&format!("{}:{}", ip, self.options.port))
            .await
            .map_err(|e| Error::socket("connect", e))?;

        stream
            .write_all(line.as_bytes())
            .await
            .map_err(|e| Error::socket("send", e))?;

        let mut reply = Vec::new();
        let mut buffer = [0u8; 4096];
        loop {
            let read = stream
                .read(&mut buffer)
                .await
                .map_err(|e| Error::socket("receive", e))?;
            if read == 0 {
                break;
            }
            reply.extend_from_slice(&buffer[..read]);
            if reply.contains(&b'\n') || reply.len() >= Self::MAX_REPLY_BYTES {
                break;
            }
        }

        String::from_utf8(reply).map_err(Error::Utf8Decode)
    }
}

impl HubTransport for Hub {
    async fn discover(&self, timeout: Duration) -> Result<Ipv4Addr> {
        discover_hub(self.options.discovery_port, timeout).await
    }

    async fn heartbeat(&self, ip: Ipv4Addr, timeout: Duration) -> Result<()> {
        let command = Command::Heartbeat;
        self.send_command(ip, &command, timeout)
            .await
            .and_then(|reply| command.check_ack(&reply))
            .map_err(|e| {
                warn!("heartbeat to {ip} failed: {e}");
                Error::unreachable(&ip, &e.to_string())
            })
    }

    async fn get_lights(&self, ip: Ipv4Addr) -> Result<Vec<LightReport>> {
        let reply = self
            .send_command(ip, &Command::GetLights, self.options.command_timeout)
            .await?;
        parse_light_list(&reply)
    }

    async fn control(&self, ip: Ipv4Addr, control: Control) -> Result<()> {
        if !control.is_valid() {
            return Err(Error::EmptyRequest);
        }
        let command = Command::from(control);
        let reply = self
            .send_command(ip, &command, self.options.command_timeout)
            .await?;
        command.check_ack(&reply)
    }
}
