use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::string::FromUtf8Error;
use std::time::Duration;

/// All error types that can occur when talking to the hub or managing its lights.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No hub answered the locate broadcast in time.
    #[error("no hub responded to discovery within {timeout:?}")]
    Discovery { timeout: Duration },

    /// The hub did not acknowledge a heartbeat.
    #[error("hub {ip} is unreachable: {reason}")]
    HubUnreachable { ip: Ipv4Addr, reason: String },

    /// The hub sent a reply that could not be understood.
    #[error("malformed hub reply: {0}")]
    Protocol(String),

    /// A network socket operation failed while communicating with the hub.
    #[error("socket {action} error: {err:?}")]
    Socket { action: String, err: std::io::Error },

    /// The hub reply contained invalid UTF-8.
    #[error("utf8 decoding error: {0:?}")]
    Utf8Decode(FromUtf8Error),

    /// Failed to serialize data to JSON.
    #[error("failed to dump json: {0:?}")]
    JsonDump(serde_json::Error),

    /// Failed to deserialize JSON data.
    #[error("failed to load json: {0:?}")]
    JsonLoad(serde_json::Error),

    /// Reading or writing the persisted configuration failed.
    #[error("config file {path:?}: {err:?}")]
    Persist { path: PathBuf, err: std::io::Error },

    /// No hub address is known yet.
    #[error("hub address unknown; scan or set the IP first")]
    NoHub,

    /// The light id is not in the registry.
    #[error("light {0} not found")]
    LightNotFound(String),

    /// The preset name is not stored.
    #[error("preset {0:?} not found")]
    PresetNotFound(String),

    /// Preset names must contain something other than whitespace.
    #[error("invalid preset name {0:?}")]
    InvalidPresetName(String),

    /// Attempted to apply a state request with no attributes set.
    #[error("invalid state request; no attributes set")]
    EmptyRequest,

    /// Some lights of a preset could not be set.
    #[error(
        "preset {preset:?} partially applied; {} light(s) failed: {}",
        .failures.len(),
        describe_failures(.failures)
    )]
    Activation {
        preset: String,
        failures: Vec<LightFailure>,
    },
}

/// One light that failed during a batched operation.
#[derive(Debug)]
pub struct LightFailure {
    pub id: String,
    pub error: Error,
}

impl Error {
    /// Create a new socket error
    pub fn socket(action: &str, err: std::io::Error) -> Self {
        Error::Socket {
            action: action.to_string(),
            err,
        }
    }

    /// Create a new hub unreachable error
    pub fn unreachable(ip: &Ipv4Addr, reason: &str) -> Self {
        Error::HubUnreachable {
            ip: *ip,
            reason: reason.to_string(),
        }
    }

    /// Create a new persistence error
    pub fn persist(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Error::Persist {
            path: path.into(),
            err,
        }
    }

    /// Whether the caller may reasonably retry the operation later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Discovery { .. } | Error::HubUnreachable { .. } | Error::Socket { .. }
        )
    }
}

fn describe_failures(failures: &[LightFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.id, f.error))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
