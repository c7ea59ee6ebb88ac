use thiserror::Error;

use super::state::ChannelState;

/// Errors surfaced by the Local channel technology.
///
/// Relay glare and a vanished peer are resolved internally and never show up here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocalError {
    #[error("out of memory")]
    OutOfMemory,

    #[error("host refused to allocate {0}")]
    HostAllocFailed(String),

    #[error("invalid destination {destination:?}: {reason}")]
    InvalidDestination { destination: String, reason: String },

    #[error("channel {name} is {state:?}, expected down or reserved")]
    StateViolation { name: String, state: ChannelState },

    #[error("no such extension/context {exten}@{context}")]
    ExtensionUnreachable { exten: String, context: String },

    #[error("unable to launch dialplan on {0}")]
    DialplanFailed(String),

    #[error("{0} is not a local endpoint")]
    NotLocal(String),

    #[error("peer endpoint of {0} is gone")]
    EndpointGone(String),

    #[error("fixup: {0} is not part of this local pair")]
    FixupMismatch(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Failures reported by the host runtime.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("out of memory")]
    OutOfMemory,

    #[error("allocation refused: {0}")]
    Refused(String),

    #[error("masquerade already pending on {0}")]
    MasqueradePending(String),

    #[error("{0}")]
    Other(String),
}

impl From<HostError> for LocalError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::OutOfMemory => LocalError::OutOfMemory,
            other => LocalError::HostAllocFailed(other.to_string()),
        }
    }
}
