use serde::Serialize;

/// Host channel state, as seen by the Local technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    Down,
    Reserved,
    OffHook,
    Dialing,
    Ring,
    Ringing,
    Up,
    Busy,
}

impl ChannelState {
    /// Only a channel that has not started signalling may be called.
    pub fn can_place_call(self) -> bool {
        matches!(self, Self::Down | Self::Reserved)
    }
}

/// Device state reported for a `exten@context` device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    Unknown,
    NotInUse,
    InUse,
    Invalid,
}

/// Reason passed with a soft hangup request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoftHangupCause {
    Device,
    AppUnload,
    Explicit,
}

/// Which endpoint of a pair an operation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Returned to the requester; faces the outer dial.
    Owner,
    /// Runs the dialplan.
    Chan,
}

impl Side {
    pub fn peer(self) -> Self {
        match self {
            Self::Owner => Self::Chan,
            Self::Chan => Self::Owner,
        }
    }
}

/// Lifecycle phase of a local pair.
///
/// State transitions:
/// ```text
/// fresh → dialplan_launched → optimized
///   ↓            ↓
///  torn  ←───────┘
/// ```
/// `Optimized` is terminal: a masqueraded pair never leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Fresh,
    DialplanLaunched,
    Optimized,
    Torn,
}

impl Phase {
    pub fn dialplan_launched(self) -> bool {
        matches!(self, Self::DialplanLaunched | Self::Optimized)
    }

    pub fn is_masqueraded(self) -> bool {
        matches!(self, Self::Optimized)
    }

    /// The chan-side left. Clears the launched marker but keeps `Optimized`.
    pub fn chan_departed(self) -> Self {
        match self {
            Self::Optimized => Self::Optimized,
            _ => Self::Torn,
        }
    }
}

/// Race cell between in-flight relays and teardown.
///
/// ```text
/// none ⇄ detected{n} → cancelled{n} → (last relay destroys)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Glare {
    None,
    Detected { relays: u32 },
    Cancelled { relays: u32 },
}

/// What a relay must do when it leaves the glare cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlareExit {
    /// Normal completion.
    Continue,
    /// Teardown handed over destruction; this relay is the last one out.
    Destroy,
    /// Teardown cancelled the queue but other relays are still in flight.
    Abandon,
}

impl Glare {
    pub fn in_flight(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Detected { relays } | Self::Cancelled { relays } => relays,
        }
    }

    pub fn is_cancelled(self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// A relay starts competing for the peer lock.
    pub fn enter(&mut self) {
        *self = match *self {
            Self::None => Self::Detected { relays: 1 },
            Self::Detected { relays } => Self::Detected { relays: relays + 1 },
            Self::Cancelled { relays } => Self::Cancelled { relays: relays + 1 },
        };
    }

    /// A relay is done with the record.
    pub fn leave(&mut self) -> GlareExit {
        match *self {
            Self::None => GlareExit::Continue,
            Self::Detected { relays } => {
                *self = if relays <= 1 { Self::None } else { Self::Detected { relays: relays - 1 } };
                GlareExit::Continue
            }
            Self::Cancelled { relays: 0 } => GlareExit::Abandon,
            Self::Cancelled { relays: 1 } => {
                *self = Self::Cancelled { relays: 0 };
                GlareExit::Destroy
            }
            Self::Cancelled { relays } => {
                *self = Self::Cancelled { relays: relays - 1 };
                GlareExit::Abandon
            }
        }
    }

    /// Teardown found both endpoints gone. Returns `true` when destruction
    /// must be deferred to the relays still in flight.
    pub fn cancel(&mut self) -> bool {
        match *self {
            Self::Detected { relays } if relays > 0 => {
                *self = Self::Cancelled { relays };
                true
            }
            _ => false,
        }
    }
}
