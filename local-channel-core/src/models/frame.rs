use super::format::FormatMask;

/// Control frame subclasses the Local technology cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Hangup,
    Ring,
    Ringing,
    Answer,
    Busy,
    Congestion,
    Progress,
    Proceeding,
    Hold,
    Unhold,
    /// Any other condition, carried through untouched.
    Other(i32),
}

/// A media payload with its codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub format: FormatMask,
    pub payload: Vec<u8>,
}

/// A frame travelling between the two endpoints of a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Voice(Media),
    Video(Media),
    Control { kind: ControlKind, data: Vec<u8> },
    DtmfBegin(char),
    DtmfEnd { digit: char, duration_ms: u32 },
    Text(String),
    Html { subclass: i32, data: Vec<u8> },
    Null,
}

impl Frame {
    pub fn voice(format: FormatMask, payload: impl Into<Vec<u8>>) -> Self {
        Self::Voice(Media { format, payload: payload.into() })
    }

    pub fn control(kind: ControlKind) -> Self {
        Self::Control { kind, data: Vec::new() }
    }

    /// Hangup control frame carrying the cause code (big-endian).
    pub fn hangup(cause: u32) -> Self {
        Self::Control {
            kind: ControlKind::Hangup,
            data: cause.to_be_bytes().to_vec(),
        }
    }

    pub fn is_media(&self) -> bool {
        matches!(self, Self::Voice(_) | Self::Video(_))
    }

    pub fn is_control(&self, expected: ControlKind) -> bool {
        matches!(self, Self::Control { kind, .. } if *kind == expected)
    }

    pub fn hangup_cause(&self) -> Option<u32> {
        match self {
            Self::Control { kind: ControlKind::Hangup, data } if data.len() == 4 => {
                Some(u32::from_be_bytes([data[0], data[1], data[2], data[3]]))
            }
            Self::Control { kind: ControlKind::Hangup, .. } => Some(0),
            _ => None,
        }
    }

    /// Short name for log lines.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Voice(_) => "voice",
            Self::Video(_) => "video",
            Self::Control { .. } => "control",
            Self::DtmfBegin(_) => "dtmf-begin",
            Self::DtmfEnd { .. } => "dtmf-end",
            Self::Text(_) => "text",
            Self::Html { .. } => "html",
            Self::Null => "null",
        }
    }
}
