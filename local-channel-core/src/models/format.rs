use std::fmt;
use std::ops::{BitAnd, BitOr};

use serde::{Deserialize, Serialize};

/// Bitmask of media formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FormatMask(u64);

impl FormatMask {
    pub const EMPTY: Self = Self(0);
    pub const G723_1: Self = Self(1 << 0);
    pub const GSM: Self = Self(1 << 1);
    pub const ULAW: Self = Self(1 << 2);
    pub const ALAW: Self = Self(1 << 3);
    pub const G726_AAL2: Self = Self(1 << 4);
    pub const ADPCM: Self = Self(1 << 5);
    pub const SLINEAR: Self = Self(1 << 6);
    pub const LPC10: Self = Self(1 << 7);
    pub const G729A: Self = Self(1 << 8);
    pub const SPEEX: Self = Self(1 << 9);
    pub const ILBC: Self = Self(1 << 10);
    pub const G726: Self = Self(1 << 11);
    pub const G722: Self = Self(1 << 12);
    pub const SIREN7: Self = Self(1 << 13);
    pub const SIREN14: Self = Self(1 << 14);
    pub const SLINEAR16: Self = Self(1 << 15);
    pub const AUDIO_MASK: Self = Self(0xFFFF);

    pub const H261: Self = Self(1 << 18);
    pub const H263: Self = Self(1 << 19);
    pub const H263_PLUS: Self = Self(1 << 20);
    pub const H264: Self = Self(1 << 21);
    pub const VIDEO_MASK: Self = Self(0xFF << 18);

    /// Preference order used to pick a single working codec, best first.
    const PREFERENCE: [Self; 16] = [
        Self::ULAW,
        Self::ALAW,
        Self::G722,
        Self::SIREN14,
        Self::SIREN7,
        Self::G726,
        Self::G726_AAL2,
        Self::ADPCM,
        Self::SLINEAR16,
        Self::SLINEAR,
        Self::G729A,
        Self::SPEEX,
        Self::ILBC,
        Self::GSM,
        Self::LPC10,
        Self::G723_1,
    ];

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// The single preferred audio codec in this mask, if any.
    pub fn best(self) -> Option<Self> {
        Self::PREFERENCE.iter().copied().find(|codec| self.intersects(*codec))
    }
}

impl BitOr for FormatMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for FormatMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for FormatMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// The formats a channel negotiates with its technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelFormats {
    pub native: FormatMask,
    pub read: FormatMask,
    pub write: FormatMask,
    pub raw_read: FormatMask,
    pub raw_write: FormatMask,
}

impl ChannelFormats {
    /// Every slot pinned to one codec.
    pub fn uniform(format: FormatMask) -> Self {
        Self {
            native: format,
            read: format,
            write: format,
            raw_read: format,
            raw_write: format,
        }
    }
}
