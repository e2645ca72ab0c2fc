//! Transport and mode enumerations.
//!
//! Each enum has a `to_u8`/`from_u8` pair so it can live in a single
//! atomic register shared between the tick and the control loop.

/// Transport state. Recording implies playing, so "recording while
/// stopped" has no representation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Transport {
    #[default]
    Stopped,
    Playing,
    Recording,
}

impl Transport {
    pub const fn is_playing(self) -> bool {
        !matches!(self, Transport::Stopped)
    }

    pub const fn is_recording(self) -> bool {
        matches!(self, Transport::Recording)
    }

    /// Play toggle: stopping always drops recording.
    pub const fn toggle_play(self) -> Self {
        match self {
            Transport::Stopped => Transport::Playing,
            Transport::Playing | Transport::Recording => Transport::Stopped,
        }
    }

    /// Record toggle: arming recording always starts playback.
    pub const fn toggle_record(self) -> Self {
        match self {
            Transport::Recording => Transport::Playing,
            Transport::Stopped | Transport::Playing => Transport::Recording,
        }
    }

    /// Force playback on, keeping recording if it is engaged.
    pub const fn force_play(self) -> Self {
        match self {
            Transport::Stopped => Transport::Playing,
            other => other,
        }
    }

    pub const fn to_u8(self) -> u8 {
        match self {
            Transport::Stopped => 0,
            Transport::Playing => 1,
            Transport::Recording => 2,
        }
    }

    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Transport::Playing,
            2 => Transport::Recording,
            _ => Transport::Stopped,
        }
    }
}

/// Table read direction for the four track voices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    pub const fn toggle(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }

    pub const fn to_u8(self) -> u8 {
        match self {
            Direction::Forward => 0,
            Direction::Reverse => 1,
        }
    }

    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Direction::Reverse,
            _ => Direction::Forward,
        }
    }
}

/// Output mixing mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MixMode {
    /// Voices plus click, halved and recentred.
    #[default]
    Direct,
    /// Voices XOR-blended with the noise reader, click/noise texture on top.
    Blend,
}

impl MixMode {
    pub const fn toggle(self) -> Self {
        match self {
            MixMode::Direct => MixMode::Blend,
            MixMode::Blend => MixMode::Direct,
        }
    }

    pub const fn to_u8(self) -> u8 {
        match self {
            MixMode::Direct => 0,
            MixMode::Blend => 1,
        }
    }

    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => MixMode::Blend,
            _ => MixMode::Direct,
        }
    }
}

/// Where step advances come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClockSource {
    /// Step length compared against the tick counter.
    #[default]
    Internal,
    /// Steps advanced by external pulses (MIDI clock).
    External,
}

impl ClockSource {
    pub const fn to_u8(self) -> u8 {
        match self {
            ClockSource::Internal => 0,
            ClockSource::External => 1,
        }
    }

    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => ClockSource::External,
            _ => ClockSource::Internal,
        }
    }
}
