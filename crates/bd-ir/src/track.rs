//! Track, bank and step identifiers.

/// Number of steps in one bar.
pub const STEPS: usize = 32;

/// Number of sequencer tracks.
pub const TRACKS: usize = 4;

/// One of the four pad tracks, named after the pad color.
///
/// Red and Blue are melodic: they store a pitch per step alongside the
/// trigger. Green and Yellow are trigger-only percussion tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackId {
    Red,
    Blue,
    Green,
    Yellow,
}

impl TrackId {
    pub const ALL: [TrackId; TRACKS] = [TrackId::Red, TrackId::Blue, TrackId::Green, TrackId::Yellow];

    /// Position of the track in per-track arrays.
    pub const fn index(self) -> usize {
        match self {
            TrackId::Red => 0,
            TrackId::Blue => 1,
            TrackId::Green => 2,
            TrackId::Yellow => 3,
        }
    }

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(TrackId::Red),
            1 => Some(TrackId::Blue),
            2 => Some(TrackId::Green),
            3 => Some(TrackId::Yellow),
            _ => None,
        }
    }

    /// Lower-case pad color.
    pub const fn name(self) -> &'static str {
        match self {
            TrackId::Red => "red",
            TrackId::Blue => "blue",
            TrackId::Green => "green",
            TrackId::Yellow => "yellow",
        }
    }

    /// Does this track carry a stored pitch per step?
    pub const fn is_melodic(self) -> bool {
        matches!(self, TrackId::Red | TrackId::Blue)
    }

    /// Index into the melodic pitch arrays, if the track is melodic.
    pub const fn melodic_index(self) -> Option<usize> {
        match self {
            TrackId::Red => Some(0),
            TrackId::Blue => Some(1),
            _ => None,
        }
    }
}

/// One of four 32-step windows inside each track's 128-slot storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Bank {
    #[default]
    A,
    B,
    C,
    D,
}

impl Bank {
    pub const ALL: [Bank; 4] = [Bank::A, Bank::B, Bank::C, Bank::D];

    /// Slot offset added to the step index.
    ///
    /// Bank B starts at 31, so its first slot is shared with the last slot
    /// of bank A.
    pub const fn offset(self) -> u8 {
        match self {
            Bank::A => 0,
            Bank::B => 31,
            Bank::C => 63,
            Bank::D => 95,
        }
    }

    /// Storage slot for `step` within this bank. Always below 128.
    pub const fn slot(self, step: StepIndex) -> usize {
        self.offset() as usize + step.get() as usize
    }

    pub const fn to_u8(self) -> u8 {
        match self {
            Bank::A => 0,
            Bank::B => 1,
            Bank::C => 2,
            Bank::D => 3,
        }
    }

    /// Decode a register value; out-of-range values fall back to bank A.
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Bank::B,
            2 => Bank::C,
            3 => Bank::D,
            _ => Bank::A,
        }
    }
}

/// Playhead position within a 32-step bar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StepIndex(u8);

impl StepIndex {
    pub const FIRST: StepIndex = StepIndex(0);
    /// Parking position while the transport is stopped, so the first
    /// advance after play lands on step 0.
    pub const LAST: StepIndex = StepIndex(STEPS as u8 - 1);

    /// Wraps `value` into the bar.
    pub const fn new(value: u8) -> Self {
        Self(value % STEPS as u8)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// The following step, wrapping 31 → 0.
    pub const fn next(self) -> Self {
        Self::new(self.0 + 1)
    }

    /// Step lies on a quarter-bar beat (every 4 steps).
    pub const fn is_beat(self) -> bool {
        self.0 % 4 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_bank_slot_stays_in_storage() {
        for bank in Bank::ALL {
            for step in 0..STEPS as u8 {
                let slot = bank.slot(StepIndex::new(step));
                assert!(slot < 128, "bank {:?} step {} -> slot {}", bank, step, slot);
            }
        }
    }

    #[test]
    fn step_index_wraps() {
        assert_eq!(StepIndex::LAST.next(), StepIndex::FIRST);
        assert_eq!(StepIndex::new(33).get(), 1);
    }

    #[test]
    fn bank_register_roundtrip() {
        for bank in Bank::ALL {
            assert_eq!(Bank::from_u8(bank.to_u8()), bank);
        }
        assert_eq!(Bank::from_u8(200), Bank::A);
    }

    #[test]
    fn melodic_tracks() {
        assert!(TrackId::Red.is_melodic());
        assert!(TrackId::Blue.is_melodic());
        assert!(!TrackId::Green.is_melodic());
        assert_eq!(TrackId::Yellow.melodic_index(), None);
        for track in TrackId::ALL {
            assert_eq!(TrackId::from_index(track.index()), Some(track));
        }
    }
}
