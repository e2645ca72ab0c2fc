//! Sequence storage: four trigger tracks and two pitch lanes.

use crate::track::{Bank, StepIndex, TrackId, STEPS, TRACKS};

/// Storage slots per track (four overlapping 32-step banks).
pub const SLOTS: usize = 128;

/// Per-step trigger and pitch storage for all four tracks.
///
/// Red and Blue additionally store the pitch increment that was live
/// when the step was recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    triggers: [[bool; SLOTS]; TRACKS],
    pitches: [[u16; SLOTS]; 2],
}

impl Default for Pattern {
    fn default() -> Self {
        Self::new()
    }
}

impl Pattern {
    pub const fn new() -> Self {
        Self {
            triggers: [[false; SLOTS]; TRACKS],
            pitches: [[0; SLOTS]; 2],
        }
    }

    /// Is `track` set at `step` within `bank`?
    #[inline]
    pub fn trigger(&self, track: TrackId, bank: Bank, step: StepIndex) -> bool {
        self.triggers[track.index()][bank.slot(step)]
    }

    /// Stored pitch of a melodic track at `step`, or `None` for percussion.
    #[inline]
    pub fn pitch(&self, track: TrackId, bank: Bank, step: StepIndex) -> Option<u16> {
        let lane = track.melodic_index()?;
        Some(self.pitches[lane][bank.slot(step)])
    }

    /// Record a hit. `pitch` is ignored on trigger-only tracks.
    pub fn write(&mut self, track: TrackId, bank: Bank, step: StepIndex, pitch: u16) {
        let slot = bank.slot(step);
        self.triggers[track.index()][slot] = true;
        if let Some(lane) = track.melodic_index() {
            self.pitches[lane][slot] = pitch;
        }
    }

    /// Clear the 32 slots of `bank` on every track. Pitches are left in place;
    /// they are only read where a trigger is set.
    pub fn clear_bank(&mut self, bank: Bank) {
        let start = bank.offset() as usize;
        for lane in self.triggers.iter_mut() {
            lane[start..start + STEPS].fill(false);
        }
    }

    /// Number of set triggers in `bank` across all tracks.
    pub fn hits_in_bank(&self, bank: Bank) -> usize {
        let start = bank.offset() as usize;
        self.triggers
            .iter()
            .map(|lane| lane[start..start + STEPS].iter().filter(|&&t| t).count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_sets_trigger_and_pitch() {
        let mut p = Pattern::new();
        let step = StepIndex::new(5);
        p.write(TrackId::Red, Bank::C, step, 300);
        assert!(p.trigger(TrackId::Red, Bank::C, step));
        assert_eq!(p.pitch(TrackId::Red, Bank::C, step), Some(300));
        assert!(!p.trigger(TrackId::Red, Bank::A, step));
    }

    #[test]
    fn percussion_has_no_pitch() {
        let mut p = Pattern::new();
        p.write(TrackId::Green, Bank::A, StepIndex::FIRST, 999);
        assert_eq!(p.pitch(TrackId::Green, Bank::A, StepIndex::FIRST), None);
    }

    #[test]
    fn clear_bank_leaves_other_banks() {
        let mut p = Pattern::new();
        for track in TrackId::ALL {
            p.write(track, Bank::C, StepIndex::new(3), 1);
            p.write(track, Bank::D, StepIndex::new(3), 1);
        }
        p.clear_bank(Bank::C);
        assert_eq!(p.hits_in_bank(Bank::C), 0);
        assert_eq!(p.hits_in_bank(Bank::D), 4);
    }

    #[test]
    fn banks_a_and_b_share_one_slot() {
        let mut p = Pattern::new();
        p.write(TrackId::Yellow, Bank::A, StepIndex::LAST, 0);
        assert!(p.trigger(TrackId::Yellow, Bank::B, StepIndex::FIRST));
    }
}
