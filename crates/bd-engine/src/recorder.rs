//! Live overdub and the hold-to-erase gesture.

use bd_ir::{Bank, Pattern, StepIndex, TrackId, TRACKS};

/// Control-loop iterations record + play must be held to erase a bank.
pub const ERASE_HOLD: u16 = 800;

/// Write this tick's live hits into the pattern at the quantized step.
///
/// Melodic tracks also store the live increment that played the hit.
#[inline]
pub fn overdub(pattern: &mut Pattern, bank: Bank, at: StepIndex, live: &[bool; TRACKS], pitch: [u16; 2]) {
    for track in TrackId::ALL {
        if !live[track.index()] {
            continue;
        }
        let value = track.melodic_index().map_or(0, |lane| pitch[lane]);
        pattern.write(track, bank, at, value);
    }
}

/// Erase gesture state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EraseState {
    /// Latch disarmed
    #[default]
    Idle,
    /// Record was pressed; holding play as well starts the count
    RecordArmed,
    /// Record and play held for `hold` iterations
    EraseArmed { hold: u16 },
}

/// Hold-to-erase detector, polled once per control-loop iteration.
///
/// Pressing record arms it; keeping record and play held for `threshold`
/// iterations fires once and disarms. Letting go of play restarts the count;
/// letting go of record disarms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EraseGesture {
    state: EraseState,
    threshold: u16,
}

impl Default for EraseGesture {
    fn default() -> Self {
        Self::new(ERASE_HOLD)
    }
}

impl EraseGesture {
    pub fn new(threshold: u16) -> Self {
        Self {
            state: EraseState::Idle,
            threshold: threshold.max(1),
        }
    }

    pub fn state(&self) -> EraseState {
        self.state
    }

    /// Record press edge.
    pub fn record_pressed(&mut self) {
        self.state = EraseState::RecordArmed;
    }

    /// Record release edge.
    pub fn record_released(&mut self) {
        self.state = EraseState::Idle;
    }

    /// Count one iteration. Returns `true` on the iteration the bank
    /// should be erased.
    pub fn poll(&mut self, record_held: bool, play_held: bool) -> bool {
        let hold = match self.state {
            EraseState::Idle => return false,
            EraseState::RecordArmed => 0,
            EraseState::EraseArmed { hold } => hold,
        };
        if !record_held {
            return false;
        }
        if !play_held {
            self.state = EraseState::RecordArmed;
            return false;
        }
        let hold = hold + 1;
        if hold >= self.threshold {
            self.state = EraseState::Idle;
            true
        } else {
            self.state = EraseState::EraseArmed { hold };
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hold_for(gesture: &mut EraseGesture, iterations: u16) -> bool {
        let mut fired = false;
        for _ in 0..iterations {
            fired |= gesture.poll(true, true);
        }
        fired
    }

    #[test]
    fn overdub_writes_hits_and_pitch() {
        let mut p = Pattern::new();
        let live = [true, false, false, true];
        overdub(&mut p, Bank::B, StepIndex::new(4), &live, [321, 999]);
        assert!(p.trigger(TrackId::Red, Bank::B, StepIndex::new(4)));
        assert_eq!(p.pitch(TrackId::Red, Bank::B, StepIndex::new(4)), Some(321));
        assert!(p.trigger(TrackId::Yellow, Bank::B, StepIndex::new(4)));
        assert!(!p.trigger(TrackId::Blue, Bank::B, StepIndex::new(4)));
    }

    #[test]
    fn idle_gesture_never_fires() {
        let mut g = EraseGesture::default();
        assert!(!hold_for(&mut g, ERASE_HOLD * 2));
    }

    #[test]
    fn fires_at_threshold_not_before() {
        let mut g = EraseGesture::default();
        g.record_pressed();
        assert!(!hold_for(&mut g, ERASE_HOLD - 1));
        assert_eq!(g.state(), EraseState::EraseArmed { hold: ERASE_HOLD - 1 });
        assert!(g.poll(true, true));
        assert_eq!(g.state(), EraseState::Idle);
    }

    #[test]
    fn fires_once_per_press() {
        let mut g = EraseGesture::default();
        g.record_pressed();
        assert!(hold_for(&mut g, ERASE_HOLD));
        assert!(!hold_for(&mut g, ERASE_HOLD));
    }

    #[test]
    fn releasing_play_restarts_count() {
        let mut g = EraseGesture::new(10);
        g.record_pressed();
        assert!(!hold_for(&mut g, 9));
        assert!(!g.poll(true, false));
        assert_eq!(g.state(), EraseState::RecordArmed);
        assert!(!hold_for(&mut g, 9));
        assert!(g.poll(true, true));
    }

    #[test]
    fn releasing_record_disarms() {
        let mut g = EraseGesture::new(10);
        g.record_pressed();
        hold_for(&mut g, 5);
        g.record_released();
        assert_eq!(g.state(), EraseState::Idle);
        assert!(!hold_for(&mut g, 20));
    }
}
