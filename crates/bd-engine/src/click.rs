//! Metronome click: a sine DDS with a stepped decay envelope.

use bd_ir::{StepIndex, TableRef, CENTER};

/// 2^32 / 9800: phase increment per Hz at the design tick rate.
pub const DDS_TUNE: u32 = (4_294_967_296u64 / 9800) as u32;

/// Envelope value on a beat.
pub const ACCENT: u8 = 64;

/// Below this the envelope snaps to zero.
const FLOOR: u8 = 4;

/// Ticks between envelope decrements.
const DECAY_TICKS: u8 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Click {
    phase: u32,
    pitch: u16,
    amp: u8,
    wait: u8,
}

impl Default for Click {
    fn default() -> Self {
        Self::new()
    }
}

impl Click {
    pub const fn new() -> Self {
        Self {
            phase: 0,
            pitch: 220,
            amp: 0,
            wait: 0,
        }
    }

    pub fn pitch(&self) -> u16 {
        self.pitch
    }

    pub fn amp(&self) -> u8 {
        self.amp
    }

    /// Bar start gets the high click, half-bars the middle one, other beats
    /// the low one. Off-beat steps keep the previous pitch.
    #[inline]
    pub fn select_pitch(&mut self, step: StepIndex) {
        let s = step.get();
        if s == 0 {
            self.pitch = 440;
        } else if s % 8 == 0 {
            self.pitch = 293;
        } else if s % 4 == 0 {
            self.pitch = 220;
        }
    }

    #[inline]
    pub fn strike(&mut self) {
        self.amp = ACCENT;
    }

    /// Is the envelope loud enough to be heard?
    #[inline]
    pub fn audible(&self) -> bool {
        self.amp >= FLOOR
    }

    /// Signed, enveloped sample; zero unless `gate` is open and the
    /// envelope is audible.
    #[inline]
    pub fn sample(&self, sine: TableRef<'_>, gate: bool) -> i32 {
        if !gate || !self.audible() {
            return 0;
        }
        let raw = sine.read((self.phase >> 24) as u16) as i32 - CENTER as i32;
        (raw * self.amp as i32) >> 8
    }

    /// Advance the oscillator and, every fifth tick, the envelope.
    #[inline]
    pub fn advance(&mut self) {
        let step = DDS_TUNE.wrapping_mul((self.pitch as u32) << 2);
        self.phase = self.phase.wrapping_add(step);
        self.wait += 1;
        if self.wait >= DECAY_TICKS {
            self.wait = 0;
            if self.amp >= FLOOR {
                self.amp -= 1;
            }
            if self.amp < FLOOR {
                self.amp = 0;
            }
        }
    }
}
