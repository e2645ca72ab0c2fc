//! Voice: one-shot table-lookup oscillator.

use bd_ir::{Direction, TableRef, CENTER};

/// Fractional bits of the phase accumulator.
pub const PHASE_SHIFT: u32 = 6;

/// A single voice playing a table once, nearest-index, no interpolation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Voice {
    /// Phase accumulator (index << 6)
    pub phase: u32,
    /// Phase added per tick
    pub increment: u16,
    /// Current table index (`phase >> 6`)
    pub index: u16,
    /// Is the voice currently playing?
    pub active: bool,
}

impl Voice {
    pub const fn new() -> Self {
        Self {
            phase: 0,
            increment: 0,
            index: 0,
            active: false,
        }
    }

    /// Restart from the top of the table.
    #[inline]
    pub fn trigger(&mut self) {
        self.phase = 0;
        self.index = 0;
        self.active = true;
    }

    /// Stop and zero the playback position.
    #[inline]
    pub fn reset(&mut self) {
        self.phase = 0;
        self.index = 0;
        self.active = false;
    }

    /// Advance one tick. Running past `length` (the last readable index)
    /// deactivates the voice.
    #[inline]
    pub fn advance(&mut self, length: u16) {
        if !self.active {
            return;
        }
        self.phase = self.phase.wrapping_add(self.increment as u32);
        let index = self.phase >> PHASE_SHIFT;
        if index > length as u32 {
            self.reset();
        } else {
            self.index = index as u16;
        }
    }

    /// Signed sample at the current index, mirrored when reversed.
    /// Idle voices are silent.
    #[inline]
    pub fn sample(&self, table: TableRef<'_>, direction: Direction) -> i32 {
        if !self.active {
            return 0;
        }
        let raw = match direction {
            Direction::Forward => table.read(self.index),
            Direction::Reverse => table.mirror(self.index),
        };
        raw as i32 - CENTER as i32
    }
}
