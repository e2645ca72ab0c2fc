//! Looping noise reader used by the blend mix mode.

use bd_ir::{TableRef, CENTER};

use crate::voice::PHASE_SHIFT;

/// Reads the noise table at a pot-controlled rate, wrapping back to the
/// start once the index passes a pot-controlled length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoiseReader {
    phase: u32,
    index: u16,
}

impl NoiseReader {
    pub const fn new() -> Self {
        Self { phase: 0, index: 0 }
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    #[inline]
    pub fn sample(&self, table: TableRef<'_>) -> i32 {
        table.read(self.index) as i32 - CENTER as i32
    }

    #[inline]
    pub fn advance(&mut self, rate: u16, length: u16) {
        self.phase = self.phase.wrapping_add(rate as u32);
        let index = self.phase >> PHASE_SHIFT;
        if index > length as u32 {
            self.phase = 0;
            self.index = 0;
        } else {
            self.index = index as u16;
        }
    }
}
