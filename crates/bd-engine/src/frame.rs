//! Per-tick output record.

use bd_ir::{StepIndex, CENTER};

/// One tick of output: the 8-bit sample plus the state the display and
/// clock-out collaborators follow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Folded output sample, centred on 127
    pub sample: u8,
    /// Playhead after this tick
    pub step: StepIndex,
    /// Tick counter after this tick
    pub tick: u32,
    /// Bit per playing voice: red, blue, green, yellow, red pitch, blue pitch
    pub active_mask: u8,
    /// Did the step advance on this tick?
    pub step_edge: bool,
    /// Clock-out gate
    pub trigger_out: bool,
}

impl Default for Frame {
    fn default() -> Self {
        Self::silence()
    }
}

impl Frame {
    /// A centred, idle frame.
    pub const fn silence() -> Self {
        Self {
            sample: CENTER,
            step: StepIndex::LAST,
            tick: 0,
            active_mask: 0,
            step_edge: false,
            trigger_out: false,
        }
    }

    /// Sample as a float in roughly `[-1, 1]`.
    #[inline]
    pub fn to_f32(self) -> f32 {
        (self.sample as f32 - CENTER as f32) / 128.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_is_zero() {
        assert_eq!(Frame::silence().to_f32(), 0.0);
    }

    #[test]
    fn extremes_stay_in_range() {
        let hi = Frame { sample: 255, ..Frame::silence() };
        let lo = Frame { sample: 0, ..Frame::silence() };
        assert!(hi.to_f32() <= 1.0);
        assert!(lo.to_f32() >= -1.0);
    }
}
