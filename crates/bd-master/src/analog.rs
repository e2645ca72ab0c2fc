//! Pot curves.
//!
//! Readings are 10-bit with the pots wired backwards, so the value is
//! inverted and squared to get a usable log-ish taper before scaling.

use bd_engine::Registers;
use bd_ir::MixMode;

/// Largest 10-bit reading plus one.
const FULL_SCALE: u32 = 1024;

/// What the two pots control in blend mode. Toggled by each shift press.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Page {
    #[default]
    Pitch,
    Noise,
}

impl Page {
    pub const fn toggle(self) -> Self {
        match self {
            Page::Pitch => Page::Noise,
            Page::Noise => Page::Pitch,
        }
    }
}

/// Pot values after scaling, ready for the registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PotValues {
    /// Red and blue live increments
    Pitch(u16, u16),
    /// Noise reader rate and loop length
    Noise(u16, u16),
}

/// Inverted, squared reading.
pub fn curve(reading: u16) -> u32 {
    let raw = FULL_SCALE - (reading as u32).min(FULL_SCALE - 1);
    raw * raw
}

/// Scale the two pot readings for the current mode and page.
pub fn scale(mode: MixMode, page: Page, left: u16, right: u16) -> PotValues {
    let (c1, c2) = (curve(left), curve(right));
    match (mode, page) {
        (MixMode::Direct, _) => PotValues::Pitch(((c1 >> 11) + 2) as u16, ((c2 >> 11) + 42) as u16),
        (MixMode::Blend, Page::Pitch) => PotValues::Pitch(((c1 >> 11) + 1) as u16, ((c2 >> 12) + 1) as u16),
        (MixMode::Blend, Page::Noise) => PotValues::Noise(((c1 >> 6) + 1) as u16, ((c2 >> 8) + 1) as u16),
    }
}

/// Scale and store. The page that is not shown keeps its last values.
pub fn apply(regs: &Registers, mode: MixMode, page: Page, left: u16, right: u16) -> PotValues {
    let values = scale(mode, page, left, right);
    match values {
        PotValues::Pitch(red, blue) => regs.set_pots(red, blue),
        PotValues::Noise(rate, len) => regs.set_noise(rate, len),
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_inverts_and_squares() {
        assert_eq!(curve(0), 1024 * 1024);
        assert_eq!(curve(1023), 1);
        assert_eq!(curve(512), 512 * 512);
        // Out-of-range readings clamp to the top of the pot.
        assert_eq!(curve(4000), 1);
    }

    #[test]
    fn direct_mode_offsets() {
        assert_eq!(scale(MixMode::Direct, Page::Noise, 1023, 1023), PotValues::Pitch(2, 42));
        assert_eq!(scale(MixMode::Direct, Page::Pitch, 0, 0), PotValues::Pitch(514, 554));
        assert_eq!(scale(MixMode::Direct, Page::Pitch, 512, 512), PotValues::Pitch(130, 170));
    }

    #[test]
    fn blend_pages() {
        assert_eq!(scale(MixMode::Blend, Page::Pitch, 0, 0), PotValues::Pitch(513, 257));
        assert_eq!(scale(MixMode::Blend, Page::Noise, 0, 0), PotValues::Noise(16385, 4097));
        assert_eq!(scale(MixMode::Blend, Page::Noise, 1023, 1023), PotValues::Noise(1, 1));
    }

    #[test]
    fn noise_page_leaves_pitch_alone() {
        let regs = Registers::new();
        apply(&regs, MixMode::Blend, Page::Pitch, 512, 512);
        apply(&regs, MixMode::Blend, Page::Noise, 0, 0);
        assert_eq!(regs.live_pitch(0), 129);
        assert_eq!(regs.live_pitch(1), 65);
        let inputs = regs.latch();
        assert_eq!(inputs.noise_rate, 16385);
        assert_eq!(inputs.noise_len, 4097);
    }
}
