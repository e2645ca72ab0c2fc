//! Output mixing and fold-back saturation.

use bd_ir::CENTER;

/// Fold a wide intermediate back into `0..=255`.
///
/// Values past either rail are reflected instead of clipped: `256 -> 254`,
/// `-1 -> 1`. Reflection repeats with period 510, so any input lands in range.
#[inline]
pub fn fold(value: i32) -> u8 {
    let m = value.rem_euclid(510);
    if m > 255 {
        (510 - m) as u8
    } else {
        m as u8
    }
}

/// Direct mode: voices and click summed, halved and recentred.
#[inline]
pub fn mix_direct(voices: i32, click: i32) -> i32 {
    ((voices + click) >> 1) + CENTER as i32
}

/// Blend-mode inputs for one tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlendInput {
    /// Sum of the six signed voice samples
    pub voices: i32,
    /// Signed click sample
    pub click: i32,
    /// Signed noise-reader sample
    pub noise: i32,
    /// Click envelope
    pub amp: u8,
    /// Click audible: transport running, click enabled, envelope above floor
    pub click_open: bool,
    /// Any voice playing
    pub any_active: bool,
}

/// Blend mode: voices XORed with noise, plus a click/noise texture byte.
///
/// The texture is truncated to a byte before it is added, so negative
/// intermediates wrap to large positive offsets and fold back.
#[inline]
pub fn mix_blend(input: BlendInput) -> i32 {
    let texture = if input.click_open {
        let grain = ((input.noise >> 2) * input.amp as i32) >> 2;
        ((input.click | grain) >> 3) as u8
    } else {
        0
    };
    let base = if input.any_active {
        ((input.voices ^ (input.noise >> 1)) >> 1) + CENTER as i32
    } else {
        CENTER as i32
    };
    base + texture as i32
}
