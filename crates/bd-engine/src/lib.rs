//! Tick engine for the bleepdrum sequencer.
//!
//! One call to [`Engine::tick`] per timer tick advances the step clock,
//! fires sequenced and live hits, records, mixes the six voices and the
//! metronome click, and yields one folded 8-bit sample. The control loop
//! talks to the tick only through [`Registers`].

#![cfg_attr(not(feature = "std"), no_std)]

mod click;
mod clock;
mod engine;
mod frame;
mod mixer;
mod noise;
mod recorder;
mod shared;
mod voice;

pub use click::{Click, ACCENT, DDS_TUNE};
pub use clock::{Clock, DEFAULT_STEP_LENGTH};
pub use engine::{Engine, BLUE_PITCH, RED_PITCH, TRIGGER_OUT_TICKS, VOICES};
pub use frame::Frame;
pub use mixer::{fold, mix_blend, mix_direct, BlendInput};
pub use noise::NoiseReader;
pub use recorder::{overdub, EraseGesture, EraseState, ERASE_HOLD};
pub use shared::{Registers, TickInputs, DEFAULT_PITCH, DEFAULT_RATES, OVERRIDE_FLOOR};
pub use voice::{Voice, PHASE_SHIFT};
