//! Output converter backends for bleepdrum.

mod cpal_backend;
mod traits;

pub use cpal_backend::{device_signal, CpalOutput, TickSignal};
pub use traits::{dac_word, AudioError, CaptureSink, SampleSink};
