//! Output converter trait, DAC word packing and error types.

use bd_engine::Frame;

/// Error type for audio operations.
#[derive(Debug)]
pub enum AudioError {
    /// Failed to initialize audio device
    DeviceInit(String),
    /// Failed to create audio stream
    StreamCreate(String),
    /// Playback error
    Playback(String),
    /// No audio device available
    NoDevice,
}

impl std::fmt::Display for AudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioError::DeviceInit(msg) => write!(f, "Device init error: {}", msg),
            AudioError::StreamCreate(msg) => write!(f, "Stream create error: {}", msg),
            AudioError::Playback(msg) => write!(f, "Playback error: {}", msg),
            AudioError::NoDevice => write!(f, "No audio device available"),
        }
    }
}

impl std::error::Error for AudioError {}

/// Control word for a 12-bit serial DAC: channel A, buffered, gain 1x,
/// active, with the 8-bit sample in the top bits of the data field.
#[inline]
pub const fn dac_word(sample: u8) -> u16 {
    (0b0111 << 12) | ((sample as u16) << 4)
}

/// Receives one sample per tick.
pub trait SampleSink {
    /// Rate at which this sink expects frames, in Hz.
    fn tick_rate(&self) -> u32;

    /// Accept one tick's frame.
    fn write(&mut self, frame: Frame);

    fn start(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Captures raw samples in memory, for offline rendering.
#[derive(Clone, Debug, Default)]
pub struct CaptureSink {
    rate: u32,
    samples: Vec<u8>,
}

impl CaptureSink {
    pub fn new(rate: u32) -> Self {
        Self {
            rate,
            samples: Vec::new(),
        }
    }

    pub fn with_capacity(rate: u32, capacity: usize) -> Self {
        Self {
            rate,
            samples: Vec::with_capacity(capacity),
        }
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<u8> {
        self.samples
    }
}

impl SampleSink for CaptureSink {
    fn tick_rate(&self) -> u32 {
        self.rate
    }

    fn write(&mut self, frame: Frame) {
        self.samples.push(frame.sample);
    }
}
