//! CPAL-based output converter.
//!
//! The tick produces samples at the timer rate; the device runs at its own
//! rate. Samples cross a lock-free ring buffer and are read as a
//! [`dasp_signal::Signal`], converted to the device rate with a floor
//! (zero-order hold) interpolator.

use bd_engine::Frame;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use dasp_interpolate::floor::Floor;
use dasp_signal::interpolate::Converter;
use dasp_signal::Signal;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::traits::{AudioError, SampleSink};

/// The tick stream as a signal. Repeats the last sample when the ring
/// runs dry.
pub struct TickSignal {
    consumer: HeapCons<u8>,
    last: u8,
}

impl TickSignal {
    pub fn new(consumer: HeapCons<u8>) -> Self {
        Self {
            consumer,
            last: Frame::silence().sample,
        }
    }
}

impl Signal for TickSignal {
    type Frame = f32;

    fn next(&mut self) -> f32 {
        if let Some(sample) = self.consumer.try_pop() {
            self.last = sample;
        }
        Frame { sample: self.last, ..Frame::silence() }.to_f32()
    }
}

/// Tick stream held at each sample until the next one falls due at
/// `device_rate`.
pub fn device_signal(consumer: HeapCons<u8>, tick_rate: u32, device_rate: u32) -> Converter<TickSignal, Floor<f32>> {
    let hold = Floor::new(Frame::silence().to_f32());
    TickSignal::new(consumer).from_hz_to_hz(hold, tick_rate as f64, device_rate.max(1) as f64)
}

/// CPAL-based audio output.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    producer: HeapProd<u8>,
    running: Arc<AtomicBool>,
    tick_rate: u32,
}

impl CpalOutput {
    /// Create a new CPAL output with the default device, fed at `tick_rate`.
    pub fn new(tick_rate: u32) -> Result<(Self, HeapCons<u8>), AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;
        let config: StreamConfig = config.into();

        // About 50ms of ticks
        let rb = HeapRb::<u8>::new((tick_rate as usize / 20).max(64));
        let (producer, consumer) = rb.split();

        log::info!(
            target: "audio",
            "device {} at {} Hz, {} channels",
            device.name().unwrap_or_else(|_| "<unnamed>".into()),
            config.sample_rate.0,
            config.channels
        );

        let output = Self {
            device,
            config,
            stream: None,
            producer,
            running: Arc::new(AtomicBool::new(false)),
            tick_rate,
        };

        Ok((output, consumer))
    }

    pub fn device_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Build and start the audio stream.
    pub fn build_stream(&mut self, consumer: HeapCons<u8>) -> Result<(), AudioError> {
        let running = self.running.clone();
        let channels = self.config.channels as usize;
        let mut signal = device_signal(consumer, self.tick_rate, self.device_rate());

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !running.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }
                    for chunk in data.chunks_mut(channels) {
                        chunk.fill(signal.next());
                    }
                },
                |err| log::error!(target: "audio", "stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);

        Ok(())
    }

    /// Write a single sample, spinning until the ring buffer has room.
    /// The device draining the buffer paces the caller to the tick rate.
    pub fn write_spin(&mut self, sample: u8) {
        while self.producer.try_push(sample).is_err() {
            std::hint::spin_loop();
        }
    }
}

impl SampleSink for CpalOutput {
    fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    fn write(&mut self, frame: Frame) {
        self.write_spin(frame.sample);
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(samples: &[u8]) -> HeapCons<u8> {
        let (mut producer, consumer) = HeapRb::<u8>::new(64).split();
        for &sample in samples {
            let _ = producer.try_push(sample);
        }
        consumer
    }

    fn level(sample: u8) -> f32 {
        Frame { sample, ..Frame::silence() }.to_f32()
    }

    #[test]
    fn upsampling_repeats_samples() {
        let signal = device_signal(ring(&[1, 2]), 10, 40);
        let out: Vec<f32> = signal.take(8).collect();
        let idle = level(127);
        assert_eq!(out, vec![idle, idle, idle, idle, level(1), level(1), level(1), level(1)]);
    }

    #[test]
    fn downsampling_skips_samples() {
        let signal = device_signal(ring(&[1, 2, 3, 4]), 20, 10);
        let out: Vec<f32> = signal.take(3).collect();
        assert_eq!(out, vec![level(127), level(2), level(4)]);
    }

    #[test]
    fn starved_signal_holds_last_sample() {
        let mut signal = TickSignal::new(ring(&[9]));
        assert_eq!(signal.next(), level(9));
        assert_eq!(signal.next(), level(9));
    }
}
