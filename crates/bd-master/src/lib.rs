//! Headless controller for the bleepdrum engine.
//!
//! Owns the kit, the pattern and the shared registers; runs the tick on a
//! realtime audio thread or offline into a buffer, and hosts the
//! cooperative control loop that turns panel and MIDI input into register
//! writes. The CLI and the integration tests share it.

mod analog;
mod config;
mod kit;
mod midi;
mod panel;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use bd_audio::{dac_word, CaptureSink, CpalOutput, SampleSink};

// Re-export common types so callers don't need the lower crates directly.
pub use bd_audio::AudioError;
pub use bd_engine::{Engine, Frame, Registers, TickInputs};
pub use bd_formats::FormatError;
pub use bd_ir::{Bank, Direction, Kit, MixMode, Pattern, StepIndex, TrackId, Transport};

pub use analog::{curve, scale, Page, PotValues};
pub use config::{parse_mix_mode, Config, ConfigError};
pub use kit::load_kit;
pub use midi::{decode, list_ports, ClockDivider, MidiCommand, MidiError, MidiLink, CLOCKS_PER_STEP};
pub use panel::{ControlLoop, ControlSettings, Panel, POT_CENTER};

/// Ticks of silence written after playback stops so the device drains
/// cleanly.
const TAIL_DIVISOR: u32 = 10;

/// Headless drum machine: kit, pattern, registers and control loop.
pub struct Controller {
    kit: Kit,
    pattern: Pattern,
    registers: Arc<Registers>,
    control: ControlLoop,
    step_length: u32,
    tick_hz: u32,
    playback: Option<PlaybackHandle>,
}

struct PlaybackHandle {
    stop_signal: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    thread: Option<JoinHandle<Pattern>>,
}

impl Controller {
    pub fn new(config: &Config, kit: Kit) -> Self {
        let registers = Arc::new(Registers::new());
        registers.set_mix_mode(config.mix_mode());
        registers.set_click_enabled(config.click());
        let settings = ControlSettings {
            erase_hold: config.erase_hold(),
            click_hold: config.click_hold(),
            erased_display: config.erased_display(),
        };
        Self {
            kit,
            pattern: Pattern::new(),
            control: ControlLoop::new(registers.clone(), settings),
            registers,
            step_length: config.step_length(),
            tick_hz: config.tick_hz(),
            playback: None,
        }
    }

    // --- Kit and pattern ---

    pub fn kit(&self) -> &Kit {
        &self.kit
    }

    /// Replace the kit. Stops the audio thread.
    pub fn set_kit(&mut self, kit: Kit) {
        self.stop_audio();
        self.kit = kit;
    }

    /// The pattern as of the last time the audio thread stopped.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Replace the pattern. Stops the audio thread.
    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.stop_audio();
        self.pattern = pattern;
    }

    pub fn registers(&self) -> &Arc<Registers> {
        &self.registers
    }

    pub fn tick_hz(&self) -> u32 {
        self.tick_hz
    }

    pub fn step_length(&self) -> u32 {
        self.step_length
    }

    // --- Control loop ---

    pub fn control(&self) -> &ControlLoop {
        &self.control
    }

    /// One control-loop iteration with a fresh panel snapshot.
    pub fn poll(&mut self, panel: &Panel, now: Instant) {
        self.control.step(panel, now);
    }

    pub fn midi(&mut self, command: MidiCommand) {
        self.control.midi(command);
    }

    // --- Engine ---

    /// An engine over this controller's kit, seeded with its pattern.
    /// Drive it with `registers().latch()` to run the tick in-process.
    pub fn engine(&self) -> Engine<'_> {
        let mut engine = Engine::with_step_length(&self.kit, self.step_length);
        *engine.pattern_mut() = self.pattern.clone();
        engine
    }

    // --- Real-time playback ---

    /// Start the tick on an audio thread. The thread owns copies of the
    /// kit and pattern; the pattern is handed back on [`Controller::stop_audio`].
    pub fn start_audio(&mut self) {
        self.stop_audio();

        let kit = self.kit.clone();
        let pattern = self.pattern.clone();
        let regs = self.registers.clone();
        let stop_signal = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));

        let stop = stop_signal.clone();
        let done = finished.clone();
        let step_length = self.step_length;
        let tick_hz = self.tick_hz;

        let thread = std::thread::spawn(move || {
            audio_thread(AudioJob { kit, pattern, step_length, tick_hz }, regs, stop, done)
        });

        self.playback = Some(PlaybackHandle {
            stop_signal,
            finished,
            thread: Some(thread),
        });
    }

    /// Stop the audio thread and take back the pattern it recorded into.
    pub fn stop_audio(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            pb.stop_signal.store(true, Ordering::Relaxed);
            if let Some(handle) = pb.thread.take() {
                match handle.join() {
                    Ok(pattern) => self.pattern = pattern,
                    Err(_) => log::error!(target: "audio", "audio thread panicked"),
                }
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| !p.finished.load(Ordering::Relaxed))
    }

    // --- Offline rendering ---

    /// Render `ticks` samples of the pattern with the transport running and
    /// the current register settings, into any sink.
    pub fn render_into(&self, sink: &mut impl SampleSink, ticks: usize) {
        let mut engine = self.engine();
        let regs = &self.registers;
        let inputs = TickInputs {
            transport: Transport::Playing,
            direction: regs.direction(),
            mix_mode: regs.mix_mode(),
            click_enabled: regs.click_enabled(),
            bank: regs.bank(),
            ..TickInputs::default()
        };
        for _ in 0..ticks {
            sink.write(engine.tick(&inputs));
        }
    }

    pub fn render_samples(&self, ticks: usize) -> Vec<u8> {
        let mut sink = CaptureSink::with_capacity(self.tick_hz, ticks);
        self.render_into(&mut sink, ticks);
        sink.into_samples()
    }

    /// Ticks in `bars` whole bars of 32 steps.
    fn bar_ticks(&self, bars: u32) -> usize {
        bars as usize * bd_ir::STEPS * (self.step_length as usize + 1)
    }

    /// Render whole bars (32 steps each) to an 8-bit mono WAV file image.
    pub fn render_to_wav(&self, bars: u32) -> Vec<u8> {
        let samples = self.render_samples(self.bar_ticks(bars));
        bd_formats::samples_to_wav(&samples, self.tick_hz)
    }

    /// Render whole bars as the 16-bit words the hardware clocks into its
    /// serial DAC, one per tick.
    pub fn render_dac_words(&self, bars: u32) -> Vec<u16> {
        self.render_samples(self.bar_ticks(bars))
            .into_iter()
            .map(dac_word)
            .collect()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop_audio();
    }
}

/// A short groove in bank A so a fresh machine has something to play.
pub fn demo_pattern() -> Pattern {
    let mut pattern = Pattern::new();
    let bank = Bank::A;
    let at = StepIndex::new;
    for step in [0, 8, 14, 16, 24] {
        pattern.write(TrackId::Yellow, bank, at(step), 0);
    }
    for step in [8, 24] {
        pattern.write(TrackId::Green, bank, at(step), 0);
    }
    for step in (2..32).step_by(4) {
        pattern.write(TrackId::Red, bank, at(step), 128);
    }
    for (step, pitch) in [(26, 110), (28, 90), (30, 70)] {
        pattern.write(TrackId::Blue, bank, at(step), pitch);
    }
    pattern
}

struct AudioJob {
    kit: Kit,
    pattern: Pattern,
    step_length: u32,
    tick_hz: u32,
}

fn audio_thread(job: AudioJob, regs: Arc<Registers>, stop_signal: Arc<AtomicBool>, finished: Arc<AtomicBool>) -> Pattern {
    let AudioJob { kit, pattern, step_length, tick_hz } = job;

    let (mut output, consumer) = match CpalOutput::new(tick_hz) {
        Ok(pair) => pair,
        Err(e) => {
            log::error!(target: "audio", "{}", e);
            finished.store(true, Ordering::Relaxed);
            return pattern;
        }
    };
    let started = output.build_stream(consumer);
    if let Err(e) = started.and_then(|()| output.start()) {
        log::error!(target: "audio", "{}", e);
        finished.store(true, Ordering::Relaxed);
        return pattern;
    }

    let mut engine = Engine::with_step_length(&kit, step_length);
    *engine.pattern_mut() = pattern;

    while !stop_signal.load(Ordering::Relaxed) {
        let frame = engine.tick(&regs.latch());
        regs.publish(&frame);
        output.write(frame);
    }

    for _ in 0..tick_hz / TAIL_DIVISOR {
        output.write(Frame::silence());
    }
    if let Err(e) = output.stop() {
        log::warn!(target: "audio", "{}", e);
    }

    finished.store(true, Ordering::Relaxed);
    engine.pattern().clone()
}
