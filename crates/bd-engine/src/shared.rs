//! Registers shared between the tick and the control loop.
//!
//! Every field has exactly one writer. Settings and live values are written
//! by the control loop and read by the tick; display values are written by
//! the tick. Pulses are raised by the control loop and consumed (swapped to
//! clear) by the tick, so each one is seen by exactly one tick.

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU8, Ordering};

use bd_ir::{Bank, ClockSource, Direction, MixMode, StepIndex, TrackId, Transport, TRACKS};

use crate::frame::Frame;

/// Default rates of the two percussion voices.
pub const DEFAULT_RATES: [u16; 2] = [128, 157];

/// Default pitch increment of the two melodic voices.
pub const DEFAULT_PITCH: u16 = 128;

/// Pitch overrides at or below this value are ignored.
pub const OVERRIDE_FLOOR: u16 = 4;

/// Everything the tick reads, latched once at the start of the tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickInputs {
    /// Live pad pulses (pads or MIDI notes)
    pub live: [bool; TRACKS],
    /// Tap-tempo pulse
    pub tap: bool,
    /// Erase-bank pulse
    pub erase: bool,
    /// Direct step-length request
    pub step_length: Option<u32>,
    /// External clock steps received since the last tick
    pub external_steps: u8,
    pub transport: Transport,
    pub direction: Direction,
    pub mix_mode: MixMode,
    pub click_enabled: bool,
    pub bank: Bank,
    pub clock_source: ClockSource,
    /// Effective live increments of the red and blue voices
    pub pitch: [u16; 2],
    /// Increments of the green and yellow voices
    pub rates: [u16; 2],
    /// Noise reader rate
    pub noise_rate: u16,
    /// Noise reader loop length
    pub noise_len: u16,
}

impl Default for TickInputs {
    fn default() -> Self {
        Self {
            live: [false; TRACKS],
            tap: false,
            erase: false,
            step_length: None,
            external_steps: 0,
            transport: Transport::Stopped,
            direction: Direction::Forward,
            mix_mode: MixMode::Direct,
            click_enabled: true,
            bank: Bank::A,
            clock_source: ClockSource::Internal,
            pitch: [DEFAULT_PITCH; 2],
            rates: DEFAULT_RATES,
            noise_rate: 200,
            noise_len: 200,
        }
    }
}

impl TickInputs {
    /// Inputs with the transport running.
    pub fn playing() -> Self {
        Self {
            transport: Transport::Playing,
            ..Self::default()
        }
    }

    /// Drop the one-shot pulses, keeping settings and live values.
    pub fn clear_pulses(&mut self) {
        self.live = [false; TRACKS];
        self.tap = false;
        self.erase = false;
        self.step_length = None;
        self.external_steps = 0;
    }
}

/// The shared register block.
#[derive(Debug)]
pub struct Registers {
    live: [AtomicBool; TRACKS],
    tap: AtomicBool,
    erase: AtomicBool,
    step_length: AtomicU32,
    external_steps: AtomicU8,

    transport: AtomicU8,
    direction: AtomicU8,
    mix_mode: AtomicU8,
    click_enabled: AtomicBool,
    bank: AtomicU8,
    clock_source: AtomicU8,

    pots: [AtomicU16; 2],
    pitch_overrides: [AtomicU16; 2],
    rates: [AtomicU16; 2],
    noise_rate: AtomicU16,
    noise_len: AtomicU16,
    just_erased: AtomicBool,

    step: AtomicU8,
    tick: AtomicU32,
    sample: AtomicU8,
    active_mask: AtomicU8,
    trigger_out: AtomicBool,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    pub const fn new() -> Self {
        Self {
            live: [
                AtomicBool::new(false),
                AtomicBool::new(false),
                AtomicBool::new(false),
                AtomicBool::new(false),
            ],
            tap: AtomicBool::new(false),
            erase: AtomicBool::new(false),
            step_length: AtomicU32::new(0),
            external_steps: AtomicU8::new(0),

            transport: AtomicU8::new(0),
            direction: AtomicU8::new(0),
            mix_mode: AtomicU8::new(0),
            click_enabled: AtomicBool::new(true),
            bank: AtomicU8::new(0),
            clock_source: AtomicU8::new(0),

            pots: [AtomicU16::new(DEFAULT_PITCH), AtomicU16::new(DEFAULT_PITCH)],
            pitch_overrides: [AtomicU16::new(0), AtomicU16::new(0)],
            rates: [AtomicU16::new(DEFAULT_RATES[0]), AtomicU16::new(DEFAULT_RATES[1])],
            noise_rate: AtomicU16::new(200),
            noise_len: AtomicU16::new(200),
            just_erased: AtomicBool::new(false),

            step: AtomicU8::new(StepIndex::LAST.get()),
            tick: AtomicU32::new(0),
            sample: AtomicU8::new(127),
            active_mask: AtomicU8::new(0),
            trigger_out: AtomicBool::new(false),
        }
    }

    // --- Pulses (control loop raises, tick consumes) ---

    pub fn hit(&self, track: TrackId) {
        self.live[track.index()].store(true, Ordering::Release);
    }

    pub fn tap(&self) {
        self.tap.store(true, Ordering::Release);
    }

    pub fn request_erase(&self) {
        self.erase.store(true, Ordering::Release);
    }

    /// Ask the tick to set the step length. Zero is raised to one tick.
    pub fn request_step_length(&self, ticks: u32) {
        self.step_length.store(ticks.max(1), Ordering::Release);
    }

    pub fn external_step(&self) {
        self.external_steps.fetch_add(1, Ordering::AcqRel);
    }

    // --- Settings (control loop writes) ---

    pub fn transport(&self) -> Transport {
        Transport::from_u8(self.transport.load(Ordering::Relaxed))
    }

    pub fn set_transport(&self, transport: Transport) {
        self.transport.store(transport.to_u8(), Ordering::Relaxed);
    }

    pub fn direction(&self) -> Direction {
        Direction::from_u8(self.direction.load(Ordering::Relaxed))
    }

    pub fn set_direction(&self, direction: Direction) {
        self.direction.store(direction.to_u8(), Ordering::Relaxed);
    }

    pub fn mix_mode(&self) -> MixMode {
        MixMode::from_u8(self.mix_mode.load(Ordering::Relaxed))
    }

    pub fn set_mix_mode(&self, mode: MixMode) {
        self.mix_mode.store(mode.to_u8(), Ordering::Relaxed);
    }

    pub fn click_enabled(&self) -> bool {
        self.click_enabled.load(Ordering::Relaxed)
    }

    pub fn set_click_enabled(&self, enabled: bool) {
        self.click_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn bank(&self) -> Bank {
        Bank::from_u8(self.bank.load(Ordering::Relaxed))
    }

    pub fn set_bank(&self, bank: Bank) {
        self.bank.store(bank.to_u8(), Ordering::Relaxed);
    }

    pub fn clock_source(&self) -> ClockSource {
        ClockSource::from_u8(self.clock_source.load(Ordering::Relaxed))
    }

    pub fn set_clock_source(&self, source: ClockSource) {
        self.clock_source.store(source.to_u8(), Ordering::Relaxed);
    }

    // --- Live values (control loop writes) ---

    /// Pot-derived increments of the red and blue voices.
    pub fn set_pots(&self, red: u16, blue: u16) {
        self.pots[0].store(red, Ordering::Relaxed);
        self.pots[1].store(blue, Ordering::Relaxed);
    }

    /// MIDI CC pitch override for a melodic lane (0 = red, 1 = blue).
    pub fn set_pitch_override(&self, lane: usize, value: u16) {
        if let Some(reg) = self.pitch_overrides.get(lane) {
            reg.store(value, Ordering::Relaxed);
        }
    }

    /// Increment of a percussion voice (0 = green, 1 = yellow).
    pub fn set_rate(&self, lane: usize, value: u16) {
        if let Some(reg) = self.rates.get(lane) {
            reg.store(value, Ordering::Relaxed);
        }
    }

    pub fn set_noise(&self, rate: u16, length: u16) {
        self.noise_rate.store(rate, Ordering::Relaxed);
        self.noise_len.store(length, Ordering::Relaxed);
    }

    /// Effective live increment of a melodic lane: the CC override when it
    /// is above the floor, else the pot.
    /// Lanes past blue read 0.
    pub fn live_pitch(&self, lane: usize) -> u16 {
        let load = |reg: Option<&AtomicU16>| reg.map_or(0, |r| r.load(Ordering::Relaxed));
        let cc = load(self.pitch_overrides.get(lane));
        if cc > OVERRIDE_FLOOR {
            cc
        } else {
            load(self.pots.get(lane))
        }
    }

    pub fn just_erased(&self) -> bool {
        self.just_erased.load(Ordering::Relaxed)
    }

    pub fn set_just_erased(&self, value: bool) {
        self.just_erased.store(value, Ordering::Relaxed);
    }

    // --- Tick side ---

    /// Consume pending pulses and snapshot everything else.
    pub fn latch(&self) -> TickInputs {
        let mut live = [false; TRACKS];
        for (slot, reg) in live.iter_mut().zip(self.live.iter()) {
            *slot = reg.swap(false, Ordering::AcqRel);
        }
        let step_length = match self.step_length.swap(0, Ordering::AcqRel) {
            0 => None,
            n => Some(n),
        };
        TickInputs {
            live,
            tap: self.tap.swap(false, Ordering::AcqRel),
            erase: self.erase.swap(false, Ordering::AcqRel),
            step_length,
            external_steps: self.external_steps.swap(0, Ordering::AcqRel),
            transport: self.transport(),
            direction: self.direction(),
            mix_mode: self.mix_mode(),
            click_enabled: self.click_enabled(),
            bank: self.bank(),
            clock_source: self.clock_source(),
            pitch: [self.live_pitch(0), self.live_pitch(1)],
            rates: [
                self.rates[0].load(Ordering::Relaxed),
                self.rates[1].load(Ordering::Relaxed),
            ],
            noise_rate: self.noise_rate.load(Ordering::Relaxed),
            noise_len: self.noise_len.load(Ordering::Relaxed),
        }
    }

    /// Publish the tick's display state.
    pub fn publish(&self, frame: &Frame) {
        self.step.store(frame.step.get(), Ordering::Relaxed);
        self.tick.store(frame.tick, Ordering::Relaxed);
        self.sample.store(frame.sample, Ordering::Relaxed);
        self.active_mask.store(frame.active_mask, Ordering::Relaxed);
        self.trigger_out.store(frame.trigger_out, Ordering::Relaxed);
    }

    // --- Display (tick writes) ---

    pub fn step(&self) -> StepIndex {
        StepIndex::new(self.step.load(Ordering::Relaxed))
    }

    pub fn tick_count(&self) -> u32 {
        self.tick.load(Ordering::Relaxed)
    }

    pub fn last_sample(&self) -> u8 {
        self.sample.load(Ordering::Relaxed)
    }

    pub fn active_mask(&self) -> u8 {
        self.active_mask.load(Ordering::Relaxed)
    }

    pub fn trigger_out(&self) -> bool {
        self.trigger_out.load(Ordering::Relaxed)
    }
}
