//! The tick engine.
//!
//! [`Engine::tick`] runs once per timer tick and produces one [`Frame`]. It
//! is split into stage methods called in a fixed order; none of them can
//! fail or allocate.

use bd_ir::{ClockSource, Direction, Kit, MixMode, Pattern, TableRef, TrackId, TRACKS};

use crate::click::Click;
use crate::clock::{Clock, DEFAULT_STEP_LENGTH};
use crate::frame::Frame;
use crate::mixer::{fold, mix_blend, mix_direct, BlendInput};
use crate::noise::NoiseReader;
use crate::recorder::overdub;
use crate::shared::TickInputs;
use crate::voice::Voice;

/// Number of voices: one per track plus the red and blue pitch voices.
pub const VOICES: usize = 6;

/// Voice slot of the red track's stored-pitch voice.
pub const RED_PITCH: usize = 4;

/// Voice slot of the blue track's stored-pitch voice.
pub const BLUE_PITCH: usize = 5;

/// Ticks the clock-out gate stays high after a step edge.
pub const TRIGGER_OUT_TICKS: u32 = 80;

/// Per-track pulses raised this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Pulses {
    live: [bool; TRACKS],
    sequenced: [bool; TRACKS],
    /// Stored pitches of the red and blue steps just read
    stored: [u16; 2],
}

/// Drum machine tick engine.
///
/// Borrows the kit read-only; owns the pattern and all per-tick state.
pub struct Engine<'k> {
    kit: &'k Kit,
    pattern: Pattern,
    clock: Clock,
    voices: [Voice; VOICES],
    click: Click,
    noise: NoiseReader,
    trigger_out_tick: u32,
    trigger_out: bool,
    /// Transport was running on the previous tick
    was_playing: bool,
}

impl<'k> Engine<'k> {
    pub fn new(kit: &'k Kit) -> Self {
        Self::with_step_length(kit, DEFAULT_STEP_LENGTH)
    }

    pub fn with_step_length(kit: &'k Kit, step_length: u32) -> Self {
        Self {
            kit,
            pattern: Pattern::new(),
            clock: Clock::new(step_length),
            voices: [Voice::new(); VOICES],
            click: Click::new(),
            noise: NoiseReader::new(),
            trigger_out_tick: 0,
            trigger_out: false,
            was_playing: false,
        }
    }

    pub fn kit(&self) -> &'k Kit {
        self.kit
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn pattern_mut(&mut self) -> &mut Pattern {
        &mut self.pattern
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn click(&self) -> &Click {
        &self.click
    }

    pub fn voice(&self, slot: usize) -> Option<&Voice> {
        self.voices.get(slot)
    }

    /// Bit per playing voice, in slot order.
    pub fn active_mask(&self) -> u8 {
        self.voices
            .iter()
            .enumerate()
            .fold(0, |mask, (i, v)| mask | ((v.active as u8) << i))
    }

    /// Run one tick.
    pub fn tick(&mut self, inputs: &TickInputs) -> Frame {
        self.clock.begin_tick();
        self.advance_clock(inputs);
        self.apply_tempo(inputs);
        let write_at = self.clock.write_index();
        self.click.select_pitch(self.clock.step());
        if inputs.erase {
            self.pattern.clear_bank(inputs.bank);
        }

        let pulses = self.collect_pulses(inputs);
        self.trigger_voices(&pulses);
        if inputs.transport.is_recording() {
            overdub(&mut self.pattern, inputs.bank, write_at, &pulses.live, inputs.pitch);
        }
        self.update_trigger_out();
        if self.clock.beat_edge() {
            self.click.strike();
        }

        let active_mask = self.active_mask();
        let sample = fold(self.mix(inputs, active_mask != 0));

        self.click.advance();
        self.advance_voices(inputs);
        if inputs.mix_mode == MixMode::Blend {
            self.noise.advance(inputs.noise_rate, inputs.noise_len);
        }

        Frame {
            sample,
            step: self.clock.step(),
            tick: self.clock.tick(),
            active_mask,
            step_edge: self.clock.step_edge(),
            trigger_out: self.trigger_out,
        }
    }

    /// Step the playhead from the selected clock, or park it when stopped.
    /// The tick the transport stops on silences every voice; live hits
    /// still sound while stopped.
    fn advance_clock(&mut self, inputs: &TickInputs) {
        if !inputs.transport.is_playing() {
            if self.was_playing {
                self.voices.iter_mut().for_each(Voice::reset);
            }
            self.was_playing = false;
            self.clock.park();
            return;
        }
        self.was_playing = true;
        match inputs.clock_source {
            ClockSource::Internal => self.clock.advance_internal(),
            ClockSource::External => self.clock.advance_external(inputs.external_steps),
        }
    }

    fn apply_tempo(&mut self, inputs: &TickInputs) {
        if inputs.tap {
            self.clock.tap();
        }
        if let Some(ticks) = inputs.step_length {
            self.clock.set_step_length(ticks);
        }
    }

    /// Live pulses every tick; sequenced pulses only on a step edge while
    /// playing.
    fn collect_pulses(&self, inputs: &TickInputs) -> Pulses {
        let mut pulses = Pulses {
            live: inputs.live,
            ..Pulses::default()
        };
        if inputs.transport.is_playing() && self.clock.step_edge() {
            let step = self.clock.step();
            for track in TrackId::ALL {
                pulses.sequenced[track.index()] = self.pattern.trigger(track, inputs.bank, step);
                if let (Some(lane), Some(pitch)) = (track.melodic_index(), self.pattern.pitch(track, inputs.bank, step)) {
                    pulses.stored[lane] = pitch;
                }
            }
        }
        pulses
    }

    /// Percussion voices fire on either pulse. Melodic tracks split: a live
    /// hit fires the track voice at the live pitch, a sequenced hit fires
    /// the pitch voice at the stored pitch.
    fn trigger_voices(&mut self, pulses: &Pulses) {
        for track in TrackId::ALL {
            let i = track.index();
            match track.melodic_index() {
                None => {
                    if pulses.live[i] || pulses.sequenced[i] {
                        self.voices[i].trigger();
                    }
                }
                Some(lane) => {
                    if pulses.live[i] {
                        self.voices[i].trigger();
                    }
                    if pulses.sequenced[i] {
                        let voice = &mut self.voices[RED_PITCH + lane];
                        voice.increment = pulses.stored[lane];
                        voice.trigger();
                    }
                }
            }
        }
    }

    fn update_trigger_out(&mut self) {
        let tick = self.clock.tick();
        if self.clock.step_edge() {
            self.trigger_out_tick = tick;
            self.trigger_out = true;
        } else if self.trigger_out && tick.wrapping_sub(self.trigger_out_tick) > TRIGGER_OUT_TICKS {
            self.trigger_out = false;
        }
    }

    /// Table each voice slot reads.
    fn table(&self, slot: usize) -> TableRef<'k> {
        let kit: &'k Kit = self.kit;
        match slot {
            RED_PITCH => kit.table(TrackId::Red),
            BLUE_PITCH => kit.table(TrackId::Blue),
            _ => TrackId::from_index(slot).map_or(TableRef::new(&[]), |t| kit.table(t)),
        }
    }

    fn mix(&self, inputs: &TickInputs, any_active: bool) -> i32 {
        let mut voices = 0;
        for (slot, voice) in self.voices.iter().enumerate() {
            // Reverse applies to the four track voices only.
            let direction = if slot < TRACKS { inputs.direction } else { Direction::Forward };
            voices += voice.sample(self.table(slot), direction);
        }

        let gate = inputs.transport.is_playing() && inputs.click_enabled;
        let click = self.click.sample(self.kit.sine(), gate);

        match inputs.mix_mode {
            MixMode::Direct => mix_direct(voices, click),
            MixMode::Blend => mix_blend(BlendInput {
                voices,
                click,
                noise: self.noise.sample(self.kit.noise()),
                amp: self.click.amp(),
                click_open: gate && self.click.audible(),
                any_active,
            }),
        }
    }

    fn advance_voices(&mut self, inputs: &TickInputs) {
        self.voices[TrackId::Red.index()].increment = inputs.pitch[0];
        self.voices[TrackId::Blue.index()].increment = inputs.pitch[1];
        self.voices[TrackId::Green.index()].increment = inputs.rates[0];
        self.voices[TrackId::Yellow.index()].increment = inputs.rates[1];
        for slot in 0..VOICES {
            let length = self.table(slot).length();
            self.voices[slot].advance(length);
        }
    }
}
