//! The cooperative control loop.
//!
//! Runs at a few hundred hertz, well below the tick rate. Each iteration
//! takes a debounced [`Panel`] snapshot, turns edges and holds into
//! register writes, and scales the pots. Hold gestures are counted in
//! iterations, not wall time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bd_engine::{EraseGesture, Registers, ERASE_HOLD};
use bd_ir::{Bank, ClockSource, TrackId, Transport, TRACKS};

use crate::analog::{self, Page};
use crate::midi::{ClockDivider, MidiCommand};

/// Centre of a 10-bit pot.
pub const POT_CENTER: u16 = 512;

/// One debounced reading of every control. `true` means held.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Panel {
    /// Red, blue, green, yellow
    pub pads: [bool; TRACKS],
    pub play: bool,
    pub record: bool,
    pub tap: bool,
    pub shift: bool,
    /// Raw 10-bit readings of the left and right pots
    pub pots: [u16; 2],
}

impl Default for Panel {
    fn default() -> Self {
        Self {
            pads: [false; TRACKS],
            play: false,
            record: false,
            tap: false,
            shift: false,
            pots: [POT_CENTER; 2],
        }
    }
}

impl Panel {
    pub fn pad(&self, track: TrackId) -> bool {
        self.pads[track.index()]
    }

    pub fn with_pad(mut self, track: TrackId) -> Self {
        self.pads[track.index()] = true;
        self
    }
}

/// Hold thresholds and timers for the control loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlSettings {
    /// Iterations record + play must be held to erase
    pub erase_hold: u16,
    /// Iterations shift must be held past to toggle the click
    pub click_hold: u16,
    /// How long the "just erased" flag stays up
    pub erased_display: Duration,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            erase_hold: ERASE_HOLD,
            click_hold: 800,
            erased_display: Duration::from_secs(10),
        }
    }
}

/// Shift-hold detector for the click toggle. Armed on each shift press,
/// fires once per press.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ShiftHold {
    count: u16,
    armed: bool,
}

/// Bank chosen by shift + pad. When several pads are held the last one in
/// this order wins.
const BANK_PADS: [(TrackId, Bank); TRACKS] = [
    (TrackId::Red, Bank::C),
    (TrackId::Yellow, Bank::B),
    (TrackId::Blue, Bank::A),
    (TrackId::Green, Bank::D),
];

/// Control-loop state: previous snapshot, hold counters and timers.
pub struct ControlLoop {
    regs: Arc<Registers>,
    settings: ControlSettings,
    prev: Panel,
    erase: EraseGesture,
    shift_hold: ShiftHold,
    page: Page,
    erased_at: Option<Instant>,
    divider: ClockDivider,
}

impl ControlLoop {
    pub fn new(regs: Arc<Registers>, settings: ControlSettings) -> Self {
        Self {
            regs,
            erase: EraseGesture::new(settings.erase_hold),
            settings,
            prev: Panel::default(),
            shift_hold: ShiftHold::default(),
            page: Page::default(),
            erased_at: None,
            divider: ClockDivider::default(),
        }
    }

    pub fn registers(&self) -> &Arc<Registers> {
        &self.regs
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn erase(&self) -> &EraseGesture {
        &self.erase
    }

    /// One loop iteration.
    pub fn step(&mut self, panel: &Panel, now: Instant) {
        let prev = std::mem::replace(&mut self.prev, *panel);
        let pressed = |held: bool, was: bool| held && !was;
        let regs = &*self.regs;

        if pressed(panel.shift, prev.shift) {
            self.page = self.page.toggle();
            self.shift_hold = ShiftHold { count: 0, armed: true };
        }
        if panel.shift && !panel.tap && self.shift_hold.armed {
            self.shift_hold.count = self.shift_hold.count.saturating_add(1);
            if self.shift_hold.count > self.settings.click_hold {
                let enabled = !regs.click_enabled();
                regs.set_click_enabled(enabled);
                self.shift_hold = ShiftHold::default();
                log::debug!(target: "panel", "click {}", if enabled { "on" } else { "off" });
            }
        }

        if panel.shift && !panel.record {
            for (track, bank) in BANK_PADS {
                if panel.pad(track) {
                    regs.set_bank(bank);
                }
            }
            if panel.tap {
                regs.set_transport(regs.transport().force_play());
                regs.request_step_length((panel.pots[0] as u32) << 2);
            }
            if pressed(panel.play, prev.play) {
                regs.set_direction(regs.direction().toggle());
            }
        }

        if pressed(panel.tap, prev.tap) && !panel.shift {
            regs.set_clock_source(ClockSource::Internal);
            regs.tap();
        }

        if pressed(panel.play, prev.play) && !panel.shift && !panel.record {
            regs.set_transport(regs.transport().toggle_play());
        }

        if pressed(panel.record, prev.record) {
            regs.set_transport(regs.transport().toggle_record());
            self.erase.record_pressed();
        }
        if !panel.record && prev.record {
            self.erase.record_released();
        }
        if self.erase.poll(panel.record, panel.play) {
            regs.request_erase();
            regs.set_transport(regs.transport().force_play());
            regs.set_just_erased(true);
            self.erased_at = Some(now);
            log::info!(target: "panel", "erased bank {:?}", regs.bank());
        }
        if let Some(at) = self.erased_at {
            if now.saturating_duration_since(at) >= self.settings.erased_display {
                regs.set_just_erased(false);
                self.erased_at = None;
            }
        }

        if !panel.shift {
            for track in TrackId::ALL {
                if pressed(panel.pad(track), prev.pad(track)) {
                    regs.hit(track);
                }
            }
        }

        analog::apply(regs, regs.mix_mode(), self.page, panel.pots[0], panel.pots[1]);
    }

    /// Apply one MIDI command.
    pub fn midi(&mut self, command: MidiCommand) {
        let regs = &*self.regs;
        match command {
            MidiCommand::Pad(track) => {
                if !self.prev.shift {
                    regs.hit(track);
                }
            }
            MidiCommand::TogglePlay => regs.set_transport(regs.transport().toggle_play()),
            MidiCommand::ToggleReverse => regs.set_direction(regs.direction().toggle()),
            MidiCommand::ToggleMix => {
                regs.set_mix_mode(regs.mix_mode().toggle());
                self.page = Page::Noise;
            }
            MidiCommand::SelectBank(bank) => regs.set_bank(bank),
            MidiCommand::PitchOverride { lane, value } => regs.set_pitch_override(lane, value),
            MidiCommand::Rate { lane, value } => regs.set_rate(lane, value),
            MidiCommand::Clock => {
                if self.divider.clock() {
                    regs.set_clock_source(ClockSource::External);
                    regs.external_step();
                }
            }
            MidiCommand::Start => {
                self.divider.reset();
                regs.set_clock_source(ClockSource::External);
                regs.set_transport(regs.transport().force_play());
            }
            MidiCommand::Stop => {
                regs.set_transport(Transport::Stopped);
                regs.set_clock_source(ClockSource::Internal);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bd_ir::{Direction, MixMode};

    fn setup() -> (ControlLoop, Arc<Registers>, Instant) {
        let regs = Arc::new(Registers::new());
        let control = ControlLoop::new(regs.clone(), ControlSettings::default());
        (control, regs, Instant::now())
    }

    fn hold(control: &mut ControlLoop, panel: Panel, iterations: u32, now: Instant) {
        for _ in 0..iterations {
            control.step(&panel, now);
        }
    }

    #[test]
    fn play_toggles_on_press_only() {
        let (mut c, regs, now) = setup();
        let play = Panel { play: true, ..Panel::default() };
        hold(&mut c, play, 5, now);
        assert_eq!(regs.transport(), Transport::Playing);
        c.step(&Panel::default(), now);
        c.step(&play, now);
        assert_eq!(regs.transport(), Transport::Stopped);
    }

    #[test]
    fn play_is_ignored_under_shift() {
        let (mut c, regs, now) = setup();
        c.step(&Panel { shift: true, ..Panel::default() }, now);
        c.step(&Panel { shift: true, play: true, ..Panel::default() }, now);
        assert_eq!(regs.transport(), Transport::Stopped);
        assert_eq!(regs.direction(), Direction::Reverse);
    }

    #[test]
    fn record_press_arms_and_plays() {
        let (mut c, regs, now) = setup();
        c.step(&Panel { record: true, ..Panel::default() }, now);
        assert_eq!(regs.transport(), Transport::Recording);
        c.step(&Panel::default(), now);
        c.step(&Panel { record: true, ..Panel::default() }, now);
        assert_eq!(regs.transport(), Transport::Playing);
    }

    #[test]
    fn erase_after_held_iterations() {
        let (mut c, regs, now) = setup();
        let both = Panel { record: true, play: true, ..Panel::default() };
        hold(&mut c, both, 799, now);
        assert!(!regs.latch().erase);
        c.step(&both, now);
        assert!(regs.latch().erase);
        assert!(regs.just_erased());
        assert!(regs.transport().is_playing());
        // Fires once per press.
        hold(&mut c, both, 1000, now);
        assert!(!regs.latch().erase);
    }

    #[test]
    fn releasing_play_restarts_erase_count() {
        let (mut c, regs, now) = setup();
        let both = Panel { record: true, play: true, ..Panel::default() };
        hold(&mut c, both, 500, now);
        c.step(&Panel { record: true, ..Panel::default() }, now);
        hold(&mut c, both, 500, now);
        assert!(!regs.latch().erase);
        hold(&mut c, both, 300, now);
        assert!(regs.latch().erase);
    }

    #[test]
    fn just_erased_clears_after_display_time() {
        let (mut c, regs, now) = setup();
        let both = Panel { record: true, play: true, ..Panel::default() };
        hold(&mut c, both, 800, now);
        assert!(regs.just_erased());
        c.step(&Panel::default(), now + Duration::from_secs(9));
        assert!(regs.just_erased());
        c.step(&Panel::default(), now + Duration::from_secs(10));
        assert!(!regs.just_erased());
    }

    #[test]
    fn shift_pad_selects_bank_without_hitting() {
        let (mut c, regs, now) = setup();
        let shifted = Panel { shift: true, ..Panel::default() };
        c.step(&shifted, now);
        c.step(&shifted.with_pad(TrackId::Red), now);
        assert_eq!(regs.bank(), Bank::C);
        assert_eq!(regs.latch().live, [false; TRACKS]);
        c.step(&shifted.with_pad(TrackId::Yellow), now);
        assert_eq!(regs.bank(), Bank::B);
        c.step(&shifted.with_pad(TrackId::Blue).with_pad(TrackId::Green), now);
        assert_eq!(regs.bank(), Bank::D);
    }

    #[test]
    fn pad_edges_hit_once() {
        let (mut c, regs, now) = setup();
        let red = Panel::default().with_pad(TrackId::Red);
        c.step(&red, now);
        assert!(regs.latch().live[0]);
        c.step(&red, now);
        assert!(!regs.latch().live[0]);
    }

    #[test]
    fn tap_returns_to_internal_clock() {
        let (mut c, regs, now) = setup();
        regs.set_clock_source(ClockSource::External);
        c.step(&Panel { tap: true, ..Panel::default() }, now);
        assert_eq!(regs.clock_source(), ClockSource::Internal);
        assert!(regs.latch().tap);
    }

    #[test]
    fn shift_tap_sets_step_length_from_left_pot() {
        let (mut c, regs, now) = setup();
        let panel = Panel { shift: true, tap: true, pots: [250, 0], ..Panel::default() };
        c.step(&panel, now);
        let inputs = regs.latch();
        assert_eq!(inputs.step_length, Some(1000));
        assert!(!inputs.tap);
        assert_eq!(regs.transport(), Transport::Playing);
    }

    #[test]
    fn shift_hold_toggles_click() {
        let (mut c, regs, now) = setup();
        let shifted = Panel { shift: true, ..Panel::default() };
        hold(&mut c, shifted, 800, now);
        assert!(regs.click_enabled());
        c.step(&shifted, now);
        assert!(!regs.click_enabled());
        hold(&mut c, shifted, 2000, now);
        assert!(!regs.click_enabled());
    }

    #[test]
    fn shift_press_flips_page() {
        let (mut c, _regs, now) = setup();
        assert_eq!(c.page(), Page::Pitch);
        c.step(&Panel { shift: true, ..Panel::default() }, now);
        assert_eq!(c.page(), Page::Noise);
        c.step(&Panel::default(), now);
        assert_eq!(c.page(), Page::Noise);
        c.step(&Panel { shift: true, ..Panel::default() }, now);
        assert_eq!(c.page(), Page::Pitch);
    }

    #[test]
    fn pots_follow_mode() {
        let (mut c, regs, now) = setup();
        c.step(&Panel { pots: [512, 512], ..Panel::default() }, now);
        assert_eq!(regs.live_pitch(0), 130);
        assert_eq!(regs.live_pitch(1), 170);
    }

    #[test]
    fn midi_mix_toggle_shows_noise_page() {
        let (mut c, regs, _) = setup();
        c.midi(MidiCommand::ToggleMix);
        assert_eq!(regs.mix_mode(), MixMode::Blend);
        assert_eq!(c.page(), Page::Noise);
    }

    #[test]
    fn midi_pads_gated_by_shift() {
        let (mut c, regs, now) = setup();
        c.step(&Panel { shift: true, ..Panel::default() }, now);
        c.midi(MidiCommand::Pad(TrackId::Green));
        assert!(!regs.latch().live[2]);
        c.step(&Panel::default(), now);
        c.midi(MidiCommand::Pad(TrackId::Green));
        assert!(regs.latch().live[2]);
    }

    #[test]
    fn midi_clock_drives_external_steps() {
        let (mut c, regs, _) = setup();
        c.midi(MidiCommand::Start);
        assert_eq!(regs.transport(), Transport::Playing);
        for _ in 0..12 {
            c.midi(MidiCommand::Clock);
        }
        let inputs = regs.latch();
        assert_eq!(inputs.external_steps, 2);
        assert_eq!(inputs.clock_source, ClockSource::External);
        c.midi(MidiCommand::Stop);
        assert_eq!(regs.transport(), Transport::Stopped);
        assert_eq!(regs.clock_source(), ClockSource::Internal);
    }

    #[test]
    fn midi_overrides() {
        let (mut c, regs, _) = setup();
        c.midi(MidiCommand::PitchOverride { lane: 0, value: 311 });
        c.midi(MidiCommand::Rate { lane: 1, value: 64 });
        let inputs = regs.latch();
        assert_eq!(inputs.pitch[0], 311);
        assert_eq!(inputs.rates[1], 64);
    }
}
