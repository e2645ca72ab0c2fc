//! End to end: panel and MIDI through the control loop, the registers and
//! the tick engine.

use std::sync::Arc;
use std::time::Instant;

use bd_engine::{Engine, Frame, Registers, ACCENT, RED_PITCH};
use bd_ir::{Bank, Kit, StepIndex, Table, TrackId, Transport};
use bd_master::{demo_pattern, ControlLoop, ControlSettings, MidiCommand, Panel};

fn flat_kit() -> Kit {
    Kit::with_tables([
        Table::from_bytes("red", &[137; 256]),
        Table::from_bytes("blue", &[147; 256]),
        Table::from_bytes("green", &[157; 256]),
        Table::from_bytes("yellow", &[167; 256]),
    ])
}

/// Control loop and engine sharing one register block.
struct Rig<'k> {
    regs: Arc<Registers>,
    control: ControlLoop,
    engine: Engine<'k>,
    now: Instant,
}

impl<'k> Rig<'k> {
    fn new(kit: &'k Kit, step_length: u32) -> Self {
        let regs = Arc::new(Registers::new());
        Self {
            control: ControlLoop::new(regs.clone(), ControlSettings::default()),
            regs,
            engine: Engine::with_step_length(kit, step_length),
            now: Instant::now(),
        }
    }

    /// One control-loop iteration, then `ticks` engine ticks.
    fn step(&mut self, panel: Panel, ticks: u32) -> Vec<Frame> {
        self.control.step(&panel, self.now);
        self.run(ticks)
    }

    fn run(&mut self, ticks: u32) -> Vec<Frame> {
        (0..ticks)
            .map(|_| {
                let frame = self.engine.tick(&self.regs.latch());
                self.regs.publish(&frame);
                frame
            })
            .collect()
    }

    /// Tick until the playhead lands on `step`.
    fn run_to_step(&mut self, step: u8) {
        for _ in 0..1_000_000 {
            let frame = self.run(1)[0];
            if frame.step_edge && frame.step.get() == step {
                return;
            }
        }
        panic!("never reached step {}", step);
    }
}

fn play() -> Panel {
    Panel { play: true, ..Panel::default() }
}

fn record() -> Panel {
    Panel { record: true, ..Panel::default() }
}

#[test]
fn play_from_stop_lands_on_first_step_with_accent() {
    let kit = flat_kit();
    let mut rig = Rig::new(&kit, 100);
    let frames = rig.step(play(), 101);
    assert!(frames[..100].iter().all(|f| f.step == StepIndex::LAST));
    let first = frames[100];
    assert!(first.step_edge);
    assert_eq!(first.step, StepIndex::FIRST);
    assert_eq!(rig.engine.click().pitch(), 440);
    assert!(rig.engine.click().amp() >= ACCENT - 1);
    assert_eq!(rig.regs.step(), StepIndex::FIRST);
}

#[test]
fn recorded_hit_plays_back_on_the_pitch_voice() {
    let kit = flat_kit();
    let mut rig = Rig::new(&kit, 100);
    rig.step(record(), 0);
    assert_eq!(rig.regs.transport(), Transport::Recording);
    rig.step(Panel::default(), 0);
    rig.run_to_step(3);
    rig.run(10);

    rig.step(Panel::default().with_pad(TrackId::Red), 1);
    let pattern = rig.engine.pattern();
    assert!(pattern.trigger(TrackId::Red, Bank::A, StepIndex::new(3)));
    // Centred pots give 130 in direct mode.
    assert_eq!(pattern.pitch(TrackId::Red, Bank::A, StepIndex::new(3)), Some(130));
    assert!(rig.engine.voice(TrackId::Red.index()).is_some_and(|v| v.active));

    rig.step(Panel::default(), 0);
    rig.run_to_step(0);
    rig.run_to_step(3);
    let voice = rig.engine.voice(RED_PITCH).copied().unwrap();
    assert!(voice.active);
    assert_eq!(voice.increment, 130);
}

#[test]
fn late_hit_is_pushed_to_the_next_step() {
    let kit = flat_kit();
    let mut rig = Rig::new(&kit, 100);
    rig.step(record(), 0);
    rig.step(Panel::default(), 0);
    rig.run_to_step(5);
    rig.run(80);
    rig.step(Panel::default().with_pad(TrackId::Yellow), 1);
    let pattern = rig.engine.pattern();
    assert!(!pattern.trigger(TrackId::Yellow, Bank::A, StepIndex::new(5)));
    assert!(pattern.trigger(TrackId::Yellow, Bank::A, StepIndex::new(6)));
}

#[test]
fn erase_needs_the_full_hold() {
    let kit = flat_kit();
    let mut rig = Rig::new(&kit, 100);
    *rig.engine.pattern_mut() = demo_pattern();
    rig.engine
        .pattern_mut()
        .write(TrackId::Green, Bank::C, StepIndex::new(4), 0);
    let before = rig.engine.pattern().hits_in_bank(Bank::A);
    assert!(before > 0);

    let both = Panel { record: true, play: true, ..Panel::default() };
    for _ in 0..799 {
        rig.step(both, 1);
    }
    assert_eq!(rig.engine.pattern().hits_in_bank(Bank::A), before);
    assert!(!rig.regs.just_erased());

    rig.step(both, 1);
    assert_eq!(rig.engine.pattern().hits_in_bank(Bank::A), 0);
    assert_eq!(rig.engine.pattern().hits_in_bank(Bank::C), 1);
    assert!(rig.regs.just_erased());
    assert!(rig.regs.transport().is_recording());
}

#[test]
fn two_taps_set_the_tempo() {
    let kit = flat_kit();
    let mut rig = Rig::new(&kit, 1000);
    let tap = Panel { tap: true, ..Panel::default() };
    rig.step(Panel::default(), 2000);
    rig.step(tap, 1);
    assert_eq!(rig.engine.clock().step_length(), 1000);
    rig.step(Panel::default(), 1999);
    rig.step(tap, 1);
    assert_eq!(rig.engine.clock().step_length(), 500);
}

#[test]
fn shift_tap_sets_tempo_from_pot() {
    let kit = flat_kit();
    let mut rig = Rig::new(&kit, 1000);
    let panel = Panel { shift: true, tap: true, pots: [100, 512], ..Panel::default() };
    rig.step(panel, 1);
    assert_eq!(rig.engine.clock().step_length(), 400);
    assert!(rig.regs.transport().is_playing());
}

#[test]
fn midi_clock_replaces_the_internal_clock() {
    let kit = flat_kit();
    let mut rig = Rig::new(&kit, 100);
    rig.control.midi(MidiCommand::Start);
    for _ in 0..6 {
        rig.control.midi(MidiCommand::Clock);
    }
    let frames = rig.run(1000);
    assert_eq!(frames[0].step, StepIndex::FIRST);
    assert!(frames.iter().all(|f| f.step == StepIndex::FIRST));

    // A tap hands the playhead back to the internal clock.
    rig.step(Panel { tap: true, ..Panel::default() }, 0);
    let frames = rig.step(Panel::default(), 500);
    assert!(frames.iter().any(|f| f.step.get() > 0));
}

#[test]
fn bank_select_changes_what_plays() {
    let kit = flat_kit();
    let mut rig = Rig::new(&kit, 50);
    rig.engine
        .pattern_mut()
        .write(TrackId::Green, Bank::D, StepIndex::new(2), 0);
    rig.control.midi(MidiCommand::SelectBank(Bank::D));
    rig.step(play(), 0);
    rig.run_to_step(2);
    assert!(rig.engine.voice(TrackId::Green.index()).is_some_and(|v| v.active));
}

#[test]
fn same_script_same_output() {
    fn session() -> Vec<u8> {
        let kit = Kit::builtin();
        let mut rig = Rig::new(&kit, 300);
        *rig.engine.pattern_mut() = demo_pattern();
        let mut out = Vec::new();
        let script = [
            (play(), 2000),
            (Panel::default(), 1500),
            (Panel::default().with_pad(TrackId::Blue), 700),
            (Panel::default(), 3000),
            (Panel { shift: true, ..Panel::default() }, 10),
            (Panel { shift: true, play: true, ..Panel::default() }, 10),
            (Panel::default(), 4000),
        ];
        for (panel, ticks) in script {
            out.extend(rig.step(panel, ticks).iter().map(|f| f.sample));
        }
        out
    }
    let a = session();
    assert_eq!(a, session());
    assert!(a.iter().any(|&s| s != 127));
}
