//! Allocation-free tick tests.
//!
//! The tick runs on the audio thread, so `Engine::tick()` and the register
//! latch must never touch the heap. These drive a full session (live hits,
//! recording, reverse, erase, both mix modes) for several seconds of ticks
//! under the allocation guard.
//!
//! Just run `cargo test`.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use std::sync::Arc;
use std::time::Instant;

use bd_engine::{Engine, Registers};
use bd_ir::{Direction, Kit, MixMode, TrackId, Transport, TICK_HZ};
use bd_master::{demo_pattern, ControlLoop, ControlSettings, Panel};

/// Tick for `duration` ticks with a scripted stream of register writes,
/// aborting on any heap allocation.
fn assert_session_alloc_free(mode: MixMode, duration: u32) {
    let kit = Kit::builtin();
    let regs = Registers::new();
    regs.set_mix_mode(mode);
    regs.set_transport(Transport::Recording);
    let mut engine = Engine::with_step_length(&kit, 400);
    *engine.pattern_mut() = demo_pattern();

    assert_no_alloc(|| {
        for i in 0..duration {
            match i % 1500 {
                100 => regs.hit(TrackId::ALL[(i / 1500) as usize % 4]),
                400 => regs.set_direction(Direction::Reverse),
                900 => regs.set_direction(Direction::Forward),
                1200 => regs.tap(),
                _ => {}
            }
            if i == duration / 2 {
                regs.request_erase();
            }
            let frame = engine.tick(&regs.latch());
            regs.publish(&frame);
        }
    });
}

#[test]
fn direct_session_alloc_free() {
    assert_session_alloc_free(MixMode::Direct, TICK_HZ * 5);
}

#[test]
fn blend_session_alloc_free() {
    assert_session_alloc_free(MixMode::Blend, TICK_HZ * 5);
}

#[test]
fn control_loop_alloc_free() {
    let regs = Arc::new(Registers::new());
    let mut control = ControlLoop::new(regs.clone(), ControlSettings::default());
    let now = Instant::now();
    let idle = Panel::default();
    let both = Panel { record: true, play: true, ..Panel::default() };
    let shift = Panel { shift: true, ..Panel::default() };

    assert_no_alloc(|| {
        for i in 0..5000u32 {
            let panel = match i % 1000 {
                0..=9 => Panel::default().with_pad(TrackId::Green),
                100..=999 if i < 1000 => both,
                200..=999 => shift,
                _ => idle,
            };
            control.step(&panel, now);
        }
    });
    assert!(regs.just_erased());
}
