//! Computer keyboard as the front panel.
//!
//! Terminals that speak the kitty keyboard protocol report key releases, so
//! holds are exact. Elsewhere a key counts as held until `hold` passes
//! without a press or auto-repeat for it.

use std::collections::HashMap;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use bd_master::{Panel, TrackId, POT_CENTER};
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement};

/// Pot change per key press.
const POT_STEP: u16 = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Control {
    Pad(TrackId),
    Play,
    Record,
    Tap,
    Shift,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
}

/// Key layout: a s d f pads, space play, r record, t tap, z shift.
pub fn control_for(code: KeyCode) -> Option<Control> {
    let control = match code {
        KeyCode::Char('a') => Control::Pad(TrackId::Red),
        KeyCode::Char('s') => Control::Pad(TrackId::Blue),
        KeyCode::Char('d') => Control::Pad(TrackId::Green),
        KeyCode::Char('f') => Control::Pad(TrackId::Yellow),
        KeyCode::Char(' ') => Control::Play,
        KeyCode::Char('r') => Control::Record,
        KeyCode::Char('t') => Control::Tap,
        KeyCode::Char('z') => Control::Shift,
        _ => return None,
    };
    Some(control)
}

/// Pot adjustments: `[`/`]` left pot, `-`/`=` right pot.
fn pot_delta(code: KeyCode) -> Option<(usize, i32)> {
    match code {
        KeyCode::Char('[') => Some((0, -(POT_STEP as i32))),
        KeyCode::Char(']') => Some((0, POT_STEP as i32)),
        KeyCode::Char('-') => Some((1, -(POT_STEP as i32))),
        KeyCode::Char('=') => Some((1, POT_STEP as i32)),
        _ => None,
    }
}

/// Held-key tracker. Separate from the terminal so it can be driven by
/// synthetic events.
pub struct KeyState {
    release_events: bool,
    hold: Duration,
    held: HashMap<Control, Instant>,
    pots: [u16; 2],
}

impl KeyState {
    pub fn new(release_events: bool, hold: Duration) -> Self {
        Self {
            release_events,
            hold,
            held: HashMap::new(),
            pots: [POT_CENTER; 2],
        }
    }

    pub fn handle(&mut self, key: KeyEvent, now: Instant) -> Action {
        let quit = matches!(key.code, KeyCode::Esc | KeyCode::Char('q'))
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL));
        if quit && key.kind == KeyEventKind::Press {
            return Action::Quit;
        }

        if let Some(control) = control_for(key.code) {
            match key.kind {
                KeyEventKind::Press | KeyEventKind::Repeat => {
                    self.held.insert(control, now);
                }
                KeyEventKind::Release => {
                    self.held.remove(&control);
                }
            }
        } else if let Some((pot, delta)) = pot_delta(key.code) {
            if key.kind != KeyEventKind::Release {
                let value = (self.pots[pot] as i32 + delta).clamp(0, 1023);
                self.pots[pot] = value as u16;
            }
        }
        Action::Continue
    }

    /// Current panel snapshot. Without release events, stale holds expire.
    pub fn panel(&mut self, now: Instant) -> Panel {
        if !self.release_events {
            let hold = self.hold;
            self.held.retain(|_, at| now.saturating_duration_since(*at) < hold);
        }
        let is = |c: Control| self.held.contains_key(&c);
        let mut panel = Panel {
            play: is(Control::Play),
            record: is(Control::Record),
            tap: is(Control::Tap),
            shift: is(Control::Shift),
            pots: self.pots,
            ..Panel::default()
        };
        for track in TrackId::ALL {
            panel.pads[track.index()] = is(Control::Pad(track));
        }
        panel
    }
}

/// Raw-mode terminal front panel.
pub struct Keyboard {
    state: KeyState,
    enhanced: bool,
    active: bool,
}

impl Keyboard {
    pub fn start(hold: Duration) -> io::Result<Self> {
        enable_raw_mode()?;
        let supports_enhancement = matches!(supports_keyboard_enhancement(), Ok(true));
        let enhanced = supports_enhancement
            && execute!(
                io::stdout(),
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                )
            )
            .is_ok();
        if !enhanced {
            log::info!(target: "keyboard", "no key release events; holds time out after {:?}", hold);
        }
        Ok(Self {
            state: KeyState::new(enhanced, hold),
            enhanced,
            active: true,
        })
    }

    pub fn stop(&mut self) -> io::Result<()> {
        if self.enhanced {
            let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
            self.enhanced = false;
        }
        if self.active {
            self.active = false;
            disable_raw_mode()?;
            println!();
        }
        Ok(())
    }

    /// Handle every pending terminal event without blocking.
    pub fn drain(&mut self, now: Instant) -> io::Result<Action> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if self.state.handle(key, now) == Action::Quit {
                    return Ok(Action::Quit);
                }
            }
        }
        Ok(Action::Continue)
    }

    pub fn panel(&mut self, now: Instant) -> Panel {
        self.state.panel(now)
    }

    /// Overwrite the status line.
    pub fn status(&self, line: &str) -> io::Result<()> {
        let mut out = io::stdout();
        write!(out, "\r{:<72}", line)?;
        out.flush()
    }
}

impl Drop for Keyboard {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
