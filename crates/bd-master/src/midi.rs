//! MIDI input: decoding and the port connection.

use std::sync::mpsc::{self, Receiver};

use bd_ir::{Bank, TrackId};
use midir::{MidiInput, MidiInputConnection};
use midly::live::{LiveEvent, SystemRealtime};
use midly::MidiMessage;

/// MIDI clocks per sequencer step (sixteenth notes at 24 PPQN).
pub const CLOCKS_PER_STEP: u8 = 6;

/// Error type for MIDI setup.
#[derive(Debug)]
pub enum MidiError {
    /// The MIDI backend could not be initialized
    Init(String),
    /// No input port matched the requested name
    NoPort(String),
    /// Connecting to the port failed
    Connect(String),
}

impl std::fmt::Display for MidiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MidiError::Init(msg) => write!(f, "MIDI init error: {}", msg),
            MidiError::NoPort(name) => write!(f, "no MIDI input port matching '{}'", name),
            MidiError::Connect(msg) => write!(f, "MIDI connect error: {}", msg),
        }
    }
}

impl std::error::Error for MidiError {}

/// A MIDI message the drum machine responds to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiCommand {
    /// Live pad hit (notes 60/62/64/65)
    Pad(TrackId),
    /// Note 67
    TogglePlay,
    /// Note 69
    ToggleReverse,
    /// Note 70
    ToggleMix,
    /// Notes 72/74/76/77
    SelectBank(Bank),
    /// CC 70/71: melodic pitch override, already scaled
    PitchOverride { lane: usize, value: u16 },
    /// CC 72/73: percussion rate, already scaled
    Rate { lane: usize, value: u16 },
    Clock,
    Start,
    Stop,
}

/// Decode one raw MIDI message.
///
/// `channel` filters channel messages (zero-based); `None` is omni.
/// Realtime messages are never filtered. Note-on with velocity zero is a
/// note-off and is ignored like every other unmapped message.
pub fn decode(message: &[u8], channel: Option<u8>) -> Option<MidiCommand> {
    match LiveEvent::parse(message).ok()? {
        LiveEvent::Midi { channel: ch, message } => {
            if channel.is_some_and(|want| want != ch.as_int()) {
                return None;
            }
            match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => note(key.as_int()),
                MidiMessage::Controller { controller, value } => cc(controller.as_int(), value.as_int()),
                _ => None,
            }
        }
        LiveEvent::Realtime(SystemRealtime::TimingClock) => Some(MidiCommand::Clock),
        LiveEvent::Realtime(SystemRealtime::Start) => Some(MidiCommand::Start),
        LiveEvent::Realtime(SystemRealtime::Stop) => Some(MidiCommand::Stop),
        _ => None,
    }
}

fn note(key: u8) -> Option<MidiCommand> {
    let command = match key {
        60 => MidiCommand::Pad(TrackId::Red),
        62 => MidiCommand::Pad(TrackId::Blue),
        64 => MidiCommand::Pad(TrackId::Green),
        65 => MidiCommand::Pad(TrackId::Yellow),
        67 => MidiCommand::TogglePlay,
        69 => MidiCommand::ToggleReverse,
        70 => MidiCommand::ToggleMix,
        72 => MidiCommand::SelectBank(Bank::A),
        74 => MidiCommand::SelectBank(Bank::B),
        76 => MidiCommand::SelectBank(Bank::C),
        77 => MidiCommand::SelectBank(Bank::D),
        _ => return None,
    };
    Some(command)
}

fn cc(controller: u8, value: u8) -> Option<MidiCommand> {
    let v = value as u16;
    match controller {
        70 | 71 => Some(MidiCommand::PitchOverride {
            lane: (controller - 70) as usize,
            value: (v << 2) + 3,
        }),
        // A rate of zero would freeze the voice on its first sample.
        72 | 73 => Some(MidiCommand::Rate {
            lane: (controller - 72) as usize,
            value: (v << 2).max(1),
        }),
        _ => None,
    }
}

/// Divides incoming MIDI clocks down to sequencer steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClockDivider {
    count: u8,
}

impl ClockDivider {
    /// Count one clock; `true` when it completes a step.
    pub fn clock(&mut self) -> bool {
        self.count += 1;
        if self.count >= CLOCKS_PER_STEP {
            self.count = 0;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

/// Names of the available MIDI input ports.
pub fn list_ports() -> Result<Vec<String>, MidiError> {
    let midi_in = MidiInput::new("bleepdrum").map_err(|e| MidiError::Init(e.to_string()))?;
    Ok(midi_in
        .ports()
        .iter()
        .filter_map(|p| midi_in.port_name(p).ok())
        .collect())
}

/// An open MIDI input. Decoded commands queue up until polled.
pub struct MidiLink {
    port_name: String,
    connection: Option<MidiInputConnection<()>>,
    receiver: Receiver<MidiCommand>,
}

impl MidiLink {
    /// Connect to the first port whose name contains `port`, or the first
    /// port when `port` is `None`.
    pub fn connect(port: Option<&str>, channel: Option<u8>) -> Result<Self, MidiError> {
        let midi_in = MidiInput::new("bleepdrum").map_err(|e| MidiError::Init(e.to_string()))?;
        let ports = midi_in.ports();
        let found = ports.iter().find_map(|p| {
            let name = midi_in.port_name(p).ok()?;
            match port {
                Some(want) if !name.contains(want) => None,
                _ => Some((p.clone(), name)),
            }
        });
        let Some((input, port_name)) = found else {
            return Err(MidiError::NoPort(port.unwrap_or("*").to_string()));
        };

        let (tx, rx) = mpsc::channel();
        let connection = midi_in
            .connect(
                &input,
                "bleepdrum-input",
                move |_timestamp, message, _| {
                    if let Some(command) = decode(message, channel) {
                        let _ = tx.send(command);
                    }
                },
                (),
            )
            .map_err(|e| MidiError::Connect(e.to_string()))?;

        log::info!(target: "midi", "connected to {}", port_name);
        Ok(Self {
            port_name,
            connection: Some(connection),
            receiver: rx,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Drain pending commands without blocking.
    pub fn poll(&self) -> impl Iterator<Item = MidiCommand> + '_ {
        self.receiver.try_iter()
    }
}

impl Drop for MidiLink {
    fn drop(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.close();
        }
    }
}
