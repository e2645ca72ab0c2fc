//! Core data model for the bleepdrum engine.
//!
//! Defines the sequence storage, bank and track identifiers, transport
//! modes and sample tables shared by the tick engine and the host
//! collaborators.
//!
//! Designed to be `no_std` compatible without `alloc`: every structure here
//! is fixed-size and allocated once at startup.

#![cfg_attr(not(feature = "std"), no_std)]

mod kit;
mod pattern;
mod table;
mod track;
mod transport;

pub use kit::{Kit, NOISE_LEN, SINE_LEN};
pub use pattern::{Pattern, SLOTS};
pub use table::{Table, TableRef, CENTER, MAX_TABLE_LEN};
pub use track::{Bank, StepIndex, TrackId, STEPS, TRACKS};
pub use transport::{ClockSource, Direction, MixMode, Transport};

/// Measured tick rate of the reference hardware timer, in Hz.
pub const TICK_HZ: u32 = 9813;
