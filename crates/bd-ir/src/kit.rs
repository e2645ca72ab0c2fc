//! The four voice tables plus the click sine and blend-mode noise tables.
//!
//! The built-in kit is synthesized once at startup. Tables are rendered at
//! twice the tick rate, so a voice increment of 128 (two table steps per
//! tick) plays them back at their natural pitch.

use core::f32::consts::PI;

use crate::table::{Table, TableRef, CENTER};
use crate::track::{TrackId, TRACKS};
use crate::TICK_HZ;

/// Entries in the click oscillator's sine table.
pub const SINE_LEN: usize = 256;

/// Entries in the blend-mode noise table.
pub const NOISE_LEN: usize = 4096;

/// Natural playback rate of the built-in tables, in Hz.
const TABLE_RATE: f32 = (TICK_HZ * 2) as f32;

/// Voice tables indexed by track, plus the two auxiliary tables.
#[derive(Clone, Debug)]
pub struct Kit {
    /// One table per track (red, blue, green, yellow)
    pub tables: [Table; TRACKS],
    /// One cycle of sine, unsigned and centred on 127
    pub sine: [u8; SINE_LEN],
    /// White noise, unsigned and centred on 127
    pub noise: [u8; NOISE_LEN],
}

impl Default for Kit {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Kit {
    /// The synthesized default kit: hat, tom, snare, kick.
    pub fn builtin() -> Self {
        Self::with_tables([hat(), tom(), snare(), kick()])
    }

    /// A kit using the given voice tables and the standard sine/noise tables.
    pub fn with_tables(tables: [Table; TRACKS]) -> Self {
        Self {
            tables,
            sine: sine_table(),
            noise: noise_table(),
        }
    }

    /// Replace the table of one track.
    pub fn set_table(&mut self, track: TrackId, table: Table) {
        self.tables[track.index()] = table;
    }

    pub fn table(&self, track: TrackId) -> TableRef<'_> {
        self.tables[track.index()].view()
    }

    pub fn sine(&self) -> TableRef<'_> {
        TableRef::new(&self.sine)
    }

    pub fn noise(&self) -> TableRef<'_> {
        TableRef::new(&self.noise)
    }

    /// Total bytes across the four voice tables.
    pub fn table_bytes(&self) -> usize {
        self.tables.iter().map(Table::len).sum()
    }
}

/// Map a sample in `[-1, 1]` to an unsigned byte centred on [`CENTER`].
fn to_byte(x: f32) -> u8 {
    let v = libm::roundf(x.clamp(-1.0, 1.0) * CENTER as f32) + CENTER as f32;
    v as u8
}

fn render(name: &str, len: usize, mut f: impl FnMut(f32) -> f32) -> Table {
    let mut table = Table::from_bytes(name, &[]);
    for i in 0..len {
        let t = i as f32 / TABLE_RATE;
        let _ = table.data.push(to_byte(f(t)));
    }
    table
}

fn sine_table() -> [u8; SINE_LEN] {
    let mut out = [CENTER; SINE_LEN];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = to_byte(libm::sinf(2.0 * PI * i as f32 / SINE_LEN as f32));
    }
    out
}

/// 15-bit Galois LFSR, taps at bits 0 and 1.
struct Lfsr(u16);

impl Lfsr {
    fn next(&mut self) -> u16 {
        let feedback = (self.0 & 1) ^ ((self.0 >> 1) & 1);
        self.0 >>= 1;
        self.0 |= feedback << 14;
        self.0
    }

    /// Next value as a float in roughly `[-1, 1)`.
    fn next_f32(&mut self) -> f32 {
        let v = self.next() & 0x7fff;
        v as f32 / 16384.0 - 1.0
    }
}

fn noise_table() -> [u8; NOISE_LEN] {
    let mut lfsr = Lfsr(1);
    let mut out = [CENTER; NOISE_LEN];
    for slot in out.iter_mut() {
        *slot = to_byte(lfsr.next_f32());
    }
    out
}

fn hat() -> Table {
    let mut lfsr = Lfsr(0x5a5a);
    render("hat", 2000, |t| lfsr.next_f32() * libm::expf(-t * 60.0))
}

fn tom() -> Table {
    render("tom", 4000, |t| {
        let freq = 110.0 + 70.0 * libm::expf(-t * 25.0);
        libm::sinf(2.0 * PI * freq * t) * libm::expf(-t * 9.0)
    })
}

fn snare() -> Table {
    let mut lfsr = Lfsr(0x1234);
    render("snare", 3500, |t| {
        let body = libm::sinf(2.0 * PI * 185.0 * t) * libm::expf(-t * 30.0);
        let rattle = lfsr.next_f32() * libm::expf(-t * 14.0);
        0.5 * body + 0.6 * rattle
    })
}

fn kick() -> Table {
    render("kick", 4000, |t| {
        // Phase of a 150 Hz -> 48 Hz exponential sweep.
        let k = 30.0;
        let phase = 48.0 * t + (150.0 - 48.0) * (1.0 - libm::expf(-t * k)) / k;
        libm::sinf(2.0 * PI * phase) * libm::expf(-t * 6.0)
    })
}
