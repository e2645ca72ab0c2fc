//! WAV -> 8-bit voice table conversion.

use bd_ir::{Table, CENTER, MAX_TABLE_LEN, TICK_HZ};
use dasp_interpolate::linear::Linear;
use dasp_signal::{self as signal, Signal};

use crate::wav_format::load_pcm;
use crate::FormatError;

/// Flash left for voice tables: 32256 bytes of program space minus the
/// 11586-byte firmware image.
pub const TABLE_BUDGET: usize = 32256 - 11586;

/// Rate the engine reads tables at with a voice increment of 128.
const NATURAL_RATE: u32 = TICK_HZ * 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Samples to drop from the end after trimming silence
    pub trim: usize,
}

/// Convert a WAV file into a voice table.
///
/// The source is mixed to mono, resampled to twice the tick rate,
/// peak-normalized, scaled to +-127 with truncation toward zero, stripped
/// of leading and trailing zero samples, shortened by `options.trim`, then
/// offset to unsigned around 127.
pub fn import_table(data: &[u8], name: &str, options: ImportOptions) -> Result<Table, FormatError> {
    let pcm = load_pcm(data)?;
    let samples = if pcm.sample_rate == NATURAL_RATE {
        pcm.samples
    } else {
        log::debug!("{}: resampling {} Hz -> {} Hz", name, pcm.sample_rate, NATURAL_RATE);
        resample(&pcm.samples, pcm.sample_rate, NATURAL_RATE)
    };

    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if peak == 0.0 {
        return Err(FormatError::Empty);
    }

    let scaled: Vec<i32> = samples
        .iter()
        .map(|s| (CENTER as f32 * s / peak) as i32)
        .collect();

    let start = scaled.iter().position(|&v| v != 0).unwrap_or(scaled.len());
    let end = scaled.iter().rposition(|&v| v != 0).map_or(start, |i| i + 1);
    let kept = end.saturating_sub(options.trim).max(start);
    let body = &scaled[start..kept];
    if body.is_empty() {
        return Err(FormatError::Empty);
    }

    if body.len() > MAX_TABLE_LEN {
        log::warn!(
            "{}: {} samples, keeping the first {}",
            name,
            body.len(),
            MAX_TABLE_LEN
        );
    }

    let bytes: Vec<u8> = body.iter().map(|&v| (v + CENTER as i32) as u8).collect();
    log::debug!("{}: imported {} bytes", name, bytes.len().min(MAX_TABLE_LEN));
    Ok(Table::from_bytes(name, &bytes))
}

/// Linear-interpolated rate conversion; the output keeps the source duration.
fn resample(samples: &[f32], from_hz: u32, to_hz: u32) -> Vec<f32> {
    if from_hz == 0 || samples.is_empty() {
        return Vec::new();
    }
    let len = (samples.len() as u64 * to_hz as u64 / from_hz as u64) as usize;
    let mut source = signal::from_iter(samples.iter().copied());
    let a = source.next();
    let b = source.next();
    source
        .from_hz_to_hz(Linear::new(a, b), from_hz as f64, to_hz as f64)
        .take(len)
        .collect()
}

/// Total table size, or `OverBudget` when it would not fit in flash.
pub fn check_budget<'a>(tables: impl IntoIterator<Item = &'a Table>) -> Result<usize, FormatError> {
    let used = tables.into_iter().map(Table::len).sum();
    if used > TABLE_BUDGET {
        return Err(FormatError::OverBudget {
            used,
            available: TABLE_BUDGET,
        });
    }
    Ok(used)
}
