//! Sample table import and WAV export for bleepdrum.
//!
//! Turns ordinary PCM WAV files into normalized 8-bit unsigned voice
//! tables centred on 127, and writes rendered output back out as 8-bit
//! mono WAV.

mod table_import;
mod wav_format;

pub use table_import::{check_budget, import_table, ImportOptions, TABLE_BUDGET};
pub use wav_format::{load_pcm, samples_to_wav, write_wav, Pcm};

/// Error type for format parsing.
#[derive(Debug)]
pub enum FormatError {
    /// Invalid file header or magic bytes
    InvalidHeader,
    /// Unexpected end of file
    UnexpectedEof,
    /// Encoding other than 8/16-bit integer PCM, mono or stereo
    UnsupportedEncoding,
    /// Sample is silent after trimming
    Empty,
    /// Tables use more than the flash budget allows
    OverBudget { used: usize, available: usize },
    /// I/O error
    Io(String),
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::InvalidHeader => write!(f, "invalid WAV header"),
            FormatError::UnexpectedEof => write!(f, "unexpected end of file"),
            FormatError::UnsupportedEncoding => write!(f, "unsupported WAV encoding"),
            FormatError::Empty => write!(f, "sample is silent"),
            FormatError::OverBudget { used, available } => write!(
                f,
                "tables use {} bytes, {} available; trim by {}",
                used,
                available,
                used.saturating_sub(*available)
            ),
            FormatError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for FormatError {}

impl From<std::io::Error> for FormatError {
    fn from(e: std::io::Error) -> Self {
        FormatError::Io(e.to_string())
    }
}
