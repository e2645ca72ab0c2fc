//! WAV decoding to mono PCM and 8-bit mono encoding.

use crate::FormatError;
use std::io::Write;

/// Size of the canonical header in front of the sample data.
const HEADER_LEN: usize = 44;

// --- Writing ---

/// Write unsigned 8-bit mono samples as a WAV file. The data chunk is
/// padded to an even length.
pub fn write_wav(w: &mut impl Write, samples: &[u8], sample_rate: u32) -> std::io::Result<()> {
    let data_len = samples.len() as u32;
    let pad = data_len & 1;

    let mut header = [0u8; HEADER_LEN];
    let fields: [(usize, &[u8]); 13] = [
        (0, b"RIFF"),
        (4, &(HEADER_LEN as u32 - 8 + data_len + pad).to_le_bytes()),
        (8, b"WAVE"),
        (12, b"fmt "),
        (16, &16u32.to_le_bytes()),
        (20, &1u16.to_le_bytes()),
        (22, &1u16.to_le_bytes()),
        (24, &sample_rate.to_le_bytes()),
        // One byte per frame, so byte rate equals sample rate.
        (28, &sample_rate.to_le_bytes()),
        (32, &1u16.to_le_bytes()),
        (34, &8u16.to_le_bytes()),
        (36, b"data"),
        (40, &data_len.to_le_bytes()),
    ];
    for (at, bytes) in fields {
        header[at..at + bytes.len()].copy_from_slice(bytes);
    }

    w.write_all(&header)?;
    w.write_all(samples)?;
    if pad == 1 {
        w.write_all(&[0])?;
    }
    Ok(())
}

pub fn samples_to_wav(samples: &[u8], sample_rate: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + samples.len() + 1);
    // Writing into a Vec cannot fail.
    let _ = write_wav(&mut buf, samples, sample_rate);
    buf
}

// --- Reading ---

/// Decoded audio, mixed down to mono, scaled to `[-1, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Pcm {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

/// Decode an integer PCM WAV file and mix it down to mono.
pub fn load_pcm(data: &[u8]) -> Result<Pcm, FormatError> {
    let body = data.get(12..).ok_or(FormatError::UnexpectedEof)?;
    if &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Err(FormatError::InvalidHeader);
    }

    let mut format = None;
    let mut pcm = None;
    for (id, chunk) in Chunks(body) {
        match &id {
            b"fmt " => format = Some(Format::parse(chunk)?),
            b"data" => pcm = Some(chunk),
            _ => {}
        }
    }
    let format = format.ok_or(FormatError::InvalidHeader)?;
    let pcm = pcm.ok_or(FormatError::InvalidHeader)?;

    let samples = pcm
        .chunks_exact(format.frame_bytes())
        .map(|frame| format.mono(frame))
        .collect();
    Ok(Pcm {
        sample_rate: format.sample_rate,
        samples,
    })
}

/// Walks RIFF sub-chunks, yielding each id with its body. A body cut
/// short by the end of the file is yielded truncated.
struct Chunks<'a>(&'a [u8]);

impl<'a> Iterator for Chunks<'a> {
    type Item = ([u8; 4], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.0;
        let id: [u8; 4] = rest.get(0..4)?.try_into().ok()?;
        let len = u32::from_le_bytes(rest.get(4..8)?.try_into().ok()?) as usize;
        let start: usize = 8;
        let end = start.saturating_add(len).min(rest.len());
        let next = end.saturating_add(len & 1).min(rest.len());
        self.0 = &rest[next..];
        Some((id, &rest[start..end]))
    }
}

/// The parts of a `fmt ` chunk the decoder needs.
struct Format {
    channels: usize,
    sample_rate: u32,
    bits: u16,
}

impl Format {
    fn parse(chunk: &[u8]) -> Result<Self, FormatError> {
        let field = |at: usize, len: usize| chunk.get(at..at + len).ok_or(FormatError::UnexpectedEof);
        let u16_at = |at| field(at, 2).map(|b| u16::from_le_bytes([b[0], b[1]]));
        let u32_at = |at| field(at, 4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]));

        let encoding = u16_at(0)?;
        let channels = u16_at(2)?;
        let sample_rate = u32_at(4)?;
        let bits = u16_at(14)?;
        // Integer PCM only; 8 or 16 bits, mono or stereo.
        if encoding != 1 || !matches!(bits, 8 | 16) || !matches!(channels, 1 | 2) {
            return Err(FormatError::UnsupportedEncoding);
        }
        Ok(Self {
            channels: channels as usize,
            sample_rate,
            bits,
        })
    }

    fn frame_bytes(&self) -> usize {
        self.channels * self.bits as usize / 8
    }

    /// Average of every channel in one frame.
    fn mono(&self, frame: &[u8]) -> f32 {
        let sum: f32 = match self.bits {
            // 8-bit WAV is unsigned, centre 128.
            8 => frame.iter().map(|&b| (b as f32 - 128.0) / 128.0).sum(),
            _ => frame
                .chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
                .sum(),
        };
        sum / self.channels as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A WAV with arbitrary format fields around `pcm`.
    fn wav_with(channels: u16, rate: u32, bits: u16, pcm: &[u8]) -> Vec<u8> {
        let mut wav = samples_to_wav(pcm, rate);
        wav[22..24].copy_from_slice(&channels.to_le_bytes());
        wav[34..36].copy_from_slice(&bits.to_le_bytes());
        wav
    }

    #[test]
    fn load_8bit_mono() {
        let pcm = load_pcm(&wav_with(1, 22050, 8, &[128, 192, 64])).unwrap();
        assert_eq!(pcm.sample_rate, 22050);
        assert_eq!(pcm.samples, vec![0.0, 0.5, -0.5]);
    }

    #[test]
    fn load_16bit_stereo_mixes_down() {
        let bytes: Vec<u8> = [16384i16, -16384, 8192, 8192]
            .iter()
            .flat_map(|&v| v.to_le_bytes())
            .collect();
        let pcm = load_pcm(&wav_with(2, 44100, 16, &bytes)).unwrap();
        assert_eq!(pcm.samples, vec![0.0, 0.25]);
    }

    #[test]
    fn skips_unknown_chunks() {
        let mut wav = samples_to_wav(&[200, 100], 8000);
        let mut list = b"LIST\x03\x00\x00\x00abc\x00".to_vec();
        list.extend(wav.split_off(36));
        wav.extend(list);
        let pcm = load_pcm(&wav).unwrap();
        assert_eq!(pcm.samples.len(), 2);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut wav = samples_to_wav(&[128], 8000);
        wav[0] = b'X';
        assert!(matches!(load_pcm(&wav), Err(FormatError::InvalidHeader)));
    }

    #[test]
    fn rejects_24bit() {
        let wav = wav_with(1, 8000, 24, &[0, 0, 0]);
        assert!(matches!(load_pcm(&wav), Err(FormatError::UnsupportedEncoding)));
    }

    #[test]
    fn rejects_truncated() {
        assert!(matches!(load_pcm(b"RIFF"), Err(FormatError::UnexpectedEof)));
    }

    #[test]
    fn written_wav_reads_back() {
        let wav = samples_to_wav(&[128, 255, 0], 9813);
        assert_eq!(wav.len(), HEADER_LEN + 4);
        assert_eq!(&wav[36..40], b"data");
        let pcm = load_pcm(&wav).unwrap();
        assert_eq!(pcm.sample_rate, 9813);
        assert_eq!(pcm.samples.len(), 3);
        assert_eq!(pcm.samples[0], 0.0);
    }
}
