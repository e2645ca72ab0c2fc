//! Layered TOML configuration.
//!
//! The embedded `config.toml` supplies every default; an optional user file
//! at `<config dir>/bleepdrum/config.toml` overrides individual keys.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bd_engine::{DEFAULT_STEP_LENGTH, ERASE_HOLD};
use bd_ir::{MixMode, TrackId, TICK_HZ};
use serde::Deserialize;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// A config file is not valid TOML or has mistyped keys
    Parse { path: String, message: String },
    /// An explicitly requested file could not be read
    Io(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse { path, message } => write!(f, "{}: {}", path, message),
            ConfigError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e.to_string())
    }
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    engine: EngineSection,
    #[serde(default)]
    controller: ControllerSection,
    #[serde(default)]
    midi: MidiSection,
    #[serde(default)]
    kit: KitSection,
    #[serde(default)]
    keyboard: KeyboardSection,
}

#[derive(Deserialize, Default)]
struct EngineSection {
    tick_hz: Option<u32>,
    mix_mode: Option<String>,
    step_length: Option<u32>,
    click: Option<bool>,
}

#[derive(Deserialize, Default)]
struct ControllerSection {
    loop_hz: Option<u32>,
    erase_hold: Option<u16>,
    click_hold: Option<u16>,
    erased_display_secs: Option<u64>,
}

#[derive(Deserialize, Default)]
struct MidiSection {
    port: Option<String>,
    channel: Option<u8>,
}

#[derive(Deserialize, Default)]
struct KitSection {
    dir: Option<PathBuf>,
    red: Option<PathBuf>,
    blue: Option<PathBuf>,
    green: Option<PathBuf>,
    yellow: Option<PathBuf>,
}

#[derive(Deserialize, Default)]
struct KeyboardSection {
    hold_ms: Option<u64>,
}

/// Effective configuration: embedded defaults with user overrides applied.
pub struct Config {
    engine: EngineSection,
    controller: ControllerSection,
    midi: MidiSection,
    kit: KitSection,
    keyboard: KeyboardSection,
}

impl Config {
    /// Embedded defaults merged with the user file, if there is one.
    ///
    /// A user file that cannot be read or parsed is logged and skipped.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::defaults()?;
        if let Some(path) = user_config_path() {
            if path.exists() {
                match read_file(&path) {
                    Ok(user) => config.merge(user),
                    Err(e) => log::warn!(target: "config", "ignoring config: {}", e),
                }
            }
        }
        Ok(config)
    }

    /// Embedded defaults merged with a file named on the command line.
    /// Unlike [`Config::load`], a bad file here is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::defaults()?;
        config.merge(read_file(path)?);
        Ok(config)
    }

    /// Embedded defaults only.
    pub fn defaults() -> Result<Self, ConfigError> {
        let base = parse(DEFAULT_CONFIG, "<embedded>")?;
        Ok(Self::from_file(base))
    }

    /// Embedded defaults merged with TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::defaults()?;
        config.merge(parse(text, "<string>")?);
        Ok(config)
    }

    fn from_file(file: ConfigFile) -> Self {
        Self {
            engine: file.engine,
            controller: file.controller,
            midi: file.midi,
            kit: file.kit,
            keyboard: file.keyboard,
        }
    }

    fn merge(&mut self, user: ConfigFile) {
        merge_engine(&mut self.engine, user.engine);
        merge_controller(&mut self.controller, user.controller);
        merge_midi(&mut self.midi, user.midi);
        merge_kit(&mut self.kit, user.kit);
        if user.keyboard.hold_ms.is_some() {
            self.keyboard.hold_ms = user.keyboard.hold_ms;
        }
    }

    // --- Engine ---

    pub fn tick_hz(&self) -> u32 {
        self.engine.tick_hz.unwrap_or(TICK_HZ).max(1)
    }

    pub fn mix_mode(&self) -> MixMode {
        self.engine
            .mix_mode
            .as_deref()
            .and_then(parse_mix_mode)
            .unwrap_or_default()
    }

    pub fn step_length(&self) -> u32 {
        self.engine.step_length.unwrap_or(DEFAULT_STEP_LENGTH).max(1)
    }

    pub fn click(&self) -> bool {
        self.engine.click.unwrap_or(true)
    }

    // --- Controller ---

    pub fn loop_hz(&self) -> u32 {
        self.controller.loop_hz.unwrap_or(500).clamp(1, 100_000)
    }

    pub fn erase_hold(&self) -> u16 {
        self.controller.erase_hold.unwrap_or(ERASE_HOLD).max(1)
    }

    pub fn click_hold(&self) -> u16 {
        self.controller.click_hold.unwrap_or(800).max(1)
    }

    pub fn erased_display(&self) -> Duration {
        Duration::from_secs(self.controller.erased_display_secs.unwrap_or(10))
    }

    // --- MIDI ---

    pub fn midi_port(&self) -> Option<&str> {
        self.midi.port.as_deref()
    }

    /// Zero-based MIDI channel, or `None` for omni.
    pub fn midi_channel(&self) -> Option<u8> {
        self.midi
            .channel
            .filter(|c| (1..=16).contains(c))
            .map(|c| c - 1)
    }

    // --- Kit ---

    pub fn kit_dir(&self) -> Option<&Path> {
        self.kit.dir.as_deref()
    }

    /// Sample file for a track: the per-track key, resolved against the kit
    /// directory, or `<dir>/<track>.wav`.
    pub fn kit_file(&self, track: TrackId) -> Option<PathBuf> {
        let named = match track {
            TrackId::Red => &self.kit.red,
            TrackId::Blue => &self.kit.blue,
            TrackId::Green => &self.kit.green,
            TrackId::Yellow => &self.kit.yellow,
        };
        match (named, self.kit.dir.as_deref()) {
            (Some(file), Some(dir)) => Some(dir.join(file)),
            (Some(file), None) => Some(file.clone()),
            (None, Some(dir)) => Some(dir.join(format!("{}.wav", track.name()))),
            (None, None) => None,
        }
    }

    // --- Command-line overrides ---

    pub fn set_step_length(&mut self, ticks: u32) {
        self.engine.step_length = Some(ticks);
    }

    pub fn set_mix_mode(&mut self, mode: MixMode) {
        let name = match mode {
            MixMode::Direct => "direct",
            MixMode::Blend => "blend",
        };
        self.engine.mix_mode = Some(name.to_string());
    }

    // --- Keyboard ---

    pub fn key_hold(&self) -> Duration {
        Duration::from_millis(self.keyboard.hold_ms.unwrap_or(600))
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bleepdrum").join("config.toml"))
}

fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    parse(&contents, &path.display().to_string())
}

fn parse(text: &str, origin: &str) -> Result<ConfigFile, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::Parse {
        path: origin.to_string(),
        message: e.to_string(),
    })
}

fn merge_engine(base: &mut EngineSection, user: EngineSection) {
    if user.tick_hz.is_some() {
        base.tick_hz = user.tick_hz;
    }
    if user.mix_mode.is_some() {
        base.mix_mode = user.mix_mode;
    }
    if user.step_length.is_some() {
        base.step_length = user.step_length;
    }
    if user.click.is_some() {
        base.click = user.click;
    }
}

fn merge_controller(base: &mut ControllerSection, user: ControllerSection) {
    if user.loop_hz.is_some() {
        base.loop_hz = user.loop_hz;
    }
    if user.erase_hold.is_some() {
        base.erase_hold = user.erase_hold;
    }
    if user.click_hold.is_some() {
        base.click_hold = user.click_hold;
    }
    if user.erased_display_secs.is_some() {
        base.erased_display_secs = user.erased_display_secs;
    }
}

fn merge_midi(base: &mut MidiSection, user: MidiSection) {
    if user.port.is_some() {
        base.port = user.port;
    }
    if user.channel.is_some() {
        base.channel = user.channel;
    }
}

fn merge_kit(base: &mut KitSection, user: KitSection) {
    if user.dir.is_some() {
        base.dir = user.dir;
    }
    if user.red.is_some() {
        base.red = user.red;
    }
    if user.blue.is_some() {
        base.blue = user.blue;
    }
    if user.green.is_some() {
        base.green = user.green;
    }
    if user.yellow.is_some() {
        base.yellow = user.yellow;
    }
}

pub fn parse_mix_mode(s: &str) -> Option<MixMode> {
    match s.to_ascii_lowercase().as_str() {
        "direct" => Some(MixMode::Direct),
        "blend" | "noise" => Some(MixMode::Blend),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse() {
        let config = Config::defaults().unwrap();
        assert_eq!(config.tick_hz(), TICK_HZ);
        assert_eq!(config.mix_mode(), MixMode::Direct);
        assert_eq!(config.step_length(), DEFAULT_STEP_LENGTH);
        assert!(config.click());
        assert_eq!(config.erase_hold(), 800);
        assert_eq!(config.click_hold(), 800);
        assert_eq!(config.erased_display(), Duration::from_secs(10));
        assert_eq!(config.midi_channel(), None);
        assert_eq!(config.midi_port(), None);
        assert_eq!(config.kit_file(TrackId::Red), None);
    }

    #[test]
    fn user_keys_override_only_what_they_name() {
        let config = Config::from_toml(
            "[engine]\nmix_mode = \"blend\"\n[controller]\nerase_hold = 100\n[midi]\nchannel = 3\n",
        )
        .unwrap();
        assert_eq!(config.mix_mode(), MixMode::Blend);
        assert_eq!(config.erase_hold(), 100);
        assert_eq!(config.midi_channel(), Some(2));
        assert_eq!(config.step_length(), DEFAULT_STEP_LENGTH);
        assert_eq!(config.loop_hz(), 500);
    }

    #[test]
    fn unknown_mix_mode_falls_back() {
        let config = Config::from_toml("[engine]\nmix_mode = \"loud\"\n").unwrap();
        assert_eq!(config.mix_mode(), MixMode::Direct);
    }

    #[test]
    fn malformed_text_is_an_error() {
        assert!(matches!(
            Config::from_toml("[engine]\nstep_length = \"fast\"\n"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn kit_files_resolve_against_dir() {
        let config = Config::from_toml("[kit]\ndir = \"/k\"\nblue = \"b2.wav\"\n").unwrap();
        assert_eq!(config.kit_file(TrackId::Red), Some(PathBuf::from("/k/red.wav")));
        assert_eq!(config.kit_file(TrackId::Blue), Some(PathBuf::from("/k/b2.wav")));
    }

    #[test]
    fn command_line_overrides() {
        let mut config = Config::defaults().unwrap();
        config.set_step_length(0);
        config.set_mix_mode(MixMode::Blend);
        assert_eq!(config.step_length(), 1);
        assert_eq!(config.mix_mode(), MixMode::Blend);
    }

    #[test]
    fn out_of_range_channel_is_omni() {
        let config = Config::from_toml("[midi]\nchannel = 17\n").unwrap();
        assert_eq!(config.midi_channel(), None);
    }
}
