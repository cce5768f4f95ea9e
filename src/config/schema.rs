use serde::Deserialize;

use crate::audio::RepeatMode;

/// Top-level settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/vivace/config.toml` or
/// `~/.config/vivace/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `VIVACE__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub library: LibrarySettings,
    pub playback: PlaybackSettings,
    pub import: ImportSettings,
    pub spectrum: SpectrumSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: vec!["mp3".into(), "flac".into(), "wav".into(), "ogg".into()],
            follow_links: true,
            include_hidden: false,
            recursive: true,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Initial volume in `[0, 1]`.
    pub volume: f64,
    /// Whether shuffle starts enabled.
    pub shuffle: bool,
    /// Default repeat mode.
    pub repeat: RepeatModeSetting,
    /// Progress/auto-advance tick interval (milliseconds).
    pub progress_tick_ms: u64,
    /// Remaining time under which the tick treats a track as finished
    /// (milliseconds).
    pub near_end_threshold_ms: u64,
    /// Grace window after a seek during which progress ticks are skipped
    /// (milliseconds).
    pub seek_grace_ms: u64,
    /// Volume restored by unmute when the remembered volume was zero.
    pub unmute_fallback_volume: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            volume: 0.7,
            shuffle: false,
            repeat: RepeatModeSetting::Off,
            progress_tick_ms: 500,
            near_end_threshold_ms: 250,
            seek_grace_ms: 150,
            unmute_fallback_volume: 0.6,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Number of metadata-extraction workers. `None` uses the available
    /// parallelism of the machine.
    pub max_workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpectrumSettings {
    /// Delay between emitted spectrum frames (milliseconds).
    pub cadence_ms: u64,
    /// Idle delay while the sampler is paused (milliseconds).
    pub paused_idle_ms: u64,
    /// Frames decoded per analysis block (per channel).
    pub block_frames: usize,
}

impl Default for SpectrumSettings {
    fn default() -> Self {
        Self {
            cadence_ms: 30,
            paused_idle_ms: 50,
            block_frames: 2048,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepeatModeSetting {
    #[serde(alias = "no_repeat", alias = "none")]
    Off,
    #[serde(alias = "repeat_all", alias = "loop-all")]
    All,
    #[serde(alias = "repeat_one", alias = "loop-one")]
    One,
}

impl Default for RepeatModeSetting {
    fn default() -> Self {
        Self::Off
    }
}

impl From<RepeatModeSetting> for RepeatMode {
    fn from(value: RepeatModeSetting) -> Self {
        match value {
            RepeatModeSetting::Off => RepeatMode::Off,
            RepeatModeSetting::All => RepeatMode::All,
            RepeatModeSetting::One => RepeatMode::One,
        }
    }
}
