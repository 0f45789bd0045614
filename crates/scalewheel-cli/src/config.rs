use std::path::{Path, PathBuf};

use scalewheel_core::bits::{self, FULL_MASK};
use scalewheel_core::Convention;
use scalewheel_services::PlaybackSettings;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub playback: PlaybackSettings,
    #[serde(default)]
    pub spelling: SpellingConfig,
    #[serde(default)]
    pub presets: Vec<PresetEntry>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct SpellingConfig {
    /// Convention forced after loading; automatic when absent
    #[serde(default)]
    pub prefer: Option<SpellingPreference>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpellingPreference {
    Sharp,
    Flat,
}

impl From<SpellingPreference> for Convention {
    fn from(pref: SpellingPreference) -> Self {
        match pref {
            SpellingPreference::Sharp => Convention::Sharp,
            SpellingPreference::Flat => Convention::Flat,
        }
    }
}

/// User-defined shape, loaded with `--preset NAME`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetEntry {
    pub name: String,
    pub value: PresetValue,
}

/// Either a raw mask or the older 12-entry 0/1 list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PresetValue {
    Mask(u16),
    Flags(Vec<u8>),
}

impl PresetValue {
    pub fn mask(&self) -> scalewheel_core::Result<u16> {
        match self {
            Self::Mask(mask) => Ok(mask & FULL_MASK),
            Self::Flags(flags) => {
                let flags: Vec<bool> = flags.iter().map(|&f| f != 0).collect();
                bits::mask_from_flags(&flags)
            }
        }
    }
}

impl AppConfig {
    pub fn preset(&self, name: &str) -> Option<&PresetEntry> {
        self.presets
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scalewheel")
        .join("config.toml")
}

/// Read the config file; anything missing or malformed yields defaults
pub fn load_config(explicit: Option<&Path>) -> AppConfig {
    let path = explicit.map(Path::to_path_buf).unwrap_or_else(config_path);
    let Ok(contents) = std::fs::read_to_string(&path) else {
        if explicit.is_some() {
            warn!(path = %path.display(), "Config file not readable, using defaults");
        }
        return AppConfig::default();
    };
    parse_config(&contents).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Config file invalid, using defaults");
        AppConfig::default()
    })
}

fn parse_config(contents: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalewheel_core::{ScaleError, ScaleState};
    use scalewheel_services::{PlaybackError, ScalePlayer};

    #[test]
    fn test_empty_config_is_default() {
        let config = parse_config("").unwrap();
        assert_eq!(config.playback, PlaybackSettings::default());
        assert_eq!(config.spelling.prefer, None);
        assert!(config.presets.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = parse_config(
            r#"
            [playback]
            bpm = 90
            looping = true

            [spelling]
            prefer = "flat"

            [[presets]]
            name = "Ionian"
            value = 2741

            [[presets]]
            name = "Hirajoshi"
            value = [1, 0, 1, 1, 0, 0, 0, 1, 1, 0, 0, 0]
            "#,
        )
        .unwrap();

        assert_eq!(config.playback.bpm, 90);
        assert!(config.playback.looping);
        assert_eq!(config.playback.base_note, 60);
        assert_eq!(config.spelling.prefer, Some(SpellingPreference::Flat));
        assert_eq!(Convention::from(SpellingPreference::Flat), Convention::Flat);

        assert_eq!(config.preset("ionian").unwrap().value.mask(), Ok(2741));
        assert_eq!(
            config.preset(" HIRAJOSHI ").unwrap().value.mask(),
            Ok(0b000110001101)
        );
        assert!(config.preset("dorian").is_none());
    }

    #[test]
    fn test_preset_value_forms() {
        assert_eq!(PresetValue::Mask(0xFFFF).mask(), Ok(0xFFF));
        assert_eq!(
            PresetValue::Flags(vec![1, 0, 1]).mask(),
            Err(ScaleError::InvalidFlagCount(3))
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(parse_config("[spelling]\nprefer = \"natural\"").is_err());
        assert!(parse_config("[playback]\nbpm = \"fast\"").is_err());
    }

    #[test]
    fn test_zero_bpm_cannot_reach_player() {
        let config = parse_config("[playback]\nbpm = 0").unwrap();
        let player = ScalePlayer::new(ScaleState::default().snapshot(), config.playback);
        assert!(matches!(player, Err(PlaybackError::InvalidTempo(0))));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = load_config(Some(Path::new("/nonexistent/scalewheel/config.toml")));
        assert_eq!(config.playback, PlaybackSettings::default());
    }
}
