use attend_core::{BackgroundLevel, Block};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Static run configuration, read once before a session starts
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub blocks: BlockConfig,
    pub timing: TimingConfig,
    pub responses: ResponseConfig,
    pub alert: AlertConfig,
    pub capture: CaptureConfig,
    pub background: BackgroundConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockConfig {
    #[serde(default = "BlockConfig::default_order")]
    pub order: Vec<Block>,
    #[serde(default = "BlockConfig::default_duration_ms")]
    pub duration_ms: u64,
    #[serde(default = "BlockConfig::default_pause_ms")]
    pub pause_ms: u64,
}

impl BlockConfig {
    fn default_order() -> Vec<Block> {
        vec![Block::A, Block::B, Block::C]
    }
    fn default_duration_ms() -> u64 {
        180_000
    }
    fn default_pause_ms() -> u64 {
        1_500
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            order: Self::default_order(),
            duration_ms: Self::default_duration_ms(),
            pause_ms: Self::default_pause_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "TimingConfig::default_min_isi_ms")]
    pub min_isi_ms: u64,
    #[serde(default = "TimingConfig::default_max_isi_ms")]
    pub max_isi_ms: u64,
    /// Delay between cue presentation and the "continue" message
    #[serde(default = "TimingConfig::default_inter_trial_message_ms")]
    pub inter_trial_message_ms: u64,
}

impl TimingConfig {
    fn default_min_isi_ms() -> u64 {
        2_400
    }
    fn default_max_isi_ms() -> u64 {
        4_800
    }
    fn default_inter_trial_message_ms() -> u64 {
        700
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            min_isi_ms: Self::default_min_isi_ms(),
            max_isi_ms: Self::default_max_isi_ms(),
            inter_trial_message_ms: Self::default_inter_trial_message_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub p_plus: f64,
    pub avoid_long_runs: bool,
    pub max_run_length: u32,
    pub min_inter_tap_ms: u64,
    pub anticipatory_ms: f64,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            p_plus: 0.5,
            avoid_long_runs: true,
            max_run_length: 3,
            min_inter_tap_ms: 120,
            anticipatory_ms: 250.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Probability that an alert-block trial carries a tone
    pub p_alert: f64,
    /// Probability of the high-salience tone, given a tone
    pub p_high: f64,
    pub gain_low: f32,
    pub gain_high: f32,
    /// Lead of the tone over cue onset
    pub soa_ms: u64,
    pub tone_freq_hz: f32,
    pub tone_duration_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            p_alert: 0.5,
            p_high: 0.5,
            gain_low: 0.08,
            gain_high: 0.18,
            soa_ms: 400,
            tone_freq_hz: 880.0,
            tone_duration_ms: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub p_capture: f64,
    /// Post-cue onsets of the distractor
    pub soas_ms: Vec<u64>,
    pub gain: f32,
    pub clips: Vec<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            p_capture: 0.30,
            soas_ms: vec![200, 300, 400],
            gain: 0.35,
            clips: vec![
                "media/door.wav".to_string(),
                "media/chair.wav".to_string(),
                "media/honk.wav".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub loop_file: String,
    pub off_gain: f32,
    pub low_gain: f32,
    pub mid_gain: f32,
}

impl BackgroundConfig {
    pub fn gain(&self, level: BackgroundLevel) -> f32 {
        match level {
            BackgroundLevel::Off => self.off_gain,
            BackgroundLevel::Low => self.low_gain,
            BackgroundLevel::Mid => self.mid_gain,
        }
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            loop_file: "media/noise_classroom_loop.wav".to_string(),
            off_gain: 0.0,
            low_gain: 0.10,
            mid_gain: 0.22,
        }
    }
}

impl SessionConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Validation(msg));

        if self.blocks.order.is_empty() {
            return invalid("block order is empty".into());
        }
        let mut seen = HashSet::new();
        for block in &self.blocks.order {
            if !seen.insert(*block) {
                return invalid(format!("block {block} appears more than once"));
            }
        }
        if self.blocks.duration_ms == 0 {
            return invalid("block duration must be positive".into());
        }
        if self.timing.min_isi_ms > self.timing.max_isi_ms {
            return invalid(format!(
                "min ISI {} ms exceeds max ISI {} ms",
                self.timing.min_isi_ms, self.timing.max_isi_ms
            ));
        }
        if self.capture.soas_ms.is_empty() {
            return invalid("capture SOA set is empty".into());
        }
        if self.capture.soas_ms.contains(&0) {
            return invalid("capture SOAs must be strictly post-cue".into());
        }
        if self.alert.soa_ms == 0 {
            return invalid("alert SOA must strictly precede the cue".into());
        }
        if self.capture.clips.is_empty() {
            return invalid("capture clip list is empty".into());
        }
        // Side events must land before the next trial can open.
        let longest_side_event = self
            .capture
            .soas_ms
            .iter()
            .copied()
            .max()
            .unwrap_or(0)
            .max(self.alert.soa_ms);
        if self.timing.min_isi_ms <= longest_side_event {
            return invalid(format!(
                "min ISI {} ms must exceed the longest SOA ({} ms)",
                self.timing.min_isi_ms, longest_side_event
            ));
        }
        for (name, p) in [
            ("responses.p_plus", self.responses.p_plus),
            ("alert.p_alert", self.alert.p_alert),
            ("alert.p_high", self.alert.p_high),
            ("capture.p_capture", self.capture.p_capture),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return invalid(format!("{name} = {p} is not a probability"));
            }
        }
        for (name, g) in [
            ("alert.gain_low", self.alert.gain_low),
            ("alert.gain_high", self.alert.gain_high),
            ("capture.gain", self.capture.gain),
            ("background.off_gain", self.background.off_gain),
            ("background.low_gain", self.background.low_gain),
            ("background.mid_gain", self.background.mid_gain),
        ] {
            if !(0.0..=1.0).contains(&g) {
                return invalid(format!("{name} = {g} is outside 0..1"));
            }
        }
        if self.responses.avoid_long_runs && self.responses.max_run_length == 0 {
            return invalid("max run length must be at least 1".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SessionConfig::default();
        config.validate().unwrap();
        assert_eq!(config.blocks.order, vec![Block::A, Block::B, Block::C]);
        assert_eq!(config.blocks.duration(), Duration::from_secs(180));
        assert_eq!(config.capture.soas_ms, vec![200, 300, 400]);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config = SessionConfig::from_toml_str(
            r#"
            [blocks]
            order = ["C", "A"]
            duration_ms = 60000

            [capture]
            p_capture = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.blocks.order, vec![Block::C, Block::A]);
        assert_eq!(config.blocks.pause_ms, 1_500);
        assert_eq!(config.capture.p_capture, 0.5);
        assert_eq!(config.capture.soas_ms, vec![200, 300, 400]);
        assert_eq!(config.timing, TimingConfig::default());
    }

    #[test]
    fn rejects_inverted_isi_and_duplicate_blocks() {
        let mut config = SessionConfig::default();
        config.timing.min_isi_ms = 5_000;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = SessionConfig::default();
        config.blocks.order = vec![Block::A, Block::A];
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_isi_shorter_than_side_events() {
        let mut config = SessionConfig::default();
        config.timing.min_isi_ms = 400;
        config.timing.max_isi_ms = 400;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_probability() {
        assert!(matches!(
            SessionConfig::from_toml_str("[alert]\np_alert = 1.5\n"),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            SessionConfig::from_toml_str("[alert\n"),
            Err(ConfigError::TomlParse(_))
        ));
    }
}
