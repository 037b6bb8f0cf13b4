//! Capabilities the session drives but does not implement: display and audio.
//!
//! Every call is fire-and-forget from the session's point of view. An `Err`
//! is logged and dropped; it never changes the schedule or the trial log.

use attend_core::{BackgroundLevel, CueLabel};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output device unavailable: {0}")]
    Unavailable(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait Presenter {
    fn present_cue(&mut self, label: CueLabel) -> Result<(), OutputError>;
    fn present_inter_trial_message(&mut self) -> Result<(), OutputError>;
    fn set_status(&mut self, status: &str) -> Result<(), OutputError>;
}

pub trait AudioOutput {
    /// Short alerting tone, `gain` in 0..1
    fn play_alert_tone(&mut self, gain: f32) -> Result<(), OutputError>;
    fn play_distractor_sound(&mut self, clip: &str, gain: f32) -> Result<(), OutputError>;
    fn set_ambient_level(&mut self, level: BackgroundLevel, gain: f32) -> Result<(), OutputError>;
    fn stop_ambient(&mut self) -> Result<(), OutputError>;
}

/// Discards everything. Useful for headless simulation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Presenter for Silent {
    fn present_cue(&mut self, _label: CueLabel) -> Result<(), OutputError> {
        Ok(())
    }
    fn present_inter_trial_message(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
    fn set_status(&mut self, _status: &str) -> Result<(), OutputError> {
        Ok(())
    }
}

impl AudioOutput for Silent {
    fn play_alert_tone(&mut self, _gain: f32) -> Result<(), OutputError> {
        Ok(())
    }
    fn play_distractor_sound(&mut self, _clip: &str, _gain: f32) -> Result<(), OutputError> {
        Ok(())
    }
    fn set_ambient_level(&mut self, _level: BackgroundLevel, _gain: f32) -> Result<(), OutputError> {
        Ok(())
    }
    fn stop_ambient(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}
