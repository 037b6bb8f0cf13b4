use attend_core::{BackgroundLevel, CueLabel};
use attend_experiment::{AudioOutput, OutputError, Presenter};
use std::io::{self, Write};
use tracing::{debug, info};

/// Cue and status text on stdout.
pub struct TerminalPresenter {
    out: io::Stdout,
}

impl TerminalPresenter {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Presenter for TerminalPresenter {
    fn present_cue(&mut self, label: CueLabel) -> Result<(), OutputError> {
        let mut out = self.out.lock();
        writeln!(out, "\n        {}\n", label.text())?;
        out.flush()?;
        Ok(())
    }

    fn present_inter_trial_message(&mut self) -> Result<(), OutputError> {
        let mut out = self.out.lock();
        writeln!(out, "Continue…")?;
        out.flush()?;
        Ok(())
    }

    fn set_status(&mut self, status: &str) -> Result<(), OutputError> {
        let mut out = self.out.lock();
        writeln!(out, "[{status}]")?;
        out.flush()?;
        Ok(())
    }
}

/// Rings the terminal bell for sounds; clip playback and the ambient loop
/// only leave a log trail.
pub struct TerminalAudio {
    out: io::Stdout,
    tone_freq_hz: f32,
    tone_duration_ms: u64,
    loop_file: String,
}

impl TerminalAudio {
    pub fn new(tone_freq_hz: f32, tone_duration_ms: u64, loop_file: String) -> Self {
        Self {
            out: io::stdout(),
            tone_freq_hz,
            tone_duration_ms,
            loop_file,
        }
    }

    fn bell(&mut self) -> Result<(), OutputError> {
        let mut out = self.out.lock();
        out.write_all(b"\x07")?;
        out.flush()?;
        Ok(())
    }
}

impl AudioOutput for TerminalAudio {
    fn play_alert_tone(&mut self, gain: f32) -> Result<(), OutputError> {
        debug!(
            freq_hz = self.tone_freq_hz,
            duration_ms = self.tone_duration_ms,
            gain,
            "alert tone"
        );
        self.bell()
    }

    fn play_distractor_sound(&mut self, clip: &str, gain: f32) -> Result<(), OutputError> {
        if clip.is_empty() {
            return Err(OutputError::Unavailable("no distractor clip".into()));
        }
        debug!(clip, gain, "distractor sound");
        self.bell()
    }

    fn set_ambient_level(&mut self, level: BackgroundLevel, gain: f32) -> Result<(), OutputError> {
        info!(file = %self.loop_file, %level, gain, "ambient level");
        Ok(())
    }

    fn stop_ambient(&mut self) -> Result<(), OutputError> {
        info!(file = %self.loop_file, "ambient stopped");
        Ok(())
    }
}
