#![allow(dead_code)]

use attend_core::{BackgroundLevel, CueLabel};
use attend_experiment::{AudioOutput, OutputError, Presenter, Session, SessionConfig};
use attend_timing::{Clock, ManualClock, ms};
use rand::SeedableRng;
use rand::rngs::StdRng;

pub const T0: u64 = ms(5_000);

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Cue(CueLabel),
    InterTrial,
    Status(String),
    Tone(f32),
    Distractor(String),
    Ambient(BackgroundLevel),
    StopAmbient,
}

/// Records every collaborator call with the clock time it was made at.
pub struct Recorder {
    clock: ManualClock,
    pub calls: Vec<(u64, Call)>,
    pub fail: bool,
}

impl Recorder {
    pub fn new(clock: &ManualClock) -> Self {
        Self {
            clock: clock.clone(),
            calls: Vec::new(),
            fail: false,
        }
    }

    fn push(&mut self, call: Call) -> Result<(), OutputError> {
        self.calls.push((self.clock.now(), call));
        if self.fail {
            Err(OutputError::Unavailable("test device".into()))
        } else {
            Ok(())
        }
    }

    /// Times (relative to T0, in ms) of calls matching `pred`
    pub fn times_ms(&self, pred: impl Fn(&Call) -> bool) -> Vec<u64> {
        self.calls
            .iter()
            .filter(|(_, c)| pred(c))
            .map(|(t, _)| (t - T0) / 1_000_000)
            .collect()
    }
}

impl Presenter for Recorder {
    fn present_cue(&mut self, label: CueLabel) -> Result<(), OutputError> {
        self.push(Call::Cue(label))
    }
    fn present_inter_trial_message(&mut self) -> Result<(), OutputError> {
        self.push(Call::InterTrial)
    }
    fn set_status(&mut self, status: &str) -> Result<(), OutputError> {
        self.push(Call::Status(status.to_string()))
    }
}

impl AudioOutput for Recorder {
    fn play_alert_tone(&mut self, gain: f32) -> Result<(), OutputError> {
        self.push(Call::Tone(gain))
    }
    fn play_distractor_sound(&mut self, clip: &str, _gain: f32) -> Result<(), OutputError> {
        self.push(Call::Distractor(clip.to_string()))
    }
    fn set_ambient_level(&mut self, level: BackgroundLevel, _gain: f32) -> Result<(), OutputError> {
        self.push(Call::Ambient(level))
    }
    fn stop_ambient(&mut self) -> Result<(), OutputError> {
        self.push(Call::StopAmbient)
    }
}

pub type TestSession = Session<ManualClock, StdRng, Recorder, Recorder>;

pub fn session(config: SessionConfig, seed: u64) -> TestSession {
    let clock = ManualClock::starting_at(T0);
    let presenter = Recorder::new(&clock);
    let audio = Recorder::new(&clock);
    Session::new(config, clock, StdRng::seed_from_u64(seed), presenter, audio)
        .expect("valid test config")
}

/// Single-block config with a fixed ISI and no side events.
pub fn plain_config(duration_ms: u64, isi_ms: u64) -> SessionConfig {
    let mut config = SessionConfig::default();
    config.blocks.order = vec![attend_core::Block::C];
    config.blocks.duration_ms = duration_ms;
    config.timing.min_isi_ms = isi_ms;
    config.timing.max_isi_ms = isi_ms;
    config.capture.p_capture = 0.0;
    config
}

pub fn at(ms_after_t0: u64) -> u64 {
    T0 + ms(ms_after_t0)
}
