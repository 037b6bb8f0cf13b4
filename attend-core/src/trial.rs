use serde::{Deserialize, Serialize};

use crate::block::{BackgroundLevel, Block, Condition};
use crate::cue::{Choice, CueLabel};

const NANOS_PER_MS: f64 = 1_000_000.0;

/// Signed distance in milliseconds from `origin_ns` to `at_ns`.
pub fn rel_ms(at_ns: u64, origin_ns: u64) -> f64 {
    (at_ns as i128 - origin_ns as i128) as f64 / NANOS_PER_MS
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEventType {
    #[default]
    None,
    AlertTone,
    CaptureSound,
}

impl SideEventType {
    /// Export form; trials without a side event leave the cell blank
    pub fn as_str(&self) -> &'static str {
        match self {
            SideEventType::None => "",
            SideEventType::AlertTone => "alert_tone",
            SideEventType::CaptureSound => "capture_sound",
        }
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Salience {
    #[default]
    None,
    Low,
    High,
    Familiar,
}

impl Salience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Salience::None => "",
            Salience::Low => "low",
            Salience::High => "high",
            Salience::Familiar => "familiar",
        }
    }
}

/// How a trial was closed
#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Responded,
    Omitted,
}

/// Trial lifecycle
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum TrialPhase {
    Planned,
    /// Pre-cue side event fired, cue presentation pending
    SideEventScheduled,
    CueShown,
    Closed(Outcome),
}

/// One stimulus presentation. Times are absolute clock nanoseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub index: usize,
    pub block: Block,
    pub condition: Condition,
    pub cue_label: CueLabel,
    pub opened_ns: u64,
    pub cue_onset_ns: u64,
    pub side_event: SideEventType,
    pub salience: Salience,
    pub soa_ms: Option<i64>,
    pub side_event_ns: Option<u64>,
    pub background: Option<BackgroundLevel>,
    pub trial_after_event: u8,
    pub phase: TrialPhase,
}

impl Trial {
    pub fn correct_answer(&self) -> Choice {
        self.cue_label.correct_answer()
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.phase, TrialPhase::Closed(_))
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            TrialPhase::Closed(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Closes the trial. Returns false (and changes nothing) if it was already closed.
    pub fn close(&mut self, outcome: Outcome) -> bool {
        if !self.is_open() {
            return false;
        }
        self.phase = TrialPhase::Closed(outcome);
        true
    }
}

/// Derived indices of an accepted response
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseMetrics {
    pub choice: Choice,
    pub correct: bool,
    pub rt_ms: f64,
    pub anticipatory: bool,
    pub perseveration: bool,
    pub same_as_prev_choice: bool,
}

/// Recorded outcome per trial: to be exported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub trial_index: usize,
    pub block: Block,
    pub condition: Condition,
    pub cue_label: CueLabel,
    pub correct_answer: Choice,
    pub choice: Option<Choice>,
    pub correct: Option<bool>,
    pub rt_ms: Option<f64>,
    pub cue_time_rel_ms: f64,
    pub minute_bin: i64,
    pub soa_ms: Option<i64>,
    pub event_type: SideEventType,
    pub event_salience: Salience,
    pub background_level: Option<BackgroundLevel>,
    pub trial_after_event: u8,
    pub anticipatory: Option<bool>,
    pub perseveration: Option<bool>,
    pub same_as_prev_choice: Option<bool>,
    pub omission: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_event_rel_ms: Option<f64>,
}

impl LogRecord {
    /// Projects a closed trial into a row. `response` is `None` for omissions.
    pub fn from_trial(trial: &Trial, run_start_ns: u64, response: Option<ResponseMetrics>) -> Self {
        let cue_time_rel_ms = rel_ms(trial.cue_onset_ns, run_start_ns);
        Self {
            trial_index: trial.index,
            block: trial.block,
            condition: trial.condition,
            cue_label: trial.cue_label,
            correct_answer: trial.correct_answer(),
            choice: response.map(|r| r.choice),
            correct: response.map(|r| r.correct),
            rt_ms: response.map(|r| r.rt_ms),
            cue_time_rel_ms,
            minute_bin: (cue_time_rel_ms / 60_000.0).floor() as i64,
            soa_ms: trial.soa_ms,
            event_type: trial.side_event,
            event_salience: trial.salience,
            background_level: trial.background,
            trial_after_event: trial.trial_after_event,
            anticipatory: response.map(|r| r.anticipatory),
            perseveration: response.map(|r| r.perseveration),
            same_as_prev_choice: response.map(|r| r.same_as_prev_choice),
            omission: response.is_none(),
            side_event_rel_ms: trial.side_event_ns.map(|ns| rel_ms(ns, run_start_ns)),
        }
    }
}
