//! Response handler.

use super::output::{AudioOutput, Presenter};
use super::state::Session;
use attend_core::{Choice, LogRecord, Outcome, ResponseMetrics, rel_ms};
use attend_timing::{Clock, ms};
use rand::Rng;
use tracing::debug;

/// Why a response was ignored
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    NotRunning,
    Finished,
    NoOpenTrial,
    AlreadyClosed,
    /// Within the minimum inter-tap interval of the last accepted response
    DoubleTap,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    Accepted(ResponseMetrics),
    Rejected(RejectReason),
}

impl ResponseOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ResponseOutcome::Accepted(_))
    }
}

impl<C, R, P, A> Session<C, R, P, A>
where
    C: Clock,
    R: Rng,
    P: Presenter,
    A: AudioOutput,
{
    /// Handles a response arriving now.
    pub fn on_response(&mut self, choice: Choice) -> ResponseOutcome {
        let at = self.clock.now();
        self.on_response_at(choice, at)
    }

    /// Handles a response timestamped `at_ns` by the input source.
    pub fn on_response_at(&mut self, choice: Choice, at_ns: u64) -> ResponseOutcome {
        match self.accept_response(choice, at_ns) {
            Ok(metrics) => {
                debug!(
                    %choice,
                    rt_ms = metrics.rt_ms,
                    correct = metrics.correct,
                    anticipatory = metrics.anticipatory,
                    perseveration = metrics.perseveration,
                    "response accepted"
                );
                ResponseOutcome::Accepted(metrics)
            }
            Err(reason) => {
                debug!(%choice, ?reason, "response ignored");
                ResponseOutcome::Rejected(reason)
            }
        }
    }

    fn accept_response(
        &mut self,
        choice: Choice,
        at_ns: u64,
    ) -> Result<ResponseMetrics, RejectReason> {
        if self.run.finished {
            return Err(RejectReason::Finished);
        }
        if !self.run.running {
            return Err(RejectReason::NotRunning);
        }
        let guard_ns = ms(self.config.responses.min_inter_tap_ms);
        let double_tap = self
            .run
            .last_accepted_response_ns
            .is_some_and(|last| at_ns.saturating_sub(last) < guard_ns);
        let prev_choice = self.run.prev_choice;
        let prev_cue_label = self.run.prev_cue_label;
        let run_start_ns = self.run.total_start_ns;

        let trial = self.run.current.as_mut().ok_or(RejectReason::NoOpenTrial)?;
        // Stamped before this trial opened: it answered a trial already closed.
        if at_ns < trial.opened_ns {
            return Err(RejectReason::NoOpenTrial);
        }
        if !trial.is_open() {
            return Err(RejectReason::AlreadyClosed);
        }
        if double_tap {
            return Err(RejectReason::DoubleTap);
        }

        // Measured from the effective onset, which trails trial opening on alert trials.
        let rt_ms = rel_ms(at_ns, trial.cue_onset_ns);
        let same_as_prev_choice = prev_choice == Some(choice);
        let metrics = ResponseMetrics {
            choice,
            correct: choice == trial.correct_answer(),
            rt_ms,
            anticipatory: rt_ms > 0.0 && rt_ms < self.config.responses.anticipatory_ms,
            perseveration: same_as_prev_choice && prev_cue_label != Some(trial.cue_label),
            same_as_prev_choice,
        };
        trial.close(Outcome::Responded);
        let cue_label = trial.cue_label;
        let record = LogRecord::from_trial(trial, run_start_ns, Some(metrics));

        self.log.append(record);
        self.run.prev_choice = Some(choice);
        self.run.prev_cue_label = Some(cue_label);
        self.run.last_accepted_response_ns = Some(at_ns);
        Ok(metrics)
    }
}
