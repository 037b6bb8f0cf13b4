//! Trial engine: opening, cue presentation and omission closing.

use super::output::{AudioOutput, Presenter};
use super::state::{Session, SessionEvent};
use attend_core::{LogRecord, Outcome, SideEventType, Trial, TrialPhase};
use attend_timing::{Clock, ms};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, warn};

/// 1 or 2 when `index` is exactly that many trials after the last distractor, else 0.
pub fn trial_after_event(index: usize, last_event: Option<usize>) -> u8 {
    match last_event.and_then(|e| index.checked_sub(e)) {
        Some(1) => 1,
        Some(2) => 2,
        _ => 0,
    }
}

impl<C, R, P, A> Session<C, R, P, A>
where
    C: Clock,
    R: Rng,
    P: Presenter,
    A: AudioOutput,
{
    /// Opens the next trial of the running block. A still-open predecessor
    /// is closed as an omission first.
    pub(crate) fn open_trial(&mut self) {
        self.omit_open_trial();
        let Some(block) = self.run.current_block() else {
            return;
        };
        let now = self.clock.now();
        let elapsed = Duration::from_nanos(now.saturating_sub(self.run.block_start_ns));
        let plan = self.planner.decide(block, elapsed, &mut self.rng);
        let label = self.run.labels.pick(&mut self.rng);
        if let Some(level) = plan.background {
            self.set_ambient(level);
        }

        let index = self.run.trial_count;
        self.run.trial_count += 1;
        let after_event = trial_after_event(index, self.run.last_event_trial_index);

        let soa_ns = plan.soa_ms.map(|soa| ms(soa.unsigned_abs()));
        let (cue_onset_ns, side_event_ns, phase) = match plan.side_event {
            // the tone fires now and the cue waits out the SOA
            SideEventType::AlertTone => (
                now + soa_ns.unwrap_or(0),
                Some(now),
                TrialPhase::SideEventScheduled,
            ),
            SideEventType::CaptureSound => (now, soa_ns.map(|s| now + s), TrialPhase::Planned),
            SideEventType::None => (now, None, TrialPhase::Planned),
        };

        self.run.current = Some(Trial {
            index,
            block,
            condition: plan.condition,
            cue_label: label,
            opened_ns: now,
            cue_onset_ns,
            side_event: plan.side_event,
            salience: plan.salience,
            soa_ms: plan.soa_ms,
            side_event_ns,
            background: plan.background,
            trial_after_event: after_event,
            phase,
        });
        debug!(
            trial = index,
            %block,
            condition = %plan.condition,
            %label,
            cue_rel_ms = attend_core::rel_ms(cue_onset_ns, self.run.total_start_ns),
            "trial opened"
        );

        match plan.side_event {
            SideEventType::AlertTone => {
                let gain = plan.alert_gain.unwrap_or_default();
                if let Err(err) = self.audio.play_alert_tone(gain) {
                    warn!(%err, trial = index, "alert tone failed");
                }
                self.scheduler
                    .at(cue_onset_ns, SessionEvent::ShowCue { trial_index: index });
            }
            SideEventType::CaptureSound => {
                self.run.last_event_trial_index = Some(index);
                self.show_cue(index);
                if let Some(at) = side_event_ns {
                    self.scheduler.at(
                        at,
                        SessionEvent::PlayDistractor {
                            trial_index: index,
                            clip: plan.clip,
                        },
                    );
                }
            }
            SideEventType::None => self.show_cue(index),
        }
    }

    /// Presents the cue of trial `trial_index` if it is still the current trial.
    pub(crate) fn show_cue(&mut self, trial_index: usize) {
        let Some(trial) = self
            .run
            .current
            .as_mut()
            .filter(|t| t.index == trial_index)
        else {
            debug!(trial = trial_index, "cue dropped: trial superseded");
            return;
        };
        // A response may already have closed the trial during the pre-cue lead.
        if trial.is_open() {
            trial.phase = TrialPhase::CueShown;
        }
        let label = trial.cue_label;
        if let Err(err) = self.presenter.present_cue(label) {
            warn!(%err, trial = trial_index, "cue presentation failed");
        }
        self.scheduler.after(
            self.clock.now(),
            Duration::from_millis(self.config.timing.inter_trial_message_ms),
            SessionEvent::InterTrialMessage { trial_index },
        );
    }

    /// Closes the current trial as omitted if it is still open.
    pub(crate) fn omit_open_trial(&mut self) {
        let Some(trial) = self.run.current.as_mut() else {
            return;
        };
        if !trial.close(Outcome::Omitted) {
            return;
        }
        debug!(
            trial = trial.index,
            block = %trial.block,
            condition = %trial.condition,
            "trial omitted"
        );
        let record = LogRecord::from_trial(trial, self.run.total_start_ns, None);
        self.log.append(record);
    }
}
