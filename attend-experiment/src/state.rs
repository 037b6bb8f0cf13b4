use super::config::{ConfigError, SessionConfig};
use super::labels::CueLabelGenerator;
use super::log::LogStore;
use super::output::{AudioOutput, Presenter};
use super::planner::{ConditionPlanner, background_segment};
use attend_core::{BackgroundLevel, Block, Choice, CueLabel, LogRecord, Trial};
use attend_timing::{Clock, JitterLog, ManualClock, Scheduler};
use rand::Rng;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session is already running")]
    AlreadyRunning,
    #[error("session has finished; reset it before starting again")]
    Finished,
}

/// Delayed work registered with the scheduler
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    NextTrial,
    ShowCue { trial_index: usize },
    PlayDistractor { trial_index: usize, clip: Option<usize> },
    InterTrialMessage { trial_index: usize },
    AmbientSegment,
    BlockEnd,
    StartNextBlock,
}

#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running(Block),
    Pause,
    Finished,
}

/// Everything one assessment run mutates. Replaced wholesale on reset.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    pub phase: RunPhase,
    pub running: bool,
    pub finished: bool,
    pub block_order: Vec<Block>,
    pub current_block_index: usize,
    pub total_start_ns: u64,
    pub block_start_ns: u64,
    pub trial_count: usize,
    /// Most recent trial of the block, open or closed
    pub current: Option<Trial>,
    pub labels: CueLabelGenerator,
    pub prev_choice: Option<Choice>,
    pub prev_cue_label: Option<CueLabel>,
    pub last_event_trial_index: Option<usize>,
    pub last_accepted_response_ns: Option<u64>,
    pub ambient: Option<BackgroundLevel>,
}

impl RunState {
    pub fn fresh(config: &SessionConfig) -> Self {
        Self {
            phase: RunPhase::Idle,
            running: false,
            finished: false,
            block_order: config.blocks.order.clone(),
            current_block_index: 0,
            total_start_ns: 0,
            block_start_ns: 0,
            trial_count: 0,
            current: None,
            labels: CueLabelGenerator::new(&config.responses),
            prev_choice: None,
            prev_cue_label: None,
            last_event_trial_index: None,
            last_accepted_response_ns: None,
            ambient: None,
        }
    }

    pub fn current_block(&self) -> Option<Block> {
        match self.phase {
            RunPhase::Running(block) => Some(block),
            _ => None,
        }
    }

    pub fn open_trial(&self) -> Option<&Trial> {
        self.current.as_ref().filter(|t| t.is_open())
    }

    fn enter_block(&mut self, block: Block, now_ns: u64) {
        self.phase = RunPhase::Running(block);
        self.block_start_ns = now_ns;
        self.trial_count = 0;
        self.current = None;
        self.labels.reset();
        self.prev_choice = None;
        self.prev_cue_label = None;
        self.last_event_trial_index = None;
    }
}

/// Single owner of a run: block controller, trial engine and response
/// handler over one scheduler. Drive it with [`Session::poll`] and
/// [`Session::on_response`] from one thread.
pub struct Session<C, R, P, A>
where
    C: Clock,
    R: Rng,
    P: Presenter,
    A: AudioOutput,
{
    pub(crate) clock: C,
    pub(crate) rng: R,
    pub(crate) presenter: P,
    pub(crate) audio: A,
    pub(crate) config: SessionConfig,
    pub(crate) planner: ConditionPlanner,
    pub(crate) scheduler: Scheduler<SessionEvent>,
    pub(crate) run: RunState,
    pub(crate) log: LogStore,
}

impl<C, R, P, A> Session<C, R, P, A>
where
    C: Clock,
    R: Rng,
    P: Presenter,
    A: AudioOutput,
{
    pub fn new(
        config: SessionConfig,
        clock: C,
        rng: R,
        presenter: P,
        audio: A,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let planner = ConditionPlanner::new(
            config.alert.clone(),
            config.capture.clone(),
            config.blocks.duration(),
        );
        Ok(Self {
            clock,
            rng,
            presenter,
            audio,
            run: RunState::fresh(&config),
            config,
            planner,
            scheduler: Scheduler::new(),
            log: LogStore::new(),
        })
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.run.running {
            return Err(SessionError::AlreadyRunning);
        }
        if self.run.finished {
            return Err(SessionError::Finished);
        }
        let now = self.clock.now();
        self.run.running = true;
        self.run.total_start_ns = now;
        self.run.current_block_index = 0;
        info!(
            order = ?self.run.block_order,
            block_ms = self.config.blocks.duration_ms,
            "run started"
        );
        self.enter_block();
        Ok(())
    }

    /// Ends the run early. The open trial, if any, is logged as omitted.
    pub fn stop(&mut self) {
        if !self.run.running {
            return;
        }
        info!(block_index = self.run.current_block_index, "run stopped");
        self.finish();
    }

    /// Cancels pending work and restores the freshly constructed state, logs included.
    pub fn reset(&mut self) {
        self.scheduler.cancel_all();
        self.stop_ambient();
        self.run = RunState::fresh(&self.config);
        self.log.clear();
        info!("session reset");
    }

    /// Runs every task that is due at the current clock time. Returns how many ran.
    pub fn poll(&mut self) -> usize {
        let now = self.clock.now();
        self.poll_until(now)
    }

    /// Runs only the tasks due at or before `at_ns` (never past the current
    /// time), so a response stamped at `at_ns` meets the trial that was
    /// current at that instant.
    pub fn poll_until(&mut self, at_ns: u64) -> usize {
        let limit = at_ns.min(self.clock.now());
        let mut dispatched = 0;
        while let Some((due_ns, event)) = self.scheduler.pop_due_at(limit) {
            self.dispatch(due_ns, event);
            dispatched += 1;
        }
        dispatched
    }

    /// Absolute clock time of the next pending task.
    pub fn next_deadline(&self) -> Option<u64> {
        self.scheduler.next_due()
    }

    fn dispatch(&mut self, due_ns: u64, event: SessionEvent) {
        // Cancellation is not assumed to be synchronous with scheduling.
        if !self.run.running {
            debug!(?event, "dropped: run not active");
            return;
        }
        match event {
            SessionEvent::NextTrial => self.on_next_trial(due_ns),
            SessionEvent::ShowCue { trial_index } => self.show_cue(trial_index),
            SessionEvent::PlayDistractor { trial_index, clip } => {
                self.play_distractor(trial_index, clip)
            }
            SessionEvent::InterTrialMessage { trial_index } => {
                if self.run.current.as_ref().map(|t| t.index) == Some(trial_index) {
                    if let Err(err) = self.presenter.present_inter_trial_message() {
                        warn!(%err, "inter-trial message failed");
                    }
                }
            }
            SessionEvent::AmbientSegment => self.sync_ambient(),
            SessionEvent::BlockEnd => self.end_block(),
            SessionEvent::StartNextBlock => {
                if self.run.phase == RunPhase::Pause {
                    self.enter_block();
                }
            }
        }
    }

    fn enter_block(&mut self) {
        let Some(&block) = self.run.block_order.get(self.run.current_block_index) else {
            self.finish();
            return;
        };
        self.scheduler.cancel_all();
        let now = self.clock.now();
        self.run.enter_block(block, now);
        info!(
            %block,
            index = self.run.current_block_index,
            since_run_start_ms = attend_core::rel_ms(now, self.run.total_start_ns),
            "block started"
        );
        self.status(&format!("Block {block}"));

        if block.has_ambient() {
            self.sync_ambient();
        }
        self.open_trial();
        self.schedule_next_trial(now);

        let duration = self.config.blocks.duration();
        self.scheduler.after(now, duration, SessionEvent::BlockEnd);
        if block.has_ambient() {
            // Segment boundaries rounded up so the boundary function already
            // reports the new level when the timer fires.
            let d_ns = duration.as_nanos() as u64;
            for k in 1..=2u64 {
                self.scheduler
                    .at(now + (d_ns * k).div_ceil(3), SessionEvent::AmbientSegment);
            }
        }
    }

    /// ISIs chain from scheduled times, so dispatch lateness does not accumulate.
    fn schedule_next_trial(&mut self, anchor_ns: u64) {
        if !self.run.running {
            return;
        }
        let isi_ms = self
            .rng
            .random_range(self.config.timing.min_isi_ms..=self.config.timing.max_isi_ms);
        self.scheduler.after(
            anchor_ns,
            Duration::from_millis(isi_ms),
            SessionEvent::NextTrial,
        );
    }

    fn on_next_trial(&mut self, due_ns: u64) {
        if self.run.current_block().is_none() {
            return;
        }
        let elapsed = self.clock.elapsed(self.run.block_start_ns);
        if elapsed >= self.config.blocks.duration() {
            debug!(elapsed_ms = elapsed.as_millis() as u64, "trial suppressed: block budget spent");
            return;
        }
        self.open_trial();
        self.schedule_next_trial(due_ns);
    }

    fn end_block(&mut self) {
        let Some(block) = self.run.current_block() else {
            return;
        };
        self.omit_open_trial();
        self.scheduler.cancel_all();
        self.stop_ambient();
        info!(%block, trials = self.run.trial_count, "block ended");

        self.run.current_block_index += 1;
        if self.run.current_block_index < self.run.block_order.len() {
            self.run.phase = RunPhase::Pause;
            self.status("Pause");
            self.scheduler.after(
                self.clock.now(),
                self.config.blocks.pause(),
                SessionEvent::StartNextBlock,
            );
        } else {
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.omit_open_trial();
        self.scheduler.cancel_all();
        self.stop_ambient();
        self.run.running = false;
        self.run.finished = true;
        self.run.phase = RunPhase::Finished;
        self.status("Finished");
        info!(
            records = self.log.len(),
            omissions = self.log.omissions(),
            "run finished"
        );
    }

    /// Brings the ambient level in line with the background segment of `now`.
    fn sync_ambient(&mut self) {
        if self.run.current_block() != Some(Block::B) {
            return;
        }
        let elapsed = self.clock.elapsed(self.run.block_start_ns);
        let level = background_segment(elapsed, self.config.blocks.duration());
        self.set_ambient(level);
    }

    pub(crate) fn set_ambient(&mut self, level: BackgroundLevel) {
        if self.run.ambient == Some(level) {
            return;
        }
        let gain = self.config.background.gain(level);
        if let Err(err) = self.audio.set_ambient_level(level, gain) {
            warn!(%err, %level, "ambient level change failed");
        }
        debug!(%level, gain, "ambient level");
        self.run.ambient = Some(level);
    }

    fn stop_ambient(&mut self) {
        if self.run.ambient.take().is_some() {
            if let Err(err) = self.audio.stop_ambient() {
                warn!(%err, "ambient stop failed");
            }
        }
    }

    fn play_distractor(&mut self, trial_index: usize, clip: Option<usize>) {
        let clip = clip
            .and_then(|i| self.config.capture.clips.get(i))
            .map(String::as_str)
            .unwrap_or_default();
        debug!(trial = trial_index, clip, "distractor");
        if let Err(err) = self.audio.play_distractor_sound(clip, self.config.capture.gain) {
            warn!(%err, trial = trial_index, "distractor playback failed");
        }
    }

    pub(crate) fn status(&mut self, status: &str) {
        if let Err(err) = self.presenter.set_status(status) {
            warn!(%err, status, "status update failed");
        }
    }

    pub fn is_running(&self) -> bool {
        self.run.running
    }

    pub fn is_finished(&self) -> bool {
        self.run.finished
    }

    pub fn run_state(&self) -> &RunState {
        &self.run
    }

    pub fn log(&self) -> &LogStore {
        &self.log
    }

    pub fn records(&self) -> &[LogRecord] {
        self.log.records()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    /// How late scheduled sub-events fired
    pub fn dispatch_lateness(&self) -> &JitterLog {
        self.scheduler.lateness()
    }
}

impl<R, P, A> Session<ManualClock, R, P, A>
where
    R: Rng,
    P: Presenter,
    A: AudioOutput,
{
    /// Advances simulated time to `until_ns`, firing each task at its exact due time.
    pub fn run_until(&mut self, until_ns: u64) {
        while let Some(due) = self.next_deadline() {
            if due > until_ns {
                break;
            }
            self.clock.set(due);
            self.poll();
        }
        self.clock.set(until_ns);
    }

    /// Simulates until nothing is pending (the run finished or was never started).
    pub fn run_to_end(&mut self) {
        while let Some(due) = self.next_deadline() {
            self.clock.set(due);
            self.poll();
        }
    }
}
