use crate::cli::Args;
use crate::terminal::{TerminalAudio, TerminalPresenter};
use anyhow::{Context, Result};
use attend_core::{Choice, parse_block_order};
use attend_experiment::{ResponseOutcome, Session, SessionConfig, export};
use attend_timing::{Clock, HighPrecisionClock};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// Waits shorter than this go to the clock's precise sleep instead of the channel.
const PRECISE_WAIT: Duration = Duration::from_millis(2);

type TerminalSession = Session<HighPrecisionClock, StdRng, TerminalPresenter, TerminalAudio>;

enum Input {
    Response { choice: Choice, at_ns: u64 },
    Quit,
}

pub struct App {
    session: TerminalSession,
    csv: PathBuf,
    json: PathBuf,
}

impl App {
    pub fn new() -> Result<Self> {
        let args = Args::parse();
        init_logging();

        let mut config = match &args.config {
            Some(path) => SessionConfig::load(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => SessionConfig::default(),
        };
        if let Some(blocks) = &args.blocks {
            config.blocks.order =
                parse_block_order(blocks).with_context(|| format!("block order '{blocks}'"))?;
        }
        if let Some(duration_ms) = args.block_duration_ms {
            config.blocks.duration_ms = duration_ms;
        }

        // Logged so an unseeded run can be replayed.
        let seed = args.seed.unwrap_or_else(rand::random);
        info!(seed, "trial sequence seed");

        let audio = TerminalAudio::new(
            config.alert.tone_freq_hz,
            config.alert.tone_duration_ms,
            config.background.loop_file.clone(),
        );
        let session = Session::new(
            config,
            HighPrecisionClock::new(),
            StdRng::seed_from_u64(seed),
            TerminalPresenter::new(),
            audio,
        )
        .context("invalid session config")?;

        Ok(Self {
            session,
            csv: args.csv,
            json: args.json,
        })
    }

    pub fn run(mut self) -> Result<()> {
        println!("=== ATTENTION ASSESSMENT ===");
        println!("Type + or - and press ENTER for each cue. Type q to quit.\n");

        let input = spawn_input_reader(self.session.clock().clone());
        self.session.start()?;
        self.drive(&input);

        let stats = self.session.dispatch_lateness().stats();
        info!(
            samples = stats.samples,
            mean_us = stats.mean_ns / 1e3,
            jitter_us = stats.jitter_ns / 1e3,
            max_us = stats.max_ns / 1e3,
            "dispatch lateness"
        );

        let records = self.session.records();
        export::write_csv(&self.csv, records)
            .with_context(|| format!("writing {}", self.csv.display()))?;
        export::write_json(&self.json, records)
            .with_context(|| format!("writing {}", self.json.display()))?;
        info!(
            records = records.len(),
            omissions = self.session.log().omissions(),
            csv = %self.csv.display(),
            json = %self.json.display(),
            "results saved"
        );

        println!("\nAssessment completed. Thank you!");
        Ok(())
    }

    /// Runs until the session finishes, waiting on input or the next deadline,
    /// whichever comes first.
    fn drive(&mut self, input: &Receiver<Input>) {
        let mut input_open = true;
        while self.session.is_running() {
            // Queued responses may predate work that is now due.
            if input_open {
                input_open = self.drain(input);
            }
            self.session.poll();
            let Some(deadline) = self.session.next_deadline() else {
                break;
            };
            let clock = self.session.clock().clone();
            let wait = Duration::from_nanos(deadline.saturating_sub(clock.now()));
            if wait <= PRECISE_WAIT {
                clock.sleep(wait);
                continue;
            }
            let coarse = wait - PRECISE_WAIT;
            if !input_open {
                thread::sleep(coarse);
                continue;
            }
            match input.recv_timeout(coarse) {
                Ok(event) => self.handle(event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => input_open = self.input_closed(),
            }
        }
    }

    /// Handles everything already queued. Returns false once the reader is gone.
    fn drain(&mut self, input: &Receiver<Input>) -> bool {
        loop {
            match input.try_recv() {
                Ok(event) => self.handle(event),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return self.input_closed(),
            }
        }
    }

    fn handle(&mut self, event: Input) {
        match event {
            Input::Response { choice, at_ns } => self.respond(choice, at_ns),
            Input::Quit => {
                info!("quit requested");
                self.session.stop();
            }
        }
    }

    fn input_closed(&self) -> bool {
        warn!("input closed; the run continues without responses");
        false
    }

    fn respond(&mut self, choice: Choice, at_ns: u64) {
        // Only work due before the stamp; later trials were not yet on screen.
        self.session.poll_until(at_ns);
        match self.session.on_response_at(choice, at_ns) {
            ResponseOutcome::Accepted(m) => debug!(rt_ms = m.rt_ms, correct = m.correct, "logged"),
            ResponseOutcome::Rejected(reason) => debug!(?reason, "not logged"),
        }
    }
}

fn init_logging() {
    let mut filter = EnvFilter::from_default_env();
    for directive in ["attend=info", "attend_experiment=info", "attend_timing=info"] {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Reads `+`, `-` or `q` lines from stdin, stamping each on arrival.
fn spawn_input_reader(clock: HighPrecisionClock) -> Receiver<Input> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || read_lines(clock, tx));
    rx
}

fn read_lines(clock: HighPrecisionClock, tx: Sender<Input>) {
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(%err, "stdin read failed");
                return;
            }
        };
        let at_ns = clock.now();
        let text = line.trim();
        let input = match text {
            "" => continue,
            "q" | "Q" => Input::Quit,
            _ => match text.parse::<Choice>() {
                Ok(choice) => Input::Response { choice, at_ns },
                Err(err) => {
                    warn!(%err, "ignored");
                    continue;
                }
            },
        };
        if tx.send(input).is_err() {
            return;
        }
    }
}
