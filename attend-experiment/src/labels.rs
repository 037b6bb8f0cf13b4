use attend_core::CueLabel;
use rand::Rng;

use crate::config::ResponseConfig;

/// Draws cue labels with a cap on identical runs. Block-local: call
/// [`CueLabelGenerator::reset`] on block entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CueLabelGenerator {
    p_plus: f64,
    avoid_long_runs: bool,
    max_run_length: u32,
    last: Option<CueLabel>,
    run_length: u32,
}

impl CueLabelGenerator {
    pub fn new(config: &ResponseConfig) -> Self {
        Self {
            p_plus: config.p_plus,
            avoid_long_runs: config.avoid_long_runs,
            max_run_length: config.max_run_length,
            last: None,
            run_length: 0,
        }
    }

    pub fn pick<R: Rng>(&mut self, rng: &mut R) -> CueLabel {
        let mut label = if rng.random_bool(self.p_plus) {
            CueLabel::Plus
        } else {
            CueLabel::Minus
        };
        if self.avoid_long_runs
            && self.last == Some(label)
            && self.run_length >= self.max_run_length
        {
            label = label.flipped();
        }
        self.run_length = if self.last == Some(label) {
            self.run_length + 1
        } else {
            1
        };
        self.last = Some(label);
        label
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.run_length = 0;
    }

    pub fn last(&self) -> Option<CueLabel> {
        self.last
    }

    pub fn run_length(&self) -> u32 {
        self.run_length
    }
}
