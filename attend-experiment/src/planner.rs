//! Per-block condition policy.

use attend_core::{BackgroundLevel, Block, Condition, Salience, SideEventType};
use rand::Rng;
use std::time::Duration;

use crate::config::{AlertConfig, CaptureConfig};

/// What a trial will run, decided at cue-decision time
#[derive(Debug, Clone, PartialEq)]
pub struct TrialPlan {
    pub condition: Condition,
    pub side_event: SideEventType,
    pub salience: Salience,
    /// Signed offset of the side event relative to cue onset
    pub soa_ms: Option<i64>,
    pub alert_gain: Option<f32>,
    /// Index into the configured distractor clips
    pub clip: Option<usize>,
    pub background: Option<BackgroundLevel>,
}

impl TrialPlan {
    fn baseline(block: Block) -> Self {
        Self {
            condition: block.baseline(),
            side_event: SideEventType::None,
            salience: Salience::None,
            soa_ms: None,
            alert_gain: None,
            clip: None,
            background: None,
        }
    }
}

/// Background segment for `elapsed` into a block of length `duration`:
/// three equal contiguous thirds, off / low / mid.
pub fn background_segment(elapsed: Duration, duration: Duration) -> BackgroundLevel {
    // Compare 3t against D to keep the boundaries exact in integer nanoseconds.
    let t3 = elapsed.as_nanos().saturating_mul(3);
    let d = duration.as_nanos();
    if t3 < d {
        BackgroundLevel::Off
    } else if t3 < 2 * d {
        BackgroundLevel::Low
    } else {
        BackgroundLevel::Mid
    }
}

#[derive(Debug, Clone)]
pub struct ConditionPlanner {
    alert: AlertConfig,
    capture: CaptureConfig,
    block_duration: Duration,
}

impl ConditionPlanner {
    pub fn new(alert: AlertConfig, capture: CaptureConfig, block_duration: Duration) -> Self {
        Self {
            alert,
            capture,
            block_duration,
        }
    }

    pub fn decide<R: Rng>(&self, block: Block, elapsed: Duration, rng: &mut R) -> TrialPlan {
        match block {
            Block::A => self.decide_alert(rng),
            Block::B => {
                let level = background_segment(elapsed, self.block_duration);
                TrialPlan {
                    condition: level.condition(),
                    background: Some(level),
                    ..TrialPlan::baseline(block)
                }
            }
            Block::C => self.decide_capture(rng),
        }
    }

    fn decide_alert<R: Rng>(&self, rng: &mut R) -> TrialPlan {
        if !rng.random_bool(self.alert.p_alert) {
            return TrialPlan::baseline(Block::A);
        }
        let high = rng.random_bool(self.alert.p_high);
        let (condition, salience, gain) = if high {
            (Condition::A2, Salience::High, self.alert.gain_high)
        } else {
            (Condition::A1, Salience::Low, self.alert.gain_low)
        };
        TrialPlan {
            condition,
            side_event: SideEventType::AlertTone,
            salience,
            soa_ms: Some(-(self.alert.soa_ms as i64)),
            alert_gain: Some(gain),
            ..TrialPlan::baseline(Block::A)
        }
    }

    fn decide_capture<R: Rng>(&self, rng: &mut R) -> TrialPlan {
        if self.capture.soas_ms.is_empty() || !rng.random_bool(self.capture.p_capture) {
            return TrialPlan::baseline(Block::C);
        }
        let soa = self.capture.soas_ms[rng.random_range(0..self.capture.soas_ms.len())];
        let clip = if self.capture.clips.is_empty() {
            None
        } else {
            Some(rng.random_range(0..self.capture.clips.len()))
        };
        TrialPlan {
            condition: Condition::C1,
            side_event: SideEventType::CaptureSound,
            salience: Salience::Familiar,
            soa_ms: Some(soa as i64),
            clip,
            ..TrialPlan::baseline(Block::C)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn planner() -> ConditionPlanner {
        ConditionPlanner::new(
            AlertConfig::default(),
            CaptureConfig::default(),
            Duration::from_millis(9_000),
        )
    }

    #[test]
    fn background_thirds_have_exact_boundaries() {
        let d = Duration::from_millis(9_000);
        let at = |ms| background_segment(Duration::from_millis(ms), d);
        assert_eq!(at(0), BackgroundLevel::Off);
        assert_eq!(at(2_999), BackgroundLevel::Off);
        assert_eq!(at(3_000), BackgroundLevel::Low);
        assert_eq!(at(5_999), BackgroundLevel::Low);
        assert_eq!(at(6_000), BackgroundLevel::Mid);
        assert_eq!(at(20_000), BackgroundLevel::Mid);

        // D not divisible by three
        let d = Duration::from_millis(1_000);
        assert_eq!(
            background_segment(Duration::from_nanos(333_333_333), d),
            BackgroundLevel::Off
        );
        assert_eq!(
            background_segment(Duration::from_nanos(333_333_334), d),
            BackgroundLevel::Low
        );
    }

    #[test]
    fn background_block_uses_no_randomness() {
        let p = planner();
        let mut a = StdRng::seed_from_u64(1);
        let mut b = StdRng::seed_from_u64(2);
        let elapsed = Duration::from_millis(4_000);
        let plan_a = p.decide(Block::B, elapsed, &mut a);
        assert_eq!(plan_a, p.decide(Block::B, elapsed, &mut b));
        assert_eq!(plan_a.condition, Condition::B1);
        assert_eq!(plan_a.background, Some(BackgroundLevel::Low));
        assert_eq!(plan_a.side_event, SideEventType::None);
    }

    #[test]
    fn alert_plans_precede_cue_by_fixed_soa() {
        let p = planner();
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts: HashMap<Condition, usize> = HashMap::new();
        for _ in 0..4_000 {
            let plan = p.decide(Block::A, Duration::ZERO, &mut rng);
            *counts.entry(plan.condition).or_default() += 1;
            match plan.condition {
                Condition::A0 => assert_eq!(plan.side_event, SideEventType::None),
                Condition::A1 => {
                    assert_eq!(plan.soa_ms, Some(-400));
                    assert_eq!(plan.alert_gain, Some(0.08));
                    assert_eq!(plan.salience, Salience::Low);
                }
                Condition::A2 => {
                    assert_eq!(plan.soa_ms, Some(-400));
                    assert_eq!(plan.alert_gain, Some(0.18));
                    assert_eq!(plan.salience, Salience::High);
                }
                other => panic!("unexpected condition {other}"),
            }
        }
        // 50% baseline, 25% each alert level
        let a0 = counts[&Condition::A0] as f64 / 4_000.0;
        let a2 = counts[&Condition::A2] as f64 / 4_000.0;
        assert!((a0 - 0.5).abs() < 0.05, "a0 share {a0}");
        assert!((a2 - 0.25).abs() < 0.05, "a2 share {a2}");
    }

    #[test]
    fn capture_plans_draw_post_cue_soas() {
        let p = planner();
        let mut rng = StdRng::seed_from_u64(11);
        let mut distractors = 0;
        for _ in 0..3_000 {
            let plan = p.decide(Block::C, Duration::ZERO, &mut rng);
            if plan.condition == Condition::C1 {
                distractors += 1;
                assert_eq!(plan.side_event, SideEventType::CaptureSound);
                assert!(matches!(plan.soa_ms, Some(200 | 300 | 400)));
                assert!(plan.clip.is_some_and(|c| c < 3));
            } else {
                assert_eq!(plan, TrialPlan::baseline(Block::C));
            }
        }
        let share = distractors as f64 / 3_000.0;
        assert!((share - 0.30).abs() < 0.05, "capture share {share}");
    }

    #[test]
    fn certain_probabilities_force_the_plan() {
        let alert = AlertConfig {
            p_alert: 1.0,
            p_high: 1.0,
            ..AlertConfig::default()
        };
        let p = ConditionPlanner::new(alert, CaptureConfig::default(), Duration::from_secs(1));
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            assert_eq!(
                p.decide(Block::A, Duration::ZERO, &mut rng).condition,
                Condition::A2
            );
        }
    }
}
