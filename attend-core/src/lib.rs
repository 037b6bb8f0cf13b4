pub mod block;
pub mod cue;
pub mod trial;

pub use block::{BackgroundLevel, Block, BlockParseError, Condition, parse_block_order};
pub use cue::{Choice, ChoiceParseError, CueLabel};
pub use trial::{
    LogRecord, Outcome, ResponseMetrics, Salience, SideEventType, Trial, TrialPhase, rel_ms,
};
