pub mod config;
pub mod export;
pub mod labels;
pub mod log;
pub mod output;
pub mod planner;
pub mod response;
pub mod state;
pub mod trial;

pub use config::{ConfigError, SessionConfig};
pub use export::ExportError;
pub use labels::CueLabelGenerator;
pub use log::LogStore;
pub use output::{AudioOutput, OutputError, Presenter, Silent};
pub use planner::{ConditionPlanner, TrialPlan, background_segment};
pub use response::{RejectReason, ResponseOutcome};
pub use state::{RunPhase, RunState, Session, SessionError, SessionEvent};
