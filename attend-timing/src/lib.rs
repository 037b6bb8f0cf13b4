pub mod clock;
pub mod scheduler;

pub use clock::{Clock, HighPrecisionClock, JitterLog, JitterStats, ManualClock, ms};
pub use scheduler::Scheduler;
