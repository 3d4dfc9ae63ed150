//! Scheduling: recurrence parsing, the firing loop, and the overlap guard.

pub mod engine;
pub mod guard;
pub mod schedule;

pub use engine::Scheduler;
pub use guard::{OverlapGuard, RunPermit};
pub use schedule::{Schedule, ScheduleError};
