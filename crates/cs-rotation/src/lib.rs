//! crowdstage/crates/cs-rotation/src/lib.rs
//!
//! The stage rotation engine: per-kind arrival queues, history cursors and
//! slot banks, the synchronous [`Stage`] that combines them, and the
//! [`StageScheduler`] that drives a stage from timers and live feeds.

pub mod bank;
pub mod cursor;
pub mod kind;
pub mod queue;
pub mod scheduler;
pub mod stage;

pub use bank::{Placement, SlotBank};
pub use cursor::HistoryCursor;
pub use kind::{FeedDelta, KindRotation, TickOutcome};
pub use queue::ArrivalQueue;
pub use scheduler::StageScheduler;
pub use stage::{Stage, StageDelta, StageSnapshot};
