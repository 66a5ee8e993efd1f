//! Progress handlers - one file per operation.

mod check_unlock;
mod evaluation;
mod get_snapshot;
mod recalculate;
mod unlock_stage;
mod weekly_delta;

pub use check_unlock::{CheckUnlockHandler, CheckUnlockQuery, CheckUnlockResult};
pub use get_snapshot::{GetProgressHandler, GetProgressQuery, ProgressSnapshot};
pub use recalculate::{
    PracticeReport, RecalculateProgressCommand, RecalculateProgressHandler,
    RecalculateProgressResult,
};
pub use unlock_stage::{UnlockStageCommand, UnlockStageHandler, UnlockStageResult};
pub use weekly_delta::{
    RecordWeeklyDeltaCommand, RecordWeeklyDeltaHandler, RecordWeeklyDeltaResult,
};
