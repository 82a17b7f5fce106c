pub mod focus_check;
pub mod task;

pub use focus_check::{FocusCheck, Verdict};
pub use task::{Task, TaskDraft, TaskStatus, TaskSummary, TaskUpdate};
