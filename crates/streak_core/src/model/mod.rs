pub mod date_key;
pub mod streak;
pub mod task;
pub mod weekday;

pub use streak::StreakState;
pub use task::{Completion, Exclusion, OneOffTask, RecurringTask, Task, TaskPatch};
pub use weekday::Weekday;
