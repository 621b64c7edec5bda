//! Background execution for resolution jobs.
//!
//! The resolution state machine only needs "run this later"; it talks to an
//! [`Executor`]. [`Scheduler`] backs that with a rayon pool, while
//! [`InlineExecutor`] and [`ManualExecutor`] exist for embedding and tests.

mod executor;
mod progress;
mod scheduler;

pub use executor::{Executor, InlineExecutor, Job, ManualExecutor};
pub use progress::{Progress, ProgressEvent, ProgressId, ProgressReceiver, ProgressSender};
pub use scheduler::{Scheduler, SchedulerConfig};
