use std::collections::VecDeque;

use parking_lot::Mutex;
use trove_core::panic_payload_to_str;

use crate::ProgressSender;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Where background work runs.
pub trait Executor: Send + Sync {
    /// Run `job` at some point, possibly on another thread. Panics inside
    /// `job` are contained and logged.
    fn execute(&self, job: Job);

    fn progress(&self) -> ProgressSender;
}

pub(crate) fn run_contained(job: Job, executor: &'static str) {
    if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)) {
        let message = panic_payload_to_str(&*panic);
        tracing::error!(
            target: "trove.scheduler",
            executor,
            panic = %message,
            "job panicked"
        );
    }
}

/// Runs every job on the submitting thread before `execute` returns.
#[derive(Clone, Default)]
pub struct InlineExecutor {
    progress: ProgressSender,
}

impl InlineExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Executor for InlineExecutor {
    fn execute(&self, job: Job) {
        run_contained(job, "inline");
    }

    fn progress(&self) -> ProgressSender {
        self.progress.clone()
    }
}

/// Queues jobs until the owner runs them explicitly.
#[derive(Default)]
pub struct ManualExecutor {
    queue: Mutex<VecDeque<Job>>,
    progress: ProgressSender,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run the oldest queued job. Returns `false` if the queue was empty.
    pub fn run_next(&self) -> bool {
        // Release the queue before running so the job may submit more work.
        let job = self.queue.lock().pop_front();
        match job {
            Some(job) => {
                run_contained(job, "manual");
                true
            }
            None => false,
        }
    }

    /// Run jobs until the queue stays empty; returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl Executor for ManualExecutor {
    fn execute(&self, job: Job) {
        self.queue.lock().push_back(job);
    }

    fn progress(&self) -> ProgressSender {
        self.progress.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn manual_executor_defers_until_run() {
        let executor = Arc::new(ManualExecutor::new());
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = Arc::clone(&counter);
            executor.execute(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert_eq!(executor.pending(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        assert!(executor.run_next());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(executor.run_all(), 2);
        assert!(!executor.run_next());
    }

    #[test]
    fn jobs_may_enqueue_follow_up_work() {
        let executor = Arc::new(ManualExecutor::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let inner_executor = Arc::clone(&executor);
        let inner_counter = Arc::clone(&counter);
        executor.execute(Box::new(move || {
            inner_executor.execute(Box::new(move || {
                inner_counter.fetch_add(1, Ordering::SeqCst);
            }));
        }));

        assert_eq!(executor.run_all(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panics_are_contained() {
        let executor = InlineExecutor::new();
        executor.execute(Box::new(|| panic!("boom")));

        let manual = ManualExecutor::new();
        manual.execute(Box::new(|| panic!("boom")));
        assert!(manual.run_next());
    }
}
