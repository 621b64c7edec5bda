use std::sync::Arc;

use rayon::ThreadPool;

use crate::executor::run_contained;
use crate::{Executor, Job, ProgressSender};

enum BlockingPool {
    Rayon(ThreadPool),
    Inline,
}

impl BlockingPool {
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match self {
            BlockingPool::Rayon(pool) => pool.spawn(job),
            BlockingPool::Inline => job(),
        }
    }
}

fn build_rayon_pool(prefix: &'static str, threads: usize) -> BlockingPool {
    // Thread creation can fail under tight process limits; shrink, then run inline.
    let mut threads = threads.max(1);
    loop {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |idx| format!("{prefix}-{idx}"))
            .build()
        {
            Ok(pool) => return BlockingPool::Rayon(pool),
            Err(_) if threads > 1 => {
                threads = (threads / 2).max(1);
            }
            Err(err) => {
                tracing::warn!(
                    target: "trove.scheduler",
                    error = %err,
                    "failed to start background pool; running jobs inline"
                );
                return BlockingPool::Inline;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub background_threads: usize,
    pub progress_channel_capacity: usize,
}

impl SchedulerConfig {
    pub fn with_background_threads(threads: Option<usize>) -> Self {
        let mut config = Self::default();
        if let Some(threads) = threads {
            config.background_threads = threads.max(1);
        }
        config
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            // Resolution jobs are mostly network bound; a couple of threads suffice.
            background_threads: available.clamp(1, 2),
            progress_channel_capacity: 1024,
        }
    }
}

/// Owns the background pool that resolution jobs run on.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    background_pool: BlockingPool,
    progress: ProgressSender,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                background_pool: build_rayon_pool("trove-background", config.background_threads),
                progress: ProgressSender::new(config.progress_channel_capacity),
            }),
        }
    }

    pub fn progress(&self) -> ProgressSender {
        self.inner.progress.clone()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl Executor for Scheduler {
    fn execute(&self, job: Job) {
        self.inner
            .background_pool
            .spawn(move || run_contained(job, "background"));
    }

    fn progress(&self) -> ProgressSender {
        Scheduler::progress(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn executed_jobs_run_off_thread_and_survive_panics() {
        let scheduler = Scheduler::new(SchedulerConfig::with_background_threads(Some(1)));
        scheduler.execute(Box::new(|| panic!("first job fails")));

        let (tx, rx) = mpsc::channel();
        scheduler.execute(Box::new(move || {
            let name = std::thread::current().name().map(str::to_owned);
            tx.send(name).unwrap();
        }));

        let name = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(name.as_deref(), Some("trove-background-0"));
    }
}
