//! Job definitions and the runner loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

use crate::cron;

type JobAction = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// When a job triggers.
#[derive(Debug, Clone)]
pub enum Schedule {
    /// Every N seconds, measured from the previous trigger.
    Interval { every_secs: u64 },
    /// At cron-matched times (MIN HOUR DOM MON DOW).
    Cron { expression: String },
}

/// A recurring job: a name, a schedule, and the action to fire.
pub struct Job {
    pub name: String,
    schedule: Schedule,
    next_run: Option<DateTime<Utc>>,
    pub run_count: u32,
    /// Overlap guard, shared with the spawned action.
    running: Arc<AtomicBool>,
    action: JobAction,
}

impl Job {
    pub fn interval<F>(name: &str, every_secs: u64, action: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            schedule: Schedule::Interval { every_secs },
            // Interval jobs fire once immediately on startup.
            next_run: Some(Utc::now()),
            run_count: 0,
            running: Arc::new(AtomicBool::new(false)),
            action: Arc::new(action),
        }
    }

    pub fn cron<F>(name: &str, expression: &str, action: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            schedule: Schedule::Cron { expression: expression.to_string() },
            next_run: cron::next_run_from_cron(expression, Utc::now()),
            run_count: 0,
            running: Arc::new(AtomicBool::new(false)),
            action: Arc::new(action),
        }
    }

    fn should_run(&self, now: DateTime<Utc>) -> bool {
        self.next_run.is_some_and(|next| now >= next)
    }

    fn reschedule(&mut self, now: DateTime<Utc>) {
        self.next_run = match &self.schedule {
            Schedule::Interval { every_secs } => {
                Some(now + chrono::Duration::seconds(*every_secs as i64))
            }
            Schedule::Cron { expression } => cron::next_run_from_cron(expression, now),
        };
    }

    /// Spawn the action unless the previous run is still active.
    fn fire(&mut self, now: DateTime<Utc>) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Job '{}' still running, skipping trigger", self.name);
            self.reschedule(now);
            return false;
        }
        tracing::info!("Job triggered: '{}'", self.name);
        self.run_count += 1;
        self.reschedule(now);

        let running = self.running.clone();
        let future = (self.action)();
        tokio::spawn(async move {
            future.await;
            running.store(false, Ordering::SeqCst);
        });
        true
    }
}

/// Drives a set of jobs. Jobs are independent and may run concurrently
/// with each other; only same-job overlap is prevented.
pub struct JobRunner {
    jobs: Vec<Job>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    pub fn add_job(&mut self, job: Job) {
        tracing::info!("Job registered: '{}'", job.name);
        self.jobs.push(job);
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Fire everything due at `now`. Returns how many jobs triggered.
    pub fn tick(&mut self, now: DateTime<Utc>) -> usize {
        let mut fired = 0;
        for job in self.jobs.iter_mut() {
            if job.should_run(now) && job.fire(now) {
                fired += 1;
            }
        }
        fired
    }

    /// Run until `shutdown` is set. Checks due jobs once per second.
    pub async fn run(mut self, shutdown: Arc<AtomicBool>) {
        tracing::info!("Scheduler started with {} jobs", self.jobs.len());
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            interval.tick().await;
            if shutdown.load(Ordering::SeqCst) {
                tracing::info!("Scheduler stopping");
                break;
            }
            self.tick(Utc::now());
        }
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}
