//! Polling scheduler
//!
//! Jobs are registered with a fixed interval. Every tick the scheduler runs
//! the jobs that are due, one after another, awaiting each to completion
//! before looking at the next, so two jobs never overlap. A job runs for the
//! first time one interval after registration (or immediately if asked), and
//! after each run it is next due `interval` after the tick that ran it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::error::{Result, SweepError};

/// A periodic task
#[async_trait]
pub trait Job: Send + Sync {
    /// Name used in log lines
    fn name(&self) -> &str;

    /// Run once; failures are the job's own business
    async fn run(&self);
}

struct Entry {
    job: Box<dyn Job>,
    interval: chrono::Duration,
    next_run: DateTime<Utc>,
}

/// Cooperative, single-loop scheduler
#[derive(Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `job` to run every `interval`, first due one interval from `now`
    pub fn every(
        &mut self,
        interval: Duration,
        job: impl Job + 'static,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let interval = to_chrono(interval)?;
        self.push(job, interval, now + interval);
        Ok(())
    }

    /// Register `job` to run every `interval`, due immediately
    pub fn every_starting_now(
        &mut self,
        interval: Duration,
        job: impl Job + 'static,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let interval = to_chrono(interval)?;
        self.push(job, interval, now);
        Ok(())
    }

    fn push(&mut self, job: impl Job + 'static, interval: chrono::Duration, next_run: DateTime<Utc>) {
        info!(
            "Scheduled '{}' every {}s, next run at {}",
            job.name(),
            interval.num_seconds(),
            next_run.to_rfc3339()
        );
        self.entries.push(Entry {
            job: Box::new(job),
            interval,
            next_run,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Next due time of the job called `name`
    pub fn next_run(&self, name: &str) -> Option<DateTime<Utc>> {
        self.entries
            .iter()
            .find(|e| e.job.name() == name)
            .map(|e| e.next_run)
    }

    /// Run every job due at `now`, in registration order, returning their names
    pub async fn run_pending(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let mut ran = Vec::new();

        for entry in self.entries.iter_mut().filter(|e| e.next_run <= now) {
            debug!("Running job '{}'", entry.job.name());
            entry.job.run().await;
            entry.next_run = now + entry.interval;
            ran.push(entry.job.name().to_string());
        }

        ran
    }

    /// Poll every `tick` until `shutdown` resolves
    ///
    /// A job that is running when shutdown is requested is allowed to finish.
    pub async fn run<F>(&mut self, tick: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Scheduler started with {} job(s), tick {:?}", self.entries.len(), tick);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Scheduler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_pending(Utc::now()).await;
                }
            }
        }
    }
}

fn to_chrono(interval: Duration) -> Result<chrono::Duration> {
    if interval.is_zero() {
        return Err(SweepError::Config("job interval must be positive".to_string()));
    }
    chrono::Duration::from_std(interval)
        .map_err(|e| SweepError::Config(format!("job interval out of range: {}", e)))
}
