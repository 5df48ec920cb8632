//! Request scheduling for the fetch pipeline
//!
//! This module handles:
//! - Per-domain concurrency limiting via semaphores
//! - The optional random pause before each request
//! - In-flight accounting (current and peak)
//! - Progress accounting: how many fetches were scheduled and completed

use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

/// A request slot held for the duration of one fetch
///
/// Dropping the slot releases the domain permit and the in-flight count.
pub struct FetchSlot<'a> {
    _permit: OwnedSemaphorePermit,
    in_flight: &'a AtomicUsize,
}

impl Drop for FetchSlot<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Scheduled/completed counters for one pass
///
/// Work is scheduled reactively as anchors are discovered, so there is no
/// total known up front. The pass is drained when nothing scheduled is still
/// outstanding.
#[derive(Debug, Default)]
pub struct Progress {
    scheduled: AtomicUsize,
    completed: AtomicUsize,
}

impl Progress {
    pub fn scheduled(&self) {
        self.scheduled.fetch_add(1, Ordering::SeqCst);
    }

    pub fn completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn scheduled_count(&self) -> usize {
        self.scheduled.load(Ordering::SeqCst)
    }

    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Scheduled minus completed
    pub fn outstanding(&self) -> usize {
        self.scheduled_count()
            .saturating_sub(self.completed_count())
    }

    pub fn is_drained(&self) -> bool {
        self.outstanding() == 0
    }
}

/// Scheduler shared by the index stage and the detail workers
pub struct Scheduler {
    /// One semaphore per domain, created on first use
    domains: Mutex<HashMap<String, Arc<Semaphore>>>,

    /// Permits per domain
    per_domain: usize,

    /// Upper bound of the pause before each request
    max_delay: Duration,

    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    progress: Progress,
}

impl Scheduler {
    /// Creates a scheduler allowing `per_domain` concurrent requests per domain
    pub fn new(per_domain: usize, max_delay: Duration) -> Self {
        Self {
            domains: Mutex::new(HashMap::new()),
            per_domain: per_domain.max(1),
            max_delay,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            progress: Progress::default(),
        }
    }

    /// Waits for a free request slot on `domain`
    ///
    /// Returns None only if the domain semaphore was closed.
    pub async fn acquire(&self, domain: &str) -> Option<FetchSlot<'_>> {
        let semaphore = {
            let mut domains = self.domains.lock().await;
            domains
                .entry(domain.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(self.per_domain)))
                .clone()
        };

        let permit = semaphore.acquire_owned().await.ok()?;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        Some(FetchSlot {
            _permit: permit,
            in_flight: &self.in_flight,
        })
    }

    /// Sleeps for a random duration up to the configured maximum
    pub async fn pause(&self) {
        let delay = self.random_delay();
        if !delay.is_zero() {
            tracing::trace!("Pausing {:?} before request", delay);
            tokio::time::sleep(delay).await;
        }
    }

    fn random_delay(&self) -> Duration {
        let max_ms = self.max_delay.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max_ms))
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous requests seen so far
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }
}
