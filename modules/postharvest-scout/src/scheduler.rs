use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{error, info};

use crate::error::ScrapeError;
use crate::orchestrator::RunStats;

/// Repeats scrape runs with a random idle gap between them.
pub struct Scheduler {
    min_idle: Duration,
    max_idle: Duration,
}

impl Scheduler {
    pub fn new(min_idle: Duration, max_idle: Duration) -> Self {
        let (min_idle, max_idle) = if min_idle <= max_idle {
            (min_idle, max_idle)
        } else {
            (max_idle, min_idle)
        };
        Self { min_idle, max_idle }
    }

    /// Uniform random pause in `[min_idle, max_idle]`.
    pub fn next_idle(&self) -> Duration {
        let min = self.min_idle.as_millis() as u64;
        let max = self.max_idle.as_millis() as u64;
        if min == max {
            return self.min_idle;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }

    /// Call `run_once` until `max_runs` runs happened (forever when `None`).
    /// A failed run is logged and the loop carries on after the usual pause.
    /// Returns the number of failed runs.
    pub async fn run<F, Fut>(&self, mut run_once: F, max_runs: Option<u64>) -> u64
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<RunStats, ScrapeError>>,
    {
        let mut runs = 0u64;
        let mut failures = 0u64;
        loop {
            runs += 1;
            match run_once().await {
                Ok(stats) => info!(run = runs, "Run finished. {stats}"),
                Err(e) => {
                    failures += 1;
                    error!(run = runs, error = %e, "Run failed, retrying next cycle");
                }
            }

            if max_runs.is_some_and(|max| runs >= max) {
                return failures;
            }

            let idle = self.next_idle();
            info!(idle_secs = idle.as_secs(), "Sleeping until next run");
            tokio::time::sleep(idle).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn idle_stays_within_bounds() {
        let scheduler = Scheduler::new(Duration::from_secs(10), Duration::from_secs(20));
        for _ in 0..200 {
            let idle = scheduler.next_idle();
            assert!(idle >= Duration::from_secs(10) && idle <= Duration::from_secs(20));
        }
    }

    #[test]
    fn equal_bounds_are_fixed() {
        let scheduler = Scheduler::new(Duration::from_secs(5), Duration::from_secs(5));
        assert_eq!(scheduler.next_idle(), Duration::from_secs(5));
    }

    #[test]
    fn inverted_bounds_are_swapped() {
        let scheduler = Scheduler::new(Duration::from_secs(30), Duration::from_secs(10));
        let idle = scheduler.next_idle();
        assert!(idle >= Duration::from_secs(10) && idle <= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn failed_runs_do_not_stop_the_loop() {
        let scheduler = Scheduler::new(Duration::ZERO, Duration::ZERO);
        let calls = Cell::new(0u32);

        let failures = scheduler
            .run(
                || {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move {
                        if n % 2 == 1 {
                            Err(ScrapeError::Session("login form missing".into()))
                        } else {
                            Ok(RunStats::default())
                        }
                    }
                },
                Some(4),
            )
            .await;

        assert_eq!(calls.get(), 4);
        assert_eq!(failures, 2);
    }
}
