//! Shared driver for the background refresh threads.

use crate::error::{EvohomeError, Result};
use crate::shutdown::Shutdown;
use log::{debug, error, info, warn};
use rand::Rng;
use std::time::{Duration, Instant};

/// Wait between ticks: the base interval, doubled per consecutive failed
/// tick up to `max`, plus up to 10% random jitter once failing.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Backoff {
            base,
            max: max.max(base),
            failures: 0,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Delay before the next tick, without jitter.
    pub fn delay(&self) -> Duration {
        let factor = 1u32.checked_shl(self.failures.min(31)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    pub fn delay_with_jitter(&self) -> Duration {
        let delay = self.delay();
        if self.failures == 0 {
            return delay;
        }
        let jitter_ms = (delay.as_millis() / 10) as u64;
        if jitter_ms == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}

/// Run `tick` every `interval` until `shutdown` fires.
///
/// A failed tick never ends the loop: the error is logged and, when it is a
/// network or auth failure, the next wait backs off.
pub fn run_loop<F>(name: &str, interval: Duration, max_backoff: Duration, shutdown: &Shutdown, mut tick: F)
where
    F: FnMut() -> Result<()>,
{
    let mut backoff = Backoff::new(interval, max_backoff);
    info!("{}: starting (interval={}ms)", name, interval.as_millis());

    while !shutdown.is_triggered() {
        let tick_start = Instant::now();

        match tick() {
            Ok(()) => {
                if backoff.failures() > 0 {
                    info!("{}: recovered after {} failed tick(s)", name, backoff.failures());
                }
                backoff.reset();
            }
            Err(e) => {
                if e.is_transient() || e.is_auth() {
                    backoff.record_failure();
                }
                log_failure(name, &e, backoff.failures());
            }
        }

        // Wait out what is left of the interval or backoff delay
        let wait = backoff.delay_with_jitter().saturating_sub(tick_start.elapsed());
        debug!("{}: next tick in {}ms", name, wait.as_millis());
        if shutdown.wait(wait) {
            break;
        }
    }

    info!("{}: stopped", name);
}

fn log_failure(name: &str, e: &EvohomeError, failures: u32) {
    match e {
        EvohomeError::Auth(_) => warn!(
            "{}: tick failed, re-authentication required ({} consecutive): {}",
            name, failures, e
        ),
        EvohomeError::Decode { .. } => error!("{}: tick failed, unexpected payload: {}", name, e),
        _ if e.is_transient() => warn!("{}: tick failed ({} consecutive): {}", name, failures, e),
        _ => error!("{}: tick failed: {}", name, e),
    }
}
