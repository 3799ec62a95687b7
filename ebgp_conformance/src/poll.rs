// OTG Conformance: eBGP Route Exchange Tests against Open Traffic Generators
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! # Condition Poller
//!
//! Repeatedly evaluate a [`Condition`] until it becomes true, or until the timeout has elapsed.
//! The condition is always evaluated before the timeout is checked, so a condition that is
//! already true succeeds immediately, even with a timeout of zero.

use crate::Error;

use log::*;
use std::thread::sleep;
use std::time::{Duration, Instant};

/// Interval between two evaluations, if not set explicitly.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);
/// Time after which the poller gives up, if not set explicitly.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A condition that is evaluated repeatedly by [`wait_for`]. Every call to `check` should observe
/// the current state (e.g., by fetching new metrics from the controller).
pub trait Condition {
    /// Returns true once the condition is satisfied.
    fn check(&mut self) -> bool;
}

impl<F> Condition for F
where
    F: FnMut() -> bool,
{
    fn check(&mut self) -> bool {
        self()
    }
}

/// Describes how to wait for a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    name: String,
    interval: Option<Duration>,
    timeout: Option<Duration>,
}

impl WaitOptions {
    /// Create new options with the default interval and timeout. The name is only used for
    /// logging and in the timeout error.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), interval: None, timeout: None }
    }

    /// Set the interval between two evaluations.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Name of the condition
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective interval
    pub fn interval(&self) -> Duration {
        self.interval.unwrap_or(DEFAULT_INTERVAL)
    }

    /// Effective timeout
    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }
}

/// Result of a successful wait, for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// Number of times the condition was evaluated, including the last (successful) one.
    pub attempts: usize,
    /// Time from the start of the wait until the condition was satisfied.
    pub elapsed: Duration,
}

/// # Wait for a condition
///
/// Evaluate `condition` until it returns true. After each false evaluation, the elapsed time is
/// compared to the timeout; once it is exceeded, [`Error::Timeout`] is returned. Otherwise, the
/// poller sleeps for the interval and tries again. There is no sleep after a successful
/// evaluation.
pub fn wait_for<C>(condition: &mut C, opts: &WaitOptions) -> Result<PollOutcome, Error>
where
    C: Condition + ?Sized,
{
    let interval = opts.interval();
    let timeout = opts.timeout();
    info!("Waiting for {}...", opts.name);

    let start = Instant::now();
    let mut attempts: usize = 0;
    loop {
        attempts += 1;
        if condition.check() {
            let elapsed = start.elapsed();
            info!("Done waiting for {} (after {:.3}s)", opts.name, elapsed.as_secs_f64());
            return Ok(PollOutcome { attempts, elapsed });
        }
        let elapsed = start.elapsed();
        if elapsed > timeout {
            error!("Timeout occurred while waiting for {}", opts.name);
            return Err(Error::Timeout { name: opts.name.clone(), timeout });
        }
        debug!("{} is not yet satisfied (attempt {}, {:?} elapsed)", opts.name, attempts, elapsed);
        sleep(interval);
    }
}
