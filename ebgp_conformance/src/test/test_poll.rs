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

use crate::poll::*;
use crate::Error;

use std::time::{Duration, Instant};

#[test]
fn default_options() {
    let opts = WaitOptions::new("something");
    assert_eq!(opts.name(), "something");
    assert_eq!(opts.interval(), Duration::from_millis(500));
    assert_eq!(opts.timeout(), Duration::from_secs(10));

    let opts = opts.with_interval(Duration::from_secs(2)).with_timeout(Duration::from_secs(30));
    assert_eq!(opts.interval(), Duration::from_secs(2));
    assert_eq!(opts.timeout(), Duration::from_secs(30));
}

#[test]
fn immediate_success() {
    let opts = WaitOptions::new("true").with_interval(Duration::from_secs(5));
    let start = Instant::now();
    let outcome = wait_for(&mut || true, &opts).unwrap();
    assert_eq!(outcome.attempts, 1);
    // no sleep after a successful evaluation
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn success_with_zero_timeout() {
    let opts = WaitOptions::new("true").with_timeout(Duration::from_secs(0));
    assert_eq!(wait_for(&mut || true, &opts).unwrap().attempts, 1);
}

#[test]
fn success_after_some_attempts() {
    let opts = WaitOptions::new("third time")
        .with_interval(Duration::from_millis(1))
        .with_timeout(Duration::from_secs(5));
    let mut calls = 0;
    let outcome = wait_for(
        &mut || {
            calls += 1;
            calls == 3
        },
        &opts,
    )
    .unwrap();
    assert_eq!(outcome.attempts, 3);
    assert_eq!(calls, 3);
}

/// Scheduling delay tolerated on top of the expected wait
const SLACK: Duration = Duration::from_millis(50);

#[test]
fn success_is_noticed_within_one_interval() {
    let interval = Duration::from_millis(100);
    let becomes_true = Duration::from_millis(250);
    let opts =
        WaitOptions::new("deadline").with_interval(interval).with_timeout(Duration::from_secs(5));
    let start = Instant::now();
    let deadline = start + becomes_true;
    let outcome = wait_for(&mut || Instant::now() >= deadline, &opts).unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= becomes_true);
    assert!(elapsed < becomes_true + interval + SLACK, "took {:?}", elapsed);
    assert!(outcome.elapsed < becomes_true + interval + SLACK);
    // evaluated at 0, 100, 200 and 300 ms
    assert_eq!(outcome.attempts, 4);
}

#[test]
fn timeout() {
    let interval = Duration::from_millis(100);
    let timeout = Duration::from_millis(300);
    let opts = WaitOptions::new("never").with_interval(interval).with_timeout(timeout);
    let mut calls = 0;
    let start = Instant::now();
    let result = wait_for(
        &mut || {
            calls += 1;
            false
        },
        &opts,
    );
    let elapsed = start.elapsed();

    match result {
        Err(Error::Timeout { name, timeout: t }) => {
            assert_eq!(name, "never");
            assert_eq!(t, timeout);
        }
        r => panic!("Expected a timeout, got {:?}", r),
    }
    assert!(elapsed >= timeout);
    assert!(elapsed < timeout + interval + SLACK, "took {:?}", elapsed);
    // evaluated at 0, 100, 200 and 300 ms, failing at the first check past the timeout
    assert_eq!(calls, 4);
}

#[test]
fn zero_timeout_fails_after_one_evaluation() {
    let opts = WaitOptions::new("never")
        .with_interval(Duration::from_millis(1))
        .with_timeout(Duration::from_secs(0));
    let mut calls = 0;
    let result = wait_for(
        &mut || {
            calls += 1;
            false
        },
        &opts,
    );
    assert!(matches!(result, Err(Error::Timeout { .. })));
    assert!(calls <= 2);
}

struct Countdown(usize);

impl Condition for Countdown {
    fn check(&mut self) -> bool {
        match self.0 {
            0 => true,
            _ => {
                self.0 -= 1;
                false
            }
        }
    }
}

#[test]
fn named_condition() {
    let opts = WaitOptions::new("countdown").with_interval(Duration::from_millis(1));
    let mut countdown = Countdown(4);
    assert_eq!(wait_for(&mut countdown, &opts).unwrap().attempts, 5);

    // trait objects work as well
    let mut countdown = Countdown(1);
    let condition: &mut dyn Condition = &mut countdown;
    assert_eq!(wait_for(condition, &opts).unwrap().attempts, 2);
}
