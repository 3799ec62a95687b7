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

//! # eBGP Route Exchange Conformance
//!
//! This library drives an Open Traffic Generator (OTG) controller through an eBGP route exchange
//! test. Two emulated devices establish an eBGP session, advertise IPv4 and IPv6 routes to each
//! other, and then send traffic to the advertised prefixes. Every step waits until the controller
//! reports the expected state (see [`poll::wait_for`]), and fails with [`Error::Timeout`] if this
//! does not happen in time.
//!
//! For simplified usage, check the functions [`run_ebgp_route_prefix_test`],
//! [`run_port_traffic_test`] and [`run_link_failover_test`].

#![deny(missing_docs, missing_debug_implementations)]

pub mod params;
pub mod poll;
pub mod runner;
pub mod table;
pub mod topology;
pub mod verify;

#[cfg(test)]
mod test;

pub use params::{DeviceParameters, TestParameters};
pub use poll::{wait_for, Condition, PollOutcome, WaitOptions};
pub use runner::{
    EbgpRoutePrefixTest, FlowConvergence, LinkFailoverTest, PortTrafficTest, TestStage,
};

use otg::OtgServer;

use log::*;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// # Run the eBGP route prefix test
///
/// Connect to the controller named in the parameters and run the whole test:
///
/// 1. Submit the configuration with both devices, their BGP peers, route ranges and flows.
/// 2. Start all protocols and wait until both BGP sessions are up and have exchanged all routes.
/// 3. Wait until all advertised prefixes are learned with the correct next hop.
/// 4. Start the traffic and wait until every flow has delivered all its packets.
///
/// If `capture_dir` is given, both ports capture all traffic, and the captures are written to
/// this directory once the flows have converged.
pub fn run_ebgp_route_prefix_test(
    params: &TestParameters,
    capture_dir: Option<PathBuf>,
) -> Result<(), Error> {
    params.validate()?;
    let server = OtgServer::new(&params.controller_location)?;
    info!("Running the eBGP route prefix test against {}", server.address());
    let mut test = EbgpRoutePrefixTest::new(&server, params);
    if let Some(dir) = capture_dir {
        test = test.with_capture_dir(dir);
    }
    test.run()
}

/// # Run the port traffic test
///
/// Send a fixed number of packets between the two ports, and check that the port counters match.
/// If `capture_dir` is given, the traffic on both ports is captured and written to this
/// directory.
pub fn run_port_traffic_test(
    params: &TestParameters,
    capture_dir: Option<PathBuf>,
) -> Result<(), Error> {
    params.validate()?;
    let server = OtgServer::new(&params.controller_location)?;
    info!("Running the port traffic test against {}", server.address());
    let mut test = PortTrafficTest::new(&server, params);
    if let Some(dir) = capture_dir {
        test = test.with_capture_dir(dir);
    }
    test.run()
}

/// # Run the link failover test
///
/// Bring up the eBGP sessions, start the traffic and take down the link of `port` (the receiving
/// port if `None`) while the flows are running. Returns how long each flow was without packets.
pub fn run_link_failover_test(
    params: &TestParameters,
    port: Option<String>,
) -> Result<Vec<FlowConvergence>, Error> {
    params.validate()?;
    let server = OtgServer::new(&params.controller_location)?;
    info!("Running the link failover test against {}", server.address());
    let mut test = LinkFailoverTest::new(&server, params);
    if let Some(port) = port {
        test = test.with_port(port);
    }
    test.run()
}

/// Error type of the conformance test
#[derive(Debug, Error)]
pub enum Error {
    /// Error while talking to the controller
    #[error("OTG Error: {0}")]
    OtgError(#[from] otg::Error),
    /// The awaited condition did not become true in time
    #[error("Timeout occurred while waiting for {name} (after {timeout:?})")]
    Timeout {
        /// Name of the condition
        name: String,
        /// Configured timeout
        timeout: Duration,
    },
    /// A test parameter has an invalid value
    #[error("Invalid test parameter: {0}")]
    InvalidParameter(String),
    /// A test step was called while the test was in the wrong stage.
    #[error("Test step requires stage {expected:?}, but the test is in {actual:?}")]
    InvalidStage {
        /// Stage required by the step
        expected: TestStage,
        /// Actual stage of the test
        actual: TestStage,
    },
    /// IO Error
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
    /// Error while parsing the parameter file
    #[error("JSON Error: {0}")]
    JsonError(#[from] serde_json::Error),
}
