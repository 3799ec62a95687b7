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

//! # Test Runner
//!
//! Runs a test scenario against the controller, step by step. The route prefix test moves
//! through the stages of [`TestStage`] in a fixed order, and every step checks that the test is
//! in the stage it requires. A wait that times out moves the test into
//! [`TestStage::TimeoutFailure`], from which it cannot continue.

use crate::poll::{wait_for, Condition, PollOutcome, WaitOptions};
use crate::topology::{ebgp_route_prefix_config, port_traffic_config, RX_PORT};
use crate::verify::{
    convergence_time, BgpPrefixesConverged, BgpSessionsConverged, FlowsCompleted,
    PortTotalsReached, TrafficStopped,
};
use crate::{Error, TestParameters};

use otg::{CaptureRequest, Config, ControlState, FlowMetric, LinkUpDown, OtgApi, Warnings};

use log::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Stage of the eBGP route prefix test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStage {
    /// Nothing has been sent to the controller yet.
    Idle,
    /// The configuration was accepted by the controller.
    ConfigSubmitted,
    /// All protocols were started.
    ProtocolsStarted,
    /// All BGP sessions are up and have exchanged their routes.
    SessionsConverged,
    /// All advertised prefixes are learned with the correct next hop.
    PrefixesConverged,
    /// Transmission was started on all flows.
    TrafficStarted,
    /// All flows have delivered their packets. The test has passed.
    FlowsConverged,
    /// A wait has timed out. The test has failed.
    TimeoutFailure,
}

impl TestStage {
    /// Returns true if the test cannot make any further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FlowsConverged | Self::TimeoutFailure)
    }
}

/// Wait options for each of the convergence checks of the route prefix test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePrefixWaits {
    /// Waiting for the BGP sessions
    pub sessions: WaitOptions,
    /// Waiting for the learned prefixes
    pub prefixes: WaitOptions,
    /// Waiting for the flows
    pub flows: WaitOptions,
}

impl Default for RoutePrefixWaits {
    fn default() -> Self {
        Self {
            sessions: WaitOptions::new("BGP sessions to be up")
                .with_interval(Duration::from_secs(2))
                .with_timeout(Duration::from_secs(30)),
            prefixes: WaitOptions::new("BGP prefixes to be learned")
                .with_interval(Duration::from_secs(2))
                .with_timeout(Duration::from_secs(30)),
            flows: WaitOptions::new("flow metrics to be as expected")
                .with_interval(Duration::from_secs(1))
                .with_timeout(Duration::from_secs(30)),
        }
    }
}

/// # eBGP route prefix test
///
/// ```no_run
/// use ebgp_conformance::{EbgpRoutePrefixTest, TestParameters, TestStage};
/// use otg::OtgServer;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let params = TestParameters::default();
/// let server = OtgServer::new(&params.controller_location)?;
/// let mut test = EbgpRoutePrefixTest::new(&server, &params);
/// test.run()?;
/// assert_eq!(test.stage(), TestStage::FlowsConverged);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct EbgpRoutePrefixTest<'a, A: ?Sized> {
    api: &'a A,
    params: &'a TestParameters,
    stage: TestStage,
    waits: RoutePrefixWaits,
    capture_dir: Option<PathBuf>,
}

impl<'a, A: OtgApi + ?Sized> EbgpRoutePrefixTest<'a, A> {
    /// Create a new test in the stage [`TestStage::Idle`].
    pub fn new(api: &'a A, params: &'a TestParameters) -> Self {
        Self {
            api,
            params,
            stage: TestStage::Idle,
            waits: RoutePrefixWaits::default(),
            capture_dir: None,
        }
    }

    /// Replace the wait options of the convergence checks.
    pub fn with_waits(mut self, waits: RoutePrefixWaits) -> Self {
        self.waits = waits;
        self
    }

    /// Capture the traffic on both ports, and store it in `dir` once all flows have converged.
    pub fn with_capture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.capture_dir = Some(dir.into());
        self
    }

    /// Current stage of the test
    pub fn stage(&self) -> TestStage {
        self.stage
    }

    /// The configuration that is submitted to the controller.
    pub fn config(&self) -> Config {
        ebgp_route_prefix_config(self.params, self.capture_dir.is_some())
    }

    /// Run all steps of the test.
    pub fn run(&mut self) -> Result<(), Error> {
        self.submit_config()?;
        self.start_protocols()?;
        self.wait_sessions()?;
        self.wait_prefixes()?;
        self.start_traffic()?;
        self.wait_flows()?;
        info!("eBGP route prefix test passed!");
        Ok(())
    }

    /// Submit the configuration.
    pub fn submit_config(&mut self) -> Result<(), Error> {
        self.expect_stage(TestStage::Idle)?;
        info!("Setting config...");
        log_warnings(self.api.set_config(&self.config())?);
        self.stage = TestStage::ConfigSubmitted;
        Ok(())
    }

    /// Start all protocols.
    pub fn start_protocols(&mut self) -> Result<(), Error> {
        self.expect_stage(TestStage::ConfigSubmitted)?;
        info!("Starting protocols...");
        log_warnings(self.api.set_control_state(&ControlState::start_protocols())?);
        self.stage = TestStage::ProtocolsStarted;
        Ok(())
    }

    /// Wait until all BGP sessions are up and have exchanged their routes.
    pub fn wait_sessions(&mut self) -> Result<PollOutcome, Error> {
        self.expect_stage(TestStage::ProtocolsStarted)?;
        let opts = self.waits.sessions.clone();
        let condition = BgpSessionsConverged::new(self.api, self.params);
        let outcome = self.wait_until(condition, &opts)?;
        self.stage = TestStage::SessionsConverged;
        Ok(outcome)
    }

    /// Wait until all advertised prefixes are learned with the correct next hop.
    pub fn wait_prefixes(&mut self) -> Result<PollOutcome, Error> {
        self.expect_stage(TestStage::SessionsConverged)?;
        let opts = self.waits.prefixes.clone();
        let condition = BgpPrefixesConverged::new(self.api, self.params);
        let outcome = self.wait_until(condition, &opts)?;
        self.stage = TestStage::PrefixesConverged;
        Ok(outcome)
    }

    /// Start the transmission on all flows (and the capture, if enabled).
    pub fn start_traffic(&mut self) -> Result<(), Error> {
        self.expect_stage(TestStage::PrefixesConverged)?;
        if self.capture_dir.is_some() {
            info!("Starting capture...");
            let ports = self.config().port_names();
            log_warnings(self.api.set_control_state(&ControlState::start_capture(ports))?);
        }
        info!("Starting transmit...");
        log_warnings(self.api.set_control_state(&ControlState::start_transmit())?);
        self.stage = TestStage::TrafficStarted;
        Ok(())
    }

    /// Wait until every flow has stopped and delivered all its packets. Afterwards, the captures
    /// are stored, if enabled. The test only reaches [`TestStage::FlowsConverged`] once the
    /// captures are written. If storing them fails, the test stays in
    /// [`TestStage::TrafficStarted`].
    pub fn wait_flows(&mut self) -> Result<PollOutcome, Error> {
        self.expect_stage(TestStage::TrafficStarted)?;
        let opts = self.waits.flows.clone();
        let condition = FlowsCompleted::new(self.api, self.params);
        let outcome = self.wait_until(condition, &opts)?;
        if let Some(dir) = self.capture_dir.as_ref() {
            let ports = self.config().port_names();
            save_captures(self.api, &ports, dir)?;
        }
        self.stage = TestStage::FlowsConverged;
        Ok(outcome)
    }

    fn expect_stage(&self, expected: TestStage) -> Result<(), Error> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(Error::InvalidStage { expected, actual: self.stage })
        }
    }

    /// Wait for the condition. On timeout, the test moves to [`TestStage::TimeoutFailure`].
    fn wait_until<C: Condition>(
        &mut self,
        mut condition: C,
        opts: &WaitOptions,
    ) -> Result<PollOutcome, Error> {
        wait_for(&mut condition, opts).map_err(|e| {
            self.stage = TestStage::TimeoutFailure;
            e
        })
    }
}

/// # Port traffic test
///
/// Send `pkt_count` packets from each port to the other one, and wait until the port counters
/// show that all packets were sent and received.
#[derive(Debug)]
pub struct PortTrafficTest<'a, A: ?Sized> {
    api: &'a A,
    params: &'a TestParameters,
    wait: WaitOptions,
    capture_dir: Option<PathBuf>,
}

impl<'a, A: OtgApi + ?Sized> PortTrafficTest<'a, A> {
    /// Create a new test.
    pub fn new(api: &'a A, params: &'a TestParameters) -> Self {
        Self {
            api,
            params,
            wait: WaitOptions::new("port metrics to be as expected")
                .with_interval(Duration::from_secs(1))
                .with_timeout(Duration::from_secs(30)),
            capture_dir: None,
        }
    }

    /// Replace the wait options of the port counter check.
    pub fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// Capture the traffic on both ports, and store it in `dir` after the test.
    pub fn with_capture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.capture_dir = Some(dir.into());
        self
    }

    /// Run the test.
    pub fn run(&self) -> Result<(), Error> {
        let config = port_traffic_config(self.params, self.capture_dir.is_some());
        let expected = config.total_fixed_packets();

        info!("Setting config...");
        log_warnings(self.api.set_config(&config)?);
        if self.capture_dir.is_some() {
            info!("Starting capture...");
            log_warnings(
                self.api.set_control_state(&ControlState::start_capture(config.port_names()))?,
            );
        }
        info!("Starting transmit on all flows...");
        log_warnings(self.api.set_control_state(&ControlState::start_transmit())?);

        let mut condition = PortTotalsReached::new(self.api, expected);
        wait_for(&mut condition, &self.wait)?;

        match self.api.get_flow_metrics() {
            Ok(flows) => {
                for f in flows.iter() {
                    info!(
                        "Flow {}: {:?} without packets",
                        f.name,
                        convergence_time(f, self.params.pkt_rate)
                    );
                }
            }
            Err(e) => warn!("Cannot get flow metrics: {}", e),
        }

        if let Some(dir) = self.capture_dir.as_ref() {
            save_captures(self.api, &config.port_names(), dir)?;
        }
        info!("Port traffic test passed!");
        Ok(())
    }
}

/// Loss measured on a single flow during a link failure
#[derive(Debug, Clone, PartialEq)]
pub struct FlowConvergence {
    /// Name of the flow
    pub name: String,
    /// Frames that were sent but never received
    pub frames_lost: u64,
    /// Time the flow was without packets, at the configured packet rate
    pub time: Duration,
}

impl FlowConvergence {
    fn from_metric(metric: &FlowMetric, pkt_rate: u64) -> Self {
        Self {
            name: metric.name.clone(),
            frames_lost: metric.frames_tx.saturating_sub(metric.frames_rx),
            time: convergence_time(metric, pkt_rate),
        }
    }
}

/// # Link failover test
///
/// Bring up both BGP sessions of the route prefix topology and start the traffic. While the flows
/// are running, the link of one port (by default the receiving port) is taken down. Once all flows
/// have stopped, the frames lost on each flow tell how long it was without packets. The link is
/// brought up again afterwards, even if the flows did not stop in time.
#[derive(Debug)]
pub struct LinkFailoverTest<'a, A: ?Sized> {
    api: &'a A,
    params: &'a TestParameters,
    port: String,
    failure_delay: Duration,
    sessions: WaitOptions,
    stopped: WaitOptions,
}

impl<'a, A: OtgApi + ?Sized> LinkFailoverTest<'a, A> {
    /// Create a new test. The link fails after half of the transmission time has passed.
    pub fn new(api: &'a A, params: &'a TestParameters) -> Self {
        let failure_delay = match params.pkt_rate {
            0 => Duration::from_secs(0),
            rate => Duration::from_secs_f64(params.pkt_count as f64 / rate as f64 / 2.0),
        };
        Self {
            api,
            params,
            port: RX_PORT.to_string(),
            failure_delay,
            sessions: RoutePrefixWaits::default().sessions,
            stopped: WaitOptions::new("traffic to stop")
                .with_interval(Duration::from_secs(2))
                .with_timeout(Duration::from_secs(90)),
        }
    }

    /// Take down the link of `port` instead of the receiving port.
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    /// Time between starting the traffic and taking down the link
    pub fn with_failure_delay(mut self, delay: Duration) -> Self {
        self.failure_delay = delay;
        self
    }

    /// Replace the wait options for the BGP sessions.
    pub fn with_session_wait(mut self, wait: WaitOptions) -> Self {
        self.sessions = wait;
        self
    }

    /// Replace the wait options for the traffic to stop.
    pub fn with_stopped_wait(mut self, wait: WaitOptions) -> Self {
        self.stopped = wait;
        self
    }

    /// Run the test, and return the loss of every flow.
    pub fn run(&self) -> Result<Vec<FlowConvergence>, Error> {
        info!("Setting config...");
        log_warnings(self.api.set_config(&ebgp_route_prefix_config(self.params, false))?);
        info!("Starting protocols...");
        log_warnings(self.api.set_control_state(&ControlState::start_protocols())?);
        wait_for(&mut BgpSessionsConverged::new(self.api, self.params), &self.sessions)?;

        info!("Starting transmit...");
        log_warnings(self.api.set_control_state(&ControlState::start_transmit())?);
        std::thread::sleep(self.failure_delay);

        info!("Bringing the link of {} down...", self.port);
        log_warnings(self.api.set_control_state(&self.link(LinkUpDown::Down))?);
        let flows = wait_for(&mut TrafficStopped::new(self.api), &self.stopped)
            .and_then(|_| self.api.get_flow_metrics().map_err(Error::from));

        info!("Bringing the link of {} up...", self.port);
        let restored = self.api.set_control_state(&self.link(LinkUpDown::Up));
        let flows = flows?;
        log_warnings(restored?);

        let result: Vec<FlowConvergence> = flows
            .iter()
            .map(|f| FlowConvergence::from_metric(f, self.params.pkt_rate))
            .collect();
        for f in result.iter() {
            info!(
                "Convergence time of {} was {:?} ({} frames lost)",
                f.name, f.time, f.frames_lost
            );
        }
        Ok(result)
    }

    fn link(&self, state: LinkUpDown) -> ControlState {
        ControlState::link(vec![self.port.clone()], state)
    }
}

/// Stop the capture on the given ports, and write the capture of each port to
/// `dir/<port>.pcap`. Returns the paths of all written files.
pub fn save_captures<A: OtgApi + ?Sized>(
    api: &A,
    port_names: &[String],
    dir: &Path,
) -> Result<Vec<PathBuf>, Error> {
    info!("Stopping capture...");
    log_warnings(api.set_control_state(&ControlState::stop_capture(port_names.to_vec()))?);
    fs::create_dir_all(dir)?;
    let mut paths = Vec::with_capacity(port_names.len());
    for port in port_names {
        let data = api.get_capture(&CaptureRequest::new(port.as_str()))?;
        let path = dir.join(format!("{}.pcap", port));
        fs::write(&path, &data)?;
        info!("Stored the capture of {} ({} bytes) in {}", port, data.len(), path.display());
        paths.push(path);
    }
    Ok(paths)
}

fn log_warnings(warnings: Warnings) {
    for w in warnings.warnings {
        warn!("Controller warning: {}", w);
    }
}
