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

#[cfg(test)]
mod test_poll;
#[cfg(test)]
mod test_verify;

use crate::poll::WaitOptions;
use crate::runner::RoutePrefixWaits;
use crate::{DeviceParameters, TestParameters};

use otg::*;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;

/// Replays a list of snapshots. Each fetch returns the next one, and the last snapshot is repeated
/// once the list is exhausted.
#[derive(Debug)]
pub(crate) struct Script<T> {
    snapshots: Vec<Vec<T>>,
    next: Cell<usize>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self { snapshots: Vec::new(), next: Cell::new(0) }
    }
}

impl<T: Clone> Script<T> {
    fn fetch(&self) -> Vec<T> {
        let i = self.next.get();
        self.next.set(i + 1);
        match self.snapshots.len() {
            0 => Vec::new(),
            n => self.snapshots[i.min(n - 1)].clone(),
        }
    }

    pub(crate) fn fetches(&self) -> usize {
        self.next.get()
    }
}

/// In-memory controller that records every request and replays scripted metrics.
#[derive(Debug, Default)]
pub(crate) struct MockOtg {
    pub bgpv4: Script<Bgpv4Metric>,
    pub prefixes: Script<BgpPrefixesState>,
    pub flows: Script<FlowMetric>,
    pub ports: Script<PortMetric>,
    pub configs: RefCell<Vec<Config>>,
    pub control: RefCell<Vec<ControlState>>,
    pub captures: HashMap<String, Vec<u8>>,
    /// Number of metric or state requests that fail before the scripts are replayed
    pub failing_fetches: Cell<usize>,
    /// Reject every configuration
    pub reject_config: bool,
    /// Every request for flow metrics fails
    pub unavailable_flows: bool,
}

impl MockOtg {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bgpv4(mut self, snapshots: Vec<Vec<Bgpv4Metric>>) -> Self {
        self.bgpv4.snapshots = snapshots;
        self
    }

    pub fn with_prefixes(mut self, snapshots: Vec<Vec<BgpPrefixesState>>) -> Self {
        self.prefixes.snapshots = snapshots;
        self
    }

    pub fn with_flows(mut self, snapshots: Vec<Vec<FlowMetric>>) -> Self {
        self.flows.snapshots = snapshots;
        self
    }

    pub fn with_ports(mut self, snapshots: Vec<Vec<PortMetric>>) -> Self {
        self.ports.snapshots = snapshots;
        self
    }

    fn fail_fetch(&self) -> otg::Result<()> {
        match self.failing_fetches.get() {
            0 => Ok(()),
            n => {
                self.failing_fetches.set(n - 1);
                Err(otg::Error::ResponseError(503, "controller busy".to_string()))
            }
        }
    }
}

impl OtgApi for MockOtg {
    fn set_config(&self, config: &Config) -> otg::Result<Warnings> {
        if self.reject_config {
            return Err(otg::Error::OtgError {
                code: 400,
                kind: Some("validation".to_string()),
                errors: vec!["invalid configuration".to_string()],
            });
        }
        self.configs.borrow_mut().push(config.clone());
        Ok(Warnings::default())
    }

    fn set_control_state(&self, state: &ControlState) -> otg::Result<Warnings> {
        self.control.borrow_mut().push(state.clone());
        Ok(Warnings::default())
    }

    fn get_metrics(&self, request: &MetricsRequest) -> otg::Result<MetricsResponse> {
        self.fail_fetch()?;
        Ok(match request {
            MetricsRequest::Bgpv4 { .. } => MetricsResponse {
                choice: "bgpv4_metrics".to_string(),
                bgpv4_metrics: Some(self.bgpv4.fetch()),
                ..Default::default()
            },
            MetricsRequest::Flow { .. } if self.unavailable_flows => {
                return Err(otg::Error::ResponseError(500, "flow metrics unavailable".to_string()))
            }
            MetricsRequest::Flow { .. } => MetricsResponse {
                choice: "flow_metrics".to_string(),
                flow_metrics: Some(self.flows.fetch()),
                ..Default::default()
            },
            MetricsRequest::Port { .. } => MetricsResponse {
                choice: "port_metrics".to_string(),
                port_metrics: Some(self.ports.fetch()),
                ..Default::default()
            },
        })
    }

    fn get_states(&self, request: &StatesRequest) -> otg::Result<StatesResponse> {
        self.fail_fetch()?;
        match request {
            StatesRequest::BgpPrefixes { .. } => Ok(StatesResponse {
                choice: "bgp_prefixes".to_string(),
                bgp_prefixes: Some(self.prefixes.fetch()),
            }),
        }
    }

    fn get_capture(&self, request: &CaptureRequest) -> otg::Result<Vec<u8>> {
        Ok(self.captures.get(&request.port_name).cloned().unwrap_or_default())
    }
}

/// Wait options that fail quickly
pub(crate) fn fast_wait(name: &str) -> WaitOptions {
    WaitOptions::new(name)
        .with_interval(Duration::from_millis(1))
        .with_timeout(Duration::from_millis(100))
}

pub(crate) fn fast_waits() -> RoutePrefixWaits {
    RoutePrefixWaits {
        sessions: fast_wait("sessions"),
        prefixes: fast_wait("prefixes"),
        flows: fast_wait("flows"),
    }
}

pub(crate) fn bgpv4_metric(name: &str, state: SessionState, adv: u64, rec: u64) -> Bgpv4Metric {
    Bgpv4Metric {
        name: name.to_string(),
        session_state: state,
        routes_advertised: adv,
        routes_received: rec,
        ..Default::default()
    }
}

/// Both sessions up, with all routes exchanged
pub(crate) fn converged_sessions(params: &TestParameters) -> Vec<Bgpv4Metric> {
    let adv = 2 * params.tx.route_count as u64;
    let rec = 2 * params.rx.route_count as u64;
    vec![
        bgpv4_metric("dtxBgpv4Peer", SessionState::Up, adv, rec),
        bgpv4_metric("drxBgpv4Peer", SessionState::Up, adv, rec),
    ]
}

pub(crate) fn v4_prefix(address: &str, next_hop: &str) -> BgpPrefixIpv4Unicast {
    BgpPrefixIpv4Unicast {
        ipv4_address: address.to_string(),
        prefix_length: 32,
        ipv4_next_hop: Some(next_hop.to_string()),
        ..Default::default()
    }
}

pub(crate) fn v6_prefix(address: &str, next_hop: &str) -> BgpPrefixIpv6Unicast {
    BgpPrefixIpv6Unicast {
        ipv6_address: address.to_string(),
        prefix_length: 128,
        ipv6_next_hop: Some(next_hop.to_string()),
        ..Default::default()
    }
}

fn learned_from(peer: &str, dev: &DeviceParameters) -> BgpPrefixesState {
    BgpPrefixesState {
        bgp_peer_name: peer.to_string(),
        ipv4_unicast_prefixes: vec![v4_prefix(
            &dev.adv_route_v4.to_string(),
            &dev.next_hop_v4.to_string(),
        )],
        ipv6_unicast_prefixes: vec![v6_prefix(
            &dev.adv_route_v6.to_string(),
            &dev.next_hop_v6.to_string(),
        )],
    }
}

/// Each peer has learned the IPv4 and IPv6 route of the other device.
pub(crate) fn learned_prefixes(params: &TestParameters) -> Vec<BgpPrefixesState> {
    vec![learned_from("dtxBgpv4Peer", &params.rx), learned_from("drxBgpv4Peer", &params.tx)]
}

pub(crate) fn flow_metric(name: &str, transmit: TransmitState, tx: u64, rx: u64) -> FlowMetric {
    FlowMetric {
        name: name.to_string(),
        transmit,
        frames_tx: tx,
        frames_rx: rx,
        ..Default::default()
    }
}

/// All four flows in the same state, with the same counters
pub(crate) fn flows(transmit: TransmitState, tx: u64, rx: u64) -> Vec<FlowMetric> {
    crate::topology::ROUTE_PREFIX_FLOWS
        .iter()
        .map(|name| flow_metric(name, transmit, tx, rx))
        .collect()
}

pub(crate) fn port_metric(name: &str, tx: u64, rx: u64) -> PortMetric {
    PortMetric { name: name.to_string(), frames_tx: tx, frames_rx: rx, ..Default::default() }
}
