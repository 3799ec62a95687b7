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

//! # Convergence Verifier
//!
//! Predicates that decide whether the controller has reached the expected state. Each predicate
//! exists twice: as a pure function over a snapshot and the test parameters, and as a
//! [`Condition`] that fetches a fresh snapshot from the controller on every evaluation, logs it as
//! a table, and then calls the pure function.
//!
//! A condition that cannot fetch its snapshot logs a warning and reports false. The error thus
//! surfaces as a timeout of the surrounding wait.

use crate::poll::Condition;
use crate::table;
use crate::TestParameters;

use otg::{
    Bgpv4Metric, BgpPrefixesState, FlowMetric, OtgApi, PortMetric, SessionState, TransmitState,
};

use log::*;
use std::net::IpAddr;
use std::time::Duration;

/// Number of `(prefix, next hop)` pairs that must be learned: both the IPv4 and the IPv6 route of
/// both devices, each learned by the opposite peer.
pub const EXPECTED_PREFIX_MATCHES: usize = 4;

/// Check that all BGP sessions are established and have exchanged all routes. Every peer must not
/// be down, must have advertised `2 * tx.route_count` routes and received `2 * rx.route_count`
/// routes (one IPv4 and one IPv6 range each).
pub fn bgp_sessions_ok(metrics: &[Bgpv4Metric], params: &TestParameters) -> bool {
    let expected_advertised = 2 * params.tx.route_count as u64;
    let expected_received = 2 * params.rx.route_count as u64;
    metrics.iter().all(|m| {
        m.session_state != SessionState::Down
            && m.routes_advertised == expected_advertised
            && m.routes_received == expected_received
    })
}

/// Count how many learned prefixes match one of the advertised routes with the expected next hop,
/// summed over all peers and both address families.
pub fn count_prefix_matches(states: &[BgpPrefixesState], params: &TestParameters) -> usize {
    let v4 = params.expected_v4_routes();
    let v6 = params.expected_v6_routes();
    states
        .iter()
        .map(|s| {
            let v4_matches = s
                .ipv4_unicast_prefixes
                .iter()
                .filter_map(|p| Some((p.address()?, p.next_hop()?)))
                .map(|learned| v4.iter().filter(|exp| **exp == learned).count())
                .sum::<usize>();
            let v6_matches = s
                .ipv6_unicast_prefixes
                .iter()
                .filter_map(|p| Some((p.address()?, p.next_hop()?)))
                .map(|learned| v6.iter().filter(|exp| **exp == learned).count())
                .sum::<usize>();
            v4_matches + v6_matches
        })
        .sum()
}

/// Check that exactly [`EXPECTED_PREFIX_MATCHES`] learned prefixes match an advertised route with
/// its next hop. Additional matches (e.g., a peer learning its own route) make the check fail.
pub fn bgp_prefixes_ok(states: &[BgpPrefixesState], params: &TestParameters) -> bool {
    count_prefix_matches(states, params) == EXPECTED_PREFIX_MATCHES
}

/// Returns all advertised `(prefix, next hop)` pairs that no peer has learned yet.
pub fn missing_prefixes(
    states: &[BgpPrefixesState],
    params: &TestParameters,
) -> Vec<(IpAddr, IpAddr)> {
    let learned_v4: Vec<_> = states
        .iter()
        .flat_map(|s| s.ipv4_unicast_prefixes.iter())
        .map(|p| (p.address(), p.next_hop()))
        .collect();
    let learned_v6: Vec<_> = states
        .iter()
        .flat_map(|s| s.ipv6_unicast_prefixes.iter())
        .map(|p| (p.address(), p.next_hop()))
        .collect();

    let mut missing = Vec::new();
    for (addr, next_hop) in params.expected_v4_routes().iter() {
        if !learned_v4.contains(&(Some(*addr), Some(*next_hop))) {
            missing.push((IpAddr::V4(*addr), IpAddr::V4(*next_hop)));
        }
    }
    for (addr, next_hop) in params.expected_v6_routes().iter() {
        if !learned_v6.contains(&(Some(*addr), Some(*next_hop))) {
            missing.push((IpAddr::V6(*addr), IpAddr::V6(*next_hop)));
        }
    }
    missing
}

/// Check that every flow has stopped and has sent and received exactly `pkt_count` frames.
pub fn flow_metrics_ok(metrics: &[FlowMetric], params: &TestParameters) -> bool {
    let expected = params.pkt_count as u64;
    metrics.iter().all(|m| {
        m.transmit == TransmitState::Stopped && m.frames_tx == expected && m.frames_rx == expected
    })
}

/// Check that every flow has stopped, regardless of its counters.
pub fn traffic_stopped(metrics: &[FlowMetric]) -> bool {
    metrics.iter().all(|m| m.transmit == TransmitState::Stopped)
}

/// Check that the ports have sent exactly `expected` frames in total, and received at least that
/// many. Ports may receive additional control traffic.
pub fn port_totals_ok(metrics: &[PortMetric], expected: u64) -> bool {
    let total_tx: u64 = metrics.iter().map(|m| m.frames_tx).sum();
    let total_rx: u64 = metrics.iter().map(|m| m.frames_rx).sum();
    total_tx == expected && total_rx >= expected
}

/// Estimate the time during which a flow lost packets: the number of lost frames divided by the
/// packet rate.
pub fn convergence_time(metric: &FlowMetric, pkt_rate: u64) -> Duration {
    if pkt_rate == 0 {
        return Duration::from_secs(0);
    }
    let lost = metric.frames_tx.saturating_sub(metric.frames_rx);
    Duration::from_secs_f64(lost as f64 / pkt_rate as f64)
}

/// Waits until all BGP sessions are up and have exchanged all routes.
#[derive(Debug)]
pub struct BgpSessionsConverged<'a, A: ?Sized> {
    api: &'a A,
    params: &'a TestParameters,
}

impl<'a, A: OtgApi + ?Sized> BgpSessionsConverged<'a, A> {
    /// Create the condition
    pub fn new(api: &'a A, params: &'a TestParameters) -> Self {
        Self { api, params }
    }
}

impl<'a, A: OtgApi + ?Sized> Condition for BgpSessionsConverged<'a, A> {
    fn check(&mut self) -> bool {
        debug!("Getting bgpv4 metrics...");
        match self.api.get_bgpv4_metrics() {
            Ok(metrics) => {
                info!("{}", table::bgpv4_metrics_table(&metrics));
                bgp_sessions_ok(&metrics, self.params)
            }
            Err(e) => {
                warn!("Cannot get bgpv4 metrics: {}", e);
                false
            }
        }
    }
}

/// Waits until all advertised prefixes are learned with the correct next hop.
#[derive(Debug)]
pub struct BgpPrefixesConverged<'a, A: ?Sized> {
    api: &'a A,
    params: &'a TestParameters,
}

impl<'a, A: OtgApi + ?Sized> BgpPrefixesConverged<'a, A> {
    /// Create the condition
    pub fn new(api: &'a A, params: &'a TestParameters) -> Self {
        Self { api, params }
    }
}

impl<'a, A: OtgApi + ?Sized> Condition for BgpPrefixesConverged<'a, A> {
    fn check(&mut self) -> bool {
        debug!("Getting BGP prefixes...");
        match self.api.get_bgp_prefixes() {
            Ok(states) => {
                info!("{}", table::bgp_prefixes_table(&states));
                for (prefix, next_hop) in missing_prefixes(&states, self.params) {
                    debug!("Prefix {} via {} is not yet learned", prefix, next_hop);
                }
                bgp_prefixes_ok(&states, self.params)
            }
            Err(e) => {
                warn!("Cannot get BGP prefixes: {}", e);
                false
            }
        }
    }
}

/// Waits until every flow has stopped and delivered all its packets.
#[derive(Debug)]
pub struct FlowsCompleted<'a, A: ?Sized> {
    api: &'a A,
    params: &'a TestParameters,
}

impl<'a, A: OtgApi + ?Sized> FlowsCompleted<'a, A> {
    /// Create the condition
    pub fn new(api: &'a A, params: &'a TestParameters) -> Self {
        Self { api, params }
    }
}

impl<'a, A: OtgApi + ?Sized> Condition for FlowsCompleted<'a, A> {
    fn check(&mut self) -> bool {
        debug!("Getting flow metrics...");
        match self.api.get_flow_metrics() {
            Ok(metrics) => {
                info!("{}", table::flow_metrics_table(&metrics));
                flow_metrics_ok(&metrics, self.params)
            }
            Err(e) => {
                warn!("Cannot get flow metrics: {}", e);
                false
            }
        }
    }
}

/// Waits until every flow has stopped.
#[derive(Debug)]
pub struct TrafficStopped<'a, A: ?Sized> {
    api: &'a A,
}

impl<'a, A: OtgApi + ?Sized> TrafficStopped<'a, A> {
    /// Create the condition
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }
}

impl<'a, A: OtgApi + ?Sized> Condition for TrafficStopped<'a, A> {
    fn check(&mut self) -> bool {
        match self.api.get_flow_metrics() {
            Ok(metrics) => {
                info!("{}", table::flow_metrics_table(&metrics));
                traffic_stopped(&metrics)
            }
            Err(e) => {
                warn!("Cannot get flow metrics: {}", e);
                false
            }
        }
    }
}

/// Waits until the ports have sent and received the expected number of frames.
#[derive(Debug)]
pub struct PortTotalsReached<'a, A: ?Sized> {
    api: &'a A,
    expected: u64,
}

impl<'a, A: OtgApi + ?Sized> PortTotalsReached<'a, A> {
    /// Create the condition, expecting `expected` frames in total.
    pub fn new(api: &'a A, expected: u64) -> Self {
        Self { api, expected }
    }
}

impl<'a, A: OtgApi + ?Sized> Condition for PortTotalsReached<'a, A> {
    fn check(&mut self) -> bool {
        match self.api.get_port_metrics() {
            Ok(metrics) => {
                info!("{}", table::port_metrics_table(&metrics));
                port_totals_ok(&metrics, self.expected)
            }
            Err(e) => {
                warn!("Cannot get port metrics: {}", e);
                false
            }
        }
    }
}
