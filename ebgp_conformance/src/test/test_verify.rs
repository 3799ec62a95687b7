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

use super::*;
use crate::poll::{wait_for, Condition};
use crate::verify::*;
use crate::TestParameters;

use otg::{SessionState, TransmitState};

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

#[test]
fn sessions_converged() {
    let params = TestParameters::default();
    assert!(bgp_sessions_ok(&converged_sessions(&params), &params));
}

#[test]
fn sessions_down() {
    let params = TestParameters::default();
    let mut metrics = converged_sessions(&params);
    metrics[1].session_state = SessionState::Down;
    assert!(!bgp_sessions_ok(&metrics, &params));
    metrics.reverse();
    assert!(!bgp_sessions_ok(&metrics, &params));
    metrics[0].session_state = SessionState::Up;
    assert!(bgp_sessions_ok(&metrics, &params));
}

#[test]
fn sessions_unknown_state_is_not_down() {
    let params = TestParameters::default();
    let mut metrics = converged_sessions(&params);
    metrics[0].session_state = SessionState::Unknown;
    assert!(bgp_sessions_ok(&metrics, &params));
}

#[test]
fn sessions_route_counts() {
    let params = TestParameters::default();
    let metrics = vec![bgpv4_metric("dtxBgpv4Peer", SessionState::Up, 1, 2)];
    assert!(!bgp_sessions_ok(&metrics, &params));
    let metrics = vec![bgpv4_metric("dtxBgpv4Peer", SessionState::Up, 2, 3)];
    assert!(!bgp_sessions_ok(&metrics, &params));

    let mut params = TestParameters::default();
    params.tx.route_count = 5;
    params.rx.route_count = 3;
    let metrics = vec![bgpv4_metric("dtxBgpv4Peer", SessionState::Up, 10, 6)];
    assert!(bgp_sessions_ok(&metrics, &params));
}

#[test]
fn sessions_empty_list() {
    assert!(bgp_sessions_ok(&[], &TestParameters::default()));
}

#[test]
fn prefixes_converged() {
    let params = TestParameters::default();
    let states = learned_prefixes(&params);
    assert_eq!(count_prefix_matches(&states, &params), 4);
    assert!(bgp_prefixes_ok(&states, &params));
    assert!(missing_prefixes(&states, &params).is_empty());
}

#[test]
fn prefixes_missing() {
    let params = TestParameters::default();
    let mut states = learned_prefixes(&params);
    states[1].ipv4_unicast_prefixes.clear();
    assert_eq!(count_prefix_matches(&states, &params), 3);
    assert!(!bgp_prefixes_ok(&states, &params));
    assert_eq!(
        missing_prefixes(&states, &params),
        vec![(IpAddr::V4(Ipv4Addr::new(10, 10, 10, 1)), IpAddr::V4(Ipv4Addr::new(1, 1, 1, 3)))]
    );
}

#[test]
fn prefixes_wrong_next_hop() {
    let params = TestParameters::default();
    let mut states = learned_prefixes(&params);
    states[0].ipv4_unicast_prefixes[0].ipv4_next_hop = Some("1.1.1.99".to_string());
    assert!(!bgp_prefixes_ok(&states, &params));
    states[0].ipv4_unicast_prefixes[0].ipv4_next_hop = None;
    assert!(!bgp_prefixes_ok(&states, &params));
}

#[test]
fn prefixes_too_many_matches() {
    let params = TestParameters::default();
    let mut states = learned_prefixes(&params);
    // dtx also learns its own route
    let own = v4_prefix("10.10.10.1", "1.1.1.3");
    states[0].ipv4_unicast_prefixes.push(own);
    assert_eq!(count_prefix_matches(&states, &params), 5);
    assert!(!bgp_prefixes_ok(&states, &params));
}

#[test]
fn prefixes_unrelated_are_ignored() {
    let params = TestParameters::default();
    let mut states = learned_prefixes(&params);
    states[0].ipv4_unicast_prefixes.push(v4_prefix("30.30.30.1", "1.1.1.5"));
    states[0].ipv6_unicast_prefixes.push(v6_prefix("::30:30:30:1", "::1:1:1:5"));
    assert!(bgp_prefixes_ok(&states, &params));
}

#[test]
fn prefixes_empty() {
    let params = TestParameters::default();
    assert!(!bgp_prefixes_ok(&[], &params));
    assert_eq!(missing_prefixes(&[], &params).len(), 4);
}

#[test]
fn flows_converged() {
    let params = TestParameters::default();
    assert!(flow_metrics_ok(&flows(TransmitState::Stopped, 100, 100), &params));
}

#[test]
fn flows_not_converged() {
    let params = TestParameters::default();
    assert!(!flow_metrics_ok(&flows(TransmitState::Started, 100, 100), &params));
    assert!(!flow_metrics_ok(&flows(TransmitState::Stopped, 100, 99), &params));
    assert!(!flow_metrics_ok(&flows(TransmitState::Stopped, 99, 99), &params));
    let mut metrics = flows(TransmitState::Stopped, 100, 100);
    metrics[3].frames_rx = 101;
    assert!(!flow_metrics_ok(&metrics, &params));
}

#[test]
fn flows_empty_list() {
    assert!(flow_metrics_ok(&[], &TestParameters::default()));
}

#[test]
fn stopped_traffic() {
    assert!(traffic_stopped(&flows(TransmitState::Stopped, 10, 0)));
    let mut metrics = flows(TransmitState::Stopped, 10, 0);
    metrics[2].transmit = TransmitState::Started;
    assert!(!traffic_stopped(&metrics));
}

#[test]
fn port_totals() {
    let metrics = vec![port_metric("ptx", 100, 105), port_metric("prx", 100, 100)];
    assert!(port_totals_ok(&metrics, 200));
    assert!(!port_totals_ok(&metrics, 199));
    assert!(!port_totals_ok(&metrics, 210));
    let metrics = vec![port_metric("ptx", 100, 50), port_metric("prx", 100, 100)];
    assert!(!port_totals_ok(&metrics, 200));
}

#[test]
fn convergence_times() {
    let m = flow_metric("f", TransmitState::Stopped, 2000, 1950);
    assert_eq!(convergence_time(&m, 100), Duration::from_millis(500));
    let m = flow_metric("f", TransmitState::Stopped, 100, 100);
    assert_eq!(convergence_time(&m, 50), Duration::from_secs(0));
    let m = flow_metric("f", TransmitState::Stopped, 100, 120);
    assert_eq!(convergence_time(&m, 50), Duration::from_secs(0));
    assert_eq!(convergence_time(&m, 0), Duration::from_secs(0));
}

#[test]
fn conditions_fetch_fresh_snapshots() {
    let params = TestParameters::default();
    let api = MockOtg::new().with_bgpv4(vec![
        vec![bgpv4_metric("dtxBgpv4Peer", SessionState::Down, 0, 0)],
        vec![bgpv4_metric("dtxBgpv4Peer", SessionState::Up, 1, 0)],
        converged_sessions(&params),
    ]);
    let mut condition = BgpSessionsConverged::new(&api, &params);
    assert!(!condition.check());
    assert!(!condition.check());
    assert!(condition.check());
    assert_eq!(api.bgpv4.fetches(), 3);
}

#[test]
fn fetch_errors_count_as_false() {
    let params = TestParameters::default();
    let api = MockOtg::new().with_prefixes(vec![learned_prefixes(&params)]);
    api.failing_fetches.set(2);
    let mut condition = BgpPrefixesConverged::new(&api, &params);
    assert!(!condition.check());
    assert!(!condition.check());
    assert!(condition.check());

    let outcome = wait_for(&mut condition, &fast_wait("prefixes")).unwrap();
    assert_eq!(outcome.attempts, 1);
}

#[test]
fn fetch_errors_surface_as_timeout() {
    let params = TestParameters::default();
    let api = MockOtg::new().with_flows(vec![flows(TransmitState::Stopped, 100, 100)]);
    api.failing_fetches.set(usize::MAX);
    let mut condition = FlowsCompleted::new(&api, &params);
    let result = wait_for(&mut condition, &fast_wait("flows"));
    assert!(matches!(result, Err(crate::Error::Timeout { .. })));
}

#[test]
fn port_totals_condition() {
    let api = MockOtg::new().with_ports(vec![
        vec![port_metric("ptx", 50, 40), port_metric("prx", 50, 60)],
        vec![port_metric("ptx", 100, 100), port_metric("prx", 100, 100)],
    ]);
    let mut condition = PortTotalsReached::new(&api, 200);
    let outcome = wait_for(&mut condition, &fast_wait("ports")).unwrap();
    assert_eq!(outcome.attempts, 2);
}

#[test]
fn traffic_stopped_condition() {
    let api = MockOtg::new().with_flows(vec![
        flows(TransmitState::Started, 10, 10),
        flows(TransmitState::Stopped, 20, 20),
    ]);
    let mut condition = TrafficStopped::new(&api);
    assert!(!condition.check());
    assert!(condition.check());
}
