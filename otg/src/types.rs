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

//! # OTG Monitoring Types
//!
//! Requests and responses of the metrics, states and capture endpoints.

use crate::serialize_choice;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Warnings returned by the controller after a successful configuration or control request.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct Warnings {
    /// List of warnings
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Error body returned by the controller on a failed request
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub(crate) struct OtgErrorBody {
    pub code: i32,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Version information of the controller
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct Version {
    /// Version of the OTG API specification
    #[serde(default)]
    pub api_spec_version: String,
    /// Version of the SDK
    #[serde(default)]
    pub sdk_version: String,
    /// Version of the controller application
    #[serde(default)]
    pub app_version: String,
}

/// # Metrics Request
///
/// Selects which metrics should be returned. Empty name lists select everything.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsRequest {
    /// Request metrics of BGPv4 peers
    Bgpv4 {
        /// Names of the peers
        peer_names: Vec<String>,
    },
    /// Request metrics of flows
    Flow {
        /// Names of the flows
        flow_names: Vec<String>,
    },
    /// Request metrics of ports
    Port {
        /// Names of the ports
        port_names: Vec<String>,
    },
}

impl MetricsRequest {
    /// Request the BGPv4 metrics of the given peers (all peers if empty)
    pub fn bgpv4(peer_names: Vec<String>) -> Self {
        Self::Bgpv4 { peer_names }
    }

    /// Request the metrics of the given flows (all flows if empty)
    pub fn flow(flow_names: Vec<String>) -> Self {
        Self::Flow { flow_names }
    }

    /// Request the metrics of the given ports (all ports if empty)
    pub fn port(port_names: Vec<String>) -> Self {
        Self::Port { port_names }
    }
}

#[derive(Serialize)]
struct NamesFilter<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    peer_names: Option<&'a Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flow_names: Option<&'a Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port_names: Option<&'a Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bgp_peer_names: Option<&'a Vec<String>>,
}

impl<'a> NamesFilter<'a> {
    fn empty() -> Self {
        Self { peer_names: None, flow_names: None, port_names: None, bgp_peer_names: None }
    }
}

impl Serialize for MetricsRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bgpv4 { peer_names } => serialize_choice(
                serializer,
                "bgpv4",
                &NamesFilter { peer_names: Some(peer_names), ..NamesFilter::empty() },
            ),
            Self::Flow { flow_names } => serialize_choice(
                serializer,
                "flow",
                &NamesFilter { flow_names: Some(flow_names), ..NamesFilter::empty() },
            ),
            Self::Port { port_names } => serialize_choice(
                serializer,
                "port",
                &NamesFilter { port_names: Some(port_names), ..NamesFilter::empty() },
            ),
        }
    }
}

/// # Metrics Response
///
/// Only the field matching `choice` is present.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct MetricsResponse {
    /// Which kind of metrics are contained
    #[serde(default)]
    pub choice: String,
    /// BGPv4 metrics
    #[serde(default)]
    pub bgpv4_metrics: Option<Vec<Bgpv4Metric>>,
    /// Flow metrics
    #[serde(default)]
    pub flow_metrics: Option<Vec<FlowMetric>>,
    /// Port metrics
    #[serde(default)]
    pub port_metrics: Option<Vec<PortMetric>>,
}

/// BGP session state
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Session is established
    Up,
    /// Session is down
    Down,
    /// State was not reported
    #[serde(other)]
    Unknown,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Transmit state of a flow or a port
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransmitState {
    /// Traffic is being sent
    Started,
    /// Traffic is stopped
    Stopped,
    /// Traffic is paused
    Paused,
    /// State was not reported
    #[serde(other)]
    Unknown,
}

impl Default for TransmitState {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Link state of a port
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    /// Link is up
    Up,
    /// Link is down
    Down,
    /// State was not reported
    #[serde(other)]
    Unknown,
}

impl Default for LinkState {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Unknown => "unknown",
        })
    }
}

impl fmt::Display for TransmitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::Paused => "paused",
            Self::Unknown => "unknown",
        })
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Unknown => "unknown",
        })
    }
}

/// Metrics of a single BGPv4 peer
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct Bgpv4Metric {
    /// Name of the peer
    pub name: String,
    /// Session state
    #[serde(default)]
    pub session_state: SessionState,
    /// Number of times the session went from up to down
    #[serde(default, deserialize_with = "de_u64")]
    pub session_flap_count: u64,
    /// Number of advertised routes
    #[serde(default, deserialize_with = "de_u64")]
    pub routes_advertised: u64,
    /// Number of received routes
    #[serde(default, deserialize_with = "de_u64")]
    pub routes_received: u64,
    /// Number of sent update messages
    #[serde(default, deserialize_with = "de_u64")]
    pub updates_sent: u64,
    /// Number of received update messages
    #[serde(default, deserialize_with = "de_u64")]
    pub updates_received: u64,
}

/// Metrics of a single flow
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct FlowMetric {
    /// Name of the flow
    pub name: String,
    /// Name of the transmitting port
    #[serde(default)]
    pub port_tx: Option<String>,
    /// Name of the receiving port
    #[serde(default)]
    pub port_rx: Option<String>,
    /// Transmit state
    #[serde(default)]
    pub transmit: TransmitState,
    /// Number of transmitted frames
    #[serde(default, deserialize_with = "de_u64")]
    pub frames_tx: u64,
    /// Number of received frames
    #[serde(default, deserialize_with = "de_u64")]
    pub frames_rx: u64,
    /// Number of transmitted bytes
    #[serde(default, deserialize_with = "de_u64")]
    pub bytes_tx: u64,
    /// Number of received bytes
    #[serde(default, deserialize_with = "de_u64")]
    pub bytes_rx: u64,
    /// Transmitted frames per second
    #[serde(default)]
    pub frames_tx_rate: f64,
    /// Received frames per second
    #[serde(default)]
    pub frames_rx_rate: f64,
    /// Loss in percent
    #[serde(default)]
    pub loss: f64,
}

/// Metrics of a single port
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct PortMetric {
    /// Name of the port
    pub name: String,
    /// Location of the port
    #[serde(default)]
    pub location: Option<String>,
    /// Link state
    #[serde(default)]
    pub link: LinkState,
    /// Capture state
    #[serde(default)]
    pub capture: Option<String>,
    /// Transmit state
    #[serde(default)]
    pub transmit: TransmitState,
    /// Number of transmitted frames
    #[serde(default, deserialize_with = "de_u64")]
    pub frames_tx: u64,
    /// Number of received frames
    #[serde(default, deserialize_with = "de_u64")]
    pub frames_rx: u64,
    /// Number of transmitted bytes
    #[serde(default, deserialize_with = "de_u64")]
    pub bytes_tx: u64,
    /// Number of received bytes
    #[serde(default, deserialize_with = "de_u64")]
    pub bytes_rx: u64,
    /// Transmitted frames per second
    #[serde(default)]
    pub frames_tx_rate: f64,
    /// Received frames per second
    #[serde(default)]
    pub frames_rx_rate: f64,
    /// Transmitted bytes per second
    #[serde(default)]
    pub bytes_tx_rate: f64,
    /// Received bytes per second
    #[serde(default)]
    pub bytes_rx_rate: f64,
}

/// # States Request
#[derive(Debug, Clone, PartialEq)]
pub enum StatesRequest {
    /// Request the learned prefixes of BGP peers
    BgpPrefixes {
        /// Names of the peers (all peers if empty)
        bgp_peer_names: Vec<String>,
    },
}

impl StatesRequest {
    /// Request the learned prefixes of the given BGP peers (all peers if empty)
    pub fn bgp_prefixes(bgp_peer_names: Vec<String>) -> Self {
        Self::BgpPrefixes { bgp_peer_names }
    }
}

impl Serialize for StatesRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::BgpPrefixes { bgp_peer_names } => serialize_choice(
                serializer,
                "bgp_prefixes",
                &NamesFilter { bgp_peer_names: Some(bgp_peer_names), ..NamesFilter::empty() },
            ),
        }
    }
}

/// # States Response
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct StatesResponse {
    /// Which kind of states are contained
    #[serde(default)]
    pub choice: String,
    /// Learned prefixes of BGP peers
    #[serde(default)]
    pub bgp_prefixes: Option<Vec<BgpPrefixesState>>,
}

/// All prefixes learned by a single BGP peer
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct BgpPrefixesState {
    /// Name of the peer
    pub bgp_peer_name: String,
    /// Learned IPv4 unicast prefixes
    #[serde(default)]
    pub ipv4_unicast_prefixes: Vec<BgpPrefixIpv4Unicast>,
    /// Learned IPv6 unicast prefixes
    #[serde(default)]
    pub ipv6_unicast_prefixes: Vec<BgpPrefixIpv6Unicast>,
}

/// A learned IPv4 unicast prefix
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct BgpPrefixIpv4Unicast {
    /// Network address
    pub ipv4_address: String,
    /// Prefix length
    #[serde(default)]
    pub prefix_length: u32,
    /// Origin attribute
    #[serde(default)]
    pub origin: Option<String>,
    /// IPv4 next hop
    #[serde(default)]
    pub ipv4_next_hop: Option<String>,
    /// IPv6 next hop
    #[serde(default)]
    pub ipv6_next_hop: Option<String>,
    /// Local preference
    #[serde(default)]
    pub local_preference: Option<u32>,
    /// MED
    #[serde(default)]
    pub multi_exit_discriminator: Option<u32>,
}

impl BgpPrefixIpv4Unicast {
    /// Parsed network address, if it is a valid address
    pub fn address(&self) -> Option<Ipv4Addr> {
        self.ipv4_address.parse().ok()
    }

    /// Parsed IPv4 next hop, if present and valid
    pub fn next_hop(&self) -> Option<Ipv4Addr> {
        self.ipv4_next_hop.as_ref().and_then(|n| n.parse().ok())
    }
}

/// A learned IPv6 unicast prefix
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct BgpPrefixIpv6Unicast {
    /// Network address
    pub ipv6_address: String,
    /// Prefix length
    #[serde(default)]
    pub prefix_length: u32,
    /// Origin attribute
    #[serde(default)]
    pub origin: Option<String>,
    /// IPv4 next hop
    #[serde(default)]
    pub ipv4_next_hop: Option<String>,
    /// IPv6 next hop
    #[serde(default)]
    pub ipv6_next_hop: Option<String>,
    /// Local preference
    #[serde(default)]
    pub local_preference: Option<u32>,
    /// MED
    #[serde(default)]
    pub multi_exit_discriminator: Option<u32>,
}

impl BgpPrefixIpv6Unicast {
    /// Parsed network address, if it is a valid address
    pub fn address(&self) -> Option<Ipv6Addr> {
        self.ipv6_address.parse().ok()
    }

    /// Parsed IPv6 next hop, if present and valid
    pub fn next_hop(&self) -> Option<Ipv6Addr> {
        self.ipv6_next_hop.as_ref().and_then(|n| n.parse().ok())
    }
}

/// Request the capture of a single port
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CaptureRequest {
    /// Name of the port
    pub port_name: String,
}

impl CaptureRequest {
    /// Request the capture of the given port
    pub fn new(port_name: impl Into<String>) -> Self {
        Self { port_name: port_name.into() }
    }
}

/// Counters are 64 bit integers, which the protobuf JSON mapping encodes as strings. Accept both.
fn de_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrString {
        Num(u64),
        Str(String),
    }

    match NumOrString::deserialize(deserializer)? {
        NumOrString::Num(n) => Ok(n),
        NumOrString::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn metrics_request_format() {
        assert_eq!(
            serde_json::to_value(MetricsRequest::bgpv4(Vec::new())).unwrap(),
            json!({"choice": "bgpv4", "bgpv4": {"peer_names": []}})
        );
        assert_eq!(
            serde_json::to_value(MetricsRequest::flow(vec!["ftxV4".to_string()])).unwrap(),
            json!({"choice": "flow", "flow": {"flow_names": ["ftxV4"]}})
        );
        assert_eq!(
            serde_json::to_value(StatesRequest::bgp_prefixes(Vec::new())).unwrap(),
            json!({"choice": "bgp_prefixes", "bgp_prefixes": {"bgp_peer_names": []}})
        );
    }

    #[test]
    fn counters_as_strings_or_numbers() {
        let response: MetricsResponse = serde_json::from_value(json!({
            "choice": "flow_metrics",
            "flow_metrics": [
                {"name": "ftxV4", "transmit": "stopped", "frames_tx": "100", "frames_rx": 100},
                {"name": "frxV4", "transmit": "started", "frames_tx": 42}
            ]
        }))
        .unwrap();
        let flows = response.flow_metrics.unwrap();
        assert_eq!(flows[0].transmit, TransmitState::Stopped);
        assert_eq!(flows[0].frames_tx, 100);
        assert_eq!(flows[0].frames_rx, 100);
        assert_eq!(flows[1].transmit, TransmitState::Started);
        assert_eq!(flows[1].frames_rx, 0);
        assert!(response.bgpv4_metrics.is_none());
    }

    #[test]
    fn unknown_states() {
        let m: Bgpv4Metric =
            serde_json::from_value(json!({"name": "p", "session_state": "idle"})).unwrap();
        assert_eq!(m.session_state, SessionState::Unknown);
        let m: Bgpv4Metric = serde_json::from_value(json!({"name": "p"})).unwrap();
        assert_eq!(m.session_state, SessionState::Unknown);
        let m: Bgpv4Metric = serde_json::from_value(
            json!({"name": "p", "session_state": "down", "routes_advertised": "2"}),
        )
        .unwrap();
        assert_eq!(m.session_state, SessionState::Down);
        assert_eq!(m.routes_advertised, 2);
    }

    #[test]
    fn learned_prefixes() {
        let response: StatesResponse = serde_json::from_value(json!({
            "choice": "bgp_prefixes",
            "bgp_prefixes": [{
                "bgp_peer_name": "dtxBgpv4Peer",
                "ipv4_unicast_prefixes": [{
                    "ipv4_address": "20.20.20.1",
                    "prefix_length": 32,
                    "ipv4_next_hop": "1.1.1.4",
                    "multi_exit_discriminator": 50
                }],
                "ipv6_unicast_prefixes": [{
                    "ipv6_address": "::20:20:20:1",
                    "prefix_length": 128,
                    "ipv6_next_hop": "0::1:1:1:4"
                }]
            }]
        }))
        .unwrap();
        let peers = response.bgp_prefixes.unwrap();
        let v4 = &peers[0].ipv4_unicast_prefixes[0];
        assert_eq!(v4.address(), Some(Ipv4Addr::new(20, 20, 20, 1)));
        assert_eq!(v4.next_hop(), Some(Ipv4Addr::new(1, 1, 1, 4)));
        assert_eq!(v4.multi_exit_discriminator, Some(50));
        let v6 = &peers[0].ipv6_unicast_prefixes[0];
        assert_eq!(v6.address(), "::20:20:20:1".parse().ok());
        assert_eq!(v6.next_hop(), "::1:1:1:4".parse().ok());
        assert_eq!(v6.ipv4_next_hop, None);
    }

    #[test]
    fn empty_next_hop() {
        let p = BgpPrefixIpv4Unicast {
            ipv4_address: "10.10.10.1".to_string(),
            ipv4_next_hop: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(p.next_hop(), None);
    }
}
