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

//! # OTG Configuration
//!
//! The configuration is an immutable value tree, which is serialized and pushed to the controller
//! as a whole. Objects reference each other only by name (e.g., a flow names the route ranges it
//! sends from and to).

use crate::serialize_choice;

use serde::{Serialize, Serializer};
use std::net::{Ipv4Addr, Ipv6Addr};

/// # Configuration
#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct Config {
    /// Test ports
    pub ports: Vec<Port>,
    /// Emulated devices
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<Device>,
    /// Traffic flows
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flows: Vec<Flow>,
    /// Packet captures
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub captures: Vec<Capture>,
}

impl Config {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all ports
    pub fn port_names(&self) -> Vec<String> {
        self.ports.iter().map(|p| p.name.clone()).collect()
    }

    /// Total number of packets sent by all flows with a fixed packet count.
    pub fn total_fixed_packets(&self) -> u64 {
        self.flows
            .iter()
            .filter_map(|f| match f.duration {
                FlowDuration::FixedPackets { packets } => Some(packets as u64),
                FlowDuration::Continuous => None,
            })
            .sum()
    }
}

/// Test port
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Port {
    /// Name of the port
    pub name: String,
    /// Location of the port (e.g., `eth1`, or `localhost:5555`)
    pub location: String,
}

impl Port {
    /// Create a new port
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self { name: name.into(), location: location.into() }
    }
}

/// Packet capture on a set of ports
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Capture {
    /// Name of the capture
    pub name: String,
    /// Ports on which to capture
    pub port_names: Vec<String>,
    /// File format
    pub format: CaptureFormat,
    /// Overwrite the existing capture buffer
    pub overwrite: bool,
}

/// Capture file format
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    /// libpcap format
    Pcap,
    /// pcap next generation
    Pcapng,
}

/// Emulated device
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Device {
    /// Name of the device
    pub name: String,
    /// Ethernet interfaces
    pub ethernets: Vec<DeviceEthernet>,
    /// BGP router of the device
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bgp: Option<BgpRouter>,
}

/// Ethernet interface of a device
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct DeviceEthernet {
    /// Name of the interface
    pub name: String,
    /// Where the interface is connected to
    pub connection: EthernetConnection,
    /// MAC address
    pub mac: String,
    /// Maximum transmission unit
    pub mtu: u32,
    /// IPv4 addresses of the interface
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ipv4_addresses: Vec<DeviceIpv4>,
}

/// Connection of an ethernet interface
#[derive(Debug, Clone, PartialEq)]
pub enum EthernetConnection {
    /// Connected to a test port
    PortName(String),
}

impl Serialize for EthernetConnection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::PortName(name) => serialize_choice(serializer, "port_name", name),
        }
    }
}

/// IPv4 address of an interface
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct DeviceIpv4 {
    /// Name of the address
    pub name: String,
    /// Address
    pub address: Ipv4Addr,
    /// Gateway
    pub gateway: Ipv4Addr,
    /// Prefix length
    pub prefix: u8,
}

/// BGP router of a device
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BgpRouter {
    /// Router ID
    pub router_id: Ipv4Addr,
    /// IPv4 interfaces on which BGP runs
    pub ipv4_interfaces: Vec<BgpV4Interface>,
}

/// BGP on an IPv4 interface
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BgpV4Interface {
    /// Name of the IPv4 address
    pub ipv4_name: String,
    /// Peers reachable over the interface
    pub peers: Vec<BgpV4Peer>,
}

/// BGPv4 peer
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BgpV4Peer {
    /// Name of the peer
    pub name: String,
    /// Address of the remote peer
    pub peer_address: Ipv4Addr,
    /// Type of the session
    pub as_type: BgpAsType,
    /// Local AS number
    pub as_number: u32,
    /// Which learned information is stored by the controller
    pub learned_information_filter: LearnedInformationFilter,
    /// IPv4 route ranges advertised over the session
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub v4_routes: Vec<BgpV4RouteRange>,
    /// IPv6 route ranges advertised over the session
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub v6_routes: Vec<BgpV6RouteRange>,
}

/// Type of the BGP session
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BgpAsType {
    /// Internal BGP
    Ibgp,
    /// External BGP
    Ebgp,
}

/// Learned information filter
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct LearnedInformationFilter {
    /// Store learned IPv4 unicast prefixes
    pub unicast_ipv4_prefix: bool,
    /// Store learned IPv6 unicast prefixes
    pub unicast_ipv6_prefix: bool,
}

/// Next hop mode of a route range
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NextHopMode {
    /// Use the address of the local interface
    LocalIp,
    /// Use the configured address
    Manual,
}

/// Next hop address type of a route range
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NextHopAddressType {
    /// IPv4 next hop
    Ipv4,
    /// IPv6 next hop
    Ipv6,
}

/// IPv4 route range
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BgpV4RouteRange {
    /// Name of the route range
    pub name: String,
    /// Advertised addresses
    pub addresses: Vec<V4RouteAddress>,
    /// Next hop mode
    pub next_hop_mode: NextHopMode,
    /// Next hop address type
    pub next_hop_address_type: NextHopAddressType,
    /// Next hop, used in [`NextHopMode::Manual`]
    pub next_hop_ipv4_address: Ipv4Addr,
    /// Additional attributes
    pub advanced: BgpRouteAdvanced,
    /// Communities
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub communities: Vec<BgpCommunity>,
    /// AS path
    pub as_path: BgpAsPath,
}

/// IPv6 route range
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BgpV6RouteRange {
    /// Name of the route range
    pub name: String,
    /// Advertised addresses
    pub addresses: Vec<V6RouteAddress>,
    /// Next hop mode
    pub next_hop_mode: NextHopMode,
    /// Next hop address type
    pub next_hop_address_type: NextHopAddressType,
    /// Next hop, used in [`NextHopMode::Manual`]
    pub next_hop_ipv6_address: Ipv6Addr,
    /// Additional attributes
    pub advanced: BgpRouteAdvanced,
    /// Communities
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub communities: Vec<BgpCommunity>,
    /// AS path
    pub as_path: BgpAsPath,
}

/// A range of IPv4 networks: `count` networks starting at `address`, incremented by `step`.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct V4RouteAddress {
    /// First network address
    pub address: Ipv4Addr,
    /// Prefix length
    pub prefix: u8,
    /// Number of networks
    pub count: u32,
    /// Increment between the networks
    pub step: u32,
}

/// A range of IPv6 networks: `count` networks starting at `address`, incremented by `step`.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct V6RouteAddress {
    /// First network address
    pub address: Ipv6Addr,
    /// Prefix length
    pub prefix: u8,
    /// Number of networks
    pub count: u32,
    /// Increment between the networks
    pub step: u32,
}

/// Advanced route attributes
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct BgpRouteAdvanced {
    /// MED
    pub multi_exit_discriminator: u32,
    /// ORIGIN
    pub origin: BgpOrigin,
}

/// ORIGIN attribute
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BgpOrigin {
    /// Learned from an IGP
    Igp,
    /// Learned from EGP
    Egp,
    /// Unknown origin
    Incomplete,
}

/// BGP community
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct BgpCommunity {
    /// Type of the community
    #[serde(rename = "type")]
    pub community_type: BgpCommunityType,
    /// First two octets (used with [`BgpCommunityType::ManualAsNumber`])
    pub as_number: u32,
    /// Last two octets (used with [`BgpCommunityType::ManualAsNumber`])
    pub as_custom: u32,
}

/// Type of a BGP community
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BgpCommunityType {
    /// `as_number:as_custom`
    ManualAsNumber,
    /// NO_EXPORT
    NoExport,
    /// NO_ADVERTISE
    NoAdvertised,
    /// NO_EXPORT_SUBCONFED
    NoExportSubconfed,
    /// LLGR_STALE
    LlgrStale,
    /// NO_LLGR
    NoLlgr,
}

/// AS path of a route range
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct BgpAsPath {
    /// How the local AS is added to the path
    pub as_set_mode: BgpAsSetMode,
    /// Path segments
    pub segments: Vec<BgpAsPathSegment>,
}

/// Mode to add the local AS
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BgpAsSetMode {
    /// Do not include the local AS
    DoNotIncludeLocalAs,
    /// Include the local AS as AS_SEQ
    IncludeAsSeq,
    /// Include the local AS as AS_SET
    IncludeAsSet,
    /// Include the local AS as AS_CONFED_SEQ
    IncludeAsConfedSeq,
    /// Include the local AS as AS_CONFED_SET
    IncludeAsConfedSet,
    /// Prepend the local AS to the first segment
    PrependToFirstSegment,
}

/// Segment of an AS path
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct BgpAsPathSegment {
    /// Type of the segment
    #[serde(rename = "type")]
    pub segment_type: BgpAsPathSegmentType,
    /// AS numbers of the segment
    pub as_numbers: Vec<u32>,
}

/// Type of an AS path segment
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BgpAsPathSegmentType {
    /// Ordered sequence
    AsSeq,
    /// Unordered set
    AsSet,
    /// Ordered confederation sequence
    AsConfedSeq,
    /// Unordered confederation set
    AsConfedSet,
}

/// # Traffic Flow
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Flow {
    /// Name of the flow
    pub name: String,
    /// Transmit and receive endpoints
    pub tx_rx: FlowTxRx,
    /// Packet headers, outermost first
    pub packet: Vec<FlowHeader>,
    /// Frame size
    pub size: FlowSize,
    /// Transmit rate
    pub rate: FlowRate,
    /// Transmit duration
    pub duration: FlowDuration,
    /// Flow metrics
    pub metrics: FlowMetricsConfig,
}

/// Endpoints of a flow
#[derive(Debug, Clone, PartialEq)]
pub enum FlowTxRx {
    /// Port to port
    Port {
        /// Transmitting port
        tx_name: String,
        /// Receiving ports
        rx_names: Vec<String>,
    },
    /// Device to device, referring to interfaces or route ranges by name
    Device {
        /// Transmitting objects
        tx_names: Vec<String>,
        /// Receiving objects
        rx_names: Vec<String>,
    },
}

#[derive(Serialize)]
struct PortTxRx<'a> {
    tx_name: &'a str,
    rx_names: &'a [String],
}

#[derive(Serialize)]
struct DeviceTxRx<'a> {
    tx_names: &'a [String],
    rx_names: &'a [String],
}

impl Serialize for FlowTxRx {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Port { tx_name, rx_names } => {
                serialize_choice(serializer, "port", &PortTxRx { tx_name, rx_names })
            }
            Self::Device { tx_names, rx_names } => {
                serialize_choice(serializer, "device", &DeviceTxRx { tx_names, rx_names })
            }
        }
    }
}

/// A packet header of a flow
#[derive(Debug, Clone, PartialEq)]
pub enum FlowHeader {
    /// Ethernet header
    Ethernet(FlowEthernet),
    /// IPv4 header
    Ipv4(FlowIp),
    /// IPv6 header
    Ipv6(FlowIp),
    /// TCP header
    Tcp(FlowL4),
    /// UDP header
    Udp(FlowL4),
}

impl Serialize for FlowHeader {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Ethernet(h) => serialize_choice(serializer, "ethernet", h),
            Self::Ipv4(h) => serialize_choice(serializer, "ipv4", h),
            Self::Ipv6(h) => serialize_choice(serializer, "ipv6", h),
            Self::Tcp(h) => serialize_choice(serializer, "tcp", &L4Ports::from(h)),
            Self::Udp(h) => serialize_choice(serializer, "udp", &L4Ports::from(h)),
        }
    }
}

/// Ethernet header fields
#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct FlowEthernet {
    /// Source MAC
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<Pattern<String>>,
    /// Destination MAC
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst: Option<Pattern<String>>,
}

/// IP header fields (shared by IPv4 and IPv6)
#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct FlowIp {
    /// Source address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<Pattern<String>>,
    /// Destination address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst: Option<Pattern<String>>,
}

/// Transport header fields (shared by TCP and UDP)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlowL4 {
    /// Source port
    pub src_port: Option<Pattern<u32>>,
    /// Destination port
    pub dst_port: Option<Pattern<u32>>,
}

#[derive(Serialize)]
struct L4Ports<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    src_port: Option<&'a Pattern<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dst_port: Option<&'a Pattern<u32>>,
}

impl<'a> From<&'a FlowL4> for L4Ports<'a> {
    fn from(h: &'a FlowL4) -> Self {
        Self { src_port: h.src_port.as_ref(), dst_port: h.dst_port.as_ref() }
    }
}

/// Value pattern of a header field
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern<T> {
    /// Fixed value
    Value(T),
    /// List of values, used round robin
    Values(Vec<T>),
    /// Incrementing values
    Increment {
        /// First value
        start: T,
        /// Increment
        step: T,
        /// Number of values
        count: u32,
    },
}

#[derive(Serialize)]
struct Increment<'a, T> {
    start: &'a T,
    step: &'a T,
    count: u32,
}

impl<T: Serialize> Serialize for Pattern<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => serialize_choice(serializer, "value", v),
            Self::Values(v) => serialize_choice(serializer, "values", v),
            Self::Increment { start, step, count } => serialize_choice(
                serializer,
                "increment",
                &Increment { start, step, count: *count },
            ),
        }
    }
}

/// Frame size of a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowSize {
    /// Fixed size in bytes
    Fixed(u32),
}

impl Serialize for FlowSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Fixed(size) => serialize_choice(serializer, "fixed", size),
        }
    }
}

/// Transmit rate of a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowRate {
    /// Packets per second
    Pps(u64),
}

impl Serialize for FlowRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Pps(pps) => serialize_choice(serializer, "pps", pps),
        }
    }
}

/// Transmit duration of a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDuration {
    /// Send a fixed number of packets, then stop
    FixedPackets {
        /// Number of packets
        packets: u32,
    },
    /// Send until stopped
    Continuous,
}

#[derive(Serialize)]
struct FixedPackets {
    packets: u32,
}

#[derive(Serialize)]
struct Empty {}

impl Serialize for FlowDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::FixedPackets { packets } => {
                serialize_choice(serializer, "fixed_packets", &FixedPackets { packets: *packets })
            }
            Self::Continuous => serialize_choice(serializer, "continuous", &Empty {}),
        }
    }
}

/// Metrics configuration of a flow
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlowMetricsConfig {
    /// Enable flow metrics
    pub enable: bool,
}
