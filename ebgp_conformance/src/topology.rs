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

//! # Topology
//!
//! Build the configuration that is submitted to the controller. The configuration is built once
//! from the test parameters, as a plain value.

use crate::{DeviceParameters, TestParameters};

use otg::*;

/// Name of the port of the `tx` device
pub const TX_PORT: &str = "ptx";
/// Name of the port of the `rx` device
pub const RX_PORT: &str = "prx";
/// Names of the four flows of the route prefix test
pub const ROUTE_PREFIX_FLOWS: [&str; 4] = ["ftxV4", "ftxV6", "frxV4", "frxV6"];

const MTU: u32 = 1500;
const MED: u32 = 50;
const TX_TCP_PORT: u32 = 5000;
const RX_TCP_PORT: u32 = 6000;

/// # Configuration of the eBGP route prefix test
///
/// - Ports `ptx` and `prx`.
/// - Devices `dtx` and `drx`, each with one ethernet interface on its port, one IPv4 address and a
///   BGP router with a single eBGP peer towards the other device. The peer advertises one IPv4
///   (`/32`) and one IPv6 (`/128`) route range.
/// - Four flows `ftxV4`, `ftxV6`, `frxV4` and `frxV6`, sending TCP packets between the advertised
///   routes in both directions.
///
/// If `capture` is set, both ports capture all traffic as pcap.
pub fn ebgp_route_prefix_config(params: &TestParameters, capture: bool) -> Config {
    let mut config = Config::new();
    config.ports.push(Port::new(TX_PORT, &params.tx_port_location));
    config.ports.push(Port::new(RX_PORT, &params.rx_port_location));

    config.devices.push(device("dtx", TX_PORT, &params.tx, vec![1112, 1113]));
    config.devices.push(device("drx", RX_PORT, &params.rx, vec![4444]));

    let v4 = |d: &str| format!("{}Bgpv4PeerRrV4", d);
    let v6 = |d: &str| format!("{}Bgpv4PeerRrV6", d);
    let tx = &params.tx;
    let rx = &params.rx;
    config.flows = vec![
        route_flow(params, "ftxV4", (v4("dtx"), v4("drx")), tx, ip_v4(tx, rx), TX_TCP_PORT),
        route_flow(params, "ftxV6", (v6("dtx"), v6("drx")), tx, ip_v6(tx, rx), TX_TCP_PORT),
        route_flow(params, "frxV4", (v4("drx"), v4("dtx")), rx, ip_v4(rx, tx), RX_TCP_PORT),
        route_flow(params, "frxV6", (v6("drx"), v6("dtx")), rx, ip_v6(rx, tx), RX_TCP_PORT),
    ];

    if capture {
        config.captures.push(capture_all(&config));
    }
    config
}

/// # Configuration of the port traffic test
///
/// Two ports, and one UDP flow in each direction sending `pkt_count` packets at `pkt_rate`.
/// The source port of each flow increments, and the destination port cycles through a list.
pub fn port_traffic_config(params: &TestParameters, capture: bool) -> Config {
    let mut config = Config::new();
    config.ports.push(Port::new(TX_PORT, &params.tx_port_location));
    config.ports.push(Port::new(RX_PORT, &params.rx_port_location));

    config.flows.push(port_flow(
        params,
        "ftx",
        (TX_PORT, RX_PORT),
        &params.tx,
        &params.rx,
        FlowL4 {
            src_port: Some(Pattern::Increment { start: 5100, step: 2, count: 10 }),
            dst_port: Some(Pattern::Values(vec![6100, 6125, 6150, 6170, 6190])),
        },
    ));
    config.flows.push(port_flow(
        params,
        "frx",
        (RX_PORT, TX_PORT),
        &params.rx,
        &params.tx,
        FlowL4 {
            src_port: Some(Pattern::Increment { start: 5200, step: 4, count: 10 }),
            dst_port: Some(Pattern::Values(vec![6200, 6222, 6244, 6266, 6288])),
        },
    ));

    if capture {
        config.captures.push(capture_all(&config));
    }
    config
}

fn device(name: &str, port: &str, dev: &DeviceParameters, as_path: Vec<u32>) -> Device {
    let ip_name = format!("{}Ip", name);
    let peer_name = format!("{}Bgpv4Peer", name);
    let advanced = BgpRouteAdvanced { multi_exit_discriminator: MED, origin: BgpOrigin::Egp };
    let communities = vec![BgpCommunity {
        community_type: BgpCommunityType::ManualAsNumber,
        as_number: 1,
        as_custom: 2,
    }];
    let as_path = BgpAsPath {
        as_set_mode: BgpAsSetMode::IncludeAsSet,
        segments: vec![BgpAsPathSegment {
            segment_type: BgpAsPathSegmentType::AsSeq,
            as_numbers: as_path,
        }],
    };

    let v4_range = BgpV4RouteRange {
        name: format!("{}RrV4", peer_name),
        addresses: vec![V4RouteAddress {
            address: dev.adv_route_v4,
            prefix: 32,
            count: dev.route_count,
            step: 1,
        }],
        next_hop_mode: NextHopMode::Manual,
        next_hop_address_type: NextHopAddressType::Ipv4,
        next_hop_ipv4_address: dev.next_hop_v4,
        advanced,
        communities: communities.clone(),
        as_path: as_path.clone(),
    };
    let v6_range = BgpV6RouteRange {
        name: format!("{}RrV6", peer_name),
        addresses: vec![V6RouteAddress {
            address: dev.adv_route_v6,
            prefix: 128,
            count: dev.route_count,
            step: 1,
        }],
        next_hop_mode: NextHopMode::Manual,
        next_hop_address_type: NextHopAddressType::Ipv6,
        next_hop_ipv6_address: dev.next_hop_v6,
        advanced,
        communities,
        as_path,
    };

    Device {
        name: name.to_string(),
        ethernets: vec![DeviceEthernet {
            name: format!("{}Eth", name),
            connection: EthernetConnection::PortName(port.to_string()),
            mac: dev.mac.clone(),
            mtu: MTU,
            ipv4_addresses: vec![DeviceIpv4 {
                name: ip_name.clone(),
                address: dev.ip,
                gateway: dev.gateway,
                prefix: dev.prefix,
            }],
        }],
        bgp: Some(BgpRouter {
            router_id: dev.ip,
            ipv4_interfaces: vec![BgpV4Interface {
                ipv4_name: ip_name,
                peers: vec![BgpV4Peer {
                    name: peer_name,
                    peer_address: dev.gateway,
                    as_type: BgpAsType::Ebgp,
                    as_number: dev.as_number,
                    learned_information_filter: LearnedInformationFilter {
                        unicast_ipv4_prefix: true,
                        unicast_ipv6_prefix: true,
                    },
                    v4_routes: vec![v4_range],
                    v6_routes: vec![v6_range],
                }],
            }],
        }),
    }
}

fn ip_v4(src: &DeviceParameters, dst: &DeviceParameters) -> FlowHeader {
    FlowHeader::Ipv4(FlowIp {
        src: Some(Pattern::Value(src.adv_route_v4.to_string())),
        dst: Some(Pattern::Value(dst.adv_route_v4.to_string())),
    })
}

fn ip_v6(src: &DeviceParameters, dst: &DeviceParameters) -> FlowHeader {
    FlowHeader::Ipv6(FlowIp {
        src: Some(Pattern::Value(src.adv_route_v6.to_string())),
        dst: Some(Pattern::Value(dst.adv_route_v6.to_string())),
    })
}

fn route_flow(
    params: &TestParameters,
    name: &str,
    (tx_name, rx_name): (String, String),
    src: &DeviceParameters,
    ip: FlowHeader,
    src_port: u32,
) -> Flow {
    let dst_port = if src_port == TX_TCP_PORT { RX_TCP_PORT } else { TX_TCP_PORT };
    Flow {
        name: name.to_string(),
        tx_rx: FlowTxRx::Device { tx_names: vec![tx_name], rx_names: vec![rx_name] },
        packet: vec![
            FlowHeader::Ethernet(FlowEthernet {
                src: Some(Pattern::Value(src.mac.clone())),
                dst: None,
            }),
            ip,
            FlowHeader::Tcp(FlowL4 {
                src_port: Some(Pattern::Value(src_port)),
                dst_port: Some(Pattern::Value(dst_port)),
            }),
        ],
        size: FlowSize::Fixed(params.pkt_size),
        rate: FlowRate::Pps(params.pkt_rate),
        duration: FlowDuration::FixedPackets { packets: params.pkt_count },
        metrics: FlowMetricsConfig { enable: true },
    }
}

fn port_flow(
    params: &TestParameters,
    name: &str,
    (tx, rx): (&str, &str),
    src: &DeviceParameters,
    dst: &DeviceParameters,
    l4: FlowL4,
) -> Flow {
    Flow {
        name: name.to_string(),
        tx_rx: FlowTxRx::Port { tx_name: tx.to_string(), rx_names: vec![rx.to_string()] },
        packet: vec![
            FlowHeader::Ethernet(FlowEthernet {
                src: Some(Pattern::Value(src.mac.clone())),
                dst: Some(Pattern::Value(dst.mac.clone())),
            }),
            FlowHeader::Ipv4(FlowIp {
                src: Some(Pattern::Value(src.ip.to_string())),
                dst: Some(Pattern::Value(dst.ip.to_string())),
            }),
            FlowHeader::Udp(l4),
        ],
        size: FlowSize::Fixed(params.pkt_size),
        rate: FlowRate::Pps(params.pkt_rate),
        duration: FlowDuration::FixedPackets { packets: params.pkt_count },
        metrics: FlowMetricsConfig { enable: true },
    }
}

fn capture_all(config: &Config) -> Capture {
    Capture {
        name: "capture".to_string(),
        port_names: config.port_names(),
        format: CaptureFormat::Pcap,
        overwrite: true,
    }
}
