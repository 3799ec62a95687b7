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

//! # Test Parameters
//!
//! All values that describe a test run. The parameters are read once at the start and never
//! change while the test is running.

use crate::Error;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;

/// # Parameters of the eBGP route prefix test
///
/// Two emulated devices (`tx` and `rx`) are connected to two test ports. Each device runs an eBGP
/// session towards the other one, and advertises one IPv4 and one IPv6 route range. Then, four
/// flows are sent between the advertised prefixes (IPv4 and IPv6, in both directions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestParameters {
    /// Location of the OTG controller, e.g., `https://172.18.0.63:8443`.
    pub controller_location: String,
    /// Location of the port to which the `tx` device is connected
    pub tx_port_location: String,
    /// Location of the port to which the `rx` device is connected
    pub rx_port_location: String,
    /// Transmit rate of each flow, in packets per second
    pub pkt_rate: u64,
    /// Number of packets sent by each flow
    pub pkt_count: u32,
    /// Size of each packet, in bytes
    pub pkt_size: u32,
    /// Parameters of the `tx` device
    pub tx: DeviceParameters,
    /// Parameters of the `rx` device
    pub rx: DeviceParameters,
}

/// Parameters of a single emulated device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceParameters {
    /// MAC address of the ethernet interface
    pub mac: String,
    /// IPv4 address of the interface, also used as the BGP router ID
    pub ip: Ipv4Addr,
    /// Gateway, which is also the address of the BGP neighbor
    pub gateway: Ipv4Addr,
    /// Prefix length of the interface address
    pub prefix: u8,
    /// Local AS number
    pub as_number: u32,
    /// Number of routes in each advertised route range
    pub route_count: u32,
    /// Next hop of the advertised IPv4 routes
    pub next_hop_v4: Ipv4Addr,
    /// Next hop of the advertised IPv6 routes
    pub next_hop_v6: Ipv6Addr,
    /// First advertised IPv4 route
    pub adv_route_v4: Ipv4Addr,
    /// First advertised IPv6 route
    pub adv_route_v6: Ipv6Addr,
}

impl Default for TestParameters {
    fn default() -> Self {
        Self {
            controller_location: "https://localhost:8443".to_string(),
            tx_port_location: "eth1".to_string(),
            rx_port_location: "eth2".to_string(),
            pkt_rate: 50,
            pkt_count: 100,
            pkt_size: 128,
            tx: DeviceParameters {
                mac: "00:00:01:01:01:01".to_string(),
                ip: Ipv4Addr::new(1, 1, 1, 1),
                gateway: Ipv4Addr::new(1, 1, 1, 2),
                prefix: 24,
                as_number: 1111,
                route_count: 1,
                next_hop_v4: Ipv4Addr::new(1, 1, 1, 3),
                next_hop_v6: Ipv6Addr::new(0, 0, 0, 0, 1, 1, 1, 3),
                adv_route_v4: Ipv4Addr::new(10, 10, 10, 1),
                adv_route_v6: Ipv6Addr::new(0, 0, 0, 0, 0x10, 0x10, 0x10, 1),
            },
            rx: DeviceParameters {
                mac: "00:00:01:01:01:02".to_string(),
                ip: Ipv4Addr::new(1, 1, 1, 2),
                gateway: Ipv4Addr::new(1, 1, 1, 1),
                prefix: 24,
                as_number: 1112,
                route_count: 1,
                next_hop_v4: Ipv4Addr::new(1, 1, 1, 4),
                next_hop_v6: Ipv6Addr::new(0, 0, 0, 0, 1, 1, 1, 4),
                adv_route_v4: Ipv4Addr::new(20, 20, 20, 1),
                adv_route_v6: Ipv6Addr::new(0, 0, 0, 0, 0x20, 0x20, 0x20, 1),
            },
        }
    }
}

impl TestParameters {
    /// Read the parameters from a JSON file. See [`TestParameters::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Parse and validate the parameters from a JSON document. Missing fields take their default
    /// value. This also holds inside the `tx` and `rx` objects, so `{"rx": {"as_number": 65000}}`
    /// only changes the AS number of the default `rx` device.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let mut value = serde_json::to_value(Self::default())?;
        merge_json(&mut value, serde_json::from_str(json)?);
        let params: Self = serde_json::from_value(value)?;
        params.validate()?;
        Ok(params)
    }

    /// Check that the parameters describe a valid test.
    pub fn validate(&self) -> Result<(), Error> {
        let mac_re = Regex::new(r"^([0-9a-fA-F]{2}:){5}[0-9a-fA-F]{2}$").unwrap();
        for (side, dev) in [("tx", &self.tx), ("rx", &self.rx)].iter() {
            if !mac_re.is_match(&dev.mac) {
                return Err(Error::InvalidParameter(format!(
                    "{}.mac is not a MAC address: {}",
                    side, dev.mac
                )));
            }
            if dev.prefix > 32 {
                return Err(Error::InvalidParameter(format!(
                    "{}.prefix must be at most 32, but is {}",
                    side, dev.prefix
                )));
            }
            if dev.route_count == 0 {
                return Err(Error::InvalidParameter(format!("{}.route_count must not be 0", side)));
            }
        }
        if self.pkt_rate == 0 {
            return Err(Error::InvalidParameter("pkt_rate must not be 0".to_string()));
        }
        if self.pkt_count == 0 {
            return Err(Error::InvalidParameter("pkt_count must not be 0".to_string()));
        }
        Ok(())
    }

    /// The advertised IPv4 routes, with their next hop, of both devices (`tx` first).
    pub fn expected_v4_routes(&self) -> [(Ipv4Addr, Ipv4Addr); 2] {
        [(self.tx.adv_route_v4, self.tx.next_hop_v4), (self.rx.adv_route_v4, self.rx.next_hop_v4)]
    }

    /// The advertised IPv6 routes, with their next hop, of both devices (`tx` first).
    pub fn expected_v6_routes(&self) -> [(Ipv6Addr, Ipv6Addr); 2] {
        [(self.tx.adv_route_v6, self.tx.next_hop_v6), (self.rx.adv_route_v6, self.rx.next_hop_v6)]
    }
}

/// Overwrite `base` with every value present in `overlay`, descending into nested objects.
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(b) => merge_json(b, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
