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

//! # OTG Control State
//!
//! Control commands are fire-and-forget: the controller acknowledges them immediately, and the
//! effect can only be observed by polling metrics or states.

use crate::serialize_choice;

use serde::{Serialize, Serializer};

/// # Control State
#[derive(Debug, Clone, PartialEq)]
pub enum ControlState {
    /// Change the state of protocols
    Protocol(ProtocolState),
    /// Change the state of traffic
    Traffic(TrafficState),
    /// Change the state of ports
    Port(PortState),
}

/// Protocol control
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolState {
    /// Start or stop all protocols
    All(StartStop),
    /// Withdraw or advertise route ranges
    Route {
        /// Names of the route ranges (all if empty)
        names: Vec<String>,
        /// New state of the routes
        state: RouteState,
    },
}

/// Traffic control
#[derive(Debug, Clone, PartialEq)]
pub enum TrafficState {
    /// Change the transmit state of flows
    FlowTransmit {
        /// Names of the flows (all if empty)
        flow_names: Vec<String>,
        /// New transmit state
        state: FlowTransmitState,
    },
}

/// Port control
#[derive(Debug, Clone, PartialEq)]
pub enum PortState {
    /// Bring links up or down
    Link {
        /// Names of the ports (all if empty)
        port_names: Vec<String>,
        /// New link state
        state: LinkUpDown,
    },
    /// Start or stop the capture
    Capture {
        /// Names of the ports (all if empty)
        port_names: Vec<String>,
        /// New capture state
        state: StartStop,
    },
}

/// Start or stop
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StartStop {
    /// Start
    Start,
    /// Stop
    Stop,
}

/// State of a route range
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RouteState {
    /// Withdraw the routes
    Withdraw,
    /// Advertise the routes
    Advertise,
}

/// Transmit state of a flow
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlowTransmitState {
    /// Start transmitting
    Start,
    /// Stop transmitting
    Stop,
    /// Pause transmitting
    Pause,
    /// Resume a paused transmission
    Resume,
}

/// State of a link
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LinkUpDown {
    /// Bring the link up
    Up,
    /// Bring the link down
    Down,
}

impl ControlState {
    /// Start all protocols
    pub fn start_protocols() -> Self {
        Self::Protocol(ProtocolState::All(StartStop::Start))
    }

    /// Stop all protocols
    pub fn stop_protocols() -> Self {
        Self::Protocol(ProtocolState::All(StartStop::Stop))
    }

    /// Start transmitting on all flows
    pub fn start_transmit() -> Self {
        Self::flow_transmit(Vec::new(), FlowTransmitState::Start)
    }

    /// Stop transmitting on all flows
    pub fn stop_transmit() -> Self {
        Self::flow_transmit(Vec::new(), FlowTransmitState::Stop)
    }

    /// Change the transmit state of the given flows
    pub fn flow_transmit(flow_names: Vec<String>, state: FlowTransmitState) -> Self {
        Self::Traffic(TrafficState::FlowTransmit { flow_names, state })
    }

    /// Withdraw the given route ranges
    pub fn withdraw_routes(names: Vec<String>) -> Self {
        Self::Protocol(ProtocolState::Route { names, state: RouteState::Withdraw })
    }

    /// Advertise the given route ranges
    pub fn advertise_routes(names: Vec<String>) -> Self {
        Self::Protocol(ProtocolState::Route { names, state: RouteState::Advertise })
    }

    /// Bring the links of the given ports up or down
    pub fn link(port_names: Vec<String>, state: LinkUpDown) -> Self {
        Self::Port(PortState::Link { port_names, state })
    }

    /// Start capturing on the given ports
    pub fn start_capture(port_names: Vec<String>) -> Self {
        Self::Port(PortState::Capture { port_names, state: StartStop::Start })
    }

    /// Stop capturing on the given ports
    pub fn stop_capture(port_names: Vec<String>) -> Self {
        Self::Port(PortState::Capture { port_names, state: StartStop::Stop })
    }
}

#[derive(Serialize)]
struct StateOnly<T: Serialize> {
    state: T,
}

#[derive(Serialize)]
struct NamedState<'a, T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    names: Option<&'a Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flow_names: Option<&'a Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port_names: Option<&'a Vec<String>>,
    state: T,
}

impl<'a, T: Serialize> NamedState<'a, T> {
    fn new(state: T) -> Self {
        Self { names: None, flow_names: None, port_names: None, state }
    }
}

impl Serialize for ControlState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Protocol(p) => serialize_choice(serializer, "protocol", p),
            Self::Traffic(t) => serialize_choice(serializer, "traffic", t),
            Self::Port(p) => serialize_choice(serializer, "port", p),
        }
    }
}

impl Serialize for ProtocolState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All(state) => serialize_choice(serializer, "all", &StateOnly { state }),
            Self::Route { names, state } => serialize_choice(
                serializer,
                "route",
                &NamedState { names: Some(names), ..NamedState::new(state) },
            ),
        }
    }
}

impl Serialize for TrafficState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::FlowTransmit { flow_names, state } => serialize_choice(
                serializer,
                "flow_transmit",
                &NamedState { flow_names: Some(flow_names), ..NamedState::new(state) },
            ),
        }
    }
}

impl Serialize for PortState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Link { port_names, state } => serialize_choice(
                serializer,
                "link",
                &NamedState { port_names: Some(port_names), ..NamedState::new(state) },
            ),
            Self::Capture { port_names, state } => serialize_choice(
                serializer,
                "capture",
                &NamedState { port_names: Some(port_names), ..NamedState::new(state) },
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn start_protocols() {
        assert_eq!(
            serde_json::to_value(ControlState::start_protocols()).unwrap(),
            json!({
                "choice": "protocol",
                "protocol": {"choice": "all", "all": {"state": "start"}}
            })
        );
    }

    #[test]
    fn start_transmit() {
        assert_eq!(
            serde_json::to_value(ControlState::start_transmit()).unwrap(),
            json!({
                "choice": "traffic",
                "traffic": {
                    "choice": "flow_transmit",
                    "flow_transmit": {"flow_names": [], "state": "start"}
                }
            })
        );
    }

    #[test]
    fn withdraw_and_link() {
        assert_eq!(
            serde_json::to_value(ControlState::withdraw_routes(vec!["drxRrV4".to_string()]))
                .unwrap(),
            json!({
                "choice": "protocol",
                "protocol": {
                    "choice": "route",
                    "route": {"names": ["drxRrV4"], "state": "withdraw"}
                }
            })
        );
        assert_eq!(
            serde_json::to_value(ControlState::link(vec!["p2".to_string()], LinkUpDown::Down))
                .unwrap(),
            json!({
                "choice": "port",
                "port": {"choice": "link", "link": {"port_names": ["p2"], "state": "down"}}
            })
        );
        assert_eq!(
            serde_json::to_value(ControlState::stop_capture(Vec::new())).unwrap(),
            json!({
                "choice": "port",
                "port": {"choice": "capture", "capture": {"port_names": [], "state": "stop"}}
            })
        );
    }
}
