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

//! # Open Traffic Generator API
//!
//! This is a very simple crate to interact with an Open Traffic Generator (OTG) controller, pushing
//! a declarative configuration, changing the control state (protocols, traffic, links, captures)
//! and reading back metrics and states.
//!
//! ```
//! use otg::{Config, ControlState, OtgApi, OtgServer, Port};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // connect to the controller
//!     let server = OtgServer::new("https://localhost:8443")?;
//!     if let Err(e) = server.get_version() {
//!         eprintln!("Cannot connect to the controller: {}", e);
//! # return Ok(());
//!         return Err(e.into());
//!     }
//!
//!     // push a configuration with two ports
//!     let mut config = Config::new();
//!     config.ports.push(Port::new("ptx", "eth1"));
//!     config.ports.push(Port::new("prx", "eth2"));
//!     server.set_config(&config)?;
//!
//!     // start all protocols
//!     server.set_control_state(&ControlState::start_protocols())?;
//!
//!     // read the port metrics
//!     for m in server.get_port_metrics()? {
//!         println!("{}: {} frames sent", m.name, m.frames_tx);
//!     }
//!     Ok(())
//! }
//! ```
#![deny(missing_docs)]

mod config;
mod control;
mod server;
mod types;
pub use config::*;
pub use control::*;
pub use server::OtgServer;
pub use types::*;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use thiserror::Error;

/// # OTG Error type
#[derive(Debug, Error)]
pub enum Error {
    /// Error during handling of the HTTP request
    #[error("HTTP Error: {0}")]
    HttpError(#[from] isahc::Error),
    /// The HTTP request could not be assembled
    #[error("Invalid HTTP Request: {0}")]
    RequestError(#[from] isahc::http::Error),
    /// Cannot deserialize the response
    #[error("Cannot parse JSON response: {0}")]
    JsonError(#[from] serde_json::error::Error),
    /// IO Error
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
    /// Error reported by the controller itself
    #[error("OTG Error {code}: {}", .errors.join("; "))]
    OtgError {
        /// Error code (usually the HTTP status)
        code: i32,
        /// Kind of the error (e.g., `validation` or `internal`)
        kind: Option<String>,
        /// Error messages
        errors: Vec<String>,
    },
    /// HTTP Response Error
    #[error("HTTP Response Error: {0}. Message:\n{1}")]
    ResponseError(u16, String),
    /// The controller answered with a different choice than requested
    #[error("Unexpected response: expected {expected}, but got {got}")]
    UnexpectedResponse {
        /// The choice that was requested
        expected: &'static str,
        /// The choice that was received
        got: String,
    },
}

/// OTG Result type
pub type Result<T> = core::result::Result<T, Error>;

/// # Controller interface
///
/// All operations the conformance tests need from an OTG controller. [`OtgServer`] implements
/// this interface over HTTP. The provided methods wrap [`OtgApi::get_metrics`] and
/// [`OtgApi::get_states`] to fetch a single kind of snapshot.
pub trait OtgApi {
    /// Replace the configuration of the controller
    fn set_config(&self, config: &Config) -> Result<Warnings>;

    /// Change the control state (protocols, traffic, ports)
    fn set_control_state(&self, state: &ControlState) -> Result<Warnings>;

    /// Fetch metrics
    fn get_metrics(&self, request: &MetricsRequest) -> Result<MetricsResponse>;

    /// Fetch protocol states
    fn get_states(&self, request: &StatesRequest) -> Result<StatesResponse>;

    /// Fetch the capture of a port, as raw pcap data.
    fn get_capture(&self, request: &CaptureRequest) -> Result<Vec<u8>>;

    /// Fetch the metrics of all BGPv4 peers
    fn get_bgpv4_metrics(&self) -> Result<Vec<Bgpv4Metric>> {
        let response = self.get_metrics(&MetricsRequest::bgpv4(Vec::new()))?;
        let got = response.choice.clone();
        response.bgpv4_metrics.ok_or(Error::UnexpectedResponse { expected: "bgpv4_metrics", got })
    }

    /// Fetch the metrics of all flows
    fn get_flow_metrics(&self) -> Result<Vec<FlowMetric>> {
        let response = self.get_metrics(&MetricsRequest::flow(Vec::new()))?;
        let got = response.choice.clone();
        response.flow_metrics.ok_or(Error::UnexpectedResponse { expected: "flow_metrics", got })
    }

    /// Fetch the metrics of all ports
    fn get_port_metrics(&self) -> Result<Vec<PortMetric>> {
        let response = self.get_metrics(&MetricsRequest::port(Vec::new()))?;
        let got = response.choice.clone();
        response.port_metrics.ok_or(Error::UnexpectedResponse { expected: "port_metrics", got })
    }

    /// Fetch the learned prefixes of all BGP peers
    fn get_bgp_prefixes(&self) -> Result<Vec<BgpPrefixesState>> {
        let response = self.get_states(&StatesRequest::bgp_prefixes(Vec::new()))?;
        let got = response.choice.clone();
        response.bgp_prefixes.ok_or(Error::UnexpectedResponse { expected: "bgp_prefixes", got })
    }
}

/// Serialize a choice object of the OTG models: `{"choice": key, key: value}`.
pub(crate) fn serialize_choice<S, T>(
    serializer: S,
    key: &'static str,
    value: &T,
) -> core::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize + ?Sized,
{
    let mut map = serializer.serialize_map(Some(2))?;
    map.serialize_entry("choice", key)?;
    map.serialize_entry(key, value)?;
    map.end()
}
