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

//! # OTG Controller

use crate::types::*;
use crate::{Config, ControlState, Error, OtgApi, Result};

use isahc::config::{Configurable, SslOption};
use isahc::http::{Request, Response};
use isahc::{Body, HttpClient, ReadResponseExt};
use serde::Serialize;

/// # OTG Controller Handle
///
/// All requests are synchronous and blocking. No timeout is configured on the client; callers
/// that need to bound the time spent waiting do so around the calls.
#[derive(Debug, Clone)]
pub struct OtgServer {
    address: String,
    client: HttpClient,
}

impl OtgServer {
    /// Create a new handle to the controller at `location`. If the location has no scheme,
    /// `https://` is assumed. Certificates are not verified, since controllers usually run with
    /// self-signed certificates.
    pub fn new(location: impl AsRef<str>) -> Result<Self> {
        let location = location.as_ref().trim_end_matches('/');
        let address = if location.contains("://") {
            location.to_string()
        } else {
            format!("https://{}", location)
        };
        let client = HttpClient::builder()
            .ssl_options(
                SslOption::DANGER_ACCEPT_INVALID_CERTS | SslOption::DANGER_ACCEPT_INVALID_HOSTS,
            )
            .build()?;
        Ok(Self { address, client })
    }

    /// Get the base address of the controller
    pub fn address(&self) -> &str {
        self.address.as_ref()
    }

    /// Get the version of the controller
    pub fn get_version(&self) -> Result<Version> {
        Ok(serde_json::from_str(&self.request_get("capabilities/version")?)?)
    }

    /// Returns the configuration currently applied on the controller, as raw JSON.
    pub fn get_config(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.request_get("config")?)?)
    }

    fn request_get(&self, key: impl AsRef<str>) -> Result<String> {
        let addr = format!("{}/{}", self.address, key.as_ref());
        let mut response = self.client.get(addr)?;
        self.handle_response(&mut response)
    }

    fn request_post(&self, key: impl AsRef<str>, data: &impl Serialize) -> Result<Response<Body>> {
        let addr = format!("{}/{}", self.address, key.as_ref());
        let request = Request::post(addr)
            .header("Content-Type", "application/json")
            .body(serde_json::to_string(data)?)?;
        Ok(self.client.send(request)?)
    }

    fn post_json(&self, key: impl AsRef<str>, data: &impl Serialize) -> Result<String> {
        let mut response = self.request_post(key, data)?;
        self.handle_response(&mut response)
    }

    fn post_warnings(&self, key: impl AsRef<str>, data: &impl Serialize) -> Result<Warnings> {
        let response = self.post_json(key, data)?;
        if response.trim().is_empty() {
            Ok(Warnings::default())
        } else {
            Ok(serde_json::from_str(&response)?)
        }
    }

    fn handle_response(&self, response: &mut Response<Body>) -> Result<String> {
        let status = response.status();
        let text = response.text()?;
        if status.is_success() {
            Ok(text)
        } else {
            Err(parse_error(status.as_u16(), text))
        }
    }
}

impl OtgApi for OtgServer {
    fn set_config(&self, config: &Config) -> Result<Warnings> {
        self.post_warnings("config", config)
    }

    fn set_control_state(&self, state: &ControlState) -> Result<Warnings> {
        self.post_warnings("control/state", state)
    }

    fn get_metrics(&self, request: &MetricsRequest) -> Result<MetricsResponse> {
        Ok(serde_json::from_str(&self.post_json("monitor/metrics", request)?)?)
    }

    fn get_states(&self, request: &StatesRequest) -> Result<StatesResponse> {
        Ok(serde_json::from_str(&self.post_json("monitor/states", request)?)?)
    }

    fn get_capture(&self, request: &CaptureRequest) -> Result<Vec<u8>> {
        let mut response = self.request_post("monitor/capture", request)?;
        let status = response.status();
        if !status.is_success() {
            return Err(parse_error(status.as_u16(), response.text()?));
        }
        let mut data = Vec::new();
        response.copy_to(&mut data)?;
        Ok(data)
    }
}

/// Interpret the body of a failed request. The controller reports errors as JSON; anything else
/// is returned verbatim.
fn parse_error(status: u16, body: String) -> Error {
    match serde_json::from_str::<OtgErrorBody>(&body) {
        Ok(e) => Error::OtgError { code: e.code, kind: e.kind, errors: e.errors },
        Err(_) => Error::ResponseError(status, body),
    }
}
