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

use ebgp_conformance::table::*;
use ebgp_conformance::verify::TrafficStopped;
use ebgp_conformance::{
    run_ebgp_route_prefix_test, run_link_failover_test, run_port_traffic_test,
};
use ebgp_conformance::{wait_for, TestParameters, WaitOptions};
use otg::{ControlState, LinkUpDown, OtgApi, OtgServer};

use clap::{Parser, Subcommand};
use log::*;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

fn main() -> Result<(), Box<dyn Error>> {
    // run clap
    let args = CommandLineArguments::parse();

    // initialize the env logger
    pretty_env_logger::init();

    let params = load_params(&args)?;

    match args.cmd {
        MainCommand::RoutePrefix { capture_dir } => {
            run_ebgp_route_prefix_test(&params, capture_dir)?
        }
        MainCommand::PortTraffic { capture_dir } => run_port_traffic_test(&params, capture_dir)?,
        MainCommand::LinkFailover { port } => {
            for flow in run_link_failover_test(&params, port)? {
                println!("{}: {:?} ({} frames lost)", flow.name, flow.time, flow.frames_lost);
            }
        }
        MainCommand::Metrics => {
            let server = OtgServer::new(&params.controller_location)?;
            println!("{}", port_metrics_table(&server.get_port_metrics()?));
            println!("{}", flow_metrics_table(&server.get_flow_metrics()?));
            println!("{}", bgpv4_metrics_table(&server.get_bgpv4_metrics()?));
            println!("{}", bgp_prefixes_table(&server.get_bgp_prefixes()?));
        }
        MainCommand::Version => {
            let server = OtgServer::new(&params.controller_location)?;
            let version = server.get_version()?;
            println!(
                "API: {}, SDK: {}, App: {}",
                version.api_spec_version, version.sdk_version, version.app_version
            );
        }
        MainCommand::Config => {
            let server = OtgServer::new(&params.controller_location)?;
            println!("{}", serde_json::to_string_pretty(&server.get_config()?)?);
        }
        MainCommand::Stop => {
            let server = OtgServer::new(&params.controller_location)?;
            info!("Stopping transmit...");
            server.set_control_state(&ControlState::stop_transmit())?;
            let opts = WaitOptions::new("traffic to stop").with_timeout(Duration::from_secs(5));
            wait_for(&mut TrafficStopped::new(&server), &opts)?;
            info!("Stopping protocols...");
            server.set_control_state(&ControlState::stop_protocols())?;
        }
        MainCommand::Routes { withdraw, names } => {
            let server = OtgServer::new(&params.controller_location)?;
            let state = if withdraw {
                ControlState::withdraw_routes(names)
            } else {
                ControlState::advertise_routes(names)
            };
            server.set_control_state(&state)?;
        }
        MainCommand::Link { down, ports } => {
            let server = OtgServer::new(&params.controller_location)?;
            let state = if down { LinkUpDown::Down } else { LinkUpDown::Up };
            server.set_control_state(&ControlState::link(ports, state))?;
        }
        MainCommand::Params => println!("{}", serde_json::to_string_pretty(&params)?),
    }

    Ok(())
}

/// Read the parameter file (if given), and apply the overrides from the command line.
fn load_params(args: &CommandLineArguments) -> Result<TestParameters, Box<dyn Error>> {
    let mut params = match args.params.as_ref() {
        Some(path) => TestParameters::from_file(path)?,
        None => TestParameters::default(),
    };
    if let Some(location) = args.controller.as_ref() {
        params.controller_location = location.clone();
    }
    if let Some(location) = args.tx_port.as_ref() {
        params.tx_port_location = location.clone();
    }
    if let Some(location) = args.rx_port.as_ref() {
        params.rx_port_location = location.clone();
    }
    if let Some(pkt_count) = args.pkt_count {
        params.pkt_count = pkt_count;
    }
    params.validate()?;
    Ok(params)
}

/// This binary runs conformance tests for eBGP route exchange against an Open Traffic Generator.
/// Two emulated devices exchange IPv4 and IPv6 routes over eBGP, and send traffic to the
/// advertised prefixes. The test fails if the controller does not reach the expected state in
/// time.
#[derive(Parser, Debug)]
#[clap(name = "eBGP Conformance", author = "Tibor Schneider")]
struct CommandLineArguments {
    /// JSON file with the test parameters. Missing values take their default.
    #[clap(short = 'p', long, parse(from_os_str))]
    params: Option<PathBuf>,
    /// Location of the controller, e.g., https://localhost:8443
    #[clap(short = 'c', long)]
    controller: Option<String>,
    /// Location of the port of the tx device
    #[clap(long)]
    tx_port: Option<String>,
    /// Location of the port of the rx device
    #[clap(long)]
    rx_port: Option<String>,
    /// Number of packets sent by each flow
    #[clap(short = 'n', long)]
    pkt_count: Option<u32>,
    /// Action to perform
    #[clap(subcommand)]
    cmd: MainCommand,
}

#[derive(Subcommand, Debug)]
enum MainCommand {
    /// Run the eBGP route prefix test
    #[clap(name = "route-prefix")]
    RoutePrefix {
        /// Capture the traffic on both ports, and store it in this directory
        #[clap(long, parse(from_os_str))]
        capture_dir: Option<PathBuf>,
    },
    /// Send traffic between both ports and check the port counters
    #[clap(name = "port-traffic")]
    PortTraffic {
        /// Capture the traffic on both ports, and store it in this directory
        #[clap(long, parse(from_os_str))]
        capture_dir: Option<PathBuf>,
    },
    /// Take down a link while traffic is running, and report the convergence time of each flow
    #[clap(name = "link-failover")]
    LinkFailover {
        /// Port whose link fails (the rx port by default)
        #[clap(long)]
        port: Option<String>,
    },
    /// Print the current metrics and learned prefixes
    #[clap(name = "metrics")]
    Metrics,
    /// Print the version of the controller
    #[clap(name = "version")]
    Version,
    /// Print the configuration currently applied on the controller
    #[clap(name = "config")]
    Config,
    /// Stop the traffic and all protocols
    #[clap(name = "stop")]
    Stop,
    /// Advertise or withdraw route ranges
    #[clap(name = "routes")]
    Routes {
        /// Withdraw the routes instead of advertising them
        #[clap(short = 'w', long)]
        withdraw: bool,
        /// Names of the route ranges (all if empty)
        names: Vec<String>,
    },
    /// Set the link state of ports
    #[clap(name = "link")]
    Link {
        /// Bring the link down instead of up
        #[clap(short = 'd', long)]
        down: bool,
        /// Names of the ports
        ports: Vec<String>,
    },
    /// Print the effective test parameters as JSON
    #[clap(name = "params")]
    Params,
}
