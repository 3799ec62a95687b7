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

//! # Tables
//!
//! Format the snapshots fetched from the controller as fixed-width text tables for the log.

use otg::{Bgpv4Metric, BgpPrefixesState, FlowMetric, PortMetric};

use std::fmt;

/// Width of each column, if not set explicitly
pub const DEFAULT_COL_WIDTH: usize = 15;

/// A fixed-width text table. Each cell is left-aligned and padded to the column width. Longer
/// cells are not truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    title: String,
    headers: Vec<String>,
    col_width: usize,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the default column width.
    pub fn new(title: impl Into<String>, headers: &[&str]) -> Self {
        Self::with_col_width(title, headers, DEFAULT_COL_WIDTH)
    }

    /// Create an empty table with a custom column width.
    pub fn with_col_width(title: impl Into<String>, headers: &[&str], col_width: usize) -> Self {
        Self {
            title: title.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            col_width,
            rows: Vec::new(),
        }
    }

    /// Append a row. Rows with fewer cells than there are headers are padded with `_`.
    pub fn append_row(&mut self, mut row: Vec<String>) {
        while row.len() < self.headers.len() {
            row.push("_".to_string());
        }
        self.rows.push(row);
    }

    /// All rows of the table
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let border = "-".repeat(self.headers.len() * self.col_width);
        let w = self.col_width;
        write!(f, "\n{}\n{}\n{}\n", border, self.title, border)?;
        for h in self.headers.iter() {
            write!(f, "{:<w$}", h, w = w)?;
        }
        writeln!(f)?;
        for row in self.rows.iter() {
            for cell in row.iter() {
                write!(f, "{:<w$}", cell, w = w)?;
            }
            writeln!(f)?;
        }
        write!(f, "{}\n\n", border)
    }
}

/// Table with the session state and route counters of every BGPv4 peer
pub fn bgpv4_metrics_table(metrics: &[Bgpv4Metric]) -> Table {
    let mut tb = Table::new("BGPv4 Metrics", &["Name", "State", "Routes Adv.", "Routes Rec."]);
    for m in metrics.iter() {
        tb.append_row(vec![
            m.name.clone(),
            m.session_state.to_string(),
            m.routes_advertised.to_string(),
            m.routes_received.to_string(),
        ]);
    }
    tb
}

/// Table with all prefixes learned by every BGP peer. Each IPv4 prefix fills the IPv4 address
/// column, and each IPv6 prefix the IPv6 address column.
pub fn bgp_prefixes_table(states: &[BgpPrefixesState]) -> Table {
    let mut tb = Table::with_col_width(
        "BGP Prefixes",
        &[
            "Name",
            "IPv4 Address",
            "IPv4 Next Hop",
            "IPv6 Address",
            "IPv6 Next Hop",
            "MED",
            "Local Preference",
        ],
        20,
    );
    for s in states.iter() {
        for p in s.ipv4_unicast_prefixes.iter() {
            tb.append_row(vec![
                s.bgp_peer_name.clone(),
                format!("{}/{}", p.ipv4_address, p.prefix_length),
                opt_cell(&p.ipv4_next_hop),
                String::new(),
                opt_cell(&p.ipv6_next_hop),
                opt_cell(&p.multi_exit_discriminator),
                opt_cell(&p.local_preference),
            ]);
        }
        for p in s.ipv6_unicast_prefixes.iter() {
            tb.append_row(vec![
                s.bgp_peer_name.clone(),
                String::new(),
                opt_cell(&p.ipv4_next_hop),
                format!("{}/{}", p.ipv6_address, p.prefix_length),
                opt_cell(&p.ipv6_next_hop),
                opt_cell(&p.multi_exit_discriminator),
                opt_cell(&p.local_preference),
            ]);
        }
    }
    tb
}

/// Table with the counters of every flow
pub fn flow_metrics_table(metrics: &[FlowMetric]) -> Table {
    let mut tb = Table::new(
        "Flow Metrics",
        &["Name", "State", "Frames Tx", "Frames Rx", "FPS Tx", "FPS Rx", "Bytes Tx", "Bytes Rx"],
    );
    for m in metrics.iter() {
        tb.append_row(vec![
            m.name.clone(),
            m.transmit.to_string(),
            m.frames_tx.to_string(),
            m.frames_rx.to_string(),
            m.frames_tx_rate.to_string(),
            m.frames_rx_rate.to_string(),
            m.bytes_tx.to_string(),
            m.bytes_rx.to_string(),
        ]);
    }
    tb
}

/// Table with the counters of every port
pub fn port_metrics_table(metrics: &[PortMetric]) -> Table {
    let mut tb = Table::new(
        "Port Metrics",
        &["Name", "Link", "Frames Tx", "Frames Rx", "FPS Tx", "FPS Rx", "Bytes Tx", "Bytes Rx"],
    );
    for m in metrics.iter() {
        tb.append_row(vec![
            m.name.clone(),
            m.link.to_string(),
            m.frames_tx.to_string(),
            m.frames_rx.to_string(),
            m.frames_tx_rate.to_string(),
            m.frames_rx_rate.to_string(),
            m.bytes_tx.to_string(),
            m.bytes_rx.to_string(),
        ]);
    }
    tb
}

fn opt_cell<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pad_short_rows() {
        let mut tb = Table::new("Test", &["a", "b", "c"]);
        tb.append_row(vec!["x".to_string()]);
        assert_eq!(tb.rows()[0], vec!["x", "_", "_"]);
    }

    #[test]
    fn layout() {
        let mut tb = Table::with_col_width("Title", &["Name", "Value"], 6);
        tb.append_row(vec!["a".to_string(), "1".to_string()]);
        let border = "-".repeat(12);
        let expected =
            format!("\n{b}\nTitle\n{b}\nName  Value \na     1     \n{b}\n\n", b = border);
        assert_eq!(tb.to_string(), expected);
    }

    #[test]
    fn long_cells_are_kept() {
        let mut tb = Table::with_col_width("T", &["x"], 2);
        tb.append_row(vec!["abcdef".to_string()]);
        assert!(tb.to_string().contains("\nabcdef\n"));
    }

    #[test]
    fn prefix_rows() {
        let states: Vec<BgpPrefixesState> = serde_json::from_value(serde_json::json!([{
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
                "ipv6_next_hop": "::1:1:1:4"
            }]
        }]))
        .unwrap();
        let tb = bgp_prefixes_table(&states);
        assert_eq!(
            tb.rows()[0],
            vec!["dtxBgpv4Peer", "20.20.20.1/32", "1.1.1.4", "", "", "50", ""]
        );
        assert_eq!(
            tb.rows()[1],
            vec!["dtxBgpv4Peer", "", "", "::20:20:20:1/128", "::1:1:1:4", "", ""]
        );
    }
}
