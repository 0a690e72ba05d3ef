// ripd: a simplified RIPv2 routing daemon
// Copyright (C) 2024-2025 Roland Schmid <roschmi@ethz.ch> and Tibor Schneider <sctibor@ethz.ch>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//! Parses and validates the router configuration file.
//!
//! ```text
//! router-id <id>
//! input-ports <p1>, <p2>, ...
//! outputs <port>-<metric>-<neighbor_id>, ...
//! timers <scheduled>, <timeout>, <garbage>
//! ```
use std::collections::BTreeMap;
use std::path::Path;

const ROUTER_ID_RANGE: std::ops::RangeInclusive<u32> = 1..=64000;
const PORT_RANGE: std::ops::RangeInclusive<u32> = 1024..=64000;
const LINK_METRIC_RANGE: std::ops::RangeInclusive<i64> = 0..=15;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected directive {expected:?}")]
    MissingDirective { line: usize, expected: &'static str },
    #[error("line {line}: could not parse integer {value:?}")]
    ParseInt { line: usize, value: String },
    #[error("router id {0} is out of range [1, 64000]")]
    RouterIdOutOfRange(u32),
    #[error("port {0} is out of range [1024, 64000]")]
    PortOutOfRange(u32),
    #[error("neighbor id {0} is out of range [1, 64000]")]
    NeighborIdOutOfRange(u32),
    #[error("link metric {0} is out of range [0, 15]")]
    LinkMetricOutOfRange(i64),
    #[error("malformed outputs entry {0:?}, expected <port>-<metric>-<neighbor_id>")]
    MalformedOutput(String),
    #[error("timers line must list exactly 3 values, got {0}")]
    WrongTimerCount(usize),
    #[error(
        "timeout period must be 6x the scheduled period (scheduled={scheduled}, timeout={timeout})"
    )]
    BadTimeoutRatio { scheduled: u32, timeout: u32 },
    #[error(
        "garbage period must be 4x the scheduled period (scheduled={scheduled}, garbage={garbage})"
    )]
    BadGarbageRatio { scheduled: u32, garbage: u32 },
}

/// A directly reachable neighbor. Immutable after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborConfig {
    pub neighbor_id: u16,
    pub outbound_port: u16,
    pub link_metric: u8,
}

/// Parsed, validated daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub router_id: u16,
    pub input_ports: Vec<u16>,
    pub neighbors: BTreeMap<u16, NeighborConfig>,
    pub scheduled_period: u32,
    pub timeout_period: u32,
    pub garbage_period: u32,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, Error> {
        let lines: Vec<&str> = text.lines().collect();

        let router_id = parse_directive_line(&lines, 0, "router-id")?;
        let router_id = parse_single_u32(&router_id[1], 0)?;
        if !ROUTER_ID_RANGE.contains(&router_id) {
            return Err(Error::RouterIdOutOfRange(router_id));
        }

        let input_ports_line = parse_directive_line(&lines, 1, "input-ports")?;
        let mut input_ports = Vec::with_capacity(input_ports_line.len() - 1);
        for tok in &input_ports_line[1..] {
            let port = parse_u32(tok, 1)?;
            if !PORT_RANGE.contains(&port) {
                return Err(Error::PortOutOfRange(port));
            }
            input_ports.push(port as u16);
        }

        let outputs_line = parse_directive_line(&lines, 2, "outputs")?;
        let mut neighbors = BTreeMap::new();
        for tok in &outputs_line[1..] {
            let parts: Vec<&str> = tok.split('-').collect();
            if parts.len() != 3 {
                return Err(Error::MalformedOutput(tok.to_string()));
            }
            let outbound_port = parse_u32(parts[0], 2)?;
            if !PORT_RANGE.contains(&outbound_port) {
                return Err(Error::PortOutOfRange(outbound_port));
            }
            let link_metric: i64 = parts[1]
                .parse()
                .map_err(|_| Error::ParseInt { line: 2, value: parts[1].to_string() })?;
            if !LINK_METRIC_RANGE.contains(&link_metric) {
                return Err(Error::LinkMetricOutOfRange(link_metric));
            }
            let neighbor_id = parse_u32(parts[2], 2)?;
            if !ROUTER_ID_RANGE.contains(&neighbor_id) {
                return Err(Error::NeighborIdOutOfRange(neighbor_id));
            }
            neighbors.insert(
                neighbor_id as u16,
                NeighborConfig {
                    neighbor_id: neighbor_id as u16,
                    outbound_port: outbound_port as u16,
                    link_metric: link_metric as u8,
                },
            );
        }

        let timers_line = parse_directive_line(&lines, 3, "timers")?;
        let timer_values: Vec<u32> = timers_line[1..]
            .iter()
            .map(|tok| parse_u32(tok, 3))
            .collect::<Result<_, _>>()?;
        if timer_values.len() != 3 {
            return Err(Error::WrongTimerCount(timer_values.len()));
        }
        let (scheduled_period, timeout_period, garbage_period) =
            (timer_values[0], timer_values[1], timer_values[2]);
        if timeout_period != scheduled_period * 6 {
            return Err(Error::BadTimeoutRatio {
                scheduled: scheduled_period,
                timeout: timeout_period,
            });
        }
        if garbage_period != scheduled_period * 4 {
            return Err(Error::BadGarbageRatio {
                scheduled: scheduled_period,
                garbage: garbage_period,
            });
        }

        Ok(Config {
            router_id: router_id as u16,
            input_ports,
            neighbors,
            scheduled_period,
            timeout_period,
            garbage_period,
        })
    }

    pub fn neighbor(&self, id: u16) -> Option<&NeighborConfig> {
        self.neighbors.get(&id)
    }
}

/// Split a directive line into whitespace-separated tokens, stripping commas, and check that
/// its keyword matches `expected`.
fn parse_directive_line<'a>(
    lines: &[&'a str],
    index: usize,
    expected: &'static str,
) -> Result<Vec<&'a str>, Error> {
    let line = lines
        .get(index)
        .ok_or(Error::MissingDirective { line: index, expected })?;
    let tokens: Vec<&str> = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|tok| !tok.is_empty())
        .collect();
    if tokens.first() != Some(&expected) {
        return Err(Error::MissingDirective { line: index, expected });
    }
    Ok(tokens)
}

fn parse_u32(tok: &str, line: usize) -> Result<u32, Error> {
    tok.parse()
        .map_err(|_| Error::ParseInt { line, value: tok.to_string() })
}

fn parse_single_u32(tok: &str, line: usize) -> Result<u32, Error> {
    parse_u32(tok, line)
}
