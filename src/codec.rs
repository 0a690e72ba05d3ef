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
//! Fixed-layout binary codec for RIPv2-style response packets.
use std::collections::BTreeMap;

use byteorder::{BigEndian, ByteOrder};

/// RIP command byte for a response packet. The only command this daemon speaks.
pub const COMMAND_RESPONSE: u8 = 2;
/// RIP protocol version this daemon implements.
pub const VERSION: u8 = 2;
/// Address family identifier for a route entry (not IPv6, not anything else).
pub const FAMILY_IDENT: u16 = 2;
/// Header size in bytes: command, version, router id.
pub const HEADER_LEN: usize = 4;
/// Size in bytes of one route entry.
pub const RTE_LEN: usize = 20;
/// Infinity metric: a destination advertised at this metric is unreachable.
pub const INFINITY: u8 = 16;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("packet length {0} is not a 4-byte header plus a whole number of 20-byte route entries")]
    BadLength(usize),
    #[error("unexpected command {0}, expected response ({COMMAND_RESPONSE})")]
    BadCommand(u8),
    #[error("unexpected version {0}, expected {VERSION}")]
    BadVersion(u8),
    #[error("unexpected address family identifier {0} for destination, expected {FAMILY_IDENT}")]
    BadFamilyIdent(u16),
    #[error("reserved field in route entry for destination {dest} is non-zero")]
    NonZeroReserved { dest: u16 },
    #[error("metric {metric} for destination {dest} exceeds infinity ({INFINITY})")]
    MetricOutOfRange { dest: u16, metric: u32 },
}

/// A decoded RIP response packet: who sent it, and what it advertises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub origin_id: u16,
    /// Destination router id -> advertised metric. Duplicate destinations within the wire
    /// packet resolve last-wins, so only the final value per destination survives here.
    pub entries: BTreeMap<u16, u8>,
}

/// Decode a wire packet. `buf.len()` must satisfy `(len - HEADER_LEN) % RTE_LEN == 0`.
pub fn decode(buf: &[u8]) -> Result<Packet, Error> {
    if buf.len() < HEADER_LEN || (buf.len() - HEADER_LEN) % RTE_LEN != 0 {
        return Err(Error::BadLength(buf.len()));
    }

    let command = buf[0];
    if command != COMMAND_RESPONSE {
        return Err(Error::BadCommand(command));
    }
    let version = buf[1];
    if version != VERSION {
        return Err(Error::BadVersion(version));
    }
    let origin_id = BigEndian::read_u16(&buf[2..4]);

    let rte_count = (buf.len() - HEADER_LEN) / RTE_LEN;
    let mut entries = BTreeMap::new();
    for i in 0..rte_count {
        let rte = &buf[HEADER_LEN + i * RTE_LEN..HEADER_LEN + (i + 1) * RTE_LEN];

        let family = BigEndian::read_u16(&rte[0..2]);
        if family != FAMILY_IDENT {
            return Err(Error::BadFamilyIdent(family));
        }
        let zero1 = BigEndian::read_u16(&rte[2..4]);
        let dest_addr = BigEndian::read_u32(&rte[4..8]);
        let zero2 = BigEndian::read_u32(&rte[8..12]);
        let zero3 = BigEndian::read_u32(&rte[12..16]);
        let metric = BigEndian::read_u32(&rte[16..20]);

        // only the low 16 bits of dest_addr carry a router identifier
        let dest = (dest_addr & 0xFFFF) as u16;

        if zero1 != 0 || zero2 != 0 || zero3 != 0 {
            return Err(Error::NonZeroReserved { dest });
        }
        if metric > INFINITY as u32 {
            return Err(Error::MetricOutOfRange { dest, metric });
        }

        entries.insert(dest, metric as u8);
    }

    Ok(Packet { origin_id, entries })
}

/// Encode a packet. `entries` may contain any number of route entries; the daemon does not
/// enforce a datagram-size maximum (callers are expected to keep payloads within one datagram).
pub fn encode(origin_id: u16, entries: impl IntoIterator<Item = (u16, u8)>) -> Vec<u8> {
    let entries: Vec<(u16, u8)> = entries.into_iter().collect();
    let mut buf = Vec::with_capacity(HEADER_LEN + RTE_LEN * entries.len());

    buf.push(COMMAND_RESPONSE);
    buf.push(VERSION);
    let mut id_bytes = [0u8; 2];
    BigEndian::write_u16(&mut id_bytes, origin_id);
    buf.extend_from_slice(&id_bytes);

    for (dest, metric) in entries {
        let mut rte = [0u8; RTE_LEN];
        BigEndian::write_u16(&mut rte[0..2], FAMILY_IDENT);
        BigEndian::write_u32(&mut rte[4..8], dest as u32);
        BigEndian::write_u32(&mut rte[16..20], metric as u32);
        buf.extend_from_slice(&rte);
    }

    buf
}
