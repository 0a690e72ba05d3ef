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
//! The distance-vector update algorithm: apply one received advertisement to the routing table.
use crate::codec::{Packet, INFINITY};
use crate::config::Config;
use crate::routing_table::{RouteEntry, RoutingTable};

/// Apply `packet` to `table`. Returns `true` if the advertisement requests a triggered update
/// (a route just became unreachable through its current next hop).
///
/// Packets from an origin that isn't a configured neighbor are dropped silently.
pub fn apply(table: &mut RoutingTable, config: &Config, packet: &Packet) -> bool {
    let Some(neighbor) = config.neighbor(packet.origin_id) else {
        log::trace!(
            "dropping advertisement from {}: not a configured neighbor",
            packet.origin_id
        );
        return false;
    };

    let mut triggered = false;

    for (&dest, &advertised_metric) in &packet.entries {
        if table.is_self(dest) {
            continue;
        }

        let offered = (advertised_metric as u16 + neighbor.link_metric as u16).min(INFINITY as u16) as u8;
        let (cur_metric, cur_next_hop) = table
            .get(dest)
            .map(|e| (e.metric, Some(e.next_hop)))
            .unwrap_or((INFINITY, None));

        let should_replace =
            offered < cur_metric || (offered > cur_metric && cur_next_hop == Some(packet.origin_id));

        if should_replace {
            table.upsert(
                dest,
                RouteEntry {
                    metric: offered,
                    next_hop: packet.origin_id,
                    change_flag: true,
                    age: 0,
                },
            );

            if offered < INFINITY {
                if table.is_garbage(dest) {
                    table.resurrect(dest);
                    log::info!("destination {dest} resurrected via neighbor {}", packet.origin_id);
                }
            } else if !table.is_garbage(dest) {
                table.move_to_garbage(dest);
                triggered = true;
                log::info!(
                    "destination {dest} became unreachable via neighbor {}",
                    packet.origin_id
                );
            }
        }
    }

    // Timer refresh: any destination currently routed through this neighbor has its age reset,
    // whether or not this packet's advertisement for it caused a replacement.
    for (_, entry) in table.iter_all_mut() {
        if entry.next_hop == packet.origin_id {
            entry.age = 0;
        }
    }

    triggered
}
