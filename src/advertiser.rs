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
//! Builds and transmits scheduled and triggered updates, and throttles back-to-back triggered
//! updates via a randomized block window.
use rand::Rng;

use crate::codec::{self, INFINITY};
use crate::config::Config;
use crate::routing_table::RoutingTable;
use crate::transport::Transport;

/// The triggered-update suppression state machine (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionState {
    Idle,
    Blocked { remaining: u32, queued: bool },
}

/// What happened when the block timer ticked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTick {
    /// Nothing expired this tick.
    Nothing,
    /// The block expired with nothing queued; suppression returns to idle.
    BecameIdle,
    /// The block expired with an update queued: a triggered update must be flushed now. The
    /// state has already transitioned to a fresh `Blocked` window.
    Flush,
}

impl Default for SuppressionState {
    fn default() -> Self {
        Self::Idle
    }
}

impl SuppressionState {
    /// A triggered update was requested. Returns `true` if it should be emitted immediately
    /// (suppression was idle), or `false` if it has been queued behind an active block.
    pub fn request(&mut self, rng: &mut impl Rng) -> bool {
        match self {
            Self::Idle => {
                *self = Self::Blocked { remaining: draw_block_window(rng), queued: false };
                true
            }
            Self::Blocked { queued, .. } => {
                *queued = true;
                false
            }
        }
    }

    /// Advance the block countdown by one second.
    pub fn tick(&mut self, rng: &mut impl Rng) -> BlockTick {
        let Self::Blocked { remaining, queued } = self else {
            return BlockTick::Nothing;
        };
        if *remaining > 0 {
            *remaining -= 1;
        }
        if *remaining > 0 {
            return BlockTick::Nothing;
        }
        if *queued {
            *self = Self::Blocked { remaining: draw_block_window(rng), queued: false };
            BlockTick::Flush
        } else {
            *self = Self::Idle;
            BlockTick::BecameIdle
        }
    }
}

fn draw_block_window(rng: &mut impl Rng) -> u32 {
    rng.gen_range(1.0..=5.0).round().max(1.0) as u32
}

/// Apply split-horizon-with-poisoned-reverse for a packet sent to `neighbor_id`: any entry whose
/// next hop is that neighbor is advertised as unreachable instead of its real metric.
fn poisoned_metric(entry_next_hop: u16, entry_metric: u8, neighbor_id: u16) -> u8 {
    if entry_next_hop == neighbor_id {
        INFINITY
    } else {
        entry_metric
    }
}

/// Send a full scheduled update (every entry, live and garbage) to every configured neighbor.
pub async fn emit_scheduled(table: &RoutingTable, config: &Config, transport: &mut dyn Transport) {
    let entries: Vec<(u16, u8, u16)> = table
        .iter_all()
        .map(|(dest, entry)| (dest, entry.metric, entry.next_hop))
        .collect();

    for neighbor in config.neighbors.values() {
        let packet_entries = entries
            .iter()
            .map(|&(dest, metric, next_hop)| (dest, poisoned_metric(next_hop, metric, neighbor.neighbor_id)));
        let buf = codec::encode(config.router_id, packet_entries);
        if let Err(e) = transport.send_to(&buf, neighbor.outbound_port).await {
            log::warn!("scheduled update to neighbor {} failed: {e}", neighbor.neighbor_id);
        }
    }
}

/// Send a triggered update containing only the entries whose change flag is set, then clear
/// those flags. A no-op (nothing sent) if nothing is flagged.
pub async fn emit_triggered(table: &mut RoutingTable, config: &Config, transport: &mut dyn Transport) {
    let entries: Vec<(u16, u8, u16)> = table
        .iter_all()
        .filter(|(_, entry)| entry.change_flag)
        .map(|(dest, entry)| (dest, entry.metric, entry.next_hop))
        .collect();
    table.clear_change_flags();

    if entries.is_empty() {
        return;
    }

    for neighbor in config.neighbors.values() {
        let packet_entries = entries
            .iter()
            .map(|&(dest, metric, next_hop)| (dest, poisoned_metric(next_hop, metric, neighbor.neighbor_id)));
        let buf = codec::encode(config.router_id, packet_entries);
        if let Err(e) = transport.send_to(&buf, neighbor.outbound_port).await {
            log::warn!("triggered update to neighbor {} failed: {e}", neighbor.neighbor_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing_table::RouteEntry;
    use crate::transport::MockTransport;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::BTreeMap;

    fn config_two_neighbors() -> Config {
        let mut neighbors = BTreeMap::new();
        neighbors.insert(2, crate::config::NeighborConfig { neighbor_id: 2, outbound_port: 5002, link_metric: 1 });
        neighbors.insert(3, crate::config::NeighborConfig { neighbor_id: 3, outbound_port: 5003, link_metric: 1 });
        Config {
            router_id: 1,
            input_ports: vec![5001],
            neighbors,
            scheduled_period: 5,
            timeout_period: 30,
            garbage_period: 20,
        }
    }

    #[tokio::test]
    async fn scheduled_update_poisons_routes_learned_from_the_recipient() {
        let config = config_two_neighbors();
        let mut table = RoutingTable::new(1);
        table.upsert(2, RouteEntry { metric: 1, next_hop: 2, change_flag: false, age: 0 });
        table.upsert(3, RouteEntry { metric: 1, next_hop: 3, change_flag: false, age: 0 });

        let mut transport = MockTransport::new();
        emit_scheduled(&table, &config, &mut transport).await;

        let sent = transport.take_sent();
        assert_eq!(sent.len(), 2);

        let (port_to_2, buf_to_2) = sent.iter().find(|(p, _)| *p == 5002).unwrap();
        let _ = port_to_2;
        let decoded = codec::decode(buf_to_2).unwrap();
        // destination 2 is reached *through* neighbor 2, so it is poisoned in the packet sent to 2
        assert_eq!(decoded.entries[&2], INFINITY);
        // destination 3 is reached through neighbor 3, so it is advertised normally to neighbor 2
        assert_eq!(decoded.entries[&3], 1);
    }

    #[tokio::test]
    async fn triggered_update_only_contains_flagged_entries_and_clears_them() {
        let config = config_two_neighbors();
        let mut table = RoutingTable::new(1);
        table.upsert(2, RouteEntry { metric: 1, next_hop: 2, change_flag: true, age: 0 });
        table.upsert(3, RouteEntry { metric: 1, next_hop: 3, change_flag: false, age: 0 });

        let mut transport = MockTransport::new();
        emit_triggered(&mut table, &config, &mut transport).await;

        let sent = transport.take_sent();
        assert_eq!(sent.len(), 2);
        let (_, buf) = &sent[0];
        let decoded = codec::decode(buf).unwrap();
        assert_eq!(decoded.entries.len(), 1);
        assert!(decoded.entries.contains_key(&2));
        assert!(!table.get(2).unwrap().change_flag);
    }

    #[tokio::test]
    async fn triggered_update_with_nothing_flagged_sends_nothing() {
        let config = config_two_neighbors();
        let mut table = RoutingTable::new(1);

        let mut transport = MockTransport::new();
        emit_triggered(&mut table, &config, &mut transport).await;

        assert!(transport.take_sent().is_empty());
    }

    #[test]
    fn suppression_state_machine_matches_the_spec_table() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = SuppressionState::default();

        assert!(state.request(&mut rng), "idle + request => emit immediately");
        assert!(!state.request(&mut rng), "blocked + request => queued, no emission");

        // drain the block countdown without it being expired yet
        let remaining = match state {
            SuppressionState::Blocked { remaining, .. } => remaining,
            SuppressionState::Idle => panic!("expected Blocked"),
        };
        for _ in 0..remaining.saturating_sub(1) {
            assert_eq!(state.tick(&mut rng), BlockTick::Nothing);
        }
        assert_eq!(state.tick(&mut rng), BlockTick::Flush);

        // now nothing is queued: the next expiry returns to idle
        let remaining = match state {
            SuppressionState::Blocked { remaining, .. } => remaining,
            SuppressionState::Idle => panic!("expected Blocked"),
        };
        for _ in 0..remaining.saturating_sub(1) {
            assert_eq!(state.tick(&mut rng), BlockTick::Nothing);
        }
        assert_eq!(state.tick(&mut rng), BlockTick::BecameIdle);
        assert_eq!(state, SuppressionState::Idle);
    }
}
