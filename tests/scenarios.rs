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
//! End-to-end scenarios wiring several routers' core subsystems together, without a network.
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use ripd::advertiser::{self, BlockTick, SuppressionState};
use ripd::codec;
use ripd::config::{Config, NeighborConfig};
use ripd::dv_algorithm;
use ripd::event_loop::EventLoop;
use ripd::routing_table::RoutingTable;
use ripd::timer_engine::TimerEngine;
use ripd::transport::MockTransport;

/// A router with one neighbor per entry `(neighbor_id, link_metric)`. Outbound ports follow the
/// `5000 + neighbor_id` convention so a packet's destination port also names its recipient.
fn config(router_id: u16, links: &[(u16, u8)]) -> Config {
    let mut neighbors = BTreeMap::new();
    for &(neighbor_id, link_metric) in links {
        neighbors.insert(
            neighbor_id,
            NeighborConfig { neighbor_id, outbound_port: 5000 + neighbor_id, link_metric },
        );
    }
    Config {
        router_id,
        input_ports: vec![5000 + router_id],
        neighbors,
        scheduled_period: 5,
        timeout_period: 30,
        garbage_period: 20,
    }
}

fn addr(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, port))
}

/// Apply every packet in `sent` (addressed by the `5000 + neighbor_id` convention) as coming
/// from `table`'s own router into `into`, provided it was actually sent to `into_config`'s port.
fn deliver(sent: &[(u16, Vec<u8>)], into_table: &mut RoutingTable, into_config: &Config) {
    let my_port = into_config.input_ports[0];
    for (port, buf) in sent {
        if *port != my_port {
            continue;
        }
        let packet = codec::decode(buf).unwrap();
        dv_algorithm::apply(into_table, into_config, &packet);
    }
}

#[tokio::test]
async fn two_router_topology_converges_after_one_scheduled_exchange() {
    let config1 = config(1, &[(2, 1)]);
    let config2 = config(2, &[(1, 1)]);
    let mut table1 = RoutingTable::new(1);
    let mut table2 = RoutingTable::new(2);

    let mut t1 = MockTransport::new();
    advertiser::emit_scheduled(&table1, &config1, &mut t1).await;
    let sent1 = t1.take_sent();

    let mut t2 = MockTransport::new();
    advertiser::emit_scheduled(&table2, &config2, &mut t2).await;
    let sent2 = t2.take_sent();

    deliver(&sent2, &mut table1, &config1);
    deliver(&sent1, &mut table2, &config2);

    let route1to2 = table1.get(2).unwrap();
    assert_eq!(route1to2.metric, 1);
    assert_eq!(route1to2.next_hop, 2);

    let route2to1 = table2.get(1).unwrap();
    assert_eq!(route2to1.metric, 1);
    assert_eq!(route2to1.next_hop, 1);
}

#[tokio::test]
async fn three_router_linear_topology_converges_with_poisoned_reverse() {
    let config1 = config(1, &[(2, 1)]);
    let config2 = config(2, &[(1, 1), (3, 1)]);
    let config3 = config(3, &[(2, 1)]);
    let mut table1 = RoutingTable::new(1);
    let mut table2 = RoutingTable::new(2);
    let mut table3 = RoutingTable::new(3);

    // Round 1: every router advertises only what it directly knows (itself, and nothing yet
    // learned). Direct neighbors discover each other.
    let mut t1 = MockTransport::new();
    advertiser::emit_scheduled(&table1, &config1, &mut t1).await;
    let mut t2 = MockTransport::new();
    advertiser::emit_scheduled(&table2, &config2, &mut t2).await;
    let mut t3 = MockTransport::new();
    advertiser::emit_scheduled(&table3, &config3, &mut t3).await;
    let (sent1, sent2, sent3) = (t1.take_sent(), t2.take_sent(), t3.take_sent());
    deliver(&sent2, &mut table1, &config1);
    deliver(&sent3, &mut table2, &config2);
    deliver(&sent1, &mut table2, &config2);
    deliver(&sent2, &mut table3, &config3);

    assert_eq!(table1.get(2).unwrap().metric, 1);
    assert_eq!(table2.get(1).unwrap().metric, 1);
    assert_eq!(table2.get(3).unwrap().metric, 1);
    assert_eq!(table3.get(2).unwrap().metric, 1);
    // router 1 does not yet know about router 3, nor vice versa
    assert!(table1.get(3).is_none());
    assert!(table3.get(1).is_none());

    // Round 2: router 2 now advertises its full table (including routes learned in round 1) to
    // both neighbors. Split horizon with poisoned reverse applies per recipient.
    let mut t2 = MockTransport::new();
    advertiser::emit_scheduled(&table2, &config2, &mut t2).await;
    let sent2 = t2.take_sent();

    let to_router3 = sent2.iter().find(|(p, _)| *p == 5003).unwrap();
    let decoded_to_3 = codec::decode(&to_router3.1).unwrap();
    // destination 3 is routed through neighbor 3 itself, so it is poisoned in the packet sent
    // back to router 3.
    assert_eq!(decoded_to_3.entries[&3], codec::INFINITY);
    // destination 1 is routed through neighbor 1, not 3, so it is advertised normally.
    assert_eq!(decoded_to_3.entries[&1], 1);

    deliver(&sent2, &mut table1, &config1);
    deliver(&sent2, &mut table3, &config3);

    let route1to3 = table1.get(3).unwrap();
    assert_eq!(route1to3.metric, 2);
    assert_eq!(route1to3.next_hop, 2);

    let route3to1 = table3.get(1).unwrap();
    assert_eq!(route3to1.metric, 2);
    assert_eq!(route3to1.next_hop, 2);
}

#[test]
fn timeout_moves_route_to_garbage_and_purges_it_after_the_garbage_period() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut table = RoutingTable::new(1);
    table.upsert(
        2,
        ripd::routing_table::RouteEntry { metric: 2, next_hop: 2, change_flag: false, age: 0 },
    );
    let mut engine = TimerEngine::new(100, 3, 2, &mut rng);

    let mut events = ripd::timer_engine::TickEvents::default();
    for _ in 0..3 {
        events = engine.tick(&mut table, &mut rng);
    }
    assert!(events.triggered_requested);
    assert!(table.is_garbage(2));
    assert_eq!(table.get(2).unwrap().metric, codec::INFINITY);

    for _ in 0..2 {
        engine.tick(&mut table, &mut rng);
    }
    assert!(table.get(2).is_none(), "entry must be purged once its garbage period elapses");
}

#[tokio::test]
async fn malformed_packet_is_dropped_without_mutating_state_or_emitting_anything() {
    let config = config(1, &[(2, 1)]);
    let rng = StdRng::seed_from_u64(0);
    let transport = MockTransport::new();
    let mut event_loop = EventLoop::new(config, transport, rng);

    let mut garbage_rte = vec![2u8, 2, 0, 1]; // valid header
    garbage_rte.extend_from_slice(&[0xFFu8; codec::RTE_LEN]); // nonsense route entry
    event_loop.transport_mut().push_datagram(garbage_rte, addr(5002));

    let before = event_loop.table().iter_all().count();
    event_loop.iteration(Duration::from_millis(0)).await;
    let after = event_loop.table().iter_all().count();

    assert_eq!(before, after, "a malformed datagram must not change the routing table");
    assert!(event_loop.transport_mut().take_sent().is_empty());
}

#[test]
fn two_close_timeouts_yield_one_immediate_triggered_update_and_a_second_only_after_the_block_elapses(
) {
    // Two destinations timing out in the same tick are reported as a single triggered request
    // by the timer engine (a boolean, not a count), which is exactly the aggregation the
    // suppression window is meant to enforce: the daemon must not emit once per route.
    let mut rng = StdRng::seed_from_u64(42);
    let mut table = RoutingTable::new(1);
    table.upsert(
        2,
        ripd::routing_table::RouteEntry { metric: 2, next_hop: 2, change_flag: false, age: 0 },
    );
    table.upsert(
        3,
        ripd::routing_table::RouteEntry { metric: 2, next_hop: 3, change_flag: false, age: 0 },
    );
    let mut engine = TimerEngine::new(1000, 5, 20, &mut rng);
    let mut suppression = SuppressionState::default();

    let mut emissions = 0u32;
    let mut events = Default::default();
    for _ in 0..5 {
        events = engine.tick(&mut table, &mut rng);
        if events.triggered_requested && suppression.request(&mut rng) {
            emissions += 1;
        }
    }
    assert_eq!(emissions, 1, "both routes timed out together; exactly one emission is due");
    assert!(matches!(suppression, SuppressionState::Blocked { .. }));

    // A further request arriving while still blocked is queued, not emitted again.
    assert!(!suppression.request(&mut rng));

    // Advance until the block window fully elapses: the queued update flushes exactly once.
    let mut flushes = 0u32;
    for _ in 0..10 {
        if let BlockTick::Flush = suppression.tick(&mut rng) {
            flushes += 1;
            break;
        }
    }
    assert_eq!(flushes, 1, "the queued update must flush once the block window elapses");
}
