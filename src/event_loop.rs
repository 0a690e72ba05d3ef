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
//! Single-threaded cooperative loop: multiplex datagram arrivals with a 1-second timer tick.
use std::net::SocketAddr;
use std::time::Duration;

use rand::rngs::StdRng;

use crate::advertiser::{self, BlockTick, SuppressionState};
use crate::codec;
use crate::config::Config;
use crate::dv_algorithm;
use crate::routing_table::RoutingTable;
use crate::transport::Transport;

/// The 1-second cap on how long one iteration waits for a datagram (spec.md §4.6).
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

pub struct EventLoop<T: Transport> {
    config: Config,
    transport: T,
    table: RoutingTable,
    timer_engine: crate::timer_engine::TimerEngine,
    suppression: SuppressionState,
    rng: StdRng,
    /// Set while draining datagrams this iteration; consumed and reset by the following tick.
    pending_trigger: bool,
}

impl<T: Transport> EventLoop<T> {
    pub fn new(config: Config, transport: T, mut rng: StdRng) -> Self {
        let table = RoutingTable::new(config.router_id);
        let timer_engine = crate::timer_engine::TimerEngine::new(
            config.scheduled_period,
            config.timeout_period,
            config.garbage_period,
            &mut rng,
        );
        Self {
            config,
            transport,
            table,
            timer_engine,
            suppression: SuppressionState::default(),
            rng,
            pending_trigger: false,
        }
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Run forever: one iteration per second, bounded.
    pub async fn run(&mut self) {
        loop {
            self.iteration(TICK_INTERVAL).await;
        }
    }

    /// Run exactly one loop iteration: wait up to `budget` for a socket to become readable,
    /// apply whatever datagrams are available, then fire one timer tick. Exposed separately
    /// from `run` so tests can step the daemon deterministically, one simulated second at a
    /// time, against a [`crate::transport::MockTransport`].
    pub async fn iteration(&mut self, budget: Duration) {
        if self.transport.wait_readable(budget).await {
            let datagrams = self.transport.try_recv_each();
            for (buf, peer) in datagrams {
                self.handle_datagram(&buf, peer);
            }
        }
        self.tick().await;
    }

    fn handle_datagram(&mut self, buf: &[u8], peer: SocketAddr) {
        match codec::decode(buf) {
            Ok(packet) => {
                let triggered = dv_algorithm::apply(&mut self.table, &self.config, &packet);
                self.pending_trigger |= triggered;
                log::info!(
                    "applied advertisement from router {} ({peer})\n{}",
                    packet.origin_id,
                    self.table
                );
            }
            Err(e) => {
                log::debug!("dropping malformed packet from {peer}: {e}");
            }
        }
    }

    async fn tick(&mut self) {
        let events = self.timer_engine.tick(&mut self.table, &mut self.rng);
        let want_trigger = std::mem::take(&mut self.pending_trigger) || events.triggered_requested;

        if want_trigger && self.suppression.request(&mut self.rng) {
            advertiser::emit_triggered(&mut self.table, &self.config, &mut self.transport).await;
        }

        if events.scheduled_due {
            advertiser::emit_scheduled(&self.table, &self.config, &mut self.transport).await;
        }

        if let BlockTick::Flush = self.suppression.tick(&mut self.rng) {
            advertiser::emit_triggered(&mut self.table, &self.config, &mut self.transport).await;
        }
    }
}
