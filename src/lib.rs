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
//! Core of a simplified RIPv2 distance-vector routing daemon.
//!
//! The core is a single-threaded event loop (see [`event_loop`]) built on top of four
//! collaborating subsystems: the wire [`codec`], the [`routing_table`], the [`dv_algorithm`],
//! the [`timer_engine`], and the [`advertiser`]. All are plain, synchronous, and testable in
//! isolation; only the [`transport`] layer and the event loop itself touch async I/O.
pub mod advertiser;
pub mod codec;
pub mod config;
pub mod dv_algorithm;
pub mod event_loop;
pub mod routing_table;
pub mod timer_engine;
pub mod transport;

pub mod prelude {
    pub use crate::{
        advertiser::SuppressionState,
        codec::Packet,
        config::Config,
        event_loop::EventLoop,
        routing_table::{GarbageEntry, RouteEntry, RoutingTable},
        transport::{MockTransport, Transport, UdpTransport},
    };
}
