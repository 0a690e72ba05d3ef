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
//! Advances every scheduled/timeout/garbage timer by one second and reports what fired.
use rand::Rng;

use crate::codec::INFINITY;
use crate::routing_table::RoutingTable;

/// What a single tick wants the rest of the daemon to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// At least one route timed out this tick; a triggered update should be requested.
    pub triggered_requested: bool,
    /// The scheduled period elapsed; a full scheduled update is due.
    pub scheduled_due: bool,
}

pub struct TimerEngine {
    scheduled_period: u32,
    timeout_period: u32,
    garbage_period: u32,
    scheduled_age: u32,
    next_scheduled: u32,
}

impl TimerEngine {
    pub fn new(
        scheduled_period: u32,
        timeout_period: u32,
        garbage_period: u32,
        rng: &mut impl Rng,
    ) -> Self {
        Self {
            scheduled_period,
            timeout_period,
            garbage_period,
            scheduled_age: 0,
            next_scheduled: draw_scheduled_period(scheduled_period, rng),
        }
    }

    /// Advance every timer by one second: age the table, sweep timeouts and expired garbage,
    /// and decide whether a scheduled update is due.
    pub fn tick(&mut self, table: &mut RoutingTable, rng: &mut impl Rng) -> TickEvents {
        let self_id = table.self_id();

        for (dest, entry) in table.iter_all_mut() {
            if dest == self_id {
                entry.age = 0;
            } else {
                entry.age += 1;
            }
        }
        for (_, garbage_entry) in table.garbage_iter_mut() {
            garbage_entry.age_in_gc += 1;
        }

        let mut triggered_requested = false;

        let timed_out: Vec<u16> = table
            .iter_all()
            .filter(|&(dest, entry)| {
                dest != self_id && !table.is_garbage(dest) && entry.age >= self.timeout_period
            })
            .map(|(dest, _)| dest)
            .collect();
        for dest in timed_out {
            if let Some(entry) = table.get_mut(dest) {
                entry.metric = INFINITY;
            }
            table.mark_changed(dest);
            table.move_to_garbage(dest);
            triggered_requested = true;
            log::info!("destination {dest} timed out, moved to garbage");
        }

        let expired: Vec<u16> = table
            .garbage_iter()
            .filter(|(_, g)| g.age_in_gc >= self.garbage_period)
            .map(|(dest, _)| dest)
            .collect();
        for dest in expired {
            table.purge(dest);
            log::info!("purged destination {dest} after garbage collection");
        }

        self.scheduled_age += 1;
        let scheduled_due = if self.scheduled_age >= self.next_scheduled {
            self.scheduled_age = 0;
            self.next_scheduled = draw_scheduled_period(self.scheduled_period, rng);
            true
        } else {
            false
        };

        TickEvents { triggered_requested, scheduled_due }
    }
}

fn draw_scheduled_period(period: u32, rng: &mut impl Rng) -> u32 {
    let factor: f64 = rng.gen_range(0.8..=1.2);
    ((period as f64) * factor).round().max(1.0) as u32
}
