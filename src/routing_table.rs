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
//! The routing table: the single piece of mutable state the rest of the daemon operates on.
use std::collections::BTreeMap;
use std::fmt;

use crate::codec::INFINITY;

/// One destination's current route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    pub metric: u8,
    pub next_hop: u16,
    pub change_flag: bool,
    pub age: u32,
}

/// A destination currently unreachable and waiting to be purged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GarbageEntry {
    pub age_in_gc: u32,
}

/// Destination -> route, plus the side-table of destinations currently in garbage collection.
///
/// A destination that is in garbage still has a [`RouteEntry`] (with `metric == INFINITY`) in
/// the main table; `garbage` only tracks how long it has been there.
pub struct RoutingTable {
    self_id: u16,
    table: BTreeMap<u16, RouteEntry>,
    garbage: BTreeMap<u16, GarbageEntry>,
}

impl RoutingTable {
    /// A fresh table containing only the self-entry: metric 0, next hop self, age 0.
    pub fn new(self_id: u16) -> Self {
        let mut table = BTreeMap::new();
        table.insert(
            self_id,
            RouteEntry {
                metric: 0,
                next_hop: self_id,
                change_flag: false,
                age: 0,
            },
        );
        Self {
            self_id,
            table,
            garbage: BTreeMap::new(),
        }
    }

    pub fn self_id(&self) -> u16 {
        self.self_id
    }

    pub fn is_self(&self, dest: u16) -> bool {
        dest == self.self_id
    }

    pub fn get(&self, dest: u16) -> Option<&RouteEntry> {
        self.table.get(&dest)
    }

    pub fn get_mut(&mut self, dest: u16) -> Option<&mut RouteEntry> {
        self.table.get_mut(&dest)
    }

    pub fn upsert(&mut self, dest: u16, entry: RouteEntry) {
        self.table.insert(dest, entry);
    }

    /// Every destination currently known, live or in garbage, in ascending id order.
    pub fn iter_all(&self) -> impl Iterator<Item = (u16, &RouteEntry)> {
        self.table.iter().map(|(&dest, entry)| (dest, entry))
    }

    pub fn iter_all_mut(&mut self) -> impl Iterator<Item = (u16, &mut RouteEntry)> {
        self.table.iter_mut().map(|(&dest, entry)| (dest, entry))
    }

    pub fn garbage_iter(&self) -> impl Iterator<Item = (u16, &GarbageEntry)> {
        self.garbage.iter().map(|(&dest, entry)| (dest, entry))
    }

    pub fn garbage_iter_mut(&mut self) -> impl Iterator<Item = (u16, &mut GarbageEntry)> {
        self.garbage.iter_mut().map(|(&dest, entry)| (dest, entry))
    }

    pub fn mark_changed(&mut self, dest: u16) {
        if let Some(entry) = self.table.get_mut(&dest) {
            entry.change_flag = true;
        }
    }

    pub fn clear_change_flags(&mut self) {
        for entry in self.table.values_mut() {
            entry.change_flag = false;
        }
    }

    pub fn is_garbage(&self, dest: u16) -> bool {
        self.garbage.contains_key(&dest)
    }

    /// Mark `dest` as entering garbage collection. Does not touch its `RouteEntry`; the caller
    /// is responsible for having already set its metric to infinity.
    pub fn move_to_garbage(&mut self, dest: u16) {
        self.garbage.entry(dest).or_insert(GarbageEntry { age_in_gc: 0 });
    }

    /// Remove `dest` from garbage collection without touching its `RouteEntry`.
    pub fn resurrect(&mut self, dest: u16) {
        self.garbage.remove(&dest);
    }

    /// Remove `dest` entirely: from garbage and from the table.
    pub fn purge(&mut self, dest: u16) {
        self.garbage.remove(&dest);
        self.table.remove(&dest);
    }
}

impl fmt::Display for RoutingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "routing table (self={}):", self.self_id)?;
        for (dest, entry) in self.iter_all() {
            let status = if entry.metric >= INFINITY {
                if self.is_garbage(dest) {
                    "garbage"
                } else {
                    "unreachable"
                }
            } else if dest == self.self_id {
                "self"
            } else {
                "live"
            };
            writeln!(
                f,
                "  {dest:>5} via {:>5} metric {:>2} age {:>4}s {status}{}",
                entry.next_hop,
                entry.metric,
                entry.age,
                if entry.change_flag { " *" } else { "" },
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_table_has_only_the_self_entry() {
        let table = RoutingTable::new(1);
        assert_eq!(table.iter_all().count(), 1);
        let self_entry = table.get(1).unwrap();
        assert_eq!(self_entry.metric, 0);
        assert_eq!(self_entry.next_hop, 1);
        assert_eq!(self_entry.age, 0);
    }

    #[test]
    fn garbage_lifecycle() {
        let mut table = RoutingTable::new(1);
        table.upsert(
            2,
            RouteEntry {
                metric: 16,
                next_hop: 3,
                change_flag: true,
                age: 0,
            },
        );
        table.move_to_garbage(2);
        assert!(table.is_garbage(2));
        assert!(table.get(2).is_some());

        table.resurrect(2);
        assert!(!table.is_garbage(2));
        assert!(table.get(2).is_some());

        table.move_to_garbage(2);
        table.purge(2);
        assert!(!table.is_garbage(2));
        assert!(table.get(2).is_none());
    }
}
