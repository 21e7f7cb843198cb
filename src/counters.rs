//! Surrogate-id allocation. Each allocator is seeded exactly once per cascade
//! from MAX(id) and then counts in memory; the database is never re-read
//! mid-batch. State is owned per invocation, so two cascades against the same
//! store would hand out colliding ids — callers must serialize externally.

use rusqlite::Connection;

use crate::error::Result;
use crate::store::{self, Table};

#[derive(Debug, Clone)]
pub struct Allocator {
    next_index: i64,
}

impl Allocator {
    /// Seed from the store watermark: the next zero-based index equals the
    /// current MAX(id) because committed ids are 1-based and gapless.
    pub fn seeded(conn: &Connection, table: Table) -> Result<Self> {
        Ok(Allocator {
            next_index: store::max_id(conn, table)?,
        })
    }

    #[cfg(test)]
    pub fn starting_at(next_index: i64) -> Self {
        Allocator { next_index }
    }

    /// Zero-based index of the row about to be appended; the committed
    /// surrogate id will be this plus one.
    pub fn next_index(&mut self) -> i64 {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    pub fn peek_index(&self) -> i64 {
        self.next_index
    }
}

/// The five child-table allocators of a league cascade, seeded together at
/// cascade start.
#[derive(Debug)]
pub struct Watermarks {
    pub teams: Allocator,
    pub players: Allocator,
    pub injuries: Allocator,
    pub player_teams: Allocator,
    pub player_seasons: Allocator,
}

impl Watermarks {
    pub fn seeded(conn: &Connection) -> Result<Self> {
        Ok(Watermarks {
            teams: Allocator::seeded(conn, Table::Teams)?,
            players: Allocator::seeded(conn, Table::Players)?,
            injuries: Allocator::seeded(conn, Table::Injuries)?,
            player_teams: Allocator::seeded(conn, Table::PlayerTeam)?,
            player_seasons: Allocator::seeded(conn, Table::PlayerSeason)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_monotonic_from_seed() {
        let mut alloc = Allocator::starting_at(7);
        assert_eq!(alloc.next_index(), 7);
        assert_eq!(alloc.next_index(), 8);
        assert_eq!(alloc.peek_index(), 9);
    }

    #[test]
    fn seeds_from_store_watermark() {
        let conn = store::open_in_memory().unwrap();
        let alloc = Allocator::seeded(&conn, Table::Teams).unwrap();
        assert_eq!(alloc.peek_index(), 0);
    }

    #[test]
    fn two_allocators_on_one_store_race() {
        // Documents the single-writer constraint: independently seeded
        // allocators hand out the same indices.
        let conn = store::open_in_memory().unwrap();
        let mut a = Allocator::seeded(&conn, Table::Teams).unwrap();
        let mut b = Allocator::seeded(&conn, Table::Teams).unwrap();
        assert_eq!(a.next_index(), b.next_index());
    }
}
