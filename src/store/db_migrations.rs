//-
// Copyright (c) 2026, Jason Lingle
//
// This file is part of Mailroster.
//
// Mailroster is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public  License as published by the Free
// Software Foundation, either version  3 of the License, or (at  your option)
// any later version.
//
// Mailroster is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License
// for more details.
//
// You should have received a copy of the GNU General Public License along with
// Mailroster. If not, see <http://www.gnu.org/licenses/>.


use log::info;

use super::types::*;
use crate::support::error::Error;

/// The schema version recorded in `cxn`, or `None` for a fresh database.
///
/// Fails if the `migration` table does not exist yet.
fn schema_version(
    cxn: &rusqlite::Connection,
) -> rusqlite::Result<Option<usize>> {
    cxn.query_row(
        "SELECT MAX(`version`) FROM `migration`",
        (),
        from_single::<Option<usize>>,
    )
}

/// Upgrade the schema of `cxn` to version `migrations.len()`.
///
/// Schema version N is reached by running `migrations[N - 1]`. Every script
/// past the recorded version runs inside a single exclusive transaction,
/// and each one is logged in the `migration` table as it completes.
pub fn apply_migrations(
    cxn: &mut rusqlite::Connection,
    migrations: &[&str],
) -> Result<(), Error> {
    let target = migrations.len();
    if let Ok(Some(version)) = schema_version(cxn) {
        if version >= target {
            return Ok(());
        }
    }

    let txn = cxn
        .transaction_with_behavior(rusqlite::TransactionBehavior::Exclusive)?;
    txn.execute(
        "CREATE TABLE IF NOT EXISTS `migration` (\
         `version` INTEGER NOT NULL PRIMARY KEY, \
         `applied_at` INTEGER NOT NULL\
         ) STRICT",
        (),
    )?;

    // Another process may have upgraded the schema before we got the lock
    let from = schema_version(&txn)?.unwrap_or(0);
    for (ix, script) in migrations.iter().enumerate().skip(from) {
        let version = ix + 1;
        info!("Upgrading schema to version {} of {}", version, target);
        txn.execute_batch(script)?;
        txn.execute(
            "INSERT INTO `migration` (`version`, `applied_at`) \
             VALUES (?, ?)",
            (version, UnixMicros::now()),
        )?;
    }

    txn.commit()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    static MIGRATIONS: &[&str] = &[
        "CREATE TABLE `a` (`x` INTEGER NOT NULL) STRICT;",
        "CREATE TABLE `b` (`y` INTEGER NOT NULL) STRICT;",
    ];

    fn version(cxn: &rusqlite::Connection) -> usize {
        schema_version(cxn).unwrap().unwrap()
    }

    #[test]
    fn applies_outstanding_migrations_once() {
        let mut cxn = rusqlite::Connection::open_in_memory().unwrap();
        apply_migrations(&mut cxn, &MIGRATIONS[..1]).unwrap();
        assert_eq!(1, version(&cxn));

        apply_migrations(&mut cxn, MIGRATIONS).unwrap();
        assert_eq!(2, version(&cxn));
        cxn.execute("INSERT INTO `b` (`y`) VALUES (1)", ()).unwrap();

        // Already up to date; nothing is re-run
        apply_migrations(&mut cxn, MIGRATIONS).unwrap();
        let count: i64 = cxn
            .query_row("SELECT COUNT(*) FROM `migration`", (), from_single)
            .unwrap();
        assert_eq!(2, count);
    }

    #[test]
    fn newer_schema_left_alone() {
        let mut cxn = rusqlite::Connection::open_in_memory().unwrap();
        apply_migrations(&mut cxn, MIGRATIONS).unwrap();

        // An older binary opening a newer database runs nothing
        apply_migrations(&mut cxn, &MIGRATIONS[..1]).unwrap();
        assert_eq!(2, version(&cxn));
    }
}
