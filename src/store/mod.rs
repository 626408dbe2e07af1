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

//! The SQLite database holding domains, mailboxes and aliases.
//!
//! This is the same database Postfix and Dovecot are pointed at, so the
//! schema is deliberately flat and column names are what their SQL lookup
//! tables reference.

mod db_migrations;
mod filter;
pub mod types;

use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use rusqlite::OptionalExtension as _;

use self::filter::Conditions;
use self::types::*;
use crate::model::alias::{Alias, AliasFilter};
use crate::model::domain::{Domain, DomainFilter};
use crate::model::mailbox::{Mailbox, MailboxFilter};
use crate::model::record::{self, Executor, Persisted, Record, Statement};
use crate::support::error::Error;
use crate::support::system_config::{DbConfig, DefaultsConfig};

static MIGRATIONS: &[&str] = &[include_str!("schema.v1.sql")];
static DEMO_DATA: &str = include_str!("demo-data.sql");

const DOMAIN_SELECT: &str = "SELECT `d`.*, \
     (SELECT COUNT(*) FROM `mailbox` `m` WHERE `m`.`domain` = `d`.`domain`) \
     AS `mailbox_count`, \
     (SELECT COUNT(*) FROM `alias` `a` WHERE `a`.`domain` = `d`.`domain`) \
     AS `alias_count` \
     FROM `domain` `d`";

/// A connection to the database.
///
/// The connection is closed when this is dropped.
#[derive(Debug)]
pub struct Store {
    cxn: rusqlite::Connection,
}

impl Store {
    /// Open (creating if needed) the database at `path` and bring its schema
    /// up to date.
    ///
    /// `busy_timeout` bounds how long any statement waits for another process
    /// to release its lock before failing with `Error::StoreUnavailable`.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, Error> {
        let mut cxn = rusqlite::Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            Error::StoreUnavailable(format!("{}: {}", path.display(), e))
        })?;

        cxn.pragma_update(None, "foreign_keys", true)?;
        cxn.busy_timeout(busy_timeout)?;

        db_migrations::apply_migrations(&mut cxn, MIGRATIONS)?;

        Ok(Self { cxn })
    }

    /// Open the database as described by `config`, resolving a relative
    /// path against `config_dir`.
    pub fn open_configured(
        config: &DbConfig,
        config_dir: &Path,
    ) -> Result<Self, Error> {
        let mut this =
            Self::open(&config.resolve_file(config_dir), config.busy_timeout())?;
        if config.add_demo_data {
            this.add_demo_data()?;
        }
        Ok(this)
    }

    /// Insert the demo domains, mailboxes and alias, leaving any which
    /// already exist alone.
    pub fn add_demo_data(&mut self) -> Result<(), Error> {
        self.cxn.execute_batch(DEMO_DATA)?;
        info!("Demo data added");
        Ok(())
    }

    /// Insert or update `rec`, whichever is needed.
    pub fn persist<R: Record>(&mut self, rec: &mut R) -> Result<Persisted, Error> {
        record::persist(self, rec)
    }

    pub fn fetch_domain(&mut self, name: &str) -> Result<Domain, Error> {
        self.cxn
            .prepare_cached(&format!("{} WHERE `d`.`domain` = ?", DOMAIN_SELECT))?
            .query_row((name,), from_row)
            .map_err(Into::into)
    }

    /// List the domains matching `filter`, ordered by name.
    pub fn list_domains(
        &mut self,
        filter: &DomainFilter,
    ) -> Result<Vec<Domain>, Error> {
        let mut conditions = Conditions::new();
        conditions
            .like("`d`.`domain`", filter.name_like.as_deref())
            .equals("`d`.`active`", filter.active);

        self.list(
            &format!(
                "{}{} ORDER BY `d`.`domain`",
                DOMAIN_SELECT,
                conditions.where_clause()
            ),
            &conditions,
        )
    }

    /// Delete the domain called `name`.
    ///
    /// A domain which still has mailboxes or aliases is not deleted;
    /// `Error::DomainInUse` reports how many of each remain.
    pub fn delete_domain(&mut self, name: &str) -> Result<(), Error> {
        let txn = self
            .cxn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let (mailboxes, aliases) = txn.query_row(
            "SELECT \
             (SELECT COUNT(*) FROM `mailbox` WHERE `domain` = ?1), \
             (SELECT COUNT(*) FROM `alias` WHERE `domain` = ?1)",
            (name,),
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;
        if mailboxes > 0 || aliases > 0 {
            warn!(
                "Not deleting domain '{}': {} mailboxes and {} aliases remain",
                name, mailboxes, aliases,
            );
            return Err(Error::DomainInUse { mailboxes, aliases });
        }

        let deleted =
            txn.execute("DELETE FROM `domain` WHERE `domain` = ?", (name,))?;
        if 0 == deleted {
            return Err(Error::NotFound);
        }
        txn.commit()?;

        info!("domain '{}' deleted", name);
        Ok(())
    }

    /// Create the configured default aliases in `domain`, each forwarding to
    /// `<forward_local_part>@<domain>`.
    ///
    /// Aliases which already exist are skipped. Returns the aliases created.
    pub fn fill_default_aliases(
        &mut self,
        domain: &str,
        defaults: &DefaultsConfig,
    ) -> Result<Vec<Alias>, Error> {
        let forward = format!("{}@{}", defaults.forward_local_part, domain);
        let mut created = Vec::with_capacity(defaults.aliases.len());

        for local_part in &defaults.aliases {
            let address = format!("{}@{}", local_part, domain);
            if self.exists(Alias::TABLE, Alias::KEY_COLUMN, &address)? {
                info!("alias '{}' already exists, not filling", address);
                continue;
            }

            let mut alias = Alias::new(&address, domain, &forward)?;
            alias.set_description(Some(
                "filled automatically with default alias from config"
                    .to_owned(),
            ));
            self.persist(&mut alias)?;
            created.push(alias);
        }

        Ok(created)
    }

    pub fn fetch_mailbox(&mut self, mail: &str) -> Result<Mailbox, Error> {
        self.cxn
            .prepare_cached("SELECT * FROM `mailbox` WHERE `mail` = ?")?
            .query_row((mail,), from_row)
            .map_err(Into::into)
    }

    /// List the mailboxes matching `filter`, ordered by domain then address.
    pub fn list_mailboxes(
        &mut self,
        filter: &MailboxFilter,
    ) -> Result<Vec<Mailbox>, Error> {
        let mut conditions = Conditions::new();
        conditions
            .like("`domain`", filter.domain_like.as_deref())
            .like("`mail_dir`", filter.mail_dir_like.as_deref())
            .like("`local_part`", filter.local_part_like.as_deref())
            .like("`relay_domain`", filter.relay_domain_like.as_deref())
            .like("`quota`", filter.quota_like.as_deref())
            .equals("`active`", filter.active);

        self.list(
            &format!(
                "SELECT * FROM `mailbox`{} ORDER BY `domain`, `mail`",
                conditions.where_clause()
            ),
            &conditions,
        )
    }

    pub fn delete_mailbox(&mut self, mail: &str) -> Result<(), Error> {
        self.delete(Mailbox::TABLE, Mailbox::KEY_COLUMN, mail)
    }

    pub fn fetch_alias(&mut self, alias: &str) -> Result<Alias, Error> {
        self.cxn
            .prepare_cached("SELECT * FROM `alias` WHERE `alias` = ?")?
            .query_row((alias,), from_row)
            .map_err(Into::into)
    }

    /// List the aliases matching `filter`, ordered by domain then alias.
    pub fn list_aliases(
        &mut self,
        filter: &AliasFilter,
    ) -> Result<Vec<Alias>, Error> {
        let mut conditions = Conditions::new();
        conditions
            .like("`domain`", filter.domain_like.as_deref())
            .like("`forward_address`", filter.forward_like.as_deref())
            .equals("`active`", filter.active);

        self.list(
            &format!(
                "SELECT * FROM `alias`{} ORDER BY `domain`, `alias`",
                conditions.where_clause()
            ),
            &conditions,
        )
    }

    pub fn delete_alias(&mut self, alias: &str) -> Result<(), Error> {
        self.delete(Alias::TABLE, Alias::KEY_COLUMN, alias)
    }

    fn list<T: FromRow>(
        &mut self,
        sql: &str,
        conditions: &Conditions,
    ) -> Result<Vec<T>, Error> {
        let mut stmt = self.cxn.prepare(sql)?;
        let rows = stmt
            .query_map(
                rusqlite::params_from_iter(conditions.params()),
                from_row,
            )?
            .collect::<Result<Vec<T>, _>>()?;
        Ok(rows)
    }

    fn delete(
        &mut self,
        table: &str,
        key_column: &str,
        key: &str,
    ) -> Result<(), Error> {
        let deleted = self.cxn.execute(
            &format!("DELETE FROM `{}` WHERE `{}` = ?", table, key_column),
            (key,),
        )?;
        if 0 == deleted {
            return Err(Error::NotFound);
        }

        info!("{} '{}' deleted", table, key);
        Ok(())
    }
}

impl Executor for Store {
    fn execute(&mut self, stmt: &Statement) -> Result<usize, Error> {
        self.cxn
            .prepare_cached(&stmt.sql)?
            .execute(rusqlite::params_from_iter(&stmt.params))
            .map_err(Into::into)
    }

    fn exists(
        &mut self,
        table: &str,
        key_column: &str,
        key: &str,
    ) -> Result<bool, Error> {
        self.cxn
            .prepare_cached(&format!(
                "SELECT 1 FROM `{}` WHERE `{}` = ?",
                table, key_column
            ))?
            .query_row((key,), from_single::<i64>)
            .optional()
            .map(|found| found.is_some())
            .map_err(Into::into)
    }
}
