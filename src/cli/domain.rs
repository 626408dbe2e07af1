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


use structopt::StructOpt;

use super::table::Table;
use super::{non_empty, parse_bool, yes_no};
use crate::model::domain::{Domain, DomainFilter};
use crate::model::record::{Persisted, Record};
use crate::store::Store;
use crate::support::error::Error;
use crate::support::system_config::SystemConfig;

/// Add, change and manage domains.
#[derive(StructOpt)]
pub(super) enum DomainSubcommand {
    /// List domains.
    List(DomainListCommand),
    /// Add a new domain.
    Add(DomainAddCommand),
    /// Edit an existing domain.
    Edit(DomainEditCommand),
    /// Delete a domain.
    ///
    /// A domain which still has mailboxes or aliases cannot be deleted.
    Delete(DomainDeleteCommand),
}

#[derive(StructOpt)]
pub(super) struct DomainListCommand {
    /// Only list active (true) or inactive (false) domains.
    #[structopt(long, short, parse(try_from_str = parse_bool))]
    active: Option<bool>,

    /// Only list domains matching this SQL LIKE pattern.
    #[structopt(long, short)]
    domain: Option<String>,
}

#[derive(StructOpt)]
pub(super) struct DomainAddCommand {
    /// The domain name.
    name: String,

    /// Whether the domain is active [default: true]
    #[structopt(long, short, parse(try_from_str = parse_bool))]
    active: Option<bool>,

    /// Description of the domain.
    #[structopt(long, short)]
    description: Option<String>,

    /// Also add the default aliases from the configuration.
    #[structopt(long, short)]
    fill: bool,
}

#[derive(StructOpt)]
pub(super) struct DomainEditCommand {
    /// The domain name.
    name: String,

    /// Whether the domain is active.
    #[structopt(long, short, parse(try_from_str = parse_bool))]
    active: Option<bool>,

    /// Description of the domain. An empty string removes it.
    #[structopt(long, short)]
    description: Option<String>,
}

#[derive(StructOpt)]
pub(super) struct DomainDeleteCommand {
    /// The domain name.
    name: String,
}

/// Run `cmd`, returning what should be printed.
pub(super) fn run(
    cmd: DomainSubcommand,
    store: &mut Store,
    config: &SystemConfig,
) -> Result<String, Error> {
    match cmd {
        DomainSubcommand::List(cmd) => {
            let domains = store.list_domains(&DomainFilter {
                name_like: cmd.domain,
                active: cmd.active,
            })?;
            Ok(table(&domains).render())
        },

        DomainSubcommand::Add(cmd) => {
            let mut domain = Domain::new(&cmd.name)?;
            if let Some(active) = cmd.active {
                domain.set_active(active);
            }
            if let Some(description) = cmd.description {
                domain.set_description(non_empty(description));
            }
            store.persist(&mut domain)?;

            let mut out = format!("Domain '{}' added\n", domain.name());
            if cmd.fill {
                for alias in
                    store.fill_default_aliases(domain.name(), &config.defaults)?
                {
                    out.push_str(&format!(
                        "Alias '{}' -> '{}' added\n",
                        alias.alias(),
                        alias.forward_address()
                    ));
                }
            }
            Ok(out)
        },

        DomainSubcommand::Edit(cmd) => {
            let mut domain = store.fetch_domain(&cmd.name)?;
            if let Some(active) = cmd.active {
                domain.set_active(active);
            }
            if let Some(description) = cmd.description {
                domain.set_description(non_empty(description));
            }

            Ok(match store.persist(&mut domain)? {
                Persisted::Unchanged => {
                    format!("Domain '{}' unchanged\n", domain.name())
                },
                _ => format!("Domain '{}' updated\n", domain.name()),
            })
        },

        DomainSubcommand::Delete(cmd) => {
            store.delete_domain(&cmd.name)?;
            Ok(format!("Domain '{}' deleted\n", cmd.name))
        },
    }
}

fn table(domains: &[Domain]) -> Table {
    let mut table = Table::new(vec![
        "Domain",
        "Description",
        "Active",
        "Mailboxes",
        "Aliases",
        "Created",
        "Updated",
    ]);
    for d in domains {
        table.push(vec![
            d.name().to_owned(),
            d.description().unwrap_or_default().to_owned(),
            yes_no(d.is_active()),
            d.mailbox_count().to_string(),
            d.alias_count().to_string(),
            d.created_at().to_string(),
            d.updated_at().to_string(),
        ]);
    }
    table
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    fn run_args(
        store: &mut Store,
        args: &[&str],
    ) -> Result<String, Error> {
        let cmd = DomainSubcommand::from_iter_safe(
            std::iter::once("domain").chain(args.iter().copied()),
        )
        .unwrap();
        run(cmd, store, &SystemConfig::default())
    }

    fn open(tmpdir: &TempDir) -> Store {
        Store::open(&tmpdir.path().join("db.sqlite"), Duration::from_secs(1))
            .unwrap()
    }

    #[test]
    fn add_edit_list_delete() {
        crate::init_test_log();
        let tmpdir = TempDir::new().unwrap();
        let mut store = open(&tmpdir);

        run_args(&mut store, &["add", "example.com", "-d", "Example"]).unwrap();
        run_args(&mut store, &["add", "example.org", "--active", "no"])
            .unwrap();

        let listed = run_args(&mut store, &["list", "--active", "true"]).unwrap();
        assert!(listed.contains("example.com"));
        assert!(listed.contains("Example"));
        assert!(!listed.contains("example.org"));

        let out = run_args(&mut store, &["edit", "example.com", "-a", "true"])
            .unwrap();
        assert_eq!("Domain 'example.com' unchanged\n", out);

        let out = run_args(&mut store, &["edit", "example.com", "-d", ""])
            .unwrap();
        assert_eq!("Domain 'example.com' updated\n", out);
        assert_eq!(None, store.fetch_domain("example.com").unwrap().description());

        run_args(&mut store, &["delete", "example.org"]).unwrap();
        assert_matches!(
            Err(Error::NotFound),
            run_args(&mut store, &["delete", "example.org"])
        );
        assert_matches!(
            Err(Error::NotFound),
            run_args(&mut store, &["edit", "nonexistent.com", "-a", "no"])
        );
    }

    #[test]
    fn add_with_fill() {
        crate::init_test_log();
        let tmpdir = TempDir::new().unwrap();
        let mut store = open(&tmpdir);

        let out = run_args(&mut store, &["add", "example.com", "--fill"])
            .unwrap();
        assert!(out.contains("'info@example.com' -> 'root@example.com'"));
        assert!(out.contains("'abuse@example.com' -> 'root@example.com'"));

        let domain = store.fetch_domain("example.com").unwrap();
        assert_eq!(2, domain.alias_count());
        assert_matches!(
            Err(Error::DomainInUse {
                mailboxes: 0,
                aliases: 2
            }),
            run_args(&mut store, &["delete", "example.com"])
        );
    }

    #[test]
    fn add_rejects_bad_name() {
        let tmpdir = TempDir::new().unwrap();
        let mut store = open(&tmpdir);
        assert_matches!(
            Err(Error::InvalidName(_)),
            run_args(&mut store, &["add", "exa mple.com"])
        );
    }
}
