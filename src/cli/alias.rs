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
use super::{non_empty, parse_bool, required, yes_no};
use crate::model::alias::{Alias, AliasFilter};
use crate::model::record::{Persisted, Record};
use crate::store::Store;
use crate::support::error::Error;

/// Add, change and manage aliases.
#[derive(StructOpt)]
pub(super) enum AliasSubcommand {
    /// List aliases.
    List(AliasListCommand),
    /// Add a new alias to the given domain.
    ///
    /// An alias of the form `@domain` catches all mail to that domain not
    /// otherwise delivered.
    Add(AliasAddCommand),
    /// Edit an existing alias.
    Edit(AliasEditCommand),
    /// Delete an alias.
    Delete(AliasDeleteCommand),
}

#[derive(StructOpt)]
pub(super) struct AliasListCommand {
    /// Only list active (true) or inactive (false) aliases.
    #[structopt(long, short, parse(try_from_str = parse_bool))]
    active: Option<bool>,

    /// Only list aliases whose domain matches this SQL LIKE pattern.
    #[structopt(long, short)]
    domain: Option<String>,

    /// Only list aliases whose forward address matches this SQL LIKE
    /// pattern.
    #[structopt(long, short)]
    forward: Option<String>,
}

#[derive(StructOpt)]
pub(super) struct AliasAddCommand {
    /// The alias address.
    alias: String,
    /// The domain the alias belongs to, which must already exist.
    domain: String,
    /// Where to forward mail to. Separate multiple addresses with commas.
    forward: String,

    /// Whether the alias is active [default: true]
    #[structopt(long, short, parse(try_from_str = parse_bool))]
    active: Option<bool>,

    /// Description of the alias.
    #[structopt(long, short)]
    description: Option<String>,
}

#[derive(StructOpt)]
pub(super) struct AliasEditCommand {
    /// The alias address.
    alias: String,

    /// Whether the alias is active.
    #[structopt(long, short, parse(try_from_str = parse_bool))]
    active: Option<bool>,

    /// Description of the alias. An empty string removes it.
    #[structopt(long, short)]
    description: Option<String>,

    /// Where to forward mail to. Separate multiple addresses with commas.
    #[structopt(long, short)]
    forward: Option<String>,
}

#[derive(StructOpt)]
pub(super) struct AliasDeleteCommand {
    /// The alias address.
    alias: String,
}

/// Run `cmd`, returning what should be printed.
pub(super) fn run(
    cmd: AliasSubcommand,
    store: &mut Store,
) -> Result<String, Error> {
    match cmd {
        AliasSubcommand::List(cmd) => {
            let aliases = store.list_aliases(&AliasFilter {
                domain_like: cmd.domain,
                forward_like: cmd.forward,
                active: cmd.active,
            })?;
            Ok(table(&aliases).render())
        },

        AliasSubcommand::Add(cmd) => {
            let forward = required("forward address", cmd.forward)?;
            let mut alias = Alias::new(&cmd.alias, &cmd.domain, &forward)?;
            if let Some(active) = cmd.active {
                alias.set_active(active);
            }
            if let Some(description) = cmd.description {
                alias.set_description(non_empty(description));
            }
            store.persist(&mut alias)?;
            Ok(format!(
                "Alias '{}' -> '{}' added\n",
                alias.alias(),
                alias.forward_address()
            ))
        },

        AliasSubcommand::Edit(cmd) => {
            let mut alias = store.fetch_alias(&cmd.alias)?;
            if let Some(active) = cmd.active {
                alias.set_active(active);
            }
            if let Some(description) = cmd.description {
                alias.set_description(non_empty(description));
            }
            if let Some(forward) = cmd.forward {
                alias.set_forward_address(required("forward address", forward)?);
            }

            Ok(match store.persist(&mut alias)? {
                Persisted::Unchanged => {
                    format!("Alias '{}' unchanged\n", alias.alias())
                },
                _ => format!("Alias '{}' updated\n", alias.alias()),
            })
        },

        AliasSubcommand::Delete(cmd) => {
            store.delete_alias(&cmd.alias)?;
            Ok(format!("Alias '{}' deleted\n", cmd.alias))
        },
    }
}

fn table(aliases: &[Alias]) -> Table {
    let mut table = Table::new(vec![
        "Alias",
        "Domain",
        "Forward",
        "Active",
        "Description",
        "Created",
        "Updated",
    ]);
    for a in aliases {
        table.push(vec![
            a.alias().to_owned(),
            a.domain().to_owned(),
            a.forward_address().to_owned(),
            yes_no(a.is_active()),
            a.description().unwrap_or_default().to_owned(),
            a.created_at().to_string(),
            a.updated_at().to_string(),
        ]);
    }
    table
}
