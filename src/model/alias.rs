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

use super::record::*;
use crate::store::types::FromRow;
use crate::support::error::Error;
use crate::support::safe_name::{is_safe_domain, split_address};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AliasField {
    Description,
    Domain,
    ForwardAddress,
    Active,
}

impl Field for AliasField {
    fn column(self) -> &'static str {
        match self {
            AliasField::Description => "desc",
            AliasField::Domain => "domain",
            AliasField::ForwardAddress => "forward_address",
            AliasField::Active => "active",
        }
    }
}

/// Forwards mail for one address (or, as `@domain`, a whole domain) to one
/// or more others.
#[derive(Clone, Debug)]
pub struct Alias {
    alias: String,
    description: Option<String>,
    domain: String,
    /// Comma-separated, as Postfix's `virtual_alias_maps` expects.
    forward_address: String,
    active: bool,
    state: RecordState<AliasField>,
}

impl Alias {
    /// Start a new, active alias forwarding `alias` in `domain` to
    /// `forward_address`. `alias` must be an address within `domain`.
    pub fn new(
        alias: &str,
        domain: &str,
        forward_address: &str,
    ) -> Result<Self, Error> {
        let (_, alias_domain) = split_address(alias, true)
            .ok_or_else(|| Error::InvalidName(alias.to_owned()))?;
        if !is_safe_domain(domain) {
            return Err(Error::InvalidName(domain.to_owned()));
        }
        if !alias_domain.eq_ignore_ascii_case(domain) {
            return Err(Error::InvalidName(format!(
                "{} is not in domain {}",
                alias, domain
            )));
        }

        let mut this = Self {
            alias: alias.to_owned(),
            description: None,
            domain: String::new(),
            forward_address: String::new(),
            active: true,
            state: RecordState::new(),
        };
        this.set_domain(domain.to_owned())
            .set_forward_address(forward_address.to_owned());
        Ok(this)
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn forward_address(&self) -> &str {
        &self.forward_address
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether this alias catches all mail to its domain.
    pub fn is_catch_all(&self) -> bool {
        self.alias.starts_with('@')
    }

    pub fn set_description(&mut self, description: Option<String>) -> &mut Self {
        self.state.assign(
            AliasField::Description,
            &mut self.description,
            description,
        );
        self
    }

    pub fn set_domain(&mut self, domain: String) -> &mut Self {
        self.state.assign(AliasField::Domain, &mut self.domain, domain);
        self
    }

    pub fn set_forward_address(&mut self, forward_address: String) -> &mut Self {
        self.state.assign(
            AliasField::ForwardAddress,
            &mut self.forward_address,
            forward_address,
        );
        self
    }

    pub fn set_active(&mut self, active: bool) -> &mut Self {
        self.state.assign(AliasField::Active, &mut self.active, active);
        self
    }
}

impl Record for Alias {
    type Field = AliasField;
    const TABLE: &'static str = "alias";
    const KEY_COLUMN: &'static str = "alias";

    fn key(&self) -> &str {
        &self.alias
    }

    fn state(&self) -> &RecordState<AliasField> {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RecordState<AliasField> {
        &mut self.state
    }
}

impl FromRow for Alias {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            alias: row.get("alias")?,
            description: row.get("desc")?,
            domain: row.get("domain")?,
            forward_address: row.get("forward_address")?,
            active: row.get("active")?,
            state: RecordState::loaded(row.get("crt_dat")?, row.get("upd_dat")?),
        })
    }
}

/// Criteria for listing aliases. The string criteria are SQL `LIKE`
/// patterns.
#[derive(Clone, Debug, Default)]
pub struct AliasFilter {
    pub domain_like: Option<String>,
    pub forward_like: Option<String>,
    pub active: Option<bool>,
}
