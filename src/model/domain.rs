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
use crate::support::safe_name::is_safe_domain;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DomainField {
    Description,
    Active,
}

impl Field for DomainField {
    fn column(self) -> &'static str {
        match self {
            DomainField::Description => "desc",
            DomainField::Active => "active",
        }
    }
}

/// A virtual mail domain.
#[derive(Clone, Debug)]
pub struct Domain {
    name: String,
    description: Option<String>,
    active: bool,
    /// Number of mailboxes in this domain, as of loading. Not stored.
    mailbox_count: i64,
    /// Number of aliases in this domain, as of loading. Not stored.
    alias_count: i64,
    state: RecordState<DomainField>,
}

impl Domain {
    /// Start a new, active domain with the given name.
    pub fn new(name: &str) -> Result<Self, Error> {
        if !is_safe_domain(name) {
            return Err(Error::InvalidName(name.to_owned()));
        }

        Ok(Self {
            name: name.to_owned(),
            description: None,
            active: true,
            mailbox_count: 0,
            alias_count: 0,
            state: RecordState::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn mailbox_count(&self) -> i64 {
        self.mailbox_count
    }

    pub fn alias_count(&self) -> i64 {
        self.alias_count
    }

    pub fn set_description(&mut self, description: Option<String>) -> &mut Self {
        self.state.assign(
            DomainField::Description,
            &mut self.description,
            description,
        );
        self
    }

    pub fn set_active(&mut self, active: bool) -> &mut Self {
        self.state
            .assign(DomainField::Active, &mut self.active, active);
        self
    }
}

impl Record for Domain {
    type Field = DomainField;
    const TABLE: &'static str = "domain";
    const KEY_COLUMN: &'static str = "domain";

    fn key(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &RecordState<DomainField> {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RecordState<DomainField> {
        &mut self.state
    }
}

/// Expects the `mailbox_count` and `alias_count` columns to have been
/// computed by the query.
impl FromRow for Domain {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get("domain")?,
            description: row.get("desc")?,
            active: row.get("active")?,
            mailbox_count: row.get("mailbox_count")?,
            alias_count: row.get("alias_count")?,
            state: RecordState::loaded(row.get("crt_dat")?, row.get("upd_dat")?),
        })
    }
}

/// Criteria for listing domains. Unset criteria match everything.
#[derive(Clone, Debug, Default)]
pub struct DomainFilter {
    /// SQL `LIKE` pattern on the domain name.
    pub name_like: Option<String>,
    pub active: Option<bool>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn new_domain_defaults() {
        let d = Domain::new("example.com").unwrap();
        assert!(d.is_new());
        assert!(!d.is_dirty());
        assert!(d.is_active());
        assert_eq!(None, d.description());
        assert_eq!("example.com", d.key());
    }

    #[test]
    fn rejects_bad_names() {
        assert_matches!(Err(Error::InvalidName(_)), Domain::new(""));
        assert_matches!(Err(Error::InvalidName(_)), Domain::new("a b.com"));
        assert_matches!(Err(Error::InvalidName(_)), Domain::new("%"));
    }

    #[test]
    fn setters_track_changes() {
        let mut d = Domain::new("example.com").unwrap();
        d.set_active(true).set_description(None);
        assert!(!d.is_dirty());

        d.set_description(Some("Example".to_owned())).set_active(false);
        let changed = d.state().changes().fields().collect::<Vec<_>>();
        assert_eq!(vec![DomainField::Description, DomainField::Active], changed);
        assert_eq!(Some("Example"), d.description());
        assert!(!d.is_active());
    }
}
