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
use crate::crypt::{self, SaltSource, Scheme};
use crate::store::types::FromRow;
use crate::support::error::Error;
use crate::support::safe_name::{is_safe_domain, split_address};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MailboxField {
    Description,
    Domain,
    Password,
    MailDir,
    LocalPart,
    RelayDomain,
    Quota,
    Active,
}

impl Field for MailboxField {
    fn column(self) -> &'static str {
        match self {
            MailboxField::Description => "desc",
            MailboxField::Domain => "domain",
            MailboxField::Password => "pwd",
            MailboxField::MailDir => "mail_dir",
            MailboxField::LocalPart => "local_part",
            MailboxField::RelayDomain => "relay_domain",
            MailboxField::Quota => "quota",
            MailboxField::Active => "active",
        }
    }
}

/// A deliverable mailbox, as Dovecot's `passdb`/`userdb` and Postfix's
/// `virtual_mailbox_maps` see it.
#[derive(Clone, Debug)]
pub struct Mailbox {
    mail: String,
    description: Option<String>,
    domain: String,
    /// The password digest, never the password itself.
    password: String,
    mail_dir: String,
    local_part: String,
    relay_domain: Option<String>,
    quota: Option<String>,
    active: bool,
    state: RecordState<MailboxField>,
}

impl Mailbox {
    /// Start a new, active mailbox for `mail` within `domain`.
    ///
    /// `mail` must be an address within `domain`. The local part defaults to
    /// everything before the `@` in `mail`, and the mail directory to
    /// `<domain>/<local part>/`. A password must still be set before the
    /// mailbox can be persisted.
    pub fn new(mail: &str, domain: &str) -> Result<Self, Error> {
        let (local_part, mail_domain) = split_address(mail, false)
            .ok_or_else(|| Error::InvalidName(mail.to_owned()))?;
        if !is_safe_domain(domain) {
            return Err(Error::InvalidName(domain.to_owned()));
        }
        if !mail_domain.eq_ignore_ascii_case(domain) {
            return Err(Error::InvalidName(format!(
                "{} is not in domain {}",
                mail, domain
            )));
        }

        let mut this = Self {
            mail: mail.to_owned(),
            description: None,
            domain: String::new(),
            password: String::new(),
            mail_dir: String::new(),
            local_part: String::new(),
            relay_domain: None,
            quota: None,
            active: true,
            state: RecordState::new(),
        };

        let mail_dir = format!("{}/{}/", domain, local_part);
        let local_part = local_part.to_owned();
        this.set_domain(domain.to_owned())
            .set_local_part(local_part)
            .set_mail_dir(mail_dir);
        Ok(this)
    }

    pub fn mail(&self) -> &str {
        &self.mail
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn password_digest(&self) -> &str {
        &self.password
    }

    pub fn mail_dir(&self) -> &str {
        &self.mail_dir
    }

    pub fn local_part(&self) -> &str {
        &self.local_part
    }

    pub fn relay_domain(&self) -> Option<&str> {
        self.relay_domain.as_deref()
    }

    pub fn quota(&self) -> Option<&str> {
        self.quota.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_description(&mut self, description: Option<String>) -> &mut Self {
        self.state.assign(
            MailboxField::Description,
            &mut self.description,
            description,
        );
        self
    }

    pub fn set_domain(&mut self, domain: String) -> &mut Self {
        self.state
            .assign(MailboxField::Domain, &mut self.domain, domain);
        self
    }

    /// Replace the password with a digest of `plaintext` under `scheme`.
    pub fn set_password(
        &mut self,
        plaintext: &str,
        scheme: Scheme,
        salts: &mut dyn SaltSource,
    ) -> Result<&mut Self, Error> {
        let digest = crypt::hash(scheme, plaintext, salts)?;
        self.state
            .assign(MailboxField::Password, &mut self.password, digest);
        Ok(self)
    }

    /// Returns `Ok` exactly when `plaintext` is this mailbox's password.
    pub fn check_password(&self, plaintext: &str) -> Result<(), Error> {
        crypt::verify(&self.password, plaintext)
    }

    pub fn set_mail_dir(&mut self, mail_dir: String) -> &mut Self {
        self.state
            .assign(MailboxField::MailDir, &mut self.mail_dir, mail_dir);
        self
    }

    pub fn set_local_part(&mut self, local_part: String) -> &mut Self {
        self.state.assign(
            MailboxField::LocalPart,
            &mut self.local_part,
            local_part,
        );
        self
    }

    pub fn set_relay_domain(
        &mut self,
        relay_domain: Option<String>,
    ) -> &mut Self {
        self.state.assign(
            MailboxField::RelayDomain,
            &mut self.relay_domain,
            relay_domain,
        );
        self
    }

    pub fn set_quota(&mut self, quota: Option<String>) -> &mut Self {
        self.state
            .assign(MailboxField::Quota, &mut self.quota, quota);
        self
    }

    pub fn set_active(&mut self, active: bool) -> &mut Self {
        self.state
            .assign(MailboxField::Active, &mut self.active, active);
        self
    }
}

impl Record for Mailbox {
    type Field = MailboxField;
    const TABLE: &'static str = "mailbox";
    const KEY_COLUMN: &'static str = "mail";

    fn key(&self) -> &str {
        &self.mail
    }

    fn state(&self) -> &RecordState<MailboxField> {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RecordState<MailboxField> {
        &mut self.state
    }
}

impl FromRow for Mailbox {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            mail: row.get("mail")?,
            description: row.get("desc")?,
            domain: row.get("domain")?,
            password: row.get("pwd")?,
            mail_dir: row.get("mail_dir")?,
            local_part: row.get("local_part")?,
            relay_domain: row.get("relay_domain")?,
            quota: row.get("quota")?,
            active: row.get("active")?,
            state: RecordState::loaded(row.get("crt_dat")?, row.get("upd_dat")?),
        })
    }
}

/// Criteria for listing mailboxes. Unset criteria match everything; the
/// string criteria are SQL `LIKE` patterns.
#[derive(Clone, Debug, Default)]
pub struct MailboxFilter {
    pub domain_like: Option<String>,
    pub mail_dir_like: Option<String>,
    pub local_part_like: Option<String>,
    pub relay_domain_like: Option<String>,
    pub quota_like: Option<String>,
    pub active: Option<bool>,
}
