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


use log::warn;
use structopt::StructOpt;

use super::table::Table;
use super::{non_empty, parse_bool, required, yes_no};
use crate::crypt::{SaltSource, Scheme};
use crate::model::mailbox::{Mailbox, MailboxFilter};
use crate::model::record::{Persisted, Record};
use crate::store::Store;
use crate::support::error::Error;
use crate::support::system_config::SystemConfig;

/// Add, change and manage mailboxes.
#[derive(StructOpt)]
pub(super) enum MailboxSubcommand {
    /// List mailboxes.
    List(MailboxListCommand),
    /// Add a new mailbox to the given domain.
    Add(MailboxAddCommand),
    /// Edit an existing mailbox.
    Edit(MailboxEditCommand),
    /// Delete a mailbox.
    ///
    /// This only removes the mailbox from the database; the mail directory
    /// is left alone.
    Delete(MailboxDeleteCommand),
}

#[derive(StructOpt)]
pub(super) struct MailboxListCommand {
    /// Only list active (true) or inactive (false) mailboxes.
    #[structopt(long, short, parse(try_from_str = parse_bool))]
    active: Option<bool>,

    /// Only list mailboxes whose domain matches this SQL LIKE pattern.
    #[structopt(long, short)]
    domain: Option<String>,

    /// Only list mailboxes whose mail directory matches this SQL LIKE
    /// pattern.
    #[structopt(long)]
    maildir: Option<String>,

    /// Only list mailboxes whose local part matches this SQL LIKE pattern.
    #[structopt(long)]
    localpart: Option<String>,

    /// Only list mailboxes whose relay domain matches this SQL LIKE pattern.
    #[structopt(long)]
    relaydomain: Option<String>,

    /// Only list mailboxes whose quota matches this SQL LIKE pattern.
    #[structopt(long)]
    quota: Option<String>,
}

#[derive(StructOpt)]
pub(super) struct MailboxOptions {
    /// Whether the mailbox is active.
    #[structopt(long, short, parse(try_from_str = parse_bool))]
    active: Option<bool>,

    /// Description of the mailbox. An empty string removes it.
    #[structopt(long, short)]
    description: Option<String>,

    /// The mail directory [default on add: <domain>/<local part>/]
    #[structopt(long, short)]
    maildir: Option<String>,

    /// The local part; better not change this [default on add: the part of
    /// the address before the @]
    #[structopt(long, short)]
    localpart: Option<String>,

    /// Relay domain. An empty string removes it.
    #[structopt(long, short)]
    relaydomain: Option<String>,

    /// Quota for this mailbox. An empty string removes it.
    #[structopt(long, short)]
    quota: Option<String>,

    /// Password hashing scheme (md5crypt or bcrypt) [default: from the
    /// configuration]
    #[structopt(long, short = "s")]
    pwdscheme: Option<Scheme>,
}

#[derive(StructOpt)]
pub(super) struct MailboxAddCommand {
    /// The full mail address.
    mail: String,
    /// The password, in clear.
    password: String,
    /// The domain the mailbox belongs to, which must already exist.
    domain: String,

    #[structopt(flatten)]
    options: MailboxOptions,
}

#[derive(StructOpt)]
pub(super) struct MailboxEditCommand {
    /// The full mail address.
    mail: String,

    /// A new password, in clear.
    #[structopt(long, short)]
    password: Option<String>,

    #[structopt(flatten)]
    options: MailboxOptions,
}

#[derive(StructOpt)]
pub(super) struct MailboxDeleteCommand {
    /// The full mail address.
    mail: String,
}

/// Run `cmd`, returning what should be printed.
pub(super) fn run(
    cmd: MailboxSubcommand,
    store: &mut Store,
    config: &SystemConfig,
    salts: &mut dyn SaltSource,
) -> Result<String, Error> {
    match cmd {
        MailboxSubcommand::List(cmd) => {
            let mailboxes = store.list_mailboxes(&MailboxFilter {
                domain_like: cmd.domain,
                mail_dir_like: cmd.maildir,
                local_part_like: cmd.localpart,
                relay_domain_like: cmd.relaydomain,
                quota_like: cmd.quota,
                active: cmd.active,
            })?;
            Ok(table(&mailboxes).render())
        },

        MailboxSubcommand::Add(cmd) => {
            let mut mailbox = Mailbox::new(&cmd.mail, &cmd.domain)?;
            let scheme = cmd.options.pwdscheme.unwrap_or(config.defaults.scheme);
            mailbox.set_password(&cmd.password, scheme, salts)?;
            apply(cmd.options, &mut mailbox)?;
            store.persist(&mut mailbox)?;
            Ok(format!(
                "Mailbox '{}' added with {} password\n",
                mailbox.mail(),
                scheme
            ))
        },

        MailboxSubcommand::Edit(cmd) => {
            let mut mailbox = store.fetch_mailbox(&cmd.mail)?;
            match (cmd.password, cmd.options.pwdscheme) {
                (Some(password), scheme) => {
                    let scheme = scheme.unwrap_or(config.defaults.scheme);
                    mailbox.set_password(&password, scheme, salts)?;
                },
                (None, Some(scheme)) => warn!(
                    "Ignoring password scheme {} since no new password was given",
                    scheme
                ),
                (None, None) => (),
            }
            apply(cmd.options, &mut mailbox)?;

            Ok(match store.persist(&mut mailbox)? {
                Persisted::Unchanged => {
                    format!("Mailbox '{}' unchanged\n", mailbox.mail())
                },
                _ => format!("Mailbox '{}' updated\n", mailbox.mail()),
            })
        },

        MailboxSubcommand::Delete(cmd) => {
            store.delete_mailbox(&cmd.mail)?;
            Ok(format!("Mailbox '{}' deleted\n", cmd.mail))
        },
    }
}

/// Apply the options which were actually given to `mailbox`.
fn apply(options: MailboxOptions, mailbox: &mut Mailbox) -> Result<(), Error> {
    if let Some(active) = options.active {
        mailbox.set_active(active);
    }
    if let Some(description) = options.description {
        mailbox.set_description(non_empty(description));
    }
    if let Some(maildir) = options.maildir {
        mailbox.set_mail_dir(required("mail directory", maildir)?);
    }
    if let Some(localpart) = options.localpart {
        mailbox.set_local_part(required("local part", localpart)?);
    }
    if let Some(relaydomain) = options.relaydomain {
        mailbox.set_relay_domain(non_empty(relaydomain));
    }
    if let Some(quota) = options.quota {
        mailbox.set_quota(non_empty(quota));
    }
    Ok(())
}

fn table(mailboxes: &[Mailbox]) -> Table {
    let mut table = Table::new(vec![
        "Mail",
        "Domain",
        "Local part",
        "Mail dir",
        "Relay domain",
        "Quota",
        "Scheme",
        "Active",
        "Description",
        "Created",
        "Updated",
    ]);
    for m in mailboxes {
        table.push(vec![
            m.mail().to_owned(),
            m.domain().to_owned(),
            m.local_part().to_owned(),
            m.mail_dir().to_owned(),
            m.relay_domain().unwrap_or_default().to_owned(),
            m.quota().unwrap_or_default().to_owned(),
            Scheme::of_digest(m.password_digest())
                .map_or_else(|| "?".to_owned(), |s| s.to_string()),
            yes_no(m.is_active()),
            m.description().unwrap_or_default().to_owned(),
            m.created_at().to_string(),
            m.updated_at().to_string(),
        ]);
    }
    table
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::model::domain::Domain;

    struct FixedSalt;

    impl SaltSource for FixedSalt {
        fn salt(&mut self) -> String {
            "saltsalt".to_owned()
        }
    }

    fn run_args(
        store: &mut Store,
        args: &[&str],
    ) -> Result<String, Error> {
        let cmd = MailboxSubcommand::from_iter_safe(
            std::iter::once("mailbox").chain(args.iter().copied()),
        )
        .unwrap();
        run(cmd, store, &SystemConfig::default(), &mut FixedSalt)
    }

    fn set_up(tmpdir: &TempDir) -> Store {
        crate::init_test_log();
        let mut store = Store::open(
            &tmpdir.path().join("db.sqlite"),
            Duration::from_secs(1),
        )
        .unwrap();
        store
            .persist(&mut Domain::new("example.com").unwrap())
            .unwrap();
        store
    }

    #[test]
    fn add_uses_configured_scheme_by_default() {
        let tmpdir = TempDir::new().unwrap();
        let mut store = set_up(&tmpdir);

        let out = run_args(
            &mut store,
            &["add", "jane@example.com", "test", "example.com", "-q", "1G"],
        )
        .unwrap();
        assert_eq!(
            "Mailbox 'jane@example.com' added with MD5-CRYPT password\n",
            out
        );

        let mailbox = store.fetch_mailbox("jane@example.com").unwrap();
        assert_eq!("$1$saltsalt$tTWg0JeO/sYmHvtKmZE8c.", mailbox.password_digest());
        assert_eq!(Some("1G"), mailbox.quota());
        assert_eq!("example.com/jane/", mailbox.mail_dir());
        assert!(mailbox.is_active());
    }

    #[test]
    fn add_with_explicit_options() {
        let tmpdir = TempDir::new().unwrap();
        let mut store = set_up(&tmpdir);

        run_args(
            &mut store,
            &[
                "add",
                "joe@example.com",
                "hunter2",
                "example.com",
                "--pwdscheme",
                "bcrypt",
                "--maildir",
                "/var/mail/joe/",
                "--active",
                "false",
                "--relaydomain",
                "relay.example.com",
            ],
        )
        .unwrap();

        let mailbox = store.fetch_mailbox("joe@example.com").unwrap();
        assert_eq!(
            Some(Scheme::BlfCrypt),
            Scheme::of_digest(mailbox.password_digest())
        );
        mailbox.check_password("hunter2").unwrap();
        assert_eq!("/var/mail/joe/", mailbox.mail_dir());
        assert_eq!(Some("relay.example.com"), mailbox.relay_domain());
        assert!(!mailbox.is_active());

        let listed =
            run_args(&mut store, &["list", "--active", "false"]).unwrap();
        assert!(listed.contains("joe@example.com"));
        assert!(listed.contains("BLF-CRYPT"));
        let listed = run_args(&mut store, &["list", "--active", "true"]).unwrap();
        assert!(!listed.contains("joe@example.com"));
    }

    #[test]
    fn add_to_unknown_domain() {
        let tmpdir = TempDir::new().unwrap();
        let mut store = set_up(&tmpdir);
        assert_matches!(
            Err(Error::ConstraintViolation(_)),
            run_args(&mut store, &["add", "jane@example.org", "x", "example.org"])
        );
    }

    #[test]
    fn add_outside_domain_rejected() {
        let tmpdir = TempDir::new().unwrap();
        let mut store = set_up(&tmpdir);
        store
            .persist(&mut Domain::new("other.com").unwrap())
            .unwrap();
        assert_matches!(
            Err(Error::InvalidName(_)),
            run_args(&mut store, &["add", "jane@example.com", "x", "other.com"])
        );
        assert_matches!(
            Err(Error::NotFound),
            store.fetch_mailbox("jane@example.com")
        );
    }

    #[test]
    fn edit_only_touches_given_options() {
        let tmpdir = TempDir::new().unwrap();
        let mut store = set_up(&tmpdir);
        run_args(
            &mut store,
            &["add", "jane@example.com", "test", "example.com", "-q", "1G"],
        )
        .unwrap();
        let before = store.fetch_mailbox("jane@example.com").unwrap();

        assert_eq!(
            "Mailbox 'jane@example.com' unchanged\n",
            run_args(&mut store, &["edit", "jane@example.com", "-q", "1G"])
                .unwrap()
        );

        run_args(
            &mut store,
            &["edit", "jane@example.com", "-p", "new", "-q", ""],
        )
        .unwrap();
        let after = store.fetch_mailbox("jane@example.com").unwrap();
        assert_eq!(None, after.quota());
        after.check_password("new").unwrap();
        assert_eq!(before.mail_dir(), after.mail_dir());
        assert_eq!(before.created_at(), after.created_at());
        assert!(after.updated_at() > before.updated_at());

        assert_matches!(
            Err(Error::InvalidName(_)),
            run_args(&mut store, &["edit", "jane@example.com", "-m", ""])
        );
    }

    #[test]
    fn delete() {
        let tmpdir = TempDir::new().unwrap();
        let mut store = set_up(&tmpdir);
        run_args(
            &mut store,
            &["add", "jane@example.com", "test", "example.com"],
        )
        .unwrap();
        run_args(&mut store, &["delete", "jane@example.com"]).unwrap();
        assert_matches!(
            Err(Error::NotFound),
            run_args(&mut store, &["delete", "jane@example.com"])
        );
    }
}
