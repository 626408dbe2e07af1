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


use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error};
use structopt::StructOpt;

use super::alias::AliasSubcommand;
use super::domain::DomainSubcommand;
use super::mailbox::MailboxSubcommand;
use crate::crypt::RandomSalt;
use crate::store::Store;
use crate::support::sysexits::*;
use crate::support::system_config::{
    SystemConfig, CONFIG_FILE_NAME, DEFAULT_CONFIG_TOML,
};

/// Manage the virtual domains, mailboxes and aliases of a Postfix and
/// Dovecot installation.
#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
struct Command {
    /// The configuration file to use
    /// [default: the first of ./mailroster.toml,
    /// ~/.mailroster/mailroster.toml, /etc/mailroster/mailroster.toml]
    #[structopt(long, short, parse(from_os_str))]
    config: Option<PathBuf>,

    #[structopt(subcommand)]
    subcommand: Subcommand,
}

#[derive(StructOpt)]
enum Subcommand {
    Domain(DomainSubcommand),
    Mailbox(MailboxSubcommand),
    Alias(AliasSubcommand),
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let cmd = Command::from_clap(&match Command::clap().get_matches_safe() {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        }
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        }
    });

    let config_path = cmd.config.unwrap_or_else(find_config);
    let config = load_config(&config_path);
    let config_dir = config_path.parent().unwrap_or_else(|| Path::new(""));
    init_log(&config, config_dir);
    debug!("Using configuration from '{}'", config_path.display());

    let mut store = match Store::open_configured(&config.db, config_dir) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open database: {}", e);
            die!(e.sysexit(), "{}", e)
        }
    };

    let result = match cmd.subcommand {
        Subcommand::Domain(cmd) => super::domain::run(cmd, &mut store, &config),
        Subcommand::Mailbox(cmd) => {
            super::mailbox::run(cmd, &mut store, &config, &mut RandomSalt)
        },
        Subcommand::Alias(cmd) => super::alias::run(cmd, &mut store),
    };
    drop(store);

    match result {
        Ok(output) => print!("{}", output),
        Err(e) => die!(e.sysexit(), "{}", e),
    }
}

/// The places a configuration file is looked for when none is given, in
/// order of preference.
fn config_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(home) = env::var_os("HOME") {
        candidates.push(
            PathBuf::from(home)
                .join(".mailroster")
                .join(CONFIG_FILE_NAME),
        );
    }
    candidates.push(Path::new("/etc/mailroster").join(CONFIG_FILE_NAME));
    candidates
}

/// Find the configuration file, or write a default one to the current
/// directory and exit if there is none anywhere.
fn find_config() -> PathBuf {
    if let Some(found) = config_candidates().into_iter().find(|p| p.is_file())
    {
        return found;
    }

    if let Err(e) = fs::write(CONFIG_FILE_NAME, DEFAULT_CONFIG_TOML) {
        die!(
            EX_CANTCREAT,
            "No configuration file found, and writing a default one to \
             '{}' failed: {}",
            CONFIG_FILE_NAME,
            e
        );
    }

    die!(
        EX_CONFIG,
        "No configuration file found. A default configuration has been \
         written to '{}';\nreview it and run the command again.",
        CONFIG_FILE_NAME
    )
}

fn load_config(path: &Path) -> SystemConfig {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => die!(EX_CONFIG, "Error reading '{}': {}", path.display(), e),
    };

    match toml::from_str(&text) {
        Ok(config) => config,
        Err(e) => die!(
            EX_CONFIG,
            "Error in config file at '{}': {}",
            path.display(),
            e
        ),
    }
}

fn init_log(config: &SystemConfig, config_dir: &Path) {
    let log_config_file = config_dir.join("logging.toml");
    if Ok(true) == nix::unistd::isatty(2) || !log_config_file.is_file() {
        // Running interactively or without a logging configuration; just
        // write to stderr.
        crate::init_simple_log(config.log.level_filter());
    } else if let Err(e) =
        log4rs::init_file(&log_config_file, Default::default())
    {
        die!(
            EX_CONFIG,
            "Failed to initialise logging from '{}': {}",
            log_config_file.display(),
            e
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn working_directory_is_searched_first() {
        let candidates = config_candidates();
        assert_eq!(PathBuf::from("mailroster.toml"), candidates[0]);
        assert_eq!(
            PathBuf::from("/etc/mailroster/mailroster.toml"),
            *candidates.last().unwrap()
        );
    }

    #[test]
    fn command_line_parses() {
        let cmd = Command::from_iter_safe(&[
            "mailroster",
            "--config",
            "/tmp/x.toml",
            "mailbox",
            "add",
            "jane@example.com",
            "secret",
            "example.com",
            "--pwdscheme",
            "md5crypt",
        ])
        .unwrap();
        assert_eq!(Some(PathBuf::from("/tmp/x.toml")), cmd.config);
        assert!(matches!(cmd.subcommand, Subcommand::Mailbox(..)));

        assert!(Command::from_iter_safe(&[
            "mailroster",
            "mailbox",
            "add",
            "jane@example.com",
            "secret",
            "example.com",
            "--pwdscheme",
            "sha1",
        ])
        .is_err());

        assert!(Command::from_iter_safe(&[
            "mailroster",
            "domain",
            "list",
            "--active",
            "sometimes",
        ])
        .is_err());
    }
}
