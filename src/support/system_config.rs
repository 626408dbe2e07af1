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

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypt::Scheme;

/// The name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "mailroster.toml";

/// What gets written out when no configuration file could be found.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("default-config.toml");

/// The configuration for Mailroster.
///
/// This is stored in a file named `mailroster.toml`, which is looked for in
/// the current directory, `~/.mailroster` and `/etc/mailroster`, unless an
/// explicit path is given on the command line.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct SystemConfig {
    #[serde(default)]
    pub log: LogConfig,

    /// Where and how to open the database.
    #[serde(default)]
    pub db: DbConfig,

    /// Defaults applied when creating new records.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// The minimum level of messages written to standard error.
    ///
    /// One of `error`, `warn`, `info`, `debug`, `trace`. Ignored when a
    /// `logging.toml` file sits next to the configuration file, in which case
    /// that file configures log4rs instead.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
        }
    }
}

impl LogConfig {
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Warn)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DbConfig {
    /// The path to the SQLite database.
    ///
    /// Relative paths are relative to the directory containing the
    /// configuration file.
    pub file: PathBuf,

    /// How long to wait for another process holding the database lock before
    /// giving up.
    pub busy_timeout_secs: u64,

    /// If true, a handful of demo domains, mailboxes and aliases are inserted
    /// whenever the database is opened. Rows which already exist are left
    /// alone.
    pub add_demo_data: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            file: "mailroster.sqlite".into(),
            busy_timeout_secs: 10,
            add_demo_data: false,
        }
    }
}

impl DbConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }

    pub fn resolve_file(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.file)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// The password scheme used when a command does not name one.
    pub scheme: Scheme,

    /// Local parts of the aliases created by `domain add --fill`.
    pub aliases: Vec<String>,

    /// Local part of the address that filled-in aliases forward to.
    pub forward_local_part: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            scheme: Scheme::Md5Crypt,
            aliases: vec!["info".to_owned(), "abuse".to_owned()],
            forward_local_part: "root".to_owned(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: SystemConfig = toml::from_str("").unwrap();
        assert_eq!("warn", config.log.level);
        assert_eq!(PathBuf::from("mailroster.sqlite"), config.db.file);
        assert_eq!(Duration::from_secs(10), config.db.busy_timeout());
        assert!(!config.db.add_demo_data);
        assert_eq!(Scheme::Md5Crypt, config.defaults.scheme);
        assert_eq!(vec!["info", "abuse"], config.defaults.aliases);
    }

    #[test]
    fn default_config_file_parses() {
        let config: SystemConfig =
            toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(log::LevelFilter::Warn, config.log.level_filter());
        assert_eq!(Scheme::Md5Crypt, config.defaults.scheme);
        assert_eq!("root", config.defaults.forward_local_part);
    }

    #[test]
    fn partial_sections() {
        let config: SystemConfig = toml::from_str(
            "[db]\n\
             file = \"/var/lib/mail/roster.sqlite\"\n\
             [defaults]\n\
             scheme = \"blf-crypt\"\n",
        )
        .unwrap();
        assert_eq!(
            PathBuf::from("/var/lib/mail/roster.sqlite"),
            config.db.resolve_file(Path::new("/etc/mailroster"))
        );
        assert_eq!(10, config.db.busy_timeout_secs);
        assert_eq!(Scheme::BlfCrypt, config.defaults.scheme);
        assert_eq!(2, config.defaults.aliases.len());
    }

    #[test]
    fn bad_log_level_falls_back_to_warn() {
        let config = LogConfig {
            level: "chatty".to_owned(),
        };
        assert_eq!(log::LevelFilter::Warn, config.level_filter());
    }
}
