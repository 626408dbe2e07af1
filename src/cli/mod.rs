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


macro_rules! die {
    ($ex:expr, $($stuff:tt)*) => {{
        eprintln!($($stuff)*);
        $ex.exit()
    }}
}

mod alias;
mod domain;
pub mod main;
mod mailbox;
mod table;

use crate::support::error::Error;

/// Parse a boolean flag value the way people tend to write them.
fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "y" | "yes" | "on" => Ok(true),
        "0" | "f" | "false" | "n" | "no" | "off" => Ok(false),
        _ => Err(format!("Not a boolean: {}", s)),
    }
}

/// An empty string on the command line clears an optional column.
fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Required columns can be changed but not cleared.
fn required(what: &str, s: String) -> Result<String, Error> {
    if s.is_empty() {
        Err(Error::InvalidName(format!("{} must not be empty", what)))
    } else {
        Ok(s)
    }
}

fn yes_no(b: bool) -> String {
    String::from(if b { "yes" } else { "no" })
}
