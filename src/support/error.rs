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

use std::io;

use thiserror::Error;

use super::sysexits::*;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),
    #[error("Password does not match")]
    PasswordMismatch,
    #[error("Stored password digest is malformed")]
    MalformedDigest,
    #[error("Unknown password scheme: {0}")]
    UnknownScheme(String),
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error(
        "Record was modified concurrently since it was loaded; \
         re-run the command"
    )]
    ConcurrentModification,
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("No such record")]
    NotFound,
    #[error(
        "Domain still has {mailboxes} mailbox(es) and {aliases} alias(es); \
         delete those first"
    )]
    DomainInUse { mailboxes: i64, aliases: i64 },
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error(transparent)]
    Sqlite(rusqlite::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Ssl(#[from] openssl::error::ErrorStack),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode as C;

        let failure = match e {
            rusqlite::Error::QueryReturnedNoRows => return Error::NotFound,
            rusqlite::Error::SqliteFailure(ref f, ref msg) => Some((
                f.code,
                msg.clone().unwrap_or_else(|| f.to_string()),
            )),
            _ => None,
        };

        match failure {
            Some((C::ConstraintViolation, msg)) => {
                Error::ConstraintViolation(msg)
            },
            Some((
                C::CannotOpen
                | C::DatabaseBusy
                | C::DatabaseLocked
                | C::NotADatabase
                | C::SystemIoFailure
                | C::PermissionDenied,
                msg,
            )) => Error::StoreUnavailable(msg),
            _ => Error::Sqlite(e),
        }
    }
}

impl Error {
    /// The `sysexits.h` code the process should exit with when a command
    /// fails with this error.
    pub fn sysexit(&self) -> Sysexit {
        match *self {
            Error::NotFound => EX_NOUSER,
            Error::ConstraintViolation(..)
            | Error::DomainInUse { .. }
            | Error::HashingFailed(..)
            | Error::PasswordMismatch
            | Error::MalformedDigest => EX_DATAERR,
            Error::ConcurrentModification => EX_TEMPFAIL,
            Error::StoreUnavailable(..) => EX_UNAVAILABLE,
            Error::InvalidName(..) | Error::UnknownScheme(..) => EX_USAGE,
            Error::Io(..) => EX_IOERR,
            Error::Sqlite(..) | Error::Ssl(..) => EX_SOFTWARE,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sqlite_failure(code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(code),
            Some("boom".to_owned()),
        )
    }

    #[test]
    fn classifies_sqlite_errors() {
        assert_matches!(
            Error::ConstraintViolation(_),
            Error::from(sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT))
        );
        assert_matches!(
            Error::StoreUnavailable(_),
            Error::from(sqlite_failure(rusqlite::ffi::SQLITE_CANTOPEN))
        );
        assert_matches!(
            Error::StoreUnavailable(_),
            Error::from(sqlite_failure(rusqlite::ffi::SQLITE_BUSY))
        );
        assert_matches!(
            Error::Sqlite(_),
            Error::from(sqlite_failure(rusqlite::ffi::SQLITE_MISMATCH))
        );
        assert_matches!(
            Error::NotFound,
            Error::from(rusqlite::Error::QueryReturnedNoRows)
        );
    }

    #[test]
    fn exit_codes() {
        assert_eq!(EX_TEMPFAIL, Error::ConcurrentModification.sysexit());
        assert_eq!(EX_NOUSER, Error::NotFound.sysexit());
        assert_eq!(
            EX_DATAERR,
            Error::DomainInUse {
                mailboxes: 1,
                aliases: 0
            }
            .sysexit()
        );
    }
}
