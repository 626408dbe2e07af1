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

//! The bcrypt password scheme (Dovecot's `BLF-CRYPT`).

use crate::support::error::Error;

/// The work factor. Each increment doubles the cost of a hash.
pub const COST: u32 = 10;

/// bcrypt only ever looks at this many bytes of the password.
pub const MAX_PASSWORD_LEN: usize = 72;

pub const PREFIXES: &[&str] = &["$2a$", "$2b$", "$2x$", "$2y$"];

/// Hash `plaintext` with a fresh random salt.
///
/// Passwords longer than `MAX_PASSWORD_LEN` are rejected, not truncated.
pub fn hash(plaintext: &[u8]) -> Result<String, Error> {
    if plaintext.len() > MAX_PASSWORD_LEN {
        return Err(Error::HashingFailed(format!(
            "password is {} bytes long, but {} is the maximum",
            plaintext.len(),
            MAX_PASSWORD_LEN,
        )));
    }

    bcrypt::hash(plaintext, COST).map_err(|e| Error::HashingFailed(e.to_string()))
}

pub fn verify(stored: &str, plaintext: &[u8]) -> Result<(), Error> {
    if !PREFIXES.iter().any(|p| stored.starts_with(p)) {
        return Err(Error::MalformedDigest);
    }

    if plaintext.len() > MAX_PASSWORD_LEN {
        return Err(Error::PasswordMismatch);
    }

    match bcrypt::verify(plaintext, stored) {
        Ok(true) => Ok(()),
        Ok(false) => Err(Error::PasswordMismatch),
        Err(_) => Err(Error::MalformedDigest),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let stored = hash(b"hunter2").unwrap();
        assert!(stored.starts_with("$2"));
        assert!(stored.contains("$10$"));
        verify(&stored, b"hunter2").unwrap();
        assert_matches!(
            Err(Error::PasswordMismatch),
            verify(&stored, b"hunter3")
        );
    }

    #[test]
    fn salt_is_fresh_each_time() {
        assert_ne!(hash(b"hunter2").unwrap(), hash(b"hunter2").unwrap());
    }

    #[test]
    fn overlong_password_rejected() {
        hash(&[b'x'; MAX_PASSWORD_LEN]).unwrap();
        assert_matches!(
            Err(Error::HashingFailed(_)),
            hash(&[b'x'; MAX_PASSWORD_LEN + 1])
        );
    }

    #[test]
    fn empty_password() {
        let stored = hash(b"").unwrap();
        verify(&stored, b"").unwrap();
        assert!(verify(&stored, b" ").is_err());
    }

    #[test]
    fn malformed_digest() {
        assert_matches!(
            Err(Error::MalformedDigest),
            verify("$1$saltsalt$5Jhcit4zN9UlGiA0txPkO0", b"")
        );
        assert_matches!(
            Err(Error::MalformedDigest),
            verify("$2b$10$tooshort", b"")
        );
    }
}
