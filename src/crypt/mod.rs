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

//! Password digests as Dovecot reads them.
//!
//! Two schemes are supported: bcrypt (`BLF-CRYPT`), which is what anything
//! new should use, and MD5-crypt (`MD5-CRYPT`), which exists to keep
//! password files from older tooling working. Neither is picked here by
//! default; callers always say which one they want.
//!
//! Digests are stored exactly as the scheme produces them (`$2b$...`,
//! `$1$...`), so the scheme can always be recovered from the digest itself.

pub mod blf_crypt;
pub mod md5_crypt;

use std::fmt;
use std::str::FromStr;

use rand::{rngs::OsRng, Rng};
use serde::{Deserialize, Serialize};

use crate::support::error::Error;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Scheme {
    BlfCrypt,
    Md5Crypt,
}

impl Scheme {
    /// The name Dovecot uses for this scheme in `{SCHEME}` prefixes.
    pub fn dovecot_name(self) -> &'static str {
        match self {
            Scheme::BlfCrypt => "BLF-CRYPT",
            Scheme::Md5Crypt => "MD5-CRYPT",
        }
    }

    /// Determine which scheme produced `digest`, if any.
    pub fn of_digest(digest: &str) -> Option<Self> {
        if digest.starts_with(md5_crypt::MAGIC) {
            Some(Scheme::Md5Crypt)
        } else if blf_crypt::PREFIXES.iter().any(|p| digest.starts_with(p)) {
            Some(Scheme::BlfCrypt)
        } else {
            None
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.dovecot_name())
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "blf-crypt" | "blfcrypt" | "bcrypt" => Ok(Scheme::BlfCrypt),
            "md5-crypt" | "md5crypt" => Ok(Scheme::Md5Crypt),
            _ => Err(Error::UnknownScheme(s.to_owned())),
        }
    }
}

/// Supplies salts to schemes which do not generate their own.
pub trait SaltSource {
    fn salt(&mut self) -> String;
}

/// Generates 8-character salts from the crypt alphabet using the OS RNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomSalt;

impl SaltSource for RandomSalt {
    fn salt(&mut self) -> String {
        let data: [u8; md5_crypt::MAX_SALT_LEN] = OsRng.gen();
        data.iter()
            .map(|&b| char::from(md5_crypt::ALPHABET[(b & 0x3f) as usize]))
            .collect()
    }
}

/// Hash with the adaptive scheme (bcrypt, cost 10).
pub fn hash_adaptive(plaintext: &str) -> Result<String, Error> {
    blf_crypt::hash(plaintext.as_bytes())
}

/// Returns `Ok` exactly when `plaintext` matches `digest`.
pub fn verify_adaptive(digest: &str, plaintext: &str) -> Result<(), Error> {
    blf_crypt::verify(digest, plaintext.as_bytes())
}

/// Hash with the legacy MD5-crypt scheme.
pub fn hash_legacy_iterated(
    plaintext: &str,
    salt: &str,
) -> Result<String, Error> {
    md5_crypt::hash(plaintext.as_bytes(), salt)
}

/// Returns `Ok` exactly when `plaintext` matches `digest`. The salt is taken
/// from `digest`.
pub fn verify_legacy_iterated(
    digest: &str,
    plaintext: &str,
) -> Result<(), Error> {
    md5_crypt::verify(digest, plaintext.as_bytes())
}

/// Hash `plaintext` with the given scheme, drawing a salt from `salts` if the
/// scheme needs one.
pub fn hash(
    scheme: Scheme,
    plaintext: &str,
    salts: &mut dyn SaltSource,
) -> Result<String, Error> {
    match scheme {
        Scheme::BlfCrypt => hash_adaptive(plaintext),
        Scheme::Md5Crypt => hash_legacy_iterated(plaintext, &salts.salt()),
    }
}

/// Verify `plaintext` against `digest`, whatever scheme produced it.
///
/// A leading Dovecot `{SCHEME}` tag is accepted, but must agree with the
/// digest itself.
pub fn verify(digest: &str, plaintext: &str) -> Result<(), Error> {
    let (tagged, digest) = split_scheme_tag(digest)?;
    let scheme = Scheme::of_digest(digest).ok_or_else(|| {
        Error::UnknownScheme(digest.chars().take(4).collect())
    })?;

    if tagged.map_or(false, |t| t != scheme) {
        return Err(Error::MalformedDigest);
    }

    match scheme {
        Scheme::BlfCrypt => verify_adaptive(digest, plaintext),
        Scheme::Md5Crypt => verify_legacy_iterated(digest, plaintext),
    }
}

fn split_scheme_tag(digest: &str) -> Result<(Option<Scheme>, &str), Error> {
    let Some(rest) = digest.strip_prefix('{') else {
        return Ok((None, digest));
    };

    let (tag, rest) = rest.split_once('}').ok_or(Error::MalformedDigest)?;
    Ok((Some(tag.parse()?), rest))
}
