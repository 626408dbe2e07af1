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

//! The `$1$` MD5-crypt password scheme (Dovecot's `MD5-CRYPT`).
//!
//! This is the iterated MD5 construction from FreeBSD's `crypt(3)`, which
//! every libc, OpenSSL (`openssl passwd -1`) and Dovecot implement
//! identically. It is only here so that existing password databases keep
//! working; it is far too cheap to brute-force to be used for anything new.
//!
//! The output is `$1$<salt>$<22 symbols>`, where the symbols are a
//! little-endian, permuted base64 of the final 16-byte digest.

use openssl::hash::{Hasher, MessageDigest};

use crate::support::error::Error;

pub const MAGIC: &str = "$1$";
/// Salts longer than this many bytes are silently truncated, as in
/// `crypt(3)`.
pub const MAX_SALT_LEN: usize = 8;
const ROUNDS: u32 = 1000;

pub(super) const ALPHABET: &[u8; 64] =
    b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Order in which digest bytes are packed into 24-bit groups for encoding.
const PERMUTATION: [[usize; 3]; 5] =
    [[0, 6, 12], [1, 7, 13], [2, 8, 14], [3, 9, 15], [4, 10, 5]];

/// Hash `plaintext` with `salt`.
///
/// `salt` may be given bare or as a full `$1$salt$...` string; everything
/// after the first `$` following the magic is ignored, and at most 8 bytes
/// are used. A multi-byte character straddling the 8-byte limit is dropped
/// whole.
pub fn hash(plaintext: &[u8], salt: &str) -> Result<String, Error> {
    let salt = normalise_salt(salt);
    let digest = digest(plaintext, salt.as_bytes())?;

    let mut out = String::with_capacity(MAGIC.len() + salt.len() + 1 + 22);
    out.push_str(MAGIC);
    out.push_str(salt);
    out.push('$');
    encode(&digest, &mut out);
    Ok(out)
}

/// Verify `plaintext` against a stored `$1$salt$hash` digest.
pub fn verify(stored: &str, plaintext: &[u8]) -> Result<(), Error> {
    let salt = stored
        .strip_prefix(MAGIC)
        .and_then(|rest| rest.split_once('$'))
        .map(|(salt, _)| salt)
        .ok_or(Error::MalformedDigest)?;

    let rederived = hash(plaintext, salt)?;
    if rederived.len() == stored.len()
        && openssl::memcmp::eq(rederived.as_bytes(), stored.as_bytes())
    {
        Ok(())
    } else {
        Err(Error::PasswordMismatch)
    }
}

fn normalise_salt(salt: &str) -> &str {
    let salt = salt.strip_prefix(MAGIC).unwrap_or(salt);
    let salt = salt.split('$').next().unwrap_or("");
    let mut end = salt.len().min(MAX_SALT_LEN);
    while !salt.is_char_boundary(end) {
        end -= 1;
    }
    &salt[..end]
}

fn md5(parts: &[&[u8]]) -> Result<[u8; 16], Error> {
    let mut hasher = Hasher::new(MessageDigest::md5())?;
    for part in parts {
        hasher.update(part)?;
    }

    let mut out = [0u8; 16];
    out.copy_from_slice(&hasher.finish()?);
    Ok(out)
}

fn digest(plain: &[u8], salt: &[u8]) -> Result<[u8; 16], Error> {
    let alternate = md5(&[plain, salt, plain])?;

    let mut ctx = Hasher::new(MessageDigest::md5())?;
    ctx.update(plain)?;
    ctx.update(MAGIC.as_bytes())?;
    ctx.update(salt)?;

    let mut remaining = plain.len();
    while remaining > 0 {
        let n = remaining.min(16);
        ctx.update(&alternate[..n])?;
        remaining -= n;
    }

    // Not a typo: a set bit contributes a NUL, a clear bit the first byte of
    // the password.
    let mut bits = Vec::new();
    let mut i = plain.len();
    while i > 0 {
        bits.push(if 1 == i & 1 { 0 } else { plain[0] });
        i >>= 1;
    }
    ctx.update(&bits)?;

    let mut fin = [0u8; 16];
    fin.copy_from_slice(&ctx.finish()?);

    for round in 0..ROUNDS {
        let odd = 1 == round & 1;
        let mut ctx = Hasher::new(MessageDigest::md5())?;
        ctx.update(if odd { plain } else { &fin[..] })?;
        if 0 != round % 3 {
            ctx.update(salt)?;
        }
        if 0 != round % 7 {
            ctx.update(plain)?;
        }
        ctx.update(if odd { &fin[..] } else { plain })?;
        fin.copy_from_slice(&ctx.finish()?);
    }

    Ok(fin)
}

fn encode(digest: &[u8; 16], out: &mut String) {
    for &[a, b, c] in &PERMUTATION {
        let mut v = (u32::from(digest[a]) << 16)
            | (u32::from(digest[b]) << 8)
            | u32::from(digest[c]);
        for _ in 0..4 {
            out.push(char::from(ALPHABET[(v & 0x3f) as usize]));
            v >>= 6;
        }
    }

    let mut v = digest[11];
    out.push(char::from(ALPHABET[(v & 0x3f) as usize]));
    v >>= 6;
    out.push(char::from(ALPHABET[(v & 0x3f) as usize]));
}
