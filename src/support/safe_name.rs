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

/// Determine whether the given domain name is "safe".
///
/// This does not attempt to validate against the DNS grammar; Postfix is far
/// more lenient than that anyway. It only excludes things that would break
/// the lookup tables or a maildir path built from the name: empty names,
/// whitespace and control characters, path separators, `@`, and the
/// characters that are wildcards in SQL `LIKE` patterns.
pub fn is_safe_domain(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.ends_with('.')
        && !name.contains("..")
        && name.find(|c: char| {
            c.is_whitespace()
                || c.is_control()
                || matches!(c, '/' | '\\' | '@' | '%' | '*' | '_' | '$')
        })
        .is_none()
}

/// Split `local@domain`, requiring a safe domain part.
///
/// The local part may be empty only if `allow_catch_all` is set, since
/// `@example.com` is how Postfix spells a catch-all alias but never a
/// deliverable mailbox.
pub fn split_address(
    address: &str,
    allow_catch_all: bool,
) -> Option<(&str, &str)> {
    let (local, domain) = address.rsplit_once('@')?;
    if (local.is_empty() && !allow_catch_all)
        || local.contains('@')
        || local
            .find(|c: char| c.is_whitespace() || c.is_control() || c == '/')
            .is_some()
        || !is_safe_domain(domain)
    {
        return None;
    }

    Some((local, domain))
}
