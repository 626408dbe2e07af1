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


use rusqlite::types::Value;

/// Accumulates the terms of a `WHERE` clause and the values bound to them.
///
/// Values only ever travel as parameters; the column names come from the
/// callers, which only pass literals.
#[derive(Debug, Default)]
pub struct Conditions {
    terms: Vec<String>,
    params: Vec<Value>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `column LIKE pattern`, if a pattern is given.
    pub fn like(&mut self, column: &str, pattern: Option<&str>) -> &mut Self {
        if let Some(pattern) = pattern {
            self.terms.push(format!("{} LIKE ?", column));
            self.params.push(Value::Text(pattern.to_owned()));
        }
        self
    }

    /// Require `column = value`, if a value is given.
    pub fn equals(
        &mut self,
        column: &str,
        value: Option<impl Into<Value>>,
    ) -> &mut Self {
        if let Some(value) = value {
            self.terms.push(format!("{} = ?", column));
            self.params.push(value.into());
        }
        self
    }

    /// The clause, with a leading space, or the empty string if there is
    /// nothing to filter on.
    pub fn where_clause(&self) -> String {
        if self.terms.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.terms.join(" AND "))
        }
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}
