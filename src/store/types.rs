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

//! Bindings for our model types to `rusqlite`.

use std::fmt;

use chrono::prelude::*;
use rusqlite::types::{
    FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef,
};

/// A timestamp with microsecond precision, stored as an integer count of
/// microseconds since the UNIX epoch.
///
/// The `upd_dat` column of every table holds one of these and doubles as the
/// row's version for optimistic locking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnixMicros(DateTime<Utc>);

impl UnixMicros {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn zero() -> Self {
        Self(DateTime::<Utc>::from_timestamp(0, 0).unwrap())
    }

    /// Truncates `dt` to whole microseconds so that what is held in memory is
    /// exactly what the database round-trips.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::from_micros(dt.timestamp_micros()).unwrap_or_else(Self::zero)
    }

    pub fn from_micros(micros: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp(
            micros.div_euclid(1_000_000),
            (micros.rem_euclid(1_000_000) * 1000) as u32,
        )
        .map(Self)
    }

    pub fn micros(self) -> i64 {
        self.0.timestamp_micros()
    }

    pub fn datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// The version to write when replacing a row whose version is `self`.
    ///
    /// This is the current time, unless the clock has not moved past `self`
    /// (coarse clocks, two writes in the same microsecond, or the clock
    /// having been set back), in which case it is `self` plus one
    /// microsecond. Versions therefore strictly increase.
    pub fn successor(self) -> Self {
        let now = Self::now();
        if now > self {
            now
        } else {
            Self::from_micros(self.micros().saturating_add(1)).unwrap_or(self)
        }
    }
}

impl fmt::Display for UnixMicros {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            self.0.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        )
    }
}

impl ToSql for UnixMicros {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(Value::Integer(self.micros())))
    }
}

impl FromSql for UnixMicros {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let inner = i64::column_result(value)?;
        Self::from_micros(inner).ok_or(FromSqlError::OutOfRange(inner))
    }
}

impl From<UnixMicros> for Value {
    fn from(t: UnixMicros) -> Self {
        Value::Integer(t.micros())
    }
}

pub fn from_row<T: FromRow>(row: &rusqlite::Row<'_>) -> rusqlite::Result<T> {
    T::from_row(row)
}

pub fn from_single<T: FromSql>(row: &rusqlite::Row<'_>) -> rusqlite::Result<T> {
    row.get(0)
}

pub trait FromRow: Sized {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn micros_round_trip() {
        let t = UnixMicros::from_micros(1_600_000_000_123_456).unwrap();
        assert_eq!(1_600_000_000_123_456, t.micros());
        assert_eq!(123_456_000, t.datetime().nanosecond());

        let before_epoch = UnixMicros::from_micros(-1).unwrap();
        assert_eq!(-1, before_epoch.micros());
        assert!(before_epoch < UnixMicros::zero());
    }

    #[test]
    fn now_is_truncated_to_micros() {
        let now = UnixMicros::now();
        assert_eq!(0, now.datetime().nanosecond() % 1000);
    }

    #[test]
    fn successor_strictly_increases() {
        let far_future = UnixMicros::from_micros(i64::MAX / 2).unwrap();
        let next = far_future.successor();
        assert_eq!(far_future.micros() + 1, next.micros());

        let past = UnixMicros::zero();
        assert!(past.successor() > past);

        let mut v = UnixMicros::now();
        for _ in 0..1000 {
            let n = v.successor();
            assert!(n > v);
            v = n;
        }
    }
}
