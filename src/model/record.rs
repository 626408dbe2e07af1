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

//! Change tracking and optimistic persistence shared by all record kinds.
//!
//! A record carries a `Changeset` of the fields assigned since it was loaded
//! (or created). Persisting a new record inserts its key plus whatever is in
//! the changeset; persisting an existing record updates exactly the changed
//! columns, guarded by the `upd_dat` version the record was loaded with:
//!
//! ```sql
//! UPDATE `t` SET <changed> , `upd_dat` = ? WHERE `key` = ? AND `upd_dat` <= ?
//! ```
//!
//! If another process updated the row in the meantime, its `upd_dat` is
//! strictly greater than ours and the update matches nothing, which is
//! reported as `Error::ConcurrentModification` (or `Error::NotFound` if the
//! row is gone entirely). A record with an empty changeset is never written.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, info};
use rusqlite::types::Value;

use crate::store::types::UnixMicros;
use crate::support::error::Error;

pub const CREATED_COLUMN: &str = "crt_dat";
pub const UPDATED_COLUMN: &str = "upd_dat";

/// A mutable column of some record kind.
///
/// The `Ord` implementation determines the order columns appear in generated
/// statements.
pub trait Field: Copy + Ord + fmt::Debug {
    fn column(self) -> &'static str;
}

/// The set of fields assigned new values, along with those values.
#[derive(Clone, Debug, PartialEq)]
pub struct Changeset<F: Field> {
    values: BTreeMap<F, Value>,
}

impl<F: Field> Default for Changeset<F> {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }
}

impl<F: Field> Changeset<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `field` now has `value`, replacing any earlier change to
    /// the same field.
    pub fn set(&mut self, field: F, value: impl Into<Value>) -> &mut Self {
        self.values.insert(field, value.into());
        self
    }

    pub fn contains(&self, field: F) -> bool {
        self.values.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = F> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (F, &Value)> + '_ {
        self.values.iter().map(|(&f, v)| (f, v))
    }
}

/// Persistence bookkeeping embedded in every record.
#[derive(Clone, Debug)]
pub struct RecordState<F: Field> {
    is_new: bool,
    created_at: UnixMicros,
    updated_at: UnixMicros,
    changes: Changeset<F>,
}

impl<F: Field> RecordState<F> {
    /// State for a record which does not exist in the store yet.
    pub fn new() -> Self {
        Self {
            is_new: true,
            created_at: UnixMicros::zero(),
            updated_at: UnixMicros::zero(),
            changes: Changeset::new(),
        }
    }

    /// State for a record just read from the store.
    pub fn loaded(created_at: UnixMicros, updated_at: UnixMicros) -> Self {
        Self {
            is_new: false,
            created_at,
            updated_at,
            changes: Changeset::new(),
        }
    }

    pub fn changes(&self) -> &Changeset<F> {
        &self.changes
    }

    /// Assign `value` to `slot`, recording the change under `field` unless
    /// the value is the same as what is already there.
    ///
    /// Returns whether anything changed.
    pub fn assign<T>(&mut self, field: F, slot: &mut T, value: T) -> bool
    where
        T: PartialEq + Clone + Into<Value>,
    {
        if *slot == value {
            return false;
        }

        self.changes.set(field, value.clone());
        *slot = value;
        true
    }
}

impl<F: Field> Default for RecordState<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Capabilities common to domains, mailboxes and aliases.
pub trait Record {
    type Field: Field;

    /// The table holding records of this kind.
    const TABLE: &'static str;
    /// The column holding the natural key.
    const KEY_COLUMN: &'static str;

    fn key(&self) -> &str;
    fn state(&self) -> &RecordState<Self::Field>;
    fn state_mut(&mut self) -> &mut RecordState<Self::Field>;

    /// Whether the record has not yet been inserted.
    fn is_new(&self) -> bool {
        self.state().is_new
    }

    /// Whether any field has been changed since the last persist.
    fn is_dirty(&self) -> bool {
        !self.state().changes.is_empty()
    }

    fn created_at(&self) -> UnixMicros {
        self.state().created_at
    }

    /// The version token this record was loaded or last persisted with.
    fn updated_at(&self) -> UnixMicros {
        self.state().updated_at
    }
}

/// A parameterised SQL statement.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Runs statements produced by `persist`.
pub trait Executor {
    /// Execute `stmt`, returning the number of affected rows.
    fn execute(&mut self, stmt: &Statement) -> Result<usize, Error>;

    /// Whether `table` has a row whose `key_column` equals `key`.
    fn exists(
        &mut self,
        table: &str,
        key_column: &str,
        key: &str,
    ) -> Result<bool, Error>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Persisted {
    Inserted,
    Updated,
    /// Nothing was changed, so nothing was written.
    Unchanged,
}

/// Build the `INSERT` for a new record.
///
/// The columns are the key, the changed fields in field order, then the two
/// timestamps, both set to `now`.
pub fn insert_statement<R: Record>(rec: &R, now: UnixMicros) -> Statement {
    let changes = rec.state().changes();
    let mut columns = Vec::with_capacity(changes.len() + 3);
    let mut params = Vec::with_capacity(changes.len() + 3);

    columns.push(R::KEY_COLUMN);
    params.push(Value::Text(rec.key().to_owned()));
    for (field, value) in changes.iter() {
        columns.push(field.column());
        params.push(value.clone());
    }
    columns.push(CREATED_COLUMN);
    params.push(now.into());
    columns.push(UPDATED_COLUMN);
    params.push(now.into());

    let sql = format!(
        "INSERT INTO `{}` ({}) VALUES ({})",
        R::TABLE,
        columns
            .iter()
            .map(|c| format!("`{}`", c))
            .collect::<Vec<_>>()
            .join(", "),
        vec!["?"; columns.len()].join(", "),
    );

    Statement { sql, params }
}

/// Build the version-guarded `UPDATE` for an existing record, stamping it
/// with `version`.
pub fn update_statement<R: Record>(rec: &R, version: UnixMicros) -> Statement {
    let changes = rec.state().changes();
    let mut assignments = Vec::with_capacity(changes.len() + 1);
    let mut params = Vec::with_capacity(changes.len() + 3);

    for (field, value) in changes.iter() {
        assignments.push(format!("`{}` = ?", field.column()));
        params.push(value.clone());
    }
    assignments.push(format!("`{}` = ?", UPDATED_COLUMN));
    params.push(version.into());

    params.push(Value::Text(rec.key().to_owned()));
    params.push(rec.updated_at().into());

    let sql = format!(
        "UPDATE `{}` SET {} WHERE `{}` = ? AND `{}` <= ?",
        R::TABLE,
        assignments.join(", "),
        R::KEY_COLUMN,
        UPDATED_COLUMN,
    );

    Statement { sql, params }
}

/// Write `rec` to the store if it is new or has changes.
///
/// On success, the changeset is cleared and the record's timestamps reflect
/// what was written. On failure, the record is left untouched, so the same
/// changes can be retried after reloading.
pub fn persist<R, E>(exec: &mut E, rec: &mut R) -> Result<Persisted, Error>
where
    R: Record,
    E: Executor + ?Sized,
{
    if rec.is_new() {
        let now = UnixMicros::now();
        let stmt = insert_statement(rec, now);
        debug!("{}", stmt.sql);
        exec.execute(&stmt)?;

        let changed = changed_columns(rec);
        let state = rec.state_mut();
        state.is_new = false;
        state.created_at = now;
        state.updated_at = now;
        state.changes = Changeset::new();
        info!("{} '{}' added{}", R::TABLE, rec.key(), changed);
        return Ok(Persisted::Inserted);
    }

    if !rec.is_dirty() {
        info!("{} '{}' did not change, not persisted", R::TABLE, rec.key());
        return Ok(Persisted::Unchanged);
    }

    let version = rec.updated_at().successor();
    let stmt = update_statement(rec, version);
    debug!("{}", stmt.sql);
    if 0 == exec.execute(&stmt)? {
        return Err(
            if exec.exists(R::TABLE, R::KEY_COLUMN, rec.key())? {
                Error::ConcurrentModification
            } else {
                Error::NotFound
            },
        );
    }

    let changed = changed_columns(rec);
    let state = rec.state_mut();
    state.updated_at = version;
    state.changes = Changeset::new();
    info!("{} '{}' updated{}", R::TABLE, rec.key(), changed);
    Ok(Persisted::Updated)
}

fn changed_columns<R: Record>(rec: &R) -> String {
    let changes = rec.state().changes();
    if changes.is_empty() {
        return String::new();
    }

    format!(
        " ({})",
        changes
            .fields()
            .map(Field::column)
            .collect::<Vec<_>>()
            .join(", ")
    )
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
    pub enum ThingField {
        Colour,
        Size,
    }

    impl Field for ThingField {
        fn column(self) -> &'static str {
            match self {
                ThingField::Colour => "colour",
                ThingField::Size => "size",
            }
        }
    }

    #[derive(Debug, Clone)]
    pub struct Thing {
        pub name: String,
        pub colour: String,
        pub size: i64,
        pub state: RecordState<ThingField>,
    }

    impl Thing {
        pub fn set_colour(&mut self, colour: &str) -> &mut Self {
            self.state.assign(
                ThingField::Colour,
                &mut self.colour,
                colour.to_owned(),
            );
            self
        }

        pub fn set_size(&mut self, size: i64) -> &mut Self {
            self.state.assign(ThingField::Size, &mut self.size, size);
            self
        }
    }

    impl Record for Thing {
        type Field = ThingField;
        const TABLE: &'static str = "thing";
        const KEY_COLUMN: &'static str = "name";

        fn key(&self) -> &str {
            &self.name
        }

        fn state(&self) -> &RecordState<ThingField> {
            &self.state
        }

        fn state_mut(&mut self) -> &mut RecordState<ThingField> {
            &mut self.state
        }
    }

    /// Records statements and pretends each affected `affected` rows.
    #[derive(Default)]
    pub struct FakeExecutor {
        pub executed: Vec<Statement>,
        pub affected: usize,
        pub row_exists: bool,
    }

    impl Executor for FakeExecutor {
        fn execute(&mut self, stmt: &Statement) -> Result<usize, Error> {
            self.executed.push(stmt.clone());
            Ok(self.affected)
        }

        fn exists(&mut self, _: &str, _: &str, _: &str) -> Result<bool, Error> {
            Ok(self.row_exists)
        }
    }

    fn new_thing() -> Thing {
        Thing {
            name: "widget".to_owned(),
            colour: String::new(),
            size: 0,
            state: RecordState::new(),
        }
    }

    fn loaded_thing(version: i64) -> Thing {
        Thing {
            name: "widget".to_owned(),
            colour: "red".to_owned(),
            size: 3,
            state: RecordState::loaded(
                UnixMicros::from_micros(1).unwrap(),
                UnixMicros::from_micros(version).unwrap(),
            ),
        }
    }

    #[test]
    fn assign_only_records_real_changes() {
        let mut thing = loaded_thing(100);
        thing.set_colour("red").set_size(3);
        assert!(!thing.is_dirty());

        thing.set_size(4);
        assert!(thing.is_dirty());
        assert!(thing.state.changes().contains(ThingField::Size));
        assert!(!thing.state.changes().contains(ThingField::Colour));

        // Setting it back still counts; the column was written to in memory
        thing.set_size(3);
        assert!(thing.is_dirty());
        assert_eq!(
            Some((ThingField::Size, &Value::Integer(3))),
            thing.state.changes().iter().next()
        );
    }

    #[test]
    fn insert_with_no_changes_has_key_and_timestamps_only() {
        let thing = new_thing();
        let now = UnixMicros::from_micros(42).unwrap();
        let stmt = insert_statement(&thing, now);
        assert_eq!(
            "INSERT INTO `thing` (`name`, `crt_dat`, `upd_dat`) \
             VALUES (?, ?, ?)",
            stmt.sql
        );
        assert_eq!(
            vec![
                Value::Text("widget".to_owned()),
                Value::Integer(42),
                Value::Integer(42),
            ],
            stmt.params
        );
    }

    #[test]
    fn statement_columns_follow_field_order() {
        let mut thing = new_thing();
        thing.set_size(7).set_colour("blue");
        let stmt = insert_statement(&thing, UnixMicros::zero());
        assert_eq!(
            "INSERT INTO `thing` (`name`, `colour`, `size`, `crt_dat`, \
             `upd_dat`) VALUES (?, ?, ?, ?, ?)",
            stmt.sql
        );

        let mut thing = loaded_thing(100);
        thing.set_size(7).set_colour("blue");
        let stmt =
            update_statement(&thing, UnixMicros::from_micros(200).unwrap());
        assert_eq!(
            "UPDATE `thing` SET `colour` = ?, `size` = ?, `upd_dat` = ? \
             WHERE `name` = ? AND `upd_dat` <= ?",
            stmt.sql
        );
        assert_eq!(
            vec![
                Value::Text("blue".to_owned()),
                Value::Integer(7),
                Value::Integer(200),
                Value::Text("widget".to_owned()),
                Value::Integer(100),
            ],
            stmt.params
        );
    }

    #[test]
    fn persist_new_inserts_and_clears() {
        let mut exec = FakeExecutor {
            affected: 1,
            ..FakeExecutor::default()
        };
        let mut thing = new_thing();
        thing.set_colour("green");

        assert_eq!(Persisted::Inserted, persist(&mut exec, &mut thing).unwrap());
        assert_eq!(1, exec.executed.len());
        assert!(exec.executed[0].sql.starts_with("INSERT"));
        assert!(!thing.is_new());
        assert!(!thing.is_dirty());
        assert_eq!(thing.created_at(), thing.updated_at());
        assert!(thing.updated_at() > UnixMicros::zero());

        // Nothing left to do
        assert_eq!(
            Persisted::Unchanged,
            persist(&mut exec, &mut thing).unwrap()
        );
        assert_eq!(1, exec.executed.len());
    }

    #[test]
    fn persist_clean_loaded_record_is_noop() {
        let mut exec = FakeExecutor::default();
        let mut thing = loaded_thing(100);
        thing.set_colour("red");
        assert_eq!(
            Persisted::Unchanged,
            persist(&mut exec, &mut thing).unwrap()
        );
        assert!(exec.executed.is_empty());
    }

    #[test]
    fn persist_update_advances_version() {
        let mut exec = FakeExecutor {
            affected: 1,
            ..FakeExecutor::default()
        };
        let mut thing = loaded_thing(100);
        thing.set_size(12);

        assert_eq!(Persisted::Updated, persist(&mut exec, &mut thing).unwrap());
        assert!(thing.updated_at() > UnixMicros::from_micros(100).unwrap());
        assert_eq!(UnixMicros::from_micros(1).unwrap(), thing.created_at());
        assert!(!thing.is_dirty());
        assert_eq!(
            Value::from(thing.updated_at()),
            exec.executed[0].params[1]
        );
    }

    #[test]
    fn persist_update_zero_rows() {
        let mut exec = FakeExecutor {
            affected: 0,
            row_exists: true,
            ..FakeExecutor::default()
        };
        let mut thing = loaded_thing(100);
        thing.set_size(12);
        assert_matches!(
            Err(Error::ConcurrentModification),
            persist(&mut exec, &mut thing)
        );
        // Still holds the change and the old version
        assert!(thing.is_dirty());
        assert_eq!(UnixMicros::from_micros(100).unwrap(), thing.updated_at());

        exec.row_exists = false;
        assert_matches!(Err(Error::NotFound), persist(&mut exec, &mut thing));
    }
}
