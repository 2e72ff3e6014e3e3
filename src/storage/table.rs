use std::{
    collections::{BTreeMap, HashSet, btree_map},
    fmt::Display,
};

use tracing::warn;

use crate::{
    error::{Error, Result},
    sql::{
        schema::Schema,
        types::{Row, Value},
    },
    storage::{
        index::{HashIndex, RowId},
        predicate::Predicate,
    },
};

/// How a selection reaches its rows
#[derive(Debug, Clone, PartialEq)]
pub enum AccessPath {
    /// O(1) probe of the hash index on `column`
    IndexLookup { column: String, value: Value },
    /// Every live row is visited
    FullScan,
}

impl Display for AccessPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessPath::IndexLookup { column, value } => {
                write!(f, "index lookup on {} = {}", column, value)
            }
            AccessPath::FullScan => write!(f, "full scan"),
        }
    }
}

/// Rows visited versus rows produced by one selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub scanned: usize,
    pub returned: usize,
}

/// A table: schema, live rows in insertion order, and one optional hash
/// index per column position (present for UNIQUE and PRIMARY KEY columns)
#[derive(Debug)]
pub struct Table {
    schema: Schema,
    rows: BTreeMap<RowId, Row>,
    indexes: Vec<Option<HashIndex>>,
    next_row_id: RowId,
}

impl Table {
    pub fn new(schema: Schema) -> Self {
        let indexes = schema
            .columns()
            .iter()
            .map(|c| c.is_indexed().then(HashIndex::new))
            .collect();
        Self {
            schema,
            rows: BTreeMap::new(),
            indexes,
            next_row_id: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Live rows in insertion order
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.rows.get(&id)
    }

    /// Number of entries in the index on `column`, None if unindexed
    pub fn index_len(&self, column: usize) -> Option<usize> {
        self.indexes.get(column)?.as_ref().map(HashIndex::len)
    }

    pub fn index(&self, column: usize) -> Option<&HashIndex> {
        self.indexes.get(column)?.as_ref()
    }

    /// Point lookup through the index on `column`
    pub fn lookup(&self, column: usize, value: &Value) -> Option<&Row> {
        let id = self.index(column)?.get(value)?;
        self.rows.get(&id)
    }

    /// Inserts a row after validating it and probing every index.
    ///
    /// Nothing is written when any check fails.
    pub fn insert(&mut self, row: Row) -> Result<RowId> {
        self.schema.check_row(&row)?;
        for (pos, index) in self.indexes.iter().enumerate() {
            if let Some(index) = index {
                if index.get(&row[pos]).is_some() {
                    return Err(self.duplicate(pos, &row[pos]));
                }
            }
        }

        let id = self.next_row_id;
        self.next_row_id += 1;
        for (pos, index) in self.indexes.iter_mut().enumerate() {
            if let Some(index) = index {
                index.insert(row[pos].clone(), id);
            }
        }
        self.rows.insert(id, row);
        Ok(id)
    }

    /// Picks the index path when the predicate pins an indexed column
    pub fn access_path(&self, predicate: &Predicate) -> AccessPath {
        match predicate.index_probe(|pos| self.index(pos).is_some()) {
            Some(probe) => AccessPath::IndexLookup {
                column: self.schema.column(probe.column).name.clone(),
                value: probe.value.clone(),
            },
            None => AccessPath::FullScan,
        }
    }

    /// Lazily yields rows matching `predicate`
    pub fn select<'a>(&'a self, predicate: &'a Predicate) -> Scan<'a> {
        let source = match predicate.index_probe(|pos| self.index(pos).is_some()) {
            Some(probe) => Source::Index(
                self.index(probe.column).and_then(|index| index.get(&probe.value)),
            ),
            None => Source::Full(self.rows.iter()),
        };
        Scan {
            table: self,
            predicate,
            source,
            path: self.access_path(predicate),
            stats: ScanStats::default(),
        }
    }

    /// Applies `assignments` to every row matching `predicate`.
    ///
    /// The statement is validated in full before any row changes: a type
    /// error or an index collision leaves every row untouched.
    pub fn update(&mut self, predicate: &Predicate, assignments: &[(usize, Value)]) -> Result<usize> {
        for (pos, value) in assignments {
            self.schema
                .columns()
                .get(*pos)
                .ok_or_else(|| Error::Internal(format!("column position {} out of range", pos)))?
                .check_value(value)?;
        }

        let targets: Vec<RowId> = self.select(predicate).map(|(id, _)| id).collect();
        if targets.is_empty() {
            return Ok(0);
        }
        let matched: HashSet<RowId> = targets.iter().copied().collect();

        for (pos, value) in assignments {
            let Some(index) = &self.indexes[*pos] else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            // Every target receives the same value, so two targets always collide
            let taken_elsewhere = index.get(value).is_some_and(|owner| !matched.contains(&owner));
            if targets.len() > 1 || taken_elsewhere {
                warn!(table = %self.name(), column = %self.schema.column(*pos).name, "update rejected by unique index");
                return Err(self.duplicate(*pos, value));
            }
        }

        for id in &targets {
            let Some(row) = self.rows.get_mut(id) else {
                continue;
            };
            for (pos, value) in assignments {
                if let Some(index) = &mut self.indexes[*pos] {
                    index.remove(&row[*pos], *id);
                    index.insert(value.clone(), *id);
                }
                row[*pos] = value.clone();
            }
        }
        Ok(targets.len())
    }

    /// Removes every row matching `predicate` along with its index entries
    pub fn delete(&mut self, predicate: &Predicate) -> usize {
        let targets: Vec<RowId> = self.select(predicate).map(|(id, _)| id).collect();
        for id in &targets {
            if let Some(row) = self.rows.remove(id) {
                for (pos, index) in self.indexes.iter_mut().enumerate() {
                    if let Some(index) = index {
                        index.remove(&row[pos], *id);
                    }
                }
            }
        }
        targets.len()
    }

    fn duplicate(&self, pos: usize, value: &Value) -> Error {
        let column = self.schema.column(pos);
        let kind = if column.constraints.primary_key { "primary key" } else { "unique" };
        Error::ConstraintViolation(format!(
            "{} column {}.{} already contains value {}",
            kind,
            self.name(),
            column.name,
            value
        ))
    }
}

enum Source<'a> {
    Index(Option<RowId>),
    Full(btree_map::Iter<'a, RowId, Row>),
}

/// Lazy, single-pass selection over a table
///
/// Tracks how many rows were visited and how many matched; call `select`
/// again to restart.
pub struct Scan<'a> {
    table: &'a Table,
    predicate: &'a Predicate,
    source: Source<'a>,
    path: AccessPath,
    stats: ScanStats,
}

impl<'a> Scan<'a> {
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    pub fn access_path(&self) -> &AccessPath {
        &self.path
    }
}

impl<'a> Iterator for Scan<'a> {
    type Item = (RowId, &'a Row);

    fn next(&mut self) -> Option<Self::Item> {
        let table = self.table;
        loop {
            let (id, row) = match &mut self.source {
                Source::Index(slot) => {
                    let id = slot.take()?;
                    (id, table.rows.get(&id)?)
                }
                Source::Full(iter) => {
                    let (id, row) = iter.next()?;
                    (*id, row)
                }
            };
            self.stats.scanned += 1;
            if self.predicate.matches(row) {
                self.stats.returned += 1;
                return Some((id, row));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessPath, Table};
    use crate::{
        error::{Error, Result},
        sql::{
            schema::{Constraints, Schema},
            types::{DataType, Operator, Value},
        },
        storage::predicate::{Comparison, Predicate},
    };

    fn users() -> Result<Table> {
        let mut schema = Schema::new("users")?;
        schema.define_column("id", DataType::Integer, Constraints::primary_key())?;
        schema.define_column("email", DataType::Text, Constraints::unique())?;
        schema.define_column("age", DataType::Integer, Constraints::default())?;
        let mut table = Table::new(schema);
        for (id, email, age) in [(1, Some("a@x"), 30), (2, Some("b@x"), 40), (3, None, 50)] {
            table.insert(vec![
                Value::Integer(id),
                email.map_or(Value::Null, |e| Value::Text(e.into())),
                Value::Integer(age),
            ])?;
        }
        Ok(table)
    }

    /// Every index entry resolves to a live row holding that value, and the
    /// entry count equals the number of live non-null values
    fn assert_indexes_consistent(table: &Table) {
        for pos in 0..table.schema().columns().len() {
            let Some(index) = table.index(pos) else { continue };
            let non_null = table.rows().filter(|r| !r[pos].is_null()).count();
            assert_eq!(index.len(), non_null);
            for (value, id) in index.iter() {
                assert_eq!(&table.row(*id).expect("dangling index entry")[pos], value);
            }
        }
    }

    #[test]
    fn test_insert_enforces_uniqueness() -> Result<()> {
        let mut table = users()?;
        assert_indexes_consistent(&table);
        assert_eq!(table.index_len(1), Some(2));

        let err = table
            .insert(vec![Value::Integer(1), Value::Text("z@x".into()), Value::Integer(1)])
            .unwrap_err();
        assert_eq!(
            err,
            Error::ConstraintViolation("primary key column users.id already contains value 1".into())
        );
        let err = table
            .insert(vec![Value::Integer(9), Value::Text("b@x".into()), Value::Integer(1)])
            .unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(_)));
        assert!(table
            .insert(vec![Value::Null, Value::Null, Value::Integer(1)])
            .is_err());

        // A rejected insert leaves rows and indexes alone
        assert_eq!(table.len(), 3);
        assert_eq!(table.index_len(0), Some(3));
        assert_eq!(table.index(1).and_then(|i| i.get(&Value::Text("z@x".into()))), None);

        // Several NULLs in a unique column are fine
        table.insert(vec![Value::Integer(4), Value::Null, Value::Integer(1)])?;
        assert_indexes_consistent(&table);
        Ok(())
    }

    #[test]
    fn test_select_access_paths() -> Result<()> {
        let table = users()?;

        let by_id = Predicate::equals(0, Value::Integer(2));
        let mut scan = table.select(&by_id);
        assert_eq!(
            scan.access_path(),
            &AccessPath::IndexLookup { column: "id".into(), value: Value::Integer(2) }
        );
        let (_, row) = scan.next().expect("row 2");
        assert_eq!(row[2], Value::Integer(40));
        assert!(scan.next().is_none());
        assert_eq!(scan.stats().scanned, 1);
        assert_eq!(scan.stats().returned, 1);

        let missing = Predicate::equals(0, Value::Integer(42));
        let mut scan = table.select(&missing);
        assert!(scan.next().is_none());
        assert_eq!(scan.stats().scanned, 0);

        let by_age = Predicate::new(vec![Comparison {
            column: 2,
            op: Operator::GreaterThanOrEqual,
            value: Value::Integer(40),
        }]);
        let mut scan = table.select(&by_age);
        assert_eq!(scan.access_path(), &AccessPath::FullScan);
        let ids: Vec<_> = scan.by_ref().map(|(_, r)| r[0].clone()).collect();
        assert_eq!(ids, vec![Value::Integer(2), Value::Integer(3)]);
        assert_eq!(scan.stats().scanned, 3);
        assert_eq!(scan.stats().returned, 2);

        // Same predicate, same rows, same order
        let again: Vec<_> = table.select(&by_age).map(|(_, r)| r[0].clone()).collect();
        assert_eq!(ids, again);
        Ok(())
    }

    #[test]
    fn test_update_moves_index_entries() -> Result<()> {
        let mut table = users()?;
        let count = table.update(
            &Predicate::equals(0, Value::Integer(1)),
            &[(0, Value::Integer(10)), (1, Value::Text("new@x".into()))],
        )?;
        assert_eq!(count, 1);
        assert!(table.lookup(0, &Value::Integer(1)).is_none());
        assert_eq!(table.lookup(0, &Value::Integer(10)).map(|r| r[2].clone()), Some(Value::Integer(30)));
        assert!(table.lookup(1, &Value::Text("a@x".into())).is_none());
        assert_indexes_consistent(&table);

        // Re-assigning a row its own value is not a collision
        assert_eq!(
            table.update(&Predicate::equals(0, Value::Integer(10)), &[(0, Value::Integer(10))])?,
            1
        );
        Ok(())
    }

    #[test]
    fn test_update_without_matches_never_collides() -> Result<()> {
        let mut table = users()?;
        let count = table.update(
            &Predicate::equals(0, Value::Integer(99)),
            &[(0, Value::Integer(1)), (1, Value::Text("b@x".into()))],
        )?;
        assert_eq!(count, 0);
        assert_eq!(table.len(), 3);
        assert_eq!(table.lookup(0, &Value::Integer(1)).map(|r| r[1].clone()), Some(Value::Text("a@x".into())));
        assert_indexes_consistent(&table);

        // Type errors are still reported
        assert!(matches!(
            table.update(&Predicate::equals(0, Value::Integer(99)), &[(2, Value::Text("x".into()))]),
            Err(Error::Type(_))
        ));
        Ok(())
    }

    #[test]
    fn test_update_is_atomic_on_collision() -> Result<()> {
        let mut table = users()?;

        // Collides with row 2
        let err = table
            .update(&Predicate::equals(0, Value::Integer(1)), &[(0, Value::Integer(2))])
            .unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(_)));
        assert!(table.lookup(0, &Value::Integer(1)).is_some());

        // Two matched rows would share one unique value: nothing changes
        let all = Predicate::all();
        assert!(table.update(&all, &[(1, Value::Text("same@x".into()))]).is_err());
        let emails: Vec<_> = table.rows().map(|r| r[1].clone()).collect();
        assert_eq!(
            emails,
            vec![Value::Text("a@x".into()), Value::Text("b@x".into()), Value::Null]
        );

        // Setting a unique column to NULL across many rows is allowed
        assert_eq!(table.update(&all, &[(1, Value::Null), (2, Value::Integer(1))])?, 3);
        assert_eq!(table.index_len(1), Some(0));
        assert_indexes_consistent(&table);

        // Type errors are caught before any row changes
        assert!(matches!(
            table.update(&all, &[(2, Value::Text("old".into()))]),
            Err(Error::Type(_))
        ));
        Ok(())
    }

    #[test]
    fn test_delete() -> Result<()> {
        let mut table = users()?;
        assert_eq!(table.delete(&Predicate::equals(0, Value::Integer(2))), 1);
        assert_eq!(table.len(), 2);
        assert!(table.lookup(1, &Value::Text("b@x".into())).is_none());
        assert_indexes_consistent(&table);

        // The freed key can be reused
        table.insert(vec![Value::Integer(2), Value::Text("b@x".into()), Value::Integer(1)])?;
        assert_eq!(table.delete(&Predicate::all()), 3);
        assert!(table.is_empty());
        assert_eq!(table.index_len(0), Some(0));
        Ok(())
    }
}
