use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, error, info};

use crate::{
    config::Config,
    error::{Error, Result},
    sql::{
        schema::Schema,
        types::{Row, Value},
    },
};

pub mod disk;
pub mod index;
pub mod predicate;
pub mod table;

use index::RowId;
use predicate::Predicate;
use table::{Scan, Table};

/// All tables of one database root
///
/// Mutations apply in memory first and mark the table dirty; `flush` then
/// writes every dirty table through `disk::save`.
#[derive(Debug)]
pub struct Database {
    config: Config,
    tables: BTreeMap<String, Table>,
    dirty: BTreeSet<String>,
}

impl Database {
    /// Opens the database rooted at `config.data_dir`, creating the directory
    /// if needed and loading every persisted table
    pub fn open(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let mut tables = BTreeMap::new();
        for entry in std::fs::read_dir(&config.data_dir)? {
            let path = entry?.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(config.file_extension.as_str())
            {
                continue;
            }
            let table = disk::load(&path)?;
            info!(table = %table.name(), rows = table.len(), "loaded table");
            tables.insert(table.name().to_string(), table);
        }

        Ok(Self {
            config,
            tables,
            dirty: BTreeSet::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn create_table(&mut self, schema: Schema) -> Result<()> {
        schema.validate()?;
        if self.tables.contains_key(&schema.name) {
            return Err(Error::DuplicateTable(schema.name));
        }
        let name = schema.name.clone();
        self.tables.insert(name.clone(), Table::new(schema));
        self.dirty.insert(name.clone());
        info!(table = %name, "created table");
        Ok(())
    }

    /// Removes the table, its indexes and its file
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        if self.tables.remove(name).is_none() {
            return Err(Error::NotFound(format!("table {}", name)));
        }
        self.dirty.remove(name);
        disk::remove(&self.config, name)?;
        info!(table = %name, "dropped table");
        Ok(())
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn must_get_table(&self, name: &str) -> Result<&Table> {
        self.get_table(name)
            .ok_or_else(|| Error::NotFound(format!("table {}", name)))
    }

    fn must_get_table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(format!("table {}", name)))
    }

    /// Table names in sorted order
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn insert(&mut self, table: &str, row: Row) -> Result<RowId> {
        let id = self.must_get_table_mut(table)?.insert(row)?;
        self.dirty.insert(table.to_string());
        Ok(id)
    }

    pub fn select<'a>(&'a self, table: &str, predicate: &'a Predicate) -> Result<Scan<'a>> {
        Ok(self.must_get_table(table)?.select(predicate))
    }

    pub fn update(
        &mut self,
        table: &str,
        predicate: &Predicate,
        assignments: &[(usize, Value)],
    ) -> Result<usize> {
        let count = self.must_get_table_mut(table)?.update(predicate, assignments)?;
        if count > 0 {
            self.dirty.insert(table.to_string());
        }
        Ok(count)
    }

    pub fn delete(&mut self, table: &str, predicate: &Predicate) -> Result<usize> {
        let count = self.must_get_table_mut(table)?.delete(predicate);
        if count > 0 {
            self.dirty.insert(table.to_string());
        }
        Ok(count)
    }

    /// Writes one table to disk regardless of its dirty mark
    pub fn persist(&mut self, name: &str) -> Result<()> {
        disk::save(&self.config, self.must_get_table(name)?)?;
        self.dirty.remove(name);
        Ok(())
    }

    /// Writes every table changed since the last flush
    pub fn flush(&mut self) -> Result<()> {
        while let Some(name) = self.dirty.first().cloned() {
            if let Some(table) = self.tables.get(&name) {
                if let Err(err) = disk::save(&self.config, table) {
                    error!(table = %name, %err, "failed to persist table");
                    return Err(err);
                }
                debug!(table = %name, rows = table.len(), "persisted table");
            }
            self.dirty.remove(&name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::Database;
    use crate::{
        config::Config,
        error::{Error, Result},
        sql::{
            schema::{Constraints, Schema},
            types::{DataType, Value},
        },
        storage::predicate::Predicate,
    };

    fn users() -> Result<Schema> {
        let mut schema = Schema::new("users")?;
        schema.define_column("id", DataType::Integer, Constraints::primary_key())?;
        schema.define_column("name", DataType::Text, Constraints::default())?;
        Ok(schema)
    }

    #[test]
    fn test_table_lifecycle() -> Result<()> {
        let dir = TempDir::new()?;
        let mut db = Database::open(Config::new(dir.path()))?;
        db.create_table(users()?)?;
        assert_eq!(db.create_table(users()?), Err(Error::DuplicateTable("users".into())));
        assert!(matches!(db.create_table(Schema::new("empty")?), Err(Error::Schema(_))));

        db.insert("users", vec![Value::Integer(1), Value::Text("a".into())])?;
        db.flush()?;
        assert!(db.config().table_path("users").exists());

        db.drop_table("users")?;
        assert!(!db.config().table_path("users").exists());
        assert!(db.get_table("users").is_none());
        assert!(matches!(db.drop_table("users"), Err(Error::NotFound(_))));
        assert!(matches!(
            db.insert("users", vec![Value::Integer(1), Value::Null]),
            Err(Error::NotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_reopen_restores_tables() -> Result<()> {
        let dir = TempDir::new()?;
        let config = Config::new(dir.path()).with_sync_writes(false);
        {
            let mut db = Database::open(config.clone())?;
            db.create_table(users()?)?;
            let mut other = Schema::new("accounts")?;
            other.define_column("owner", DataType::Integer, Constraints::unique())?;
            db.create_table(other)?;
            for id in 1..=3 {
                db.insert("users", vec![Value::Integer(id), Value::Text(format!("u{}", id))])?;
            }
            db.delete("users", &Predicate::equals(0, Value::Integer(2)))?;
            db.flush()?;
        }
        std::fs::write(dir.path().join("notes.txt"), b"ignored")?;

        let db = Database::open(config)?;
        assert_eq!(db.table_names(), vec!["accounts".to_string(), "users".to_string()]);
        let users = db.must_get_table("users")?;
        assert_eq!(users.len(), 2);
        assert_eq!(
            users.lookup(0, &Value::Integer(3)).map(|r| r[1].clone()),
            Some(Value::Text("u3".into()))
        );
        assert!(users.lookup(0, &Value::Integer(2)).is_none());
        assert!(db.must_get_table("accounts")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_persist_single_table() -> Result<()> {
        let dir = TempDir::new()?;
        let mut db = Database::open(Config::new(dir.path()))?;
        db.create_table(users()?)?;
        db.persist("users")?;
        assert!(db.config().table_path("users").exists());
        assert!(matches!(db.persist("missing"), Err(Error::NotFound(_))));
        Ok(())
    }

    #[test]
    fn test_corrupt_file_fails_open() -> Result<()> {
        let dir = TempDir::new()?;
        let config = Config::new(dir.path());
        std::fs::write(config.table_path("broken"), b"")?;
        assert!(Database::open(config).unwrap_err().is_fatal());
        Ok(())
    }
}
