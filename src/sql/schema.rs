use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    sql::{
        parser::ast::Literal,
        types::{DataType, Row, Value},
    },
};

/// Column constraint flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    pub primary_key: bool,
    pub unique: bool,
    pub not_null: bool,
}

impl Constraints {
    pub fn primary_key() -> Self {
        Self { primary_key: true, unique: true, not_null: true }
    }

    pub fn unique() -> Self {
        Self { unique: true, ..Self::default() }
    }

    pub fn not_null() -> Self {
        Self { not_null: true, ..Self::default() }
    }

    /// Applies PRIMARY KEY => UNIQUE + NOT NULL
    fn normalized(mut self) -> Self {
        if self.primary_key {
            self.unique = true;
            self.not_null = true;
        }
        self
    }

    /// Keyword list as it would appear in a CREATE TABLE statement
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.primary_key {
            parts.push("PRIMARY KEY");
        } else {
            if self.unique {
                parts.push("UNIQUE");
            }
            if self.not_null {
                parts.push("NOT NULL");
            }
        }
        parts.join(" ")
    }
}

/// Column schema definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub datatype: DataType,
    pub constraints: Constraints,
}

impl Column {
    /// Whether the column is backed by a hash index
    pub fn is_indexed(&self) -> bool {
        self.constraints.unique || self.constraints.primary_key
    }

    pub fn is_nullable(&self) -> bool {
        !self.constraints.not_null
    }

    /// Coerces a literal for storage in this column
    pub fn validate_value(&self, literal: &Literal) -> Result<Value> {
        let value = self.datatype.coerce(literal).map_err(|err| match err {
            Error::Type(msg) => Error::Type(format!("column {}: {}", self.name, msg)),
            err => err,
        })?;
        self.check_value(&value)?;
        Ok(value)
    }

    /// Checks an already-typed value against the column type and nullability
    pub fn check_value(&self, value: &Value) -> Result<()> {
        match value.datatype() {
            None if self.is_nullable() => Ok(()),
            None => Err(Error::ConstraintViolation(format!(
                "column {} cannot be null",
                self.name
            ))),
            Some(dt) if dt != self.datatype => Err(Error::Type(format!(
                "column {} expects {}, got {}",
                self.name, self.datatype, dt
            ))),
            Some(_) => Ok(()),
        }
    }
}

/// Table schema definition
///
/// Columns are fixed once the table is created. Rows are laid out in column
/// order and `positions` resolves a column name to its slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub name: String,
    columns: Vec<Column>,
    positions: HashMap<String, usize>,
}

impl Schema {
    /// Starts an empty schema for the named table
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::Schema("table name cannot be blank".into()));
        }
        Ok(Self {
            name,
            columns: Vec::new(),
            positions: HashMap::new(),
        })
    }

    /// Builds a schema from a full column list, validating every column
    pub fn build(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let mut schema = Self::new(name)?;
        for column in columns {
            schema.define_column(column.name, column.datatype, column.constraints)?;
        }
        schema.validate()?;
        Ok(schema)
    }

    /// Appends a column, rejecting blank or duplicate names and a second primary key
    pub fn define_column(
        &mut self,
        name: impl Into<String>,
        datatype: DataType,
        constraints: Constraints,
    ) -> Result<&Column> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::Schema(format!(
                "blank column name in table {}",
                self.name
            )));
        }
        if self.positions.contains_key(&name) {
            return Err(Error::Schema(format!(
                "duplicate column {} in table {}",
                name, self.name
            )));
        }
        let constraints = constraints.normalized();
        if constraints.primary_key {
            if let Some(pk) = self.primary_key() {
                return Err(Error::Schema(format!(
                    "multiple primary keys for table {}: {} and {}",
                    self.name, pk.name, name
                )));
            }
        }

        let pos = self.columns.len();
        self.positions.insert(name.clone(), pos);
        self.columns.push(Column { name, datatype, constraints });
        Ok(&self.columns[pos])
    }

    /// Validates table schema
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::Schema(format!("table {} has no columns", self.name)));
        }
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, pos: usize) -> &Column {
        &self.columns[pos]
    }

    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.constraints.primary_key)
    }

    /// Returns the column index for a given column name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn must_position(&self, name: &str) -> Result<usize> {
        self.position(name).ok_or_else(|| {
            Error::NotFound(format!("column {} in table {}", name, self.name))
        })
    }

    /// Checks arity, types and nullability of a full row
    pub fn check_row(&self, row: &Row) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::Schema(format!(
                "table {} expects {} values, got {}",
                self.name,
                self.columns.len(),
                row.len()
            )));
        }
        self.columns
            .iter()
            .zip(row)
            .try_for_each(|(col, value)| col.check_value(value))
    }
}
