use std::fmt::Display;

use crate::sql::types::{DataType, Operator};

/// Abstract Syntax Tree (AST) node definitions for SQL statements
#[derive(Debug, PartialEq)]
pub enum Statement {
    /// CREATE TABLE statement
    CreateTable {
        name: String,
        columns: Vec<Column>,
    },
    /// INSERT statement; `columns` is None when the column list is omitted
    Insert {
        table_name: String,
        columns: Option<Vec<String>>,
        values: Vec<Literal>,
    },
    /// SELECT statement
    Select(Select),
    /// UPDATE statement
    Update {
        table_name: String,
        assignments: Vec<(String, Literal)>,
        where_clause: Vec<Condition>,
    },
    /// DELETE statement
    Delete {
        table_name: String,
        where_clause: Vec<Condition>,
    },
    /// DROP TABLE statement
    Drop {
        table_name: String,
    },
    /// SCHEMA <table>
    DescribeSchema {
        table_name: String,
    },
    /// TABLES
    ListTables,
    /// EXPLAIN <select>
    Explain(Select),
}

/// Body of a SELECT statement
#[derive(Debug, PartialEq)]
pub struct Select {
    /// Empty means `*`
    pub projection: Vec<ColumnRef>,
    pub from: String,
    pub join: Option<Join>,
    pub where_clause: Vec<Condition>,
}

/// `JOIN <table> ON <left> = <right>`
#[derive(Debug, PartialEq)]
pub struct Join {
    pub table: String,
    pub left: ColumnRef,
    pub right: ColumnRef,
}

/// Column definition for CREATE TABLE statements
#[derive(Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub datatype: DataType,
    pub primary_key: bool,
    pub unique: bool,
    pub not_null: bool,
}

/// A possibly table-qualified column name
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn bare(name: impl Into<String>) -> Self {
        Self { table: None, name: name.into() }
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self { table: Some(table.into()), name: name.into() }
    }
}

impl Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// One `<column> <op> <literal>` term of a WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: ColumnRef,
    pub op: Operator,
    pub value: Literal,
}

/// Literal as written in the statement; coercion happens at execution time
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Number(String),
    String(String),
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Boolean(true) => write!(f, "TRUE"),
            Literal::Boolean(false) => write!(f, "FALSE"),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "'{}'", s),
        }
    }
}
