use std::{cmp::Ordering, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    sql::parser::ast::Literal,
};

/// Supported SQL data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Text,
    Boolean,
}

impl DataType {
    /// Coerces a parsed literal into a value of this type.
    ///
    /// NULL passes through untouched; nullability is the column's business.
    pub fn coerce(&self, literal: &Literal) -> Result<Value> {
        let mismatch = || {
            Error::Type(format!(
                "cannot convert {} to {}",
                literal, self
            ))
        };
        Ok(match (self, literal) {
            (_, Literal::Null) => Value::Null,
            (DataType::Integer, Literal::Number(n)) => {
                Value::Integer(n.parse().map_err(|_| mismatch())?)
            }
            (DataType::Integer, Literal::String(s)) => {
                Value::Integer(s.trim().parse().map_err(|_| mismatch())?)
            }
            (DataType::Text, Literal::String(s)) => Value::Text(s.clone()),
            (DataType::Boolean, Literal::Boolean(b)) => Value::Boolean(*b),
            (DataType::Boolean, Literal::Number(n)) => match n.as_str() {
                "0" => Value::Boolean(false),
                "1" => Value::Boolean(true),
                _ => return Err(mismatch()),
            },
            (DataType::Boolean, Literal::String(s)) => match s.to_lowercase().as_str() {
                "true" => Value::Boolean(true),
                "false" => Value::Boolean(false),
                _ => return Err(mismatch()),
            },
            _ => return Err(mismatch()),
        })
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DataType::Integer => "INTEGER",
            DataType::Text => "TEXT",
            DataType::Boolean => "BOOLEAN",
        })
    }
}

/// Runtime value stored in a row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Text(String),
}

impl Value {
    /// Returns the data type of the value, or None if it's Null
    pub fn datatype(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Boolean(_) => Some(DataType::Boolean),
            Self::Integer(_) => Some(DataType::Integer),
            Self::Text(_) => Some(DataType::Text),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) if *b => write!(f, "TRUE"),
            Value::Boolean(_) => write!(f, "FALSE"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Values only order against values of the same type; NULL orders against nothing
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.partial_cmp(b),
            (_, _) => None,
        }
    }
}

/// A row is a vector of values laid out in schema column order
pub type Row = Vec<Value>;

/// Comparison operators allowed in WHERE clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
}

impl Operator {
    /// Evaluates `lhs <op> rhs`.
    ///
    /// `=` and `!=` treat NULL as an ordinary marker, so `c = NULL` finds
    /// null cells. Ordering comparisons involving NULL never hold.
    pub fn evaluate(&self, lhs: &Value, rhs: &Value) -> bool {
        match self {
            Operator::Equal => lhs == rhs,
            Operator::NotEqual => lhs != rhs,
            Operator::LessThan => lhs.partial_cmp(rhs) == Some(Ordering::Less),
            Operator::GreaterThan => lhs.partial_cmp(rhs) == Some(Ordering::Greater),
            Operator::LessThanOrEqual => matches!(
                lhs.partial_cmp(rhs),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::GreaterThanOrEqual => matches!(
                lhs.partial_cmp(rhs),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::GreaterThan => ">",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThanOrEqual => ">=",
        })
    }
}
