//! SQL processing module
//!
//! This module provides:
//! - `parser`: SQL lexer and parser
//! - `types`: SQL data types, values and comparison operators
//! - `schema`: Table and column schema definitions
//! - `plan`: Execution plan generation
//! - `executor`: Query and mutation execution
//! - `engine`: Sessions and execution results

pub mod parser;
pub mod types;
pub mod schema;
pub mod plan;
pub mod executor;
pub mod engine;
