//! minidb - A small single-node relational store
//!
//! This crate provides:
//! - SQL parsing (lexer, parser, AST) for a restricted dialect
//! - Query planning and execution, including a nested-loop join
//! - Schema, type and uniqueness enforcement backed by hash indexes
//! - One bincode file per table, replaced atomically after every change

pub mod config;
pub mod error;
pub mod sql;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use sql::engine::{ExecutionResult, ExecutionStats, Session};
