use std::time::Instant;

use tracing::{debug, error, warn};

use crate::{
    config::Config,
    error::Result,
    sql::{executor::ResultSet, parser::{Parser, ast::Statement}, plan::Plan},
    storage::Database,
};

mod result;

pub use result::{ExecutionResult, ExecutionStats};

/// SQL session for executing statements
///
/// Each statement runs parse, plan, execute and flush to completion before
/// the next one starts. Callers that share a session across threads must
/// serialize access themselves.
pub struct Session {
    db: Database,
}

impl Session {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Opens the database described by `config` and starts a session on it
    pub fn open(config: Config) -> Result<Self> {
        Ok(Self::new(Database::open(config)?))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Executes one SQL statement.
    ///
    /// Domain errors come back as a failed `ExecutionResult`; only I/O and
    /// internal faults are returned as `Err`. A persistence failure leaves
    /// the in-memory change applied.
    pub fn execute(&mut self, sql: &str) -> Result<ExecutionResult> {
        let start = Instant::now();
        let outcome = Parser::new(sql).parse().and_then(|stmt| self.run(stmt));
        self.finish(outcome, start)
    }

    /// Executes an already parsed statement
    pub fn execute_statement(&mut self, stmt: Statement) -> Result<ExecutionResult> {
        let start = Instant::now();
        let outcome = self.run(stmt);
        self.finish(outcome, start)
    }

    fn run(&mut self, stmt: Statement) -> Result<ResultSet> {
        let plan = Plan::build(stmt)?;
        debug!(?plan, "executing plan");
        let result = plan.execute(&mut self.db)?;
        self.db.flush()?;
        Ok(result)
    }

    fn finish(&self, outcome: Result<ResultSet>, start: Instant) -> Result<ExecutionResult> {
        let elapsed = start.elapsed();
        match outcome {
            Ok(result) => Ok(ExecutionResult::from_result_set(result, elapsed)),
            Err(err) if err.is_fatal() => {
                error!(%err, "statement failed");
                Err(err)
            }
            Err(err) => {
                warn!(%err, "statement rejected");
                Ok(ExecutionResult::failure(err.to_string(), elapsed))
            }
        }
    }
}
