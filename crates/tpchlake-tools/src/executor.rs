//! SQL script executor.
//!
//! Runs a script statement by statement against DuckDB, rendering any rows
//! each statement returns. Engine errors go through an [`ErrorPolicy`].

use duckdb::arrow::datatypes::DataType;
use duckdb::types::Value;
use duckdb::Connection;
use std::io::{self, Write};
use std::path::Path;

use crate::error::{LakeError, Result};
use crate::render::{self, format_value, format_zoned_value, ResultSet};
use crate::script::{self, Variables};
use crate::session::LakeSession;

/// Practical limit on columns read per row.
const MAX_COLUMNS: usize = 1024;

/// What to do with engine errors that are not benign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Abort the script.
    #[default]
    Strict,
    /// Print a note and carry on with the next statement.
    Lenient,
}

/// Counters for one script run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Statements that ran successfully.
    pub executed: usize,
    /// Session setup statements skipped because the session was already prepared.
    pub skipped: usize,
    /// Statements whose errors were swallowed.
    pub suppressed: usize,
}

/// Executes SQL scripts and writes their results to `out`.
pub struct ScriptExecutor<W: Write> {
    alias: String,
    policy: ErrorPolicy,
    out: W,
}

impl ScriptExecutor<io::Stdout> {
    /// Executor printing to standard output.
    pub fn stdout(alias: impl Into<String>) -> Self {
        Self::new(alias, io::stdout())
    }
}

impl<W: Write> ScriptExecutor<W> {
    pub fn new(alias: impl Into<String>, out: W) -> Self {
        Self {
            alias: alias.into(),
            policy: ErrorPolicy::default(),
            out,
        }
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Load `<dir>/<name>` and run it.
    ///
    /// With a session the script runs on that connection and its setup
    /// statements are skipped; otherwise a fresh connection is opened and
    /// closed around the run.
    pub fn run_file(
        &mut self,
        dir: &Path,
        name: &str,
        vars: &Variables,
        session: Option<&LakeSession>,
    ) -> Result<ExecutionReport> {
        let sql = script::load_script(dir, name)?;
        tracing::info!(script = %name, placeholders = ?vars, "Running SQL script");

        match session {
            Some(session) => self.run_sql(session.connection(), true, &sql, vars),
            None => {
                let conn = Connection::open_in_memory()?;
                let report = self.run_sql(&conn, false, &sql, vars);
                if let Err((_, e)) = conn.close() {
                    tracing::warn!(error = %e, "Failed to close connection");
                }
                report
            }
        }
    }

    /// Substitute, split and execute `sql` on `conn`.
    pub fn run_sql(
        &mut self,
        conn: &Connection,
        session_ready: bool,
        sql: &str,
        vars: &Variables,
    ) -> Result<ExecutionReport> {
        let rendered = script::substitute(sql, vars, &self.alias);
        let mut report = ExecutionReport::default();

        for statement in script::parse_statements(&rendered) {
            let setup = script::is_session_setup(&statement);
            if setup && session_ready {
                tracing::debug!(statement = %statement, "Skipping setup statement on prepared session");
                report.skipped += 1;
                continue;
            }

            tracing::debug!(statement = %statement, "Executing statement");
            let outcome = if setup {
                conn.execute_batch(&statement).map(|_| ResultSet::default())
            } else {
                query(conn, &statement)
            };

            match outcome {
                Ok(result) => {
                    render::render(&mut self.out, &result)?;
                    report.executed += 1;
                }
                Err(e) => self.handle_failure(conn, &statement, e, &mut report)?,
            }
        }

        self.out.flush()?;
        tracing::debug!(
            executed = report.executed,
            skipped = report.skipped,
            suppressed = report.suppressed,
            "Script finished"
        );
        Ok(report)
    }

    fn handle_failure(
        &mut self,
        conn: &Connection,
        statement: &str,
        error: duckdb::Error,
        report: &mut ExecutionReport,
    ) -> Result<()> {
        let message = error.to_string();
        let lower = message.to_lowercase();

        if self.policy == ErrorPolicy::Strict
            && lower.contains("failed to attach")
            && lower.contains("no such file or directory")
        {
            return Err(LakeError::Sql(message));
        }

        if lower.contains("failed to find attached database") {
            if lower.contains(&self.alias.to_lowercase()) {
                if let Some(result) = self.retry_after_use(conn, statement) {
                    render::render(&mut self.out, &result)?;
                    report.executed += 1;
                    return Ok(());
                }
            }
            tracing::debug!(error = %message, "Attached database missing, statement skipped");
            report.suppressed += 1;
            return Ok(());
        }

        if is_benign(&lower) {
            tracing::debug!(error = %message, "Ignoring benign SQL error");
            report.suppressed += 1;
            return Ok(());
        }

        match self.policy {
            ErrorPolicy::Strict => Err(LakeError::Sql(message)),
            ErrorPolicy::Lenient => {
                writeln!(self.out, "Note: {}", message)?;
                report.suppressed += 1;
                Ok(())
            }
        }
    }

    /// Re-select the catalog and run the statement once more.
    fn retry_after_use(&self, conn: &Connection, statement: &str) -> Option<ResultSet> {
        let retried = conn
            .execute_batch(&format!("USE {};", self.alias))
            .and_then(|_| query(conn, statement));
        match retried {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::debug!(error = %e, "Retry after USE failed");
                None
            }
        }
    }
}

/// Errors that mean the desired state already holds.
pub fn is_benign(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("already exists") || lower.contains("does not exist")
}

/// Run one statement and collect its rows as display strings.
///
/// Timestamp columns that carry a time zone are rendered with a UTC offset.
pub fn query(conn: &Connection, sql: &str) -> duckdb::Result<ResultSet> {
    let mut stmt = conn.prepare(sql)?;
    let values = stmt
        .query_map([], |row| {
            let mut values = Vec::new();
            for idx in 0..MAX_COLUMNS {
                match row.get::<_, Value>(idx) {
                    Ok(value) => values.push(value),
                    Err(_) => break,
                }
            }
            Ok(values)
        })?
        .collect::<duckdb::Result<Vec<_>>>()?;

    let columns = stmt.column_names();
    let zoned: Vec<bool> = (0..columns.len())
        .map(|idx| matches!(stmt.column_type(idx), DataType::Timestamp(_, Some(_))))
        .collect();

    let rows = values
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(idx, value)| {
                    if zoned.get(idx).copied().unwrap_or(false) {
                        format_zoned_value(value)
                    } else {
                        format_value(value)
                    }
                })
                .collect()
        })
        .collect();
    Ok(ResultSet { columns, rows })
}
