use crate::backend::{Connector, Handle};
use crate::error::DbError;
use core_types::{Outcome, Row, Value};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, OpenFlags, Statement, params_from_iter};
use std::time::Duration;

/// Opens blocking SQLite connections with `rusqlite`.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    busy_timeout: Duration,
    foreign_keys: bool,
}

impl Default for SqliteConnector {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            foreign_keys: true,
        }
    }
}

impl SqliteConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// How long a statement waits on a lock held by another connection.
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }
}

impl Connector for SqliteConnector {
    type Handle = SqliteHandle;

    fn connect(&self, target: &str) -> Result<SqliteHandle, DbError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        // A failure past this point drops `conn`, which closes it.
        let conn = Connection::open_with_flags(target, flags)
            .map_err(|e| DbError::connection(target, e))?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| DbError::connection(target, e))?;
        // Has no effect inside a transaction, so it must precede BEGIN.
        conn.pragma_update(None, "foreign_keys", self.foreign_keys)
            .map_err(|e| DbError::connection(target, e))?;
        conn.execute_batch("BEGIN DEFERRED")
            .map_err(|e| DbError::connection(target, e))?;

        tracing::debug!("Opened SQLite connection to {}", target);
        Ok(SqliteHandle { conn })
    }
}

/// A `rusqlite` connection with an open transaction.
#[derive(Debug)]
pub struct SqliteHandle {
    conn: Connection,
}

impl Handle for SqliteHandle {
    fn run(&mut self, statement: &str, params: &[Value]) -> Result<Outcome, DbError> {
        let mut stmt = self.conn.prepare(statement).map_err(query_error)?;
        // SQLite knows whether the compiled statement writes; the verb alone does not
        // (`WITH ... DELETE`, `INSERT ... RETURNING`).
        if stmt.readonly() {
            collect_rows(&mut stmt, params).map(Outcome::Rows)
        } else {
            write(&self.conn, &mut stmt, params).map(Outcome::Affected)
        }
    }

    fn query(&mut self, statement: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        let mut stmt = self.conn.prepare(statement).map_err(query_error)?;
        collect_rows(&mut stmt, params)
    }

    fn execute(&mut self, statement: &str, params: &[Value]) -> Result<u64, DbError> {
        let mut stmt = self.conn.prepare(statement).map_err(query_error)?;
        write(&self.conn, &mut stmt, params)
    }

    fn commit(&mut self) -> Result<(), DbError> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| DbError::Commit(e.to_string()))
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| DbError::Rollback(e.to_string()))
    }

    fn close(self) -> Result<(), DbError> {
        // SQLite discards a transaction that is still open when its connection closes.
        self.conn
            .close()
            .map_err(|(_, e)| DbError::Release(e.to_string()))
    }
}

fn collect_rows(stmt: &mut Statement<'_>, params: &[Value]) -> Result<Vec<Row>, DbError> {
    let width = stmt.column_count();
    stmt.query_map(params_from_iter(params.iter().map(to_sql)), |row| {
        (0..width)
            .map(|index| row.get_ref(index).map(from_sql))
            .collect::<Result<Row, _>>()
    })
    .map_err(query_error)?
    .collect::<Result<Vec<_>, _>>()
    .map_err(query_error)
}

/// Runs a writing statement to completion and returns how many rows it changed.
fn write(conn: &Connection, stmt: &mut Statement<'_>, params: &[Value]) -> Result<u64, DbError> {
    let params = params_from_iter(params.iter().map(to_sql));
    if stmt.column_count() == 0 {
        return stmt.execute(params).map(|n| n as u64).map_err(query_error);
    }
    // `RETURNING` rows are stepped through and dropped; the change count is what a write reports.
    let mut rows = stmt.query(params).map_err(query_error)?;
    while rows.next().map_err(query_error)?.is_some() {}
    drop(rows);
    Ok(conn.changes())
}

fn query_error(e: rusqlite::Error) -> DbError {
    DbError::Query(e.to_string())
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Blob(b) => SqlValue::Blob(b.clone()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}
