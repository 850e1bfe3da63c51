use crate::error::DbError;
use core_types::{StatementKind, Value};
use uuid::Uuid;

/// Logs a statement for a session before it runs.
///
/// Statements with no verb (blank, or only comments) are rejected up front so
/// the backend never sees them.
pub(crate) fn prepare(session: Uuid, statement: &str, params: &[Value]) -> Result<(), DbError> {
    if StatementKind::leading_verb(statement).is_empty() {
        tracing::warn!(session = %session, "Rejected an empty statement");
        return Err(DbError::Query("statement is empty".to_string()));
    }

    if params.is_empty() {
        tracing::info!(session = %session, "Executing SQL query: {}", statement.trim());
    } else {
        tracing::info!(session = %session, ?params, "Executing SQL query: {}", statement.trim());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_statements_are_query_errors() {
        let err = prepare(Uuid::new_v4(), "  -- nothing here", &[]).unwrap_err();
        assert_eq!(err, DbError::Query("statement is empty".to_string()));
    }

    #[test]
    fn statements_with_a_verb_are_accepted() {
        let prepared = prepare(Uuid::new_v4(), "/* lead */ SELECT * FROM users WHERE age > ?", &[25.into()]);
        assert_eq!(prepared, Ok(()));
    }
}
