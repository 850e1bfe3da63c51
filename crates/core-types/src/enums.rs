use crate::structs::Row;
use serde::{Deserialize, Serialize};

/// Whether a statement produces rows or changes the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementKind {
    Read,
    Write,
}

impl StatementKind {
    /// Guesses a statement's kind from its leading verb, without asking the store.
    ///
    /// `SELECT`, `WITH`, `VALUES` and `EXPLAIN` are reads, as is a `PRAGMA` that
    /// does not assign. Every other verb (DML and DDL alike) is a write. A CTE
    /// that ends in `DELETE` still reads as `Read` here; sessions route on what
    /// the store reports, so use this only as an early filter.
    pub fn classify(statement: &str) -> Self {
        let verb = Self::leading_verb(statement).to_ascii_uppercase();
        match verb.as_str() {
            "SELECT" | "WITH" | "VALUES" | "EXPLAIN" => StatementKind::Read,
            "PRAGMA" if !statement.contains('=') => StatementKind::Read,
            _ => StatementKind::Write,
        }
    }

    /// Returns the first keyword of a statement, skipping whitespace and comments.
    /// An empty result means the statement has nothing to execute.
    pub fn leading_verb(statement: &str) -> &str {
        let mut rest = statement;
        loop {
            rest = rest.trim_start();
            if let Some(after) = rest.strip_prefix("--") {
                rest = after.split_once('\n').map_or("", |(_, tail)| tail);
            } else if let Some(after) = rest.strip_prefix("/*") {
                rest = after.split_once("*/").map_or("", |(_, tail)| tail);
            } else {
                break;
            }
        }
        let end = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        &rest[..end]
    }
}

/// The result of running one statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every row a read produced, fetched eagerly.
    Rows(Vec<Row>),
    /// The number of rows a write changed.
    Affected(u64),
}

impl Outcome {
    pub fn kind(&self) -> StatementKind {
        match self {
            Outcome::Rows(_) => StatementKind::Read,
            Outcome::Affected(_) => StatementKind::Write,
        }
    }

    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            Outcome::Rows(rows) => Some(rows),
            Outcome::Affected(_) => None,
        }
    }

    pub fn into_rows(self) -> Option<Vec<Row>> {
        match self {
            Outcome::Rows(rows) => Some(rows),
            Outcome::Affected(_) => None,
        }
    }

    pub fn affected(&self) -> Option<u64> {
        match self {
            Outcome::Affected(n) => Some(*n),
            Outcome::Rows(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_recognised_case_insensitively() {
        assert_eq!(StatementKind::classify("SELECT * FROM users"), StatementKind::Read);
        assert_eq!(StatementKind::classify("  select 1"), StatementKind::Read);
        assert_eq!(
            StatementKind::classify("WITH old AS (SELECT 1) SELECT * FROM old"),
            StatementKind::Read
        );
        assert_eq!(StatementKind::classify("VALUES (1), (2)"), StatementKind::Read);
        assert_eq!(StatementKind::classify("PRAGMA table_info(users)"), StatementKind::Read);
    }

    #[test]
    fn writes_and_ddl_are_writes() {
        assert_eq!(
            StatementKind::classify("INSERT INTO users (name) VALUES (?)"),
            StatementKind::Write
        );
        assert_eq!(StatementKind::classify("update users set age = 1"), StatementKind::Write);
        assert_eq!(StatementKind::classify("CREATE TABLE t (x)"), StatementKind::Write);
        assert_eq!(StatementKind::classify("PRAGMA user_version = 3"), StatementKind::Write);
    }

    #[test]
    fn comments_before_the_verb_are_skipped() {
        let sql = "-- fetch everyone\n/* all of them */ SELECT * FROM users";
        assert_eq!(StatementKind::leading_verb(sql), "SELECT");
        assert_eq!(StatementKind::classify(sql), StatementKind::Read);
    }

    #[test]
    fn blank_statements_have_no_verb() {
        assert_eq!(StatementKind::leading_verb("   "), "");
        assert_eq!(StatementKind::leading_verb("-- only a comment"), "");
    }

    #[test]
    fn outcome_accessors_match_the_variant() {
        let rows = Outcome::Rows(vec![Row::default()]);
        assert_eq!(rows.kind(), StatementKind::Read);
        assert_eq!(rows.rows().map(<[Row]>::len), Some(1));
        assert_eq!(rows.affected(), None);

        let affected = Outcome::Affected(3);
        assert_eq!(affected.kind(), StatementKind::Write);
        assert_eq!(affected.affected(), Some(3));
        assert!(affected.into_rows().is_none());
    }
}
