use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Column index {index} is out of range for a row of {len} values")]
    ColumnOutOfRange { index: usize, len: usize },

    #[error("Column {index} holds a {found} value, expected {expected}")]
    TypeMismatch {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },
}
