use crate::error::CoreError;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// One row produced by a read, in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Vec<Value>);

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }

    /// Returns the value at `index`, or an error naming the row width.
    pub fn value(&self, index: usize) -> Result<&Value, CoreError> {
        self.0.get(index).ok_or(CoreError::ColumnOutOfRange {
            index,
            len: self.0.len(),
        })
    }

    pub fn as_i64(&self, index: usize) -> Result<i64, CoreError> {
        let value = self.value(index)?;
        value.as_i64().ok_or(CoreError::TypeMismatch {
            index,
            expected: "integer",
            found: value.type_name(),
        })
    }

    pub fn as_f64(&self, index: usize) -> Result<f64, CoreError> {
        let value = self.value(index)?;
        value.as_f64().ok_or(CoreError::TypeMismatch {
            index,
            expected: "real",
            found: value.type_name(),
        })
    }

    pub fn as_str(&self, index: usize) -> Result<&str, CoreError> {
        let value = self.value(index)?;
        value.as_str().ok_or(CoreError::TypeMismatch {
            index,
            expected: "text",
            found: value.type_name(),
        })
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for Row {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Row {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Row {
        Row::new(vec![
            Value::Integer(1),
            Value::Text("John Doe".into()),
            Value::Null,
        ])
    }

    #[test]
    fn typed_accessors_read_matching_columns() {
        let row = user();
        assert_eq!(row.as_i64(0), Ok(1));
        assert_eq!(row.as_f64(0), Ok(1.0));
        assert_eq!(row.as_str(1), Ok("John Doe"));
    }

    #[test]
    fn typed_accessors_report_mismatches() {
        let row = user();
        assert_eq!(
            row.as_i64(2),
            Err(CoreError::TypeMismatch {
                index: 2,
                expected: "integer",
                found: "null"
            })
        );
        assert_eq!(
            row.as_str(7),
            Err(CoreError::ColumnOutOfRange { index: 7, len: 3 })
        );
    }
}
