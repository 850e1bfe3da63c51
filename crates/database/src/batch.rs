use crate::backend::Connector;
use crate::connection::ScopedConnection;
use crate::error::DbError;
use core_types::{Row, StatementKind, Value};

impl<C: Connector> ScopedConnection<C> {
    /// Streams the rows of a read in pages of `batch_size`.
    ///
    /// `LIMIT ? OFFSET ?` is appended to `query` and bound after `params`, so the
    /// query should carry a stable `ORDER BY`. Each page is fetched in its own
    /// session, only when the iterator is advanced.
    pub fn batches(
        &self,
        query: &str,
        params: &[Value],
        batch_size: usize,
    ) -> Result<Batches<'_, C>, DbError> {
        if batch_size == 0 {
            return Err(DbError::InvalidBatchSize(batch_size));
        }
        if StatementKind::classify(query) != StatementKind::Read {
            return Err(DbError::Query(format!(
                "only reads can be batched, got: {}",
                query.trim()
            )));
        }

        let base = query.trim().trim_end_matches(';').trim_end();
        Ok(Batches {
            connection: self,
            statement: format!("{} LIMIT ? OFFSET ?", base),
            params: params.to_vec(),
            batch_size,
            offset: 0,
            done: false,
        })
    }

    /// Streams the rows of a read one at a time, fetching a page of `page_size`
    /// whenever the previous page runs out.
    pub fn paginate(
        &self,
        query: &str,
        params: &[Value],
        page_size: usize,
    ) -> Result<PagedRows<'_, C>, DbError> {
        Ok(self.batches(query, params, page_size)?.rows())
    }
}

/// Pages of a read, each fetched in its own session.
///
/// Ends after the first empty or short page, or after yielding an error.
#[derive(Debug)]
pub struct Batches<'a, C: Connector> {
    connection: &'a ScopedConnection<C>,
    statement: String,
    params: Vec<Value>,
    batch_size: usize,
    offset: usize,
    done: bool,
}

impl<'a, C: Connector> Batches<'a, C> {
    /// Flattens the pages into individual rows.
    pub fn rows(self) -> PagedRows<'a, C> {
        PagedRows {
            batches: self,
            current: Vec::new().into_iter(),
        }
    }

    fn fetch_page(&self) -> Result<Vec<Row>, DbError> {
        let mut params = self.params.clone();
        params.push(Value::Integer(to_i64(self.batch_size)));
        params.push(Value::Integer(to_i64(self.offset)));
        // A write that slipped past the verb check is rolled back here.
        self.connection.execute(&self.statement, &params, |outcome| {
            outcome.into_rows().ok_or_else(|| {
                DbError::Query(format!("only reads can be batched, got: {}", self.statement))
            })
        })
    }
}

impl<C: Connector> Iterator for Batches<'_, C> {
    type Item = Result<Vec<Row>, DbError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.fetch_page() {
            Ok(batch) if batch.is_empty() => {
                self.done = true;
                None
            }
            Ok(batch) => {
                tracing::debug!("Fetched batch of {} rows at offset {}", batch.len(), self.offset);
                self.offset += batch.len();
                self.done = batch.len() < self.batch_size;
                Some(Ok(batch))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Rows of a read, fetched a page at a time.
#[derive(Debug)]
pub struct PagedRows<'a, C: Connector> {
    batches: Batches<'a, C>,
    current: std::vec::IntoIter<Row>,
}

impl<C: Connector> Iterator for PagedRows<'_, C> {
    type Item = Result<Row, DbError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.current.next() {
                return Some(Ok(row));
            }
            match self.batches.next()? {
                Ok(batch) => self.current = batch.into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Streams the mean of a numeric column without loading every row.
///
/// `NULL`s are skipped, as SQL's `AVG` does. Returns `None` when no non-null
/// value was seen.
pub fn column_mean<I>(rows: I, column: usize) -> Result<Option<f64>, DbError>
where
    I: IntoIterator<Item = Result<Row, DbError>>,
{
    let mut total = 0.0;
    let mut count: u64 = 0;
    for row in rows {
        let row = row?;
        if row.value(column)?.is_null() {
            continue;
        }
        total += row.as_f64(column)?;
        count += 1;
    }
    Ok((count > 0).then(|| total / count as f64))
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ages(values: &[Option<i64>]) -> Vec<Result<Row, DbError>> {
        values
            .iter()
            .map(|age| Ok(Row::new(vec![Value::from(*age)])))
            .collect()
    }

    #[test]
    fn mean_skips_nulls() {
        let mean = column_mean(ages(&[Some(20), None, Some(30)]), 0).unwrap();
        assert_eq!(mean, Some(25.0));
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(column_mean(ages(&[]), 0).unwrap(), None);
        assert_eq!(column_mean(ages(&[None]), 0).unwrap(), None);
    }

    #[test]
    fn mean_stops_at_the_first_error() {
        let mut rows = ages(&[Some(1)]);
        rows.push(Err(DbError::Query("boom".into())));
        assert_eq!(
            column_mean(rows, 0),
            Err(DbError::Query("boom".into()))
        );
    }

    #[test]
    fn mean_rejects_text_columns() {
        let rows = vec![Ok(Row::new(vec![Value::Text("old".into())]))];
        assert!(matches!(column_mean(rows, 0), Err(DbError::Column(_))));
    }
}
