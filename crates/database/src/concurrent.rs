use crate::async_connection::{AsyncScopedConnection, finish};
use crate::backend::AsyncConnector;
use crate::error::DbError;
use core_types::{Row, Value};
use futures::future::try_join_all;
use std::time::{Duration, Instant};

/// One read to run in its own session.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub statement: String,
    pub params: Vec<Value>,
    /// Simulated I/O delay, slept inside the open session before the statement runs.
    pub latency: Option<Duration>,
}

impl FetchRequest {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            params: Vec::new(),
            latency: None,
        }
    }

    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

/// The rows of every request, in request order, and how long the whole fan-out took.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchReport {
    pub results: Vec<Vec<Row>>,
    pub elapsed: Duration,
}

/// Starts every request at once and waits for all of them.
///
/// Each request gets its own session; none of them are serialized against each
/// other. On the first failure the remaining sessions are dropped, which
/// releases them on the rollback path, and that failure is returned.
pub async fn fetch_concurrently<C: AsyncConnector>(
    connection: &AsyncScopedConnection<C>,
    requests: &[FetchRequest],
) -> Result<FetchReport, DbError> {
    tracing::info!("Starting {} concurrent database queries", requests.len());
    let started = Instant::now();

    let results = try_join_all(
        requests
            .iter()
            .enumerate()
            .map(|(index, request)| fetch_one(connection, index, request)),
    )
    .await
    .inspect_err(|e| tracing::error!(error = %e, "Error in concurrent execution"))?;

    let elapsed = started.elapsed();
    tracing::info!("All queries completed concurrently in {:.3?}", elapsed);
    Ok(FetchReport { results, elapsed })
}

async fn fetch_one<C: AsyncConnector>(
    connection: &AsyncScopedConnection<C>,
    index: usize,
    request: &FetchRequest,
) -> Result<Vec<Row>, DbError> {
    let started = Instant::now();
    let mut session = connection.open().await?;

    if let Some(latency) = request.latency {
        tokio::time::sleep(latency).await;
    }
    let result = session.query(&request.statement, &request.params).await;
    let rows = finish(session, result).await?;

    tracing::debug!(
        request = index,
        "Fetch completed in {:.3?}, {} rows",
        started.elapsed(),
        rows.len()
    );
    Ok(rows)
}
