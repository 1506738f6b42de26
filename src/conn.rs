//! The connection seam.
//!
//! The pool and the workers only ever need one capability from a database
//! connection: run a query and report whether it worked. Anything that can
//! do that implements [`QueryConnection`], which keeps the concurrency core
//! independent of the driver.

use std::future::Future;

use sqlx::{Connection, Executor, PgConnection};

use crate::error::{LoadError, LoadResult};

/// A connection that can execute a query string.
///
/// Results are discarded; only success or failure matters.
pub trait QueryConnection: Send + 'static {
    /// Execute `query` and wait for it to finish.
    fn execute(&mut self, query: &str) -> impl Future<Output = LoadResult<()>> + Send;
}

impl QueryConnection for PgConnection {
    async fn execute(&mut self, query: &str) -> LoadResult<()> {
        // A bare &str has no bind arguments, so sqlx sends it over the
        // simple query protocol and multi-statement strings work.
        Executor::execute(&mut *self, query)
            .await
            .map(|_| ())
            .map_err(|e| LoadError::Execution(e.to_string()))
    }
}

/// Open a single PostgreSQL connection.
///
/// # Example
///
/// ```rust,ignore
/// let conn = connect_postgres("postgresql://me@localhost:5432/me").await?;
/// ```
pub async fn connect_postgres(url: &str) -> LoadResult<PgConnection> {
    PgConnection::connect(url)
        .await
        .map_err(|e| LoadError::Connection(e.to_string()))
}
