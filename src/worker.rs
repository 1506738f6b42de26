//! The worker loop.
//!
//! Each iteration checks out a slot, runs one random query on it, records
//! the outcome and releases the slot. A failed query is logged and counted,
//! never fatal, and the same connection keeps being used afterwards.
//!
//! Queries have no timeout. One that never returns pins its worker and its
//! slot for good, quietly shrinking the usable pool by one.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::config::QuerySet;
use crate::conn::QueryConnection;
use crate::counters::Counters;
use crate::error::LoadResult;
use crate::pool::Pool;
use crate::shutdown::Shutdown;

/// One parallel load task.
pub struct Worker<C> {
    id: usize,
    pool: Arc<Pool<C>>,
    queries: Arc<QuerySet>,
    counters: Arc<Counters>,
}

impl<C: QueryConnection> Worker<C> {
    pub fn new(
        id: usize,
        pool: Arc<Pool<C>>,
        queries: Arc<QuerySet>,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            id,
            pool,
            queries,
            counters,
        }
    }

    /// Run one iteration.
    ///
    /// The query's result is returned for inspection only; it has already
    /// been counted (and logged, if it failed) by the time this returns.
    pub async fn run_once(&self) -> LoadResult<()> {
        let mut slot = self.pool.checkout().await;
        let query = self.queries.pick();

        let result = slot.execute(query).await;
        match &result {
            Ok(()) => self.counters.record_success(),
            Err(e) => {
                warn!(
                    worker = self.id,
                    slot = slot.index(),
                    query,
                    error = %e,
                    "error executing query"
                );
                self.counters.record_error();
            }
        }

        slot.release();
        result
    }

    /// Loop until `shutdown` fires. Without a shutdown this never returns.
    ///
    /// The signal is checked before each checkout, so an iteration that has
    /// started always finishes and is counted.
    pub async fn run(self, shutdown: Shutdown) {
        while !shutdown.is_fired() {
            let _ = self.run_once().await;
        }
    }
}

/// Launch `count` workers sharing one pool, query set and counter block.
pub fn spawn_workers<C: QueryConnection>(
    count: usize,
    pool: &Arc<Pool<C>>,
    queries: &Arc<QuerySet>,
    counters: &Arc<Counters>,
    shutdown: &Shutdown,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|id| {
            let worker = Worker::new(
                id,
                Arc::clone(pool),
                Arc::clone(queries),
                Arc::clone(counters),
            );
            tokio::spawn(worker.run(shutdown.clone()))
        })
        .collect()
}
