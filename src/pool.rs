//! Fixed-size connection pool with random-pick checkout.
//!
//! The pool owns `n` slots, each a connection behind an exclusivity token.
//! Slots are created once in [`Pool::build`] and never added, removed or
//! replaced afterwards.
//!
//! Checkout picks a slot uniformly at random and tries to claim it without
//! waiting. On a miss it picks again, forever. There is no queue and no
//! fairness: with fewer active workers than slots a free slot turns up
//! quickly, with more it degrades into spin-waiting.
//!
//! # Example
//!
//! ```rust,ignore
//! let pool = Pool::build(10, || connect_postgres(&url)).await?;
//!
//! let mut slot = pool.checkout().await;
//! slot.execute("select 1").await?;
//! slot.release();
//! ```

use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::error::{LoadError, LoadResult};

/// A fixed set of connection slots.
pub struct Pool<C> {
    slots: Vec<Mutex<C>>,
    held: AtomicUsize,
}

impl<C> Pool<C> {
    /// Open `n` connections by calling `connect` `n` times, one after another.
    ///
    /// Every slot starts out available. The first failure aborts the whole
    /// build and the connections opened so far are dropped.
    pub async fn build<F, Fut>(n: usize, mut connect: F) -> LoadResult<Self>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = LoadResult<C>>,
    {
        if n == 0 {
            return Err(LoadError::config("pool needs at least one connection"));
        }

        let mut slots = Vec::with_capacity(n);
        for index in 0..n {
            let conn = connect().await?;
            debug!(slot = index, "connection established");
            slots.push(Mutex::new(conn));
        }

        Ok(Self::from_connections(slots))
    }

    fn from_connections(slots: Vec<Mutex<C>>) -> Self {
        Self {
            slots,
            held: AtomicUsize::new(0),
        }
    }

    /// Number of slots. Fixed for the lifetime of the pool.
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots currently checked out.
    pub fn held(&self) -> usize {
        self.held.load(Ordering::Acquire)
    }

    /// Claim a slot, retrying random picks until one is free.
    ///
    /// Yields to the scheduler between misses so that holders can make
    /// progress. Never gives up.
    pub async fn checkout(&self) -> Checkout<'_, C> {
        loop {
            if let Some(slot) = self.try_checkout() {
                return slot;
            }
            tokio::task::yield_now().await;
        }
    }

    /// A single non-blocking claim attempt on a randomly chosen slot.
    pub fn try_checkout(&self) -> Option<Checkout<'_, C>> {
        let index = rand::rng().random_range(0..self.slots.len());
        self.try_claim(index)
    }

    fn try_claim(&self, index: usize) -> Option<Checkout<'_, C>> {
        let guard = self.slots[index].try_lock().ok()?;
        self.held.fetch_add(1, Ordering::AcqRel);
        Some(Checkout {
            index,
            guard,
            held: &self.held,
        })
    }
}

/// Exclusive, temporary ownership of one slot's connection.
///
/// The slot goes back to the pool when this is released or dropped,
/// whichever comes first, so every exit path returns it exactly once.
pub struct Checkout<'a, C> {
    index: usize,
    guard: MutexGuard<'a, C>,
    held: &'a AtomicUsize,
}

impl<C> Checkout<'_, C> {
    /// Position of the claimed slot in the pool.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Return the slot to the pool.
    pub fn release(self) {
        drop(self);
    }
}

impl<C> Drop for Checkout<'_, C> {
    fn drop(&mut self) {
        // Decrement before the guard unlocks so `held()` never overshoots.
        self.held.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<C> Deref for Checkout<'_, C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<C> DerefMut for Checkout<'_, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}
