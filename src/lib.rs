//! # pg-loadgen — sustained random query load for PostgreSQL
//!
//! Opens a fixed pool of connections, runs a number of workers that keep
//! picking a random query from a list and executing it on an exclusively
//! checked-out connection, and prints aggregate totals every few seconds.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use pg_loadgen::prelude::*;
//! use std::sync::Arc;
//!
//! let settings = PartialSettings::default().resolve()?;
//! let url = settings.database_url();
//! let pool = Arc::new(Pool::build(settings.conn_count, || connect_postgres(&url)).await?);
//!
//! let counters = Arc::new(Counters::new());
//! let queries = Arc::new(settings.queries.clone());
//! let never = Shutdown::never();
//! spawn_workers(settings.query_count, &pool, &queries, &counters, &never);
//!
//! Reporter::new(counters, settings.interval, std::io::stdout())
//!     .run(never)
//!     .await?;
//! ```
//!
//! ## Moving parts
//!
//! | Piece      | Role                                              |
//! |------------|---------------------------------------------------|
//! | `Pool`     | `n` slots, random-pick non-blocking checkout      |
//! | `Worker`   | checkout → random query → count → release, forever |
//! | `Counters` | atomic executed / error totals                    |
//! | `Reporter` | one status line per interval                      |

pub mod config;
pub mod conn;
pub mod counters;
pub mod error;
pub mod pool;
pub mod reporter;
pub mod shutdown;
pub mod worker;

pub mod prelude {
    pub use crate::config::{PartialSettings, QuerySet, Settings};
    pub use crate::conn::{QueryConnection, connect_postgres};
    pub use crate::counters::{Counters, Snapshot};
    pub use crate::error::*;
    pub use crate::pool::{Checkout, Pool};
    pub use crate::reporter::{ReportFormat, Reporter};
    pub use crate::shutdown::Shutdown;
    pub use crate::worker::{Worker, spawn_workers};
}
