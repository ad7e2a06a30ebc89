//! Shared application state threaded through every handler via `axum::State`.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::db::Database;

/// Per-ticker async mutex, acquired around the whole submit/cancel critical
/// section so concurrent requests against the *same* instrument serialize
/// while requests against different instruments run fully in parallel.
///
/// This sits alongside the row-level `FOR UPDATE` locks taken inside the
/// transaction: the in-process lock avoids holding a DB connection idle
/// while a competing request waits on it, and orders resting-order scans the
/// same way across the whole engine regardless of which connection in the
/// pool happens to serve a given request.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    ticker_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            ticker_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn ticker_lock(&self, ticker: &str) -> Arc<Mutex<()>> {
        self.ticker_locks
            .entry(ticker.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
