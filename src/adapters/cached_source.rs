//! Time-bounded cache in front of any [`DataPort`].

use crate::domain::error::PipelineError;
use crate::domain::ohlcv::Bar;
use crate::domain::timeframe::{Interval, Period};
use crate::ports::data_port::DataPort;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

type Key = (String, Period, Interval);

struct Entry {
    fetched_at: Instant,
    bars: Arc<Vec<Bar>>,
}

/// Serves repeated fetches of the same (ticker, period, interval) from memory until
/// `ttl` has elapsed. Errors are never cached.
pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    entries: Mutex<HashMap<Key, Entry>>,
}

impl<S: DataPort> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: DataPort> DataPort for CachedSource<S> {
    fn fetch(
        &self,
        ticker: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<Bar>, PipelineError> {
        let key = (ticker.to_string(), period, interval);
        let cached = self
            .entries
            .lock()
            .get(&key)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.bars));
        if let Some(bars) = cached {
            debug!(ticker, "source cache hit");
            return Ok(bars.as_ref().clone());
        }

        // The lock is not held across the fetch; concurrent misses may both fetch.
        let bars = Arc::new(self.inner.fetch(ticker, period, interval)?);
        self.entries.lock().insert(
            key,
            Entry {
                fetched_at: Instant::now(),
                bars: Arc::clone(&bars),
            },
        );
        Ok(bars.as_ref().clone())
    }
}
