use std::cell::RefCell;
use std::time::{Duration, Instant};

use tracing::debug;

use super::{ExportConfig, HealthDataSource, SourceError};
use crate::core::DailyRecords;

/// Default lifetime of a cached read.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct Entry {
    config: ExportConfig,
    read_at: Instant,
    records: DailyRecords,
}

/// Memoizes the last read of an inner source for a short time.
///
/// A cached result is reused only for an identical [`ExportConfig`].
pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    entry: RefCell<Option<Entry>>,
}

impl<S> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        Self::with_ttl(inner, DEFAULT_TTL)
    }

    pub fn with_ttl(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entry: RefCell::new(None),
        }
    }

    /// Forget the cached read.
    pub fn invalidate(&self) {
        self.entry.borrow_mut().take();
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: HealthDataSource> HealthDataSource for CachedSource<S> {
    fn read_by_day(&self, config: &ExportConfig) -> Result<DailyRecords, SourceError> {
        if let Some(entry) = self.entry.borrow().as_ref() {
            if entry.config == *config && entry.read_at.elapsed() < self.ttl {
                debug!(days = entry.records.len(), "Using cached health data");
                return Ok(entry.records.clone());
            }
        }
        let records = self.inner.read_by_day(config)?;
        *self.entry.borrow_mut() = Some(Entry {
            config: config.clone(),
            read_at: Instant::now(),
            records: records.clone(),
        });
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Metric;
    use std::cell::Cell;

    struct Counting {
        reads: Cell<usize>,
    }

    impl HealthDataSource for Counting {
        fn read_by_day(&self, _config: &ExportConfig) -> Result<DailyRecords, SourceError> {
            self.reads.set(self.reads.get() + 1);
            Ok(DailyRecords::new())
        }
    }

    #[test]
    fn reuses_read_for_same_config() {
        let source = CachedSource::new(Counting { reads: Cell::new(0) });
        let config = ExportConfig::new(Some(7), [Metric::Steps]);
        source.read_by_day(&config).unwrap();
        source.read_by_day(&config).unwrap();
        assert_eq!(source.inner().reads.get(), 1);

        source.read_by_day(&ExportConfig::new(Some(3), [Metric::Steps])).unwrap();
        assert_eq!(source.inner().reads.get(), 2);
    }

    #[test]
    fn expired_entries_are_reread() {
        let source = CachedSource::with_ttl(Counting { reads: Cell::new(0) }, Duration::ZERO);
        let config = ExportConfig::recent_all();
        source.read_by_day(&config).unwrap();
        source.read_by_day(&config).unwrap();
        assert_eq!(source.inner().reads.get(), 2);
    }
}
