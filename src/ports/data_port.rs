//! Market data source port.

use crate::domain::error::PipelineError;
use crate::domain::ohlcv::Bar;
use crate::domain::timeframe::{Interval, Period};

/// Supplies the bar series for a ticker. Implementations are shared across worker
/// threads.
pub trait DataPort: Send + Sync {
    /// Bars ordered by time. Fails with `NoData` when the source has nothing for the
    /// ticker.
    fn fetch(
        &self,
        ticker: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<Bar>, PipelineError>;
}
