//! Run-completion notification port.

use crate::domain::error::PipelineError;
use crate::domain::summary::RunSummary;

pub trait NotifyPort: Send + Sync {
    fn notify(&self, summary: &RunSummary) -> Result<(), PipelineError>;
}
