use anyhow::Result;

use crate::status::StatusAggregator;

/// A capture job built on a [`StatusAggregator`].
///
/// `start` and `stop` return once the external step has been requested; the
/// resulting state changes arrive through [`CaptureJob::status`].
pub trait CaptureJob: Send + Sync {
    fn start(&self) -> Result<()>;

    fn stop(&self) -> Result<()>;

    fn status(&self) -> &StatusAggregator;
}
