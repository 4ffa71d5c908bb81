/// Multi-item operation, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Loading,
    Averaging,
    Tracing,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading items"),
            Self::Averaging => write!(f, "Averaging items"),
            Self::Tracing => write!(f, "Computing ROI traces"),
        }
    }
}

/// Progress observer for multi-item operations.
///
/// Operations run synchronously on the caller's thread and call `advance`
/// after every item, so a host UI can pump its event loop from there.
/// All methods have default no-op implementations.
pub trait ProgressReporter {
    /// A new stage has started over `total_items` work items.
    fn begin_stage(&self, _stage: Stage, _total_items: usize) {}

    /// `items_done` work items of the current stage have completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// Reporter that ignores all progress.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpReporter;

impl ProgressReporter for NoOpReporter {}
