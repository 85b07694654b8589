use elements_core::change::{ChangeEvent, apply_change};
use elements_core::position::range_to_bytes;

/// Default maximum number of changes in a batch eligible for incremental parsing.
pub const DEFAULT_MAX_CHANGES: usize = 5;
/// Default exclusive upper bound (in characters) on the largest single change.
pub const DEFAULT_MAX_CHANGE_SIZE: usize = 1000;

/// Shape of a change batch, as seen by [`ChangeAnalyzer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    /// Number of changes in the batch.
    pub change_count: usize,
    /// Largest single change, in characters (max of replaced and inserted length).
    pub largest_change: usize,
    /// Whether any change replaces the whole document.
    pub has_full_replacement: bool,
}

/// Decides whether a change batch is small enough to be parsed incrementally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeAnalyzer {
    /// Maximum number of changes (inclusive).
    pub max_changes: usize,
    /// Largest allowed change size (exclusive).
    pub max_change_size: usize,
}

impl Default for ChangeAnalyzer {
    fn default() -> Self {
        Self {
            max_changes: DEFAULT_MAX_CHANGES,
            max_change_size: DEFAULT_MAX_CHANGE_SIZE,
        }
    }
}

impl ChangeAnalyzer {
    /// Create an analyzer with custom thresholds.
    pub fn new(max_changes: usize, max_change_size: usize) -> Self {
        Self {
            max_changes,
            max_change_size,
        }
    }

    /// Measure a batch against the content it applies to.
    ///
    /// Replaced lengths are measured against the text produced by the preceding changes, the
    /// same way the batch is applied.
    pub fn summarize(&self, old_content: &str, changes: &[ChangeEvent]) -> ChangeSummary {
        let mut summary = ChangeSummary {
            change_count: changes.len(),
            ..ChangeSummary::default()
        };
        let mut working = old_content.to_string();

        for change in changes {
            let replaced = match change.range.as_ref() {
                Some(range) => working[range_to_bytes(&working, range)].chars().count(),
                None => {
                    summary.has_full_replacement = true;
                    working.chars().count()
                }
            };
            let inserted = change.text.chars().count();
            summary.largest_change = summary.largest_change.max(replaced).max(inserted);
            apply_change(&mut working, change);
        }

        summary
    }

    /// Whether `changes` should take the incremental path.
    ///
    /// An empty batch is not eligible: there is nothing to reuse, and a full parse of unchanged
    /// content is what the caller needs anyway.
    pub fn should_use_incremental(&self, old_content: &str, changes: &[ChangeEvent]) -> bool {
        if changes.is_empty() || changes.len() > self.max_changes {
            return false;
        }
        if changes.iter().any(ChangeEvent::is_full_replacement) {
            return false;
        }
        self.summarize(old_content, changes).largest_change < self.max_change_size
    }
}
