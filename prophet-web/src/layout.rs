//! Label-fit layout for a row of result badges
//!
//! A row holds a prefix of badges, an optional "+N more" label and a
//! trailing action control. Badge widths are only known after measurement,
//! so the visible count is recomputed whenever the row is resized or the
//! label set changes.

/// Fixed widths reserved around the badges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutMetrics {
    /// Space between two adjacent badges
    pub gap: u32,
    /// Width of the trailing action control
    pub action_width: u32,
    /// Width of the "+N more" overflow label
    pub overflow_width: u32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            gap: 12,
            action_width: 88,
            overflow_width: 64,
        }
    }
}

/// Maximum number of leading labels that fit the row.
///
/// The prefix, its inter-label gaps and the action control must fit
/// `row_width`. When some labels stay hidden the prefix must also leave room
/// for the overflow label; it shrinks one label at a time until it does, but
/// never below one label.
pub fn fit_labels(widths: &[u32], row_width: u32, metrics: &LayoutMetrics) -> usize {
    if widths.is_empty() {
        return 0;
    }
    let available = row_width.saturating_sub(metrics.action_width);

    let mut used = 0u32;
    let mut count = 0usize;
    for &width in widths {
        let gap = if count > 0 { metrics.gap } else { 0 };
        let next = used.saturating_add(gap).saturating_add(width);
        if next > available {
            break;
        }
        used = next;
        count += 1;
    }

    if count == 0 {
        return 1;
    }
    if count == widths.len() {
        return count;
    }

    while count > 1 && used.saturating_add(metrics.overflow_width) > available {
        used -= widths[count - 1] + metrics.gap;
        count -= 1;
    }
    count
}

/// Visible count shown before the first measurement completes
pub const DEFAULT_VISIBLE: usize = 3;

/// Tracks the visible badge count of one row across resizes.
///
/// Recomputation is idempotent and only reports a count when it differs from
/// the current one, so an unchanged layout never triggers a redraw.
#[derive(Debug, Clone)]
pub struct LabelFit {
    metrics: LayoutMetrics,
    visible: usize,
    measure_pending: bool,
}

impl LabelFit {
    /// A new row with its first measurement scheduled
    pub fn new(metrics: LayoutMetrics) -> Self {
        Self {
            metrics,
            visible: DEFAULT_VISIBLE,
            measure_pending: true,
        }
    }

    /// Current visible count, capped at the number of labels
    pub fn visible(&self, total: usize) -> usize {
        self.visible.min(total)
    }

    /// Number of labels summarized by the overflow label
    pub fn hidden(&self, total: usize) -> usize {
        total - self.visible(total)
    }

    /// The label set changed: schedule a deferred measurement
    pub fn labels_changed(&mut self) {
        self.measure_pending = true;
    }

    /// Drop a scheduled measurement that has not run yet
    pub fn cancel_pending(&mut self) {
        self.measure_pending = false;
    }

    pub fn is_measure_pending(&self) -> bool {
        self.measure_pending
    }

    /// Run the scheduled measurement, if any. It runs at most once per schedule.
    pub fn on_frame(&mut self, widths: &[u32], row_width: u32) -> Option<usize> {
        if !self.measure_pending {
            return None;
        }
        self.measure_pending = false;
        self.recompute(widths, row_width)
    }

    /// The row was resized
    pub fn on_resize(&mut self, widths: &[u32], row_width: u32) -> Option<usize> {
        self.recompute(widths, row_width)
    }

    /// Recompute the visible count. Returns the new count only if it changed.
    ///
    /// Nothing is computed while any label is still unmeasured (zero width).
    pub fn recompute(&mut self, widths: &[u32], row_width: u32) -> Option<usize> {
        if widths.is_empty() || widths.contains(&0) {
            return None;
        }
        let count = fit_labels(widths, row_width, &self.metrics);
        if count == self.visible {
            return None;
        }
        self.visible = count;
        Some(count)
    }
}

impl Default for LabelFit {
    fn default() -> Self {
        Self::new(LayoutMetrics::default())
    }
}
