use tracing::trace;

use crate::core::Consistent;
use crate::error::GridResult;

use super::GanttController;
use super::height_cache::HeightCache;

/// Window position requested by a pair of scroll ratios.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollTarget {
    /// Start the window at `index`, with `offset` pixels of it hidden.
    Start { index: usize, offset: f64 },
    /// End the window at the last row.
    End { index: usize },
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Maps scroll ratios in `0..=1` onto a window anchor. A start ratio of
/// zero pins the top; an end ratio of one pins the bottom.
#[must_use]
pub fn window_for_scroll_ratio(cache: &HeightCache, start_ratio: f64, end_ratio: f64) -> ScrollTarget {
    if start_ratio <= 0.0 {
        return ScrollTarget::Start {
            index: 0,
            offset: 0.0,
        };
    }
    if end_ratio >= 1.0 {
        return ScrollTarget::End { index: cache.len() };
    }
    let height = (start_ratio * cache.total()).round();
    let index = cache.index_by_height(height);
    ScrollTarget::Start {
        index,
        offset: height - cache.top(index),
    }
}

impl GanttController {
    /// Scrolls so that the viewport top sits `px` pixels below the top of
    /// the first row, then runs.
    pub fn scroll_to(&mut self, px: f64) -> GridResult<()> {
        let px = if px.is_finite() { px.max(0.0) } else { 0.0 };
        {
            let mut controller = self.batch();
            let cache = &controller.visible.cache;
            let total = cache.total();
            let last = cache.last_index().unwrap_or(0);
            if px > total - controller.available_height {
                controller.set_end_index(last);
            } else {
                let index = cache.index_by_height(px);
                let offset = px - cache.top(index);
                controller.set_start_index(index);
                controller.set_vertical_offset(offset)?;
            }
            controller.discard_pending();
        }
        trace!(px, "scrolled to pixel");
        self.run();
        Ok(())
    }

    /// Puts row `index` at the top of the viewport, then runs.
    pub fn scroll_to_row(&mut self, index: usize) {
        let index = index.min(self.visible.cache.last_index().unwrap_or(0));
        self.set_start_index(index);
        trace!(index, "scrolled to row");
        self.run();
    }

    /// Anchors the bottom of the viewport at row `index`, or at the last row
    /// when `None`. Takes effect on the next run.
    pub fn scroll_to_end(&mut self, index: Option<usize>) {
        let last = self.visible.cache.last_index().unwrap_or(0);
        self.set_end_index(index.unwrap_or(last));
    }

    /// Fractions of the total height at the top and bottom of the viewport,
    /// rounded to four decimals. An empty controller reports `(0, 1)`.
    #[must_use]
    pub fn scroll_ratio_for_window(&self) -> (f64, f64) {
        let cache = &self.visible.cache;
        let total = cache.total();
        if cache.is_empty() || total <= 0.0 {
            return (0.0, 1.0);
        }
        let start_index = self.start_index.unwrap_or(0);
        let top = cache.top(start_index.min(cache.len() - 1)) + self.vertical_offset;
        let bottom = top + self.available_height;
        (round4(top / total), round4(bottom / total))
    }

    /// Anchors the window from scroll ratios. Takes effect on the next run.
    pub fn apply_scroll_ratio(&mut self, start_ratio: f64, end_ratio: f64) -> GridResult<()> {
        match window_for_scroll_ratio(&self.visible.cache, start_ratio, end_ratio) {
            ScrollTarget::Start { index, offset } => {
                self.set_start_index(index);
                self.set_vertical_offset(offset)
            }
            ScrollTarget::End { index } => {
                self.set_end_index(index);
                Ok(())
            }
        }
    }
}
