use tracing::debug;

use crate::core::Consistent;

use super::{ControllerState, GanttController};

impl GanttController {
    /// Negotiates `start_index`, `end_index` and `vertical_offset` against
    /// the available height.
    ///
    /// Whichever anchor is set wins: a start anchor fills downwards from the
    /// start row, an end anchor fills upwards from the end row. When the
    /// anchored side would leave blank space the window is pinned to the
    /// other end of the data instead.
    pub(super) fn recalculate(&mut self) {
        if !self.has_invalidation_state(ControllerState::POSITION) {
            return;
        }

        let cache = &self.visible.cache;
        match cache.last_index() {
            None => {
                self.start_index = Some(0);
                self.end_index = Some(0);
                self.vertical_offset = 0.0;
            }
            Some(last) => {
                let available = self.available_height;
                let total = cache.total();
                let mut start = self.start_index.map(|index| index.min(last));
                let mut end = self.end_index.map(|index| index.min(last));
                let mut offset = self.vertical_offset;

                if available >= total {
                    start = Some(0);
                    end = Some(last);
                    offset = 0.0;
                } else {
                    if start.is_none() && end.is_none() {
                        start = Some(0);
                    }
                    if let Some(anchor) = start {
                        let below = cache.height_by_indexes(anchor, None) - offset;
                        if below < available {
                            let pinned = cache.index_by_height(total - available);
                            start = Some(pinned);
                            end = Some(last);
                            offset = cache.height_by_indexes(pinned, Some(last)) - available;
                        } else {
                            end = Some(
                                cache
                                    .index_by_height(cache.top(anchor) + available + offset)
                                    .clamp(anchor, last),
                            );
                        }
                    } else if let Some(anchor) = end {
                        if cache.height_by_indexes(0, Some(anchor)) < available {
                            start = Some(0);
                            offset = 0.0;
                            end = Some(cache.index_by_height(available).min(last));
                        } else {
                            let bottom = cache.bottom(anchor).unwrap_or(total);
                            let first = cache.index_by_height(bottom - available);
                            start = Some(first);
                            offset = cache.height_by_indexes(first, Some(anchor)) - available;
                        }
                    }
                }

                self.start_index = start;
                self.end_index = end;
                self.vertical_offset = offset;
            }
        }

        self.position_recalculated = true;
        self.mark_consistent(ControllerState::POSITION);
        debug!(
            start = ?self.start_index,
            end = ?self.end_index,
            offset = self.vertical_offset,
            available = self.available_height,
            "viewport window recalculated"
        );
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use serde_json::json;

    use crate::core::DataTree;
    use crate::core::tree::{fields, item_fields};
    use crate::gantt::GanttController;

    fn controller(rows: usize, available: f64) -> GanttController {
        let mut tree = DataTree::new();
        for row in 0..rows {
            tree.add_root(item_fields([(fields::ID, json!(row))]));
        }
        let mut controller = GanttController::new();
        controller.set_data(tree);
        controller.set_available_height(available).expect("height");
        controller
    }

    #[test]
    fn start_anchor_fills_downwards() {
        let mut controller = controller(10, 50.0);
        controller.set_start_index(3);
        let frame = controller.run();
        assert_eq!((frame.start_index, frame.end_index), (3, 5));
        assert_relative_eq!(frame.vertical_offset, 0.0);
    }

    #[test]
    fn start_anchor_near_the_end_is_pinned_to_the_bottom() {
        let mut controller = controller(10, 50.0);
        controller.set_start_index(9);
        let frame = controller.run();
        assert_eq!((frame.start_index, frame.end_index), (7, 9));
        // rows 7..=9 span 63px; 13px of row 7 sit above the viewport.
        assert_relative_eq!(frame.vertical_offset, 13.0);
    }

    #[test]
    fn end_anchor_fills_upwards() {
        let mut controller = controller(10, 50.0);
        controller.set_end_index(5);
        let frame = controller.run();
        assert_eq!((frame.start_index, frame.end_index), (3, 5));
        assert_relative_eq!(frame.vertical_offset, 13.0);
    }

    #[test]
    fn end_anchor_near_the_top_starts_at_zero() {
        let mut controller = controller(10, 50.0);
        controller.set_end_index(1);
        let frame = controller.run();
        assert_eq!((frame.start_index, frame.end_index), (0, 2));
        assert_relative_eq!(frame.vertical_offset, 0.0);
    }

    #[test]
    fn everything_fits_when_available_covers_the_total() {
        let mut controller = controller(4, 500.0);
        controller.set_start_index(2);
        let frame = controller.run();
        assert_eq!((frame.start_index, frame.end_index), (0, 3));
        assert_relative_eq!(frame.vertical_offset, 0.0);
    }

    #[test]
    fn out_of_range_indices_are_clamped() {
        let mut controller = controller(10, 50.0);
        controller.set_end_index(99);
        let frame = controller.run();
        assert_eq!(frame.end_index, 9);
    }
}
