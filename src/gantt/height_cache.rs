/// Cumulative row heights of the visible rows.
///
/// `prefix[i]` is the bottom edge of row `i` measured from the top of the
/// first row, spacing included. Lookups in either direction are O(1) or
/// O(log n).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeightCache {
    prefix: Vec<f64>,
}

impl HeightCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.prefix.clear();
    }

    /// Appends a row of `height` pixels and returns its index.
    pub fn push(&mut self, height: f64) -> usize {
        let bottom = self.total() + height;
        self.prefix.push(bottom);
        self.prefix.len() - 1
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.prefix.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.prefix
    }

    /// Bottom edge of row `index`.
    #[must_use]
    pub fn bottom(&self, index: usize) -> Option<f64> {
        self.prefix.get(index).copied()
    }

    /// Top edge of row `index`, which is the bottom of the row before it.
    #[must_use]
    pub fn top(&self, index: usize) -> f64 {
        index
            .checked_sub(1)
            .and_then(|previous| self.prefix.get(previous))
            .copied()
            .unwrap_or(0.0)
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.prefix.last().copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn last_index(&self) -> Option<usize> {
        self.prefix.len().checked_sub(1)
    }

    /// Height covered by rows `start..=end`. Both ends are clamped to the
    /// last row and swapped when reversed; `end = None` means the last row.
    #[must_use]
    pub fn height_by_indexes(&self, start: usize, end: Option<usize>) -> f64 {
        let Some(last) = self.last_index() else {
            return 0.0;
        };
        let start = start.min(last);
        let end = end.map_or(last, |end| end.min(last));
        let (start, end) = if start > end { (end, start) } else { (start, end) };
        self.prefix[end] - self.top(start)
    }

    /// Index of the row whose bottom edge equals `height`, or the insertion
    /// point that keeps the cache sorted (the row containing `height`).
    #[must_use]
    pub fn index_by_height(&self, height: f64) -> usize {
        self.prefix.partition_point(|bottom| *bottom < height)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::HeightCache;

    fn cache(rows: usize, height: f64) -> HeightCache {
        let mut cache = HeightCache::new();
        for _ in 0..rows {
            cache.push(height);
        }
        cache
    }

    #[test]
    fn heights_between_indexes_are_inclusive_and_order_free() {
        let cache = cache(10, 21.0);
        assert_relative_eq!(cache.height_by_indexes(0, Some(0)), 21.0);
        assert_relative_eq!(cache.height_by_indexes(2, Some(4)), 63.0);
        assert_relative_eq!(cache.height_by_indexes(4, Some(2)), 63.0);
        assert_relative_eq!(cache.height_by_indexes(8, None), 42.0);
        assert_relative_eq!(cache.height_by_indexes(40, Some(90)), 21.0);
        assert_relative_eq!(HeightCache::new().height_by_indexes(0, None), 0.0);
    }

    #[test]
    fn index_by_height_returns_match_or_insertion_point() {
        let cache = cache(10, 21.0);
        assert_eq!(cache.index_by_height(0.0), 0);
        assert_eq!(cache.index_by_height(21.0), 0);
        assert_eq!(cache.index_by_height(21.5), 1);
        assert_eq!(cache.index_by_height(50.0), 2);
        assert_eq!(cache.index_by_height(1_000.0), 10);
    }
}
