// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::time::Duration;

struct Entry<T> {
    start: Duration,
    end: Duration,
    value: T,
}

/// A static index of half-open intervals `[start, end)` answering "which intervals contain
/// this point".
///
/// Entries are sorted by start and read as an implicit balanced tree: the middle entry of a range
/// is the root of that range. Each root also stores the largest end in its subtree, so a query
/// skips any subtree that ends at or before the point and any right subtree starting after it.
/// A query visits O(log n) entries plus O(log n) per interval it reports.
pub struct IntervalIndex<T> {
    entries: Vec<Entry<T>>,
    /// Largest end within the subtree rooted at each entry.
    max_end: Vec<Duration>,
}

impl<T> Default for IntervalIndex<T> {
    fn default() -> Self {
        IntervalIndex {
            entries: Vec::new(),
            max_end: Vec::new(),
        }
    }
}

impl<T> IntervalIndex<T> {
    pub fn new() -> IntervalIndex<T> {
        IntervalIndex::default()
    }

    /// Replaces the contents of the index, reusing its storage. Empty intervals are dropped.
    pub fn rebuild<I>(&mut self, intervals: I)
    where
        I: IntoIterator<Item = (Duration, Duration, T)>,
    {
        self.clear();
        self.entries.extend(
            intervals
                .into_iter()
                .filter(|(start, end, _)| start < end)
                .map(|(start, end, value)| Entry { start, end, value }),
        );
        self.entries.sort_by_key(|entry| entry.start);
        self.max_end.resize(self.entries.len(), Duration::ZERO);
        self.fill_max_end(0, self.entries.len());
    }

    fn fill_max_end(&mut self, lo: usize, hi: usize) -> Duration {
        if lo >= hi {
            return Duration::ZERO;
        }
        let mid = lo + (hi - lo) / 2;
        let left = self.fill_max_end(lo, mid);
        let right = self.fill_max_end(mid + 1, hi);
        let max_end = self.entries[mid].end.max(left).max(right);
        self.max_end[mid] = max_end;
        max_end
    }

    /// Calls `visit` with every value whose interval contains `point`, in start order.
    pub fn for_each_containing<F>(&self, point: Duration, mut visit: F)
    where
        F: FnMut(&T),
    {
        self.visit_range(0, self.entries.len(), point, &mut visit);
    }

    fn visit_range<F>(&self, lo: usize, hi: usize, point: Duration, visit: &mut F)
    where
        F: FnMut(&T),
    {
        if lo >= hi {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        if self.max_end[mid] <= point {
            return;
        }

        self.visit_range(lo, mid, point, visit);
        let entry = &self.entries[mid];
        if entry.start > point {
            return;
        }
        if entry.end > point {
            visit(&entry.value);
        }
        self.visit_range(mid + 1, hi, point, visit);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.max_end.clear();
    }

    /// Iterates over every value in start order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().map(|entry| &entry.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn sorted(index: &IntervalIndex<u32>, point: Duration) -> Vec<u32> {
        let mut found = Vec::new();
        index.for_each_containing(point, |value| found.push(*value));
        found.sort();
        found
    }

    #[test]
    fn test_query_is_half_open() {
        let mut index = IntervalIndex::new();
        index.rebuild([(ms(100), ms(200), 1)]);

        assert!(sorted(&index, ms(99)).is_empty());
        assert_eq!(sorted(&index, ms(100)), vec![1]);
        assert_eq!(sorted(&index, ms(199)), vec![1]);
        assert!(sorted(&index, ms(200)).is_empty());
    }

    #[test]
    fn test_query_overlapping() {
        let mut index = IntervalIndex::new();
        index.rebuild([
            (ms(0), ms(1000), 1),
            (ms(100), ms(150), 2),
            (ms(200), ms(300), 3),
            (ms(250), ms(400), 4),
        ]);

        assert_eq!(sorted(&index, ms(120)), vec![1, 2]);
        assert_eq!(sorted(&index, ms(175)), vec![1]);
        assert_eq!(sorted(&index, ms(260)), vec![1, 3, 4]);
        assert_eq!(sorted(&index, ms(350)), vec![1, 4]);
        assert!(sorted(&index, ms(1000)).is_empty());
    }

    #[test]
    fn test_rebuild_drops_empty_and_replaces() {
        let mut index = IntervalIndex::new();
        index.rebuild([(ms(10), ms(10), 1), (ms(20), ms(10), 2), (ms(0), ms(5), 3)]);
        assert_eq!(index.len(), 1);

        index.rebuild([(ms(50), ms(60), 4)]);
        assert_eq!(index.iter().copied().collect::<Vec<_>>(), vec![4]);
        assert!(sorted(&index, ms(2)).is_empty());

        index.clear();
        assert!(index.is_empty());
    }

    #[test]
    fn test_long_interval_does_not_hide_later_ones() {
        let mut index = IntervalIndex::new();
        index.rebuild(
            std::iter::once((ms(0), ms(100_000), 0))
                .chain((1..200).map(|i| (ms(i * 100), ms(i * 100 + 50), i as u32))),
        );

        assert_eq!(sorted(&index, ms(5020)), vec![0, 50]);
        assert_eq!(sorted(&index, ms(5075)), vec![0]);
        assert!(sorted(&index, ms(100_000)).is_empty());
    }

    #[test]
    fn test_matches_linear_scan() {
        let intervals: Vec<(Duration, Duration, u32)> = (0..64u64)
            .map(|i| {
                let start = (i * 37) % 500;
                let length = (i * 53) % 120;
                (ms(start), ms(start + length), i as u32)
            })
            .collect();
        let mut index = IntervalIndex::new();
        index.rebuild(intervals.clone());

        for point in (0..700).step_by(7).map(ms) {
            let mut expected: Vec<u32> = intervals
                .iter()
                .filter(|(start, end, _)| *start <= point && point < *end)
                .map(|(_, _, value)| *value)
                .collect();
            expected.sort();
            assert_eq!(sorted(&index, point), expected, "at {:?}", point);
        }
    }
}
