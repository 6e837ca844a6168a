//! Fixed-size batching of slides for bounded-memory parallel decoding.
//!
//! The planner hands out consecutive, order-preserving slices. It is meant to
//! be driven from one thread: take a batch, fan it out, wait, take the next.

/// Splits a slice into consecutive batches of at most `batch_size` items
#[derive(Debug)]
pub struct BatchPlanner<'a, T> {
    items: &'a [T],
    batch_size: usize,
    position: usize,
}

impl<'a, T> BatchPlanner<'a, T> {
    /// Create a planner over `items`. A zero `batch_size` is treated as 1.
    pub fn new(items: &'a [T], batch_size: usize) -> Self {
        Self {
            items,
            batch_size: batch_size.max(1),
            position: 0,
        }
    }

    /// The next batch in original order, or `None` once every item was handed out
    pub fn next_batch(&mut self) -> Option<&'a [T]> {
        if self.position >= self.items.len() {
            return None;
        }

        let end = (self.position + self.batch_size).min(self.items.len());
        let batch = &self.items[self.position..end];
        self.position = end;
        Some(batch)
    }

    /// Items already handed out
    pub const fn emitted(&self) -> usize {
        self.position
    }

    /// Total number of batches this planner produces from the start
    pub fn batch_count(&self) -> usize {
        self.items.len().div_ceil(self.batch_size)
    }
}

impl<'a, T> Iterator for BatchPlanner<'a, T> {
    type Item = &'a [T];

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn ten_items_in_fours() {
        let items: Vec<u32> = (0..10).collect();
        let mut planner = BatchPlanner::new(&items, 4);
        assert_eq!(planner.batch_count(), 3);

        assert_eq!(planner.next_batch().unwrap(), &[0, 1, 2, 3]);
        assert_eq!(planner.next_batch().unwrap(), &[4, 5, 6, 7]);
        assert_eq!(planner.next_batch().unwrap(), &[8, 9]);
        assert_eq!(planner.emitted(), 10);
        assert!(planner.next_batch().is_none());
        assert!(planner.next_batch().is_none());
    }

    #[test]
    fn empty_input_is_exhausted_immediately() {
        let items: Vec<u32> = Vec::new();
        let mut planner = BatchPlanner::new(&items, 4);
        assert_eq!(planner.batch_count(), 0);
        assert!(planner.next_batch().is_none());
    }

    #[test]
    fn exact_multiple_has_no_trailing_batch() {
        let items = [1, 2, 3, 4];
        let sizes: Vec<usize> = BatchPlanner::new(&items, 2).map(<[i32]>::len).collect();
        assert_eq!(sizes, [2, 2]);
    }

    #[test]
    fn zero_batch_size_still_progresses() {
        let items = ["a", "b"];
        let batches: Vec<_> = BatchPlanner::new(&items, 0).collect();
        assert_eq!(batches, [&["a"][..], &["b"][..]]);
    }
}
