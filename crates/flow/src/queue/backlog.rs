//! Backlog disciplines for tasks admitted but not yet started

use std::collections::{BTreeMap, VecDeque};

/// Ordered storage the scheduler pulls the next task from
pub(crate) trait Backlog<A>: Send + 'static {
    /// Remove the entry that should start next
    fn pop_next(&mut self) -> Option<A>;

    /// Number of waiting entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Double-ended backlog: `push_back` for FIFO admission, `push_front` to jump
/// the line
pub(crate) struct FifoBacklog<A> {
    entries: VecDeque<A>,
}

impl<A> FifoBacklog<A> {
    pub(crate) fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    pub(crate) fn push_back(&mut self, entry: A) {
        self.entries.push_back(entry);
    }

    /// Insert a batch at the head, keeping the batch's own order
    pub(crate) fn push_front_all(&mut self, batch: Vec<A>) {
        for entry in batch.into_iter().rev() {
            self.entries.push_front(entry);
        }
    }
}

impl<A: Send + 'static> Backlog<A> for FifoBacklog<A> {
    fn pop_next(&mut self) -> Option<A> {
        self.entries.pop_front()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Priority-bucketed backlog
///
/// Lower priority numbers start first; entries within one bucket keep their
/// insertion order.
pub(crate) struct PriorityBacklog<A> {
    buckets: BTreeMap<i64, VecDeque<A>>,
    len: usize,
}

impl<A> PriorityBacklog<A> {
    pub(crate) fn new() -> Self {
        Self {
            buckets: BTreeMap::new(),
            len: 0,
        }
    }

    pub(crate) fn insert(&mut self, priority: i64, entry: A) {
        self.buckets.entry(priority).or_default().push_back(entry);
        self.len += 1;
    }
}

impl<A: Send + 'static> Backlog<A> for PriorityBacklog<A> {
    fn pop_next(&mut self) -> Option<A> {
        let mut bucket = self.buckets.first_entry()?;
        let entry = bucket.get_mut().pop_front();
        if bucket.get().is_empty() {
            bucket.remove();
        }
        if entry.is_some() {
            self.len -= 1;
        }
        entry
    }

    fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain<A, B: Backlog<A>>(backlog: &mut B) -> Vec<A> {
        std::iter::from_fn(|| backlog.pop_next()).collect()
    }

    #[test]
    fn test_fifo_order() {
        let mut backlog = FifoBacklog::new();
        backlog.push_back(2);
        backlog.push_back(3);
        backlog.push_front_all(vec![0, 1]);
        backlog.push_back(4);

        assert_eq!(backlog.len(), 5);
        assert_eq!(drain(&mut backlog), vec![0, 1, 2, 3, 4]);
        assert!(backlog.is_empty());
    }

    #[test]
    fn test_priority_order_with_ties() {
        let mut backlog = PriorityBacklog::new();
        backlog.insert(1, "b1");
        backlog.insert(3, "c1");
        backlog.insert(1, "b2");
        backlog.insert(-2, "a1");
        backlog.insert(3, "c2");

        assert_eq!(backlog.len(), 5);
        assert_eq!(drain(&mut backlog), vec!["a1", "b1", "b2", "c1", "c2"]);
        assert_eq!(backlog.len(), 0);
        assert!(backlog.pop_next().is_none());
    }

    #[test]
    fn test_priority_interleaved_insert_and_pop() {
        let mut backlog = PriorityBacklog::new();
        backlog.insert(5, "late");
        backlog.insert(1, "early");
        assert_eq!(backlog.pop_next(), Some("early"));

        backlog.insert(0, "urgent");
        assert_eq!(backlog.pop_next(), Some("urgent"));
        assert_eq!(backlog.pop_next(), Some("late"));
        assert!(backlog.is_empty());
    }
}
