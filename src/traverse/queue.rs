//! Queue abstraction for breadth-first descent.

use std::collections::VecDeque;
use std::path::PathBuf;

/// A directory waiting to be visited, with its distance from the start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedDir {
    pub path: PathBuf,
    pub depth: usize,
}

/// Minimal FIFO interface used by the downward walk.
///
/// Alternate implementations can record or reorder items in tests without
/// touching the walk itself.
pub trait TraversalQueue<T> {
    fn enqueue(&mut self, item: T);

    fn dequeue(&mut self) -> Option<T>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> TraversalQueue<T> for VecDeque<T> {
    fn enqueue(&mut self, item: T) {
        self.push_back(item);
    }

    fn dequeue(&mut self) -> Option<T> {
        self.pop_front()
    }

    fn len(&self) -> usize {
        VecDeque::len(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vecdeque_is_fifo() {
        let mut queue: VecDeque<u32> = VecDeque::new();
        assert!(TraversalQueue::is_empty(&queue));
        queue.enqueue(1);
        queue.enqueue(2);
        assert_eq!(TraversalQueue::len(&queue), 2);
        assert_eq!(queue.dequeue(), Some(1));
        assert_eq!(queue.dequeue(), Some(2));
        assert_eq!(queue.dequeue(), None);
    }
}
