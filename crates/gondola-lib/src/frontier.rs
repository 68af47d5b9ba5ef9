//! Pending-node queue for the A* search.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::error::{Error, Result};
use crate::network::NodeId;

#[derive(Copy, Clone, Debug, Default)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct FrontierEntry {
    node: NodeId,
    score: FloatOrd,
    seq: u64,
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap pops the lowest f-score, then the
        // earliest insertion.
        other
            .score
            .cmp(&self.score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Copy, Clone, Debug)]
struct Pending {
    score: FloatOrd,
    seq: u64,
}

/// Min-priority queue of nodes keyed by f-score.
///
/// `pull` returns the pending node with the lowest f-score; ties go to the
/// node that entered the frontier first. Updating the score of a pending node
/// keeps its original insertion rank. Superseded heap entries are discarded
/// lazily when they surface.
#[derive(Debug, Default)]
pub struct PriorityFrontier {
    heap: BinaryHeap<FrontierEntry>,
    pending: HashMap<NodeId, Pending>,
    next_seq: u64,
}

impl PriorityFrontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `node` with the given f-score, or move it to `score` if it is
    /// already pending.
    pub fn add(&mut self, node: NodeId, score: f64) {
        let seq = match self.pending.get(&node) {
            Some(existing) => existing.seq,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                seq
            }
        };
        let score = FloatOrd(score);
        self.pending.insert(node, Pending { score, seq });
        self.heap.push(FrontierEntry { node, score, seq });
    }

    /// Remove and return the pending node with the lowest f-score.
    pub fn pull(&mut self) -> Result<NodeId> {
        while let Some(entry) = self.heap.pop() {
            let live = self
                .pending
                .get(&entry.node)
                .is_some_and(|pending| pending.score == entry.score && pending.seq == entry.seq);
            if live {
                self.pending.remove(&entry.node);
                return Ok(entry.node);
            }
        }
        Err(Error::EmptyFrontier)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.pending.contains_key(&node)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulls_lowest_score_first() {
        let mut frontier = PriorityFrontier::new();
        frontier.add(3, 7.5);
        frontier.add(1, 2.0);
        frontier.add(2, 4.0);

        assert_eq!(frontier.pull().unwrap(), 1);
        assert_eq!(frontier.pull().unwrap(), 2);
        assert_eq!(frontier.pull().unwrap(), 3);
        assert!(frontier.is_empty());
    }

    #[test]
    fn ties_go_to_first_inserted() {
        let mut frontier = PriorityFrontier::new();
        frontier.add(9, 1.0);
        frontier.add(4, 1.0);
        frontier.add(6, 1.0);

        assert_eq!(frontier.pull().unwrap(), 9);
        assert_eq!(frontier.pull().unwrap(), 4);
        assert_eq!(frontier.pull().unwrap(), 6);
    }

    #[test]
    fn rescoring_a_pending_node_keeps_one_entry() {
        let mut frontier = PriorityFrontier::new();
        frontier.add(1, 10.0);
        frontier.add(2, 5.0);
        frontier.add(1, 3.0);

        assert_eq!(frontier.len(), 2);
        assert!(frontier.contains(1));
        assert_eq!(frontier.pull().unwrap(), 1);
        assert!(!frontier.contains(1));
        assert_eq!(frontier.pull().unwrap(), 2);
        assert!(matches!(frontier.pull(), Err(Error::EmptyFrontier)));
    }

    #[test]
    fn pull_on_empty_frontier_fails() {
        let mut frontier = PriorityFrontier::new();
        assert!(frontier.is_empty());
        assert!(matches!(frontier.pull(), Err(Error::EmptyFrontier)));
    }
}
