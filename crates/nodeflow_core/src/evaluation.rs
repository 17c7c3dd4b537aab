// SPDX-License-Identifier: MIT OR Apache-2.0
//! Evaluation scheduling: node ordering and the re-entrancy guard.

use crate::connection::Connection;
use crate::handle::{AttributeHandle, NodeHandle};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, VecDeque};

/// Whether a pass is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SchedulerState {
    /// Waiting for requests
    #[default]
    Idle,
    /// A pass is in progress; new requests are dropped
    Evaluating,
}

/// Why an evaluation was asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvaluationRequest {
    /// Direct call to `Scene::evaluate`
    Explicit,
    /// An attribute in the scene changed
    AttributeChanged(AttributeHandle),
}

/// Counters kept by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvaluationStats {
    /// Completed or aborted passes
    pub passes: u64,
    /// Requests received, dropped ones included
    pub requests: u64,
    /// Requests dropped because a pass was running
    pub dropped: u64,
    /// Node computes that returned an error status
    pub failed_computes: u64,
}

/// Queue plus guard driving evaluation passes
#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    state: SchedulerState,
    queue: VecDeque<EvaluationRequest>,
    stats: EvaluationStats,
}

impl Scheduler {
    pub(crate) fn state(&self) -> SchedulerState {
        self.state
    }

    pub(crate) fn stats(&self) -> EvaluationStats {
        self.stats
    }

    /// Queue a request; returns false when it was dropped by the guard
    pub(crate) fn enqueue(&mut self, request: EvaluationRequest) -> bool {
        self.stats.requests += 1;
        if self.state == SchedulerState::Evaluating {
            self.stats.dropped += 1;
            tracing::trace!("Dropped {:?}: evaluation in progress", request);
            return false;
        }
        self.queue.push_back(request);
        true
    }

    /// Start a pass if idle and work is queued.
    ///
    /// Every queued request is served by the one pass, since each pass
    /// recomputes the whole graph.
    pub(crate) fn begin_pass(&mut self) -> Option<EvaluationRequest> {
        if self.state == SchedulerState::Evaluating {
            return None;
        }
        let first = self.queue.pop_front()?;
        self.queue.clear();
        self.state = SchedulerState::Evaluating;
        Some(first)
    }

    pub(crate) fn end_pass(&mut self, failed_computes: u64) {
        self.state = SchedulerState::Idle;
        self.stats.passes += 1;
        self.stats.failed_computes += failed_computes;
    }
}

/// Result of ordering a graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologicalOrder {
    /// Nodes in dependency order
    pub order: Vec<NodeHandle>,
    /// Nodes on or downstream of a cycle, ascending
    pub excluded: Vec<NodeHandle>,
}

/// Order `nodes` so every connection's source precedes its target.
///
/// Kahn's algorithm with a min-heap frontier: among ready nodes the lowest
/// handle goes first. Connections with an unknown end are ignored.
pub fn topological_order(nodes: &[NodeHandle], connections: &[Connection]) -> TopologicalOrder {
    let mut in_degree: HashMap<NodeHandle, usize> = nodes.iter().map(|n| (*n, 0)).collect();
    let mut successors: HashMap<NodeHandle, Vec<NodeHandle>> = HashMap::new();

    for connection in connections {
        if !in_degree.contains_key(&connection.source_node) {
            continue;
        }
        if let Some(degree) = in_degree.get_mut(&connection.target_node) {
            *degree += 1;
            successors
                .entry(connection.source_node)
                .or_default()
                .push(connection.target_node);
        }
    }

    let mut ready: BinaryHeap<Reverse<NodeHandle>> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(node, _)| Reverse(*node))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for next in successors.get(&node).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(*next));
                }
            }
        }
    }

    let placed: BTreeSet<NodeHandle> = order.iter().copied().collect();
    let excluded: BTreeSet<NodeHandle> = nodes.iter().filter(|n| !placed.contains(*n)).copied().collect();

    TopologicalOrder {
        order,
        excluded: excluded.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(value: u64) -> NodeHandle {
        NodeHandle::new(value)
    }

    fn edge(from: u64, to: u64) -> Connection {
        Connection::new(
            n(from),
            AttributeHandle::new(from * 10),
            n(to),
            AttributeHandle::new(to * 10 + 1),
        )
    }

    fn position(order: &[NodeHandle], node: u64) -> usize {
        order.iter().position(|h| *h == n(node)).unwrap()
    }

    #[test]
    fn test_chain_order() {
        let nodes = [n(1), n(2), n(3)];
        let result = topological_order(&nodes, &[edge(3, 2), edge(2, 1)]);

        assert_eq!(result.order, vec![n(3), n(2), n(1)]);
        assert!(result.excluded.is_empty());
    }

    #[test]
    fn test_ties_break_by_handle() {
        let nodes = [n(4), n(2), n(3), n(1)];
        let result = topological_order(&nodes, &[]);

        assert_eq!(result.order, vec![n(1), n(2), n(3), n(4)]);
    }

    #[test]
    fn test_every_edge_respected() {
        let nodes: Vec<_> = (1..=6).map(n).collect();
        let edges = [edge(5, 1), edge(5, 2), edge(1, 3), edge(2, 3), edge(3, 6), edge(4, 6)];
        let result = topological_order(&nodes, &edges);

        assert_eq!(result.order.len(), 6);
        for e in &edges {
            assert!(
                position(&result.order, e.source_node.value()) < position(&result.order, e.target_node.value())
            );
        }
    }

    #[test]
    fn test_cycle_members_excluded() {
        // 1 -> 2 -> 3 -> 2, 3 -> 4, and an independent 5
        let nodes: Vec<_> = (1..=5).map(n).collect();
        let result = topological_order(&nodes, &[edge(1, 2), edge(2, 3), edge(3, 2), edge(3, 4)]);

        assert_eq!(result.order, vec![n(1), n(5)]);
        assert_eq!(result.excluded, vec![n(2), n(3), n(4)]);
    }

    #[test]
    fn test_unknown_endpoints_ignored() {
        let result = topological_order(&[n(1), n(2)], &[edge(9, 1), edge(2, 9)]);

        assert_eq!(result.order, vec![n(1), n(2)]);
    }

    #[test]
    fn test_parallel_edges_counted() {
        let nodes = [n(1), n(2)];
        let result = topological_order(&nodes, &[edge(1, 2), edge(1, 2)]);

        assert_eq!(result.order, vec![n(1), n(2)]);
    }

    #[test]
    fn test_scheduler_guard() {
        let mut scheduler = Scheduler::default();
        assert!(scheduler.begin_pass().is_none());

        assert!(scheduler.enqueue(EvaluationRequest::Explicit));
        assert!(scheduler.enqueue(EvaluationRequest::AttributeChanged(AttributeHandle::new(1))));
        assert_eq!(scheduler.begin_pass(), Some(EvaluationRequest::Explicit));
        assert_eq!(scheduler.state(), SchedulerState::Evaluating);

        // nested requests are dropped, and no second pass can start
        assert!(!scheduler.enqueue(EvaluationRequest::Explicit));
        assert!(scheduler.begin_pass().is_none());

        scheduler.end_pass(1);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(scheduler.begin_pass().is_none());

        let stats = scheduler.stats();
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.requests, 3);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.failed_computes, 1);
    }
}
