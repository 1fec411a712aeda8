//! Weighted directed graph and shortest path search
//!
//! Edge weights may be negative (the START edges reward consuming a
//! leading rest), so the search is label-correcting: a vertex settled at
//! some cost is queued again whenever a cheaper route to it appears. This
//! terminates on any graph without negative cycles. A vertex improved more
//! often than there are vertices reveals a negative cycle and aborts the
//! search.

use crate::error::{Result, TranscriptionError};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Vertex handle returned by [`Graph::add_vertex`]
pub type VertexId = usize;

/// Adjacency-list graph
#[derive(Debug, Clone, Default)]
pub struct Graph {
    edges: Vec<Vec<(VertexId, f64)>>,
}

#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    cost: f64,
    vertex: VertexId,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // Reversed for a min-heap, ties on the lower vertex
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

impl Graph {
    /// Empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex and return its handle
    pub fn add_vertex(&mut self) -> VertexId {
        self.edges.push(Vec::new());
        self.edges.len() - 1
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Add a directed edge
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an unknown vertex or a NaN weight
    pub fn add_edge(&mut self, from: VertexId, to: VertexId, weight: f64) -> Result<()> {
        if to >= self.edges.len() || weight.is_nan() {
            return Err(TranscriptionError::InvalidInput(format!(
                "Invalid edge {} -> {} with weight {}",
                from, to, weight
            )));
        }
        match self.edges.get_mut(from) {
            Some(out) => {
                out.push((to, weight));
                Ok(())
            }
            None => Err(TranscriptionError::InvalidInput(format!("Unknown vertex {}", from))),
        }
    }

    /// Cheapest path from `start` to `finish`
    ///
    /// # Returns
    ///
    /// The vertices after `start` up to and including `finish`, or an empty
    /// vector when `finish` is unreachable (or a negative cycle is met)
    pub fn shortest_path(&self, start: VertexId, finish: VertexId) -> Vec<VertexId> {
        let n = self.edges.len();
        if start >= n || finish >= n || start == finish {
            return Vec::new();
        }
        let mut cost = vec![f64::INFINITY; n];
        let mut previous: Vec<Option<VertexId>> = vec![None; n];
        let mut improvements = vec![0usize; n];
        let mut queue = BinaryHeap::new();
        cost[start] = 0.0;
        queue.push(QueueEntry { cost: 0.0, vertex: start });

        while let Some(QueueEntry { cost: current, vertex }) = queue.pop() {
            if current > cost[vertex] {
                continue;
            }
            for &(next, weight) in &self.edges[vertex] {
                let candidate = current + weight;
                if candidate < cost[next] {
                    improvements[next] += 1;
                    if improvements[next] > n {
                        log::warn!("Negative cycle reached at vertex {}", next);
                        return Vec::new();
                    }
                    cost[next] = candidate;
                    previous[next] = Some(vertex);
                    queue.push(QueueEntry { cost: candidate, vertex: next });
                }
            }
        }

        if cost[finish].is_infinite() {
            return Vec::new();
        }
        let mut path = vec![finish];
        let mut vertex = finish;
        while let Some(before) = previous[vertex] {
            if before == start {
                path.reverse();
                return path;
            }
            path.push(before);
            vertex = before;
        }
        Vec::new()
    }
}
