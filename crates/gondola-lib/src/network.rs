//! Station graph, weighted distance model, and A* search.
//!
//! Node ids double as adjacency matrix indices: the node with id `i` owns row
//! and column `i`, so a network of `n` stations uses exactly the ids `0..n`.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::frontier::PriorityFrontier;
use crate::geometry::{DistanceMetric, Heuristic, Point, METERS_PER_UNIT};

/// Dense identifier of a station; equal to its adjacency matrix index.
pub type NodeId = usize;

/// A station or intersection with fixed coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub position: Point,
}

impl Node {
    pub fn new(id: NodeId, x: f64, y: f64) -> Self {
        Self {
            id,
            position: Point::new(x, y),
        }
    }
}

/// Per-node scratch values owned by a single search.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchState {
    pub cost: Option<f64>,
    pub heuristic: Option<f64>,
    pub parent: Option<NodeId>,
}

impl SearchState {
    /// f-score: cost so far plus heuristic estimate.
    pub fn score(&self) -> Option<f64> {
        Some(self.cost? + self.heuristic?)
    }
}

/// Scratch space for one search, indexed by node id.
///
/// A context is never shared between concurrent searches; the network itself
/// stays read-only while searches run.
#[derive(Debug, Clone, Default)]
pub struct SearchContext {
    states: Vec<SearchState>,
}

impl SearchContext {
    pub fn new(node_count: usize) -> Self {
        Self {
            states: vec![SearchState::default(); node_count],
        }
    }

    /// Clear every node's scratch values and size the context for `node_count` nodes.
    pub fn reset_search_state(&mut self, node_count: usize) {
        self.states.clear();
        self.states.resize(node_count, SearchState::default());
    }

    pub fn state(&self, id: NodeId) -> Option<&SearchState> {
        self.states.get(id)
    }

    fn state_mut(&mut self, id: NodeId) -> Result<&mut SearchState> {
        self.states.get_mut(id).ok_or(Error::UnknownNode { id })
    }

    /// Walk parent links from `goal` back to the root and return the path in
    /// start-to-goal order.
    pub fn reconstruct_path(&self, goal: NodeId) -> Result<Vec<NodeId>> {
        let broken = || Error::BrokenChain { goal };
        let mut path = Vec::new();
        let mut current = goal;
        loop {
            let state = self.states.get(current).ok_or_else(broken)?;
            if state.cost.is_none() {
                return Err(broken());
            }
            path.push(current);
            // A chain longer than the node count must contain a cycle.
            if path.len() > self.states.len() {
                return Err(broken());
            }
            match state.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        path.reverse();
        Ok(path)
    }
}

/// Bounds applied to a single search.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    /// Give up, reporting the goal as unreachable, after this many expansions.
    pub max_expansions: Option<usize>,
}

/// Result of a search: an empty path means the goal is unreachable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub path: Vec<NodeId>,
    pub expansions: usize,
}

impl SearchOutcome {
    fn unreachable(expansions: usize) -> Self {
        Self {
            path: Vec::new(),
            expansions,
        }
    }

    pub fn is_reachable(&self) -> bool {
        !self.path.is_empty()
    }
}

/// Immutable station graph with a derived weight view.
///
/// Weights are the scaled straight-line distances between adjacent stations,
/// zero on the diagonal, and infinite between unconnected stations.
#[derive(Debug, Clone)]
pub struct RoadNetwork {
    nodes: Vec<Node>,
    adjacency: Vec<Vec<bool>>,
    weights: Vec<Vec<f64>>,
}

impl RoadNetwork {
    /// Build a network from its nodes and a symmetric 0/1 adjacency matrix.
    ///
    /// Nodes may be given in any order but their ids must be exactly
    /// `0..adjacency.len()`. Any non-zero off-diagonal entry is an edge;
    /// diagonal entries are ignored.
    pub fn new(mut nodes: Vec<Node>, adjacency: &[Vec<u8>]) -> Result<Self> {
        let n = adjacency.len();
        if nodes.len() != n {
            return Err(Error::topology(format!(
                "{} nodes but adjacency matrix has {} rows",
                nodes.len(),
                n
            )));
        }

        nodes.sort_by_key(|node| node.id);
        if let Some((index, node)) = nodes.iter().enumerate().find(|(i, node)| node.id != *i) {
            return Err(Error::topology(format!(
                "node ids must be 0..{n}; found id {} at position {index}",
                node.id
            )));
        }

        let mut matrix = vec![vec![false; n]; n];
        for (i, row) in adjacency.iter().enumerate() {
            if row.len() != n {
                return Err(Error::topology(format!(
                    "adjacency row {i} has {} columns, expected {n}",
                    row.len()
                )));
            }
            for (j, &value) in row.iter().enumerate() {
                matrix[i][j] = i != j && value != 0;
            }
        }

        for i in 0..n {
            for j in (i + 1)..n {
                if matrix[i][j] != matrix[j][i] {
                    return Err(Error::topology(format!(
                        "adjacency matrix is not symmetric at ({i}, {j})"
                    )));
                }
            }
        }

        let weights = build_weights(&nodes, &matrix);
        debug!(nodes = n, "built road network");

        Ok(Self {
            nodes,
            adjacency: matrix,
            weights,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id < self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id).ok_or(Error::UnknownNode { id })
    }

    /// Adjacency matrix as 0/1 rows, for export and rendering.
    pub fn adjacency_matrix(&self) -> Vec<Vec<u8>> {
        self.adjacency
            .iter()
            .map(|row| row.iter().map(|&linked| u8::from(linked)).collect())
            .collect()
    }

    /// Full weight view in meters, including the infinite entries.
    pub fn weight_matrix(&self) -> &[Vec<f64>] {
        &self.weights
    }

    pub fn is_adjacent(&self, a: NodeId, b: NodeId) -> bool {
        self.adjacency
            .get(a)
            .and_then(|row| row.get(b))
            .copied()
            .unwrap_or(false)
    }

    /// Nodes adjacent to `id`, in ascending id order.
    pub fn neighbors(&self, id: NodeId) -> Result<Vec<&Node>> {
        self.node(id)?;
        Ok(self.neighbor_ids(id).map(|j| &self.nodes[j]).collect())
    }

    fn neighbor_ids(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency[id]
            .iter()
            .enumerate()
            .filter_map(|(j, &linked)| linked.then_some(j))
    }

    /// Length in meters of the edge between `a` and `b`; zero when `a == b`.
    pub fn edge_weight(&self, a: NodeId, b: NodeId) -> Result<f64> {
        self.node(a)?;
        self.node(b)?;
        if a == b {
            return Ok(0.0);
        }
        if !self.adjacency[a][b] {
            return Err(Error::InvalidEdge { from: a, to: b });
        }
        Ok(self.weights[a][b])
    }

    /// Sum of edge weights along consecutive pairs of `path`.
    pub fn path_cost(&self, path: &[NodeId]) -> Result<f64> {
        if let [single] = path {
            self.node(*single)?;
        }
        path.windows(2)
            .map(|pair| self.edge_weight(pair[0], pair[1]))
            .sum()
    }

    /// A* search from `start` to `goal` without an expansion bound.
    pub fn search(&self, start: NodeId, goal: NodeId, heuristic: &Heuristic) -> Result<SearchOutcome> {
        self.search_with(start, goal, heuristic, &SearchOptions::default())
    }

    /// A* search from `start` to `goal` using a fresh scratch context.
    pub fn search_with(
        &self,
        start: NodeId,
        goal: NodeId,
        heuristic: &Heuristic,
        options: &SearchOptions,
    ) -> Result<SearchOutcome> {
        let mut context = SearchContext::new(self.len());
        self.search_in(&mut context, start, goal, heuristic, options)
    }

    /// A* search reusing a caller-owned scratch context.
    ///
    /// The context is reset before the search starts, and afterwards holds
    /// the final cost, heuristic, and parent of every node the search touched.
    /// Paths are optimal only when `heuristic` is admissible.
    pub fn search_in(
        &self,
        context: &mut SearchContext,
        start: NodeId,
        goal: NodeId,
        heuristic: &Heuristic,
        options: &SearchOptions,
    ) -> Result<SearchOutcome> {
        let start_position = self.node(start)?.position;
        let goal_position = self.node(goal)?.position;

        context.reset_search_state(self.len());

        let mut frontier = PriorityFrontier::new();
        let estimate = heuristic.distance(&start_position, &goal_position);
        *context.state_mut(start)? = SearchState {
            cost: Some(0.0),
            heuristic: Some(estimate),
            parent: None,
        };
        frontier.add(start, estimate);

        let mut expansions = 0usize;
        while !frontier.is_empty() {
            let current = frontier.pull()?;
            if current == goal {
                let path = context.reconstruct_path(goal)?;
                debug!(
                    start,
                    goal,
                    heuristic = heuristic.name(),
                    expansions,
                    hops = path.len().saturating_sub(1),
                    "search reached goal"
                );
                return Ok(SearchOutcome { path, expansions });
            }

            if let Some(limit) = options.max_expansions {
                if expansions >= limit {
                    warn!(start, goal, limit, "search expansion budget exhausted");
                    return Ok(SearchOutcome::unreachable(expansions));
                }
            }
            expansions += 1;

            let current_cost = context
                .state(current)
                .and_then(|state| state.cost)
                .ok_or(Error::BrokenChain { goal: current })?;

            for next in self.neighbor_ids(current) {
                let tentative = current_cost + self.edge_weight(current, next)?;
                let state = context.state_mut(next)?;
                let improves = match state.cost {
                    Some(cost) => tentative < cost,
                    None => true,
                };
                if !improves {
                    continue;
                }

                let estimate = heuristic.distance(&self.nodes[next].position, &goal_position);
                *state = SearchState {
                    cost: Some(tentative),
                    heuristic: Some(estimate),
                    parent: Some(current),
                };
                // A pending node is rescored in place rather than queued twice.
                frontier.add(next, tentative + estimate);
            }
        }

        debug!(start, goal, expansions, "goal unreachable");
        Ok(SearchOutcome::unreachable(expansions))
    }
}

fn build_weights(nodes: &[Node], adjacency: &[Vec<bool>]) -> Vec<Vec<f64>> {
    nodes
        .iter()
        .zip(adjacency)
        .map(|(from, row)| {
            nodes
                .iter()
                .zip(row)
                .map(|(to, &linked)| {
                    if from.id == to.id {
                        0.0
                    } else if linked {
                        from.position.euclidean_distance(&to.position) * METERS_PER_UNIT
                    } else {
                        f64::INFINITY
                    }
                })
                .collect()
        })
        .collect()
}
