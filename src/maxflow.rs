use itertools::Itertools;
use tracing::{info, trace};

use crate::error::GraphError;
use crate::graph::{Capacity, FlowGraph};
use crate::search::{find_augmenting_path_with, AugmentingPath, SearchState};

/// Outcome of a finished solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaxFlow<C> {
    /// Sum of the bottlenecks of every augmenting path.
    pub value : C,
    pub augmentations : usize,
}

/// Edmonds-Karp: augment along breadth-first shortest paths until none is left.
///
/// An augmentation advances the usage of each traversed arc and of its twin by the
/// bottleneck. Twins are separate capacity pools that move in lockstep; pushing flow one
/// way never frees capacity the other way. The final residual network has no path from
/// `FOREGROUND` to `BACKGROUND`.
pub fn edmonds_karp<C : Capacity>(graph : &mut FlowGraph<C>) -> Result<MaxFlow<C>, GraphError> {
    let mut state = SearchState::for_graph(graph);
    let mut flow = MaxFlow { value : C::zero(), augmentations : 0 };
    while let Some(path) = find_augmenting_path_with(graph, &mut state)? {
        let df = augment(graph, &path);
        trace!(bottleneck = ?df, path = %path.nodes().iter().join(" <- "), "augmented");
        flow.value = flow.value + df;
        flow.augmentations += 1;
    }
    info!(value = ?flow.value, augmentations = flow.augmentations, "max flow reached");
    return Ok(flow);
}

/// Smallest residual capacity along the arcs the search walked.
pub fn bottleneck<C : Capacity>(graph : &FlowGraph<C>, path : &AugmentingPath) -> C {
    path.edges
        .iter()
        .map(|&e| graph.edge_at(e).residual())
        .reduce(|lowest, r| if r < lowest { r } else { lowest })
        .unwrap_or_else(C::zero)
}

fn augment<C : Capacity>(graph : &mut FlowGraph<C>, path : &AugmentingPath) -> C {
    let df = bottleneck(graph, path);
    for &e in &path.edges {
        graph.push_coupled(e, df);
    }
    df
}

impl<C : Capacity> FlowGraph<C> {
    /// Runs the solver to completion on this graph.
    pub fn solve(&mut self) -> Result<MaxFlow<C>, GraphError> {
        edmonds_karp(self)
    }
}
