use std::collections::VecDeque;

use tracing::trace;

use crate::error::GraphError;
use crate::graph::{Capacity, FlowGraph, NodeId, BACKGROUND, FOREGROUND};

/// A path from the foreground terminal to the background terminal, stored sink first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AugmentingPath {
    nodes : Vec<NodeId>,
    // edges[k] runs from nodes[k + 1] to nodes[k].
    pub(crate) edges : Vec<usize>,
}

impl AugmentingPath {
    /// Node ids from the background terminal back to the foreground terminal.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn hops(&self) -> usize {
        self.edges.len()
    }
}

/// Scratch space for one breadth-first search: visited flags, parent arcs and the queue.
///
/// A search always leaves the state cleared, whether or not it found a path, so the
/// same state can be handed to any number of searches.
#[derive(Clone, Debug, Default)]
pub struct SearchState {
    visited : Vec<bool>,
    parent : Vec<Option<usize>>,
    touched : Vec<usize>,
    queue : VecDeque<usize>,
}

impl SearchState {
    pub fn new(nodes : usize) -> Self {
        SearchState {
            visited : vec![false; nodes],
            parent : vec![None; nodes],
            touched : Vec::new(),
            queue : VecDeque::new(),
        }
    }

    pub fn for_graph<C : Capacity>(graph : &FlowGraph<C>) -> Self {
        Self::new(graph.node_count())
    }

    pub fn is_clear(&self) -> bool {
        self.touched.is_empty()
            && self.queue.is_empty()
            && self.visited.iter().all(|v| !v)
            && self.parent.iter().all(Option::is_none)
    }

    fn fit(&mut self, nodes : usize) {
        if self.visited.len() < nodes {
            self.visited.resize(nodes, false);
            self.parent.resize(nodes, None);
        }
    }

    fn visit(&mut self, index : usize, via : Option<usize>) {
        self.visited[index] = true;
        self.parent[index] = via;
        self.touched.push(index);
    }

    fn clear(&mut self) {
        for index in self.touched.drain(..) {
            self.visited[index] = false;
            self.parent[index] = None;
        }
        self.queue.clear();
    }
}

/// Breadth-first search for an augmenting path with a throwaway state.
pub fn find_augmenting_path<C : Capacity>(graph : &FlowGraph<C>) -> Result<Option<AugmentingPath>, GraphError> {
    let mut state = SearchState::for_graph(graph);
    find_augmenting_path_with(graph, &mut state)
}

/// Breadth-first search from `FOREGROUND` to `BACKGROUND` over arcs with residual capacity left.
///
/// Neighbors are expanded in arc insertion order and the search stops the moment the
/// background terminal is discovered. Returns `Ok(None)` once the network is at max flow.
pub fn find_augmenting_path_with<C : Capacity>(graph : &FlowGraph<C>, state : &mut SearchState) -> Result<Option<AugmentingPath>, GraphError> {
    let source = graph.index_of(FOREGROUND)?;
    let sink = graph.index_of(BACKGROUND)?;
    state.fit(graph.node_count());

    state.visit(source, None);
    state.queue.push_back(source);
    let mut found = false;
    'search: while let Some(node) = state.queue.pop_front() {
        for &e in graph.out_edges(node) {
            let edge = graph.edge_at(e);
            let next = edge.head;
            if state.visited[next] {
                continue;
            }
            if edge.residual() > C::zero() {
                state.visit(next, Some(e));
                if next == sink {
                    found = true;
                    break 'search;
                }
                state.queue.push_back(next);
            }
        }
    }

    let path = if found { Some(trace_back(graph, state, sink)) } else { None };
    trace!(found, explored = state.touched.len(), "augmenting path search finished");
    state.clear();
    return Ok(path);
}

fn trace_back<C : Capacity>(graph : &FlowGraph<C>, state : &SearchState, sink : usize) -> AugmentingPath {
    let mut nodes = vec![graph.id_at(sink)];
    let mut edges = Vec::new();
    let mut current = sink;
    while let Some(e) = state.parent[current] {
        edges.push(e);
        current = graph.edge_at(e).tail;
        nodes.push(graph.id_at(current));
    }
    AugmentingPath { nodes, edges }
}
