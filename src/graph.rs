use std::fmt::Debug;

use num_traits::Num;
use tracing::trace;

use crate::error::GraphError;

pub type NodeId = usize;

/// Terminal for label 0. Augmenting paths end here.
pub const BACKGROUND : NodeId = 0;
/// Terminal for label 1. Augmenting paths start here.
pub const FOREGROUND : NodeId = 1;
/// Id of the first pixel; pixel (x, y) of a `w` wide image is `FIRST_PIXEL + y * w + x`.
pub const FIRST_PIXEL : NodeId = 2;

/// Largest id `add_node` accepts. Ids index a slot table, so they are expected to be dense:
/// the terminals plus the pixels of an image of up to 2^28 pixels.
pub const MAX_NODE_ID : NodeId = FIRST_PIXEL + (1 << 28) - 1;

/// Anything that can be used as an arc capacity: integers for exact work, `f64` for energies.
pub trait Capacity: Num + PartialOrd + Copy + Debug {}

impl<T> Capacity for T where T: Num + PartialOrd + Copy + Debug {}

/// One directed arc. Every arc has a twin running the other way with the same capacity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge<C> {
    pub(crate) tail : usize,
    pub(crate) head : usize,
    pub(crate) twin : usize,
    capacity : C,
    usage : C,
}

impl<C : Capacity> Edge<C> {
    pub fn capacity(&self) -> C {
        self.capacity
    }

    pub fn usage(&self) -> C {
        self.usage
    }

    pub fn residual(&self) -> C {
        self.capacity - self.usage
    }

    pub fn is_saturated(&self) -> bool {
        !(self.usage < self.capacity)
    }

    // Usage never passes capacity, so an arc whose residual is the bottleneck ends exactly full.
    pub(crate) fn push(&mut self, amount : C) {
        if self.residual() <= amount {
            self.usage = self.capacity;
        } else {
            self.usage = self.usage + amount;
        }
    }
}

/// Flow network keyed by domain ids.
///
/// Ids map to dense indices through `slots`, so lookups are plain array accesses. The
/// ids used here are the two terminals plus linear pixel indices, which keeps the slot
/// table as long as the image. Arcs live in one arena and refer to each other by index.
#[derive(Clone, Debug)]
pub struct FlowGraph<C> {
    ids : Vec<NodeId>,
    slots : Vec<Option<usize>>,
    adjacency : Vec<Vec<usize>>,
    edges : Vec<Edge<C>>,
}

impl<C : Capacity> Default for FlowGraph<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C : Capacity> FlowGraph<C> {
    pub fn new() -> Self {
        FlowGraph {
            ids : Vec::new(),
            slots : Vec::new(),
            adjacency : Vec::new(),
            edges : Vec::new(),
        }
    }

    pub fn with_capacity(nodes : usize) -> Self {
        FlowGraph {
            ids : Vec::with_capacity(nodes),
            slots : Vec::with_capacity(nodes),
            adjacency : Vec::with_capacity(nodes),
            edges : Vec::new(),
        }
    }

    /// Adds `id` and the arcs to its neighbors, or merges them into an existing node.
    ///
    /// `neighbors` and `capacities` are paired by position. Unknown neighbors are created on
    /// the fly. An arc that already exists between two nodes is left untouched, so declaring
    /// the same edge from either endpoint, or twice, is harmless. Every new arc is created
    /// together with its reverse twin of the same capacity.
    ///
    /// The whole call is validated before anything is inserted. Ids above `MAX_NODE_ID` are
    /// rejected, since the slot table grows to the largest id seen.
    pub fn add_node(&mut self, id : NodeId, neighbors : &[NodeId], capacities : &[C]) -> Result<(), GraphError> {
        if neighbors.len() != capacities.len() {
            return Err(GraphError::MismatchedLengths {
                node : id,
                neighbors : neighbors.len(),
                capacities : capacities.len(),
            });
        }
        if let Some(&big) = std::iter::once(&id).chain(neighbors).find(|&&n| n > MAX_NODE_ID) {
            return Err(GraphError::IdOutOfRange { id : big, max : MAX_NODE_ID });
        }
        for (&neighbor, &capacity) in neighbors.iter().zip(capacities) {
            if neighbor == id {
                return Err(GraphError::SelfLoop(id));
            }
            // Also rejects NaN.
            if !(capacity >= C::zero()) {
                return Err(GraphError::InvalidCapacity { from : id, to : neighbor });
            }
        }

        let created = !self.contains(id);
        let node = self.ensure_node(id);
        let mut added = 0;
        for (&neighbor, &capacity) in neighbors.iter().zip(capacities) {
            let other = self.ensure_node(neighbor);
            if self.find_edge(node, other).is_none() {
                self.insert_pair(node, other, capacity);
                added += 1;
            }
        }
        trace!(id, created, added, "merged node");
        Ok(())
    }

    pub fn contains(&self, id : NodeId) -> bool {
        self.slot(id).is_some()
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    /// Number of directed arcs, twice the number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Node ids in the order they were first seen.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ids.iter().copied()
    }

    /// Neighbor ids of `id` in the order their arcs were added.
    pub fn neighbors(&self, id : NodeId) -> Result<impl Iterator<Item = NodeId> + '_, GraphError> {
        let index = self.index_of(id)?;
        Ok(self.adjacency[index].iter().map(move |&e| self.ids[self.edges[e].head]))
    }

    /// The arc running from `from` to `to`.
    pub fn edge(&self, from : NodeId, to : NodeId) -> Result<&Edge<C>, GraphError> {
        let tail = self.index_of(from)?;
        let head = self.index_of(to)?;
        self.find_edge(tail, head)
            .map(|e| &self.edges[e])
            .ok_or(GraphError::ArcNotFound { from, to })
    }

    /// Every arc as `(from, to, arc)`, in creation order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &Edge<C>)> + '_ {
        self.edges
            .iter()
            .map(move |edge| (self.ids[edge.tail], self.ids[edge.head], edge))
    }

    /// Total usage over the outgoing arcs of `id`.
    pub fn node_flow(&self, id : NodeId) -> Result<C, GraphError> {
        let index = self.index_of(id)?;
        let mut flow = C::zero();
        for &e in &self.adjacency[index] {
            flow = flow + self.edges[e].usage;
        }
        return Ok(flow);
    }

    pub(crate) fn index_of(&self, id : NodeId) -> Result<usize, GraphError> {
        self.slot(id).ok_or(GraphError::NodeNotFound(id))
    }

    pub(crate) fn id_at(&self, index : usize) -> NodeId {
        self.ids[index]
    }

    pub(crate) fn out_edges(&self, index : usize) -> &[usize] {
        &self.adjacency[index]
    }

    pub(crate) fn edge_at(&self, e : usize) -> &Edge<C> {
        &self.edges[e]
    }

    /// Advances arc `e` and its twin by the same amount.
    pub(crate) fn push_coupled(&mut self, e : usize, amount : C) {
        let twin = self.edges[e].twin;
        self.edges[e].push(amount);
        self.edges[twin].push(amount);
    }

    fn slot(&self, id : NodeId) -> Option<usize> {
        self.slots.get(id).copied().flatten()
    }

    fn ensure_node(&mut self, id : NodeId) -> usize {
        if let Some(index) = self.slot(id) {
            return index;
        }
        if id >= self.slots.len() {
            self.slots.resize(id + 1, None);
        }
        let index = self.ids.len();
        self.slots[id] = Some(index);
        self.ids.push(id);
        self.adjacency.push(Vec::new());
        index
    }

    // Arcs come in twins, so the shorter adjacency list is enough to answer.
    // Terminals have one arc per pixel; pixels have at most ten.
    fn find_edge(&self, tail : usize, head : usize) -> Option<usize> {
        if self.adjacency[tail].len() <= self.adjacency[head].len() {
            self.adjacency[tail]
                .iter()
                .copied()
                .find(|&e| self.edges[e].head == head)
        } else {
            self.adjacency[head]
                .iter()
                .copied()
                .find(|&e| self.edges[e].head == tail)
                .map(|e| self.edges[e].twin)
        }
    }

    fn insert_pair(&mut self, tail : usize, head : usize, capacity : C) {
        let forward = self.edges.len();
        let backward = forward + 1;
        self.edges.push(Edge { tail, head, twin : backward, capacity, usage : C::zero() });
        self.edges.push(Edge { tail : head, head : tail, twin : forward, capacity, usage : C::zero() });
        self.adjacency[tail].push(forward);
        self.adjacency[head].push(backward);
    }
}
