use itertools::iproduct;
use tracing::debug;

use crate::error::GraphError;
use crate::graph::{Capacity, FlowGraph, NodeId, BACKGROUND, FIRST_PIXEL, FOREGROUND};
use crate::{ImageEnergy, Label};

pub fn pixel_id(x : usize, y : usize, width : usize) -> NodeId {
    FIRST_PIXEL + (y * width) + x
}

/// Inverse of `pixel_id`. `None` for terminals and ids past the last pixel.
pub fn pixel_coords(id : NodeId, width : usize, height : usize) -> Option<(usize, usize)> {
    if id < FIRST_PIXEL || width == 0 {
        return None;
    }
    let linear = id - FIRST_PIXEL;
    let (x, y) = (linear % width, linear / width);
    (y < height).then_some((x, y))
}

/// The 8-neighborhood of (x, y) clipped to the image, row by row starting top-left.
pub fn neighborhood(x : usize, y : usize, width : usize, height : usize) -> impl Iterator<Item = (usize, usize)> {
    iproduct!(-1isize..=1, -1isize..=1)
        .filter(|&offset| offset != (0, 0))
        .filter_map(move |(dy, dx)| {
            let nx = x.checked_add_signed(dx)?;
            let ny = y.checked_add_signed(dy)?;
            (nx < width && ny < height).then_some((nx, ny))
        })
}

/// Id offsets of the neighbors of pixel (x, y), in the order their arcs are declared.
///
/// Images at least two pixels wide and tall use the border table below; its bottom-left
/// entry starts at `-w - 1`, which lands on the last pixel two rows up (or on the
/// foreground terminal when the image has two rows). One-row and one-column images fall
/// back to the clipped `neighborhood`.
pub fn neighbor_offsets(x : usize, y : usize, width : usize, height : usize) -> Vec<isize> {
    let w = width as isize;
    if width < 2 || height < 2 {
        return neighborhood(x, y, width, height)
            .map(|(nx, ny)| ((ny as isize - y as isize) * w) + (nx as isize - x as isize))
            .collect();
    }
    let (top, bottom, left, right) = (y == 0, y == height - 1, x == 0, x == width - 1);
    match (top, bottom, left, right) {
        (true, _, true, _) => vec![1, w, w + 1],
        (true, _, _, true) => vec![-1, w, w - 1],
        (true, ..) => vec![-1, 1, w - 1, w, w + 1],
        (_, true, true, _) => vec![-w - 1, -w + 1, 1],
        (_, true, _, true) => vec![-w - 1, -w, -1],
        (_, true, ..) => vec![-w - 1, -w, -w + 1, -1, 1],
        (_, _, true, _) => vec![-w, -w + 1, 1, w, w + 1],
        (_, _, _, true) => vec![-w - 1, -w, -1, w - 1, w],
        _ => vec![-w - 1, -w, -w + 1, -1, 1, w - 1, w, w + 1],
    }
}

/// Turns an image energy into a flow network: one node per pixel, an arc to each
/// terminal weighted by the unary costs, and smoothness arcs to every neighbor.
pub fn build_grid_graph<C : Capacity>(energy : &dyn ImageEnergy<C>) -> Result<FlowGraph<C>, GraphError> {
    let (w, h) = energy.dimensions();
    debug!(width = w, height = h, "building grid graph");
    let mut graph = FlowGraph::with_capacity(FIRST_PIXEL + (w * h));
    let mut pixels = Vec::with_capacity(w * h);
    let mut background_costs = Vec::with_capacity(w * h);
    let mut foreground_costs = Vec::with_capacity(w * h);

    for y in 0..h {
        for x in 0..w {
            let id = pixel_id(x, y, w);
            let u0 = energy.single_energy(x, y, Label::Background);
            let u1 = energy.single_energy(x, y, Label::Foreground);

            // First, the unary arcs to both terminals.
            let mut neighbors = vec![BACKGROUND, FOREGROUND];
            let mut capacities = vec![u0, u1];

            // Then the smoothness arcs, paid when the two pixels end up on different sides.
            // An offset reaching a terminal only repeats a unary arc declared above, so it is dropped.
            for offset in neighbor_offsets(x, y, w, h) {
                let Some(neighbor) = id.checked_add_signed(offset) else { continue };
                let Some((nx, ny)) = pixel_coords(neighbor, w, h) else { continue };
                neighbors.push(neighbor);
                capacities.push(energy.dual_energy(x, y, Label::Background, nx, ny, Label::Foreground));
            }
            graph.add_node(id, &neighbors, &capacities)?;

            pixels.push(id);
            background_costs.push(u0);
            foreground_costs.push(u1);
        }
    }

    // The terminals exist since the first pixel; this only fills in arcs still missing.
    graph.add_node(BACKGROUND, &pixels, &background_costs)?;
    graph.add_node(FOREGROUND, &pixels, &foreground_costs)?;
    debug!(nodes = graph.node_count(), arcs = graph.edge_count(), "grid graph built");
    return Ok(graph);
}
