//! Binary image segmentation on a Markov random field, solved by max-flow/min-cut.
//!
//! An image becomes a flow network (`grid`), the network is pushed to max flow with
//! Edmonds-Karp (`maxflow`), and the labels are read back from the saturated arcs
//! (`segment`). `mrf` glues the three together for grayscale intensities.

pub mod error;
pub mod graph;
pub mod grid;
pub mod maxflow;
pub mod mrf;
pub mod search;
pub mod segment;

pub use error::{GraphError, SegmentError};
pub use graph::{Capacity, Edge, FlowGraph, NodeId, BACKGROUND, FIRST_PIXEL, FOREGROUND, MAX_NODE_ID};
pub use grid::{build_grid_graph, neighbor_offsets, neighborhood, pixel_coords, pixel_id};
pub use maxflow::{edmonds_karp, MaxFlow};
pub use mrf::{segment, GaussianNoiseEnergy, IntensityGrid, Mrf, MrfParams};
pub use search::{find_augmenting_path, find_augmenting_path_with, AugmentingPath, SearchState};
pub use segment::{extract_labels, LabelGrid};

/// The two labels of the field. Each one owns a terminal node of the flow network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Label {
    Background = 0,
    Foreground = 1,
}

impl Label {
    pub fn terminal(self) -> NodeId {
        match self {
            Label::Background => BACKGROUND,
            Label::Foreground => FOREGROUND,
        }
    }
}

impl From<Label> for u8 {
    fn from(label : Label) -> u8 {
        label as u8
    }
}

/// Energy of a labeling over a `width x height` image.
///
/// `single_energy(x, y, label)` is how strongly pixel (x, y) is tied to `label`: it becomes
/// the capacity of the arc to that label's terminal, so it is the price paid when the pixel
/// ends up with the *other* label. A large value pulls the pixel towards `label`.
/// `dual_energy` is the price paid by two neighboring pixels that take the given, different,
/// labels.
pub trait ImageEnergy<E> {
    fn dimensions(&self) -> (usize, usize);
    fn single_energy(&self, x : usize, y : usize, label : Label) -> E;
    fn dual_energy(&self, x1 : usize, y1 : usize, label1 : Label, x2 : usize, y2 : usize, label2 : Label) -> E;
}

#[cfg(test)]
mod tests {
    use crate::{build_grid_graph, extract_labels, FlowGraph, ImageEnergy, Label};

    // Left columns tied hard to foreground, right columns to background, with a cheap seam.
    struct Stripes {
        w : usize,
        h : usize,
    }

    impl ImageEnergy<u32> for Stripes {
        fn dimensions(&self) -> (usize, usize) {
            (self.w, self.h)
        }

        fn single_energy(&self, x : usize, _y : usize, label : Label) -> u32 {
            let left = x < self.w / 2;
            match (left, label) {
                (true, Label::Background) => 0,
                (true, Label::Foreground) => 9,
                (false, Label::Background) => 9,
                (false, Label::Foreground) => 0,
            }
        }

        fn dual_energy(&self, _x1 : usize, _y1 : usize, label1 : Label, _x2 : usize, _y2 : usize, label2 : Label) -> u32 {
            if label1 == label2 { 0 } else { 1 }
        }
    }

    // Same tie for every pixel, no smoothness.
    struct Tie {
        foreground : u32,
        background : u32,
    }

    impl ImageEnergy<u32> for Tie {
        fn dimensions(&self) -> (usize, usize) {
            (2, 2)
        }

        fn single_energy(&self, _x : usize, _y : usize, label : Label) -> u32 {
            match label {
                Label::Background => self.background,
                Label::Foreground => self.foreground,
            }
        }

        fn dual_energy(&self, _x1 : usize, _y1 : usize, _label1 : Label, _x2 : usize, _y2 : usize, _label2 : Label) -> u32 {
            0
        }
    }

    fn label_with(energy : &Tie) -> Vec<u8> {
        let mut g : FlowGraph<u32> = build_grid_graph(energy).unwrap();
        g.solve().unwrap();
        extract_labels(&g, 2, 2).unwrap().as_slice().to_vec()
    }

    #[test]
    fn stronger_tie_wins_the_label() {
        assert_eq!(label_with(&Tie { foreground : 9, background : 0 }), vec![1, 1, 1, 1]);
        assert_eq!(label_with(&Tie { foreground : 0, background : 9 }), vec![0, 0, 0, 0]);
    }

    #[test]
    fn labels_map_to_terminals() {
        assert_eq!(Label::Background.terminal(), crate::BACKGROUND);
        assert_eq!(Label::Foreground.terminal(), crate::FOREGROUND);
        assert_eq!(u8::from(Label::Foreground), 1);
    }

    #[test]
    fn integer_energy_round_trip() {
        let energy = Stripes { w : 4, h : 3 };
        let mut g : FlowGraph<u32> = build_grid_graph(&energy).unwrap();
        let flow = g.solve().unwrap();
        // Seven neighbor edges cross the seam, plus the bottom-left corner's -w-1 edge to (3, 0).
        assert_eq!(flow.value, 8);
        let labels = extract_labels(&g, 4, 3).unwrap();
        for y in 0..3 {
            for x in 0..4 {
                let expected = if x < 2 { Label::Foreground } else { Label::Background };
                assert_eq!(labels.get(x, y), Some(expected));
            }
        }
    }
}
