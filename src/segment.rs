use std::collections::VecDeque;

use image::GrayImage;
use tracing::debug;

use crate::error::SegmentError;
use crate::graph::{Capacity, FlowGraph, FIRST_PIXEL, FOREGROUND};
use crate::grid::pixel_coords;
use crate::Label;

/// Row-major grid of labels, stored as 0 (background) and 1 (foreground).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelGrid {
    width : usize,
    height : usize,
    labels : Vec<u8>,
}

impl LabelGrid {
    /// An all-background grid.
    pub fn new(width : usize, height : usize) -> Self {
        LabelGrid { width, height, labels : vec![u8::from(Label::Background); width * height] }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// `None` outside the grid.
    pub fn get(&self, x : usize, y : usize) -> Option<Label> {
        let label = match self.labels[self.index(x, y)?] {
            0 => Label::Background,
            _ => Label::Foreground,
        };
        Some(label)
    }

    /// Returns `None`, leaving the grid alone, when (x, y) is outside it.
    pub fn set(&mut self, x : usize, y : usize, label : Label) -> Option<()> {
        let i = self.index(x, y)?;
        self.labels[i] = label.into();
        Some(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.labels
    }

    pub fn count(&self, label : Label) -> usize {
        let value : u8 = label.into();
        self.labels.iter().filter(|&&l| l == value).count()
    }

    /// Black for background, white for foreground.
    pub fn to_luma(&self) -> Result<GrayImage, SegmentError> {
        let too_large = || SegmentError::ImageTooLarge { width : self.width, height : self.height };
        let w : u32 = self.width.try_into().map_err(|_| too_large())?;
        let h : u32 = self.height.try_into().map_err(|_| too_large())?;
        let pixels = self.labels.iter().map(|&l| if l == 0 { 0 } else { 255 }).collect();
        GrayImage::from_raw(w, h, pixels).ok_or_else(too_large)
    }

    fn index(&self, x : usize, y : usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| (y * self.width) + x)
    }
}

/// Reads the labeling out of a solved grid graph.
///
/// Breadth-first walk from the foreground terminal over every arc, saturated or not. A pixel
/// is labeled foreground when the arc it was first discovered through still has residual
/// capacity; otherwise it stays background. The walk itself never stops at saturated arcs,
/// so every pixel connected to the foreground terminal is visited exactly once.
pub fn extract_labels<C : Capacity>(graph : &FlowGraph<C>, width : usize, height : usize) -> Result<LabelGrid, SegmentError> {
    let mut labels = LabelGrid::new(width, height);
    let mut visited = vec![false; width * height];
    let mut queue = VecDeque::from([graph.index_of(FOREGROUND)?]);

    while let Some(node) = queue.pop_front() {
        for &e in graph.out_edges(node) {
            let edge = graph.edge_at(e);
            let id = graph.id_at(edge.head);
            if id < FIRST_PIXEL {
                continue;
            }
            let (x, y) = pixel_coords(id, width, height).ok_or(SegmentError::PixelOutOfGrid(id))?;
            let linear = (y * width) + x;
            if !visited[linear] {
                queue.push_back(edge.head);
                if !edge.is_saturated() {
                    labels.set(x, y, Label::Foreground);
                }
                visited[linear] = true;
            }
        }
    }

    debug!(foreground = labels.count(Label::Foreground), pixels = width * height, "labels extracted");
    return Ok(labels);
}
