use thiserror::Error;

use crate::graph::NodeId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("node {node} was given {neighbors} neighbors but {capacities} capacities")]
    MismatchedLengths {
        node : NodeId,
        neighbors : usize,
        capacities : usize,
    },
    #[error("node {0} does not exist")]
    NodeNotFound(NodeId),
    #[error("no arc from node {from} to node {to}")]
    ArcNotFound { from : NodeId, to : NodeId },
    #[error("node id {id} is above the largest supported id {max}")]
    IdOutOfRange { id : NodeId, max : NodeId },
    #[error("node {0} cannot be its own neighbor")]
    SelfLoop(NodeId),
    #[error("arc from node {from} to node {to} has a negative or undefined capacity")]
    InvalidCapacity { from : NodeId, to : NodeId },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SegmentError {
    #[error("image has no pixels")]
    EmptyImage,
    #[error("intensity buffer holds {len} values but a {width}x{height} image needs {expected}")]
    ShapeMismatch {
        width : usize,
        height : usize,
        len : usize,
        expected : usize,
    },
    #[error("intensity {value} at ({x}, {y}) is outside [0, 1]")]
    IntensityOutOfRange { x : usize, y : usize, value : f64 },
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name : &'static str, value : f64 },
    #[error("a {width}x{height} grid does not fit in an image buffer")]
    ImageTooLarge { width : usize, height : usize },
    #[error("node {0} is not a pixel of the label grid")]
    PixelOutOfGrid(NodeId),
    #[error(transparent)]
    Graph(#[from] GraphError),
}
