use core::fmt;

use crate::utils::types::{EdgeHandle, Point2, VertexHandle};

use super::tri_data_structure::{Edge, TriDataStructure};

/// A read-only view of a live edge.
#[derive(Clone, Copy)]
pub struct EdgeIterator<'a> {
    pub tds: &'a TriDataStructure,
    /// The edge handle of this iterator
    pub idx: EdgeHandle,
    pub edge: &'a Edge,
}

impl<'a> EdgeIterator<'a> {
    pub const fn new(tds: &'a TriDataStructure, idx: EdgeHandle, edge: &'a Edge) -> Self {
        Self { tds, idx, edge }
    }

    /// Retrieve the node this edge was created from.
    pub const fn starting_node(&self) -> VertexHandle {
        self.edge.nodes[0]
    }

    /// Retrieve the node this edge was created to.
    pub const fn end_node(&self) -> VertexHandle {
        self.edge.nodes[1]
    }

    pub const fn nodes(&self) -> [VertexHandle; 2] {
        self.edge.nodes
    }

    pub const fn ref_count(&self) -> usize {
        self.edge.ref_count
    }

    /// Check if the edge spans `a` and `b`, in either direction.
    pub const fn connects(&self, a: VertexHandle, b: VertexHandle) -> bool {
        let [s, e] = self.edge.nodes;
        (s == a && e == b) || (s == b && e == a)
    }

    /// Check if the edge is part of the frame.
    pub fn is_frame(&self) -> bool {
        self.tds.is_frame_edge(self.idx)
    }

    /// The positions of both nodes, if they are alive.
    pub fn points(&self) -> Option<[Point2; 2]> {
        let [s, e] = self.edge.nodes;
        let s = self.tds.vertices.get(s).ok()?.position;
        let e = self.tds.vertices.get(e).ok()?.position;
        Some([s, e])
    }
}

impl fmt::Display for EdgeIterator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Edge {}: {} -> {} (refs: {})",
            self.idx,
            self.starting_node(),
            self.end_node(),
            self.ref_count()
        )
    }
}
