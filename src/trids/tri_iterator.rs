use core::fmt;

use anyhow::Result;

use crate::{
    circumcircle::Circle,
    error::TriangulationError,
    predicates::{double_area, orient_2d},
    utils::types::{EdgeHandle, Point2, TriHandle, Triangle2, VertexHandle},
};

use super::{
    edge_iterator::EdgeIterator,
    tri_data_structure::{Tri, TriDataStructure},
};

/// A read-only view of a live triangle.
#[derive(Clone, Copy)]
pub struct TriIterator<'a> {
    pub tds: &'a TriDataStructure,
    pub idx: TriHandle,
    pub tri: &'a Tri,
}

impl<'a> TriIterator<'a> {
    pub const fn new(tds: &'a TriDataStructure, idx: TriHandle, tri: &'a Tri) -> Self {
        Self { tds, idx, tri }
    }

    /// Returns the handle of this.
    pub const fn idx(&self) -> TriHandle {
        self.idx
    }

    /// Get the vertex handles of this triangle, in winding order.
    pub const fn nodes(&self) -> [VertexHandle; 3] {
        self.tri.nodes
    }

    /// Get the edges of this triangle, aligned with [Self::sides].
    pub fn edges(&self) -> Result<[EdgeIterator<'a>; 3]> {
        let [x, y, z] = self.tri.edges;
        Ok([self.edge(x)?, self.edge(y)?, self.edge(z)?])
    }

    /// The vertex pairs spanned by the three edges: `x-y`, `y-z`, `z-x`.
    pub const fn sides(&self) -> [[VertexHandle; 2]; 3] {
        let [x, y, z] = self.tri.nodes;
        [[x, y], [y, z], [z, x]]
    }

    /// The positions of the three nodes.
    pub fn points(&self) -> Result<Triangle2> {
        let [x, y, z] = self.tri.nodes;
        Ok([self.point(x)?, self.point(y)?, self.point(z)?])
    }

    pub const fn circle(&self) -> &Circle {
        &self.tri.circle
    }

    pub fn contains_node(&self, v: VertexHandle) -> bool {
        self.tri.nodes.contains(&v)
    }

    /// The sign of the orientation, `-1.0` for every proper triangle of a [Triangulation](crate::Triangulation).
    pub fn orientation(&self) -> Result<f64> {
        let [a, b, c] = self.points()?;
        Ok(orient_2d(&a, &b, &c))
    }

    /// Twice the signed area, negative for every triangle of a [Triangulation](crate::Triangulation).
    pub fn double_area(&self) -> Result<f64> {
        let [a, b, c] = self.points()?;
        Ok(double_area(&a, &b, &c))
    }

    /// Check if the triangle is flat, i.e. consists of three aligned points.
    pub fn is_flat(&self) -> Result<bool> {
        Ok(self.orientation()? == 0.0)
    }

    fn edge(&self, handle: EdgeHandle) -> Result<EdgeIterator<'a>> {
        let edge = self
            .tds
            .edges
            .get(handle)
            .map_err(|e| TriangulationError::not_found("edge", e))?;
        Ok(EdgeIterator::new(self.tds, handle, edge))
    }

    fn point(&self, v: VertexHandle) -> Result<Point2> {
        Ok(self
            .tds
            .vertices
            .get(v)
            .map_err(|e| TriangulationError::not_found("vertex", e))?
            .position)
    }
}

impl fmt::Display for TriIterator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x, y, z] = self.nodes();
        write!(f, "Triangle {}: {} -> {} -> {}", self.idx(), x, y, z)
    }
}
