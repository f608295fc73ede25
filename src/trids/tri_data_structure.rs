use std::collections::{BTreeSet, HashMap};

use super::{edge_iterator::EdgeIterator, tri_iterator::TriIterator};
use crate::{
    circumcircle::Circle,
    error::TriangulationError,
    pool::Pool,
    utils::types::{EdgeHandle, Point2, TriHandle, VertexHandle},
};

use anyhow::Result;

/// A vertex of the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point2,
    /// The number of live edges incident to this vertex.
    pub ref_count: usize,
}

/// An undirected edge between two vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub nodes: [VertexHandle; 2],
    /// The number of triangles listing this edge, plus one while the edge belongs to the frame.
    pub ref_count: usize,
}

/// A triangle, its edges are aligned with its nodes: `edges[0]` spans `nodes[0]`-`nodes[1]`,
/// `edges[1]` spans `nodes[1]`-`nodes[2]` and `edges[2]` spans `nodes[2]`-`nodes[0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tri {
    pub nodes: [VertexHandle; 3],
    pub edges: [EdgeHandle; 3],
    pub circle: Circle,
}

/// A 2D triangulation data structure.
///
/// Vertices, edges and triangles live in three [Pool]s and refer to each other by handle only.
/// Edges are found by their two vertices, and the triangles across an edge by the edge, through two indices.
///
/// ```ignore
///             ref_count: incident edges
/// vertex <--------------------------------- edge
///                                            ^
///             ref_count: listing triangles   |
///             (+1 for frame edges)           |
///                                           tri
/// ```
#[derive(Debug, Default)]
pub struct TriDataStructure {
    pub(crate) vertices: Pool<Vertex>,
    pub(crate) edges: Pool<Edge>,
    pub(crate) tris: Pool<Tri>,
    /// Unordered vertex pair -> edge.
    edge_index: HashMap<(VertexHandle, VertexHandle), EdgeHandle>,
    /// Edge -> the (at most two) triangles listing it.
    adjacency: HashMap<EdgeHandle, Vec<TriHandle>>,
    /// Exact position -> vertex, vertices are never removed so this never goes stale.
    position_index: HashMap<(u32, u32), VertexHandle>,
    pub(crate) frame_vertices: BTreeSet<VertexHandle>,
    pub(crate) frame_edges: BTreeSet<EdgeHandle>,
}

impl TriDataStructure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex without any edges.
    pub fn add_vertex(&mut self, position: Point2) -> VertexHandle {
        let handle = self.vertices.add(Vertex {
            position,
            ref_count: 0,
        });
        self.position_index
            .entry(position_key(&position))
            .or_insert(handle);

        handle
    }

    /// Look up the vertex at exactly this position.
    pub fn find_vertex(&self, position: &Point2) -> Option<VertexHandle> {
        self.position_index.get(&position_key(position)).copied()
    }

    /// Look up the edge between two vertices, in either direction.
    pub fn find_edge(&self, a: VertexHandle, b: VertexHandle) -> Option<EdgeHandle> {
        self.edge_index.get(&edge_key(a, b)).copied()
    }

    pub fn get_vertex(&self, handle: VertexHandle) -> Result<&Vertex> {
        Ok(self
            .vertices
            .get(handle)
            .map_err(|e| TriangulationError::not_found("vertex", e))?)
    }

    pub fn get_edge(&self, handle: EdgeHandle) -> Result<EdgeIterator> {
        let edge = self
            .edges
            .get(handle)
            .map_err(|e| TriangulationError::not_found("edge", e))?;

        Ok(EdgeIterator::new(self, handle, edge))
    }

    pub fn get_tri(&self, handle: TriHandle) -> Result<TriIterator> {
        let tri = self
            .tris
            .get(handle)
            .map_err(|e| TriangulationError::not_found("triangle", e))?;

        Ok(TriIterator::new(self, handle, tri))
    }

    pub fn position(&self, handle: VertexHandle) -> Result<Point2> {
        Ok(self.get_vertex(handle)?.position)
    }

    /// Create a triangle from three vertices in the given order.
    ///
    /// Existing edges are shared, missing ones are created.
    pub fn add_tri(&mut self, nodes: [VertexHandle; 3]) -> Result<TriHandle> {
        let [x, y, z] = nodes;
        // resolve all positions first, so a dead handle leaves the structure untouched
        let a = self.position(x)?;
        let b = self.position(y)?;
        let c = self.position(z)?;

        let edges = [
            self.acquire_edge(x, y)?,
            self.acquire_edge(y, z)?,
            self.acquire_edge(z, x)?,
        ];

        let handle = self.tris.add(Tri {
            nodes,
            edges,
            circle: Circle::circumscribe(&a, &b, &c),
        });
        for edge in edges {
            self.adjacency.entry(edge).or_default().push(handle);
        }

        Ok(handle)
    }

    /// The triangles listing an edge.
    pub fn listing_tris(&self, edge: EdgeHandle) -> &[TriHandle] {
        self.adjacency.get(&edge).map_or(&[], Vec::as_slice)
    }

    /// The triangle on the other side of `edge`, seen from `tri`.
    pub fn neighbor(&self, tri: TriHandle, edge: EdgeHandle) -> Option<TriHandle> {
        self.listing_tris(edge).iter().copied().find(|&t| t != tri)
    }

    /// Delete a triangle and collect the edges bounding the hole it leaves into `boundary`.
    ///
    /// An edge that is still referenced afterwards (by another triangle or the frame) bounds the hole and is
    /// added. An edge that is no longer referenced lies between two deleted triangles; it is removed from the
    /// graph and taken out of `boundary` again, if an earlier deletion put it there.
    pub fn delete_tri(&mut self, handle: TriHandle, boundary: &mut BTreeSet<EdgeHandle>) -> Result<()> {
        let edges = self.get_tri(handle)?.tri.edges;

        for edge in edges {
            if let Some(listing) = self.adjacency.get_mut(&edge) {
                listing.retain(|&t| t != handle);
            }
            if self.release_edge(edge)? {
                boundary.remove(&edge);
            } else {
                boundary.insert(edge);
            }
        }

        self.tris
            .remove(handle)
            .map_err(|e| TriangulationError::not_found("triangle", e))?;

        Ok(())
    }

    /// Take a reference on the edge `a`-`b`, creating it if it does not exist yet.
    pub fn acquire_edge(&mut self, a: VertexHandle, b: VertexHandle) -> Result<EdgeHandle> {
        if let Some(handle) = self.find_edge(a, b) {
            self.edges
                .update(handle, |edge| edge.ref_count += 1)
                .map_err(|e| TriangulationError::not_found("edge", e))?;
            return Ok(handle);
        }

        for v in [a, b] {
            self.vertices
                .update(v, |vertex| vertex.ref_count += 1)
                .map_err(|e| TriangulationError::not_found("vertex", e))?;
        }

        let handle = self.edges.add(Edge {
            nodes: [a, b],
            ref_count: 1,
        });
        self.edge_index.insert(edge_key(a, b), handle);

        Ok(handle)
    }

    /// Drop a reference on an edge. Returns `true` iff that was the last one and the edge got removed.
    pub fn release_edge(&mut self, handle: EdgeHandle) -> Result<bool> {
        let remaining = self
            .edges
            .update(handle, |edge| {
                edge.ref_count = edge.ref_count.saturating_sub(1);
                edge.ref_count
            })
            .map_err(|e| TriangulationError::not_found("edge", e))?;

        if remaining > 0 {
            return Ok(false);
        }

        let edge = self
            .edges
            .remove(handle)
            .map_err(|e| TriangulationError::not_found("edge", e))?;
        self.edge_index.remove(&edge_key(edge.nodes[0], edge.nodes[1]));
        self.adjacency.remove(&handle);
        self.frame_edges.remove(&handle);

        for v in edge.nodes {
            self.vertices
                .update(v, |vertex| vertex.ref_count = vertex.ref_count.saturating_sub(1))
                .map_err(|e| TriangulationError::not_found("vertex", e))?;
        }

        Ok(true)
    }

    /// Mark the edge `a`-`b` as frame edge, creating it if needed, and both vertices as frame vertices.
    pub fn add_frame_edge(&mut self, a: VertexHandle, b: VertexHandle) -> Result<EdgeHandle> {
        let handle = self.acquire_edge(a, b)?;
        self.frame_edges.insert(handle);
        self.frame_vertices.insert(a);
        self.frame_vertices.insert(b);

        Ok(handle)
    }

    /// Mark an existing edge as frame edge.
    pub fn mark_frame_edge(&mut self, handle: EdgeHandle) -> Result<()> {
        if self.frame_edges.contains(&handle) {
            return Ok(());
        }

        let [a, b] = self.get_edge(handle)?.nodes();
        self.edges
            .update(handle, |edge| edge.ref_count += 1)
            .map_err(|e| TriangulationError::not_found("edge", e))?;
        self.frame_edges.insert(handle);
        self.frame_vertices.insert(a);
        self.frame_vertices.insert(b);

        Ok(())
    }

    /// Replace the frame edge `a`-`b` by the two frame edges `a`-`v` and `v`-`b`.
    ///
    /// Used when `v` lands on the outline, the old edge is removed unless a triangle still lists it.
    pub fn split_frame_edge(&mut self, handle: EdgeHandle, v: VertexHandle) -> Result<()> {
        if !self.frame_edges.contains(&handle) {
            return Err(TriangulationError::NotFound {
                kind: "frame edge",
                handle,
            }
            .into());
        }

        let [a, b] = self.get_edge(handle)?.nodes();
        self.get_vertex(v)?;
        self.frame_edges.remove(&handle);
        self.release_edge(handle)?;
        self.add_frame_edge(a, v)?;
        self.add_frame_edge(v, b)?;

        Ok(())
    }

    /// Unmark all frame edges and vertices, removing edges no triangle refers to.
    ///
    /// Returns the old frame edges that are still alive.
    pub fn clear_frame(&mut self) -> Result<Vec<EdgeHandle>> {
        let old_frame = std::mem::take(&mut self.frame_edges);
        self.frame_vertices.clear();

        let mut surviving = Vec::new();
        for handle in old_frame {
            if !self.edges.contains(handle) {
                continue;
            }
            if !self.release_edge(handle)? {
                surviving.push(handle);
            }
        }

        Ok(surviving)
    }

    pub fn is_frame_edge(&self, handle: EdgeHandle) -> bool {
        self.frame_edges.contains(&handle)
    }

    pub fn is_frame_vertex(&self, handle: VertexHandle) -> bool {
        self.frame_vertices.contains(&handle)
    }

    pub fn num_tris(&self) -> usize {
        self.tris.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Iterate over all live triangles.
    pub fn tris(&self) -> impl Iterator<Item = TriIterator<'_>> + '_ {
        self.tris
            .iter()
            .map(move |(handle, tri)| TriIterator::new(self, handle, tri))
    }

    /// Iterate over all live edges.
    pub fn edges(&self) -> impl Iterator<Item = EdgeIterator<'_>> + '_ {
        self.edges
            .iter()
            .map(move |(handle, edge)| EdgeIterator::new(self, handle, edge))
    }

    /// Count, for every edge, the triangles listing it.
    pub fn count_listings(&self) -> HashMap<EdgeHandle, usize> {
        let mut listings: HashMap<EdgeHandle, usize> = HashMap::with_capacity(self.edges.len());
        for (_, tri) in self.tris.iter() {
            for edge in tri.edges {
                *listings.entry(edge).or_insert(0) += 1;
            }
        }
        listings
    }

    /// Check if the data structure is sound, i.e. every reference count matches a recount and every triangle
    /// is aligned with its edges.
    pub fn is_sound(&self) -> bool {
        let mut sound = true;

        let mut check = |condition: bool, error_msg: &dyn Fn() -> String| {
            if !condition {
                log::error!("{}", error_msg());
                sound = false;
            }
        };

        let listings = self.count_listings();

        // every traversal direction of every edge, taken from the listing triangles
        let mut directions: HashMap<EdgeHandle, Vec<[VertexHandle; 2]>> = HashMap::new();
        for tri in self.tris() {
            let Ok(edges) = tri.edges() else {
                check(false, &|| format!("{tri} refers to a dead edge"));
                continue;
            };
            for (edge, [a, b]) in edges.into_iter().zip(tri.sides()) {
                check(edge.connects(a, b), &|| format!("{tri}: {edge} is not aligned"));
                check(self.listing_tris(edge.idx).contains(&tri.idx), &|| {
                    format!("{tri}: not indexed as neighbor across {edge}")
                });
                directions.entry(edge.idx).or_default().push([a, b]);
            }
        }

        for (edge, traversals) in &directions {
            match traversals.as_slice() {
                [_] => {}
                [[a, b], [c, d]] => check(a == d && b == c, &|| {
                    format!("Edge {edge}: both triangles traverse it as {a} -> {b}, they overlap")
                }),
                _ => check(false, &|| {
                    format!("Edge {edge}: listed by {} triangles", traversals.len())
                }),
            }
        }

        let mut incident: HashMap<VertexHandle, usize> = HashMap::new();
        for edge in self.edges() {
            let listed = listings.get(&edge.idx).copied().unwrap_or(0);
            let expected = listed + usize::from(edge.is_frame());
            check(edge.ref_count() == expected, &|| {
                format!("{edge}: expected reference count {expected}")
            });
            check(self.find_edge(edge.starting_node(), edge.end_node()) == Some(edge.idx), &|| {
                format!("{edge}: not indexed")
            });

            for v in edge.nodes() {
                *incident.entry(v).or_insert(0) += 1;
            }
        }
        check(
            self.adjacency
                .iter()
                .all(|(edge, tris)| listings.get(edge).copied().unwrap_or(0) == tris.len()),
            &|| "Neighbor index is out of date".to_string(),
        );
        check(self.edge_index.len() == self.edges.len(), &|| {
            format!(
                "Edge index holds {} entries for {} edges",
                self.edge_index.len(),
                self.edges.len()
            )
        });

        for (handle, vertex) in self.vertices.iter() {
            let expected = incident.get(&handle).copied().unwrap_or(0);
            check(vertex.ref_count == expected, &|| {
                format!(
                    "Vertex {handle}: reference count {}, but {expected} incident edges",
                    vertex.ref_count
                )
            });
        }

        for &handle in &self.frame_edges {
            check(self.edges.contains(handle), &|| {
                format!("Frame edge {handle} is dead")
            });
        }

        sound
    }
}

/// Edges are undirected, the key orders the two vertices.
const fn edge_key(a: VertexHandle, b: VertexHandle) -> (VertexHandle, VertexHandle) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Bitwise key of a position, `-0.0` and `0.0` fall together.
fn position_key(p: &Point2) -> (u32, u32) {
    ((p[0] + 0.0).to_bits(), (p[1] + 0.0).to_bits())
}
