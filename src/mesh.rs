use std::collections::HashMap;

use nalgebra::Vector3;

use crate::{
    classification::{Classifier, Layer, ScalarField},
    triangulation::Triangulation,
    utils::types::{Color, Point2, Point3, Rect, VertexHandle},
};

/// Renderable triangle geometry.
///
/// Planar positions `(x, y)` are lifted to `(x, height, y)`, so the triangles face `+y`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Point3>,
    pub colors: Option<Vec<Color>>,
    /// Three indices into `positions` per triangle.
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn num_tris(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Iterate over the corner positions of every triangle.
    pub fn triangles(&self) -> impl Iterator<Item = [Point3; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|t| [0, 1, 2].map(|i| self.positions[t[i] as usize]))
    }

    /// Unit normals, one per position.
    ///
    /// Face normals are summed unnormalized into their corners, which weights them by area. On a flat mesh every
    /// position belongs to a single triangle and gets its face normal. Positions without area fall back to `+y`.
    pub fn compute_normals(&self) -> Vec<Point3> {
        let mut normals = vec![Vector3::<f32>::zeros(); self.positions.len()];

        for t in self.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|i| Vector3::from(self.positions[t[i] as usize]));
            let face = (b - a).cross(&(c - a));
            for &i in t {
                normals[i as usize] += face;
            }
        }

        normals
            .into_iter()
            .map(|n| {
                n.try_normalize(f32::EPSILON)
                    .unwrap_or_else(Vector3::y)
                    .into()
            })
            .collect()
    }
}

/// The lifted position and optional colour of a vertex.
type Shaded = (Point3, Option<Color>);

impl Triangulation {
    /// Extract the triangles as a mesh, lifting every vertex by `height_fn`.
    ///
    /// A `flat` mesh gets three own positions per triangle, otherwise triangles share their vertices.
    /// Returns `None` if there is no triangle to draw.
    pub fn extract_mesh<F>(&self, flat: bool, mut height_fn: F) -> Option<Mesh>
    where
        F: FnMut(Point2) -> f32,
    {
        self.build_mesh(flat, |p| ([p[0], height_fn(p), p[1]], None))
    }

    /// Extract the triangles as a coloured mesh, lifting and painting every vertex by the `layers` that match
    /// the `fields` sampled at its position within `reference`.
    ///
    /// Flat triangles are painted in the colour of their highest corner.
    pub fn extract_classified_mesh(
        &self,
        flat: bool,
        reference: Rect,
        layers: &[Layer],
        fields: &[ScalarField],
    ) -> Option<Mesh> {
        let classifier = Classifier::new(reference, layers, fields);
        self.build_mesh(flat, |p| {
            let c = classifier.classify(p);
            ([p[0], c.height, p[1]], Some(c.color))
        })
    }

    fn build_mesh<F>(&self, flat: bool, mut shade: F) -> Option<Mesh>
    where
        F: FnMut(Point2) -> Shaded,
    {
        // isolated vertices have no triangle to be part of
        let mut lookup: HashMap<VertexHandle, u32> = HashMap::new();
        let mut shaded: Vec<Shaded> = Vec::new();
        for (handle, vertex) in self.vertices().filter(|(_, v)| v.ref_count > 0) {
            lookup.insert(handle, shaded.len() as u32);
            shaded.push(shade(vertex.position));
        }
        let colored = shaded.iter().any(|(_, color)| color.is_some());

        let mut mesh = Mesh::default();
        let mut colors = Vec::new();

        if !flat {
            for (position, color) in &shaded {
                mesh.positions.push(*position);
                colors.extend(*color);
            }
        }

        for tri in self.tris() {
            let Some(corners) = tri
                .nodes()
                .iter()
                .map(|v| lookup.get(v).copied())
                .collect::<Option<Vec<u32>>>()
            else {
                log::error!("{} has an unreferenced corner, skipping it", tri);
                continue;
            };

            let [a, b, c] = [0, 1, 2].map(|i| shaded[corners[i] as usize].0);
            if a == b || b == c || c == a {
                continue;
            }

            if flat {
                let highest = corners
                    .iter()
                    .copied()
                    .reduce(|h, i| {
                        if shaded[i as usize].0[1] > shaded[h as usize].0[1] {
                            i
                        } else {
                            h
                        }
                    })
                    .unwrap_or(corners[0]);

                for &i in &corners {
                    mesh.indices.push(mesh.positions.len() as u32);
                    mesh.positions.push(shaded[i as usize].0);
                    colors.extend(shaded[highest as usize].1);
                }
            } else {
                mesh.indices.extend(corners);
            }
        }

        if mesh.indices.is_empty() {
            return None;
        }

        if colored {
            mesh.colors = Some(colors);
        }

        Some(mesh)
    }
}
