//! # deltri
//!
//! Incremental 2D Delaunay triangulation inside a retractable bounding frame, with mesh extraction.
//!
//! ```
//! use deltri::{Layer, Rect, ScalarField, Triangulation};
//!
//! let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
//! let mut triangulation = Triangulation::from_rect(rect, 100).unwrap();
//! assert!(triangulation.is_sound().unwrap());
//!
//! triangulation.retract_frame().unwrap();
//!
//! let fields = [ScalarField::new(1.0, |uv| uv[0])];
//! let layers = [Layer::new([0.2, 0.6, 0.2, 1.0], 0.5).with_range(0, 0.5, 1.0)];
//! if let Some(mesh) = triangulation.extract_classified_mesh(true, rect, &layers, &fields) {
//!     assert_eq!(mesh.compute_normals().len(), mesh.num_vertices());
//! }
//! ```
#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::missing_const_for_fn)]

pub use circumcircle::Circle;
pub use classification::{Classification, Classifier, FieldRange, Layer, ScalarField, DEFAULT_COLOR};
pub use error::{PoolError, TriangulationError};
pub use mesh::Mesh;
pub use pool::Pool;
pub use triangulation::{Triangulation, DELAUNAY_TOLERANCE};
pub use trids::tri_data_structure::Vertex;
pub use utils::types::{
    Color, EdgeHandle, Point2, Point3, Rect, TriHandle, Triangle2, VertexHandle,
};

pub mod circumcircle;
pub mod classification;
pub mod error;
pub mod mesh;
pub mod pool;
mod predicates;
pub mod triangulation;
pub mod trids;
mod utils;
