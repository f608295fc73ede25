use thiserror::Error;

use crate::utils::types::Rect;

/// Errors of a [Pool](crate::pool::Pool).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// The handle was removed or never allocated.
    #[error("handle {handle} does not refer to a live entry")]
    NotFound { handle: usize },
}

/// Errors of a [Triangulation](crate::Triangulation).
///
/// The triangulation API returns [anyhow::Result], these can be recovered via `downcast_ref`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TriangulationError {
    /// A handle into one of the graph pools is dead, i.e. the caller's handle bookkeeping is off.
    #[error("no {kind} with handle {handle}")]
    NotFound { kind: &'static str, handle: usize },
    /// The frame corners can not be split into two proper triangles.
    #[error("frame corners are degenerate: {0}")]
    DegenerateFrame(String),
    /// A frame can only be seeded into a triangulation without triangles.
    #[error("the triangulation already has a frame")]
    FrameExists,
    /// Points with a `NaN` or infinite coordinate can not be triangulated.
    #[error("point {0:?} is not finite")]
    NonFinitePoint([f32; 2]),
    /// No random point strictly inside the rectangle was found, it is too thin to hold one.
    #[error("no point strictly inside {rect:?} after {attempts} attempts")]
    NoInteriorPoint { rect: Rect, attempts: usize },
}

impl TriangulationError {
    pub(crate) const fn not_found(kind: &'static str, err: PoolError) -> Self {
        match err {
            PoolError::NotFound { handle } => Self::NotFound { kind, handle },
        }
    }
}
