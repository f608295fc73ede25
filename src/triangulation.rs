use std::collections::{BTreeSet, HashMap};

use crate::{
    error::TriangulationError,
    predicates::{double_area, orient_2d},
    trids::{
        edge_iterator::EdgeIterator,
        tri_data_structure::{TriDataStructure, Vertex},
        tri_iterator::TriIterator,
    },
    utils::types::{EdgeHandle, Point2, Rect, TriHandle, VertexHandle},
};
use anyhow::{anyhow, Result};
use log::error;
use rand::Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

/// Relative shrink of the squared circumradius when validating the empty circle property.
///
/// Cocircular points, e.g. the corners of the initial frame, would otherwise count as violations.
pub const DELAUNAY_TOLERANCE: f32 = 1e-4;

/// Relative deviation allowed between the area of all triangles and the area enclosed by the frame.
const AREA_TOLERANCE: f64 = 1e-9;

/// Random draws per requested seed point before [Triangulation::from_rect] gives up.
const SAMPLING_ATTEMPTS: usize = 64;

/// One step towards a cavity that `p` sees completely from the inside.
enum Repair {
    /// Take the triangle across an outline edge `p` does not see into the cavity.
    Grow(TriHandle),
    /// Give up the triangle owning such an edge.
    Shrink(TriHandle),
}

/// An incremental 2D Delaunay triangulation inside a retractable frame.
///
/// The frame is a synthetic quad, split into two triangles, that all inserted points have to lie in.
/// Each insertion removes the connected triangles whose circumcircle contains the new point, starting from the
/// triangle the point lies in, and fans the hole out from it.
///
/// ```
/// use deltri::{Rect, Triangulation};
///
/// let mut triangulation = Triangulation::from_rect(Rect::new(0.0, 0.0, 10.0, 10.0), 0).unwrap();
/// assert_eq!(triangulation.num_tris(), 2);
///
/// let center = triangulation.insert_vertex([5.0, 5.0]).unwrap();
/// assert_eq!(triangulation.get_position(center), Some([5.0, 5.0]));
/// assert_eq!(triangulation.num_tris(), 4);
///
/// triangulation.retract_frame().unwrap(); // every triangle touches a frame corner
/// assert_eq!(triangulation.num_tris(), 0);
/// assert!(triangulation.extract_mesh(false, |_| 0.0).is_none());
/// ```
#[derive(Debug, Default)]
pub struct Triangulation {
    pub tds: TriDataStructure,
    time_scanning: u128,
    time_rebuilding: u128,
}

impl Triangulation {
    /// A triangulation without frame, inserted points are only collected until [Self::seed_frame] is called.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a triangulation seeded with the frame `corners`, given in order around the quad.
    pub fn new(corners: [Point2; 4]) -> Result<Self> {
        let mut triangulation = Self::empty();
        triangulation.seed_frame(corners)?;
        Ok(triangulation)
    }

    /// Create a triangulation framed by `rect` and insert `seed_points` random points inside it.
    pub fn from_rect(rect: Rect, seed_points: usize) -> Result<Self> {
        Self::from_rect_with_rng(rect, seed_points, &mut rand::rng())
    }

    /// Like [Self::from_rect], drawing the seed points from `rng`.
    pub fn from_rect_with_rng<R: Rng + ?Sized>(
        rect: Rect,
        seed_points: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let mut triangulation = Self::new(rect.corners())?;

        let [x0, y0] = rect.min();
        let [x1, y1] = rect.max();
        let (x_min, x_max) = (x0.min(x1), x0.max(x1));
        let (y_min, y_max) = (y0.min(y1), y0.max(y1));

        let max_attempts = seed_points.saturating_mul(SAMPLING_ATTEMPTS);
        let mut attempts = 0;
        let mut inserted = 0;
        while inserted < seed_points {
            if attempts == max_attempts {
                return Err(TriangulationError::NoInteriorPoint { rect, attempts }.into());
            }
            attempts += 1;

            let p = [rng.random_range(x_min..x_max), rng.random_range(y_min..y_max)];

            // the lower bound is inclusive, skip points on the frame
            if p[0] == x_min || p[1] == y_min {
                continue;
            }

            triangulation.insert_vertex(p)?;
            inserted += 1;
        }

        log::debug!("Seeded frame {:?} with {} points", rect, seed_points);

        Ok(triangulation)
    }

    /// Install a frame into a triangulation without triangles and triangulate all points collected so far.
    ///
    /// Collected points outside the bounding box of the frame stay untriangulated.
    pub fn seed_frame(&mut self, corners: [Point2; 4]) -> Result<()> {
        if self.tds.num_tris() > 0 || !self.tds.frame_edges.is_empty() {
            return Err(TriangulationError::FrameExists.into());
        }

        if let Some(corner) = corners.iter().find(|c| !is_finite(c)) {
            return Err(TriangulationError::NonFinitePoint(*corner).into());
        }

        // the diagonal 0-2 has to separate corner 1 from corner 3
        let o1 = orient_2d(&corners[0], &corners[1], &corners[2]);
        let o2 = orient_2d(&corners[0], &corners[2], &corners[3]);
        if o1 == 0.0 || o2 == 0.0 || o1.signum() != o2.signum() {
            return Err(TriangulationError::DegenerateFrame(format!("{corners:?}")).into());
        }

        let collected: Vec<VertexHandle> = self
            .tds
            .vertices
            .iter()
            .filter(|(_, vertex)| vertex.ref_count == 0)
            .map(|(handle, _)| handle)
            .collect();

        let mut v = [0; 4];
        for (handle, corner) in v.iter_mut().zip(corners) {
            *handle = match self.tds.find_vertex(&corner) {
                Some(existing) => existing,
                None => self.tds.add_vertex(corner),
            };
        }

        for i in 0..4 {
            self.tds.add_frame_edge(v[i], v[(i + 1) % 4])?;
        }

        let nodes = self.wind(v[0], v[1], v[2])?;
        self.tds.add_tri(nodes)?;
        let nodes = self.wind(v[0], v[2], v[3])?;
        self.tds.add_tri(nodes)?;

        let (min, max) = bounds(&corners);
        for p in collected {
            if v.contains(&p) {
                continue;
            }

            let position = self.tds.position(p)?;
            if !in_bounds(&position, &min, &max) {
                log::warn!("Collected vertex {p} at {position:?} lies outside the frame, skipping it");
                continue;
            }
            self.triangulate_vertex(p)?;
        }

        Ok(())
    }

    /// Insert a point into the triangulation and retrieve its vertex handle.
    ///
    /// A point that already exists is not inserted twice, its vertex is returned instead.
    /// Without a frame the point is only collected, and a point no triangle covers stays isolated.
    /// A point on the outline splits the frame edge it lies on.
    pub fn insert_vertex(&mut self, point: Point2) -> Result<VertexHandle> {
        if !is_finite(&point) {
            return Err(TriangulationError::NonFinitePoint(point).into());
        }

        if let Some(existing) = self.tds.find_vertex(&point) {
            log::debug!("Point {point:?} already is vertex {existing}");
            return Ok(existing);
        }

        let p = self.tds.add_vertex(point);

        if self.tds.num_tris() == 0 {
            return Ok(p);
        }

        if let Some((min, max)) = self.frame_bounds() {
            if !in_bounds(&point, &min, &max) {
                log::warn!("Point {point:?} lies outside the frame bounds {min:?} - {max:?}");
            }
        }

        self.triangulate_vertex(p)?;

        Ok(p)
    }

    /// Insert a set of points, in order, and retrieve their vertex handles.
    pub fn insert_vertices(&mut self, points: &[Point2]) -> Result<Vec<VertexHandle>> {
        log::debug!("Inserting {} vertices", points.len());

        let handles = points
            .iter()
            .map(|p| self.insert_vertex(*p))
            .collect::<Result<Vec<_>>>()?;

        self.log_time();

        Ok(handles)
    }

    /// Replace the triangles whose circumcircle contains the vertex `p` by a fan around `p`.
    fn triangulate_vertex(&mut self, p: VertexHandle) -> Result<()> {
        let point = self.tds.position(p)?;

        let now = std::time::Instant::now();
        let cavity = match self.locate(&point)? {
            Some(start) => self.cavity(&point, start)?,
            None => None,
        };
        self.time_scanning += now.elapsed().as_micros();

        let Some((cavity, on_outline)) = cavity else {
            log::warn!("No triangle takes vertex {p} at {point:?}, it stays isolated");
            return Ok(());
        };

        let now = std::time::Instant::now();
        let mut boundary = BTreeSet::new();
        for &tri in &cavity {
            self.tds.delete_tri(tri, &mut boundary)?;
        }

        let mut num_fanned = 0;
        for edge in boundary {
            if on_outline.contains(&edge) && self.tds.is_frame_edge(edge) {
                self.tds.split_frame_edge(edge, p)?;
                log::debug!("Vertex {p} at {point:?} splits frame edge {edge}");
                continue;
            }

            let [s, e] = self.tds.get_edge(edge)?.nodes();
            let nodes = self.wind(s, e, p)?;
            self.tds.add_tri(nodes)?;
            num_fanned += 1;
        }
        self.time_rebuilding += now.elapsed().as_micros();

        log::trace!(
            "Vertex {p}: replaced {} triangles by {}",
            cavity.len(),
            num_fanned
        );

        Ok(())
    }

    /// Find a proper triangle that contains `point`, inside or on one of its sides.
    fn locate(&self, point: &Point2) -> Result<Option<TriHandle>> {
        for tri in self.tds.tris() {
            let [a, b, c] = tri.points()?;
            if orient_2d(&a, &b, &c) == 0.0 {
                continue;
            }

            // all triangles turn clockwise, their inside lies right of every side
            if orient_2d(&a, &b, point) <= 0.0
                && orient_2d(&b, &c, point) <= 0.0
                && orient_2d(&c, &a, point) <= 0.0
            {
                return Ok(Some(tri.idx()));
            }
        }

        Ok(None)
    }

    /// The triangles to replace when inserting `point`, and the outline edges `point` lies on.
    ///
    /// Starting from the triangle `start` that contains `point`, the cavity spreads across edges into every
    /// triangle whose circumcircle contains `point`. Rounding can leave an outline edge of that cavity which
    /// `point` does not see strictly from the inside; a fan over it would fold. Such an edge is repaired by
    /// taking in the triangle across it, or, if there is none to take, by giving up the triangle owning it.
    /// Edges of the frame `point` lies on are kept and reported, they get split instead of fanned.
    ///
    /// Returns `None` if the cavity can not be repaired without giving up `start`.
    fn cavity(
        &self,
        point: &Point2,
        start: TriHandle,
    ) -> Result<Option<(BTreeSet<TriHandle>, BTreeSet<EdgeHandle>)>> {
        let mut cavity = self.spread(start, |tri| tri.circle().contains(point))?;
        let mut rejected = BTreeSet::new();
        let mut on_outline = BTreeSet::new();

        loop {
            on_outline.clear();
            let mut repair = None;

            'scan: for &handle in &cavity {
                let tri = self.tds.get_tri(handle)?;
                for (edge, [u, v]) in tri.tri.edges.into_iter().zip(tri.sides()) {
                    let neighbor = self.tds.neighbor(handle, edge);
                    if neighbor.is_some_and(|n| cavity.contains(&n)) {
                        continue;
                    }

                    let a = self.tds.position(u)?;
                    let b = self.tds.position(v)?;
                    let side = orient_2d(&a, &b, point);
                    if side < 0.0 {
                        continue;
                    }
                    if side == 0.0 && neighbor.is_none() && on_segment(point, &a, &b) {
                        on_outline.insert(edge);
                        continue;
                    }

                    repair = Some(match neighbor {
                        Some(n) if !rejected.contains(&n) => Repair::Grow(n),
                        _ => Repair::Shrink(handle),
                    });
                    break 'scan;
                }
            }

            match repair {
                None => break,
                Some(Repair::Grow(n)) => {
                    cavity.insert(n);
                }
                Some(Repair::Shrink(handle)) if handle == start => {
                    log::warn!("Cavity around {point:?} can not be repaired without giving up triangle {handle}");
                    return Ok(None);
                }
                Some(Repair::Shrink(handle)) => {
                    rejected.insert(handle);
                    cavity.remove(&handle);
                    // whatever got cut off from the start goes as well
                    let connected = self.spread(start, |tri| cavity.contains(&tri.idx()))?;
                    cavity = connected;
                }
            }
        }

        Ok(Some((cavity, on_outline)))
    }

    /// Collect the triangles reachable from `start` across edges, entering only those `accept` holds for.
    fn spread<F>(&self, start: TriHandle, mut accept: F) -> Result<BTreeSet<TriHandle>>
    where
        F: FnMut(&TriIterator) -> bool,
    {
        let mut reached = BTreeSet::from([start]);
        let mut stack = vec![start];

        while let Some(handle) = stack.pop() {
            for edge in self.tds.get_tri(handle)?.tri.edges {
                let Some(next) = self.tds.neighbor(handle, edge) else {
                    continue;
                };
                if !reached.contains(&next) && accept(&self.tds.get_tri(next)?) {
                    reached.insert(next);
                    stack.push(next);
                }
            }
        }

        Ok(reached)
    }

    /// Order the edge `s`-`e` and the point `p` such that all triangles share one winding.
    ///
    /// Positive `(p - s) x (e - s)` gives `s, e, p`, otherwise `s, p, e`.
    fn wind(
        &self,
        s: VertexHandle,
        e: VertexHandle,
        p: VertexHandle,
    ) -> Result<[VertexHandle; 3]> {
        let ps = self.tds.position(s)?;
        let pe = self.tds.position(e)?;
        let pp = self.tds.position(p)?;

        if orient_2d(&ps, &pp, &pe) > 0.0 {
            Ok([s, e, p])
        } else {
            Ok([s, p, e])
        }
    }

    /// Remove every triangle touching a frame vertex and turn the outline of the rest into the new frame.
    ///
    /// Returns the number of removed triangles.
    pub fn retract_frame(&mut self) -> Result<usize> {
        let doomed: Vec<TriHandle> = self
            .tds
            .tris()
            .filter(|tri| tri.nodes().iter().any(|&v| self.tds.is_frame_vertex(v)))
            .map(|tri| tri.idx())
            .collect();

        self.retract(doomed)
    }

    /// Like [Self::retract_frame], but `touches_frame` decides which triangles go, given their three corners.
    pub fn retract_frame_with<F>(&mut self, mut touches_frame: F) -> Result<usize>
    where
        F: FnMut(&Vertex, &Vertex, &Vertex) -> bool,
    {
        let mut doomed = Vec::new();
        for tri in self.tds.tris() {
            let [x, y, z] = tri.nodes();
            if touches_frame(
                self.tds.get_vertex(x)?,
                self.tds.get_vertex(y)?,
                self.tds.get_vertex(z)?,
            ) {
                doomed.push(tri.idx());
            }
        }

        self.retract(doomed)
    }

    fn retract(&mut self, doomed: Vec<TriHandle>) -> Result<usize> {
        let now = std::time::Instant::now();

        let mut boundary = BTreeSet::new();
        for &tri in &doomed {
            self.tds.delete_tri(tri, &mut boundary)?;
        }

        // old frame edges that still bound a triangle stay part of the outline
        let surviving = self.tds.clear_frame()?;

        let outline: BTreeSet<EdgeHandle> = boundary
            .into_iter()
            .chain(surviving)
            .filter(|&edge| self.tds.edges.contains(edge))
            .collect();

        for &edge in &outline {
            self.tds.mark_frame_edge(edge)?;
        }

        log::debug!(
            "Frame retracted in {} μs: removed {} triangles, {} frame edges and {} frame vertices remain",
            now.elapsed().as_micros(),
            doomed.len(),
            self.tds.frame_edges.len(),
            self.tds.frame_vertices.len()
        );

        Ok(doomed.len())
    }

    /// Get the position of a vertex, `None` for an unknown handle.
    pub fn get_position(&self, handle: VertexHandle) -> Option<Point2> {
        self.tds.vertices.get(handle).ok().map(|vertex| vertex.position)
    }

    pub fn get_vertex(&self, handle: VertexHandle) -> Result<&Vertex> {
        self.tds.get_vertex(handle)
    }

    /// Find the vertex at exactly `point`.
    pub fn find_vertex(&self, point: &Point2) -> Option<VertexHandle> {
        self.tds.find_vertex(point)
    }

    pub fn get_tri(&self, handle: TriHandle) -> Result<TriIterator> {
        self.tds.get_tri(handle)
    }

    /// The edge between two vertices, if there is one.
    pub fn edge_between(&self, a: VertexHandle, b: VertexHandle) -> Option<EdgeIterator> {
        let handle = self.tds.find_edge(a, b)?;
        self.tds.get_edge(handle).ok()
    }

    /// Iterate over all vertices, including isolated ones.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexHandle, &Vertex)> + '_ {
        self.tds.vertices.iter()
    }

    pub fn tris(&self) -> impl Iterator<Item = TriIterator<'_>> + '_ {
        self.tds.tris()
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeIterator<'_>> + '_ {
        self.tds.edges()
    }

    pub const fn frame_vertices(&self) -> &BTreeSet<VertexHandle> {
        &self.tds.frame_vertices
    }

    pub const fn frame_edges(&self) -> &BTreeSet<EdgeHandle> {
        &self.tds.frame_edges
    }

    pub fn num_tris(&self) -> usize {
        self.tds.num_tris()
    }

    pub fn num_edges(&self) -> usize {
        self.tds.num_edges()
    }

    pub fn num_vertices(&self) -> usize {
        self.tds.num_vertices()
    }

    /// The number of vertices that are part of at least one edge.
    pub fn num_used_vertices(&self) -> usize {
        self.vertices()
            .filter(|(_, vertex)| vertex.ref_count > 0)
            .count()
    }

    pub const fn tds(&self) -> &TriDataStructure {
        &self.tds
    }

    pub fn tds_mut(&mut self) -> &mut TriDataStructure {
        &mut self.tds
    }

    /// The bounding box of the frame vertices.
    pub fn frame_bounds(&self) -> Option<(Point2, Point2)> {
        let positions: Vec<Point2> = self
            .tds
            .frame_vertices
            .iter()
            .filter_map(|&v| self.get_position(v))
            .collect();

        if positions.is_empty() {
            None
        } else {
            Some(bounds(&positions))
        }
    }

    /// Check if the triangulation is Delaunay w.r.t. the empty circumcircle property.
    ///
    /// Returns if the validation is valid and to what degree.
    pub fn is_delaunay(&self) -> Result<(bool, f64)> {
        let used = self.used_positions();
        let mut num_violated_tris = 0;

        for tri in self.tds.tris() {
            if tri.is_flat()? {
                error!("Flat triangle: {}", tri);
                num_violated_tris += 1;
                continue;
            }

            if let Some((v, _)) = find_violation(&tri, &used) {
                error!("Vertex {} in circumcircle of {} ({})", v, tri, tri.circle());
                num_violated_tris += 1;
            }
        }

        Ok((
            num_violated_tris == 0,
            self.degree(num_violated_tris as f64),
        ))
    }

    /// Checks the Delaunay property in a parallel manner using `rayon`s `into_par_iter()`.
    ///
    /// This can significantly reduce the runtime of this predicate.
    #[must_use]
    pub fn is_delaunay_p(&self) -> f64 {
        let used = self.used_positions();
        let handles = self.tds.tris.handles();

        let num_violated_tris: f64 = handles
            .into_par_iter()
            .map(|handle| match self.tds.get_tri(handle) {
                Ok(tri) if tri.is_flat().unwrap_or(true) => 1.0,
                Ok(tri) => match find_violation(&tri, &used) {
                    Some(_) => 1.0,
                    None => 0.0,
                },
                Err(_) => 1.0,
            })
            .sum();

        self.degree(num_violated_tris)
    }

    /// Check the topology: reference counts, edge alignment, frame sets, the shared winding of all triangles,
    /// and that the triangles cover the area inside the frame exactly once.
    pub fn is_sound(&self) -> Result<bool> {
        let mut sound = self.tds().is_sound();

        for tri in self.tds.tris() {
            match tri.orientation() {
                Ok(o) if o < 0.0 => {}
                Ok(o) if o == 0.0 => {
                    error!("{} is flat", tri);
                    sound = false;
                }
                Ok(_) => {
                    error!("{} is wound the wrong way", tri);
                    sound = false;
                }
                Err(e) => {
                    error!("{}: {}", tri, e);
                    sound = false;
                }
            }
        }

        if sound {
            match self.frame_double_area() {
                Ok((framed, scale)) => {
                    let covered: f64 = self
                        .tds
                        .tris()
                        .map(|tri| tri.double_area())
                        .sum::<Result<f64>>()?;
                    let tolerance = AREA_TOLERANCE * scale.max(covered.abs());
                    if (covered - framed).abs() > tolerance {
                        error!(
                            "Triangles cover an area of {}, but the frame encloses {}, they overlap",
                            covered.abs() / 2.0,
                            framed.abs() / 2.0
                        );
                        sound = false;
                    }
                }
                Err(e) => {
                    error!("Frame does not bound the triangles: {}", e);
                    sound = false;
                }
            }
        }

        let mut frame_vertices = BTreeSet::new();
        for &edge in &self.tds.frame_edges {
            frame_vertices.extend(self.tds.get_edge(edge)?.nodes());
        }
        if frame_vertices != self.tds.frame_vertices {
            error!(
                "Frame vertices {:?} do not match the frame edges, expected {:?}",
                self.tds.frame_vertices, frame_vertices
            );
            sound = false;
        }

        if !sound {
            error!("Triangulation is not sound!");
        }

        Ok(sound)
    }

    /// The total area of all triangles.
    pub fn area(&self) -> f64 {
        self.tds
            .tris()
            .filter_map(|tri| tri.double_area().ok())
            .map(f64::abs)
            .sum::<f64>()
            / 2.0
    }

    /// Twice the signed area enclosed by the frame, with the sum of the absolute terms it was summed from.
    ///
    /// Each frame edge is traversed the way its one triangle traverses it, the terms are taken around the
    /// first frame vertex to keep them small.
    fn frame_double_area(&self) -> Result<(f64, f64)> {
        let Some(&first) = self.tds.frame_vertices.first() else {
            return Ok((0.0, 0.0));
        };
        let origin = self.tds.position(first)?;

        let mut area = 0.0;
        let mut scale = 0.0;
        for &edge in &self.tds.frame_edges {
            let &[handle] = self.tds.listing_tris(edge) else {
                return Err(anyhow!(
                    "frame edge {} is listed by {} triangles",
                    edge,
                    self.tds.listing_tris(edge).len()
                ));
            };
            let tri = self.tds.get_tri(handle)?;
            let side = tri
                .tri
                .edges
                .iter()
                .position(|&e| e == edge)
                .ok_or_else(|| anyhow!("{} does not list frame edge {}", tri, edge))?;
            let [u, v] = tri.sides()[side];

            let term = double_area(&origin, &self.tds.position(u)?, &self.tds.position(v)?);
            area += term;
            scale += term.abs();
        }

        Ok((area, scale))
    }

    /// The closed outlines of the triangulation, as vertex loops.
    ///
    /// An outline edge is listed by exactly one triangle. Returns `None` if the outline edges do not form
    /// closed polygons, i.e. some outline vertex does not have exactly two outline edges.
    pub fn boundary_loops(&self) -> Option<Vec<Vec<VertexHandle>>> {
        let listings = self.tds.count_listings();

        let mut neighbors: HashMap<VertexHandle, Vec<VertexHandle>> = HashMap::new();
        for edge in self.tds.edges() {
            if listings.get(&edge.idx).copied() == Some(1) {
                let [a, b] = edge.nodes();
                neighbors.entry(a).or_default().push(b);
                neighbors.entry(b).or_default().push(a);
            }
        }

        if let Some((v, n)) = neighbors.iter().find(|(_, n)| n.len() != 2) {
            error!("Outline vertex {} has {} outline edges", v, n.len());
            return None;
        }

        let mut starts: Vec<VertexHandle> = neighbors.keys().copied().collect();
        starts.sort_unstable();

        let mut visited = BTreeSet::new();
        let mut loops = Vec::new();
        for start in starts {
            if !visited.insert(start) {
                continue;
            }

            let mut outline = vec![start];
            let mut prev = start;
            let mut current = neighbors[&start][0];
            while current != start {
                visited.insert(current);
                outline.push(current);

                let next = neighbors[&current]
                    .iter()
                    .copied()
                    .find(|&n| n != prev)
                    .unwrap_or(prev);
                prev = current;
                current = next;
            }
            loops.push(outline);
        }

        Some(loops)
    }

    /// Check if the outline edges form closed polygons.
    pub fn is_boundary_closed(&self) -> bool {
        self.boundary_loops().is_some()
    }

    fn used_positions(&self) -> Vec<(VertexHandle, Point2)> {
        self.vertices()
            .filter(|(_, vertex)| vertex.ref_count > 0)
            .map(|(handle, vertex)| (handle, vertex.position))
            .collect()
    }

    fn degree(&self, num_violated_tris: f64) -> f64 {
        match self.num_tris() {
            0 => 1.0,
            n => 1.0 - num_violated_tris / n as f64,
        }
    }

    fn log_time(&self) {
        log::debug!("-------------------------------------------");
        log::debug!("Time elapsed:");
        log::debug!("Cavity scans computed in {} μs", self.time_scanning);
        log::debug!("Rebuilds computed in {} μs", self.time_rebuilding);
    }
}

fn find_violation<'a>(
    tri: &TriIterator,
    used: &'a [(VertexHandle, Point2)],
) -> Option<&'a (VertexHandle, Point2)> {
    used.iter().find(|(v, p)| {
        !tri.contains_node(*v) && tri.circle().contains_strictly(p, DELAUNAY_TOLERANCE)
    })
}

fn is_finite(p: &Point2) -> bool {
    p[0].is_finite() && p[1].is_finite()
}

fn bounds(points: &[Point2]) -> (Point2, Point2) {
    let mut min = [f32::INFINITY; 2];
    let mut max = [f32::NEG_INFINITY; 2];
    for p in points {
        for i in 0..2 {
            min[i] = min[i].min(p[i]);
            max[i] = max[i].max(p[i]);
        }
    }
    (min, max)
}

fn in_bounds(p: &Point2, min: &Point2, max: &Point2) -> bool {
    p[0] >= min[0] && p[0] <= max[0] && p[1] >= min[1] && p[1] <= max[1]
}

/// Check if `p`, aligned with `a` and `b`, lies between them.
fn on_segment(p: &Point2, a: &Point2, b: &Point2) -> bool {
    let (min, max) = bounds(&[*a, *b]);
    in_bounds(p, &min, &max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use deltri_test_utils::{sample_clustered_points_2d, sample_points_2d, sample_points_2d_seeded};
    use rand::{rngs::StdRng, SeedableRng};
    use std::f32::consts::TAU;

    const SQUARE: [Point2; 4] = [[0.0, 0.0], [0.0, 10.0], [10.0, 10.0], [10.0, 0.0]];

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn verify_triangulation(triangulation: &Triangulation) {
        let delaunay = triangulation.is_delaunay_p();
        let sound = triangulation.is_sound().unwrap();
        assert_eq!(delaunay, 1.0);
        assert!(sound);
    }

    /// Every triangle is proper and together they tile the square once.
    fn verify_square_tiling(triangulation: &Triangulation) {
        verify_triangulation(triangulation);
        assert_relative_eq!(triangulation.area(), 100.0, max_relative = 1e-9);
        for tri in triangulation.tris() {
            assert!(!tri.is_flat().unwrap(), "{tri} is flat");
        }
        assert!(triangulation.is_boundary_closed());
    }

    /// `n` points on the circle of radius `r` around `center`.
    fn circle_points(n: usize, center: Point2, r: f32) -> Vec<Point2> {
        (0..n)
            .map(|i| {
                let angle = TAU * i as f32 / n as f32;
                [center[0] + r * angle.cos(), center[1] + r * angle.sin()]
            })
            .collect()
    }

    /// The number of triangles and edges of a triangulated convex polygon with `h` hull and `n` inner vertices.
    const fn expected_counts(h: usize, n: usize) -> (usize, usize) {
        (2 * n + h - 2, 3 * n + 2 * h - 3)
    }

    const NUM_VERTICES_LIST: [usize; 6] = [1, 3, 10, 50, 100, 300];

    #[test]
    fn test_square_frame() {
        let triangulation = Triangulation::new(SQUARE).unwrap();

        assert_eq!(triangulation.num_tris(), 2);
        assert_eq!(triangulation.num_edges(), 5);
        assert_eq!(triangulation.frame_edges().len(), 4);
        assert_eq!(triangulation.frame_vertices().len(), 4);

        // frame edges carry the frame marker on top of their one triangle
        for edge in triangulation.edges() {
            assert_eq!(edge.ref_count(), 2);
        }

        verify_triangulation(&triangulation);
        assert_eq!(triangulation.boundary_loops().unwrap().len(), 1);
    }

    #[test]
    fn test_single_insertion() {
        let mut triangulation = Triangulation::new(SQUARE).unwrap();
        let [c0, _, c2, _] = SQUARE.map(|c| triangulation.find_vertex(&c).unwrap());
        assert!(triangulation.edge_between(c0, c2).is_some());

        // strictly inside the triangle (0,0), (0,10), (10,10)
        let p = triangulation.insert_vertex([2.0, 7.0]).unwrap();

        assert_eq!(triangulation.num_tris(), 4);
        assert_eq!(triangulation.num_edges(), 8);
        assert_eq!(triangulation.get_vertex(p).unwrap().ref_count, 4);

        // both seed triangles share the circumcircle of the square, so the diagonal was fully consumed
        assert!(triangulation.edge_between(c0, c2).is_none());
        for tri in triangulation.tris() {
            assert!(tri.contains_node(p));
        }

        verify_triangulation(&triangulation);
        let loops = triangulation.boundary_loops().unwrap();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 4);
    }

    #[test]
    fn test_retract_square() {
        let mut triangulation = Triangulation::new(SQUARE).unwrap();
        triangulation.insert_vertex([5.0, 5.0]).unwrap();
        assert_eq!(triangulation.num_tris(), 4);

        let removed = triangulation.retract_frame().unwrap();

        assert_eq!(removed, 4);
        assert_eq!(triangulation.num_tris(), 0);
        assert_eq!(triangulation.num_edges(), 0);
        assert!(triangulation.frame_edges().is_empty());
        assert!(triangulation.frame_vertices().is_empty());
        assert_eq!(triangulation.num_used_vertices(), 0);
        assert!(triangulation.is_sound().unwrap());
        assert!(triangulation.extract_mesh(false, |_| 0.0).is_none());
        assert!(triangulation.extract_mesh(true, |_| 0.0).is_none());
    }

    #[test]
    fn test_delaunay_2d() {
        init_logger();

        for (seed, n) in NUM_VERTICES_LIST.into_iter().enumerate() {
            let points = sample_points_2d_seeded(n, None, seed as u64);

            let mut triangulation = Triangulation::new(SQUARE).unwrap();
            triangulation.insert_vertices(&points).unwrap();

            verify_triangulation(&triangulation);

            let inner = triangulation.num_used_vertices() - 4;
            assert_eq!(
                (triangulation.num_tris(), triangulation.num_edges()),
                expected_counts(4, inner)
            );
            assert_eq!(triangulation.boundary_loops().unwrap().len(), 1);
        }
    }

    #[test]
    fn test_delaunay_2d_unseeded() {
        let points = sample_points_2d(100, None);

        let mut triangulation = Triangulation::new(SQUARE).unwrap();
        triangulation.insert_vertices(&points).unwrap();

        assert!(triangulation.is_sound().unwrap());
        assert!(triangulation.is_boundary_closed());
    }

    #[test]
    fn test_delaunay_2d_clustered() {
        let points = sample_clustered_points_2d(200, [5.0, 5.0], 0.5, 1.0..=9.0, 7);

        let mut triangulation = Triangulation::new(SQUARE).unwrap();
        triangulation.insert_vertices(&points).unwrap();

        verify_triangulation(&triangulation);
        let (delaunay, degree) = triangulation.is_delaunay().unwrap();
        assert!(delaunay);
        assert_eq!(degree, 1.0);
    }

    #[test]
    fn test_edge_counts_after_each_insertion() {
        let points = sample_points_2d_seeded(40, None, 11);
        let mut triangulation = Triangulation::new(SQUARE).unwrap();

        for p in points {
            triangulation.insert_vertex(p).unwrap();
            assert!(triangulation.is_sound().unwrap());
            assert!(triangulation.is_boundary_closed());
        }
    }

    #[test]
    fn test_from_rect() {
        let mut rng = StdRng::seed_from_u64(3);
        let rect = Rect::new(-5.0, 2.0, 20.0, 8.0);
        let triangulation = Triangulation::from_rect_with_rng(rect, 64, &mut rng).unwrap();

        assert_eq!(triangulation.num_vertices(), 68);
        for (_, vertex) in triangulation.vertices() {
            assert!(rect.contains(vertex.position));
        }
        verify_triangulation(&triangulation);
    }

    #[test]
    fn test_degenerate_frame() {
        let aligned = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let err = Triangulation::new(aligned).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TriangulationError>(),
            Some(TriangulationError::DegenerateFrame(_))
        ));

        // corners out of order, the diagonal 0-2 is an outer edge
        let bowtie = [[0.0, 0.0], [10.0, 10.0], [0.0, 10.0], [10.0, 0.0]];
        assert!(Triangulation::new(bowtie).is_err());

        assert!(Triangulation::from_rect(Rect::new(0.0, 0.0, 0.0, 5.0), 0).is_err());
    }

    #[test]
    fn test_counter_clockwise_corners() {
        let ccw = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];
        let mut triangulation = Triangulation::new(ccw).unwrap();
        triangulation
            .insert_vertices(&sample_points_2d_seeded(50, None, 5))
            .unwrap();

        verify_triangulation(&triangulation);
    }

    #[test]
    fn test_duplicate_and_invalid_points() {
        let mut triangulation = Triangulation::new(SQUARE).unwrap();
        let a = triangulation.insert_vertex([3.0, 4.0]).unwrap();
        let b = triangulation.insert_vertex([3.0, 4.0]).unwrap();
        assert_eq!(a, b);
        assert_eq!(triangulation.num_vertices(), 5);

        let corner = triangulation.insert_vertex([10.0, 10.0]).unwrap();
        assert!(triangulation.frame_vertices().contains(&corner));

        let err = triangulation.insert_vertex([f32::NAN, 1.0]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TriangulationError>(),
            Some(TriangulationError::NonFinitePoint(_))
        ));
        assert_eq!(triangulation.num_vertices(), 5);
        verify_triangulation(&triangulation);
    }

    #[test]
    fn test_collect_then_seed_frame() {
        let points = sample_points_2d_seeded(30, None, 13);

        let mut triangulation = Triangulation::empty();
        let handles = triangulation.insert_vertices(&points).unwrap();
        assert_eq!(triangulation.num_tris(), 0);
        assert_eq!(triangulation.get_position(handles[0]), Some(points[0]));

        let outside = triangulation.insert_vertex([42.0, 42.0]).unwrap();
        triangulation.seed_frame(SQUARE).unwrap();

        verify_triangulation(&triangulation);
        assert_eq!(triangulation.get_vertex(outside).unwrap().ref_count, 0);
        assert_eq!(triangulation.num_used_vertices(), triangulation.num_vertices() - 1);

        let err = triangulation.seed_frame(SQUARE).unwrap_err();
        assert_eq!(
            err.downcast_ref::<TriangulationError>(),
            Some(&TriangulationError::FrameExists)
        );
    }

    #[test]
    fn test_retract_random() {
        let points = sample_points_2d_seeded(200, None, 17);
        let mut triangulation = Triangulation::new(SQUARE).unwrap();
        triangulation.insert_vertices(&points).unwrap();

        let before = triangulation.num_tris();
        let removed = triangulation.retract_frame().unwrap();

        assert!(removed > 0);
        assert_eq!(triangulation.num_tris(), before - removed);
        for corner in SQUARE {
            let v = triangulation.find_vertex(&corner).unwrap();
            assert_eq!(triangulation.get_vertex(v).unwrap().ref_count, 0);
            assert!(!triangulation.frame_vertices().contains(&v));
        }
        for tri in triangulation.tris() {
            for [x, y] in tri.points().unwrap() {
                assert!(x > 0.0 && x < 10.0 && y > 0.0 && y < 10.0);
            }
        }
        assert!(!triangulation.frame_edges().is_empty());
        verify_triangulation(&triangulation);

        // the new frame keeps further insertions in the middle well formed
        let num_tris = triangulation.num_tris();
        triangulation.insert_vertex([5.0, 5.0]).unwrap();
        assert_eq!(triangulation.num_tris(), num_tris + 2);
        assert!(triangulation.is_sound().unwrap());
    }

    #[test]
    fn test_retract_frame_with() {
        let points = sample_points_2d_seeded(100, None, 19);
        let mut triangulation = Triangulation::new(SQUARE).unwrap();
        triangulation.insert_vertices(&points).unwrap();

        // cut away everything reaching into the left half
        let removed = triangulation
            .retract_frame_with(|a, b, c| {
                a.position[0] < 5.0 || b.position[0] < 5.0 || c.position[0] < 5.0
            })
            .unwrap();

        assert!(removed > 0);
        for tri in triangulation.tris() {
            assert!(tri.points().unwrap().iter().all(|p| p[0] >= 5.0));
        }
        assert!(triangulation.is_sound().unwrap());
        assert_eq!(triangulation.is_delaunay_p(), 1.0);
    }

    #[test]
    fn test_cocircular_points() {
        init_logger();

        for n in [3, 4, 6, 12, 64] {
            let mut triangulation = Triangulation::new(SQUARE).unwrap();
            triangulation
                .insert_vertices(&circle_points(n, [5.0, 5.0], 3.0))
                .unwrap();

            verify_square_tiling(&triangulation);
            assert_eq!(
                (triangulation.num_tris(), triangulation.num_edges()),
                expected_counts(4, n),
                "{n} points on a circle"
            );
        }
    }

    #[test]
    fn test_regular_polygon_with_center() {
        let polygon = circle_points(8, [5.0, 5.0], 4.0);

        // center first, then the polygon around it, and the other way round
        for center_first in [true, false] {
            let mut triangulation = Triangulation::new(SQUARE).unwrap();
            if center_first {
                triangulation.insert_vertex([5.0, 5.0]).unwrap();
            }
            triangulation.insert_vertices(&polygon).unwrap();
            if !center_first {
                triangulation.insert_vertex([5.0, 5.0]).unwrap();
            }

            verify_square_tiling(&triangulation);
            assert_eq!(
                (triangulation.num_tris(), triangulation.num_edges()),
                expected_counts(4, 9)
            );
            let center = triangulation.find_vertex(&[5.0, 5.0]).unwrap();
            assert_eq!(triangulation.get_vertex(center).unwrap().ref_count, 8);
        }
    }

    #[test]
    fn test_grid() {
        let grid: Vec<Point2> = (1..10)
            .flat_map(|x| (1..10).map(move |y| [x as f32, y as f32]))
            .collect();

        let mut triangulation = Triangulation::new(SQUARE).unwrap();
        triangulation.insert_vertices(&grid).unwrap();

        verify_square_tiling(&triangulation);
        assert_eq!(
            (triangulation.num_tris(), triangulation.num_edges()),
            expected_counts(4, grid.len())
        );
    }

    #[test]
    fn test_point_on_frame_edge() {
        let mut triangulation = Triangulation::new(SQUARE).unwrap();
        let p = triangulation.insert_vertex([5.0, 0.0]).unwrap();

        // the bottom edge is split, not fanned into a flat triangle
        let [c0, _, _, c3] = SQUARE.map(|c| triangulation.find_vertex(&c).unwrap());
        assert!(triangulation.edge_between(c0, c3).is_none());
        assert!(triangulation.edge_between(c0, p).unwrap().is_frame());
        assert!(triangulation.edge_between(p, c3).unwrap().is_frame());
        assert!(triangulation.frame_vertices().contains(&p));
        assert_eq!(triangulation.frame_edges().len(), 5);
        assert_eq!(triangulation.num_tris(), 3);
        assert_eq!(triangulation.is_delaunay().unwrap(), (true, 1.0));
        verify_square_tiling(&triangulation);

        triangulation.insert_vertex([5.0, 5.0]).unwrap();
        verify_square_tiling(&triangulation);
        assert_eq!(
            (triangulation.num_tris(), triangulation.num_edges()),
            expected_counts(5, 1)
        );

        // the outline now runs through the split point
        let loops = triangulation.boundary_loops().unwrap();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 5);
    }

    #[test]
    fn test_points_on_every_frame_edge() {
        let on_frame = [[5.0, 0.0], [0.0, 5.0], [10.0, 3.5], [2.5, 10.0], [7.5, 10.0]];

        let mut triangulation = Triangulation::new(SQUARE).unwrap();
        triangulation.insert_vertices(&on_frame).unwrap();

        verify_square_tiling(&triangulation);
        assert_eq!(triangulation.frame_edges().len(), 9);
        assert_eq!(triangulation.frame_vertices().len(), 9);
        assert_eq!(
            (triangulation.num_tris(), triangulation.num_edges()),
            expected_counts(9, 0)
        );

        let inner = sample_points_2d_seeded(50, None, 37);
        triangulation.insert_vertices(&inner).unwrap();
        verify_square_tiling(&triangulation);

        // retraction removes everything touching the frame, split points included
        triangulation.retract_frame().unwrap();
        assert!(triangulation.is_sound().unwrap());
        for handle in on_frame.map(|p| triangulation.find_vertex(&p).unwrap()) {
            assert_eq!(triangulation.get_vertex(handle).unwrap().ref_count, 0);
        }
    }

    #[test]
    fn test_point_outside_stays_isolated() {
        let mut triangulation = Triangulation::new(SQUARE).unwrap();
        let p = triangulation.insert_vertex([15.0, 5.0]).unwrap();

        assert_eq!(triangulation.get_vertex(p).unwrap().ref_count, 0);
        assert_eq!(triangulation.num_tris(), 2);
        verify_square_tiling(&triangulation);
    }

    #[test]
    fn test_from_rect_without_interior() {
        // one ulp wide, there is no x strictly between the sides
        let rect = Rect::new(1.0, 1.0, f32::EPSILON, 1.0);
        let err = Triangulation::from_rect_with_rng(rect, 3, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<TriangulationError>(),
            Some(&TriangulationError::NoInteriorPoint {
                rect,
                attempts: 3 * SAMPLING_ATTEMPTS
            })
        );

        // the frame alone is fine
        let triangulation = Triangulation::from_rect(rect, 0).unwrap();
        assert_eq!(triangulation.num_tris(), 2);
    }

    #[test]
    fn test_uncovered_frame_is_unsound() {
        let mut triangulation = Triangulation::new(SQUARE).unwrap();
        triangulation.insert_vertex([5.0, 5.0]).unwrap();

        // the graph stays consistent, but one quarter of the frame is no longer covered
        let tri = triangulation.tris().next().unwrap().idx();
        triangulation
            .tds_mut()
            .delete_tri(tri, &mut BTreeSet::new())
            .unwrap();

        assert!(triangulation.tds().is_sound());
        assert!(!triangulation.is_sound().unwrap());
        assert_relative_eq!(triangulation.area(), 75.0);
    }

    #[test]
    fn test_dead_handles() {
        let triangulation = Triangulation::new(SQUARE).unwrap();

        assert_eq!(triangulation.get_position(99), None);
        let err = triangulation.get_vertex(99).unwrap_err();
        assert_eq!(
            err.downcast_ref::<TriangulationError>(),
            Some(&TriangulationError::NotFound {
                kind: "vertex",
                handle: 99
            })
        );
        assert!(triangulation.get_tri(99).is_err());
    }
}
