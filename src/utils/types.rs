// Type aliases for data values.
pub type Point2 = [f32; 2];
pub type Point3 = [f32; 3];
pub type Color = [f32; 4];
pub type Triangle2 = [Point2; 3];

// Type aliases for pool handles.
// This is to know, when a function accepts or returns a usize, what it is for.
pub type VertexHandle = usize;
pub type EdgeHandle = usize;
pub type TriHandle = usize;

/// An axis aligned rectangle, given by its minimum corner and its extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn min(&self) -> Point2 {
        [self.x, self.y]
    }

    pub fn max(&self) -> Point2 {
        [self.x + self.width, self.y + self.height]
    }

    /// The four corners, starting at the minimum and going up the `y` axis first.
    pub fn corners(&self) -> [Point2; 4] {
        let [x_max, y_max] = self.max();
        [
            [self.x, self.y],
            [self.x, y_max],
            [x_max, y_max],
            [x_max, self.y],
        ]
    }

    /// Map a point into the unit square spanned by this rectangle.
    ///
    /// Points outside the rectangle map outside `[0, 1]`; a rectangle without area maps to `0`.
    pub fn normalize(&self, p: Point2) -> Point2 {
        let u = if self.width != 0.0 {
            (p[0] - self.x) / self.width
        } else {
            0.0
        };
        let v = if self.height != 0.0 {
            (p[1] - self.y) / self.height
        } else {
            0.0
        };
        [u, v]
    }

    pub fn contains(&self, p: Point2) -> bool {
        let [x_max, y_max] = self.max();
        p[0] >= self.x && p[0] <= x_max && p[1] >= self.y && p[1] <= y_max
    }
}
