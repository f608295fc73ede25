//! Height and colour classification of mesh vertices.
//!
//! A vertex is sampled at its position normalized against a reference [Rect]. Every [ScalarField] yields one
//! weighted sample, and every [Layer] whose ranges hold for those samples raises the vertex and paints it.
use core::fmt;

use crate::utils::types::{Color, Point2, Rect};

/// The colour of vertices no [Layer] matches.
pub const DEFAULT_COLOR: Color = [1.0; 4];

type Sampler = Box<dyn Fn(Point2) -> f32 + Send + Sync>;

/// A weighted 2D scalar field over UV space.
pub struct ScalarField {
    pub weight: f32,
    sampler: Sampler,
}

impl ScalarField {
    pub fn new<F>(weight: f32, sampler: F) -> Self
    where
        F: Fn(Point2) -> f32 + Send + Sync + 'static,
    {
        Self {
            weight,
            sampler: Box::new(sampler),
        }
    }

    /// A field with the same value everywhere.
    pub fn constant(value: f32) -> Self {
        Self::new(1.0, move |_| value)
    }

    /// `weight * sampler(uv)`
    pub fn sample(&self, uv: Point2) -> f32 {
        self.weight * (self.sampler)(uv)
    }
}

impl fmt::Debug for ScalarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarField")
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

/// An inclusive range the sample of field `field` has to lie in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRange {
    pub field: usize,
    pub min: f32,
    pub max: f32,
}

impl FieldRange {
    pub const fn new(field: usize, min: f32, max: f32) -> Self {
        Self { field, min, max }
    }

    /// A range over a field that was not sampled never holds.
    pub fn holds(&self, samples: &[f32]) -> bool {
        samples
            .get(self.field)
            .is_some_and(|s| *s >= self.min && *s <= self.max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub color: Color,
    /// Height added to matching vertices.
    pub offset: f32,
    /// Take the maximum of the current height and `offset` instead of adding.
    pub overlap: bool,
    pub ranges: Vec<FieldRange>,
}

impl Layer {
    pub const fn new(color: Color, offset: f32) -> Self {
        Self {
            color,
            offset,
            overlap: false,
            ranges: Vec::new(),
        }
    }

    pub fn with_range(mut self, field: usize, min: f32, max: f32) -> Self {
        self.ranges.push(FieldRange::new(field, min, max));
        self
    }

    pub fn overlapping(mut self) -> Self {
        self.overlap = true;
        self
    }

    /// Check if all ranges hold, a layer without ranges matches everything.
    pub fn matches(&self, samples: &[f32]) -> bool {
        self.ranges.iter().all(|range| range.holds(samples))
    }
}

/// The height and colour assigned to a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub height: f32,
    pub color: Color,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            height: 0.0,
            color: DEFAULT_COLOR,
        }
    }
}

/// Applies [Layer]s, in order, to points within a reference rectangle.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    pub rect: Rect,
    pub layers: &'a [Layer],
    pub fields: &'a [ScalarField],
}

impl<'a> Classifier<'a> {
    pub const fn new(rect: Rect, layers: &'a [Layer], fields: &'a [ScalarField]) -> Self {
        Self {
            rect,
            layers,
            fields,
        }
    }

    pub fn classify(&self, p: Point2) -> Classification {
        let uv = self.rect.normalize(p);
        let samples: Vec<f32> = self.fields.iter().map(|field| field.sample(uv)).collect();

        let mut classification = Classification::default();
        for layer in self.layers.iter().filter(|layer| layer.matches(&samples)) {
            if layer.overlap {
                classification.height = classification.height.max(layer.offset);
            } else {
                classification.height += layer.offset;
            }
            classification.color = layer.color;
        }

        classification
    }
}
