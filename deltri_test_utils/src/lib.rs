//! utils for deltri tests and the fuzz target
#![forbid(unsafe_code)]
#![deny(unused)]
#![warn(clippy::all, clippy::missing_const_for_fn)]

use rand::{distr::Uniform, prelude::Distribution, rngs::StdRng, Rng, SeedableRng};
use rand_distr::Normal;
use std::ops::RangeInclusive;

pub type Point2 = [f32; 2];

/// Samples `n` points in 2D space from the [Uniform] distribution.
///
/// If no range is specified, `[1.0, 9.0]` is used, i.e. strictly inside a `10 x 10` frame at the origin.
pub fn sample_points_2d(n: usize, range: Option<RangeInclusive<f32>>) -> Vec<Point2> {
    sample_uniform(&mut rand::rng(), n, range)
}

/// Like [sample_points_2d], but reproducible for a given `seed`.
pub fn sample_points_2d_seeded(
    n: usize,
    range: Option<RangeInclusive<f32>>,
    seed: u64,
) -> Vec<Point2> {
    sample_uniform(&mut StdRng::seed_from_u64(seed), n, range)
}

/// Samples `n` points around `center` from a [Normal] distribution with deviation `std_dev`.
///
/// Points are clamped into `bounds`, so the result can contain duplicates at the border of the range.
pub fn sample_clustered_points_2d(
    n: usize,
    center: Point2,
    std_dev: f32,
    bounds: RangeInclusive<f32>,
    seed: u64,
) -> Vec<Point2> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal_x = Normal::new(center[0], std_dev).unwrap();
    let normal_y = Normal::new(center[1], std_dev).unwrap();

    let mut points: Vec<Point2> = Vec::with_capacity(n);
    for _ in 0..n {
        let x: f32 = normal_x.sample(&mut rng);
        let y: f32 = normal_y.sample(&mut rng);
        points.push([
            x.clamp(*bounds.start(), *bounds.end()),
            y.clamp(*bounds.start(), *bounds.end()),
        ]);
    }

    points
}

fn sample_uniform<R: Rng>(rng: &mut R, n: usize, range: Option<RangeInclusive<f32>>) -> Vec<Point2> {
    let range = range.unwrap_or(1.0..=9.0);
    let uniform = Uniform::try_from(range).expect("Expected range with a greater end then start");

    let mut points: Vec<Point2> = Vec::with_capacity(n);
    for _ in 0..n {
        let x = uniform.sample(rng);
        let y = uniform.sample(rng);
        points.push([x, y]);
    }

    points
}
