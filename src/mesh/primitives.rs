//! Procedural test shapes.
//!
//! Small generators used by the tests, benchmarks and the CLI harness. Every
//! shape is wound counter-clockwise when seen from outside.

use std::f64::consts::{PI, TAU};

use nalgebra::Point3;

use super::builder::{build_from_polygons, build_from_quads, build_from_triangles};
use super::store::Mesh;
use crate::error::{EngineError, Result};

const CUBE_CORNERS: [[f64; 3]; 8] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [1.0, 1.0, 1.0],
    [0.0, 1.0, 1.0],
];

const CUBE_QUADS: [[usize; 4]; 6] = [
    [0, 3, 2, 1], // bottom
    [4, 5, 6, 7], // top
    [0, 1, 5, 4], // front
    [2, 3, 7, 6], // back
    [0, 4, 7, 3], // left
    [1, 2, 6, 5], // right
];

fn cube_positions() -> Vec<Point3<f64>> {
    CUBE_CORNERS
        .iter()
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect()
}

/// Unit cube `[0, 1]³` with six quad faces.
pub fn quad_cube() -> Result<Mesh> {
    build_from_quads(&cube_positions(), &CUBE_QUADS)
}

/// Unit cube `[0, 1]³` with twelve triangles (each side split along a diagonal).
pub fn triangle_cube() -> Result<Mesh> {
    let faces: Vec<[usize; 3]> = CUBE_QUADS
        .iter()
        .flat_map(|&[a, b, c, d]| [[a, b, c], [a, c, d]])
        .collect();
    build_from_triangles(&cube_positions(), &faces)
}

/// Closed tetrahedron with one vertex above the XY plane.
pub fn tetrahedron() -> Result<Mesh> {
    let vertices = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.5, 1.0, 0.0),
        Point3::new(0.5, 0.5, 1.0),
    ];
    build_from_triangles(&vertices, &[[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]])
}

fn grid_positions(n: usize, size: f64) -> Vec<Point3<f64>> {
    let step = size / n as f64;
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    for j in 0..=n {
        for i in 0..=n {
            vertices.push(Point3::new(i as f64 * step, j as f64 * step, 0.0));
        }
    }
    vertices
}

/// Flat `n × n` grid of squares of side `size / n`, each split into two triangles.
pub fn triangle_grid(n: usize, size: f64) -> Result<Mesh> {
    if n == 0 {
        return Err(EngineError::invalid_param("n", n, "must be >= 1"));
    }
    let mut faces = Vec::with_capacity(n * n * 2);
    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + (n + 1);
            let v11 = v01 + 1;
            faces.push([v00, v10, v11]);
            faces.push([v00, v11, v01]);
        }
    }
    build_from_triangles(&grid_positions(n, size), &faces)
}

/// Flat `n × n` grid of quads of side `size / n`.
pub fn quad_grid(n: usize, size: f64) -> Result<Mesh> {
    if n == 0 {
        return Err(EngineError::invalid_param("n", n, "must be >= 1"));
    }
    let mut faces = Vec::with_capacity(n * n);
    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            faces.push([v00, v00 + 1, v00 + n + 2, v00 + n + 1]);
        }
    }
    build_from_quads(&grid_positions(n, size), &faces)
}

/// UV sphere centred at the origin: quads between latitude rings, triangle fans
/// at the poles.
///
/// `segments` is the number of longitudinal divisions (≥ 3), `rings` the number
/// of latitudinal bands (≥ 2).
pub fn uv_sphere(radius: f64, segments: usize, rings: usize) -> Result<Mesh> {
    if segments < 3 {
        return Err(EngineError::invalid_param("segments", segments, "must be >= 3"));
    }
    if rings < 2 {
        return Err(EngineError::invalid_param("rings", rings, "must be >= 2"));
    }
    if !(radius.is_finite() && radius > 0.0) {
        return Err(EngineError::invalid_param("radius", radius, "must be > 0"));
    }

    let mut vertices = Vec::with_capacity(2 + (rings - 1) * segments);
    vertices.push(Point3::new(0.0, 0.0, radius));
    for i in 1..rings {
        let theta = PI * i as f64 / rings as f64;
        for j in 0..segments {
            let phi = TAU * j as f64 / segments as f64;
            vertices.push(Point3::new(
                radius * theta.sin() * phi.cos(),
                radius * theta.sin() * phi.sin(),
                radius * theta.cos(),
            ));
        }
    }
    let south = vertices.len();
    vertices.push(Point3::new(0.0, 0.0, -radius));

    let ring = |i: usize, j: usize| 1 + i * segments + (j % segments);
    let mut faces: Vec<Vec<usize>> = Vec::with_capacity(rings * segments);
    for j in 0..segments {
        faces.push(vec![0, ring(0, j), ring(0, j + 1)]);
    }
    for i in 0..rings - 2 {
        for j in 0..segments {
            faces.push(vec![ring(i, j), ring(i + 1, j), ring(i + 1, j + 1), ring(i, j + 1)]);
        }
    }
    for j in 0..segments {
        faces.push(vec![south, ring(rings - 2, j + 1), ring(rings - 2, j)]);
    }

    build_from_polygons(&vertices, &faces)
}
