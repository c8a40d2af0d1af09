//! Benchmarks for mesh operations.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use nalgebra::Point3;
use quadmesh::algo::curvature::compute_curvature;
use quadmesh::algo::edit::{convert_to_quads, subdivide_edges};
use quadmesh::algo::remesh::{remesh_quad, uniform_remesh, QuadRemeshOptions, UniformOptions};
use quadmesh::algo::smooth::{laplacian_smooth, SmoothOptions};
use quadmesh::algo::subdivide::{subdivide_smooth, SubdivideOptions};
use quadmesh::mesh::primitives;
use quadmesh::prelude::*;

fn create_grid_mesh(n: usize) -> Mesh {
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    let mut faces = Vec::with_capacity(n * n * 2);

    // Create grid vertices with a gentle bump so curvature is non-zero
    for j in 0..=n {
        for i in 0..=n {
            let (x, y) = (i as f64 / n as f64, j as f64 / n as f64);
            let z = 0.2 * (std::f64::consts::PI * x).sin() * (std::f64::consts::PI * y).sin();
            vertices.push(Point3::new(x, y, z));
        }
    }

    // Create triangles
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

    build_from_triangles(&vertices, &faces).unwrap()
}

fn bench_mesh_construction(c: &mut Criterion) {
    c.bench_function("build_sphere_32x16", |b| {
        b.iter(|| primitives::uv_sphere(1.0, 32, 16).unwrap());
    });
}

fn bench_mesh_traversal(c: &mut Criterion) {
    let mesh = create_grid_mesh(50);

    c.bench_function("vertex_neighbors_all", |b| {
        b.iter(|| {
            let mut count = 0;
            for v in mesh.vertex_ids() {
                count += mesh.vertex_neighbors(v).count();
            }
            count
        });
    });

    c.bench_function("curvature_parallel", |b| {
        b.iter(|| compute_curvature(&mesh, true));
    });

    c.bench_function("curvature_sequential", |b| {
        b.iter(|| compute_curvature(&mesh, false));
    });
}

fn bench_edits(c: &mut Criterion) {
    let grid = create_grid_mesh(40);

    c.bench_function("subdivide_all_edges", |b| {
        b.iter_batched(
            || grid.clone(),
            |mut mesh| {
                let edges: Vec<EdgeId> = mesh.edge_ids().collect();
                subdivide_edges(&mut mesh, &edges).unwrap()
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("convert_to_quads", |b| {
        b.iter_batched(|| grid.clone(), |mut mesh| convert_to_quads(&mut mesh), BatchSize::SmallInput);
    });

    c.bench_function("laplacian_smooth_10", |b| {
        let options = SmoothOptions::new(0.5, 10);
        b.iter_batched(
            || grid.clone(),
            |mut mesh| laplacian_smooth(&mut mesh, &options).unwrap(),
            BatchSize::SmallInput,
        );
    });
}

fn bench_pipelines(c: &mut Criterion) {
    let sphere = primitives::uv_sphere(1.0, 32, 16).unwrap();

    c.bench_function("remesh_quad_sphere", |b| {
        let options = QuadRemeshOptions::new(2.0);
        b.iter_batched(
            || sphere.clone(),
            |mut mesh| remesh_quad(&mut mesh, &options).unwrap(),
            BatchSize::SmallInput,
        );
    });

    c.bench_function("uniform_remesh_sphere", |b| {
        let options = UniformOptions::new(0.1);
        b.iter_batched(
            || sphere.clone(),
            |mut mesh| uniform_remesh(&mut mesh, &options).unwrap(),
            BatchSize::SmallInput,
        );
    });

    c.bench_function("catmull_clark_cube_3", |b| {
        let cube = primitives::quad_cube().unwrap();
        let options = SubdivideOptions::new(3);
        b.iter_batched(
            || cube.clone(),
            |mut mesh| subdivide_smooth(&mut mesh, &options).unwrap(),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_mesh_construction, bench_mesh_traversal, bench_edits, bench_pipelines);
criterion_main!(benches);
