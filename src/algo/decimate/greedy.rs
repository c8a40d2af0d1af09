//! Curvature- and area-weighted greedy edge collapse.

use tracing::{debug, info};

use super::DecimateOptions;
use crate::algo::curvature::compute_curvature;
use crate::algo::edit::collapse_edges_while;
use crate::algo::Progress;
use crate::error::{EngineError, Result};
use crate::mesh::{EdgeId, Mesh};

/// Keeps flat regions (zero curvature) from all costing zero.
const CURVATURE_EPSILON: f64 = 1e-3;

/// Decimate a mesh toward `target_ratio` of its current face count.
///
/// Returns `Ok(false)` without touching the mesh when the ratio is `≤ 0` or
/// `≥ 1`, and `Ok(true)` once decimation has run. The face count never grows.
/// Rounds stop when the target is reached, a round removes no face, or
/// `max_rounds` is hit.
///
/// # Errors
/// * [`EngineError::EmptyMesh`] if the mesh has no vertices or no faces
/// * [`EngineError::InvalidParameter`] if the ratio is not finite
pub fn decimate(mesh: &mut Mesh, options: &DecimateOptions) -> Result<bool> {
    decimate_with_progress(mesh, options, &Progress::none())
}

/// [`decimate`] reporting once per round.
pub fn decimate_with_progress(
    mesh: &mut Mesh,
    options: &DecimateOptions,
    progress: &Progress,
) -> Result<bool> {
    if mesh.is_empty() || mesh.num_faces() == 0 {
        return Err(EngineError::EmptyMesh);
    }
    let ratio = options.target_ratio;
    if !ratio.is_finite() {
        return Err(EngineError::invalid_param("target_ratio", ratio, "must be finite"));
    }
    if ratio <= 0.0 || ratio >= 1.0 {
        debug!(ratio, "decimation ratio outside (0, 1), nothing to do");
        return Ok(false);
    }

    let original = mesh.num_faces();
    let target = options.compute_target(original);
    info!(original, target, "decimating");

    for round in 0..options.max_rounds {
        let before = mesh.num_faces();
        if before <= target {
            break;
        }
        progress.report(round, options.max_rounds, "Decimating");

        let candidates = ranked_edges(mesh, options);
        let report = collapse_edges_while(mesh, &candidates, |m| m.num_faces() > target)?;
        debug!(
            round,
            collapsed = report.collapsed,
            skipped = report.skipped,
            faces = mesh.num_faces(),
            "decimation round"
        );
        if mesh.num_faces() >= before {
            break;
        }
    }
    progress.report(options.max_rounds, options.max_rounds, "Decimating");

    info!(original, faces = mesh.num_faces(), "decimation done");
    Ok(true)
}

/// Collapsible edges, cheapest first.
fn ranked_edges(mesh: &Mesh, options: &DecimateOptions) -> Vec<EdgeId> {
    let curvature = compute_curvature(mesh, options.parallel);
    let mut ranked: Vec<(f64, EdgeId)> = mesh
        .edges()
        .filter(|(_, edge)| edge.face_count() > 0)
        .filter(|(_, edge)| {
            !options.preserve_boundary
                || edge.vertices().iter().all(|&v| !mesh.is_boundary_vertex(v))
        })
        .map(|(e, edge)| {
            let [a, b] = edge.vertices();
            let area: f64 = edge.faces().iter().map(|&f| mesh.face_area(f)).sum();
            ((curvature.edge_mean(a, b) + CURVATURE_EPSILON) * area, e)
        })
        .collect();
    ranked.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));
    ranked.into_iter().map(|(_, e)| e).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::primitives;

    #[test]
    fn test_decimate_is_monotone() {
        for ratio in [0.2, 0.5, 0.9] {
            let mut mesh = primitives::uv_sphere(1.0, 16, 10).unwrap();
            let before = mesh.num_faces();
            assert!(decimate(&mut mesh, &DecimateOptions::with_target_ratio(ratio)).unwrap());
            assert!(mesh.num_faces() <= before);
            assert!(mesh.is_valid());
        }
    }

    #[test]
    fn test_decimate_reaches_target_on_grid() {
        let mut mesh = primitives::triangle_grid(10, 1.0).unwrap();
        let options = DecimateOptions::with_target_ratio(0.6).with_preserve_boundary(false);
        decimate(&mut mesh, &options).unwrap();
        assert!(mesh.num_faces() <= 120);
        assert!(mesh.num_faces() >= 100);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_boundary_is_preserved() {
        let mut mesh = primitives::triangle_grid(6, 6.0).unwrap();
        let boundary: Vec<_> = mesh
            .vertex_ids()
            .filter(|&v| mesh.is_boundary_vertex(v))
            .map(|v| (v, *mesh.position(v)))
            .collect();

        decimate(&mut mesh, &DecimateOptions::with_target_ratio(0.3)).unwrap();
        for (v, pos) in boundary {
            assert!(mesh.is_vertex_alive(v));
            assert_eq!(*mesh.position(v), pos);
        }
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_out_of_range_ratio_is_noop() {
        for ratio in [0.0, -1.0, 1.0, 2.0] {
            let mut mesh = primitives::triangle_cube().unwrap();
            let ran = decimate(&mut mesh, &DecimateOptions::with_target_ratio(ratio)).unwrap();
            assert!(!ran);
            assert_eq!(mesh.num_faces(), 12);
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let mut mesh = primitives::triangle_cube().unwrap();
        let err = decimate(&mut mesh, &DecimateOptions::with_target_ratio(f64::NAN)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { .. }));

        let mut empty = Mesh::new();
        assert!(matches!(
            decimate(&mut empty, &DecimateOptions::default()),
            Err(EngineError::EmptyMesh)
        ));
    }
}
