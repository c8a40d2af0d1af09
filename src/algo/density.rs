//! Per-vertex density maps.
//!
//! A density map scales how finely [`adaptive_remesh`](crate::algo::remesh::adaptive_remesh)
//! refines around each vertex. Values above 1.0 refine more, values below 1.0
//! refine less.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{EngineError, Result};
use crate::mesh::{Mesh, VertexId};

/// Density given to vertices the map does not mention.
pub const DEFAULT_DENSITY: f64 = 1.0;

/// Assign a density to every live vertex: `map[v]` when present, otherwise
/// [`DEFAULT_DENSITY`].
///
/// The map is checked in full before anything is written, so on error the mesh
/// is unchanged.
///
/// # Errors
/// * [`EngineError::EmptyMesh`] if the mesh has no vertices
/// * [`EngineError::InvalidParameter`] if a value is not finite or not `> 0`
/// * [`EngineError::InvalidEdit`] if a key names a dead or unknown vertex
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use quadmesh::algo::density::apply_density_map;
/// use quadmesh::mesh::{primitives, VertexId};
///
/// let mut mesh = primitives::triangle_cube().unwrap();
/// let map = HashMap::from([(VertexId::new(0), 4.0)]);
/// apply_density_map(&mut mesh, &map).unwrap();
///
/// assert_eq!(mesh.density(VertexId::new(0)), Some(4.0));
/// assert_eq!(mesh.density(VertexId::new(1)), Some(1.0));
/// ```
pub fn apply_density_map(mesh: &mut Mesh, map: &HashMap<VertexId, f64>) -> Result<()> {
    if mesh.is_empty() {
        return Err(EngineError::EmptyMesh);
    }
    // All values are checked before any key.
    if let Some(&value) = map.values().find(|d| !d.is_finite() || **d <= 0.0) {
        return Err(EngineError::invalid_param(
            "density",
            value,
            "must be finite and > 0",
        ));
    }
    for &v in map.keys() {
        if !mesh.is_vertex_alive(v) {
            return Err(EngineError::invalid_edit(format!(
                "density map names vertex {:?}, which is not in the mesh",
                v
            )));
        }
    }

    let ids: Vec<VertexId> = mesh.vertex_ids().collect();
    for v in ids {
        let value = map.get(&v).copied().unwrap_or(DEFAULT_DENSITY);
        mesh.set_density(v, Some(value));
    }
    debug!(entries = map.len(), vertices = mesh.num_vertices(), "applied density map");
    Ok(())
}

/// Mean density of the two endpoints of an edge, treating unset values as
/// [`DEFAULT_DENSITY`].
pub(crate) fn local_density(mesh: &Mesh, a: VertexId, b: VertexId) -> f64 {
    let d = |v| mesh.density(v).unwrap_or(DEFAULT_DENSITY);
    0.5 * (d(a) + d(b))
}
