//! Geometry metrics.
//!
//! Side-effect-free measurements on a [`Mesh`]: lengths, areas, normals,
//! centroids and bounds.

use nalgebra::{Point3, Vector3};

use super::index::{EdgeId, FaceId, VertexId};
use super::store::{Mesh, Vertex};
use crate::error::{EngineError, Result};

/// Faces with an area below this are treated as degenerate.
pub const DEGENERATE_AREA: f64 = 1e-14;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Componentwise minimum.
    pub min: Point3<f64>,
    /// Componentwise maximum.
    pub max: Point3<f64>,
}

impl Bounds {
    /// Size along each axis.
    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Length of the box diagonal.
    pub fn diagonal(&self) -> f64 {
        self.extent().norm()
    }

    /// Centre point.
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }
}

/// Componentwise min/max over a set of positions.
///
/// Fails with [`EngineError::EmptyMesh`] for an empty set instead of returning
/// degenerate bounds.
pub fn mesh_bounds<'a, I>(positions: I) -> Result<Bounds>
where
    I: IntoIterator<Item = &'a Point3<f64>>,
{
    let mut iter = positions.into_iter();
    let first = iter.next().ok_or(EngineError::EmptyMesh)?;
    let mut bounds = Bounds {
        min: *first,
        max: *first,
    };
    for p in iter {
        for i in 0..3 {
            bounds.min[i] = bounds.min[i].min(p[i]);
            bounds.max[i] = bounds.max[i].max(p[i]);
        }
    }
    Ok(bounds)
}

impl Mesh {
    /// Compute the length of an edge.
    pub fn edge_length(&self, e: EdgeId) -> f64 {
        let [a, b] = self.edge_vertices(e);
        (self.position(b) - self.position(a)).norm()
    }

    /// Compute the midpoint of an edge.
    pub fn edge_midpoint(&self, e: EdgeId) -> Point3<f64> {
        let [a, b] = self.edge_vertices(e);
        nalgebra::center(self.position(a), self.position(b))
    }

    /// Compute the area of a face by fan triangulation from its first vertex.
    pub fn face_area(&self, f: FaceId) -> f64 {
        let verts = self.face_vertices(f);
        let p0 = self.position(verts[0]);
        verts[1..]
            .windows(2)
            .map(|w| {
                let e1 = self.position(w[0]) - p0;
                let e2 = self.position(w[1]) - p0;
                0.5 * e1.cross(&e2).norm()
            })
            .sum()
    }

    /// Compute the unit normal of a face (Newell's method, valid for non-planar
    /// polygons).
    pub fn face_normal(&self, f: FaceId) -> Result<Vector3<f64>> {
        let verts = self.face_vertices(f);
        let n = verts.len();
        let mut normal = Vector3::zeros();
        for i in 0..n {
            let p = self.position(verts[i]);
            let q = self.position(verts[(i + 1) % n]);
            normal.x += (p.y - q.y) * (p.z + q.z);
            normal.y += (p.z - q.z) * (p.x + q.x);
            normal.z += (p.x - q.x) * (p.y + q.y);
        }
        // |Newell vector| is twice the projected area.
        if normal.norm() * 0.5 <= DEGENERATE_AREA {
            return Err(EngineError::DegenerateGeometry(format!(
                "face {:?} has zero area",
                f
            )));
        }
        Ok(normal.normalize())
    }

    /// Compute the centroid (vertex average) of a face.
    pub fn face_centroid(&self, f: FaceId) -> Point3<f64> {
        let verts = self.face_vertices(f);
        let sum: Vector3<f64> = verts.iter().map(|&v| self.position(v).coords).sum();
        Point3::from(sum / verts.len() as f64)
    }

    /// Equally weighted average of incident face normals, normalized.
    ///
    /// Degenerate faces are ignored. Returns the zero vector when the vertex has
    /// no (non-degenerate) incident faces or the normals cancel out.
    pub fn vertex_normal(&self, v: VertexId) -> Vector3<f64> {
        let sum: Vector3<f64> = self
            .vertex_faces(v)
            .into_iter()
            .filter_map(|f| self.face_normal(f).ok())
            .sum();
        sum.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros)
    }

    /// A new vertex at the centroid of `corners`.
    ///
    /// It is hidden when every corner is hidden and carries the mean density
    /// when every corner has one.
    pub(crate) fn averaged_vertex(&self, corners: &[VertexId]) -> Vertex {
        let sum: Vector3<f64> = corners.iter().map(|&v| self.position(v).coords).sum();
        let density = corners
            .iter()
            .map(|&v| self.density(v))
            .sum::<Option<f64>>()
            .map(|d| d / corners.len() as f64);
        Vertex {
            position: Point3::from(sum / corners.len() as f64),
            hidden: corners.iter().all(|&v| self.is_hidden(v)),
            density,
        }
    }

    /// Bounding box of all live vertices.
    pub fn bounds(&self) -> Result<Bounds> {
        mesh_bounds(self.vertices().map(|(_, v)| &v.position))
    }

    /// Compute the total surface area of the mesh.
    pub fn surface_area(&self) -> f64 {
        self.face_ids().map(|f| self.face_area(f)).sum()
    }

    /// Mean length over all live edges (0 for a mesh without edges).
    pub fn average_edge_length(&self) -> f64 {
        if self.num_edges() == 0 {
            return 0.0;
        }
        self.edge_ids().map(|e| self.edge_length(e)).sum::<f64>() / self.num_edges() as f64
    }

    /// Shortest and longest live edge, if any.
    pub fn edge_length_range(&self) -> Option<(f64, f64)> {
        self.edge_ids().map(|e| self.edge_length(e)).fold(None, |acc, len| {
            Some(match acc {
                None => (len, len),
                Some((lo, hi)) => (lo.min(len), hi.max(len)),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_polygons, primitives};

    #[test]
    fn test_edge_length_and_midpoint() {
        let mesh = primitives::triangle_cube().unwrap();
        for e in mesh.edge_ids() {
            let len = mesh.edge_length(e);
            assert!((len - 1.0).abs() < 1e-12 || (len - 2f64.sqrt()).abs() < 1e-12);
        }
        let e = mesh.find_edge(VertexId::new(0), VertexId::new(1)).unwrap();
        assert_eq!(mesh.edge_midpoint(e), Point3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_face_area_of_polygons() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mesh = build_from_polygons(&vertices, &[vec![0, 1, 2, 3, 4]]).unwrap();
        let f = mesh.face_ids().next().unwrap();
        // 2x1 rectangle plus a triangle of height 1 over a base of 2.
        assert!((mesh.face_area(f) - 3.0).abs() < 1e-12);
        let n = mesh.face_normal(f).unwrap();
        assert!((n - Vector3::z()).norm() < 1e-12);
        assert_eq!(mesh.face_centroid(f), Point3::new(1.0, 0.8, 0.0));
    }

    #[test]
    fn test_degenerate_face_normal() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let mesh = build_from_polygons(&vertices, &[[0, 1, 2]]).unwrap();
        let f = mesh.face_ids().next().unwrap();
        assert!(matches!(
            mesh.face_normal(f),
            Err(EngineError::DegenerateGeometry(_))
        ));
        assert_eq!(mesh.vertex_normal(VertexId::new(0)), Vector3::zeros());
    }

    #[test]
    fn test_vertex_normal_of_cube_corner() {
        let mesh = primitives::quad_cube().unwrap();
        let n = mesh.vertex_normal(VertexId::new(6));
        let expected = Vector3::new(1.0, 1.0, 1.0).normalize();
        assert!((n - expected).norm() < 1e-12);
    }

    #[test]
    fn test_isolated_vertex_normal_is_zero() {
        let mut mesh = primitives::quad_cube().unwrap();
        let v = mesh.add_vertex(Point3::new(5.0, 5.0, 5.0));
        assert_eq!(mesh.vertex_normal(v), Vector3::zeros());
    }

    #[test]
    fn test_bounds() {
        let mesh = primitives::uv_sphere(2.0, 8, 4).unwrap();
        let bounds = mesh.bounds().unwrap();
        assert!((bounds.max.z - 2.0).abs() < 1e-12);
        assert!((bounds.min.z + 2.0).abs() < 1e-12);
        assert!(bounds.center().coords.norm() < 1e-12);

        let empty: Vec<Point3<f64>> = Vec::new();
        assert!(matches!(mesh_bounds(&empty), Err(EngineError::EmptyMesh)));
        assert!(matches!(Mesh::new().bounds(), Err(EngineError::EmptyMesh)));
    }

    #[test]
    fn test_surface_area_of_cube() {
        let mesh = primitives::quad_cube().unwrap();
        assert!((mesh.surface_area() - 6.0).abs() < 1e-12);
        assert!((mesh.average_edge_length() - 1.0).abs() < 1e-12);
        assert_eq!(mesh.edge_length_range(), Some((1.0, 1.0)));
    }
}
