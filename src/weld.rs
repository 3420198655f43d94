//! Vertex welding: turns per-triangle-corner vertex soup into indexed
//! geometry.
//!
//! Corners are processed strictly in the order they were appended. Each
//! corner is compared against the vertices collated so far and either
//! folds into the first one it matches or becomes a new unique vertex.
//! A corner matches a collated vertex iff:
//!
//! 1. neither of them is flagged `force_hard`;
//! 2. positions are exactly equal;
//! 3. uvs are exactly equal;
//! 4. normals are exactly equal, or, with a positive normal threshold,
//!    the angle between them is at most the threshold (radians).
//!
//! A folding corner leaves its normal behind as an "influence" of the
//! vertex it folded into. With a positive threshold every unique normal
//! is finally replaced by the mean of its distinct influences. The mean
//! is not renormalized to unit length.
//!
//! Collated vertices are bucketed by the exact bits of position and uv,
//! and a bucket is scanned in collation order. Vertices outside the
//! bucket can never satisfy rules 2 and 3, so the outcome is the same as
//! scanning every collated vertex; the worst case (every corner sharing
//! position and uv) is still O(corners * unique vertices).

use crate::HashMap;
use crate::mesh::{MeshData, SubMesh};
use crate::stream::{ElementType, StreamRole};
use crate::write::WriteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GeomPrecision {
    /// Write positions, normals and uvs as `Float32`.
    #[default]
    Single,
    /// Write positions, normals and uvs as `Float64`.
    Double,
}

impl GeomPrecision {
    pub fn element_type(self) -> ElementType {
        match self {
            GeomPrecision::Single => ElementType::Float32,
            GeomPrecision::Double => ElementType::Float64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeldSettings {
    /// Largest angle (radians) between two normals that still fold.
    /// Zero requires exactly equal normals and disables smoothing.
    pub normal_threshold: f64,
    pub precision: GeomPrecision,
}

impl Default for WeldSettings {
    fn default() -> Self {
        Self {
            normal_threshold: 0.0,
            precision: GeomPrecision::Single,
        }
    }
}

/// One raw triangle corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    /// Index of the corner in the source mesh.
    pub index: u32,
    pub position: [f64; 3],
    pub uv: [f64; 2],
    pub normal: [f64; 3],
    /// Never fold this corner into another vertex.
    pub force_hard: bool,
}

/// Deduplicated geometry produced by one welding pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeldedGeometry {
    pub positions: Vec<[f64; 3]>,
    pub uvs: Vec<[f64; 2]>,
    pub normals: Vec<[f64; 3]>,
    /// One entry per input corner.
    pub indices: Vec<u32>,
}

impl WeldedGeometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Narrowest index type able to address every vertex.
    pub fn index_element_type(&self) -> ElementType {
        if self.vertex_count() <= u16::MAX as usize + 1 {
            ElementType::UInt16
        } else {
            ElementType::UInt32
        }
    }

    /// Positions, indices, normals and uvs, in that order.
    pub fn into_sub_mesh(
        self,
        precision: GeomPrecision,
    ) -> Result<SubMesh, WriteError> {
        let float_type = precision.element_type();
        let index_type = self.index_element_type();
        let n = self.vertex_count();
        let mut sub = SubMesh::new();
        sub.add_stream(
            StreamRole::Vertices,
            float_type,
            self.positions.into_iter().flatten().collect::<Vec<f64>>(),
            n * 3,
        )?;
        let n_indices = self.indices.len();
        sub.add_stream(StreamRole::Triangles, index_type, self.indices, n_indices)?;
        sub.add_stream(
            StreamRole::VertexNormals,
            float_type,
            self.normals.into_iter().flatten().collect::<Vec<f64>>(),
            n * 3,
        )?;
        sub.add_stream(
            StreamRole::Uvs,
            float_type,
            self.uvs.into_iter().flatten().collect::<Vec<f64>>(),
            n * 2,
        )?;
        Ok(sub)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Welder {
    settings: WeldSettings,
    expanded: Vec<Corner>,
}

impl Welder {
    pub fn new(settings: WeldSettings) -> Self {
        Self {
            settings,
            expanded: vec![],
        }
    }

    pub fn with_threshold(normal_threshold: f64) -> Self {
        Self::new(WeldSettings {
            normal_threshold,
            ..Default::default()
        })
    }

    pub fn settings(&self) -> &WeldSettings {
        &self.settings
    }

    pub fn append(
        &mut self,
        index: u32,
        position: [f64; 3],
        uv: [f64; 2],
        normal: [f64; 3],
        force_hard: bool,
    ) {
        self.push(Corner {
            index,
            position,
            uv,
            normal,
            force_hard,
        });
    }

    pub fn push(&mut self, corner: Corner) {
        self.expanded.push(corner);
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }

    /// Weld every appended corner, leaving the welder empty.
    pub fn weld(&mut self) -> Result<WeldedGeometry, WriteError> {
        let expanded = std::mem::take(&mut self.expanded);
        let mut collation = Collation::new(self.settings.normal_threshold);
        let mut out = WeldedGeometry {
            indices: Vec::with_capacity(expanded.len()),
            ..Default::default()
        };

        for corner in expanded.iter() {
            let idx = match collation.find_match(corner) {
                Some(idx) => idx,
                None => {
                    let idx = collation.insert(*corner)?;
                    out.positions.push(corner.position);
                    out.uvs.push(corner.uv);
                    out.normals.push(corner.normal);
                    idx
                }
            };
            out.indices.push(idx);
        }

        if self.settings.normal_threshold > 0.0 {
            for (normal, vertex) in out.normals.iter_mut().zip(collation.collated.iter()) {
                *normal = mean(&vertex.influences);
            }
            let degenerate = expanded
                .iter()
                .filter(|c| c.normal == [0.0; 3])
                .count();
            if degenerate > 0 {
                tracing::warn!(
                    corners = degenerate,
                    "zero-length normals only fold on exact equality"
                );
            }
        }

        tracing::debug!(
            corners = expanded.len(),
            vertices = out.vertex_count(),
            threshold = self.settings.normal_threshold,
            "welded sub-mesh"
        );
        Ok(out)
    }

    /// Weld every appended corner into a new sub-mesh of `mesh`.
    pub fn build(&mut self, mesh: &mut MeshData) -> Result<(), WriteError> {
        let geom = self.weld()?;
        mesh.add_sub_mesh(geom.into_sub_mesh(self.settings.precision)?);
        Ok(())
    }
}

struct CollatedVertex {
    corner: Corner,
    influences: Vec<[f64; 3]>,
}

impl CollatedVertex {
    fn add_influence(&mut self, normal: [f64; 3]) {
        if !self.influences.contains(&normal) {
            self.influences.push(normal);
        }
    }
}

type BucketKey = [u64; 5];

/// State of a single welding pass.
struct Collation {
    threshold: f64,
    collated: Vec<CollatedVertex>,
    buckets: HashMap<BucketKey, Vec<u32>>,
}

impl Collation {
    fn new(threshold: f64) -> Self {
        Self {
            threshold,
            collated: vec![],
            buckets: HashMap::default(),
        }
    }

    /// Index of the first collated vertex `candidate` folds into.
    ///
    /// On a match the candidate's normal is recorded as an influence.
    fn find_match(&mut self, candidate: &Corner) -> Option<u32> {
        if candidate.force_hard {
            return None;
        }
        let bucket = self.buckets.get(&bucket_key(candidate)?)?;
        for &idx in bucket.iter() {
            let vertex = &mut self.collated[idx as usize];
            if vertex.corner.force_hard {
                continue;
            }
            // Position and uv are equal within a bucket; the normal test
            // must come last since it is the one with side effects.
            if normals_match(vertex.corner.normal, candidate.normal, self.threshold) {
                vertex.add_influence(candidate.normal);
                return Some(idx);
            }
        }
        None
    }

    fn insert(&mut self, corner: Corner) -> Result<u32, WriteError> {
        let idx = u32::try_from(self.collated.len()).map_err(|_| {
            WriteError::Capacity {
                what: "welded vertex count",
                len: self.collated.len() as u64 + 1,
                max: u32::MAX as u64,
            }
        })?;
        if let Some(key) = bucket_key(&corner) {
            self.buckets.entry(key).or_default().push(idx);
        }
        self.collated.push(CollatedVertex {
            corner,
            influences: vec![corner.normal],
        });
        Ok(idx)
    }
}

/// Exact-equality key over position and uv.
///
/// `-0.0` and `0.0` compare equal so they share a key. Corners with a NaN
/// position or uv compare unequal to everything and get no key at all.
fn bucket_key(c: &Corner) -> Option<BucketKey> {
    let values = [c.position[0], c.position[1], c.position[2], c.uv[0], c.uv[1]];
    if values.iter().any(|v| v.is_nan()) {
        return None;
    }
    Some(values.map(|v| if v == 0.0 { 0u64 } else { v.to_bits() }))
}

fn normals_match(a: [f64; 3], b: [f64; 3], threshold: f64) -> bool {
    if a == b {
        return true;
    }
    if threshold.is_nan() || threshold <= 0.0 {
        return false;
    }
    angle_between(a, b).is_some_and(|angle| angle <= threshold)
}

/// Angle between two vectors in radians, `None` if either has zero length.
fn angle_between(a: [f64; 3], b: [f64; 3]) -> Option<f64> {
    let la = (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt();
    let lb = (b[0] * b[0] + b[1] * b[1] + b[2] * b[2]).sqrt();
    if la == 0.0 || lb == 0.0 {
        return None;
    }
    let cos = (a[0] * b[0] + a[1] * b[1] + a[2] * b[2]) / (la * lb);
    // rounding can push parallel vectors slightly past 1
    Some(cos.clamp(-1.0, 1.0).acos())
}

fn mean(normals: &[[f64; 3]]) -> [f64; 3] {
    let n = normals.len() as f64;
    let sum = normals.iter().fold([0.0; 3], |acc, v| {
        [acc[0] + v[0], acc[1] + v[1], acc[2] + v[2]]
    });
    [sum[0] / n, sum[1] / n, sum[2] / n]
}

#[cfg(test)]
mod tests {
    use super::*;

    const UP: [f64; 3] = [0.0, 0.0, 1.0];

    fn tri(welder: &mut Welder, base: u32, corners: [([f64; 3], bool); 3]) {
        for (i, (p, hard)) in corners.into_iter().enumerate() {
            welder.append(base + i as u32, p, [0.0, 0.0], UP, hard);
        }
    }

    #[test]
    fn single_triangle() {
        let mut welder = Welder::default();
        tri(
            &mut welder,
            0,
            [
                ([0.0, 0.0, 0.0], false),
                ([1.0, 0.0, 0.0], false),
                ([0.0, 1.0, 0.0], false),
            ],
        );
        let geom = welder.weld().unwrap();
        assert_eq!(geom.vertex_count(), 3);
        assert_eq!(geom.indices, [0, 1, 2]);
        assert!(welder.is_empty());
    }

    #[test]
    fn quad_shares_edge() {
        let a = [0.0, 0.0, 0.0];
        let b = [1.0, 0.0, 0.0];
        let c = [1.0, 1.0, 0.0];
        let d = [0.0, 1.0, 0.0];
        let mut welder = Welder::default();
        tri(&mut welder, 0, [(a, false), (b, false), (c, false)]);
        tri(&mut welder, 3, [(a, false), (c, false), (d, false)]);
        let geom = welder.weld().unwrap();
        assert_eq!(geom.vertex_count(), 4);
        assert_eq!(geom.indices, [0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn force_hard_corner_never_folds() {
        let a = [0.0, 0.0, 0.0];
        let b = [1.0, 0.0, 0.0];
        let c = [1.0, 1.0, 0.0];
        let d = [0.0, 1.0, 0.0];
        let mut welder = Welder::default();
        tri(&mut welder, 0, [(a, false), (b, false), (c, false)]);
        tri(&mut welder, 3, [(a, true), (c, false), (d, false)]);
        let geom = welder.weld().unwrap();
        assert_eq!(geom.vertex_count(), 5);
        assert_eq!(geom.indices, [0, 1, 2, 3, 2, 4]);
    }

    #[test]
    fn hard_collated_vertex_rejects_later_corners() {
        let mut welder = Welder::default();
        welder.append(0, [0.0; 3], [0.0; 2], UP, true);
        welder.append(1, [0.0; 3], [0.0; 2], UP, false);
        welder.append(2, [0.0; 3], [0.0; 2], UP, false);
        let geom = welder.weld().unwrap();
        assert_eq!(geom.indices, [0, 1, 1]);
    }

    #[test]
    fn zero_threshold_requires_exact_normals() {
        let mut welder = Welder::default();
        welder.append(0, [0.0; 3], [0.0; 2], UP, false);
        welder.append(1, [0.0; 3], [0.0; 2], [0.0, 0.001, 1.0], false);
        let geom = welder.weld().unwrap();
        assert_eq!(geom.vertex_count(), 2);
        assert_eq!(geom.normals[0], UP);
    }

    #[test]
    fn uv_seam_splits_vertex() {
        let mut welder = Welder::default();
        welder.append(0, [0.0; 3], [0.0, 0.0], UP, false);
        welder.append(1, [0.0; 3], [1.0, 0.0], UP, false);
        assert_eq!(welder.weld().unwrap().vertex_count(), 2);
    }

    #[test]
    fn smoothing_averages_without_renormalizing() {
        let n0 = [1.0, 0.0, 0.0];
        let n1 = [0.0, 1.0, 0.0];
        let mut welder = Welder::with_threshold(2.0);
        welder.append(0, [0.0; 3], [0.0; 2], n0, false);
        welder.append(1, [0.0; 3], [0.0; 2], n1, false);
        // duplicate influence is only counted once
        welder.append(2, [0.0; 3], [0.0; 2], n1, false);
        let geom = welder.weld().unwrap();
        assert_eq!(geom.vertex_count(), 1);
        assert_eq!(geom.indices, [0, 0, 0]);
        // Mean of the distinct influences, length 0.707 rather than 1.
        assert_eq!(geom.normals[0], [0.5, 0.5, 0.0]);
    }

    #[test]
    fn angle_beyond_threshold_does_not_fold() {
        let mut welder = Welder::with_threshold(0.1);
        welder.append(0, [0.0; 3], [0.0; 2], [1.0, 0.0, 0.0], false);
        welder.append(1, [0.0; 3], [0.0; 2], [0.0, 1.0, 0.0], false);
        let geom = welder.weld().unwrap();
        assert_eq!(geom.vertex_count(), 2);
        assert_eq!(geom.normals, [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    }

    #[test]
    fn first_matching_vertex_is_the_representative() {
        let mut welder = Welder::with_threshold(0.5);
        welder.append(0, [0.0; 3], [0.0; 2], [1.0, 0.0, 0.0], false);
        welder.append(1, [0.0; 3], [0.0; 2], [0.0, 1.0, 0.0], false);
        // within threshold of both, folds into the first
        welder.append(2, [0.0; 3], [0.0; 2], [1.0, 0.3, 0.0], false);
        let geom = welder.weld().unwrap();
        assert_eq!(geom.indices, [0, 1, 0]);
    }

    #[test]
    fn nearly_parallel_normals_fold() {
        let a = [0.1, 0.2, 0.3];
        let b = [0.1 * 3.0, 0.2 * 3.0, 0.3 * 3.0];
        assert!(normals_match(a, b, 1e-6));
    }

    #[test]
    fn zero_length_normal_only_folds_exactly() {
        assert!(!normals_match([0.0; 3], UP, 3.0));
        assert!(normals_match([0.0; 3], [0.0; 3], 3.0));
    }

    #[test]
    fn zero_normals_fold_together_when_smoothing() {
        let mut welder = Welder::with_threshold(3.0);
        welder.append(0, [0.0; 3], [0.0; 2], [0.0; 3], false);
        welder.append(1, [0.0; 3], [0.0; 2], UP, false);
        welder.append(2, [0.0; 3], [0.0; 2], [0.0; 3], false);
        let geom = welder.weld().unwrap();
        assert_eq!(geom.indices, [0, 1, 0]);
        assert_eq!(geom.normals, [[0.0; 3], UP]);
    }

    #[test]
    fn signed_zero_positions_fold() {
        let mut welder = Welder::default();
        welder.append(0, [0.0, 0.0, 0.0], [0.0; 2], UP, false);
        welder.append(1, [-0.0, 0.0, 0.0], [0.0; 2], UP, false);
        assert_eq!(welder.weld().unwrap().vertex_count(), 1);
    }

    #[test]
    fn nan_positions_never_fold() {
        let mut welder = Welder::default();
        welder.append(0, [f64::NAN, 0.0, 0.0], [0.0; 2], UP, false);
        welder.append(1, [f64::NAN, 0.0, 0.0], [0.0; 2], UP, false);
        assert_eq!(welder.weld().unwrap().indices, [0, 1]);
    }

    #[test]
    fn no_staging_cap() {
        let mut welder = Welder::default();
        for i in 0..70_000u32 {
            welder.append(i, [i as f64, 0.0, 0.0], [0.0; 2], UP, false);
        }
        let geom = welder.weld().unwrap();
        assert_eq!(geom.vertex_count(), 70_000);
        assert_eq!(geom.index_element_type(), ElementType::UInt32);
    }

    #[test]
    fn build_emits_four_streams() {
        let mut welder = Welder::default();
        tri(
            &mut welder,
            0,
            [
                ([0.0, 0.0, 0.0], false),
                ([1.0, 0.0, 0.0], false),
                ([0.0, 1.0, 0.0], false),
            ],
        );
        let mut mesh = MeshData::new("tri");
        welder.build(&mut mesh).unwrap();
        let sub = &mesh.sub_meshes()[0];
        let roles: Vec<StreamRole> = sub.streams().iter().map(|s| s.role()).collect();
        assert_eq!(
            roles,
            [
                StreamRole::Vertices,
                StreamRole::Triangles,
                StreamRole::VertexNormals,
                StreamRole::Uvs
            ]
        );
        let counts: Vec<usize> = sub.streams().iter().map(|s| s.count()).collect();
        assert_eq!(counts, [9, 3, 9, 6]);
        assert_eq!(
            sub.stream(StreamRole::Triangles).map(|s| s.element_type()),
            Some(ElementType::UInt16)
        );
    }
}
