//! Flat, frame-agnostic index over partition shapes.
//!
//! A [`GlobalIndex`] is bulk-loaded once and then only read. Queries scan the
//! stored shapes linearly, in storage order.
//!
//! ```rust
//! use spatio_frames::{BoundingBox2D, GlobalIndex};
//!
//! let mut index = GlobalIndex::new();
//! index.bulk_load(&[
//!     BoundingBox2D::new(0.0, 0.0, 1.0, 1.0),
//!     BoundingBox2D::new(5.0, 5.0, 6.0, 6.0),
//!     BoundingBox2D::new(9.0, 0.0, 10.0, 1.0),
//! ]);
//!
//! let hits = index.range_count(&BoundingBox2D::new(0.5, 0.5, 5.5, 5.5));
//! assert_eq!(hits, 2);
//!
//! let nearest = index.knn(9.5, 2.0, 1)?;
//! assert_eq!(nearest[0].1, 1.0);
//! # Ok::<(), spatio_frames::FrameError>(())
//! ```

pub mod join;
pub mod shape;

pub use join::{JoinKernel, PlaneSweepJoin, RTreeJoin};
pub use shape::Shape;

use crate::codec::{BinaryRecord, read_u8, read_u32};
use crate::error::{FrameError, Result};
use bytes::{Buf, BufMut};
use once_cell::sync::OnceCell;
use spatio_frames_types::BoundingBox2D;
use std::cmp::Ordering;
use std::f64::consts::PI;

const FLAG_COMPACT: u8 = 0b0000_0001;
const FLAG_REPLICATED: u8 = 0b0000_0010;

#[derive(Debug, Clone)]
pub struct GlobalIndex<S> {
    shapes: Vec<S>,
    compact: bool,
    replicated: bool,
    mbr: OnceCell<Option<BoundingBox2D>>,
}

impl<S> Default for GlobalIndex<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> GlobalIndex<S> {
    pub fn new() -> Self {
        Self {
            shapes: Vec::new(),
            compact: false,
            replicated: false,
            mbr: OnceCell::new(),
        }
    }

    /// Build an index that takes ownership of `shapes`.
    pub fn from_shapes(shapes: Vec<S>) -> Self {
        Self {
            shapes,
            ..Self::new()
        }
    }

    /// Replace the stored shapes with a copy of `shapes`.
    pub fn bulk_load(&mut self, shapes: &[S])
    where
        S: Clone,
    {
        self.shapes = shapes.to_vec();
        self.mbr = OnceCell::new();
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Partitions are minimal covers of their contents.
    pub fn is_compact(&self) -> bool {
        self.compact
    }

    pub fn set_compact(&mut self, compact: bool) {
        self.compact = compact;
    }

    /// A record may live in more than one partition.
    pub fn is_replicated(&self) -> bool {
        self.replicated
    }

    pub fn set_replicated(&mut self, replicated: bool) {
        self.replicated = replicated;
    }

    /// Stored shapes in storage order. Restartable: every call starts over.
    pub fn iter(&self) -> std::slice::Iter<'_, S> {
        self.shapes.iter()
    }

    pub fn shapes(&self) -> &[S] {
        &self.shapes
    }
}

impl<S: Shape> GlobalIndex<S> {
    /// Hand every shape strictly overlapping `query` to `collect`, in storage
    /// order, and return how many matched.
    pub fn range_query<'a, F>(&'a self, query: &BoundingBox2D, mut collect: F) -> usize
    where
        F: FnMut(&'a S),
    {
        let mut matches = 0;
        for shape in &self.shapes {
            if shape.intersects(query) {
                collect(shape);
                matches += 1;
            }
        }
        matches
    }

    pub fn range_count(&self, query: &BoundingBox2D) -> usize {
        self.shapes
            .iter()
            .filter(|shape| shape.intersects(query))
            .count()
    }

    pub fn range(&self, query: &BoundingBox2D) -> Vec<&S> {
        let mut found = Vec::new();
        self.range_query(query, |shape| found.push(shape));
        found
    }

    /// Rectangle enclosing every stored shape, `None` when empty.
    pub fn mbr(&self) -> Option<BoundingBox2D> {
        *self.mbr.get_or_init(|| {
            self.shapes
                .iter()
                .map(|shape| shape.mbr())
                .reduce(|acc, mbr| acc.union(&mbr))
        })
    }

    /// The `k` shapes closest to `(qx, qy)`, nearest first, with their
    /// distances.
    ///
    /// The search starts with the radius expected to hold `k` shapes under a
    /// uniform density and grows it until the `k`-th candidate lies inside
    /// the window. Fewer than `k` results come back only when the index holds
    /// fewer shapes. Equal distances keep storage order.
    pub fn knn(&self, qx: f64, qy: f64, k: usize) -> Result<Vec<(&S, f64)>> {
        if k == 0 {
            return Err(FrameError::InvalidInput(
                "k must be greater than zero".into(),
            ));
        }
        if !qx.is_finite() || !qy.is_finite() {
            return Err(FrameError::InvalidInput(format!(
                "query point ({}, {}) is not finite",
                qx, qy
            )));
        }
        if self.shapes.is_empty() {
            return Ok(Vec::new());
        }

        let total = self.shapes.len();
        let mut radius = self.initial_radius(k);

        loop {
            let window = BoundingBox2D::around(qx, qy, radius);
            let mut candidates: Vec<(&S, f64)> = Vec::new();
            self.range_query(&window, |shape| {
                candidates.push((shape, shape.distance_to(qx, qy)));
            });
            candidates.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

            let exhausted = candidates.len() == total || radius.is_infinite();
            if candidates.len() >= k {
                let kth = candidates[k - 1].1;
                if kth <= radius || exhausted {
                    candidates.truncate(k);
                    return Ok(candidates);
                }
                log::trace!(
                    "kNN radius {} too small for k-th distance {}, retrying",
                    radius,
                    kth
                );
                radius = kth;
            } else if exhausted {
                return Ok(candidates);
            } else {
                log::trace!(
                    "kNN radius {} found {} of {} candidates, doubling",
                    radius,
                    candidates.len(),
                    k
                );
                radius *= 2.0;
            }
        }
    }

    /// `sqrt(k * area / (pi * n))`, falling back to half the larger MBR side
    /// and then to 1.0 when that is not a positive finite number.
    fn initial_radius(&self, k: usize) -> f64 {
        let Some(mbr) = self.mbr() else {
            return 1.0;
        };

        let density_radius = (k as f64 * mbr.area() / (PI * self.shapes.len() as f64)).sqrt();
        if density_radius.is_finite() && density_radius > 0.0 {
            return density_radius;
        }

        let side_radius = mbr.width().max(mbr.height()) / 2.0;
        if side_radius.is_finite() && side_radius > 0.0 {
            return side_radius;
        }

        1.0
    }

    /// Join this index with `other` using `kernel`; see [`spatial_join`].
    pub fn join_with<T, K, F>(&self, other: &GlobalIndex<T>, kernel: &K, emit: F) -> usize
    where
        T: Shape,
        K: JoinKernel,
        F: FnMut(&S, &T),
    {
        spatial_join(self, other, kernel, emit)
    }
}

/// Pair every shape of `left` with every strictly overlapping shape of
/// `right`. Returns the number of pairs handed to `emit`.
pub fn spatial_join<A, B, K, F>(
    left: &GlobalIndex<A>,
    right: &GlobalIndex<B>,
    kernel: &K,
    emit: F,
) -> usize
where
    A: Shape,
    B: Shape,
    K: JoinKernel,
    F: FnMut(&A, &B),
{
    kernel.join(&left.shapes, &right.shapes, emit)
}

impl<'a, S> IntoIterator for &'a GlobalIndex<S> {
    type Item = &'a S;
    type IntoIter = std::slice::Iter<'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.shapes.iter()
    }
}

impl<S> FromIterator<S> for GlobalIndex<S> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_shapes(iter.into_iter().collect())
    }
}

impl<S: BinaryRecord> BinaryRecord for GlobalIndex<S> {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        let count = u32::try_from(self.shapes.len()).map_err(|_| {
            FrameError::InvalidInput(format!("{} shapes cannot be encoded", self.shapes.len()))
        })?;

        let mut flags = 0u8;
        if self.compact {
            flags |= FLAG_COMPACT;
        }
        if self.replicated {
            flags |= FLAG_REPLICATED;
        }

        buf.put_u8(flags);
        buf.put_u32(count);
        for shape in &self.shapes {
            shape.encode(buf)?;
        }
        Ok(())
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let flags = read_u8(buf, "global index flags")?;
        if flags & !(FLAG_COMPACT | FLAG_REPLICATED) != 0 {
            return Err(FrameError::MalformedIndexFile(format!(
                "unknown global index flags {:#010b}",
                flags
            )));
        }

        let count = read_u32(buf, "global index count")? as usize;
        // Every record takes at least one byte.
        let mut shapes = Vec::with_capacity(count.min(buf.remaining()));
        for _ in 0..count {
            shapes.push(S::decode(buf)?);
        }

        let mut index = Self::from_shapes(shapes);
        index.compact = flags & FLAG_COMPACT != 0;
        index.replicated = flags & FLAG_REPLICATED != 0;
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::micro_index::{DataRef, MicroIndex};

    fn points(coords: &[(f64, f64)]) -> Vec<BoundingBox2D> {
        coords
            .iter()
            .map(|&(x, y)| BoundingBox2D::from_point(x, y))
            .collect()
    }

    #[test]
    fn test_bulk_load_copies_input() {
        let mut source = vec![BoundingBox2D::new(0.0, 0.0, 1.0, 1.0)];
        let mut index = GlobalIndex::new();
        index.bulk_load(&source);
        source[0] = BoundingBox2D::new(50.0, 50.0, 51.0, 51.0);
        assert_eq!(index.shapes()[0], BoundingBox2D::new(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_range_query_strict_overlap() {
        let index = GlobalIndex::from_shapes(vec![
            BoundingBox2D::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox2D::new(12.0, 12.0, 18.0, 18.0),
            BoundingBox2D::new(30.0, 30.0, 40.0, 40.0),
        ]);

        let mut seen = Vec::new();
        let count = index.range_query(&BoundingBox2D::new(10.0, 10.0, 20.0, 20.0), |s| {
            seen.push(*s)
        });
        assert_eq!(count, 1);
        assert_eq!(seen, vec![BoundingBox2D::new(12.0, 12.0, 18.0, 18.0)]);
    }

    #[test]
    fn test_mbr_reset_on_bulk_load() {
        let mut index: GlobalIndex<BoundingBox2D> = GlobalIndex::new();
        assert_eq!(index.mbr(), None);

        index.bulk_load(&[
            BoundingBox2D::new(0.0, 0.0, 1.0, 1.0),
            BoundingBox2D::new(-3.0, 2.0, -1.0, 5.0),
        ]);
        assert_eq!(index.mbr(), Some(BoundingBox2D::new(-3.0, 0.0, 1.0, 5.0)));

        index.bulk_load(&[BoundingBox2D::new(7.0, 7.0, 8.0, 8.0)]);
        assert_eq!(index.mbr(), Some(BoundingBox2D::new(7.0, 7.0, 8.0, 8.0)));
    }

    #[test]
    fn test_knn_rejects_zero_k() {
        let index = GlobalIndex::from_shapes(points(&[(0.0, 0.0)]));
        assert!(matches!(
            index.knn(0.0, 0.0, 0),
            Err(FrameError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_knn_empty_index() {
        let index: GlobalIndex<BoundingBox2D> = GlobalIndex::new();
        assert!(index.knn(1.0, 1.0, 3).unwrap().is_empty());
    }

    #[test]
    fn test_knn_ascending() {
        let index = GlobalIndex::from_shapes(points(&[
            (5.0, 0.0),
            (0.0, 2.0),
            (-4.0, 0.0),
            (1.0, 0.0),
            (0.0, -3.0),
        ]));
        let result = index.knn(0.0, 0.0, 3).unwrap();
        let distances: Vec<f64> = result.iter().map(|(_, d)| *d).collect();
        assert_eq!(distances, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_knn_grows_past_dense_cluster() {
        // Most shapes sit in a far cluster, so the first window holds one.
        let mut coords: Vec<(f64, f64)> = (0..50)
            .map(|i| (1000.0 + i as f64 * 0.01, 1000.0))
            .collect();
        coords.push((0.0, 0.5));
        coords.push((0.0, 900.0));
        let index = GlobalIndex::from_shapes(points(&coords));

        let result = index.knn(0.0, 0.0, 2).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].1, 0.5);
        assert_eq!(result[1].1, 900.0);
    }

    #[test]
    fn test_knn_coincident_points() {
        let index = GlobalIndex::from_shapes(points(&[(2.0, 2.0), (2.0, 2.0), (2.0, 2.0)]));
        let result = index.knn(0.0, 0.0, 2).unwrap();
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|(_, d)| (*d - 8f64.sqrt()).abs() < 1e-12));
    }

    #[test]
    fn test_iteration_restartable() {
        let index: GlobalIndex<BoundingBox2D> =
            points(&[(1.0, 1.0), (2.0, 2.0)]).into_iter().collect();
        assert_eq!(index.iter().count(), 2);
        assert_eq!((&index).into_iter().count(), 2);
        let first: Vec<_> = index.iter().collect();
        let second: Vec<_> = index.iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_binary_keeps_flags() {
        let mut index = GlobalIndex::from_shapes(vec![MicroIndex::new(
            4,
            BoundingBox2D::new(0.0, 0.0, 2.0, 2.0),
            DataRef::new(0, 64),
        )]);
        index.set_compact(true);

        let bytes = index.to_bytes().unwrap();
        let decoded = GlobalIndex::<MicroIndex>::from_bytes(&bytes).unwrap();
        assert!(decoded.is_compact());
        assert!(!decoded.is_replicated());
        assert_eq!(decoded.shapes(), index.shapes());
    }

    #[test]
    fn test_binary_rejects_unknown_flags() {
        let bytes = [0x80u8, 0, 0, 0, 0];
        assert!(GlobalIndex::<MicroIndex>::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_join_delegates_to_kernel() {
        let a = GlobalIndex::from_shapes(vec![BoundingBox2D::new(0.0, 0.0, 2.0, 2.0)]);
        let b = GlobalIndex::from_shapes(vec![
            BoundingBox2D::new(1.0, 1.0, 3.0, 3.0),
            BoundingBox2D::new(2.0, 0.0, 3.0, 1.0),
        ]);
        let mut pairs = 0;
        assert_eq!(a.join_with(&b, &PlaneSweepJoin, |_, _| pairs += 1), 1);
        assert_eq!(pairs, 1);
        assert_eq!(spatial_join(&a, &b, &RTreeJoin, |_, _| {}), 1);
    }
}
