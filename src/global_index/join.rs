//! Spatial join kernels.
//!
//! A kernel pairs every shape of one slice with every shape of another that
//! it strictly overlaps. Shapes with a NaN coordinate never match.

use super::shape::Shape;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{AABB, RTree};
use spatio_frames_types::BoundingBox2D;

pub trait JoinKernel {
    /// Call `emit` once per overlapping `(left, right)` pair and return the
    /// number of pairs.
    fn join<A, B, F>(&self, left: &[A], right: &[B], emit: F) -> usize
    where
        A: Shape,
        B: Shape,
        F: FnMut(&A, &B);
}

/// Sort both sides by `min_x` and sweep a vertical line across them.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaneSweepJoin;

/// Bulk-load the right side into an R-tree and probe it with every left
/// shape. Pairs are emitted in left order, then right order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RTreeJoin;

fn sorted_by_min_x<S: Shape>(shapes: &[S]) -> Vec<(usize, BoundingBox2D)> {
    let mut sorted: Vec<(usize, BoundingBox2D)> = shapes
        .iter()
        .map(|shape| shape.mbr())
        .enumerate()
        .filter(|(_, mbr)| !mbr.has_nan())
        .collect();
    sorted.sort_by(|a, b| a.1.min_x().total_cmp(&b.1.min_x()));
    sorted
}

impl JoinKernel for PlaneSweepJoin {
    fn join<A, B, F>(&self, left: &[A], right: &[B], mut emit: F) -> usize
    where
        A: Shape,
        B: Shape,
        F: FnMut(&A, &B),
    {
        let a = sorted_by_min_x(left);
        let b = sorted_by_min_x(right);
        let (mut i, mut j) = (0, 0);
        let mut pairs = 0;

        while i < a.len() && j < b.len() {
            if a[i].1.min_x() <= b[j].1.min_x() {
                let (ai, a_mbr) = a[i];
                for &(bk, b_mbr) in b[j..]
                    .iter()
                    .take_while(|(_, mbr)| mbr.min_x() < a_mbr.max_x())
                {
                    if a_mbr.overlaps(&b_mbr) {
                        emit(&left[ai], &right[bk]);
                        pairs += 1;
                    }
                }
                i += 1;
            } else {
                let (bj, b_mbr) = b[j];
                for &(ak, a_mbr) in a[i..]
                    .iter()
                    .take_while(|(_, mbr)| mbr.min_x() < b_mbr.max_x())
                {
                    if a_mbr.overlaps(&b_mbr) {
                        emit(&left[ak], &right[bj]);
                        pairs += 1;
                    }
                }
                j += 1;
            }
        }

        pairs
    }
}

fn envelope(mbr: &BoundingBox2D) -> AABB<[f64; 2]> {
    AABB::from_corners([mbr.min_x(), mbr.min_y()], [mbr.max_x(), mbr.max_y()])
}

impl JoinKernel for RTreeJoin {
    fn join<A, B, F>(&self, left: &[A], right: &[B], mut emit: F) -> usize
    where
        A: Shape,
        B: Shape,
        F: FnMut(&A, &B),
    {
        let entries: Vec<GeomWithData<Rectangle<[f64; 2]>, usize>> = right
            .iter()
            .map(|shape| shape.mbr())
            .enumerate()
            .filter(|(_, mbr)| !mbr.has_nan())
            .map(|(i, mbr)| {
                GeomWithData::new(
                    Rectangle::from_corners([mbr.min_x(), mbr.min_y()], [mbr.max_x(), mbr.max_y()]),
                    i,
                )
            })
            .collect();
        let tree = RTree::bulk_load(entries);

        let mut pairs = 0;
        let mut hits = Vec::new();
        for a in left {
            let a_mbr = a.mbr();
            if a_mbr.has_nan() {
                continue;
            }

            // The R-tree also reports touching envelopes; keep strict overlaps.
            hits.clear();
            hits.extend(
                tree.locate_in_envelope_intersecting(&envelope(&a_mbr))
                    .map(|entry| entry.data)
                    .filter(|&bk| a_mbr.overlaps(&right[bk].mbr())),
            );
            hits.sort_unstable();

            for &bk in &hits {
                emit(a, &right[bk]);
                pairs += 1;
            }
        }

        pairs
    }
}
