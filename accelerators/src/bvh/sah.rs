//! Surface Area Heuristic Algorithm

use super::common::*;
use gvpm_core::base::*;
use gvpm_core::geometry::*;
use order_stat::kth_by;
use shared_arena::{ArenaArc, SharedArena};
use std::cmp::Ordering;

const N_BUCKETS: usize = 12;

/// Build state shared across the recursion.
pub struct BuildContext<'a> {
    /// Arena the build nodes are allocated from.
    pub arena: &'a SharedArena<BVHBuildNode>,

    /// Middle | EqualCounts | SAH.
    pub split_method: SplitMethod,

    /// Maximum primitives allowed in a leaf before SAH forces a split.
    pub max_prims_in_node: usize,

    /// Total number of nodes created.
    pub total_nodes: usize,

    /// Primitive indices ordered so that leaves occupy contiguous ranges.
    pub ordered: Vec<usize>,
}

/// Recursively build the BVH structure for the primitives in
/// `primitive_info[start..end]`.
///
/// * `ctx`            - Build state.
/// * `primitive_info` - Primitive information.
/// * `start`          - Starting index. For first call it should be 0.
/// * `end`            - Ending index + 1.
pub fn build(
    ctx: &mut BuildContext,
    primitive_info: &mut [BVHPrimitiveInfo],
    start: usize,
    end: usize,
) -> ArenaArc<BVHBuildNode> {
    // Compute bounds of all primitives in BVH node.
    let bounds = primitive_info[start..end]
        .iter()
        .fold(Bounds3f::EMPTY, |b, info| b.union(&info.bounds));

    let n_primitives = end - start;
    let mut dim = Axis::default();

    let interior_midpoint = if n_primitives == 1 {
        None
    } else {
        let centroid_bounds = primitive_info[start..end]
            .iter()
            .fold(Bounds3f::EMPTY, |b, info| b.union(&info.centroid));
        dim = centroid_bounds.maximum_extent();

        if centroid_bounds.p_max[dim] == centroid_bounds.p_min[dim] {
            // All centroids coincide.
            None
        } else {
            match ctx.split_method {
                SplitMethod::Middle => Some(split_middle(primitive_info, start, end, dim, &centroid_bounds)),
                SplitMethod::EqualCounts => Some(split_equal_counts(primitive_info, start, end, dim)),
                SplitMethod::SAH => split_sah(
                    primitive_info,
                    start,
                    end,
                    dim,
                    &centroid_bounds,
                    &bounds,
                    ctx.max_prims_in_node,
                ),
            }
        }
    };

    ctx.total_nodes += 1;
    match interior_midpoint {
        Some(mid) => {
            let c0 = build(ctx, primitive_info, start, mid);
            let c1 = build(ctx, primitive_info, mid, end);
            ctx.arena.alloc_arc(BVHBuildNode::new_interior_node(dim, c0, c1))
        }
        None => {
            let first_prim_offset = ctx.ordered.len();
            ctx.ordered
                .extend(primitive_info[start..end].iter().map(|info| info.primitive_number));
            ctx.arena
                .alloc_arc(BVHBuildNode::new_leaf_node(first_prim_offset, n_primitives, bounds))
        }
    }
}

/// Split at the midpoint of the centroid bounds along `dim`.
///
/// * `primitive_info`  - All primitive info.
/// * `start`           - Starting index in primitive_info.
/// * `end`             - Ending index + 1 in primitive_info.
/// * `dim`             - Axis used to partition primitives.
/// * `centroid_bounds` - Bounds of the centroids in `start..end`.
fn split_middle(
    primitive_info: &mut [BVHPrimitiveInfo],
    start: usize,
    end: usize,
    dim: Axis,
    centroid_bounds: &Bounds3f,
) -> usize {
    let pmid = (centroid_bounds.p_min[dim] + centroid_bounds.p_max[dim]) / 2.0;
    let split = itertools::partition(primitive_info[start..end].iter_mut(), |pi| pi.centroid[dim] < pmid);
    let mid = start + split;

    if mid != start && mid != end {
        mid
    } else {
        split_equal_counts(primitive_info, start, end, dim)
    }
}

/// Split into two equally sized halves ordered by centroid along `dim`.
///
/// * `primitive_info` - All primitive info.
/// * `start`          - Starting index in primitive_info.
/// * `end`            - Ending index + 1 in primitive_info.
/// * `dim`            - Axis used to partition primitives.
fn split_equal_counts(primitive_info: &mut [BVHPrimitiveInfo], start: usize, end: usize, dim: Axis) -> usize {
    let mid = (start + end) / 2;
    kth_by(&mut primitive_info[start..end], mid - start, |a, b| {
        a.centroid[dim].partial_cmp(&b.centroid[dim]).unwrap_or(Ordering::Equal)
    });
    mid
}

/// Returns the SAH bucket a centroid falls into.
#[inline]
fn bucket_index(centroid_bounds: &Bounds3f, centroid: &Point3f, dim: Axis) -> usize {
    let b = (N_BUCKETS as Float * centroid_bounds.offset(centroid)[dim]) as usize;
    min(b, N_BUCKETS - 1)
}

/// Partition primitives using the Surface Area Heuristic. Returns the pivot
/// for an interior node or `None` when a leaf is cheaper.
///
/// * `primitive_info`    - All primitive info.
/// * `start`             - Start index in primitive_info.
/// * `end`               - End index in primitive_info.
/// * `dim`               - Axis used to partition primitives.
/// * `centroid_bounds`   - Bounds of the centroids in `start..end`.
/// * `bounds`            - Bounds of all primitives in the node.
/// * `max_prims_in_node` - Maximum primitives allowed in a leaf.
fn split_sah(
    primitive_info: &mut [BVHPrimitiveInfo],
    start: usize,
    end: usize,
    dim: Axis,
    centroid_bounds: &Bounds3f,
    bounds: &Bounds3f,
    max_prims_in_node: usize,
) -> Option<usize> {
    let n_primitives = end - start;
    if n_primitives <= 2 {
        return Some(split_equal_counts(primitive_info, start, end, dim));
    }

    let mut buckets = [BucketInfo::default(); N_BUCKETS];
    for info in primitive_info[start..end].iter() {
        let b = bucket_index(centroid_bounds, &info.centroid, dim);
        buckets[b].count += 1;
        buckets[b].bounds = buckets[b].bounds.union(&info.bounds);
    }

    // Sweep from both ends so each split cost is computed in constant time.
    let mut below = [(0_usize, Bounds3f::EMPTY); N_BUCKETS - 1];
    let mut acc = (0_usize, Bounds3f::EMPTY);
    for (i, bucket) in buckets.iter().take(N_BUCKETS - 1).enumerate() {
        acc = (acc.0 + bucket.count, acc.1.union(&bucket.bounds));
        below[i] = acc;
    }

    // Degenerate (zero area) nodes hold points; fall back to counts.
    let total_area = bounds.surface_area();
    let mut min_cost = INFINITY;
    let mut min_cost_split_bucket = 0;
    let mut above = (0_usize, Bounds3f::EMPTY);
    for i in (0..N_BUCKETS - 1).rev() {
        above = (above.0 + buckets[i + 1].count, above.1.union(&buckets[i + 1].bounds));
        let (count0, b0) = below[i];
        let (count1, b1) = above;
        if count0 == 0 || count1 == 0 {
            continue;
        }
        let cost = if total_area > 0.0 {
            1.0 + (count0 as Float * b0.surface_area() + count1 as Float * b1.surface_area()) / total_area
        } else {
            1.0 + max(count0, count1) as Float
        };
        if cost < min_cost {
            min_cost = cost;
            min_cost_split_bucket = i;
        }
    }

    if min_cost == INFINITY {
        return Some(split_equal_counts(primitive_info, start, end, dim));
    }

    let leaf_cost = n_primitives as Float;
    if n_primitives > max_prims_in_node || min_cost < leaf_cost {
        let split = itertools::partition(primitive_info[start..end].iter_mut(), |pi| {
            bucket_index(centroid_bounds, &pi.centroid, dim) <= min_cost_split_bucket
        });
        Some(start + split)
    } else {
        None
    }
}
