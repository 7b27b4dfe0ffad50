//! Bounding Volume Hierarchy.

use gvpm_core::base::*;
use gvpm_core::geometry::*;

mod common;
mod sah;

pub use common::*;
use sah::BuildContext;
use shared_arena::{ArenaArc, SharedArena};

/// Bounding Volume Hierarchy over any primitive type with bounds.
pub struct BVHAccel<P> {
    /// The primitives, ordered so that leaves reference contiguous ranges.
    primitives: Vec<P>,

    /// Spliting method.
    pub split_method: SplitMethod,

    /// The list of nodes.
    nodes: Vec<LinearBVHNode>,
}

impl<P: BVHPrimitive> BVHAccel<P> {
    /// Create a new Bounding Volume Hierarchy.
    ///
    /// * `primitives`        - The primitives.
    /// * `max_prims_in_node` - Maximum number of primitives in a node.
    /// * `split_method`      - The splitting method.
    pub fn new(primitives: Vec<P>, max_prims_in_node: usize, split_method: SplitMethod) -> Self {
        let n_primitives = primitives.len();
        if n_primitives == 0 {
            return Self {
                primitives,
                split_method,
                nodes: vec![],
            };
        }

        let mut primitive_info: Vec<BVHPrimitiveInfo> = primitives
            .iter()
            .enumerate()
            .map(|(i, p)| BVHPrimitiveInfo::new(i, p.bounds()))
            .collect();

        let arena = SharedArena::<BVHBuildNode>::with_capacity(1024);
        let mut ctx = BuildContext {
            arena: &arena,
            split_method,
            max_prims_in_node: max_prims_in_node.max(1),
            total_nodes: 0,
            ordered: Vec::with_capacity(n_primitives),
        };
        let root = sah::build(&mut ctx, &mut primitive_info, 0, n_primitives);

        let (arena_used, _arena_free) = arena.stats();
        debug!(
            "BVH created with {} nodes for {} primitives ({:.2} MB), arena allocated {} nodes",
            ctx.total_nodes,
            n_primitives,
            (ctx.total_nodes * std::mem::size_of::<LinearBVHNode>()) as f32 / (1024.0 * 1024.0),
            arena_used,
        );

        // Compute representation of depth-first traversal of BVH tree.
        let mut nodes = vec![LinearBVHNode::default(); ctx.total_nodes];
        let mut offset = 0_u32;
        Self::flatten_bvh_tree(root, &mut nodes, &mut offset);
        debug_assert!(ctx.total_nodes == offset as usize);

        // Move primitives into leaf order.
        let mut slots: Vec<Option<P>> = primitives.into_iter().map(Some).collect();
        let primitives = ctx.ordered.iter().filter_map(|&i| slots[i].take()).collect();

        Self {
            primitives,
            split_method,
            nodes,
        }
    }

    /// Flatten the tree to the linear representation.
    ///
    /// * `node`   - The node.
    /// * `nodes`  - The flattened nodes.
    /// * `offset` - Tracks current offset into `nodes`.
    fn flatten_bvh_tree(node: ArenaArc<BVHBuildNode>, nodes: &mut Vec<LinearBVHNode>, offset: &mut u32) -> u32 {
        let my_offset = *offset;
        *offset += 1;

        if node.n_primitives > 0 {
            nodes[my_offset as usize] =
                LinearBVHNode::new_leaf_node(node.bounds, node.first_prim_offset as u32, node.n_primitives as u32);
        } else {
            if let Some(child) = node.children[0].clone() {
                Self::flatten_bvh_tree(child, nodes, offset);
            }
            if let Some(child) = node.children[1].clone() {
                let second_child_offset = Self::flatten_bvh_tree(child, nodes, offset);
                nodes[my_offset as usize] =
                    LinearBVHNode::new_interior_node(node.bounds, second_child_offset, node.split_axis.into());
            }
        }

        my_offset
    }
}

impl<P> BVHAccel<P> {
    /// Returns the number of primitives.
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    /// Returns true if there are no primitives.
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Returns the primitives in storage order.
    pub fn primitives(&self) -> &[P] {
        &self.primitives
    }

    /// Returns a bounding box of all primitives.
    pub fn world_bound(&self) -> Bounds3f {
        self.nodes.first().map_or(Bounds3f::EMPTY, |n| n.bounds)
    }

    /// Visits every primitive whose bounds pass the node test. The callback
    /// receives each candidate once.
    ///
    /// * `node_test` - Returns true if a node's bounds may hold results.
    /// * `f`         - Callback for each candidate primitive.
    fn traverse<T, F>(&self, mut node_test: T, mut f: F)
    where
        T: FnMut(&Bounds3f, &LinearBVHNode) -> TraversalOrder,
        F: FnMut(&P),
    {
        if self.nodes.is_empty() {
            return;
        }

        let mut nodes_to_visit: Vec<usize> = Vec::with_capacity(64);
        let mut current_node_index = 0;
        loop {
            let node = &self.nodes[current_node_index];
            match node_test(&node.bounds, node) {
                TraversalOrder::Skip => {}
                _ if node.is_leaf() => {
                    let first = node.offset as usize;
                    for p in &self.primitives[first..first + node.n_primitives as usize] {
                        f(p);
                    }
                }
                TraversalOrder::NearFirst => {
                    nodes_to_visit.push(node.offset as usize);
                    current_node_index += 1;
                    continue;
                }
                TraversalOrder::FarFirst => {
                    nodes_to_visit.push(current_node_index + 1);
                    current_node_index = node.offset as usize;
                    continue;
                }
            }
            match nodes_to_visit.pop() {
                Some(next) => current_node_index = next,
                None => break,
            }
        }
    }

    /// Visits every primitive whose bounds the ray overlaps within
    /// `[0, ray.t_max]`.
    ///
    /// * `ray` - The ray.
    /// * `f`   - Callback for each candidate primitive.
    pub fn query_ray<F: FnMut(&P)>(&self, ray: &Ray, f: F) {
        let inv_dir = Vector3f::new(1.0 / ray.d.x, 1.0 / ray.d.y, 1.0 / ray.d.z);
        let dir_is_neg = [
            (inv_dir.x < 0.0) as usize,
            (inv_dir.y < 0.0) as usize,
            (inv_dir.z < 0.0) as usize,
        ];
        self.traverse(
            |bounds, node| {
                if !bounds.intersect_p_inv(ray, &inv_dir, dir_is_neg) {
                    TraversalOrder::Skip
                } else if dir_is_neg[node.axis as usize] == 1 {
                    TraversalOrder::FarFirst
                } else {
                    TraversalOrder::NearFirst
                }
            },
            f,
        );
    }

    /// Visits every primitive whose bounds are within `radius` of `center`.
    ///
    /// * `center` - Query center.
    /// * `radius` - Query radius.
    /// * `f`      - Callback for each candidate primitive.
    pub fn query_sphere<F: FnMut(&P)>(&self, center: &Point3f, radius: Float, f: F) {
        let r2 = radius * radius;
        self.traverse(
            |bounds, _| {
                if bounds.distance_squared(center) <= r2 {
                    TraversalOrder::NearFirst
                } else {
                    TraversalOrder::Skip
                }
            },
            f,
        );
    }

    /// Visits every primitive whose bounds contain `p`.
    ///
    /// * `p` - The point.
    /// * `f` - Callback for each candidate primitive.
    pub fn query_point<F: FnMut(&P)>(&self, p: &Point3f, f: F) {
        self.traverse(
            |bounds, _| {
                if bounds.contains(p) {
                    TraversalOrder::NearFirst
                } else {
                    TraversalOrder::Skip
                }
            },
            f,
        );
    }
}

/// What to do with a node during traversal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum TraversalOrder {
    /// Node cannot hold results.
    Skip,

    /// Visit the first child before the second.
    NearFirst,

    /// Visit the second child before the first.
    FarFirst,
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
