//! BVH Common

use gvpm_core::base::*;
use gvpm_core::geometry::*;
use shared_arena::ArenaArc;

/// Anything with a world space bounding box can be stored in a `BVHAccel`.
pub trait BVHPrimitive {
    /// Returns the bounding box of the primitive.
    fn bounds(&self) -> Bounds3f;
}

impl BVHPrimitive for Point3f {
    fn bounds(&self) -> Bounds3f {
        Bounds3f::from(*self)
    }
}

impl BVHPrimitive for Bounds3f {
    fn bounds(&self) -> Bounds3f {
        *self
    }
}

/// Splitting method to use to subdivide primitives.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SplitMethod {
    /// Surface Area Heuristic.
    #[default]
    SAH,

    /// Splitting planes at the midpoint of the centroid bounds.
    Middle,

    /// Partition primitives into equally sized subsets along the chosen axis.
    EqualCounts,
}

impl SplitMethod {
    /// Parse a split method name, falling back to SAH.
    ///
    /// * `name` - One of `sah`, `middle` or `equal`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "sah" => Self::SAH,
            "middle" => Self::Middle,
            "equal" => Self::EqualCounts,
            other => {
                warn!("BVH split method '{}' unknown. Using 'sah'.", other);
                Self::SAH
            }
        }
    }
}

/// SAH bucket information.
#[derive(Copy, Clone, Debug)]
pub struct BucketInfo {
    /// Count of primitives.
    pub count: usize,

    /// Bounding box for the bucket.
    pub bounds: Bounds3f,
}

impl Default for BucketInfo {
    fn default() -> Self {
        Self {
            count: 0,
            bounds: Bounds3f::EMPTY,
        }
    }
}

/// Build time information about a primitive.
#[derive(Copy, Clone, Debug)]
pub struct BVHPrimitiveInfo {
    /// Index into the unordered input primitives.
    pub primitive_number: usize,

    /// The bounding box of primitive.
    pub bounds: Bounds3f,

    /// The centroid of bounding box of primitive.
    pub centroid: Point3f,
}

impl BVHPrimitiveInfo {
    /// Create a `BVHPrimitiveInfo`.
    ///
    /// * `primitive_number` - Index into the unordered input primitives.
    /// * `bounds`           - The bounding box of primitive.
    pub fn new(primitive_number: usize, bounds: Bounds3f) -> Self {
        Self {
            primitive_number,
            bounds,
            centroid: (bounds.p_min + bounds.p_max) * 0.5,
        }
    }
}

/// Node of the tree while it is being built.
#[derive(Clone)]
pub struct BVHBuildNode {
    /// Bounding box of all children beneath this node.
    pub bounds: Bounds3f,

    /// Children of this node.
    pub children: [Option<ArenaArc<BVHBuildNode>>; 2],

    /// Axis along which primitives are partitioned between the two children.
    pub split_axis: Axis,

    /// Index of first ordered primitive stored at this node.
    pub first_prim_offset: usize,

    /// Number of primitives stored at this node.
    pub n_primitives: usize,
}

impl BVHBuildNode {
    /// Create a leaf BVH node.
    ///
    /// * `first`  - Index of first ordered primitive stored at this node.
    /// * `n`      - Number of primitives stored at this node.
    /// * `bounds` - Bounding box.
    pub fn new_leaf_node(first: usize, n: usize, bounds: Bounds3f) -> Self {
        Self {
            first_prim_offset: first,
            n_primitives: n,
            bounds,
            children: [None, None],
            split_axis: Axis::default(),
        }
    }

    /// Create an interior BVH node.
    ///
    /// * `axis` - Axis used for partitioning children.
    /// * `c0`   - First child.
    /// * `c1`   - Second child.
    pub fn new_interior_node(axis: Axis, c0: ArenaArc<BVHBuildNode>, c1: ArenaArc<BVHBuildNode>) -> Self {
        Self {
            first_prim_offset: 0,
            n_primitives: 0,
            bounds: c0.bounds.union(&c1.bounds),
            children: [Some(c0), Some(c1)],
            split_axis: axis,
        }
    }
}

/// Flattened node used during traversal.
#[derive(Copy, Clone, Debug)]
pub struct LinearBVHNode {
    /// Bounding box for the node.
    pub bounds: Bounds3f,

    /// For leaf nodes, offset for the primitives in the node. For interior nodes, offset to the second child.
    pub offset: u32,

    /// For leaf nodes, the number of primitives in the node. For interior nodes, 0.
    pub n_primitives: u32,

    /// For interior nodes, which coordinate axis was used for partitioning.
    pub axis: u8,
}

impl Default for LinearBVHNode {
    fn default() -> Self {
        Self {
            bounds: Bounds3f::EMPTY,
            offset: 0,
            n_primitives: 0,
            axis: 0,
        }
    }
}

impl LinearBVHNode {
    /// Creates a leaf node.
    ///
    /// * `bounds`       - Bounding box for the node.
    /// * `offset`       - Offset for primitives in the node.
    /// * `n_primitives` - Number of primitives in the node.
    pub fn new_leaf_node(bounds: Bounds3f, offset: u32, n_primitives: u32) -> Self {
        Self {
            bounds,
            offset,
            n_primitives,
            axis: 0,
        }
    }

    /// Creates an interior node.
    ///
    /// * `bounds` - Bounding box for the node.
    /// * `offset` - Offset to the second child.
    /// * `axis`   - Axis used for partitioning.
    pub fn new_interior_node(bounds: Bounds3f, offset: u32, axis: u8) -> Self {
        Self {
            bounds,
            offset,
            axis,
            n_primitives: 0,
        }
    }

    /// Returns true for leaf nodes.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.n_primitives > 0
    }
}
