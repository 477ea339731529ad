//! Tagged node-reference handles and the narrow read-only interface the
//! core consumes to walk a caller-owned tree. Construction and storage of
//! the tree itself are a collaborator's concern; the core only ever asks
//! "what are this node's children" or "what primitives does this leaf own".

use bitflags::bitflags;

use crate::lane::Lane4;

const TAG_BITS: u32 = 3;
const TAG_MASK: u32 = (1 << TAG_BITS) - 1;

const TAG_EMPTY: u32 = 0;
const TAG_SENTINEL: u32 = 1;
const TAG_LEAF: u32 = 2;
const TAG_STATIC_INTERNAL: u32 = 3;
const TAG_MOTION_BLUR_INTERNAL: u32 = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeTag {
    Empty,
    Sentinel,
    Leaf,
    StaticInternal,
    MotionBlurInternal,
}

/// A tagged handle: the low bits carry a [`NodeTag`], the rest an index into
/// whatever arena the collaborator uses to store nodes of that kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NodeRef(u32);

impl NodeRef {
    pub const EMPTY: NodeRef = NodeRef(TAG_EMPTY);
    pub const SENTINEL: NodeRef = NodeRef(TAG_SENTINEL);

    pub fn leaf(index: u32) -> Self {
        NodeRef((index << TAG_BITS) | TAG_LEAF)
    }

    pub fn static_internal(index: u32) -> Self {
        NodeRef((index << TAG_BITS) | TAG_STATIC_INTERNAL)
    }

    pub fn motion_blur_internal(index: u32) -> Self {
        NodeRef((index << TAG_BITS) | TAG_MOTION_BLUR_INTERNAL)
    }

    pub fn tag(self) -> NodeTag {
        match self.0 & TAG_MASK {
            TAG_EMPTY => NodeTag::Empty,
            TAG_SENTINEL => NodeTag::Sentinel,
            TAG_LEAF => NodeTag::Leaf,
            TAG_STATIC_INTERNAL => NodeTag::StaticInternal,
            TAG_MOTION_BLUR_INTERNAL => NodeTag::MotionBlurInternal,
            other => panic!("malformed node reference tag {other}"),
        }
    }

    pub fn index(self) -> u32 {
        self.0 >> TAG_BITS
    }

    pub fn is_empty(self) -> bool {
        self.0 == TAG_EMPTY
    }

    pub fn is_sentinel(self) -> bool {
        self.0 == TAG_SENTINEL
    }

    pub fn is_leaf(self) -> bool {
        self.tag() == NodeTag::Leaf
    }

    pub fn is_internal(self) -> bool {
        matches!(self.tag(), NodeTag::StaticInternal | NodeTag::MotionBlurInternal)
    }
}

bitflags! {
    /// Compile-time selection of which internal node variants a
    /// [`crate::config::TraversalConfig`] specialization compiles support
    /// for. Branches for disabled variants are dead code in that
    /// monomorphization.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct NodeTypesMask: u8 {
        const STATIC_INTERNAL = 0b0001;
        const MOTION_BLUR_INTERNAL = 0b0010;
    }
}

impl NodeTypesMask {
    pub const ALL: NodeTypesMask = NodeTypesMask::STATIC_INTERNAL.union(NodeTypesMask::MOTION_BLUR_INTERNAL);
}

/// Up to four children of a static internal node. `lo[axis]`/`hi[axis]` pack
/// one bound per child into a lane, so testing all four children against one
/// ray needs no unpacking; testing one child against four rays unpacks a
/// single lane.
pub struct StaticChildren {
    pub refs: [NodeRef; 4],
    pub lo: [Lane4; 3],
    pub hi: [Lane4; 3],
}

/// As [`StaticChildren`], but bounds are linear functions of ray time:
/// `lo(t) = lo + t * dlo`, `hi(t) = hi + t * dhi`.
pub struct MotionBlurChildren {
    pub refs: [NodeRef; 4],
    pub lo: [Lane4; 3],
    pub hi: [Lane4; 3],
    pub dlo: [Lane4; 3],
    pub dhi: [Lane4; 3],
}

impl MotionBlurChildren {
    /// Evaluate all four children's bounds at a shared time (used by the
    /// single-ray walker, where one ray tests four children).
    pub fn bounds_at(&self, time: Lane4) -> ([Lane4; 3], [Lane4; 3]) {
        let mut lo = self.lo;
        let mut hi = self.hi;
        for axis in 0..3 {
            lo[axis] = lo[axis] + self.dlo[axis] * time;
            hi[axis] = hi[axis] + self.dhi[axis] * time;
        }
        (lo, hi)
    }

    /// Evaluate one child's bounds at a per-lane packet time (used by the
    /// packet walker, where four rays test one child).
    pub fn child_bounds_over_time(&self, child: usize, time: Lane4) -> ([Lane4; 3], [Lane4; 3]) {
        let mut lo = [Lane4::splat(0.0); 3];
        let mut hi = [Lane4::splat(0.0); 3];
        for axis in 0..3 {
            let base_lo = Lane4::splat(self.lo[axis].get(child));
            let base_hi = Lane4::splat(self.hi[axis].get(child));
            let d_lo = Lane4::splat(self.dlo[axis].get(child));
            let d_hi = Lane4::splat(self.dhi[axis].get(child));
            lo[axis] = base_lo + d_lo * time;
            hi[axis] = base_hi + d_hi * time;
        }
        (lo, hi)
    }
}

impl StaticChildren {
    pub fn child_bounds(&self, child: usize) -> ([Lane4; 3], [Lane4; 3]) {
        let mut lo = [Lane4::splat(0.0); 3];
        let mut hi = [Lane4::splat(0.0); 3];
        for axis in 0..3 {
            lo[axis] = Lane4::splat(self.lo[axis].get(child));
            hi[axis] = Lane4::splat(self.hi[axis].get(child));
        }
        (lo, hi)
    }
}

/// Read-only tree interface. Construction, refitting and the concrete
/// in-memory layout are entirely up to the implementor; the core only ever
/// dereferences a [`NodeRef`] through these three calls.
pub trait NodeStore {
    fn static_children(&self, index: u32) -> StaticChildren;
    fn motion_blur_children(&self, index: u32) -> MotionBlurChildren;
    /// Returns `(primitive_offset, primitive_count)` for a leaf.
    fn leaf_range(&self, index: u32) -> (u32, u32);
}

/// Unpacked view over a node's children, regardless of static/motion-blur
/// variant, evaluated at the given per-lane time. `refs[i] == NodeRef::EMPTY`
/// terminates iteration early; children are packed dense-left.
pub fn read_children<N: NodeStore>(nodes: &N, node: NodeRef, time: Lane4) -> ([NodeRef; 4], [Lane4; 3], [Lane4; 3]) {
    match node.tag() {
        NodeTag::StaticInternal => {
            let c = nodes.static_children(node.index());
            (c.refs, c.lo, c.hi)
        }
        NodeTag::MotionBlurInternal => {
            let c = nodes.motion_blur_children(node.index());
            let (lo, hi) = c.bounds_at(time);
            (c.refs, lo, hi)
        }
        other => panic!("read_children called on non-internal node: {other:?}"),
    }
}
