//! The ray/box slab test, generalized to four lanes. The same algebra
//! serves two parallelization axes: four rays against one box (the packet
//! walker), or one ray against four boxes (the single-ray walker) — the
//! caller decides which side is broadcast into a [`Lane4`].
//!
//! Grounded on the Williams et al. slab test used upstream for scalar
//! `Aabb::intersect`; the `min`/`max` ordering here is load-bearing in the
//! same way, since `rdir` is produced by [`crate::lane::recip_safe`] rather
//! than a raw reciprocal.

use crate::lane::{Lane4, Mask4};

/// Returns the hit mask and the per-lane near distance. `tnear`/`tfar`
/// narrow the valid range (e.g. to exclude lanes carrying an inactive ray,
/// whose invariant `tnear = +inf, tfar = -inf` makes every comparison here
/// fail without special-casing).
pub fn slab_test(
    org: [Lane4; 3],
    rdir: [Lane4; 3],
    box_lo: [Lane4; 3],
    box_hi: [Lane4; 3],
    tnear: Lane4,
    tfar: Lane4,
) -> (Mask4, Lane4) {
    let mut t_near = tnear;
    let mut t_far = tfar;
    for axis in 0..3 {
        let t0 = (box_lo[axis] - org[axis]) * rdir[axis];
        let t1 = (box_hi[axis] - org[axis]) * rdir[axis];
        t_near = t_near.max(t0.min(t1));
        t_far = t_far.min(t0.max(t1));
    }
    (t_near.le(t_far), t_near)
}
