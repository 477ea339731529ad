//! Scalar depth-first traversal for one lane, used when too few lanes of a
//! packet remain active to make SIMD descent worthwhile. Grounded on the
//! single-ray `Vec`-stack walk of the upstream BVH traverser, generalized
//! to rank and push multiple children by near-distance instead of the
//! binary-tree case's "push the one sibling".

use arrayvec::ArrayVec;
use ordered_float::OrderedFloat;

use crate::config::TraversalConfig;
use crate::lane::{Lane4, Mask4};
use crate::node::{read_children, NodeRef};
use crate::ray::{PrimitiveIntersector, RayPacket};
use crate::stack::MAX_STACK_CAPACITY;

/// Counts how many times single-ray mode was entered, reset per test. The
/// mode-switch regression scenario reads this to confirm the arbiter
/// actually delegated instead of staying in packet mode the whole way.
#[cfg(test)]
thread_local! {
    pub static INVOCATIONS: std::cell::Cell<u32> = std::cell::Cell::new(0);
}

#[cfg(test)]
pub fn reset_invocation_count() {
    INVOCATIONS.with(|c| c.set(0));
}

#[cfg(test)]
pub fn invocation_count() -> u32 {
    INVOCATIONS.with(|c| c.get())
}

/// Walks the tree rooted at `start` for a single lane of `packet`. Returns
/// `true` if an any-hit query found an occluder (meaningless for
/// closest-hit, where results land directly in `packet`'s hit fields).
pub fn walk_single_ray<N, P, Cfg>(
    nodes: &N,
    prims: &P,
    packet: &mut RayPacket,
    lane: usize,
    start: NodeRef,
    any_hit: bool,
) -> bool
where
    N: crate::node::NodeStore,
    P: PrimitiveIntersector,
    Cfg: TraversalConfig,
{
    #[cfg(test)]
    INVOCATIONS.with(|c| c.set(c.get() + 1));

    if start.is_empty() {
        return false;
    }

    let org = [packet.org[0].get(lane), packet.org[1].get(lane), packet.org[2].get(lane)];
    let rdir = [packet.rdir[0].get(lane), packet.rdir[1].get(lane), packet.rdir[2].get(lane)];
    let time = Lane4::splat(packet.time.get(lane));

    let mut lane_mask = Mask4::none();
    lane_mask.set(lane, true);

    let mut stack: ArrayVec<(NodeRef, f32), MAX_STACK_CAPACITY> = ArrayVec::new();
    let mut cur = start;

    loop {
        if cur.is_internal() {
            let (refs, lo, hi) = read_children(nodes, cur, time);
            let org_b = [Lane4::splat(org[0]), Lane4::splat(org[1]), Lane4::splat(org[2])];
            let rdir_b = [Lane4::splat(rdir[0]), Lane4::splat(rdir[1]), Lane4::splat(rdir[2])];
            let tnear_b = Lane4::splat(packet.tnear.get(lane));
            let tfar_b = Lane4::splat(packet.tfar.get(lane));
            let (hit, t_near) = crate::slab::slab_test(org_b, rdir_b, lo, hi, tnear_b, tfar_b);

            let mut candidates: ArrayVec<(f32, NodeRef), 4> = ArrayVec::new();
            for i in 0..4 {
                if refs[i].is_empty() {
                    break;
                }
                if hit.get(i) {
                    candidates.push((t_near.get(i), refs[i]));
                }
            }
            candidates.sort_by_key(|&(dist, _)| OrderedFloat(dist));

            if let Some(&(_, nearest)) = candidates.first() {
                for &(dist, node) in candidates[1..].iter().rev() {
                    assert!(stack.len() < Cfg::STACK_CAPACITY, "single-ray stack overflow");
                    stack.push((node, dist));
                }
                cur = nearest;
                continue;
            }
        } else if cur.is_leaf() {
            let (offset, count) = nodes.leaf_range(cur.index());
            if any_hit {
                let terminated = prims.occluded(lane_mask, packet, offset, count);
                if terminated.get(lane) {
                    return true;
                }
            } else {
                prims.intersect(lane_mask, packet, offset, count);
            }
        }

        loop {
            match stack.pop() {
                None => return false,
                Some((node, dist)) => {
                    if dist < packet.tfar.get(lane) {
                        cur = node;
                        break;
                    }
                }
            }
        }
    }
}
