//! Entry points: `intersect` (closest-hit) and `occluded` (any-hit). Both
//! drive the same pop/arbiter/descend loop; they differ only in how a leaf
//! visit is interpreted and when the loop is allowed to stop early.

use log::{trace, warn};

use crate::arbiter::{active_lanes, should_use_single_ray};
use crate::config::TraversalConfig;
use crate::lane::{Lane4, Mask4};
use crate::node::NodeStore;
use crate::packet::{descend, DescendOutcome};
use crate::ray::{PrimitiveIntersector, RayPacket};
use crate::single_ray::walk_single_ray;
use crate::stack::TraversalStack;

/// Traces a packet through `nodes` rooted at `root`, looking for the
/// closest hit per lane. Updates `packet`'s hit fields and `tfar` in place;
/// lanes inactive at entry (per [`RayPacket::active_mask`]) are left
/// untouched.
pub fn intersect<N, P, Cfg>(nodes: &N, prims: &P, packet: &mut RayPacket, root: crate::node::NodeRef)
where
    N: NodeStore,
    P: PrimitiveIntersector,
    Cfg: TraversalConfig,
{
    if root.is_empty() {
        return;
    }

    let mut stack = TraversalStack::new(Cfg::STACK_CAPACITY);
    let mut cur = root;
    let mut cur_dist = packet.tnear;
    let mut terminated = Mask4::none();

    loop {
        if !cur.is_sentinel() {
            step::<N, P, Cfg>(nodes, prims, packet, &mut stack, cur, cur_dist, false, &mut terminated);
        }

        let entry = stack.pop();
        if entry.node.is_sentinel() {
            break;
        }
        cur = entry.node;
        cur_dist = Lane4::splat(entry.dist);
    }
}

/// Traces a packet through `nodes` rooted at `root`, stopping each lane as
/// soon as any occluder is found. Internally, a terminated lane's `tfar` is
/// forced to `-inf` so it can no longer be hit again; on exit, writes
/// `valid & terminated` into `packet.terminated`, the caller-facing
/// hit-indicator field (`tfar` alone can't distinguish a terminated lane
/// from one that was never active).
pub fn occluded<N, P, Cfg>(nodes: &N, prims: &P, packet: &mut RayPacket, root: crate::node::NodeRef)
where
    N: NodeStore,
    P: PrimitiveIntersector,
    Cfg: TraversalConfig,
{
    let mut terminated = Mask4::none();

    if !root.is_empty() {
        let mut stack = TraversalStack::new(Cfg::STACK_CAPACITY);
        let mut cur = root;
        let mut cur_dist = packet.tnear;

        loop {
            if !cur.is_sentinel() {
                step::<N, P, Cfg>(nodes, prims, packet, &mut stack, cur, cur_dist, true, &mut terminated);
                if all_terminated(packet.valid, terminated) {
                    trace!("occluded: every valid lane terminated, stopping early");
                    break;
                }
            }

            let entry = stack.pop();
            if entry.node.is_sentinel() {
                break;
            }
            cur = entry.node;
            cur_dist = Lane4::splat(entry.dist);
        }
    }

    packet.terminated = packet.valid.and(terminated);
}

/// True once every lane the caller actually populated is accounted for in
/// `terminated`. Lanes the caller never populated don't count, so a packet
/// with fewer than four live rays can still short-circuit.
fn all_terminated(valid: Mask4, terminated: Mask4) -> bool {
    for lane in 0..4 {
        if valid.get(lane) && !terminated.get(lane) {
            return false;
        }
    }
    true
}

/// One unit of work starting from an already-popped (or freshly seeded)
/// incumbent: decide packet vs single-ray, run it, and (for any-hit)
/// OR-fold newly terminated lanes into `terminated`. Ignored for
/// closest-hit queries.
fn step<N, P, Cfg>(
    nodes: &N,
    prims: &P,
    packet: &mut RayPacket,
    stack: &mut TraversalStack,
    cur: crate::node::NodeRef,
    cur_dist: Lane4,
    any_hit: bool,
    terminated: &mut Mask4,
) where
    N: NodeStore,
    P: PrimitiveIntersector,
    Cfg: TraversalConfig,
{
    let (active_mask, active_count) = active_lanes(cur_dist, packet.tfar);
    if active_count == 0 {
        return;
    }

    if should_use_single_ray::<Cfg>(active_count) {
        trace!("switching to single-ray mode for {active_count} active lane(s)");
        for lane in 0..4 {
            if !active_mask.get(lane) {
                continue;
            }
            let lane_terminated = walk_single_ray::<N, P, Cfg>(nodes, prims, packet, lane, cur, any_hit);
            if any_hit && lane_terminated {
                packet.tfar.set(lane, f32::NEG_INFINITY);
                terminated.set(lane, true);
            }
        }
        return;
    }

    match descend::<N, Cfg>(nodes, stack, packet, cur, cur_dist) {
        DescendOutcome::Leaf(leaf, leaf_dist) => {
            let (leaf_active, leaf_count) = active_lanes(leaf_dist, packet.tfar);
            if leaf_count == 0 {
                return;
            }
            let (offset, count) = nodes.leaf_range(leaf.index());
            if any_hit {
                let newly_terminated = prims.occluded(leaf_active, packet, offset, count);
                for lane in 0..4 {
                    if leaf_active.get(lane) && newly_terminated.get(lane) {
                        packet.tfar.set(lane, f32::NEG_INFINITY);
                        terminated.set(lane, true);
                    }
                }
            } else {
                prims.intersect(leaf_active, packet, offset, count);
            }
        }
        DescendOutcome::Switch | DescendOutcome::DeadEnd => {}
    }
}

/// Asserts the compile-time configuration is internally consistent. Called
/// once at the start of every traversal entry point's test coverage; not on
/// the hot path itself, since a malformed `Cfg` is a build-time mistake.
#[cfg(test)]
fn assert_config_sane<Cfg: TraversalConfig>() {
    assert!(Cfg::STACK_CAPACITY <= crate::stack::MAX_STACK_CAPACITY);
    if Cfg::STACK_CAPACITY == 0 {
        warn!("STACK_CAPACITY of 0 means even the root cannot be pushed");
    }
}
