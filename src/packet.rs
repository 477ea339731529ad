//! The packet walker: descends the tree with all four rays in lockstep,
//! keeping one "incumbent" child in registers (`cur`, `cur_dist`) and
//! spilling the rest to the shared stack. Grounded on the upstream
//! single-ray descent loop, generalized from "push the one sibling" to
//! "rank up to three siblings and push all but the nearest".

use crate::config::TraversalConfig;
use crate::lane::Lane4;
use crate::node::{NodeRef, NodeStore, NodeTag};
use crate::ray::RayPacket;
use crate::slab::slab_test;
use crate::stack::TraversalStack;

pub enum DescendOutcome {
    /// Descent bottomed out at a leaf; the `Lane4` is the incumbent
    /// near-distance lanes should be gated against before intersecting it.
    Leaf(NodeRef, Lane4),
    /// Lane utilization dropped at or below the switch threshold mid-descent;
    /// the incumbent has already been pushed back onto the stack.
    Switch,
    /// Every child of the incumbent missed; caller should pop and retry.
    DeadEnd,
}

/// Descends from `cur` (already known to be a box hit, with near-distance
/// `cur_dist`) until a leaf is reached or a mode switch is warranted.
pub fn descend<N, Cfg>(
    nodes: &N,
    stack: &mut TraversalStack,
    packet: &RayPacket,
    mut cur: NodeRef,
    mut cur_dist: Lane4,
) -> DescendOutcome
where
    N: NodeStore,
    Cfg: TraversalConfig,
{
    loop {
        if cur.is_leaf() {
            return DescendOutcome::Leaf(cur, cur_dist);
        }

        // Fresh incumbent for this node's children. AABB containment
        // guarantees every child's near distance is at least `cur`'s own,
        // so comparing against the inherited `cur_dist` here would mean no
        // child could ever win; the incumbent search restarts each time we
        // open a new node's children.
        let mut incumbent: Option<NodeRef> = None;
        let mut incumbent_dist = Lane4::splat(f32::INFINITY);

        match cur.tag() {
            NodeTag::StaticInternal => {
                let children = nodes.static_children(cur.index());
                for i in 0..4 {
                    if children.refs[i].is_empty() {
                        break;
                    }
                    let (lo, hi) = children.child_bounds(i);
                    consider_child(children.refs[i], lo, hi, packet, &mut incumbent, &mut incumbent_dist, stack);
                }
            }
            NodeTag::MotionBlurInternal => {
                let children = nodes.motion_blur_children(cur.index());
                for i in 0..4 {
                    if children.refs[i].is_empty() {
                        break;
                    }
                    let (lo, hi) = children.child_bounds_over_time(i, packet.time);
                    consider_child(children.refs[i], lo, hi, packet, &mut incumbent, &mut incumbent_dist, stack);
                }
            }
            other => panic!("descend reached non-internal, non-leaf node: {other:?}"),
        }

        match incumbent {
            None => return DescendOutcome::DeadEnd,
            Some(node) => {
                cur = node;
                cur_dist = incumbent_dist;
            }
        }

        if Cfg::SWITCH_DURING_DOWN {
            let (_, active_count) = crate::arbiter::active_lanes(cur_dist, packet.tfar);
            if crate::arbiter::should_use_single_ray::<Cfg>(active_count) {
                stack.push(cur, cur_dist.min_element());
                return DescendOutcome::Switch;
            }
        }
    }
}

/// Tests one child's box against the packet and applies the child-ordering
/// rule: a child that's nearer than the incumbent on *any* lane preempts it;
/// otherwise the child is pushed for later.
fn consider_child(
    child: NodeRef,
    lo: [Lane4; 3],
    hi: [Lane4; 3],
    packet: &RayPacket,
    incumbent: &mut Option<NodeRef>,
    incumbent_dist: &mut Lane4,
    stack: &mut TraversalStack,
) {
    let (hit, t_near) = slab_test(packet.org, packet.rdir, lo, hi, packet.tnear, packet.tfar);
    if hit.is_empty() {
        return;
    }

    let child_dist = t_near.select(Lane4::splat(f32::INFINITY), hit);

    match *incumbent {
        None => {
            *incumbent = Some(child);
            *incumbent_dist = child_dist;
        }
        Some(prev) => {
            if child_dist.lt(*incumbent_dist).any() {
                stack.push(prev, incumbent_dist.min_element());
                *incumbent = Some(child);
                *incumbent_dist = child_dist;
            } else {
                stack.push(child, child_dist.min_element());
            }
        }
    }
}
