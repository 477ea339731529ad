//! End-to-end scenarios driven entirely through the public API, with a
//! hand-built tree fixture standing in for a real BVH build (construction
//! is out of scope for this crate).

use cgmath::vec3;

use hybrid4_trace::config::{DefaultConfig, TraversalConfig};
use hybrid4_trace::lane::{Lane4, Mask4};
use hybrid4_trace::node::{MotionBlurChildren, NodeRef, NodeStore, StaticChildren};
use hybrid4_trace::ray::{PrimitiveIntersector, RayInput, RayPacket};
use hybrid4_trace::{intersect, occluded};

/// An axis-aligned cube primitive, tested with the crate's own slab test —
/// a stand-in for whatever geometry kernel a real collaborator would plug
/// in, not a production primitive intersector.
struct Cube {
    lo: [f32; 3],
    hi: [f32; 3],
}

struct CubeIntersector {
    cubes: Vec<Cube>,
}

impl PrimitiveIntersector for CubeIntersector {
    fn intersect(&self, valid: Mask4, packet: &mut RayPacket, offset: u32, count: u32) {
        for i in offset..(offset + count) {
            let cube = &self.cubes[i as usize];
            let lo = [Lane4::splat(cube.lo[0]), Lane4::splat(cube.lo[1]), Lane4::splat(cube.lo[2])];
            let hi = [Lane4::splat(cube.hi[0]), Lane4::splat(cube.hi[1]), Lane4::splat(cube.hi[2])];
            let (hit, t) = hybrid4_trace::slab::slab_test(packet.org, packet.rdir, lo, hi, packet.tnear, packet.tfar);
            for lane in 0..4 {
                if valid.get(lane) && hit.get(lane) && t.get(lane) < packet.tfar.get(lane) {
                    packet.tfar.set(lane, t.get(lane));
                    packet.prim_id[lane] = i;
                }
            }
        }
    }

    fn occluded(&self, valid: Mask4, packet: &mut RayPacket, offset: u32, count: u32) -> Mask4 {
        let mut terminated = Mask4::none();
        for i in offset..(offset + count) {
            let cube = &self.cubes[i as usize];
            let lo = [Lane4::splat(cube.lo[0]), Lane4::splat(cube.lo[1]), Lane4::splat(cube.lo[2])];
            let hi = [Lane4::splat(cube.hi[0]), Lane4::splat(cube.hi[1]), Lane4::splat(cube.hi[2])];
            let (hit, t) = hybrid4_trace::slab::slab_test(packet.org, packet.rdir, lo, hi, packet.tnear, packet.tfar);
            for lane in 0..4 {
                if valid.get(lane) && hit.get(lane) && t.get(lane) <= packet.tfar.get(lane) {
                    terminated.set(lane, true);
                }
            }
        }
        terminated
    }
}

/// One static internal node with a single leaf holding one cube, used for
/// the axis-aligned-cube scenario.
struct OneCubeTree {
    lo: [f32; 3],
    hi: [f32; 3],
}

impl NodeStore for OneCubeTree {
    fn static_children(&self, index: u32) -> StaticChildren {
        assert_eq!(index, 0);
        let mut refs = [NodeRef::EMPTY; 4];
        refs[0] = NodeRef::leaf(0);
        StaticChildren {
            refs,
            lo: [Lane4::splat(self.lo[0]), Lane4::splat(self.lo[1]), Lane4::splat(self.lo[2])],
            hi: [Lane4::splat(self.hi[0]), Lane4::splat(self.hi[1]), Lane4::splat(self.hi[2])],
        }
    }

    fn motion_blur_children(&self, _index: u32) -> MotionBlurChildren {
        unimplemented!("fixture has no motion-blur nodes")
    }

    fn leaf_range(&self, _index: u32) -> (u32, u32) {
        (0, 1)
    }
}

#[test]
fn axis_aligned_cube_two_of_four_lanes_hit() {
    let nodes = OneCubeTree { lo: [-1.0; 3], hi: [1.0; 3] };
    let prims = CubeIntersector { cubes: vec![Cube { lo: [-1.0; 3], hi: [1.0; 3] }] };

    let mut packet = RayPacket::from_rays([
        Some(RayInput::new(vec3(-2.0, 0.0, -5.0), vec3(0.0, 0.0, 1.0))),
        Some(RayInput::new(vec3(0.0, 0.0, -5.0), vec3(0.0, 0.0, 1.0))),
        Some(RayInput::new(vec3(2.0, 0.0, -5.0), vec3(0.0, 0.0, 1.0))),
        Some(RayInput::new(vec3(0.0, 0.4, -5.0), vec3(0.0, 0.0, 1.0))),
    ]);
    for ray in packet.tfar.0.iter_mut() {
        *ray = 100.0;
    }

    intersect::<_, _, DefaultConfig>(&nodes, &prims, &mut packet, NodeRef::static_internal(0));

    assert_eq!(packet.prim_id[0], hybrid4_trace::ray::INVALID_ID);
    assert!((packet.tfar.get(1) - 4.0).abs() < 1e-3);
    assert_eq!(packet.prim_id[2], hybrid4_trace::ray::INVALID_ID);
    assert!((packet.tfar.get(3) - 4.0).abs() < 1e-3);
}

#[test]
fn empty_tree_touches_nothing() {
    let nodes = OneCubeTree { lo: [-1.0; 3], hi: [1.0; 3] };
    let prims = CubeIntersector { cubes: vec![Cube { lo: [-1.0; 3], hi: [1.0; 3] }] };
    let mut packet = RayPacket::from_rays([
        Some(RayInput::new(vec3(0.0, 0.0, -5.0), vec3(0.0, 0.0, 1.0))),
        None,
        None,
        None,
    ]);
    let before = packet.tfar;
    intersect::<_, _, DefaultConfig>(&nodes, &prims, &mut packet, NodeRef::EMPTY);
    assert_eq!(packet.tfar.0, before.0);
    assert_eq!(packet.prim_id[0], hybrid4_trace::ray::INVALID_ID);
}

/// One motion-blur internal node whose sole child moves from `x in [0, 1]`
/// at time 0 to `x in [10, 11]` at time 1.
struct MovingCubeTree;

impl NodeStore for MovingCubeTree {
    fn static_children(&self, _index: u32) -> StaticChildren {
        unimplemented!("fixture has no static internal nodes")
    }

    fn motion_blur_children(&self, index: u32) -> MotionBlurChildren {
        assert_eq!(index, 0);
        let mut refs = [NodeRef::EMPTY; 4];
        refs[0] = NodeRef::leaf(0);
        MotionBlurChildren {
            refs,
            lo: [Lane4::splat(0.0), Lane4::splat(-1.0), Lane4::splat(-1.0)],
            hi: [Lane4::splat(1.0), Lane4::splat(1.0), Lane4::splat(1.0)],
            dlo: [Lane4::splat(10.0), Lane4::splat(0.0), Lane4::splat(0.0)],
            dhi: [Lane4::splat(10.0), Lane4::splat(0.0), Lane4::splat(0.0)],
        }
    }

    fn leaf_range(&self, _index: u32) -> (u32, u32) {
        (0, 1)
    }
}

/// Intersects each lane against the same moving box the tree node
/// describes, evaluated at that lane's own `time` — standing in for a
/// time-aware geometry kernel so the scenario exercises per-lane time
/// reaching the leaf, not just the node-level culling test.
struct MovingCubeIntersector;

impl PrimitiveIntersector for MovingCubeIntersector {
    fn intersect(&self, valid: Mask4, packet: &mut RayPacket, _offset: u32, _count: u32) {
        let lo = [Lane4::splat(0.0) + Lane4::splat(10.0) * packet.time, Lane4::splat(-1.0), Lane4::splat(-1.0)];
        let hi = [Lane4::splat(1.0) + Lane4::splat(10.0) * packet.time, Lane4::splat(1.0), Lane4::splat(1.0)];
        let (hit, t) = hybrid4_trace::slab::slab_test(packet.org, packet.rdir, lo, hi, packet.tnear, packet.tfar);
        for lane in 0..4 {
            if valid.get(lane) && hit.get(lane) && t.get(lane) < packet.tfar.get(lane) {
                packet.tfar.set(lane, t.get(lane));
                packet.prim_id[lane] = 0;
            }
        }
    }

    fn occluded(&self, valid: Mask4, _packet: &mut RayPacket, _offset: u32, _count: u32) -> Mask4 {
        valid
    }
}

#[test]
fn motion_blur_bounds_move_with_per_lane_time() {
    let nodes = MovingCubeTree;
    let prims = MovingCubeIntersector;

    let mut rays = RayPacket::from_rays([
        Some(RayInput::new(vec3(-5.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0))),
        Some(RayInput::new(vec3(-5.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0))),
        None,
        None,
    ]);
    rays.time.set(0, 0.0);
    rays.time.set(1, 1.0);

    intersect::<_, _, DefaultConfig>(&nodes, &prims, &mut rays, NodeRef::motion_blur_internal(0));

    // Lane 0 sees the box at x in [0, 1]: entry at t = 5.
    assert!((rays.tfar.get(0) - 5.0).abs() < 1e-3);
    // Lane 1 sees the box at x in [10, 11]: entry at t = 15.
    assert!((rays.tfar.get(1) - 15.0).abs() < 1e-3);
}

/// A pathological chain of static internal nodes, each with one child that
/// continues the chain and one leaf sibling sharing the same box. The chain
/// child is listed first, so it always becomes the incumbent (the first
/// candidate considered is accepted unconditionally); the leaf ties it on
/// distance, so it is pushed rather than swapped in. Descent therefore runs
/// the whole chain in one `descend` call, pushing one un-popped entry per
/// level instead of oscillating between depths 1 and 2.
struct LeftLeaningTree {
    depth: u32,
}

impl NodeStore for LeftLeaningTree {
    fn static_children(&self, index: u32) -> StaticChildren {
        let mut refs = [NodeRef::EMPTY; 4];
        if index + 1 < self.depth {
            refs[0] = NodeRef::static_internal(index + 1);
            refs[1] = NodeRef::leaf(index);
        } else {
            refs[0] = NodeRef::leaf(index);
        }
        StaticChildren {
            refs,
            lo: [Lane4::splat(-1.0), Lane4::splat(-1.0), Lane4::splat(-1.0)],
            hi: [Lane4::splat(1.0), Lane4::splat(1.0), Lane4::splat(1.0)],
        }
    }

    fn motion_blur_children(&self, _index: u32) -> MotionBlurChildren {
        unimplemented!("fixture has no motion-blur nodes")
    }

    fn leaf_range(&self, _index: u32) -> (u32, u32) {
        (0, 1)
    }
}

#[test]
fn deep_left_leaning_tree_stays_within_stack_bound() {
    // One shy of capacity: deep enough that the chain's un-popped leaf
    // siblings genuinely climb the stack (one entry per level, all in a
    // single `descend` call) without tripping the overflow assertion.
    let depth = DefaultConfig::STACK_CAPACITY as u32 - 1;
    let nodes = LeftLeaningTree { depth };
    let prims = CubeIntersector { cubes: vec![Cube { lo: [-1.0; 3], hi: [1.0; 3] }] };

    let rays = || {
        RayPacket::from_rays([
            Some(RayInput::new(vec3(0.0, 0.0, -5.0), vec3(0.0, 0.0, 1.0))),
            Some(RayInput::new(vec3(0.0, 0.0, -5.0), vec3(0.0, 0.0, 1.0))),
            Some(RayInput::new(vec3(0.0, 0.0, -5.0), vec3(0.0, 0.0, 1.0))),
            Some(RayInput::new(vec3(0.0, 0.0, -5.0), vec3(0.0, 0.0, 1.0))),
        ])
    };

    // Must not panic with a stack-overflow assertion, and must actually
    // reach the bottom of the chain — a hit confirms the full depth was
    // walked rather than bottoming out after the first level.
    let mut packet = rays();
    intersect::<_, _, DefaultConfig>(&nodes, &prims, &mut packet, NodeRef::static_internal(0));
    assert!((packet.tfar.get(0) - 4.0).abs() < 1e-3);

    let mut packet = rays();
    occluded::<_, _, DefaultConfig>(&nodes, &prims, &mut packet, NodeRef::static_internal(0));
    assert_eq!(packet.terminated, Mask4::all());
}
