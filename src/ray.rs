//! The ray packet: four rays in struct-of-arrays form, plus the derived
//! reciprocal-direction precomputations the slab test needs. Construction
//! from individual rays is the one place `cgmath::Vector3` earns its keep —
//! the hot traversal path below never needs a cross-component vector op.

use cgmath::Vector3;

use crate::lane::{recip_safe, Lane4, Mask4};

pub const INVALID_ID: u32 = u32::MAX;

/// One caller-supplied ray, in the ergonomic AoS form used only at packet
/// construction time.
#[derive(Copy, Clone, Debug)]
pub struct RayInput {
    pub origin: Vector3<f32>,
    pub direction: Vector3<f32>,
    pub tnear: f32,
    pub tfar: f32,
    pub time: f32,
}

impl RayInput {
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>) -> Self {
        RayInput {
            origin,
            direction,
            tnear: 0.0,
            tfar: f32::INFINITY,
            time: 0.0,
        }
    }
}

/// Four rays, struct-of-arrays. Inactive lanes carry `tnear = +inf`,
/// `tfar = -inf`, which makes every downstream slab test and hit-mask check
/// fail without a separate validity branch; `valid` records which lanes
/// were actually populated by the caller, for the final hit write-back.
#[derive(Clone, Debug)]
pub struct RayPacket {
    pub org: [Lane4; 3],
    pub dir: [Lane4; 3],
    pub rdir: [Lane4; 3],
    pub org_rdir: [Lane4; 3],
    pub tnear: Lane4,
    pub tfar: Lane4,
    pub time: Lane4,
    pub valid: Mask4,

    pub prim_id: [u32; 4],
    pub geom_id: [u32; 4],
    pub inst_id: [u32; 4],
    pub u: Lane4,
    pub v: Lane4,
    pub ng: [Lane4; 3],

    /// Any-hit hit-indicator: `valid & terminated`, written once by
    /// [`crate::driver::occluded`] on exit. `tfar` alone can't carry this —
    /// a terminated lane and an inactive lane both drive `tfar` to `-inf`,
    /// so this field is the only place the two are told apart. Untouched
    /// by closest-hit queries.
    pub terminated: Mask4,
}

impl RayPacket {
    /// Builds a packet from up to four rays; `None` lanes are inactive.
    pub fn from_rays(rays: [Option<RayInput>; 4]) -> Self {
        let mut org = [Lane4::splat(0.0); 3];
        let mut dir = [Lane4::splat(0.0); 3];
        let mut rdir = [Lane4::splat(0.0); 3];
        let mut org_rdir = [Lane4::splat(0.0); 3];
        let mut tnear = Lane4::splat(f32::INFINITY);
        let mut tfar = Lane4::splat(f32::NEG_INFINITY);
        let mut time = Lane4::splat(0.0);
        let mut valid = Mask4::none();

        for (lane, ray) in rays.into_iter().enumerate() {
            if let Some(ray) = ray {
                let o = [ray.origin.x, ray.origin.y, ray.origin.z];
                let d = [ray.direction.x, ray.direction.y, ray.direction.z];
                for axis in 0..3 {
                    org[axis].set(lane, o[axis]);
                    dir[axis].set(lane, d[axis]);
                    let r = recip_safe(d[axis]);
                    rdir[axis].set(lane, r);
                    org_rdir[axis].set(lane, o[axis] * r);
                }
                tnear.set(lane, ray.tnear);
                tfar.set(lane, ray.tfar);
                time.set(lane, ray.time);
                valid.set(lane, true);
            }
        }

        RayPacket {
            org,
            dir,
            rdir,
            org_rdir,
            tnear,
            tfar,
            time,
            valid,
            prim_id: [INVALID_ID; 4],
            geom_id: [INVALID_ID; 4],
            inst_id: [INVALID_ID; 4],
            u: Lane4::splat(0.0),
            v: Lane4::splat(0.0),
            ng: [Lane4::splat(0.0); 3],
            terminated: Mask4::none(),
        }
    }

    /// Lanes still capable of producing a closer hit: populated by the
    /// caller and not yet exhausted. Recomputed live from `tfar`, never
    /// cached, so it always reflects hits written by prior leaf visits.
    pub fn active_mask(&self) -> Mask4 {
        self.valid.and(self.tnear.le(self.tfar))
    }
}

/// Narrow collaborator interface for primitive intersection. Implementors
/// must only mutate lanes where `valid` is set, and must keep the minimum
/// `tfar` (closest-hit) or be idempotent (any-hit). The core never inspects
/// a leaf's primitive data itself.
pub trait PrimitiveIntersector {
    /// Closest-hit: updates `packet`'s hit fields and `tfar` in place for
    /// active lanes that found a closer intersection among
    /// `[offset, offset + count)`.
    fn intersect(&self, valid: Mask4, packet: &mut RayPacket, offset: u32, count: u32);

    /// Any-hit: returns the mask of lanes that found *any* intersection
    /// within their current `[tnear, tfar]`. Does not need to update `tfar`
    /// or hit fields; the driver tracks termination itself.
    fn occluded(&self, valid: Mask4, packet: &mut RayPacket, offset: u32, count: u32) -> Mask4;
}
