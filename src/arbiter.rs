//! Decides, at the two points the algorithm allows it, whether the
//! remaining lanes are worth continuing in packet mode. Always recomputes
//! against the packet's live `tfar` rather than a cached popcount, so a
//! lane that got terminated by a leaf visit between checks is reflected
//! immediately.

use crate::config::TraversalConfig;
use crate::lane::{Lane4, Mask4};

/// Lanes still worth descending for, given the incumbent's near-distance
/// and the packet's current far-distance, plus how many there are.
pub fn active_lanes(cur_dist: Lane4, tfar: Lane4) -> (Mask4, u32) {
    let mask = cur_dist.lt(tfar);
    (mask, mask.popcount())
}

pub fn should_use_single_ray<Cfg: TraversalConfig>(active_count: u32) -> bool {
    active_count > 0 && active_count <= Cfg::T_SWITCH
}
