//! Hybrid SIMD-packet / single-ray BVH4 traversal core.
//!
//! This crate walks a 4-ary bounding-volume hierarchy with four rays at a
//! time, switching between packet mode (all four lanes in lockstep) and
//! single-ray mode (each active lane walked independently) based on how
//! many lanes are still live. Tree construction, primitive intersection
//! kernels and scene storage are the caller's concern, reached through the
//! narrow [`node::NodeStore`] and [`ray::PrimitiveIntersector`] interfaces.
//!
//! The crate is a pure in-process library: no persisted state, no CLI, no
//! environment variables. A specialization is chosen at compile time by
//! implementing [`config::TraversalConfig`] and calling [`driver::intersect`]
//! or [`driver::occluded`].

pub mod arbiter;
pub mod config;
pub mod driver;
pub mod lane;
pub mod node;
pub mod packet;
pub mod ray;
pub mod single_ray;
pub mod slab;
pub mod stack;

pub use config::{DefaultConfig, TraversalConfig};
pub use driver::{intersect, occluded};
pub use lane::{Lane4, Mask4};
pub use node::{
    MotionBlurChildren, NodeRef, NodeStore, NodeTag, NodeTypesMask, StaticChildren,
};
pub use ray::{PrimitiveIntersector, RayInput, RayPacket};
