//! 2D scene rendering for the Tessera engine.
//!
//! The frame pipeline runs entirely on data held in a
//! [`tessera_core::ecs::Registry`]: a spatial hash grid narrows the scene to
//! the camera's neighborhood, the culler diffs that against the previous
//! frame's visible set, dirty transforms are folded into cached model
//! matrices, sprites are depth-sorted by paint order, and everything is drawn
//! through instanced batches into an offscreen target that a post-process
//! pass presents.

pub mod animation;
pub mod atlas;
pub mod batch;
pub mod camera;
pub mod components;
pub mod context;
pub mod cull;
pub mod error;
pub mod framebuffer;
pub mod grid;
pub mod material;
pub mod model;
pub mod sort;
pub mod system;

pub use error::{RenderError, RenderResult};
