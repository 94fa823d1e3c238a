//! Tessera Core
//!
//! This crate contains the entity-component registry and the shared
//! utilities (geometry, logging, profiling) used by the Tessera engine.

pub mod ecs;
pub mod geometry;
pub mod logging;
pub mod profiling;
