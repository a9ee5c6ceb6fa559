//! Portable backend: type-parameterised scalar loops.

pub mod backend;

pub use backend::{GenericBackend, BLOCK_WIDTH};
