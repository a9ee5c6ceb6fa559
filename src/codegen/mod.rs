// src/codegen/mod.rs
// Signature vocabulary, variant enumeration and template substitution shared by all backends.

pub mod patterns;
pub mod template;
pub mod variants;

pub use patterns::{ArgKind, LoopForm, Signature};
pub use variants::signatures;
