//! x86-64 SSE backend.
//!
//! - [`backend`] renders `float` kernels with SSE intrinsics
//! - [`lanes`] holds the register layout the renderer and the reference model share

pub mod backend;
pub mod lanes;

pub use backend::SseBackend;
pub use lanes::{F32x4, REGISTER_WIDTH, SAMPLES_PER_LOOP};
