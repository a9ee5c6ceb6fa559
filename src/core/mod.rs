// This module is the hub for simdgen's shared infrastructure: the error taxonomy, the run
// configuration, the per-run generation session and the Backend trait with the driver that
// walks the catalog. Backends live outside core and only see it through the Backend trait.

//! Core generation infrastructure.
//!
//! # Key Components
//!
//! ## Configuration (`config`)
//! - Backend and operator family selection
//! - Namespace tag and comparison policy
//!
//! ## Session Management (`session`)
//! - Accumulated body text of one run
//! - Per-operator kernel counts
//!
//! ## Driver (`compiler`)
//! - `Backend` hooks: prologue, epilogue, per-kernel rendering
//! - `KernelGenerator`: catalog order, then loop form, then signature

pub mod compiler;
pub mod config;
pub mod error;
pub mod session;

pub use compiler::{Backend, KernelGenerator};
pub use config::{BackendKind, ComparisonPolicy, Family, GeneratorConfig};
pub use error::{GenError, GenResult};
pub use session::{GenerationSession, SessionStats};
