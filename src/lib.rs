//! simdgen - elementwise SIMD kernel generation.
//!
//! simdgen turns a small declarative catalog of arithmetic and comparison
//! operators into C++ kernel headers. For every operator it enumerates the
//! argument shapes (buffer, scalar, ramping scalar) and renders one kernel per
//! shape for a portable scalar-loop backend and an SSE backend.
//!
//! # Primary Usage
//!
//! ```no_run
//! use simdgen::{encodegen, BackendKind, Catalog, Family, GeneratorConfig};
//!
//! let catalog = Catalog::builtin()?;
//! let config = GeneratorConfig::new(BackendKind::Sse, Family::Binary);
//! let unit = encodegen::generate(&catalog, &config)?;
//! encodegen::write_unit(&unit, None)?;
//! # Ok::<(), simdgen::GenError>(())
//! ```
//!
//! # Architecture
//!
//! - [`templates`] - Operator catalog with both backend lowerings per row
//! - [`codegen`] - Argument shapes, signature enumeration, template substitution
//! - [`core`] - Errors, configuration, generation session and driver
//! - [`generic`] - Portable scalar-loop renderer
//! - [`x64`] - SSE renderer and register layout
//! - [`encodegen`] - Unit assembly and output
//! - [`simulate`] - Reference model executing generated kernels

pub mod codegen;
pub mod core;
pub mod encodegen;
pub mod generic;
pub mod simulate;
pub mod templates;
pub mod x64;

pub use crate::codegen::{signatures, ArgKind, LoopForm, Signature};
pub use crate::core::{
    Backend, BackendKind, ComparisonPolicy, Family, GenError, GenResult, GenerationSession,
    GeneratorConfig, KernelGenerator, SessionStats,
};
pub use encodegen::{generate, GeneratedUnit};
pub use generic::GenericBackend;
pub use templates::{Catalog, Operator, Semantics, VectorOp};
pub use x64::SseBackend;
