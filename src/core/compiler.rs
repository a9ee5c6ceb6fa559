// This module defines the generation driver and the Backend trait it drives. KernelGenerator
// walks the operator catalog in its fixed order, asks the variant enumerator for the signature
// list of each operator's arity, and hands every (operator, signature, loop form) triple to the
// backend's renderer. The backend also contributes the family prologue and epilogue. Text flows
// one way into a GenerationSession; the first rendering error aborts the run before anything is
// returned, so a failed run can never leave a partially generated body behind.

//! Generation driver.
//!
//! Typical flow:
//! ```text
//! session.push_raw(backend.prologue(family));
//! for op in catalog.with_arity(family.arity()) {
//!     for form in backend.forms() {
//!         for sig in signatures(op.arity, backend.kind()) {
//!             session.push_kernel(backend.render_kernel(op, sig, form));
//!         }
//!     }
//! }
//! session.push_raw(backend.epilogue(family));
//! ```

use super::config::{BackendKind, Family};
use super::error::GenResult;
use super::session::{GenerationSession, SessionStats};
use crate::codegen::patterns::{LoopForm, Signature};
use crate::codegen::variants::signatures;
use crate::templates::{Catalog, Operator};

/// Hooks implemented by each code-generation target.
pub trait Backend {
    fn kind(&self) -> BackendKind;

    /// Loop forms emitted per signature, in emission order.
    fn forms(&self) -> &'static [LoopForm];

    /// Text placed before the first kernel of `family`.
    fn prologue(&self, family: Family) -> GenResult<String>;

    /// Text placed after the last kernel of `family`.
    fn epilogue(&self, family: Family) -> GenResult<String>;

    /// Render one kernel.
    fn render_kernel(&self, op: &Operator, sig: &Signature, form: LoopForm) -> GenResult<String>;
}

/// Drives a [`Backend`] over a [`Catalog`].
pub struct KernelGenerator<'c, B: Backend> {
    catalog: &'c Catalog,
    backend: B,
}

impl<'c, B: Backend> KernelGenerator<'c, B> {
    pub fn new(catalog: &'c Catalog, backend: B) -> Self {
        Self { catalog, backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Render the body of the `family` unit.
    pub fn generate(&self, family: Family) -> GenResult<(String, SessionStats)> {
        let kind = self.backend.kind();
        let mut session = GenerationSession::new();
        session.push_raw(&self.backend.prologue(family)?);

        for op in self.catalog.with_arity(family.arity()) {
            log::debug!("Generating {} kernels for `{}`", kind, op.label);
            session.begin_operator(op.label);
            let sigs = signatures(op.arity, kind)?;
            for &form in self.backend.forms() {
                for sig in &sigs {
                    log::trace!("  {} {:?} {}", op.label, form, sig);
                    let text = self.backend.render_kernel(op, sig, form)?;
                    session.push_kernel(&text);
                }
            }
        }

        session.push_raw(&self.backend.epilogue(family)?);
        let (body, stats) = session.finish();
        log::info!(
            "Generated {} {} kernels for {} operators ({} bytes)",
            stats.kernels_emitted,
            kind,
            stats.operators_visited,
            stats.body_bytes
        );
        Ok((body, stats))
    }
}
