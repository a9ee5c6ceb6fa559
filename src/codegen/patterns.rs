// This module defines the argument shape vocabulary shared by the enumerator, both renderers
// and the reference model. ArgKind says how one operator argument is fed to a kernel: as a
// buffer read once per element, as a constant scalar, or as a ramping scalar that advances by
// a paired slope after every element. Signature is the ordered list of kinds for one kernel.
// It also owns the naming conventions every backend agrees on (argN, argN_slope) so the two
// renderers can never disagree about parameter names.

use std::fmt;

/// How one operator argument is supplied to a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    Buffer,
    Scalar,
    /// Scalar advanced by `argN_slope` after each processed element.
    Ramp,
}

impl ArgKind {
    pub fn is_buffer(self) -> bool {
        matches!(self, ArgKind::Buffer)
    }

    pub fn is_ramp(self) -> bool {
        matches!(self, ArgKind::Ramp)
    }

    /// Word used in the comment heading each kernel.
    pub fn describe(self) -> &'static str {
        match self {
            ArgKind::Buffer => "vector",
            ArgKind::Scalar => "scalar",
            ArgKind::Ramp => "ramp",
        }
    }
}

/// Ordered argument kinds for one kernel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    args: Vec<ArgKind>,
}

impl Signature {
    pub fn new(args: Vec<ArgKind>) -> Self {
        Self { args }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn kinds(&self) -> &[ArgKind] {
        &self.args
    }

    /// Arguments with their 1-based position.
    pub fn positions(&self) -> impl Iterator<Item = (usize, ArgKind)> + '_ {
        self.args.iter().enumerate().map(|(i, kind)| (i + 1, *kind))
    }

    pub fn has_ramp(&self) -> bool {
        self.args.iter().any(|kind| kind.is_ramp())
    }

    pub fn has_buffer(&self) -> bool {
        self.args.iter().any(|kind| kind.is_buffer())
    }

    pub fn is_all_buffer(&self) -> bool {
        self.args.iter().all(|kind| kind.is_buffer())
    }

    /// `vector/scalar/ramp` style heading.
    pub fn describe(&self) -> String {
        self.args
            .iter()
            .map(|kind| kind.describe())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Loop structure of a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopForm {
    /// One element per iteration; any `n > 0`.
    TailSafe,
    /// Fixed-width blocks per iteration; `n` must be a positive multiple of the block width.
    Blocked,
}

impl LoopForm {
    /// Suffix appended to the operator label to form the kernel name.
    pub fn suffix(self) -> &'static str {
        match self {
            LoopForm::TailSafe => "_vec",
            LoopForm::Blocked => "_vec_simd",
        }
    }
}

/// Name of the argument at 1-based `position`.
pub fn arg_name(position: usize) -> String {
    format!("arg{position}")
}

/// Name of the slope paired with a ramp at `position`.
pub fn slope_name(position: usize) -> String {
    format!("arg{position}_slope")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ArgKind::*;

    #[test]
    fn test_describe() {
        let sig = Signature::new(vec![Buffer, Scalar, Ramp]);
        assert_eq!(sig.describe(), "vector/scalar/ramp");
        assert_eq!(sig.to_string(), "vector/scalar/ramp");
    }

    #[test]
    fn test_shape_queries() {
        let all_scalar = Signature::new(vec![Scalar, Scalar, Scalar]);
        assert!(!all_scalar.has_buffer());
        assert!(!all_scalar.has_ramp());

        let ramp = Signature::new(vec![Buffer, Ramp]);
        assert!(ramp.has_ramp());
        assert!(!ramp.is_all_buffer());
        assert_eq!(ramp.positions().collect::<Vec<_>>(), vec![(1, Buffer), (2, Ramp)]);
    }
}
