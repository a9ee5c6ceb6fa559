//! Generation settings.
//!
//! A run is keyed by a [`BackendKind`] and a [`Family`]; [`GeneratorConfig`]
//! carries the remaining knobs (namespace tag and comparison policy).

use std::fmt;

/// Code-generation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Type-parameterised scalar loops.
    Generic,
    /// `float` only, SSE intrinsics.
    Sse,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Generic => "generic",
            BackendKind::Sse => "sse",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operator family emitted into one unit, selected by arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Binary,
    Ternary,
}

impl Family {
    pub fn arity(self) -> usize {
        match self {
            Family::Binary => 2,
            Family::Ternary => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Family::Binary => "binary",
            Family::Ternary => "ternary",
        }
    }
}

/// How the SSE backend materialises comparison results.
///
/// SSE compares yield an all-ones or all-zeros bit pattern per lane, which
/// reinterpreted as `float` is NaN or `0.0`. The generic backend yields `1`
/// or `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComparisonPolicy {
    /// Mask the comparison with `1.f` so lanes hold `1.0` or `0.0`.
    #[default]
    Normalize,
    /// Emit the raw bit mask.
    Mask,
}

/// Settings for one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub backend: BackendKind,
    pub family: Family,
    /// Namespace wrapping the generated kernels.
    pub namespace: String,
    pub comparisons: ComparisonPolicy,
}

impl GeneratorConfig {
    pub fn new(backend: BackendKind, family: Family) -> Self {
        Self {
            backend,
            family,
            namespace: "nova".to_string(),
            comparisons: ComparisonPolicy::default(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_comparisons(mut self, comparisons: ComparisonPolicy) -> Self {
        self.comparisons = comparisons;
        self
    }
}
