// src/templates/mod.rs
// Operator catalog: one row per operator, both backends side by side.
//
// Each row carries the portable expression (a template over ${arg1}..${argN}) and the SSE
// lowering. Keeping both lowerings on the same row is what makes backend parity checkable:
// Catalog::from_definitions refuses a row that lacks either lowering, so a label can never be
// generated for one backend and silently absent from the other. Row order is the emission order.

use crate::core::error::{GenError, GenResult};
use hashbrown::HashMap;

/// What an operator computes, used by the reference model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantics {
    Plus,
    Minus,
    Times,
    Over,
    Min,
    Max,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    /// `max(min(value, high), low)`
    Clip,
    /// `value * mul + add`
    MulAdd,
    /// `signal * (1 + modulator * amount)`
    AmpMod,
}

impl Semantics {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Semantics::Less
                | Semantics::LessEqual
                | Semantics::Greater
                | Semantics::GreaterEqual
                | Semantics::Equal
                | Semantics::NotEqual
        )
    }
}

/// SSE lowering of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorOp {
    /// Two-operand arithmetic intrinsic, e.g. `_mm_add_ps`.
    Intrinsic(&'static str),
    /// Two-operand compare intrinsic yielding a lane mask, e.g. `_mm_cmplt_ps`.
    Compare(&'static str),
    /// Composite expression over `${arg1}`..`${argN}` registers.
    Expression(&'static str),
}

/// A catalog row before validation. A `None` lowering is a catalog defect.
#[derive(Debug, Clone, Copy)]
pub struct OperatorDef {
    pub label: &'static str,
    pub arity: usize,
    pub semantics: Semantics,
    pub generic: Option<&'static str>,
    pub vector: Option<VectorOp>,
}

/// A validated operator with both lowerings present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator {
    pub label: &'static str,
    pub arity: usize,
    pub semantics: Semantics,
    /// Expression template over `${arg1}`..`${argN}`, in terms of `float_type`.
    pub generic: &'static str,
    pub vector: VectorOp,
}

const fn binary(
    label: &'static str,
    semantics: Semantics,
    generic: &'static str,
    vector: VectorOp,
) -> OperatorDef {
    OperatorDef {
        label,
        arity: 2,
        semantics,
        generic: Some(generic),
        vector: Some(vector),
    }
}

const fn ternary(
    label: &'static str,
    semantics: Semantics,
    generic: &'static str,
    vector: &'static str,
) -> OperatorDef {
    OperatorDef {
        label,
        arity: 3,
        semantics,
        generic: Some(generic),
        vector: Some(VectorOp::Expression(vector)),
    }
}

// --------------------------
// binary operators
// --------------------------

pub static BUILTIN: &[OperatorDef] = &[
    binary("plus", Semantics::Plus, "std::plus<float_type>()(${arg1}, ${arg2})", VectorOp::Intrinsic("_mm_add_ps")),
    binary("minus", Semantics::Minus, "std::minus<float_type>()(${arg1}, ${arg2})", VectorOp::Intrinsic("_mm_sub_ps")),
    binary("times", Semantics::Times, "std::multiplies<float_type>()(${arg1}, ${arg2})", VectorOp::Intrinsic("_mm_mul_ps")),
    binary("over", Semantics::Over, "std::divides<float_type>()(${arg1}, ${arg2})", VectorOp::Intrinsic("_mm_div_ps")),
    binary("min", Semantics::Min, "std::min<float_type>(${arg1}, ${arg2})", VectorOp::Intrinsic("_mm_min_ps")),
    binary("max", Semantics::Max, "std::max<float_type>(${arg1}, ${arg2})", VectorOp::Intrinsic("_mm_max_ps")),
    binary("less", Semantics::Less, "std::less<float_type>()(${arg1}, ${arg2})", VectorOp::Compare("_mm_cmplt_ps")),
    binary("less_equal", Semantics::LessEqual, "std::less_equal<float_type>()(${arg1}, ${arg2})", VectorOp::Compare("_mm_cmple_ps")),
    binary("greater", Semantics::Greater, "std::greater<float_type>()(${arg1}, ${arg2})", VectorOp::Compare("_mm_cmpgt_ps")),
    binary("greater_equal", Semantics::GreaterEqual, "std::greater_equal<float_type>()(${arg1}, ${arg2})", VectorOp::Compare("_mm_cmpge_ps")),
    binary("equal", Semantics::Equal, "std::equal_to<float_type>()(${arg1}, ${arg2})", VectorOp::Compare("_mm_cmpeq_ps")),
    binary("notequal", Semantics::NotEqual, "std::not_equal_to<float_type>()(${arg1}, ${arg2})", VectorOp::Compare("_mm_cmpneq_ps")),
    // --------------------------
    // ternary operators
    // --------------------------
    ternary(
        "clip",
        Semantics::Clip,
        "detail::clip<float_type>(${arg1}, ${arg2}, ${arg3})",
        "_mm_max_ps(_mm_min_ps(${arg1}, ${arg3}), ${arg2})",
    ),
    ternary(
        "muladd",
        Semantics::MulAdd,
        "detail::muladd<float_type>(${arg1}, ${arg2}, ${arg3})",
        "_mm_add_ps(_mm_mul_ps(${arg1}, ${arg2}), ${arg3})",
    ),
    ternary(
        "ampmod",
        Semantics::AmpMod,
        "detail::ampmod<float_type>(${arg1}, ${arg2}, ${arg3})",
        "_mm_mul_ps(${arg1}, _mm_add_ps(_mm_set_ps1(1.f), _mm_mul_ps(${arg2}, ${arg3})))",
    ),
];

/// Ordered, parity-checked operator table.
#[derive(Debug, Clone)]
pub struct Catalog {
    operators: Vec<Operator>,
    index: HashMap<&'static str, usize>,
}

impl Catalog {
    /// Validate `defs`: unique labels, arity 2 or 3, both lowerings present.
    pub fn from_definitions(defs: &[OperatorDef]) -> GenResult<Self> {
        let mut operators = Vec::with_capacity(defs.len());
        let mut index = HashMap::with_capacity(defs.len());

        for def in defs {
            if !(2..=3).contains(&def.arity) {
                return Err(GenError::InvalidArity {
                    label: def.label.to_string(),
                    arity: def.arity,
                });
            }
            let generic = def.generic.ok_or_else(|| GenError::CatalogMismatch {
                label: def.label.to_string(),
                backend: "generic",
            })?;
            let vector = def.vector.ok_or_else(|| GenError::CatalogMismatch {
                label: def.label.to_string(),
                backend: "sse",
            })?;
            if index.insert(def.label, operators.len()).is_some() {
                return Err(GenError::DuplicateOperator {
                    label: def.label.to_string(),
                });
            }
            operators.push(Operator {
                label: def.label,
                arity: def.arity,
                semantics: def.semantics,
                generic,
                vector,
            });
        }

        log::debug!("Loaded operator catalog with {} entries", operators.len());
        Ok(Self { operators, index })
    }

    /// The built-in catalog.
    pub fn builtin() -> GenResult<Self> {
        Self::from_definitions(BUILTIN)
    }

    /// All operators in catalog order.
    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    /// Operators of `arity`, in catalog order.
    pub fn with_arity(&self, arity: usize) -> impl Iterator<Item = &Operator> + '_ {
        self.operators.iter().filter(move |op| op.arity == arity)
    }

    pub fn get(&self, label: &str) -> Option<&Operator> {
        self.index.get(label).map(|&i| &self.operators[i])
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}
