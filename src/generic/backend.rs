// This module implements the portable backend. Every kernel is a function template over
// float_type that walks the output with a post-decrement counter. Two loop forms are emitted
// for every signature: the tail-safe form applies the operator once per iteration and accepts
// any n > 0, and the blocked form unrolls BLOCK_WIDTH applications per iteration with a trip
// count of n / BLOCK_WIDTH. The blocked form trusts its caller to pass a positive multiple of
// the block width; a shorter remainder is simply not processed. Ramp arguments are advanced by
// their slope immediately after each application, so the first element sees the start value.

//! Portable scalar-loop kernel renderer.

use crate::codegen::patterns::{arg_name, slope_name, ArgKind, LoopForm, Signature};
use crate::codegen::template::{render, Bindings};
use crate::core::compiler::Backend;
use crate::core::config::{BackendKind, Family};
use crate::core::error::{GenError, GenResult};
use crate::templates::Operator;

/// Applications per iteration of the blocked loop.
pub const BLOCK_WIDTH: usize = 8;

const TAIL_SAFE_KERNEL: &str = "
/* ${heading} */
template <typename float_type>
inline void ${name}(float_type * out, ${params}, unsigned int n)
{
    do {
${body}    }
    while (--n);
}
";

const BLOCKED_KERNEL: &str = "
/* ${heading} */
template <typename float_type>
inline void ${name}(float_type * out, ${params}, unsigned int n)
{
    unsigned int loops = n / ${width};
    do {
${body}    }
    while (--loops);
}
";

const TERNARY_HELPERS: &str = "
namespace detail
{

template <typename float_type>
inline float_type clip(float_type value, float_type low, float_type high)
{
    return std::max(std::min(value, high),
                    low);
}

template <typename float_type>
inline float_type muladd(float_type value, float_type mul, float_type add)
{
    return value * mul + add;
}

template <typename float_type>
inline float_type ampmod(float_type signal, float_type modulator, float_type amount)
{
    return signal * (float_type(1) + modulator * amount);
}

} /* namespace detail */
";

/// Renders type-parameterised scalar loops.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericBackend;

impl GenericBackend {
    pub fn new() -> Self {
        Self
    }
}

/// C++ parameter list for `sig`, without `out` and `n`.
pub fn parameters(sig: &Signature) -> String {
    sig.positions()
        .map(|(pos, kind)| match kind {
            ArgKind::Buffer => format!("const float_type * {}", arg_name(pos)),
            ArgKind::Scalar => format!("const float_type {}", arg_name(pos)),
            ArgKind::Ramp => format!("float_type {}, const float_type {}", arg_name(pos), slope_name(pos)),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// One output assignment plus ramp advances.
fn element_statement(op: &Operator, sig: &Signature) -> GenResult<String> {
    let names: Vec<String> = (1..=sig.arity()).map(arg_name).collect();
    let mut bindings = Bindings::new();
    for (pos, kind) in sig.positions() {
        let operand = match kind {
            ArgKind::Buffer => format!("*{}++", names[pos - 1]),
            ArgKind::Scalar | ArgKind::Ramp => names[pos - 1].clone(),
        };
        bindings.set(names[pos - 1].as_str(), operand);
    }

    let mut line = format!("*out++ = {};", render(op.generic, &bindings)?);
    for (pos, kind) in sig.positions() {
        if kind.is_ramp() {
            line.push_str(&format!(" {} += {};", arg_name(pos), slope_name(pos)));
        }
    }
    Ok(line)
}

impl Backend for GenericBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Generic
    }

    fn forms(&self) -> &'static [LoopForm] {
        &[LoopForm::TailSafe, LoopForm::Blocked]
    }

    fn prologue(&self, family: Family) -> GenResult<String> {
        Ok(match family {
            Family::Binary => String::new(),
            Family::Ternary => TERNARY_HELPERS.to_string(),
        })
    }

    fn epilogue(&self, _family: Family) -> GenResult<String> {
        Ok(String::new())
    }

    fn render_kernel(&self, op: &Operator, sig: &Signature, form: LoopForm) -> GenResult<String> {
        if sig.arity() != op.arity {
            return Err(GenError::UnsupportedSignature {
                label: op.label.to_string(),
                signature: sig.describe(),
                backend: BackendKind::Generic.name(),
            });
        }

        let statement = element_statement(op, sig)?;
        let (template, repeats) = match form {
            LoopForm::TailSafe => (TAIL_SAFE_KERNEL, 1),
            LoopForm::Blocked => (BLOCKED_KERNEL, BLOCK_WIDTH),
        };
        let body: String = (0..repeats)
            .map(|_| format!("        {statement}\n"))
            .collect();

        let bindings = Bindings::new()
            .with("heading", sig.describe())
            .with("name", format!("{}{}", op.label, form.suffix()))
            .with("params", parameters(sig))
            .with("width", BLOCK_WIDTH.to_string())
            .with("body", body);
        render(template, &bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::Catalog;
    use ArgKind::*;

    fn plus() -> Operator {
        *Catalog::builtin().unwrap().get("plus").unwrap()
    }

    #[test]
    fn test_tail_safe_buffer_buffer() {
        let text = GenericBackend
            .render_kernel(&plus(), &Signature::new(vec![Buffer, Buffer]), LoopForm::TailSafe)
            .unwrap();
        assert!(text.contains(
            "inline void plus_vec(float_type * out, const float_type * arg1, const float_type * arg2, unsigned int n)"
        ));
        assert!(text.contains("*out++ = std::plus<float_type>()(*arg1++, *arg2++);"));
        assert!(text.contains("while (--n);"));
    }

    #[test]
    fn test_ramp_parameters_and_advance() {
        let sig = Signature::new(vec![Buffer, Ramp]);
        assert_eq!(
            parameters(&sig),
            "const float_type * arg1, float_type arg2, const float_type arg2_slope"
        );
        let text = GenericBackend.render_kernel(&plus(), &sig, LoopForm::TailSafe).unwrap();
        assert!(text.contains("*out++ = std::plus<float_type>()(*arg1++, arg2); arg2 += arg2_slope;"));
    }

    #[test]
    fn test_blocked_unrolls_block_width() {
        let text = GenericBackend
            .render_kernel(&plus(), &Signature::new(vec![Scalar, Buffer]), LoopForm::Blocked)
            .unwrap();
        assert!(text.contains("inline void plus_vec_simd("));
        assert!(text.contains("unsigned int loops = n / 8;"));
        assert_eq!(text.matches("*out++ = ").count(), BLOCK_WIDTH);
        assert!(text.contains("while (--loops);"));
    }

    #[test]
    fn test_all_scalar_ternary() {
        let catalog = Catalog::builtin().unwrap();
        let muladd = catalog.get("muladd").unwrap();
        let text = GenericBackend
            .render_kernel(muladd, &Signature::new(vec![Scalar, Scalar, Scalar]), LoopForm::TailSafe)
            .unwrap();
        assert!(text.contains("/* scalar/scalar/scalar */"));
        assert!(text.contains("*out++ = detail::muladd<float_type>(arg1, arg2, arg3);"));
    }

    #[test]
    fn test_arity_mismatch_rejected() {
        let err = GenericBackend
            .render_kernel(&plus(), &Signature::new(vec![Buffer, Buffer, Buffer]), LoopForm::TailSafe)
            .unwrap_err();
        assert!(matches!(err, GenError::UnsupportedSignature { .. }));
    }

    #[test]
    fn test_ternary_prologue_defines_helpers() {
        let prologue = GenericBackend.prologue(Family::Ternary).unwrap();
        assert!(prologue.contains("inline float_type muladd("));
        assert!(prologue.contains("inline float_type ampmod("));
        assert!(GenericBackend.prologue(Family::Binary).unwrap().is_empty());
    }
}
