// This module implements the SSE backend, restricted to float and the SSE1 instruction set.
// Each supported signature produces an explicit specialization of the portable
// <label>_vec_simd template that runs samples_per_loop elements per iteration. Plain shapes
// (buffers and broadcast scalars) go through a compile-time recursive unroller in namespace
// detail that handles one register and recurses on n-4 down to an empty n = 0 case; they also
// get a fixed-length template <int n> entry point. Ramp shapes seed a register with the first
// four ramp values and advance it by 4*slope after every register step, two steps per loop.

//! SSE kernel renderer.

use super::lanes::{RAMP_SET_ORDER, RAMP_STEP, REGISTER_WIDTH, SAMPLES_PER_LOOP, STEPS_PER_LOOP};
use crate::codegen::patterns::{arg_name, slope_name, ArgKind, LoopForm, Signature};
use crate::codegen::template::{render, Bindings};
use crate::core::compiler::Backend;
use crate::core::config::{BackendKind, ComparisonPolicy, Family};
use crate::core::error::{GenError, GenResult};
use crate::templates::{Operator, VectorOp};

const PROLOGUE: &str = "
#if defined(__GNUC__) && defined(NDEBUG)
#define always_inline inline  __attribute__((always_inline))
#else
#define always_inline inline
#endif

#define samples_per_loop ${samples}

";

const EPILOGUE: &str = "
#undef always_inline
#undef samples_per_loop
";

const UNROLLED_KERNEL: &str = "
namespace detail {

/* ${heading} */
template <int n>
always_inline void ${unroller}(float * out, ${unroller_params})
{
${loads}
    const __m128 result = ${expression};

    _mm_store_ps(out, result);

    ${unroller}<n-${width}>(out+${width}, ${recurse_args});
}

template <>
always_inline void ${unroller}<0>(float * out, ${unroller_params})
{}

} /* namespace detail */

template <int n>
void ${label}_vec_simd(float * out, ${params})
{
${broadcasts}    detail::${unroller}<n>(out, ${call_args});
}

template <>
inline void ${label}_vec_simd(float * out, ${params}, unsigned int n)
{
    unsigned int loops = n / samples_per_loop;
${broadcasts}    do {
        detail::${unroller}<samples_per_loop>(out, ${call_args});
        out += samples_per_loop;
${advances}    }
    while (--loops);
}
";

const RAMP_KERNEL: &str = "
/* ${heading} */
template <>
inline void ${label}_vec_simd(float * out, ${params}, unsigned int n)
{
    unsigned int loops = n / samples_per_loop;
${setup}
    do {
${steps}    }
    while (--loops);
}
";

/// Renders SSE specializations for `float`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SseBackend {
    comparisons: ComparisonPolicy,
}

impl SseBackend {
    pub fn new(comparisons: ComparisonPolicy) -> Self {
        Self { comparisons }
    }

    pub fn comparisons(&self) -> ComparisonPolicy {
        self.comparisons
    }

    fn unsupported(op: &Operator, sig: &Signature) -> GenError {
        GenError::UnsupportedSignature {
            label: op.label.to_string(),
            signature: sig.describe(),
            backend: BackendKind::Sse.name(),
        }
    }

    /// Lowered vector expression over register `operands`.
    pub fn expression(&self, op: &Operator, sig: &Signature, operands: &[String]) -> GenResult<String> {
        let two_operands = |name: &str| -> GenResult<String> {
            match operands {
                [a, b] => Ok(format!("{name}({a}, {b})")),
                _ => Err(Self::unsupported(op, sig)),
            }
        };
        match op.vector {
            VectorOp::Intrinsic(name) => two_operands(name),
            VectorOp::Compare(name) => {
                let mask = two_operands(name)?;
                Ok(match self.comparisons {
                    ComparisonPolicy::Mask => mask,
                    ComparisonPolicy::Normalize => format!("_mm_and_ps({mask}, _mm_set_ps1(1.f))"),
                })
            }
            VectorOp::Expression(text) => {
                let names: Vec<String> = (1..=operands.len()).map(arg_name).collect();
                let mut bindings = Bindings::new();
                for (name, operand) in names.iter().zip(operands) {
                    bindings.set(name.as_str(), operand.clone());
                }
                render(text, &bindings)
            }
        }
    }

    fn render_unrolled(&self, op: &Operator, sig: &Signature) -> GenResult<String> {
        let unroller = if sig.is_all_buffer() {
            format!("{}_vec_simd_mp", op.label)
        } else {
            format!("{}_vec_simd_mp_iteration", op.label)
        };

        let mut unroller_params = Vec::new();
        let mut loads = String::new();
        let mut operands = Vec::new();
        let mut recurse_args = Vec::new();
        let mut params = Vec::new();
        let mut broadcasts = String::new();
        let mut call_args = Vec::new();
        let mut advances = String::new();

        for (pos, kind) in sig.positions() {
            let src = format!("src{pos}");
            let arg = arg_name(pos);
            let reg = format!("in{pos}");
            match kind {
                ArgKind::Buffer => {
                    unroller_params.push(format!("const float * {src}"));
                    loads.push_str(&format!("    const __m128 {reg} = _mm_load_ps({src});\n"));
                    operands.push(reg);
                    recurse_args.push(format!("{src}+{REGISTER_WIDTH}"));
                    params.push(format!("const float * {arg}"));
                    call_args.push(arg.clone());
                    advances.push_str(&format!("        {arg} += samples_per_loop;\n"));
                }
                ArgKind::Scalar => {
                    unroller_params.push(format!("const __m128 & {src}"));
                    operands.push(src.clone());
                    recurse_args.push(src);
                    params.push(format!("const float {arg}"));
                    broadcasts.push_str(&format!("    const __m128 {reg} = _mm_set_ps1({arg});\n"));
                    call_args.push(reg);
                }
                ArgKind::Ramp => return Err(Self::unsupported(op, sig)),
            }
        }

        let bindings = Bindings::new()
            .with("heading", sig.describe())
            .with("label", op.label)
            .with("unroller", unroller)
            .with("unroller_params", unroller_params.join(", "))
            .with("loads", loads)
            .with("expression", self.expression(op, sig, &operands)?)
            .with("width", REGISTER_WIDTH.to_string())
            .with("recurse_args", recurse_args.join(", "))
            .with("params", params.join(", "))
            .with("broadcasts", broadcasts)
            .with("call_args", call_args.join(", "))
            .with("advances", advances);
        render(UNROLLED_KERNEL, &bindings)
    }

    fn render_ramp(&self, op: &Operator, sig: &Signature) -> GenResult<String> {
        let mut params = Vec::new();
        let mut setup = String::new();
        let mut loads = String::new();
        let mut operands = Vec::new();
        let mut ramp_advances = String::new();
        let mut pointer_advances = String::new();

        for (pos, kind) in sig.positions() {
            let arg = arg_name(pos);
            let reg = format!("in{pos}");
            match kind {
                ArgKind::Buffer => {
                    params.push(format!("const float * {arg}"));
                    loads.push_str(&format!("            const __m128 {reg} = _mm_load_ps({arg});\n"));
                    pointer_advances.push_str(&format!("            {arg} += {REGISTER_WIDTH};\n"));
                }
                ArgKind::Scalar => {
                    params.push(format!("const float {arg}"));
                    setup.push_str(&format!("    const __m128 {reg} = _mm_set_ps1({arg});\n"));
                }
                ArgKind::Ramp => {
                    let slope = slope_name(pos);
                    params.push(format!("float {arg}, const float {slope}"));
                    let lanes: Vec<String> = RAMP_SET_ORDER
                        .iter()
                        .map(|&offset| match offset {
                            0 => arg.clone(),
                            1 => format!("{arg} + {slope}"),
                            k => format!("{arg} + {k}*{slope}"),
                        })
                        .collect();
                    setup.push_str(&format!("    __m128 {reg} = _mm_set_ps({});\n", lanes.join(", ")));
                    setup.push_str(&format!(
                        "    const __m128 {arg}_vslope = _mm_set_ps1({RAMP_STEP}*{slope});\n"
                    ));
                    ramp_advances.push_str(&format!("            {reg} = _mm_add_ps({reg}, {arg}_vslope);\n"));
                }
            }
            operands.push(reg);
        }

        let step = format!(
            "        {{\n{loads}            const __m128 result = {};\n            _mm_store_ps(out, result);\n{ramp_advances}            out += {REGISTER_WIDTH};\n{pointer_advances}        }}\n",
            self.expression(op, sig, &operands)?
        );
        let steps = step.repeat(STEPS_PER_LOOP);

        let bindings = Bindings::new()
            .with("heading", sig.describe())
            .with("label", op.label)
            .with("params", params.join(", "))
            .with("setup", setup)
            .with("steps", steps);
        render(RAMP_KERNEL, &bindings)
    }
}

impl Backend for SseBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sse
    }

    fn forms(&self) -> &'static [LoopForm] {
        &[LoopForm::Blocked]
    }

    fn prologue(&self, _family: Family) -> GenResult<String> {
        render(PROLOGUE, &Bindings::new().with("samples", SAMPLES_PER_LOOP.to_string()))
    }

    fn epilogue(&self, _family: Family) -> GenResult<String> {
        Ok(EPILOGUE.to_string())
    }

    fn render_kernel(&self, op: &Operator, sig: &Signature, form: LoopForm) -> GenResult<String> {
        if form != LoopForm::Blocked || sig.arity() != op.arity || !sig.has_buffer() {
            return Err(Self::unsupported(op, sig));
        }
        if sig.has_ramp() {
            self.render_ramp(op, sig)
        } else {
            self.render_unrolled(op, sig)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::Catalog;
    use ArgKind::*;

    fn op(label: &str) -> Operator {
        *Catalog::builtin().unwrap().get(label).unwrap()
    }

    #[test]
    fn test_vector_vector_unroller() {
        let text = SseBackend::default()
            .render_kernel(&op("plus"), &Signature::new(vec![Buffer, Buffer]), LoopForm::Blocked)
            .unwrap();
        assert!(text.contains("always_inline void plus_vec_simd_mp(float * out, const float * src1, const float * src2)"));
        assert!(text.contains("const __m128 result = _mm_add_ps(in1, in2);"));
        assert!(text.contains("plus_vec_simd_mp<n-4>(out+4, src1+4, src2+4);"));
        assert!(text.contains("always_inline void plus_vec_simd_mp<0>(float * out, const float * src1, const float * src2)\n{}"));
        assert!(text.contains("detail::plus_vec_simd_mp<samples_per_loop>(out, arg1, arg2);"));
    }

    #[test]
    fn test_scalar_operand_is_broadcast_once() {
        let text = SseBackend::default()
            .render_kernel(&op("minus"), &Signature::new(vec![Scalar, Buffer]), LoopForm::Blocked)
            .unwrap();
        assert!(text.contains("minus_vec_simd_mp_iteration(float * out, const __m128 & src1, const float * src2)"));
        assert!(text.contains("const __m128 in1 = _mm_set_ps1(arg1);"));
        assert!(text.contains("_mm_sub_ps(src1, in2)"));
        assert!(text.contains("minus_vec_simd_mp_iteration<n-4>(out+4, src1, src2+4);"));
        assert!(text.contains("        arg2 += samples_per_loop;\n"));
        assert!(!text.contains("arg1 += samples_per_loop"));
    }

    #[test]
    fn test_ramp_lane_order_and_slope_step() {
        let text = SseBackend::default()
            .render_kernel(&op("plus"), &Signature::new(vec![Buffer, Ramp]), LoopForm::Blocked)
            .unwrap();
        assert!(text.contains("inline void plus_vec_simd(float * out, const float * arg1, float arg2, const float arg2_slope, unsigned int n)"));
        assert!(text.contains(
            "__m128 in2 = _mm_set_ps(arg2 + 3*arg2_slope, arg2 + 2*arg2_slope, arg2 + arg2_slope, arg2);"
        ));
        assert!(text.contains("const __m128 arg2_vslope = _mm_set_ps1(4*arg2_slope);"));
        assert_eq!(text.matches("in2 = _mm_add_ps(in2, arg2_vslope);").count(), STEPS_PER_LOOP);
        assert_eq!(text.matches("_mm_store_ps(out, result);").count(), STEPS_PER_LOOP);
    }

    #[test]
    fn test_comparison_policies() {
        let sig = Signature::new(vec![Buffer, Buffer]);
        let normalized = SseBackend::new(ComparisonPolicy::Normalize)
            .render_kernel(&op("less"), &sig, LoopForm::Blocked)
            .unwrap();
        assert!(normalized.contains("_mm_and_ps(_mm_cmplt_ps(in1, in2), _mm_set_ps1(1.f))"));

        let masked = SseBackend::new(ComparisonPolicy::Mask)
            .render_kernel(&op("less"), &sig, LoopForm::Blocked)
            .unwrap();
        assert!(masked.contains("const __m128 result = _mm_cmplt_ps(in1, in2);"));
        assert!(!masked.contains("_mm_and_ps"));
    }

    #[test]
    fn test_ternary_expression() {
        let text = SseBackend::default()
            .render_kernel(&op("muladd"), &Signature::new(vec![Buffer, Scalar, Scalar]), LoopForm::Blocked)
            .unwrap();
        assert!(text.contains("_mm_add_ps(_mm_mul_ps(in1, src2), src3)"));
        assert!(text.contains(
            "inline void muladd_vec_simd(float * out, const float * arg1, const float arg2, const float arg3, unsigned int n)"
        ));
    }

    #[test]
    fn test_tail_safe_form_unsupported() {
        let err = SseBackend::default()
            .render_kernel(&op("plus"), &Signature::new(vec![Buffer, Buffer]), LoopForm::TailSafe)
            .unwrap_err();
        assert!(matches!(err, GenError::UnsupportedSignature { backend: "sse", .. }));
    }

    #[test]
    fn test_intrinsic_on_ternary_shape_unsupported() {
        let err = SseBackend::default()
            .render_kernel(&op("plus"), &Signature::new(vec![Buffer, Buffer, Buffer]), LoopForm::Blocked)
            .unwrap_err();
        assert!(matches!(err, GenError::UnsupportedSignature { .. }));
    }

    #[test]
    fn test_prologue_and_epilogue() {
        let backend = SseBackend::default();
        assert!(backend.prologue(Family::Binary).unwrap().contains("#define samples_per_loop 8"));
        assert!(backend.epilogue(Family::Binary).unwrap().contains("#undef samples_per_loop"));
    }
}
