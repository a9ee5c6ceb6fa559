// This module is the reference model for generated kernels. It executes a kernel for a given
// operator, signature and backend over f32 slices with the same control structure the emitted
// code has: do/while trip counts, n / block trip counts for blocked loops, the compile-time
// unroll schedule, broadcast scalars, and ramp registers seeded through the _mm_set_ps argument
// order and advanced by RAMP_STEP * slope per register step. SSE kernels evaluate the exact
// vector expression text the renderer prints, through a small interpreter for intrinsic calls,
// so comparison normalisation and ternary compositions are checked as emitted.

//! Reference model for generated kernels.

use crate::codegen::patterns::{arg_name, ArgKind, LoopForm, Signature};
use crate::codegen::variants::signatures;
use crate::core::config::{BackendKind, ComparisonPolicy};
use crate::generic::BLOCK_WIDTH;
use crate::templates::{Operator, Semantics};
use crate::x64::backend::SseBackend;
use crate::x64::lanes::{unroll_schedule, F32x4, RAMP_SET_ORDER, RAMP_STEP, REGISTER_WIDTH, SAMPLES_PER_LOOP, STEPS_PER_LOOP};
use thiserror::Error;

/// One kernel argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand<'a> {
    Buffer(&'a [f32]),
    Scalar(f32),
    Ramp { start: f32, slope: f32 },
}

impl Operand<'_> {
    fn kind(&self) -> ArgKind {
        match self {
            Operand::Buffer(_) => ArgKind::Buffer,
            Operand::Scalar(_) => ArgKind::Scalar,
            Operand::Ramp { .. } => ArgKind::Ramp,
        }
    }
}

/// Reasons a simulated kernel call cannot run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("No {backend} kernel is generated for `{label}` with signature {signature}")]
    NotGenerated {
        label: String,
        signature: String,
        backend: &'static str,
    },

    #[error("Signature {signature} takes {expected} operands, got {actual}")]
    ArityMismatch {
        signature: String,
        expected: usize,
        actual: usize,
    },

    #[error("Operand {position} is a {actual} but the signature expects a {expected}")]
    ShapeMismatch {
        position: usize,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Buffer operand {position} holds {len} elements, the kernel reads {needed}")]
    ShortBuffer {
        position: usize,
        len: usize,
        needed: usize,
    },

    #[error("Kernels require n > 0")]
    EmptyInput,

    #[error("Blocked kernel needs n >= {block}, got {n}")]
    ZeroTripCount { n: usize, block: usize },

    #[error("Fixed-length width {n} never reaches the unroller base case")]
    UnrollWidth { n: usize },

    #[error("Cannot evaluate `{text}`: {reason}")]
    Expression { text: String, reason: String },

    #[error("{semantics:?} is not defined for {arity} operands")]
    SemanticsArity { semantics: Semantics, arity: usize },
}

type SimResult<T> = Result<T, SimulationError>;

fn check_generated(op: &Operator, sig: &Signature, backend: BackendKind) -> SimResult<()> {
    let generated = signatures(op.arity, backend)
        .map(|sigs| sigs.contains(sig))
        .unwrap_or(false);
    if generated {
        Ok(())
    } else {
        Err(SimulationError::NotGenerated {
            label: op.label.to_string(),
            signature: sig.describe(),
            backend: backend.name(),
        })
    }
}

fn check_operands(sig: &Signature, operands: &[Operand<'_>], needed: usize) -> SimResult<()> {
    if operands.len() != sig.arity() {
        return Err(SimulationError::ArityMismatch {
            signature: sig.describe(),
            expected: sig.arity(),
            actual: operands.len(),
        });
    }
    for ((position, expected), operand) in sig.positions().zip(operands) {
        if operand.kind() != expected {
            return Err(SimulationError::ShapeMismatch {
                position,
                expected: expected.describe(),
                actual: operand.kind().describe(),
            });
        }
        if let Operand::Buffer(data) = operand {
            if data.len() < needed {
                return Err(SimulationError::ShortBuffer {
                    position,
                    len: data.len(),
                    needed,
                });
            }
        }
    }
    Ok(())
}

/// `std::min`: `(b < a) ? b : a`.
fn std_min(a: f32, b: f32) -> f32 {
    if b < a {
        b
    } else {
        a
    }
}

/// `std::max`: `(a < b) ? b : a`.
fn std_max(a: f32, b: f32) -> f32 {
    if a < b {
        b
    } else {
        a
    }
}

fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Scalar semantics of the portable expression.
pub fn apply_scalar(semantics: Semantics, args: &[f32]) -> SimResult<f32> {
    let value = match (semantics, args) {
        (Semantics::Plus, [a, b]) => a + b,
        (Semantics::Minus, [a, b]) => a - b,
        (Semantics::Times, [a, b]) => a * b,
        (Semantics::Over, [a, b]) => a / b,
        (Semantics::Min, [a, b]) => std_min(*a, *b),
        (Semantics::Max, [a, b]) => std_max(*a, *b),
        (Semantics::Less, [a, b]) => flag(a < b),
        (Semantics::LessEqual, [a, b]) => flag(a <= b),
        (Semantics::Greater, [a, b]) => flag(a > b),
        (Semantics::GreaterEqual, [a, b]) => flag(a >= b),
        (Semantics::Equal, [a, b]) => flag(a == b),
        (Semantics::NotEqual, [a, b]) => flag(a != b),
        (Semantics::Clip, [value, low, high]) => std_max(std_min(*value, *high), *low),
        (Semantics::MulAdd, [value, mul, add]) => value * mul + add,
        (Semantics::AmpMod, [signal, modulator, amount]) => signal * (1.0 + modulator * amount),
        _ => {
            return Err(SimulationError::SemanticsArity {
                semantics,
                arity: args.len(),
            })
        }
    };
    Ok(value)
}

/// Run the portable `<label>_vec` (tail-safe) or `<label>_vec_simd` (blocked) kernel.
///
/// Blocked kernels process `n / BLOCK_WIDTH * BLOCK_WIDTH` elements; the rest
/// of the output stays zero.
pub fn run_generic(
    op: &Operator,
    sig: &Signature,
    form: LoopForm,
    operands: &[Operand<'_>],
    n: usize,
) -> SimResult<Vec<f32>> {
    check_generated(op, sig, BackendKind::Generic)?;
    if n == 0 {
        return Err(SimulationError::EmptyInput);
    }
    let processed = match form {
        LoopForm::TailSafe => n,
        LoopForm::Blocked => {
            let loops = n / BLOCK_WIDTH;
            if loops == 0 {
                return Err(SimulationError::ZeroTripCount { n, block: BLOCK_WIDTH });
            }
            loops * BLOCK_WIDTH
        }
    };
    check_operands(sig, operands, processed)?;

    let mut ramps: Vec<f32> = operands
        .iter()
        .map(|operand| match operand {
            Operand::Ramp { start, .. } => *start,
            _ => 0.0,
        })
        .collect();
    let mut out = vec![0.0; n];
    let mut args = vec![0.0; operands.len()];

    for (i, slot) in out.iter_mut().enumerate().take(processed) {
        for (j, operand) in operands.iter().enumerate() {
            args[j] = match operand {
                Operand::Buffer(data) => data[i],
                Operand::Scalar(value) => *value,
                Operand::Ramp { .. } => ramps[j],
            };
        }
        *slot = apply_scalar(op.semantics, &args)?;
        for (j, operand) in operands.iter().enumerate() {
            if let Operand::Ramp { slope, .. } = operand {
                ramps[j] += *slope;
            }
        }
    }
    Ok(out)
}

/// Value during evaluation of a vector expression.
#[derive(Debug, Clone, Copy)]
enum Value {
    Reg(F32x4),
    Num(f32),
}

struct ExprEval<'e> {
    text: &'e str,
    pos: usize,
    bindings: &'e [(String, F32x4)],
}

impl<'e> ExprEval<'e> {
    fn error(&self, reason: impl Into<String>) -> SimulationError {
        SimulationError::Expression {
            text: self.text.to_string(),
            reason: reason.into(),
        }
    }

    fn skip_ws(&mut self) {
        while self.text[self.pos..].starts_with(' ') {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> SimResult<()> {
        self.skip_ws();
        if self.text[self.pos..].starts_with(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected `{c}` at byte {}", self.pos)))
        }
    }

    fn token(&mut self) -> &'e str {
        self.skip_ws();
        let text = self.text;
        let rest = &text[self.pos..];
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn expr(&mut self) -> SimResult<Value> {
        let token = self.token();
        if token.is_empty() {
            return Err(self.error(format!("expected operand at byte {}", self.pos)));
        }
        if token.starts_with(|c: char| c.is_ascii_digit()) {
            let number = token.trim_end_matches('f');
            return number
                .parse::<f32>()
                .map(Value::Num)
                .map_err(|_| self.error(format!("bad literal `{token}`")));
        }
        self.skip_ws();
        if !self.text[self.pos..].starts_with('(') {
            return self
                .bindings
                .iter()
                .find(|(name, _)| name == token)
                .map(|(_, reg)| Value::Reg(*reg))
                .ok_or_else(|| self.error(format!("unbound register `{token}`")));
        }

        self.expect('(')?;
        let mut args = vec![self.expr()?];
        loop {
            self.skip_ws();
            if self.text[self.pos..].starts_with(',') {
                self.pos += 1;
                args.push(self.expr()?);
            } else {
                break;
            }
        }
        self.expect(')')?;
        self.call(token, &args)
    }

    fn call(&self, name: &str, args: &[Value]) -> SimResult<Value> {
        if name == "_mm_set_ps1" {
            return match args {
                [Value::Num(v)] => Ok(Value::Reg(F32x4::splat(*v))),
                _ => Err(self.error("_mm_set_ps1 takes one literal")),
            };
        }
        let (a, b) = match args {
            [Value::Reg(a), Value::Reg(b)] => (*a, *b),
            _ => return Err(self.error(format!("`{name}` takes two registers"))),
        };
        let reg = match name {
            "_mm_add_ps" => a.add(b),
            "_mm_sub_ps" => a.sub(b),
            "_mm_mul_ps" => a.mul(b),
            "_mm_div_ps" => a.div(b),
            "_mm_min_ps" => a.min(b),
            "_mm_max_ps" => a.max(b),
            "_mm_and_ps" => a.and(b),
            "_mm_cmplt_ps" => a.compare(b, |x, y| x < y),
            "_mm_cmple_ps" => a.compare(b, |x, y| x <= y),
            "_mm_cmpgt_ps" => a.compare(b, |x, y| x > y),
            "_mm_cmpge_ps" => a.compare(b, |x, y| x >= y),
            "_mm_cmpeq_ps" => a.compare(b, |x, y| x == y),
            "_mm_cmpneq_ps" => a.compare(b, |x, y| x != y),
            other => return Err(self.error(format!("unknown intrinsic `{other}`"))),
        };
        Ok(Value::Reg(reg))
    }
}

/// Evaluate an SSE intrinsic expression with `bindings` for its register names.
pub fn eval_vector(text: &str, bindings: &[(String, F32x4)]) -> SimResult<F32x4> {
    let mut eval = ExprEval { text, pos: 0, bindings };
    let value = eval.expr()?;
    eval.skip_ws();
    if eval.pos != text.len() {
        return Err(eval.error(format!("trailing input at byte {}", eval.pos)));
    }
    match value {
        Value::Reg(reg) => Ok(reg),
        Value::Num(_) => Err(eval.error("expression yields a scalar")),
    }
}

/// Printed expression for `op` over registers `arg1`..`argN`.
fn printed_expression(op: &Operator, sig: &Signature, policy: ComparisonPolicy) -> SimResult<String> {
    let names: Vec<String> = (1..=sig.arity()).map(arg_name).collect();
    SseBackend::new(policy)
        .expression(op, sig, &names)
        .map_err(|err| SimulationError::Expression {
            text: op.label.to_string(),
            reason: err.to_string(),
        })
}

fn step(expression: &str, regs: Vec<(String, F32x4)>, out: &mut [f32]) -> SimResult<()> {
    eval_vector(expression, &regs)?.store(out);
    Ok(())
}

/// Run the SSE `<label>_vec_simd(..., n)` specialization.
pub fn run_sse(
    op: &Operator,
    sig: &Signature,
    operands: &[Operand<'_>],
    n: usize,
    policy: ComparisonPolicy,
) -> SimResult<Vec<f32>> {
    check_generated(op, sig, BackendKind::Sse)?;
    let loops = n / SAMPLES_PER_LOOP;
    if loops == 0 {
        return Err(SimulationError::ZeroTripCount { n, block: SAMPLES_PER_LOOP });
    }
    check_operands(sig, operands, loops * SAMPLES_PER_LOOP)?;
    let expression = printed_expression(op, sig, policy)?;
    let mut out = vec![0.0; n];

    if !sig.has_ramp() {
        let schedule = unroll_schedule(SAMPLES_PER_LOOP).ok_or(SimulationError::UnrollWidth { n: SAMPLES_PER_LOOP })?;
        for l in 0..loops {
            let base = l * SAMPLES_PER_LOOP;
            for &offset in &schedule {
                let at = base + offset;
                step(&expression, registers(operands, at), &mut out[at..])?;
            }
        }
        return Ok(out);
    }

    let mut ramps: Vec<Option<(F32x4, F32x4)>> = operands
        .iter()
        .map(|operand| match operand {
            Operand::Ramp { start, slope } => {
                let lanes: Vec<f32> = RAMP_SET_ORDER
                    .iter()
                    .map(|&offset| match offset {
                        0 => *start,
                        1 => start + slope,
                        k => start + k as f32 * slope,
                    })
                    .collect();
                let seed = F32x4::set_ps(lanes[0], lanes[1], lanes[2], lanes[3]);
                Some((seed, F32x4::splat(RAMP_STEP as f32 * slope)))
            }
            _ => None,
        })
        .collect();

    for l in 0..loops {
        for s in 0..STEPS_PER_LOOP {
            let at = l * SAMPLES_PER_LOOP + s * REGISTER_WIDTH;
            let mut regs = registers(operands, at);
            for (j, ramp) in ramps.iter().enumerate() {
                if let Some((reg, _)) = ramp {
                    regs[j].1 = *reg;
                }
            }
            step(&expression, regs, &mut out[at..])?;
            for (reg, vslope) in ramps.iter_mut().flatten() {
                *reg = reg.add(*vslope);
            }
        }
    }
    Ok(out)
}

/// Run the fixed-length `template <int n> <label>_vec_simd` entry point.
pub fn run_sse_fixed(
    op: &Operator,
    sig: &Signature,
    operands: &[Operand<'_>],
    n: usize,
    policy: ComparisonPolicy,
) -> SimResult<Vec<f32>> {
    check_generated(op, sig, BackendKind::Sse)?;
    if sig.has_ramp() {
        return Err(SimulationError::NotGenerated {
            label: op.label.to_string(),
            signature: sig.describe(),
            backend: BackendKind::Sse.name(),
        });
    }
    let schedule = unroll_schedule(n).ok_or(SimulationError::UnrollWidth { n })?;
    check_operands(sig, operands, n)?;
    let expression = printed_expression(op, sig, policy)?;
    let mut out = vec![0.0; n];
    for offset in schedule {
        step(&expression, registers(operands, offset), &mut out[offset..])?;
    }
    Ok(out)
}

/// Registers `arg1`..`argN` for the register step starting at element `at`.
fn registers(operands: &[Operand<'_>], at: usize) -> Vec<(String, F32x4)> {
    operands
        .iter()
        .enumerate()
        .map(|(j, operand)| {
            let reg = match operand {
                Operand::Buffer(data) => F32x4::load(&data[at..]),
                Operand::Scalar(value) => F32x4::splat(*value),
                Operand::Ramp { start, .. } => F32x4::splat(*start),
            };
            (arg_name(j + 1), reg)
        })
        .collect()
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
    fn test_eval_vector_nested() {
        let bindings = vec![
            ("arg1".to_string(), F32x4([1.0, 2.0, 3.0, 4.0])),
            ("arg2".to_string(), F32x4::splat(2.0)),
            ("arg3".to_string(), F32x4::splat(1.0)),
        ];
        let reg = eval_vector("_mm_add_ps(_mm_mul_ps(arg1, arg2), arg3)", &bindings).unwrap();
        assert_eq!(reg.0, [3.0, 5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_eval_vector_rejects_unknown() {
        let bindings = vec![("arg1".to_string(), F32x4::splat(1.0))];
        assert!(matches!(
            eval_vector("_mm_sqrt_ps(arg1, arg1)", &bindings),
            Err(SimulationError::Expression { .. })
        ));
        assert!(matches!(
            eval_vector("arg9", &bindings),
            Err(SimulationError::Expression { .. })
        ));
    }

    #[test]
    fn test_generic_rejects_binary_all_scalar() {
        let err = run_generic(
            &op("plus"),
            &Signature::new(vec![Scalar, Scalar]),
            LoopForm::TailSafe,
            &[Operand::Scalar(1.0), Operand::Scalar(2.0)],
            4,
        )
        .unwrap_err();
        assert!(matches!(err, SimulationError::NotGenerated { .. }));
    }

    #[test]
    fn test_apply_scalar_rejects_wrong_operand_count() {
        assert_eq!(apply_scalar(Semantics::MulAdd, &[2.0, 3.0, 4.0]), Ok(10.0));
        assert_eq!(
            apply_scalar(Semantics::Plus, &[1.0, 2.0, 3.0]),
            Err(SimulationError::SemanticsArity {
                semantics: Semantics::Plus,
                arity: 3
            })
        );
        assert!(matches!(
            apply_scalar(Semantics::Clip, &[1.0, 2.0]),
            Err(SimulationError::SemanticsArity { arity: 2, .. })
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let data = [1.0; 8];
        let err = run_generic(
            &op("plus"),
            &Signature::new(vec![Buffer, Buffer]),
            LoopForm::TailSafe,
            &[Operand::Buffer(&data), Operand::Scalar(2.0)],
            8,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SimulationError::ShapeMismatch {
                position: 2,
                expected: "vector",
                actual: "scalar"
            }
        );
    }

    #[test]
    fn test_blocked_needs_one_block() {
        let data = [1.0; 4];
        let err = run_generic(
            &op("plus"),
            &Signature::new(vec![Buffer, Scalar]),
            LoopForm::Blocked,
            &[Operand::Buffer(&data), Operand::Scalar(2.0)],
            4,
        )
        .unwrap_err();
        assert_eq!(err, SimulationError::ZeroTripCount { n: 4, block: 8 });
    }

    #[test]
    fn test_blocked_truncates_remainder() {
        let data: Vec<f32> = (1..=10).map(|v| v as f32).collect();
        let out = run_generic(
            &op("plus"),
            &Signature::new(vec![Buffer, Scalar]),
            LoopForm::Blocked,
            &[Operand::Buffer(&data), Operand::Scalar(1.0)],
            10,
        )
        .unwrap();
        assert_eq!(&out[..8], &[2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(&out[8..], &[0.0, 0.0]);
    }

    #[test]
    fn test_short_buffer() {
        let data = [1.0; 3];
        let err = run_generic(
            &op("plus"),
            &Signature::new(vec![Buffer, Scalar]),
            LoopForm::TailSafe,
            &[Operand::Buffer(&data), Operand::Scalar(2.0)],
            4,
        )
        .unwrap_err();
        assert!(matches!(err, SimulationError::ShortBuffer { position: 1, len: 3, needed: 4 }));
    }

    #[test]
    fn test_fixed_length_entry() {
        let a: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let out = run_sse_fixed(
            &op("times"),
            &Signature::new(vec![Buffer, Scalar]),
            &[Operand::Buffer(&a), Operand::Scalar(2.0)],
            12,
            ComparisonPolicy::Normalize,
        )
        .unwrap();
        let expected: Vec<f32> = (0..12).map(|v| 2.0 * v as f32).collect();
        assert_eq!(out, expected);

        let err = run_sse_fixed(
            &op("times"),
            &Signature::new(vec![Buffer, Scalar]),
            &[Operand::Buffer(&a), Operand::Scalar(2.0)],
            6,
            ComparisonPolicy::Normalize,
        )
        .unwrap_err();
        assert_eq!(err, SimulationError::UnrollWidth { n: 6 });
    }
}
