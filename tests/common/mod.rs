//! Shared fixtures for kernel tests.

#![allow(dead_code)]

use simdgen::simulate::Operand;
use simdgen::{ArgKind, Signature};

/// Element count used by the equivalence tests; a multiple of every block width.
pub const N: usize = 16;

/// Distinct, non-zero buffers so comparisons see both outcomes.
pub fn buffers() -> Vec<Vec<f32>> {
    vec![
        (1..=N).map(|i| i as f32 * 0.5).collect(),
        (0..N).map(|i| ((i * 7) % 5) as f32 + 1.0).collect(),
        (0..N).map(|i| 6.0 - (i % 4) as f32).collect(),
    ]
}

/// Operands matching `sig`, drawn from `buffers`.
pub fn operands<'a>(sig: &Signature, buffers: &'a [Vec<f32>]) -> Vec<Operand<'a>> {
    sig.positions()
        .map(|(pos, kind)| match kind {
            ArgKind::Buffer => Operand::Buffer(&buffers[pos - 1]),
            ArgKind::Scalar => Operand::Scalar(pos as f32 + 1.5),
            ArgKind::Ramp => Operand::Ramp {
                start: 1.5,
                slope: 0.25,
            },
        })
        .collect()
}
