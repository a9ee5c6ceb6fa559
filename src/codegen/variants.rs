// This module is the variant enumerator: for an operator arity and a backend it produces the
// ordered, closed list of signatures that must be generated. The lists are derived from the
// Cartesian product of argument kinds and then filtered by per-backend policy. Two policies
// are deliberately irregular and are special-cased here rather than derived: binary operators
// never get an all-scalar kernel while ternary operators do, and ternary ramps only ever sit on
// argument positions 2 and 3. The order is fixed so that generated output is reproducible.

//! Signature enumeration per arity and backend.

use super::patterns::{ArgKind, Signature};
use crate::core::config::BackendKind;
use crate::core::error::{GenError, GenResult};

/// All buffer/scalar combinations of `arity`, first argument most significant,
/// buffers before scalars.
fn plain_product(arity: usize) -> Vec<Signature> {
    (0..1usize << arity)
        .map(|bits| {
            let args = (0..arity)
                .map(|i| {
                    if bits & (1 << (arity - 1 - i)) == 0 {
                        ArgKind::Buffer
                    } else {
                        ArgKind::Scalar
                    }
                })
                .collect();
            Signature::new(args)
        })
        .collect()
}

/// Binary shapes: BB, BS, SB, BR, RB.
fn binary() -> Vec<Signature> {
    use ArgKind::*;
    // SS is not generated for binary operators.
    let mut sigs: Vec<Signature> = plain_product(2)
        .into_iter()
        .filter(Signature::has_buffer)
        .collect();
    sigs.push(Signature::new(vec![Buffer, Ramp]));
    sigs.push(Signature::new(vec![Ramp, Buffer]));
    sigs
}

/// Ternary ramp shapes. Argument 1 is never ramped; every scalar among
/// arguments 2 and 3 is.
fn ternary_ramps() -> Vec<Signature> {
    use ArgKind::*;
    let tails = [[Buffer, Ramp], [Ramp, Buffer], [Ramp, Ramp]];
    [Buffer, Scalar]
        .into_iter()
        .flat_map(|first| tails.iter().map(move |tail| Signature::new(vec![first, tail[0], tail[1]])))
        .collect()
}

/// Ordered signatures to emit for `arity` on `backend`.
pub fn signatures(arity: usize, backend: BackendKind) -> GenResult<Vec<Signature>> {
    use ArgKind::*;
    match (arity, backend) {
        (2, _) => Ok(binary()),
        (3, BackendKind::Generic) => {
            // Includes the degenerate all-scalar kernel.
            let mut sigs = plain_product(3);
            sigs.extend(ternary_ramps());
            Ok(sigs)
        }
        (3, BackendKind::Sse) => Ok(vec![
            Signature::new(vec![Buffer, Buffer, Buffer]),
            Signature::new(vec![Buffer, Scalar, Scalar]),
        ]),
        (arity, _) => Err(GenError::InvalidArity {
            label: format!("<{arity}-ary>"),
            arity,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ArgKind::*;

    fn described(sigs: &[Signature]) -> Vec<String> {
        sigs.iter().map(Signature::describe).collect()
    }

    #[test]
    fn test_binary_order() {
        for backend in [BackendKind::Generic, BackendKind::Sse] {
            let sigs = signatures(2, backend).unwrap();
            assert_eq!(
                described(&sigs),
                vec![
                    "vector/vector",
                    "vector/scalar",
                    "scalar/vector",
                    "vector/ramp",
                    "ramp/vector"
                ]
            );
        }
    }

    #[test]
    fn test_binary_never_all_scalar() {
        let sigs = signatures(2, BackendKind::Generic).unwrap();
        assert!(sigs.iter().all(Signature::has_buffer));
    }

    #[test]
    fn test_ternary_generic_plain_block() {
        let sigs = signatures(3, BackendKind::Generic).unwrap();
        assert_eq!(sigs.len(), 14);
        assert_eq!(
            described(&sigs[..8]),
            vec![
                "vector/vector/vector",
                "vector/vector/scalar",
                "vector/scalar/vector",
                "vector/scalar/scalar",
                "scalar/vector/vector",
                "scalar/vector/scalar",
                "scalar/scalar/vector",
                "scalar/scalar/scalar"
            ]
        );
        assert_eq!(sigs[7], Signature::new(vec![Scalar, Scalar, Scalar]));
    }

    #[test]
    fn test_ternary_ramps_skip_first_position() {
        let sigs = signatures(3, BackendKind::Generic).unwrap();
        let ramps: Vec<_> = sigs.iter().filter(|s| s.has_ramp()).collect();
        assert_eq!(ramps.len(), 6);
        for sig in ramps {
            assert_ne!(sig.kinds()[0], Ramp);
            let ramped = sig.kinds()[1..].iter().filter(|k| k.is_ramp()).count();
            assert!((1..=2).contains(&ramped));
        }
    }

    #[test]
    fn test_ternary_sse_subset() {
        let sigs = signatures(3, BackendKind::Sse).unwrap();
        assert_eq!(described(&sigs), vec!["vector/vector/vector", "vector/scalar/scalar"]);
    }

    #[test]
    fn test_invalid_arity() {
        assert!(matches!(
            signatures(4, BackendKind::Generic),
            Err(GenError::InvalidArity { arity: 4, .. })
        ));
    }

    #[test]
    fn test_enumeration_is_stable() {
        let first = signatures(3, BackendKind::Generic).unwrap();
        let second = signatures(3, BackendKind::Generic).unwrap();
        assert_eq!(first, second);
    }
}
