// This module assembles complete generated units. It picks the backend for a configuration,
// runs the KernelGenerator to obtain the body text, and wraps that body into a self-contained
// header: generation banner, include guard, the fixed include list of the (backend, family)
// pair, and the namespace block. The unit parameters are fixed per pair and never computed.
// The unit text is a pure function of the catalog and the configuration, so regenerating from
// an unchanged catalog yields byte-identical output. write_unit is the only side effect and
// runs once, after the whole unit exists. Files are written to a temporary sibling and renamed
// over the destination, so a failed write leaves the previous file untouched.

//! Unit assembly and output.

use crate::core::compiler::KernelGenerator;
use crate::core::config::{BackendKind, Family, GeneratorConfig};
use crate::core::error::{GenError, GenResult};
use crate::core::session::SessionStats;
use crate::generic::GenericBackend;
use crate::templates::Catalog;
use crate::x64::SseBackend;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Fixed wrapper parameters for one (backend, family) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSpec {
    pub description: &'static str,
    pub guard: &'static str,
    pub includes: &'static [&'static str],
}

/// Wrapper parameters for `backend` and `family`.
pub fn unit_spec(backend: BackendKind, family: Family) -> UnitSpec {
    match (backend, family) {
        (BackendKind::Generic, Family::Binary) => UnitSpec {
            description: "templated arithmetic simd functions",
            guard: "SIMD_BINARY_ARITHMETIC_GENERIC_HPP",
            includes: &["<functional>", "<algorithm>"],
        },
        (BackendKind::Generic, Family::Ternary) => UnitSpec {
            description: "templated arithmetic simd functions",
            guard: "SIMD_TERNARY_ARITHMETIC_GENERIC_HPP",
            includes: &["<algorithm>"],
        },
        (BackendKind::Sse, Family::Binary) => UnitSpec {
            description: "binary arithmetic simd functions for sse",
            guard: "SIMD_BINARY_ARITHMETIC_SSE_HPP",
            includes: &["<xmmintrin.h>", "\"simd_binary_arithmetic_generic.hpp\""],
        },
        (BackendKind::Sse, Family::Ternary) => UnitSpec {
            description: "ternary arithmetic simd functions for sse",
            guard: "SIMD_TERNARY_ARITHMETIC_SSE_HPP",
            includes: &["<xmmintrin.h>", "\"simd_ternary_arithmetic_generic.hpp\""],
        },
    }
}

/// Wrap `body` into a complete header.
pub fn assemble_file(
    body: &str,
    description: &str,
    guard: &str,
    includes: &[&str],
    namespace: &str,
) -> String {
    let mut text = String::new();
    text.push_str(&format!("//  {description}\n"));
    text.push_str("//  generated by simdgen; do not edit\n");
    text.push_str("//\n");
    text.push_str(&format!("//  implemented as part of {namespace}\n\n"));
    text.push_str(&format!("#ifndef {guard}\n#define {guard}\n\n"));
    for include in includes {
        text.push_str(&format!("#include {include}\n"));
    }
    text.push_str(&format!("\nnamespace {namespace} {{\n"));
    text.push_str(body);
    text.push_str(&format!("\n}} /* namespace {namespace} */\n\n#endif /* {guard} */\n"));
    text
}

/// One fully wrapped unit.
#[derive(Debug, Clone)]
pub struct GeneratedUnit {
    pub spec: UnitSpec,
    pub text: String,
    pub stats: SessionStats,
}

/// Render the kernel body for `config`, without the file wrapper.
pub fn generate_body(catalog: &Catalog, config: &GeneratorConfig) -> GenResult<(String, SessionStats)> {
    match config.backend {
        BackendKind::Generic => KernelGenerator::new(catalog, GenericBackend::new()).generate(config.family),
        BackendKind::Sse => {
            KernelGenerator::new(catalog, SseBackend::new(config.comparisons)).generate(config.family)
        }
    }
}

/// Render the complete unit for `config`.
pub fn generate(catalog: &Catalog, config: &GeneratorConfig) -> GenResult<GeneratedUnit> {
    let spec = unit_spec(config.backend, config.family);
    let (body, stats) = generate_body(catalog, config)?;
    let text = assemble_file(&body, spec.description, spec.guard, spec.includes, &config.namespace);
    Ok(GeneratedUnit { spec, text, stats })
}

/// Write `unit` to `path`, replacing its contents, or to stdout when `path` is `None`.
pub fn write_unit(unit: &GeneratedUnit, path: Option<&Path>) -> GenResult<()> {
    match path {
        Some(path) => replace_file(path, |file| file.write_all(unit.text.as_bytes())),
        None => {
            let stdout = io::stdout();
            emit(unit, &mut stdout.lock()).map_err(|source| GenError::Io {
                path: PathBuf::from("<stdout>"),
                source,
            })
        }
    }
}

/// Stream the unit text to `out`.
pub fn emit(unit: &GeneratedUnit, out: &mut impl Write) -> io::Result<()> {
    out.write_all(unit.text.as_bytes())?;
    out.flush()
}

/// Fill a temporary file next to `path`, then rename it over `path`.
fn replace_file(path: &Path, fill: impl FnOnce(&mut NamedTempFile) -> io::Result<()>) -> GenResult<()> {
    let io_error = |source| GenError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
    fill(&mut file).map_err(io_error)?;
    file.as_file().sync_all().map_err(io_error)?;
    file.persist(path).map_err(|err| io_error(err.error))?;
    Ok(())
}
