// This module provides the per-run generation session. GenerationSession owns the accumulated
// text buffer of one unit body and the statistics gathered while filling it: how many operators
// were visited, how many kernels each one produced, and the final body size. A session is
// created fresh for every run and consumed by finish(), which hands the immutable body text
// back to the assembler. Nothing is shared across runs, so two sessions for different backends
// can run side by side without coordination.

//! Per-run text buffer and statistics.

use std::fmt;

/// Accumulates the body text of one generated unit.
#[derive(Debug, Default)]
pub struct GenerationSession {
    /// Body text emitted so far.
    buffer: String,

    /// Statistics for this run.
    stats: SessionStats,
}

impl GenerationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text that is not a kernel (prologue, epilogue, helpers).
    pub fn push_raw(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Start counting kernels for operator `label`.
    pub fn begin_operator(&mut self, label: &str) {
        self.stats.operators_visited += 1;
        self.stats.kernel_counts.push((label.to_string(), 0));
    }

    /// Append one rendered kernel for the operator most recently begun.
    pub fn push_kernel(&mut self, text: &str) {
        self.buffer.push_str(text);
        self.stats.kernels_emitted += 1;
        if let Some((_, count)) = self.stats.kernel_counts.last_mut() {
            *count += 1;
        }
    }

    /// Bytes accumulated so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Consume the session, returning the body text and final statistics.
    pub fn finish(mut self) -> (String, SessionStats) {
        self.stats.body_bytes = self.buffer.len();
        (self.buffer, self.stats)
    }
}

/// Statistics for one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub operators_visited: usize,
    pub kernels_emitted: usize,
    pub body_bytes: usize,
    /// Kernels per operator, in catalog order.
    pub kernel_counts: Vec<(String, usize)>,
}

impl SessionStats {
    pub fn kernels_for(&self, label: &str) -> Option<usize> {
        self.kernel_counts
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, count)| *count)
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Generation Session Statistics:")?;
        writeln!(f, "  Operators visited: {}", self.operators_visited)?;
        writeln!(f, "  Kernels emitted: {}", self.kernels_emitted)?;
        writeln!(f, "  Body size: {} bytes", self.body_bytes)?;
        if !self.kernel_counts.is_empty() {
            writeln!(f, "  Kernel breakdown:")?;
            for (label, count) in &self.kernel_counts {
                writeln!(f, "    {}: {}", label, count)?;
            }
        }
        Ok(())
    }
}
