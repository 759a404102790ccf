//! Reusable per-call scratch storage.
//!
//! A batch call needs a handful of working buffers whose sizes depend only
//! on (M, N, tier). Callers keep one `Scratch` per thread and reuse it
//! across calls; nothing in it survives a call semantically.

use pvt_core::DerivativeTier;

/// Working buffers for one evaluation thread.
#[derive(Debug, Clone, Default)]
pub struct Scratch {
    /// Per-object temperature-table segment indices, length M.
    pub(crate) segments: Vec<usize>,
    /// Mole-fraction conversion buffer, length M x N (used when the caller
    /// supplies mass fractions).
    pub(crate) mole_fractions: Vec<f64>,
}

impl Scratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size for a batch shape so the first call does not allocate.
    pub fn with_capacity(m: usize, n: usize) -> Self {
        Self {
            segments: Vec::with_capacity(m),
            mole_fractions: Vec::with_capacity(m * n),
        }
    }

    /// Total f64-equivalent scratch the engine itself holds for a batch of
    /// M objects over N components: M segment slots plus M x N conversion
    /// slots. Result buffers are sized separately by the requested tier:
    /// each scalar output adds M (value) plus M per pressure/temperature
    /// tier and M x N per composition tier; the fugacity Hessian adds
    /// M x N x N.
    pub fn required_len(m: usize, n: usize, _tier: DerivativeTier) -> usize {
        m + m * n
    }

    pub(crate) fn prepare(&mut self, m: usize, n: usize) {
        self.segments.clear();
        self.segments.resize(m, 0);
        self.mole_fractions.clear();
        self.mole_fractions.resize(m * n, 0.0);
    }
}
