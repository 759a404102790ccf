//! Temperature-node coefficient tables.
//!
//! The tabulated method stores, per temperature node, the per-pair A terms
//! and per-component B/C terms supplied by the application. Interpolation is
//! strictly linear between adjacent nodes; outside the table the nearest
//! segment's slope keeps extrapolating. The buffers are owned and contiguous,
//! indexed through named accessors only.

use crate::error::{EosError, EosResult};

/// One temperature node of raw coefficients.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableNode {
    pub temperature: f64,
    /// N x N pair A terms, row-major.
    pub a_pair: Vec<f64>,
    /// N per-component B terms.
    pub b: Vec<f64>,
    /// N per-component volume-translation C terms.
    pub c: Vec<f64>,
}

/// Contiguous coefficient storage over sorted temperature nodes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoefficientTable {
    n: usize,
    /// Node temperatures, ascending.
    nodes: Vec<f64>,
    /// node-major, then row-major N x N
    a_pair: Vec<f64>,
    /// node-major, then N
    b: Vec<f64>,
    /// node-major, then N
    c: Vec<f64>,
    /// 1 / (t[k+1] - t[k]) per segment
    inv_dt: Vec<f64>,
}

/// Index of the temperature segment an object interpolates in.
pub type SegmentIndex = usize;

impl CoefficientTable {
    pub fn new(n: usize, raw_nodes: Vec<TableNode>) -> EosResult<Self> {
        if n == 0 {
            return Err(EosError::Table {
                what: "zero components",
            });
        }
        if raw_nodes.is_empty() {
            return Err(EosError::Table {
                what: "no temperature nodes",
            });
        }
        let k = raw_nodes.len();
        let mut nodes = Vec::with_capacity(k);
        let mut a_pair = Vec::with_capacity(k * n * n);
        let mut b = Vec::with_capacity(k * n);
        let mut c = Vec::with_capacity(k * n);
        for node in &raw_nodes {
            if !node.temperature.is_finite() || node.temperature <= 0.0 {
                return Err(EosError::Table {
                    what: "non-positive node temperature",
                });
            }
            if let Some(&last) = nodes.last() {
                if node.temperature <= last {
                    return Err(EosError::Table {
                        what: "node temperatures must be strictly ascending",
                    });
                }
            }
            if node.a_pair.len() != n * n {
                return Err(EosError::LengthMismatch {
                    what: "pair A block",
                    expected: n * n,
                    got: node.a_pair.len(),
                });
            }
            if node.b.len() != n {
                return Err(EosError::LengthMismatch {
                    what: "B block",
                    expected: n,
                    got: node.b.len(),
                });
            }
            if node.c.len() != n {
                return Err(EosError::LengthMismatch {
                    what: "C block",
                    expected: n,
                    got: node.c.len(),
                });
            }
            if node
                .a_pair
                .iter()
                .chain(&node.b)
                .chain(&node.c)
                .any(|v| !v.is_finite())
            {
                return Err(EosError::Table {
                    what: "non-finite coefficient",
                });
            }
            nodes.push(node.temperature);
            a_pair.extend_from_slice(&node.a_pair);
            b.extend_from_slice(&node.b);
            c.extend_from_slice(&node.c);
        }
        let inv_dt = nodes
            .windows(2)
            .map(|w| 1.0 / (w[1] - w[0]))
            .collect();
        Ok(Self {
            n,
            nodes,
            a_pair,
            b,
            c,
            inv_dt,
        })
    }

    pub fn n_components(&self) -> usize {
        self.n
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_temperature(&self, k: usize) -> f64 {
        self.nodes[k]
    }

    /// Default temperature of the table (that of the last node).
    pub fn default_temperature(&self) -> f64 {
        *self.nodes.last().expect("table has nodes")
    }

    /// Segment an object at temperature `t` interpolates in.
    ///
    /// Binary search over the sorted nodes, clamped so temperatures beyond
    /// the last node (or before the first) keep using the nearest segment's
    /// slope. A single-node table has exactly one (flat) segment.
    pub fn segment_for(&self, t: f64) -> SegmentIndex {
        if self.nodes.len() < 2 {
            return 0;
        }
        let last_segment = self.nodes.len() - 2;
        match self
            .nodes
            .binary_search_by(|node| node.partial_cmp(&t).expect("finite node"))
        {
            Ok(k) => k.min(last_segment),
            Err(0) => 0,
            Err(k) => (k - 1).min(last_segment),
        }
    }

    /// Resolve segments for a whole batch; returns true when every object
    /// shares one segment (the fast path the assembly exploits).
    pub fn resolve_segments(&self, temperatures: &[f64], out: &mut [SegmentIndex]) -> bool {
        debug_assert_eq!(temperatures.len(), out.len());
        for (slot, &t) in out.iter_mut().zip(temperatures) {
            *slot = self.segment_for(t);
        }
        match out.split_first() {
            Some((&first, rest)) => rest.iter().all(|&s| s == first),
            None => true,
        }
    }

    fn lerp(&self, base: f64, next: f64, seg: usize, t: f64) -> (f64, f64) {
        let slope = (next - base) * self.inv_dt[seg];
        (base + (t - self.nodes[seg]) * slope, slope)
    }

    /// Pair A term and its temperature slope at `t` within `seg`.
    pub fn a_pair_at(&self, seg: SegmentIndex, i: usize, j: usize, t: f64) -> (f64, f64) {
        let n2 = self.n * self.n;
        let idx = i * self.n + j;
        if self.nodes.len() < 2 {
            return (self.a_pair[idx], 0.0);
        }
        self.lerp(
            self.a_pair[seg * n2 + idx],
            self.a_pair[(seg + 1) * n2 + idx],
            seg,
            t,
        )
    }

    /// Component B term and its temperature slope at `t` within `seg`.
    pub fn b_at(&self, seg: SegmentIndex, i: usize, t: f64) -> (f64, f64) {
        if self.nodes.len() < 2 {
            return (self.b[i], 0.0);
        }
        self.lerp(self.b[seg * self.n + i], self.b[(seg + 1) * self.n + i], seg, t)
    }

    /// Component C (volume translation) term and its slope at `t`.
    pub fn c_at(&self, seg: SegmentIndex, i: usize, t: f64) -> (f64, f64) {
        if self.nodes.len() < 2 {
            return (self.c[i], 0.0);
        }
        self.lerp(self.c[seg * self.n + i], self.c[(seg + 1) * self.n + i], seg, t)
    }

    /// Whether any C or C-slope entry is nonzero (enables volume translation).
    pub fn has_translation(&self) -> bool {
        self.c.iter().any(|&v| v != 0.0)
    }

    /// Collapse the table to a single node pinned at temperature `t`, with
    /// all temperature dependence folded away.
    pub fn at_temperature(&self, t: f64) -> Self {
        let n = self.n;
        let seg = self.segment_for(t);
        let mut a_pair = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                a_pair.push(self.a_pair_at(seg, i, j, t).0);
            }
        }
        let b = (0..n).map(|i| self.b_at(seg, i, t).0).collect();
        let c = (0..n).map(|i| self.c_at(seg, i, t).0).collect();
        Self {
            n,
            nodes: vec![t],
            a_pair,
            b,
            c,
            inv_dt: Vec::new(),
        }
    }
}
