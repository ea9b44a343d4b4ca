//! Error taxonomy for the vectorization core (spec §7).
//!
//! The taxonomy is deliberately small: the core is a pure function from a
//! raster + palette to vector layers, so almost every failure mode is a
//! local, recoverable geometric degeneracy (handled inline, see
//! `optimizer::fit_range`'s chord fallback) rather than a propagated error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorizeError {
    /// Width/height <= 0, empty/oversized palette, or pixel buffer size
    /// mismatch. Fails the page, surfaces to the caller.
    #[error("invalid input: {detail}")]
    InvalidInput { detail: String },

    /// A buffer would exceed the target's indexing limit (or, on a GPU
    /// backend, allocation failed). Fails the page, surfaces with the
    /// limiting dimension named.
    #[error("resource exhausted: {dimension} would require {limit}")]
    ResourceExhausted { dimension: String, limit: u64 },
}

/// A non-fatal condition accompanying an otherwise-successful page.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// Thinning (spec §4.E) hit its iteration cap without reaching a
    /// fixpoint. The capped skeleton is used as-is.
    NonConvergedThinning { color_index: i32, iterations: u32 },
}

/// The single diagnostic record a failed page yields (spec §7).
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub stage: String,
    pub reason: String,
    pub detail: String,
}
